pub mod environment;
pub mod project_file;
