//! CLI domain: parse, route, help, output, and presentation only.
//! Commands are read-only views over a project; all logic lives in the entity tree.

mod help;
mod output;
mod parse;
mod presentation;
mod route;

pub use help::command_name;
pub use output::map_error;
pub use parse::{Cli, Commands, OutputFormat};
pub use route::RunContext;
