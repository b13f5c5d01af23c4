//! Integration tests for the copick overlay entity tree

mod catalog_static;
mod config_loading;
mod copy_up;
mod delete_rules;
mod malformed_entries;
mod overlay_only;
mod session_visibility;
mod spacing_aliases;
mod test_utils;
