//! CLI help: command names for logging.

use crate::cli::parse::Commands;

pub fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Runs { .. } => "runs",
        Commands::Tree { .. } => "tree",
        Commands::Picks { .. } => "picks",
        Commands::Objects { .. } => "objects",
        Commands::Check { .. } => "check",
    }
}
