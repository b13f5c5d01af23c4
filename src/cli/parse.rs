//! CLI parse: clap types for copick. No behavior; definitions only.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Copick CLI - inspect overlay-merged cryo-ET projects
#[derive(Parser)]
#[command(name = "copick")]
#[command(about = "Inspect cryo-ET projects split across static and overlay storage")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Project configuration file
    #[arg(long, short, default_value = "copick_config.json")]
    pub config: PathBuf,

    /// Enable verbose logging (default: off)
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List runs with their provenance
    Runs {
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Show the entity tree of one run or of every run
    Tree {
        /// Run name (default: all runs)
        run: Option<String>,
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// List picks matching an address like `ribosome:user1/0`
    Picks {
        /// Entity address `object[:user[/session]]`, `*` wildcards allowed
        address: String,
        /// Restrict to one run
        #[arg(long)]
        run: Option<String>,
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// List configured pickable objects
    Objects {
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Walk every run and report entries that could not be decoded
    Check {
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}
