//! CLI command definitions
//!
//! Defines the clap commands for the apiprobe CLI.

use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Run scenario files against the configured endpoints
    Run {
        /// Paths to YAML scenario files
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Comma separated environment variables to seed into memory
        /// (overrides the config file)
        #[arg(long, value_name = "KEYS")]
        seeded: Option<String>,

        /// Path to a config file (default: platform config dir)
        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Stop after the first failed scenario
        #[arg(long)]
        fail_fast: bool,

        /// Verbose output: show doc strings and debug logs
        #[arg(long, short)]
        verbose: bool,
    },

    /// Parse scenario files and their steps without sending requests
    Check {
        /// Paths to YAML scenario files
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Show the memory seed a run would start from
    Seed {
        /// Comma separated environment variables to seed into memory
        #[arg(long, value_name = "KEYS")]
        seeded: Option<String>,

        /// Path to a config file (default: platform config dir)
        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,
    },
}

impl Commands {
    /// Whether debug logging was requested
    pub fn verbose(&self) -> bool {
        matches!(self, Commands::Run { verbose: true, .. })
    }
}
