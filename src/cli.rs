//! CLI argument parsing and command dispatch

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::commands;

/// Stagecopy - copy files and templates through a staged file tree
#[derive(Parser, Debug)]
#[command(name = "stagecopy")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Set log level (error, warn, info, debug, trace); RUST_LOG takes precedence
    #[arg(long, global = true, value_name = "LEVEL", default_value = "warn")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Copy files, keeping their layout relative to the common root
    Copy(commands::copy::CopyArgs),

    /// Copy files, rendering their contents and destination paths as templates
    Template(commands::template::TemplateArgs),

    /// Run every step of a .stagecopy.yaml plan, then commit
    Apply(commands::apply::ApplyArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        let env = env_logger::Env::default().default_filter_or(self.log_level.as_str());
        // A logger may already be installed when running under tests
        let _ = env_logger::Builder::from_env(env)
            .format_timestamp(None)
            .try_init();

        match self.command {
            Commands::Copy(args) => commands::copy::execute(args),
            Commands::Template(args) => commands::template::execute(args),
            Commands::Apply(args) => commands::apply::execute(args),
        }
    }
}
