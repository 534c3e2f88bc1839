//! # Stagecopy CLI
//!
//! This is the binary entry point for the `stagecopy` command-line tool.
//!
//! Its primary responsibilities are:
//! - Parsing command-line arguments using `clap`.
//! - Executing the appropriate command based on the parsed arguments.
//! - Handling top-level application errors and translating them into user-friendly
//!   output.
//!
//! The copy engine lives in the `lib.rs` library crate; every command builds a
//! fresh staged tree, runs the engine against it, and commits the result.

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli.execute()
}
