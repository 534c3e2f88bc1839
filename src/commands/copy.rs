//! Copy command implementation
//!
//! Copies files verbatim into a fresh staged tree and commits it. With a
//! context (`--context`/`--set`) the destination path is expanded as a
//! template, so `--to 'out/<%= name %>'` works here too.

use anyhow::Result;
use clap::Args;
use stagecopy::{CopyOptions, Editor, GlobOptions};
use std::path::PathBuf;

use super::{absolute, finish, load_context, source_from_args};

/// Arguments for the copy command
#[derive(Args, Debug)]
pub struct CopyArgs {
    /// Source paths or glob patterns; prefix a pattern with `!` to exclude
    #[arg(required = true, value_name = "FROM", allow_hyphen_values = true)]
    pub from: Vec<String>,

    /// Destination file or directory
    #[arg(short, long, value_name = "TO")]
    pub to: PathBuf,

    /// Additional glob patterns to exclude
    #[arg(short, long, value_name = "PATTERN")]
    pub ignore: Vec<String>,

    /// Succeed without copying anything when no source matches
    #[arg(long)]
    pub ignore_no_match: bool,

    /// Let wildcards match names starting with a dot
    #[arg(long)]
    pub dot: bool,

    /// YAML or JSON file with template data
    #[arg(short, long, value_name = "FILE")]
    pub context: Option<PathBuf>,

    /// Set a template value (repeatable)
    #[arg(long = "set", value_name = "KEY=VALUE")]
    pub set: Vec<String>,

    /// Show what would be written without touching the disk
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Suppress all output except errors
    #[arg(short, long)]
    pub quiet: bool,
}

impl CopyArgs {
    /// Copy options shared by the copy and template commands
    pub fn options(&self) -> CopyOptions {
        CopyOptions::new()
            .glob_options(GlobOptions {
                ignore: self.ignore.clone(),
                dot: self.dot,
                ..GlobOptions::default()
            })
            .ignore_no_match(self.ignore_no_match)
    }
}

/// Execute the copy command
pub fn execute(args: CopyArgs) -> Result<()> {
    let mut options = args.options();
    if let Some(context) = load_context(args.context.as_deref(), &args.set)? {
        options = options.context(context);
    }

    let to = absolute(&args.to);
    let mut editor = Editor::new();
    editor.copy(source_from_args(args.from), &to, &options)?;

    finish(editor.into_store(), args.dry_run, args.quiet)
}
