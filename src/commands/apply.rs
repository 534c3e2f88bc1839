//! Apply command implementation
//!
//! Runs every step of a `.stagecopy.yaml` plan against one staged tree, in
//! order, so later steps see what earlier steps staged. Nothing is written
//! unless every step succeeds.

use anyhow::{Context, Result};
use clap::Args;
use stagecopy::config::{from_file, DEFAULT_PLAN_FILE};
use stagecopy::Editor;
use std::path::{Path, PathBuf};
use std::time::Instant;

use super::{absolute, finish};

/// Arguments for the apply command
#[derive(Args, Debug)]
pub struct ApplyArgs {
    /// Path to plan file
    #[arg(short, long, value_name = "PATH", env = "STAGECOPY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Show what would be written without touching the disk
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Suppress all output except errors
    #[arg(short, long)]
    pub quiet: bool,
}

/// Execute the apply command
pub fn execute(args: ApplyArgs) -> Result<()> {
    let start_time = Instant::now();

    let config_path = absolute(
        &args
            .config
            .unwrap_or_else(|| PathBuf::from(DEFAULT_PLAN_FILE)),
    );
    if !config_path.exists() {
        anyhow::bail!("Configuration file not found: {}", config_path.display());
    }
    let base = config_path.parent().unwrap_or(Path::new("/")).to_path_buf();

    let plan = from_file(&config_path)?;
    log::info!(
        "applying {} step(s) from {}",
        plan.len(),
        config_path.display()
    );

    let mut editor = Editor::new();
    for (index, step) in plan.iter().enumerate() {
        log::debug!("step {}: {}", index + 1, step.describe());
        step.run(&mut editor, &base)
            .with_context(|| format!("Step {} failed: {}", index + 1, step.describe()))?;
    }

    finish(editor.into_store(), args.dry_run, args.quiet)?;
    if !args.quiet {
        println!(
            "Applied {} step(s) in {:.2}s",
            plan.len(),
            start_time.elapsed().as_secs_f64()
        );
    }
    Ok(())
}
