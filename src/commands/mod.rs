//! # CLI Command Implementations
//!
//! This module contains the implementation for each subcommand of the `stagecopy`
//! command-line tool. Each subcommand is defined in its own file to keep the
//! logic separated and maintainable.
//!
//! ## Structure
//!
//! Each command module typically contains:
//! - An `Args` struct that defines the command-specific arguments and options,
//!   derived using `clap`.
//! - An `execute` function that takes the parsed `Args` and performs the
//!   command's logic.
//!
//! Every command stages its work in a fresh `MemStore` and finishes through
//! [`finish`], which either commits the store or, for `--dry-run`, lists what
//! a commit would do.

pub mod apply;
pub mod copy;
pub mod template;

use anyhow::{Context, Result};
use serde_json::{Map, Value};
use stagecopy::store::{FileState, MemStore};
use stagecopy::Source;
use std::path::{Path, PathBuf};

/// Build a source from one or more positional arguments
pub fn source_from_args(from: Vec<String>) -> Source {
    if from.len() == 1 {
        Source::from(from.into_iter().next().unwrap_or_default())
    } else {
        Source::from(from)
    }
}

/// Load template data from a YAML/JSON file, then apply `key=value` overrides
pub fn load_context(file: Option<&Path>, sets: &[String]) -> Result<Option<Value>> {
    let mut context = match file {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read context file {}", path.display()))?;
            let value: Value = serde_yaml::from_str(&text)
                .with_context(|| format!("Invalid context file {}", path.display()))?;
            if !value.is_object() {
                anyhow::bail!("Context file {} must contain a mapping", path.display());
            }
            Some(value)
        }
        None => None,
    };

    for set in sets {
        let Some((key, value)) = set.split_once('=') else {
            anyhow::bail!("Invalid --set '{}': expected key=value", set);
        };
        let object = context
            .get_or_insert_with(|| Value::Object(Map::new()))
            .as_object_mut()
            .context("Context must be a mapping")?;
        object.insert(key.trim().to_string(), Value::String(value.to_string()));
    }

    Ok(context)
}

/// Commit the staged tree, or list pending changes for a dry run
pub fn finish(mut store: MemStore, dry_run: bool, quiet: bool) -> Result<()> {
    if dry_run {
        let pending = store.pending();
        if !quiet {
            println!("Dry run: {} pending change(s)", pending.len());
            for file in pending {
                let label = match file.state {
                    FileState::New => "create",
                    FileState::Modified => "modify",
                    FileState::Deleted => "delete",
                    FileState::Unmodified => continue,
                };
                println!("  {} {}", label, file.path.display());
            }
        }
        return Ok(());
    }

    let summary = stagecopy::commit(&mut store)?;
    if !quiet {
        println!("Wrote {} file(s)", summary.written);
    }
    Ok(())
}

/// Resolve a path argument against the current directory
pub fn absolute(path: &Path) -> PathBuf {
    stagecopy::path::absolutize(path)
}
