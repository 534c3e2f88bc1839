//! Content pipeline: from a resolved source file to the bytes to write
//!
//! Contents are read through the staged tree, then either passed through,
//! handed to a caller transform (sync or async), or rendered as a template.
//! The source file's metadata travels with the result so the destination
//! inherits its permission bits at commit.

use crate::error::{Error, Result};
use crate::path::to_slash;
use crate::store::{FileStat, StagedFile, StagedTree};
use crate::template::{self, TemplateSettings};
use futures::future::BoxFuture;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Synchronous content transform: `(contents, source path) -> new contents`
pub type ProcessFn = Arc<dyn Fn(&[u8], &Path) -> Result<Vec<u8>> + Send + Sync>;

/// Asynchronous content transform, used by `copy_async`
pub type AsyncProcessFn =
    Arc<dyn Fn(Vec<u8>, PathBuf) -> BoxFuture<'static, Result<Vec<u8>>> + Send + Sync>;

/// Number of leading bytes inspected by [`is_binary`]
const BINARY_SAMPLE_LEN: usize = 1024;

/// How the contents of one file are turned into output
pub enum Transform<'a> {
    Passthrough,
    Process(&'a ProcessFn),
    Template {
        context: &'a Value,
        settings: &'a TemplateSettings,
    },
}

/// Bytes to stage for one destination, with the metadata to carry over
#[derive(Debug, Clone)]
pub struct Output {
    pub contents: Vec<u8>,
    pub stat: Option<FileStat>,
}

/// Heuristic check for non-text content
///
/// A NUL byte, invalid UTF-8, or more than 10% control characters in the
/// leading sample marks the contents as binary.
pub fn is_binary(contents: &[u8]) -> bool {
    let sample = &contents[..contents.len().min(BINARY_SAMPLE_LEN)];
    if sample.contains(&0) {
        return true;
    }
    if std::str::from_utf8(contents).is_err() {
        return true;
    }
    let suspicious = sample
        .iter()
        .filter(|&&b| b < 0x20 && !matches!(b, b'\t' | b'\n' | b'\r' | 0x0c | 0x1b | 0x08))
        .count();
    suspicious * 10 > sample.len()
}

/// Load a source file through the staged tree
pub fn read_source<S: StagedTree + ?Sized>(store: &S, path: &Path) -> Result<StagedFile> {
    match store.get(path)? {
        Some(file) if !file.is_deleted() && file.contents.is_some() => Ok(file),
        _ => Err(Error::SourceNotFound {
            from: to_slash(path),
        }),
    }
}

/// Render text contents as a template; binary contents pass through untouched.
pub fn render_contents<S: StagedTree + ?Sized>(
    store: &S,
    contents: Vec<u8>,
    source: &Path,
    context: &Value,
    settings: &TemplateSettings,
) -> Result<Vec<u8>> {
    if is_binary(&contents) {
        log::debug!("{} looks binary, copying verbatim", source.display());
        return Ok(contents);
    }
    let text = String::from_utf8(contents).map_err(|e| Error::Template {
        message: format!("{} is not valid UTF-8: {}", source.display(), e),
        variable: None,
    })?;

    let loader = |path: &Path| -> Result<Option<String>> {
        Ok(store
            .get(path)?
            .filter(|file| !file.is_deleted())
            .and_then(|file| file.contents)
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
    };
    Ok(template::render(&text, context, settings, source, &loader)?.into_bytes())
}

/// Run one source file through a synchronous transform
pub fn apply<S: StagedTree + ?Sized>(
    store: &S,
    transform: &Transform<'_>,
    source: StagedFile,
) -> Result<Output> {
    let contents = source.contents.unwrap_or_default();
    let contents = match transform {
        Transform::Passthrough => contents,
        Transform::Process(process) => process(&contents, &source.path)?,
        Transform::Template { context, settings } => {
            render_contents(store, contents, &source.path, context, settings)?
        }
    };
    Ok(Output {
        contents,
        stat: source.stat,
    })
}

/// Run one source file through the transforms available to `copy_async`
///
/// An async transform wins over a sync one when both are configured.
pub async fn apply_async(
    process_async: Option<AsyncProcessFn>,
    process: Option<ProcessFn>,
    source: StagedFile,
) -> Result<Output> {
    let contents = source.contents.unwrap_or_default();
    let contents = match (process_async, process) {
        (Some(process_async), _) => process_async(contents, source.path.clone()).await?,
        (None, Some(process)) => process(&contents, &source.path)?,
        (None, None) => contents,
    };
    Ok(Output {
        contents,
        stat: source.stat,
    })
}
