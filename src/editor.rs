//! # Copy Orchestrator
//!
//! [`Editor`] wraps a [`StagedTree`] and exposes the three copy entry points:
//!
//! - [`Editor::copy`]: resolve, map, optionally run a sync transform, stage.
//! - [`Editor::copy_async`]: same resolution, transforms may suspend; every
//!   transform runs to completion before anything is staged.
//! - [`Editor::copy_tpl`]: same resolution, contents are always rendered as
//!   templates and destination paths are always expanded.
//!
//! None of them touch disk for writes. Persisting is a separate step, see
//! [`crate::commit::commit`].
//!
//! ```no_run
//! use serde_json::json;
//! use stagecopy::{commit, CopyOptions, Editor};
//!
//! # fn main() -> stagecopy::Result<()> {
//! let mut editor = Editor::new();
//! editor.copy("templates/static", "out", &CopyOptions::default())?;
//! editor.copy_tpl(
//!     "templates/pages/**",
//!     "out/<%= name %>",
//!     Some(&json!({"name": "site"})),
//!     &CopyOptions::default(),
//! )?;
//! commit(editor.store_mut())?;
//! # Ok(())
//! # }
//! ```

use crate::destination::{render_destination, Destinations};
use crate::error::{Error, Result};
use crate::matcher::GlobOptions;
use crate::pipeline::{self, AsyncProcessFn, ProcessFn, Transform};
use crate::source::{self, Source};
use crate::store::{MemStore, StagedTree};
use crate::template::TemplateSettings;
use futures::future::try_join_all;
use futures::{Future, FutureExt};
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Options shared by every copy entry point
#[derive(Clone, Default)]
pub struct CopyOptions {
    /// Synchronous content transform
    pub process: Option<ProcessFn>,
    /// Asynchronous content transform, only honored by `copy_async`
    pub process_async: Option<AsyncProcessFn>,
    /// Forwarded to glob matching; directories are never matched
    pub glob_options: GlobOptions,
    /// Resolve to zero files instead of failing with `SourceNotFound`
    pub ignore_no_match: bool,
    /// Data for destination path expansion (and contents, in `copy_tpl`)
    pub context: Option<Value>,
    pub template_settings: TemplateSettings,
    /// Expand destination paths even when no context is supplied
    pub render_destination: bool,
}

impl fmt::Debug for CopyOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CopyOptions")
            .field("process", &self.process.is_some())
            .field("process_async", &self.process_async.is_some())
            .field("glob_options", &self.glob_options)
            .field("ignore_no_match", &self.ignore_no_match)
            .field("context", &self.context)
            .field("template_settings", &self.template_settings)
            .field("render_destination", &self.render_destination)
            .finish()
    }
}

impl CopyOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the synchronous transform
    ///
    /// The closure may return anything convertible to bytes (`String`,
    /// `&'static str`, `Vec<u8>`).
    pub fn process<F, B>(mut self, f: F) -> Self
    where
        F: Fn(&[u8], &Path) -> Result<B> + Send + Sync + 'static,
        B: Into<Vec<u8>>,
    {
        let process: ProcessFn =
            Arc::new(move |contents: &[u8], path: &Path| f(contents, path).map(Into::into));
        self.process = Some(process);
        self
    }

    /// Set the asynchronous transform used by `copy_async`
    pub fn process_async<F, Fut, B>(mut self, f: F) -> Self
    where
        F: Fn(Vec<u8>, PathBuf) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<B>> + Send + 'static,
        B: Into<Vec<u8>>,
    {
        let process: AsyncProcessFn = Arc::new(move |contents: Vec<u8>, path: PathBuf| {
            f(contents, path)
                .map(|result| result.map(Into::into))
                .boxed()
        });
        self.process_async = Some(process);
        self
    }

    pub fn glob_options(mut self, glob_options: GlobOptions) -> Self {
        self.glob_options = glob_options;
        self
    }

    /// Add a glob exclusion
    pub fn ignore(mut self, pattern: impl Into<String>) -> Self {
        self.glob_options.ignore.push(pattern.into());
        self
    }

    pub fn ignore_no_match(mut self, ignore_no_match: bool) -> Self {
        self.ignore_no_match = ignore_no_match;
        self
    }

    pub fn context(mut self, context: Value) -> Self {
        self.context = Some(context);
        self
    }

    pub fn template_settings(mut self, settings: TemplateSettings) -> Self {
        self.template_settings = settings;
        self
    }

    pub fn render_destination(mut self, render: bool) -> Self {
        self.render_destination = render;
        self
    }
}

/// A resolved source file and where it goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPair {
    pub source: PathBuf,
    pub destination: PathBuf,
}

/// Copy engine over a staged file tree
#[derive(Debug, Default)]
pub struct Editor<S: StagedTree = MemStore> {
    store: S,
}

impl Editor<MemStore> {
    /// Create an editor over a fresh in-memory store
    pub fn new() -> Self {
        Self::with_store(MemStore::new())
    }
}

impl<S: StagedTree> Editor<S> {
    /// Create an editor over an existing staged tree
    pub fn with_store(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Read a file as bytes through the staged tree
    pub fn read_bytes(&self, path: impl AsRef<Path>) -> Result<Vec<u8>> {
        let path = path.as_ref();
        match self.store.get(path)? {
            Some(file) if !file.is_deleted() => Ok(file.contents.unwrap_or_default()),
            _ => Err(Error::Filesystem {
                message: format!("File not found: {}", path.display()),
            }),
        }
    }

    /// Read a file as UTF-8 text through the staged tree
    pub fn read(&self, path: impl AsRef<Path>) -> Result<String> {
        let path = path.as_ref();
        String::from_utf8(self.read_bytes(path)?).map_err(|e| Error::Filesystem {
            message: format!("{} is not valid UTF-8: {}", path.display(), e),
        })
    }

    pub fn write(&mut self, path: impl AsRef<Path>, contents: impl Into<Vec<u8>>) -> Result<()> {
        self.store.set(path.as_ref(), contents.into(), None)
    }

    pub fn exists(&self, path: impl AsRef<Path>) -> bool {
        self.store.exists(path.as_ref())
    }

    pub fn delete(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.store.delete(path.as_ref())
    }

    /// Resolve sources and their destinations
    ///
    /// Destinations are expanded as templates when `context` is given.
    pub fn resolve(
        &self,
        from: &Source,
        to: &Path,
        options: &CopyOptions,
        context: Option<&Value>,
    ) -> Result<Vec<ResolvedPair>> {
        // The destination is checked even when nothing will be copied
        let plan = Destinations::plan(from, to, &self.store)?;
        let sources = source::enumerate(
            from,
            &options.glob_options,
            options.ignore_no_match,
            &self.store,
        )?;
        if sources.is_empty() {
            log::debug!("{} matched nothing, skipping", from);
            return Ok(Vec::new());
        }

        sources
            .into_iter()
            .map(|source| {
                let mut destination = plan.destination_for(&source);
                if let Some(context) = context {
                    destination =
                        render_destination(&destination, context, &options.template_settings)?;
                }
                Ok(ResolvedPair {
                    source,
                    destination,
                })
            })
            .collect()
    }

    /// Copy files into the staged tree
    ///
    /// `from` is a path, a glob pattern, or a list of patterns (with
    /// `!exclusions`). A single existing file is copied to `to` itself;
    /// anything else is copied under `to`, keeping paths relative to the
    /// common root of `from`.
    ///
    /// A failing transform aborts the call; files staged before it stay
    /// staged.
    pub fn copy(
        &mut self,
        from: impl Into<Source>,
        to: impl AsRef<Path>,
        options: &CopyOptions,
    ) -> Result<()> {
        if options.process.is_none() && options.process_async.is_some() {
            return Err(Error::Options {
                message: "process_async is only supported by copy_async".to_string(),
            });
        }
        let from = from.into();
        let context = destination_context(options);
        let pairs = self.resolve(&from, to.as_ref(), options, context.as_ref())?;

        let transform = match &options.process {
            Some(process) => Transform::Process(process),
            None => Transform::Passthrough,
        };
        self.stage(pairs, &transform)
    }

    /// Copy files, awaiting an async transform per file
    ///
    /// All transforms are driven concurrently and must all succeed before
    /// anything is staged; results are then staged in resolution order.
    pub async fn copy_async(
        &mut self,
        from: impl Into<Source>,
        to: impl AsRef<Path>,
        options: &CopyOptions,
    ) -> Result<()> {
        let from = from.into();
        let context = destination_context(options);
        let pairs = self.resolve(&from, to.as_ref(), options, context.as_ref())?;

        let mut destinations = Vec::with_capacity(pairs.len());
        let mut tasks = Vec::with_capacity(pairs.len());
        for pair in pairs {
            let file = pipeline::read_source(&self.store, &pair.source)?;
            tasks.push(pipeline::apply_async(
                options.process_async.clone(),
                options.process.clone(),
                file,
            ));
            destinations.push(pair.destination);
        }

        let outputs = try_join_all(tasks).await?;
        for (destination, output) in destinations.into_iter().zip(outputs) {
            log::debug!("staging {}", destination.display());
            self.store.set(&destination, output.contents, output.stat)?;
        }
        Ok(())
    }

    /// Copy files, rendering their contents as templates
    ///
    /// `context` falls back to `options.context`, then to an empty object.
    /// Destination paths are always expanded with the same context. Binary
    /// files are copied verbatim. `options.process` is not used.
    pub fn copy_tpl(
        &mut self,
        from: impl Into<Source>,
        to: impl AsRef<Path>,
        context: Option<&Value>,
        options: &CopyOptions,
    ) -> Result<()> {
        let from = from.into();
        let context = context
            .or(options.context.as_ref())
            .cloned()
            .unwrap_or_else(empty_context);
        let pairs = self.resolve(&from, to.as_ref(), options, Some(&context))?;

        let transform = Transform::Template {
            context: &context,
            settings: &options.template_settings,
        };
        self.stage(pairs, &transform)
    }

    fn stage(&mut self, pairs: Vec<ResolvedPair>, transform: &Transform<'_>) -> Result<()> {
        for pair in pairs {
            let file = pipeline::read_source(&self.store, &pair.source)?;
            let output = pipeline::apply(&self.store, transform, file)?;
            log::debug!(
                "staging {} -> {}",
                pair.source.display(),
                pair.destination.display()
            );
            self.store
                .set(&pair.destination, output.contents, output.stat)?;
        }
        Ok(())
    }
}

fn empty_context() -> Value {
    Value::Object(serde_json::Map::new())
}

/// Context used to expand destination paths in plain copies
fn destination_context(options: &CopyOptions) -> Option<Value> {
    match &options.context {
        Some(context) => Some(context.clone()),
        None if options.render_destination => Some(empty_context()),
        None => None,
    }
}
