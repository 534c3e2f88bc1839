//! Destination mapping: one destination path per resolved source
//!
//! A single literal source that exists is copied straight onto `to`
//! ("identity" mode). Everything else lands under `to` at its path relative
//! to the common root of the source patterns.

use crate::error::{Error, Result};
use crate::path::{absolutize, relative_to, to_slash};
use crate::source::Source;
use crate::store::StagedTree;
use crate::template::{self, TemplateSettings};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// How destinations are derived for one copy call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destinations {
    /// Every source is written to `to` itself
    Identity(PathBuf),
    /// Sources keep their layout below `root`, rebased onto `to`
    RootRelative { to: PathBuf, root: PathBuf },
}

impl Destinations {
    /// Pick the destination mode for `from` copied to `to`.
    ///
    /// Root-relative copies fail with `Error::InvalidDestination` when `to`
    /// is an existing file.
    pub fn plan<S: StagedTree + ?Sized>(from: &Source, to: &Path, store: &S) -> Result<Self> {
        let to = absolutize(to);

        if let Some(literal) = from.literal_path() {
            if store.exists(literal) {
                log::debug!("copying {} onto {}", from, to.display());
                return Ok(Destinations::Identity(to));
            }
        }

        if store.exists(&to) {
            return Err(Error::InvalidDestination {
                path: to_slash(&to),
            });
        }

        let root = absolutize(&from.common_path());
        log::debug!(
            "copying {} into {} relative to {}",
            from,
            to.display(),
            root.display()
        );
        Ok(Destinations::RootRelative { to, root })
    }

    /// Destination for one source file, before any template expansion
    pub fn destination_for(&self, source: &Path) -> PathBuf {
        match self {
            Destinations::Identity(to) => to.clone(),
            Destinations::RootRelative { to, root } => {
                absolutize(&to.join(relative_to(source, root)))
            }
        }
    }
}

/// Expand template tags in a destination path
pub fn render_destination(
    destination: &Path,
    context: &Value,
    settings: &TemplateSettings,
) -> Result<PathBuf> {
    let rendered = template::render_str(&to_slash(destination), context, settings)?;
    Ok(absolutize(Path::new(&rendered)))
}
