//! Source enumeration: from `from` patterns to concrete source files
//!
//! Matches come from two places: files on disk (expanded by the glob matcher)
//! and files already staged but not committed. Disk matches come first,
//! staged matches are appended after them. The two lists are not
//! deduplicated; a path present in both is simply copied twice with the same
//! staged contents.

use crate::error::{Error, Result};
use crate::matcher::{GlobOptions, PatternSet};
use crate::path::{get_common_path, globify, has_magic, to_slash};
use crate::store::StagedTree;
use std::fmt;
use std::path::{Path, PathBuf};

/// What to copy from: one path or pattern, or an ordered list of patterns
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// A literal path or a single glob pattern
    Single(String),
    /// Patterns in order; entries starting with `!` exclude earlier matches
    Many(Vec<String>),
}

impl Source {
    /// A single path that is not a pattern
    pub fn is_literal(&self) -> bool {
        matches!(self, Source::Single(path) if !has_magic(path))
    }

    /// The literal path, when this source is one
    pub fn literal_path(&self) -> Option<&Path> {
        match self {
            Source::Single(path) if !has_magic(path) => Some(Path::new(path)),
            _ => None,
        }
    }

    /// Glob patterns this source expands to
    ///
    /// A single entry goes through `globify`; lists are used as given.
    pub fn patterns(&self) -> Result<Vec<String>> {
        match self {
            Source::Single(path) => Ok(globify(path)?.into_patterns()),
            Source::Many(patterns) => Ok(patterns.clone()),
        }
    }

    /// Literal root shared by every non-excluded entry
    pub fn common_path(&self) -> PathBuf {
        match self {
            Source::Single(path) => get_common_path([path]),
            Source::Many(patterns) => get_common_path(patterns),
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Single(path) => write!(f, "{}", path),
            Source::Many(patterns) => write!(f, "[{}]", patterns.join(", ")),
        }
    }
}

impl From<&str> for Source {
    fn from(path: &str) -> Self {
        Source::Single(path.to_string())
    }
}

impl From<String> for Source {
    fn from(path: String) -> Self {
        Source::Single(path)
    }
}

impl From<&String> for Source {
    fn from(path: &String) -> Self {
        Source::Single(path.clone())
    }
}

impl From<&Path> for Source {
    fn from(path: &Path) -> Self {
        Source::Single(to_slash(path))
    }
}

impl From<PathBuf> for Source {
    fn from(path: PathBuf) -> Self {
        Source::Single(to_slash(&path))
    }
}

impl From<&PathBuf> for Source {
    fn from(path: &PathBuf) -> Self {
        Source::Single(to_slash(path))
    }
}

impl From<Vec<String>> for Source {
    fn from(patterns: Vec<String>) -> Self {
        Source::Many(patterns)
    }
}

impl From<Vec<&str>> for Source {
    fn from(patterns: Vec<&str>) -> Self {
        Source::Many(patterns.into_iter().map(str::to_string).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Source {
    fn from(patterns: [&str; N]) -> Self {
        Source::Many(patterns.iter().map(|p| p.to_string()).collect())
    }
}

impl<const N: usize> From<[String; N]> for Source {
    fn from(patterns: [String; N]) -> Self {
        Source::Many(patterns.to_vec())
    }
}

/// Resolve `from` into the files to copy.
///
/// Fails with `Error::SourceNotFound` when nothing matches, unless
/// `ignore_no_match` is set.
pub fn enumerate<S: StagedTree + ?Sized>(
    from: &Source,
    options: &GlobOptions,
    ignore_no_match: bool,
    store: &S,
) -> Result<Vec<PathBuf>> {
    let patterns = from.patterns()?;
    let set = PatternSet::new(&patterns, options)?;

    // Disk files deleted in the staged tree are no longer valid sources
    let mut files: Vec<PathBuf> = set
        .expand()?
        .into_iter()
        .filter(|path| store.exists(path))
        .collect();
    let disk_count = files.len();

    store.each(&mut |file| {
        if !file.is_deleted() && !has_magic(&to_slash(&file.path)) && set.is_match(&file.path) {
            files.push(file.path.clone());
        }
    });

    log::debug!(
        "{} matched {} file(s) on disk and {} staged",
        from,
        disk_count,
        files.len() - disk_count
    );

    if files.is_empty() && !ignore_no_match {
        return Err(Error::SourceNotFound {
            from: from.to_string(),
        });
    }
    Ok(files)
}
