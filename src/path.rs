//! Path resolution utilities for stagecopy
//!
//! Turns a single path or pattern into a glob-safe pattern (`globify`) and
//! finds the literal root shared by one or more patterns (`get_common_path`).
//! Patterns are handled as `/`-separated strings so that glob syntax survives
//! normalization untouched.

use crate::error::{Error, Result};
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Characters that make a path segment a pattern rather than a literal name.
const MAGIC_CHARS: [char; 4] = ['*', '?', '[', '{'];

/// Suffix appended to a directory so matching includes every descendant.
pub const RECURSIVE_SUFFIX: &str = "**";

/// Check whether a string carries glob magic characters
pub fn has_magic(pattern: &str) -> bool {
    pattern.contains(MAGIC_CHARS)
}

/// Check whether a pattern is an exclusion (`!pattern`)
pub fn is_negated(pattern: &str) -> bool {
    pattern.starts_with('!')
}

/// Render a path with `/` separators
pub fn to_slash(path: &Path) -> String {
    let s = path.to_string_lossy();
    if cfg!(windows) {
        s.replace('\\', "/")
    } else {
        s.into_owned()
    }
}

/// Lexically normalize a path: drop `.` components and fold `..` into the parent.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() && !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Resolve a path against the current directory and normalize it.
pub fn absolutize(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return normalize(path);
    }
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/"));
    normalize(&cwd.join(path))
}

/// Normalize a `/`-separated pattern string without touching glob syntax.
fn normalize_pattern(pattern: &str) -> String {
    let absolute = pattern.starts_with('/');
    let mut segments: Vec<&str> = Vec::new();
    for segment in pattern.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.last().is_some_and(|s| *s != "..") {
                    segments.pop();
                } else if !absolute {
                    segments.push("..");
                }
            }
            other => segments.push(other),
        }
    }
    let joined = segments.join("/");
    if absolute {
        format!("/{}", joined)
    } else {
        joined
    }
}

/// Resolve a pattern against the current directory.
///
/// Exclusions that start with `**` stay relative so they match at any depth.
pub fn absolutize_pattern(pattern: &str) -> String {
    if let Some(inner) = pattern.strip_prefix('!') {
        if inner.starts_with("**") {
            return pattern.to_string();
        }
        return format!("!{}", absolutize_pattern(inner));
    }
    let slashed = pattern.replace('\\', "/");
    if slashed.starts_with('/') || Path::new(pattern).is_absolute() {
        return normalize_pattern(&slashed);
    }
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/"));
    normalize_pattern(&format!("{}/{}", to_slash(&cwd), slashed))
}

/// Literal segments of a pattern, up to (not including) the first magic segment.
fn literal_segments(pattern: &str) -> Vec<&str> {
    pattern
        .split('/')
        .take_while(|segment| !has_magic(segment))
        .filter(|segment| !segment.is_empty())
        .collect()
}

/// Find the literal root shared by one or more patterns.
///
/// Exclusions never widen the root and are skipped. When the computed root
/// exists as a directory it is returned as-is, an existing file yields its
/// parent directory, and a root that does not exist is returned unchanged.
pub fn get_common_path<I, P>(patterns: I) -> PathBuf
where
    I: IntoIterator<Item = P>,
    P: AsRef<str>,
{
    let mut common: Option<Vec<String>> = None;

    for pattern in patterns {
        let pattern = pattern.as_ref();
        if is_negated(pattern) {
            continue;
        }
        let absolute = absolutize_pattern(pattern);
        let segments: Vec<String> = literal_segments(&absolute)
            .into_iter()
            .map(str::to_string)
            .collect();

        common = Some(match common {
            None => segments,
            Some(current) => current
                .into_iter()
                .zip(segments)
                .take_while(|(a, b)| a == b)
                .map(|(a, _)| a)
                .collect(),
        });
    }

    let joined = common.unwrap_or_default().join("/");
    let root = if cfg!(windows) {
        PathBuf::from(joined)
    } else {
        PathBuf::from(format!("/{}", joined))
    };

    match fs::metadata(&root) {
        Ok(meta) if meta.is_file() => root.parent().map(Path::to_path_buf).unwrap_or(root),
        _ => root,
    }
}

/// The result of turning a literal path into something glob-matchable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Globified {
    /// A single pattern: the unchanged input, or a directory plus `/**`.
    Pattern(String),
    /// A path that does not exist yet: match it as a file or as a directory.
    FileOrTree { file: String, tree: String },
}

impl Globified {
    /// Flatten into the list of patterns to match against.
    pub fn into_patterns(self) -> Vec<String> {
        match self {
            Globified::Pattern(pattern) => vec![pattern],
            Globified::FileOrTree { file, tree } => vec![file, tree],
        }
    }
}

fn with_recursive_suffix(path: &str) -> String {
    format!("{}/{}", path.trim_end_matches('/'), RECURSIVE_SUFFIX)
}

/// Turn a literal path into a pattern that matches what it denotes.
///
/// Pattern input and existing files come back unchanged, existing directories
/// get a recursive suffix, and missing paths yield both forms. An existing path
/// that is neither a file nor a directory fails with `Error::InvalidTarget`.
pub fn globify(path: &str) -> Result<Globified> {
    if has_magic(path) {
        return Ok(Globified::Pattern(path.to_string()));
    }
    let Ok(meta) = fs::metadata(path) else {
        return Ok(Globified::FileOrTree {
            file: path.to_string(),
            tree: with_recursive_suffix(path),
        });
    };
    if meta.is_file() {
        Ok(Globified::Pattern(path.to_string()))
    } else if meta.is_dir() {
        Ok(Globified::Pattern(with_recursive_suffix(path)))
    } else {
        Err(Error::InvalidTarget {
            path: path.to_string(),
        })
    }
}

/// Express `path` relative to `root`, walking up with `..` when it lies outside.
pub fn relative_to(path: &Path, root: &Path) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix(root) {
        return stripped.to_path_buf();
    }
    let path_parts: Vec<Component> = path.components().collect();
    let root_parts: Vec<Component> = root.components().collect();
    let shared = path_parts
        .iter()
        .zip(&root_parts)
        .take_while(|(a, b)| a == b)
        .count();

    let mut out = PathBuf::new();
    for _ in shared..root_parts.len() {
        out.push("..");
    }
    for part in &path_parts[shared..] {
        out.push(part.as_os_str());
    }
    out
}
