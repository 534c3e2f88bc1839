//! Glob matching against disk and against single paths
//!
//! A [`PatternSet`] is an ordered list of patterns where `!`-prefixed entries
//! remove what earlier entries matched. The same predicate drives both disk
//! expansion ([`PatternSet::expand`]) and staged-tree filtering
//! ([`PatternSet::is_match`]).

use crate::error::Result;
use crate::path::{absolutize_pattern, has_magic, to_slash};
use globset::{GlobBuilder, GlobMatcher};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Options forwarded to glob matching
///
/// Directories are never returned as matches regardless of these options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GlobOptions {
    /// Extra exclusion patterns applied after the main patterns
    #[serde(default)]
    pub ignore: Vec<String>,
    /// Let wildcards match names starting with `.`
    #[serde(default)]
    pub dot: bool,
    #[serde(default)]
    pub case_insensitive: bool,
}

impl GlobOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an exclusion pattern
    pub fn ignore(mut self, pattern: impl Into<String>) -> Self {
        self.ignore.push(pattern.into());
        self
    }

    pub fn dot(mut self, dot: bool) -> Self {
        self.dot = dot;
        self
    }
}

#[derive(Debug, Clone)]
struct Rule {
    negated: bool,
    literal: bool,
    /// Literal directory prefix of the pattern
    base: String,
    /// The pattern names dot-prefixed segments explicitly
    allows_dot: bool,
    matcher: GlobMatcher,
}

/// Escape the literal segments of `pattern` so only wildcard segments are
/// interpreted by the glob engine.
fn escape_literal_segments(pattern: &str) -> String {
    pattern
        .split('/')
        .map(|segment| {
            if has_magic(segment) {
                segment.to_string()
            } else {
                globset::escape(segment)
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn compile(pattern: &str, options: &GlobOptions) -> Result<GlobMatcher> {
    Ok(GlobBuilder::new(&escape_literal_segments(pattern))
        .literal_separator(true)
        .case_insensitive(options.case_insensitive)
        .build()?
        .compile_matcher())
}

impl Rule {
    fn new(raw: &str, options: &GlobOptions) -> Result<Self> {
        let absolute = absolutize_pattern(raw);
        let (negated, pattern) = match absolute.strip_prefix('!') {
            Some(inner) => (true, inner.to_string()),
            None => (false, absolute),
        };

        let segments: Vec<&str> = pattern.split('/').collect();
        let literal_len = segments.iter().take_while(|s| !has_magic(s)).count();
        let base = segments[..literal_len].join("/");
        let allows_dot = segments[literal_len..]
            .iter()
            .any(|s| s.starts_with('.') && *s != "." && *s != "..");

        Ok(Self {
            negated,
            literal: !has_magic(&pattern),
            base,
            allows_dot,
            matcher: compile(&pattern, options)?,
        })
    }

    /// Whether a wildcard would have to match a dot-prefixed name
    fn hides_dotfile(&self, path: &str) -> bool {
        if self.literal || self.allows_dot {
            return false;
        }
        path.strip_prefix(&self.base)
            .unwrap_or(path)
            .split('/')
            .any(|segment| segment.starts_with('.'))
    }
}

/// An ordered set of include and `!exclude` patterns
#[derive(Debug, Clone)]
pub struct PatternSet {
    rules: Vec<Rule>,
    ignore: Vec<GlobMatcher>,
    dot: bool,
}

impl PatternSet {
    /// Compile patterns; relative patterns are resolved against the current directory.
    pub fn new<I, P>(patterns: I, options: &GlobOptions) -> Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<str>,
    {
        let rules = patterns
            .into_iter()
            .map(|p| Rule::new(p.as_ref(), options))
            .collect::<Result<Vec<_>>>()?;

        let ignore = options
            .ignore
            .iter()
            .map(|p| {
                let pattern = if p.starts_with("**") {
                    p.clone()
                } else {
                    absolutize_pattern(p)
                };
                compile(&pattern, options)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            rules,
            ignore,
            dot: options.dot,
        })
    }

    /// Check a single path against the whole set, exclusions included.
    pub fn is_match(&self, path: &Path) -> bool {
        let path = to_slash(path);
        let mut matched = false;

        for rule in &self.rules {
            if rule.negated {
                if matched && rule.matcher.is_match(&path) {
                    matched = false;
                }
            } else if !matched
                && rule.matcher.is_match(&path)
                && (self.dot || !rule.hides_dotfile(&path))
            {
                matched = true;
            }
        }

        matched && !self.ignore.iter().any(|m| m.is_match(&path))
    }

    /// Expand the set against disk, returning matching files in path order.
    pub fn expand(&self) -> Result<Vec<PathBuf>> {
        let mut found = BTreeSet::new();

        for rule in self.rules.iter().filter(|r| !r.negated) {
            let base = PathBuf::from(if rule.base.is_empty() {
                "/"
            } else {
                rule.base.as_str()
            });

            if rule.literal {
                if base.is_file() && self.is_match(&base) {
                    found.insert(base);
                }
                continue;
            }
            if !base.is_dir() {
                continue;
            }

            let skip_hidden = !self.dot && !rule.allows_dot;
            let walker = WalkDir::new(&base)
                .follow_links(true)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(|entry| {
                    !(skip_hidden
                        && entry.depth() > 0
                        && entry.file_name().to_string_lossy().starts_with('.'))
                });

            for entry in walker {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(err) if err.loop_ancestor().is_some() => {
                        log::warn!("Skipping symlink loop: {}", err);
                        continue;
                    }
                    Err(err) => return Err(err.into()),
                };
                if entry.file_type().is_file() && self.is_match(entry.path()) {
                    found.insert(entry.into_path());
                }
            }
        }

        Ok(found.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn fixture() -> TempDir {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("nested")).unwrap();
        fs::create_dir_all(root.join(".hidden")).unwrap();
        fs::write(root.join("file-a.txt"), "foo\n").unwrap();
        fs::write(root.join("file-b.txt"), "bar\n").unwrap();
        fs::write(root.join("file-tpl.txt"), "<%= name %>\n").unwrap();
        fs::write(root.join("nested/file.txt"), "nested\n").unwrap();
        fs::write(root.join(".hidden/secret.txt"), "secret\n").unwrap();
        temp
    }

    fn rel(temp: &TempDir, paths: &[PathBuf]) -> Vec<String> {
        paths
            .iter()
            .map(|p| to_slash(p.strip_prefix(temp.path()).unwrap()))
            .collect()
    }

    #[test]
    fn test_expand_recursive() {
        let temp = fixture();
        let pattern = format!("{}/**", to_slash(temp.path()));
        let set = PatternSet::new([pattern], &GlobOptions::default()).unwrap();

        assert_eq!(
            rel(&temp, &set.expand().unwrap()),
            vec!["file-a.txt", "file-b.txt", "file-tpl.txt", "nested/file.txt"]
        );
    }

    #[test]
    fn test_expand_with_dot() {
        let temp = fixture();
        let pattern = format!("{}/**", to_slash(temp.path()));
        let set = PatternSet::new([pattern], &GlobOptions::new().dot(true)).unwrap();

        assert!(rel(&temp, &set.expand().unwrap()).contains(&".hidden/secret.txt".to_string()));
    }

    #[test]
    fn test_expand_with_negation() {
        let temp = fixture();
        let pattern = format!("{}/**", to_slash(temp.path()));
        let set = PatternSet::new([pattern, "!**/*tpl*".to_string()], &GlobOptions::default())
            .unwrap();

        assert_eq!(
            rel(&temp, &set.expand().unwrap()),
            vec!["file-a.txt", "file-b.txt", "nested/file.txt"]
        );
    }

    #[test]
    fn test_expand_with_braces() {
        let temp = fixture();
        let pattern = format!("{}/file-{{a,b}}.txt", to_slash(temp.path()));
        let set = PatternSet::new([pattern], &GlobOptions::default()).unwrap();

        assert_eq!(
            rel(&temp, &set.expand().unwrap()),
            vec!["file-a.txt", "file-b.txt"]
        );
    }

    #[test]
    fn test_expand_with_ignore_option() {
        let temp = fixture();
        let root = to_slash(temp.path());
        let options = GlobOptions::new().ignore(format!("{}/nested/**", root));
        let set = PatternSet::new([format!("{}/**", root)], &options).unwrap();

        assert!(!rel(&temp, &set.expand().unwrap()).contains(&"nested/file.txt".to_string()));
    }

    #[test]
    fn test_expand_literal_file() {
        let temp = fixture();
        let file = to_slash(&temp.path().join("file-a.txt"));
        let set = PatternSet::new([file], &GlobOptions::default()).unwrap();
        assert_eq!(rel(&temp, &set.expand().unwrap()), vec!["file-a.txt"]);
    }

    #[test]
    fn test_expand_missing_base() {
        let set = PatternSet::new(["/definitely/not/here/**"], &GlobOptions::default()).unwrap();
        assert!(set.expand().unwrap().is_empty());
    }

    #[test]
    fn test_star_does_not_cross_separator() {
        let set = PatternSet::new(["/a/*.txt"], &GlobOptions::default()).unwrap();
        assert!(set.is_match(Path::new("/a/x.txt")));
        assert!(!set.is_match(Path::new("/a/b/x.txt")));
    }

    #[test]
    fn test_negation_order_matters() {
        let set = PatternSet::new(["/a/**", "!/a/b/**", "/a/b/keep.txt"], &GlobOptions::default())
            .unwrap();
        assert!(set.is_match(Path::new("/a/x.txt")));
        assert!(!set.is_match(Path::new("/a/b/drop.txt")));
        assert!(set.is_match(Path::new("/a/b/keep.txt")));
    }

    #[test]
    fn test_only_negations_match_nothing() {
        let set = PatternSet::new(["!**/*.txt"], &GlobOptions::default()).unwrap();
        assert!(!set.is_match(Path::new("/a/x.rs")));
    }

    #[test]
    fn test_case_insensitive() {
        let options = GlobOptions {
            case_insensitive: true,
            ..GlobOptions::default()
        };
        let set = PatternSet::new(["/a/*.TXT"], &options).unwrap();
        assert!(set.is_match(Path::new("/a/x.txt")));
    }

    #[test]
    fn test_literal_path_with_glob_characters() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a}b.txt"), "brace\n").unwrap();
        fs::write(temp.path().join("c[1].txt"), "bracket\n").unwrap();
        let brace = to_slash(&temp.path().join("a}b.txt"));
        let set = PatternSet::new([brace], &GlobOptions::default()).unwrap();

        assert_eq!(rel(&temp, &set.expand().unwrap()), vec!["a}b.txt"]);
        assert!(set.is_match(&temp.path().join("a}b.txt")));

        let pattern = format!("{}/*.txt", to_slash(temp.path()));
        let set = PatternSet::new([pattern, "!**/a}b.txt".to_string()], &GlobOptions::default())
            .unwrap();
        assert_eq!(rel(&temp, &set.expand().unwrap()), vec!["c[1].txt"]);
    }

    #[test]
    #[cfg(unix)]
    fn test_expand_skips_symlink_loops() {
        let temp = fixture();
        std::os::unix::fs::symlink(temp.path(), temp.path().join("nested/loop")).unwrap();
        let pattern = format!("{}/**/*.txt", to_slash(temp.path()));
        let set = PatternSet::new([pattern], &GlobOptions::default()).unwrap();

        assert_eq!(
            rel(&temp, &set.expand().unwrap()),
            vec!["file-a.txt", "file-b.txt", "file-tpl.txt", "nested/file.txt"]
        );
    }
}
