//! # Copy Plan Schema and Parsing
//!
//! This module defines the `.stagecopy.yaml` plan file: an ordered list of
//! copy and template steps that `stagecopy apply` runs against one staged
//! tree before committing it.
//!
//! ```yaml
//! - copy:
//!     from: assets/**
//!     to: dist/assets
//!     ignore: ["**/*.psd"]
//! - template:
//!     from: [pages/*.html, "!pages/draft-*"]
//!     to: dist/<%= lang %>
//!     context:
//!       lang: en
//!       title: Home
//!     delimiter: "?"
//! ```
//!
//! Relative paths and patterns are resolved against the directory holding the
//! plan file. Exclusions starting with `**` are kept as-is so they still
//! match at any depth.

use crate::editor::{CopyOptions, Editor};
use crate::error::{Error, Result};
use crate::matcher::GlobOptions;
use crate::path::{is_negated, to_slash};
use crate::source::Source;
use crate::store::StagedTree;
use crate::template::TemplateSettings;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

/// File name looked up by `stagecopy apply` when no `--config` is given
pub const DEFAULT_PLAN_FILE: &str = ".stagecopy.yaml";

/// A `from` entry: one path or pattern, or a list of patterns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SourceSpec {
    One(String),
    Many(Vec<String>),
}

impl SourceSpec {
    /// Resolve relative entries against `base`
    pub fn to_source(&self, base: &Path) -> Source {
        match self {
            SourceSpec::One(path) => Source::Single(rebase(path, base)),
            SourceSpec::Many(patterns) => {
                Source::Many(patterns.iter().map(|p| rebase(p, base)).collect())
            }
        }
    }
}

/// Options shared by both step kinds
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MatchOptions {
    /// Extra exclusion patterns
    #[serde(default)]
    pub ignore: Vec<String>,
    /// Succeed without writing anything when nothing matches
    #[serde(default)]
    pub ignore_no_match: bool,
    /// Let wildcards match dot-prefixed names
    #[serde(default)]
    pub dot: bool,
}

impl MatchOptions {
    fn glob_options(&self, base: &Path) -> GlobOptions {
        GlobOptions {
            ignore: self.ignore.iter().map(|p| rebase(p, base)).collect(),
            dot: self.dot,
            ..GlobOptions::default()
        }
    }
}

/// Copy step configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CopyStep {
    pub from: SourceSpec,
    pub to: String,
    #[serde(flatten)]
    pub matching: MatchOptions,
    /// Data for expanding template tags in destination paths
    #[serde(default)]
    pub context: Option<Value>,
}

/// Template step configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TemplateStep {
    pub from: SourceSpec,
    pub to: String,
    #[serde(flatten)]
    pub matching: MatchOptions,
    /// Data available to templates; an empty object when omitted
    #[serde(default)]
    pub context: Option<Value>,
    /// Tag character (`%` in `<%= x %>`)
    #[serde(default)]
    pub delimiter: Option<char>,
    #[serde(default)]
    pub open_delimiter: Option<char>,
    #[serde(default)]
    pub close_delimiter: Option<char>,
}

impl TemplateStep {
    /// Delimiters for this step, falling back to `<`, `%` and `>`
    pub fn settings(&self) -> TemplateSettings {
        let defaults = TemplateSettings::default();
        TemplateSettings {
            open_delimiter: self.open_delimiter.unwrap_or(defaults.open_delimiter),
            delimiter: self.delimiter.unwrap_or(defaults.delimiter),
            close_delimiter: self.close_delimiter.unwrap_or(defaults.close_delimiter),
        }
    }
}

/// One step of a plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Step {
    /// Copy files verbatim, optionally expanding destination paths
    Copy { copy: CopyStep },
    /// Copy files rendering their contents as templates
    Template { template: TemplateStep },
}

impl Step {
    /// Run this step against `editor`, resolving relative paths against `base`
    pub fn run<S: StagedTree>(&self, editor: &mut Editor<S>, base: &Path) -> Result<()> {
        match self {
            Step::Copy { copy } => {
                let mut options = CopyOptions::new()
                    .glob_options(copy.matching.glob_options(base))
                    .ignore_no_match(copy.matching.ignore_no_match);
                if let Some(context) = &copy.context {
                    options = options.context(context.clone());
                }
                editor.copy(
                    copy.from.to_source(base),
                    rebase(&copy.to, base),
                    &options,
                )
            }
            Step::Template { template } => {
                let options = CopyOptions::new()
                    .glob_options(template.matching.glob_options(base))
                    .ignore_no_match(template.matching.ignore_no_match)
                    .template_settings(template.settings());
                editor.copy_tpl(
                    template.from.to_source(base),
                    rebase(&template.to, base),
                    template.context.as_ref(),
                    &options,
                )
            }
        }
    }

    /// Short description used in logs and dry-run output
    pub fn describe(&self) -> String {
        match self {
            Step::Copy { copy } => format!("copy {} -> {}", describe_source(&copy.from), copy.to),
            Step::Template { template } => format!(
                "template {} -> {}",
                describe_source(&template.from),
                template.to
            ),
        }
    }
}

fn describe_source(spec: &SourceSpec) -> String {
    match spec {
        SourceSpec::One(path) => path.clone(),
        SourceSpec::Many(patterns) => format!("[{}]", patterns.join(", ")),
    }
}

/// The complete plan: steps run in file order
pub type Plan = Vec<Step>;

/// Resolve a relative path or pattern against `base`
fn rebase(pattern: &str, base: &Path) -> String {
    if is_negated(pattern) {
        return format!("!{}", rebase(&pattern[1..], base));
    }
    if pattern.starts_with("**") || Path::new(pattern).is_absolute() || pattern.starts_with('/') {
        return pattern.to_string();
    }
    let base = to_slash(base);
    if base.is_empty() {
        return pattern.to_string();
    }
    format!("{}/{}", base.trim_end_matches('/'), pattern)
}

/// Parses a YAML string into a `Plan`.
pub fn parse(yaml_content: &str) -> Result<Plan> {
    let value: serde_yaml::Value = serde_yaml::from_str(yaml_content)?;
    if value.is_null() {
        return Ok(Vec::new());
    }
    let serde_yaml::Value::Sequence(entries) = value else {
        return Err(Error::ConfigParse {
            message: "a plan must be a list of steps".to_string(),
        });
    };

    entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| {
            serde_yaml::from_value::<Step>(entry).map_err(|e| Error::ConfigParse {
                message: format!(
                    "step {} is not a valid copy or template step: {}",
                    index + 1,
                    e
                ),
            })
        })
        .collect()
}

/// Parse a `Plan` from a YAML file path
pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Plan> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| Error::Filesystem {
        message: format!("Failed to read plan '{}': {}", path.display(), e),
    })?;
    parse(&content)
}
