//! # Error Handling
//!
//! This module defines the centralized error handling mechanism for
//! `stagecopy`. It uses the `thiserror` library to create a single `Error`
//! enum covering every failure mode of copy resolution, content processing,
//! and the staged file tree.
//!
//! ## Key Components
//!
//! - **`Error`**: The main enum. The first three variants form the copy
//!   error taxonomy that callers are expected to match on:
//!   - `SourceNotFound`: source resolution produced zero files.
//!   - `InvalidDestination`: a multi-file copy targets an existing plain file.
//!   - `InvalidTarget`: an existing path is neither a file nor a directory.
//!
//!   The remaining variants cover template rendering, caller transforms,
//!   option validation, the staged tree, and wrapped library errors.
//!
//! - **`Result<T>`**: A type alias for `std::result::Result<T, Error>`.
//!
//! Errors returned by caller-supplied transforms are propagated unmodified:
//! nothing in the orchestrator wraps, retries, or logs them.

use thiserror::Error;

/// Main error type for stagecopy operations
#[derive(Error, Debug)]
pub enum Error {
    /// Source resolution yielded zero files and `ignore_no_match` was not set.
    #[error("Trying to copy from a source that does not exist: {from}")]
    SourceNotFound { from: String },

    /// A copy resolving to several files was pointed at an existing plain file.
    #[error("When copying multiple files, provide a directory as destination: {path}")]
    InvalidDestination { path: String },

    /// An existing path could not be classified as a file or a directory.
    #[error("Only file path or directory path are supported: {path}")]
    InvalidTarget { path: String },

    /// An error occurred during template processing.
    ///
    /// May include the name of the problematic variable when applicable.
    #[error("Template processing error: {message}{}", variable.as_ref().map(|v| format!(" (variable: {})", v)).unwrap_or_default())]
    Template {
        message: String,
        /// The template variable that caused the error, if applicable
        variable: Option<String>,
    },

    /// A caller-supplied content transform failed.
    #[error("Processing failed for {path}: {message}")]
    Process { path: String, message: String },

    /// Options were combined in a way the entry point cannot honor.
    #[error("Invalid copy options: {message}")]
    Options { message: String },

    /// A plan file was valid YAML but not a valid list of steps.
    #[error("Configuration parsing error: {message}")]
    ConfigParse { message: String },

    /// An error occurred with a staged file tree operation.
    #[error("Filesystem operation error: {message}")]
    Filesystem { message: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A JSON error, wrapped from `serde_json::Error`.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A regular expression error, wrapped from `regex::Error`.
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// A glob pattern error, wrapped from `globset::Error`.
    #[error("Glob pattern error: {0}")]
    Glob(#[from] globset::Error),

    /// Directory traversal failed while expanding a pattern.
    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_source_not_found() {
        let error = Error::SourceNotFound {
            from: "/tmp/missing.txt".to_string(),
        };
        let display = format!("{}", error);
        assert!(display.contains("source that does not exist"));
        assert!(display.contains("/tmp/missing.txt"));
    }

    #[test]
    fn test_error_display_invalid_destination() {
        let error = Error::InvalidDestination {
            path: "/out/file.txt".to_string(),
        };
        let display = format!("{}", error);
        assert!(display.contains("provide a directory as destination"));
        assert!(display.contains("/out/file.txt"));
    }

    #[test]
    fn test_error_display_invalid_target() {
        let error = Error::InvalidTarget {
            path: "/dev/null".to_string(),
        };
        assert!(format!("{}", error).contains("/dev/null"));
    }

    #[test]
    fn test_error_template() {
        let error = Error::Template {
            message: "Unterminated tag".to_string(),
            variable: None,
        };
        let display = format!("{}", error);
        assert!(display.contains("Template processing error"));
        assert!(display.contains("Unterminated tag"));
        assert!(!display.contains("variable:"));
    }

    #[test]
    fn test_error_template_with_variable() {
        let error = Error::Template {
            message: "Undefined variable".to_string(),
            variable: Some("name".to_string()),
        };
        let display = format!("{}", error);
        assert!(display.contains("Undefined variable"));
        assert!(display.contains("(variable: name)"));
    }

    #[test]
    fn test_error_process() {
        let error = Error::Process {
            path: "a.txt".to_string(),
            message: "boom".to_string(),
        };
        let display = format!("{}", error);
        assert!(display.contains("a.txt"));
        assert!(display.contains("boom"));
    }

    #[test]
    fn test_error_from_io_error() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let error: Error = io_error.into();
        let display = format!("{}", error);
        assert!(display.contains("I/O error"));
        assert!(display.contains("File not found"));
    }

    #[test]
    fn test_error_from_glob_error() {
        let glob_error = globset::Glob::new("a/{b").unwrap_err();
        let error: Error = glob_error.into();
        assert!(format!("{}", error).contains("Glob pattern error"));
    }

    #[test]
    fn test_error_from_yaml_error() {
        let yaml_str = "invalid: [unclosed";
        let yaml_error = serde_yaml::from_str::<serde_yaml::Value>(yaml_str).unwrap_err();
        let error: Error = yaml_error.into();
        assert!(format!("{}", error).contains("YAML parsing error"));
    }
}
