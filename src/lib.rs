//! # Stagecopy Library
//!
//! This library copies files and templates into a staged, not-yet-persisted
//! file tree. Sources are resolved from paths, glob patterns, or ordered
//! pattern lists (with `!exclusions`), against both the disk and whatever is
//! already staged. Results stay in memory until an explicit commit writes
//! them out.
//!
//! ## Quick Example
//!
//! ```
//! use stagecopy::{CopyOptions, Editor};
//! use serde_json::json;
//!
//! let mut editor = Editor::new();
//! editor.write("/virtual/src/hello.txt", "Hello <%= name %>").unwrap();
//!
//! // Staged files are valid sources, nothing touches the disk
//! editor
//!     .copy_tpl(
//!         "/virtual/src/hello.txt",
//!         "/virtual/out/hello.txt",
//!         Some(&json!({"name": "world"})),
//!         &CopyOptions::default(),
//!     )
//!     .unwrap();
//!
//! assert_eq!(editor.read("/virtual/out/hello.txt").unwrap(), "Hello world");
//! ```
//!
//! ## Core Concepts
//!
//! - **Staged tree (`store`)**: the `StagedTree` trait and its in-memory
//!   implementation `MemStore`; reads fall through to disk.
//! - **Path resolution (`path`)**: `globify` and `get_common_path`.
//! - **Matching (`matcher`, `source`)**: glob expansion with ordered
//!   exclusions, merged with staged matches.
//! - **Destinations (`destination`)**: identity vs. root-relative mapping and
//!   destination path templating.
//! - **Contents (`pipeline`, `template`)**: pass-through, caller transforms,
//!   or EJS-style template rendering with includes.
//! - **Orchestration (`editor`)**: `copy`, `copy_async` and `copy_tpl`.
//! - **Persistence (`commit`)**: writes the staged tree to disk.
//! - **Plans (`config`)**: `.stagecopy.yaml` step lists used by the CLI.

pub mod commit;
pub mod config;
pub mod destination;
pub mod editor;
pub mod error;
pub mod matcher;
pub mod path;
pub mod pipeline;
pub mod source;
pub mod store;
pub mod template;

pub use commit::{commit, CommitSummary};
pub use editor::{CopyOptions, Editor};
pub use error::{Error, Result};
pub use matcher::GlobOptions;
pub use source::Source;
pub use store::{MemStore, StagedTree};
pub use template::TemplateSettings;

#[cfg(test)]
mod path_proptest;
