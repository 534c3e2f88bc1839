//! Shared test utilities for integration and E2E tests.
//!
//! This module provides a fixture tree and helper functions to reduce
//! duplication across test files.
//!
//! ## Usage
//!
//! Add `mod common;` to your test file, then use the helpers:
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = Fixtures::new();
//!     let source = fixture.path("file-a.txt");
//!     // ... test code
//! }
//! ```

use assert_fs::prelude::*;
use assert_fs::TempDir;
use std::path::{Path, PathBuf};

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    #[allow(unused_imports)]
    pub use assert_cmd::cargo::cargo_bin_cmd;
    #[allow(unused_imports)]
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::{slash, Fixtures, BINARY_FIXTURE};
}

/// A few bytes of a PNG header; not valid UTF-8 and contains NUL
pub const BINARY_FIXTURE: &[u8] = &[
    0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0x00, 0x00, 0x0d, b'I', b'H', b'D',
    b'R', b'<', b'%', b'=', b' ', b'x', b' ', b'%', b'>',
];

/// Fixture tree used by the copy tests
///
/// ```text
/// fixtures/
///   file-a.txt                    "foo\n"
///   file-b.txt                    "bar\n"
///   file-tpl.txt                  "<%= name %>\n"
///   file-tpl-custom-delimiter.txt "<?= name ?>\n"
///   file-tpl-partial.txt          includes partial.txt
///   partial.txt                   "partial: <%= name %>\n"
///   nested/file.txt               "nested\n"
///   nested/deep/file.txt          "deep\n"
///   executable.sh                 mode 0o755 on unix
///   image.png                     BINARY_FIXTURE
/// ```
pub struct Fixtures {
    pub temp: TempDir,
}

#[allow(dead_code)]
impl Fixtures {
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let root = temp.child("fixtures");
        root.child("file-a.txt").write_str("foo\n").unwrap();
        root.child("file-b.txt").write_str("bar\n").unwrap();
        root.child("file-tpl.txt").write_str("<%= name %>\n").unwrap();
        root.child("file-tpl-custom-delimiter.txt")
            .write_str("<?= name ?>\n")
            .unwrap();
        root.child("file-tpl-partial.txt")
            .write_str("<%- include('partial.txt') %>")
            .unwrap();
        root.child("partial.txt")
            .write_str("partial: <%= name %>\n")
            .unwrap();
        root.child("nested/file.txt").write_str("nested\n").unwrap();
        root.child("nested/deep/file.txt").write_str("deep\n").unwrap();
        root.child("executable.sh")
            .write_str("#!/bin/sh\necho hi\n")
            .unwrap();
        root.child("image.png").write_binary(BINARY_FIXTURE).unwrap();

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let script = root.child("executable.sh");
            std::fs::set_permissions(script.path(), std::fs::Permissions::from_mode(0o755))
                .unwrap();
        }

        Self { temp }
    }

    /// Root of the fixture tree
    pub fn root(&self) -> PathBuf {
        self.temp.path().join("fixtures")
    }

    /// Path of a fixture file
    pub fn path(&self, name: &str) -> PathBuf {
        self.root().join(name)
    }

    /// A location under the temp dir outside the fixture tree
    pub fn out(&self, name: &str) -> PathBuf {
        self.temp.path().join("out").join(name)
    }

    /// A glob pattern rooted at the fixture tree
    pub fn pattern(&self, pattern: &str) -> String {
        format!("{}/{}", slash(&self.root()), pattern)
    }
}

/// Render a path with `/` separators, for building glob patterns
pub fn slash(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
