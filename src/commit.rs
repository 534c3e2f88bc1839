//! Persisting the staged tree to disk
//!
//! Nothing in the copy engine touches physical storage for staged files.
//! This is the separate, explicit step that does.
//!
//! ## Process
//!
//! 1.  **Iterate Files**: Every pending entry of the `MemStore` is visited in
//!     path order.
//!
//! 2.  **Create Directories**: For each written file, any missing parent
//!     directories are created recursively.
//!
//! 3.  **Write Content**: The staged bytes are written to disk.
//!
//! 4.  **Set Permissions**: On Unix-like systems, the staged permission bits
//!     (copied from the source file by the copy engine) are applied.
//!
//! 5.  **Remove Deleted Files**: Entries marked deleted are removed from disk.
//!
//! Committed entries are reset to `Unmodified`; deleted ones stop being tracked.

use std::fs;
use std::io;

use crate::error::{Error, Result};
use crate::store::{FileState, MemStore};

/// Counts of what a commit did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitSummary {
    pub written: usize,
    pub deleted: usize,
}

/// Write every pending entry of the store to disk
pub fn commit(store: &mut MemStore) -> Result<CommitSummary> {
    let mut summary = CommitSummary::default();
    let pending: Vec<_> = store.pending().into_iter().cloned().collect();

    for file in pending {
        let full_path = &file.path;

        if file.state == FileState::Deleted {
            match fs::remove_file(full_path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(Error::Filesystem {
                        message: format!("Failed to delete '{}': {}", full_path.display(), e),
                    });
                }
            }
            log::debug!("deleted {}", full_path.display());
            summary.deleted += 1;
            store.mark_committed(full_path);
            continue;
        }

        let Some(contents) = &file.contents else {
            continue;
        };

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::Filesystem {
                message: format!("Failed to create directory '{}': {}", parent.display(), e),
            })?;
        }

        fs::write(full_path, contents).map_err(|e| Error::Filesystem {
            message: format!("Failed to write file '{}': {}", full_path.display(), e),
        })?;

        // Set permissions on Unix-like systems
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(stat) = file.stat {
                let perms = fs::Permissions::from_mode(stat.permissions);
                fs::set_permissions(full_path, perms).map_err(|e| Error::Filesystem {
                    message: format!(
                        "Failed to set permissions on '{}': {}",
                        full_path.display(),
                        e
                    ),
                })?;
            }
        }

        log::debug!("wrote {}", full_path.display());
        summary.written += 1;
        store.mark_committed(full_path);
    }

    log::info!(
        "committed {} file(s), deleted {} file(s)",
        summary.written,
        summary.deleted
    );
    Ok(summary)
}
