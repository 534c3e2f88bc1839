//! Staged file tree: an in-memory view of files that have not been persisted
//!
//! The copy engine only talks to the [`StagedTree`] trait. [`MemStore`] is the
//! in-process implementation: reads fall through to disk for files that were
//! never staged, writes stay in memory until [`crate::commit::commit`] runs.

use crate::error::{Error, Result};
use crate::path::absolutize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Filesystem metadata carried alongside staged contents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    /// Permission bits (e.g. `0o644`)
    pub permissions: u32,
    /// Modification time of the file the contents came from
    pub modified_time: SystemTime,
}

impl FileStat {
    /// Snapshot the metadata of an on-disk file
    pub fn from_metadata(meta: &fs::Metadata) -> Self {
        #[cfg(unix)]
        let permissions = {
            use std::os::unix::fs::PermissionsExt;
            meta.permissions().mode() & 0o7777
        };
        #[cfg(not(unix))]
        let permissions = if meta.permissions().readonly() {
            0o444
        } else {
            0o644
        };

        Self {
            permissions,
            modified_time: meta.modified().unwrap_or_else(|_| SystemTime::now()),
        }
    }
}

impl Default for FileStat {
    fn default() -> Self {
        Self {
            permissions: 0o644,
            modified_time: SystemTime::now(),
        }
    }
}

/// Lifecycle of a staged entry relative to what is on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileState {
    /// Same as disk (read through, or already committed)
    Unmodified,
    /// Written in memory, nothing at this path on disk yet
    New,
    /// Written in memory over an existing file
    Modified,
    /// Marked for removal at commit
    Deleted,
}

/// A file as seen through the staged tree
#[derive(Debug, Clone)]
pub struct StagedFile {
    /// Absolute, normalized path
    pub path: PathBuf,
    /// File content as bytes; `None` once deleted
    pub contents: Option<Vec<u8>>,
    /// Metadata to apply at commit
    pub stat: Option<FileStat>,
    pub state: FileState,
}

impl StagedFile {
    pub fn is_deleted(&self) -> bool {
        self.state == FileState::Deleted
    }

    /// Get file size in bytes
    pub fn size(&self) -> usize {
        self.contents.as_ref().map_or(0, Vec::len)
    }

    /// Whether this entry still has to be written or removed on disk
    pub fn is_pending(&self) -> bool {
        self.state != FileState::Unmodified
    }
}

/// Capabilities the copy engine needs from a staged file tree
pub trait StagedTree {
    /// Look up a file, reading through to disk when it is not staged.
    ///
    /// Returns `None` when nothing exists at `path`; a staged deletion is
    /// returned as a file in the `Deleted` state.
    fn get(&self, path: &Path) -> Result<Option<StagedFile>>;

    /// Stage new contents (and optionally metadata) for `path`
    fn set(&mut self, path: &Path, contents: Vec<u8>, stat: Option<FileStat>) -> Result<()>;

    /// Whether a non-deleted file exists at `path`, staged or on disk
    fn exists(&self, path: &Path) -> bool;

    /// Visit every tracked entry, deleted ones included
    fn each(&self, visit: &mut dyn FnMut(&StagedFile));

    /// Mark `path` for deletion
    fn delete(&mut self, path: &Path) -> Result<()>;
}

/// In-memory staged tree keyed by absolute path
#[derive(Debug, Clone, Default)]
pub struct MemStore {
    files: BTreeMap<PathBuf, StagedFile>,
}

fn load_from_disk(path: &Path) -> Result<Option<StagedFile>> {
    match fs::metadata(path) {
        Ok(meta) if meta.is_file() => {
            let contents = fs::read(path).map_err(|e| Error::Filesystem {
                message: format!("Failed to read '{}': {}", path.display(), e),
            })?;
            Ok(Some(StagedFile {
                path: path.to_path_buf(),
                contents: Some(contents),
                stat: Some(FileStat::from_metadata(&meta)),
                state: FileState::Unmodified,
            }))
        }
        _ => Ok(None),
    }
}

impl MemStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a staged entry without reading through to disk
    pub fn staged<P: AsRef<Path>>(&self, path: P) -> Option<&StagedFile> {
        self.files.get(&absolutize(path.as_ref()))
    }

    /// Iterate over all tracked entries in path order
    pub fn files(&self) -> impl Iterator<Item = &StagedFile> {
        self.files.values()
    }

    /// Entries that commit would write or remove
    pub fn pending(&self) -> Vec<&StagedFile> {
        self.files.values().filter(|f| f.is_pending()).collect()
    }

    /// Get the number of tracked entries
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if nothing is tracked
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Record that `path` now matches disk
    pub(crate) fn mark_committed(&mut self, path: &Path) {
        match self.files.get(path).map(|f| f.state) {
            Some(FileState::Deleted) => {
                self.files.remove(path);
            }
            Some(_) => {
                if let Some(file) = self.files.get_mut(path) {
                    file.state = FileState::Unmodified;
                }
            }
            None => {}
        }
    }
}

impl StagedTree for MemStore {
    fn get(&self, path: &Path) -> Result<Option<StagedFile>> {
        let path = absolutize(path);
        if let Some(file) = self.files.get(&path) {
            return Ok(Some(file.clone()));
        }
        load_from_disk(&path)
    }

    fn set(&mut self, path: &Path, contents: Vec<u8>, stat: Option<FileStat>) -> Result<()> {
        let path = absolutize(path);
        let state = match self.files.get(&path).map(|f| f.state) {
            Some(FileState::New) => FileState::New,
            Some(FileState::Deleted) | None if !path.is_file() => FileState::New,
            _ => FileState::Modified,
        };
        self.files.insert(
            path.clone(),
            StagedFile {
                path,
                contents: Some(contents),
                stat,
                state,
            },
        );
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        let path = absolutize(path);
        match self.files.get(&path) {
            Some(file) => !file.is_deleted(),
            None => path.is_file(),
        }
    }

    fn each(&self, visit: &mut dyn FnMut(&StagedFile)) {
        for file in self.files.values() {
            visit(file);
        }
    }

    fn delete(&mut self, path: &Path) -> Result<()> {
        let path = absolutize(path);
        if !self.exists(&path) {
            return Err(Error::Filesystem {
                message: format!("File not found: {}", path.display()),
            });
        }
        let stat = self.files.get(&path).and_then(|f| f.stat);
        self.files.insert(
            path.clone(),
            StagedFile {
                path,
                contents: None,
                stat,
                state: FileState::Deleted,
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_set_and_get_staged_file() {
        let mut store = MemStore::new();
        store
            .set(Path::new("/virtual/a.txt"), b"hello".to_vec(), None)
            .unwrap();

        let file = store.get(Path::new("/virtual/a.txt")).unwrap().unwrap();
        assert_eq!(file.contents.as_deref(), Some(&b"hello"[..]));
        assert_eq!(file.state, FileState::New);
        assert!(store.exists(Path::new("/virtual/a.txt")));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_get_reads_through_to_disk() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("disk.txt");
        fs::write(&path, "on disk").unwrap();

        let store = MemStore::new();
        let file = store.get(&path).unwrap().unwrap();
        assert_eq!(file.contents.as_deref(), Some(&b"on disk"[..]));
        assert_eq!(file.state, FileState::Unmodified);
        assert!(file.stat.is_some());
        // Reading does not start tracking the file
        assert!(store.is_empty());
    }

    #[test]
    fn test_get_missing_file() {
        let store = MemStore::new();
        assert!(store.get(Path::new("/no/such/file")).unwrap().is_none());
        assert!(!store.exists(Path::new("/no/such/file")));
    }

    #[test]
    fn test_directories_do_not_exist_as_files() {
        let temp = TempDir::new().unwrap();
        let store = MemStore::new();
        assert!(!store.exists(temp.path()));
        assert!(store.get(temp.path()).unwrap().is_none());
    }

    #[test]
    fn test_set_over_disk_file_is_modified() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("existing.txt");
        fs::write(&path, "old").unwrap();

        let mut store = MemStore::new();
        store.set(&path, b"new".to_vec(), None).unwrap();
        assert_eq!(store.staged(&path).unwrap().state, FileState::Modified);
    }

    #[test]
    fn test_delete_marks_file() {
        let mut store = MemStore::new();
        store
            .set(Path::new("/virtual/a.txt"), b"a".to_vec(), None)
            .unwrap();
        store.delete(Path::new("/virtual/a.txt")).unwrap();

        assert!(!store.exists(Path::new("/virtual/a.txt")));
        let file = store.get(Path::new("/virtual/a.txt")).unwrap().unwrap();
        assert!(file.is_deleted());
        assert!(file.contents.is_none());
    }

    #[test]
    fn test_delete_missing_file_errors() {
        let mut store = MemStore::new();
        let result = store.delete(Path::new("/virtual/missing.txt"));
        assert!(matches!(result, Err(Error::Filesystem { .. })));
    }

    #[test]
    fn test_paths_are_normalized() {
        let mut store = MemStore::new();
        store
            .set(Path::new("/virtual/./dir/../a.txt"), b"a".to_vec(), None)
            .unwrap();
        assert!(store.exists(Path::new("/virtual/a.txt")));
    }

    #[test]
    fn test_each_visits_all_entries() {
        let mut store = MemStore::new();
        store.set(Path::new("/v/a.txt"), b"a".to_vec(), None).unwrap();
        store.set(Path::new("/v/b.txt"), b"b".to_vec(), None).unwrap();
        store.delete(Path::new("/v/b.txt")).unwrap();

        let mut seen = Vec::new();
        store.each(&mut |file| seen.push(file.path.clone()));
        assert_eq!(
            seen,
            vec![PathBuf::from("/v/a.txt"), PathBuf::from("/v/b.txt")]
        );
    }
}
