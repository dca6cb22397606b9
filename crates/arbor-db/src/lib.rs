//! File database for Arbor.
//!
//! The engine reads source text through the [`Database`] trait;
//! [`InMemoryFileStore`] is the implementation used by the CLI loader and by
//! tests. Paths are registered once and keep their [`FileId`] for the life of
//! the store, so handles stay stable across edits.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub use arbor_core::FileId;

/// Minimal query surface needed by hierarchy builds.
///
/// Implementations return raw file text; parsing happens above this layer.
pub trait Database {
    fn file_content(&self, file_id: FileId) -> &str;

    /// Best-effort file path lookup for a `FileId`.
    fn file_path(&self, _file_id: FileId) -> Option<&Path> {
        None
    }

    /// Return all file IDs currently known to the database.
    fn all_file_ids(&self) -> Vec<FileId> {
        Vec::new()
    }

    /// Look up a `FileId` for an already-known path.
    fn file_id(&self, _path: &Path) -> Option<FileId> {
        None
    }
}

/// A small in-memory store for file contents keyed by a compact [`FileId`].
#[derive(Debug, Default)]
pub struct InMemoryFileStore {
    next_file_id: u32,
    path_to_file: HashMap<PathBuf, FileId>,
    file_to_path: HashMap<FileId, PathBuf>,
    files: HashMap<FileId, Arc<String>>,
}

impl InMemoryFileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the id for `path`, minting a fresh one on first sight.
    pub fn file_id_for_path(&mut self, path: impl AsRef<Path>) -> FileId {
        let path = path.as_ref().to_path_buf();
        if let Some(id) = self.path_to_file.get(&path) {
            return *id;
        }

        let id = FileId::from_raw(self.next_file_id);
        self.next_file_id = self.next_file_id.saturating_add(1);
        self.path_to_file.insert(path.clone(), id);
        self.file_to_path.insert(id, path);
        id
    }

    pub fn set_file_text(&mut self, file_id: FileId, text: String) {
        self.files.insert(file_id, Arc::new(text));
    }

    /// Drop the content for `file_id`, keeping the path registration.
    pub fn remove_file_text(&mut self, file_id: FileId) {
        self.files.remove(&file_id);
    }

    pub fn file_text(&self, file_id: FileId) -> Option<&str> {
        self.files.get(&file_id).map(|text| text.as_str())
    }

    pub fn path_for_file(&self, file_id: FileId) -> Option<&Path> {
        self.file_to_path.get(&file_id).map(PathBuf::as_path)
    }
}

impl Database for InMemoryFileStore {
    fn file_content(&self, file_id: FileId) -> &str {
        self.file_text(file_id).unwrap_or("")
    }

    fn file_path(&self, file_id: FileId) -> Option<&Path> {
        self.path_for_file(file_id)
    }

    fn all_file_ids(&self) -> Vec<FileId> {
        let mut ids: Vec<_> = self.files.keys().copied().collect();
        ids.sort_by_key(|id| id.to_raw());
        ids
    }

    fn file_id(&self, path: &Path) -> Option<FileId> {
        self.path_to_file.get(path).copied()
    }
}
