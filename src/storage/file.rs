//! Single-File Service: CRUD on one path, one commit per call.
//!
//! Used when an operation touches exactly one blob. The host's
//! path-addressed write API already guarantees atomicity for one file, so
//! these calls bypass the Tree Engine entirely. Every write takes the
//! handle from a prior read as its optimistic-concurrency token; the host
//! enforces the expected-sha check server-side.

use std::sync::Arc;

use tracing::debug;

use crate::storage::error::{StoreError, StoreResult};
use crate::storage::host::{CommitMessage, GitHost};
use crate::storage::types::{BranchName, EntryMode, FileHandle};

/// CRUD on single blobs of one branch.
pub struct FileService {
    host: Arc<dyn GitHost>,
    branch: BranchName,
}

impl FileService {
    pub fn new(host: Arc<dyn GitHost>, branch: BranchName) -> Self {
        Self { host, branch }
    }

    /// the branch every call targets
    pub fn branch(&self) -> &BranchName {
        &self.branch
    }

    /// split a path into (parent dir, file name)
    fn split(path: &str) -> (&str, &str) {
        match path.rsplit_once('/') {
            Some((dir, name)) => (dir, name),
            None => ("", path),
        }
    }

    /// Read a file's content and its concurrency handle.
    ///
    /// Lists the parent folder, locates the child by name, then fetches the
    /// blob by sha. Fails not-found if the folder or the file is absent.
    pub fn read(&self, path: &str) -> StoreResult<(Vec<u8>, FileHandle)> {
        let (dir, name) = Self::split(path);
        let listing = self.host.list_dir(&self.branch, dir)?;

        let entry = listing
            .into_iter()
            .find(|e| e.mode == EntryMode::Blob && e.name == name)
            .ok_or_else(|| StoreError::PathNotFound(path.to_string()))?;

        let content = self.host.get_blob(&entry.sha)?;
        Ok((content, FileHandle::new(path, entry.sha)))
    }

    /// whether a live file exists at `path`
    pub fn exists(&self, path: &str) -> StoreResult<bool> {
        match self.read(path) {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Create a new file. Fails with a conflict if the path already exists.
    pub fn create(&self, path: &str, content: &[u8]) -> StoreResult<FileHandle> {
        let sha = self.host.create_file(
            &self.branch,
            path,
            content,
            &CommitMessage::create(path),
        )?;
        debug!(branch = %self.branch, path, "file created");
        Ok(FileHandle::new(path, sha))
    }

    /// Replace a file's content.
    ///
    /// Writes only if the handle's sha still matches the live file: a
    /// deleted path fails not-found, a changed one fails with a conflict.
    pub fn update(
        &self,
        path: &str,
        content: &[u8],
        handle: &FileHandle,
    ) -> StoreResult<FileHandle> {
        let sha = self.host.update_file(
            &self.branch,
            path,
            content,
            &handle.sha,
            &CommitMessage::update(path),
        )?;
        debug!(branch = %self.branch, path, "file updated");
        Ok(FileHandle::new(path, sha))
    }

    /// Delete a file, with the same optimistic-concurrency contract as
    /// [`FileService::update`].
    pub fn delete(&self, path: &str, handle: &FileHandle) -> StoreResult<()> {
        self.host.delete_file(
            &self.branch,
            path,
            &handle.sha,
            &CommitMessage::delete(path),
        )?;
        debug!(branch = %self.branch, path, "file deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::local::LocalHost;
    use tempfile::TempDir;

    fn setup() -> (TempDir, FileService) {
        let dir = TempDir::new().unwrap();
        let branch = BranchName::staging();
        let host = Arc::new(LocalHost::init(dir.path(), &branch).unwrap());
        let files = FileService::new(host, branch);
        (dir, files)
    }

    #[test]
    fn test_create_read_round_trip() {
        let (_dir, files) = setup();

        let created = files.create("pages/about.md", b"# About").unwrap();
        let (content, read_handle) = files.read("pages/about.md").unwrap();

        assert_eq!(content, b"# About");
        assert_eq!(read_handle, created);
    }

    #[test]
    fn test_read_missing_folder_and_file() {
        let (_dir, files) = setup();

        let result = files.read("pages/missing.md");
        assert!(result.unwrap_err().is_not_found());

        files.create("pages/a.md", b"a").unwrap();
        let result = files.read("pages/missing.md");
        assert!(result.unwrap_err().is_not_found());
    }

    #[test]
    fn test_create_conflict() {
        let (_dir, files) = setup();

        files.create("pages/a.md", b"a").unwrap();
        let result = files.create("pages/a.md", b"again");
        assert!(result.unwrap_err().is_conflict());
    }

    #[test]
    fn test_update_with_stale_handle() {
        let (_dir, files) = setup();

        let h1 = files.create("pages/a.md", b"v1").unwrap();
        files.update("pages/a.md", b"v2", &h1).unwrap();

        // the same stale handle again must be a conflict
        let result = files.update("pages/a.md", b"v3", &h1);
        assert!(result.unwrap_err().is_conflict());
    }

    #[test]
    fn test_update_after_delete_is_not_found() {
        let (_dir, files) = setup();

        // client A reads, client B deletes, client A writes with its old
        // handle: never silently succeeds
        let h1 = files.create("pages/a.md", b"v1").unwrap();
        let (_, h_b) = files.read("pages/a.md").unwrap();
        files.delete("pages/a.md", &h_b).unwrap();

        let result = files.update("pages/a.md", b"v2", &h1);
        assert!(result.unwrap_err().is_not_found());
    }

    #[test]
    fn test_exists() {
        let (_dir, files) = setup();
        assert!(!files.exists("pages/a.md").unwrap());
        files.create("pages/a.md", b"a").unwrap();
        assert!(files.exists("pages/a.md").unwrap());
    }

    #[test]
    fn test_root_level_file() {
        let (_dir, files) = setup();

        files.create("index.md", b"home").unwrap();
        let (content, _) = files.read("index.md").unwrap();
        assert_eq!(content, b"home");
    }
}
