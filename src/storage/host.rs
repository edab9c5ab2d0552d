//! The host seam: every remote Git operation the store needs.
//!
//! The store never talks to a Git host directly; it goes through [`GitHost`],
//! which models the narrow object API of a hosting provider (trees, blobs,
//! commits, refs) plus the path-addressed contents surface used for
//! single-file writes. Each method is one remote round-trip with no partial
//! result.
//!
//! The crate ships one implementation, [`crate::storage::LocalHost`], backed
//! by a local repository. An HTTP-backed host plugs in through the same
//! trait; transport failures surface as [`StoreError::Transport`] either way.
//!
//! [`StoreError::Transport`]: crate::storage::StoreError::Transport

use chrono::{DateTime, Utc};

use crate::storage::error::StoreResult;
use crate::storage::types::{
    BranchName, CommitId, EntryMode, ObjectSha, RepoPointer, TreeEntry, TreeId,
};

/// one child of a directory listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub mode: EntryMode,
    pub sha: ObjectSha,
}

/// information about a commit, for audit trails
#[derive(Debug, Clone)]
pub struct CommitInfo {
    pub id: CommitId,
    pub tree: TreeId,
    pub parents: Vec<CommitId>,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl CommitInfo {
    /// get the first (or only) parent
    pub fn first_parent(&self) -> Option<&CommitId> {
        self.parents.first()
    }

    /// get a short summary of the commit (first line of message)
    pub fn summary(&self) -> &str {
        self.message.lines().next().unwrap_or(&self.message)
    }
}

/// Remote Git object access.
///
/// Writes always target a named branch; reads are addressed by object id or
/// by branch + path. The contents-style methods (`create_file`, `update_file`,
/// `delete_file`) each perform one atomic single-blob commit with the host's
/// own expected-sha check, which is what gives the Single-File Service its
/// stale-write detection.
pub trait GitHost: Send + Sync {
    /// resolve a branch ref to its current head
    fn resolve_ref(&self, branch: &BranchName) -> StoreResult<RepoPointer>;

    /// list a tree; recursive listing returns blob leaves with
    /// path-qualified names (directory entries are elided)
    fn get_tree(&self, tree: &TreeId, recursive: bool) -> StoreResult<Vec<TreeEntry>>;

    /// write a new tree on top of `base`; entries with a null sha delete
    /// their path
    fn create_tree(&self, base: Option<&TreeId>, entries: &[TreeEntry]) -> StoreResult<TreeId>;

    /// create a commit with one parent
    fn create_commit(&self, tree: &TreeId, parent: &CommitId, message: &str)
        -> StoreResult<CommitId>;

    /// compare-and-swap the branch ref; fails with a conflict if the ref no
    /// longer points at `expected`
    fn update_ref(&self, branch: &BranchName, expected: &CommitId, new: &CommitId)
        -> StoreResult<()>;

    /// fetch one blob's raw bytes
    fn get_blob(&self, sha: &ObjectSha) -> StoreResult<Vec<u8>>;

    /// write one blob, returning its content address
    fn create_blob(&self, content: &[u8]) -> StoreResult<ObjectSha>;

    /// list the direct children of a directory (empty path = repo root)
    fn list_dir(&self, branch: &BranchName, dir: &str) -> StoreResult<Vec<DirEntry>>;

    /// create a file at a path that must not exist yet; one commit
    fn create_file(
        &self,
        branch: &BranchName,
        path: &str,
        content: &[u8],
        message: &str,
    ) -> StoreResult<ObjectSha>;

    /// replace a file's content, only if its live sha still matches
    /// `expected`; one commit
    fn update_file(
        &self,
        branch: &BranchName,
        path: &str,
        content: &[u8],
        expected: &ObjectSha,
        message: &str,
    ) -> StoreResult<ObjectSha>;

    /// delete a file, only if its live sha still matches `expected`; one
    /// commit
    fn delete_file(
        &self,
        branch: &BranchName,
        path: &str,
        expected: &ObjectSha,
        message: &str,
    ) -> StoreResult<()>;

    /// fetch commit metadata
    fn commit_info(&self, id: &CommitId) -> StoreResult<CommitInfo>;
}

/// message formatting for store-generated commits
pub struct CommitMessage;

impl CommitMessage {
    /// format a message for a file creation
    pub fn create(path: &str) -> String {
        format!("[create] {}", path)
    }

    /// format a message for a file update
    pub fn update(path: &str) -> String {
        format!("[update] {}", path)
    }

    /// format a message for a file deletion
    pub fn delete(path: &str) -> String {
        format!("[delete] {}", path)
    }

    /// format a message for a folder rename
    pub fn rename(from: &str, to: &str) -> String {
        format!("[rename] {} -> {}", from, to)
    }

    /// format a message for a folder deletion
    pub fn delete_folder(folder: &str) -> String {
        format!("[delete folder] {}", folder)
    }

    /// format a message for a batched move
    pub fn move_batch(count: usize, from: &str, to: &str) -> String {
        format!("[move] {} file(s) {} -> {}", count, from, to)
    }
}
