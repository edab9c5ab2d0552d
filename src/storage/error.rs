//! Storage layer error types
//!
//! All errors that can occur during store operations are defined here.
//! We use `thiserror` for ergonomic error definition and better messages.
//!
//! Callers that translate errors to HTTP statuses should branch on
//! [`StoreError::kind`] rather than on individual variants: the four kinds
//! (not-found, conflict, invalid-name, transport) are the stable taxonomy,
//! the variants carry diagnostics.

use thiserror::Error;

use crate::storage::types::InvalidNameError;

/// coarse classification of a store error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// referenced path/folder does not exist remotely at call time
    NotFound,
    /// naming collision, stale concurrency token, or protected-name violation
    Conflict,
    /// a supplied name was rejected before reaching the host
    InvalidName,
    /// the host is unreachable or returned an unexpected result
    Transport,
}

/// the main error type for store operations
#[derive(Debug, Error)]
pub enum StoreError {
    /// error from the underlying Git library
    #[error("git error: {0}")]
    Git(#[from] git2::Error),

    /// the requested path was not found
    #[error("path not found: {0}")]
    PathNotFound(String),

    /// the requested folder was not found
    #[error("folder not found: {0}")]
    FolderNotFound(String),

    /// the specified branch/ref was not found
    #[error("ref not found: {0}")]
    RefNotFound(String),

    /// the commit was not found
    #[error("commit not found: {0}")]
    CommitNotFound(String),

    /// create or rename landed on an already-occupied path
    #[error("path already exists: {0}")]
    PathExists(String),

    /// the optimistic-concurrency token no longer matches the live blob
    #[error("stale handle for {path}: expected {expected}, found {actual}")]
    StaleHandle {
        path: String,
        expected: String,
        actual: String,
    },

    /// the branch ref moved since the pointer was taken
    #[error("branch {branch} moved: expected {expected}, now {actual}")]
    RefMoved {
        branch: String,
        expected: String,
        actual: String,
    },

    /// a tree transformation produced two entries at the same path
    #[error("duplicate path after transform: {0}")]
    DuplicatePath(String),

    /// a protected top-level directory name was used
    #[error("'{0}' is a reserved folder name")]
    ReservedName(String),

    /// a supplied name failed validation
    #[error("invalid name: {0}")]
    InvalidName(#[from] InvalidNameError),

    /// a metadata blob (order list, navigation) failed to parse or serialize
    #[error("corrupted metadata at {path}: {source}")]
    Metadata {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    /// the host returned an unexpected status
    #[error("transport error: {0}")]
    Transport(String),

    /// internal error that shouldn't happen
    #[error("internal error: {0}")]
    Internal(String),
}

impl StoreError {
    /// classify this error into the caller-facing taxonomy
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::PathNotFound(_)
            | StoreError::FolderNotFound(_)
            | StoreError::RefNotFound(_)
            | StoreError::CommitNotFound(_) => ErrorKind::NotFound,

            StoreError::PathExists(_)
            | StoreError::StaleHandle { .. }
            | StoreError::RefMoved { .. }
            | StoreError::DuplicatePath(_)
            | StoreError::ReservedName(_) => ErrorKind::Conflict,

            StoreError::InvalidName(_) => ErrorKind::InvalidName,

            StoreError::Git(_)
            | StoreError::Metadata { .. }
            | StoreError::Transport(_)
            | StoreError::Internal(_) => ErrorKind::Transport,
        }
    }

    /// check if this error indicates the resource doesn't exist
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// check if this error is a conflict
    pub fn is_conflict(&self) -> bool {
        self.kind() == ErrorKind::Conflict
    }

    /// check if this error is recoverable by re-reading and retrying
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            StoreError::RefMoved { .. } | StoreError::StaleHandle { .. }
        )
    }
}

/// result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let not_found = StoreError::PathNotFound("pages/a.md".into());
        assert!(not_found.is_not_found());
        assert!(!not_found.is_conflict());

        let conflict = StoreError::PathExists("pages/a.md".into());
        assert!(!conflict.is_not_found());
        assert!(conflict.is_conflict());
        assert!(!conflict.is_retriable());

        let reserved = StoreError::ReservedName("images".into());
        assert_eq!(reserved.kind(), ErrorKind::Conflict);
    }

    #[test]
    fn test_stale_handle_is_retriable() {
        let stale = StoreError::StaleHandle {
            path: "pages/a.md".into(),
            expected: "aaaa".into(),
            actual: "bbbb".into(),
        };
        assert!(stale.is_conflict());
        assert!(stale.is_retriable());
    }
}
