//! storage layer for gitcms
//!
//! this module turns a remote Git repository's tree/blob/commit/ref graph
//! into a directory-like store. The upper layers (path resolution, order
//! lists, site operations) use this API and never touch a Git host
//! directly.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         SiteOps                             │
//! │        (domain operations: collections, pages, media)       │
//! └─────────────────────────────────────────────────────────────┘
//!                │                                │
//!                ▼                                ▼
//!        ┌──────────────┐                 ┌──────────────┐
//!        │  TreeEngine  │                 │ FileService  │
//!        │ (bulk moves, │                 │ (single-blob │
//!        │  one commit) │                 │   commits)   │
//!        └──────────────┘                 └──────────────┘
//!                │                                │
//!                └───────────────┬────────────────┘
//!                                ▼
//!                        ┌──────────────┐
//!                        │   GitHost    │
//!                        │ (trait seam) │
//!                        └──────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use gitcms::storage::{BranchName, FileService, LocalHost};
//! use std::sync::Arc;
//!
//! let branch = BranchName::staging();
//! let host = Arc::new(LocalHost::open_or_init("./site", &branch)?);
//! let files = FileService::new(host, branch);
//!
//! let handle = files.create("pages/about.md", b"# About us")?;
//! let (content, handle) = files.read("pages/about.md")?;
//! files.update("pages/about.md", b"# About", &handle)?;
//! ```

mod error;
mod file;
mod host;
mod local;
mod tree;
mod types;

// Re-export public API
pub use error::{ErrorKind, StoreError, StoreResult};
pub use file::FileService;
pub use host::{CommitInfo, CommitMessage, DirEntry, GitHost};
pub use local::LocalHost;
pub use tree::{FlatTree, Transform, TreeEngine};
pub use types::{
    BranchName, CommitId, EntryMode, FileHandle, GitSignature, InvalidNameError, ObjectSha,
    RepoPointer, TreeEntry, TreeId,
};
