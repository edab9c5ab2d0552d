//! GitCMS - a content store backed by one branch of a Git repository
//!
//! This crate turns a Git branch into a CMS backend. Every edit is a
//! commit, every collection is a directory, and the site's entire editing
//! history is preserved in the repository.
//!
//! # Example
//!
//! ```no_run
//! use gitcms::ops::SiteOps;
//! use gitcms::storage::{BranchName, LocalHost};
//! use std::sync::Arc;
//!
//! let branch = BranchName::staging();
//! let host = Arc::new(LocalHost::open_or_init("./site", &branch).unwrap());
//! let ops = SiteOps::new(host, branch);
//!
//! ops.create_collection("News").unwrap();
//! ops.create_collection_page("news", None, "launch.md", b"# Launch").unwrap();
//! ```

pub mod ops;
pub mod order;
pub mod paths;
pub mod storage;

pub use ops::SiteOps;
pub use storage::{BranchName, ErrorKind, FileHandle, GitHost, LocalHost, StoreError, StoreResult};
