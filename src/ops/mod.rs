//! Directory Policy Layer: domain operations over the storage primitives.
//!
//! [`SiteOps`] composes the Tree Engine, the Single-File Service and the
//! Order-List Synchronizer into the operations a CMS front end calls:
//! create/rename/delete collections, move pages, manage resource rooms and
//! media, keep the navigation menu current.
//!
//! # Consistency
//!
//! A domain operation is an ordered sequence of commits. Structural changes
//! go through one Tree Engine commit, but the metadata rewrites that follow
//! (collection sidecar, navigation) are separate commits with their own
//! optimistic checks. There is no rollback: a failure partway through
//! surfaces to the caller as-is and leaves the repository in the
//! intermediate state, every partial write preserved as a real commit.
//! Callers retry or run a corrective operation; concurrent writers lose
//! with a conflict error, never with silent data loss.

mod collection;
mod media;
mod navigation;
mod resource;

pub use media::MediaKind;
pub use navigation::{NavLink, Navigation};

use std::sync::Arc;

use tracing::info;

use crate::order::OrderSync;
use crate::paths;
use crate::storage::{
    BranchName, CommitMessage, FileHandle, FileService, GitHost, RepoPointer, StoreError,
    StoreResult, Transform, TreeEngine,
};

/// Domain operations for one site, bound to one branch of one repository.
pub struct SiteOps {
    pub(crate) trees: TreeEngine,
    pub(crate) files: FileService,
    pub(crate) orders: OrderSync,
    pub(crate) branch: BranchName,
}

impl SiteOps {
    pub fn new(host: Arc<dyn GitHost>, branch: BranchName) -> Self {
        Self {
            trees: TreeEngine::new(host.clone(), branch.clone()),
            files: FileService::new(host.clone(), branch.clone()),
            orders: OrderSync::new(host, branch.clone()),
            branch,
        }
    }

    /// single-file access for leaf edits the policy layer doesn't wrap
    pub fn files(&self) -> &FileService {
        &self.files
    }

    /// the branch every operation targets
    pub fn branch(&self) -> &BranchName {
        &self.branch
    }

    /// Create a standalone page under `pages/`.
    pub fn create_page(&self, name: &str, content: &[u8]) -> StoreResult<FileHandle> {
        let path = paths::resolve(&paths::PathKind::Page, name)?;
        self.files.create(&path, content)
    }

    /// Move files between two folders in one commit.
    ///
    /// Every source path is rewritten in the same tree, so history shows
    /// one logical change and a failure moves either all files or none.
    /// Returns the new branch head.
    pub(crate) fn batch_move(
        &self,
        from_dir: &str,
        to_dir: &str,
        names: &[&str],
    ) -> StoreResult<RepoPointer> {
        if names.is_empty() {
            return self.trees.pointer();
        }
        for name in names {
            paths::validate_relpath(name)?;
        }

        let pointer = self.trees.pointer()?;
        let flat = self.trees.load(&pointer, true)?;

        let mut transforms = Vec::with_capacity(names.len());
        for name in names {
            let src = format!("{}/{}", from_dir, name);
            if !flat.contains_live(&src) {
                return Err(StoreError::PathNotFound(src));
            }
            let dst = format!("{}/{}", to_dir, name);
            transforms.push(Transform::rename_prefix(src, dst));
        }

        // a move landing on an occupied destination fails the duplicate
        // scan inside apply
        let moved = flat.apply(&transforms)?;
        let new_pointer = self.trees.commit(
            moved,
            &pointer,
            &CommitMessage::move_batch(names.len(), from_dir, to_dir),
        )?;

        info!(from = from_dir, to = to_dir, count = names.len(), "files moved");
        Ok(new_pointer)
    }

    /// order-list maintenance that tolerates folders without a sidecar
    pub(crate) fn order_remove_if_tracked(&self, folder: &str, item: &str) -> StoreResult<()> {
        match self.orders.remove_item(folder, item) {
            Err(e) if e.is_not_found() => Ok(()),
            other => other,
        }
    }

    pub(crate) fn order_add_if_tracked(&self, folder: &str, item: &str) -> StoreResult<()> {
        match self.orders.add_item(folder, item) {
            Err(e) if e.is_not_found() => Ok(()),
            other => other,
        }
    }
}
