//! Resource room operations: `{room}/{category}/` folders of pages.
//!
//! Rooms are user-named top-level folders; categories are their children.
//! Git drops empty directories, so every category carries an `index.html`
//! marker from the moment it is created. Resource folders have no order
//! lists and no navigation links, which keeps these operations to a single
//! commit each.

use tracing::info;

use crate::ops::SiteOps;
use crate::paths::{self, PathKind};
use crate::storage::{CommitMessage, FileHandle, StoreError, StoreResult, Transform};

impl SiteOps {
    /// Create a category inside a resource room by writing its marker file.
    ///
    /// The room folder itself comes into being with its first category.
    /// Fails with a conflict if the room name is reserved or the category
    /// already exists.
    pub fn create_resource_category(
        &self,
        room: &str,
        category: &str,
        marker_content: &[u8],
    ) -> StoreResult<FileHandle> {
        paths::validate_new_folder(room)?;
        paths::validate_segment(category)?;

        let marker = paths::category_index_path(room, category);
        let handle = self.files.create(&marker, marker_content)?;
        info!(room, category, "resource category created");
        Ok(handle)
    }

    /// Rename a category, moving every page under it in one commit.
    pub fn rename_resource_category(
        &self,
        room: &str,
        old_category: &str,
        new_category: &str,
    ) -> StoreResult<()> {
        paths::validate_segment(room)?;
        paths::validate_segment(old_category)?;
        paths::validate_segment(new_category)?;

        let old_dir = format!("{}/{}", room, old_category);
        let new_dir = format!("{}/{}", room, new_category);

        let pointer = self.trees.pointer()?;
        let flat = self.trees.load(&pointer, true)?;
        if !flat.any_live_under(&old_dir) {
            return Err(StoreError::FolderNotFound(old_dir));
        }
        if flat.any_live_under(&new_dir) {
            return Err(StoreError::PathExists(new_dir));
        }

        let renamed = flat.apply(&[Transform::rename_prefix(&old_dir, &new_dir)])?;
        self.trees
            .commit(renamed, &pointer, &CommitMessage::rename(&old_dir, &new_dir))?;

        info!(room, from = old_category, to = new_category, "resource category renamed");
        Ok(())
    }

    /// Delete a category and everything in it, marker included.
    pub fn delete_resource_category(&self, room: &str, category: &str) -> StoreResult<()> {
        paths::validate_segment(room)?;
        paths::validate_segment(category)?;

        let dir = format!("{}/{}", room, category);
        let pointer = self.trees.pointer()?;
        let flat = self.trees.load(&pointer, true)?;
        if !flat.any_live_under(&dir) {
            return Err(StoreError::FolderNotFound(dir));
        }

        let pruned = flat.apply(&[Transform::delete_prefix(&dir)])?;
        self.trees
            .commit(pruned, &pointer, &CommitMessage::delete_folder(&dir))?;

        info!(room, category, "resource category deleted");
        Ok(())
    }

    /// Create a page inside an existing category.
    ///
    /// The category must have been created through
    /// [`SiteOps::create_resource_category`]; its marker file is the
    /// existence check, so pages never land in folders the store doesn't
    /// know about.
    pub fn create_resource_page(
        &self,
        room: &str,
        category: &str,
        name: &str,
        content: &[u8],
    ) -> StoreResult<FileHandle> {
        let kind = PathKind::ResourcePage {
            room: room.to_string(),
            category: category.to_string(),
        };
        let path = paths::resolve(&kind, name)?;

        let marker = paths::category_index_path(room, category);
        if !self.files.exists(&marker)? {
            return Err(StoreError::FolderNotFound(format!("{}/{}", room, category)));
        }

        self.files.create(&path, content)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tempfile::TempDir;

    use crate::ops::SiteOps;
    use crate::storage::{BranchName, LocalHost};

    fn setup() -> (TempDir, SiteOps) {
        let dir = TempDir::new().unwrap();
        let branch = BranchName::staging();
        let host = Arc::new(LocalHost::init(dir.path(), &branch).unwrap());
        (dir, SiteOps::new(host, branch))
    }

    #[test]
    fn test_create_category_writes_marker() {
        let (_dir, ops) = setup();
        ops.create_resource_category("resources", "reports", b"<html/>")
            .unwrap();
        assert!(ops.files().exists("resources/reports/index.html").unwrap());
    }

    #[test]
    fn test_reserved_room_name_conflicts() {
        let (_dir, ops) = setup();
        let result = ops.create_resource_category("images", "reports", b"");
        assert!(result.unwrap_err().is_conflict());
    }

    #[test]
    fn test_duplicate_category_conflicts() {
        let (_dir, ops) = setup();
        ops.create_resource_category("resources", "reports", b"")
            .unwrap();
        let result = ops.create_resource_category("resources", "reports", b"");
        assert!(result.unwrap_err().is_conflict());
    }

    #[test]
    fn test_page_requires_category_marker() {
        let (_dir, ops) = setup();

        let result = ops.create_resource_page("resources", "reports", "annual.md", b"r");
        assert!(result.unwrap_err().is_not_found());

        ops.create_resource_category("resources", "reports", b"")
            .unwrap();
        ops.create_resource_page("resources", "reports", "annual.md", b"r")
            .unwrap();
        assert!(ops.files().exists("resources/reports/annual.md").unwrap());
    }

    #[test]
    fn test_rename_category_moves_pages_and_marker() {
        let (_dir, ops) = setup();
        ops.create_resource_category("resources", "reports", b"")
            .unwrap();
        ops.create_resource_page("resources", "reports", "annual.md", b"r")
            .unwrap();

        ops.rename_resource_category("resources", "reports", "filings")
            .unwrap();

        assert!(ops.files().exists("resources/filings/index.html").unwrap());
        assert!(ops.files().exists("resources/filings/annual.md").unwrap());
        assert!(!ops.files().exists("resources/reports/annual.md").unwrap());
    }

    #[test]
    fn test_rename_onto_existing_category_conflicts() {
        let (_dir, ops) = setup();
        ops.create_resource_category("resources", "reports", b"")
            .unwrap();
        ops.create_resource_category("resources", "filings", b"")
            .unwrap();
        let result = ops.rename_resource_category("resources", "reports", "filings");
        assert!(result.unwrap_err().is_conflict());
    }

    #[test]
    fn test_delete_category() {
        let (_dir, ops) = setup();
        ops.create_resource_category("resources", "reports", b"")
            .unwrap();
        ops.create_resource_page("resources", "reports", "annual.md", b"r")
            .unwrap();

        ops.delete_resource_category("resources", "reports").unwrap();

        assert!(!ops.files().exists("resources/reports/index.html").unwrap());
        assert!(!ops.files().exists("resources/reports/annual.md").unwrap());

        let result = ops.delete_resource_category("resources", "reports");
        assert!(result.unwrap_err().is_not_found());
    }
}
