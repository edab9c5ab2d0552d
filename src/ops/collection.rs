//! Collection operations: `_{slug}/` folders with an order-list sidecar and
//! a navigation link.
//!
//! A collection is born with three artifacts: its folder (implied by the
//! sidecar file inside it), the sidecar itself, and a navigation link. The
//! operations here keep the three in step, in that order, per the
//! consistency policy in [`crate::ops`].

use tracing::info;

use crate::ops::SiteOps;
use crate::order::CollectionMeta;
use crate::paths::{self, PathKind};
use crate::storage::{
    CommitMessage, FileHandle, StoreError, StoreResult, Transform,
};

impl SiteOps {
    /// Create a collection from a display title.
    ///
    /// The title is slugified into the folder name: "Press Releases"
    /// becomes `_press-releases/`. Fails with a conflict if the slug is
    /// reserved or the collection already exists. Returns the slug.
    pub fn create_collection(&self, title: &str) -> StoreResult<String> {
        let slug = paths::slugify(title);
        paths::validate_new_folder(&slug)?;

        let meta_path = paths::collection_meta_path(&slug);
        let meta = CollectionMeta::new(&slug);
        let bytes = crate::order::serialize_meta(&meta_path, &meta)?;
        self.files.create(&meta_path, &bytes)?;

        let (mut nav, handle) = self.read_navigation()?;
        nav.add_collection(title, &slug);
        self.write_navigation(&nav, handle.as_ref())?;

        info!(collection = %slug, "collection created");
        Ok(slug)
    }

    /// Rename a collection.
    ///
    /// One tree commit moves every page from `_{old}/` to `_{new}/`, then
    /// the sidecar's `name` field and the navigation link are rewritten.
    /// Fails not-found if the old folder has no content and with a
    /// conflict if the new slug is reserved or occupied.
    pub fn rename_collection(&self, old_slug: &str, new_slug: &str) -> StoreResult<()> {
        paths::validate_segment(old_slug)?;
        paths::validate_new_folder(new_slug)?;

        let old_dir = paths::collection_dir(old_slug);
        let new_dir = paths::collection_dir(new_slug);

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

        // the moved sidecar still names the old slug
        let (meta, handle) = self.orders.read_meta(&new_dir)?;
        let meta = CollectionMeta {
            name: new_slug.to_string(),
            items: meta.items,
        };
        let meta_path = paths::collection_meta_path(new_slug);
        let bytes = crate::order::serialize_meta(&meta_path, &meta)?;
        self.files.update(&meta_path, &bytes, &handle)?;

        let (mut nav, nav_handle) = self.read_navigation()?;
        if nav.rename_collection(old_slug, new_slug) {
            self.write_navigation(&nav, nav_handle.as_ref())?;
        }

        info!(from = %old_slug, to = %new_slug, "collection renamed");
        Ok(())
    }

    /// Delete a collection: one tree commit removes the whole folder, then
    /// the navigation link goes.
    pub fn delete_collection(&self, slug: &str) -> StoreResult<()> {
        paths::validate_segment(slug)?;
        let dir = paths::collection_dir(slug);

        let pointer = self.trees.pointer()?;
        let flat = self.trees.load(&pointer, true)?;
        if !flat.any_live_under(&dir) {
            return Err(StoreError::FolderNotFound(dir));
        }

        let pruned = flat.apply(&[Transform::delete_prefix(&dir)])?;
        self.trees
            .commit(pruned, &pointer, &CommitMessage::delete_folder(&dir))?;

        let (mut nav, handle) = self.read_navigation()?;
        if nav.remove_collection(slug) {
            self.write_navigation(&nav, handle.as_ref())?;
        }

        info!(collection = %slug, "collection deleted");
        Ok(())
    }

    /// Create a page inside a collection and splice it into the collection's
    /// display order.
    pub fn create_collection_page(
        &self,
        collection: &str,
        subfolder: Option<&str>,
        name: &str,
        content: &[u8],
    ) -> StoreResult<FileHandle> {
        let kind = PathKind::CollectionPage {
            collection: collection.to_string(),
            subfolder: subfolder.map(str::to_string),
        };
        let path = paths::resolve(&kind, name)?;
        let handle = self.files.create(&path, content)?;

        let item = match subfolder {
            Some(sub) => format!("{}/{}", sub, name),
            None => name.to_string(),
        };
        self.order_add_if_tracked(&paths::collection_dir(collection), &item)?;

        Ok(handle)
    }

    /// Delete a collection page and drop it from the display order.
    pub fn delete_collection_page(
        &self,
        collection: &str,
        subfolder: Option<&str>,
        name: &str,
        handle: &FileHandle,
    ) -> StoreResult<()> {
        let kind = PathKind::CollectionPage {
            collection: collection.to_string(),
            subfolder: subfolder.map(str::to_string),
        };
        let path = paths::resolve(&kind, name)?;
        self.files.delete(&path, handle)?;

        let item = match subfolder {
            Some(sub) => format!("{}/{}", sub, name),
            None => name.to_string(),
        };
        self.order_remove_if_tracked(&paths::collection_dir(collection), &item)
    }

    /// Move pages between two collections in one tree commit, then sync both
    /// order lists.
    pub fn move_pages(
        &self,
        from_collection: &str,
        to_collection: &str,
        names: &[&str],
    ) -> StoreResult<()> {
        paths::validate_segment(from_collection)?;
        paths::validate_segment(to_collection)?;

        let from_dir = paths::collection_dir(from_collection);
        let to_dir = paths::collection_dir(to_collection);
        self.batch_move(&from_dir, &to_dir, names)?;

        for name in names {
            self.order_remove_if_tracked(&from_dir, name)?;
            self.order_add_if_tracked(&to_dir, name)?;
        }
        Ok(())
    }

    /// Replace a collection's display order wholesale.
    pub fn reorder_collection(&self, collection: &str, order: Vec<String>) -> StoreResult<()> {
        paths::validate_segment(collection)?;
        self.orders.reorder(&paths::collection_dir(collection), order)
    }
}
