//! Order lists: explicit display order for pages inside a folder.
//!
//! Git directories are unordered, so every collection folder carries a
//! sidecar `collection.yml` listing its page names in display order.
//! Pages grouped in a subfolder appear as `subfolder/name` compound
//! entries and stay contiguous. The sidecar is read, mutated in memory and
//! written back with the handle from the read; it is a separate commit
//! from the tree change it mirrors, which is the store's accepted
//! consistency gap (see [`crate::ops`]).

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::paths;
use crate::storage::{BranchName, FileHandle, FileService, GitHost, StoreError, StoreResult};

/// the persisted form of a collection's sidecar file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionMeta {
    /// the collection's own slug; rewritten when the collection is renamed
    pub name: String,
    /// page names (or `subfolder/name` compounds) in display order
    #[serde(default)]
    pub items: Vec<String>,
}

impl CollectionMeta {
    /// a fresh sidecar for a new collection
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            items: Vec::new(),
        }
    }
}

/// An ordered list of child names for one folder.
///
/// Invariant: every page present under the folder appears exactly once;
/// subfolder membership is a `subfolder/name` compound entry.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderList {
    pub folder_path: String,
    pub items: Vec<String>,
}

impl OrderList {
    pub fn new(folder_path: impl Into<String>, items: Vec<String>) -> Self {
        Self {
            folder_path: folder_path.into(),
            items,
        }
    }

    /// Splice an item into position.
    ///
    /// A `subfolder/name` compound goes directly after the last existing
    /// item of the same subfolder, keeping groups contiguous; anything else
    /// appends at the end. Inserting a present item is a no-op.
    pub fn insert_item(&mut self, item: &str) {
        if self.items.iter().any(|i| i == item) {
            return;
        }

        let position = match item.split_once('/') {
            Some((subfolder, _)) => {
                let prefix = format!("{}/", subfolder);
                self.items
                    .iter()
                    .rposition(|i| i.starts_with(&prefix))
                    .map(|i| i + 1)
            }
            None => None,
        };

        match position {
            Some(at) => self.items.insert(at, item.to_string()),
            None => self.items.push(item.to_string()),
        }
    }

    /// Remove an item; absence is not an error. Returns whether anything
    /// changed.
    pub fn remove_item(&mut self, item: &str) -> bool {
        match self.items.iter().position(|i| i == item) {
            Some(at) => {
                self.items.remove(at);
                true
            }
            None => false,
        }
    }

    /// Rename an item in place, preserving its position. Returns whether
    /// anything changed.
    pub fn rename_item(&mut self, old: &str, new: &str) -> bool {
        match self.items.iter().position(|i| i == old) {
            Some(at) => {
                self.items[at] = new.to_string();
                true
            }
            None => false,
        }
    }
}

/// Keeps order-list sidecars in sync with the real tree contents.
///
/// Invoked by the policy layer in addition to - never instead of - the
/// tree or file write that changes the folder.
pub struct OrderSync {
    files: FileService,
}

impl OrderSync {
    pub fn new(host: Arc<dyn GitHost>, branch: BranchName) -> Self {
        Self {
            files: FileService::new(host, branch),
        }
    }

    /// read and parse a folder's sidecar
    pub fn read_meta(&self, folder_path: &str) -> StoreResult<(CollectionMeta, FileHandle)> {
        let path = format!("{}/{}", folder_path, paths::COLLECTION_META);
        let (bytes, handle) = self.files.read(&path)?;
        let meta = parse_meta(&path, &bytes)?;
        Ok((meta, handle))
    }

    fn write_meta(
        &self,
        folder_path: &str,
        meta: &CollectionMeta,
        handle: &FileHandle,
    ) -> StoreResult<FileHandle> {
        let path = format!("{}/{}", folder_path, paths::COLLECTION_META);
        let bytes = serialize_meta(&path, meta)?;
        self.files.update(&path, &bytes, handle)
    }

    /// splice an item into the folder's order
    pub fn add_item(&self, folder_path: &str, item: &str) -> StoreResult<()> {
        let (meta, handle) = self.read_meta(folder_path)?;
        let mut order = OrderList::new(folder_path, meta.items);
        order.insert_item(item);

        let meta = CollectionMeta {
            name: meta.name,
            items: order.items,
        };
        self.write_meta(folder_path, &meta, &handle)?;
        debug!(folder = folder_path, item, "order item added");
        Ok(())
    }

    /// remove an item from the folder's order; a no-op if absent
    pub fn remove_item(&self, folder_path: &str, item: &str) -> StoreResult<()> {
        let (meta, handle) = self.read_meta(folder_path)?;
        let mut order = OrderList::new(folder_path, meta.items);

        if !order.remove_item(item) {
            // nothing to do, and no commit to make
            return Ok(());
        }

        let meta = CollectionMeta {
            name: meta.name,
            items: order.items,
        };
        self.write_meta(folder_path, &meta, &handle)?;
        debug!(folder = folder_path, item, "order item removed");
        Ok(())
    }

    /// rename an item in place
    pub fn rename_item(&self, folder_path: &str, old: &str, new: &str) -> StoreResult<()> {
        let (meta, handle) = self.read_meta(folder_path)?;
        let mut order = OrderList::new(folder_path, meta.items);

        if !order.rename_item(old, new) {
            return Ok(());
        }

        let meta = CollectionMeta {
            name: meta.name,
            items: order.items,
        };
        self.write_meta(folder_path, &meta, &handle)?;
        Ok(())
    }

    /// replace the folder's order wholesale
    pub fn reorder(&self, folder_path: &str, new_order: Vec<String>) -> StoreResult<()> {
        let (meta, handle) = self.read_meta(folder_path)?;
        let meta = CollectionMeta {
            name: meta.name,
            items: new_order,
        };
        self.write_meta(folder_path, &meta, &handle)?;
        debug!(folder = folder_path, "order replaced");
        Ok(())
    }
}

pub(crate) fn parse_meta(path: &str, bytes: &[u8]) -> StoreResult<CollectionMeta> {
    serde_yaml::from_slice(bytes).map_err(|source| StoreError::Metadata {
        path: path.to_string(),
        source,
    })
}

pub(crate) fn serialize_meta(path: &str, meta: &CollectionMeta) -> StoreResult<Vec<u8>> {
    serde_yaml::to_string(meta)
        .map(String::into_bytes)
        .map_err(|source| StoreError::Metadata {
            path: path.to_string(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::LocalHost;
    use tempfile::TempDir;

    fn order(items: &[&str]) -> OrderList {
        OrderList::new("_news", items.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_plain_insert_appends() {
        let mut list = order(&["a.md", "b.md"]);
        list.insert_item("c.md");
        assert_eq!(list.items, vec!["a.md", "b.md", "c.md"]);
    }

    #[test]
    fn test_subfolder_insert_stays_contiguous() {
        let mut list = order(&["a.md", "2024/x.md", "2024/y.md", "b.md"]);
        list.insert_item("2024/z.md");
        assert_eq!(
            list.items,
            vec!["a.md", "2024/x.md", "2024/y.md", "2024/z.md", "b.md"]
        );
    }

    #[test]
    fn test_subfolder_insert_without_group_appends() {
        let mut list = order(&["a.md"]);
        list.insert_item("2024/x.md");
        assert_eq!(list.items, vec!["a.md", "2024/x.md"]);
    }

    #[test]
    fn test_insert_present_item_is_noop() {
        let mut list = order(&["a.md", "b.md"]);
        list.insert_item("a.md");
        assert_eq!(list.items, vec!["a.md", "b.md"]);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut list = order(&["a.md", "b.md"]);
        assert!(list.remove_item("a.md"));
        assert!(!list.remove_item("a.md"));
        assert_eq!(list.items, vec!["b.md"]);
    }

    #[test]
    fn test_rename_preserves_position() {
        let mut list = order(&["a.md", "b.md", "c.md"]);
        assert!(list.rename_item("b.md", "renamed.md"));
        assert_eq!(list.items, vec!["a.md", "renamed.md", "c.md"]);
    }

    #[test]
    fn test_meta_round_trip() {
        let meta = CollectionMeta {
            name: "news".to_string(),
            items: vec!["a.md".to_string(), "2024/b.md".to_string()],
        };
        let bytes = serialize_meta("_news/collection.yml", &meta).unwrap();
        let parsed = parse_meta("_news/collection.yml", &bytes).unwrap();
        assert_eq!(parsed, meta);
    }

    #[test]
    fn test_items_default_when_missing() {
        let parsed = parse_meta("_news/collection.yml", b"name: news\n").unwrap();
        assert_eq!(parsed.name, "news");
        assert!(parsed.items.is_empty());
    }

    // sync tests against a real local repository

    fn setup() -> (TempDir, FileService, OrderSync) {
        let dir = TempDir::new().unwrap();
        let branch = BranchName::staging();
        let host = Arc::new(LocalHost::init(dir.path(), &branch).unwrap());
        let files = FileService::new(host.clone(), branch.clone());
        let sync = OrderSync::new(host, branch);
        (dir, files, sync)
    }

    fn seed_meta(files: &FileService) {
        let meta = CollectionMeta::new("news");
        let bytes = serialize_meta("_news/collection.yml", &meta).unwrap();
        files.create("_news/collection.yml", &bytes).unwrap();
    }

    #[test]
    fn test_add_and_remove_through_store() {
        let (_dir, files, sync) = setup();
        seed_meta(&files);

        sync.add_item("_news", "a.md").unwrap();
        sync.add_item("_news", "b.md").unwrap();
        let (meta, _) = sync.read_meta("_news").unwrap();
        assert_eq!(meta.items, vec!["a.md", "b.md"]);

        sync.remove_item("_news", "a.md").unwrap();
        // removing again is a quiet no-op
        sync.remove_item("_news", "a.md").unwrap();
        let (meta, _) = sync.read_meta("_news").unwrap();
        assert_eq!(meta.items, vec!["b.md"]);
    }

    #[test]
    fn test_reorder_through_store() {
        let (_dir, files, sync) = setup();
        seed_meta(&files);

        sync.add_item("_news", "a.md").unwrap();
        sync.add_item("_news", "b.md").unwrap();
        sync.reorder("_news", vec!["b.md".to_string(), "a.md".to_string()])
            .unwrap();

        let (meta, _) = sync.read_meta("_news").unwrap();
        assert_eq!(meta.items, vec!["b.md", "a.md"]);
    }

    #[test]
    fn test_missing_sidecar_is_not_found() {
        let (_dir, _files, sync) = setup();
        let result = sync.add_item("_nowhere", "a.md");
        assert!(result.unwrap_err().is_not_found());
    }
}
