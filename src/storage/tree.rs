//! Tree Engine: whole-tree transformations submitted as one commit.
//!
//! Used whenever an operation must move, rename, or bulk-delete a subtree,
//! or must change many files so that history shows one logical change. The
//! flow is always: load the branch's recursive listing into a [`FlatTree`],
//! apply pure [`Transform`]s in memory, then submit the result as one new
//! tree + commit + ref update. No per-file remote round-trips.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::debug;

use crate::storage::error::{StoreError, StoreResult};
use crate::storage::host::GitHost;
use crate::storage::types::{BranchName, RepoPointer, TreeEntry};

/// a path rewrite or deletion applied to a flat entry list
#[derive(Debug, Clone)]
pub enum Transform {
    /// rewrite every entry whose path equals `from` or starts with
    /// `from + "/"` to start with `to`, leaving deletion sentinels behind
    RenamePrefix { from: String, to: String },
    /// mark every entry at or under `prefix` as deleted
    DeletePrefix(String),
    /// drop entries at exactly these paths (used when the caller is about
    /// to recreate the same logical items under a new identity)
    FilterExclude(BTreeSet<String>),
}

impl Transform {
    pub fn rename_prefix(from: impl Into<String>, to: impl Into<String>) -> Self {
        Transform::RenamePrefix {
            from: from.into(),
            to: to.into(),
        }
    }

    pub fn delete_prefix(prefix: impl Into<String>) -> Self {
        Transform::DeletePrefix(prefix.into())
    }

    pub fn filter_exclude<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Transform::FilterExclude(paths.into_iter().map(Into::into).collect())
    }
}

/// whether `path` is `prefix` itself or nested under it
fn under_prefix(path: &str, prefix: &str) -> bool {
    path == prefix
        || (path.len() > prefix.len()
            && path.starts_with(prefix)
            && path.as_bytes()[prefix.len()] == b'/')
}

/// An in-memory flat entry set keyed by path.
///
/// Invariant: paths are unique. Built for one Tree Engine call and
/// discarded; it never outlives the pointer it was loaded against.
#[derive(Debug, Clone)]
pub struct FlatTree {
    entries: BTreeMap<String, TreeEntry>,
}

impl FlatTree {
    /// build a FlatTree, rejecting duplicate paths
    pub fn from_entries(entries: Vec<TreeEntry>) -> StoreResult<Self> {
        let mut map = BTreeMap::new();
        for entry in entries {
            let path = entry.path.clone();
            if map.insert(path.clone(), entry).is_some() {
                return Err(StoreError::DuplicatePath(path));
            }
        }
        Ok(Self { entries: map })
    }

    /// look up an entry by path
    pub fn get(&self, path: &str) -> Option<&TreeEntry> {
        self.entries.get(path)
    }

    /// whether a live (non-deleted) entry exists at `path`
    pub fn contains_live(&self, path: &str) -> bool {
        self.entries.get(path).is_some_and(|e| !e.is_deleted())
    }

    /// whether any live entry sits at or under `prefix`
    pub fn any_live_under(&self, prefix: &str) -> bool {
        self.entries
            .values()
            .any(|e| !e.is_deleted() && under_prefix(&e.path, prefix))
    }

    /// iterate entries in path order
    pub fn iter(&self) -> impl Iterator<Item = &TreeEntry> {
        self.entries.values()
    }

    /// number of entries, deletion sentinels included
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Apply transformations, producing a new FlatTree.
    ///
    /// Transformations run in order over the full entry list. The result is
    /// scanned for duplicate paths before it is accepted: a rename that
    /// lands on an occupied path fails with a conflict instead of silently
    /// overwriting.
    pub fn apply(&self, transforms: &[Transform]) -> StoreResult<FlatTree> {
        let mut entries: Vec<TreeEntry> = self.entries.values().cloned().collect();

        for transform in transforms {
            entries = match transform {
                Transform::RenamePrefix { from, to } => {
                    let mut next = Vec::with_capacity(entries.len() * 2);
                    for entry in entries {
                        if !entry.is_deleted() && under_prefix(&entry.path, from) {
                            let suffix = &entry.path[from.len()..];
                            let mut renamed = entry.clone();
                            renamed.path = format!("{}{}", to, suffix);
                            next.push(renamed);
                            next.push(TreeEntry::deleted(entry.path, entry.mode));
                        } else {
                            next.push(entry);
                        }
                    }
                    next
                }
                Transform::DeletePrefix(prefix) => entries
                    .into_iter()
                    .map(|entry| {
                        if under_prefix(&entry.path, prefix) {
                            TreeEntry::deleted(entry.path, entry.mode)
                        } else {
                            entry
                        }
                    })
                    .collect(),
                Transform::FilterExclude(paths) => entries
                    .into_iter()
                    .filter(|entry| !paths.contains(&entry.path))
                    .collect(),
            };
        }

        FlatTree::from_entries(entries)
    }

    /// flatten back into an entry list for submission
    pub fn into_entries(self) -> Vec<TreeEntry> {
        self.entries.into_values().collect()
    }
}

/// Loads, transforms and commits whole trees against one branch.
pub struct TreeEngine {
    host: Arc<dyn GitHost>,
    branch: BranchName,
}

impl TreeEngine {
    pub fn new(host: Arc<dyn GitHost>, branch: BranchName) -> Self {
        Self { host, branch }
    }

    /// resolve the branch head into a fresh pointer
    pub fn pointer(&self) -> StoreResult<RepoPointer> {
        self.host.resolve_ref(&self.branch)
    }

    /// fetch the tree the pointer refers to; `recursive` flattens nested
    /// directories into path-qualified blob entries
    pub fn load(&self, pointer: &RepoPointer, recursive: bool) -> StoreResult<FlatTree> {
        let entries = self.host.get_tree(&pointer.tree, recursive)?;
        FlatTree::from_entries(entries)
    }

    /// Submit a FlatTree as one new tree + commit + ref update.
    ///
    /// The new tree is based on the pointer's original tree and the commit's
    /// parent is the pointer's commit; the ref update is a compare-and-swap,
    /// so a writer that lost a race gets a conflict and must re-load.
    pub fn commit(
        &self,
        flat: FlatTree,
        pointer: &RepoPointer,
        message: &str,
    ) -> StoreResult<RepoPointer> {
        let entries = flat.into_entries();
        let new_tree = self.host.create_tree(Some(&pointer.tree), &entries)?;
        let new_commit = self.host.create_commit(&new_tree, &pointer.commit, message)?;
        self.host
            .update_ref(&self.branch, &pointer.commit, &new_commit)?;

        debug!(
            branch = %self.branch,
            commit = %new_commit.short(),
            entries = entries.len(),
            "tree committed"
        );

        Ok(RepoPointer {
            branch: self.branch.clone(),
            commit: new_commit,
            tree: new_tree,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::local::LocalHost;
    use crate::storage::types::{EntryMode, ObjectSha};
    use tempfile::TempDir;

    fn sha(n: u8) -> ObjectSha {
        let hex: String = std::iter::repeat(char::from(b'a' + n % 6)).take(40).collect();
        ObjectSha::from_hex(hex).unwrap()
    }

    fn tree_of(paths: &[&str]) -> FlatTree {
        let entries = paths
            .iter()
            .enumerate()
            .map(|(i, p)| TreeEntry::blob(*p, sha(i as u8)))
            .collect();
        FlatTree::from_entries(entries).unwrap()
    }

    #[test]
    fn test_rename_prefix_invariant() {
        let tree = tree_of(&["_news/a.md", "_news/sub/b.md", "pages/c.md"]);
        let renamed = tree
            .apply(&[Transform::rename_prefix("_news", "_updates")])
            .unwrap();

        // no live entry remains under the old prefix
        assert!(!renamed.any_live_under("_news"));
        // every former entry is reachable under the new prefix with its
        // suffix unchanged
        assert!(renamed.contains_live("_updates/a.md"));
        assert!(renamed.contains_live("_updates/sub/b.md"));
        assert!(renamed.contains_live("pages/c.md"));
        // old paths carry deletion sentinels
        assert!(renamed.get("_news/a.md").unwrap().is_deleted());
        assert!(renamed.get("_news/sub/b.md").unwrap().is_deleted());
    }

    #[test]
    fn test_rename_exact_path() {
        let tree = tree_of(&["pages/a.md", "pages/b.md"]);
        let renamed = tree
            .apply(&[Transform::rename_prefix("pages/a.md", "_news/a.md")])
            .unwrap();

        assert!(renamed.contains_live("_news/a.md"));
        assert!(renamed.get("pages/a.md").unwrap().is_deleted());
        assert!(renamed.contains_live("pages/b.md"));
    }

    #[test]
    fn test_rename_onto_occupied_path_conflicts() {
        let tree = tree_of(&["pages/a.md", "_news/a.md"]);
        let result = tree.apply(&[Transform::rename_prefix("pages/a.md", "_news/a.md")]);
        assert!(matches!(result, Err(StoreError::DuplicatePath(_))));
    }

    #[test]
    fn test_rename_does_not_touch_lookalike_prefix() {
        // "_newsletter" shares a string prefix with "_news" but is a
        // different directory
        let tree = tree_of(&["_news/a.md", "_newsletter/b.md"]);
        let renamed = tree
            .apply(&[Transform::rename_prefix("_news", "_updates")])
            .unwrap();

        assert!(renamed.contains_live("_updates/a.md"));
        assert!(renamed.contains_live("_newsletter/b.md"));
    }

    #[test]
    fn test_delete_prefix_nulls_every_leaf() {
        let tree = tree_of(&["_news/a.md", "_news/sub/b.md", "pages/c.md"]);
        let deleted = tree.apply(&[Transform::delete_prefix("_news")]).unwrap();

        assert!(deleted.get("_news/a.md").unwrap().is_deleted());
        assert!(deleted.get("_news/sub/b.md").unwrap().is_deleted());
        assert!(deleted.contains_live("pages/c.md"));
        assert!(!deleted.any_live_under("_news"));
    }

    #[test]
    fn test_filter_exclude() {
        let tree = tree_of(&["pages/a.md", "pages/b.md"]);
        let filtered = tree
            .apply(&[Transform::filter_exclude(["pages/a.md"])])
            .unwrap();

        assert!(filtered.get("pages/a.md").is_none());
        assert!(filtered.contains_live("pages/b.md"));
    }

    #[test]
    fn test_duplicate_entries_rejected() {
        let entries = vec![
            TreeEntry::blob("pages/a.md", sha(0)),
            TreeEntry::blob("pages/a.md", sha(1)),
        ];
        assert!(matches!(
            FlatTree::from_entries(entries),
            Err(StoreError::DuplicatePath(_))
        ));
    }

    // engine tests against a real local repository

    fn setup() -> (TempDir, Arc<LocalHost>, TreeEngine, BranchName) {
        let dir = TempDir::new().unwrap();
        let branch = BranchName::staging();
        let host = Arc::new(LocalHost::init(dir.path(), &branch).unwrap());
        let engine = TreeEngine::new(host.clone(), branch.clone());
        (dir, host, engine, branch)
    }

    #[test]
    fn test_rename_commit_round_trip() {
        let (_dir, host, engine, branch) = setup();
        host.create_file(&branch, "_news/a.md", b"a", "msg").unwrap();
        host.create_file(&branch, "_news/sub/b.md", b"b", "msg").unwrap();

        let pointer = engine.pointer().unwrap();
        let flat = engine.load(&pointer, true).unwrap();
        let renamed = flat
            .apply(&[Transform::rename_prefix("_news", "_updates")])
            .unwrap();
        let new_pointer = engine
            .commit(renamed, &pointer, "[rename] _news -> _updates")
            .unwrap();

        let after = engine.load(&new_pointer, true).unwrap();
        assert!(!after.any_live_under("_news"));
        assert!(after.contains_live("_updates/a.md"));
        assert!(after.contains_live("_updates/sub/b.md"));
    }

    #[test]
    fn test_delete_then_list() {
        let (_dir, host, engine, branch) = setup();
        host.create_file(&branch, "_news/a.md", b"a", "msg").unwrap();
        host.create_file(&branch, "_news/sub/b.md", b"b", "msg").unwrap();
        host.create_file(&branch, "pages/c.md", b"c", "msg").unwrap();

        let pointer = engine.pointer().unwrap();
        let flat = engine.load(&pointer, true).unwrap();
        let pruned = flat.apply(&[Transform::delete_prefix("_news")]).unwrap();
        let new_pointer = engine
            .commit(pruned, &pointer, "[delete folder] _news")
            .unwrap();

        let after = engine.load(&new_pointer, true).unwrap();
        assert!(!after.any_live_under("_news"));
        assert!(after.contains_live("pages/c.md"));
    }

    #[test]
    fn test_stale_pointer_commit_conflicts() {
        let (_dir, host, engine, branch) = setup();
        host.create_file(&branch, "pages/a.md", b"a", "msg").unwrap();

        let pointer = engine.pointer().unwrap();
        let flat = engine.load(&pointer, true).unwrap();

        // another writer lands a commit first
        host.create_file(&branch, "pages/b.md", b"b", "msg").unwrap();

        let result = engine.commit(flat, &pointer, "stale write");
        assert!(matches!(result, Err(StoreError::RefMoved { .. })));
    }
}
