//! git2-backed [`GitHost`] implementation.
//!
//! Serves two purposes: a real backend for sites whose repository lives on
//! local disk, and the host used by the test suite. All access goes through
//! one mutex so that read-modify-write sequences on the branch ref are
//! serialized within the process; cross-process writers are still caught by
//! the compare-and-swap ref update.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use git2::{FileMode, ObjectType, Oid, Repository, TreeWalkMode, TreeWalkResult};
use parking_lot::Mutex;

use crate::storage::error::{StoreError, StoreResult};
use crate::storage::host::{CommitInfo, DirEntry, GitHost};
use crate::storage::types::{
    BranchName, CommitId, EntryMode, GitSignature, ObjectSha, RepoPointer, TreeEntry, TreeId,
};

/// A local repository speaking the [`GitHost`] protocol.
///
/// Clone this to share across threads - it uses Arc internally.
#[derive(Clone)]
pub struct LocalHost {
    inner: Arc<LocalHostInner>,
}

struct LocalHostInner {
    repo: Mutex<Repository>,
    path: PathBuf,
    signature: GitSignature,
}

impl LocalHost {
    /// Open an existing repository.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        let repo = Repository::open(path)
            .map_err(|_| StoreError::Transport(format!("no repository at {}", path.display())))?;

        Ok(Self {
            inner: Arc::new(LocalHostInner {
                repo: Mutex::new(repo),
                path: path.to_path_buf(),
                signature: GitSignature::gitcms(),
            }),
        })
    }

    /// Initialize a new repository with an empty root commit on the given
    /// branch.
    pub fn init(path: impl AsRef<Path>, branch: &BranchName) -> StoreResult<Self> {
        let path = path.as_ref();
        let repo = Repository::init(path)?;

        {
            let sig = to_git2_signature(&GitSignature::gitcms())?;
            let tree_oid = repo.treebuilder(None)?.write()?;
            let tree = repo.find_tree(tree_oid)?;
            repo.commit(
                Some(&branch.as_ref_path()),
                &sig,
                &sig,
                "[gitcms] initialize site",
                &tree,
                &[],
            )?;
            repo.set_head(&branch.as_ref_path())?;
        }

        Ok(Self {
            inner: Arc::new(LocalHostInner {
                repo: Mutex::new(repo),
                path: path.to_path_buf(),
                signature: GitSignature::gitcms(),
            }),
        })
    }

    /// Open or initialize a repository.
    pub fn open_or_init(path: impl AsRef<Path>, branch: &BranchName) -> StoreResult<Self> {
        let path = path.as_ref();
        if path.join(".git").exists() {
            Self::open(path)
        } else {
            Self::init(path, branch)
        }
    }

    /// Get the repository path.
    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    fn with_repo<F, T>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&Repository) -> StoreResult<T>,
    {
        let repo = self.inner.repo.lock();
        f(&repo)
    }

    fn head_of(&self, repo: &Repository, branch: &BranchName) -> StoreResult<(Oid, Oid)> {
        let reference = repo
            .find_reference(&branch.as_ref_path())
            .map_err(|_| StoreError::RefNotFound(branch.to_string()))?;
        let commit = reference
            .peel_to_commit()
            .map_err(|_| StoreError::RefNotFound(branch.to_string()))?;
        Ok((commit.id(), commit.tree_id()))
    }

    /// Commit a full flat listing as the new branch head. Caller holds the
    /// repository lock, so the parent cannot move underneath us.
    fn commit_flat(
        &self,
        repo: &Repository,
        branch: &BranchName,
        parent: Oid,
        flat: &BTreeMap<String, Oid>,
        message: &str,
    ) -> StoreResult<Oid> {
        let tree_oid = write_flat(repo, flat)?;
        let tree = repo.find_tree(tree_oid)?;
        let parent_commit = repo.find_commit(parent)?;
        let sig = to_git2_signature(&self.inner.signature)?;

        let oid = repo.commit(
            Some(&branch.as_ref_path()),
            &sig,
            &sig,
            message,
            &tree,
            &[&parent_commit],
        )?;
        Ok(oid)
    }

    /// Look up the blob oid at a path inside a tree, if present.
    fn blob_at(
        &self,
        repo: &Repository,
        tree_oid: Oid,
        path: &str,
    ) -> StoreResult<Option<Oid>> {
        let tree = repo.find_tree(tree_oid)?;
        match tree.get_path(Path::new(path)) {
            Ok(entry) if entry.kind() == Some(ObjectType::Blob) => Ok(Some(entry.id())),
            Ok(_) => Ok(None),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(StoreError::Git(e)),
        }
    }
}

impl GitHost for LocalHost {
    fn resolve_ref(&self, branch: &BranchName) -> StoreResult<RepoPointer> {
        self.with_repo(|repo| {
            let (commit, tree) = self.head_of(repo, branch)?;
            Ok(RepoPointer {
                branch: branch.clone(),
                commit: commit_id(commit)?,
                tree: tree_id(tree)?,
            })
        })
    }

    fn get_tree(&self, tree: &TreeId, recursive: bool) -> StoreResult<Vec<TreeEntry>> {
        self.with_repo(|repo| {
            let git_tree = repo
                .find_tree(parse_oid(tree.as_str())?)
                .map_err(|_| StoreError::CommitNotFound(tree.to_string()))?;

            if recursive {
                let flat = read_flat(&git_tree)?;
                flat.into_iter()
                    .map(|(path, oid)| Ok(TreeEntry::blob(path, object_sha(oid)?)))
                    .collect()
            } else {
                let mut entries = Vec::new();
                for entry in git_tree.iter() {
                    let (name, mode) = match (entry.name(), entry.kind()) {
                        (Some(n), Some(ObjectType::Blob)) => (n, EntryMode::Blob),
                        (Some(n), Some(ObjectType::Tree)) => (n, EntryMode::Tree),
                        _ => continue,
                    };
                    entries.push(TreeEntry {
                        path: name.to_string(),
                        mode,
                        sha: Some(object_sha(entry.id())?),
                    });
                }
                Ok(entries)
            }
        })
    }

    fn create_tree(&self, base: Option<&TreeId>, entries: &[TreeEntry]) -> StoreResult<TreeId> {
        self.with_repo(|repo| {
            let mut flat = match base {
                Some(t) => {
                    let tree = repo.find_tree(parse_oid(t.as_str())?)?;
                    read_flat(&tree)?
                }
                None => BTreeMap::new(),
            };

            for entry in entries {
                match &entry.sha {
                    None => {
                        // deletion sentinel: drop the path and any leaves
                        // under it
                        flat.remove(&entry.path);
                        let prefix = format!("{}/", entry.path);
                        flat.retain(|k, _| !k.starts_with(&prefix));
                    }
                    Some(sha) => match entry.mode {
                        EntryMode::Blob => {
                            flat.insert(entry.path.clone(), parse_oid(sha.as_str())?);
                        }
                        EntryMode::Tree => {
                            let sub = repo.find_tree(parse_oid(sha.as_str())?)?;
                            for (p, oid) in read_flat(&sub)? {
                                flat.insert(format!("{}/{}", entry.path, p), oid);
                            }
                        }
                    },
                }
            }

            let oid = write_flat(repo, &flat)?;
            tree_id(oid)
        })
    }

    fn create_commit(
        &self,
        tree: &TreeId,
        parent: &CommitId,
        message: &str,
    ) -> StoreResult<CommitId> {
        self.with_repo(|repo| {
            let git_tree = repo.find_tree(parse_oid(tree.as_str())?)?;
            let parent_commit = repo
                .find_commit(parse_oid(parent.as_str())?)
                .map_err(|_| StoreError::CommitNotFound(parent.to_string()))?;
            let sig = to_git2_signature(&self.inner.signature)?;

            let oid = repo.commit(None, &sig, &sig, message, &git_tree, &[&parent_commit])?;
            commit_id(oid)
        })
    }

    fn update_ref(
        &self,
        branch: &BranchName,
        expected: &CommitId,
        new: &CommitId,
    ) -> StoreResult<()> {
        self.with_repo(|repo| {
            let (current, _) = self.head_of(repo, branch)?;
            if current.to_string() != expected.as_str() {
                return Err(StoreError::RefMoved {
                    branch: branch.to_string(),
                    expected: expected.to_string(),
                    actual: current.to_string(),
                });
            }

            let mut reference = repo
                .find_reference(&branch.as_ref_path())
                .map_err(|_| StoreError::RefNotFound(branch.to_string()))?;
            reference.set_target(
                parse_oid(new.as_str())?,
                &format!("update ref to {}", new.short()),
            )?;
            Ok(())
        })
    }

    fn get_blob(&self, sha: &ObjectSha) -> StoreResult<Vec<u8>> {
        self.with_repo(|repo| {
            let blob = repo.find_blob(parse_oid(sha.as_str())?)?;
            Ok(blob.content().to_vec())
        })
    }

    fn create_blob(&self, content: &[u8]) -> StoreResult<ObjectSha> {
        self.with_repo(|repo| {
            let oid = repo.blob(content)?;
            object_sha(oid)
        })
    }

    fn list_dir(&self, branch: &BranchName, dir: &str) -> StoreResult<Vec<DirEntry>> {
        self.with_repo(|repo| {
            let (_, tree_oid) = self.head_of(repo, branch)?;
            let root = repo.find_tree(tree_oid)?;

            let tree = if dir.is_empty() {
                root
            } else {
                let entry = root
                    .get_path(Path::new(dir))
                    .map_err(|_| StoreError::FolderNotFound(dir.to_string()))?;
                if entry.kind() != Some(ObjectType::Tree) {
                    return Err(StoreError::FolderNotFound(dir.to_string()));
                }
                repo.find_tree(entry.id())?
            };

            let mut entries = Vec::new();
            for entry in tree.iter() {
                let (name, mode) = match (entry.name(), entry.kind()) {
                    (Some(n), Some(ObjectType::Blob)) => (n, EntryMode::Blob),
                    (Some(n), Some(ObjectType::Tree)) => (n, EntryMode::Tree),
                    _ => continue,
                };
                entries.push(DirEntry {
                    name: name.to_string(),
                    mode,
                    sha: object_sha(entry.id())?,
                });
            }
            Ok(entries)
        })
    }

    fn create_file(
        &self,
        branch: &BranchName,
        path: &str,
        content: &[u8],
        message: &str,
    ) -> StoreResult<ObjectSha> {
        self.with_repo(|repo| {
            let (head, tree_oid) = self.head_of(repo, branch)?;

            if self.blob_at(repo, tree_oid, path)?.is_some() {
                return Err(StoreError::PathExists(path.to_string()));
            }

            let blob = repo.blob(content)?;
            let tree = repo.find_tree(tree_oid)?;
            let mut flat = read_flat(&tree)?;
            flat.insert(path.to_string(), blob);

            self.commit_flat(repo, branch, head, &flat, message)?;
            object_sha(blob)
        })
    }

    fn update_file(
        &self,
        branch: &BranchName,
        path: &str,
        content: &[u8],
        expected: &ObjectSha,
        message: &str,
    ) -> StoreResult<ObjectSha> {
        self.with_repo(|repo| {
            let (head, tree_oid) = self.head_of(repo, branch)?;

            let current = self
                .blob_at(repo, tree_oid, path)?
                .ok_or_else(|| StoreError::PathNotFound(path.to_string()))?;
            if current.to_string() != expected.as_str() {
                return Err(StoreError::StaleHandle {
                    path: path.to_string(),
                    expected: expected.to_string(),
                    actual: current.to_string(),
                });
            }

            let blob = repo.blob(content)?;
            let tree = repo.find_tree(tree_oid)?;
            let mut flat = read_flat(&tree)?;
            flat.insert(path.to_string(), blob);

            self.commit_flat(repo, branch, head, &flat, message)?;
            object_sha(blob)
        })
    }

    fn delete_file(
        &self,
        branch: &BranchName,
        path: &str,
        expected: &ObjectSha,
        message: &str,
    ) -> StoreResult<()> {
        self.with_repo(|repo| {
            let (head, tree_oid) = self.head_of(repo, branch)?;

            let current = self
                .blob_at(repo, tree_oid, path)?
                .ok_or_else(|| StoreError::PathNotFound(path.to_string()))?;
            if current.to_string() != expected.as_str() {
                return Err(StoreError::StaleHandle {
                    path: path.to_string(),
                    expected: expected.to_string(),
                    actual: current.to_string(),
                });
            }

            let tree = repo.find_tree(tree_oid)?;
            let mut flat = read_flat(&tree)?;
            flat.remove(path);

            self.commit_flat(repo, branch, head, &flat, message)?;
            Ok(())
        })
    }

    fn commit_info(&self, id: &CommitId) -> StoreResult<CommitInfo> {
        self.with_repo(|repo| {
            let commit = repo
                .find_commit(parse_oid(id.as_str())?)
                .map_err(|_| StoreError::CommitNotFound(id.to_string()))?;

            let timestamp = Utc
                .timestamp_opt(commit.time().seconds(), 0)
                .single()
                .unwrap_or_else(Utc::now);

            Ok(CommitInfo {
                id: commit_id(commit.id())?,
                tree: tree_id(commit.tree_id())?,
                parents: commit
                    .parent_ids()
                    .map(commit_id)
                    .collect::<StoreResult<_>>()?,
                message: commit.message().unwrap_or("").to_string(),
                timestamp,
            })
        })
    }
}

fn to_git2_signature(sig: &GitSignature) -> StoreResult<git2::Signature<'static>> {
    Ok(git2::Signature::now(&sig.name, &sig.email)?)
}

fn parse_oid(hex: &str) -> StoreResult<Oid> {
    Ok(Oid::from_str(hex)?)
}

fn object_sha(oid: Oid) -> StoreResult<ObjectSha> {
    ObjectSha::from_hex(oid.to_string()).map_err(StoreError::from)
}

fn commit_id(oid: Oid) -> StoreResult<CommitId> {
    CommitId::from_hex(oid.to_string()).map_err(StoreError::from)
}

fn tree_id(oid: Oid) -> StoreResult<TreeId> {
    TreeId::from_hex(oid.to_string()).map_err(StoreError::from)
}

/// Flatten a tree into path -> blob oid. Only blob leaves are listed;
/// directory membership is positional.
fn read_flat(tree: &git2::Tree<'_>) -> StoreResult<BTreeMap<String, Oid>> {
    let mut flat = BTreeMap::new();
    let mut walk_err = None;

    tree.walk(TreeWalkMode::PreOrder, |root, entry| {
        if entry.kind() == Some(ObjectType::Blob) {
            match entry.name() {
                Some(name) => {
                    flat.insert(format!("{}{}", root, name), entry.id());
                }
                None => {
                    walk_err = Some(StoreError::Internal(
                        "non-utf8 entry name in tree".to_string(),
                    ));
                    return TreeWalkResult::Abort;
                }
            }
        }
        TreeWalkResult::Ok
    })?;

    match walk_err {
        Some(e) => Err(e),
        None => Ok(flat),
    }
}

/// Nested layout built from flat slash-delimited paths before writing
/// actual tree objects bottom-up.
enum Node {
    Blob(Oid),
    Dir(BTreeMap<String, Node>),
}

fn insert_node(map: &mut BTreeMap<String, Node>, path: &str, oid: Oid) -> StoreResult<()> {
    match path.split_once('/') {
        None => {
            map.insert(path.to_string(), Node::Blob(oid));
            Ok(())
        }
        Some((dir, rest)) => {
            let node = map
                .entry(dir.to_string())
                .or_insert_with(|| Node::Dir(BTreeMap::new()));
            match node {
                Node::Dir(children) => insert_node(children, rest, oid),
                Node::Blob(_) => Err(StoreError::Internal(format!(
                    "blob and directory share the path segment '{}'",
                    dir
                ))),
            }
        }
    }
}

fn write_dir(repo: &Repository, children: &BTreeMap<String, Node>) -> StoreResult<Oid> {
    let mut builder = repo.treebuilder(None)?;
    for (name, node) in children {
        match node {
            Node::Blob(oid) => {
                builder.insert(name, *oid, FileMode::Blob.into())?;
            }
            Node::Dir(sub) => {
                let sub_oid = write_dir(repo, sub)?;
                builder.insert(name, sub_oid, FileMode::Tree.into())?;
            }
        }
    }
    Ok(builder.write()?)
}

/// Write a flat path -> blob map as nested tree objects, returning the root.
fn write_flat(repo: &Repository, flat: &BTreeMap<String, Oid>) -> StoreResult<Oid> {
    let mut root = BTreeMap::new();
    for (path, oid) in flat {
        insert_node(&mut root, path, *oid)?;
    }
    write_dir(repo, &root)
}
