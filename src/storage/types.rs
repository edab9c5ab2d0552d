//! core type-safe wrappers around git primitives for the storage layer.

use std::fmt;

use serde::{Deserialize, Serialize};

/// This makes sure we don't accidentally pass a blob sha where a commit
/// sha is expected. The inner string is always validated hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommitId(String);

impl CommitId {
    /// parse a CommitId from a hex string
    pub fn from_hex(hex: impl Into<String>) -> Result<Self, InvalidNameError> {
        let hex = hex.into();
        validate_hex(&hex)?;
        Ok(Self(hex))
    }

    /// get the hex string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// short form of the commit sha
    pub fn short(&self) -> &str {
        &self.0[..7]
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Git tree identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TreeId(String);

impl TreeId {
    /// parse a TreeId from a hex string
    pub fn from_hex(hex: impl Into<String>) -> Result<Self, InvalidNameError> {
        let hex = hex.into();
        validate_hex(&hex)?;
        Ok(Self(hex))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TreeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// content address of one blob or subtree, as reported by the host
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectSha(String);

impl ObjectSha {
    /// parse an ObjectSha from a hex string
    pub fn from_hex(hex: impl Into<String>) -> Result<Self, InvalidNameError> {
        let hex = hex.into();
        validate_hex(&hex)?;
        Ok(Self(hex))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectSha {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn validate_hex(hex: &str) -> Result<(), InvalidNameError> {
    if hex.is_empty() {
        return Err(InvalidNameError::Empty);
    }
    if hex.len() != 40 && hex.len() != 64 {
        return Err(InvalidNameError::NotHex(hex.to_string()));
    }
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(InvalidNameError::NotHex(hex.to_string()));
    }
    Ok(())
}

/// a validated branch name
///
/// every write in the store targets one named branch; by convention the
/// editable state of a site lives on `staging`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BranchName(String);

impl BranchName {
    /// the branch holding the live editable state of a site
    pub const STAGING: &'static str = "staging";

    /// create a new BranchName
    pub fn new(name: impl Into<String>) -> Result<Self, InvalidNameError> {
        let name = name.into();
        // git is more permissive but we stay restrictive
        if name.is_empty() {
            return Err(InvalidNameError::Empty);
        }
        if name.contains("..") || name.ends_with('/') || name.starts_with('/') {
            return Err(InvalidNameError::InvalidPath(name));
        }
        Ok(Self(name))
    }

    /// create the staging branch reference
    pub fn staging() -> Self {
        Self(Self::STAGING.to_string())
    }

    /// get the full ref path (e.g., "refs/heads/staging")
    pub fn as_ref_path(&self) -> String {
        format!("refs/heads/{}", self.0)
    }

    /// get the short name
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BranchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The live head of the editable branch at the moment a logical operation
/// began.
///
/// A pointer goes stale the instant another write lands; every Tree Engine
/// commit checks it against the real ref and fails with a conflict if the
/// ref has moved. Resolved per logical request, never cached across them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoPointer {
    pub branch: BranchName,
    pub commit: CommitId,
    pub tree: TreeId,
}

impl fmt::Display for RepoPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.branch, self.commit.short())
    }
}

/// the currently-known content address of one blob
///
/// Returned by reads and consumed as the optimistic-concurrency token by
/// the next update or delete on the same path. Invalid once any commit
/// changes that path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHandle {
    pub path: String,
    pub sha: ObjectSha,
}

impl FileHandle {
    pub fn new(path: impl Into<String>, sha: ObjectSha) -> Self {
        Self {
            path: path.into(),
            sha,
        }
    }
}

/// entry mode inside a tree listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryMode {
    Blob,
    Tree,
}

/// one entry of a flat tree listing
///
/// `sha: None` is the deletion sentinel: submitting such an entry in a new
/// tree removes the path. Paths are relative, slash-delimited and
/// case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub path: String,
    pub mode: EntryMode,
    pub sha: Option<ObjectSha>,
}

impl TreeEntry {
    /// a live blob entry
    pub fn blob(path: impl Into<String>, sha: ObjectSha) -> Self {
        Self {
            path: path.into(),
            mode: EntryMode::Blob,
            sha: Some(sha),
        }
    }

    /// a deletion sentinel for the given path
    pub fn deleted(path: impl Into<String>, mode: EntryMode) -> Self {
        Self {
            path: path.into(),
            mode,
            sha: None,
        }
    }

    /// whether this entry deletes its path
    pub fn is_deleted(&self) -> bool {
        self.sha.is_none()
    }
}

/// git signature (author/committer info)
#[derive(Debug, Clone)]
pub struct GitSignature {
    pub name: String,
    pub email: String,
}

impl GitSignature {
    /// create a new signature
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }

    /// default signature for store-generated commits
    pub fn gitcms() -> Self {
        Self::new("gitcms", "gitcms@localhost")
    }
}

impl Default for GitSignature {
    fn default() -> Self {
        Self::gitcms()
    }
}

/// error type for invalid names (branches, path segments, shas)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidNameError {
    Empty,
    TooLong(usize),
    InvalidCharacter { char: char, position: usize },
    InvalidPath(String),
    NotHex(String),
}

impl fmt::Display for InvalidNameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "name cannot be empty"),
            Self::TooLong(len) => write!(f, "name too long: {} characters", len),
            Self::InvalidCharacter { char, position } => {
                write!(f, "invalid character '{}' at position {}", char, position)
            }
            Self::InvalidPath(path) => write!(f, "invalid path: '{}'", path),
            Self::NotHex(s) => write!(f, "not a valid object sha: '{}'", s),
        }
    }
}

impl std::error::Error for InvalidNameError {}

#[cfg(test)]
mod tests {
    use super::*;

    const SHA: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";

    #[test]
    fn test_sha_validation() {
        assert!(ObjectSha::from_hex(SHA).is_ok());
        assert!(ObjectSha::from_hex("").is_err());
        assert!(ObjectSha::from_hex("abc").is_err()); // too short
        assert!(ObjectSha::from_hex("z".repeat(40)).is_err()); // not hex
    }

    #[test]
    fn test_commit_short() {
        let id = CommitId::from_hex(SHA).unwrap();
        assert_eq!(id.short(), "aaaaaaa");
    }

    #[test]
    fn test_branch_name() {
        assert!(BranchName::new("staging").is_ok());
        assert!(BranchName::new("").is_err());
        assert!(BranchName::new("a..b").is_err());
        assert!(BranchName::new("/head").is_err());

        let staging = BranchName::staging();
        assert_eq!(staging.as_ref_path(), "refs/heads/staging");
    }

    #[test]
    fn test_deletion_sentinel() {
        let sha = ObjectSha::from_hex(SHA).unwrap();
        assert!(!TreeEntry::blob("pages/a.md", sha).is_deleted());
        assert!(TreeEntry::deleted("pages/a.md", EntryMode::Blob).is_deleted());
    }
}
