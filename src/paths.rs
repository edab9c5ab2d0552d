//! Path Resolver: logical locations to canonical repository paths.
//!
//! A site's repository has a fixed layout: standalone pages under `pages/`,
//! collection pages under `_{collection}/`, media under `images/` and
//! `files/`, resource pages under `{room}/{category}/`, data files under
//! `_data/`. Resolution is a pure function of a closed [`PathKind`] plus a
//! file name; nothing here talks to the host.

use crate::storage::{InvalidNameError, StoreError, StoreResult};

/// top-level directory names the store manages itself; user-created
/// folders (collections, resource rooms) must not collide with them
pub const RESERVED_TOP_LEVEL: &[&str] = &["data", "includes", "layouts", "files", "images", "pages"];

/// name of the order-list sidecar inside a collection folder
pub const COLLECTION_META: &str = "collection.yml";

/// repository path of the navigation file
pub const NAVIGATION_PATH: &str = "_data/navigation.yml";

/// marker file that keeps an otherwise-empty category directory alive
pub const CATEGORY_INDEX: &str = "index.html";

/// The kind of content a path belongs to, governing its folder prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathKind {
    /// standalone page under `pages/`
    Page,
    /// page inside a collection, optionally grouped in a subfolder
    CollectionPage {
        collection: String,
        subfolder: Option<String>,
    },
    /// page inside a resource room category
    ResourcePage { room: String, category: String },
    /// image under `images/`
    Image { subfolder: Option<String> },
    /// document under `files/`
    Document { subfolder: Option<String> },
    /// site data file under `_data/`
    Data,
    /// the homepage, always `index.md`
    Homepage,
}

/// Map a kind plus a file name to its canonical repository path.
///
/// Pure; fails only on invalid segments.
pub fn resolve(kind: &PathKind, name: &str) -> StoreResult<String> {
    if !matches!(kind, PathKind::Homepage) {
        validate_segment(name)?;
    }

    let path = match kind {
        PathKind::Page => format!("pages/{}", name),
        PathKind::CollectionPage {
            collection,
            subfolder,
        } => {
            validate_segment(collection)?;
            match subfolder {
                Some(sub) => {
                    validate_segment(sub)?;
                    format!("_{}/{}/{}", collection, sub, name)
                }
                None => format!("_{}/{}", collection, name),
            }
        }
        PathKind::ResourcePage { room, category } => {
            validate_segment(room)?;
            validate_segment(category)?;
            format!("{}/{}/{}", room, category, name)
        }
        PathKind::Image { subfolder } => prefixed("images", subfolder.as_deref(), name)?,
        PathKind::Document { subfolder } => prefixed("files", subfolder.as_deref(), name)?,
        PathKind::Data => format!("_data/{}", name),
        PathKind::Homepage => "index.md".to_string(),
    };

    Ok(path)
}

fn prefixed(root: &str, subfolder: Option<&str>, name: &str) -> StoreResult<String> {
    match subfolder {
        Some(sub) => {
            validate_segment(sub)?;
            Ok(format!("{}/{}/{}", root, sub, name))
        }
        None => Ok(format!("{}/{}", root, name)),
    }
}

/// the folder a collection's pages live in
pub fn collection_dir(collection: &str) -> String {
    format!("_{}", collection)
}

/// the order-list sidecar of a collection
pub fn collection_meta_path(collection: &str) -> String {
    format!("_{}/{}", collection, COLLECTION_META)
}

/// the marker file of a resource category
pub fn category_index_path(room: &str, category: &str) -> String {
    format!("{}/{}/{}", room, category, CATEGORY_INDEX)
}

/// Reject a segment containing separators or other illegal characters.
pub fn validate_segment(segment: &str) -> StoreResult<()> {
    if segment.is_empty() {
        return Err(StoreError::InvalidName(InvalidNameError::Empty));
    }
    if segment.len() > 128 {
        return Err(StoreError::InvalidName(InvalidNameError::TooLong(
            segment.len(),
        )));
    }
    if segment == "." || segment == ".." {
        return Err(StoreError::InvalidName(InvalidNameError::InvalidPath(
            segment.to_string(),
        )));
    }
    for (i, c) in segment.chars().enumerate() {
        if c == '/' || c == '\\' || c == ':' || c.is_control() {
            return Err(StoreError::InvalidName(InvalidNameError::InvalidCharacter {
                char: c,
                position: i,
            }));
        }
    }
    Ok(())
}

/// Validate a relative path of one or more segments ("a.md", "2024/a.md").
pub fn validate_relpath(path: &str) -> StoreResult<()> {
    if path.is_empty() {
        return Err(StoreError::InvalidName(InvalidNameError::Empty));
    }
    for segment in path.split('/') {
        validate_segment(segment)?;
    }
    Ok(())
}

/// Validate a name for a new top-level folder (collection slug or resource
/// room). Reserved names are a protected-name conflict, not a syntax error.
pub fn validate_new_folder(name: &str) -> StoreResult<()> {
    validate_segment(name)?;
    if RESERVED_TOP_LEVEL.contains(&name.to_lowercase().as_str()) {
        return Err(StoreError::ReservedName(name.to_string()));
    }
    Ok(())
}

/// Turn a display title into a folder-safe slug ("Press Releases" ->
/// "press-releases").
pub fn slugify(title: &str) -> String {
    title
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_whitespace() { '-' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::ErrorKind;

    #[test]
    fn test_resolve_kinds() {
        assert_eq!(resolve(&PathKind::Page, "about.md").unwrap(), "pages/about.md");
        assert_eq!(
            resolve(
                &PathKind::CollectionPage {
                    collection: "news".into(),
                    subfolder: None
                },
                "post.md"
            )
            .unwrap(),
            "_news/post.md"
        );
        assert_eq!(
            resolve(
                &PathKind::CollectionPage {
                    collection: "news".into(),
                    subfolder: Some("2024".into())
                },
                "post.md"
            )
            .unwrap(),
            "_news/2024/post.md"
        );
        assert_eq!(
            resolve(
                &PathKind::ResourcePage {
                    room: "resources".into(),
                    category: "reports".into()
                },
                "annual.md"
            )
            .unwrap(),
            "resources/reports/annual.md"
        );
        assert_eq!(
            resolve(&PathKind::Image { subfolder: None }, "logo.png").unwrap(),
            "images/logo.png"
        );
        assert_eq!(
            resolve(
                &PathKind::Document {
                    subfolder: Some("forms".into())
                },
                "application.pdf"
            )
            .unwrap(),
            "files/forms/application.pdf"
        );
        assert_eq!(resolve(&PathKind::Data, "navigation.yml").unwrap(), "_data/navigation.yml");
        assert_eq!(resolve(&PathKind::Homepage, "").unwrap(), "index.md");
    }

    #[test]
    fn test_invalid_segments() {
        assert!(resolve(&PathKind::Page, "a/b.md").is_err());
        assert!(resolve(&PathKind::Page, "a\\b.md").is_err());
        assert!(resolve(&PathKind::Page, "..").is_err());
        assert!(resolve(&PathKind::Page, "").is_err());

        let err = resolve(&PathKind::Page, "a/b.md").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidName);
    }

    #[test]
    fn test_reserved_names() {
        for name in RESERVED_TOP_LEVEL {
            let err = validate_new_folder(name).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Conflict);
        }
        assert!(validate_new_folder("Images").is_err()); // case-insensitive
        assert!(validate_new_folder("news").is_ok());
    }

    #[test]
    fn test_relpath() {
        assert!(validate_relpath("a.md").is_ok());
        assert!(validate_relpath("2024/a.md").is_ok());
        assert!(validate_relpath("").is_err());
        assert!(validate_relpath("a//b.md").is_err());
        assert!(validate_relpath("../a.md").is_err());
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("News"), "news");
        assert_eq!(slugify("Press Releases"), "press-releases");
        assert_eq!(slugify("  padded  "), "padded");
    }

    #[test]
    fn test_helper_paths() {
        assert_eq!(collection_dir("news"), "_news");
        assert_eq!(collection_meta_path("news"), "_news/collection.yml");
        assert_eq!(
            category_index_path("resources", "reports"),
            "resources/reports/index.html"
        );
    }
}
