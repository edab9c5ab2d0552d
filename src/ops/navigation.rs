//! The navigation file: `_data/navigation.yml`.
//!
//! A flat list of links rendered as the site's menu. Collection links
//! carry the collection slug; plain links carry a url. Collection
//! operations rewrite this file as their last step.

use serde::{Deserialize, Serialize};

use crate::ops::SiteOps;
use crate::paths;
use crate::storage::{FileHandle, StoreError, StoreResult};

/// one navigation menu entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavLink {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl NavLink {
    /// a link to a collection
    pub fn collection(title: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            collection: Some(slug.into()),
            url: None,
        }
    }
}

/// the navigation menu document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Navigation {
    #[serde(default)]
    pub links: Vec<NavLink>,
}

impl Navigation {
    /// append a collection link
    pub fn add_collection(&mut self, title: &str, slug: &str) {
        self.links.push(NavLink::collection(title, slug));
    }

    /// drop every link pointing at a collection; returns whether anything
    /// changed
    pub fn remove_collection(&mut self, slug: &str) -> bool {
        let before = self.links.len();
        self.links
            .retain(|l| l.collection.as_deref() != Some(slug));
        self.links.len() != before
    }

    /// repoint links at a renamed collection; returns whether anything
    /// changed
    pub fn rename_collection(&mut self, old_slug: &str, new_slug: &str) -> bool {
        let mut changed = false;
        for link in &mut self.links {
            if link.collection.as_deref() == Some(old_slug) {
                link.collection = Some(new_slug.to_string());
                changed = true;
            }
        }
        changed
    }
}

impl SiteOps {
    /// Read the navigation file; a site without one gets an empty menu and
    /// no handle.
    pub fn read_navigation(&self) -> StoreResult<(Navigation, Option<FileHandle>)> {
        match self.files.read(paths::NAVIGATION_PATH) {
            Ok((bytes, handle)) => {
                let nav = serde_yaml::from_slice(&bytes).map_err(|source| {
                    StoreError::Metadata {
                        path: paths::NAVIGATION_PATH.to_string(),
                        source,
                    }
                })?;
                Ok((nav, Some(handle)))
            }
            Err(e) if e.is_not_found() => Ok((Navigation::default(), None)),
            Err(e) => Err(e),
        }
    }

    /// write the navigation file back, creating it on first use
    pub(crate) fn write_navigation(
        &self,
        nav: &Navigation,
        handle: Option<&FileHandle>,
    ) -> StoreResult<FileHandle> {
        let bytes = serde_yaml::to_string(nav)
            .map(String::into_bytes)
            .map_err(|source| StoreError::Metadata {
                path: paths::NAVIGATION_PATH.to_string(),
                source,
            })?;

        match handle {
            Some(h) => self.files.update(paths::NAVIGATION_PATH, &bytes, h),
            None => self.files.create(paths::NAVIGATION_PATH, &bytes),
        }
    }
}
