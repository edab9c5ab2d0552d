//! Media operations: images under `images/`, documents under `files/`.
//!
//! Media files are plain blobs with no order list and no navigation
//! presence. Uploads go through the Single-File Service; bulk moves
//! between subfolders go through the Tree Engine like any other move.

use crate::ops::SiteOps;
use crate::paths::{self, PathKind};
use crate::storage::{FileHandle, StoreResult};

/// which media root a file belongs under
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Document,
}

impl MediaKind {
    fn root(self) -> &'static str {
        match self {
            MediaKind::Image => "images",
            MediaKind::Document => "files",
        }
    }

    fn path_kind(self, subfolder: Option<&str>) -> PathKind {
        let subfolder = subfolder.map(str::to_string);
        match self {
            MediaKind::Image => PathKind::Image { subfolder },
            MediaKind::Document => PathKind::Document { subfolder },
        }
    }
}

impl SiteOps {
    /// Upload a media file, optionally into a subfolder of its root.
    pub fn create_media(
        &self,
        kind: MediaKind,
        subfolder: Option<&str>,
        name: &str,
        content: &[u8],
    ) -> StoreResult<FileHandle> {
        let path = paths::resolve(&kind.path_kind(subfolder), name)?;
        self.files.create(&path, content)
    }

    /// Delete a media file with its read handle.
    pub fn delete_media(
        &self,
        kind: MediaKind,
        subfolder: Option<&str>,
        name: &str,
        handle: &FileHandle,
    ) -> StoreResult<()> {
        let path = paths::resolve(&kind.path_kind(subfolder), name)?;
        self.files.delete(&path, handle)
    }

    /// Move media files between two subfolders of the same root in one
    /// commit. `None` stands for the root folder itself.
    pub fn move_media(
        &self,
        kind: MediaKind,
        from_subfolder: Option<&str>,
        to_subfolder: Option<&str>,
        names: &[&str],
    ) -> StoreResult<()> {
        let from_dir = media_dir(kind, from_subfolder)?;
        let to_dir = media_dir(kind, to_subfolder)?;
        self.batch_move(&from_dir, &to_dir, names)?;
        Ok(())
    }
}

fn media_dir(kind: MediaKind, subfolder: Option<&str>) -> StoreResult<String> {
    match subfolder {
        Some(sub) => {
            paths::validate_segment(sub)?;
            Ok(format!("{}/{}", kind.root(), sub))
        }
        None => Ok(kind.root().to_string()),
    }
}
