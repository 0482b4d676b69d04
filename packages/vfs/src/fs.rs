//! The file-system capability consumed by the VFS.
//!
//! The VFS never interprets anything below a file-system boundary. It hands
//! the remaining path to the [`FileSystem`] attached to a disk and stores the
//! answer as a [`Dirent`].

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use ukvfs_device::BlockDevice;

use crate::error::FsError;
use crate::Path;

/// Kind of object a directory entry describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DirentKind {
    File,
    Directory,
    /// Placeholder for an entry that doesn't describe anything.
    Invalid,
}

/// What a file system reports about one path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    /// Path on the file system, from its root.
    pub path: Path,
    pub kind: DirentKind,
    /// Size in bytes; zero for directories.
    pub size: u64,
}

impl Metadata {
    pub fn file(path: impl Into<Path>, size: u64) -> Self {
        Metadata {
            path: path.into(),
            kind: DirentKind::File,
            size,
        }
    }

    pub fn directory(path: impl Into<Path>) -> Self {
        Metadata {
            path: path.into(),
            kind: DirentKind::Directory,
            size: 0,
        }
    }
}

/// A file system mounted on a disk.
///
/// # Object Safety
///
/// This trait is object-safe: file systems are shared as
/// `Arc<dyn FileSystem>`.
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Short name of the file-system type, e.g. `"FAT32"`.
    fn name(&self) -> &str;

    /// Look up `path` asynchronously.
    async fn stat(&self, path: &Path) -> Result<Metadata, FsError>;

    /// Look up `path`, blocking the caller.
    fn stat_sync(&self, path: &Path) -> Result<Metadata, FsError>;
}

/// Builds a file system for a block device.
///
/// This is how a disk gets its file system initialized without the VFS
/// knowing which driver understands the device's bytes.
pub trait FsFactory: Send + Sync {
    fn create(&self, device: &Arc<dyn BlockDevice>) -> Result<Arc<dyn FileSystem>, FsError>;
}

/// A resolved directory entry, bound to the file system that produced it.
///
/// A `Dirent` mounted in the VFS tree marks a file-system boundary: path
/// tokens past it are resolved by [`Dirent::stat`] rather than by the tree.
#[derive(Clone)]
pub struct Dirent {
    fs: Option<Arc<dyn FileSystem>>,
    meta: Metadata,
}

impl Dirent {
    pub fn new(fs: Arc<dyn FileSystem>, meta: Metadata) -> Self {
        Dirent { fs: Some(fs), meta }
    }

    /// The distinguished placeholder entry.
    pub fn invalid() -> Self {
        Dirent {
            fs: None,
            meta: Metadata {
                path: Path::root(),
                kind: DirentKind::Invalid,
                size: 0,
            },
        }
    }

    pub fn is_valid(&self) -> bool {
        self.fs.is_some() && self.meta.kind != DirentKind::Invalid
    }

    /// Last token of the entry's path; the root is `"/"`.
    pub fn name(&self) -> &str {
        self.meta.path.back().unwrap_or("/")
    }

    pub fn path(&self) -> &Path {
        &self.meta.path
    }

    pub fn kind(&self) -> DirentKind {
        self.meta.kind
    }

    pub fn size(&self) -> u64 {
        self.meta.size
    }

    pub fn is_file(&self) -> bool {
        self.meta.kind == DirentKind::File
    }

    pub fn is_dir(&self) -> bool {
        self.meta.kind == DirentKind::Directory
    }

    pub fn metadata(&self) -> &Metadata {
        &self.meta
    }

    /// Name of the file system this entry lives on.
    pub fn fs_name(&self) -> Option<&str> {
        self.fs.as_deref().map(|fs| fs.name())
    }

    fn fs_for(&self, rest: &Path) -> Result<&Arc<dyn FileSystem>, FsError> {
        self.fs.as_ref().ok_or_else(|| FsError::NotFound {
            path: rest.to_string(),
        })
    }

    /// Stat `rest`, relative to this entry.
    pub async fn stat(&self, rest: &Path) -> Result<Dirent, FsError> {
        let fs = self.fs_for(rest)?;
        let meta = fs.stat(&self.meta.path.join(rest)).await?;
        Ok(Dirent::new(fs.clone(), meta))
    }

    /// Blocking version of [`Dirent::stat`].
    pub fn stat_sync(&self, rest: &Path) -> Result<Dirent, FsError> {
        let fs = self.fs_for(rest)?;
        let meta = fs.stat_sync(&self.meta.path.join(rest))?;
        Ok(Dirent::new(fs.clone(), meta))
    }
}

impl std::fmt::Debug for Dirent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dirent")
            .field("fs", &self.fs_name())
            .field("path", &self.meta.path)
            .field("kind", &self.meta.kind)
            .field("size", &self.meta.size)
            .finish()
    }
}

impl PartialEq for Dirent {
    fn eq(&self, other: &Self) -> bool {
        let same_fs = match (&self.fs, &other.fs) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        };
        same_fs && self.meta == other.meta
    }
}
