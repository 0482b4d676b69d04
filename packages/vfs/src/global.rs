//! Process-wide access points.
//!
//! The unikernel has exactly one VFS. It is created on first use and lives
//! until the process exits. Library code and tests that want isolation
//! should construct their own [`Vfs`] instead.

use std::any::Any;
use std::sync::{Arc, RwLock};

use ukvfs_device::BlockDevice;

use crate::disk::DiskHandle;
use crate::error::Result;
use crate::fs::Dirent;
use crate::registry::Vfs;
use crate::tree::EntryId;
use crate::Path;

lazy_static::lazy_static! {
    static ref VFS: Vfs = Vfs::new();
}

/// The process-wide VFS.
pub fn global() -> &'static Vfs {
    &VFS
}

/// Mount `obj` at `path` in the process-wide VFS.
pub fn mount<T: Any + Send + Sync>(
    path: impl Into<Path>,
    obj: &Arc<T>,
    desc: &str,
) -> Result<EntryId> {
    VFS.mount(path, obj, desc)
}

pub fn mount_mut<T: Any + Send + Sync>(
    path: impl Into<Path>,
    obj: &Arc<RwLock<T>>,
    desc: &str,
) -> Result<EntryId> {
    VFS.mount_mut(path, obj, desc)
}

pub fn mount_device(
    path: impl Into<Path>,
    device: Arc<dyn BlockDevice>,
    desc: &str,
) -> Result<DiskHandle> {
    VFS.mount_device(path, device, desc)
}

pub async fn mount_dirent(
    local: impl Into<Path>,
    disk: &str,
    remote: impl Into<Path>,
    desc: &str,
) -> Result<EntryId> {
    VFS.mount_dirent(local, disk, remote, desc).await
}

pub fn get<T: Any + Send + Sync>(path: impl Into<Path>) -> Result<Arc<T>> {
    VFS.get(path)
}

pub fn get_mut<T: Any + Send + Sync>(path: impl Into<Path>) -> Result<Arc<RwLock<T>>> {
    VFS.get_mut(path)
}

pub async fn stat(path: impl Into<Path>) -> Result<Dirent> {
    VFS.stat(path).await
}

pub fn stat_sync(path: impl Into<Path>) -> Result<Dirent> {
    VFS.stat_sync(path)
}

/// The process-wide mount tree, framed for the boot log.
pub fn print_tree() -> String {
    let rule = "=".repeat(60);
    format!(
        "{rule}\n{:^60}\n{}\n{}{}\n",
        "Mount points",
        "-".repeat(60),
        VFS.render_tree(),
        "_".repeat(60),
    )
}
