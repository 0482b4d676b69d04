//! The mount registry: the VFS root plus the disk and dirent caches.

use std::any::Any;
use std::collections::btree_map::Entry as MapEntry;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, info, warn};
use ukvfs_device::BlockDevice;

use crate::disk::{Disk, DiskHandle};
use crate::entry::Leaf;
use crate::error::{Result, VfsError};
use crate::fs::Dirent;
use crate::tree::{EntryId, Tree, Walk};
use crate::Path;

/// Configuration for a [`Vfs`].
#[derive(Debug, Clone)]
pub struct VfsOptions {
    /// Description of the root directory.
    pub root_description: String,
    /// Width type names are cut to in [`Vfs::render_tree`]. 0 = no limit.
    pub type_name_width: usize,
}

impl Default for VfsOptions {
    fn default() -> Self {
        Self {
            root_description: "Root directory".to_string(),
            type_name_width: 20,
        }
    }
}

/// Key of the dirent cache: a disk and a path on it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DirentKey {
    pub disk: String,
    pub path: String,
}

impl DirentKey {
    pub fn new(disk: impl Into<String>, path: &Path) -> Self {
        Self {
            disk: disk.into(),
            path: path.to_string(),
        }
    }
}

/// A virtual file system.
///
/// Holds the mount tree, a map from disk name to [`DiskHandle`], and a cache
/// of resolved directory entries keyed by `(disk, remote path)`. Nothing is
/// ever removed from any of them.
///
/// All methods take `&self`. Locks are held only for the synchronous part of
/// an operation and never across an `.await`.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use ukvfs::Vfs;
///
/// let vfs = Vfs::new();
/// let counter = Arc::new(42i32);
/// vfs.mount("/dev/counter", &counter, "A counter").unwrap();
///
/// assert_eq!(*vfs.get::<i32>("/dev/counter").unwrap(), 42);
/// assert!(vfs.get::<String>("/dev/counter").is_err());
/// ```
pub struct Vfs {
    options: VfsOptions,
    tree: RwLock<Tree>,
    disks: RwLock<BTreeMap<String, DiskHandle>>,
    dirents: Mutex<BTreeMap<DirentKey, Arc<Dirent>>>,
    invalid_dirent: Arc<Dirent>,
}

impl Default for Vfs {
    fn default() -> Self {
        Self::new()
    }
}

impl Vfs {
    pub fn new() -> Self {
        Self::with_options(VfsOptions::default())
    }

    pub fn with_options(options: VfsOptions) -> Self {
        let tree = Tree::new("/", options.root_description.clone());
        Self {
            options,
            tree: RwLock::new(tree),
            disks: RwLock::new(BTreeMap::new()),
            dirents: Mutex::new(BTreeMap::new()),
            invalid_dirent: Arc::new(Dirent::invalid()),
        }
    }

    pub fn options(&self) -> &VfsOptions {
        &self.options
    }

    fn tree(&self) -> RwLockReadGuard<'_, Tree> {
        self.tree.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn tree_mut(&self) -> RwLockWriteGuard<'_, Tree> {
        self.tree.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` with read access to the tree.
    pub fn with_tree<R>(&self, f: impl FnOnce(&Tree) -> R) -> R {
        f(&self.tree())
    }

    /// Mount `obj` at `path`, creating missing parent directories.
    ///
    /// The tree keeps a weak reference: `obj` stays owned by the caller.
    pub fn mount<T: Any + Send + Sync>(
        &self,
        path: impl Into<Path>,
        obj: &Arc<T>,
        desc: &str,
    ) -> Result<EntryId> {
        self.mount_with(path, obj, desc, true)
    }

    /// Mount `obj` at `path`; with `create_path == false` the parent must exist.
    pub fn mount_with<T: Any + Send + Sync>(
        &self,
        path: impl Into<Path>,
        obj: &Arc<T>,
        desc: &str,
        create_path: bool,
    ) -> Result<EntryId> {
        self.mount_leaf(path.into(), Leaf::shared(obj), desc, create_path)
    }

    /// Mount a lock-protected object for mutable access at `path`.
    pub fn mount_mut<T: Any + Send + Sync>(
        &self,
        path: impl Into<Path>,
        obj: &Arc<RwLock<T>>,
        desc: &str,
    ) -> Result<EntryId> {
        self.mount_leaf(path.into(), Leaf::exclusive(obj), desc, true)
    }

    fn mount_leaf(&self, path: Path, leaf: Leaf, desc: &str, create: bool) -> Result<EntryId> {
        info!(type_name = leaf.type_name(), path = %path, "mounting");
        self.tree_mut().mount(&path, leaf, desc, create)
    }

    /// Mount a block device at `path`.
    ///
    /// The device is wrapped in a [`Disk`] registered under its device name
    /// (reusing the existing one if the name is known) and the disk handle is
    /// mounted, so `get::<Disk>(path)` returns the registered handle.
    pub fn mount_device(
        &self,
        path: impl Into<Path>,
        device: Arc<dyn BlockDevice>,
        desc: &str,
    ) -> Result<DiskHandle> {
        let disk = self.insert_disk(device);
        self.mount(path, &disk, desc)?;
        Ok(disk)
    }

    /// Register `device`, returning its disk handle.
    ///
    /// Each device name gets exactly one [`Disk`]; later calls with the same
    /// name return the handle created first.
    pub fn insert_disk(&self, device: Arc<dyn BlockDevice>) -> DiskHandle {
        let mut disks = self.disks.write().unwrap_or_else(PoisonError::into_inner);
        disks
            .entry(device.device_name().to_string())
            .or_insert_with(|| {
                info!(disk = %device.device_name(), "creating disk object");
                Arc::new(Disk::new(device.clone()))
            })
            .clone()
    }

    pub fn disk(&self, name: &str) -> Option<DiskHandle> {
        self.disks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Names of all registered disks.
    pub fn disks(&self) -> Vec<String> {
        self.disks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    fn dirents(&self) -> std::sync::MutexGuard<'_, BTreeMap<DirentKey, Arc<Dirent>>> {
        self.dirents.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The cached dirent for `(disk, path)`, if one was resolved.
    pub fn cached_dirent(&self, disk: &str, path: impl Into<Path>) -> Option<Arc<Dirent>> {
        self.dirents()
            .get(&DirentKey::new(disk, &path.into()))
            .cloned()
    }

    /// Number of cached dirents.
    pub fn cached_dirents(&self) -> usize {
        self.dirents().len()
    }

    /// Resolve `path` on disk `disk_name` and cache the result.
    ///
    /// The first resolution of a `(disk, path)` pair wins. When the cache
    /// already holds the key by the time this resolution completes, the
    /// fresh value is discarded and the invalid placeholder
    /// ([`Dirent::is_valid`] is false) is returned instead.
    ///
    /// Any error from the file system is reported as [`VfsError::NotFound`].
    pub async fn insert_dirent(
        &self,
        disk_name: &str,
        path: impl Into<Path>,
    ) -> Result<Arc<Dirent>> {
        let path = path.into();
        let disk = self
            .disk(disk_name)
            .ok_or_else(|| VfsError::not_found(format!("disk {} is not mounted", disk_name)))?;
        let fs = disk.fs()?;

        let meta = fs.stat(&path).await.map_err(|e| {
            debug!(disk = %disk_name, path = %path, error = %e, "dirent resolution failed");
            VfsError::not_found(format!("dirent {}::{}", disk_name, path))
        })?;

        let mut dirents = self.dirents();
        let dirent = match dirents.entry(DirentKey::new(disk_name, &path)) {
            MapEntry::Vacant(slot) => slot.insert(Arc::new(Dirent::new(fs, meta))).clone(),
            MapEntry::Occupied(_) => {
                warn!(disk = %disk_name, path = %path, "dirent already cached, discarding new resolution");
                self.invalid_dirent.clone()
            }
        };
        Ok(dirent)
    }

    /// Mount the directory entry at `remote` on disk `disk_name` at `local`.
    ///
    /// Resolves the entry (or reuses the cached one) and mounts it. Two mounts
    /// of the same `(disk, remote)` pair refer to the same cached dirent.
    pub async fn mount_dirent(
        &self,
        local: impl Into<Path>,
        disk_name: &str,
        remote: impl Into<Path>,
        desc: &str,
    ) -> Result<EntryId> {
        let local = local.into();
        let remote = remote.into();
        info!(disk = %disk_name, remote = %remote, local = %local, "creating mount point");

        let dirent = match self.cached_dirent(disk_name, &remote) {
            Some(cached) => {
                debug!(disk = %disk_name, remote = %remote, "dirent cache hit");
                cached
            }
            None => {
                let resolved = self.insert_dirent(disk_name, &remote).await?;
                if resolved.is_valid() {
                    resolved
                } else {
                    // Lost the race: someone else cached this key meanwhile.
                    self.cached_dirent(disk_name, &remote).ok_or_else(|| {
                        VfsError::not_found(format!("dirent {}::{}", disk_name, remote))
                    })?
                }
            }
        };

        self.mount(local, &dirent, desc)
    }

    /// Walk to `path`.
    ///
    /// With `create`, missing intermediate directories are created; the last
    /// token never is, since leaves only come from explicit mounts.
    pub fn walk(&self, path: impl Into<Path>, create: bool) -> Result<Option<EntryId>> {
        let path = path.into();
        if create {
            let mut tree = self.tree_mut();
            let parent = tree.make_parents(&path)?;
            return Ok(match path.back() {
                Some(token) => tree.child(parent, token),
                None => Some(parent),
            });
        }
        Ok(self.tree().walk(&path, false).map(|walk| walk.node))
    }

    /// Fetch the object mounted at `path` for immutable access.
    ///
    /// Objects mounted with [`Vfs::mount_mut`] are read back as their lock,
    /// `get::<RwLock<T>>`.
    pub fn get<T: Any + Send + Sync>(&self, path: impl Into<Path>) -> Result<Arc<T>> {
        let path = path.into();
        let tree = self.tree();
        let walk = tree.walk(&path, false).ok_or_else(|| Self::missing(&path))?;
        let entry = Self::entry(&tree, walk.node)?;
        entry.obj::<T>()
    }

    /// Fetch the lock-protected object mounted at `path`.
    pub fn get_mut<T: Any + Send + Sync>(&self, path: impl Into<Path>) -> Result<Arc<RwLock<T>>> {
        let path = path.into();
        let tree = self.tree();
        let walk = tree.walk(&path, false).ok_or_else(|| Self::missing(&path))?;
        let entry = Self::entry(&tree, walk.node)?;
        entry.obj_mut::<T>()
    }

    /// Number of children below `path`.
    pub fn child_count(&self, path: impl Into<Path>) -> Result<usize> {
        let path = path.into();
        let tree = self.tree();
        let walk = tree.walk(&path, false).ok_or_else(|| Self::missing(&path))?;
        Ok(tree.child_count(walk.node))
    }

    /// Find the file-system boundary for `path` and the tokens past it.
    fn boundary(&self, path: &Path) -> Result<(Arc<Dirent>, Path)> {
        let tree = self.tree();
        let Walk { node, rest } = tree.walk(path, true).ok_or_else(|| Self::missing(path))?;
        let dirent = Self::entry(&tree, node)?.obj::<Dirent>()?;
        Ok((dirent, rest))
    }

    /// Stat `path` through the file system it belongs to.
    ///
    /// The tree is walked as far as it goes; the remaining tokens are
    /// resolved by the dirent found at the boundary.
    pub async fn stat(&self, path: impl Into<Path>) -> Result<Dirent> {
        let path = path.into();
        let (dirent, rest) = self.boundary(&path)?;
        debug!(path = %path, rest = %rest, "stat past file-system boundary");
        Ok(dirent.stat(&rest).await?)
    }

    /// Blocking version of [`Vfs::stat`].
    pub fn stat_sync(&self, path: impl Into<Path>) -> Result<Dirent> {
        let path = path.into();
        let (dirent, rest) = self.boundary(&path)?;
        Ok(dirent.stat_sync(&rest)?)
    }

    /// Render the mount tree as indented text.
    pub fn render_tree(&self) -> String {
        self.tree().render(self.options.type_name_width)
    }

    fn missing(path: &Path) -> VfsError {
        VfsError::not_found(format!("path {} does not exist", path))
    }

    fn entry(tree: &Tree, id: EntryId) -> Result<&crate::entry::Entry> {
        tree.get(id)
            .ok_or_else(|| VfsError::not_found(format!("entry {} does not exist", id.index())))
    }
}

impl std::fmt::Debug for Vfs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vfs")
            .field("nodes", &self.tree().len())
            .field("disks", &self.disks())
            .field("dirents", &self.cached_dirents())
            .finish()
    }
}
