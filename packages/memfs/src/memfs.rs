//! The in-memory file system.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use ukvfs::{BlockDevice, DirentKind, FileSystem, FsError, FsFactory, Metadata, Path};

use crate::image::{parse_listing, ListingEntry};

/// A file system answering `stat` from an in-memory listing.
///
/// Adding a path also adds its missing parent directories. The listing can
/// change at runtime, which lets tests observe how the VFS treats a file
/// system that moved on after an entry was cached.
///
/// # Example
///
/// ```rust
/// use ukvfs::{FileSystem, Path};
/// use ukvfs_memfs::MemFs;
///
/// let fs = MemFs::new().with_file("/etc/motd", 12);
/// assert!(fs.stat_sync(&Path::new("/etc")).is_ok());
/// assert_eq!(fs.stat_sync(&Path::new("/etc/motd")).unwrap().size, 12);
/// ```
pub struct MemFs {
    name: String,
    entries: RwLock<BTreeMap<Path, Metadata>>,
    stat_calls: AtomicUsize,
    yields: usize,
}

impl MemFs {
    /// An empty file system holding only its root directory.
    pub fn new() -> Self {
        let mut entries = BTreeMap::new();
        entries.insert(Path::root(), Metadata::directory(Path::root()));
        Self {
            name: "memfs".to_string(),
            entries: RwLock::new(entries),
            stat_calls: AtomicUsize::new(0),
            yields: 0,
        }
    }

    /// Build a file system from listing entries.
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = &'a ListingEntry>) -> Self {
        let fs = Self::new();
        for entry in entries {
            match entry.kind {
                DirentKind::Directory => fs.add_dir(&entry.path),
                DirentKind::File => fs.add_file(&entry.path, entry.size),
                DirentKind::Invalid => {}
            }
        }
        fs
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_file(self, path: impl Into<Path>, size: u64) -> Self {
        self.add_file(path, size);
        self
    }

    pub fn with_dir(self, path: impl Into<Path>) -> Self {
        self.add_dir(path);
        self
    }

    /// Make every async `stat` yield to the scheduler `yields` times
    /// before answering, so concurrent lookups interleave.
    pub fn with_yields(mut self, yields: usize) -> Self {
        self.yields = yields;
        self
    }

    fn entries(&self) -> std::sync::RwLockWriteGuard<'_, BTreeMap<Path, Metadata>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn insert_parents(entries: &mut BTreeMap<Path, Metadata>, path: &Path) {
        for depth in 1..path.len() {
            let parent = Path::from_components(path.components[..depth].iter().cloned());
            entries
                .entry(parent.clone())
                .or_insert_with(|| Metadata::directory(parent));
        }
    }

    pub fn add_file(&self, path: impl Into<Path>, size: u64) {
        let path = path.into();
        let mut entries = self.entries();
        Self::insert_parents(&mut entries, &path);
        entries.insert(path.clone(), Metadata::file(path, size));
    }

    pub fn add_dir(&self, path: impl Into<Path>) {
        let path = path.into();
        let mut entries = self.entries();
        Self::insert_parents(&mut entries, &path);
        entries.insert(path.clone(), Metadata::directory(path));
    }

    /// Remove `path` and everything below it.
    pub fn remove(&self, path: impl Into<Path>) -> bool {
        let path = path.into();
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|p, _| !p.has_prefix(&path) || (path.is_empty() && p.is_empty()));
        entries.len() != before
    }

    /// How many times `stat` or `stat_sync` has been called.
    pub fn stat_calls(&self) -> usize {
        self.stat_calls.load(Ordering::SeqCst)
    }

    /// Number of entries, root included.
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lookup(&self, path: &Path) -> Result<Metadata, FsError> {
        self.stat_calls.fetch_add(1, Ordering::SeqCst);
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        if let Some(meta) = entries.get(path) {
            return Ok(meta.clone());
        }
        // A file in the middle of the path is a different failure than a miss
        for depth in 1..path.len() {
            let prefix = Path::from_components(path.components[..depth].iter().cloned());
            if matches!(entries.get(&prefix), Some(m) if m.kind == DirentKind::File) {
                return Err(FsError::NotADirectory {
                    path: prefix.to_string(),
                });
            }
        }
        Err(FsError::NotFound {
            path: path.to_string(),
        })
    }
}

impl Default for MemFs {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FileSystem for MemFs {
    fn name(&self) -> &str {
        &self.name
    }

    async fn stat(&self, path: &Path) -> Result<Metadata, FsError> {
        for _ in 0..self.yields {
            tokio::task::yield_now().await;
        }
        self.lookup(path)
    }

    fn stat_sync(&self, path: &Path) -> Result<Metadata, FsError> {
        self.lookup(path)
    }
}

/// Initializes a [`MemFs`] from a device whose image is a listing.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemFsFactory;

impl FsFactory for MemFsFactory {
    fn create(&self, device: &Arc<dyn BlockDevice>) -> Result<Arc<dyn FileSystem>, FsError> {
        let size = usize::try_from(device.size()).map_err(|_| FsError::Other {
            message: format!("device {} too large for memfs", device.device_name()),
        })?;
        let image = device.read_at(0, size)?;
        let text = std::str::from_utf8(&image).map_err(|_| FsError::Other {
            message: format!("device {} does not hold a text listing", device.device_name()),
        })?;
        // Zero padding after the listing is allowed
        let text = text.trim_end_matches('\0');
        let entries = parse_listing(text).map_err(|e| FsError::Other {
            message: format!("device {}: {}", device.device_name(), e),
        })?;

        tracing::debug!(
            device = %device.device_name(),
            entries = entries.len(),
            "initialized memfs"
        );
        Ok(Arc::new(MemFs::from_entries(&entries).with_name("memfs")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ukvfs_device::MemDisk;

    #[test]
    fn new_fs_has_root() {
        let fs = MemFs::new();
        assert_eq!(fs.len(), 1);
        let root = fs.stat_sync(&Path::root()).unwrap();
        assert_eq!(root.kind, DirentKind::Directory);
    }

    #[test]
    fn adding_a_file_adds_parents() {
        let fs = MemFs::new().with_file("/a/b/c.txt", 3);
        assert_eq!(fs.len(), 4);
        assert_eq!(
            fs.stat_sync(&Path::new("/a/b")).unwrap().kind,
            DirentKind::Directory
        );
    }

    #[test]
    fn missing_and_not_a_directory() {
        let fs = MemFs::new().with_file("/f.txt", 1);
        assert!(matches!(
            fs.stat_sync(&Path::new("/nope")),
            Err(FsError::NotFound { .. })
        ));
        assert!(matches!(
            fs.stat_sync(&Path::new("/f.txt/inner")),
            Err(FsError::NotADirectory { .. })
        ));
    }

    #[test]
    fn remove_drops_subtree() {
        let fs = MemFs::new().with_file("/a/b", 1).with_file("/c", 1);
        assert!(fs.remove("/a"));
        assert!(fs.stat_sync(&Path::new("/a/b")).is_err());
        assert!(fs.stat_sync(&Path::new("/c")).is_ok());
        assert!(!fs.remove("/a"));
    }

    #[test]
    fn counts_stat_calls() {
        let fs = MemFs::new();
        let _ = fs.stat_sync(&Path::root());
        let _ = fs.stat_sync(&Path::new("/x"));
        assert_eq!(fs.stat_calls(), 2);
    }

    #[tokio::test]
    async fn async_stat_with_yields() {
        let fs = MemFs::new().with_dir("/etc").with_yields(3);
        let meta = fs.stat(&Path::new("/etc")).await.unwrap();
        assert_eq!(meta.kind, DirentKind::Directory);
        assert_eq!(fs.stat_calls(), 1);
    }

    #[test]
    fn factory_reads_listing_from_device() {
        let mut image = b"d /etc\nf /etc/motd 12\n".to_vec();
        image.resize(512, 0);
        let device: Arc<dyn BlockDevice> = Arc::new(MemDisk::new("memdisk0", image));

        let fs = MemFsFactory.create(&device).unwrap();
        assert_eq!(fs.name(), "memfs");
        assert_eq!(fs.stat_sync(&Path::new("/etc/motd")).unwrap().size, 12);
    }

    #[test]
    fn factory_rejects_garbage() {
        let device: Arc<dyn BlockDevice> =
            Arc::new(MemDisk::new("junk", vec![0xff, 0xfe, 0x00]));
        assert!(matches!(
            MemFsFactory.create(&device),
            Err(FsError::Other { .. })
        ));

        let device: Arc<dyn BlockDevice> = Arc::new(MemDisk::new("bad", b"q /x".to_vec()));
        match MemFsFactory.create(&device) {
            Err(err) => assert!(err.to_string().contains("line 1")),
            Ok(_) => panic!("listing with an unknown kind was accepted"),
        }
    }
}
