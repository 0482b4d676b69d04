//! Disk handles: a block device plus its (optional) file system.

use std::sync::{Arc, PoisonError, RwLock};

use ukvfs_device::BlockDevice;

use crate::error::{Result, VfsError};
use crate::fs::{FileSystem, FsFactory};

/// Shared handle to a [`Disk`]. Lives as long as its longest holder.
pub type DiskHandle = Arc<Disk>;

/// A block device and the file system mounted on it, if any.
pub struct Disk {
    device: Arc<dyn BlockDevice>,
    fs: RwLock<Option<Arc<dyn FileSystem>>>,
}

impl Disk {
    pub fn new(device: Arc<dyn BlockDevice>) -> Self {
        Disk {
            device,
            fs: RwLock::new(None),
        }
    }

    /// The device identity, used as the disk's key in the VFS.
    pub fn name(&self) -> &str {
        self.device.device_name()
    }

    pub fn device(&self) -> &Arc<dyn BlockDevice> {
        &self.device
    }

    pub fn fs_mounted(&self) -> bool {
        self.fs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// The attached file system.
    pub fn fs(&self) -> Result<Arc<dyn FileSystem>> {
        self.fs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(|| VfsError::NotMounted {
                disk: self.name().to_string(),
            })
    }

    /// Attach `fs` to this disk. A disk carries at most one file system.
    pub fn mount_fs(&self, fs: Arc<dyn FileSystem>) -> Result<()> {
        let mut slot = self.fs.write().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            return Err(VfsError::FsAlreadyMounted {
                disk: self.name().to_string(),
            });
        }
        tracing::info!(disk = %self.name(), fs = %fs.name(), "mounted file system");
        *slot = Some(fs);
        Ok(())
    }

    /// Build a file system for this disk's device with `factory` and attach it.
    pub fn init_fs(&self, factory: &dyn FsFactory) -> Result<()> {
        if self.fs_mounted() {
            return Err(VfsError::FsAlreadyMounted {
                disk: self.name().to_string(),
            });
        }
        let fs = factory.create(&self.device)?;
        self.mount_fs(fs)
    }
}

impl std::fmt::Debug for Disk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let fs = self.fs().ok();
        f.debug_struct("Disk")
            .field("name", &self.name())
            .field("driver", &self.device.driver_name())
            .field("fs", &fs.as_deref().map(|fs| fs.name()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FsError;
    use crate::fs::tests::ListingFs;
    use ukvfs_device::MemDisk;

    fn disk() -> Disk {
        Disk::new(Arc::new(MemDisk::zeroed("memdisk0", 4096)))
    }

    #[test]
    fn disk_takes_device_name() {
        let d = disk();
        assert_eq!(d.name(), "memdisk0");
        assert_eq!(d.device().size(), 4096);
    }

    #[test]
    fn fs_is_not_mounted_initially() {
        let d = disk();
        assert!(!d.fs_mounted());
        assert!(matches!(d.fs(), Err(VfsError::NotMounted { .. })));
    }

    #[test]
    fn mount_fs_once() {
        let d = disk();
        d.mount_fs(ListingFs::new(&[], &[])).unwrap();
        assert!(d.fs_mounted());
        assert_eq!(d.fs().unwrap().name(), "listing");

        assert!(matches!(
            d.mount_fs(ListingFs::new(&[], &[])),
            Err(VfsError::FsAlreadyMounted { .. })
        ));
    }

    struct ListingFactory;

    impl FsFactory for ListingFactory {
        fn create(
            &self,
            device: &Arc<dyn BlockDevice>,
        ) -> std::result::Result<Arc<dyn FileSystem>, FsError> {
            if device.size() == 0 {
                return Err(FsError::Other {
                    message: "empty device".to_string(),
                });
            }
            Ok(ListingFs::new(&[], &[]))
        }
    }

    #[test]
    fn init_fs_uses_factory() {
        let d = disk();
        d.init_fs(&ListingFactory).unwrap();
        assert!(d.fs_mounted());
    }

    #[test]
    fn init_fs_propagates_factory_errors() {
        let d = Disk::new(Arc::new(MemDisk::zeroed("empty", 0)));
        assert!(matches!(
            d.init_fs(&ListingFactory),
            Err(VfsError::Fs(FsError::Other { .. }))
        ));
        assert!(!d.fs_mounted());
    }
}
