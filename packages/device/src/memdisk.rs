//! An in-memory, read-only disk image.

use bytes::Bytes;

use crate::{BlockDevice, DeviceError};

/// A read-only block device backed by an in-memory image.
///
/// This is what a unikernel gets when the boot image embeds a disk: the
/// bytes are already in memory and never change.
#[derive(Debug, Clone)]
pub struct MemDisk {
    name: String,
    image: Bytes,
}

impl MemDisk {
    /// Create a device named `name` over `image`.
    pub fn new(name: impl Into<String>, image: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            image: image.into(),
        }
    }

    /// A zero-filled image of `size` bytes.
    pub fn zeroed(name: impl Into<String>, size: usize) -> Self {
        Self::new(name, vec![0u8; size])
    }

    /// The raw image.
    pub fn image(&self) -> &Bytes {
        &self.image
    }
}

impl BlockDevice for MemDisk {
    fn device_name(&self) -> &str {
        &self.name
    }

    fn driver_name(&self) -> &str {
        "memdisk"
    }

    fn size(&self) -> u64 {
        self.image.len() as u64
    }

    fn read_at(&self, offset: u64, len: usize) -> Result<Bytes, DeviceError> {
        let range = usize::try_from(offset)
            .ok()
            .and_then(|start| start.checked_add(len).map(|end| start..end))
            .filter(|range| range.end <= self.image.len());

        match range {
            Some(range) => Ok(self.image.slice(range)),
            None => Err(DeviceError::OutOfRange {
                offset,
                len,
                size: self.size(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_inside_image() {
        let disk = MemDisk::new("memdisk0", b"0123456789".to_vec());
        assert_eq!(&disk.read_at(0, 4).unwrap()[..], b"0123");
        assert_eq!(&disk.read_at(6, 4).unwrap()[..], b"6789");
        assert_eq!(disk.read_at(10, 0).unwrap().len(), 0);
    }

    #[test]
    fn read_past_end_is_out_of_range() {
        let disk = MemDisk::new("memdisk0", b"0123456789".to_vec());
        let err = disk.read_at(8, 4).unwrap_err();
        assert!(matches!(
            err,
            DeviceError::OutOfRange {
                offset: 8,
                len: 4,
                size: 10
            }
        ));
    }

    #[test]
    fn writes_are_refused() {
        let disk = MemDisk::zeroed("memdisk0", 1024);
        assert!(matches!(
            disk.write_at(0, b"x"),
            Err(DeviceError::NotSupported)
        ));
    }

    #[test]
    fn overflowing_block_read_is_out_of_range() {
        let disk = MemDisk::zeroed("memdisk0", 1024);
        assert!(matches!(
            disk.read_blocks(u64::MAX / 2, 1),
            Err(DeviceError::OutOfRange {
                offset: u64::MAX,
                size: 1024,
                ..
            })
        ));
        assert!(matches!(
            disk.read_blocks(0, usize::MAX),
            Err(DeviceError::OutOfRange { len: usize::MAX, .. })
        ));
        assert!(matches!(
            disk.read_blocks(2, 1),
            Err(DeviceError::OutOfRange { offset: 1024, .. })
        ));
    }

    #[test]
    fn block_reads_use_block_size() {
        let mut image = vec![0u8; 1024];
        image[512] = 0xAA;
        let disk = MemDisk::new("memdisk0", image);
        assert_eq!(disk.block_count(), 2);
        let block = disk.read_blocks(1, 1).unwrap();
        assert_eq!(block.len(), 512);
        assert_eq!(block[0], 0xAA);
    }

    #[test]
    fn identity_is_the_given_name() {
        let disk = MemDisk::zeroed("vblk3", 0);
        assert_eq!(disk.device_name(), "vblk3");
        assert_eq!(disk.driver_name(), "memdisk");
        assert_eq!(disk.size(), 0);
    }
}
