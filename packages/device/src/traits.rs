//! The block-device capability.

use bytes::Bytes;

use crate::DeviceError;

/// Sector size assumed by devices that don't say otherwise.
pub const DEFAULT_BLOCK_SIZE: usize = 512;

/// A block device as seen by the VFS.
///
/// The VFS only relies on [`device_name`](BlockDevice::device_name): it is
/// the key under which the device's disk handle is registered. The byte
/// I/O methods are for the file-system drivers that sit on top.
///
/// # Object Safety
///
/// This trait is object-safe: devices are passed around as
/// `Arc<dyn BlockDevice>`.
pub trait BlockDevice: Send + Sync {
    /// Stable identity of the device, e.g. `"memdisk0"` or `"vblk1"`.
    fn device_name(&self) -> &str;

    /// Human readable driver name.
    fn driver_name(&self) -> &str {
        "unknown"
    }

    /// Size of one block in bytes.
    fn block_size(&self) -> usize {
        DEFAULT_BLOCK_SIZE
    }

    /// Total size of the device in bytes.
    fn size(&self) -> u64;

    /// Read `len` bytes starting at byte `offset`.
    fn read_at(&self, offset: u64, len: usize) -> Result<Bytes, DeviceError>;

    /// Write `data` starting at byte `offset`.
    ///
    /// Read-only devices keep the default, which refuses.
    fn write_at(&self, offset: u64, data: &[u8]) -> Result<(), DeviceError> {
        let _ = (offset, data);
        Err(DeviceError::NotSupported)
    }

    /// Read whole blocks, `count` of them starting at block `block`.
    ///
    /// A range whose byte offset or length overflows is out of range.
    fn read_blocks(&self, block: u64, count: usize) -> Result<Bytes, DeviceError> {
        let block_size = self.block_size();
        let offset = block.checked_mul(block_size as u64);
        let len = count.checked_mul(block_size);
        match (offset, len) {
            (Some(offset), Some(len)) => self.read_at(offset, len),
            _ => Err(DeviceError::OutOfRange {
                offset: block.saturating_mul(block_size as u64),
                len: count.saturating_mul(block_size),
                size: self.size(),
            }),
        }
    }

    /// Number of whole blocks on the device; 0 when the block size is 0.
    fn block_count(&self) -> u64 {
        self.size()
            .checked_div(self.block_size() as u64)
            .unwrap_or(0)
    }
}
