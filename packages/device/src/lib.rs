//! Block devices: the narrow waist underneath the VFS.
//!
//! Everything at this level is identity plus raw bytes. No paths, no
//! directory entries, no file-system interpretation - those belong to the
//! file-system drivers layered on top and to the VFS tree itself.
//!
//! # Example
//!
//! ```rust
//! use ukvfs_device::{BlockDevice, MemDisk};
//!
//! let disk = MemDisk::new("memdisk0", b"hello, unikernel".to_vec());
//! assert_eq!(disk.device_name(), "memdisk0");
//! assert_eq!(&disk.read_at(7, 9).unwrap()[..], b"unikernel");
//! ```

pub use bytes::Bytes;

mod error;
mod memdisk;
mod traits;

pub use error::DeviceError;
pub use memdisk::MemDisk;
pub use traits::{BlockDevice, DEFAULT_BLOCK_SIZE};
