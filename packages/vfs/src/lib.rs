//! ukvfs: the virtual file system tree of a unikernel.
//!
//! One hierarchical namespace where arbitrary typed objects are mounted at
//! path-like names and fetched back by path:
//! - `Path`: tokenized slash-separated names
//! - `Entry` / `Tree`: type-erased nodes in an arena, and the path walker
//! - `Disk`: a block device plus the file system mounted on it
//! - `Dirent`: a resolved directory entry, the boundary between the VFS tree
//!   and a concrete file system
//! - `Vfs`: the mount registry tying it all together
//!
//! The tree never owns mounted objects. Callers keep an `Arc` and the tree
//! holds a weak reference, so a dropped object is reported as
//! [`VfsError::Expired`] rather than silently kept alive.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use ukvfs::{Vfs, VfsError};
//!
//! let vfs = Vfs::new();
//! let counter = Arc::new(42i32);
//! vfs.mount("/dev/counter", &counter, "Event counter").unwrap();
//!
//! assert_eq!(*vfs.get::<i32>("/dev/counter").unwrap(), 42);
//! assert!(matches!(
//!     vfs.get::<String>("/dev/counter"),
//!     Err(VfsError::BadCast { .. })
//! ));
//! ```

mod config;
mod disk;
mod entry;
mod error;
mod fs;
pub mod global;
mod path;
mod registry;
mod tree;

pub use config::{MountEntry, VfsConfig};
pub use disk::{Disk, DiskHandle};
pub use entry::{Access, Entry, Leaf};
pub use error::{FsError, Result, VfsError};
pub use fs::{Dirent, DirentKind, FileSystem, FsFactory, Metadata};
pub use path::Path;
pub use registry::{DirentKey, Vfs, VfsOptions};
pub use tree::{EntryId, Tree, Walk, WalkOptions};

// Re-export the device layer for convenience
pub use ukvfs_device::{BlockDevice, DeviceError, MemDisk};

// Re-exported so file-system providers can implement `FileSystem`
pub use async_trait::async_trait;
