//! Error types for the VFS.

use ukvfs_device::DeviceError;

/// Errors reported by a file-system provider.
#[derive(thiserror::Error, Debug)]
pub enum FsError {
    #[error("no such file or directory: {path}")]
    NotFound { path: String },

    #[error("not a directory: {path}")]
    NotADirectory { path: String },

    #[error("device error: {0}")]
    Device(#[from] DeviceError),

    #[error("{message}")]
    Other { message: String },
}

/// Errors raised by the VFS tree and the mount registry.
///
/// Every failure is reported to the immediate caller; nothing in the VFS
/// retries or recovers on its own.
#[derive(thiserror::Error, Debug)]
pub enum VfsError {
    /// Object access on a node that holds no object.
    #[error("{name} does not hold an object")]
    NotLeaf { name: String },

    /// The stored type or access mode doesn't match the request.
    #[error("{name}: {message}")]
    BadCast { name: String, message: String },

    /// Child access on a node that can't have children.
    #[error("{name} holds an object and can't have children")]
    NotParent { name: String },

    /// A path, disk or directory entry that doesn't exist.
    #[error("not found: {message}")]
    NotFound { message: String },

    /// Mount onto an occupied name, or under a missing parent.
    #[error("invalid mount point: {message}")]
    MountpointInvalid { message: String },

    /// The disk exists but has no file system attached.
    #[error("disk {disk} does not have a mounted file system")]
    NotMounted { disk: String },

    /// The disk already has a file system attached.
    #[error("disk {disk} already has a mounted file system")]
    FsAlreadyMounted { disk: String },

    /// The mounted object has been dropped by its owner.
    #[error("object mounted at {name} no longer exists")]
    Expired { name: String },

    #[error("file system error: {0}")]
    Fs(#[from] FsError),

    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for VFS operations.
pub type Result<T> = std::result::Result<T, VfsError>;

impl VfsError {
    pub(crate) fn not_found(message: impl Into<String>) -> Self {
        VfsError::NotFound {
            message: message.into(),
        }
    }

    pub(crate) fn mountpoint_invalid(message: impl Into<String>) -> Self {
        VfsError::MountpointInvalid {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as StdError;

    #[test]
    fn not_found_display() {
        let e = VfsError::not_found("path /a/b does not exist");
        assert_eq!(e.to_string(), "not found: path /a/b does not exist");
    }

    #[test]
    fn bad_cast_display() {
        let e = VfsError::BadCast {
            name: "counter".to_string(),
            message: "is not of type alloc::string::String".to_string(),
        };
        let display = e.to_string();
        assert!(display.starts_with("counter"));
        assert!(display.contains("alloc::string::String"));
    }

    #[test]
    fn not_mounted_display() {
        let e = VfsError::NotMounted {
            disk: "memdisk0".to_string(),
        };
        assert!(e.to_string().contains("memdisk0"));
    }

    #[test]
    fn fs_error_converts_and_keeps_source() {
        let e: VfsError = FsError::NotFound {
            path: "/etc/motd".to_string(),
        }
        .into();
        assert!(matches!(e, VfsError::Fs(FsError::NotFound { .. })));
        assert!(StdError::source(&e).is_some());
        assert!(e.to_string().contains("/etc/motd"));
    }

    #[test]
    fn device_error_converts() {
        let e: FsError = DeviceError::NotSupported.into();
        assert!(matches!(e, FsError::Device(DeviceError::NotSupported)));
        assert_eq!(e.to_string(), "device error: operation not supported");
    }

    #[test]
    fn config_error_converts() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let e: VfsError = json_err.into();
        assert!(matches!(e, VfsError::Config(_)));
        assert!(e.to_string().starts_with("config error"));
    }
}
