//! Boot-time mount table.
//!
//! A unikernel's VFS is rebuilt on every boot from the `vfs` section of its
//! JSON configuration:
//!
//! ```json
//! {
//!   "vfs": [
//!     {"disk": "memdisk0", "root": "/etc", "mount": "/config", "description": "Config files"},
//!     {"disk": "memdisk0", "root": "/www/index.html", "mount": "/index"}
//!   ]
//! }
//! ```
//!
//! Other top-level sections are ignored so the whole config file can be fed in.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::registry::Vfs;

/// One row of the mount table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountEntry {
    /// Name of the disk holding the entry.
    pub disk: String,
    /// Path on the disk's file system.
    #[serde(default = "default_root")]
    pub root: String,
    /// Where to mount it in the VFS.
    pub mount: String,
    #[serde(default = "default_description")]
    pub description: String,
}

fn default_root() -> String {
    "/".to_string()
}

fn default_description() -> String {
    "N/A".to_string()
}

/// The mount table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VfsConfig {
    #[serde(default)]
    pub vfs: Vec<MountEntry>,
}

impl VfsConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

impl Vfs {
    /// Mount every row of `config`, in order.
    ///
    /// Stops at the first failing row; rows before it stay mounted.
    pub async fn apply_config(&self, config: &VfsConfig) -> Result<()> {
        for entry in &config.vfs {
            self.mount_dirent(
                entry.mount.as_str(),
                &entry.disk,
                entry.root.as_str(),
                &entry.description,
            )
            .await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VfsError;
    use crate::fs::tests::ListingFs;
    use std::sync::Arc;
    use ukvfs_device::MemDisk;

    #[test]
    fn parses_mount_table_with_defaults() {
        let config = VfsConfig::from_json(
            r#"{
                "net": {"iface": "eth0"},
                "vfs": [
                    {"disk": "memdisk0", "root": "/etc", "mount": "/config", "description": "cfg"},
                    {"disk": "memdisk0", "mount": "/disk"}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(config.vfs.len(), 2);
        assert_eq!(config.vfs[0].root, "/etc");
        assert_eq!(config.vfs[0].description, "cfg");
        assert_eq!(config.vfs[1].root, "/");
        assert_eq!(config.vfs[1].description, "N/A");
    }

    #[test]
    fn missing_section_is_empty() {
        let config = VfsConfig::from_json("{}").unwrap();
        assert!(config.vfs.is_empty());
    }

    #[test]
    fn bad_json_is_config_error() {
        assert!(matches!(
            VfsConfig::from_json(r#"{"vfs": [{"disk": 1}]}"#),
            Err(VfsError::Config(_))
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        assert!(matches!(
            VfsConfig::from_file("/definitely/not/here.json"),
            Err(VfsError::Io(_))
        ));
    }

    #[tokio::test]
    async fn apply_mounts_rows_in_order() {
        let vfs = Vfs::new();
        vfs.insert_disk(Arc::new(MemDisk::zeroed("memdisk0", 512)))
            .mount_fs(ListingFs::new(&[("/etc/motd", 5)], &["/etc"]))
            .unwrap();

        let config = VfsConfig::from_value(serde_json::json!({
            "vfs": [
                {"disk": "memdisk0", "root": "/etc", "mount": "/config"},
                {"disk": "memdisk0", "root": "/missing", "mount": "/never"},
                {"disk": "memdisk0", "root": "/etc/motd", "mount": "/motd"}
            ]
        }))
        .unwrap();

        let err = vfs.apply_config(&config).await.unwrap_err();
        assert!(matches!(err, VfsError::NotFound { .. }));

        assert!(vfs.stat_sync("/config/motd").unwrap().is_file());
        assert!(vfs.walk("/never", false).unwrap().is_none());
        assert!(vfs.walk("/motd", false).unwrap().is_none());
    }
}
