//! Boot layout: memory disks plus a mount table.
//!
//! ```json
//! {
//!   "disks": [
//!     { "name": "memdisk0", "size": 4096,
//!       "entries": [{ "path": "/etc/motd", "kind": "file", "size": 12 }] }
//!   ],
//!   "vfs": [{ "disk": "memdisk0", "root": "/etc", "mount": "/config" }]
//! }
//! ```

use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::info;
use ukvfs::{DirentKind, Vfs, VfsConfig};
use ukvfs_device::MemDisk;
use ukvfs_memfs::{render_listing, ListingEntry, MemFsFactory};

/// Layout used when no config file is given.
pub const DEMO: &str = r#"{
    "disks": [
        {
            "name": "memdisk0",
            "size": 4096,
            "entries": [
                { "path": "/etc", "kind": "directory" },
                { "path": "/etc/motd", "kind": "file", "size": 12 },
                { "path": "/etc/hosts", "kind": "file", "size": 64 },
                { "path": "/www/index.html", "kind": "file", "size": 1024 },
                { "path": "/www/app.js", "kind": "file", "size": 300 }
            ]
        }
    ],
    "vfs": [
        { "disk": "memdisk0", "root": "/etc", "mount": "/config", "description": "Config files" },
        { "disk": "memdisk0", "root": "/www", "mount": "/srv/www", "description": "Web root" },
        { "disk": "memdisk0", "mount": "/mnt/disk0" }
    ]
}"#;

#[derive(Debug, Clone, Deserialize)]
pub struct EntrySpec {
    pub path: String,
    pub kind: DirentKind,
    #[serde(default)]
    pub size: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiskSpec {
    pub name: String,
    #[serde(default)]
    pub size: usize,
    #[serde(default)]
    pub entries: Vec<EntrySpec>,
}

impl DiskSpec {
    /// The disk image: the entry listing, zero padded to `size`.
    pub fn image(&self) -> Vec<u8> {
        let entries: Vec<ListingEntry> = self
            .entries
            .iter()
            .map(|e| ListingEntry {
                path: e.path.as_str().into(),
                kind: e.kind,
                size: e.size,
            })
            .collect();
        let mut image = render_listing(&entries).into_bytes();
        if image.len() < self.size {
            image.resize(self.size, 0);
        }
        image
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Disks {
    #[serde(default)]
    pub disks: Vec<DiskSpec>,
}

/// A parsed boot layout.
#[derive(Debug, Clone)]
pub struct Boot {
    pub disks: Vec<DiskSpec>,
    pub mounts: VfsConfig,
}

impl Boot {
    pub fn from_json(json: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json).context("parsing boot config")?;
        let Disks { disks } =
            serde_json::from_value(value.clone()).context("parsing disk section")?;
        let mounts = VfsConfig::from_value(value).context("parsing vfs section")?;
        Ok(Self { disks, mounts })
    }

    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::from_json(&json)
    }

    /// Create the disks under `/dev`, give each a file system and apply the
    /// mount table.
    pub async fn apply(&self, vfs: &Vfs) -> Result<()> {
        for spec in &self.disks {
            let device = Arc::new(MemDisk::new(spec.name.clone(), spec.image()));
            let disk = vfs
                .mount_device(format!("/dev/{}", spec.name), device, "Memory disk")
                .with_context(|| format!("mounting disk {}", spec.name))?;
            disk.init_fs(&MemFsFactory)
                .with_context(|| format!("initializing file system on {}", spec.name))?;
            info!(disk = %spec.name, entries = spec.entries.len(), "disk ready");
        }
        vfs.apply_config(&self.mounts)
            .await
            .context("applying mount table")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ukvfs::{Dirent, Disk};

    #[test]
    fn demo_parses() {
        let boot = Boot::from_json(DEMO).unwrap();
        assert_eq!(boot.disks.len(), 1);
        assert_eq!(boot.disks[0].entries.len(), 5);
        assert_eq!(boot.mounts.vfs.len(), 3);
        assert_eq!(boot.mounts.vfs[2].root, "/");
    }

    #[test]
    fn image_is_padded_listing() {
        let boot = Boot::from_json(DEMO).unwrap();
        let image = boot.disks[0].image();
        assert_eq!(image.len(), 4096);
        assert!(image.starts_with(b"d /etc\nf /etc/motd 12\n"));
    }

    #[tokio::test]
    async fn demo_boots() {
        let vfs = Vfs::new();
        Boot::from_json(DEMO).unwrap().apply(&vfs).await.unwrap();

        assert!(vfs.get::<Disk>("/dev/memdisk0").unwrap().fs_mounted());
        let config = vfs.get::<Dirent>("/config").unwrap();
        assert!(config.is_dir());

        let index = vfs.stat("/srv/www/index.html").await.unwrap();
        assert_eq!(index.size(), 1024);
        let motd = vfs.stat_sync("/mnt/disk0/etc/motd").unwrap();
        assert_eq!(motd.size(), 12);
    }

    #[tokio::test]
    async fn unknown_disk_in_mount_table_fails() {
        let vfs = Vfs::new();
        let boot = Boot::from_json(r#"{"vfs": [{"disk": "nope", "mount": "/x"}]}"#).unwrap();
        assert!(boot.apply(&vfs).await.is_err());
    }
}
