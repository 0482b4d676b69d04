//! Plain-text disk images for [`MemFs`](crate::MemFs).
//!
//! One entry per line: a kind letter, the path, and for files the size.
//! Blank lines and lines starting with `#` are skipped.
//!
//! ```text
//! # memdisk0
//! d /etc
//! f /etc/motd 12
//! f /index.html 1024
//! ```

use thiserror::Error;
use ukvfs::{DirentKind, Path};

/// One line of a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    pub path: Path,
    pub kind: DirentKind,
    pub size: u64,
}

/// A malformed listing line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {message}")]
pub struct ImageError {
    pub line: usize,
    pub message: String,
}

/// Parse a listing.
pub fn parse_listing(text: &str) -> Result<Vec<ListingEntry>, ImageError> {
    let mut entries = Vec::new();
    for (i, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let error = |message: &str| ImageError {
            line: i + 1,
            message: message.to_string(),
        };

        let mut fields = line.split_whitespace();
        let kind = fields.next().ok_or_else(|| error("missing kind"))?;
        let path = fields.next().ok_or_else(|| error("missing path"))?;
        let entry = match kind {
            "d" => ListingEntry {
                path: Path::new(path),
                kind: DirentKind::Directory,
                size: 0,
            },
            "f" => {
                let size = fields
                    .next()
                    .ok_or_else(|| error("missing file size"))?
                    .parse::<u64>()
                    .map_err(|_| error("file size is not a number"))?;
                ListingEntry {
                    path: Path::new(path),
                    kind: DirentKind::File,
                    size,
                }
            }
            other => return Err(error(&format!("unknown kind '{}'", other))),
        };
        if fields.next().is_some() {
            return Err(error("trailing fields"));
        }
        entries.push(entry);
    }
    Ok(entries)
}

/// Render entries back into listing text.
pub fn render_listing<'a>(entries: impl IntoIterator<Item = &'a ListingEntry>) -> String {
    let mut out = String::new();
    for entry in entries {
        match entry.kind {
            DirentKind::Directory => out.push_str(&format!("d {}\n", entry.path)),
            DirentKind::File => out.push_str(&format!("f {} {}\n", entry.path, entry.size)),
            DirentKind::Invalid => {}
        }
    }
    out
}
