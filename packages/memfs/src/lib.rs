//! A dictionary-backed file system for the unikernel VFS.
//!
//! `MemFs` answers `stat` from an in-memory listing. It can be filled in
//! code, or read from a block device whose image is a plain-text listing
//! (see [`image`]), which is what [`MemFsFactory`] does when a disk asks for
//! its file system to be initialized.

pub mod image;
mod memfs;

pub use image::{parse_listing, render_listing, ImageError, ListingEntry};
pub use memfs::{MemFs, MemFsFactory};
