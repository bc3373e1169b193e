//! Source directory scanning.
//!
//! Stage 1 of a packaging run. Walks the source tree recursively and sorts
//! every file into one of two buckets by extension:
//!
//! | Bucket     | Extensions (case-insensitive)                          |
//! |------------|--------------------------------------------------------|
//! | standard   | `jpg jpeg png gif webp bmp tif tiff tga exr …`         |
//! | raw        | `cr2 cr3 nef arw dng orf rw2 raf srw pef …`            |
//!
//! The lists live in [`ExtensionSets`] and can be overridden through
//! `packaging.toml`. Anything else is ignored.
//!
//! ## Rules
//!
//! - Both lists are ordered by path (directory entries sorted by name), so
//!   the serial pipeline processes images in a stable order.
//! - Hidden entries (dot-files such as macOS `._IMG_0001.jpg` sidecars) are
//!   skipped along with everything under hidden directories.
//! - With `include_raw = false` RAW files are not collected at all: they do
//!   not appear in the scan result and never reach the summary counts.
//! - An `exclude` directory (the package being built, when the output parent
//!   sits inside the source) is never descended into.

use crate::config::{ExtensionSets, FileKind};
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Source directory not found: {0}")]
    NotFound(PathBuf),
    #[error("Source is not a directory: {0}")]
    NotADirectory(PathBuf),
    #[error("Failed to walk {path}: {message}")]
    Walk { path: PathBuf, message: String },
}

/// Files discovered under a source directory.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScanResult {
    pub standard: Vec<PathBuf>,
    pub raw: Vec<PathBuf>,
}

impl ScanResult {
    pub fn total(&self) -> usize {
        self.standard.len() + self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    pub fn has_raw(&self) -> bool {
        !self.raw.is_empty()
    }
}

/// Recursively collect standard and RAW images under `root`.
pub fn scan_source(
    root: &Path,
    extensions: &ExtensionSets,
    include_raw: bool,
    exclude: Option<&Path>,
) -> Result<ScanResult, ScanError> {
    if !root.exists() {
        return Err(ScanError::NotFound(root.to_path_buf()));
    }
    if !root.is_dir() {
        return Err(ScanError::NotADirectory(root.to_path_buf()));
    }

    let mut result = ScanResult::default();
    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !(is_hidden(e) || is_excluded(e, exclude)));

    for entry in walker {
        let entry = entry.map_err(|e| ScanError::Walk {
            path: e.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf()),
            message: e.to_string(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        match extensions.classify(entry.path()) {
            Some(FileKind::Standard) => result.standard.push(entry.into_path()),
            Some(FileKind::Raw) if include_raw => result.raw.push(entry.into_path()),
            _ => {}
        }
    }

    tracing::debug!(
        root = %root.display(),
        standard = result.standard.len(),
        raw = result.raw.len(),
        "scan complete"
    );
    Ok(result)
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}

fn is_excluded(entry: &DirEntry, exclude: Option<&Path>) -> bool {
    exclude.is_some_and(|dir| entry.path() == dir)
}
