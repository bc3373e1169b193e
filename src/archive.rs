//! ZIP archives of finished output folders.
//!
//! [`zip_directory`] packs every file under a folder (recursively, paths
//! relative to the folder, `/`-separated) into one Deflate-compressed archive.
//!
//! | Situation               | Result                                   |
//! |-------------------------|------------------------------------------|
//! | dry run                 | [`ArchiveStatus::Simulated`], no file    |
//! | folder has no files     | [`ArchiveStatus::SkippedEmpty`], no file |
//! | written                 | [`ArchiveStatus::Written`]               |
//! | any failure             | [`ArchiveStatus::Failed`], partial zip removed |
//!
//! Only `Failed` counts as failure. Nothing here returns an error to the
//! caller; the orchestrator decides how loudly to report a failed archive.

use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

const DEFLATE_LEVEL: i64 = 6;

#[derive(Error, Debug)]
enum ArchiveError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("Failed to walk folder: {0}")]
    Walk(#[from] walkdir::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveStatus {
    Written { files: usize },
    SkippedEmpty,
    Simulated,
    Failed(String),
}

impl ArchiveStatus {
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed(_))
    }
}

/// Archive `source` into `dest`.
///
/// `progress` receives `archived / total` after each file, so it rises
/// monotonically to 1.0.
pub fn zip_directory(
    source: &Path,
    dest: &Path,
    dry_run: bool,
    progress: Option<&mut dyn FnMut(f64)>,
) -> ArchiveStatus {
    if dry_run {
        tracing::debug!(source = %source.display(), dest = %dest.display(), "simulated archive");
        return ArchiveStatus::Simulated;
    }
    if !source.is_dir() {
        return ArchiveStatus::Failed(format!("folder '{}' does not exist", source.display()));
    }

    let files = match collect_files(source, dest) {
        Ok(files) => files,
        Err(e) => return ArchiveStatus::Failed(e.to_string()),
    };
    if files.is_empty() {
        tracing::debug!(source = %source.display(), "skipping empty folder");
        return ArchiveStatus::SkippedEmpty;
    }

    match write_archive(source, dest, &files, progress) {
        Ok(()) => ArchiveStatus::Written { files: files.len() },
        Err(e) => {
            if dest.exists() {
                if let Err(cleanup) = fs::remove_file(dest) {
                    tracing::warn!(
                        dest = %dest.display(),
                        error = %cleanup,
                        "could not remove partial archive"
                    );
                }
            }
            ArchiveStatus::Failed(e.to_string())
        }
    }
}

fn collect_files(source: &Path, dest: &Path) -> Result<Vec<PathBuf>, ArchiveError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(source).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_file() && entry.path() != dest {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

fn write_archive(
    source: &Path,
    dest: &Path,
    files: &[PathBuf],
    mut progress: Option<&mut dyn FnMut(f64)>,
) -> Result<(), ArchiveError> {
    let mut zip = ZipWriter::new(File::create(dest)?);
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(DEFLATE_LEVEL));

    let total = files.len();
    for (i, path) in files.iter().enumerate() {
        zip.start_file(entry_name(source, path), options)?;
        let mut reader = BufReader::new(File::open(path)?);
        io::copy(&mut reader, &mut zip)?;
        if let Some(report) = progress.as_deref_mut() {
            report((i + 1) as f64 / total as f64);
        }
    }
    zip.finish()?;
    Ok(())
}

/// Archive entry name: path relative to `root`, always `/`-separated.
fn entry_name(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
