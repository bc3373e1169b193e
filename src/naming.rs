//! Output filename rules.
//!
//! Three concerns live here, all pure string/path work plus one filesystem
//! pass:
//!
//! ## Prefixes
//!
//! With `add_prefix` on, every exported file gets a role prefix so a client
//! can tell the copies apart once they are mixed in one folder:
//!
//! | Role       | Example                         |
//! |------------|---------------------------------|
//! | original   | `IMG_0042.jpg` → `Original_IMG_0042.jpg`   |
//! | raw        | `IMG_0042.CR2` → `RAW_IMG_0042.CR2`        |
//! | optimized  | `IMG_0042.png` → `Optimized_IMG_0042.jpg`  |
//! | compressed | `IMG_0042.png` → `Compressed_IMG_0042.webp`|
//!
//! ## Collisions
//!
//! Every output folder is flat, so two sources from different subdirectories
//! (or `a.jpg` next to `a.png`) can share a stem.
//!
//! - Variants: [`reserve_variant_stems`] hands out one stem per source before
//!   any worker starts, in scan order, so `day1/img.jpg` → `img` and
//!   `day2/img.jpg` → `img_1` no matter which worker finishes first.
//! - Originals and RAW files: [`unique_destination`] appends `_1`, `_2`, … to
//!   the stem instead of overwriting.
//!
//! ## Sequential renaming
//!
//! With a rename base set, each finished folder is renamed in name order to
//! `NNN-<base>.<ext>`:
//! - `DSC_0003.jpg`, `DSC_0001.jpg` → `001-Wedding.jpg`, `002-Wedding.jpg`
//! - numbering is 1-based and zero-padded to three digits
//! - extensions are lowercased
//! - an existing target is never overwritten; the file keeps its name

use crate::config::ExtensionSets;
use crate::events::Reporter;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// `<prefix><file_name>`, or `file_name` unchanged when prefixing is off.
pub fn prefixed_name(file_name: &str, prefix: &str, add_prefix: bool) -> String {
    if add_prefix {
        format!("{prefix}{file_name}")
    } else {
        file_name.to_string()
    }
}

/// File name for a generated variant: reserved stem, optional prefix, new extension.
pub fn variant_file_name(stem: &str, prefix: &str, add_prefix: bool, ext: &str) -> String {
    prefixed_name(&format!("{stem}.{ext}"), prefix, add_prefix)
}

/// One output stem per source, unique within the job.
///
/// A source keeps its own stem when it is still free; otherwise it gets the
/// first free `stem_N`. Comparison ignores case so the names also stay
/// distinct on case-insensitive filesystems.
pub fn reserve_variant_stems(sources: &[PathBuf]) -> Vec<String> {
    let mut taken = HashSet::new();
    sources
        .iter()
        .map(|source| {
            let stem = source
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "image".to_string());
            let mut candidate = stem.clone();
            let mut n = 0u32;
            while taken.contains(&candidate.to_lowercase()) {
                n += 1;
                candidate = format!("{stem}_{n}");
            }
            taken.insert(candidate.to_lowercase());
            candidate
        })
        .collect()
}

/// First path in `dir` named `file_name` (or `stem_N.ext`) that does not exist yet.
pub fn unique_destination(dir: &Path, file_name: &str) -> PathBuf {
    let candidate = dir.join(file_name);
    if !candidate.exists() {
        return candidate;
    }
    let name = Path::new(file_name);
    let stem = name
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = name.extension().map(|e| e.to_string_lossy().into_owned());
    (1u32..)
        .map(|n| match &ext {
            Some(ext) => dir.join(format!("{stem}_{n}.{ext}")),
            None => dir.join(format!("{stem}_{n}")),
        })
        .find(|p| !p.exists())
        .unwrap_or(candidate)
}

/// `NNN-<base>.<ext>` with a three-digit, 1-based counter.
pub fn sequence_name(index: usize, base: &str, ext: &str) -> String {
    format!("{index:03}-{base}.{}", ext.to_lowercase())
}

/// Rename the image files directly inside `folder` to `NNN-<base>.<ext>`.
///
/// Returns how many files ended up with their sequential name (or, in a dry
/// run, would have). A missing folder is a no-op.
pub fn rename_sequentially(
    folder: &Path,
    base: &str,
    extensions: &ExtensionSets,
    dry_run: bool,
    reporter: &Reporter,
) -> usize {
    let mut files: Vec<PathBuf> = match fs::read_dir(folder) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file() && extensions.classify(p).is_some())
            .collect(),
        Err(_) if dry_run => Vec::new(),
        Err(e) => {
            if folder.exists() {
                reporter.error(format!(
                    "Cannot list '{}' for renaming: {e}",
                    folder.display()
                ));
            }
            return 0;
        }
    };
    files.sort();

    let mut counter = 1;
    for path in &files {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default();
        let new_name = sequence_name(counter, base, &ext);
        let target = folder.join(&new_name);
        let old_name = display_name(path);

        if *path == target {
            counter += 1;
            continue;
        }
        if dry_run {
            reporter.simulated(format!("Would rename '{old_name}' to '{new_name}'"));
            counter += 1;
            continue;
        }
        if target.exists() {
            reporter.warn(format!(
                "Rename target '{}' already exists, keeping '{old_name}'",
                target.display()
            ));
            continue;
        }
        match fs::rename(path, &target) {
            Ok(()) => {
                reporter.debug(format!("Renamed '{old_name}' to '{new_name}'"));
                counter += 1;
            }
            Err(e) => reporter.error(format!("Rename failed for '{old_name}': {e}")),
        }
    }
    counter - 1
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
