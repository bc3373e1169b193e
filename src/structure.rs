//! Output directory layout.
//!
//! Stage 2 of a packaging run. Computes where every output goes and creates
//! the folders that the run's settings call for:
//!
//! ```text
//! <output parent>/
//! └── <shoot name>/
//!     ├── README.txt
//!     ├── photopackager_run.log        # target path only
//!     ├── Optimized Files/
//!     │   ├── Optimized JPGs/           # generate_jpg
//!     │   └── Optimized WebPs/          # generate_webp
//!     ├── Compressed Files/
//!     │   ├── Compressed JPGs/          # generate_compressed_jpg
//!     │   └── Compressed WebPs/         # generate_compressed_webp
//!     ├── Export Originals/             # originals copy|move, export not skipped
//!     └── RAW Files/                    # include_raw, RAW found, raw copy|move
//!         └── README.txt
//! ```
//!
//! Folder names come from [`FolderNames`](crate::config::FolderNames).
//! Planning is pure ([`plan_output_structure`]); building creates folders with
//! `create_dir_all`, so running it twice is a no-op the second time. In a dry
//! run nothing is written and the same planned map is returned.

use crate::config::{FolderNames, PackagingConfig};
use crate::events::Reporter;
use crate::settings::Settings;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const TOOL_DISPLAY_NAME: &str = "PhotoPackager";
pub const ORIGINAL_AUTHOR: &str = "Steven Seagondollar, DropShock Digital LLC";
pub const ORIGINAL_TOOL_REPO: &str = "https://github.com/Droptimal/PhotoPackager";

#[derive(Error, Debug)]
pub enum StructureError {
    #[error("Failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to write {path}: {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Planned (and, outside dry runs, created) output paths of one run.
///
/// Optional folders are `None` when the settings do not call for them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputStructure {
    pub top_level: PathBuf,
    pub optimized_jpg: Option<PathBuf>,
    pub optimized_webp: Option<PathBuf>,
    pub compressed_jpg: Option<PathBuf>,
    pub compressed_webp: Option<PathBuf>,
    pub originals: Option<PathBuf>,
    pub raw: Option<PathBuf>,
    pub readme: PathBuf,
    pub log_file: PathBuf,
}

/// A folder that gets its own ZIP archive.
#[derive(Debug, Clone, PartialEq)]
pub struct ArchiveTarget {
    pub folder: PathBuf,
    pub zip: PathBuf,
}

impl OutputStructure {
    /// Every folder in the map, parents before children.
    pub fn folders(&self) -> Vec<&Path> {
        let mut folders: Vec<&Path> = std::iter::once(self.top_level.as_path())
            .chain(self.variant_folders())
            .chain(self.originals.as_deref())
            .chain(self.raw.as_deref())
            .collect();
        folders.sort();
        folders.dedup();
        folders
    }

    /// Leaf folders that receive generated variants.
    pub fn variant_folders(&self) -> impl Iterator<Item = &Path> {
        [
            &self.optimized_jpg,
            &self.optimized_webp,
            &self.compressed_jpg,
            &self.compressed_webp,
        ]
        .into_iter()
        .filter_map(|p| p.as_deref())
    }

    /// One archive per top-level output folder: originals, optimized,
    /// compressed, RAW. Each zip sits next to its folder.
    pub fn archive_targets(&self, names: &FolderNames) -> Vec<ArchiveTarget> {
        let optimized = (self.optimized_jpg.is_some() || self.optimized_webp.is_some())
            .then(|| self.top_level.join(&names.optimized));
        let compressed = (self.compressed_jpg.is_some() || self.compressed_webp.is_some())
            .then(|| self.top_level.join(&names.compressed));

        [self.originals.clone(), optimized, compressed, self.raw.clone()]
            .into_iter()
            .flatten()
            .map(|folder| {
                let name = folder
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                ArchiveTarget {
                    zip: self.top_level.join(format!("{name}.zip")),
                    folder,
                }
            })
            .collect()
    }
}

/// Compute the output map without touching the filesystem.
pub fn plan_output_structure(
    output_parent: &Path,
    settings: &Settings,
    config: &PackagingConfig,
    has_raw_files: bool,
) -> OutputStructure {
    let names = &config.folders;
    let top = output_parent.join(settings.shoot_name());
    let optimized = top.join(&names.optimized);
    let compressed = top.join(&names.compressed);

    OutputStructure {
        optimized_jpg: settings
            .generate_jpg
            .then(|| optimized.join(&names.optimized_jpg)),
        optimized_webp: settings
            .generate_webp
            .then(|| optimized.join(&names.optimized_webp)),
        compressed_jpg: settings
            .generate_compressed_jpg
            .then(|| compressed.join(&names.compressed_jpg)),
        compressed_webp: settings
            .generate_compressed_webp
            .then(|| compressed.join(&names.compressed_webp)),
        originals: settings
            .originals_transfer()
            .map(|_| top.join(&names.originals)),
        raw: settings
            .wants_raw_folder(has_raw_files)
            .then(|| top.join(&names.raw)),
        readme: top.join(&names.readme),
        log_file: top.join(&names.log_file),
        top_level: top,
    }
}

/// Plan the output map and create it on disk (unless `settings.dry_run`).
///
/// Directory or README failures are fatal for the run and are returned after
/// being logged.
pub fn build_output_structure(
    output_parent: &Path,
    settings: &Settings,
    config: &PackagingConfig,
    has_raw_files: bool,
    reporter: &Reporter,
) -> Result<OutputStructure, StructureError> {
    let structure = plan_output_structure(output_parent, settings, config, has_raw_files);
    let dry_run = settings.dry_run;

    reporter.info(format!(
        "Planning output structure for '{}' inside '{}'",
        settings.shoot_name(),
        output_parent.display()
    ));
    if structure.originals.is_none() {
        reporter.info(format!(
            "No originals export folder (originals action '{}', skip export {})",
            settings.originals_action, settings.skip_export
        ));
    }
    if structure.raw.is_none() {
        reporter.info(format!(
            "No RAW folder (include RAW {}, RAW found {has_raw_files}, RAW action '{}')",
            settings.include_raw, settings.raw_action
        ));
    }

    for folder in structure.folders() {
        if dry_run {
            reporter.simulated(format!("Would create directory '{}'", folder.display()));
            continue;
        }
        fs::create_dir_all(folder).map_err(|source| {
            let err = StructureError::CreateDir {
                path: folder.to_path_buf(),
                source,
            };
            reporter.error(err.to_string());
            err
        })?;
        reporter.debug(format!("Ensured directory '{}'", folder.display()));
    }

    let readme = top_level_readme(&settings.shoot_name(), settings, config);
    write_text(&structure.readme, &readme, dry_run, reporter)?;

    if let Some(raw_dir) = &structure.raw {
        let raw_readme = raw_folder_readme(settings, config);
        write_text(&raw_dir.join(&config.folders.readme), &raw_readme, dry_run, reporter)?;
    }

    reporter.info(format!(
        "Log file target path: '{}'",
        structure.log_file.display()
    ));
    Ok(structure)
}

fn write_text(
    path: &Path,
    content: &str,
    dry_run: bool,
    reporter: &Reporter,
) -> Result<(), StructureError> {
    if dry_run {
        reporter.simulated(format!("Would write '{}'", path.display()));
        return Ok(());
    }
    fs::write(path, content).map_err(|source| {
        let err = StructureError::WriteFile {
            path: path.to_path_buf(),
            source,
        };
        reporter.error(err.to_string());
        err
    })?;
    reporter.debug(format!("Wrote '{}'", path.display()));
    Ok(())
}

// =============================================================================
// README text
// =============================================================================

struct Branding<'a> {
    company: &'a str,
    website: &'a str,
    email: &'a str,
}

impl<'a> Branding<'a> {
    fn from_settings(settings: &'a Settings) -> Self {
        fn or<'b>(value: &'b str, fallback: &'b str) -> &'b str {
            if value.trim().is_empty() { fallback } else { value.trim() }
        }
        Self {
            company: or(&settings.delivery_company_name, "your photographer"),
            website: or(&settings.delivery_website, "(not provided)"),
            email: or(&settings.delivery_support_email, "(not provided)"),
        }
    }
}

/// Text of the top-level `README.txt`.
pub fn top_level_readme(shoot_name: &str, settings: &Settings, config: &PackagingConfig) -> String {
    let b = Branding::from_settings(settings);
    let f = &config.folders;
    let q = &config.quality;
    let megapixels = q.compressed_target_pixels as f64 / 1_000_000.0;

    format!(
        "\
DIGITAL DELIVERY
================

Delivered by: {company}
Project: {shoot_name}

Your images are organized into the folders below.

{raw}/
    Original RAW camera files (.CR2, .NEF, .ARW, .DNG, ...). They hold the
    most image data but need dedicated software to open. RAW delivery is
    usually a separate arrangement; see the README inside that folder.

{originals}/
    Full-resolution copies of the source images, suited for archiving,
    large prints and further editing.

{optimized}/
    {optimized_jpg}/   High-quality JPGs for print and screen (quality {opt_q}).
    {optimized_webp}/  High-quality WebP files, smaller than JPG at the
                       same visual quality (quality {opt_q}).

{compressed}/
    {compressed_jpg}/   JPGs resized to about {megapixels:.1} megapixels for
                        sharing, social media and email.
    {compressed_webp}/  The same, as WebP. Quality adapts to each image,
                        starting from {base_q}.

ZIP archives
------------
Each folder may also come as a .zip file in this folder (for example
\"{optimized}.zip\"). Extract it with \"Extract All...\" on Windows, a
double-click on macOS, or any file manager app on mobile.

Questions
---------
For anything about these photos or their usage rights, contact {company}:

    Website: {website}
    Support: {email}

--
Package generated with {tool}. Original tool by {author}: {repo}
",
        company = b.company,
        website = b.website,
        email = b.email,
        raw = f.raw,
        originals = f.originals,
        optimized = f.optimized,
        optimized_jpg = f.optimized_jpg,
        optimized_webp = f.optimized_webp,
        compressed = f.compressed,
        compressed_jpg = f.compressed_jpg,
        compressed_webp = f.compressed_webp,
        opt_q = q.optimized,
        base_q = q.compressed_base,
        tool = TOOL_DISPLAY_NAME,
        author = ORIGINAL_AUTHOR,
        repo = ORIGINAL_TOOL_REPO,
    )
}

/// Text of the `README.txt` placed inside the RAW folder.
pub fn raw_folder_readme(settings: &Settings, config: &PackagingConfig) -> String {
    let b = Branding::from_settings(settings);
    let raw = &config.folders.raw;
    format!(
        "\
{title} INFORMATION
{rule}

This folder holds the original, unedited RAW files straight from the
camera. They carry the full sensor data and give the most room for
professional editing, but need software such as Lightroom, Capture One
or darktable to open.

RAW files are usually a premium add-on. If this folder is empty, RAW
delivery may not be part of your package.

To ask about RAW access, pricing or usage rights for this project,
contact {company}:

    Website: {website}
    Support: {email}
",
        title = raw.to_uppercase(),
        rule = "=".repeat(raw.chars().count() + " INFORMATION".len()),
        company = b.company,
        website = b.website,
        email = b.email,
    )
}
