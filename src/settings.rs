//! Typed job settings.
//!
//! One [`Settings`] value describes one packaging run. The CLI, a GUI, or a
//! web layer builds it and hands it to [`Job`](crate::job::Job) unchanged;
//! it is validated once at that boundary.
//!
//! Settings can also be read from a TOML or JSON file, which is how the
//! non-CLI front ends pass them across process boundaries:
//!
//! ```toml
//! source_folder = "/shoots/2024-06-01 Wedding"
//! output_folder = "/deliveries"
//! originals_action = "copy"     # copy | move | leave | none
//! raw_action = "copy"           # copy | move | leave
//! exif_policy = "camera"        # keep | date | camera | both | strip_all
//! generate_compressed_webp = false
//! workers = 0                   # 0 = one per CPU core
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0} must not be empty")]
    EmptyPath(&'static str),
    #[error("Shoot name must be a single folder name, got '{0}'")]
    InvalidShootName(String),
    #[error("Rename base must be a plain file name, got '{0}'")]
    InvalidRenameBase(String),
}

/// What to do with the standard source images after variants are generated.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum OriginalsAction {
    #[default]
    Copy,
    Move,
    Leave,
    None,
}

/// What to do with RAW files found in the source.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum RawAction {
    #[default]
    Copy,
    Move,
    Leave,
}

/// Metadata retention policy for generated JPEGs.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum ExifPolicy {
    /// Embed the source EXIF untouched.
    #[default]
    Keep,
    /// Remove capture/modification timestamps.
    Date,
    /// Remove camera body, lens and software identification.
    Camera,
    /// Remove both the date and camera tag sets.
    Both,
    /// Embed no EXIF at all.
    #[value(name = "strip_all")]
    StripAll,
}

/// Copy or move, the two actions that actually touch files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transfer {
    Copy,
    Move,
}

impl Transfer {
    pub fn verb(self) -> &'static str {
        match self {
            Self::Copy => "copy",
            Self::Move => "move",
        }
    }

    pub fn past_tense(self) -> &'static str {
        match self {
            Self::Copy => "Copied",
            Self::Move => "Moved",
        }
    }
}

impl OriginalsAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Copy => "copy",
            Self::Move => "move",
            Self::Leave => "leave",
            Self::None => "none",
        }
    }

    pub fn transfer(self) -> Option<Transfer> {
        match self {
            Self::Copy => Some(Transfer::Copy),
            Self::Move => Some(Transfer::Move),
            Self::Leave | Self::None => None,
        }
    }
}

impl RawAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Copy => "copy",
            Self::Move => "move",
            Self::Leave => "leave",
        }
    }

    pub fn transfer(self) -> Option<Transfer> {
        match self {
            Self::Copy => Some(Transfer::Copy),
            Self::Move => Some(Transfer::Move),
            Self::Leave => None,
        }
    }
}

impl ExifPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Keep => "keep",
            Self::Date => "date",
            Self::Camera => "camera",
            Self::Both => "both",
            Self::StripAll => "strip_all",
        }
    }
}

impl fmt::Display for OriginalsAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for RawAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for ExifPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable input to one packaging run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub source_folder: PathBuf,
    /// Parent folder; the package itself is created at `output_folder/<shoot name>`.
    pub output_folder: PathBuf,
    /// Display name of the shoot. Defaults to the source folder's name.
    pub shoot_name: Option<String>,
    pub originals_action: OriginalsAction,
    /// Skip the originals export regardless of `originals_action`.
    pub skip_export: bool,
    pub include_raw: bool,
    pub raw_action: RawAction,
    pub generate_jpg: bool,
    pub generate_webp: bool,
    pub generate_compressed_jpg: bool,
    pub generate_compressed_webp: bool,
    pub exif_policy: ExifPolicy,
    /// Prefix exported files (`Original_`, `RAW_`, `Optimized_`, `Compressed_`).
    pub add_prefix: bool,
    /// When set, variant files are renamed to `NNN-<base>.<ext>` after processing.
    pub rename_base: Option<String>,
    pub create_zip: bool,
    /// Worker count for image processing. `0` = one per CPU core.
    pub workers: usize,
    pub dry_run: bool,
    pub verbose: bool,
    pub delivery_company_name: String,
    pub delivery_website: String,
    pub delivery_support_email: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            source_folder: PathBuf::new(),
            output_folder: PathBuf::new(),
            shoot_name: None,
            originals_action: OriginalsAction::Copy,
            skip_export: false,
            include_raw: true,
            raw_action: RawAction::Copy,
            generate_jpg: true,
            generate_webp: true,
            generate_compressed_jpg: true,
            generate_compressed_webp: true,
            exif_policy: ExifPolicy::Keep,
            add_prefix: false,
            rename_base: None,
            create_zip: true,
            workers: 0,
            dry_run: false,
            verbose: false,
            delivery_company_name: String::new(),
            delivery_website: String::new(),
            delivery_support_email: String::new(),
        }
    }
}

impl Settings {
    /// Default settings for a given source and output parent.
    pub fn new(source_folder: impl Into<PathBuf>, output_folder: impl Into<PathBuf>) -> Self {
        Self {
            source_folder: source_folder.into(),
            output_folder: output_folder.into(),
            ..Self::default()
        }
    }

    /// Check invariants that do not need the filesystem.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.source_folder.as_os_str().is_empty() {
            return Err(SettingsError::EmptyPath("source_folder"));
        }
        if self.output_folder.as_os_str().is_empty() {
            return Err(SettingsError::EmptyPath("output_folder"));
        }
        if let Some(name) = self.shoot_name.as_deref().map(str::trim) {
            if !name.is_empty() && !is_single_component(name) {
                return Err(SettingsError::InvalidShootName(name.to_string()));
            }
        }
        if let Some(base) = self.rename_base.as_deref() {
            if !is_single_component(base.trim()) {
                return Err(SettingsError::InvalidRenameBase(base.to_string()));
            }
        }
        Ok(())
    }

    /// Shoot name: the trimmed override if set, else the source folder's base name.
    pub fn shoot_name(&self) -> String {
        match self.shoot_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => folder_base_name(&self.source_folder),
        }
    }

    /// The copy/move applied to originals, or `None` when they stay put.
    pub fn originals_transfer(&self) -> Option<Transfer> {
        if self.skip_export {
            None
        } else {
            self.originals_action.transfer()
        }
    }

    /// Whether a RAW folder belongs in the output for this run.
    pub fn wants_raw_folder(&self, has_raw_files: bool) -> bool {
        self.include_raw && has_raw_files && self.raw_action.transfer().is_some()
    }

    pub fn any_variant_enabled(&self) -> bool {
        self.generate_jpg
            || self.generate_webp
            || self.generate_compressed_jpg
            || self.generate_compressed_webp
    }
}

/// Load settings from a `.json` file, or TOML for any other extension.
pub fn load_settings(path: &Path) -> Result<Settings, SettingsError> {
    let content = std::fs::read_to_string(path)?;
    let is_json = path
        .extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    let settings = if is_json {
        serde_json::from_str(&content)?
    } else {
        toml::from_str(&content)?
    };
    Ok(settings)
}

fn is_single_component(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains('/')
        && !name.contains('\\')
}

/// Last path component, falling back to the whole path for roots like `/`.
fn folder_base_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}
