//! Packaging configuration.
//!
//! Every constant the pipeline depends on (folder names, quality levels, the
//! compressed pixel budget, extension allow-lists, filename prefixes) lives in
//! one immutable [`PackagingConfig`] value that is handed to each component.
//! Nothing reads process-wide state, so tests can vary any of these without
//! side effects on other tests.
//!
//! ## Config File
//!
//! An optional TOML file overrides the stock defaults. It is sparse: only the
//! keys you set replace the defaults.
//!
//! ```toml
//! [quality]
//! optimized = 90                    # Full-resolution variants
//! compressed_base = 60              # Starting point for adaptive quality
//! compressed_target_pixels = 2000000
//!
//! [folders]
//! optimized = "Optimized Files"
//! optimized_jpg = "Optimized JPGs"
//! optimized_webp = "Optimized WebPs"
//! compressed = "Compressed Files"
//! compressed_jpg = "Compressed JPGs"
//! compressed_webp = "Compressed WebPs"
//! originals = "Export Originals"
//! raw = "RAW Files"
//! readme = "README.txt"
//! log_file = "photopackager_run.log"
//!
//! [prefixes]
//! original = "Original_"
//! raw = "RAW_"
//! optimized = "Optimized_"
//! compressed = "Compressed_"
//!
//! [extensions]
//! standard = ["jpg", "jpeg", "png", ...]
//! raw = ["arw", "cr2", "cr3", "nef", "dng", ...]
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// All tunable constants of a packaging run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PackagingConfig {
    pub quality: QualityConfig,
    pub folders: FolderNames,
    pub prefixes: FilePrefixes,
    pub extensions: ExtensionSets,
}

/// Encoding quality constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QualityConfig {
    /// Quality of the full-resolution optimized variants (1-100).
    pub optimized: u8,
    /// Base quality fed to the adaptive quality calculation (1-100).
    pub compressed_base: u8,
    /// Pixel area above which compressed variants are downscaled.
    pub compressed_target_pixels: u64,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            optimized: 90,
            compressed_base: 60,
            compressed_target_pixels: 2_000_000,
        }
    }
}

/// Folder and file names of the delivery layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FolderNames {
    pub optimized: String,
    pub optimized_jpg: String,
    pub optimized_webp: String,
    pub compressed: String,
    pub compressed_jpg: String,
    pub compressed_webp: String,
    pub originals: String,
    pub raw: String,
    /// Name of the README written at the top level and inside the RAW folder.
    pub readme: String,
    pub log_file: String,
}

impl Default for FolderNames {
    fn default() -> Self {
        Self {
            optimized: "Optimized Files".to_string(),
            optimized_jpg: "Optimized JPGs".to_string(),
            optimized_webp: "Optimized WebPs".to_string(),
            compressed: "Compressed Files".to_string(),
            compressed_jpg: "Compressed JPGs".to_string(),
            compressed_webp: "Compressed WebPs".to_string(),
            originals: "Export Originals".to_string(),
            raw: "RAW Files".to_string(),
            readme: "README.txt".to_string(),
            log_file: "photopackager_run.log".to_string(),
        }
    }
}

impl FolderNames {
    fn all(&self) -> [(&'static str, &str); 10] {
        [
            ("optimized", self.optimized.as_str()),
            ("optimized_jpg", self.optimized_jpg.as_str()),
            ("optimized_webp", self.optimized_webp.as_str()),
            ("compressed", self.compressed.as_str()),
            ("compressed_jpg", self.compressed_jpg.as_str()),
            ("compressed_webp", self.compressed_webp.as_str()),
            ("originals", self.originals.as_str()),
            ("raw", self.raw.as_str()),
            ("readme", self.readme.as_str()),
            ("log_file", self.log_file.as_str()),
        ]
    }
}

/// Filename prefixes applied when `add_prefix` is enabled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilePrefixes {
    pub original: String,
    pub raw: String,
    pub optimized: String,
    pub compressed: String,
}

impl Default for FilePrefixes {
    fn default() -> Self {
        Self {
            original: "Original_".to_string(),
            raw: "RAW_".to_string(),
            optimized: "Optimized_".to_string(),
            compressed: "Compressed_".to_string(),
        }
    }
}

/// Every entry must have a decoder enabled in the `image` build.
const STANDARD_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "jpe", "jif", "jfif", "jfi", "png", "apng", "gif", "webp", "bmp", "dib", "tiff",
    "tif", "tga", "ico", "hdr", "exr", "pam", "pbm", "pgm", "ppm", "pnm",
];

const RAW_EXTENSIONS: &[&str] = &[
    "raw", "arw", "srf", "sr2", "crw", "cr2", "cr3", "nef", "nrw", "orf", "rw2", "raf", "dng",
    "mos", "kdc", "dcr", "x3f", "pef", "3fr", "mef", "erf", "fff", "braw", "iiq", "rwl", "ari",
    "bay", "cap", "dcs", "drf", "eip", "gpr", "k25", "mdc", "mrw", "obm", "ptx", "pxn", "r3d",
    "rwz", "srw",
];

/// Case-insensitive extension allow-lists, stored without the leading dot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExtensionSets {
    pub standard: Vec<String>,
    pub raw: Vec<String>,
}

impl Default for ExtensionSets {
    fn default() -> Self {
        Self {
            standard: STANDARD_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            raw: RAW_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        }
    }
}

/// What an allow-list lookup decided about a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Standard,
    Raw,
}

impl ExtensionSets {
    /// Classify a path by its extension. Files without a listed extension are ignored.
    pub fn classify(&self, path: &Path) -> Option<FileKind> {
        let ext = path.extension()?.to_str()?;
        if contains_ignore_case(&self.standard, ext) {
            Some(FileKind::Standard)
        } else if contains_ignore_case(&self.raw, ext) {
            Some(FileKind::Raw)
        } else {
            None
        }
    }
}

fn contains_ignore_case(list: &[String], ext: &str) -> bool {
    list.iter()
        .any(|e| e.trim_start_matches('.').eq_ignore_ascii_case(ext))
}

impl PackagingConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, value) in [
            ("quality.optimized", self.quality.optimized),
            ("quality.compressed_base", self.quality.compressed_base),
        ] {
            if !(1..=100).contains(&value) {
                return Err(ConfigError::Validation(format!("{key} must be 1-100")));
            }
        }
        if self.quality.compressed_target_pixels == 0 {
            return Err(ConfigError::Validation(
                "quality.compressed_target_pixels must be greater than 0".into(),
            ));
        }
        for (key, name) in self.folders.all() {
            if name.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "folders.{key} must not be empty"
                )));
            }
            if name.contains('/') || name.contains('\\') {
                return Err(ConfigError::Validation(format!(
                    "folders.{key} must be a single path component, got '{name}'"
                )));
            }
        }
        if let Some(ext) = self
            .extensions
            .standard
            .iter()
            .find(|e| contains_ignore_case(&self.extensions.raw, e.trim_start_matches('.')))
        {
            return Err(ConfigError::Validation(format!(
                "extension '{ext}' is listed as both standard and raw"
            )));
        }
        Ok(())
    }
}

/// Resolve the effective worker count.
///
/// - `0` → use all available cores
/// - `n` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_workers(requested: usize) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    if requested == 0 {
        cores
    } else {
        requested.min(cores)
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(PackagingConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Merge an optional overlay onto the stock defaults, then deserialize and validate.
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<PackagingConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: PackagingConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from a TOML file, or the stock defaults when `path` is `None`.
pub fn load_config(path: Option<&Path>) -> Result<PackagingConfig, ConfigError> {
    let overlay = match path {
        Some(p) => {
            let content = fs::read_to_string(p)?;
            Some(toml::from_str::<toml::Value>(&content)?)
        }
        None => None,
    };
    resolve_config(overlay)
}

/// Returns a fully-commented stock config file.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# PhotoPackager Configuration
# ===========================
# All keys are optional. Anything left out keeps the value shown here.

[quality]
# JPEG/WebP quality of the full-resolution "Optimized" variants (1-100).
optimized = 90
# Starting quality for "Compressed" variants (1-100). The final value is
# adjusted per image from its luminance complexity and clamped to 30-95.
compressed_base = 60
# Compressed variants larger than this pixel area are downscaled to it,
# preserving aspect ratio.
compressed_target_pixels = 2000000

[folders]
optimized = "Optimized Files"
optimized_jpg = "Optimized JPGs"
optimized_webp = "Optimized WebPs"
compressed = "Compressed Files"
compressed_jpg = "Compressed JPGs"
compressed_webp = "Compressed WebPs"
originals = "Export Originals"
raw = "RAW Files"
readme = "README.txt"
log_file = "photopackager_run.log"

[prefixes]
# Applied only when prefixing is enabled for the run.
original = "Original_"
raw = "RAW_"
optimized = "Optimized_"
compressed = "Compressed_"

# [extensions]
# Replace the built-in allow-lists (case-insensitive, no leading dot).
# standard = ["jpg", "jpeg", "png", "tif", "tiff", "webp"]
# raw = ["arw", "cr2", "cr3", "nef", "dng"]
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn defaults_match_original_tool_constants() {
        let config = PackagingConfig::default();
        assert_eq!(config.quality.optimized, 90);
        assert_eq!(config.quality.compressed_base, 60);
        assert_eq!(config.quality.compressed_target_pixels, 2_000_000);
        assert_eq!(config.folders.originals, "Export Originals");
        assert_eq!(config.folders.raw, "RAW Files");
        assert_eq!(config.prefixes.original, "Original_");
    }

    #[test]
    fn default_config_validates() {
        PackagingConfig::default().validate().unwrap();
    }

    #[test]
    fn classify_is_case_insensitive() {
        let ext = ExtensionSets::default();
        assert_eq!(
            ext.classify(&PathBuf::from("a/b/IMG_001.JPG")),
            Some(FileKind::Standard)
        );
        assert_eq!(
            ext.classify(&PathBuf::from("IMG_001.Cr3")),
            Some(FileKind::Raw)
        );
        assert_eq!(ext.classify(&PathBuf::from("notes.txt")), None);
        assert_eq!(ext.classify(&PathBuf::from("no_extension")), None);
    }

    #[test]
    fn default_standard_extensions_are_decodable() {
        for ext in &ExtensionSets::default().standard {
            if let Some(format) = image::ImageFormat::from_extension(ext) {
                assert!(format.reading_enabled(), "no decoder for .{ext}");
            }
        }
        for ext in ["tga", "ico", "hdr", "exr", "ppm"] {
            let format = image::ImageFormat::from_extension(ext).unwrap();
            assert!(format.reading_enabled(), "no decoder for .{ext}");
        }
    }

    #[test]
    fn undecodable_formats_are_not_listed() {
        let ext = ExtensionSets::default();
        for name in ["a.heic", "a.psd", "a.avif", "a.jp2"] {
            assert_eq!(ext.classify(&PathBuf::from(name)), None, "{name}");
        }
    }

    #[test]
    fn classify_accepts_dotted_entries() {
        let ext = ExtensionSets {
            standard: vec![".png".into()],
            raw: vec![],
        };
        assert_eq!(
            ext.classify(&PathBuf::from("x.PNG")),
            Some(FileKind::Standard)
        );
    }

    #[test]
    fn overlapping_extension_lists_rejected() {
        let mut config = PackagingConfig::default();
        config.extensions.raw.push("JPG".into());
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn quality_out_of_range_rejected() {
        let mut config = PackagingConfig::default();
        config.quality.optimized = 0;
        assert!(config.validate().is_err());
        config.quality.optimized = 101;
        assert!(config.validate().is_err());
    }

    #[test]
    fn folder_with_separator_rejected() {
        let mut config = PackagingConfig::default();
        config.folders.raw = "a/b".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_target_pixels_rejected() {
        let mut config = PackagingConfig::default();
        config.quality.compressed_target_pixels = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn sparse_overlay_keeps_other_defaults() {
        let overlay: toml::Value = toml::from_str(
            r#"
            [quality]
            optimized = 80

            [folders]
            raw = "Negatives"
            "#,
        )
        .unwrap();
        let config = resolve_config(Some(overlay)).unwrap();
        assert_eq!(config.quality.optimized, 80);
        assert_eq!(config.quality.compressed_base, 60);
        assert_eq!(config.folders.raw, "Negatives");
        assert_eq!(config.folders.originals, "Export Originals");
    }

    #[test]
    fn unknown_keys_rejected() {
        let overlay: toml::Value = toml::from_str("[quality]\nbogus = 1\n").unwrap();
        assert!(resolve_config(Some(overlay)).is_err());
    }

    #[test]
    fn load_config_without_file_is_default() {
        assert_eq!(load_config(None).unwrap(), PackagingConfig::default());
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("packager.toml");
        fs::write(&path, "[prefixes]\nraw = \"NEG_\"\n").unwrap();
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.prefixes.raw, "NEG_");
    }

    #[test]
    fn stock_config_parses_to_defaults() {
        let value: toml::Value = toml::from_str(stock_config_toml()).unwrap();
        let config = resolve_config(Some(value)).unwrap();
        let defaults = PackagingConfig::default();
        assert_eq!(config.quality, defaults.quality);
        assert_eq!(config.folders, defaults.folders);
        assert_eq!(config.prefixes, defaults.prefixes);
    }

    #[test]
    fn merge_toml_overlay_wins() {
        let base: toml::Value = toml::from_str("a = 1\n[t]\nx = 1\ny = 2\n").unwrap();
        let overlay: toml::Value = toml::from_str("[t]\ny = 3\n").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged["a"].as_integer(), Some(1));
        assert_eq!(merged["t"]["x"].as_integer(), Some(1));
        assert_eq!(merged["t"]["y"].as_integer(), Some(3));
    }

    #[test]
    fn effective_workers_auto_uses_cores() {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        assert_eq!(effective_workers(0), cores);
    }

    #[test]
    fn effective_workers_user_constrains_down() {
        assert_eq!(effective_workers(1), 1);
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        assert_eq!(effective_workers(10_000), cores);
    }
}
