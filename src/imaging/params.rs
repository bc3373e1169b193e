//! Parameter types for image variants.
//!
//! These describe *what* to produce, not how. [`transform`](super::transform)
//! turns settings into a list of [`VariantSpec`]s and hands each one to the
//! encoders in [`encode`](super::encode).
//!
//! ## Types
//!
//! - [`Quality`]: lossy encoding quality (1–100, default 90). Clamped on construction.
//! - [`OutputFormat`]: JPEG or WebP, with its file extension.
//! - [`VariantKind`]: full-resolution "optimized" or resized "compressed".
//! - [`VariantSpec`]: one output file to write: kind, format, destination.

use std::fmt;
use std::path::PathBuf;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u8);

impl Quality {
    pub fn new(value: u8) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(90)
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Jpeg,
    WebP,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::WebP => "webp",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Jpeg => "JPG",
            Self::WebP => "WebP",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariantKind {
    Optimized,
    Compressed,
}

impl VariantKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Optimized => "Optimized",
            Self::Compressed => "Compressed",
        }
    }
}

/// One output file of a source image.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantSpec {
    pub kind: VariantKind,
    pub format: OutputFormat,
    pub output: PathBuf,
}

impl VariantSpec {
    /// "Optimized JPG", "Compressed WebP", ...
    pub fn describe(&self) -> String {
        format!("{} {}", self.kind.label(), self.format.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_clamps_to_valid_range() {
        assert_eq!(Quality::new(0).value(), 1);
        assert_eq!(Quality::new(50).value(), 50);
        assert_eq!(Quality::new(150).value(), 100);
    }

    #[test]
    fn quality_default_is_90() {
        assert_eq!(Quality::default().value(), 90);
    }

    #[test]
    fn format_extensions() {
        assert_eq!(OutputFormat::Jpeg.extension(), "jpg");
        assert_eq!(OutputFormat::WebP.extension(), "webp");
    }

    #[test]
    fn variant_description() {
        let spec = VariantSpec {
            kind: VariantKind::Compressed,
            format: OutputFormat::WebP,
            output: PathBuf::from("a.webp"),
        };
        assert_eq!(spec.describe(), "Compressed WebP");
    }
}
