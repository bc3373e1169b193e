//! Image transform: one source image in, its delivery variants out.
//!
//! ```text
//! decode ─► orient ─► normalize (RGB / RGBA) ─► EXIF policy
//!                                                  │
//!            ┌─────────────────────────────────────┤
//!            ▼                                     ▼
//!   optimized (full size,               compressed (downscaled to the
//!   fixed quality) JPG / WebP           pixel budget, adaptive quality) JPG / WebP
//! ```
//!
//! Decoding and colour normalization failures abort this image with a
//! [`TransformError`]. A failed orientation step is logged and the unrotated
//! pixels are used. A failed save is logged, not counted, and the remaining
//! variants are still attempted.
//!
//! Log lines are collected into the caller's buffer instead of being sent
//! anywhere, so the transform can run on any worker thread.

use super::calculations::compressed_dimensions;
use super::encode::{save_jpeg, save_webp};
use super::exif_policy::{apply_exif_policy, normalize_exif, reset_orientation};
use super::params::{OutputFormat, Quality, VariantKind, VariantSpec};
use super::quality::adapt_quality;
use crate::config::PackagingConfig;
use crate::events::LogLine;
use crate::naming::variant_file_name;
use crate::settings::Settings;
use crate::structure::OutputStructure;
use image::imageops::FilterType;
use image::metadata::Orientation;
use image::{DynamicImage, ImageDecoder, ImageReader};
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransformError {
    #[error("cannot open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot decode {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        source: image::ImageError,
    },
    #[error("cannot normalize {color:?} pixels of {}", path.display())]
    ColorMode {
        path: PathBuf,
        color: image::ColorType,
    },
}

/// Files produced for one source image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TransformReport {
    /// Files actually written.
    pub generated: usize,
    /// Files a dry run would have written.
    pub would_generate: usize,
}

/// The variants `settings` asks for, with their destination paths.
///
/// `output_stem` is the name reserved for this source by
/// [`reserve_variant_stems`](crate::naming::reserve_variant_stems). A variant
/// is only listed when its folder is part of `structure`.
pub fn planned_variants(
    output_stem: &str,
    structure: &OutputStructure,
    settings: &Settings,
    config: &PackagingConfig,
) -> Vec<VariantSpec> {
    let candidates = [
        (VariantKind::Optimized, OutputFormat::Jpeg, settings.generate_jpg, &structure.optimized_jpg),
        (VariantKind::Optimized, OutputFormat::WebP, settings.generate_webp, &structure.optimized_webp),
        (
            VariantKind::Compressed,
            OutputFormat::Jpeg,
            settings.generate_compressed_jpg,
            &structure.compressed_jpg,
        ),
        (
            VariantKind::Compressed,
            OutputFormat::WebP,
            settings.generate_compressed_webp,
            &structure.compressed_webp,
        ),
    ];

    candidates
        .into_iter()
        .filter(|(_, _, enabled, _)| *enabled)
        .filter_map(|(kind, format, _, folder)| {
            let folder = folder.as_ref()?;
            let prefix = match kind {
                VariantKind::Optimized => &config.prefixes.optimized,
                VariantKind::Compressed => &config.prefixes.compressed,
            };
            let name =
                variant_file_name(output_stem, prefix, settings.add_prefix, format.extension());
            Some(VariantSpec {
                kind,
                format,
                output: folder.join(name),
            })
        })
        .collect()
}

/// Produce every enabled variant of `source`, named after `output_stem`.
pub fn transform_image(
    source: &Path,
    output_stem: &str,
    structure: &OutputStructure,
    settings: &Settings,
    config: &PackagingConfig,
    log: &mut Vec<LogLine>,
) -> Result<TransformReport, TransformError> {
    let variants = planned_variants(output_stem, structure, settings, config);
    let mut report = TransformReport::default();
    let name = display_name(source);

    if variants.is_empty() {
        log.push(LogLine::debug(format!("No output variants enabled for {name}")));
        return Ok(report);
    }

    let (img, raw_exif) = decode_oriented(source, log)?;
    let img = normalize_color(img, source)?;
    let exif = apply_exif_policy(raw_exif.as_deref(), settings.exif_policy, log);

    let optimized_quality = Quality::new(config.quality.optimized);
    let mut compressed: Option<(DynamicImage, Quality)> = None;

    for variant in &variants {
        let (pixels, quality) = match variant.kind {
            VariantKind::Optimized => (&img, optimized_quality),
            VariantKind::Compressed => {
                let (resized, quality) = compressed.get_or_insert_with(|| {
                    compressed_image(&img, config, settings.dry_run, &name, log)
                });
                (&*resized, *quality)
            }
        };

        if settings.dry_run {
            log.push(LogLine::simulated(format!(
                "Would save {} (quality {quality}): {}",
                variant.describe(),
                variant.output.display()
            )));
            report.would_generate += 1;
            continue;
        }

        let saved = match variant.format {
            OutputFormat::Jpeg => save_jpeg(pixels, &variant.output, quality, exif.as_deref(), log),
            OutputFormat::WebP => save_webp(pixels, &variant.output, quality),
        };
        match saved {
            Ok(()) => {
                log.push(LogLine::debug(format!(
                    "Saved {} (quality {quality}): {}",
                    variant.describe(),
                    variant.output.display()
                )));
                report.generated += 1;
            }
            Err(e) => log.push(LogLine::error(format!(
                "Failed to save {} for {name}: {e}",
                variant.describe()
            ))),
        }
    }

    Ok(report)
}

/// Decode `path`, apply its orientation tag, and return the raw EXIF block.
///
/// When the pixels were rotated the block's Orientation is reset to 1.
fn decode_oriented(
    path: &Path,
    log: &mut Vec<LogLine>,
) -> Result<(DynamicImage, Option<Vec<u8>>), TransformError> {
    let decode_err = |source| TransformError::Decode {
        path: path.to_path_buf(),
        source,
    };
    let open_err = |source| TransformError::Open {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = ImageReader::open(path)
        .map_err(open_err)?
        .with_guessed_format()
        .map_err(open_err)?;
    reader.no_limits();
    let mut decoder = reader.into_decoder().map_err(decode_err)?;

    let mut exif = match decoder.exif_metadata() {
        Ok(exif) => exif
            .filter(|b| !b.is_empty())
            .map(|b| normalize_exif(&b).to_vec()),
        Err(e) => {
            log.push(LogLine::warn(format!(
                "Could not read EXIF from {}: {e}",
                display_name(path)
            )));
            None
        }
    };
    let orientation = decoder.orientation();

    let mut img = DynamicImage::from_decoder(decoder).map_err(decode_err)?;
    match orientation {
        Ok(Orientation::NoTransforms) => {}
        Ok(orientation) => {
            img.apply_orientation(orientation);
            if let Some(upright) = exif.as_deref().and_then(reset_orientation) {
                exif = Some(upright);
            }
        }
        Err(e) => log.push(LogLine::warn(format!(
            "Could not apply EXIF orientation to {}, using pixels as stored: {e}",
            display_name(path)
        ))),
    }
    Ok((img, exif))
}

/// 8-bit RGBA when the source has alpha, 8-bit RGB otherwise.
fn normalize_color(img: DynamicImage, path: &Path) -> Result<DynamicImage, TransformError> {
    let color = img.color();
    if img.width() == 0 || img.height() == 0 {
        return Err(TransformError::ColorMode {
            path: path.to_path_buf(),
            color,
        });
    }
    Ok(match img {
        DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgba8(_) => img,
        other if color.has_alpha() => DynamicImage::ImageRgba8(other.to_rgba8()),
        other => DynamicImage::ImageRgb8(other.to_rgb8()),
    })
}

/// The compressed source pixels and their adaptive quality.
fn compressed_image(
    img: &DynamicImage,
    config: &PackagingConfig,
    dry_run: bool,
    name: &str,
    log: &mut Vec<LogLine>,
) -> (DynamicImage, Quality) {
    let resized = match compressed_dimensions(
        (img.width(), img.height()),
        config.quality.compressed_target_pixels,
    ) {
        Some((w, h)) if dry_run => {
            log.push(LogLine::simulated(format!(
                "Would resize {name} from {}x{} to {w}x{h}",
                img.width(),
                img.height()
            )));
            img.clone()
        }
        Some((w, h)) => {
            log.push(LogLine::debug(format!(
                "Resized {name} from {}x{} to {w}x{h}",
                img.width(),
                img.height()
            )));
            img.resize_exact(w, h, FilterType::Lanczos3)
        }
        None => img.clone(),
    };
    let quality = adapt_quality(&resized, config.quality.compressed_base);
    (resized, Quality::new(quality))
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
