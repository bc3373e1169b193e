//! JPEG and WebP encoders.
//!
//! JPEG has no alpha channel, so [`save_jpeg`] composites transparent pixels
//! onto opaque white first. A plain RGBA→RGB conversion would drop alpha and
//! leave whatever colour sat under it, which is usually black.
//!
//! EXIF is embedded in JPEGs only, as an APP1 segment right after SOI. WebP
//! output never carries EXIF.

use super::params::Quality;
use crate::events::LogLine;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, Rgb, RgbImage};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("WebP encoder rejected image: {0}")]
    WebP(String),
}

/// Largest APP1 payload (`Exif\0\0` + TIFF block) a segment length can describe.
const MAX_APP1_PAYLOAD: usize = u16::MAX as usize - 2;

/// RGB copy of `img` with any transparency blended onto white.
pub fn flatten_onto_white(img: &DynamicImage) -> RgbImage {
    if !img.color().has_alpha() {
        return img.to_rgb8();
    }
    let rgba = img.to_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let alpha = a as u32;
        let blend = |c: u8| ((c as u32 * alpha + 255 * (255 - alpha) + 127) / 255) as u8;
        Rgb([blend(r), blend(g), blend(b)])
    })
}

/// Encode `img` as a baseline JPEG at `path`, embedding `exif` when given.
///
/// An EXIF block too large for one APP1 segment is left out with a warning;
/// the image itself is still written.
pub fn save_jpeg(
    img: &DynamicImage,
    path: &Path,
    quality: Quality,
    exif: Option<&[u8]>,
    log: &mut Vec<LogLine>,
) -> Result<(), EncodeError> {
    let rgb = flatten_onto_white(img);
    let mut encoded = Vec::new();
    JpegEncoder::new_with_quality(&mut encoded, quality.value()).encode_image(&rgb)?;

    let bytes = match exif {
        Some(tiff) if !tiff.is_empty() => match embed_exif(&encoded, tiff) {
            Some(with_exif) => with_exif,
            None => {
                log.push(LogLine::warn(format!(
                    "EXIF block of {} bytes does not fit in a JPEG segment, saving {} without it",
                    tiff.len(),
                    path.display()
                )));
                encoded
            }
        },
        _ => encoded,
    };
    fs::write(path, bytes)?;
    Ok(())
}

/// Encode `img` as lossy WebP at `path`.
pub fn save_webp(img: &DynamicImage, path: &Path, quality: Quality) -> Result<(), EncodeError> {
    // The encoder only takes 8-bit RGB or RGBA.
    let img = if img.color().has_alpha() {
        DynamicImage::ImageRgba8(img.to_rgba8())
    } else {
        DynamicImage::ImageRgb8(img.to_rgb8())
    };
    let encoder = webp::Encoder::from_image(&img).map_err(|e| EncodeError::WebP(e.to_string()))?;
    let memory = encoder.encode(quality.value() as f32);
    fs::write(path, &*memory)?;
    Ok(())
}

/// Insert an `Exif\0\0` APP1 segment after the SOI marker of `jpeg`.
///
/// Returns `None` if `jpeg` does not start with SOI or the payload is too large.
pub fn embed_exif(jpeg: &[u8], tiff: &[u8]) -> Option<Vec<u8>> {
    let rest = jpeg.strip_prefix(&[0xFF, 0xD8])?;
    let payload_len = super::exif_policy::EXIF_HEADER.len() + tiff.len();
    if payload_len > MAX_APP1_PAYLOAD {
        return None;
    }
    let segment_len = (payload_len + 2) as u16;

    let mut out = Vec::with_capacity(jpeg.len() + payload_len + 4);
    out.extend_from_slice(&[0xFF, 0xD8, 0xFF, 0xE1]);
    out.extend_from_slice(&segment_len.to_be_bytes());
    out.extend_from_slice(super::exif_policy::EXIF_HEADER);
    out.extend_from_slice(tiff);
    out.extend_from_slice(rest);
    Some(out)
}
