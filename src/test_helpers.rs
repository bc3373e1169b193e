//! Shared test utilities for the photo-packager test suite.
//!
//! Provides synthetic image writers, EXIF block builders, and filesystem
//! counters so unit tests never depend on fixture files checked into the repo.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! write_jpeg(&tmp.path().join("a.jpg"), 64, 48);
//! write_jpeg_with_exif(&tmp.path().join("b.jpg"), 64, 48, &sample_exif_block());
//!
//! assert_eq!(count_files(tmp.path()), 2);
//! ```

use crate::imaging::encode::embed_exif;
use exif::experimental::Writer;
use exif::{Field, In, Tag, Value};
use image::codecs::jpeg::JpegEncoder;
use image::{Rgb, RgbImage, Rgba, RgbaImage};
use std::io::Cursor;
use std::path::Path;
use walkdir::WalkDir;

// =========================================================================
// Synthetic images
// =========================================================================

/// Diagonal gradient, enough detail that encoders produce real output.
pub fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            ((x + y) % 256) as u8,
        ])
    })
}

fn encode_jpeg(width: u32, height: u32) -> Vec<u8> {
    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, 90)
        .encode_image(&gradient(width, height))
        .unwrap();
    bytes
}

/// Write a plain JPEG with no EXIF.
pub fn write_jpeg(path: &Path, width: u32, height: u32) {
    std::fs::write(path, encode_jpeg(width, height)).unwrap();
}

/// Write a JPEG carrying `exif` (a bare TIFF block) in APP1.
pub fn write_jpeg_with_exif(path: &Path, width: u32, height: u32, exif: &[u8]) {
    let bytes = embed_exif(&encode_jpeg(width, height), exif).unwrap();
    std::fs::write(path, bytes).unwrap();
}

/// Write a PNG whose left half is fully transparent.
pub fn write_png_with_alpha(path: &Path, width: u32, height: u32) {
    RgbaImage::from_fn(width, height, |x, _| {
        if x < width / 2 {
            Rgba([255, 0, 0, 0])
        } else {
            Rgba([0, 0, 255, 255])
        }
    })
    .save(path)
    .unwrap();
}

// =========================================================================
// EXIF blocks
// =========================================================================

/// Bare TIFF-structured EXIF block holding the given ASCII tags in IFD0 /
/// the Exif sub-IFD (chosen by each tag's context).
pub fn exif_block_with(tags: &[(Tag, &str)]) -> Vec<u8> {
    let fields: Vec<Field> = tags
        .iter()
        .map(|(tag, text)| Field {
            tag: *tag,
            ifd_num: In::PRIMARY,
            value: Value::Ascii(vec![text.as_bytes().to_vec()]),
        })
        .collect();

    let mut writer = Writer::new();
    for field in &fields {
        writer.push_field(field);
    }
    let mut out = Cursor::new(Vec::new());
    writer.write(&mut out, false).unwrap();
    out.into_inner()
}

/// A block with date, camera, and neutral tags.
pub fn sample_exif_block() -> Vec<u8> {
    exif_block_with(&[
        (Tag::ImageDescription, "Harbour at dawn"),
        (Tag::Make, "Fujifilm"),
        (Tag::Model, "X-T5"),
        (Tag::Software, "Capture One"),
        (Tag::DateTime, "2024:05:01 06:12:44"),
        (Tag::DateTimeOriginal, "2024:05:01 06:12:44"),
        (Tag::SubSecTimeOriginal, "250"),
        (Tag::LensModel, "XF16-55mmF2.8 R LM WR"),
    ])
}

fn ascii(tag: Tag, text: &str) -> Field {
    Field {
        tag,
        ifd_num: In::PRIMARY,
        value: Value::Ascii(vec![text.as_bytes().to_vec()]),
    }
}

/// Make plus an IFD0 Orientation of `orientation`.
pub fn oriented_exif_block(orientation: u16, little_endian: bool) -> Vec<u8> {
    let fields = [
        ascii(Tag::Make, "Fujifilm"),
        Field {
            tag: Tag::Orientation,
            ifd_num: In::PRIMARY,
            value: Value::Short(vec![orientation]),
        },
    ];
    let mut writer = Writer::new();
    for field in &fields {
        writer.push_field(field);
    }
    let mut out = Cursor::new(Vec::new());
    writer.write(&mut out, little_endian).unwrap();
    out.into_inner()
}

/// DateTime and Make in IFD0, an uncompressed 2x2 strip thumbnail in IFD1.
pub fn exif_block_with_strip_thumbnail() -> Vec<u8> {
    let strip: &[u8] = &[0x80; 12];
    let strips = [strip];
    let thumb = |tag, value| Field {
        tag,
        ifd_num: In::THUMBNAIL,
        value,
    };
    let fields = [
        ascii(Tag::DateTime, "2024:05:01 06:12:44"),
        ascii(Tag::Make, "Fujifilm"),
        thumb(Tag::ImageWidth, Value::Long(vec![2])),
        thumb(Tag::ImageLength, Value::Long(vec![2])),
        thumb(Tag::BitsPerSample, Value::Short(vec![8, 8, 8])),
        thumb(Tag::PhotometricInterpretation, Value::Short(vec![2])),
    ];
    let mut writer = Writer::new();
    for field in &fields {
        writer.push_field(field);
    }
    writer.set_strips(&strips, In::THUMBNAIL);
    let mut out = Cursor::new(Vec::new());
    writer.write(&mut out, false).unwrap();
    out.into_inner()
}

// =========================================================================
// Filesystem
// =========================================================================

/// Number of regular files under `dir`, recursively. Missing dirs count 0.
pub fn count_files(dir: &Path) -> usize {
    if !dir.exists() {
        return 0;
    }
    WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .count()
}
