//! EXIF retention policy.
//!
//! Works on the raw TIFF-structured EXIF block (what follows `Exif\0\0` in a
//! JPEG APP1 segment). [`apply_exif_policy`] decides what, if anything, gets
//! embedded in generated JPEGs:
//!
//! | Policy      | Result                                                   |
//! |-------------|----------------------------------------------------------|
//! | `keep`      | input bytes, untouched                                   |
//! | `strip_all` | nothing                                                  |
//! | `date`      | input minus DateTime*, SubSecTime* tags                  |
//! | `camera`    | input minus Make, Model, Software, ProcessingSoftware, Lens* tags |
//! | `both`      | input minus both sets                                    |
//!
//! Selective removal needs the `partial-exif` feature (kamadak-exif). Without
//! it, or when the block cannot be parsed or re-serialized, the selective
//! policies fall back to `strip_all` and say so in the log. If none of the
//! targeted tags are present the input is returned untouched. No input, or
//! an empty block, always yields nothing.
//!
//! A selective rewrite rebuilds the block from its parsed fields:
//! - a JPEG thumbnail in IFD1 is carried over; any other IFD1 (strip or tile
//!   thumbnails) is dropped whole
//! - MakerNote bytes are copied verbatim, so vendor notes that use absolute
//!   offsets may point at the wrong place afterwards
//!
//! [`reset_orientation`] is separate from the policies: once the transform
//! has rotated the pixels it patches IFD0's Orientation to 1 in place, so
//! viewers do not rotate the image a second time.

use crate::events::LogLine;
use crate::settings::ExifPolicy;
use std::borrow::Cow;

/// Marker that precedes the TIFF header inside a JPEG APP1 segment.
pub const EXIF_HEADER: &[u8] = b"Exif\0\0";

/// Drop a leading `Exif\0\0` marker if a decoder left it in place.
pub fn normalize_exif(raw: &[u8]) -> &[u8] {
    raw.strip_prefix(EXIF_HEADER).unwrap_or(raw)
}

/// Apply `policy` to an EXIF block.
///
/// Returns the bytes to embed, borrowed when unchanged.
pub fn apply_exif_policy<'a>(
    exif: Option<&'a [u8]>,
    policy: ExifPolicy,
    log: &mut Vec<LogLine>,
) -> Option<Cow<'a, [u8]>> {
    let exif = exif.filter(|b| !b.is_empty())?;
    let targets: Vec<TagId> = match policy {
        ExifPolicy::Keep => return Some(Cow::Borrowed(exif)),
        ExifPolicy::StripAll => return None,
        ExifPolicy::Date => DATE_TAGS.to_vec(),
        ExifPolicy::Camera => CAMERA_TAGS.to_vec(),
        ExifPolicy::Both => DATE_TAGS.iter().chain(CAMERA_TAGS).copied().collect(),
    };
    remove_tags(exif, &targets, policy, log)
}

const ORIENTATION: u16 = 0x0112;

/// Copy of `tiff` with IFD0's Orientation set to 1 (top-left).
///
/// `None` when the block is not TIFF, has no single-SHORT Orientation entry,
/// or already says 1. Only the two value bytes change.
pub fn reset_orientation(tiff: &[u8]) -> Option<Vec<u8>> {
    let big_endian = match tiff.get(..4)? {
        [b'I', b'I', 42, 0] => false,
        [b'M', b'M', 0, 42] => true,
        _ => return None,
    };
    let u16_at = |at: usize| -> Option<u16> {
        let bytes: [u8; 2] = tiff.get(at..at.checked_add(2)?)?.try_into().ok()?;
        Some(if big_endian {
            u16::from_be_bytes(bytes)
        } else {
            u16::from_le_bytes(bytes)
        })
    };
    let u32_at = |at: usize| -> Option<u32> {
        let bytes: [u8; 4] = tiff.get(at..at.checked_add(4)?)?.try_into().ok()?;
        Some(if big_endian {
            u32::from_be_bytes(bytes)
        } else {
            u32::from_le_bytes(bytes)
        })
    };

    let ifd0 = u32_at(4)? as usize;
    let entries = u16_at(ifd0)? as usize;
    let entry = (0..entries)
        .map(|i| ifd0 + 2 + i * 12)
        .find(|&at| u16_at(at) == Some(ORIENTATION))?;
    // type SHORT (3), count 1: the value sits in the first two bytes of the slot
    if u16_at(entry + 2)? != 3 || u32_at(entry + 4)? != 1 {
        return None;
    }
    let value_at = entry + 8;
    if u16_at(value_at)? == 1 {
        return None;
    }

    let one = if big_endian {
        1u16.to_be_bytes()
    } else {
        1u16.to_le_bytes()
    };
    let mut patched = tiff.to_vec();
    patched.get_mut(value_at..value_at + 2)?.copy_from_slice(&one);
    Some(patched)
}

/// A tag identified by its IFD family and number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagId {
    /// `true` for tags defined in the Exif sub-IFD, `false` for TIFF (IFD0/IFD1) tags.
    pub exif_ifd: bool,
    pub number: u16,
}

const fn tiff(number: u16) -> TagId {
    TagId {
        exif_ifd: false,
        number,
    }
}

const fn exif_ifd(number: u16) -> TagId {
    TagId {
        exif_ifd: true,
        number,
    }
}

/// DateTime, DateTimeOriginal, DateTimeDigitized, SubSecTime, SubSecTimeOriginal, SubSecTimeDigitized.
pub const DATE_TAGS: &[TagId] = &[
    tiff(0x0132),
    exif_ifd(0x9003),
    exif_ifd(0x9004),
    exif_ifd(0x9290),
    exif_ifd(0x9291),
    exif_ifd(0x9292),
];

/// Make, Model, Software, ProcessingSoftware, LensMake, LensModel, LensSpecification.
pub const CAMERA_TAGS: &[TagId] = &[
    tiff(0x010f),
    tiff(0x0110),
    tiff(0x0131),
    tiff(0x000b),
    exif_ifd(0xa433),
    exif_ifd(0xa434),
    exif_ifd(0xa432),
];

#[cfg(not(feature = "partial-exif"))]
fn remove_tags<'a>(
    _exif: &'a [u8],
    _targets: &[TagId],
    policy: ExifPolicy,
    log: &mut Vec<LogLine>,
) -> Option<Cow<'a, [u8]>> {
    log.push(LogLine::warn(format!(
        "Selective EXIF removal ('{policy}') is not available in this build, stripping all EXIF"
    )));
    None
}

#[cfg(feature = "partial-exif")]
fn remove_tags<'a>(
    exif: &'a [u8],
    targets: &[TagId],
    policy: ExifPolicy,
    log: &mut Vec<LogLine>,
) -> Option<Cow<'a, [u8]>> {
    match partial::rewrite_without(exif, targets) {
        Ok(partial::Rewrite::Unchanged) => {
            log.push(LogLine::debug(format!(
                "No EXIF tags targeted by '{policy}' present, keeping EXIF as is"
            )));
            Some(Cow::Borrowed(exif))
        }
        Ok(partial::Rewrite::Rewritten { bytes, removed }) => {
            log.push(LogLine::debug(format!(
                "Removed {removed} EXIF tag(s) for policy '{policy}'"
            )));
            Some(Cow::Owned(bytes))
        }
        Err(partial::RewriteError::Parse(e)) => {
            log.push(LogLine::warn(format!(
                "EXIF block could not be parsed ({e}), stripping all EXIF"
            )));
            None
        }
        Err(partial::RewriteError::Serialize(e)) => {
            log.push(LogLine::error(format!(
                "EXIF block could not be rewritten after removing tags ({e}), stripping all EXIF"
            )));
            None
        }
    }
}

#[cfg(feature = "partial-exif")]
mod partial {
    use super::TagId;
    use exif::experimental::Writer;
    use exif::{Context, Exif, Field, In, Reader, Tag};
    use std::io::Cursor;
    use thiserror::Error;

    pub(super) enum Rewrite {
        Unchanged,
        Rewritten { bytes: Vec<u8>, removed: usize },
    }

    #[derive(Error, Debug)]
    pub(super) enum RewriteError {
        #[error("{0}")]
        Parse(exif::Error),
        #[error("{0}")]
        Serialize(exif::Error),
    }

    /// Tags the writer derives from layout; copying them over would clash.
    const SYNTHESIZED: &[Tag] = &[
        Tag::ExifIFDPointer,
        Tag::GPSInfoIFDPointer,
        Tag::InteropIFDPointer,
        Tag::StripOffsets,
        Tag::StripByteCounts,
        Tag::TileOffsets,
        Tag::TileByteCounts,
        Tag::JPEGInterchangeFormat,
        Tag::JPEGInterchangeFormatLength,
    ];

    fn is_targeted(tag: Tag, targets: &[TagId]) -> bool {
        let Tag(context, number) = tag;
        targets.iter().any(|t| {
            t.number == number
                && match context {
                    Context::Tiff => !t.exif_ifd,
                    Context::Exif => t.exif_ifd,
                    _ => false,
                }
        })
    }

    pub(super) fn rewrite_without(
        tiff: &[u8],
        targets: &[TagId],
    ) -> Result<Rewrite, RewriteError> {
        let exif = Reader::new()
            .read_raw(tiff.to_vec())
            .map_err(RewriteError::Parse)?;

        let (removed, kept): (Vec<&Field>, Vec<&Field>) =
            exif.fields().partition(|f| is_targeted(f.tag, targets));
        if removed.is_empty() {
            return Ok(Rewrite::Unchanged);
        }

        let thumbnail = thumbnail(&exif);
        let mut writer = Writer::new();
        for field in kept {
            if SYNTHESIZED.contains(&field.tag) {
                continue;
            }
            // IFD1 survives only together with a JPEG thumbnail
            if field.ifd_num == In::THUMBNAIL && thumbnail.is_none() {
                continue;
            }
            writer.push_field(field);
        }
        if let Some(thumbnail) = thumbnail {
            writer.set_jpeg(thumbnail, In::THUMBNAIL);
        }

        let mut out = Cursor::new(Vec::new());
        writer
            .write(&mut out, exif.little_endian())
            .map_err(RewriteError::Serialize)?;
        Ok(Rewrite::Rewritten {
            bytes: out.into_inner(),
            removed: removed.len(),
        })
    }

    /// Embedded JPEG thumbnail of IFD1, if its offsets are in range.
    fn thumbnail(exif: &Exif) -> Option<&[u8]> {
        let offset = exif
            .get_field(Tag::JPEGInterchangeFormat, In::THUMBNAIL)?
            .value
            .get_uint(0)? as usize;
        let len = exif
            .get_field(Tag::JPEGInterchangeFormatLength, In::THUMBNAIL)?
            .value
            .get_uint(0)? as usize;
        exif.buf().get(offset..offset.checked_add(len)?)
    }
}
