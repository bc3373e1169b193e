//! Image processing for delivery variants.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode + orient** | `image::ImageReader` → `ImageDecoder::orientation` → `apply_orientation` |
//! | **EXIF policy** | `kamadak-exif` reader / writer (feature `partial-exif`) |
//! | **Resize** | `DynamicImage::resize_exact` with `Lanczos3` |
//! | **Encode → JPEG** | `image::codecs::jpeg::JpegEncoder` + APP1 EXIF segment |
//! | **Encode → WebP** | `webp` (libwebp) |
//!
//! The module is split into:
//! - **Calculations**: pure dimension and statistics math (unit testable)
//! - **Parameters**: data structures describing output variants
//! - **Quality**: adaptive quality for compressed variants
//! - **EXIF policy**: selective tag removal on raw EXIF blocks
//! - **Encode**: JPEG / WebP writers
//! - **Transform**: one source image to all its variants

mod calculations;
pub mod encode;
pub mod exif_policy;
mod params;
pub mod quality;
pub mod transform;

pub use calculations::{compressed_dimensions, luminance_stddev};
pub use encode::EncodeError;
pub use exif_policy::apply_exif_policy;
pub use params::{OutputFormat, Quality, VariantKind, VariantSpec};
pub use quality::adapt_quality;
pub use transform::{TransformError, TransformReport, transform_image};
