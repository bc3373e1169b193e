//! Adaptive quality for compressed variants.
//!
//! The luminance standard deviation of an image is a cheap proxy for how
//! much detail it holds. Flat images compress harder, busy ones keep more:
//!
//! | Luminance stddev | Offset to base quality |
//! |------------------|------------------------|
//! | `< 30`           | −10                    |
//! | `30 ..= 60`      | 0                      |
//! | `> 60`           | +5                     |
//!
//! The result is always clamped to `[30, 95]`. An image with no pixels is
//! treated as mid-complexity (stddev 50).

use super::calculations::luminance_stddev;
use image::DynamicImage;

pub const MIN_ADAPTIVE_QUALITY: u8 = 30;
pub const MAX_ADAPTIVE_QUALITY: u8 = 95;
/// Assumed stddev when it cannot be measured.
pub const FALLBACK_STDDEV: f64 = 50.0;

const LOW_COMPLEXITY: f64 = 30.0;
const HIGH_COMPLEXITY: f64 = 60.0;

/// Luminance standard deviation of `img`, or `None` if it has no pixels.
pub fn luminance_complexity(img: &DynamicImage) -> Option<f64> {
    if img.width() == 0 || img.height() == 0 {
        return None;
    }
    luminance_stddev(img.to_luma8().as_raw())
}

/// Compression quality for `img` starting from `base`.
pub fn adapt_quality(img: &DynamicImage, base: u8) -> u8 {
    let stddev = luminance_complexity(img).unwrap_or_else(|| {
        tracing::debug!("luminance unavailable, assuming stddev {FALLBACK_STDDEV}");
        FALLBACK_STDDEV
    });
    quality_for_complexity(stddev, base)
}

/// The three-band offset plus clamp, separated from pixel access.
pub fn quality_for_complexity(stddev: f64, base: u8) -> u8 {
    let offset: i32 = if stddev < LOW_COMPLEXITY {
        -10
    } else if stddev > HIGH_COMPLEXITY {
        5
    } else {
        0
    };
    let adjusted = base as i32 + offset;
    adjusted.clamp(MIN_ADAPTIVE_QUALITY as i32, MAX_ADAPTIVE_QUALITY as i32) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, RgbImage, RgbaImage};

    fn flat(value: u8) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(32, 32, image::Rgb([value; 3])))
    }

    fn checkerboard() -> DynamicImage {
        DynamicImage::ImageLuma8(GrayImage::from_fn(32, 32, |x, y| {
            if (x + y) % 2 == 0 { Luma([0]) } else { Luma([255]) }
        }))
    }

    /// Luminance ramp with a stddev of roughly 37 (inside the neutral band).
    fn gentle_gradient() -> DynamicImage {
        DynamicImage::ImageLuma8(GrayImage::from_fn(128, 8, |x, _| Luma([x as u8])))
    }

    #[test]
    fn flat_image_compresses_harder() {
        assert_eq!(adapt_quality(&flat(120), 60), 50);
    }

    #[test]
    fn busy_image_keeps_more() {
        assert_eq!(adapt_quality(&checkerboard(), 60), 65);
    }

    #[test]
    fn mid_complexity_keeps_base() {
        let sd = luminance_complexity(&gentle_gradient()).unwrap();
        assert!((30.0..=60.0).contains(&sd), "stddev {sd}");
        assert_eq!(adapt_quality(&gentle_gradient(), 60), 60);
    }

    #[test]
    fn result_always_within_bounds() {
        for base in [0u8, 1, 10, 35, 50, 90, 95, 100] {
            for img in [flat(0), checkerboard(), gentle_gradient()] {
                let q = adapt_quality(&img, base);
                assert!((30..=95).contains(&q), "base {base} gave {q}");
            }
        }
    }

    #[test]
    fn empty_image_uses_fallback_stddev() {
        let empty = DynamicImage::ImageRgba8(RgbaImage::new(0, 0));
        assert_eq!(luminance_complexity(&empty), None);
        assert_eq!(adapt_quality(&empty, 70), 70);
    }

    #[test]
    fn band_edges() {
        assert_eq!(quality_for_complexity(29.99, 60), 50);
        assert_eq!(quality_for_complexity(30.0, 60), 60);
        assert_eq!(quality_for_complexity(60.0, 60), 60);
        assert_eq!(quality_for_complexity(60.01, 60), 65);
        assert_eq!(quality_for_complexity(10.0, 35), 30);
        assert_eq!(quality_for_complexity(90.0, 93), 95);
    }
}
