//! Pure calculation functions for image dimensions and statistics.
//!
//! All functions here are pure and testable without any I/O or images.

/// Dimensions for a compressed variant that fits a pixel budget.
///
/// Returns `None` when the source already fits (`w * h <= target_pixels`),
/// meaning the image is used unresized. Otherwise both edges are scaled by
/// `sqrt(target / (w * h))`, rounded down, and kept at least 1px. The aspect
/// ratio survives within integer rounding and the area stays within the
/// budget unless the 1px floor forces it over.
///
/// # Examples
/// ```
/// # use photo_packager::imaging::compressed_dimensions;
/// // 4000x3000 (12 MP) into 2 MP → 1632x1224
/// assert_eq!(compressed_dimensions((4000, 3000), 2_000_000), Some((1632, 1224)));
///
/// // Already small enough
/// assert_eq!(compressed_dimensions((1600, 1200), 2_000_000), None);
/// ```
pub fn compressed_dimensions(source: (u32, u32), target_pixels: u64) -> Option<(u32, u32)> {
    let (w, h) = source;
    let current = w as u64 * h as u64;
    if current <= target_pixels {
        return None;
    }
    let scale = (target_pixels as f64 / current as f64).sqrt();
    let new_w = ((w as f64 * scale).floor() as u32).max(1);
    let new_h = ((h as f64 * scale).floor() as u32).max(1);
    Some((new_w, new_h))
}

/// Population standard deviation of 8-bit samples.
///
/// Returns `None` for an empty slice or a non-finite result.
pub fn luminance_stddev(samples: &[u8]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    let n = samples.len() as f64;
    let (sum, sum_sq) = samples.iter().fold((0.0f64, 0.0f64), |(s, sq), &v| {
        let v = v as f64;
        (s + v, sq + v * v)
    });
    let mean = sum / n;
    let variance = (sum_sq / n - mean * mean).max(0.0);
    let stddev = variance.sqrt();
    stddev.is_finite().then_some(stddev)
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // compressed_dimensions
    // =========================================================================

    #[test]
    fn no_resize_at_or_below_target() {
        assert_eq!(compressed_dimensions((1000, 2000), 2_000_000), None);
        assert_eq!(compressed_dimensions((10, 10), 2_000_000), None);
    }

    #[test]
    fn landscape_scaled_into_budget() {
        let (w, h) = compressed_dimensions((6000, 4000), 2_000_000).unwrap();
        assert!(w as u64 * h as u64 <= 2_000_000);
        assert_eq!((w, h), (1732, 1154));
    }

    #[test]
    fn portrait_scaled_into_budget() {
        let (w, h) = compressed_dimensions((3000, 4000), 2_000_000).unwrap();
        assert!(w < h);
        assert!(w as u64 * h as u64 <= 2_000_000);
    }

    #[test]
    fn aspect_ratio_preserved_within_rounding() {
        for &(sw, sh) in &[(6000u32, 4000u32), (4000, 6000), (5000, 5000), (8192, 1024)] {
            let (w, h) = compressed_dimensions((sw, sh), 2_000_000).unwrap();
            let src_ratio = sw as f64 / sh as f64;
            let new_ratio = w as f64 / h as f64;
            // One pixel of floor rounding on the short edge bounds the error
            let tolerance = src_ratio / h as f64 + 1.0 / h as f64;
            assert!(
                (src_ratio - new_ratio).abs() <= tolerance,
                "{sw}x{sh} -> {w}x{h}"
            );
        }
    }

    #[test]
    fn extreme_aspect_keeps_one_pixel_minimum() {
        let (w, h) = compressed_dimensions((100_000, 1), 100).unwrap();
        assert_eq!(h, 1);
        assert!(w >= 1);
    }

    #[test]
    fn zero_area_is_left_alone() {
        assert_eq!(compressed_dimensions((0, 100), 10), None);
    }

    // =========================================================================
    // luminance_stddev
    // =========================================================================

    #[test]
    fn stddev_of_flat_image_is_zero() {
        assert_eq!(luminance_stddev(&[128; 64]), Some(0.0));
    }

    #[test]
    fn stddev_of_black_white_split_is_half_range() {
        let mut samples = vec![0u8; 50];
        samples.extend(vec![255u8; 50]);
        let sd = luminance_stddev(&samples).unwrap();
        assert!((sd - 127.5).abs() < 1e-9);
    }

    #[test]
    fn stddev_of_empty_is_none() {
        assert_eq!(luminance_stddev(&[]), None);
    }
}
