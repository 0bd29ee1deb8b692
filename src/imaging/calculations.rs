//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// Scale `(src_w, src_h)` to fit inside `(max_w, max_h)` preserving aspect ratio.
///
/// The scale factor is `min(max_w / src_w, max_h / src_h)`, so small sources are
/// enlarged and large sources are shrunk. Results are rounded to the nearest
/// integer and never exceed the bounding box. A zero source dimension yields
/// `(0, 0)`.
///
/// # Examples
/// ```
/// # use photo_report::imaging::fit_within;
/// // 4000x3000 landscape into a 200x200 box → 200x150
/// assert_eq!(fit_within(4000, 3000, 200, 200), (200, 150));
///
/// // Degenerate source
/// assert_eq!(fit_within(0, 300, 200, 200), (0, 0));
/// ```
pub fn fit_within(src_w: u32, src_h: u32, max_w: u32, max_h: u32) -> (u32, u32) {
    if src_w == 0 || src_h == 0 {
        return (0, 0);
    }

    let ratio = (max_w as f64 / src_w as f64).min(max_h as f64 / src_h as f64);
    let w = (src_w as f64 * ratio).round() as u32;
    let h = (src_h as f64 * ratio).round() as u32;

    // Extreme aspect ratios can round the short side to zero.
    (w.clamp(1.min(max_w), max_w), h.clamp(1.min(max_h), max_h))
}

/// Downscale so neither edge exceeds `bound`. Sources already inside the bound
/// keep their size.
///
/// # Examples
/// ```
/// # use photo_report::imaging::scale_to_bound;
/// assert_eq!(scale_to_bound(3200, 2400, 1600), (1600, 1200));
/// assert_eq!(scale_to_bound(800, 600, 1600), (800, 600));
/// ```
pub fn scale_to_bound(src_w: u32, src_h: u32, bound: u32) -> (u32, u32) {
    if src_w <= bound && src_h <= bound {
        (src_w, src_h)
    } else {
        fit_within(src_w, src_h, bound, bound)
    }
}

/// Dimensions of the output surface after rotating a `(w, h)` image.
pub fn rotated_dimensions(dims: (u32, u32), swaps_axes: bool) -> (u32, u32) {
    if swaps_axes { (dims.1, dims.0) } else { dims }
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // fit_within tests
    // =========================================================================

    #[test]
    fn fit_landscape_into_square() {
        assert_eq!(fit_within(4000, 3000, 200, 200), (200, 150));
    }

    #[test]
    fn fit_portrait_into_square() {
        assert_eq!(fit_within(3000, 4000, 200, 200), (150, 200));
    }

    #[test]
    fn fit_enlarges_small_source() {
        // 40x30 into 200x200 → 200x150
        assert_eq!(fit_within(40, 30, 200, 200), (200, 150));
    }

    #[test]
    fn fit_height_bound_wins() {
        // 1000x1000 into 300x100: height is the tighter bound
        assert_eq!(fit_within(1000, 1000, 300, 100), (100, 100));
    }

    #[test]
    fn fit_zero_source_returns_zero() {
        assert_eq!(fit_within(0, 100, 200, 200), (0, 0));
        assert_eq!(fit_within(100, 0, 200, 200), (0, 0));
        assert_eq!(fit_within(0, 0, 200, 200), (0, 0));
    }

    #[test]
    fn fit_extreme_aspect_keeps_one_pixel() {
        assert_eq!(fit_within(10_000, 1, 100, 100), (100, 1));
    }

    #[test]
    fn fit_never_exceeds_box_and_preserves_aspect() {
        let sources = [(1, 1), (7, 3), (3, 7), (4032, 3024), (1080, 1920), (999, 1000)];
        let boxes = [(1, 1), (50, 80), (481, 340), (320, 2000), (1600, 1600)];
        for &(w, h) in &sources {
            for &(mw, mh) in &boxes {
                let (fw, fh) = fit_within(w, h, mw, mh);
                assert!(fw <= mw && fh <= mh, "{w}x{h} in {mw}x{mh} → {fw}x{fh}");
                // One side touches the box (within rounding)
                assert!(fw + 1 >= mw || fh + 1 >= mh, "{w}x{h} in {mw}x{mh} → {fw}x{fh}");
                if fw > 10 && fh > 10 {
                    let src_aspect = w as f64 / h as f64;
                    let out_aspect = fw as f64 / fh as f64;
                    assert!(
                        (src_aspect - out_aspect).abs() / src_aspect < 0.1,
                        "{w}x{h} → {fw}x{fh}"
                    );
                }
            }
        }
    }

    // =========================================================================
    // scale_to_bound tests
    // =========================================================================

    #[test]
    fn bound_downscales_large_landscape() {
        assert_eq!(scale_to_bound(4000, 3000, 1600), (1600, 1200));
    }

    #[test]
    fn bound_downscales_large_portrait() {
        assert_eq!(scale_to_bound(3000, 4000, 1600), (1200, 1600));
    }

    #[test]
    fn bound_keeps_small_image() {
        assert_eq!(scale_to_bound(640, 480, 1600), (640, 480));
    }

    #[test]
    fn bound_exact_edge_is_untouched() {
        assert_eq!(scale_to_bound(1600, 900, 1600), (1600, 900));
    }

    // =========================================================================
    // rotated_dimensions tests
    // =========================================================================

    #[test]
    fn rotation_swaps_only_when_asked() {
        assert_eq!(rotated_dimensions((1600, 1200), true), (1200, 1600));
        assert_eq!(rotated_dimensions((1600, 1200), false), (1600, 1200));
    }
}
