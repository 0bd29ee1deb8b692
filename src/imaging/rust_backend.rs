//! Pure Rust image processing backend.
//!
//! Everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, TIFF, WebP, BMP, GIF) | `image::load_from_memory` |
//! | Downscale | `DynamicImage::resize_exact` with `Lanczos3` |
//! | Flatten alpha | blend onto opaque white |
//! | Rotate | `image::imageops::rotate90` / `rotate180` / `rotate270` (clockwise) |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` |

use super::backend::{BackendError, ImageBackend, NormalizedImage};
use super::calculations::scale_to_bound;
use super::params::NormalizeParams;
use crate::types::Rotation;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, ExtendedColorType, ImageEncoder, Rgb, RgbImage};

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn decode(source: &[u8]) -> Result<DynamicImage, BackendError> {
    image::load_from_memory(source).map_err(|e| BackendError::Decode(e.to_string()))
}

/// Composite onto an opaque white background. Source transparency is dropped.
fn flatten_on_white(img: &DynamicImage) -> RgbImage {
    if !img.color().has_alpha() {
        return img.to_rgb8();
    }
    let rgba = img.to_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let p = rgba.get_pixel(x, y);
        let alpha = p[3] as f32 / 255.0;
        let blend = |c: u8| (c as f32 * alpha + 255.0 * (1.0 - alpha)).round() as u8;
        Rgb([blend(p[0]), blend(p[1]), blend(p[2])])
    })
}

fn rotate(img: RgbImage, rotation: Rotation) -> RgbImage {
    match rotation {
        Rotation::None => img,
        Rotation::Quarter => imageops::rotate90(&img),
        Rotation::Half => imageops::rotate180(&img),
        Rotation::ThreeQuarter => imageops::rotate270(&img),
    }
}

fn encode_jpeg(img: &RgbImage, quality: u32) -> Result<Vec<u8>, BackendError> {
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100) as u8)
        .write_image(img.as_raw(), img.width(), img.height(), ExtendedColorType::Rgb8)
        .map_err(|e| BackendError::Encode(e.to_string()))?;
    Ok(buf)
}

impl ImageBackend for RustBackend {
    fn normalize(&self, params: &NormalizeParams) -> Result<NormalizedImage, BackendError> {
        let img = decode(params.source)?;

        // The bound applies to the pre-rotation orientation.
        let (w, h) = scale_to_bound(img.width(), img.height(), params.max_dimension);
        let scaled = if (w, h) == (img.width(), img.height()) {
            img
        } else {
            img.resize_exact(w, h, FilterType::Lanczos3)
        };

        let rotated = rotate(flatten_on_white(&scaled), params.rotation);
        let bytes = encode_jpeg(&rotated, params.quality.value())?;

        Ok(NormalizedImage {
            width: rotated.width(),
            height: rotated.height(),
            bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::params::Quality;
    use crate::test_helpers::{png_with_alpha, synthetic_jpeg};

    fn params(source: &[u8], rotation: Rotation) -> NormalizeParams<'_> {
        NormalizeParams {
            source,
            rotation,
            max_dimension: 100,
            quality: Quality::new(80),
        }
    }

    #[test]
    fn normalize_downscales_to_bound() {
        let backend = RustBackend::new();
        let out = backend
            .normalize(&params(&synthetic_jpeg(400, 300), Rotation::None))
            .unwrap();
        assert_eq!((out.width, out.height), (100, 75));
    }

    #[test]
    fn normalize_keeps_small_image_size() {
        let backend = RustBackend::new();
        let out = backend
            .normalize(&params(&synthetic_jpeg(60, 40), Rotation::None))
            .unwrap();
        assert_eq!((out.width, out.height), (60, 40));
    }

    #[test]
    fn normalize_output_is_decodable_jpeg() {
        let backend = RustBackend::new();
        let out = backend
            .normalize(&params(&synthetic_jpeg(400, 300), Rotation::Half))
            .unwrap();
        assert_eq!(&out.bytes[..3], &[0xFF, 0xD8, 0xFF]);
        let decoded = image::load_from_memory(&out.bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (out.width, out.height));
    }

    #[test]
    fn normalize_swaps_axes_only_for_quarter_turns() {
        let backend = RustBackend::new();
        let source = synthetic_jpeg(400, 300);
        for rotation in [
            Rotation::None,
            Rotation::Quarter,
            Rotation::Half,
            Rotation::ThreeQuarter,
        ] {
            let out = backend.normalize(&params(&source, rotation)).unwrap();
            let expected = if rotation.swaps_axes() { (75, 100) } else { (100, 75) };
            assert_eq!((out.width, out.height), expected, "rotation {}", rotation.degrees());
        }
    }

    #[test]
    fn normalize_landscape_quarter_turn_becomes_portrait() {
        let backend = RustBackend::new();
        let out = backend
            .normalize(&params(&synthetic_jpeg(320, 180), Rotation::Quarter))
            .unwrap();
        assert!(out.width < out.height);
    }

    #[test]
    fn normalize_flattens_transparency_onto_white() {
        let backend = RustBackend::new();
        let out = backend
            .normalize(&params(&png_with_alpha(20, 20), Rotation::None))
            .unwrap();
        let decoded = image::load_from_memory(&out.bytes).unwrap().to_rgb8();
        let p = decoded.get_pixel(10, 10);
        // Fully transparent source → white (JPEG may wobble a little)
        assert!(p[0] > 240 && p[1] > 240 && p[2] > 240, "got {p:?}");
    }

    #[test]
    fn normalize_garbage_is_decode_error() {
        let backend = RustBackend::new();
        let result = backend.normalize(&params(b"\x00\x01\x02 broken", Rotation::None));
        assert!(matches!(result, Err(BackendError::Decode(_))));
    }
}
