//! Shared test utilities for the photo-report test suite.
//!
//! Provides synthetic image bytes built with the `image` crate and builders
//! for figures and metadata, so layout and rendering tests do not need
//! fixture files.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let figs = jpeg_figures(&[(640, 480), (480, 640)]);
//! let plan = plan_report(&sample_metadata(), "TITLE", &figs, layout, &PdfMeasure);
//! ```

use crate::imaging::NormalizedImage;
use crate::layout::Figure;
use crate::types::ReportMetadata;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, Rgb, RgbImage, Rgba, RgbaImage};

// =========================================================================
// Synthetic images
// =========================================================================

/// A JPEG with a horizontal gradient, so it is not a flat color.
pub fn synthetic_jpeg(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x * 255 / width.max(1)) as u8, (y * 255 / height.max(1)) as u8, 128])
    });
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, 90)
        .write_image(img.as_raw(), width, height, ExtendedColorType::Rgb8)
        .unwrap();
    buf
}

/// A fully transparent RGBA PNG.
pub fn png_with_alpha(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, Rgba([10, 20, 30, 0]));
    let mut buf = Vec::new();
    PngEncoder::new(&mut buf)
        .write_image(img.as_raw(), width, height, ExtendedColorType::Rgba8)
        .unwrap();
    buf
}

// =========================================================================
// Figures
// =========================================================================

fn figure(number: usize, image: NormalizedImage) -> Figure {
    Figure {
        number,
        id: format!("p{number}"),
        description: String::new(),
        image,
    }
}

/// Figures numbered from 1 with the given pixel sizes. The image bytes are
/// placeholders: enough for layout, not for rendering.
pub fn figures(sizes: &[(u32, u32)]) -> Vec<Figure> {
    sizes
        .iter()
        .enumerate()
        .map(|(i, &(width, height))| {
            figure(
                i + 1,
                NormalizedImage {
                    bytes: Vec::new(),
                    width,
                    height,
                },
            )
        })
        .collect()
}

/// Figures numbered from 1 carrying real JPEG bytes of the given sizes.
pub fn jpeg_figures(sizes: &[(u32, u32)]) -> Vec<Figure> {
    sizes
        .iter()
        .enumerate()
        .map(|(i, &(width, height))| {
            figure(
                i + 1,
                NormalizedImage {
                    bytes: synthetic_jpeg(width, height),
                    width,
                    height,
                },
            )
        })
        .collect()
}

// =========================================================================
// Metadata
// =========================================================================

pub fn sample_metadata() -> ReportMetadata {
    ReportMetadata {
        institution: "Escola Estadual São José".into(),
        motive: "Vistoria de rotina".into(),
        process_number: "2024/0042".into(),
        address: "Rua das Flores, 120".into(),
        date: "12/03/2024".into(),
        comments: "Infiltrações no bloco B.\nTelhado com telhas quebradas.".into(),
    }
}
