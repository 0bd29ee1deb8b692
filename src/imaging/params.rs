//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the [`normalizer`](super::normalizer) (which decides what
//! to normalize and where it runs) and the [`backend`](super::backend) (which
//! does the actual pixel work).
//!
//! ## Types
//!
//! - [`Quality`]: JPEG encoding quality (1–100, default 85). Clamped on construction.
//! - [`NormalizeParams`]: source bytes, rotation, maximum edge, quality.

use crate::types::Rotation;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(85)
    }
}

/// Parameters for normalizing one source photo.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizeParams<'a> {
    pub source: &'a [u8],
    pub rotation: Rotation,
    /// Longest allowed edge of the pre-rotation image, in pixels.
    pub max_dimension: u32,
    pub quality: Quality,
}

/// Encoding settings shared by every normalization in one report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizeSettings {
    pub max_dimension: u32,
    pub quality: Quality,
}

impl Default for NormalizeSettings {
    fn default() -> Self {
        Self {
            max_dimension: 1600,
            quality: Quality::default(),
        }
    }
}

impl NormalizeSettings {
    pub fn params<'a>(&self, source: &'a [u8], rotation: Rotation) -> NormalizeParams<'a> {
        NormalizeParams {
            source,
            rotation,
            max_dimension: self.max_dimension,
            quality: self.quality,
        }
    }
}
