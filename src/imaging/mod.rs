//! Image normalization: pure Rust, no system dependencies.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Normalize** | Lanczos3 downscale, flatten on white, rotate, JPEG encode |
//! | **Fit** | [`fit_within`] (pure) |
//! | **Schedule** | rayon worker pool or the calling thread |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing a normalization request
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Normalizer**: [`Normalizer`] strategies that schedule backend work

pub mod backend;
mod calculations;
pub mod normalizer;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, ImageBackend, NormalizedImage};
pub use calculations::{fit_within, rotated_dimensions, scale_to_bound};
pub use normalizer::{
    InlineNormalizer, NormalizeJob, NormalizeOutcome, Normalizer, NormalizerKind,
    PooledNormalizer, RequestTable, select_normalizer,
};
pub use params::{NormalizeParams, NormalizeSettings, Quality};
pub use rust_backend::RustBackend;
