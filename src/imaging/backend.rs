//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the one operation every backend must
//! support: normalize a source photo into an embeddable JPEG.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate. Tests use the recording `MockBackend` below.

use super::params::NormalizeParams;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// The source bytes could not be decoded as an image. Recoverable: the
    /// photo is skipped and the report is rendered without it.
    #[error("Decode failed: {0}")]
    Decode(String),
    #[error("Encode failed: {0}")]
    Encode(String),
    /// The backend panicked while handling this photo. Treated like a decode
    /// failure: only this photo is skipped.
    #[error("Normalization panicked: {0}")]
    Panicked(String),
    /// The worker servicing the request went away before reporting back.
    #[error("Normalization request {0} was dropped")]
    Dropped(u64),
}

/// A photo ready for embedding: encoded JPEG bytes plus the final pixel size,
/// measured after rotation and downscaling.
#[derive(Clone, PartialEq, Eq)]
pub struct NormalizedImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl std::fmt::Debug for NormalizedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NormalizedImage")
            .field("bytes", &format_args!("[{} bytes]", self.bytes.len()))
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

/// Trait for image processing backends.
///
/// Backends must be `Send + Sync`: the pooled normalizer shares one backend
/// across its worker threads.
pub trait ImageBackend: Send + Sync {
    /// Decode, downscale to the bound, flatten onto white, rotate and re-encode.
    fn normalize(&self, params: &NormalizeParams) -> Result<NormalizedImage, BackendError>;
}
