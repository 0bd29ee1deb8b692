//! # Photo Report
//!
//! Turns an ordered set of photographs plus free-text metadata into a photo
//! report: a header with the report's details followed by the photos laid out
//! in a grid of 1, 2 or 3 columns, each with a numbered caption. Every report
//! is produced as a paginated PDF and as an editable DOCX.
//!
//! # Architecture: One Plan, Two Assemblers
//!
//! ```text
//! 1. Request    request.json  →  ReportRequest     (metadata, layout, photo bytes)
//! 2. Normalize  photos        →  figures           (bounded, rotated JPEGs)
//! 3. Plan       figures       →  ReportPlan        (rows, cells, captions, pages)
//! 4. Assemble   plan          →  .pdf / .docx      (lopdf / OOXML package)
//! ```
//!
//! Layout decisions are made exactly once per format by the shared engine in
//! [`layout`]. The assemblers only translate a [`layout::ReportPlan`] into
//! their document model; they never decide where a figure goes. Each format
//! supplies its own measurement provider (points for PDF, twips for DOCX), so
//! both documents group and number figures identically.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`request`] | Loads and validates the JSON request, reads photo bytes |
//! | [`imaging`] | Photo normalization: decode, bound, flatten, rotate, re-encode; pooled or inline |
//! | [`text`] | Font metrics, greedy line wrapping, WinAnsi encoding |
//! | [`caption`] | Figure captions and the first-page header block |
//! | [`layout`] | Fit calculation, row grouping and pagination shared by every format |
//! | [`render`] | PDF and DOCX assemblers |
//! | [`generate`] | Runs a request end to end and collects the artifacts |
//! | [`naming`] | Artifact filenames derived from the institution name |
//! | [`config`] | `report.toml` loading, validation and merging |
//! | [`types`] | Shared request types (`ReportMetadata`, `PhotoRecord`, `LayoutConfig`) |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Skip, Don't Fail
//!
//! A photo that cannot be decoded is left out with a warning; the report is
//! still produced and the remaining figures keep their original numbers. A
//! failure to package a document, on the other hand, aborts the generation
//! and nothing is written.
//!
//! ## Pure-Rust Imaging
//!
//! The [`imaging`] module uses the `image` crate for decoding, Lanczos3
//! downscaling and JPEG encoding. No system libraries are required.
//!
//! ## Config Layering
//!
//! ```text
//! stock defaults  ←  report.toml  ←  request "layout" object
//! ```

pub mod caption;
pub mod config;
pub mod generate;
pub mod imaging;
pub mod layout;
pub mod naming;
pub mod output;
pub mod render;
pub mod request;
pub mod text;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
