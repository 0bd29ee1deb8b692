//! Report generation.
//!
//! Runs one request end to end:
//!
//! ```text
//! photos ──normalize──▶ figures ──plan (per format)──▶ ReportPlan ──assemble──▶ bytes
//!            │
//!            └─ undecodable photo: warned about and skipped, numbering kept
//! ```
//!
//! Every format is laid out with its own measurement provider, so PDF and
//! DOCX may paginate slightly differently while sharing figure numbering and
//! row grouping.
//!
//! ## Failure policy
//!
//! - A photo that fails to normalize is skipped. The remaining figures keep
//!   their original numbers, so the gap stays visible.
//! - A packaging failure in any format aborts the whole generation. Artifacts
//!   are only handed out once every format assembled successfully.

use crate::config::ReportConfig;
use crate::imaging::{NormalizeJob, Normalizer};
use crate::layout::{Figure, Pagination, ReportPlan, plan_report};
use crate::naming::artifact_filename;
use crate::render::{Assembler, RenderError, assembler_for};
use crate::request::ReportRequest;
use crate::types::{DocumentFormat, LayoutConfig};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("failed to assemble the {format} document: {source}")]
    Packaging {
        format: DocumentFormat,
        source: RenderError,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// A photo left out of the report.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedPhoto {
    pub number: usize,
    pub id: String,
    pub reason: String,
}

/// Normalized figures of a request, in document order.
#[derive(Debug, Clone)]
pub struct PreparedReport {
    pub figures: Vec<Figure>,
    pub skipped: Vec<SkippedPhoto>,
}

/// A finished document, not yet written anywhere.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub format: DocumentFormat,
    pub filename: String,
    pub bytes: Vec<u8>,
    /// Pages decided by the layout engine; `None` when the format paginates
    /// itself.
    pub pages: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct GeneratedReport {
    pub artifacts: Vec<Artifact>,
    pub figures: usize,
    pub skipped: Vec<SkippedPhoto>,
}

/// Layout for a request: the request's own, else the configured one.
pub fn effective_layout(request: &ReportRequest, config: &ReportConfig) -> LayoutConfig {
    request.layout.unwrap_or_else(|| config.layout.layout())
}

/// Normalize every photo, keeping the survivors as numbered figures.
///
/// Requests are issued in document order; the normalizer returns results in
/// the same order however they complete.
pub fn prepare(request: &ReportRequest, normalizer: &dyn Normalizer) -> PreparedReport {
    let jobs: Vec<NormalizeJob<'_>> = request
        .photos
        .iter()
        .map(|p| NormalizeJob {
            source: &p.source,
            rotation: p.rotation,
        })
        .collect();

    info!(
        photos = jobs.len(),
        strategy = %normalizer.kind(),
        "normalizing photos"
    );
    let outcomes = normalizer.normalize_all(&jobs);

    let mut figures = Vec::with_capacity(outcomes.len());
    let mut skipped = Vec::new();
    for (index, (photo, outcome)) in request.photos.iter().zip(outcomes).enumerate() {
        let number = index + 1;
        match outcome {
            Ok(image) => {
                debug!(
                    figure = number,
                    id = %photo.id,
                    width = image.width,
                    height = image.height,
                    bytes = image.bytes.len(),
                    "photo normalized"
                );
                figures.push(Figure {
                    number,
                    id: photo.id.clone(),
                    description: photo.description.clone(),
                    image,
                });
            }
            Err(e) => {
                warn!(figure = number, id = %photo.id, "skipping photo: {e}");
                skipped.push(SkippedPhoto {
                    number,
                    id: photo.id.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    PreparedReport { figures, skipped }
}

/// Lay out prepared figures for one format.
pub fn plan_for(
    request: &ReportRequest,
    prepared: &PreparedReport,
    config: &ReportConfig,
    assembler: &dyn Assembler,
) -> ReportPlan {
    plan_report(
        &request.metadata,
        &config.output.title,
        &prepared.figures,
        effective_layout(request, config),
        assembler.measure(),
    )
}

/// Plan and assemble one format.
pub fn render_format(
    request: &ReportRequest,
    prepared: &PreparedReport,
    config: &ReportConfig,
    format: DocumentFormat,
) -> Result<Artifact, GenerateError> {
    let assembler = assembler_for(format, config.layout.border_shape);
    let plan = plan_for(request, prepared, config, assembler.as_ref());
    info!(
        %format,
        pages = plan.pages.len(),
        rows = plan.rows().count(),
        "assembling document"
    );

    let bytes = assembler
        .assemble(&plan, &prepared.figures)
        .map_err(|source| GenerateError::Packaging { format, source })?;

    Ok(Artifact {
        format,
        filename: artifact_filename(
            &config.output.report_label,
            &request.metadata.institution,
            &config.output.fallback_name,
            format,
        ),
        bytes,
        pages: match assembler.measure().pagination() {
            Pagination::Explicit => Some(plan.pages.len()),
            Pagination::Implicit => None,
        },
    })
}

/// Generate every configured format for a request.
pub fn generate(
    request: &ReportRequest,
    config: &ReportConfig,
    normalizer: &dyn Normalizer,
) -> Result<GeneratedReport, GenerateError> {
    let prepared = prepare(request, normalizer);
    if !prepared.skipped.is_empty() {
        warn!(
            skipped = prepared.skipped.len(),
            kept = prepared.figures.len(),
            "some photos could not be decoded"
        );
    }

    let artifacts = config
        .output
        .formats
        .iter()
        .map(|&format| render_format(request, &prepared, config, format))
        .collect::<Result<Vec<_>, _>>()?;

    info!(
        artifacts = artifacts.len(),
        figures = prepared.figures.len(),
        "report generated"
    );
    Ok(GeneratedReport {
        artifacts,
        figures: prepared.figures.len(),
        skipped: prepared.skipped,
    })
}

/// Write artifacts into `dir`, creating it when missing.
///
/// Each artifact is first written to a hidden `.part` file beside its
/// destination. The parts are renamed into place once all of them are on
/// disk. When any step fails, the parts and the artifacts already renamed are
/// removed, so a failed call leaves no partial report behind.
pub fn write_artifacts(artifacts: &[Artifact], dir: &Path) -> Result<Vec<PathBuf>, GenerateError> {
    fs::create_dir_all(dir).map_err(|source| GenerateError::Write {
        path: dir.to_path_buf(),
        source,
    })?;

    let staged: Vec<(PathBuf, PathBuf)> = artifacts
        .iter()
        .map(|a| {
            (
                dir.join(format!(".{}.part", a.filename)),
                dir.join(&a.filename),
            )
        })
        .collect();

    for (artifact, (part, path)) in artifacts.iter().zip(&staged) {
        if let Err(source) = fs::write(part, &artifact.bytes) {
            discard(staged.iter().map(|(part, _)| part));
            return Err(GenerateError::Write {
                path: path.clone(),
                source,
            });
        }
    }

    for (i, (part, path)) in staged.iter().enumerate() {
        if let Err(source) = fs::rename(part, path) {
            discard(
                staged[i..]
                    .iter()
                    .map(|(part, _)| part)
                    .chain(staged[..i].iter().map(|(_, done)| done)),
            );
            return Err(GenerateError::Write {
                path: path.clone(),
                source,
            });
        }
        debug!(path = %path.display(), "artifact written");
    }

    Ok(staged.into_iter().map(|(_, path)| path).collect())
}

/// Best-effort cleanup after a failed write.
fn discard<'a>(paths: impl Iterator<Item = &'a PathBuf>) {
    for path in paths {
        match fs::remove_file(path) {
            Err(err) if err.kind() != io::ErrorKind::NotFound => {
                warn!(path = %path.display(), error = %err, "could not remove partial artifact");
            }
            _ => {}
        }
    }
}
