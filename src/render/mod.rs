//! Document assemblers.
//!
//! Each output format pairs a [`Measure`] provider, which feeds the shared
//! layout engine, with an assembler that turns the resulting [`ReportPlan`]
//! into bytes. Both assemblers consume the same row and page decisions:
//!
//! | Format | Units | Pagination | Crate |
//! |---|---|---|---|
//! | PDF | points | explicit, one page object per [`PageFrame`](crate::layout::PageFrame) | `lopdf` |
//! | DOCX | twips | implicit, rows become non-splitting table rows | `zip` + WordprocessingML |

pub mod docx;
pub mod pdf;

use crate::layout::{Figure, Measure, ReportPlan};
use crate::types::{BorderShape, DocumentFormat};
use thiserror::Error;

/// Failure to package a document. Always fatal for the generation.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// A planned figure has no usable image.
    #[error("Image error: {0}")]
    Image(String),
}

/// Turns a layout plan into a finished document.
pub trait Assembler {
    /// Measurement provider the plan must be built with.
    fn measure(&self) -> &dyn Measure;

    fn assemble(&self, plan: &ReportPlan, figures: &[Figure]) -> Result<Vec<u8>, RenderError>;
}

pub fn assembler_for(format: DocumentFormat, border_shape: BorderShape) -> Box<dyn Assembler> {
    match format {
        DocumentFormat::Pdf => Box::new(pdf::PdfAssembler::new(border_shape)),
        DocumentFormat::Docx => Box::new(docx::DocxAssembler::new()),
    }
}

/// Look up the figure a plan cell points at.
fn planned_figure<'a>(figures: &'a [Figure], index: usize) -> Result<&'a Figure, RenderError> {
    figures
        .get(index)
        .ok_or_else(|| RenderError::Image(format!("figure #{index} is not part of this report")))
}
