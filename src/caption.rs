//! Caption and first-page header composition.
//!
//! A caption is the figure label (`Figura N`) in bold, followed by the photo
//! description in italics when there is one. The label/description split is
//! kept on every wrapped line. Heights come from the measurement provider of
//! the target format, so the same caption may take a different number of
//! lines in each format.

use crate::layout::Measure;
use crate::text::{self, Emphasis, Span, TextLine};
use crate::types::{Columns, ReportMetadata};

/// Wrapped caption of one figure.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionBlock {
    pub lines: Vec<TextLine>,
    pub font_size: f64,
    pub line_height: f64,
    /// `lines.len() × line_height`, in provider units.
    pub height: f64,
}

/// Figure label: `"Figura N: "` before a description, `"Figura N"` alone.
pub fn caption_label(number: usize, has_description: bool) -> String {
    if has_description {
        format!("Figura {number}: ")
    } else {
        format!("Figura {number}")
    }
}

/// Styled runs of a caption. Whitespace in the description collapses to
/// single spaces; a description that is only whitespace counts as empty.
pub fn caption_spans(number: usize, description: &str) -> Vec<Span> {
    let description = text::collapse_whitespace(description);
    let mut spans = vec![Span::new(
        caption_label(number, !description.is_empty()),
        Emphasis::Strong,
    )];
    if !description.is_empty() {
        spans.push(Span::new(description, Emphasis::Italic));
    }
    spans
}

/// Lay out the caption of figure `number` within `available_width`.
///
/// Font size and line height follow the column count. The caption stays on
/// one line unless its single-line width exceeds `available_width`.
pub fn compose_caption(
    number: usize,
    description: &str,
    available_width: f64,
    columns: Columns,
    measure: &dyn Measure,
) -> CaptionBlock {
    let font_size = measure.caption_font_size(columns);
    let line_height = measure.caption_line_height(columns);
    let spans = caption_spans(number, description);
    let lines = text::wrap_spans(&spans, available_width, |t, e| {
        measure.text_width(t, e, font_size)
    });
    CaptionBlock {
        height: lines.len() as f64 * line_height,
        lines,
        font_size,
        line_height,
    }
}

/// One line of the first-page header.
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderLine {
    pub line: TextLine,
    pub font_size: f64,
    pub line_height: f64,
    pub centered: bool,
}

/// Title, metadata fields and comments shown before the first row.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HeaderBlock {
    pub lines: Vec<HeaderLine>,
    /// Sum of the line heights plus the gap after the header.
    pub height: f64,
}

/// Metadata fields in display order with their labels. Empty values are
/// omitted from the header.
pub fn header_fields(metadata: &ReportMetadata) -> Vec<(&'static str, &str)> {
    [
        ("Instituição:", metadata.institution.as_str()),
        ("Motivo:", metadata.motive.as_str()),
        ("Processo nº:", metadata.process_number.as_str()),
        ("Endereço:", metadata.address.as_str()),
        ("Data:", metadata.date.as_str()),
    ]
    .into_iter()
    .filter(|(_, value)| !value.trim().is_empty())
    .collect()
}

pub fn compose_header(metadata: &ReportMetadata, title: &str, measure: &dyn Measure) -> HeaderBlock {
    let style = measure.header_style();
    let width = measure.page().content_width();
    let mut lines = Vec::new();

    let mut push = |spans: Vec<Span>, size: f64, line_height: f64, centered: bool| {
        for line in text::wrap_spans(&spans, width, |t, e| measure.text_width(t, e, size)) {
            lines.push(HeaderLine {
                line,
                font_size: size,
                line_height,
                centered,
            });
        }
    };

    if !title.trim().is_empty() {
        push(
            vec![Span::new(title, Emphasis::Strong)],
            style.title_size,
            style.title_line_height,
            true,
        );
    }

    for (label, value) in header_fields(metadata) {
        push(
            vec![
                Span::new(label, Emphasis::Strong),
                Span::new(value, Emphasis::Regular),
            ],
            style.body_size,
            style.body_line_height,
            false,
        );
    }

    if !metadata.comments.trim().is_empty() {
        push(
            vec![Span::new("Observações:", Emphasis::Strong)],
            style.body_size,
            style.body_line_height,
            false,
        );
        push(
            vec![Span::new(metadata.comments.as_str(), Emphasis::Regular)],
            style.body_size,
            style.body_line_height,
            false,
        );
    }

    if lines.is_empty() {
        return HeaderBlock::default();
    }

    let height = lines.iter().map(|l| l.line_height).sum::<f64>() + style.gap_after;
    HeaderBlock { lines, height }
}
