//! Flow-document assembler.
//!
//! Writes a minimal WordprocessingML package. Lengths are twips (1/20 pt);
//! drawing extents are EMU (635 per twip). The word processor paginates, so
//! every planned row becomes one table row that may not split across pages.
//! A single-column plain report skips the table and writes each figure as an
//! image paragraph followed by its caption paragraph.
//!
//! ## Package parts
//!
//! | Part | Content |
//! |---|---|
//! | `[Content_Types].xml` | content types for rels, xml and jpeg |
//! | `_rels/.rels` | points at the main document |
//! | `word/document.xml` | header, figure table, section properties |
//! | `word/_rels/document.xml.rels` | one image relationship per figure |
//! | `word/media/imageN.jpeg` | figure `N`'s normalized JPEG |

use super::{Assembler, RenderError, planned_figure};
use crate::caption::{self, HeaderLine};
use crate::layout::{
    Cell, Figure, HeaderStyle, Measure, PageGeometry, Pagination, ReportPlan, Row,
};
use crate::text::{self, Emphasis, Span};
use crate::types::{CellStyle, Columns};
use quick_xml::escape::escape;
use std::fmt::Write as _;
use std::io::{Cursor, Write};
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

const EMU_PER_TWIP: f64 = 635.0;

/// A4 portrait.
const PAGE_WIDTH: u32 = 11906;
const PAGE_HEIGHT: u32 = 16838;
/// 2 cm.
const MARGIN: u32 = 1134;

/// Line height as a share of the font size.
const LEADING: f64 = 1.15;

fn line_height(size_pt: f64) -> f64 {
    (size_pt * 20.0 * LEADING).round()
}

/// Measurement provider in twips.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocxMeasure;

impl Measure for DocxMeasure {
    fn pagination(&self) -> Pagination {
        Pagination::Implicit
    }

    fn page(&self) -> PageGeometry {
        PageGeometry {
            width: PAGE_WIDTH as f64,
            height: PAGE_HEIGHT as f64,
            margin_top: MARGIN as f64,
            margin_bottom: MARGIN as f64,
            margin_left: MARGIN as f64,
            margin_right: MARGIN as f64,
        }
    }

    fn cell_box(&self, columns: Columns) -> (u32, u32) {
        match columns {
            Columns::One => (9000, 7600),
            Columns::Two => (4500, 3800),
            Columns::Three => (2900, 2400),
        }
    }

    fn caption_font_size(&self, columns: Columns) -> f64 {
        match columns {
            Columns::One => 12.0,
            Columns::Two => 10.0,
            Columns::Three => 9.0,
        }
    }

    fn caption_line_height(&self, columns: Columns) -> f64 {
        line_height(self.caption_font_size(columns))
    }

    fn row_padding(&self, style: CellStyle) -> f64 {
        match style {
            CellStyle::Plain => 240.0,
            CellStyle::Bordered => 400.0,
        }
    }

    fn header_style(&self) -> HeaderStyle {
        HeaderStyle {
            title_size: 16.0,
            title_line_height: line_height(16.0),
            body_size: 11.0,
            body_line_height: line_height(11.0),
            gap_after: 240.0,
        }
    }

    fn text_width(&self, text: &str, emphasis: Emphasis, size: f64) -> f64 {
        text::string_width(text, emphasis) * size * 20.0 / 1000.0
    }
}

pub struct DocxAssembler {
    measure: DocxMeasure,
}

impl DocxAssembler {
    pub fn new() -> Self {
        Self {
            measure: DocxMeasure,
        }
    }
}

impl Default for DocxAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl Assembler for DocxAssembler {
    fn measure(&self) -> &dyn Measure {
        &self.measure
    }

    fn assemble(&self, plan: &ReportPlan, figures: &[Figure]) -> Result<Vec<u8>, RenderError> {
        let mut media = Vec::new();
        for cell in plan.rows().flat_map(Row::figures) {
            let figure = planned_figure(figures, cell.figure)?;
            if figure.image.bytes.is_empty() {
                return Err(RenderError::Image(format!(
                    "figure {} ({}) has no image data",
                    figure.number, figure.id
                )));
            }
            media.push((cell.number, figure.image.bytes.as_slice()));
        }

        let document = DocumentXml::new(&self.measure, figures).render(plan)?;

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);

        zip.start_file("[Content_Types].xml", options)?;
        zip.write_all(CONTENT_TYPES.as_bytes())?;
        zip.start_file("_rels/.rels", options)?;
        zip.write_all(PACKAGE_RELS.as_bytes())?;
        zip.start_file("word/document.xml", options)?;
        zip.write_all(document.as_bytes())?;
        zip.start_file("word/_rels/document.xml.rels", options)?;
        zip.write_all(document_rels(media.iter().map(|(n, _)| *n)).as_bytes())?;
        for (number, bytes) in &media {
            // JPEG does not deflate further.
            zip.start_file(format!("word/media/{}", media_name(*number)), stored)?;
            zip.write_all(bytes)?;
        }

        debug!(images = media.len(), bytes = document.len(), "docx package written");
        Ok(zip.finish()?.into_inner())
    }
}

// ============================================================================
// Package boilerplate
// ============================================================================

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Default Extension="jpeg" ContentType="image/jpeg"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

const PACKAGE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

const DOCUMENT_OPEN: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:wp="http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing" xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:pic="http://schemas.openxmlformats.org/drawingml/2006/picture"><w:body>"#;

fn media_name(number: usize) -> String {
    format!("image{number}.jpeg")
}

fn relationship_id(number: usize) -> String {
    format!("rIdImg{number}")
}

fn document_rels(numbers: impl Iterator<Item = usize>) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    );
    for n in numbers {
        let _ = write!(
            xml,
            r#"<Relationship Id="{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="media/{}"/>"#,
            relationship_id(n),
            media_name(n)
        );
    }
    xml.push_str("</Relationships>");
    xml
}

// ============================================================================
// document.xml
// ============================================================================

/// Builds `word/document.xml`. Writing into a `String` cannot fail, so
/// `write!` results are discarded.
struct DocumentXml<'a> {
    measure: &'a DocxMeasure,
    figures: &'a [Figure],
    xml: String,
}

impl<'a> DocumentXml<'a> {
    fn new(measure: &'a DocxMeasure, figures: &'a [Figure]) -> Self {
        Self {
            measure,
            figures,
            xml: String::from(DOCUMENT_OPEN),
        }
    }

    fn render(mut self, plan: &ReportPlan) -> Result<String, RenderError> {
        self.header(&plan.header.lines);
        let layout = plan.layout;
        if layout.columns == Columns::One && layout.style == CellStyle::Plain {
            for cell in plan.rows().flat_map(Row::figures) {
                self.image_paragraph(cell);
                self.caption_paragraph(cell, 240)?;
            }
        } else if plan.rows().next().is_some() {
            self.table(plan)?;
        }
        self.section();
        self.xml.push_str("</w:body></w:document>");
        Ok(self.xml)
    }

    /// Runs are set in Arial, which shares Helvetica's metrics.
    fn run(&mut self, span: &Span, size_pt: f64) {
        self.xml.push_str(r#"<w:r><w:rPr><w:rFonts w:ascii="Arial" w:hAnsi="Arial" w:cs="Arial"/>"#);
        match span.emphasis {
            Emphasis::Strong => self.xml.push_str("<w:b/>"),
            Emphasis::Italic => self.xml.push_str("<w:i/>"),
            Emphasis::Regular => {}
        }
        let half_points = (size_pt * 2.0).round() as u32;
        let _ = write!(
            self.xml,
            r#"<w:sz w:val="{half_points}"/><w:szCs w:val="{half_points}"/></w:rPr><w:t xml:space="preserve">{}</w:t></w:r>"#,
            escape(span.text.as_str())
        );
    }

    fn paragraph(&mut self, spans: &[Span], size_pt: f64, centered: bool, after: u32) {
        let _ = write!(
            self.xml,
            r#"<w:p><w:pPr><w:spacing w:before="0" w:after="{after}"/>"#
        );
        if centered {
            self.xml.push_str(r#"<w:jc w:val="center"/>"#);
        }
        self.xml.push_str("</w:pPr>");
        for span in spans {
            self.run(span, size_pt);
        }
        self.xml.push_str("</w:p>");
    }

    /// Header lines were wrapped with the same metrics the word processor
    /// uses, so each becomes its own paragraph.
    fn header(&mut self, lines: &[HeaderLine]) {
        if lines.is_empty() {
            return;
        }
        for line in lines {
            let after = if line.centered { 120 } else { 0 };
            self.paragraph(&line.line.spans, line.font_size, line.centered, after);
        }
        let gap = self.measure.header_style().gap_after.round() as u32;
        let _ = write!(
            self.xml,
            r#"<w:p><w:pPr><w:spacing w:before="0" w:after="{gap}"/></w:pPr></w:p>"#
        );
    }

    fn drawing(&mut self, cell: &Cell) {
        let cx = (cell.image.width * EMU_PER_TWIP).round() as u64;
        let cy = (cell.image.height * EMU_PER_TWIP).round() as u64;
        let n = cell.number;
        let _ = write!(
            self.xml,
            concat!(
                r#"<w:r><w:drawing><wp:inline distT="0" distB="0" distL="0" distR="0">"#,
                r#"<wp:extent cx="{cx}" cy="{cy}"/><wp:docPr id="{n}" name="Figura {n}"/>"#,
                r#"<wp:cNvGraphicFramePr><a:graphicFrameLocks noChangeAspect="1"/></wp:cNvGraphicFramePr>"#,
                r#"<a:graphic><a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/picture">"#,
                r#"<pic:pic><pic:nvPicPr><pic:cNvPr id="{n}" name="{name}"/><pic:cNvPicPr/></pic:nvPicPr>"#,
                r#"<pic:blipFill><a:blip r:embed="{rid}"/><a:stretch><a:fillRect/></a:stretch></pic:blipFill>"#,
                r#"<pic:spPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="{cx}" cy="{cy}"/></a:xfrm>"#,
                r#"<a:prstGeom prst="rect"><a:avLst/></a:prstGeom></pic:spPr></pic:pic>"#,
                r#"</a:graphicData></a:graphic></wp:inline></w:drawing></w:r>"#,
            ),
            cx = cx,
            cy = cy,
            n = n,
            name = media_name(n),
            rid = relationship_id(n),
        );
    }

    /// Centered image paragraph kept on the same page as its caption.
    fn image_paragraph(&mut self, cell: &Cell) {
        self.xml.push_str(
            r#"<w:p><w:pPr><w:keepNext/><w:spacing w:before="0" w:after="60"/><w:jc w:val="center"/></w:pPr>"#,
        );
        self.drawing(cell);
        self.xml.push_str("</w:p>");
    }

    /// The caption as one paragraph; the word processor wraps it.
    fn caption_paragraph(&mut self, cell: &Cell, after: u32) -> Result<(), RenderError> {
        let figure = planned_figure(self.figures, cell.figure)?;
        let spans = caption::caption_spans(cell.number, &figure.description);
        self.paragraph(&spans, cell.caption.font_size, true, after);
        Ok(())
    }

    fn table(&mut self, plan: &ReportPlan) -> Result<(), RenderError> {
        let layout = plan.layout;
        let count = layout.columns.count() as u32;
        let width = self.measure.page().content_width().round() as u32;
        let col_w = width / count;
        let bordered = layout.style.is_bordered();

        self.xml.push_str("<w:tbl><w:tblPr>");
        let _ = write!(self.xml, r#"<w:tblW w:w="{width}" w:type="dxa"/>"#);
        self.xml
            .push_str(r#"<w:jc w:val="center"/><w:tblLayout w:type="fixed"/><w:tblBorders>"#);
        for edge in ["top", "left", "bottom", "right", "insideH", "insideV"] {
            if bordered {
                let _ = write!(
                    self.xml,
                    r#"<w:{edge} w:val="single" w:sz="6" w:space="0" w:color="8C8C8C"/>"#
                );
            } else {
                let _ = write!(self.xml, r#"<w:{edge} w:val="nil"/>"#);
            }
        }
        self.xml.push_str(concat!(
            r#"</w:tblBorders><w:tblCellMar><w:top w:w="80" w:type="dxa"/><w:left w:w="80" w:type="dxa"/>"#,
            r#"<w:bottom w:w="80" w:type="dxa"/><w:right w:w="80" w:type="dxa"/></w:tblCellMar></w:tblPr><w:tblGrid>"#,
        ));
        for _ in 0..count {
            let _ = write!(self.xml, r#"<w:gridCol w:w="{col_w}"/>"#);
        }
        self.xml.push_str("</w:tblGrid>");

        let v_align = if bordered { "center" } else { "top" };
        for row in plan.rows() {
            let _ = write!(
                self.xml,
                r#"<w:tr><w:trPr><w:cantSplit/><w:trHeight w:val="{}" w:hRule="atLeast"/></w:trPr>"#,
                row.height.round() as u32
            );
            for cell in &row.cells {
                let _ = write!(
                    self.xml,
                    r#"<w:tc><w:tcPr><w:tcW w:w="{col_w}" w:type="dxa"/><w:vAlign w:val="{v_align}"/></w:tcPr>"#
                );
                match cell {
                    Some(cell) => {
                        self.image_paragraph(cell);
                        self.caption_paragraph(cell, 0)?;
                    }
                    // Every table cell needs a paragraph.
                    None => self.xml.push_str("<w:p/>"),
                }
                self.xml.push_str("</w:tc>");
            }
            self.xml.push_str("</w:tr>");
        }
        self.xml.push_str("</w:tbl>");
        Ok(())
    }

    fn section(&mut self) {
        let _ = write!(
            self.xml,
            r#"<w:sectPr><w:pgSz w:w="{PAGE_WIDTH}" w:h="{PAGE_HEIGHT}"/><w:pgMar w:top="{MARGIN}" w:right="{MARGIN}" w:bottom="{MARGIN}" w:left="{MARGIN}" w:header="708" w:footer="708" w:gutter="0"/></w:sectPr>"#
        );
    }
}
