//! Fixed-page assembler.
//!
//! Produces an A4 PDF with the standard Helvetica faces (no embedded fonts)
//! and every photo embedded once as a JPEG (`DCTDecode`) image XObject. Page
//! breaks come straight from the plan: one PDF page per [`PageFrame`].
//!
//! Layout coordinates run top-down in points; PDF user space runs bottom-up,
//! so every y is flipped against the page height on output.

use super::{Assembler, RenderError, planned_figure};
use crate::caption::HeaderLine;
use crate::layout::{
    Cell, Figure, HeaderStyle, Measure, PageFrame, PageGeometry, Pagination, Rect, ReportPlan,
};
use crate::text::{self, Emphasis, TextLine};
use crate::types::{BorderShape, CellStyle, Columns};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};
use std::io::Write;
use tracing::debug;

const MM: f64 = 72.0 / 25.4;

fn mm(value: f64) -> f64 {
    value * MM
}

/// A4 portrait, whole points.
const PAGE_WIDTH: i64 = 595;
const PAGE_HEIGHT: i64 = 842;

/// Share of the line height above the baseline.
const ASCENT: f64 = 0.78;

/// Measurement provider in PDF points.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfMeasure;

impl Measure for PdfMeasure {
    fn pagination(&self) -> Pagination {
        Pagination::Explicit
    }

    fn page(&self) -> PageGeometry {
        PageGeometry {
            width: PAGE_WIDTH as f64,
            height: PAGE_HEIGHT as f64,
            margin_top: mm(15.0),
            margin_bottom: mm(15.0),
            margin_left: mm(15.0),
            margin_right: mm(15.0),
        }
    }

    fn cell_box(&self, columns: Columns) -> (u32, u32) {
        let (w, h) = match columns {
            Columns::One => (175.0, 150.0),
            Columns::Two => (85.0, 70.0),
            Columns::Three => (56.0, 48.0),
        };
        (mm(w).round() as u32, mm(h).round() as u32)
    }

    fn caption_font_size(&self, columns: Columns) -> f64 {
        match columns {
            Columns::One => 11.0,
            Columns::Two => 10.0,
            Columns::Three => 9.0,
        }
    }

    fn caption_line_height(&self, columns: Columns) -> f64 {
        match columns {
            Columns::One => mm(5.0),
            Columns::Two => mm(4.5),
            Columns::Three => mm(4.0),
        }
    }

    fn row_padding(&self, style: CellStyle) -> f64 {
        match style {
            CellStyle::Plain => mm(6.0),
            CellStyle::Bordered => mm(10.0),
        }
    }

    fn header_style(&self) -> HeaderStyle {
        HeaderStyle {
            title_size: 16.0,
            title_line_height: mm(9.0),
            body_size: 11.0,
            body_line_height: mm(5.5),
            gap_after: mm(6.0),
        }
    }

    fn text_width(&self, text: &str, emphasis: Emphasis, size: f64) -> f64 {
        text::string_width(text, emphasis) * size / 1000.0
    }
}

fn font_name(emphasis: Emphasis) -> &'static str {
    match emphasis {
        Emphasis::Regular => "F1",
        Emphasis::Strong => "F2",
        Emphasis::Italic => "F3",
    }
}

fn xobject_name(number: usize) -> String {
    format!("Im{number}")
}

/// PDF literal string body: WinAnsi bytes with `\`, `(` and `)` escaped.
fn literal(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len() + 2);
    for b in text::win_ansi(text) {
        if matches!(b, b'\\' | b'(' | b')') {
            out.push(b'\\');
        }
        out.push(b);
    }
    out
}

pub struct PdfAssembler {
    border_shape: BorderShape,
    measure: PdfMeasure,
}

impl PdfAssembler {
    pub fn new(border_shape: BorderShape) -> Self {
        Self {
            border_shape,
            measure: PdfMeasure,
        }
    }
}

impl Assembler for PdfAssembler {
    fn measure(&self) -> &dyn Measure {
        &self.measure
    }

    fn assemble(&self, plan: &ReportPlan, figures: &[Figure]) -> Result<Vec<u8>, RenderError> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let mut fonts = Dictionary::new();
        for (name, base) in [
            ("F1", "Helvetica"),
            ("F2", "Helvetica-Bold"),
            ("F3", "Helvetica-Oblique"),
        ] {
            let font_id = doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => base,
                "Encoding" => "WinAnsiEncoding",
            });
            fonts.set(name, font_id);
        }

        let mut xobjects = Dictionary::new();
        for cell in plan.rows().flat_map(|r| r.figures()) {
            let figure = planned_figure(figures, cell.figure)?;
            xobjects.set(xobject_name(cell.number), embed_jpeg(&mut doc, figure)?);
        }

        let resources_id = doc.add_object(dictionary! {
            "Font" => fonts,
            "XObject" => xobjects,
        });

        let page_geometry = self.measure.page();
        let mut kids: Vec<Object> = Vec::with_capacity(plan.pages.len());
        for (index, frame) in plan.pages.iter().enumerate() {
            let mut painter = Painter::new(page_geometry, plan.layout.style, self.border_shape);
            if !frame.header.is_empty() {
                painter.header(&plan.header.lines[frame.header.clone()])?;
            }
            painter.body(frame)?;

            let content_id = doc.add_object(Stream::new(dictionary! {}, painter.finish()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
            });
            kids.push(page_id.into());
            debug!(page = index + 1, rows = frame.rows.len(), "pdf page written");
        }

        let page_count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => page_count,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        let info_id = doc.add_object(dictionary! {
            "Producer" => Object::string_literal("photo-report"),
        });
        doc.trailer.set("Root", catalog_id);
        doc.trailer.set("Info", info_id);
        doc.compress();

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes)?;
        Ok(bytes)
    }
}

/// Add the figure's JPEG as an image XObject. The bytes are already
/// DCT-encoded, so the stream is stored as is.
fn embed_jpeg(doc: &mut Document, figure: &Figure) -> Result<ObjectId, RenderError> {
    let image = &figure.image;
    if image.bytes.is_empty() || image.width == 0 || image.height == 0 {
        return Err(RenderError::Image(format!(
            "figure {} ({}) has no image data",
            figure.number, figure.id
        )));
    }
    let stream = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => image.width as i64,
            "Height" => image.height as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "Filter" => "DCTDecode",
        },
        image.bytes.clone(),
    )
    .with_compression(false);
    Ok(doc.add_object(stream))
}

/// Writes the content stream of one page.
struct Painter {
    page: PageGeometry,
    style: CellStyle,
    border_shape: BorderShape,
    out: Vec<u8>,
}

impl Painter {
    fn new(page: PageGeometry, style: CellStyle, border_shape: BorderShape) -> Self {
        Self {
            page,
            style,
            border_shape,
            out: Vec::new(),
        }
    }

    fn finish(self) -> Vec<u8> {
        self.out
    }

    fn flip(&self, y: f64) -> f64 {
        self.page.height - y
    }

    fn header(&mut self, lines: &[HeaderLine]) -> std::io::Result<()> {
        let mut top = self.page.margin_top;
        for line in lines {
            let x = if line.centered {
                self.page.margin_left + (self.page.content_width() - line.line.width) / 2.0
            } else {
                self.page.margin_left
            };
            let baseline = top + line.line_height * ASCENT;
            self.text_line(&line.line, line.font_size, x, baseline)?;
            top += line.line_height;
        }
        Ok(())
    }

    fn body(&mut self, frame: &PageFrame) -> std::io::Result<()> {
        for row in &frame.rows {
            for cell in row.figures() {
                self.cell(cell)?;
            }
        }
        Ok(())
    }

    fn cell(&mut self, cell: &Cell) -> std::io::Result<()> {
        if self.style.is_bordered() {
            self.border(&cell.frame)?;
        }
        self.image(cell)?;

        let caption = &cell.caption;
        for (i, line) in caption.lines.iter().enumerate() {
            let x = cell.frame.center_x() - line.width / 2.0;
            let baseline =
                cell.caption_top + i as f64 * caption.line_height + caption.line_height * ASCENT;
            self.text_line(line, caption.font_size, x, baseline)?;
        }
        Ok(())
    }

    fn image(&mut self, cell: &Cell) -> std::io::Result<()> {
        let r = &cell.image;
        writeln!(
            self.out,
            "q {:.2} 0 0 {:.2} {:.2} {:.2} cm /{} Do Q",
            r.width,
            r.height,
            r.x,
            self.flip(r.bottom()),
            xobject_name(cell.number)
        )
    }

    fn border(&mut self, frame: &Rect) -> std::io::Result<()> {
        let (x, y, w, h) = (frame.x, self.flip(frame.bottom()), frame.width, frame.height);
        writeln!(self.out, "q 0.6 w 0.55 G")?;
        match self.border_shape {
            BorderShape::Square => {
                writeln!(self.out, "{x:.2} {y:.2} {w:.2} {h:.2} re S")?;
            }
            BorderShape::Rounded => {
                let r = mm(3.0).min(w / 2.0).min(h / 2.0);
                // Bezier control offset for a quarter circle.
                let k = r * 0.5523;
                let (x1, y1) = (x + w, y + h);
                writeln!(self.out, "{:.2} {y:.2} m", x + r)?;
                writeln!(self.out, "{:.2} {y:.2} l", x1 - r)?;
                writeln!(
                    self.out,
                    "{:.2} {y:.2} {x1:.2} {:.2} {x1:.2} {:.2} c",
                    x1 - r + k,
                    y + r - k,
                    y + r
                )?;
                writeln!(self.out, "{x1:.2} {:.2} l", y1 - r)?;
                writeln!(
                    self.out,
                    "{x1:.2} {:.2} {:.2} {y1:.2} {:.2} {y1:.2} c",
                    y1 - r + k,
                    x1 - r + k,
                    x1 - r
                )?;
                writeln!(self.out, "{:.2} {y1:.2} l", x + r)?;
                writeln!(
                    self.out,
                    "{:.2} {y1:.2} {x:.2} {:.2} {x:.2} {:.2} c",
                    x + r - k,
                    y1 - r + k,
                    y1 - r
                )?;
                writeln!(self.out, "{x:.2} {:.2} l", y + r)?;
                writeln!(
                    self.out,
                    "{x:.2} {:.2} {:.2} {y:.2} {:.2} {y:.2} c",
                    y + r - k,
                    x + r - k,
                    x + r
                )?;
                writeln!(self.out, "h S")?;
            }
        }
        writeln!(self.out, "Q")
    }

    /// One line of styled spans; each `Tj` advances the pen, so spans follow
    /// each other without explicit positioning.
    fn text_line(&mut self, line: &TextLine, size: f64, x: f64, baseline: f64) -> std::io::Result<()> {
        write!(self.out, "BT {x:.2} {:.2} Td", self.flip(baseline))?;
        for span in &line.spans {
            write!(self.out, " /{} {size:.1} Tf (", font_name(span.emphasis))?;
            self.out.extend_from_slice(&literal(&span.text));
            write!(self.out, ") Tj")?;
        }
        writeln!(self.out, " ET")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::plan_report;
    use crate::test_helpers::{jpeg_figures, sample_metadata};
    use crate::types::{LayoutConfig, ReportMetadata};

    fn layout(columns: Columns, style: CellStyle) -> LayoutConfig {
        LayoutConfig { columns, style }
    }

    fn render(figures: &[Figure], layout: LayoutConfig, shape: BorderShape) -> (ReportPlan, Vec<u8>) {
        let assembler = PdfAssembler::new(shape);
        let plan = plan_report(
            &sample_metadata(),
            "RELATÓRIO FOTOGRÁFICO",
            figures,
            layout,
            assembler.measure(),
        );
        let bytes = assembler.assemble(&plan, figures).unwrap();
        (plan, bytes)
    }

    fn page_text(doc: &Document, page: u32) -> String {
        let pages = doc.get_pages();
        let content = doc.get_page_content(pages[&page]).unwrap();
        String::from_utf8_lossy(&content).into_owned()
    }

    #[test]
    fn literal_escapes_delimiters() {
        assert_eq!(literal("a(b)c\\"), b"a\\(b\\)c\\\\".to_vec());
        assert_eq!(literal("ç"), vec![0xE7]);
    }

    #[test]
    fn boxes_shrink_with_more_columns() {
        let m = PdfMeasure;
        let one = m.cell_box(Columns::One);
        let two = m.cell_box(Columns::Two);
        let three = m.cell_box(Columns::Three);
        assert!(one.0 > two.0 && two.0 > three.0);
        assert!(one.1 > two.1 && two.1 > three.1);
        assert!(one.0 as f64 <= m.page().content_width());
    }

    #[test]
    fn text_width_scales_with_size() {
        let m = PdfMeasure;
        let w10 = m.text_width("Figura 1", Emphasis::Strong, 10.0);
        let w20 = m.text_width("Figura 1", Emphasis::Strong, 20.0);
        assert!((w20 - 2.0 * w10).abs() < 1e-9);
    }

    #[test]
    fn page_count_matches_plan() {
        let figures = jpeg_figures(&[(64, 48); 9]);
        let (plan, bytes) = render(&figures, layout(Columns::Two, CellStyle::Bordered), BorderShape::Rounded);
        assert!(bytes.starts_with(b"%PDF-1.5"));

        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), plan.pages.len());
        assert!(plan.pages.len() > 1);
    }

    #[test]
    fn every_figure_is_drawn_once() {
        let figures = jpeg_figures(&[(64, 48), (48, 64), (80, 20)]);
        let (_, bytes) = render(&figures, layout(Columns::Three, CellStyle::Plain), BorderShape::Square);
        let doc = Document::load_mem(&bytes).unwrap();
        let text = page_text(&doc, 1);
        for n in 1..=3 {
            assert_eq!(text.matches(&format!("/Im{n} Do")).count(), 1);
        }
    }

    #[test]
    fn first_page_carries_header() {
        let figures = jpeg_figures(&[(64, 48); 9]);
        let (_, bytes) = render(&figures, layout(Columns::Two, CellStyle::Plain), BorderShape::Rounded);
        let doc = Document::load_mem(&bytes).unwrap();
        assert!(page_text(&doc, 1).contains("(Institui"));
        assert!(!page_text(&doc, 2).contains("(Institui"));
    }

    /// Vertical positions of every `Td` on a page, in PDF coordinates.
    fn text_positions(text: &str) -> Vec<f64> {
        text.lines()
            .filter_map(|l| l.strip_prefix("BT "))
            .filter_map(|l| l.split_whitespace().nth(1)?.parse().ok())
            .collect()
    }

    #[test]
    fn long_header_continues_on_next_page_inside_margins() {
        let assembler = PdfAssembler::new(BorderShape::Square);
        let metadata = ReportMetadata {
            comments: "palavra ".repeat(3000),
            ..sample_metadata()
        };
        let figures = jpeg_figures(&[(64, 48); 2]);
        let plan = plan_report(
            &metadata,
            "RELATÓRIO FOTOGRÁFICO",
            &figures,
            layout(Columns::Two, CellStyle::Plain),
            assembler.measure(),
        );
        let bytes = assembler.assemble(&plan, &figures).unwrap();
        let doc = Document::load_mem(&bytes).unwrap();

        assert!(plan.pages.len() >= 2);
        assert_eq!(doc.get_pages().len(), plan.pages.len());
        assert!(page_text(&doc, 2).contains("(palavra"));
        let bottom = mm(15.0);
        for page in 1..=plan.pages.len() as u32 {
            for y in text_positions(&page_text(&doc, page)) {
                assert!(y >= bottom, "page {page}: text at y {y} is below the bottom margin");
            }
        }
        let drawn: usize = (1..=plan.pages.len() as u32)
            .map(|p| page_text(&doc, p).matches(" Do").count())
            .sum();
        assert_eq!(drawn, 2);
    }

    #[test]
    fn bordered_style_strokes_cells() {
        let figures = jpeg_figures(&[(64, 48)]);
        let (_, square) = render(&figures, layout(Columns::Two, CellStyle::Bordered), BorderShape::Square);
        let (_, rounded) = render(&figures, layout(Columns::Two, CellStyle::Bordered), BorderShape::Rounded);
        let (_, plain) = render(&figures, layout(Columns::Two, CellStyle::Plain), BorderShape::Square);

        let square = page_text(&Document::load_mem(&square).unwrap(), 1);
        let rounded = page_text(&Document::load_mem(&rounded).unwrap(), 1);
        let plain = page_text(&Document::load_mem(&plain).unwrap(), 1);
        assert!(square.contains(" re S"));
        assert!(rounded.contains(" c\n") && rounded.contains("h S"));
        assert!(!plain.contains(" re S") && !plain.contains("h S"));
    }

    #[test]
    fn captions_use_bold_label_and_italic_description() {
        let mut figures = jpeg_figures(&[(64, 48)]);
        figures[0].description = "porta".into();
        let (_, bytes) = render(&figures, layout(Columns::Two, CellStyle::Plain), BorderShape::Square);
        let text = page_text(&Document::load_mem(&bytes).unwrap(), 1);
        assert!(text.contains("/F2 10.0 Tf (Figura 1:) Tj /F3 10.0 Tf ( porta) Tj"));
    }

    #[test]
    fn images_are_embedded_as_jpeg_xobjects() {
        let figures = jpeg_figures(&[(64, 48)]);
        let (_, bytes) = render(&figures, layout(Columns::One, CellStyle::Plain), BorderShape::Square);
        let doc = Document::load_mem(&bytes).unwrap();
        let images: Vec<&Stream> = doc
            .objects
            .values()
            .filter_map(|o| o.as_stream().ok())
            .filter(|s| s.dict.get(b"Subtype").and_then(Object::as_name).ok() == Some(b"Image".as_slice()))
            .collect();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].dict.get(b"Width").and_then(Object::as_i64).unwrap(), 64);
        assert_eq!(images[0].content, figures[0].image.bytes);
    }

    #[test]
    fn missing_image_data_is_a_render_error() {
        let figures = crate::test_helpers::figures(&[(64, 48)]);
        let assembler = PdfAssembler::new(BorderShape::Square);
        let plan = plan_report(
            &sample_metadata(),
            "",
            &figures,
            layout(Columns::Two, CellStyle::Plain),
            assembler.measure(),
        );
        assert!(matches!(
            assembler.assemble(&plan, &figures),
            Err(RenderError::Image(_))
        ));
    }

    #[test]
    fn empty_report_is_a_single_page() {
        let (plan, bytes) = render(&[], layout(Columns::Two, CellStyle::Plain), BorderShape::Square);
        assert_eq!(plan.pages.len(), 1);
        assert_eq!(Document::load_mem(&bytes).unwrap().get_pages().len(), 1);
    }
}
