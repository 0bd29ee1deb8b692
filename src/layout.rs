//! Shared layout engine.
//!
//! Figures are grouped into rows of `C` consecutive figures, every row is
//! measured, and rows are stacked onto pages. One algorithm serves every
//! output format: the format-specific parts (units, page geometry, cell box
//! sizes, font metrics) come from a [`Measure`] provider.
//!
//! ## Row geometry
//!
//! ```text
//!  row.y ─┬──────────────────────────────────┐
//!         │ padding / 2                      │
//!         │ ┌──────── frame ───────┐         │
//!         │ │   image, centered    │         │  frame height: fixed box height,
//!         │ └──────────────────────┘         │  or the image height with one column
//!         │ caption lines (tallest in row)   │
//!         │ padding / 2                      │
//!         └──────────────────────────────────┘
//! ```
//!
//! All coordinates are measured from the top-left corner of the page, in the
//! provider's units.
//!
//! ## Pagination
//!
//! With [`Pagination::Explicit`] a row that would cross the bottom margin
//! starts a new page; rows are never split. Header lines break the same way,
//! so a long comments field continues on the next page before the first row. A row taller than an empty page is
//! placed alone on a fresh page and flagged as overflowing. With
//! [`Pagination::Implicit`] every row lands on one frame and the consuming
//! format paginates on its own.

use crate::caption::{self, CaptionBlock, HeaderBlock};
use crate::imaging::{NormalizedImage, fit_within};
use crate::text::Emphasis;
use crate::types::{CellStyle, Columns, LayoutConfig, ReportMetadata};
use std::ops::Range;
use tracing::{debug, warn};

/// Page size and margins, in provider units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub width: f64,
    pub height: f64,
    pub margin_top: f64,
    pub margin_bottom: f64,
    pub margin_left: f64,
    pub margin_right: f64,
}

impl PageGeometry {
    pub fn content_width(&self) -> f64 {
        self.width - self.margin_left - self.margin_right
    }

    pub fn content_height(&self) -> f64 {
        self.height - self.margin_top - self.margin_bottom
    }

    /// Lowest y a row may reach.
    pub fn content_bottom(&self) -> f64 {
        self.height - self.margin_bottom
    }
}

/// Font sizes (points) and line heights (provider units) of the header.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeaderStyle {
    pub title_size: f64,
    pub title_line_height: f64,
    pub body_size: f64,
    pub body_line_height: f64,
    pub gap_after: f64,
}

/// How page breaks are decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pagination {
    /// The engine breaks pages.
    Explicit,
    /// The document format breaks pages when it is displayed.
    Implicit,
}

/// Measurement provider for one output format.
pub trait Measure {
    fn pagination(&self) -> Pagination;

    fn page(&self) -> PageGeometry;

    /// Image bounding box for the column count, as `(width, height)`.
    ///
    /// With one column the height is the tallest an image may be; rows
    /// take the height of their image instead of the box.
    fn cell_box(&self, columns: Columns) -> (u32, u32);

    fn caption_font_size(&self, columns: Columns) -> f64;

    fn caption_line_height(&self, columns: Columns) -> f64;

    /// Vertical space a row adds around its frame and captions.
    fn row_padding(&self, style: CellStyle) -> f64;

    fn header_style(&self) -> HeaderStyle;

    /// Width of `text` set in `emphasis` at `size` points.
    fn text_width(&self, text: &str, emphasis: Emphasis, size: f64) -> f64;
}

/// A photo that survived normalization, with its original figure number.
#[derive(Debug, Clone)]
pub struct Figure {
    pub number: usize,
    pub id: String,
    pub description: String,
    pub image: NormalizedImage,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn center_x(&self) -> f64 {
        self.x + self.width / 2.0
    }
}

/// One populated cell of a row.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    /// Index into the figure slice the plan was built from.
    pub figure: usize,
    pub number: usize,
    /// Column slot the cell occupies; captions are centered on it.
    pub slot: Rect,
    /// Bounding box the image is centered in; borders are drawn on it.
    pub frame: Rect,
    pub image: Rect,
    pub caption: CaptionBlock,
    /// Top of the first caption line.
    pub caption_top: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// Always `C` entries; trailing cells of a short final row are `None`.
    pub cells: Vec<Option<Cell>>,
    pub y: f64,
    pub height: f64,
    pub frame_height: f64,
    /// Tallest caption of the row.
    pub caption_height: f64,
    /// The row is taller than an empty page and runs past the bottom margin.
    pub overflows: bool,
}

impl Row {
    pub fn figures(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter().flatten()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageFrame {
    /// Header lines drawn on this page, as indices into [`HeaderBlock::lines`].
    pub header: Range<usize>,
    pub rows: Vec<Row>,
}

impl PageFrame {
    pub fn figure_numbers(&self) -> Vec<usize> {
        self.rows
            .iter()
            .flat_map(|r| r.figures().map(|c| c.number))
            .collect()
    }
}

/// Complete placement of a report in one format.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportPlan {
    pub layout: LayoutConfig,
    pub header: HeaderBlock,
    pub pages: Vec<PageFrame>,
}

impl ReportPlan {
    pub fn rows(&self) -> impl Iterator<Item = &Row> {
        self.pages.iter().flat_map(|p| p.rows.iter())
    }

    pub fn figure_count(&self) -> usize {
        self.rows().map(|r| r.figures().count()).sum()
    }
}

// ============================================================================
// Row measurement
// ============================================================================

/// Measure one group of up to `C` figures. The row is placed at `y = 0`;
/// [`Row::translate`] moves it to its final position.
fn measure_row(
    group: &[(usize, &Figure)],
    layout: LayoutConfig,
    measure: &dyn Measure,
) -> Row {
    let columns = layout.columns;
    let count = columns.count();
    let page = measure.page();
    let (box_w, box_h) = measure.cell_box(columns);
    let slot_w = page.content_width() / count as f64;
    let inset = measure.row_padding(layout.style) / 2.0;

    let mut cells: Vec<Option<Cell>> = group
        .iter()
        .enumerate()
        .map(|(i, &(index, figure))| {
            let (img_w, img_h) = fit_within(figure.image.width, figure.image.height, box_w, box_h);
            let frame_h = if columns == Columns::One { img_h } else { box_h };
            let slot = Rect {
                x: page.margin_left + i as f64 * slot_w,
                y: 0.0,
                width: slot_w,
                height: 0.0,
            };
            let frame = Rect {
                x: slot.x + (slot_w - box_w as f64) / 2.0,
                y: inset,
                width: box_w as f64,
                height: frame_h as f64,
            };
            let image = Rect {
                x: frame.x + (frame.width - img_w as f64) / 2.0,
                y: frame.y + (frame.height - img_h as f64) / 2.0,
                width: img_w as f64,
                height: img_h as f64,
            };
            let caption = caption::compose_caption(
                figure.number,
                &figure.description,
                frame.width,
                columns,
                measure,
            );
            Some(Cell {
                figure: index,
                number: figure.number,
                slot,
                frame,
                image,
                caption_top: frame.bottom(),
                caption,
            })
        })
        .collect();
    cells.resize(count, None);

    let frame_height = cells
        .iter()
        .flatten()
        .map(|c| c.frame.height)
        .fold(0.0, f64::max);
    let caption_height = cells
        .iter()
        .flatten()
        .map(|c| c.caption.height)
        .fold(0.0, f64::max);

    let height = frame_height + caption_height + 2.0 * inset;
    for cell in cells.iter_mut().flatten() {
        cell.slot.height = height;
    }

    Row {
        cells,
        y: 0.0,
        height,
        frame_height,
        caption_height,
        overflows: false,
    }
}

impl Row {
    fn translate(&mut self, dy: f64) {
        self.y += dy;
        for cell in self.cells.iter_mut().flatten() {
            cell.slot.y += dy;
            cell.frame.y += dy;
            cell.image.y += dy;
            cell.caption_top += dy;
        }
    }
}

// ============================================================================
// Pagination
// ============================================================================

/// Page-filling state: rows accumulate on the current page until one would
/// cross the bottom margin.
struct Paginator {
    mode: Pagination,
    geometry: PageGeometry,
    pages: Vec<PageFrame>,
    current: PageFrame,
    cursor: f64,
}

impl Paginator {
    fn new(mode: Pagination, geometry: PageGeometry) -> Self {
        Self {
            mode,
            geometry,
            pages: Vec::new(),
            current: PageFrame {
                header: 0..0,
                rows: Vec::new(),
            },
            cursor: geometry.margin_top,
        }
    }

    fn breaks_before(&self, height: f64) -> bool {
        self.mode == Pagination::Explicit
            && self.cursor + height > self.geometry.content_bottom()
            && !self.page_is_blank()
    }

    /// Stack the header lines from the top of the first page, continuing on
    /// following pages when they run past the bottom margin.
    fn place_header(&mut self, header: &HeaderBlock) {
        if header.lines.is_empty() {
            return;
        }
        let mut lines_height = 0.0;
        for (i, line) in header.lines.iter().enumerate() {
            if self.breaks_before(line.line_height) {
                self.new_page();
                self.current.header = i..i;
                debug!(line = i, "header continues on next page");
            }
            self.cursor += line.line_height;
            self.current.header.end = i + 1;
            lines_height += line.line_height;
        }
        self.cursor += header.height - lines_height;
    }

    fn page_is_blank(&self) -> bool {
        self.current.rows.is_empty() && self.cursor <= self.geometry.margin_top
    }

    fn new_page(&mut self) {
        let done = std::mem::replace(
            &mut self.current,
            PageFrame {
                header: 0..0,
                rows: Vec::new(),
            },
        );
        self.pages.push(done);
        self.cursor = self.geometry.margin_top;
        debug!(page = self.pages.len() + 1, "page break");
    }

    fn place(&mut self, mut row: Row) {
        if self.breaks_before(row.height) {
            self.new_page();
        }
        row.overflows = self.mode == Pagination::Explicit
            && self.cursor + row.height > self.geometry.content_bottom();
        if row.overflows {
            let numbers: Vec<usize> = row.figures().map(|c| c.number).collect();
            warn!(
                figures = ?numbers,
                height = row.height,
                "row is taller than a page and runs past the bottom margin"
            );
        }
        row.translate(self.cursor);
        self.cursor += row.height;
        self.current.rows.push(row);
    }

    fn finish(mut self) -> Vec<PageFrame> {
        self.pages.push(self.current);
        self.pages
    }
}

/// Place `figures` onto pages.
///
/// Figures keep the numbers they carry, so gaps left by skipped photos stay
/// visible; rows group whatever figures are present, `C` at a time. The
/// header comes first and the rows follow it. The plan always has at least
/// one page.
pub fn plan_report(
    metadata: &ReportMetadata,
    title: &str,
    figures: &[Figure],
    layout: LayoutConfig,
    measure: &dyn Measure,
) -> ReportPlan {
    let header = caption::compose_header(metadata, title, measure);
    let mut paginator = Paginator::new(measure.pagination(), measure.page());
    paginator.place_header(&header);

    let indexed: Vec<(usize, &Figure)> = figures.iter().enumerate().collect();
    for group in indexed.chunks(layout.columns.count()) {
        paginator.place(measure_row(group, layout, measure));
    }

    let pages = paginator.finish();
    debug!(
        pages = pages.len(),
        figures = figures.len(),
        columns = layout.columns.count(),
        "layout planned"
    );
    ReportPlan {
        layout,
        header,
        pages,
    }
}
