//! # Grid Layout Engine
//!
//! This is the heart of gridform.
//!
//! A [`Table`] owns one rectangular region of a form: a fixed set of column
//! boundaries and a row boundary array that grows as cells are placed. Every
//! placement call computes absolute coordinates right away and appends the
//! resulting primitives to one of three buffers:
//!
//! - [`CellInfo`]: a bordered text cell, or one line of a wrapped cell
//! - [`RectInfo`]: a filled background or an outline
//! - [`TextGlyph`]: one character of a vertical title
//!
//! Each primitive carries the page it belongs to. Nothing is drawn until
//! [`Table::render`] walks the pages in order.
//!
//! ## Row boundaries
//!
//! Rows are materialized lazily. A placement that ends on a row index that
//! does not exist yet first inserts every missing boundary with zero height,
//! then sets the requested one. This lets cells be placed out of row order:
//! a multi-line cell can decide a row's height before or after the label
//! cell next to it, and both agree on a single boundary.
//!
//! `ys` holds the working origin of each boundary on the page currently being
//! written. `rows` records the position and page where each boundary was
//! committed. They have the same length and the same index meaning; they only
//! differ after a cell spilled onto a new page, where the working origin of
//! the spilled row moves to the top margin of that page.

pub mod page_break;

mod cell;
mod render;
mod title;

pub use cell::{AppendixSpec, CellSpec, MultiRowSpec, TitledCellSpec};
pub use render::{PageFailure, RenderReport};

use crate::error::{LayoutError, LayoutWarning};
use crate::sink::{Align, DrawingSink, RectStyle};

/// Top margin of a continuation page, and the bottom margin every page keeps
/// free, in user units.
pub const PAGE_MARGIN: f64 = 20.0;

/// Width of the title column drawn left of a table.
pub const TITLE_WIDTH: f64 = 5.0;

/// Line width of cell borders and wrapped-cell outlines.
pub const THIN_LINE: f64 = 0.1;

/// Line width of title outlines and the outer table border.
pub const THICK_LINE: f64 = 0.3;

/// Style defaults shared by every placement on a table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableStyle {
    pub font: String,
    /// Base font size in points.
    pub font_size: f64,
    /// Height given to a wrapped cell whose ending row does not exist yet.
    pub default_height: f64,
    /// Whether single cells get a border.
    pub border: bool,
    pub title_width: f64,
    pub margin: f64,
}

impl TableStyle {
    pub fn new(font: impl Into<String>, font_size: f64, default_height: f64) -> Self {
        TableStyle {
            font: font.into(),
            font_size,
            default_height,
            border: true,
            title_width: TITLE_WIDTH,
            margin: PAGE_MARGIN,
        }
    }

    pub fn with_border(mut self, border: bool) -> Self {
        self.border = border;
        self
    }

    pub fn with_title_width(mut self, title_width: f64) -> Self {
        self.title_width = title_width;
        self
    }

    pub fn with_margin(mut self, margin: f64) -> Self {
        self.margin = margin;
        self
    }
}

/// The region a table was asked to occupy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub x_i: f64,
    pub y_i: f64,
    pub x_f: f64,
    pub y_f: f64,
}

impl Bounds {
    pub fn new(x_i: f64, y_i: f64, x_f: f64, y_f: f64) -> Self {
        Bounds { x_i, y_i, x_f, y_f }
    }
}

/// The column and row boundary indices a primitive came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub col_i: usize,
    pub row_i: usize,
    pub col_f: usize,
    pub row_f: usize,
}

/// A committed text cell.
#[derive(Debug, Clone, PartialEq)]
pub struct CellInfo {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
    pub page: usize,
    pub border: bool,
    pub span: Span,
    pub text: String,
    pub align: Align,
    pub fill: bool,
    pub font_size: f64,
    pub link: Option<String>,
    pub line_width: f64,
}

/// A committed background or outline rectangle.
#[derive(Debug, Clone, PartialEq)]
pub struct RectInfo {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
    pub page: usize,
    pub style: RectStyle,
    pub line_width: f64,
}

/// A single positioned title character. `y` is the baseline.
#[derive(Debug, Clone, PartialEq)]
pub struct TextGlyph {
    pub x: f64,
    pub y: f64,
    pub text: String,
    pub size: f64,
    pub page: usize,
}

/// Where a row boundary was committed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Row {
    pub y: f64,
    pub page: usize,
}

impl Row {
    /// Document order: later pages come after, then larger y.
    pub fn precedes_or_equals(&self, other: &Row) -> bool {
        self.page < other.page || (self.page == other.page && self.y <= other.y)
    }
}

/// One rectangular table region and everything placed in it so far.
#[derive(Debug, Clone)]
pub struct Table {
    x_i: f64,
    y_i: f64,
    x_f: f64,
    xs: Vec<f64>,
    ys: Vec<f64>,
    rows: Vec<Row>,
    row_count: usize,
    style: TableStyle,
    cells: Vec<CellInfo>,
    rects: Vec<RectInfo>,
    texts: Vec<TextGlyph>,
    warnings: Vec<LayoutWarning>,
    initial_page: usize,
    page_num: usize,
}

impl Table {
    /// Create a grid of `columns` evenly spaced columns over `bounds`.
    ///
    /// `rows` is the number of rows the caller intends to use; boundaries are
    /// still only created by placement calls. If the top edge is already
    /// below the page, the table restarts at the page margin of the next page.
    pub fn new(
        sink: &dyn DrawingSink,
        bounds: Bounds,
        columns: usize,
        rows: usize,
        style: TableStyle,
    ) -> Self {
        let columns = columns.max(1);
        let col_width = (bounds.x_f - bounds.x_i) / columns as f64;
        let xs = (0..=columns)
            .map(|i| bounds.x_i + i as f64 * col_width)
            .collect();

        let mut warnings = Vec::new();
        let mut page = sink.page_no().max(1);
        let mut y_i = bounds.y_i;
        let (_, page_height) = sink.page_size();
        if y_i > page_height {
            tracing::warn!(y = y_i, page_height, "table top exceeds page height");
            warnings.push(LayoutWarning::StartBelowPage {
                y: y_i,
                page_height,
                restart_y: style.margin,
            });
            y_i = style.margin;
            page += 1;
        }

        tracing::debug!(page, columns, rows, "initialized table");
        Table {
            x_i: bounds.x_i,
            y_i,
            x_f: bounds.x_f,
            xs,
            ys: vec![y_i],
            rows: vec![Row { y: y_i, page }],
            row_count: rows,
            style,
            cells: Vec::new(),
            rects: Vec::new(),
            texts: Vec::new(),
            warnings,
            initial_page: page,
            page_num: page,
        }
    }

    /// A single-column, single-row table spanning `x_i..x_f` for a trailing
    /// free-text note. Its height is decided by [`Table::set_appendix`].
    pub fn appendix(sink: &dyn DrawingSink, x_i: f64, x_f: f64, y_i: f64, style: TableStyle) -> Self {
        let mut table = Table::new(sink, Bounds::new(x_i, y_i, x_f, y_i), 1, 1, style);
        table.materialize_rows(2);
        table
    }

    // ── Accessors ───────────────────────────────────────────────

    /// Column boundaries; `columns + 1` entries.
    pub fn xs(&self) -> &[f64] {
        &self.xs
    }

    /// Working row boundaries.
    pub fn ys(&self) -> &[f64] {
        &self.ys
    }

    /// Committed row boundaries with their pages.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn cells(&self) -> &[CellInfo] {
        &self.cells
    }

    pub fn rects(&self) -> &[RectInfo] {
        &self.rects
    }

    pub fn texts(&self) -> &[TextGlyph] {
        &self.texts
    }

    pub fn warnings(&self) -> &[LayoutWarning] {
        &self.warnings
    }

    pub fn style(&self) -> &TableStyle {
        &self.style
    }

    pub fn columns(&self) -> usize {
        self.xs.len() - 1
    }

    /// Rows the table was created for.
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Top-left corner, after any restart on a new page.
    pub fn origin(&self) -> (f64, f64) {
        (self.x_i, self.y_i)
    }

    pub fn initial_page(&self) -> usize {
        self.initial_page
    }

    /// The page placements are currently written to.
    pub fn current_page(&self) -> usize {
        self.page_num
    }

    /// Working y of the last row boundary.
    pub fn last_row_y(&self) -> f64 {
        self.ys.last().copied().unwrap_or(self.y_i)
    }

    /// Lowest edge of anything committed to `page`, or 0 when it is empty.
    pub fn bottom_line(&self, page: usize) -> f64 {
        let cells = self
            .cells
            .iter()
            .filter(|c| c.page == page)
            .map(|c| c.y + c.h);
        let rects = self
            .rects
            .iter()
            .filter(|r| r.page == page)
            .map(|r| r.y + r.h);
        cells.chain(rects).fold(0.0, f64::max)
    }

    /// Highest edge of anything committed to `page`.
    pub fn top_line(&self, page: usize) -> Option<f64> {
        let cells = self.cells.iter().filter(|c| c.page == page).map(|c| c.y);
        let rects = self.rects.iter().filter(|r| r.page == page).map(|r| r.y);
        cells.chain(rects).reduce(f64::min)
    }

    // ── Shared placement helpers ────────────────────────────────

    fn resolve_font_size(&self, requested: Option<f64>) -> f64 {
        match requested {
            Some(size) if size >= 0.0 => size,
            _ => self.style.font_size,
        }
    }

    fn check_columns(&self, col_i: usize, col_f: usize) -> Result<f64, LayoutError> {
        let columns = self.columns();
        if col_f > columns {
            return Err(LayoutError::ColumnOutOfRange { col: col_f, columns });
        }
        if col_i >= col_f {
            return Err(LayoutError::EmptySpan {
                start: col_i,
                end: col_f,
            });
        }
        Ok(self.xs[col_f] - self.xs[col_i])
    }

    /// The starting row must already exist and the span must be non-empty.
    fn check_row_start(&self, row_i: usize, row_f: usize) -> Result<(), LayoutError> {
        if row_i >= self.ys.len() {
            return Err(LayoutError::RowOutOfRange {
                row: row_i,
                materialized: self.ys.len() - 1,
            });
        }
        if row_f <= row_i {
            return Err(LayoutError::EmptySpan {
                start: row_i,
                end: row_f,
            });
        }
        Ok(())
    }

    /// Both ends of the span must already exist.
    fn check_row_range(&self, row_i: usize, row_f: usize) -> Result<(), LayoutError> {
        self.check_row_start(row_i, row_f)?;
        if row_f >= self.ys.len() {
            return Err(LayoutError::RowOutOfRange {
                row: row_f,
                materialized: self.ys.len() - 1,
            });
        }
        Ok(())
    }

    /// Append zero-height boundaries until `len` boundaries exist.
    fn materialize_rows(&mut self, len: usize) {
        while self.ys.len() < len {
            let y = self.last_row_y();
            self.push_row(y);
        }
    }

    fn push_row(&mut self, y: f64) {
        self.ys.push(y);
        self.rows.push(Row {
            y,
            page: self.page_num,
        });
    }

    /// Move boundary `index` to `y` on the current page. Later boundaries
    /// that would now sit above it are lifted along.
    fn set_row(&mut self, index: usize, y: f64) {
        let anchor = Row {
            y,
            page: self.page_num,
        };
        self.ys[index] = y;
        self.rows[index] = anchor;
        for j in index + 1..self.rows.len() {
            if !anchor.precedes_or_equals(&self.rows[j]) {
                self.ys[j] = y;
                self.rows[j] = anchor;
            }
        }
    }

    /// Background + outline pair for a wrapped cell or a title block.
    fn push_rect_pair(&mut self, x: f64, y: f64, w: f64, h: f64, page: usize, fill: bool, outline_width: f64) {
        if fill {
            self.rects.push(RectInfo {
                x,
                y,
                w,
                h,
                page,
                style: RectStyle::Filled,
                line_width: 0.0,
            });
        }
        self.rects.push(RectInfo {
            x,
            y,
            w,
            h,
            page,
            style: RectStyle::Outlined,
            line_width: outline_width,
        });
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::error::SinkError;
    use crate::sink::{CellDraw, DrawingSink, FontSize, RectStyle};

    /// Deterministic sink: every character is `char_width` units wide at any
    /// size, and one line is `line_height` units tall.
    pub struct GridSink {
        pub char_width: f64,
        pub line_height: f64,
        pub page_height: f64,
        pub pages: usize,
        pub size: f64,
        pub ops: Vec<String>,
        pub fail_on_page: Option<usize>,
    }

    impl GridSink {
        pub fn new(char_width: f64, line_height: f64) -> Self {
            GridSink {
                char_width,
                line_height,
                page_height: 297.0,
                pages: 1,
                size: 6.0,
                ops: Vec::new(),
                fail_on_page: None,
            }
        }

        fn check(&self) -> Result<(), SinkError> {
            if self.fail_on_page == Some(self.pages) {
                Err(SinkError::Encoding("boom".to_string()))
            } else {
                Ok(())
            }
        }
    }

    impl DrawingSink for GridSink {
        fn string_width(&self, text: &str) -> f64 {
            text.chars().count() as f64 * self.char_width
        }
        fn set_font(&mut self, _family: &str, size_pt: f64) {
            self.size = size_pt;
        }
        fn set_font_size(&mut self, size_pt: f64) {
            self.size = size_pt;
        }
        fn font_size(&self) -> FontSize {
            FontSize {
                pt: self.size,
                unit: self.line_height,
            }
        }
        fn page_size(&self) -> (f64, f64) {
            (210.0, self.page_height)
        }
        fn page_no(&self) -> usize {
            self.pages
        }
        fn add_page(&mut self) {
            self.pages += 1;
            self.ops.push(format!("page {}", self.pages));
        }
        fn set_line_width(&mut self, _width: f64) {}
        fn set_fill_color(&mut self, _r: u8, _g: u8, _b: u8) {}
        fn rect(&mut self, _x: f64, y: f64, _w: f64, h: f64, style: RectStyle) -> Result<(), SinkError> {
            self.check()?;
            let tag = match style {
                RectStyle::Filled => "fill",
                RectStyle::Outlined => "outline",
            };
            self.ops.push(format!("{} {:.1} {:.1}", tag, y, h));
            Ok(())
        }
        fn cell(&mut self, cell: &CellDraw<'_>) -> Result<(), SinkError> {
            self.check()?;
            self.ops.push(format!("cell {}", cell.text));
            Ok(())
        }
        fn text(&mut self, _x: f64, _y: f64, text: &str) -> Result<(), SinkError> {
            self.check()?;
            self.ops.push(format!("glyph {}", text));
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::GridSink;
    use super::*;

    #[test]
    fn column_boundaries_are_even() {
        let sink = GridSink::new(1.0, 2.0);
        let table = Table::new(&sink, Bounds::new(30.0, 20.0, 120.0, 24.0), 9, 8, TableStyle::new("IPA", 6.0, 4.5));
        assert_eq!(table.xs().len(), 10);
        for (i, x) in table.xs().iter().enumerate() {
            assert!((x - (30.0 + i as f64 * 10.0)).abs() < 1e-9);
        }
        assert!(table.xs().windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn starts_with_one_row_boundary() {
        let sink = GridSink::new(1.0, 2.0);
        let table = Table::new(&sink, Bounds::new(0.0, 40.0, 100.0, 44.0), 2, 1, TableStyle::new("IPA", 6.0, 4.5));
        assert_eq!(table.ys(), &[40.0]);
        assert_eq!(table.rows(), &[Row { y: 40.0, page: 1 }]);
        assert!(table.warnings().is_empty());
    }

    #[test]
    fn top_below_page_restarts_on_next_page() {
        let sink = GridSink::new(1.0, 2.0);
        let table = Table::new(&sink, Bounds::new(0.0, 300.0, 100.0, 304.0), 2, 1, TableStyle::new("IPA", 6.0, 4.5));
        assert_eq!(table.ys(), &[PAGE_MARGIN]);
        assert_eq!(table.initial_page(), 2);
        assert!(matches!(
            table.warnings(),
            [LayoutWarning::StartBelowPage { restart_y, .. }] if *restart_y == PAGE_MARGIN
        ));
    }

    #[test]
    fn appendix_has_two_boundaries() {
        let sink = GridSink::new(1.0, 2.0);
        let table = Table::appendix(&sink, 30.0, 180.0, 250.0, TableStyle::new("IPA", 6.0, 4.5));
        assert_eq!(table.xs(), &[30.0, 180.0]);
        assert_eq!(table.ys(), &[250.0, 250.0]);
        assert_eq!(table.rows().len(), 2);
    }

    #[test]
    fn bottom_and_top_lines_ignore_other_pages() {
        let sink = GridSink::new(1.0, 2.0);
        let mut table = Table::new(&sink, Bounds::new(0.0, 40.0, 100.0, 44.0), 2, 1, TableStyle::new("IPA", 6.0, 4.5));
        table.push_rect_pair(0.0, 50.0, 10.0, 5.0, 1, false, THIN_LINE);
        table.push_rect_pair(0.0, 20.0, 10.0, 90.0, 2, true, THIN_LINE);
        assert_eq!(table.bottom_line(1), 55.0);
        assert_eq!(table.top_line(1), Some(50.0));
        assert_eq!(table.bottom_line(3), 0.0);
        assert_eq!(table.top_line(3), None);
    }

    #[test]
    fn row_order_is_page_then_y() {
        let a = Row { y: 250.0, page: 1 };
        let b = Row { y: 20.0, page: 2 };
        assert!(a.precedes_or_equals(&b));
        assert!(!b.precedes_or_equals(&a));
    }
}
