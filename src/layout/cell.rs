//! Cell placement: fixed-height cells, wrapped multi-line cells, and the
//! single-row appendix.

use super::page_break::{containable_lines, decide_line_break};
use super::{CellInfo, Span, Table, THIN_LINE};
use crate::error::{LayoutError, LayoutWarning};
use crate::sink::{Align, DrawingSink};
use crate::text::split_lines;

/// A fixed-height bordered cell.
#[derive(Debug, Clone)]
pub struct CellSpec<'a> {
    pub span: Span,
    pub text: &'a str,
    pub align: Align,
    pub fill: bool,
    /// Font size in points; the table default when unset or negative.
    pub font_size: Option<f64>,
    pub link: Option<&'a str>,
    pub line_width: f64,
    /// Requested row height; the table default height when unset.
    pub height: Option<f64>,
}

impl<'a> CellSpec<'a> {
    pub fn new(cols: (usize, usize), rows: (usize, usize), text: &'a str) -> Self {
        CellSpec {
            span: Span {
                col_i: cols.0,
                row_i: rows.0,
                col_f: cols.1,
                row_f: rows.1,
            },
            text,
            align: Align::Left,
            fill: false,
            font_size: None,
            link: None,
            line_width: THIN_LINE,
            height: None,
        }
    }

    pub fn align(mut self, align: Align) -> Self {
        self.align = align;
        self
    }

    pub fn fill(mut self, fill: bool) -> Self {
        self.fill = fill;
        self
    }

    pub fn font_size(mut self, size: f64) -> Self {
        self.font_size = Some(size);
        self
    }

    pub fn link(mut self, link: &'a str) -> Self {
        self.link = Some(link);
        self
    }

    pub fn line_width(mut self, width: f64) -> Self {
        self.line_width = width;
        self
    }

    pub fn height(mut self, height: f64) -> Self {
        self.height = Some(height);
        self
    }
}

/// A wrapped cell whose height follows its text.
#[derive(Debug, Clone)]
pub struct MultiRowSpec<'a> {
    pub span: Span,
    pub text: &'a str,
    pub align: Align,
    pub fill: bool,
    pub font_size: Option<f64>,
    /// When false, a cell that does not fit the rest of the page moves to
    /// the next page whole instead of being split.
    pub break_lines: bool,
}

impl<'a> MultiRowSpec<'a> {
    pub fn new(cols: (usize, usize), rows: (usize, usize), text: &'a str) -> Self {
        MultiRowSpec {
            span: Span {
                col_i: cols.0,
                row_i: rows.0,
                col_f: cols.1,
                row_f: rows.1,
            },
            text,
            align: Align::Left,
            fill: false,
            font_size: None,
            break_lines: true,
        }
    }

    pub fn align(mut self, align: Align) -> Self {
        self.align = align;
        self
    }

    pub fn fill(mut self, fill: bool) -> Self {
        self.fill = fill;
        self
    }

    pub fn font_size(mut self, size: f64) -> Self {
        self.font_size = Some(size);
        self
    }

    pub fn break_lines(mut self, break_lines: bool) -> Self {
        self.break_lines = break_lines;
        self
    }
}

/// Free text for an appendix table.
#[derive(Debug, Clone)]
pub struct AppendixSpec<'a> {
    pub text: &'a str,
    pub align: Align,
    pub fill: bool,
    pub font_size: Option<f64>,
}

impl<'a> AppendixSpec<'a> {
    pub fn new(text: &'a str) -> Self {
        AppendixSpec {
            text,
            align: Align::Left,
            fill: false,
            font_size: None,
        }
    }

    pub fn align(mut self, align: Align) -> Self {
        self.align = align;
        self
    }

    pub fn fill(mut self, fill: bool) -> Self {
        self.fill = fill;
        self
    }

    pub fn font_size(mut self, size: f64) -> Self {
        self.font_size = Some(size);
        self
    }
}

/// A bordered cell that also covers the title column to its left.
#[derive(Debug, Clone)]
pub struct TitledCellSpec<'a> {
    pub span: Span,
    pub text: &'a str,
    pub align: Align,
    pub fill: bool,
    pub font_size: Option<f64>,
}

impl<'a> TitledCellSpec<'a> {
    pub fn new(cols: (usize, usize), rows: (usize, usize), text: &'a str) -> Self {
        TitledCellSpec {
            span: Span {
                col_i: cols.0,
                row_i: rows.0,
                col_f: cols.1,
                row_f: rows.1,
            },
            text,
            align: Align::Center,
            fill: false,
            font_size: None,
        }
    }

    pub fn align(mut self, align: Align) -> Self {
        self.align = align;
        self
    }

    pub fn fill(mut self, fill: bool) -> Self {
        self.fill = fill;
        self
    }

    pub fn font_size(mut self, size: f64) -> Self {
        self.font_size = Some(size);
        self
    }
}

impl Table {
    /// Place a fixed-height cell.
    ///
    /// If the ending boundary already sits lower than `start + height`, the
    /// cell takes the taller existing height. Otherwise the boundary is raised
    /// (or created) at `start + height`. There is no page break for single
    /// cells: a cell that would cross the bottom margin is rejected.
    pub fn set_cell(&mut self, sink: &mut dyn DrawingSink, spec: &CellSpec<'_>) -> Result<(), LayoutError> {
        let Span {
            col_i,
            row_i,
            col_f,
            row_f,
        } = spec.span;
        self.check_row_start(row_i, row_f)?;
        let w = self.check_columns(col_i, col_f)?;

        let font_size = self.resolve_font_size(spec.font_size);
        sink.set_font_size(font_size);
        let text_width = sink.string_width(spec.text);
        if text_width > w {
            return Err(LayoutError::TextTooWide {
                width: text_width,
                available: w,
            });
        }

        let mut height = spec.height.unwrap_or(self.style.default_height);
        let start = self.ys[row_i];
        let (_, page_height) = sink.page_size();
        let limit = page_height - self.style.margin;
        if start + height > limit {
            return Err(LayoutError::ExceedsPage {
                bottom: start + height,
                limit,
            });
        }

        self.materialize_rows(row_f);
        if row_f < self.ys.len() {
            let existing = self.ys[row_f] - start;
            if height < existing {
                height = existing;
            } else {
                self.set_row(row_f, start + height);
            }
        } else {
            // A new last boundary may not end above the one before it
            height = height.max(self.last_row_y() - start);
            self.push_row(start + height);
        }

        self.cells.push(CellInfo {
            x: self.xs[col_i],
            y: start,
            w,
            h: height,
            page: self.page_num,
            border: self.style.border,
            span: spec.span,
            text: spec.text.to_string(),
            align: spec.align,
            fill: spec.fill,
            font_size,
            link: spec.link.map(str::to_string),
            line_width: spec.line_width,
        });
        tracing::debug!(col_i, row_i, col_f, row_f, height, page = self.page_num, "set cell");
        Ok(())
    }

    /// Place wrapped text whose height decides the ending row boundary.
    ///
    /// Lines that do not fit above the bottom margin continue at the top
    /// margin of the next page, each part with its own background and
    /// outline. A cell may cross at most one page break.
    pub fn set_multi_row_cell(
        &mut self,
        sink: &mut dyn DrawingSink,
        spec: &MultiRowSpec<'_>,
    ) -> Result<(), LayoutError> {
        let Span {
            col_i,
            row_i,
            col_f,
            row_f,
        } = spec.span;
        self.check_row_start(row_i, row_f)?;
        let w = self.check_columns(col_i, col_f)?;

        let font_size = self.resolve_font_size(spec.font_size);
        let lines = split_lines(sink, spec.text, w, font_size);
        let unit = sink.font_size().unit;
        let total = lines.len();
        let start = self.ys[row_i];

        // A zero-height placeholder boundary has not been pinned by anything yet
        let pinned = row_f < self.ys.len() && self.ys[row_f] > start;
        let margin = if pinned {
            self.ys[row_f] - start - unit * total as f64
        } else {
            self.style.default_height - unit
        };

        let (_, page_height) = sink.page_size();
        let content_bottom = start + margin + unit * total as f64;
        if content_bottom > page_height * 2.0 {
            return Err(LayoutError::ExceedsTwoPages {
                height: content_bottom,
                limit: page_height * 2.0,
            });
        }

        let available = page_height - self.style.margin - start - margin;
        let here = decide_line_break(available, unit, total, spec.break_lines).lines_on_current_page(total);
        tracing::debug!(here, total, unit, available, "multi-row cell line budget");

        let x = self.xs[col_i];
        for (i, line) in lines.iter().take(here).enumerate() {
            let y = start + i as f64 * unit + margin / 2.0;
            self.push_line(spec, x, y, w, unit, line, font_size);
        }
        if here > 0 {
            let page = self.page_num;
            self.push_rect_pair(x, start, w, here as f64 * unit + margin, page, spec.fill, THIN_LINE);
        }

        self.materialize_rows(row_f);

        let spilled = here < total;
        let bottom = if spilled {
            let top = self.style.margin;
            self.ys[row_i] = top;
            self.page_num += 1;
            for (i, line) in lines.iter().skip(here).enumerate() {
                let y = top + i as f64 * unit + margin / 2.0;
                self.push_line(spec, x, y, w, unit, line, font_size);
            }
            let rest = (total - here) as f64 * unit + margin;
            let page = self.page_num;
            self.push_rect_pair(x, top, w, rest, page, spec.fill, THIN_LINE);
            tracing::debug!(page, lines = total - here, "multi-row cell continued on next page");
            top + rest
        } else {
            start + here as f64 * unit + margin
        };

        if row_f < self.ys.len() {
            if spilled || self.ys[row_f] < self.ys[row_i] + unit {
                self.set_row(row_f, bottom);
            }
        } else if spilled {
            self.push_row(bottom);
        } else {
            self.push_row(bottom.max(self.last_row_y()));
        }

        tracing::debug!(col_i, row_i, col_f, row_f, lines = total, page = self.page_num, "set multi-row cell");
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn push_line(&mut self, spec: &MultiRowSpec<'_>, x: f64, y: f64, w: f64, h: f64, text: &str, font_size: f64) {
        self.cells.push(CellInfo {
            x,
            y,
            w,
            h,
            page: self.page_num,
            border: false,
            span: spec.span,
            text: text.to_string(),
            align: spec.align,
            fill: spec.fill,
            font_size,
            link: None,
            line_width: THIN_LINE,
        });
    }

    /// Fill an appendix table with wrapped text.
    ///
    /// All lines are emitted on the current page even when they run past the
    /// page edge less the cell margin; that case is recorded as a warning.
    pub fn set_appendix(&mut self, sink: &mut dyn DrawingSink, spec: &AppendixSpec<'_>) -> Result<(), LayoutError> {
        if self.ys.len() < 2 {
            return Err(LayoutError::RowOutOfRange {
                row: 1,
                materialized: self.ys.len() - 1,
            });
        }
        let font_size = self.resolve_font_size(spec.font_size);
        let x = self.xs[0];
        let w = self.xs[self.xs.len() - 1] - x;
        let lines = split_lines(sink, spec.text, w, font_size);
        let unit = sink.font_size().unit;
        let total = lines.len();
        let margin = self.style.default_height - unit;
        let top = self.y_i;

        let (_, page_height) = sink.page_size();
        let content_bottom = top + margin + unit * total as f64;
        if content_bottom > page_height * 2.0 {
            return Err(LayoutError::ExceedsTwoPages {
                height: content_bottom,
                limit: page_height * 2.0,
            });
        }

        self.set_row(1, content_bottom);

        let containable = containable_lines(page_height - margin - top, unit);
        if containable < total {
            tracing::warn!(lines = total, containable, "appendix runs past the bottom margin");
            self.warnings.push(LayoutWarning::AppendixOverflow {
                lines: total,
                containable,
            });
        }

        let span = Span {
            col_i: 0,
            row_i: 0,
            col_f: 1,
            row_f: 1,
        };
        for (i, line) in lines.iter().enumerate() {
            self.cells.push(CellInfo {
                x,
                y: top + i as f64 * unit + margin / 2.0,
                w,
                h: unit,
                page: self.page_num,
                border: false,
                span,
                text: line.clone(),
                align: spec.align,
                fill: spec.fill,
                font_size,
                link: None,
                line_width: THIN_LINE,
            });
        }
        tracing::debug!(lines = total, bottom = content_bottom, "set appendix");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::GridSink;
    use super::super::{Bounds, Row, TableStyle, PAGE_MARGIN};
    use super::*;
    use crate::sink::RectStyle;

    fn table(sink: &GridSink, y: f64) -> Table {
        Table::new(sink, Bounds::new(0.0, y, 90.0, y + 4.0), 9, 8, TableStyle::new("IPA", 6.0, 4.5))
    }

    fn assert_monotonic(table: &Table) {
        for pair in table.rows().windows(2) {
            assert!(pair[0].precedes_or_equals(&pair[1]), "{:?}", table.rows());
        }
    }

    #[test]
    fn cell_appends_boundary() {
        let mut sink = GridSink::new(1.0, 2.0);
        let mut t = table(&sink, 30.0);
        t.set_cell(&mut sink, &CellSpec::new((0, 1), (0, 1), "ab").height(4.0)).unwrap();
        assert_eq!(t.ys(), &[30.0, 34.0]);
        assert_eq!(t.cells()[0].h, 4.0);
        assert_eq!(t.cells()[0].w, 10.0);
    }

    #[test]
    fn taller_existing_height_wins() {
        let mut sink = GridSink::new(1.0, 2.0);
        let mut t = table(&sink, 30.0);
        t.set_cell(&mut sink, &CellSpec::new((0, 1), (0, 1), "a").height(5.0)).unwrap();
        t.set_cell(&mut sink, &CellSpec::new((1, 2), (0, 1), "b").height(2.0)).unwrap();
        assert_eq!(t.ys()[1], 35.0);
        assert_eq!(t.cells()[1].h, 5.0);
    }

    #[test]
    fn taller_new_height_raises_boundary() {
        let mut sink = GridSink::new(1.0, 2.0);
        let mut t = table(&sink, 30.0);
        t.set_cell(&mut sink, &CellSpec::new((0, 1), (0, 1), "a").height(2.0)).unwrap();
        t.set_cell(&mut sink, &CellSpec::new((1, 2), (0, 1), "b").height(6.0)).unwrap();
        assert_eq!(t.ys()[1], 36.0);
        assert_monotonic(&t);
    }

    #[test]
    fn missing_rows_are_zero_height() {
        let mut sink = GridSink::new(1.0, 2.0);
        let mut t = table(&sink, 30.0);
        t.set_cell(&mut sink, &CellSpec::new((0, 1), (0, 3), "a").height(9.0)).unwrap();
        assert_eq!(t.ys(), &[30.0, 30.0, 30.0, 39.0]);
        // Raising a placeholder lifts the placeholders after it
        t.set_cell(&mut sink, &CellSpec::new((1, 2), (0, 1), "b").height(4.5)).unwrap();
        assert_eq!(t.ys(), &[30.0, 34.5, 34.5, 39.0]);
        t.set_cell(&mut sink, &CellSpec::new((1, 2), (1, 2), "c").height(4.5)).unwrap();
        assert_eq!(t.ys(), &[30.0, 34.5, 39.0, 39.0]);
        assert_monotonic(&t);
    }

    #[test]
    fn new_boundary_never_ends_above_the_last() {
        let mut sink = GridSink::new(1.0, 2.0);
        let mut t = table(&sink, 30.0);
        t.set_cell(&mut sink, &CellSpec::new((0, 1), (0, 2), "a").height(9.0)).unwrap();
        // starts at row 1 (30) and ends on a new row 3 below row 2 (39)
        t.set_cell(&mut sink, &CellSpec::new((1, 2), (1, 3), "b").height(4.0)).unwrap();
        assert_eq!(t.ys(), &[30.0, 30.0, 39.0, 39.0]);
        assert_eq!(t.cells()[1].h, 9.0);
        assert_monotonic(&t);
    }

    #[test]
    fn unmaterialized_start_row_is_rejected() {
        let mut sink = GridSink::new(1.0, 2.0);
        let mut t = table(&sink, 30.0);
        let err = t.set_cell(&mut sink, &CellSpec::new((0, 1), (2, 3), "a")).unwrap_err();
        assert_eq!(err, LayoutError::RowOutOfRange { row: 2, materialized: 0 });
        assert!(t.cells().is_empty());
        assert_eq!(t.ys().len(), 1);
    }

    #[test]
    fn wide_text_is_rejected() {
        let mut sink = GridSink::new(1.0, 2.0);
        let mut t = table(&sink, 30.0);
        let err = t.set_cell(&mut sink, &CellSpec::new((0, 1), (0, 1), "abcdefghijk")).unwrap_err();
        assert!(matches!(err, LayoutError::TextTooWide { .. }));
        assert!(t.cells().is_empty());
    }

    #[test]
    fn cell_past_bottom_margin_is_rejected() {
        let mut sink = GridSink::new(1.0, 2.0);
        let mut t = table(&sink, 270.0);
        let err = t.set_cell(&mut sink, &CellSpec::new((0, 1), (0, 1), "a").height(8.0)).unwrap_err();
        assert_eq!(err, LayoutError::ExceedsPage { bottom: 278.0, limit: 277.0 });
        assert_eq!(t.ys().len(), 1);
    }

    #[test]
    fn bad_columns_are_rejected() {
        let mut sink = GridSink::new(1.0, 2.0);
        let mut t = table(&sink, 30.0);
        assert!(matches!(
            t.set_cell(&mut sink, &CellSpec::new((0, 10), (0, 1), "a")),
            Err(LayoutError::ColumnOutOfRange { col: 10, columns: 9 })
        ));
        assert!(matches!(
            t.set_cell(&mut sink, &CellSpec::new((3, 3), (0, 1), "a")),
            Err(LayoutError::EmptySpan { .. })
        ));
    }

    #[test]
    fn multi_row_cell_grows_with_text() {
        let mut sink = GridSink::new(1.0, 2.0);
        let mut t = table(&sink, 30.0);
        // 10 columns wide, 9 characters per line: 20 characters -> 3 lines
        t.set_multi_row_cell(&mut sink, &MultiRowSpec::new((0, 1), (0, 1), "abcdefghijklmnopqrst"))
            .unwrap();
        let lines: Vec<_> = t.cells().iter().map(|c| c.text.as_str()).collect();
        assert_eq!(lines, vec!["abcdefghi", "jklmnopqr", "st"]);
        // margin = 4.5 - 2 = 2.5; bottom = 30 + 3*2 + 2.5
        assert!((t.ys()[1] - 38.5).abs() < 1e-9);
        assert!((t.cells()[0].y - 31.25).abs() < 1e-9);
        assert!(t.cells().iter().all(|c| !c.border));
        assert_eq!(t.rects().len(), 1);
        assert_eq!(t.rects()[0].style, RectStyle::Outlined);
    }

    #[test]
    fn multi_row_cell_inside_pinned_row_centers() {
        let mut sink = GridSink::new(1.0, 2.0);
        let mut t = table(&sink, 30.0);
        t.set_cell(&mut sink, &CellSpec::new((0, 1), (0, 1), "a").height(10.0)).unwrap();
        t.set_multi_row_cell(&mut sink, &MultiRowSpec::new((1, 2), (0, 1), "ab").fill(true))
            .unwrap();
        // margin = 10 - 2 = 8; single line starts at 30 + 4
        let line = &t.cells()[1];
        assert!((line.y - 34.0).abs() < 1e-9);
        assert_eq!(t.ys()[1], 40.0);
        assert_eq!(t.rects()[0].style, RectStyle::Filled);
        assert_eq!(t.rects()[0].h, 10.0);
    }

    #[test]
    fn forced_break_moves_everything() {
        let mut sink = GridSink::new(1.0, 2.0);
        let mut t = table(&sink, 268.0);
        // 297 - 20 - 268 - 2.5 leaves room for 3 of the 4 lines
        let text = "abcdefghijklmnopqrstuvwxyz12";
        t.set_multi_row_cell(&mut sink, &MultiRowSpec::new((0, 1), (0, 1), text).break_lines(false))
            .unwrap();
        assert!(t.cells().iter().all(|c| c.page == 2));
        assert_eq!(t.cells().len(), 4);
        let pages: Vec<_> = t.rects().iter().map(|r| (r.page, r.y)).collect();
        assert_eq!(pages, vec![(2, PAGE_MARGIN)]);
        assert_eq!(t.current_page(), 2);
        assert_eq!(t.rows()[1].page, 2);
        assert_monotonic(&t);
    }

    #[test]
    fn soft_break_splits_lines() {
        let mut sink = GridSink::new(1.0, 2.0);
        let mut t = table(&sink, 268.0);
        // available = 297 - 20 - 268 - 2.5 = 6.5 -> 3 lines stay
        let text = "abcdefghijklmnopqrstuvwxyz1234567890";
        t.set_multi_row_cell(&mut sink, &MultiRowSpec::new((0, 1), (0, 1), text)).unwrap();
        let first: Vec<_> = t.cells().iter().filter(|c| c.page == 1).collect();
        let second: Vec<_> = t.cells().iter().filter(|c| c.page == 2).collect();
        assert_eq!(first.len(), 3);
        assert_eq!(second.len(), 1);
        assert!((second[0].y - (PAGE_MARGIN + 1.25)).abs() < 1e-9);
        assert_eq!(t.rects().len(), 2);
        assert!((t.ys()[1] - (PAGE_MARGIN + 2.0 + 2.5)).abs() < 1e-9);
        assert_eq!(t.ys()[0], PAGE_MARGIN);
        assert_eq!(t.rows()[0], Row { y: 268.0, page: 1 });
    }

    #[test]
    fn two_page_ceiling_rejects_without_output() {
        let mut sink = GridSink::new(1.0, 2.0);
        let mut t = table(&sink, 30.0);
        let text: String = std::iter::repeat('x').take(9 * 300).collect();
        let err = t
            .set_multi_row_cell(&mut sink, &MultiRowSpec::new((0, 1), (0, 1), &text))
            .unwrap_err();
        assert!(matches!(err, LayoutError::ExceedsTwoPages { .. }));
        assert!(t.cells().is_empty());
        assert!(t.rects().is_empty());
        assert_eq!(t.ys().len(), 1);
    }

    #[test]
    fn appendix_sets_its_single_row() {
        let mut sink = GridSink::new(1.0, 2.0);
        let mut t = Table::appendix(&sink, 0.0, 10.0, 40.0, TableStyle::new("IPA", 6.0, 4.5));
        t.set_appendix(&mut sink, &AppendixSpec::new("abcdefghijk")).unwrap();
        assert_eq!(t.cells().len(), 2);
        assert!((t.ys()[1] - (40.0 + 4.0 + 2.5)).abs() < 1e-9);
        assert_eq!(t.rows().len(), t.ys().len());
        assert!(t.warnings().is_empty());
    }

    #[test]
    fn appendix_inside_bottom_margin_is_not_a_warning() {
        let mut sink = GridSink::new(1.0, 2.0);
        let mut t = Table::appendix(&sink, 0.0, 10.0, 270.0, TableStyle::new("IPA", 6.0, 4.5));
        t.set_appendix(&mut sink, &AppendixSpec::new("abcdefghijklmnopqrstuvwxyz")).unwrap();
        assert_eq!(t.cells().len(), 3);
        assert!(t.warnings().is_empty());
    }

    #[test]
    fn appendix_overflow_is_a_warning() {
        let mut sink = GridSink::new(1.0, 2.0);
        let mut t = Table::appendix(&sink, 0.0, 10.0, 290.0, TableStyle::new("IPA", 6.0, 4.5));
        t.set_appendix(&mut sink, &AppendixSpec::new("abcdefghijklmnopqrstuvwxyz")).unwrap();
        assert_eq!(t.cells().len(), 3);
        assert!(t.cells().iter().all(|c| c.page == 1));
        assert!(matches!(
            t.warnings(),
            [LayoutWarning::AppendixOverflow { lines: 3, containable: 2 }]
        ));
    }
}
