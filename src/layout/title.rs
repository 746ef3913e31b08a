//! Vertical title column: one character per line in a narrow column left of
//! the grid, split across a page break when the rows it labels are.

use super::cell::TitledCellSpec;
use super::page_break::containable_lines;
use super::{CellInfo, Span, Table, TextGlyph, THICK_LINE, THIN_LINE};
use crate::error::{LayoutError, LayoutWarning};
use crate::sink::DrawingSink;

/// Baseline offset of a glyph inside its line box, as a fraction of the line.
const GLYPH_BASELINE: f64 = 0.9;

impl Table {
    /// Label every row of the table.
    pub fn set_title(&mut self, sink: &mut dyn DrawingSink, text: &str) -> Result<(), LayoutError> {
        let last = self.ys.len() - 1;
        self.set_title_range(sink, 0, last, text)
    }

    /// Label rows `row_i..row_f`.
    ///
    /// When the rows straddle a page break the title goes above the break if
    /// it fits there, else below it if it fits there, else it is split by
    /// character with the first part filling the space above the break.
    pub fn set_title_range(
        &mut self,
        sink: &mut dyn DrawingSink,
        row_i: usize,
        row_f: usize,
        text: &str,
    ) -> Result<(), LayoutError> {
        self.check_row_range(row_i, row_f)?;
        let chars: Vec<char> = text.chars().collect();
        sink.set_font_size(self.style.font_size);
        let unit = sink.font_size().unit;
        let text_h = chars.len() as f64 * unit;

        let first = self.rows[row_i];
        let last = self.rows[row_f];
        let margin = self.style.margin;

        if first.page == last.page {
            self.push_title_block(sink, &chars, first.y, last.y - first.y, first.page, unit);
            tracing::debug!(page = first.page, "title placed on one page");
            return Ok(());
        }

        let bottom = self.bottom_line(first.page);
        if bottom - first.y >= text_h {
            self.push_title_block(sink, &chars, first.y, bottom - first.y, first.page, unit);
            tracing::debug!(page = first.page, "title placed above the page break");
        } else if last.y - margin >= text_h {
            self.push_title_block(sink, &chars, margin, last.y - margin, last.page, unit);
            tracing::debug!(page = last.page, "title placed below the page break");
        } else {
            let here = containable_lines(bottom - first.y, unit).min(chars.len());
            if here > 0 {
                self.push_title_rects(first.y, bottom - first.y, first.page);
                self.push_glyphs(sink, &chars[..here], first.y, first.page, unit);
            }
            self.push_title_rects(margin, last.y - margin, last.page);
            self.push_glyphs(sink, &chars[here..], margin, last.page, unit);

            tracing::warn!(here, total = chars.len(), "title split across pages");
            self.warnings.push(LayoutWarning::TitleSplit {
                first_page: first.page,
                on_first_page: here,
                total: chars.len(),
            });
        }
        Ok(())
    }

    /// Place a bordered cell that starts in the title column.
    ///
    /// If its rows straddle a page break it becomes two cells: one down to
    /// the bottom of the content on the first page, one from the top margin
    /// of the next. The text goes into whichever part can hold it.
    pub fn set_cell_with_title(
        &mut self,
        sink: &mut dyn DrawingSink,
        spec: &TitledCellSpec<'_>,
    ) -> Result<(), LayoutError> {
        let Span {
            col_i,
            row_i,
            col_f,
            row_f,
        } = spec.span;
        self.check_row_range(row_i, row_f)?;
        self.check_columns(col_i, col_f)?;

        let font_size = self.resolve_font_size(spec.font_size);
        sink.set_font_size(font_size);
        let unit = sink.font_size().unit;

        let x = self.xs[col_i] - self.style.title_width;
        let w = self.xs[col_f] - x;
        let first = self.rows[row_i];
        let last = self.rows[row_f];

        let cell = |y: f64, h: f64, page: usize, span: Span, text: &str| CellInfo {
            x,
            y,
            w,
            h,
            page,
            border: true,
            span,
            text: text.to_string(),
            align: spec.align,
            fill: spec.fill,
            font_size,
            link: None,
            line_width: THIN_LINE,
        };

        if first.page == last.page {
            self.cells
                .push(cell(first.y, last.y - first.y, first.page, spec.span, spec.text));
            return Ok(());
        }

        let upper_h = (self.bottom_line(first.page) - first.y).max(0.0);
        let lower_h = last.y - self.style.margin;
        let (upper_text, lower_text) = if upper_h < unit && upper_h < lower_h {
            ("", spec.text)
        } else {
            (spec.text, "")
        };
        let lower_span = Span {
            row_i: row_f,
            ..spec.span
        };
        self.cells
            .push(cell(first.y, upper_h, first.page, spec.span, upper_text));
        self.cells
            .push(cell(self.style.margin, lower_h, last.page, lower_span, lower_text));
        tracing::debug!(first = first.page, second = last.page, "titled cell split across pages");
        Ok(())
    }

    fn push_title_block(&mut self, sink: &dyn DrawingSink, chars: &[char], y: f64, h: f64, page: usize, unit: f64) {
        self.push_title_rects(y, h, page);
        let start = y + (h - chars.len() as f64 * unit) / 2.0;
        self.push_glyphs(sink, chars, start, page, unit);
    }

    fn push_title_rects(&mut self, y: f64, h: f64, page: usize) {
        let x = self.x_i - self.style.title_width;
        let w = self.style.title_width;
        self.push_rect_pair(x, y, w, h, page, true, THICK_LINE);
    }

    /// Stack `chars` from `top`, each centered in the title column.
    fn push_glyphs(&mut self, sink: &dyn DrawingSink, chars: &[char], top: f64, page: usize, unit: f64) {
        let center = self.x_i - self.style.title_width / 2.0;
        for (i, ch) in chars.iter().enumerate() {
            let text = ch.to_string();
            let half = sink.string_width(&text) / 2.0;
            self.texts.push(TextGlyph {
                x: center - half,
                y: top + i as f64 * unit + unit * GLYPH_BASELINE,
                text,
                size: self.style.font_size,
                page,
            });
        }
    }
}
