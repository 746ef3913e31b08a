//! The render pass: paint every committed primitive page by page.

use super::{Table, THICK_LINE};
use crate::error::{LayoutWarning, SinkError};
use crate::sink::{CellDraw, DrawingSink, RectStyle};

/// A page whose painting stopped early.
#[derive(Debug, Clone, PartialEq)]
pub struct PageFailure {
    pub page: usize,
    pub error: SinkError,
}

/// What the render pass did with a table.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderReport {
    pub first_page: usize,
    pub last_page: usize,
    /// Working y of the table's last row boundary on `last_page`.
    pub bottom: f64,
    pub warnings: Vec<LayoutWarning>,
    pub failures: Vec<PageFailure>,
}

impl RenderReport {
    /// True when every page painted without a sink error.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

impl Table {
    /// Paint the table and consume it.
    ///
    /// Pages are added to the sink as needed. On each page the order is:
    /// filled rectangles, cells, title glyphs, outlined rectangles, and the
    /// outer border when `outline` is set. A sink error abandons the rest of
    /// that page only; it is reported and the next page is still painted.
    pub fn render(self, sink: &mut dyn DrawingSink, outline: bool) -> RenderReport {
        let mut failures = Vec::new();
        for page in self.initial_page..=self.page_num {
            while sink.page_no() < page {
                sink.add_page();
                tracing::debug!(page = sink.page_no(), "added page");
            }
            if let Err(error) = self.render_page(sink, page, outline) {
                tracing::error!(page, %error, "rendering page failed");
                failures.push(PageFailure { page, error });
            }
        }

        tracing::debug!(
            first = self.initial_page,
            last = self.page_num,
            cells = self.cells.len(),
            rects = self.rects.len(),
            glyphs = self.texts.len(),
            "rendered table"
        );
        RenderReport {
            first_page: self.initial_page,
            last_page: self.page_num,
            bottom: self.last_row_y(),
            warnings: self.warnings,
            failures,
        }
    }

    fn render_page(&self, sink: &mut dyn DrawingSink, page: usize, outline: bool) -> Result<(), SinkError> {
        for rect in self.rects.iter().filter(|r| r.page == page && r.style == RectStyle::Filled) {
            sink.set_line_width(rect.line_width);
            sink.rect(rect.x, rect.y, rect.w, rect.h, RectStyle::Filled)?;
        }

        for cell in self.cells.iter().filter(|c| c.page == page) {
            sink.set_font(&self.style.font, cell.font_size);
            sink.set_line_width(cell.line_width);
            sink.cell(&CellDraw {
                x: cell.x,
                y: cell.y,
                w: cell.w,
                h: cell.h,
                text: &cell.text,
                border: cell.border,
                align: cell.align,
                fill: cell.fill,
                link: cell.link.as_deref(),
            })?;
        }

        for glyph in self.texts.iter().filter(|t| t.page == page) {
            sink.set_font(&self.style.font, glyph.size);
            sink.text(glyph.x, glyph.y, &glyph.text)?;
        }

        for rect in self.rects.iter().filter(|r| r.page == page && r.style == RectStyle::Outlined) {
            sink.set_line_width(rect.line_width);
            sink.rect(rect.x, rect.y, rect.w, rect.h, RectStyle::Outlined)?;
        }

        if outline {
            self.render_outline(sink, page)?;
        }
        Ok(())
    }

    fn render_outline(&self, sink: &mut dyn DrawingSink, page: usize) -> Result<(), SinkError> {
        let bottom = self.bottom_line(page);
        let x = self.x_i - self.style.title_width;
        let w = self.x_f - self.x_i + self.style.title_width;
        sink.set_line_width(THICK_LINE);

        let top = if page == self.initial_page && bottom > 0.0 {
            self.top_line(page).unwrap_or(self.y_i)
        } else {
            self.style.margin
        };
        if bottom - top > 0.0 {
            sink.rect(x, top, w, bottom - top, RectStyle::Outlined)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::GridSink;
    use super::super::{Bounds, CellSpec, MultiRowSpec, TableStyle};
    use super::*;

    fn filled_table(sink: &mut GridSink) -> Table {
        let mut t = Table::new(sink, Bounds::new(30.0, 40.0, 120.0, 44.0), 9, 2, TableStyle::new("IPA", 6.0, 4.5));
        t.set_multi_row_cell(sink, &MultiRowSpec::new((1, 9), (0, 1), "body").fill(true))
            .unwrap();
        t.set_cell(sink, &CellSpec::new((0, 1), (0, 1), "L").fill(true)).unwrap();
        t.set_title(sink, "T").unwrap();
        t
    }

    #[test]
    fn paints_in_layer_order() {
        let mut sink = GridSink::new(1.0, 2.0);
        let t = filled_table(&mut sink);
        let report = t.render(&mut sink, false);
        assert!(report.is_clean());

        let kinds: Vec<&str> = sink
            .ops
            .iter()
            .map(|op| op.split(' ').next().unwrap_or(""))
            .collect();
        assert_eq!(
            kinds,
            vec!["fill", "fill", "cell", "cell", "glyph", "outline", "outline"]
        );
    }

    #[test]
    fn outline_adds_one_border() {
        let mut sink = GridSink::new(1.0, 2.0);
        let t = filled_table(&mut sink);
        t.render(&mut sink, true);
        assert_eq!(sink.ops.last().map(String::as_str), Some("outline 40.0 4.5"));
    }

    #[test]
    fn adds_pages_for_spilled_content() {
        let mut sink = GridSink::new(1.0, 2.0);
        let mut t = Table::new(&sink, Bounds::new(0.0, 276.0, 90.0, 280.0), 9, 1, TableStyle::new("IPA", 6.0, 4.5));
        t.set_multi_row_cell(&mut sink, &MultiRowSpec::new((0, 9), (0, 1), "x")).unwrap();
        let report = t.render(&mut sink, false);
        assert_eq!((report.first_page, report.last_page), (1, 2));
        assert_eq!(sink.pages, 2);
        assert!(sink.ops.contains(&"page 2".to_string()));
    }

    #[test]
    fn failures_are_reported_per_page() {
        let mut sink = GridSink::new(1.0, 2.0);
        let mut t = Table::new(&sink, Bounds::new(0.0, 268.0, 90.0, 272.0), 9, 1, TableStyle::new("IPA", 6.0, 4.5));
        let text = "x".repeat(89 * 5);
        t.set_multi_row_cell(&mut sink, &MultiRowSpec::new((0, 9), (0, 1), &text)).unwrap();
        sink.fail_on_page = Some(1);

        let report = t.render(&mut sink, false);
        assert!(!report.is_clean());
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].page, 1);
        // page 2 was still painted
        assert!(sink.ops.iter().any(|op| op.starts_with("cell")));
    }
}
