//! # Form Driver
//!
//! Draws a [`FormTemplate`] onto a sink, one sheet of values at a time.
//!
//! Every table is built at its anchor, receives its placements in template
//! order and is rendered before the next one starts, so a `previous`-anchored
//! table always begins below wherever the table before it ended, on whatever
//! page that was. A rejected placement never stops the form; it becomes a
//! [`LayoutWarning::Rejected`] in the report.

use chrono::NaiveDate;

use crate::error::{GridformError, LayoutError, LayoutWarning};
use crate::font::FontContext;
use crate::layout::{
    AppendixSpec, Bounds, CellSpec, MultiRowSpec, PageFailure, Table, TableStyle, TitledCellSpec,
};
use crate::pdf::{Metadata, PdfCanvas};
use crate::sink::{Align, CellDraw, DrawingSink};
use crate::source::{SheetData, TabularSource};
use crate::template::{Anchor, FormTemplate, Placement, TableTemplate};

/// What drawing one or more sheets produced besides the pages themselves.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormReport {
    pub warnings: Vec<LayoutWarning>,
    pub failures: Vec<PageFailure>,
}

impl FormReport {
    fn absorb(&mut self, other: FormReport) {
        self.warnings.extend(other.warnings);
        self.failures.extend(other.failures);
    }
}

/// A finished document.
#[derive(Debug, Clone)]
pub struct RenderedForm {
    pub pdf: Vec<u8>,
    pub file_name: String,
    pub pages: usize,
    pub report: FormReport,
}

/// Draw one sheet starting on the sink's current page.
pub fn fill_sheet(sink: &mut dyn DrawingSink, template: &FormTemplate, data: &SheetData) -> FormReport {
    let mut report = FormReport::default();
    let header_bottom = draw_header(sink, template, &mut report);

    let [r, g, b] = template.fill_color;
    sink.set_fill_color(r, g, b);

    let mut previous_bottom: Option<f64> = None;
    for table in &template.tables {
        let offset = table.offset.unwrap_or(template.gap);
        let top = match table.anchor {
            Anchor::Header => header_bottom,
            Anchor::Previous => previous_bottom.unwrap_or(header_bottom),
        } + offset;

        let mut grid = build_table(sink, template, table, top);
        for placement in &table.placements {
            if let Err(error) = apply(&mut grid, sink, table, placement, data) {
                tracing::warn!(table = %table.name, operation = placement.operation(), %error, "placement rejected");
                report.warnings.push(LayoutWarning::Rejected {
                    operation: placement.operation().to_string(),
                    error,
                });
            }
        }

        let rendered = grid.render(sink, table.outline);
        tracing::debug!(
            table = %table.name,
            first = rendered.first_page,
            last = rendered.last_page,
            bottom = rendered.bottom,
            "table done"
        );
        previous_bottom = Some(rendered.bottom);
        report.warnings.extend(rendered.warnings);
        report.failures.extend(rendered.failures);
    }
    report
}

/// Title centered, caption right-aligned. Returns the bottom of the title.
fn draw_header(sink: &mut dyn DrawingSink, template: &FormTemplate, report: &mut FormReport) -> f64 {
    let header = &template.header;
    let (page_w, _) = sink.page_size();
    let top = template.margin_top;

    sink.set_font(&template.font, header.title_size);
    let title_h = sink.font_size().unit;
    if !header.title.is_empty() {
        let w = sink.string_width(&header.title);
        draw_plain(sink, (page_w - w) / 2.0, top, w, title_h, &header.title, report);
    }

    if !header.caption.is_empty() {
        sink.set_font_size(header.caption_size);
        let w = sink.string_width(&header.caption);
        let h = sink.font_size().unit;
        let x = page_w - w - template.margin_side;
        draw_plain(sink, x, top, w, h, &header.caption, report);
    }

    top + title_h
}

fn draw_plain(sink: &mut dyn DrawingSink, x: f64, y: f64, w: f64, h: f64, text: &str, report: &mut FormReport) {
    let draw = CellDraw {
        x,
        y,
        w,
        h,
        text,
        border: false,
        align: Align::Left,
        fill: false,
        link: None,
    };
    if let Err(error) = sink.cell(&draw) {
        tracing::error!(%error, "drawing header failed");
        report.failures.push(PageFailure {
            page: sink.page_no(),
            error,
        });
    }
}

fn build_table(sink: &dyn DrawingSink, template: &FormTemplate, table: &TableTemplate, top: f64) -> Table {
    let (page_w, _) = sink.page_size();
    let right = page_w - template.margin_side;
    let style = TableStyle::new(template.font.clone(), table.font_size, table.default_height)
        .with_title_width(template.title_width)
        .with_margin(template.page_margin);

    if table.appendix {
        return Table::appendix(sink, template.margin_side, right, top, style.with_border(false));
    }

    let left = if table.title_column {
        template.margin_side + template.title_width
    } else {
        template.margin_side
    };
    Table::new(
        sink,
        Bounds::new(left, top, right, top + table.row_height),
        table.columns,
        table.rows,
        style,
    )
}

fn apply(
    grid: &mut Table,
    sink: &mut dyn DrawingSink,
    table: &TableTemplate,
    placement: &Placement,
    data: &SheetData,
) -> Result<(), LayoutError> {
    let [src_row, src_col] = placement.source();
    let text = data.get(src_row, src_col);

    match placement {
        Placement::Cell {
            cols,
            rows,
            align,
            fill,
            font_size,
            line_width,
            height,
            link,
            ..
        } => {
            let mut spec = CellSpec::new((cols[0], cols[1]), (rows[0], rows[1]), text)
                .align(*align)
                .fill(*fill)
                .line_width(*line_width)
                .height(height.unwrap_or(table.row_height));
            if let Some(size) = font_size {
                spec = spec.font_size(*size);
            }
            if let Some(link) = link.as_deref() {
                spec = spec.link(link);
            }
            grid.set_cell(sink, &spec)
        }
        Placement::MultiRowCell {
            cols,
            rows,
            align,
            fill,
            font_size,
            break_lines,
            ..
        } => {
            let mut spec = MultiRowSpec::new((cols[0], cols[1]), (rows[0], rows[1]), text)
                .align(*align)
                .fill(*fill)
                .break_lines(*break_lines);
            if let Some(size) = font_size {
                spec = spec.font_size(*size);
            }
            grid.set_multi_row_cell(sink, &spec)
        }
        Placement::Title { rows: None, .. } => grid.set_title(sink, text),
        Placement::Title { rows: Some(rows), .. } => grid.set_title_range(sink, rows[0], rows[1], text),
        Placement::CellWithTitle {
            cols,
            rows,
            align,
            fill,
            font_size,
            ..
        } => {
            let mut spec = TitledCellSpec::new((cols[0], cols[1]), (rows[0], rows[1]), text)
                .align(*align)
                .fill(*fill);
            if let Some(size) = font_size {
                spec = spec.font_size(*size);
            }
            grid.set_cell_with_title(sink, &spec)
        }
        Placement::Appendix {
            align, fill, font_size, ..
        } => {
            let mut spec = AppendixSpec::new(text).align(*align).fill(*fill);
            if let Some(size) = font_size {
                spec = spec.font_size(*size);
            }
            grid.set_appendix(sink, &spec)
        }
    }
}

/// Draws whole workbooks with one template.
pub struct Form {
    template: FormTemplate,
    fonts: FontContext,
}

impl Form {
    pub fn new(template: FormTemplate, fonts: FontContext) -> Self {
        Form { template, fonts }
    }

    pub fn template(&self) -> &FormTemplate {
        &self.template
    }

    /// Render every section of `source` on its own page(s) and serialize the
    /// document. `label` names the input in errors.
    pub fn render(&self, label: &str, source: &dyn TabularSource, today: NaiveDate) -> Result<RenderedForm, GridformError> {
        let sections = source.sections();
        if sections.is_empty() {
            return Err(GridformError::NoSections {
                file: label.to_string(),
            });
        }

        let t = &self.template;
        let mut canvas = PdfCanvas::with_fonts(t.page_size, t.unit, self.fonts.clone());
        let mut report = FormReport::default();
        let mut single_sheet: Option<SheetData> = None;

        for (index, section) in sections.iter().enumerate() {
            let data = source
                .slice(section, t.max_rows, t.max_cols)
                .map_err(|source| GridformError::Source {
                    file: label.to_string(),
                    source,
                })?;
            if index > 0 || canvas.page_no() == 0 {
                canvas.add_page();
            }
            tracing::info!(file = label, sheet = %section, page = canvas.page_no(), "filling sheet");
            report.absorb(fill_sheet(&mut canvas, t, &data));
            if sections.len() == 1 {
                single_sheet = Some(data);
            }
        }

        let file_name = output_file_name(t, single_sheet.as_ref(), today);
        let metadata = Metadata {
            title: Some(if t.header.title.is_empty() {
                file_name.trim_end_matches(".pdf").to_string()
            } else {
                t.header.title.clone()
            }),
            creator: Some("gridform".to_string()),
            ..Default::default()
        };
        let pdf = canvas.finish(&metadata)?;
        Ok(RenderedForm {
            pdf,
            file_name,
            pages: canvas.page_no(),
            report,
        })
    }
}

/// `{prefix}_{field}_{field}.pdf` for a single sheet with configured fields,
/// `{prefix}_{YYYYMMDD}.pdf` otherwise.
pub fn output_file_name(template: &FormTemplate, single_sheet: Option<&SheetData>, today: NaiveDate) -> String {
    let prefix = &template.output.prefix;
    match single_sheet {
        Some(data) if !template.output.fields.is_empty() => {
            let parts: Vec<String> = template
                .output
                .fields
                .iter()
                .map(|[r, c]| sanitize_file_component(data.get(*r, *c)))
                .collect();
            format!("{}_{}.pdf", prefix, parts.join("_"))
        }
        _ => format!("{}_{}.pdf", prefix, today.format("%Y%m%d")),
    }
}

/// Replace path separators and control characters with `_`.
pub fn sanitize_file_component(value: &str) -> String {
    value
        .chars()
        .map(|c| if c == '/' || c == '\\' || c.is_control() { '_' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;
    use crate::template::default_template;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 9).unwrap()
    }

    fn sheet(values: &[((usize, usize), &str)]) -> SheetData {
        let mut src = MemorySource::new();
        src.set("s", 0, 0, "");
        for ((r, c), v) in values {
            src.set("s", *r, *c, *v);
        }
        src.slice("s", 48, 30).unwrap()
    }

    #[test]
    fn single_sheet_name_uses_fields() {
        let t = default_template().unwrap();
        let data = sheet(&[((4, 2), "Acme"), ((12, 2), "Engineer")]);
        assert_eq!(output_file_name(&t, Some(&data), date()), "求人票_Acme_Engineer.pdf");
    }

    #[test]
    fn several_sheets_name_uses_date() {
        let t = default_template().unwrap();
        assert_eq!(output_file_name(&t, None, date()), "求人票_20240309.pdf");
    }

    #[test]
    fn names_are_sanitized() {
        assert_eq!(sanitize_file_component("a/b\\c\nd"), "a_b_c_d");
        assert_eq!(sanitize_file_component("株式会社"), "株式会社");
    }

    #[test]
    fn empty_source_is_an_error() {
        let form = Form::new(default_template().unwrap(), FontContext::new());
        let err = form.render("empty.xlsx", &MemorySource::new(), date()).unwrap_err();
        assert!(matches!(err, GridformError::NoSections { file } if file == "empty.xlsx"));
    }

    #[test]
    fn renders_blank_sheet() {
        let form = Form::new(default_template().unwrap(), FontContext::new());
        let src = MemorySource::new().with_section("Sheet1", vec![]);
        let out = form.render("blank.xlsx", &src, date()).unwrap();
        assert!(out.pdf.starts_with(b"%PDF-"));
        assert_eq!(out.pages, 1);
        assert_eq!(out.file_name, "求人票__.pdf");
        assert!(out.report.failures.is_empty());
    }

    #[test]
    fn each_sheet_starts_a_page() {
        let form = Form::new(default_template().unwrap(), FontContext::new());
        let src = MemorySource::new()
            .with_section("A", vec![])
            .with_section("B", vec![]);
        let out = form.render("two.xlsx", &src, date()).unwrap();
        assert_eq!(out.pages, 2);
        assert_eq!(out.file_name, "求人票_20240309.pdf");
    }

    #[test]
    fn rejections_become_warnings() {
        let form = Form::new(default_template().unwrap(), FontContext::new());
        let long = "W".repeat(200);
        let mut src = MemorySource::new();
        // a single-line cell that cannot fit its column
        src.set("Sheet1", 5, 1, long.as_str());
        let out = form.render("wide.xlsx", &src, date()).unwrap();
        assert!(out.report.warnings.iter().any(|w| matches!(
            w,
            LayoutWarning::Rejected { operation, error: LayoutError::TextTooWide { .. } }
                if operation == "set_cell"
        )));
    }
}
