//! # Form Templates
//!
//! A form is described declaratively: which tables exist, where each starts,
//! and which source cell lands in which grid span. The layout engine knows
//! nothing about any particular form; [`crate::form`] walks a template and
//! turns every placement into a call on a [`crate::layout::Table`].
//!
//! Templates are JSON (camelCase keys). The job-posting form ships embedded
//! and is returned by [`default_template`].

use serde::{Deserialize, Serialize};

use crate::error::GridformError;
use crate::layout::{PAGE_MARGIN, THIN_LINE, TITLE_WIDTH};
use crate::pdf::{PageSize, Unit};
use crate::sink::Align;
use crate::source::{DEFAULT_MAX_COLS, DEFAULT_MAX_ROWS};

const JOB_POSTING: &str = include_str!("../assets/job_posting.json");

/// A whole form: page setup, header, and the ordered tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormTemplate {
    #[serde(default)]
    pub page_size: PageSize,
    #[serde(default)]
    pub unit: Unit,
    /// Font family every table uses. Families that were never registered
    /// fall back to Helvetica.
    #[serde(default = "default_font")]
    pub font: String,
    pub margin_side: f64,
    pub margin_top: f64,
    #[serde(default = "default_page_margin")]
    pub page_margin: f64,
    #[serde(default)]
    pub header: Header,
    /// RGB fill of highlighted cells.
    #[serde(default = "default_fill")]
    pub fill_color: [u8; 3],
    #[serde(default = "default_title_width")]
    pub title_width: f64,
    /// Vertical gap between a table and the one anchored below it.
    #[serde(default)]
    pub gap: f64,
    #[serde(default = "default_max_rows")]
    pub max_rows: usize,
    #[serde(default = "default_max_cols")]
    pub max_cols: usize,
    #[serde(default)]
    pub output: OutputNaming,
    pub tables: Vec<TableTemplate>,
}

/// Texts drawn above the first table.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Header {
    /// Centered on the page at `title_size`.
    #[serde(default)]
    pub title: String,
    #[serde(default = "default_title_size")]
    pub title_size: f64,
    /// Right-aligned against the side margin at `caption_size`.
    #[serde(default)]
    pub caption: String,
    #[serde(default = "default_caption_size")]
    pub caption_size: f64,
}

/// How output files are named.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputNaming {
    pub prefix: String,
    /// Source cells joined into the name when a workbook has one sheet.
    #[serde(default)]
    pub fields: Vec<[usize; 2]>,
}

impl Default for OutputNaming {
    fn default() -> Self {
        OutputNaming {
            prefix: "form".to_string(),
            fields: Vec::new(),
        }
    }
}

/// Where a table's top edge is measured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Anchor {
    /// Below the header title: `margin_top + title height`.
    #[default]
    Header,
    /// Below the last row boundary of the table before this one.
    Previous,
}

/// One table of the form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableTemplate {
    #[serde(default)]
    pub name: String,
    /// A trailing single-column note spanning the side margins instead of a
    /// grid. `columns`, `rows` and `titleColumn` are ignored.
    #[serde(default)]
    pub appendix: bool,
    #[serde(default = "default_columns")]
    pub columns: usize,
    #[serde(default = "default_rows")]
    pub rows: usize,
    /// Height of a plain cell unless a placement overrides it.
    pub row_height: f64,
    /// Base height of a wrapped cell's first line.
    pub default_height: f64,
    pub font_size: f64,
    #[serde(default)]
    pub anchor: Anchor,
    /// Distance from the anchor; the form's `gap` when absent.
    #[serde(default)]
    pub offset: Option<f64>,
    /// Reserve the title column left of the grid.
    #[serde(default = "default_true")]
    pub title_column: bool,
    /// Draw the thick outer border on render.
    #[serde(default)]
    pub outline: bool,
    pub placements: Vec<Placement>,
}

/// One placement call. `src` is a zero-based (row, column) coordinate in the
/// sheet slice; `cols` and `rows` are half-open boundary index pairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Placement {
    #[serde(rename_all = "camelCase")]
    Cell {
        cols: [usize; 2],
        rows: [usize; 2],
        src: [usize; 2],
        #[serde(default)]
        align: Align,
        #[serde(default)]
        fill: bool,
        #[serde(default)]
        font_size: Option<f64>,
        #[serde(default = "default_line_width")]
        line_width: f64,
        #[serde(default)]
        height: Option<f64>,
        #[serde(default)]
        link: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    MultiRowCell {
        cols: [usize; 2],
        rows: [usize; 2],
        src: [usize; 2],
        #[serde(default)]
        align: Align,
        #[serde(default)]
        fill: bool,
        #[serde(default)]
        font_size: Option<f64>,
        #[serde(default = "default_true")]
        break_lines: bool,
    },
    /// Vertical label over every row of the table, or over `rows` only.
    Title {
        src: [usize; 2],
        #[serde(default)]
        rows: Option<[usize; 2]>,
    },
    #[serde(rename_all = "camelCase")]
    CellWithTitle {
        cols: [usize; 2],
        rows: [usize; 2],
        src: [usize; 2],
        #[serde(default = "default_center")]
        align: Align,
        #[serde(default)]
        fill: bool,
        #[serde(default)]
        font_size: Option<f64>,
    },
    #[serde(rename_all = "camelCase")]
    Appendix {
        src: [usize; 2],
        #[serde(default)]
        align: Align,
        #[serde(default)]
        fill: bool,
        #[serde(default)]
        font_size: Option<f64>,
    },
}

impl Placement {
    /// Name of the layout operation, as used in rejection warnings.
    pub fn operation(&self) -> &'static str {
        match self {
            Placement::Cell { .. } => "set_cell",
            Placement::MultiRowCell { .. } => "set_multi_row_cell",
            Placement::Title { .. } => "set_title",
            Placement::CellWithTitle { .. } => "set_cell_with_title",
            Placement::Appendix { .. } => "set_appendix",
        }
    }

    /// The source coordinate this placement reads.
    pub fn source(&self) -> [usize; 2] {
        match self {
            Placement::Cell { src, .. }
            | Placement::MultiRowCell { src, .. }
            | Placement::Title { src, .. }
            | Placement::CellWithTitle { src, .. }
            | Placement::Appendix { src, .. } => *src,
        }
    }
}

impl FormTemplate {
    pub fn from_json(json: &str) -> Result<Self, GridformError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, GridformError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// The embedded job-posting form.
pub fn default_template() -> Result<FormTemplate, GridformError> {
    FormTemplate::from_json(JOB_POSTING)
}

/// The embedded job-posting form as JSON text.
pub fn default_template_json() -> &'static str {
    JOB_POSTING
}

fn default_font() -> String {
    crate::font::DEFAULT_FAMILY.to_string()
}
fn default_page_margin() -> f64 {
    PAGE_MARGIN
}
fn default_fill() -> [u8; 3] {
    [153, 204, 255]
}
fn default_title_width() -> f64 {
    TITLE_WIDTH
}
fn default_max_rows() -> usize {
    DEFAULT_MAX_ROWS
}
fn default_max_cols() -> usize {
    DEFAULT_MAX_COLS
}
fn default_title_size() -> f64 {
    20.0
}
fn default_caption_size() -> f64 {
    7.0
}
fn default_columns() -> usize {
    9
}
fn default_rows() -> usize {
    1
}
fn default_true() -> bool {
    true
}
fn default_line_width() -> f64 {
    THIN_LINE
}
fn default_center() -> Align {
    Align::Center
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_template_parses() {
        let t = default_template().unwrap();
        assert_eq!(t.font, "IPA");
        assert_eq!(t.max_rows, 48);
        assert_eq!(t.max_cols, 30);
        assert_eq!(t.tables.len(), 8);
        assert!(t.tables.last().map(|t| t.appendix).unwrap_or(false));
        assert_eq!(t.output.fields, vec![[4, 2], [12, 2]]);
    }

    #[test]
    fn every_source_fits_the_slice() {
        let t = default_template().unwrap();
        for table in &t.tables {
            for p in &table.placements {
                let [r, c] = p.source();
                assert!(r < t.max_rows && c < t.max_cols, "{} reads ({}, {})", table.name, r, c);
            }
        }
    }

    #[test]
    fn placement_defaults() {
        let json = r#"{"op": "cell", "cols": [0, 1], "rows": [0, 1], "src": [3, 1]}"#;
        let p: Placement = serde_json::from_str(json).unwrap();
        match p {
            Placement::Cell { align, fill, line_width, height, .. } => {
                assert_eq!(align, Align::Left);
                assert!(!fill);
                assert_eq!(line_width, THIN_LINE);
                assert_eq!(height, None);
            }
            other => panic!("unexpected {:?}", other),
        }

        let json = r#"{"op": "multiRowCell", "cols": [1, 9], "rows": [0, 1], "src": [8, 2]}"#;
        let p: Placement = serde_json::from_str(json).unwrap();
        assert!(matches!(p, Placement::MultiRowCell { break_lines: true, .. }));
        assert_eq!(p.operation(), "set_multi_row_cell");
    }

    #[test]
    fn minimal_form_fills_defaults() {
        let json = r#"{
            "marginSide": 10, "marginTop": 10,
            "tables": [{"rowHeight": 4, "defaultHeight": 4.5, "fontSize": 6, "placements": []}]
        }"#;
        let t = FormTemplate::from_json(json).unwrap();
        assert_eq!(t.page_size, PageSize::A4);
        assert_eq!(t.unit, Unit::Mm);
        assert_eq!(t.font, "Helvetica");
        assert_eq!(t.fill_color, [153, 204, 255]);
        assert_eq!(t.tables[0].columns, 9);
        assert_eq!(t.tables[0].anchor, Anchor::Header);
        assert!(t.tables[0].title_column);
    }

    #[test]
    fn unknown_op_is_a_parse_error() {
        let json = r#"{"marginSide": 1, "marginTop": 1, "tables": [
            {"rowHeight": 4, "defaultHeight": 4, "fontSize": 6, "placements": [{"op": "image", "src": [0, 0]}]}
        ]}"#;
        let err = FormTemplate::from_json(json).unwrap_err();
        assert!(matches!(err, GridformError::ParseError { .. }));
    }

    #[test]
    fn round_trips_through_json() {
        let t = default_template().unwrap();
        let again = FormTemplate::from_json(&t.to_json().unwrap()).unwrap();
        assert_eq!(t, again);
    }
}
