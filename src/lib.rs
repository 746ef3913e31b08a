//! # gridform
//!
//! A fixed-layout form engine.
//!
//! A form is a stack of grids. Each grid has evenly spaced columns and rows
//! whose heights are discovered while cells are placed: a wrapped text cell
//! pushes its row boundary down, a short label next to it follows. When
//! content reaches the bottom margin it continues at the top of the next
//! page, and the vertical title beside the rows follows it there.
//!
//! ## Architecture
//!
//! ```text
//! Workbook (XLSX) ──► [source]   sheets as bounded string grids
//!                         ↓
//! Template (JSON) ──► [form]     which source cell goes where
//!                         ↓
//!                     [layout]   row boundaries, page breaks, titles
//!                         ↓      (measures through [sink])
//!                     [pdf]      PdfCanvas: content streams → PDF bytes
//! ```
//!
//! [`layout`] only talks to the [`sink::DrawingSink`] trait, so it can be
//! driven by any medium that measures strings and paints rectangles.

pub mod convert;
pub mod error;
pub mod font;
pub mod form;
pub mod layout;
pub mod pdf;
pub mod sink;
pub mod source;
pub mod template;
pub mod text;

pub use error::{GridformError, LayoutError, LayoutWarning, SinkError, SourceError};

use chrono::Local;

use font::FontContext;
use form::{Form, RenderedForm};
use source::XlsxWorkbook;
use template::default_template;

/// Render an XLSX workbook with the built-in job posting form.
///
/// Returns the PDF bytes together with the suggested file name and every
/// warning collected along the way.
pub fn render_xlsx(name: &str, bytes: &[u8]) -> Result<RenderedForm, GridformError> {
    let workbook = XlsxWorkbook::from_bytes(bytes).map_err(|source| GridformError::Source {
        file: name.to_string(),
        source,
    })?;
    let form = Form::new(default_template()?, FontContext::new());
    form.render(name, &workbook, Local::now().date_naive())
}
