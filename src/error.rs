//! Structured error types for the gridform engine.
//!
//! Placement calls return [`LayoutError`] when the caller asked for something
//! the grid cannot represent; the table is left untouched. Conditions the
//! engine can degrade around are [`LayoutWarning`]s, collected on the table
//! and handed back by the render pass. Drawing failures are [`SinkError`]s.
//! [`GridformError`] is the unified error of the document boundary.

use thiserror::Error;

/// A placement call was rejected. The table did not change.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LayoutError {
    #[error("row {row} has not been materialized (last row boundary is {materialized})")]
    RowOutOfRange { row: usize, materialized: usize },

    #[error("column boundary {col} is outside the grid ({columns} columns)")]
    ColumnOutOfRange { col: usize, columns: usize },

    #[error("span {start}..{end} is empty")]
    EmptySpan { start: usize, end: usize },

    #[error("text is {width:.2} wide but the span is only {available:.2}")]
    TextTooWide { width: f64, available: f64 },

    #[error("cell bottom {bottom:.2} exceeds the printable limit {limit:.2}")]
    ExceedsPage { bottom: f64, limit: f64 },

    #[error("content reaches {height:.2}, more than two page heights ({limit:.2})")]
    ExceedsTwoPages { height: f64, limit: f64 },
}

/// Something the layout worked around instead of rejecting.
#[derive(Debug, Clone, PartialEq)]
pub enum LayoutWarning {
    /// The table's top edge was below the page; it restarts on a new page
    /// at `restart_y`.
    StartBelowPage { y: f64, page_height: f64, restart_y: f64 },
    /// An appendix had more lines than fit the page; all were emitted.
    AppendixOverflow { lines: usize, containable: usize },
    /// A title was too tall for either page and was split by character.
    TitleSplit { first_page: usize, on_first_page: usize, total: usize },
    /// A placement call was rejected (collected by the form driver).
    Rejected { operation: String, error: LayoutError },
}

impl std::fmt::Display for LayoutWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LayoutWarning::StartBelowPage { y, page_height, restart_y } => write!(
                f,
                "table top {:.2} exceeds page height {:.2}; restarted at {:.2} on a new page",
                y, page_height, restart_y
            ),
            LayoutWarning::AppendixOverflow { lines, containable } => write!(
                f,
                "appendix has {} lines but only {} fit the page",
                lines, containable
            ),
            LayoutWarning::TitleSplit { first_page, on_first_page, total } => write!(
                f,
                "title split across pages: {} of {} characters on page {}",
                on_first_page, total, first_page
            ),
            LayoutWarning::Rejected { operation, error } => {
                write!(f, "{} rejected: {}", operation, error)
            }
        }
    }
}

/// A drawing sink could not carry out an operation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SinkError {
    #[error("no page has been added yet")]
    NoPage,

    #[error("font '{0}' could not be used")]
    UnknownFont(String),

    #[error("text could not be encoded: {0}")]
    Encoding(String),
}

/// Failures of the tabular data source.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("xml error in {part}: {message}")]
    Xml { part: String, message: String },

    #[error("missing part: {0}")]
    MissingPart(String),

    #[error("unknown section: {0}")]
    UnknownSection(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// The unified error type returned by the document-level API.
#[derive(Debug, Error)]
pub enum GridformError {
    /// JSON input failed to parse as a form template or batch.
    #[error("Failed to parse input: {source}{}", hint_suffix(.hint))]
    ParseError {
        source: serde_json::Error,
        hint: String,
    },

    /// A font could not be loaded or parsed.
    #[error("Font error: {0}")]
    FontError(String),

    #[error("Source error in {file}: {source}")]
    Source {
        file: String,
        #[source]
        source: SourceError,
    },

    #[error("Render error: {0}")]
    Render(#[from] SinkError),

    #[error("{file}: base64 decoding failed: {source}")]
    Decode {
        file: String,
        #[source]
        source: base64::DecodeError,
    },

    #[error("{file} has no sections")]
    NoSections { file: String },

    #[error("Output directory could not be determined")]
    NoOutputDir,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

fn hint_suffix(hint: &str) -> String {
    if hint.is_empty() {
        String::new()
    } else {
        format!("\n  Hint: {}", hint)
    }
}

impl From<serde_json::Error> for GridformError {
    fn from(e: serde_json::Error) -> Self {
        let hint = match e.classify() {
            serde_json::error::Category::Syntax => {
                "Check for trailing commas, missing quotes, or unescaped characters.".to_string()
            }
            serde_json::error::Category::Data => {
                "The JSON is valid but doesn't match the expected schema. Check field names and types.".to_string()
            }
            serde_json::error::Category::Eof => {
                "Unexpected end of input. Is the JSON truncated?".to_string()
            }
            serde_json::error::Category::Io => String::new(),
        };
        GridformError::ParseError { source: e, hint }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_carries_hint() {
        let err: GridformError = serde_json::from_str::<serde_json::Value>("{\"a\": 1,}")
            .unwrap_err()
            .into();
        let msg = err.to_string();
        assert!(msg.contains("Hint: Check for trailing commas"), "{}", msg);
    }

    #[test]
    fn rejection_warning_names_operation() {
        let w = LayoutWarning::Rejected {
            operation: "set_cell".to_string(),
            error: LayoutError::RowOutOfRange { row: 4, materialized: 1 },
        };
        assert_eq!(
            w.to_string(),
            "set_cell rejected: row 4 has not been materialized (last row boundary is 1)"
        );
    }
}
