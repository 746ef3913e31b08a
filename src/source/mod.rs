//! # Tabular Sources
//!
//! Where form values come from. A source lists its sections (worksheets)
//! and hands out a bounded rectangular slice of each as strings.

pub mod xlsx;

pub use xlsx::XlsxWorkbook;

use crate::error::SourceError;

/// Default row cap of a slice (rows 1..=48 of a sheet).
pub const DEFAULT_MAX_ROWS: usize = 48;
/// Default column cap of a slice (columns A..=AD).
pub const DEFAULT_MAX_COLS: usize = 30;

/// A spreadsheet-like input made of named sections.
pub trait TabularSource {
    /// Section names in document order.
    fn sections(&self) -> Vec<String>;

    /// The top-left `max_rows` × `max_cols` block of `section`.
    fn slice(&self, section: &str, max_rows: usize, max_cols: usize) -> Result<SheetData, SourceError>;
}

/// A rectangular block of string cells. Every cell inside the bounds exists;
/// cells the source did not have are empty.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SheetData {
    rows: Vec<Vec<String>>,
}

impl SheetData {
    /// Build a `max_rows` × `max_cols` block from ragged rows, padding and
    /// truncating as needed.
    pub fn from_rows(rows: Vec<Vec<String>>, max_rows: usize, max_cols: usize) -> Self {
        let mut rows: Vec<Vec<String>> = rows
            .into_iter()
            .take(max_rows)
            .map(|mut row| {
                row.truncate(max_cols);
                row.resize(max_cols, String::new());
                row
            })
            .collect();
        rows.resize_with(max_rows, || vec![String::new(); max_cols]);
        SheetData { rows }
    }

    /// The value at zero-based (`row`, `col`), or "" outside the block.
    pub fn get(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn col_count(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }
}

/// A source held entirely in memory, mostly for tests and for callers that
/// already have their values.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    sections: Vec<(String, Vec<Vec<String>>)>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_section(mut self, name: impl Into<String>, rows: Vec<Vec<String>>) -> Self {
        self.sections.push((name.into(), rows));
        self
    }

    /// Set one cell, creating the section and growing its rows as needed.
    pub fn set(&mut self, section: &str, row: usize, col: usize, value: impl Into<String>) {
        let index = match self.sections.iter().position(|(n, _)| n == section) {
            Some(i) => i,
            None => {
                self.sections.push((section.to_string(), Vec::new()));
                self.sections.len() - 1
            }
        };
        let rows = &mut self.sections[index].1;
        if rows.len() <= row {
            rows.resize_with(row + 1, Vec::new);
        }
        let cells = &mut rows[row];
        if cells.len() <= col {
            cells.resize(col + 1, String::new());
        }
        cells[col] = value.into();
    }
}

impl TabularSource for MemorySource {
    fn sections(&self) -> Vec<String> {
        self.sections.iter().map(|(n, _)| n.clone()).collect()
    }

    fn slice(&self, section: &str, max_rows: usize, max_cols: usize) -> Result<SheetData, SourceError> {
        let rows = self
            .sections
            .iter()
            .find(|(n, _)| n == section)
            .map(|(_, rows)| rows.clone())
            .ok_or_else(|| SourceError::UnknownSection(section.to_string()))?;
        Ok(SheetData::from_rows(rows, max_rows, max_cols))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slice_pads_and_truncates() {
        let rows = vec![
            vec!["a".to_string(), "b".to_string(), "c".to_string()],
            vec!["d".to_string()],
        ];
        let data = SheetData::from_rows(rows, 3, 2);
        assert_eq!(data.row_count(), 3);
        assert_eq!(data.col_count(), 2);
        assert_eq!(data.get(0, 1), "b");
        assert_eq!(data.get(0, 2), "");
        assert_eq!(data.get(1, 1), "");
        assert_eq!(data.get(2, 0), "");
        assert_eq!(data.get(99, 99), "");
    }

    #[test]
    fn memory_source_sets_cells() {
        let mut src = MemorySource::new();
        src.set("Sheet1", 4, 2, "Acme");
        src.set("Sheet1", 0, 0, "x");
        assert_eq!(src.sections(), vec!["Sheet1".to_string()]);
        let data = src.slice("Sheet1", DEFAULT_MAX_ROWS, DEFAULT_MAX_COLS).unwrap();
        assert_eq!(data.get(4, 2), "Acme");
        assert_eq!(data.get(0, 0), "x");
        assert_eq!(data.row_count(), 48);
    }

    #[test]
    fn unknown_section_is_an_error() {
        let src = MemorySource::new();
        assert!(matches!(
            src.slice("nope", 1, 1),
            Err(SourceError::UnknownSection(name)) if name == "nope"
        ));
    }
}
