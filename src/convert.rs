//! Batch conversion of workbooks to PDF files on disk.

use std::fs;
use std::path::{Path, PathBuf};

use base64::Engine as _;
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{GridformError, LayoutWarning};
use crate::form::{Form, FormReport};
use crate::source::XlsxWorkbook;

/// One uploaded workbook. `data` is the base64-encoded file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileData {
    pub name: String,
    pub data: String,
}

/// A written PDF.
#[derive(Debug, Clone)]
pub struct ConvertOutcome {
    pub source: String,
    pub path: PathBuf,
    pub pages: usize,
    pub report: FormReport,
}

impl ConvertOutcome {
    pub fn warnings(&self) -> &[LayoutWarning] {
        &self.report.warnings
    }
}

/// Renders workbooks with one form and writes them into `out_dir`.
pub struct Converter {
    form: Form,
    out_dir: PathBuf,
    today: NaiveDate,
}

impl Converter {
    pub fn new(form: Form, out_dir: impl Into<PathBuf>) -> Self {
        Converter {
            form,
            out_dir: out_dir.into(),
            today: Local::now().date_naive(),
        }
    }

    /// Fix the date used in date-stamped file names.
    pub fn with_date(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Render one XLSX payload and write it. An existing file of the same
    /// name is replaced.
    pub fn convert_bytes(&self, name: &str, bytes: &[u8]) -> Result<ConvertOutcome, GridformError> {
        let workbook = XlsxWorkbook::from_bytes(bytes).map_err(|source| GridformError::Source {
            file: name.to_string(),
            source,
        })?;
        let rendered = self.form.render(name, &workbook, self.today)?;

        fs::create_dir_all(&self.out_dir)?;
        let path = self.out_dir.join(&rendered.file_name);
        fs::write(&path, &rendered.pdf)?;
        tracing::info!(
            file = name,
            path = %path.display(),
            pages = rendered.pages,
            warnings = rendered.report.warnings.len(),
            "wrote pdf"
        );

        Ok(ConvertOutcome {
            source: name.to_string(),
            path,
            pages: rendered.pages,
            report: rendered.report,
        })
    }

    /// Read and convert a workbook file.
    pub fn convert_path(&self, path: &Path) -> Result<ConvertOutcome, GridformError> {
        let bytes = fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        self.convert_bytes(&name, &bytes)
    }

    /// Convert every entry in order. The first failure stops the batch;
    /// files written before it stay on disk.
    pub fn convert_batch(&self, files: &[FileData]) -> Result<Vec<ConvertOutcome>, GridformError> {
        let mut outcomes = Vec::with_capacity(files.len());
        for file in files {
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(file.data.trim())
                .map_err(|source| GridformError::Decode {
                    file: file.name.clone(),
                    source,
                })?;
            outcomes.push(self.convert_bytes(&file.name, &bytes)?);
        }
        Ok(outcomes)
    }
}

/// Parse a JSON array of `{name, data}` entries.
pub fn parse_batch(json: &str) -> Result<Vec<FileData>, GridformError> {
    Ok(serde_json::from_str(json)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::FontContext;
    use crate::template::default_template;

    fn converter(dir: &Path) -> Converter {
        let form = Form::new(default_template().unwrap(), FontContext::new());
        Converter::new(form, dir).with_date(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap())
    }

    #[test]
    fn bad_base64_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let files = vec![FileData {
            name: "broken.xlsx".to_string(),
            data: "***".to_string(),
        }];
        let err = converter(dir.path()).convert_batch(&files).unwrap_err();
        assert!(matches!(err, GridformError::Decode { ref file, .. } if file == "broken.xlsx"));
    }

    #[test]
    fn non_workbook_is_a_source_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = converter(dir.path())
            .convert_bytes("notes.txt", b"plain text")
            .unwrap_err();
        assert!(matches!(err, GridformError::Source { ref file, .. } if file == "notes.txt"));
        assert!(err.to_string().contains("notes.txt"));
    }

    #[test]
    fn parses_batch_json() {
        let files = parse_batch(r#"[{"name": "a.xlsx", "data": "UEs="}]"#).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "a.xlsx");
        assert!(parse_batch("{}").is_err());
    }
}
