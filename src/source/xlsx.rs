//! Minimal XLSX reader: worksheet names, shared strings, and cell text.
//!
//! Only what a form needs is read. Styles, formulas and number formats are
//! ignored; a cell's value is the text stored in it.

use std::collections::HashMap;
use std::io::{Cursor, Read};

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use zip::ZipArchive;

use super::{SheetData, TabularSource};
use crate::error::SourceError;

const WORKBOOK_PART: &str = "xl/workbook.xml";
const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.xml.rels";
const SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";

/// A parsed workbook. Sheets are kept as raw XML and parsed on demand.
#[derive(Debug, Clone)]
pub struct XlsxWorkbook {
    /// (sheet name, worksheet XML) in workbook order.
    sheets: Vec<(String, String)>,
    shared_strings: Vec<String>,
}

impl XlsxWorkbook {
    pub fn from_bytes(data: &[u8]) -> Result<Self, SourceError> {
        let mut archive = ZipArchive::new(Cursor::new(data))?;

        let workbook = read_part(&mut archive, WORKBOOK_PART)?
            .ok_or_else(|| SourceError::MissingPart(WORKBOOK_PART.to_string()))?;
        let rels = read_part(&mut archive, WORKBOOK_RELS_PART)?
            .ok_or_else(|| SourceError::MissingPart(WORKBOOK_RELS_PART.to_string()))?;
        let shared_strings = match read_part(&mut archive, SHARED_STRINGS_PART)? {
            Some(xml) => parse_shared_strings(&xml)?,
            None => Vec::new(),
        };

        let targets = parse_relationships(&rels)?;
        let mut sheets = Vec::new();
        for (name, rel_id) in parse_sheet_list(&workbook)? {
            let target = targets
                .get(&rel_id)
                .ok_or_else(|| SourceError::MissingPart(format!("relationship {}", rel_id)))?;
            let path = resolve_target(target);
            let xml = read_part(&mut archive, &path)?.ok_or(SourceError::MissingPart(path))?;
            sheets.push((name, xml));
        }

        tracing::debug!(sheets = sheets.len(), shared = shared_strings.len(), "opened workbook");
        Ok(XlsxWorkbook {
            sheets,
            shared_strings,
        })
    }
}

impl TabularSource for XlsxWorkbook {
    fn sections(&self) -> Vec<String> {
        self.sheets.iter().map(|(name, _)| name.clone()).collect()
    }

    fn slice(&self, section: &str, max_rows: usize, max_cols: usize) -> Result<SheetData, SourceError> {
        let xml = self
            .sheets
            .iter()
            .find(|(name, _)| name == section)
            .map(|(_, xml)| xml)
            .ok_or_else(|| SourceError::UnknownSection(section.to_string()))?;
        let rows = parse_worksheet(xml, &self.shared_strings, max_rows, max_cols)?;
        Ok(SheetData::from_rows(rows, max_rows, max_cols))
    }
}

fn read_part(archive: &mut ZipArchive<Cursor<&[u8]>>, name: &str) -> Result<Option<String>, SourceError> {
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut xml = String::new();
    file.read_to_string(&mut xml)?;
    Ok(Some(xml))
}

fn xml_error(part: &str, e: impl std::fmt::Display) -> SourceError {
    SourceError::Xml {
        part: part.to_string(),
        message: e.to_string(),
    }
}

fn attribute(e: &BytesStart<'_>, local: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == local)
        .map(|a| {
            a.unescape_value()
                .map(|v| v.into_owned())
                .unwrap_or_else(|_| String::from_utf8_lossy(&a.value).into_owned())
        })
}

/// `<sheet name=".." r:id="rIdN"/>` entries in order.
fn parse_sheet_list(xml: &str) -> Result<Vec<(String, String)>, SourceError> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    let mut sheets = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) if e.local_name().as_ref() == b"sheet" => {
                if let (Some(name), Some(id)) = (attribute(e, b"name"), attribute(e, b"id")) {
                    sheets.push((name, id));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(WORKBOOK_PART, e)),
            _ => {}
        }
        buf.clear();
    }
    Ok(sheets)
}

/// Relationship id to target path.
fn parse_relationships(xml: &str) -> Result<HashMap<String, String>, SourceError> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    let mut targets = HashMap::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e))
                if e.local_name().as_ref() == b"Relationship" =>
            {
                if let (Some(id), Some(target)) = (attribute(e, b"Id"), attribute(e, b"Target")) {
                    targets.insert(id, target);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(WORKBOOK_RELS_PART, e)),
            _ => {}
        }
        buf.clear();
    }
    Ok(targets)
}

/// Relationship targets are relative to `xl/` unless absolute.
fn resolve_target(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{}", target),
    }
}

/// Each `<si>` becomes one string: the concatenation of its `<t>` runs,
/// skipping phonetic guides.
fn parse_shared_strings(xml: &str) -> Result<Vec<String>, SourceError> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    let mut strings = Vec::new();
    let mut current = String::new();
    let mut in_text = false;
    let mut phonetic_depth = 0usize;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                b"si" => current.clear(),
                b"t" => in_text = true,
                b"rPh" => phonetic_depth += 1,
                _ => {}
            },
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"si" => strings.push(std::mem::take(&mut current)),
                b"t" => in_text = false,
                b"rPh" => phonetic_depth = phonetic_depth.saturating_sub(1),
                _ => {}
            },
            Ok(Event::Empty(ref e)) if e.local_name().as_ref() == b"si" => strings.push(String::new()),
            Ok(Event::Text(ref e)) if in_text && phonetic_depth == 0 => {
                let text = e.unescape().map_err(|e| xml_error(SHARED_STRINGS_PART, e))?;
                current.push_str(&text);
            }
            Ok(Event::CData(ref e)) if in_text && phonetic_depth == 0 => {
                current.push_str(&String::from_utf8_lossy(e));
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(SHARED_STRINGS_PART, e)),
            _ => {}
        }
        buf.clear();
    }
    Ok(strings)
}

/// Split an A1-style reference into zero-based (row, column).
pub(crate) fn parse_cell_ref(reference: &str) -> Option<(usize, usize)> {
    let split = reference.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = reference.split_at(split);
    if letters.is_empty() {
        return None;
    }
    let mut col = 0usize;
    for ch in letters.chars() {
        if !ch.is_ascii_alphabetic() {
            return None;
        }
        col = col
            .checked_mul(26)?
            .checked_add(ch.to_ascii_uppercase() as usize - 'A' as usize + 1)?;
    }
    let row: usize = digits.parse().ok()?;
    if row == 0 {
        return None;
    }
    Some((row - 1, col - 1))
}

#[derive(Default)]
struct PendingCell {
    row: usize,
    col: usize,
    kind: Option<String>,
    value: String,
}

/// Read the cells of a worksheet into ragged rows, keeping only the top-left
/// `max_rows` × `max_cols` block.
fn parse_worksheet(
    xml: &str,
    shared: &[String],
    max_rows: usize,
    max_cols: usize,
) -> Result<Vec<Vec<String>>, SourceError> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    let mut rows: Vec<Vec<String>> = Vec::new();

    let mut row_index: Option<usize> = None;
    let mut next_col = 0usize;
    let mut cell: Option<PendingCell> = None;
    let mut in_value = false;

    let store = |rows: &mut Vec<Vec<String>>, pending: PendingCell| {
        if pending.row >= max_rows || pending.col >= max_cols {
            return;
        }
        let text = match pending.kind.as_deref() {
            Some("s") => pending
                .value
                .trim()
                .parse::<usize>()
                .ok()
                .and_then(|i| shared.get(i).cloned())
                .unwrap_or_default(),
            Some("b") => match pending.value.trim() {
                "1" => "TRUE".to_string(),
                "0" => "FALSE".to_string(),
                other => other.to_string(),
            },
            _ => pending.value,
        };
        if rows.len() <= pending.row {
            rows.resize_with(pending.row + 1, Vec::new);
        }
        let cells = &mut rows[pending.row];
        if cells.len() <= pending.col {
            cells.resize(pending.col + 1, String::new());
        }
        cells[pending.col] = text;
    };

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                b"row" => {
                    let explicit = attribute(e, b"r").and_then(|r| r.parse::<usize>().ok());
                    let index = match explicit {
                        Some(r) if r > 0 => r - 1,
                        _ => row_index.map_or(0, |i| i.saturating_add(1)),
                    };
                    row_index = Some(index);
                    next_col = 0;
                }
                b"c" => cell = Some(start_cell(e, row_index.unwrap_or(0), &mut next_col)),
                b"v" | b"t" => in_value = cell.is_some(),
                _ => {}
            },
            Ok(Event::Empty(ref e)) => match e.local_name().as_ref() {
                b"row" => {
                    let explicit = attribute(e, b"r").and_then(|r| r.parse::<usize>().ok());
                    row_index = match explicit {
                        Some(r) if r > 0 => Some(r - 1),
                        _ => Some(row_index.map_or(0, |i| i.saturating_add(1))),
                    };
                }
                b"c" => {
                    start_cell(e, row_index.unwrap_or(0), &mut next_col);
                }
                _ => {}
            },
            Ok(Event::Text(ref e)) if in_value => {
                let text = e.unescape().map_err(|err| xml_error("worksheet", err))?;
                if let Some(pending) = cell.as_mut() {
                    pending.value.push_str(&text);
                }
            }
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"v" | b"t" => in_value = false,
                b"c" => {
                    if let Some(pending) = cell.take() {
                        store(&mut rows, pending);
                    }
                }
                b"sheetData" => break,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error("worksheet", e)),
            _ => {}
        }
        buf.clear();
    }
    Ok(rows)
}

fn start_cell(e: &BytesStart<'_>, row: usize, next_col: &mut usize) -> PendingCell {
    let (row, col) = attribute(e, b"r")
        .and_then(|r| parse_cell_ref(&r))
        .unwrap_or((row, *next_col));
    *next_col = col.saturating_add(1);
    PendingCell {
        row,
        col,
        kind: attribute(e, b"t"),
        value: String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_refs() {
        assert_eq!(parse_cell_ref("A1"), Some((0, 0)));
        assert_eq!(parse_cell_ref("AD48"), Some((47, 29)));
        assert_eq!(parse_cell_ref("c5"), Some((4, 2)));
        assert_eq!(parse_cell_ref("A0"), None);
        assert_eq!(parse_cell_ref("12"), None);
        assert_eq!(parse_cell_ref("XFD1048576"), Some((1_048_575, 16_383)));
        assert_eq!(parse_cell_ref("AAAAAAAAAAAAAAAAAAAA1"), None);
    }

    #[test]
    fn malformed_refs_fall_back_to_position() {
        let xml = r#"<worksheet><sheetData>
            <row r="1"><c r="AAAAAAAAAAAAAAAAAAAA1"><v>long</v></c><c><v>next</v></c></row>
            <row r="18446744073709551615"><c><v>x</v></c></row>
            <row><c><v>after</v></c></row>
        </sheetData></worksheet>"#;
        let rows = parse_worksheet(xml, &[], 48, 30).unwrap();
        let data = SheetData::from_rows(rows, 48, 30);
        assert_eq!(data.get(0, 0), "long");
        assert_eq!(data.get(0, 1), "next");
        assert_eq!(data.get(1, 0), "");
    }

    #[test]
    fn shared_strings_skip_phonetics() {
        let xml = r#"<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
            <si><t>求人票</t></si>
            <si><r><t>Acme </t></r><r><t>&amp; Co</t></r><rPh sb="0" eb="1"><t>アクメ</t></rPh></si>
            <si/>
        </sst>"#;
        let strings = parse_shared_strings(xml).unwrap();
        assert_eq!(strings, vec!["求人票", "Acme & Co", ""]);
    }

    #[test]
    fn worksheet_cells_by_type() {
        let shared = vec!["hello".to_string()];
        let xml = r#"<worksheet><sheetData>
            <row r="1"><c r="A1" t="s"><v>0</v></c><c r="C1"><v>42</v></c></row>
            <row r="3"><c r="B3" t="inlineStr"><is><t>inline</t></is></c><c t="b"><v>1</v></c></row>
            <row r="60"><c r="A60"><v>ignored</v></c></row>
        </sheetData></worksheet>"#;
        let rows = parse_worksheet(xml, &shared, 48, 30).unwrap();
        let data = SheetData::from_rows(rows, 48, 30);
        assert_eq!(data.get(0, 0), "hello");
        assert_eq!(data.get(0, 1), "");
        assert_eq!(data.get(0, 2), "42");
        assert_eq!(data.get(2, 1), "inline");
        assert_eq!(data.get(2, 2), "TRUE");
        assert_eq!(data.get(47, 0), "");
    }

    #[test]
    fn relationship_targets_resolve_under_xl() {
        assert_eq!(resolve_target("worksheets/sheet1.xml"), "xl/worksheets/sheet1.xml");
        assert_eq!(resolve_target("/xl/worksheets/sheet2.xml"), "xl/worksheets/sheet2.xml");
    }

    #[test]
    fn garbage_is_an_archive_error() {
        assert!(matches!(
            XlsxWorkbook::from_bytes(b"not a zip"),
            Err(SourceError::Archive(_))
        ));
    }
}
