//! # PDF Canvas
//!
//! A [`DrawingSink`] that records PDF content streams page by page and
//! serializes them with [`writer`].
//!
//! The canvas works in user units (millimetres by default) with the origin at
//! the top-left corner. PDF's own coordinate system has its origin at the
//! bottom-left and counts in points, so every operator is converted on the
//! way in.

mod writer;

use std::collections::BTreeSet;
use std::fmt::Write as FmtWrite;

use serde::{Deserialize, Serialize};

use crate::error::SinkError;
use crate::font::{FontContext, FontData, DEFAULT_FAMILY};
use crate::sink::{Align, CellDraw, DrawingSink, FontSize, RectStyle};
use writer::PdfWriter;

/// Points per millimetre.
const PT_PER_MM: f64 = 72.0 / 25.4;

/// Measurement unit of everything the canvas is told.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    #[default]
    Mm,
    Pt,
}

impl Unit {
    /// Scale factor from this unit to points.
    pub fn k(self) -> f64 {
        match self {
            Unit::Mm => PT_PER_MM,
            Unit::Pt => 1.0,
        }
    }
}

/// Page dimensions. Portrait only.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum PageSize {
    #[default]
    A4,
    A3,
    A5,
    Letter,
    Legal,
    /// Width and height in points.
    #[serde(rename = "custom")]
    Custom { width: f64, height: f64 },
}

impl PageSize {
    /// (width, height) in points.
    pub fn dimensions(&self) -> (f64, f64) {
        match self {
            PageSize::A4 => (595.28, 841.89),
            PageSize::A3 => (841.89, 1190.55),
            PageSize::A5 => (419.53, 595.28),
            PageSize::Letter => (612.0, 792.0),
            PageSize::Legal => (612.0, 1008.0),
            PageSize::Custom { width, height } => (*width, *height),
        }
    }
}

/// Document information dictionary entries.
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct LinkAnnotation {
    /// x1 y1 x2 y2 in PDF points.
    pub(crate) rect: [f64; 4],
    pub(crate) uri: String,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct CanvasPage {
    pub(crate) content: String,
    pub(crate) links: Vec<LinkAnnotation>,
}

/// An in-memory PDF document that layout code draws onto.
pub struct PdfCanvas {
    fonts: FontContext,
    k: f64,
    page_pt: (f64, f64),
    pages: Vec<CanvasPage>,
    family: String,
    size_pt: f64,
    line_width: f64,
    fill_color: (u8, u8, u8),
    /// Inner left/right padding of cell text, in user units.
    cell_margin: f64,
    /// Families in `/F<n>` order, with the characters drawn in each.
    fonts_used: Vec<(String, BTreeSet<char>)>,
}

impl PdfCanvas {
    pub fn new(size: PageSize, unit: Unit) -> Self {
        Self::with_fonts(size, unit, FontContext::new())
    }

    pub fn with_fonts(size: PageSize, unit: Unit, fonts: FontContext) -> Self {
        let k = unit.k();
        PdfCanvas {
            fonts,
            k,
            page_pt: size.dimensions(),
            pages: Vec::new(),
            family: DEFAULT_FAMILY.to_string(),
            size_pt: 12.0,
            line_width: 0.2 * PT_PER_MM / k,
            fill_color: (0, 0, 0),
            cell_margin: PT_PER_MM / k,
            fonts_used: Vec::new(),
        }
    }

    pub fn fonts(&self) -> &FontContext {
        &self.fonts
    }

    /// Current font family as requested by the caller.
    pub fn font_family(&self) -> &str {
        &self.family
    }

    /// The raw content stream of a page (1-based).
    pub fn page_content(&self, page: usize) -> Option<&str> {
        page.checked_sub(1)
            .and_then(|i| self.pages.get(i))
            .map(|p| p.content.as_str())
    }

    /// Serialize every page into a PDF file.
    pub fn finish(&self, metadata: &Metadata) -> Result<Vec<u8>, SinkError> {
        if self.pages.is_empty() {
            return Err(SinkError::NoPage);
        }
        tracing::debug!(pages = self.pages.len(), fonts = self.fonts_used.len(), "serializing pdf");
        PdfWriter::write(&self.pages, self.page_pt, &self.fonts_used, &self.fonts, metadata)
    }

    fn current_page(&mut self) -> Result<&mut CanvasPage, SinkError> {
        self.pages.last_mut().ok_or(SinkError::NoPage)
    }

    /// Index of the current font in the resource dictionary, registering it
    /// on first use.
    fn font_slot(&mut self) -> usize {
        let name = self.fonts.resolve(&self.family).0.to_string();
        match self.fonts_used.iter().position(|(n, _)| *n == name) {
            Some(i) => i,
            None => {
                self.fonts_used.push((name, BTreeSet::new()));
                self.fonts_used.len() - 1
            }
        }
    }

    /// Encode `text` for the current font as a `Tj` operand.
    fn encode_text(&self, text: &str) -> String {
        match self.fonts.resolve(&self.family).1 {
            FontData::Custom { metrics, .. } => {
                let mut hex = String::from("<");
                for ch in text.chars() {
                    let gid = metrics.glyph_ids.get(&ch).copied().unwrap_or(0);
                    let _ = write!(hex, "{:04X}", gid);
                }
                hex.push('>');
                hex
            }
            FontData::Standard(_) => {
                let mut out = String::from("(");
                for ch in text.chars() {
                    let b = PdfWriter::unicode_to_winansi(ch).unwrap_or(b'?');
                    match b {
                        b'\\' => out.push_str("\\\\"),
                        b'(' => out.push_str("\\("),
                        b')' => out.push_str("\\)"),
                        0x20..=0x7E => out.push(b as char),
                        _ => {
                            let _ = write!(out, "\\{:03o}", b);
                        }
                    }
                }
                out.push(')');
                out
            }
        }
    }

    /// Write `text` with its baseline at (`x`, `y`) in user units.
    fn show_text(&mut self, x: f64, y: f64, text: &str) -> Result<(), SinkError> {
        if self.pages.is_empty() {
            return Err(SinkError::NoPage);
        }
        let slot = self.font_slot();
        self.fonts_used[slot].1.extend(text.chars());
        let encoded = self.encode_text(text);
        let (px, py) = (x * self.k, self.page_pt.1 - y * self.k);
        let size = self.size_pt;
        let page = self.current_page()?;
        let _ = write!(
            page.content,
            "BT\n0 g\n/F{} {:.2} Tf\n{:.2} {:.2} Td\n{} Tj\nET\n",
            slot, size, px, py, encoded
        );
        Ok(())
    }

    fn paint_rect(&mut self, x: f64, y: f64, w: f64, h: f64, style: RectStyle) -> Result<(), SinkError> {
        let k = self.k;
        let (px, py) = (x * k, self.page_pt.1 - (y + h) * k);
        let (pw, ph) = (w * k, h * k);
        let (r, g, b) = self.fill_color;
        let line_width = self.line_width * k;
        let page = self.current_page()?;
        match style {
            RectStyle::Filled => {
                let _ = write!(
                    page.content,
                    "q\n{:.3} {:.3} {:.3} rg\n{:.2} {:.2} {:.2} {:.2} re\nf\nQ\n",
                    r as f64 / 255.0,
                    g as f64 / 255.0,
                    b as f64 / 255.0,
                    px,
                    py,
                    pw,
                    ph
                );
            }
            RectStyle::Outlined => {
                let _ = write!(
                    page.content,
                    "q\n0 0 0 RG\n{:.2} w\n{:.2} {:.2} {:.2} {:.2} re\nS\nQ\n",
                    line_width, px, py, pw, ph
                );
            }
        }
        Ok(())
    }
}

impl DrawingSink for PdfCanvas {
    fn string_width(&self, text: &str) -> f64 {
        self.fonts.measure_string(text, &self.family, self.size_pt) / self.k
    }

    fn set_font(&mut self, family: &str, size_pt: f64) {
        if !self.fonts.registry().contains(family) {
            tracing::debug!(family, "font not registered, measuring with {}", DEFAULT_FAMILY);
        }
        self.family = family.to_string();
        self.size_pt = size_pt;
    }

    fn set_font_size(&mut self, size_pt: f64) {
        self.size_pt = size_pt;
    }

    fn font_size(&self) -> FontSize {
        FontSize {
            pt: self.size_pt,
            unit: self.size_pt / self.k,
        }
    }

    fn page_size(&self) -> (f64, f64) {
        (self.page_pt.0 / self.k, self.page_pt.1 / self.k)
    }

    fn page_no(&self) -> usize {
        self.pages.len()
    }

    fn add_page(&mut self) {
        self.pages.push(CanvasPage::default());
    }

    fn set_line_width(&mut self, width: f64) {
        self.line_width = width;
    }

    fn set_fill_color(&mut self, r: u8, g: u8, b: u8) {
        self.fill_color = (r, g, b);
    }

    fn rect(&mut self, x: f64, y: f64, w: f64, h: f64, style: RectStyle) -> Result<(), SinkError> {
        self.paint_rect(x, y, w, h, style)
    }

    fn cell(&mut self, cell: &CellDraw<'_>) -> Result<(), SinkError> {
        if self.pages.is_empty() {
            return Err(SinkError::NoPage);
        }
        if cell.fill {
            self.paint_rect(cell.x, cell.y, cell.w, cell.h, RectStyle::Filled)?;
        }
        if cell.border {
            self.paint_rect(cell.x, cell.y, cell.w, cell.h, RectStyle::Outlined)?;
        }
        if !cell.text.is_empty() {
            let width = self.string_width(cell.text);
            let dx = match cell.align {
                Align::Left => self.cell_margin,
                Align::Center => (cell.w - width) / 2.0,
                Align::Right => cell.w - self.cell_margin - width,
            };
            let baseline = cell.y + 0.5 * cell.h + 0.3 * self.font_size().unit;
            self.show_text(cell.x + dx, baseline, cell.text)?;
        }
        if let Some(uri) = cell.link.filter(|l| !l.is_empty()) {
            let k = self.k;
            let top = self.page_pt.1 - cell.y * k;
            let rect = [cell.x * k, top - cell.h * k, (cell.x + cell.w) * k, top];
            self.current_page()?.links.push(LinkAnnotation {
                rect,
                uri: uri.to_string(),
            });
        }
        Ok(())
    }

    fn text(&mut self, x: f64, y: f64, text: &str) -> Result<(), SinkError> {
        self.show_text(x, y, text)
    }
}
