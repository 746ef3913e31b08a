//! # Font Management
//!
//! Resolves font family names to metrics for measurement and to the data the
//! PDF writer needs for embedding.
//!
//! Helvetica is always available and needs no embedding. TrueType fonts are
//! registered by family name and parsed with ttf-parser; a family that was
//! never registered falls back to Helvetica.

pub mod metrics;

pub use metrics::StandardFontMetrics;
use std::collections::HashMap;

use crate::error::GridformError;

/// The family every unknown name resolves to.
pub const DEFAULT_FAMILY: &str = "Helvetica";

#[derive(Debug, Clone)]
pub enum FontData {
    /// The standard Helvetica face. No embedding needed.
    Standard(StandardFontMetrics),
    /// A TrueType/OpenType font that needs to be embedded.
    Custom {
        data: Vec<u8>,
        metrics: CustomFontMetrics,
    },
}

/// Parsed metrics from a TrueType/OpenType font via ttf-parser.
#[derive(Debug, Clone)]
pub struct CustomFontMetrics {
    pub units_per_em: u16,
    pub advance_widths: HashMap<char, u16>,
    pub default_advance: u16,
    pub ascender: i16,
    pub descender: i16,
    /// Maps characters to their glyph IDs in the original font.
    pub glyph_ids: HashMap<char, u16>,
}

impl CustomFontMetrics {
    /// Get the advance width of a character in points.
    pub fn char_width(&self, ch: char, font_size: f64) -> f64 {
        let w = self
            .advance_widths
            .get(&ch)
            .copied()
            .unwrap_or(self.default_advance);
        (w as f64 / self.units_per_em as f64) * font_size
    }

    /// Parse metrics from font data using ttf-parser.
    pub fn from_font_data(data: &[u8]) -> Option<Self> {
        let face = ttf_parser::Face::parse(data, 0).ok()?;
        let units_per_em = face.units_per_em();
        let ascender = face.ascender();
        let descender = face.descender();

        let mut advance_widths = HashMap::new();
        let mut glyph_ids = HashMap::new();
        let mut default_advance = 0u16;

        // Walk the BMP; the form content is Japanese text plus ASCII
        for code in 32u32..=0xFFFF {
            if let Some(ch) = char::from_u32(code) {
                if let Some(glyph_id) = face.glyph_index(ch) {
                    let advance = face.glyph_hor_advance(glyph_id).unwrap_or(0);
                    advance_widths.insert(ch, advance);
                    glyph_ids.insert(ch, glyph_id.0);
                    if ch == ' ' {
                        default_advance = advance;
                    }
                }
            }
        }

        if default_advance == 0 {
            default_advance = units_per_em / 2;
        }

        Some(CustomFontMetrics {
            units_per_em,
            advance_widths,
            default_advance,
            ascender,
            descender,
            glyph_ids,
        })
    }
}

/// A font registry that maps family names to font data.
#[derive(Clone)]
pub struct FontRegistry {
    fonts: HashMap<String, FontData>,
}

impl Default for FontRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FontRegistry {
    pub fn new() -> Self {
        let mut fonts = HashMap::new();
        fonts.insert(
            DEFAULT_FAMILY.to_string(),
            FontData::Standard(StandardFontMetrics::HELVETICA),
        );
        Self { fonts }
    }

    /// Look up a font, falling back to Helvetica if not found.
    pub fn resolve(&self, family: &str) -> (&str, &FontData) {
        match self.fonts.get_key_value(family) {
            Some((name, data)) => (name.as_str(), data),
            None => (DEFAULT_FAMILY, &DEFAULT_FONT),
        }
    }

    /// Register a TrueType font under `family`.
    pub fn register(&mut self, family: &str, data: Vec<u8>) -> Result<(), GridformError> {
        let metrics = CustomFontMetrics::from_font_data(&data).ok_or_else(|| {
            GridformError::FontError(format!("'{}' is not a parseable TrueType font", family))
        })?;
        self.fonts
            .insert(family.to_string(), FontData::Custom { data, metrics });
        Ok(())
    }

    pub fn contains(&self, family: &str) -> bool {
        self.fonts.contains_key(family)
    }
}

static DEFAULT_FONT: FontData = FontData::Standard(StandardFontMetrics::HELVETICA);

/// Shared font context used by measurement and PDF serialization.
#[derive(Default, Clone)]
pub struct FontContext {
    registry: FontRegistry,
}

impl FontContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the advance width of a single character in points.
    pub fn char_width(&self, ch: char, family: &str, font_size: f64) -> f64 {
        match self.registry.resolve(family).1 {
            FontData::Standard(m) => m.char_width(ch, font_size),
            FontData::Custom { metrics, .. } => metrics.char_width(ch, font_size),
        }
    }

    /// Measure the width of a string in points.
    pub fn measure_string(&self, text: &str, family: &str, font_size: f64) -> f64 {
        match self.registry.resolve(family).1 {
            FontData::Standard(m) => m.measure_string(text, font_size),
            FontData::Custom { metrics, .. } => {
                text.chars().map(|ch| metrics.char_width(ch, font_size)).sum()
            }
        }
    }

    /// Resolve a family to its canonical name and font data.
    pub fn resolve(&self, family: &str) -> (&str, &FontData) {
        self.registry.resolve(family)
    }

    pub fn registry(&self) -> &FontRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut FontRegistry {
        &mut self.registry
    }
}
