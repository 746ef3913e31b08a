//! Built-in metrics for the standard Helvetica face.
//!
//! Widths are in 1/1000 em, straight from the Adobe AFM for the printable
//! ASCII range. Anything outside that range gets a fixed fallback so that
//! measuring never fails.

/// Advance widths for U+0020..=U+007E.
const HELVETICA_ASCII: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // '0'..'9'
    278, 278, 584, 584, 584, 556, 1015, // ':'..'@'
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, // 'A'..'M'
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // 'N'..'Z'
    278, 278, 278, 469, 556, 333, // '['..'`'
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, // 'a'..'m'
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, // 'n'..'z'
    334, 260, 334, 584, // '{'..'~'
];

const FALLBACK_WIDTH: u16 = 556;
const FULL_WIDTH: u16 = 1000;

/// Width table for one of the standard PDF fonts.
#[derive(Debug, Clone, Copy)]
pub struct StandardFontMetrics {
    ascii: &'static [u16; 95],
}

impl StandardFontMetrics {
    pub const HELVETICA: StandardFontMetrics = StandardFontMetrics {
        ascii: &HELVETICA_ASCII,
    };

    /// Width of one character in 1/1000 em.
    pub fn char_units(&self, ch: char) -> u16 {
        let cp = ch as u32;
        if (0x20..=0x7E).contains(&cp) {
            return self.ascii[(cp - 0x20) as usize];
        }
        if is_full_width(ch) {
            FULL_WIDTH
        } else {
            FALLBACK_WIDTH
        }
    }

    /// Width of one character in points.
    pub fn char_width(&self, ch: char, font_size: f64) -> f64 {
        self.char_units(ch) as f64 / 1000.0 * font_size
    }

    pub fn measure_string(&self, text: &str, font_size: f64) -> f64 {
        text.chars().map(|ch| self.char_width(ch, font_size)).sum()
    }
}

/// CJK ideographs, kana, hangul, and the full-width forms block.
fn is_full_width(ch: char) -> bool {
    matches!(ch as u32,
        0x1100..=0x115F
        | 0x2E80..=0x303E
        | 0x3040..=0x33FF
        | 0x3400..=0x4DBF
        | 0x4E00..=0x9FFF
        | 0xA960..=0xA97F
        | 0xAC00..=0xD7A3
        | 0xF900..=0xFAFF
        | 0xFE30..=0xFE4F
        | 0xFF00..=0xFF60
        | 0xFFE0..=0xFFE6
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn space_width() {
        let m = StandardFontMetrics::HELVETICA;
        assert!((m.char_width(' ', 12.0) - 3.336).abs() < 1e-9);
    }

    #[test]
    fn ideographic_space_is_full_width() {
        let m = StandardFontMetrics::HELVETICA;
        assert_eq!(m.char_units('\u{3000}'), 1000);
        assert_eq!(m.char_units('求'), 1000);
    }

    #[test]
    fn unknown_latin_uses_fallback() {
        let m = StandardFontMetrics::HELVETICA;
        assert_eq!(m.char_units('é'), FALLBACK_WIDTH);
    }
}
