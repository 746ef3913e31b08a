//! # Text Wrapping
//!
//! Character-by-character line breaking under a width budget.
//!
//! Lines are cut at explicit newlines or where the next character would push
//! the measured width past `width - 1` units. Leading spaces (ASCII and
//! ideographic) of a wrapped line are dropped, but spaces at the start of a
//! line that follows an explicit newline are kept: the author put them there.

use crate::sink::DrawingSink;

/// Slack kept free on the right edge of every line, in user units.
pub const LINE_SLACK: f64 = 1.0;

fn is_wrap_space(ch: char) -> bool {
    ch == ' ' || ch == '\u{3000}'
}

fn char_width(sink: &dyn DrawingSink, ch: char) -> f64 {
    let mut buf = [0u8; 4];
    sink.string_width(ch.encode_utf8(&mut buf))
}

/// How many characters starting at `start` fit into `width`.
///
/// The sink must already be set to the font size being measured.
pub fn max_chars(sink: &dyn DrawingSink, chars: &[char], start: usize, width: f64) -> usize {
    let mut accum = 0.0;
    for (i, &ch) in chars.iter().enumerate().skip(start) {
        let w = char_width(sink, ch);
        if accum + w > width - LINE_SLACK {
            return i - start;
        }
        accum += w;
    }
    chars.len().saturating_sub(start)
}

/// Split `text` into lines no wider than `width` at `font_size` points.
///
/// Always returns at least one line; blank input yields a single empty line.
pub fn split_lines(
    sink: &mut dyn DrawingSink,
    text: &str,
    width: f64,
    font_size: f64,
) -> Vec<String> {
    sink.set_font_size(font_size);
    let chars: Vec<char> = text.chars().collect();
    let mut lines = Vec::new();
    let mut after_newline = false;
    let mut i = 0;

    while i < chars.len() {
        if !after_newline {
            while i < chars.len() && is_wrap_space(chars[i]) {
                i += 1;
            }
        }
        if i >= chars.len() {
            break;
        }

        let end = chars[i..]
            .iter()
            .position(|&c| c == '\n')
            .map_or(chars.len(), |p| i + p);

        let mut take = max_chars(&*sink, &chars, i, width).min(end - i);
        // A single glyph wider than the column still has to go somewhere
        if take == 0 && end > i {
            take = 1;
        }

        lines.push(chars[i..i + take].iter().collect());
        i += take;

        if i < chars.len() && chars[i] == '\n' {
            i += 1;
            after_newline = true;
        } else {
            after_newline = false;
        }
    }

    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// Height of `text` wrapped into `width`, at `line_height` per line.
pub fn text_height(
    sink: &mut dyn DrawingSink,
    text: &str,
    width: f64,
    font_size: f64,
    line_height: f64,
) -> f64 {
    split_lines(sink, text, width, font_size).len() as f64 * line_height
}
