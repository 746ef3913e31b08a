//! # Drawing Sink
//!
//! The narrow capability surface the layout engine needs from an output
//! medium. Layout only measures and queries page geometry; the render pass is
//! the only caller that paints.
//!
//! Coordinates are absolute user units with the origin at the top-left corner
//! of the page, y growing downwards. Pages are numbered from 1.

use serde::{Deserialize, Serialize};

use crate::error::SinkError;

/// Horizontal alignment of text inside a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Align {
    #[default]
    #[serde(rename = "L", alias = "left")]
    Left,
    #[serde(rename = "C", alias = "center")]
    Center,
    #[serde(rename = "R", alias = "right")]
    Right,
}

/// Paint operation for a rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RectStyle {
    /// Fill with the current fill colour.
    Filled,
    /// Stroke with the current line width.
    Outlined,
}

/// Font size in both measuring systems.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontSize {
    /// Size in points.
    pub pt: f64,
    /// Size in user units; used as the height of one line of text.
    pub unit: f64,
}

/// A bordered text cell ready to paint.
#[derive(Debug, Clone, Copy)]
pub struct CellDraw<'a> {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
    pub text: &'a str,
    pub border: bool,
    pub align: Align,
    pub fill: bool,
    pub link: Option<&'a str>,
}

/// An output medium the table engine can measure against and paint onto.
pub trait DrawingSink {
    /// Width of `text` in user units at the current font and size.
    fn string_width(&self, text: &str) -> f64;

    /// Select the font family and size (points).
    fn set_font(&mut self, family: &str, size_pt: f64);

    /// Change the size (points) of the current font.
    fn set_font_size(&mut self, size_pt: f64);

    fn font_size(&self) -> FontSize;

    /// Width and height of the current page in user units.
    fn page_size(&self) -> (f64, f64);

    /// Number of the most recently added page; 0 before any page exists.
    fn page_no(&self) -> usize;

    fn add_page(&mut self);

    fn set_line_width(&mut self, width: f64);

    fn set_fill_color(&mut self, r: u8, g: u8, b: u8);

    fn rect(&mut self, x: f64, y: f64, w: f64, h: f64, style: RectStyle) -> Result<(), SinkError>;

    fn cell(&mut self, cell: &CellDraw<'_>) -> Result<(), SinkError>;

    /// Draw `text` with its baseline at `y`.
    fn text(&mut self, x: f64, y: f64, text: &str) -> Result<(), SinkError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn align_accepts_short_and_long_names() {
        let a: Align = serde_json::from_str("\"C\"").unwrap();
        assert_eq!(a, Align::Center);
        let b: Align = serde_json::from_str("\"right\"").unwrap();
        assert_eq!(b, Align::Right);
        assert_eq!(Align::default(), Align::Left);
    }
}
