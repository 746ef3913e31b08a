//! # Page Break Decisions
//!
//! Decides how many wrapped lines of a cell stay on the current page and how
//! many move to the next one.

/// What to do with a block of lines that starts at the current position.
#[derive(Debug, Clone, PartialEq)]
pub enum BreakDecision {
    /// Every line fits on the current page.
    Place,
    /// Nothing stays here; the whole block starts on the next page.
    MoveToNextPage,
    /// Place some lines here, continue on the next page.
    Split {
        /// How many lines fit on the current page.
        lines_on_current_page: usize,
    },
}

impl BreakDecision {
    /// Number of lines committed to the current page.
    pub fn lines_on_current_page(&self, total_lines: usize) -> usize {
        match self {
            BreakDecision::Place => total_lines,
            BreakDecision::MoveToNextPage => 0,
            BreakDecision::Split {
                lines_on_current_page,
            } => (*lines_on_current_page).min(total_lines),
        }
    }
}

/// Whole lines of `line_height` that fit into `available`. Never negative.
pub fn containable_lines(available: f64, line_height: f64) -> usize {
    if line_height <= 0.0 || available <= 0.0 {
        return 0;
    }
    (available / line_height).floor() as usize
}

/// Given the space left above the bottom margin, decide how to break
/// `total_lines` lines of `line_height`.
///
/// With `allow_split` false a block that does not fit entirely is moved to
/// the next page instead of being split.
pub fn decide_line_break(
    available: f64,
    line_height: f64,
    total_lines: usize,
    allow_split: bool,
) -> BreakDecision {
    if line_height <= 0.0 {
        return BreakDecision::Place;
    }

    let fit_count = containable_lines(available, line_height);

    // Easy case: everything fits
    if fit_count >= total_lines {
        return BreakDecision::Place;
    }

    if !allow_split || fit_count == 0 {
        return BreakDecision::MoveToNextPage;
    }

    BreakDecision::Split {
        lines_on_current_page: fit_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn everything_fits() {
        let decision = decide_line_break(100.0, 10.0, 10, true);
        assert_eq!(decision, BreakDecision::Place);
    }

    #[test]
    fn unsplittable_moves() {
        let decision = decide_line_break(50.0, 10.0, 6, false);
        assert_eq!(decision, BreakDecision::MoveToNextPage);
        assert_eq!(decision.lines_on_current_page(6), 0);
    }

    #[test]
    fn split_at_right_point() {
        let decision = decide_line_break(55.0, 10.0, 8, true);
        assert_eq!(
            decision,
            BreakDecision::Split {
                lines_on_current_page: 5,
            }
        );
    }

    #[test]
    fn negative_space_holds_nothing() {
        assert_eq!(containable_lines(-12.0, 3.0), 0);
        let decision = decide_line_break(-12.0, 3.0, 2, true);
        assert_eq!(decision, BreakDecision::MoveToNextPage);
    }

    #[test]
    fn zero_line_height_never_breaks() {
        assert_eq!(decide_line_break(0.0, 0.0, 3, false), BreakDecision::Place);
    }
}
