//! Pointer-to-flip mapping.
//!
//! Pointer x is measured from the spine (canvas middle) and normalized by the page width,
//! so `-1` is the outer edge of the left page and `1` the outer edge of the right page.
//! The left page can be grabbed anywhere; the right page only near its outer edge.

use crate::flip::{FLAT_LEFT, FLAT_RIGHT, clamp_unit};

/// Normalized x beyond which the right page can be grabbed.
pub const FORWARD_GRAB_ZONE: f64 = 0.75;

/// Normalized x beyond which hovering (no button) peeks the next page.
pub const HOVER_PEEK_ZONE: f64 = 0.875;

/// A forward drag released below this target turns the page.
pub const FORWARD_COMMIT: f64 = 0.75;

/// A backward drag released at or beyond this target turns the page back.
pub const BACKWARD_COMMIT: f64 = 0.0;

/// Half of the spread a gesture manipulates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// The previous page, pulled back to the right.
    #[default]
    Left,
    /// The current page, pulled forward to the left.
    Right,
}

/// Pointer x relative to the spine, as a clamped fraction of the page width.
pub fn normalize_x(point_x: f64, page_width: f64) -> f64 {
    clamp_unit(point_x / page_width)
}

/// Page grabbed by a drag that starts at normalized `x`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DragStart {
    pub side: Side,
    pub page: usize,
}

/// Decide which page (if any) a pointer press at normalized `x` grabs.
pub fn drag_start(x: f64, current_page: usize, page_count: usize) -> Option<DragStart> {
    if -1.0 < x && x < 0.0 && current_page > 0 {
        return Some(DragStart {
            side: Side::Left,
            page: current_page - 1,
        });
    }
    if FORWARD_GRAB_ZONE < x && x < 1.0 && current_page + 1 < page_count {
        return Some(DragStart {
            side: Side::Right,
            page: current_page,
        });
    }
    None
}

/// `true` when a button-less pointer at normalized `x` should peek the next page.
pub fn hover_peek(x: f64, current_page: usize, page_count: usize) -> bool {
    HOVER_PEEK_ZONE < x && x < 1.0 && current_page + 1 < page_count
}

/// Outcome of letting go of a dragged page.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Release {
    /// Forward drag crossed the commit line; the page turns over.
    CommitForward,
    /// Forward drag did not cross the commit line; the page falls back right.
    SnapBack,
    /// Backward drag stayed on the left half; the page falls back left.
    StayTurned,
    /// Backward drag crossed the spine; the page turns back.
    CommitBackward,
}

impl Release {
    /// Resolve a release for a drag on `side` whose last target was `target`.
    pub fn resolve(side: Side, target: f64) -> Self {
        match side {
            Side::Right if target < FORWARD_COMMIT => Self::CommitForward,
            Side::Right => Self::SnapBack,
            Side::Left if target < BACKWARD_COMMIT => Self::StayTurned,
            Side::Left => Self::CommitBackward,
        }
    }

    /// Target the released page eases toward.
    pub fn target(self) -> f64 {
        match self {
            Self::CommitForward | Self::StayTurned => FLAT_LEFT,
            Self::SnapBack | Self::CommitBackward => FLAT_RIGHT,
        }
    }

    /// Apply the release to the current page index, clamped to `[0, page_count]`.
    pub fn next_page(self, current_page: usize, page_count: usize) -> usize {
        match self {
            Self::CommitForward => (current_page + 1).min(page_count),
            Self::CommitBackward => current_page.saturating_sub(1),
            Self::SnapBack | Self::StayTurned => current_page,
        }
    }
}
