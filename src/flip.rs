/// `|progress|` at or beyond which a page counts as lying flat.
///
/// Kept short of 1.0 so settled pages leave a one-pixel seam against the stack below.
pub const SETTLE_THRESHOLD: f64 = 0.997;

/// Progress of a page lying flat on the right (unturned).
pub const FLAT_RIGHT: f64 = 1.0;

/// Progress of a page lying flat on the left (turned).
pub const FLAT_LEFT: f64 = -1.0;

/// Clamp a curl value into `[-1, 1]`. NaN collapses to the unturned position.
pub fn clamp_unit(v: f64) -> f64 {
    if v.is_nan() {
        return FLAT_RIGHT;
    }
    v.clamp(FLAT_LEFT, FLAT_RIGHT)
}

/// Animation state of one leaf.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FlipState {
    progress: f64,
    target: f64,
    dragging: bool,
}

impl Default for FlipState {
    fn default() -> Self {
        Self {
            progress: FLAT_RIGHT,
            target: FLAT_RIGHT,
            dragging: false,
        }
    }
}

impl FlipState {
    /// A page at rest with `progress == target == value`.
    pub fn at(value: f64) -> Self {
        let v = clamp_unit(value);
        Self {
            progress: v,
            target: v,
            dragging: false,
        }
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn target(&self) -> f64 {
        self.target
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    pub fn set_target(&mut self, target: f64) {
        self.target = clamp_unit(target);
    }

    pub(crate) fn set_dragging(&mut self, dragging: bool) {
        self.dragging = dragging;
    }

    /// Move `progress` a `speed` fraction of the way toward `target`.
    pub fn ease(&mut self, speed: f64) {
        self.progress = clamp_unit(self.progress + (self.target - self.progress) * speed);
    }

    /// `true` once the page lies (visually) flat on either side.
    pub fn is_settled(&self) -> bool {
        self.progress.abs() >= SETTLE_THRESHOLD
    }

    /// `true` when the animator no longer has anything to do for this page.
    pub fn is_idle(&self) -> bool {
        !self.dragging && self.is_settled()
    }

    pub fn is_turned(&self) -> bool {
        self.progress < -SETTLE_THRESHOLD
    }

    pub fn is_unturned(&self) -> bool {
        self.progress > SETTLE_THRESHOLD
    }

    /// `0` when flat, `1` at the vertical fold.
    pub fn strength(&self) -> f64 {
        1.0 - self.progress.abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_flat_right_and_idle() {
        let f = FlipState::default();
        assert_eq!(f.progress(), 1.0);
        assert_eq!(f.target(), 1.0);
        assert!(f.is_idle());
        assert!(f.is_unturned());
        assert_eq!(f.strength(), 0.0);
    }

    #[test]
    fn targets_are_clamped() {
        let mut f = FlipState::default();
        f.set_target(-3.0);
        assert_eq!(f.target(), -1.0);
        f.set_target(7.5);
        assert_eq!(f.target(), 1.0);
        f.set_target(f64::NAN);
        assert_eq!(f.target(), 1.0);
    }

    #[test]
    fn easing_strictly_closes_the_gap() {
        let mut f = FlipState::default();
        f.set_target(-1.0);
        let mut gap = (f.target() - f.progress()).abs();
        for _ in 0..80 {
            f.ease(0.1);
            let next = (f.target() - f.progress()).abs();
            assert!(next < gap);
            gap = next;
        }
        assert!(f.is_turned());
    }

    #[test]
    fn settle_threshold_leaves_a_seam() {
        let f = FlipState::at(0.9965);
        assert!(!f.is_settled());
        let f = FlipState::at(-0.9975);
        assert!(f.is_settled());
        assert!(f.is_turned());
    }
}
