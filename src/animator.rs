use std::time::Duration;

use crate::flip::{FlipState, SETTLE_THRESHOLD};
use crate::foundation::core::Fps;

/// Easing fraction for pointer-driven gestures.
pub const POINTER_SPEED: f64 = 0.2;

/// Easing fraction for button-driven turns.
pub const BUTTON_SPEED: f64 = 0.1;

#[derive(Clone, Copy, Debug, PartialEq)]
struct Run {
    speed: f64,
    generation: u64,
    ticks: u64,
}

/// Result of one animator tick.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Pages that need a redraw this tick, in page order.
    pub redraw: Vec<usize>,
    /// `true` when this tick found every page idle and stopped the loop.
    pub stopped: bool,
}

/// Fixed-rate easing loop shared by all pages of a book.
///
/// The host calls [`Animator::tick`] once per [`Animator::interval`] while
/// [`Animator::is_running`] holds. Starting always replaces the previous run, so two easing
/// rates never compete over the same pages.
#[derive(Clone, Debug)]
pub struct Animator {
    fps: Fps,
    run: Option<Run>,
    generation: u64,
}

impl Animator {
    pub fn new(fps: Fps) -> Self {
        Self {
            fps,
            run: None,
            generation: 0,
        }
    }

    /// Cancel any in-flight run and start a new one easing at `speed`.
    ///
    /// Returns the generation of the new run.
    pub fn start(&mut self, speed: f64) -> u64 {
        self.generation += 1;
        if let Some(prev) = self.run.take() {
            tracing::trace!(
                generation = prev.generation,
                ticks = prev.ticks,
                "animator run superseded"
            );
        }
        self.run = Some(Run {
            speed,
            generation: self.generation,
            ticks: 0,
        });
        tracing::debug!(
            generation = self.generation,
            speed,
            fps = self.fps.as_f64(),
            "animator started"
        );
        self.generation
    }

    pub fn stop(&mut self) {
        if let Some(run) = self.run.take() {
            tracing::debug!(
                generation = run.generation,
                ticks = run.ticks,
                "animator stopped"
            );
        }
    }

    pub fn is_running(&self) -> bool {
        self.run.is_some()
    }

    /// Easing speed of the current run.
    pub fn speed(&self) -> Option<f64> {
        self.run.map(|r| r.speed)
    }

    /// Generation of the most recently started run.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn fps(&self) -> Fps {
        self.fps
    }

    pub fn interval(&self) -> Duration {
        self.fps.interval()
    }

    /// Advance every page one easing step.
    ///
    /// Dragging pages first take `pointer_target` as their target. The run stops once every
    /// page is idle (not dragging and settled), checked over the whole set after the step.
    pub fn tick(&mut self, flips: &mut [FlipState], pointer_target: f64) -> TickReport {
        let Some(run) = self.run.as_mut() else {
            return TickReport::default();
        };
        run.ticks += 1;
        let speed = run.speed;

        let mut report = TickReport::default();
        for (i, flip) in flips.iter_mut().enumerate() {
            if flip.is_dragging() {
                flip.set_target(pointer_target);
            }
            flip.ease(speed);
            if flip.is_dragging() || !flip.is_settled() {
                report.redraw.push(i);
            }
        }
        tracing::trace!(redraw = report.redraw.len(), "animator tick");

        if flips.iter().all(FlipState::is_idle) {
            self.stop();
            report.stopped = true;
        }
        report
    }

    /// Upper bound on ticks for a page at rest on one side to settle on the other at `speed`.
    pub fn settle_tick_bound(speed: f64) -> u64 {
        if speed >= 1.0 {
            return 1;
        }
        if speed <= 0.0 || !speed.is_finite() {
            return u64::MAX;
        }
        let remaining = (1.0 - SETTLE_THRESHOLD) / 2.0;
        (remaining.ln() / (1.0 - speed).ln()).ceil() as u64 + 1
    }
}
