use crate::{
    animator::{Animator, TickReport},
    config::ControllerOpts,
    content::PageContent,
    events::BookEvent,
    flip::{FLAT_LEFT, FLAT_RIGHT, FlipState},
    foundation::{
        core::{ContainerSize, Point},
        error::BookResult,
    },
    geometry::Geometry,
    input::{self, Release, Side},
    render::{FrameSnapshot, content_visibility},
};

/// State machine of one book widget.
///
/// Owns the per-page flip states, the current page, pointer tracking and the animator.
/// The host feeds it input through the `pointer_*`/`turn_*` methods (or [`Self::handle`]),
/// calls [`Self::tick`] at the animator's interval while it runs, and renders whatever
/// [`Self::take_redraw`] hands back.
pub struct PageController<P: PageContent = Box<dyn PageContent>> {
    opts: ControllerOpts,
    container: ContainerSize,
    geometry: Geometry,
    flips: Vec<FlipState>,
    pages: Vec<P>,
    current_page: usize,
    active_side: Side,
    animator: Animator,
    // Container-relative; re-centred on the spine when read so a resize applies at once.
    pointer: Point,
    pointer_held: bool,
    drawn: Option<usize>,
    needs_redraw: bool,
}

impl<P: PageContent> PageController<P> {
    /// Build a controller over `pages`, in reading order.
    ///
    /// Earlier pages are stacked above later ones. The first frame (resting spread) is
    /// pending right away.
    #[tracing::instrument(skip(pages), fields(pages = pages.len()))]
    pub fn new(
        container: ContainerSize,
        mut pages: Vec<P>,
        opts: ControllerOpts,
    ) -> BookResult<Self> {
        container.validate()?;
        opts.validate()?;

        let n = pages.len();
        for (i, page) in pages.iter_mut().enumerate() {
            page.set_stacking_order(n - i);
        }
        if n == 0 {
            tracing::debug!("book has no pages; gestures and turns are inert");
        }

        Ok(Self {
            opts,
            container,
            geometry: Geometry::recompute(container),
            flips: vec![FlipState::default(); n],
            pages,
            current_page: 0,
            active_side: Side::default(),
            animator: Animator::new(opts.fps),
            pointer: container.center(),
            pointer_held: false,
            drawn: None,
            needs_redraw: true,
        })
    }

    pub fn page_count(&self) -> usize {
        self.flips.len()
    }

    /// Index of the leftmost unturned page; equals [`Self::page_count`] once all are turned.
    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn active_side(&self) -> Side {
        self.active_side
    }

    pub fn flips(&self) -> &[FlipState] {
        &self.flips
    }

    pub fn pages(&self) -> &[P] {
        &self.pages
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn container(&self) -> ContainerSize {
        self.container
    }

    pub fn animator(&self) -> &Animator {
        &self.animator
    }

    pub fn opts(&self) -> ControllerOpts {
        self.opts
    }

    pub fn is_animating(&self) -> bool {
        self.animator.is_running()
    }

    pub fn is_pointer_held(&self) -> bool {
        self.pointer_held
    }

    /// Page currently following the pointer, if any.
    pub fn dragging_page(&self) -> Option<usize> {
        self.flips.iter().position(FlipState::is_dragging)
    }

    /// Pointer position relative to the spine.
    pub fn pointer(&self) -> Point {
        let center = self.container.center();
        Point::new(self.pointer.x - center.x, self.pointer.y - center.y)
    }

    /// Turn back one page. Returns `false` when already at the front.
    pub fn turn_to_previous(&mut self) -> bool {
        if self.current_page == 0 {
            return false;
        }
        self.drop_drag();
        self.flips[self.current_page - 1].set_target(FLAT_RIGHT);
        self.current_page -= 1;
        tracing::debug!(current_page = self.current_page, "turn to previous");
        self.animator.start(self.opts.button_speed);
        true
    }

    /// Turn forward one page. Returns `false` when every page is already turned.
    pub fn turn_to_next(&mut self) -> bool {
        if self.current_page >= self.page_count() {
            return false;
        }
        self.drop_drag();
        self.flips[self.current_page].set_target(FLAT_LEFT);
        self.current_page += 1;
        tracing::debug!(current_page = self.current_page, "turn to next");
        self.animator.start(self.opts.button_speed);
        true
    }

    /// Pointer pressed at container-relative `pos`.
    pub fn pointer_down(&mut self, pos: Point) {
        self.set_pointer(pos);
        self.pointer_held = true;
        self.begin_gesture();
    }

    /// Pointer moved to container-relative `pos`.
    ///
    /// While held, only the tracked position changes; the animator pulls it on the next
    /// tick. Without a button, hovering near the right edge peeks the next page.
    pub fn pointer_move(&mut self, pos: Point) {
        self.set_pointer(pos);
        if self.pointer_held {
            return;
        }
        let x = self.pointer_target();
        if input::hover_peek(x, self.current_page, self.page_count()) {
            self.begin_gesture();
        } else {
            self.end_gesture();
        }
    }

    pub fn pointer_up(&mut self) {
        self.end_gesture();
        self.pointer_held = false;
    }

    pub fn pointer_leave(&mut self) {
        self.end_gesture();
        self.pointer_held = false;
    }

    /// Adopt a new container size. Flip progress survives; the next frame is a resting
    /// spread at the new size.
    #[tracing::instrument(skip(self))]
    pub fn resize(&mut self, size: ContainerSize) -> BookResult<()> {
        size.validate()?;
        self.container = size;
        self.geometry = Geometry::recompute(size);
        self.drawn = None;
        self.needs_redraw = true;
        tracing::debug!(width = size.width, height = size.height, "book resized");
        Ok(())
    }

    /// Run one animator step and update the page bodies it touched.
    pub fn tick(&mut self) -> TickReport {
        let target = self.pointer_target();
        let report = self.animator.tick(&mut self.flips, target);
        for &i in &report.redraw {
            let visibility = content_visibility(self.flips[i].progress(), &self.geometry);
            if let Some(page) = self.pages.get_mut(i) {
                page.apply(visibility);
            }
            // Pages redraw in order, so the last one wins the canvas.
            self.drawn = Some(i);
        }
        if !report.redraw.is_empty() {
            self.needs_redraw = true;
        }
        report
    }

    /// Tick until the animator stops or `max_ticks` pass. Returns the ticks spent.
    pub fn run_until_idle(&mut self, max_ticks: u64) -> u64 {
        let mut ticks = 0;
        while self.animator.is_running() && ticks < max_ticks {
            self.tick();
            ticks += 1;
        }
        ticks
    }

    /// Current state as seen by the renderer.
    pub fn snapshot(&self) -> FrameSnapshot {
        FrameSnapshot {
            geometry: self.geometry,
            flips: self.flips.clone(),
            active: self.drawn,
        }
    }

    /// Take the pending frame, if one was requested since the last call.
    pub fn take_redraw(&mut self) -> Option<FrameSnapshot> {
        if !self.needs_redraw {
            return None;
        }
        self.needs_redraw = false;
        Some(self.snapshot())
    }

    /// Dispatch one input event. [`BookEvent::Wait`] is the driver's business and is ignored.
    pub fn handle(&mut self, event: &BookEvent) -> BookResult<()> {
        match *event {
            BookEvent::Down { x, y } => self.pointer_down(Point::new(x, y)),
            BookEvent::Move { x, y } => self.pointer_move(Point::new(x, y)),
            BookEvent::Up => self.pointer_up(),
            BookEvent::Leave => self.pointer_leave(),
            BookEvent::Prev => {
                self.turn_to_previous();
            }
            BookEvent::Next => {
                self.turn_to_next();
            }
            BookEvent::Resize { width, height } => {
                self.resize(ContainerSize::new(width, height)?)?;
            }
            BookEvent::Wait { .. } => {}
        }
        Ok(())
    }

    fn set_pointer(&mut self, pos: Point) {
        self.pointer = pos;
    }

    fn pointer_target(&self) -> f64 {
        input::normalize_x(self.pointer().x, self.geometry.page_width)
    }

    fn begin_gesture(&mut self) {
        self.animator.start(self.opts.pointer_speed);
        let x = self.pointer_target();
        let Some(start) = input::drag_start(x, self.current_page, self.page_count()) else {
            return;
        };
        if let Some(prev) = self.dragging_page()
            && prev != start.page
        {
            self.cancel_drag(prev);
        }
        self.active_side = start.side;
        self.flips[start.page].set_dragging(true);
        tracing::debug!(page = start.page, side = ?start.side, "drag started");
    }

    fn end_gesture(&mut self) {
        if let Some(page) = self.dragging_page() {
            let release = Release::resolve(self.active_side, self.flips[page].target());
            self.flips[page].set_target(release.target());
            self.current_page = release.next_page(self.current_page, self.page_count());
            tracing::debug!(
                page,
                ?release,
                current_page = self.current_page,
                "drag released"
            );
        }
        for flip in &mut self.flips {
            flip.set_dragging(false);
        }
    }

    // Button turns take over from the pointer.
    fn drop_drag(&mut self) {
        if let Some(page) = self.dragging_page() {
            tracing::debug!(page, "drag cancelled by turn");
            self.cancel_drag(page);
        }
    }

    // A superseded drag goes back to where it was picked up without moving the current page.
    fn cancel_drag(&mut self, page: usize) {
        let rest = if page < self.current_page {
            FLAT_LEFT
        } else {
            FLAT_RIGHT
        };
        self.flips[page].set_target(rest);
        self.flips[page].set_dragging(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::RecordedPage;

    fn book(n: usize) -> PageController<RecordedPage> {
        PageController::new(
            ContainerSize::new(800.0, 480.0).unwrap(),
            vec![RecordedPage::default(); n],
            ControllerOpts::default(),
        )
        .unwrap()
    }

    // Container x for a normalized pointer x in the 800x480 book (page width 380).
    fn at(nx: f64) -> Point {
        Point::new(400.0 + nx * 380.0, 240.0)
    }

    #[test]
    fn stacking_order_puts_first_page_on_top() {
        let b = book(4);
        let z: Vec<usize> = b.pages().iter().map(|p| p.stacking_order).collect();
        assert_eq!(z, vec![4, 3, 2, 1]);
    }

    #[test]
    fn first_frame_is_pending_resting_spread() {
        let mut b = book(2);
        let frame = b.take_redraw().unwrap();
        assert_eq!(frame.active, None);
        assert!(b.take_redraw().is_none());
    }

    #[test]
    fn previous_at_front_is_noop() {
        let mut b = book(3);
        assert!(!b.turn_to_previous());
        assert!(!b.is_animating());
        assert_eq!(b.current_page(), 0);
    }

    #[test]
    fn next_turns_and_settles_left() {
        let mut b = book(3);
        assert!(b.turn_to_next());
        assert_eq!(b.current_page(), 1);
        assert_eq!(b.flips()[0].target(), -1.0);
        assert_eq!(b.animator().speed(), Some(0.1));

        b.run_until_idle(1_000);
        assert!(!b.is_animating());
        assert!(b.flips()[0].is_turned());
        assert!(b.pages()[0].is_hidden());
    }

    #[test]
    fn next_stops_when_every_page_is_turned() {
        let mut b = book(2);
        assert!(b.turn_to_next());
        assert!(b.turn_to_next());
        assert!(!b.turn_to_next());
        assert_eq!(b.current_page(), 2);
    }

    #[test]
    fn forward_drag_past_commit_line_turns() {
        let mut b = book(3);
        b.pointer_down(at(0.9));
        assert_eq!(b.dragging_page(), Some(0));
        assert_eq!(b.active_side(), Side::Right);

        b.pointer_move(at(0.1));
        for _ in 0..40 {
            b.tick();
        }
        assert!(b.flips()[0].progress() < 0.75);

        b.pointer_up();
        assert_eq!(b.current_page(), 1);
        assert_eq!(b.dragging_page(), None);
        assert_eq!(b.flips()[0].target(), -1.0);
    }

    #[test]
    fn short_forward_drag_snaps_back() {
        let mut b = book(3);
        b.pointer_down(at(0.9));
        b.pointer_move(at(0.8));
        for _ in 0..40 {
            b.tick();
        }
        b.pointer_up();
        assert_eq!(b.current_page(), 0);
        assert_eq!(b.flips()[0].target(), 1.0);
    }

    #[test]
    fn press_in_dead_zone_grabs_nothing() {
        let mut b = book(3);
        b.pointer_down(at(0.5));
        assert_eq!(b.dragging_page(), None);
        assert!(b.is_animating());
        b.pointer_up();
        assert_eq!(b.current_page(), 0);
    }

    #[test]
    fn last_page_cannot_be_dragged_forward() {
        let mut b = book(1);
        b.pointer_down(at(0.9));
        assert_eq!(b.dragging_page(), None);
    }

    #[test]
    fn backward_drag_across_spine_turns_back() {
        let mut b = book(3);
        b.turn_to_next();
        b.run_until_idle(1_000);

        b.pointer_down(at(-0.5));
        assert_eq!(b.dragging_page(), Some(0));
        assert_eq!(b.active_side(), Side::Left);
        b.pointer_move(at(0.5));
        for _ in 0..40 {
            b.tick();
        }
        b.pointer_up();
        assert_eq!(b.current_page(), 0);
        assert_eq!(b.flips()[0].target(), 1.0);
    }

    #[test]
    fn hover_peek_starts_and_ends() {
        let mut b = book(3);
        b.pointer_move(at(0.95));
        assert_eq!(b.dragging_page(), Some(0));
        assert_eq!(b.animator().speed(), Some(0.2));

        b.tick();
        assert!(b.flips()[0].progress() < 1.0);

        // Leaving the peek zone releases above the commit line, so the page falls back.
        b.pointer_move(at(0.5));
        assert_eq!(b.dragging_page(), None);
        assert_eq!(b.current_page(), 0);
        assert_eq!(b.flips()[0].target(), 1.0);
    }

    #[test]
    fn only_one_page_drags_at_a_time() {
        let mut b = book(4);
        b.turn_to_next();
        b.run_until_idle(1_000);

        b.pointer_move(at(0.95));
        assert_eq!(b.dragging_page(), Some(1));
        b.pointer_down(at(-0.5));
        assert_eq!(b.dragging_page(), Some(0));
        assert_eq!(b.flips().iter().filter(|f| f.is_dragging()).count(), 1);
        assert_eq!(b.flips()[1].target(), 1.0);
    }

    #[test]
    fn leave_resolves_like_release() {
        let mut b = book(3);
        b.pointer_down(at(0.9));
        b.pointer_move(at(-0.5));
        for _ in 0..30 {
            b.tick();
        }
        b.pointer_leave();
        assert!(!b.is_pointer_held());
        assert_eq!(b.current_page(), 1);
    }

    #[test]
    fn tick_tracks_last_redrawn_page() {
        let mut b = book(3);
        b.take_redraw();
        b.turn_to_next();
        b.tick();
        let frame = b.take_redraw().unwrap();
        assert_eq!(frame.active, Some(0));
        assert!(b.pages()[0].width().is_some());
        assert_eq!(b.pages()[1].visibility, None);
    }

    #[test]
    fn held_drag_follows_resized_spine() {
        let mut b = book(3);
        b.pointer_down(Point::new(760.0, 240.0));
        b.resize(ContainerSize::new(1000.0, 480.0).unwrap()).unwrap();
        b.tick();
        // New spine at x = 500, page width 475.
        let expected = (760.0 - 500.0) / 475.0;
        assert!((b.flips()[0].target() - expected).abs() < 1e-9);
        assert_eq!(b.pointer(), Point::new(260.0, 0.0));
    }

    #[test]
    fn resize_requests_resting_frame() {
        let mut b = book(2);
        b.take_redraw();
        b.turn_to_next();
        b.tick();
        b.take_redraw();

        b.resize(ContainerSize::new(400.0, 300.0).unwrap()).unwrap();
        let frame = b.take_redraw().unwrap();
        assert_eq!(frame.active, None);
        assert_eq!(frame.geometry.width, 400.0);
        assert!(b.resize(ContainerSize { width: 0.0, height: 10.0 }).is_err());
    }

    #[test]
    fn empty_book_is_inert() {
        let mut b = book(0);
        assert!(!b.turn_to_next());
        assert!(!b.turn_to_previous());
        b.pointer_down(at(0.9));
        b.pointer_move(at(-0.9));
        b.pointer_up();
        assert!(b.tick().stopped);
        assert!(!b.is_animating());
    }

    #[test]
    fn handle_dispatches_events() {
        let mut b = book(3);
        b.handle(&BookEvent::Next).unwrap();
        assert_eq!(b.current_page(), 1);
        b.handle(&BookEvent::Prev).unwrap();
        assert_eq!(b.current_page(), 0);
        b.handle(&BookEvent::Down { x: 760.0, y: 200.0 }).unwrap();
        assert!(b.is_pointer_held());
        b.handle(&BookEvent::Up).unwrap();
        assert!(!b.is_pointer_held());
        assert!(b.handle(&BookEvent::Resize { width: -1.0, height: 5.0 }).is_err());
    }
}
