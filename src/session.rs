use crate::{
    animator::Animator,
    content::PageContent,
    controller::PageController,
    events::BookEvent,
    foundation::error::BookResult,
    render::{FrameRGBA, RenderBackend, build_scene},
};

/// Counters from replaying an event script.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PlayStats {
    pub events: usize,
    pub ticks: u64,
    pub frames: u64,
}

/// Headless driver: a controller plus a backend that renders every requested frame.
///
/// Time is simulated. Each [`Self::step`] stands for one animator interval, so a replay
/// produces the same frames regardless of wall-clock speed.
pub struct FlipSession<P: PageContent = Box<dyn PageContent>> {
    controller: PageController<P>,
    backend: Box<dyn RenderBackend>,
    frames: u64,
}

impl<P: PageContent> FlipSession<P> {
    pub fn new(controller: PageController<P>, backend: Box<dyn RenderBackend>) -> Self {
        Self {
            controller,
            backend,
            frames: 0,
        }
    }

    pub fn controller(&self) -> &PageController<P> {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut PageController<P> {
        &mut self.controller
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames
    }

    /// Render the pending frame, if the controller requested one.
    pub fn render_pending(&mut self) -> BookResult<Option<FrameRGBA>> {
        let Some(snapshot) = self.controller.take_redraw() else {
            return Ok(None);
        };
        let scene = build_scene(&snapshot);
        let frame = self.backend.render_scene(&scene)?;
        self.frames += 1;
        Ok(Some(frame))
    }

    /// Render the current state unconditionally, consuming any pending request.
    pub fn render_now(&mut self) -> BookResult<FrameRGBA> {
        self.controller.take_redraw();
        let scene = build_scene(&self.controller.snapshot());
        let frame = self.backend.render_scene(&scene)?;
        self.frames += 1;
        Ok(frame)
    }

    /// Advance one animator interval and render if anything moved.
    pub fn step(&mut self) -> BookResult<Option<FrameRGBA>> {
        if !self.controller.is_animating() {
            return Ok(None);
        }
        self.controller.tick();
        self.render_pending()
    }

    /// Replay `events`, handing every rendered frame to `sink`, then let motion settle.
    ///
    /// Settling stops early if a page is still held by the pointer at the end of the script.
    #[tracing::instrument(skip_all, fields(events = events.len()))]
    pub fn play<F>(&mut self, events: &[BookEvent], mut sink: F) -> BookResult<PlayStats>
    where
        F: FnMut(FrameRGBA) -> BookResult<()>,
    {
        let mut stats = PlayStats::default();
        let mut emit = |frame: Option<FrameRGBA>, stats: &mut PlayStats| -> BookResult<()> {
            if let Some(frame) = frame {
                stats.frames += 1;
                sink(frame)?;
            }
            Ok(())
        };

        emit(self.render_pending()?, &mut stats)?;
        for event in events {
            stats.events += 1;
            match *event {
                BookEvent::Wait { ticks } => {
                    for _ in 0..ticks {
                        stats.ticks += 1;
                        emit(self.step()?, &mut stats)?;
                    }
                }
                _ => {
                    self.controller.handle(event)?;
                    emit(self.render_pending()?, &mut stats)?;
                }
            }
        }

        let opts = self.controller.opts();
        let bound = Animator::settle_tick_bound(opts.pointer_speed.min(opts.button_speed));
        let mut settle = 0;
        while self.controller.is_animating() && settle < bound {
            settle += 1;
            stats.ticks += 1;
            emit(self.step()?, &mut stats)?;
        }
        if self.controller.is_animating() {
            tracing::debug!(
                dragging = ?self.controller.dragging_page(),
                "script ended with motion still running"
            );
        }

        tracing::debug!(
            ticks = stats.ticks,
            frames = stats.frames,
            "event script replayed"
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::ControllerOpts,
        content::RecordedPage,
        foundation::core::ContainerSize,
        render::{BackendKind, RenderSettings, create_backend},
    };

    fn session(n: usize) -> FlipSession<RecordedPage> {
        let controller = PageController::new(
            ContainerSize::new(160.0, 96.0).unwrap(),
            vec![RecordedPage::default(); n],
            ControllerOpts::default(),
        )
        .unwrap();
        let backend = create_backend(BackendKind::Cpu, &RenderSettings::default()).unwrap();
        FlipSession::new(controller, backend)
    }

    #[test]
    fn idle_step_renders_nothing() {
        let mut s = session(2);
        assert!(s.render_pending().unwrap().is_some());
        assert!(s.step().unwrap().is_none());
        assert_eq!(s.frames_rendered(), 1);
    }

    #[test]
    fn play_renders_until_settled() {
        let mut s = session(3);
        let mut sizes = Vec::new();
        let stats = s
            .play(&[BookEvent::Next], |frame| {
                sizes.push((frame.width, frame.height));
                Ok(())
            })
            .unwrap();

        assert_eq!(stats.events, 1);
        assert!(stats.frames > 10);
        assert!(sizes.iter().all(|&s| s == (160, 96)));
        assert!(!s.controller().is_animating());
        assert_eq!(s.controller().current_page(), 1);
        assert!(s.controller().flips()[0].is_turned());
    }

    #[test]
    fn sink_errors_abort_playback() {
        let mut s = session(2);
        let err = s
            .play(&[BookEvent::Next], |_| {
                Err(crate::foundation::error::BookError::render("sink full"))
            })
            .unwrap_err();
        assert!(err.to_string().contains("sink full"));
    }

    #[test]
    fn resize_event_renders_new_size() {
        let mut s = session(2);
        s.render_pending().unwrap();
        let mut sizes = Vec::new();
        s.play(
            &[BookEvent::Resize {
                width: 120.0,
                height: 80.0,
            }],
            |frame| {
                sizes.push((frame.width, frame.height));
                Ok(())
            },
        )
        .unwrap();
        assert_eq!(sizes, vec![(120, 80)]);
    }
}
