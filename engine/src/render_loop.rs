//! The per-tick driver: fetch, present, read input, pace.

use crate::Frame;
use crate::compositor::{self, Canvas, TextPainter};
use crate::display::{Display, KeyWait, SurfaceId};
use crate::error::Result;
use crate::layout::LayoutPlan;
use crate::log_and_continue;
use crate::pacing::{Clock, FramePacer};
use crate::playback::{Effect, Key, PlaybackController};
use crate::stream::{StreamEndSet, StreamSlot};

/// What happened during one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Continue,
    /// Esc was pressed or input went away
    Quit,
    /// Every stream has reported exhaustion
    AllStreamsEnded,
}

impl TickOutcome {
    pub fn is_finished(&self) -> bool {
        !matches!(self, Self::Continue)
    }
}

/// Borrowed services the loop drives.
pub struct Collaborators<'a> {
    pub display: &'a mut dyn Display,
    pub painter: &'a mut dyn TextPainter,
    pub clock: &'a dyn Clock,
}

/// Owns the streams, the cursor and the canvas for one session.
pub struct RenderLoop<'a> {
    display: &'a mut dyn Display,
    painter: &'a mut dyn TextPainter,
    clock: &'a dyn Clock,
    slots: Vec<StreamSlot>,
    plan: LayoutPlan,
    controller: PlaybackController,
    ended: StreamEndSet,
    canvas: Option<Canvas>,
    legend: Frame,
    pacer: FramePacer,
    destroyed: Vec<bool>,
    ticks: u64,
}

impl<'a> RenderLoop<'a> {
    /// Surfaces must already exist: the canvas in stitch mode, one per
    /// stream otherwise.
    pub fn new(
        collaborators: Collaborators<'a>,
        slots: Vec<StreamSlot>,
        plan: LayoutPlan,
        controller: PlaybackController,
        pacer: FramePacer,
        legend: Frame,
    ) -> Self {
        let canvas = plan.mode.is_stitch().then(|| Canvas::for_plan(&plan));
        let count = slots.len();
        Self {
            display: collaborators.display,
            painter: collaborators.painter,
            clock: collaborators.clock,
            slots,
            plan,
            controller,
            ended: StreamEndSet::new(count),
            canvas,
            legend,
            pacer,
            destroyed: vec![false; count],
            ticks: 0,
        }
    }

    pub fn controller(&self) -> &PlaybackController {
        &self.controller
    }

    pub fn plan(&self) -> &LayoutPlan {
        &self.plan
    }

    pub fn ended(&self) -> &StreamEndSet {
        &self.ended
    }

    pub fn canvas(&self) -> Option<&Canvas> {
        self.canvas.as_ref()
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Run one iteration of the loop.
    pub fn tick(&mut self) -> Result<TickOutcome> {
        let tick_start = self.clock.now();
        self.ticks += 1;

        let mut key = self.display.poll_key(KeyWait::NOW);

        if self.controller.releases_frames() {
            self.present_frames();
            self.controller.advance();
        }

        if self.controller.is_paused() && key.is_none() {
            key = self.display.poll_key(KeyWait::Forever);
            if key.is_none() {
                log::info!("Input closed, quitting");
                return Ok(TickOutcome::Quit);
            }
        }

        if let Some(c) = key
            && self.apply_key(c)
        {
            return Ok(TickOutcome::Quit);
        }

        if self.ended.is_complete() {
            log::info!("All {} stream(s) ended", self.slots.len());
            return Ok(TickOutcome::AllStreamsEnded);
        }

        self.pacer.wait_until_deadline(self.clock, tick_start);
        Ok(TickOutcome::Continue)
    }

    /// Tick until the session finishes.
    pub fn run(&mut self) -> Result<TickOutcome> {
        loop {
            let outcome = self.tick()?;
            if outcome.is_finished() {
                return Ok(outcome);
            }
        }
    }

    /// Release every stream and destroy every surface.
    pub fn shutdown(&mut self) {
        for slot in &mut self.slots {
            slot.stream.release();
        }
        if self.controller.legend_open() {
            self.display.close_legend();
        }
        if self.canvas.is_some() {
            self.display.destroy(SurfaceId::Canvas);
        } else {
            for (i, destroyed) in self.destroyed.iter_mut().enumerate() {
                if !*destroyed {
                    self.display.destroy(SurfaceId::Stream(i));
                    *destroyed = true;
                }
            }
        }
        log::debug!("Session shut down after {} tick(s)", self.ticks);
    }

    /// Returns `true` when the key ends the session.
    fn apply_key(&mut self, c: char) -> bool {
        let key = Key::from_char(c);
        match self.controller.handle(key) {
            Effect::None => {
                if !matches!(key, Key::Other(_)) {
                    log::info!("{:?} -> {:?}", key, self.controller.cursor());
                }
            }
            Effect::SeekAll(target) => {
                log::info!("{:?}: seeking all streams to frame {}", key, target);
                for slot in &mut self.slots {
                    slot.stream.seek(target);
                }
            }
            Effect::OpenLegend => {
                log_and_continue!(self.display.open_legend(&self.legend), "open legend");
            }
            Effect::CloseLegend => self.display.close_legend(),
            Effect::Quit => {
                log::info!("Esc pressed, quitting");
                return true;
            }
        }
        false
    }

    fn present_frames(&mut self) {
        let (frame_width, frame_height) = self.plan.frame_size();
        let stitch = self.canvas.is_some();

        for i in 0..self.slots.len() {
            let cell = self.plan.cells[i];
            let slot = &mut self.slots[i];

            match slot.stream.read_next() {
                Some(frame) => {
                    log::trace!(
                        "Stream {} frame {}",
                        i + 1,
                        self.controller.cursor().current_frame
                    );
                    let mut fitted = compositor::fit_to_cell(&frame, frame_width, frame_height);
                    compositor::draw_label(self.painter, &mut fitted, &slot.label(i));
                    match self.canvas.as_mut() {
                        Some(canvas) => canvas.blit(&cell, &fitted),
                        None => log_and_continue!(
                            self.display.show(SurfaceId::Stream(i), &fitted),
                            "show stream frame"
                        ),
                    }
                }
                None => {
                    if slot.stream.is_open() {
                        let (width, height) = slot.stream.native_size();
                        let blank = compositor::placeholder(width, height);
                        match self.canvas.as_mut() {
                            Some(canvas) => canvas.blit(
                                &cell,
                                &compositor::fit_to_cell(&blank, frame_width, frame_height),
                            ),
                            None => log_and_continue!(
                                self.display.show(SurfaceId::Stream(i), &blank),
                                "show placeholder"
                            ),
                        }
                    }
                    if self.ended.insert(i) {
                        log::info!("Stream {} ({}) ended", i + 1, slot.path);
                    }
                }
            }

            if !stitch
                && !self.destroyed[i]
                && self.display.is_closed_by_user(SurfaceId::Stream(i))
            {
                log::info!("Window {} closed, releasing {}", i + 1, slot.path);
                self.display.destroy(SurfaceId::Stream(i));
                slot.stream.release();
                self.destroyed[i] = true;
            }
        }

        if let Some(canvas) = &self.canvas {
            log_and_continue!(
                self.display.show(SurfaceId::Canvas, canvas.image()),
                "show canvas"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::compositor::NoText;
    use crate::display::KeyWait;
    use crate::fakes::{FakeDisplay, FakeOpener};
    use crate::geometry::DesktopGeometry;
    use crate::pacing::ManualClock;
    use crate::playback::{ESC, PlaybackConfig};
    use crate::session::start;

    fn desk() -> DesktopGeometry {
        DesktopGeometry {
            work_area_width: 320,
            work_area_height: 180,
            ..DesktopGeometry::default()
        }
    }

    fn config(files: &[&str], fps: i64, paused: bool, stitch: bool) -> PlaybackConfig {
        let files = files.iter().map(|f| f.to_string()).collect();
        PlaybackConfig::new(files, 1, fps, paused, stitch).unwrap()
    }

    fn gray(frame: &Frame, x: u32, y: u32) -> u8 {
        frame.get_pixel(x, y)[0]
    }

    #[test]
    fn test_session_ends_when_streams_end_at_different_ticks() {
        let opener = FakeOpener::default()
            .with("a", 2, (16, 9))
            .with("b", 4, (16, 9));
        let mut display = FakeDisplay::default();
        let mut painter = NoText;
        let clock = ManualClock::new();
        let mut render_loop = start(
            &config(&["a", "b"], 0, false, true),
            &opener,
            &mut desk(),
            Collaborators {
                display: &mut display,
                painter: &mut painter,
                clock: &clock,
            },
        )
        .unwrap();

        assert_eq!(render_loop.canvas().unwrap().dimensions(), (320, 90));

        for _ in 0..3 {
            assert_eq!(render_loop.tick().unwrap(), TickOutcome::Continue);
        }
        assert!(render_loop.ended().contains(0));
        assert!(!render_loop.ended().contains(1));

        // Stream a is still open, so its cell shows a black placeholder
        let canvas = render_loop.canvas().unwrap().image();
        assert_eq!(gray(canvas, 10, 10), 0);
        assert_eq!(gray(canvas, 170, 10), 2);

        assert_eq!(render_loop.tick().unwrap(), TickOutcome::Continue);
        assert_eq!(render_loop.tick().unwrap(), TickOutcome::AllStreamsEnded);
        assert_eq!(render_loop.ticks(), 5);
        assert_eq!(render_loop.ended().len(), 2);
    }

    #[test]
    fn test_stitch_fps_paces_every_tick() {
        let opener = FakeOpener::default()
            .with("a", 100, (16, 9))
            .with("b", 100, (16, 9));
        let mut display = FakeDisplay::default();
        let mut painter = NoText;
        let clock = ManualClock::new();
        let mut render_loop = start(
            &config(&["a", "b"], 30, false, true),
            &opener,
            &mut desk(),
            Collaborators {
                display: &mut display,
                painter: &mut painter,
                clock: &clock,
            },
        )
        .unwrap();

        let plan = render_loop.plan().clone();
        assert_eq!(
            render_loop.canvas().unwrap().dimensions(),
            (plan.cell_width * 2, plan.cell_height)
        );

        for _ in 0..3 {
            render_loop.tick().unwrap();
        }
        drop(render_loop);

        assert_eq!(clock.elapsed(), Duration::from_millis(99));
        assert_eq!(display.show_count(SurfaceId::Canvas), 3);
    }

    #[test]
    fn test_paused_start_blocks_and_steps_once() {
        let opener = FakeOpener::default().with("a", 100, (16, 9));
        let mut display = FakeDisplay::with_keys(&[None, Some('.')]);
        let mut painter = NoText;
        let clock = ManualClock::new();
        let outcome;
        let final_frame;
        {
            let mut render_loop = start(
                &config(&["a"], 0, true, false),
                &opener,
                &mut desk(),
                Collaborators {
                    display: &mut display,
                    painter: &mut painter,
                    clock: &clock,
                },
            )
            .unwrap();
            outcome = render_loop.run().unwrap();
            final_frame = render_loop.controller().cursor().current_frame;
        }

        assert_eq!(outcome, TickOutcome::Quit);
        assert_eq!(final_frame, 2);
        assert_eq!(display.show_count(SurfaceId::Stream(0)), 2);
        assert_eq!(
            display.polls,
            vec![KeyWait::NOW, KeyWait::Forever, KeyWait::NOW, KeyWait::Forever]
        );
        assert_eq!(
            gray(&display.last_frames[&SurfaceId::Stream(0)], 0, 0),
            1
        );
    }

    #[test]
    fn test_jump_forward_seeks_every_stream() {
        let opener = FakeOpener::default()
            .with("a", 100, (16, 9))
            .with("b", 100, (16, 9));
        let mut display = FakeDisplay::with_keys(&[None, Some('a')]);
        let mut painter = NoText;
        let clock = ManualClock::new();
        let paused;
        {
            let mut render_loop = start(
                &config(&["a", "b"], 0, false, false),
                &opener,
                &mut desk(),
                Collaborators {
                    display: &mut display,
                    painter: &mut painter,
                    clock: &clock,
                },
            )
            .unwrap();
            assert_eq!(render_loop.tick().unwrap(), TickOutcome::Continue);
            assert_eq!(render_loop.tick().unwrap(), TickOutcome::Continue);
            assert_eq!(render_loop.controller().cursor().current_frame, 11);
            assert_eq!(render_loop.tick().unwrap(), TickOutcome::Quit);
            paused = render_loop.controller().is_paused();
        }

        assert!(paused);
        for i in 0..2 {
            assert_eq!(opener.state(i).borrow().seeks, vec![0, 11]);
        }
        assert_eq!(
            gray(&display.last_frames[&SurfaceId::Stream(1)], 0, 0),
            11
        );
    }

    #[test]
    fn test_step_back_past_start_passes_negative_seek() {
        let opener = FakeOpener::default().with("a", 100, (16, 9));
        let mut display = FakeDisplay::with_keys(&[None, Some(',')]);
        let mut painter = NoText;
        let clock = ManualClock::new();
        {
            let mut render_loop = start(
                &config(&["a"], 0, true, false),
                &opener,
                &mut desk(),
                Collaborators {
                    display: &mut display,
                    painter: &mut painter,
                    clock: &clock,
                },
            )
            .unwrap();
            assert_eq!(render_loop.run().unwrap(), TickOutcome::Quit);
            assert!(render_loop.ended().contains(0));
        }

        assert_eq!(opener.state(0).borrow().seeks, vec![0, -1]);
        // The stream is still open, so a native-size placeholder is shown
        assert_eq!(display.shows.last(), Some(&(SurfaceId::Stream(0), (16, 9))));
    }

    #[test]
    fn test_closed_window_releases_its_stream() {
        let opener = FakeOpener::default()
            .with("a", 100, (16, 9))
            .with("b", 100, (16, 9));
        let mut display = FakeDisplay::with_keys(&[None, None, Some(ESC)]);
        display.closed_by_user.insert(SurfaceId::Stream(1));
        let mut painter = NoText;
        let clock = ManualClock::new();
        {
            let mut render_loop = start(
                &config(&["a", "b"], 0, false, false),
                &opener,
                &mut desk(),
                Collaborators {
                    display: &mut display,
                    painter: &mut painter,
                    clock: &clock,
                },
            )
            .unwrap();
            assert_eq!(render_loop.run().unwrap(), TickOutcome::Quit);
            assert!(render_loop.ended().contains(1));
            assert!(!render_loop.ended().contains(0));
        }

        assert!(opener.state(1).borrow().released);
        assert!(!opener.state(0).borrow().released);
        assert_eq!(display.destroyed, vec![SurfaceId::Stream(1)]);
        assert_eq!(display.show_count(SurfaceId::Stream(1)), 1);
        assert_eq!(display.show_count(SurfaceId::Stream(0)), 3);
    }

    #[test]
    fn test_windowed_placeholder_uses_native_size() {
        let opener = FakeOpener::default()
            .with("a", 1, (16, 9))
            .with("b", 100, (16, 9));
        let mut display = FakeDisplay::with_keys(&[None, Some(ESC)]);
        let mut painter = NoText;
        let clock = ManualClock::new();
        let frame_size;
        {
            let mut render_loop = start(
                &config(&["a", "b"], 0, false, false),
                &opener,
                &mut desk(),
                Collaborators {
                    display: &mut display,
                    painter: &mut painter,
                    clock: &clock,
                },
            )
            .unwrap();
            frame_size = render_loop.plan().frame_size();
            assert_eq!(render_loop.run().unwrap(), TickOutcome::Quit);
        }

        let stream_a: Vec<_> = display
            .shows
            .iter()
            .filter(|(s, _)| *s == SurfaceId::Stream(0))
            .map(|(_, size)| *size)
            .collect();
        assert_eq!(stream_a, vec![frame_size, (16, 9)]);
        let placeholder = &display.last_frames[&SurfaceId::Stream(0)];
        assert!(placeholder.pixels().all(|p| p[0] == 0 && p[3] == 255));
    }

    #[test]
    fn test_legend_toggle() {
        let opener = FakeOpener::default().with("a", 100, (16, 9));
        let mut display = FakeDisplay::with_keys(&[Some('l'), Some('L'), Some(ESC)]);
        let mut painter = NoText;
        let clock = ManualClock::new();
        {
            let mut render_loop = start(
                &config(&["a"], 0, false, false),
                &opener,
                &mut desk(),
                Collaborators {
                    display: &mut display,
                    painter: &mut painter,
                    clock: &clock,
                },
            )
            .unwrap();
            assert_eq!(render_loop.tick().unwrap(), TickOutcome::Continue);
            assert!(render_loop.controller().legend_open());
            assert_eq!(render_loop.tick().unwrap(), TickOutcome::Continue);
            assert!(!render_loop.controller().legend_open());
            assert_eq!(render_loop.tick().unwrap(), TickOutcome::Quit);
        }

        assert!(
            display
                .created
                .contains(&(SurfaceId::Legend, "Legend".to_string()))
        );
        assert_eq!(display.show_count(SurfaceId::Legend), 1);
        assert_eq!(display.last_frames[&SurfaceId::Legend].dimensions(), (80, 36));
        assert_eq!(display.destroyed, vec![SurfaceId::Legend]);
    }

    #[test]
    fn test_shutdown_releases_everything() {
        let opener = FakeOpener::default()
            .with("a", 100, (16, 9))
            .with("b", 100, (16, 9));
        let mut display = FakeDisplay::with_keys(&[Some(ESC)]);
        let mut painter = NoText;
        let clock = ManualClock::new();
        {
            let mut render_loop = start(
                &config(&["a", "b"], 0, false, false),
                &opener,
                &mut desk(),
                Collaborators {
                    display: &mut display,
                    painter: &mut painter,
                    clock: &clock,
                },
            )
            .unwrap();
            assert_eq!(render_loop.run().unwrap(), TickOutcome::Quit);
            render_loop.shutdown();
        }

        for i in 0..2 {
            assert!(opener.state(i).borrow().released);
        }
        assert_eq!(
            display.destroyed,
            vec![SurfaceId::Stream(0), SurfaceId::Stream(1)]
        );
    }
}
