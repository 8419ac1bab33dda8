//! Playback configuration, the shared frame cursor and the key-driven
//! state machine that moves it.
//!
//! All streams follow one cursor. While playing, every tick reads the next
//! frame of every stream and advances the cursor by one. While paused,
//! frames are only released when `current_frame == target_frame`, which is
//! how single steps and jumps get exactly one advance before locking again.

use crate::error::{PlayerError, Result};

/// Frames subtracted by a backward step.
///
/// Two, because the loop re-advances by one right after the seek.
pub const STEP_BACK_FRAMES: i64 = 2;

/// Frames added by a forward jump; the loop adds the tenth.
pub const JUMP_FRAMES: i64 = 9;

/// Escape, as reported by keyboards and terminals.
pub const ESC: char = '\u{1b}';

/// Startup options shared by every stream. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackConfig {
    streams: Vec<String>,
    start_frame: i64,
    fps: u32,
    paused: bool,
    stitch: bool,
}

impl PlaybackConfig {
    /// Validate and build a configuration.
    ///
    /// `start_frame` is 1-based. `fps == 0` means uncapped.
    pub fn new(
        streams: Vec<String>,
        start_frame: i64,
        fps: i64,
        paused: bool,
        stitch: bool,
    ) -> Result<Self> {
        if start_frame <= 0 {
            return Err(PlayerError::Config(
                "Set start_frame value greater than 0".to_string(),
            ));
        }
        if fps < 0 {
            return Err(PlayerError::Config(
                "Set fps value greater than or equal to 0".to_string(),
            ));
        }
        let fps = u32::try_from(fps)
            .map_err(|_| PlayerError::Config(format!("fps value {} is too large", fps)))?;
        if streams.is_empty() {
            return Err(PlayerError::Config(
                "Pass at least one file as argument".to_string(),
            ));
        }

        Ok(Self {
            streams,
            start_frame,
            fps,
            paused,
            stitch,
        })
    }

    pub fn streams(&self) -> &[String] {
        &self.streams
    }

    /// 1-based start frame as given by the user.
    pub fn start_frame(&self) -> i64 {
        self.start_frame
    }

    /// 0-based index of the first frame to read.
    pub fn start_index(&self) -> i64 {
        self.start_frame - 1
    }

    pub fn fps(&self) -> u32 {
        self.fps
    }

    pub fn paused(&self) -> bool {
        self.paused
    }

    pub fn stitch(&self) -> bool {
        self.stitch
    }
}

/// A decoded keyboard action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// Space
    TogglePause,
    /// `.`
    StepForward,
    /// `,`
    StepBackward,
    /// `a` or `A`
    JumpForward,
    /// `l` or `L`
    ToggleLegend,
    /// Esc
    Quit,
    /// Anything else
    Other(char),
}

impl Key {
    pub fn from_char(c: char) -> Self {
        match c {
            ' ' => Self::TogglePause,
            '.' => Self::StepForward,
            ',' => Self::StepBackward,
            'a' | 'A' => Self::JumpForward,
            'l' | 'L' => Self::ToggleLegend,
            ESC => Self::Quit,
            other => Self::Other(other),
        }
    }
}

/// Shared frame position of all streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackCursor {
    /// Index of the next frame the streams will read
    pub current_frame: i64,
    /// Frame at which a paused cursor releases one more tick
    pub target_frame: i64,
    pub paused: bool,
}

impl PlaybackCursor {
    pub fn new(start_index: i64, paused: bool) -> Self {
        Self {
            current_frame: start_index,
            target_frame: start_index,
            paused,
        }
    }

    /// Whether this tick reads new frames.
    pub fn releases_frames(&self) -> bool {
        !self.paused || self.current_frame == self.target_frame
    }
}

/// What the render loop must do after a key was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    None,
    /// Seek every stream to this frame index (unclamped)
    SeekAll(i64),
    OpenLegend,
    CloseLegend,
    Quit,
}

/// Key-driven playback state machine.
#[derive(Debug, Clone)]
pub struct PlaybackController {
    cursor: PlaybackCursor,
    legend_open: bool,
}

impl PlaybackController {
    pub fn new(config: &PlaybackConfig) -> Self {
        Self {
            cursor: PlaybackCursor::new(config.start_index(), config.paused()),
            legend_open: false,
        }
    }

    pub fn from_cursor(cursor: PlaybackCursor) -> Self {
        Self {
            cursor,
            legend_open: false,
        }
    }

    pub fn cursor(&self) -> PlaybackCursor {
        self.cursor
    }

    pub fn is_paused(&self) -> bool {
        self.cursor.paused
    }

    pub fn legend_open(&self) -> bool {
        self.legend_open
    }

    pub fn releases_frames(&self) -> bool {
        self.cursor.releases_frames()
    }

    /// Record that one frame of every stream was consumed.
    pub fn advance(&mut self) {
        self.cursor.current_frame += 1;
    }

    /// Apply a key and report the side effect the caller must carry out.
    pub fn handle(&mut self, key: Key) -> Effect {
        match key {
            Key::Quit => Effect::Quit,
            Key::TogglePause => {
                self.cursor.paused = !self.cursor.paused;
                Effect::None
            }
            Key::StepForward => {
                self.cursor.paused = true;
                self.cursor.target_frame = self.cursor.current_frame;
                Effect::None
            }
            Key::StepBackward => self.jump(-STEP_BACK_FRAMES),
            Key::JumpForward => self.jump(JUMP_FRAMES),
            Key::ToggleLegend => {
                self.legend_open = !self.legend_open;
                if self.legend_open {
                    Effect::OpenLegend
                } else {
                    Effect::CloseLegend
                }
            }
            Key::Other(_) => Effect::None,
        }
    }

    fn jump(&mut self, delta: i64) -> Effect {
        self.cursor.current_frame += delta;
        self.cursor.target_frame = self.cursor.current_frame;
        self.cursor.paused = true;
        Effect::SeekAll(self.cursor.target_frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(start_frame: i64, paused: bool) -> PlaybackConfig {
        PlaybackConfig::new(vec!["a.mp4".to_string()], start_frame, 0, paused, false).unwrap()
    }

    /// Simulate one tick: returns whether frames were released.
    fn tick(controller: &mut PlaybackController) -> bool {
        if controller.releases_frames() {
            controller.advance();
            true
        } else {
            false
        }
    }

    #[test]
    fn test_config_validation() {
        let files = vec!["a.mp4".to_string()];
        assert!(PlaybackConfig::new(files.clone(), 1, 0, false, false).is_ok());
        assert!(PlaybackConfig::new(files.clone(), 0, 0, false, false).unwrap_err().is_config());
        assert!(PlaybackConfig::new(files.clone(), -4, 0, false, false).is_err());
        assert!(PlaybackConfig::new(files, 1, -1, false, false).is_err());
        assert!(PlaybackConfig::new(Vec::new(), 1, 0, false, false).is_err());
    }

    #[test]
    fn test_config_start_index() {
        let config = config(25, false);
        assert_eq!(config.start_frame(), 25);
        assert_eq!(config.start_index(), 24);
    }

    #[test]
    fn test_key_mapping() {
        assert_eq!(Key::from_char(' '), Key::TogglePause);
        assert_eq!(Key::from_char('.'), Key::StepForward);
        assert_eq!(Key::from_char(','), Key::StepBackward);
        assert_eq!(Key::from_char('a'), Key::JumpForward);
        assert_eq!(Key::from_char('A'), Key::JumpForward);
        assert_eq!(Key::from_char('l'), Key::ToggleLegend);
        assert_eq!(Key::from_char('L'), Key::ToggleLegend);
        assert_eq!(Key::from_char('\u{1b}'), Key::Quit);
        assert_eq!(Key::from_char('x'), Key::Other('x'));
    }

    #[test]
    fn test_playing_advances_every_tick() {
        let mut controller = PlaybackController::new(&config(1, false));
        for expected in 1..=5 {
            assert!(tick(&mut controller));
            assert_eq!(controller.cursor().current_frame, expected);
        }
    }

    #[test]
    fn test_start_paused_shows_first_frame_once() {
        let mut controller = PlaybackController::new(&config(10, true));
        assert!(tick(&mut controller));
        assert_eq!(controller.cursor().current_frame, 10);
        assert!(!tick(&mut controller));
        assert!(!tick(&mut controller));
        assert_eq!(controller.cursor().current_frame, 10);
    }

    #[test]
    fn test_pause_toggle_keeps_cursor() {
        let mut controller = PlaybackController::new(&config(1, false));
        tick(&mut controller);
        tick(&mut controller);
        let before = controller.cursor();
        assert_eq!(controller.handle(Key::TogglePause), Effect::None);
        assert!(controller.is_paused());
        assert_eq!(controller.cursor().current_frame, before.current_frame);
        assert_eq!(controller.cursor().target_frame, before.target_frame);
        controller.handle(Key::TogglePause);
        assert!(!controller.is_paused());
    }

    #[test]
    fn test_step_forward_advances_exactly_once() {
        let mut controller = PlaybackController::new(&config(1, false));
        for _ in 0..7 {
            tick(&mut controller);
        }
        controller.handle(Key::TogglePause);
        let k = controller.cursor().current_frame;
        assert!(!tick(&mut controller));

        assert_eq!(controller.handle(Key::StepForward), Effect::None);
        assert!(controller.is_paused());
        assert!(tick(&mut controller));
        assert_eq!(controller.cursor().current_frame, k + 1);
        assert!(!tick(&mut controller));
        assert_eq!(controller.cursor().current_frame, k + 1);
        assert!(controller.is_paused());
    }

    #[test]
    fn test_step_forward_from_playing_pauses() {
        let mut controller = PlaybackController::new(&config(1, false));
        tick(&mut controller);
        controller.handle(Key::StepForward);
        assert!(controller.is_paused());
        assert!(tick(&mut controller));
        assert!(!tick(&mut controller));
    }

    #[test]
    fn test_jump_forward_ten() {
        let mut controller = PlaybackController::new(&config(1, false));
        for _ in 0..20 {
            tick(&mut controller);
        }
        let k = controller.cursor().current_frame;
        assert_eq!(controller.handle(Key::JumpForward), Effect::SeekAll(k + 9));
        assert!(controller.is_paused());
        assert_eq!(controller.cursor().target_frame, k + 9);

        // One more frame is read at k + 9, leaving the cursor 10 past k
        assert!(tick(&mut controller));
        assert_eq!(controller.cursor().current_frame, k + 10);
        assert!(!tick(&mut controller));
    }

    #[test]
    fn test_step_backward() {
        let mut controller = PlaybackController::new(&config(1, false));
        for _ in 0..5 {
            tick(&mut controller);
        }
        // Frame 4 is on screen, cursor points at 5
        assert_eq!(controller.handle(Key::StepBackward), Effect::SeekAll(3));
        assert!(controller.is_paused());
        assert!(tick(&mut controller));
        assert_eq!(controller.cursor().current_frame, 4);
        assert!(!tick(&mut controller));
    }

    #[test]
    fn test_step_backward_past_start_is_not_clamped() {
        let mut controller = PlaybackController::new(&config(1, true));
        assert_eq!(controller.handle(Key::StepBackward), Effect::SeekAll(-2));
        assert_eq!(controller.cursor().current_frame, -2);
        assert_eq!(controller.cursor().target_frame, -2);
    }

    #[test]
    fn test_legend_toggle_leaves_cursor() {
        let mut controller = PlaybackController::new(&config(3, false));
        let before = controller.cursor();
        assert_eq!(controller.handle(Key::ToggleLegend), Effect::OpenLegend);
        assert!(controller.legend_open());
        assert_eq!(controller.handle(Key::ToggleLegend), Effect::CloseLegend);
        assert!(!controller.legend_open());
        assert_eq!(controller.cursor(), before);
    }

    #[test]
    fn test_quit_and_unmapped_keys() {
        let mut controller = PlaybackController::new(&config(1, false));
        let before = controller.cursor();
        assert_eq!(controller.handle(Key::Other('z')), Effect::None);
        assert_eq!(controller.cursor(), before);
        assert_eq!(controller.handle(Key::Quit), Effect::Quit);
    }
}
