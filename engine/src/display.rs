//! Window-system collaborator.

use std::fmt;
use std::time::Duration;

use crate::Frame;
use crate::error::Result;

/// A presentable surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SurfaceId {
    /// Own surface of stream `i` in windowed mode
    Stream(usize),
    /// Composed canvas in stitch mode
    Canvas,
    /// Key binding help
    Legend,
}

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stream(i) => write!(f, "stream-{}", i + 1),
            Self::Canvas => write!(f, "canvas"),
            Self::Legend => write!(f, "legend"),
        }
    }
}

/// How long [`Display::poll_key`] may wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyWait {
    Timeout(Duration),
    Forever,
}

impl KeyWait {
    /// Non-blocking poll.
    pub const NOW: KeyWait = KeyWait::Timeout(Duration::from_millis(1));
}

/// Surfaces, frame presentation and keyboard input.
pub trait Display {
    /// Create a surface with a window title.
    fn create(&mut self, surface: SurfaceId, title: &str) -> Result<()>;

    fn move_and_resize(&mut self, surface: SurfaceId, x: i32, y: i32, w: u32, h: u32)
    -> Result<()>;

    /// Present a frame on a surface.
    fn show(&mut self, surface: SurfaceId, frame: &Frame) -> Result<()>;

    /// Whether the user closed the surface since it was created.
    fn is_closed_by_user(&mut self, surface: SurfaceId) -> bool;

    fn destroy(&mut self, surface: SurfaceId);

    /// Wait for one key press.
    ///
    /// With [`KeyWait::Forever`], `None` means input is gone for good.
    fn poll_key(&mut self, wait: KeyWait) -> Option<char>;

    /// Create and show the legend surface.
    fn open_legend(&mut self, frame: &Frame) -> Result<()> {
        self.create(SurfaceId::Legend, "Legend")?;
        self.show(SurfaceId::Legend, frame)
    }

    fn close_legend(&mut self) {
        self.destroy(SurfaceId::Legend);
    }
}
