//! Layout and playback engine for gridplay.
//!
//! The engine plans a grid of cells for N media streams, keeps all streams
//! on a single frame cursor and drives them through a [`display::Display`]
//! one tick at a time. Decoding, windowing, text rendering and time are
//! collaborators behind traits so the whole loop runs in tests without a
//! window system.

pub mod compositor;
pub mod display;
pub mod error;
pub mod geometry;
pub mod layout;
pub mod macros;
pub mod pacing;
pub mod playback;
pub mod render_loop;
pub mod session;
pub mod stream;

#[cfg(test)]
mod fakes;

/// A decoded RGBA frame.
pub type Frame = image::RgbaImage;

pub use error::{PlayerError, Result};
pub use geometry::{DesktopGeometry, GeometryProvider};
pub use layout::{GridShape, LayoutCell, LayoutMode, LayoutPlan};
pub use playback::{Key, PlaybackConfig, PlaybackController, PlaybackCursor};
pub use render_loop::{Collaborators, RenderLoop, TickOutcome};
pub use session::SessionSummary;
pub use stream::{MediaStream, StreamEndSet, StreamOpener};
