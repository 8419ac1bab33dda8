//! Display backends

pub mod headless;
#[cfg(feature = "wayland")]
pub mod wayland;

pub use headless::HeadlessDisplay;
#[cfg(feature = "wayland")]
pub use wayland::WaylandDisplay;
