//! Desktop geometry captured once at startup.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Usable desktop area and window decoration metrics.
///
/// Probed once by a [`GeometryProvider`] and handed to the layout planner
/// as a plain value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DesktopGeometry {
    /// Width of the work area (desktop minus panels)
    pub work_area_width: u32,
    /// Height of the work area
    pub work_area_height: u32,
    /// Left edge of the work area in global coordinates
    pub origin_left: i32,
    /// Top edge of the work area in global coordinates
    pub origin_top: i32,
    /// Height of a window title bar added by the window manager
    pub title_bar_height: u32,
}

impl Default for DesktopGeometry {
    fn default() -> Self {
        Self {
            work_area_width: 1920,
            work_area_height: 1080,
            origin_left: 0,
            origin_top: 0,
            title_bar_height: 0,
        }
    }
}

/// Source of desktop metrics.
pub trait GeometryProvider {
    /// Query the current desktop geometry.
    fn probe(&mut self) -> Result<DesktopGeometry>;
}

/// A fixed geometry is its own provider.
impl GeometryProvider for DesktopGeometry {
    fn probe(&mut self) -> Result<DesktopGeometry> {
        Ok(*self)
    }
}
