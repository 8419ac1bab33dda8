//! Session startup and the top-level run function.
//!
//! Startup is all-or-nothing: every stream is opened and checked before the
//! first surface is created, so a bad file never leaves windows behind.

use crate::compositor;
use crate::display::SurfaceId;
use crate::error::Result;
use crate::geometry::GeometryProvider;
use crate::layout::{self, LayoutMode};
use crate::pacing::FramePacer;
use crate::playback::{PlaybackConfig, PlaybackController};
use crate::render_loop::{Collaborators, RenderLoop, TickOutcome};
use crate::stream::{self, StreamOpener, stream_label};

/// Title of the stitch-mode canvas surface.
pub const CANVAS_TITLE: &str = "JPlayer";

/// How a finished session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    pub outcome: TickOutcome,
    pub ticks: u64,
    /// Cursor position when the loop stopped
    pub final_frame: i64,
    pub ended_streams: usize,
}

/// Open streams, plan the grid and create surfaces.
pub fn start<'a>(
    config: &PlaybackConfig,
    opener: &dyn StreamOpener,
    geometry: &mut dyn GeometryProvider,
    collaborators: Collaborators<'a>,
) -> Result<RenderLoop<'a>> {
    let mut slots = stream::open_all(config, opener)?;

    let desktop = geometry.probe()?;
    log::info!(
        "Desktop work area {}x{} at ({}, {}), title bar {}px",
        desktop.work_area_width,
        desktop.work_area_height,
        desktop.origin_left,
        desktop.origin_top,
        desktop.title_bar_height
    );

    let mode = LayoutMode::from_stitch(config.stitch());
    let plan = match layout::plan(slots.len(), &desktop, slots[0].stream.native_size(), mode) {
        Ok(plan) => plan,
        Err(e) => {
            for slot in &mut slots {
                slot.stream.release();
            }
            return Err(e);
        }
    };
    log::info!(
        "Grid {}x{}, cell {}x{}",
        plan.shape.columns,
        plan.shape.rows,
        plan.cell_width,
        plan.cell_height
    );

    let Collaborators {
        display,
        painter,
        clock,
    } = collaborators;

    let created = match mode {
        LayoutMode::Stitch => display.create(SurfaceId::Canvas, CANVAS_TITLE),
        LayoutMode::Windowed => {
            let title = plan.title_bar_height;
            plan.cells.iter().enumerate().try_for_each(|(i, cell)| {
                let surface = SurfaceId::Stream(i);
                display.create(surface, &stream_label(i, &slots[i].path))?;
                display.move_and_resize(surface, cell.x, cell.y, cell.width, cell.height - title)
            })
        }
    };
    if let Err(e) = created {
        for slot in &mut slots {
            slot.stream.release();
        }
        return Err(e);
    }

    let legend = compositor::legend_frame(&desktop, painter);
    let controller = PlaybackController::new(config);
    let pacer = FramePacer::new(config.fps());

    Ok(RenderLoop::new(
        Collaborators {
            display,
            painter,
            clock,
        },
        slots,
        plan,
        controller,
        pacer,
        legend,
    ))
}

/// Run a whole session and tear it down.
pub fn run(
    config: &PlaybackConfig,
    opener: &dyn StreamOpener,
    geometry: &mut dyn GeometryProvider,
    collaborators: Collaborators<'_>,
) -> Result<SessionSummary> {
    let mut render_loop = start(config, opener, geometry, collaborators)?;
    let result = render_loop.run();
    render_loop.shutdown();

    let outcome = result?;
    Ok(SessionSummary {
        outcome,
        ticks: render_loop.ticks(),
        final_frame: render_loop.controller().cursor().current_frame,
        ended_streams: render_loop.ended().len(),
    })
}
