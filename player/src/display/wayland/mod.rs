//! Wayland backend
//!
//! Each surface is an xdg toplevel drawn from shared memory buffers. The
//! compositor decides where windows go, so requested positions are only
//! used as size hints.

mod buffer;
mod handlers;

use std::collections::{BTreeMap, VecDeque};
use std::time::{Duration, Instant};

use anyhow::Context;
use engine::display::{Display, KeyWait, SurfaceId};
use engine::{DesktopGeometry, Frame, PlayerError};
use smithay_client_toolkit::compositor::CompositorState;
use smithay_client_toolkit::output::OutputState;
use smithay_client_toolkit::registry::RegistryState;
use smithay_client_toolkit::seat::SeatState;
use smithay_client_toolkit::shell::WaylandSurface;
use smithay_client_toolkit::shell::xdg::XdgShell;
use smithay_client_toolkit::shell::xdg::window::{Window, WindowDecorations};
use smithay_client_toolkit::shm::Shm;
use wayland_client::globals::registry_queue_init;
use wayland_client::protocol::wl_keyboard;
use wayland_client::{Connection, EventQueue, QueueHandle};

use buffer::ShmBuffer;

const APP_ID: &str = "gridplay";
/// Sleep between event reads while waiting for a key
const POLL_INTERVAL: Duration = Duration::from_millis(1);
/// Buffers kept per window so one can be written while another is held
const MAX_BUFFERS: usize = 3;

pub(crate) struct WindowData {
    window: Window,
    configured: bool,
    close_requested: bool,
    /// Frame shown before the first configure arrived
    pending: Option<Frame>,
    buffers: Vec<ShmBuffer>,
}

pub(crate) struct WaylandState {
    registry_state: RegistryState,
    compositor_state: CompositorState,
    xdg_shell: XdgShell,
    output_state: OutputState,
    seat_state: SeatState,
    shm: Shm,
    windows: BTreeMap<SurfaceId, WindowData>,
    keyboard: Option<wl_keyboard::WlKeyboard>,
    keys: VecDeque<char>,
}

impl WaylandState {
    fn surface_of(&self, window: &Window) -> Option<SurfaceId> {
        self.windows
            .iter()
            .find(|(_, data)| data.window == *window)
            .map(|(id, _)| *id)
    }

    /// Attach `frame` to the window of `surface`
    fn present(
        &mut self,
        qh: &QueueHandle<Self>,
        surface: SurfaceId,
        frame: &Frame,
    ) -> anyhow::Result<()> {
        let shm = self.shm.wl_shm();
        let data = self
            .windows
            .get_mut(&surface)
            .with_context(|| format!("unknown surface {}", surface))?;

        if !data.configured {
            data.pending = Some(frame.clone());
            return Ok(());
        }

        let size = frame.dimensions();
        data.buffers
            .retain(|b| b.is_busy() || b.dimensions() == size);
        let index = match data
            .buffers
            .iter()
            .position(|b| !b.is_busy() && b.dimensions() == size)
        {
            Some(index) => index,
            None => {
                if data.buffers.len() >= MAX_BUFFERS {
                    log::trace!("All buffers of {} busy, dropping frame", surface);
                    return Ok(());
                }
                data.buffers.push(ShmBuffer::new(shm, size.0, size.1, qh)?);
                data.buffers.len() - 1
            }
        };

        let buffer = &mut data.buffers[index];
        buffer.write_frame(frame)?;

        let wl_surface = data.window.wl_surface();
        wl_surface.attach(Some(buffer.buffer()), 0, 0);
        wl_surface.damage_buffer(0, 0, size.0 as i32, size.1 as i32);
        wl_surface.commit();
        buffer.mark_busy();
        Ok(())
    }
}

/// Display backed by a Wayland compositor.
pub struct WaylandDisplay {
    _conn: Connection,
    event_queue: EventQueue<WaylandState>,
    qh: QueueHandle<WaylandState>,
    state: WaylandState,
    title_bar_height: u32,
    disconnected: bool,
}

impl WaylandDisplay {
    pub fn connect(title_bar_height: u32) -> anyhow::Result<Self> {
        let conn = Connection::connect_to_env().context("Failed to connect to Wayland")?;
        let (globals, mut event_queue) = registry_queue_init(&conn)?;
        let qh = event_queue.handle();

        let mut state = WaylandState {
            registry_state: RegistryState::new(&globals),
            compositor_state: CompositorState::bind(&globals, &qh)?,
            xdg_shell: XdgShell::bind(&globals, &qh)?,
            output_state: OutputState::new(&globals, &qh),
            seat_state: SeatState::new(&globals, &qh),
            shm: Shm::bind(&globals, &qh)?,
            windows: BTreeMap::new(),
            keyboard: None,
            keys: VecDeque::new(),
        };

        log::info!("Connected to Wayland compositor");

        // Outputs, then their info events
        event_queue.roundtrip(&mut state)?;
        event_queue.roundtrip(&mut state)?;

        Ok(Self {
            _conn: conn,
            event_queue,
            qh,
            state,
            title_bar_height,
            disconnected: false,
        })
    }

    /// Work area of the first output.
    pub fn geometry(&self) -> DesktopGeometry {
        let info = self
            .state
            .output_state
            .outputs()
            .find_map(|output| self.state.output_state.info(&output));

        let Some((width, height)) = info.as_ref().and_then(|i| i.logical_size) else {
            let fallback = DesktopGeometry {
                title_bar_height: self.title_bar_height,
                ..DesktopGeometry::default()
            };
            log::warn!(
                "No output size reported, assuming {}x{}",
                fallback.work_area_width,
                fallback.work_area_height
            );
            return fallback;
        };
        let (left, top) = info
            .as_ref()
            .and_then(|i| i.logical_position)
            .unwrap_or((0, 0));

        DesktopGeometry {
            work_area_width: width.max(0) as u32,
            work_area_height: height.max(0) as u32,
            origin_left: left,
            origin_top: top,
            title_bar_height: self.title_bar_height,
        }
    }

    /// Dispatch whatever the compositor has sent without blocking
    fn pump(&mut self) {
        if self.disconnected {
            return;
        }
        if let Err(e) = self.try_pump() {
            log::error!("Wayland connection lost: {}", e);
            self.disconnected = true;
        }
    }

    fn try_pump(&mut self) -> anyhow::Result<()> {
        self.event_queue.dispatch_pending(&mut self.state)?;
        self.event_queue.flush()?;
        if let Some(guard) = self.event_queue.prepare_read() {
            match guard.read() {
                Ok(_) => {}
                Err(wayland_client::backend::WaylandError::Io(e))
                    if e.kind() == std::io::ErrorKind::WouldBlock => {}
                Err(e) => return Err(e.into()),
            }
        }
        self.event_queue.dispatch_pending(&mut self.state)?;
        Ok(())
    }
}

impl Display for WaylandDisplay {
    fn create(&mut self, surface: SurfaceId, title: &str) -> engine::Result<()> {
        let wl_surface = self.state.compositor_state.create_surface(&self.qh);
        let window =
            self.state
                .xdg_shell
                .create_window(wl_surface, WindowDecorations::RequestServer, &self.qh);
        window.set_title(title);
        window.set_app_id(APP_ID);
        window.commit();

        self.state.windows.insert(
            surface,
            WindowData {
                window,
                configured: false,
                close_requested: false,
                pending: None,
                buffers: Vec::new(),
            },
        );
        log::debug!("Created window {} \"{}\"", surface, title);
        self.pump();
        Ok(())
    }

    fn move_and_resize(
        &mut self,
        surface: SurfaceId,
        x: i32,
        y: i32,
        w: u32,
        h: u32,
    ) -> engine::Result<()> {
        let data = self
            .state
            .windows
            .get(&surface)
            .ok_or_else(|| PlayerError::Display(format!("unknown surface {}", surface)))?;
        log::debug!(
            "Window {} wants {},{} {}x{}; placement is left to the compositor",
            surface,
            x,
            y,
            w,
            h
        );
        data.window.set_min_size(Some((w, h)));
        data.window.set_max_size(Some((w, h)));
        data.window.commit();
        Ok(())
    }

    fn show(&mut self, surface: SurfaceId, frame: &Frame) -> engine::Result<()> {
        self.state
            .present(&self.qh, surface, frame)
            .map_err(|e| PlayerError::Display(format!("{:#}", e)))?;
        self.pump();
        Ok(())
    }

    fn is_closed_by_user(&mut self, surface: SurfaceId) -> bool {
        self.pump();
        self.state
            .windows
            .get(&surface)
            .is_some_and(|data| data.close_requested)
    }

    fn destroy(&mut self, surface: SurfaceId) {
        if self.state.windows.remove(&surface).is_some() {
            log::debug!("Destroyed window {}", surface);
            self.pump();
        }
    }

    fn poll_key(&mut self, wait: KeyWait) -> Option<char> {
        let deadline = match wait {
            KeyWait::Timeout(timeout) => Some(Instant::now() + timeout),
            KeyWait::Forever => None,
        };

        loop {
            self.pump();
            if let Some(key) = self.state.keys.pop_front() {
                return Some(key);
            }
            if self.disconnected {
                return None;
            }
            if deadline.is_some_and(|d| Instant::now() >= d) {
                return None;
            }
            std::thread::sleep(POLL_INTERVAL);
        }
    }
}
