//! Window-less display
//!
//! Surfaces only exist as bookkeeping. Keys are read from stdin, one
//! character at a time, and presented frames can be written out as PNG
//! files for inspection.
//!
//! Stdin is left in the terminal's line mode, so typed keys arrive once
//! Enter is pressed: `...` then Enter steps three frames. Piped input needs
//! no Enter.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;

use engine::display::{Display, KeyWait, SurfaceId};
use engine::{Frame, PlayerError};

#[derive(Debug, Clone, Default)]
struct HeadlessSurface {
    title: String,
    position: (i32, i32),
    size: Option<(u32, u32)>,
    presented: u64,
}

pub struct HeadlessDisplay {
    surfaces: BTreeMap<SurfaceId, HeadlessSurface>,
    input: Receiver<char>,
    output_dir: Option<PathBuf>,
}

impl HeadlessDisplay {
    /// Read keys from stdin on a background thread.
    pub fn from_stdin(output_dir: Option<PathBuf>) -> io::Result<Self> {
        let (tx, rx) = mpsc::channel();
        thread::Builder::new()
            .name("stdin-keys".into())
            .spawn(move || {
                let stdin = io::stdin();
                for byte in stdin.lock().bytes() {
                    let Ok(byte) = byte else { break };
                    let c = byte as char;
                    if c == '\n' || c == '\r' {
                        continue;
                    }
                    if tx.send(c).is_err() {
                        break;
                    }
                }
                log::debug!("stdin closed");
            })?;
        Self::with_input(rx, output_dir)
    }

    /// Use an existing key channel. Dropping the sender closes input.
    pub fn with_input(input: Receiver<char>, output_dir: Option<PathBuf>) -> io::Result<Self> {
        if let Some(dir) = &output_dir {
            fs::create_dir_all(dir)?;
            log::info!("Writing presented frames to {}", dir.display());
        }
        Ok(Self {
            surfaces: BTreeMap::new(),
            input,
            output_dir,
        })
    }

    fn surface_mut(&mut self, surface: SurfaceId) -> engine::Result<&mut HeadlessSurface> {
        self.surfaces
            .get_mut(&surface)
            .ok_or_else(|| PlayerError::Display(format!("unknown surface {}", surface)))
    }

    fn save(&self, surface: SurfaceId, index: u64, frame: &Frame) -> engine::Result<()> {
        let Some(dir) = &self.output_dir else {
            return Ok(());
        };
        let path = dir.join(format!("{}-{:06}.png", surface, index));
        frame
            .save(&path)
            .map_err(|e| PlayerError::Io(format!("{}: {}", path.display(), e)))
    }
}

impl Display for HeadlessDisplay {
    fn create(&mut self, surface: SurfaceId, title: &str) -> engine::Result<()> {
        log::debug!("Created surface {} \"{}\"", surface, title);
        self.surfaces.insert(
            surface,
            HeadlessSurface {
                title: title.to_string(),
                ..HeadlessSurface::default()
            },
        );
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
        let entry = self.surface_mut(surface)?;
        entry.position = (x, y);
        entry.size = Some((w, h));
        log::debug!("Placed {} \"{}\" at {},{} {}x{}", surface, entry.title, x, y, w, h);
        Ok(())
    }

    fn show(&mut self, surface: SurfaceId, frame: &Frame) -> engine::Result<()> {
        let entry = self.surface_mut(surface)?;
        let index = entry.presented;
        entry.presented += 1;
        self.save(surface, index, frame)
    }

    fn is_closed_by_user(&mut self, _surface: SurfaceId) -> bool {
        false
    }

    fn destroy(&mut self, surface: SurfaceId) {
        if let Some(entry) = self.surfaces.remove(&surface) {
            log::debug!(
                "Destroyed surface {} at {:?} size {:?} after {} frame(s)",
                surface,
                entry.position,
                entry.size,
                entry.presented
            );
        }
    }

    fn poll_key(&mut self, wait: KeyWait) -> Option<char> {
        match wait {
            KeyWait::Timeout(timeout) => match self.input.recv_timeout(timeout) {
                Ok(c) => Some(c),
                Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
            },
            KeyWait::Forever => self.input.recv().ok(),
        }
    }
}
