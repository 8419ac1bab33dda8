//! In-memory collaborators for unit tests.

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::rc::Rc;

use image::Rgba;

use crate::Frame;
use crate::display::{Display, KeyWait, SurfaceId};
use crate::error::{PlayerError, Result};
use crate::stream::{MediaStream, StreamOpener};

#[derive(Debug, Default)]
pub struct StreamState {
    pub position: i64,
    pub seeks: Vec<i64>,
    pub reads: usize,
    pub released: bool,
}

/// Stream whose frame `i` is filled with the gray value `i`.
pub struct FakeStream {
    frames: i64,
    size: (u32, u32),
    state: Rc<RefCell<StreamState>>,
}

impl MediaStream for FakeStream {
    fn frame_count(&self) -> i64 {
        self.frames
    }

    fn native_size(&self) -> (u32, u32) {
        self.size
    }

    fn seek(&mut self, index: i64) {
        let mut state = self.state.borrow_mut();
        state.seeks.push(index);
        state.position = index;
    }

    fn read_next(&mut self) -> Option<Frame> {
        let mut state = self.state.borrow_mut();
        if state.released || state.position < 0 || state.position >= self.frames {
            return None;
        }
        let value = state.position as u8;
        state.position += 1;
        state.reads += 1;
        Some(Frame::from_pixel(
            self.size.0,
            self.size.1,
            Rgba([value, value, value, 255]),
        ))
    }

    fn release(&mut self) {
        self.state.borrow_mut().released = true;
    }

    fn is_open(&self) -> bool {
        !self.state.borrow().released
    }
}

/// Opens [`FakeStream`]s by path. Unknown paths fail to open.
#[derive(Default)]
pub struct FakeOpener {
    media: HashMap<String, (i64, (u32, u32))>,
    pub opened: RefCell<Vec<(String, Rc<RefCell<StreamState>>)>>,
}

impl FakeOpener {
    pub fn with(mut self, path: &str, frames: i64, size: (u32, u32)) -> Self {
        self.media.insert(path.to_string(), (frames, size));
        self
    }

    pub fn state(&self, index: usize) -> Rc<RefCell<StreamState>> {
        self.opened.borrow()[index].1.clone()
    }
}

impl StreamOpener for FakeOpener {
    fn open(&self, path: &str) -> Result<Box<dyn MediaStream>> {
        let Some(&(frames, size)) = self.media.get(path) else {
            return Err(PlayerError::stream_open(path, "no such file"));
        };
        let state = Rc::new(RefCell::new(StreamState::default()));
        self.opened
            .borrow_mut()
            .push((path.to_string(), state.clone()));
        Ok(Box::new(FakeStream {
            frames,
            size,
            state,
        }))
    }
}

/// Display that records every call and replays scripted key polls.
///
/// Each `poll_key` call consumes one script entry. An exhausted script
/// answers `None`, which ends a paused session.
#[derive(Default)]
pub struct FakeDisplay {
    pub keys: VecDeque<Option<char>>,
    pub created: Vec<(SurfaceId, String)>,
    pub moves: Vec<(SurfaceId, i32, i32, u32, u32)>,
    pub shows: Vec<(SurfaceId, (u32, u32))>,
    pub last_frames: HashMap<SurfaceId, Frame>,
    pub destroyed: Vec<SurfaceId>,
    pub closed_by_user: BTreeSet<SurfaceId>,
    pub polls: Vec<KeyWait>,
}

impl FakeDisplay {
    pub fn with_keys(keys: &[Option<char>]) -> Self {
        Self {
            keys: keys.iter().copied().collect(),
            ..Self::default()
        }
    }

    pub fn show_count(&self, surface: SurfaceId) -> usize {
        self.shows.iter().filter(|(s, _)| *s == surface).count()
    }
}

impl Display for FakeDisplay {
    fn create(&mut self, surface: SurfaceId, title: &str) -> Result<()> {
        self.created.push((surface, title.to_string()));
        Ok(())
    }

    fn move_and_resize(
        &mut self,
        surface: SurfaceId,
        x: i32,
        y: i32,
        w: u32,
        h: u32,
    ) -> Result<()> {
        self.moves.push((surface, x, y, w, h));
        Ok(())
    }

    fn show(&mut self, surface: SurfaceId, frame: &Frame) -> Result<()> {
        self.shows.push((surface, frame.dimensions()));
        self.last_frames.insert(surface, frame.clone());
        Ok(())
    }

    fn is_closed_by_user(&mut self, surface: SurfaceId) -> bool {
        self.closed_by_user.contains(&surface)
    }

    fn destroy(&mut self, surface: SurfaceId) {
        self.destroyed.push(surface);
    }

    fn poll_key(&mut self, wait: KeyWait) -> Option<char> {
        self.polls.push(wait);
        self.keys.pop_front().flatten()
    }
}
