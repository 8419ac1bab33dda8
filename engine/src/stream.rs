//! Media stream collaborators and end-of-stream bookkeeping.

use std::collections::BTreeSet;

use crate::Frame;
use crate::error::{PlayerError, Result};
use crate::playback::PlaybackConfig;

/// A decoded media source that yields frames in order.
///
/// Seek targets are never validated by the caller: negative or past-the-end
/// indices are handed to the implementation as-is.
pub trait MediaStream {
    /// Total number of frames, as reported by the container.
    fn frame_count(&self) -> i64;

    /// Native `(width, height)` of the frames.
    fn native_size(&self) -> (u32, u32);

    /// Position the stream so the next read returns frame `index`.
    fn seek(&mut self, index: i64);

    /// Read the next frame, or `None` when the stream is exhausted or
    /// released.
    fn read_next(&mut self) -> Option<Frame>;

    /// Free the underlying decoder. Later reads return `None`.
    fn release(&mut self);

    fn is_open(&self) -> bool;
}

/// Factory for streams, one call per path.
pub trait StreamOpener {
    fn open(&self, path: &str) -> Result<Box<dyn MediaStream>>;
}

/// Stream indices that produced no frame.
///
/// Only ever grows. Once it covers every stream the session ends.
#[derive(Debug, Clone, Default)]
pub struct StreamEndSet {
    ended: BTreeSet<usize>,
    total: usize,
}

impl StreamEndSet {
    pub fn new(total: usize) -> Self {
        Self {
            ended: BTreeSet::new(),
            total,
        }
    }

    /// Record `index` as ended. Returns `true` the first time.
    pub fn insert(&mut self, index: usize) -> bool {
        self.ended.insert(index)
    }

    pub fn contains(&self, index: usize) -> bool {
        self.ended.contains(&index)
    }

    pub fn len(&self) -> usize {
        self.ended.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ended.is_empty()
    }

    /// Whether every stream has ended.
    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.ended.len() >= self.total
    }
}

/// An opened stream together with the path it came from.
pub struct StreamSlot {
    pub path: String,
    pub stream: Box<dyn MediaStream>,
}

impl StreamSlot {
    /// Overlay text identifying the stream.
    pub fn label(&self, index: usize) -> String {
        stream_label(index, &self.path)
    }
}

/// `"Window <i+1>: <path>"`
pub fn stream_label(index: usize, path: &str) -> String {
    format!("Window {}: {}", index + 1, path)
}

/// Open every stream in `config`, failing on the first one that cannot be
/// opened or that is shorter than the start frame.
///
/// Each stream is left positioned at the start frame.
pub fn open_all(config: &PlaybackConfig, opener: &dyn StreamOpener) -> Result<Vec<StreamSlot>> {
    let mut slots = Vec::with_capacity(config.streams().len());

    for path in config.streams() {
        let mut stream = opener.open(path)?;
        if !stream.is_open() {
            return Err(PlayerError::stream_open(path.as_str(), "stream is not open"));
        }

        let frame_count = stream.frame_count();
        if frame_count < config.start_frame() {
            return Err(PlayerError::StartFrameOutOfRange {
                path: path.clone(),
                start_frame: config.start_frame(),
                frame_count,
            });
        }

        stream.seek(config.start_index());
        let (width, height) = stream.native_size();
        log::info!(
            "Opened {}: {}x{}, {} frame(s)",
            path,
            width,
            height,
            frame_count
        );

        slots.push(StreamSlot {
            path: path.clone(),
            stream,
        });
    }

    Ok(slots)
}
