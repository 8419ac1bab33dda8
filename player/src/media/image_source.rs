use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use engine::{Frame, MediaStream};
use image::AnimationDecoder;
use image::codecs::gif::GifDecoder;

use super::is_sequence_image;

/// Where the frames of a sequence come from
enum Frames {
    /// Fully decoded up front (stills and GIF animations)
    Decoded(Vec<Frame>),
    /// One image file per frame, decoded on read
    Files(Vec<PathBuf>),
}

impl Frames {
    fn len(&self) -> usize {
        match self {
            Self::Decoded(frames) => frames.len(),
            Self::Files(files) => files.len(),
        }
    }
}

/// A finite run of frames read from still images.
pub struct ImageSequence {
    frames: Option<Frames>,
    size: (u32, u32),
    position: usize,
    count: i64,
}

impl ImageSequence {
    fn new(frames: Frames, size: (u32, u32)) -> Self {
        let count = frames.len() as i64;
        Self {
            frames: Some(frames),
            size,
            position: 0,
            count,
        }
    }

    /// A single image, shown as a one-frame stream.
    pub fn open_still(path: &Path) -> Result<Self> {
        let image = image::open(path)
            .with_context(|| format!("Failed to decode image {}", path.display()))?
            .to_rgba8();
        let size = image.dimensions();
        log::debug!("Opened still {} ({}x{})", path.display(), size.0, size.1);
        Ok(Self::new(Frames::Decoded(vec![image]), size))
    }

    /// Every frame of an animated GIF.
    pub fn open_gif(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open GIF: {}", path.display()))?;
        let decoder =
            GifDecoder::new(BufReader::new(file)).context("Failed to create GIF decoder")?;
        let frames: Vec<Frame> = decoder
            .into_frames()
            .collect_frames()
            .context("Failed to decode GIF frame")?
            .into_iter()
            .map(|frame| frame.into_buffer())
            .collect();

        let size = frames
            .first()
            .map(|f| f.dimensions())
            .with_context(|| format!("GIF has no frames: {}", path.display()))?;
        log::debug!(
            "Opened GIF {} ({} frames, {}x{})",
            path.display(),
            frames.len(),
            size.0,
            size.1
        );
        Ok(Self::new(Frames::Decoded(frames), size))
    }

    /// The images of a directory, in file name order.
    pub fn open_dir(path: &Path) -> Result<Self> {
        let mut files: Vec<PathBuf> = fs::read_dir(path)
            .with_context(|| format!("Failed to read directory {}", path.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && is_sequence_image(p))
            .collect();
        files.sort();

        let first = files
            .first()
            .with_context(|| format!("No images found in {}", path.display()))?;
        let size = image::image_dimensions(first)
            .with_context(|| format!("Failed to read image size of {}", first.display()))?;
        log::debug!(
            "Opened image directory {} ({} frames, {}x{})",
            path.display(),
            files.len(),
            size.0,
            size.1
        );
        Ok(Self::new(Frames::Files(files), size))
    }
}

impl MediaStream for ImageSequence {
    fn frame_count(&self) -> i64 {
        self.count
    }

    fn native_size(&self) -> (u32, u32) {
        self.size
    }

    fn seek(&mut self, index: i64) {
        self.position = index.max(0) as usize;
    }

    fn read_next(&mut self) -> Option<Frame> {
        let frame = match self.frames.as_ref()? {
            Frames::Decoded(frames) => frames.get(self.position).cloned(),
            Frames::Files(files) => {
                let path = files.get(self.position)?;
                match image::open(path) {
                    Ok(image) => Some(image.to_rgba8()),
                    Err(e) => {
                        log::warn!("Failed to decode {}: {}", path.display(), e);
                        None
                    }
                }
            }
        };
        if frame.is_some() {
            self.position += 1;
        }
        frame
    }

    fn release(&mut self) {
        self.frames = None;
    }

    fn is_open(&self) -> bool {
        self.frames.is_some()
    }
}
