//! Stream opener backed by image decoding and, optionally, GStreamer.

mod image_source;
#[cfg(feature = "video")]
mod video;

use std::path::Path;

use engine::{MediaStream, PlayerError, StreamOpener};

pub use image_source::ImageSequence;

/// Image formats read as stills or as members of an image directory
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "webp", "tif", "tiff"];

/// Opens each path with the decoder that matches its kind.
#[derive(Debug, Default)]
pub struct MediaOpener;

impl MediaOpener {
    pub fn new() -> Self {
        Self
    }
}

impl StreamOpener for MediaOpener {
    fn open(&self, path: &str) -> engine::Result<Box<dyn MediaStream>> {
        let fs_path = Path::new(path);
        if !fs_path.exists() {
            return Err(PlayerError::stream_open(path, "no such file or directory"));
        }

        let opened: anyhow::Result<Box<dyn MediaStream>> = match MediaKind::of(fs_path) {
            MediaKind::Directory => {
                ImageSequence::open_dir(fs_path).map(|s| Box::new(s) as Box<dyn MediaStream>)
            }
            MediaKind::Gif => {
                ImageSequence::open_gif(fs_path).map(|s| Box::new(s) as Box<dyn MediaStream>)
            }
            MediaKind::Video => open_video(fs_path),
            MediaKind::Image => {
                ImageSequence::open_still(fs_path).map(|s| Box::new(s) as Box<dyn MediaStream>)
            }
        };

        opened.map_err(|e| PlayerError::stream_open(path, format!("{:#}", e)))
    }
}

#[cfg(feature = "video")]
fn open_video(path: &Path) -> anyhow::Result<Box<dyn MediaStream>> {
    video::VideoStream::open(path).map(|s| Box::new(s) as Box<dyn MediaStream>)
}

#[cfg(not(feature = "video"))]
fn open_video(path: &Path) -> anyhow::Result<Box<dyn MediaStream>> {
    anyhow::bail!(
        "{} is a video, but video support is not compiled in (enable the `video` feature)",
        path.display()
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MediaKind {
    Directory,
    Gif,
    Video,
    Image,
}

impl MediaKind {
    fn of(path: &Path) -> Self {
        if path.is_dir() {
            return Self::Directory;
        }
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "gif" => Self::Gif,
            "mp4" | "webm" | "mkv" | "avi" | "mov" | "flv" | "wmv" | "m4v" | "ogv" | "mpg"
            | "mpeg" | "ts" => Self::Video,
            _ => Self::Image,
        }
    }
}

/// Whether `path` is an image that belongs in an image sequence
fn is_sequence_image(path: &Path) -> bool {
    if let Some(ext) = path.extension()
        && let Some(ext) = ext.to_str()
    {
        return IMAGE_EXTENSIONS.iter().any(|e| e.eq_ignore_ascii_case(ext));
    }
    false
}
