//! GStreamer-backed video streams
//!
//! Every stream owns a software decoding pipeline that ends in an appsink
//! delivering RGBA frames. Frames are pulled on demand, so the pipeline
//! only runs as fast as the render loop consumes.

use std::path::Path;
use std::sync::OnceLock;

use anyhow::{Context, Result};
use engine::{Frame, MediaStream};
use gstreamer as gst;
use gstreamer::prelude::*;
use gstreamer_app as gst_app;
use gstreamer_video as gst_video;

/// How long a single pull may block before the stream counts as ended
const PULL_TIMEOUT_SECS: u64 = 5;
/// Frames queued in the appsink ahead of the reader
const MAX_QUEUED_FRAMES: u32 = 2;

/// Initialize GStreamer once per process
pub fn initialize_gstreamer() -> Result<()> {
    static GSTREAMER_INITIALIZED: OnceLock<Result<(), String>> = OnceLock::new();

    GSTREAMER_INITIALIZED
        .get_or_init(|| {
            let result = gst::init().map_err(|e| e.to_string());
            if result.is_ok() {
                log::info!("GStreamer initialized");
            }
            result
        })
        .clone()
        .map_err(|e| anyhow::anyhow!("Failed to initialize GStreamer: {}", e))
}

/// Build a decoding pipeline for any container GStreamer can demux
fn build_pipeline(path: &Path) -> Result<(gst::Pipeline, gst_app::AppSink)> {
    let pipeline_str = format!(
        "filesrc location=\"{}\" ! decodebin ! videoconvert ! video/x-raw,format=RGBA ! appsink name=sink",
        path.display()
    );
    log::debug!("GStreamer pipeline: {}", pipeline_str);

    let pipeline = gst::parse::launch(&pipeline_str)
        .context("Failed to create GStreamer pipeline")?
        .dynamic_cast::<gst::Pipeline>()
        .map_err(|_| anyhow::anyhow!("Pipeline is not a gst::Pipeline"))?;

    let app_sink = pipeline
        .by_name("sink")
        .context("Failed to get appsink from pipeline")?
        .dynamic_cast::<gst_app::AppSink>()
        .map_err(|_| anyhow::anyhow!("sink is not an AppSink"))?;

    Ok((pipeline, app_sink))
}

/// Pull-mode appsink: no clock sync, bounded queue, nothing dropped
fn configure_app_sink(app_sink: &gst_app::AppSink) {
    app_sink.set_property("sync", false);
    app_sink.set_property("max-buffers", MAX_QUEUED_FRAMES);
    app_sink.set_property("drop", false);
}

/// First error posted on the pipeline bus, if any
fn bus_error(pipeline: &gst::Pipeline) -> Option<String> {
    let bus = pipeline.bus()?;
    let message = bus.pop_filtered(&[gst::MessageType::Error])?;
    match message.view() {
        gst::MessageView::Error(err) => Some(err.error().to_string()),
        _ => None,
    }
}

pub struct VideoStream {
    pipeline: Option<gst::Pipeline>,
    app_sink: gst_app::AppSink,
    info: gst_video::VideoInfo,
    frame_count: i64,
    exhausted: bool,
}

impl VideoStream {
    pub fn open(path: &Path) -> Result<Self> {
        initialize_gstreamer()?;
        let (pipeline, app_sink) = build_pipeline(path)?;
        configure_app_sink(&app_sink);

        if pipeline.set_state(gst::State::Paused).is_err() {
            let reason = bus_error(&pipeline).unwrap_or_else(|| "state change failed".into());
            let _ = pipeline.set_state(gst::State::Null);
            anyhow::bail!("Failed to start pipeline: {}", reason);
        }

        // Only read for its caps; the same buffer is the first sample once playing
        let preroll = match app_sink.pull_preroll() {
            Ok(sample) => sample,
            Err(_) => {
                let reason = bus_error(&pipeline).unwrap_or_else(|| "no video frames".into());
                let _ = pipeline.set_state(gst::State::Null);
                anyhow::bail!("Failed to preroll: {}", reason);
            }
        };

        let info = preroll
            .caps()
            .context("Preroll sample has no caps")
            .and_then(|caps| {
                gst_video::VideoInfo::from_caps(caps).context("Failed to read video caps")
            });
        let info = match info {
            Ok(info) => info,
            Err(e) => {
                let _ = pipeline.set_state(gst::State::Null);
                return Err(e);
            }
        };

        let fps = info.fps();
        let frames_per_sec = if fps.denom() > 0 && fps.numer() > 0 {
            fps.numer() as f64 / fps.denom() as f64
        } else {
            log::warn!("Could not detect FPS of {}, assuming 30fps", path.display());
            30.0
        };
        let frame_count = pipeline
            .query_duration::<gst::ClockTime>()
            .map(|d| (d.nseconds() as f64 / 1e9 * frames_per_sec).round() as i64)
            .unwrap_or(0);

        if pipeline.set_state(gst::State::Playing).is_err() {
            let _ = pipeline.set_state(gst::State::Null);
            anyhow::bail!("Failed to start playback");
        }

        log::info!(
            "Opened video {} ({}x{}, {:.2}fps, {} frames)",
            path.display(),
            info.width(),
            info.height(),
            frames_per_sec,
            frame_count
        );

        Ok(Self {
            pipeline: Some(pipeline),
            app_sink,
            info,
            frame_count,
            exhausted: false,
        })
    }

    fn frame_time(&self, index: i64) -> gst::ClockTime {
        let fps = self.info.fps();
        let (numer, denom) = if fps.numer() > 0 && fps.denom() > 0 {
            (fps.numer() as u64, fps.denom() as u64)
        } else {
            (30, 1)
        };
        let index = index.max(0) as u64;
        gst::ClockTime::from_nseconds(index * 1_000_000_000 * denom / numer)
    }

    /// Copy a sample into a tightly packed RGBA frame
    fn to_frame(&self, sample: &gst::Sample) -> Option<Frame> {
        let buffer = sample.buffer()?;
        let map = buffer.map_readable().ok()?;
        let data = map.as_slice();

        let (width, height) = (self.info.width(), self.info.height());
        let row_bytes = width as usize * 4;
        let stride = self
            .info
            .stride()
            .first()
            .map(|&s| s as usize)
            .unwrap_or(row_bytes);

        let mut pixels = Vec::with_capacity(row_bytes * height as usize);
        for row in 0..height as usize {
            let start = row * stride;
            pixels.extend_from_slice(data.get(start..start + row_bytes)?);
        }
        Frame::from_raw(width, height, pixels)
    }
}

impl MediaStream for VideoStream {
    fn frame_count(&self) -> i64 {
        self.frame_count
    }

    fn native_size(&self) -> (u32, u32) {
        (self.info.width(), self.info.height())
    }

    fn seek(&mut self, index: i64) {
        let Some(pipeline) = &self.pipeline else {
            return;
        };
        if index >= self.frame_count {
            self.exhausted = true;
            return;
        }

        let position = self.frame_time(index);
        match pipeline.seek_simple(gst::SeekFlags::FLUSH | gst::SeekFlags::ACCURATE, position) {
            Ok(()) => self.exhausted = false,
            Err(e) => {
                log::warn!("Seek to frame {} failed: {}", index, e);
                self.exhausted = true;
            }
        }
    }

    fn read_next(&mut self) -> Option<Frame> {
        if self.pipeline.is_none() || self.exhausted {
            return None;
        }
        let sample = self
            .app_sink
            .try_pull_sample(gst::ClockTime::from_seconds(PULL_TIMEOUT_SECS));
        let Some(sample) = sample else {
            self.exhausted = true;
            return None;
        };
        let frame = self.to_frame(&sample);
        if frame.is_none() {
            log::warn!("Dropping undecodable video sample");
        }
        frame
    }

    fn release(&mut self) {
        if let Some(pipeline) = self.pipeline.take() {
            let _ = pipeline.set_state(gst::State::Null);
            log::debug!("Released video pipeline");
        }
    }

    fn is_open(&self) -> bool {
        self.pipeline.is_some()
    }
}

impl Drop for VideoStream {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_fails_to_open() {
        if initialize_gstreamer().is_err() {
            return;
        }
        assert!(VideoStream::open(Path::new("/nonexistent/clip.mkv")).is_err());
    }

    /// Encode a short test pattern. Returns false when the plugins are missing.
    fn write_test_clip(path: &Path, frames: u32) -> bool {
        let description = format!(
            "videotestsrc num-buffers={} ! video/x-raw,format=I420,width=64,height=36,framerate=30/1 ! matroskamux ! filesink location=\"{}\"",
            frames,
            path.display()
        );
        let Ok(pipeline) = gst::parse::launch(&description) else {
            return false;
        };
        if pipeline.set_state(gst::State::Playing).is_err() {
            let _ = pipeline.set_state(gst::State::Null);
            return false;
        }
        let finished = pipeline.bus().and_then(|bus| {
            bus.timed_pop_filtered(
                gst::ClockTime::from_seconds(10),
                &[gst::MessageType::Eos, gst::MessageType::Error],
            )
        });
        let _ = pipeline.set_state(gst::State::Null);
        match finished {
            Some(message) => matches!(message.view(), gst::MessageView::Eos(_)),
            None => false,
        }
    }

    #[test]
    fn test_first_frame_is_read_once() {
        if initialize_gstreamer().is_err() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mkv");
        if !write_test_clip(&path, 6) {
            return;
        }

        let mut stream = VideoStream::open(&path).unwrap();
        assert_eq!(stream.native_size(), (64, 36));
        assert_eq!(stream.frame_count(), 6);

        let mut reads = 0;
        while stream.read_next().is_some() {
            reads += 1;
        }
        assert_eq!(reads, 6);
    }

    #[test]
    fn test_seek_past_end_reads_nothing() {
        if initialize_gstreamer().is_err() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mkv");
        if !write_test_clip(&path, 3) {
            return;
        }

        let mut stream = VideoStream::open(&path).unwrap();
        stream.seek(3);
        assert!(stream.read_next().is_none());
        stream.release();
        assert!(!stream.is_open());
    }
}
