use thiserror::Error;

/// Errors raised by the playback engine.
///
/// Only startup can fail fatally: once a session is running, per-stream
/// problems degrade to placeholders and surface errors are logged.
#[derive(Error, Debug)]
pub enum PlayerError {
    /// Bad or missing playback arguments.
    #[error("Failed to parse arguments: {0}")]
    Config(String),

    /// A stream could not be opened at startup.
    #[error("File {path}: Unable to open ({reason})")]
    StreamOpen { path: String, reason: String },

    /// The requested start frame lies beyond the end of a stream.
    #[error(
        "File {path}: Start frame number {start_frame} exceeds total frame count ({frame_count})"
    )]
    StartFrameOutOfRange {
        path: String,
        start_frame: i64,
        frame_count: i64,
    },

    /// The grid cannot be planned for the given geometry.
    #[error("Layout error: {0}")]
    Layout(String),

    #[error("Display error: {0}")]
    Display(String),

    #[error("IO error: {0}")]
    Io(String),
}

impl PlayerError {
    /// Build a [`PlayerError::StreamOpen`] from any displayable reason.
    pub fn stream_open(path: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::StreamOpen {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether this error belongs to the argument-validation class.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

impl From<std::io::Error> for PlayerError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PlayerError>;
