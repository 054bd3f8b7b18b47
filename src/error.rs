//! Error taxonomy shared by the playlist, pipeline and engine.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, PlaybackError>;

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Corrupt or undecodable stream.
    #[error("decode error: {0}")]
    Decode(String),

    /// The output sink could not be acquired or went away.
    #[error("audio device error: {0}")]
    Device(String),

    #[error("index {index} is out of range for a playlist of {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("seek failed: {0}")]
    Seek(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("playback engine is no longer running")]
    EngineGone,
}

impl PlaybackError {
    /// Map an I/O error raised while opening `path`, keeping "not found" distinct.
    pub fn from_open(path: &std::path::Path, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            Self::FileNotFound(path.to_path_buf())
        } else {
            Self::Io(err)
        }
    }
}
