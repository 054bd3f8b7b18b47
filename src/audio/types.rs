//! Command, event and status types of the decode/output pipeline.
//!
//! Every session opened by the pipeline carries a `generation` chosen by the
//! engine, so replies and samples from a replaced session can be told apart.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::PlaybackError;

#[derive(Debug, Clone, PartialEq)]
pub enum PipelineCmd {
    /// Open `path`, replacing any current session, positioned at `start_at`.
    Open {
        generation: u64,
        path: PathBuf,
        start_at: Duration,
        autoplay: bool,
    },
    /// Resume the device sink without re-opening.
    Play,
    /// Pause the device sink.
    Pause,
    Seek {
        generation: u64,
        position: Duration,
    },
    /// Release the sink and decoder; always answered with `Stopped`.
    Stop { generation: u64 },
    SetVolume(f32),
    /// Leave the pipeline thread, fading out over `fade_out_ms`.
    Quit { fade_out_ms: u64 },
}

#[derive(Debug)]
pub enum PipelineEvent {
    Opened {
        generation: u64,
        duration: Option<Duration>,
    },
    OpenFailed {
        generation: u64,
        error: PlaybackError,
    },
    /// Where playback actually resumed; may differ slightly from the request.
    Seeked {
        generation: u64,
        position: Duration,
    },
    SeekFailed {
        generation: u64,
        error: PlaybackError,
    },
    Stopped { generation: u64 },
    /// The decoder ran out of samples.
    Finished { generation: u64 },
}

/// Latest pipeline position, published after every command and poll.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineStatus {
    pub generation: u64,
    pub position: Duration,
    pub duration: Option<Duration>,
    pub playing: bool,
}

pub type StatusHandle = Arc<Mutex<PipelineStatus>>;

/// The engine's view of the pipeline: fire-and-forget commands.
pub trait PipelineControl: Send {
    fn send(&self, cmd: PipelineCmd);

    /// Shut the pipeline down.
    fn quit(&self, fade_out: Duration) {
        self.send(PipelineCmd::Quit {
            fade_out_ms: fade_out.as_millis() as u64,
        });
    }
}
