use std::path::PathBuf;

use crate::library::Track;

use super::mode::{PlayMode, PlaybackMode};

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum PlayerState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

impl PlayerState {
    pub fn label(self) -> &'static str {
        match self {
            PlayerState::Stopped => "stopped",
            PlayerState::Playing => "playing",
            PlayerState::Paused => "paused",
        }
    }
}

/// Instructions for the external video surface.
///
/// The surface answers through the engine's `video_*` commands and
/// `update_video_progress`. Every `Stop` must be answered with
/// `video_stopped`, even when nothing was showing.
#[derive(Debug, Clone, PartialEq)]
pub enum VideoRequest {
    Load {
        path: PathBuf,
        /// Seconds into the file.
        start_at: f64,
        autoplay: bool,
    },
    Play,
    Pause,
    Seek(f64),
    Stop,
    SetVolume(f32),
}

/// Notifications from the engine. Positions and durations are seconds.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    StateChanged(PlayerState),
    SongChanged(usize, Track),
    PlaylistUpdated(Vec<Track>),
    /// `(position, duration)`; duration is 0 while unknown.
    ProgressUpdate(f64, f64),
    Error(String),
    PlayModeChanged(PlayMode),
    PlaybackModeChanged(PlaybackMode),
    VolumeChanged(f32),
    VideoRequest(VideoRequest),
}

/// Everything the engine can be asked to do.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Play,
    Pause,
    Stop,
    Next,
    Previous,
    SetSong(usize),
    AddSong(PathBuf),
    AddFolder(PathBuf),
    RemoveSong(usize),
    ClearPlaylist,
    SetPlayMode(PlayMode),
    SeekTo(f64),
    SetPlaybackMode(PlaybackMode),
    TogglePlaybackMode,
    SetVolume(f32),
    UpdateVideoProgress { position: f64, duration: f64 },
    VideoLoaded(Option<f64>),
    VideoStopped,
    VideoEnded,
    VideoClosed(Option<f64>),
}

/// Read-only view of the engine, answered in one round trip.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub playlist: Vec<Track>,
    pub current_index: Option<usize>,
    pub state: PlayerState,
    pub play_mode: PlayMode,
    pub playback_mode: PlaybackMode,
    pub position: f64,
    pub duration: f64,
    pub volume: f32,
}
