//! View model for the terminal front-end.
//!
//! `App` mirrors what the engine reports and nothing more: playback fields
//! change only through [`App::apply`] with an [`EngineEvent`]. The cursor,
//! popup and follow flags are the only state the UI owns itself.

use std::time::Duration;

use duet::engine::{EngineEvent, PlayMode, PlaybackMode, PlayerState, Snapshot};
use duet::library::{LyricLine, Track};

/// The main application model.
pub struct App {
    pub tracks: Vec<Track>,
    /// Cursor row in the track list.
    pub selected: usize,
    /// Index the engine reports as current.
    pub current: Option<usize>,
    pub state: PlayerState,
    pub play_mode: PlayMode,
    pub playback_mode: PlaybackMode,
    /// Seconds.
    pub position: f64,
    /// Seconds; 0 while unknown.
    pub duration: f64,
    pub volume: f32,
    pub last_error: Option<String>,

    pub follow_playback: bool,
    pub current_dir: Option<String>,
    pub metadata_window: bool,
}

impl App {
    pub fn from_snapshot(s: Snapshot) -> Self {
        Self {
            selected: s.current_index.unwrap_or(0),
            tracks: s.playlist,
            current: s.current_index,
            state: s.state,
            play_mode: s.play_mode,
            playback_mode: s.playback_mode,
            position: s.position,
            duration: s.duration,
            volume: s.volume,
            last_error: None,

            follow_playback: true,
            current_dir: None,
            metadata_window: false,
        }
    }

    /// Fold one engine event into the view. Returns `true` when the change
    /// matters to the MPRIS bridge (track or state).
    pub fn apply(&mut self, event: EngineEvent) -> bool {
        match event {
            EngineEvent::StateChanged(state) => {
                let changed = self.state != state;
                self.state = state;
                if state == PlayerState::Playing {
                    self.last_error = None;
                }
                changed
            }
            EngineEvent::SongChanged(index, track) => {
                if let Some(slot) = self.tracks.get_mut(index) {
                    *slot = track;
                }
                self.current = Some(index);
                self.position = 0.0;
                if self.follow_playback {
                    self.selected = index;
                }
                true
            }
            EngineEvent::PlaylistUpdated(tracks) => {
                self.tracks = tracks;
                if self.current.is_some_and(|i| i >= self.tracks.len()) {
                    self.current = None;
                }
                self.clamp_selection();
                true
            }
            EngineEvent::ProgressUpdate(position, duration) => {
                self.position = position;
                self.duration = duration;
                false
            }
            EngineEvent::Error(msg) => {
                self.last_error = Some(msg);
                false
            }
            EngineEvent::PlayModeChanged(mode) => {
                self.play_mode = mode;
                false
            }
            EngineEvent::PlaybackModeChanged(mode) => {
                self.playback_mode = mode;
                false
            }
            EngineEvent::VolumeChanged(v) => {
                self.volume = v;
                false
            }
            // Routed to the video surface by the event loop.
            EngineEvent::VideoRequest(_) => false,
        }
    }

    pub fn toggle_metadata_window(&mut self) {
        self.metadata_window = !self.metadata_window;
    }

    pub fn follow_playback_on(&mut self) {
        self.follow_playback = true;
        if let Some(i) = self.current {
            self.selected = i;
        }
    }

    pub fn follow_playback_off(&mut self) {
        self.follow_playback = false;
    }

    pub fn set_current_dir(&mut self, dir: String) {
        self.current_dir = Some(dir);
    }

    pub fn has_tracks(&self) -> bool {
        !self.tracks.is_empty()
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.current.and_then(|i| self.tracks.get(i))
    }

    /// Duration known for the current track, preferring the live report.
    pub fn duration_hint(&self) -> Option<f64> {
        if self.duration > 0.0 {
            return Some(self.duration);
        }
        self.current_track().and_then(Track::duration_secs)
    }

    /// The lyric line for the current position, when the track has lyrics.
    pub fn current_lyric(&self) -> Option<&LyricLine> {
        let track = self.current_track()?;
        let at = Duration::try_from_secs_f64(self.position.max(0.0)).unwrap_or_default();
        track.lyric_at(at)
    }

    /// Move the cursor down, wrapping to the top.
    pub fn next(&mut self) {
        if self.tracks.is_empty() {
            return;
        }
        self.selected = (self.selected + 1) % self.tracks.len();
    }

    /// Move the cursor up, wrapping to the bottom.
    pub fn prev(&mut self) {
        if self.tracks.is_empty() {
            return;
        }
        self.selected = match self.selected {
            0 => self.tracks.len() - 1,
            n => n - 1,
        };
    }

    pub fn select_first(&mut self) {
        self.selected = 0;
    }

    pub fn select_last(&mut self) {
        self.selected = self.tracks.len().saturating_sub(1);
    }

    fn clamp_selection(&mut self) {
        if self.selected >= self.tracks.len() {
            self.select_last();
        }
    }
}
