use std::path::PathBuf;

use serde::Deserialize;

/// Top-level settings loaded from `config.toml`.
///
/// File format: TOML
/// Default path (Linux/XDG): `$XDG_CONFIG_HOME/duet/config.toml` or `~/.config/duet/config.toml`
///
/// Precedence (highest wins):
/// 1) Environment variables (prefix `DUET__`, `__` as nested separator)
/// 2) Config file (if present)
/// 3) Struct defaults
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub engine: EngineSettings,
    pub audio: AudioSettings,
    pub playback: PlaybackSettings,
    pub library: LibrarySettings,
    pub video: VideoSettings,
    pub ui: UiSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Progress sampling cadence while audio owns the clock (milliseconds).
    pub tick_interval_ms: u64,
    /// How long a playback-mode handoff may wait for the outgoing transport
    /// to acknowledge its stop before ownership is forced (milliseconds).
    pub grace_period_ms: u64,
    /// How often the engine thread checks handoff deadlines (milliseconds).
    pub poll_interval_ms: u64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            tick_interval_ms: 250,
            grace_period_ms: 250,
            poll_interval_ms: 50,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    /// Initial volume, 0.0 to 2.0.
    pub volume: f32,
    /// Fade-out duration when quitting (milliseconds). 0 stops immediately.
    pub quit_fade_out_ms: u64,
    /// How often the pipeline thread checks for the end of a track (milliseconds).
    pub end_check_ms: u64,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            volume: 1.0,
            quit_fade_out_ms: 300,
            end_check_ms: 100,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PlaybackSettings {
    pub play_mode: PlayModeSetting,
    pub playback_mode: PlaybackModeSetting,
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlayModeSetting {
    #[default]
    #[serde(alias = "in-order", alias = "no-loop")]
    Sequential,
    #[serde(alias = "repeat-one", alias = "loop-one", alias = "repeat_one")]
    Repeat,
    #[serde(alias = "random")]
    Shuffle,
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlaybackModeSetting {
    #[default]
    Audio,
    #[serde(alias = "mv")]
    Video,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrackDisplayField {
    /// "artist - title".
    Display,
    Title,
    Artist,
    Album,
    Filename,
    Path,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LibrarySettings {
    /// Extensions decoded by the audio pipeline (case-insensitive, without dot).
    pub audio_extensions: Vec<String>,
    /// Extensions handed to the external video surface.
    pub video_extensions: Vec<String>,
    /// Sidecar lyric file extension; empty disables lyric lookup.
    pub lyrics_extension: String,
    /// Image files next to a track that count as its cover.
    pub cover_file_names: Vec<String>,
    /// Whether to follow symlinks during scanning.
    pub follow_links: bool,
    /// Whether to include hidden files/directories (dotfiles).
    pub include_hidden: bool,
    /// Whether to recurse into subdirectories.
    pub recursive: bool,
    /// Optional cap on directory recursion depth.
    pub max_depth: Option<usize>,
    /// Which fields build `Track.display`.
    ///
    /// Example: ["artist", "title"] -> "Artist - Title"
    pub display_fields: Vec<TrackDisplayField>,
    /// Separator used to join `display_fields`.
    pub display_separator: String,
}

impl Default for LibrarySettings {
    fn default() -> Self {
        Self {
            audio_extensions: ["mp3", "flac", "wav", "ogg", "oga", "m4a", "aac", "alac"]
                .into_iter()
                .map(String::from)
                .collect(),
            video_extensions: ["mp4", "mkv", "webm", "mov", "avi"]
                .into_iter()
                .map(String::from)
                .collect(),
            lyrics_extension: "lrc".to_string(),
            cover_file_names: ["cover.jpg", "cover.png", "folder.jpg", "folder.png"]
                .into_iter()
                .map(String::from)
                .collect(),
            follow_links: true,
            include_hidden: true,
            recursive: true,
            max_depth: None,
            display_fields: vec![TrackDisplayField::Artist, TrackDisplayField::Title],
            display_separator: " - ".to_string(),
        }
    }
}

/// External program used as the video surface by the terminal front-end.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VideoSettings {
    pub command: String,
    pub args: Vec<String>,
    /// Start-position argument; `{secs}` is replaced with the offset in seconds.
    pub start_arg: String,
    /// Volume argument; `{percent}` is replaced with 0 to 200. Empty leaves
    /// the player at its own volume.
    pub volume_arg: String,
}

impl Default for VideoSettings {
    fn default() -> Self {
        Self {
            command: "mpv".to_string(),
            args: vec!["--force-window=yes".to_string(), "--really-quiet".to_string()],
            start_arg: "--start={secs}".to_string(),
            volume_arg: "--volume={percent}".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UiSettings {
    /// The text rendered inside the top header box.
    pub header_text: String,
    /// Seconds to jump when pressing `H` / `L`.
    pub seek_step_seconds: u64,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            header_text: " ~ duet: songs and their videos ~ ".to_string(),
            seek_step_seconds: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `tracing` filter directive used when `RUST_LOG` is unset.
    pub level: String,
    /// Log file; defaults to `$XDG_STATE_HOME/duet/duet.log`.
    pub file: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}
