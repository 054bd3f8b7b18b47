use std::path::{Path, PathBuf};
use std::time::Duration;

/// Whether a playlist entry is an audio file or a video file.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum MediaType {
    #[default]
    Audio,
    Video,
}

/// Where a track's cover art lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cover {
    /// A picture embedded in the file's tags.
    Embedded { mime: Option<String> },
    /// An image file next to the track (e.g. `cover.jpg`).
    Sidecar(PathBuf),
}

/// One timed lyric line.
#[derive(Debug, Clone, PartialEq)]
pub struct LyricLine {
    pub at: Duration,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub path: PathBuf,
    pub title: String,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub cover: Option<Cover>,
    /// Unknown until probed or first played; video files often report it only
    /// after the surface loads them.
    pub duration: Option<Duration>,
    pub media_type: MediaType,
    /// Music video that accompanies an audio track.
    pub companion_video: Option<PathBuf>,
    pub lyrics: Vec<LyricLine>,
    pub display: String,
}

impl Track {
    /// Minimal track with only a path and title, used when tags are unavailable.
    pub fn new(path: impl Into<PathBuf>, title: impl Into<String>) -> Self {
        let title = title.into();
        Self {
            path: path.into(),
            display: title.clone(),
            title,
            artist: None,
            album: None,
            cover: None,
            duration: None,
            media_type: MediaType::Audio,
            companion_video: None,
            lyrics: Vec::new(),
        }
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn is_video(&self) -> bool {
        self.media_type == MediaType::Video
    }

    /// True when the video transport can play this track.
    pub fn has_video(&self) -> bool {
        self.is_video() || self.companion_video.is_some()
    }

    /// The file the video surface should load for this track.
    pub fn video_path(&self) -> Option<&Path> {
        match self.media_type {
            MediaType::Video => Some(self.path.as_path()),
            MediaType::Audio => self.companion_video.as_deref(),
        }
    }

    pub fn duration_secs(&self) -> Option<f64> {
        self.duration.map(|d| d.as_secs_f64())
    }

    /// The lyric line active at `position`, if any.
    pub fn lyric_at(&self, position: Duration) -> Option<&LyricLine> {
        self.lyrics.iter().take_while(|l| l.at <= position).last()
    }
}
