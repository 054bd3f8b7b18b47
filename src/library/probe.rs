use std::path::{Path, PathBuf};
use std::time::Duration;

use lofty::prelude::*;
use tracing::{debug, trace};

use crate::config::LibrarySettings;
use crate::error::{PlaybackError, Result};

use super::display::display_from_fields;
use super::lyrics::parse_lrc;
use super::model::{Cover, MediaType, Track};

/// Sub-directory that is also searched for companion videos.
const MV_DIR: &str = "mv";

fn normalized(exts: &[String]) -> impl Iterator<Item = String> + '_ {
    exts.iter()
        .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|e| !e.is_empty())
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_ascii_lowercase())
}

/// Classify `path` by extension, or `None` when it is not playable.
pub fn media_type_of(path: &Path, settings: &LibrarySettings) -> Option<MediaType> {
    let ext = extension_of(path)?;
    if normalized(&settings.audio_extensions).any(|e| e == ext) {
        Some(MediaType::Audio)
    } else if normalized(&settings.video_extensions).any(|e| e == ext) {
        Some(MediaType::Video)
    } else {
        None
    }
}

/// Look for a same-stem video next to `path`, then in its `mv/` sub-directory.
pub fn find_companion_video(path: &Path, settings: &LibrarySettings) -> Option<PathBuf> {
    let stem = path.file_stem()?;
    let dir = path.parent().unwrap_or_else(|| Path::new("."));

    for base in [dir.to_path_buf(), dir.join(MV_DIR)] {
        for ext in normalized(&settings.video_extensions) {
            for ext in [ext.clone(), ext.to_ascii_uppercase()] {
                let mut name = stem.to_os_string();
                name.push(".");
                name.push(&ext);
                let candidate = base.join(name);
                if candidate.is_file() {
                    return Some(candidate);
                }
            }
        }
    }
    None
}

fn find_sidecar_cover(path: &Path, settings: &LibrarySettings) -> Option<PathBuf> {
    let dir = path.parent()?;
    settings
        .cover_file_names
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.is_file())
}

fn read_lyrics(path: &Path, settings: &LibrarySettings) -> Vec<super::model::LyricLine> {
    let ext = settings.lyrics_extension.trim_start_matches('.');
    if ext.is_empty() {
        return Vec::new();
    }
    let lrc = path.with_extension(ext);
    match std::fs::read_to_string(&lrc) {
        Ok(text) => {
            let lines = parse_lrc(&text);
            trace!(path = %lrc.display(), lines = lines.len(), "loaded lyrics");
            lines
        }
        Err(_) => Vec::new(),
    }
}

/// Build a `Track` from a file on disk.
///
/// Tags are best-effort: an unreadable tag block still yields a track titled
/// after the file stem. Missing files and unknown extensions are errors.
pub fn probe(path: &Path, settings: &LibrarySettings) -> Result<Track> {
    if !path.exists() {
        return Err(PlaybackError::FileNotFound(path.to_path_buf()));
    }
    let media_type = media_type_of(path, settings).ok_or_else(|| {
        PlaybackError::UnsupportedFormat(format!(
            "{} ({})",
            path.display(),
            extension_of(path).unwrap_or_else(|| "no extension".to_string())
        ))
    })?;

    let mut title = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("UNKNOWN")
        .to_string();
    let mut artist: Option<String> = None;
    let mut album: Option<String> = None;
    let mut duration: Option<Duration> = None;
    let mut cover: Option<Cover> = None;

    match lofty::read_from_path(path) {
        Ok(tagged) => {
            let d = tagged.properties().duration();
            if !d.is_zero() {
                duration = Some(d);
            }

            if let Some(tag) = tagged.primary_tag().or_else(|| tagged.first_tag()) {
                if let Some(v) = tag.title() {
                    if !v.trim().is_empty() {
                        title = v.trim().to_string();
                    }
                }
                artist = tag
                    .artist()
                    .map(|v| v.trim().to_string())
                    .filter(|v| !v.is_empty());
                album = tag
                    .album()
                    .map(|v| v.trim().to_string())
                    .filter(|v| !v.is_empty());
                if let Some(p) = tag.pictures().first() {
                    cover = Some(Cover::Embedded {
                        mime: p.mime_type().map(|m| m.as_str().to_string()),
                    });
                }
            }
        }
        Err(e) => debug!(path = %path.display(), error = %e, "no readable tags"),
    }

    if cover.is_none() {
        cover = find_sidecar_cover(path, settings).map(Cover::Sidecar);
    }

    let companion_video = match media_type {
        MediaType::Audio => find_companion_video(path, settings),
        MediaType::Video => None,
    };

    let display = display_from_fields(
        path,
        &title,
        artist.as_deref(),
        album.as_deref(),
        &settings.display_fields,
        &settings.display_separator,
    );

    Ok(Track {
        path: path.to_path_buf(),
        title,
        artist,
        album,
        cover,
        duration,
        media_type,
        companion_video,
        lyrics: read_lyrics(path, settings),
        display,
    })
}
