use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::LibrarySettings;

use super::model::{MediaType, Track};
use super::probe::{media_type_of, probe};

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|s| s.to_str())
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

/// Collect every playable file below `dir` as a `Track`.
///
/// Videos that serve as the companion of an audio track are not listed on
/// their own. Results are sorted by display string, case-insensitively.
pub fn scan(dir: &Path, settings: &LibrarySettings) -> Vec<Track> {
    let mut walker = WalkDir::new(dir).follow_links(settings.follow_links);

    // Non-recursive = only the root directory.
    let depth_cap = if settings.recursive {
        settings.max_depth
    } else {
        Some(1)
    };
    if let Some(d) = depth_cap {
        walker = walker.max_depth(d);
    }

    let mut tracks: Vec<Track> = Vec::new();
    for entry in walker
        .into_iter()
        .filter_entry(|e| settings.include_hidden || e.depth() == 0 || !is_hidden(e.path()))
        .filter_map(Result::ok)
    {
        let path = entry.path();
        if !path.is_file() || media_type_of(path, settings).is_none() {
            continue;
        }
        match probe(path, settings) {
            Ok(track) => tracks.push(track),
            Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable file"),
        }
    }

    let companions: HashSet<PathBuf> = tracks
        .iter()
        .filter_map(|t| t.companion_video.clone())
        .collect();
    tracks.retain(|t| !(t.media_type == MediaType::Video && companions.contains(&t.path)));

    tracks.sort_by(|a, b| a.display.to_lowercase().cmp(&b.display.to_lowercase()));
    debug!(dir = %dir.display(), found = tracks.len(), "scanned directory");
    tracks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrackDisplayField;
    use std::fs;
    use tempfile::tempdir;

    fn by_filename() -> LibrarySettings {
        LibrarySettings {
            display_fields: vec![TrackDisplayField::Filename],
            ..LibrarySettings::default()
        }
    }

    #[test]
    fn scan_filters_unplayable_and_sorts_by_display_case_insensitive() {
        let dir = tempdir().unwrap();

        fs::write(dir.path().join("b.MP3"), b"not a real mp3").unwrap();
        fs::write(dir.path().join("A.ogg"), b"not a real ogg").unwrap();
        fs::write(dir.path().join("c.txt"), b"ignore me").unwrap();
        fs::write(dir.path().join("clip.webm"), b"not a real webm").unwrap();

        let tracks = scan(dir.path(), &by_filename());
        let names: Vec<&str> = tracks.iter().map(|t| t.display.as_str()).collect();
        assert_eq!(names, vec!["A", "b", "clip"]);
        assert_eq!(tracks[2].media_type, MediaType::Video);
    }

    #[test]
    fn scan_hides_companion_videos_behind_their_audio_track() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("song.mp3"), b"not real").unwrap();
        fs::write(dir.path().join("song.mp4"), b"not real").unwrap();

        let tracks = scan(dir.path(), &by_filename());
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].media_type, MediaType::Audio);
        assert_eq!(
            tracks[0].companion_video.as_deref(),
            Some(dir.path().join("song.mp4").as_path())
        );
    }

    #[test]
    fn scan_respects_include_hidden_false() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(".hidden.mp3"), b"not real").unwrap();
        fs::write(dir.path().join("visible.mp3"), b"not real").unwrap();

        let settings = LibrarySettings {
            include_hidden: false,
            ..by_filename()
        };
        let tracks = scan(dir.path(), &settings);

        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].display, "visible");
    }

    #[test]
    fn scan_respects_recursive_false() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("root.mp3"), b"not real").unwrap();
        let sub = dir.path().join("sub");
        fs::create_dir_all(&sub).unwrap();
        fs::write(sub.join("child.mp3"), b"not real").unwrap();

        let settings = LibrarySettings {
            recursive: false,
            ..by_filename()
        };
        let tracks = scan(dir.path(), &settings);
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].display, "root");
    }
}
