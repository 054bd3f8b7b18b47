use super::*;
use crate::config::{LibrarySettings, TrackDisplayField};
use crate::error::PlaybackError;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tempfile::tempdir;

#[test]
fn display_from_fields_can_format_artist_title() {
    let p = Path::new("/tmp/Song.mp3");
    let fields = [TrackDisplayField::Artist, TrackDisplayField::Title];
    assert_eq!(
        display_from_fields(p, "Song", Some("  Artist  "), None, &fields, " - "),
        "Artist - Song"
    );
    assert_eq!(
        display_from_fields(p, "Song", None, None, &fields, " - "),
        "Song"
    );
    assert_eq!(
        display_from_fields(p, "Song", None, None, &[TrackDisplayField::Filename], "::"),
        "Song"
    );
}

#[test]
fn parse_lrc_handles_multiple_stamps_and_sorts() {
    let text = "[ar:Someone]\n[00:12.50]second\n[00:01.00][00:20.00]chorus\n[00:05]plain\nnot a lyric";
    let lines = parse_lrc(text);

    let got: Vec<(u128, &str)> = lines
        .iter()
        .map(|l| (l.at.as_millis(), l.text.as_str()))
        .collect();
    assert_eq!(
        got,
        vec![
            (1000, "chorus"),
            (5000, "plain"),
            (12500, "second"),
            (20000, "chorus"),
        ]
    );
}

#[test]
fn parse_lrc_applies_offset_and_three_digit_fractions() {
    let lines = parse_lrc("[offset:500]\n[00:02.250]late\n[00:00.100]early");
    assert_eq!(lines[0].at, Duration::ZERO);
    assert_eq!(lines[1].at, Duration::from_millis(1750));
}

#[test]
fn parse_lrc_offset_applies_to_lines_before_the_tag() {
    let lines = parse_lrc("[00:02.00]first\n[offset:1000]\n[00:05.00]second");
    assert_eq!(lines[0].at, Duration::from_secs(1));
    assert_eq!(lines[1].at, Duration::from_secs(4));
}

#[test]
fn parse_lrc_skips_stamps_that_overflow() {
    let lines = parse_lrc(
        "[999999999999999999:00]huge\n[00:-999999999999999999]negative\n[00:03.00]kept",
    );
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].text, "kept");

    let shifted = parse_lrc("[offset:-9223372036854775808]\n[00:01.00]late");
    assert_eq!(shifted[0].at, Duration::from_millis(i64::MAX as u64));
}

#[test]
fn probe_survives_a_malformed_lyric_sidecar() {
    let dir = tempdir().unwrap();
    let audio = dir.path().join("Odd.mp3");
    fs::write(&audio, b"not a real mp3").unwrap();
    fs::write(
        dir.path().join("Odd.lrc"),
        "[offset:9223372036854775807]\n[999999999999999999:00]x\n[00:01.00]y",
    )
    .unwrap();

    let track = probe(&audio, &LibrarySettings::default()).unwrap();
    assert_eq!(track.lyrics.len(), 1);
    assert_eq!(track.lyrics[0].at, Duration::ZERO);
}

#[test]
fn lyric_at_returns_latest_started_line() {
    let mut track = Track::new("/tmp/a.mp3", "a");
    track.lyrics = parse_lrc("[00:01.00]one\n[00:03.00]two");
    assert!(track.lyric_at(Duration::from_millis(500)).is_none());
    assert_eq!(track.lyric_at(Duration::from_secs(2)).unwrap().text, "one");
    assert_eq!(track.lyric_at(Duration::from_secs(9)).unwrap().text, "two");
}

#[test]
fn media_type_of_uses_configured_extensions() {
    let settings = LibrarySettings::default();
    assert_eq!(media_type_of(Path::new("/x/a.FLAC"), &settings), Some(MediaType::Audio));
    assert_eq!(media_type_of(Path::new("/x/a.m4a"), &settings), Some(MediaType::Audio));
    assert_eq!(media_type_of(Path::new("/x/a.mkv"), &settings), Some(MediaType::Video));
    assert_eq!(media_type_of(Path::new("/x/a.txt"), &settings), None);
    assert_eq!(media_type_of(Path::new("/x/a"), &settings), None);
}

#[test]
fn probe_reports_missing_and_unsupported_files() {
    let dir = tempdir().unwrap();
    let settings = LibrarySettings::default();

    let missing = dir.path().join("nope.mp3");
    assert!(matches!(
        probe(&missing, &settings),
        Err(PlaybackError::FileNotFound(p)) if p == missing
    ));

    let txt = dir.path().join("notes.txt");
    fs::write(&txt, b"hello").unwrap();
    assert!(matches!(
        probe(&txt, &settings),
        Err(PlaybackError::UnsupportedFormat(_))
    ));
}

#[test]
fn probe_falls_back_to_file_stem_and_finds_sidecars() {
    let dir = tempdir().unwrap();
    let audio = dir.path().join("My Song.mp3");
    fs::write(&audio, b"not a real mp3").unwrap();
    fs::create_dir_all(dir.path().join("mv")).unwrap();
    fs::write(dir.path().join("mv").join("My Song.mp4"), b"video").unwrap();
    fs::write(dir.path().join("My Song.lrc"), "[00:01.00]hello").unwrap();
    fs::write(dir.path().join("cover.jpg"), b"jpeg").unwrap();

    let track = probe(&audio, &LibrarySettings::default()).unwrap();
    assert_eq!(track.title, "My Song");
    assert_eq!(track.media_type, MediaType::Audio);
    assert_eq!(track.duration, None);
    assert_eq!(
        track.companion_video.as_deref(),
        Some(dir.path().join("mv").join("My Song.mp4").as_path())
    );
    assert_eq!(track.lyrics.len(), 1);
    assert_eq!(track.cover, Some(Cover::Sidecar(dir.path().join("cover.jpg"))));
    assert!(track.has_video());
    assert_eq!(track.video_path(), track.companion_video.as_deref());
}

#[test]
fn video_track_is_its_own_video_path() {
    let dir = tempdir().unwrap();
    let clip = dir.path().join("clip.mkv");
    fs::write(&clip, b"not a real mkv").unwrap();

    let track = probe(&clip, &LibrarySettings::default()).unwrap();
    assert!(track.is_video());
    assert_eq!(track.companion_video, None);
    assert_eq!(track.video_path(), Some(clip.as_path()));
}
