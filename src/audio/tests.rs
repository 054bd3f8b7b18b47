use std::path::Path;
use std::sync::mpsc;
use std::time::Duration;

use rodio::decoder::DecoderError;

use crate::config::AudioSettings;
use crate::error::PlaybackError;

use super::sink::map_decoder_error;
use super::{AudioPipeline, PipelineCmd, PipelineControl, PipelineEvent};

const WAIT: Duration = Duration::from_secs(5);

fn pipeline() -> (AudioPipeline, mpsc::Receiver<PipelineEvent>) {
    let (tx, rx) = mpsc::channel();
    let settings = AudioSettings {
        end_check_ms: 10,
        ..AudioSettings::default()
    };
    let p = AudioPipeline::new(settings, move |ev| {
        let _ = tx.send(ev);
    })
    .unwrap();
    (p, rx)
}

#[test]
fn unrecognized_format_maps_to_unsupported() {
    let err = map_decoder_error(Path::new("a.xyz"), DecoderError::UnrecognizedFormat);
    assert!(matches!(err, PlaybackError::UnsupportedFormat(_)));
}

#[test]
fn stop_is_acknowledged_without_a_session() {
    let (p, rx) = pipeline();
    p.send(PipelineCmd::Stop { generation: 7 });
    match rx.recv_timeout(WAIT).unwrap() {
        PipelineEvent::Stopped { generation } => assert_eq!(generation, 7),
        other => panic!("unexpected event: {other:?}"),
    }
    p.quit_softly(Duration::ZERO);
}

#[test]
fn seek_without_session_fails() {
    let (p, rx) = pipeline();
    p.send(PipelineCmd::Seek {
        generation: 3,
        position: Duration::from_secs(10),
    });
    match rx.recv_timeout(WAIT).unwrap() {
        PipelineEvent::SeekFailed { generation, error } => {
            assert_eq!(generation, 3);
            assert!(matches!(error, PlaybackError::Seek(_)));
        }
        other => panic!("unexpected event: {other:?}"),
    }
    p.quit_softly(Duration::ZERO);
}

#[test]
fn open_missing_file_reports_file_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("gone.mp3");

    let (p, rx) = pipeline();
    p.send(PipelineCmd::Open {
        generation: 1,
        path: missing.clone(),
        start_at: Duration::ZERO,
        autoplay: true,
    });
    match rx.recv_timeout(WAIT).unwrap() {
        PipelineEvent::OpenFailed { generation, error } => {
            assert_eq!(generation, 1);
            match error {
                PlaybackError::FileNotFound(p) => assert_eq!(p, missing),
                other => panic!("unexpected error: {other:?}"),
            }
        }
        other => panic!("unexpected event: {other:?}"),
    }
    p.quit_softly(Duration::ZERO);
}

#[test]
fn open_garbage_file_reports_decode_problem() {
    let dir = tempfile::tempdir().unwrap();
    let bogus = dir.path().join("noise.mp3");
    std::fs::write(&bogus, b"definitely not an mpeg stream").unwrap();

    let (p, rx) = pipeline();
    p.send(PipelineCmd::Open {
        generation: 2,
        path: bogus,
        start_at: Duration::ZERO,
        autoplay: false,
    });
    match rx.recv_timeout(WAIT).unwrap() {
        PipelineEvent::OpenFailed { generation, error } => {
            assert_eq!(generation, 2);
            assert!(matches!(
                error,
                PlaybackError::UnsupportedFormat(_) | PlaybackError::Decode(_)
            ));
        }
        other => panic!("unexpected event: {other:?}"),
    }
    p.quit_softly(Duration::ZERO);
}

#[test]
fn quit_joins_the_thread_and_clears_playing() {
    let (p, _rx) = pipeline();
    let status = p.status_handle();
    p.quit(Duration::ZERO);
    assert!(!status.lock().unwrap().playing);
    // A second quit after the thread is gone is harmless.
    p.quit_softly(Duration::ZERO);
}
