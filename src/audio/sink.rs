//! Utilities for creating `rodio` sinks from files.
//!
//! The helpers here open the output device, decode a file and prepare a
//! paused `Sink` at the requested start position, mapping failures onto the
//! crate's error taxonomy.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::thread;
use std::time::Duration;

use rodio::decoder::DecoderError;
use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink, Source};

use crate::error::{PlaybackError, Result};

/// Open the default output device.
pub(super) fn open_output() -> Result<OutputStream> {
    let mut stream = OutputStreamBuilder::open_default_stream()
        .map_err(|e| PlaybackError::Device(e.to_string()))?;
    // rodio logs to stderr when the stream is dropped; the TUI owns the terminal.
    stream.log_on_drop(false);
    Ok(stream)
}

pub(super) fn map_decoder_error(path: &Path, err: DecoderError) -> PlaybackError {
    match err {
        DecoderError::UnrecognizedFormat => {
            PlaybackError::UnsupportedFormat(path.display().to_string())
        }
        other => PlaybackError::Decode(format!("{}: {other}", path.display())),
    }
}

/// A decoded file attached to the mixer, paused.
pub(super) struct PreparedSink {
    pub sink: Sink,
    pub duration: Option<Duration>,
}

/// Open and probe `path` without touching the output device.
pub(super) fn decode_file(path: &Path) -> Result<Decoder<BufReader<File>>> {
    let file = File::open(path).map_err(|e| PlaybackError::from_open(path, e))?;
    Decoder::new(BufReader::new(file)).map_err(|e| map_decoder_error(path, e))
}

/// Attach `source` to the mixer as a paused `Sink` that starts at `start_at`.
///
/// Positioning uses `skip_duration`, which decodes and discards up to the
/// requested offset; it works for every format rodio can decode.
pub(super) fn attach_at(
    stream: &OutputStream,
    source: Decoder<BufReader<File>>,
    start_at: Duration,
    volume: f32,
) -> PreparedSink {
    let duration = source.total_duration();

    let sink = Sink::connect_new(stream.mixer());
    sink.set_volume(volume);
    sink.pause();
    sink.append(source.skip_duration(start_at));

    PreparedSink { sink, duration }
}

/// Ramp the sink's volume down to silence over `fade_out_ms`.
pub(super) fn fade_out_sink(sink: &Sink, fade_out_ms: u64) {
    if fade_out_ms == 0 {
        sink.set_volume(0.0);
        return;
    }
    let steps: u64 = 20;
    let step_ms = (fade_out_ms / steps).max(1);
    let start = sink.volume();
    for step in 1..=steps {
        let t = step as f32 / steps as f32;
        sink.set_volume(start * (1.0 - t));
        thread::sleep(Duration::from_millis(step_ms));
    }
    sink.set_volume(0.0);
}
