use std::path::{Path, PathBuf};
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use rodio::{OutputStream, Sink};
use tracing::{debug, info, warn};

use crate::config::AudioSettings;
use crate::error::{PlaybackError, Result};

use super::sink::{PreparedSink, attach_at, decode_file, fade_out_sink, open_output};
use super::types::{PipelineCmd, PipelineEvent, StatusHandle};

/// One opened file on the output device.
struct Session {
    generation: u64,
    path: PathBuf,
    sink: Sink,
    /// Offset the current sink was built at; `sink.get_pos()` counts from here.
    base: Duration,
    duration: Option<Duration>,
    finished: bool,
}

impl Session {
    fn position(&self) -> Duration {
        let pos = self.base + self.sink.get_pos();
        match self.duration {
            Some(d) => pos.min(d),
            None => pos,
        }
    }
}

struct Worker<F> {
    stream: Option<OutputStream>,
    session: Option<Session>,
    volume: f32,
    status: StatusHandle,
    notify: F,
}

pub(super) fn spawn_pipeline_thread<F>(
    rx: Receiver<PipelineCmd>,
    status: StatusHandle,
    settings: AudioSettings,
    notify: F,
) -> Result<JoinHandle<()>>
where
    F: Fn(PipelineEvent) + Send + 'static,
{
    let end_check = Duration::from_millis(settings.end_check_ms.max(1));
    let handle = thread::Builder::new()
        .name("duet-audio".to_string())
        .spawn(move || {
            let mut worker = Worker {
                stream: None,
                session: None,
                volume: settings.volume,
                status,
                notify,
            };

            loop {
                match rx.recv_timeout(end_check) {
                    Ok(PipelineCmd::Quit { fade_out_ms }) => {
                        worker.quit(fade_out_ms);
                        break;
                    }
                    Ok(cmd) => worker.handle(cmd),
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => break,
                }
                worker.check_finished();
                worker.publish_status();
            }
            info!("audio pipeline thread exiting");
        })?;
    Ok(handle)
}

impl<F> Worker<F>
where
    F: Fn(PipelineEvent),
{
    fn handle(&mut self, cmd: PipelineCmd) {
        match cmd {
            PipelineCmd::Open {
                generation,
                path,
                start_at,
                autoplay,
            } => self.open(generation, path, start_at, autoplay),
            PipelineCmd::Play => {
                if let Some(s) = &self.session {
                    s.sink.play();
                }
            }
            PipelineCmd::Pause => {
                if let Some(s) = &self.session {
                    s.sink.pause();
                }
            }
            PipelineCmd::Seek {
                generation,
                position,
            } => self.seek(generation, position),
            PipelineCmd::Stop { generation } => {
                self.release();
                (self.notify)(PipelineEvent::Stopped { generation });
            }
            PipelineCmd::SetVolume(v) => {
                self.volume = v;
                if let Some(s) = &self.session {
                    s.sink.set_volume(v);
                }
            }
            // Handled by the thread loop.
            PipelineCmd::Quit { .. } => {}
        }
    }

    fn output(&mut self) -> Result<&OutputStream> {
        if self.stream.is_none() {
            let stream = open_output()?;
            info!("audio output device opened");
            self.stream = Some(stream);
        }
        self.stream
            .as_ref()
            .ok_or_else(|| PlaybackError::Device("output stream unavailable".to_string()))
    }

    fn open(&mut self, generation: u64, path: PathBuf, start_at: Duration, autoplay: bool) {
        self.release();
        debug!(generation, path = %path.display(), ?start_at, "opening audio session");

        let prepared = self.prepare(&path, start_at);

        match prepared {
            Ok(prepared) => {
                if autoplay {
                    prepared.sink.play();
                }
                let duration = prepared.duration;
                self.session = Some(Session {
                    generation,
                    path,
                    sink: prepared.sink,
                    base: start_at,
                    duration,
                    finished: false,
                });
                (self.notify)(PipelineEvent::Opened {
                    generation,
                    duration,
                });
            }
            Err(error) => {
                warn!(generation, path = %path.display(), %error, "failed to open audio session");
                if matches!(error, PlaybackError::Device(_)) {
                    // Retry the device on the next open.
                    self.stream = None;
                }
                (self.notify)(PipelineEvent::OpenFailed { generation, error });
            }
        }
    }

    fn seek(&mut self, generation: u64, position: Duration) {
        let Some(session) = self.session.as_mut().filter(|s| s.generation == generation) else {
            (self.notify)(PipelineEvent::SeekFailed {
                generation,
                error: PlaybackError::Seek("no open audio session".to_string()),
            });
            return;
        };

        let target = match session.duration {
            Some(d) => position.min(d),
            None => position,
        };

        // Native seeking first; formats without it are rebuilt and skipped into.
        match session.sink.try_seek(target) {
            Ok(()) => {
                session.base = Duration::ZERO;
                session.finished = false;
            }
            Err(err) => {
                debug!(generation, ?err, "native seek unsupported, rebuilding sink");
                let playing = !session.sink.is_paused();
                let path = session.path.clone();
                match self.rebuild(&path, target, playing) {
                    Ok(()) => {}
                    Err(error) => {
                        warn!(generation, %error, "seek failed");
                        (self.notify)(PipelineEvent::SeekFailed { generation, error });
                        return;
                    }
                }
            }
        }

        let position = self
            .session
            .as_ref()
            .map_or(target, |s| s.position());
        (self.notify)(PipelineEvent::Seeked {
            generation,
            position,
        });
    }

    /// Decode first so file errors are reported even without an output device.
    fn prepare(&mut self, path: &Path, start_at: Duration) -> Result<PreparedSink> {
        let source = decode_file(path)?;
        let volume = self.volume;
        Ok(attach_at(self.output()?, source, start_at, volume))
    }

    fn rebuild(&mut self, path: &Path, at: Duration, playing: bool) -> Result<()> {
        let prepared = self.prepare(path, at)?;
        let Some(session) = self.session.as_mut() else {
            return Err(PlaybackError::Seek("session closed during seek".to_string()));
        };
        session.sink.stop();
        if playing {
            prepared.sink.play();
        }
        session.sink = prepared.sink;
        session.base = at;
        session.finished = false;
        Ok(())
    }

    fn release(&mut self) {
        if let Some(s) = self.session.take() {
            s.sink.stop();
        }
    }

    fn check_finished(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.finished || session.sink.is_paused() || !session.sink.empty() {
            return;
        }
        session.finished = true;
        let generation = session.generation;
        debug!(generation, "audio session reached end of stream");
        (self.notify)(PipelineEvent::Finished { generation });
    }

    fn publish_status(&self) {
        let Ok(mut status) = self.status.lock() else {
            return;
        };
        match &self.session {
            Some(s) => {
                status.generation = s.generation;
                status.position = s.position();
                status.duration = s.duration;
                status.playing = !s.sink.is_paused() && !s.finished;
            }
            None => status.playing = false,
        }
    }

    fn quit(&mut self, fade_out_ms: u64) {
        if let Some(s) = self.session.take() {
            if !s.sink.is_paused() {
                fade_out_sink(&s.sink, fade_out_ms);
            }
            s.sink.stop();
        }
        self.publish_status();
    }
}
