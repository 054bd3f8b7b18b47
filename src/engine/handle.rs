use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{info, warn};

use crate::audio::{AudioPipeline, PipelineEvent};
use crate::config::Settings;
use crate::error::{PlaybackError, Result};
use crate::library::Track;

use super::machine::Machine;
use super::mode::{PlayMode, PlaybackMode};
use super::ticker::{TickGate, spawn_ticker};
use super::types::{Command, EngineEvent, PlayerState, Snapshot};

/// Everything the engine thread reacts to.
pub(super) enum EngineMsg {
    Command(Command, Sender<Result<()>>),
    Snapshot(Sender<Snapshot>),
    Pipeline(PipelineEvent),
    AudioProgress {
        generation: u64,
        position: Duration,
        duration: Option<Duration>,
    },
    Shutdown { fade_out: Duration },
}

/// Cheap, cloneable access to a running engine.
///
/// Every call is a request/response round trip to the engine thread and
/// fails with [`PlaybackError::EngineGone`] once that thread has exited.
#[derive(Clone)]
pub struct EngineHandle {
    tx: Sender<EngineMsg>,
}

impl EngineHandle {
    pub fn execute(&self, cmd: Command) -> Result<()> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.tx
            .send(EngineMsg::Command(cmd, reply_tx))
            .map_err(|_| PlaybackError::EngineGone)?;
        reply_rx.recv().map_err(|_| PlaybackError::EngineGone)?
    }

    pub fn snapshot(&self) -> Result<Snapshot> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.tx
            .send(EngineMsg::Snapshot(reply_tx))
            .map_err(|_| PlaybackError::EngineGone)?;
        reply_rx.recv().map_err(|_| PlaybackError::EngineGone)
    }

    pub fn play(&self) -> Result<()> {
        self.execute(Command::Play)
    }

    pub fn pause(&self) -> Result<()> {
        self.execute(Command::Pause)
    }

    pub fn stop(&self) -> Result<()> {
        self.execute(Command::Stop)
    }

    pub fn next(&self) -> Result<()> {
        self.execute(Command::Next)
    }

    pub fn previous(&self) -> Result<()> {
        self.execute(Command::Previous)
    }

    pub fn set_song(&self, index: usize) -> Result<()> {
        self.execute(Command::SetSong(index))
    }

    pub fn add_song(&self, path: impl Into<PathBuf>) -> Result<()> {
        self.execute(Command::AddSong(path.into()))
    }

    pub fn add_folder(&self, dir: impl Into<PathBuf>) -> Result<()> {
        self.execute(Command::AddFolder(dir.into()))
    }

    pub fn remove_song(&self, index: usize) -> Result<()> {
        self.execute(Command::RemoveSong(index))
    }

    pub fn clear_playlist(&self) -> Result<()> {
        self.execute(Command::ClearPlaylist)
    }

    pub fn set_play_mode(&self, mode: PlayMode) -> Result<()> {
        self.execute(Command::SetPlayMode(mode))
    }

    /// Seek to `position` seconds; out-of-range values are clamped.
    pub fn seek_to(&self, position: f64) -> Result<()> {
        self.execute(Command::SeekTo(position))
    }

    pub fn set_playback_mode(&self, mode: PlaybackMode) -> Result<()> {
        self.execute(Command::SetPlaybackMode(mode))
    }

    pub fn toggle_playback_mode(&self) -> Result<()> {
        self.execute(Command::TogglePlaybackMode)
    }

    pub fn set_volume(&self, volume: f32) -> Result<()> {
        self.execute(Command::SetVolume(volume))
    }

    /// Position report pushed by the video surface.
    pub fn update_video_progress(&self, position: f64, duration: f64) -> Result<()> {
        self.execute(Command::UpdateVideoProgress { position, duration })
    }

    pub fn video_loaded(&self, duration: Option<f64>) -> Result<()> {
        self.execute(Command::VideoLoaded(duration))
    }

    pub fn video_stopped(&self) -> Result<()> {
        self.execute(Command::VideoStopped)
    }

    pub fn video_ended(&self) -> Result<()> {
        self.execute(Command::VideoEnded)
    }

    pub fn video_closed(&self, position: Option<f64>) -> Result<()> {
        self.execute(Command::VideoClosed(position))
    }

    pub fn playlist(&self) -> Result<Vec<Track>> {
        Ok(self.snapshot()?.playlist)
    }

    pub fn current_index(&self) -> Result<Option<usize>> {
        Ok(self.snapshot()?.current_index)
    }

    pub fn player_state(&self) -> Result<PlayerState> {
        Ok(self.snapshot()?.state)
    }

    pub fn playback_mode(&self) -> Result<PlaybackMode> {
        Ok(self.snapshot()?.playback_mode)
    }

    pub fn play_mode(&self) -> Result<PlayMode> {
        Ok(self.snapshot()?.play_mode)
    }

    /// `(position, duration)` in seconds; duration is 0 while unknown.
    pub fn position(&self) -> Result<(f64, f64)> {
        let s = self.snapshot()?;
        Ok((s.position, s.duration))
    }

    pub fn volume(&self) -> Result<f32> {
        Ok(self.snapshot()?.volume)
    }
}

/// Owner of the engine, pipeline and ticker threads.
pub struct Engine {
    handle: EngineHandle,
    engine: Option<JoinHandle<()>>,
    ticker: Option<JoinHandle<()>>,
    fade_out: Duration,
}

impl Engine {
    /// Start the engine. The audio device is opened lazily on first play.
    pub fn spawn(settings: &Settings) -> Result<(Self, Receiver<EngineEvent>)> {
        let (tx, rx) = mpsc::channel::<EngineMsg>();
        let (events_tx, events_rx) = mpsc::channel::<EngineEvent>();

        let pipeline_tx = tx.clone();
        let pipeline = AudioPipeline::new(settings.audio.clone(), move |ev| {
            let _ = pipeline_tx.send(EngineMsg::Pipeline(ev));
        })?;

        let gate = TickGate::default();
        let ticker_tx = tx.clone();
        let ticker = spawn_ticker(
            gate.clone(),
            pipeline.status_handle(),
            Duration::from_millis(settings.engine.tick_interval_ms),
            move |generation, position, duration| {
                ticker_tx
                    .send(EngineMsg::AudioProgress {
                        generation,
                        position,
                        duration,
                    })
                    .is_ok()
            },
        )?;

        let machine = Machine::new(
            settings,
            Box::new(pipeline),
            events_tx,
            gate,
            StdRng::from_os_rng(),
        );
        let poll = Duration::from_millis(settings.engine.poll_interval_ms.max(1));
        let engine = thread::Builder::new()
            .name("duet-engine".to_string())
            .spawn(move || run(machine, rx, poll))?;

        Ok((
            Self {
                handle: EngineHandle { tx },
                engine: Some(engine),
                ticker: Some(ticker),
                fade_out: Duration::from_millis(settings.audio.quit_fade_out_ms),
            },
            events_rx,
        ))
    }

    pub fn handle(&self) -> EngineHandle {
        self.handle.clone()
    }

    /// Fade out, stop every transport and join the engine's threads.
    pub fn shutdown(&mut self) {
        let Some(engine) = self.engine.take() else {
            return;
        };
        let _ = self.handle.tx.send(EngineMsg::Shutdown {
            fade_out: self.fade_out,
        });
        if engine.join().is_err() {
            warn!("engine thread panicked");
        }
        if let Some(ticker) = self.ticker.take() {
            let _ = ticker.join();
        }
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run(mut machine: Machine, rx: Receiver<EngineMsg>, poll: Duration) {
    info!("engine thread started");
    loop {
        match rx.recv_timeout(poll) {
            Ok(EngineMsg::Command(cmd, reply)) => {
                let result = machine.execute(cmd, Instant::now());
                let _ = reply.send(result);
            }
            Ok(EngineMsg::Snapshot(reply)) => {
                let _ = reply.send(machine.snapshot());
            }
            Ok(EngineMsg::Pipeline(ev)) => machine.on_pipeline(ev, Instant::now()),
            Ok(EngineMsg::AudioProgress {
                generation,
                position,
                duration,
            }) => machine.on_audio_progress(generation, position, duration),
            Ok(EngineMsg::Shutdown { fade_out }) => {
                machine.shutdown(fade_out);
                break;
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                machine.shutdown(Duration::ZERO);
                break;
            }
        }
        machine.poll(Instant::now());
    }
    info!("engine thread stopped");
}
