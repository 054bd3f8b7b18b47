//! The playback state machine.
//!
//! `Machine` is single-threaded and clock-free: the engine thread feeds it
//! commands, pipeline events and ticker samples together with the current
//! `Instant`, and it answers by commanding the pipeline and emitting
//! [`EngineEvent`]s.

use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use tracing::{debug, info, trace, warn};

use crate::audio::{PipelineCmd, PipelineControl, PipelineEvent};
use crate::config::{LibrarySettings, Settings};
use crate::error::{PlaybackError, Result};
use crate::library::{self, Track};
use crate::playlist::Playlist;

use super::arbiter::{Arbiter, Handoff, Transport};
use super::mode::{self, Direction, PlayMode, PlaybackMode};
use super::ticker::{TickGate, clamp_progress};
use super::types::{Command, EngineEvent, PlayerState, Snapshot, VideoRequest};

fn secs(d: Duration) -> f64 {
    d.as_secs_f64()
}

/// Seconds from the outside world; negative and NaN become zero, overflow
/// saturates so the caller's clamp caps it at the track length.
fn from_secs(s: f64) -> Duration {
    if s.is_nan() || s <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(s).unwrap_or(Duration::MAX)
}

/// Bookkeeping for the track that is currently loaded.
#[derive(Debug, Default)]
struct Session {
    /// Bumped on every transport launch and release; tags pipeline replies.
    generation: u64,
    /// Transport currently holding the track.
    transport: Option<Transport>,
    /// The pipeline acknowledged the open for `generation`.
    audio_open: bool,
    /// The video surface reported the file loaded.
    video_loaded: bool,
    /// Authoritative position.
    position: Duration,
    duration: Option<Duration>,
    seek_in_flight: bool,
    /// Audio stop acknowledgment that completes a handoff.
    awaiting_audio_stop: Option<u64>,
    awaiting_video_stop: bool,
}

pub struct Machine {
    playlist: Playlist,
    state: PlayerState,
    play_mode: PlayMode,
    playback_mode: PlaybackMode,
    arbiter: Arbiter,
    session: Session,
    volume: f32,
    library: LibrarySettings,
    pipeline: Box<dyn PipelineControl>,
    events: Sender<EngineEvent>,
    gate: TickGate,
    rng: StdRng,
}

impl Machine {
    pub fn new(
        settings: &Settings,
        pipeline: Box<dyn PipelineControl>,
        events: Sender<EngineEvent>,
        gate: TickGate,
        rng: StdRng,
    ) -> Self {
        Self {
            playlist: Playlist::new(),
            state: PlayerState::Stopped,
            play_mode: settings.playback.play_mode.into(),
            playback_mode: settings.playback.playback_mode.into(),
            arbiter: Arbiter::new(
                Transport::Audio,
                Duration::from_millis(settings.engine.grace_period_ms),
            ),
            session: Session::default(),
            volume: settings.audio.volume.clamp(0.0, 2.0),
            library: settings.library.clone(),
            pipeline,
            events,
            gate,
            rng,
        }
    }

    // ---- queries --------------------------------------------------------

    pub fn state(&self) -> PlayerState {
        self.state
    }

    pub fn current_index(&self) -> Option<usize> {
        self.playlist.current_index()
    }

    #[cfg(test)]
    pub fn arbiter_state(&self) -> super::arbiter::ArbiterState {
        self.arbiter.state()
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            playlist: self.playlist.tracks().to_vec(),
            current_index: self.playlist.current_index(),
            state: self.state,
            play_mode: self.play_mode,
            playback_mode: self.playback_mode,
            position: secs(self.session.position),
            duration: self.duration_secs(),
            volume: self.volume,
        }
    }

    // ---- inputs ---------------------------------------------------------

    pub fn execute(&mut self, cmd: Command, now: Instant) -> Result<()> {
        debug!(?cmd, "engine command");
        let result = match cmd {
            Command::Play => self.play(now),
            Command::Pause => {
                self.pause();
                Ok(())
            }
            Command::Stop => {
                self.stop();
                Ok(())
            }
            Command::Next => self.step(Direction::Next, now),
            Command::Previous => self.step(Direction::Previous, now),
            Command::SetSong(index) => self.set_song(index, now),
            Command::AddSong(path) => self.add_song(&path),
            Command::AddFolder(dir) => self.add_folder(&dir).map(|_| ()),
            Command::RemoveSong(index) => self.remove_song(index),
            Command::ClearPlaylist => {
                self.clear_playlist();
                Ok(())
            }
            Command::SetPlayMode(mode) => {
                self.set_play_mode(mode);
                Ok(())
            }
            Command::SeekTo(position) => self.seek_to(position),
            Command::SetPlaybackMode(mode) => {
                self.set_playback_mode(mode, now);
                Ok(())
            }
            Command::TogglePlaybackMode => {
                self.set_playback_mode(self.playback_mode.toggled(), now);
                Ok(())
            }
            Command::SetVolume(v) => {
                self.set_volume(v);
                Ok(())
            }
            Command::UpdateVideoProgress { position, duration } => {
                self.update_video_progress(position, duration);
                Ok(())
            }
            Command::VideoLoaded(duration) => {
                self.video_loaded(duration);
                Ok(())
            }
            Command::VideoStopped => {
                self.video_stopped();
                Ok(())
            }
            Command::VideoEnded => {
                self.video_ended(now);
                Ok(())
            }
            Command::VideoClosed(position) => {
                self.video_closed(position);
                Ok(())
            }
        };
        self.sync_gate();
        result
    }

    pub fn on_pipeline(&mut self, event: PipelineEvent, now: Instant) {
        match event {
            PipelineEvent::Opened {
                generation,
                duration,
            } => {
                if !self.is_live_audio(generation) {
                    trace!(generation, "discarding stale open acknowledgment");
                    return;
                }
                self.session.audio_open = true;
                if let Some(d) = duration {
                    self.backfill_duration(d);
                }
            }
            PipelineEvent::OpenFailed { generation, error } => {
                if !self.is_live_audio(generation) {
                    trace!(generation, %error, "discarding stale open failure");
                    return;
                }
                warn!(generation, %error, "audio session failed");
                self.session.transport = None;
                self.session.audio_open = false;
                self.session.seek_in_flight = false;
                if self.state == PlayerState::Playing {
                    self.set_state(PlayerState::Paused);
                }
                self.emit(EngineEvent::Error(error.to_string()));
            }
            PipelineEvent::Seeked {
                generation,
                position,
            } => {
                if !self.is_live_audio(generation) {
                    return;
                }
                self.session.seek_in_flight = false;
                self.session.position = clamp_progress(position, self.session.duration);
                self.emit_progress();
            }
            PipelineEvent::SeekFailed { generation, error } => {
                if !self.is_live_audio(generation) {
                    return;
                }
                warn!(generation, %error, "seek failed");
                self.session.seek_in_flight = false;
                self.emit(EngineEvent::Error(error.to_string()));
            }
            PipelineEvent::Stopped { generation } => {
                if self.session.awaiting_audio_stop != Some(generation) {
                    trace!(generation, "ignoring stop acknowledgment");
                    return;
                }
                self.session.awaiting_audio_stop = None;
                if let Some(h) = self.arbiter.acknowledge_stop(Transport::Audio) {
                    self.complete_handoff(h);
                }
            }
            PipelineEvent::Finished { generation } => {
                if !self.is_live_audio(generation) || !self.arbiter.accepts(Transport::Audio) {
                    trace!(generation, "ignoring end of stale audio session");
                    return;
                }
                self.end_of_track(now);
            }
        }
        self.sync_gate();
    }

    /// A ticker sample of the audio pipeline.
    pub fn on_audio_progress(
        &mut self,
        generation: u64,
        position: Duration,
        duration: Option<Duration>,
    ) {
        let live = self.is_live_audio(generation)
            && self.arbiter.accepts(Transport::Audio)
            && self.state == PlayerState::Playing
            && !self.session.seek_in_flight;
        if !live {
            trace!(generation, ?position, "discarding stale audio progress");
            return;
        }
        if let Some(d) = duration {
            self.backfill_duration(d);
        }
        let position = clamp_progress(position, self.session.duration);
        // Only a seek may move the audio clock backwards.
        self.session.position = self.session.position.max(position);
        self.emit_progress();
    }

    /// Complete a handoff whose grace period ran out.
    pub fn poll(&mut self, now: Instant) {
        if let Some(h) = self.arbiter.poll(now) {
            self.session.awaiting_audio_stop = None;
            self.session.awaiting_video_stop = false;
            self.complete_handoff(h);
            self.sync_gate();
        }
    }

    pub fn shutdown(&mut self, fade_out: Duration) {
        info!("engine shutting down");
        self.gate.shutdown();
        if self.session.transport == Some(Transport::Video) {
            self.emit(EngineEvent::VideoRequest(VideoRequest::Stop));
        }
        self.pipeline.quit(fade_out);
    }

    // ---- transport commands ---------------------------------------------

    pub fn play(&mut self, now: Instant) -> Result<()> {
        if self.playlist.is_empty() {
            debug!("play ignored: playlist is empty");
            return Ok(());
        }
        match (self.state, self.playlist.current_index()) {
            (PlayerState::Playing, _) => Ok(()),
            (PlayerState::Paused, Some(_)) => {
                self.resume();
                Ok(())
            }
            (_, current) => self.start_track(current.unwrap_or(0), now),
        }
    }

    fn resume(&mut self) {
        self.set_state(PlayerState::Playing);
        match self.session.transport {
            Some(Transport::Audio) => self.pipeline.send(PipelineCmd::Play),
            Some(Transport::Video) => self.emit(EngineEvent::VideoRequest(VideoRequest::Play)),
            // The incoming transport starts playing when the handoff completes.
            None if self.arbiter.is_transitioning() => {}
            None => {
                // Nothing is open, e.g. after a failed open: try again.
                if let Some(target) = self.target_transport() {
                    self.arbiter.settle(target);
                    self.launch(target);
                }
            }
        }
    }

    pub fn pause(&mut self) {
        if self.state != PlayerState::Playing {
            return;
        }
        self.set_state(PlayerState::Paused);
        match self.session.transport {
            Some(Transport::Audio) => self.pipeline.send(PipelineCmd::Pause),
            Some(Transport::Video) => self.emit(EngineEvent::VideoRequest(VideoRequest::Pause)),
            None => {}
        }
    }

    /// Release the session; the current index is kept so `play` restarts it.
    pub fn stop(&mut self) {
        self.release_transports();
        let owner = self.target_transport().unwrap_or(Transport::Audio);
        self.arbiter.settle(owner);
        self.session.position = Duration::ZERO;
        self.set_state(PlayerState::Stopped);
        self.emit_progress();
    }

    fn step(&mut self, direction: Direction, now: Instant) -> Result<()> {
        let next = mode::select(
            self.playlist.current_index(),
            self.playlist.len(),
            self.play_mode,
            direction,
            &mut self.rng,
        );
        match next {
            Some(index) => self.start_track(index, now),
            None if self.playlist.is_empty() => Ok(()),
            None => {
                info!("end of playlist");
                self.stop();
                Ok(())
            }
        }
    }

    fn end_of_track(&mut self, now: Instant) {
        debug!(index = ?self.playlist.current_index(), "track finished");
        if let Err(e) = self.step(Direction::EndOfTrack, now) {
            warn!(error = %e, "could not advance after end of track");
        }
    }

    pub fn set_song(&mut self, index: usize, now: Instant) -> Result<()> {
        self.playlist.get(index)?;
        self.start_track(index, now)
    }

    pub fn seek_to(&mut self, position: f64) -> Result<()> {
        if self.state == PlayerState::Stopped || self.playlist.current().is_none() {
            return Err(PlaybackError::Seek("nothing is loaded".to_string()));
        }
        let target = clamp_progress(from_secs(position), self.session.duration);
        self.session.position = target;

        if self.arbiter.queue_seek(target) {
            debug!(?target, "seek held until the handoff completes");
        } else {
            match self.session.transport {
                Some(Transport::Audio) => {
                    self.session.seek_in_flight = true;
                    self.pipeline.send(PipelineCmd::Seek {
                        generation: self.session.generation,
                        position: target,
                    });
                }
                Some(Transport::Video) => {
                    self.emit(EngineEvent::VideoRequest(VideoRequest::Seek(secs(target))))
                }
                // Applied when a transport is next launched.
                None => {}
            }
        }
        self.emit_progress();
        Ok(())
    }

    pub fn set_play_mode(&mut self, mode: PlayMode) {
        self.play_mode = mode;
        info!(mode = mode.label(), "play mode changed");
        self.emit(EngineEvent::PlayModeChanged(mode));
    }

    pub fn set_playback_mode(&mut self, mode: PlaybackMode, now: Instant) {
        if mode == self.playback_mode {
            return;
        }
        self.playback_mode = mode;
        info!(mode = mode.label(), "playback mode changed");
        self.emit(EngineEvent::PlaybackModeChanged(mode));

        if self.state == PlayerState::Stopped {
            return;
        }
        let Some(target) = self.target_transport() else {
            return;
        };

        if !self.arbiter.is_transitioning() {
            match self.session.transport {
                // The current track plays the same way in either mode.
                Some(active) if active == target => return,
                Some(_) => {}
                None => {
                    self.arbiter.settle(target);
                    return;
                }
            }
        }

        if target == Transport::Audio && self.state == PlayerState::Paused {
            self.set_state(PlayerState::Playing);
        }
        self.engage(target, now);
    }

    pub fn set_volume(&mut self, volume: f32) {
        let v = if volume.is_nan() {
            self.volume
        } else {
            volume.clamp(0.0, 2.0)
        };
        self.volume = v;
        self.pipeline.send(PipelineCmd::SetVolume(v));
        self.emit(EngineEvent::VideoRequest(VideoRequest::SetVolume(v)));
        self.emit(EngineEvent::VolumeChanged(v));
    }

    // ---- playlist commands ----------------------------------------------

    pub fn add_song(&mut self, path: &Path) -> Result<()> {
        let track = library::probe(path, &self.library)?;
        info!(path = %path.display(), "track added");
        self.playlist.add(track);
        self.emit_playlist();
        Ok(())
    }

    /// Scan `dir` and append every playable file; returns how many were added.
    pub fn add_folder(&mut self, dir: &Path) -> Result<usize> {
        if !dir.is_dir() {
            return Err(PlaybackError::FileNotFound(dir.to_path_buf()));
        }
        let tracks = library::scan(dir, &self.library);
        let count = tracks.len();
        info!(dir = %dir.display(), count, "folder added");
        self.append(tracks);
        Ok(count)
    }

    /// Append already-probed tracks.
    pub fn append(&mut self, tracks: Vec<Track>) {
        self.playlist.extend(tracks);
        self.emit_playlist();
    }

    pub fn remove_song(&mut self, index: usize) -> Result<()> {
        let removal = self.playlist.remove(index)?;
        debug!(
            index,
            title = %removal.track.title,
            was_current = removal.was_current,
            "track removed"
        );
        if removal.was_current {
            self.session.duration = None;
            self.stop();
        }
        self.emit_playlist();
        Ok(())
    }

    pub fn clear_playlist(&mut self) {
        self.session.duration = None;
        self.stop();
        self.playlist.clear();
        self.emit_playlist();
    }

    // ---- video surface callbacks ----------------------------------------

    pub fn update_video_progress(&mut self, position: f64, duration: f64) {
        let live = self.session.transport == Some(Transport::Video)
            && self.session.video_loaded
            && self.arbiter.accepts(Transport::Video);
        if !live {
            trace!(position, "discarding stale video progress");
            return;
        }
        if duration.is_finite() && duration > 0.0 {
            self.backfill_duration(from_secs(duration));
        }
        self.session.position = clamp_progress(from_secs(position), self.session.duration);
        self.emit_progress();
    }

    pub fn video_loaded(&mut self, duration: Option<f64>) {
        if self.session.transport != Some(Transport::Video) {
            trace!("ignoring load report from an inactive video surface");
            return;
        }
        self.session.video_loaded = true;
        if let Some(d) = duration.filter(|d| d.is_finite() && *d > 0.0) {
            self.backfill_duration(from_secs(d));
        }
    }

    pub fn video_stopped(&mut self) {
        if !self.session.awaiting_video_stop {
            trace!("ignoring video stop acknowledgment");
            return;
        }
        self.session.awaiting_video_stop = false;
        if let Some(h) = self.arbiter.acknowledge_stop(Transport::Video) {
            self.complete_handoff(h);
        }
    }

    pub fn video_ended(&mut self, now: Instant) {
        if self.session.transport != Some(Transport::Video)
            || !self.arbiter.accepts(Transport::Video)
        {
            return;
        }
        self.end_of_track(now);
    }

    /// The user closed the video surface: fall back to audio at `position`.
    pub fn video_closed(&mut self, position: Option<f64>) {
        if self.session.transport != Some(Transport::Video) {
            trace!("ignoring close of an inactive video surface");
            return;
        }
        if let Some(p) = position {
            self.session.position = clamp_progress(from_secs(p), self.session.duration);
        }
        self.session.transport = None;
        self.session.video_loaded = false;

        let audio_capable = self.playlist.current().is_some_and(|t| !t.is_video());
        if !audio_capable {
            // A plain video file has no audio rendition to fall back to.
            if self.state == PlayerState::Playing {
                self.set_state(PlayerState::Paused);
            }
            self.emit_progress();
            return;
        }

        if self.playback_mode != PlaybackMode::Audio {
            self.playback_mode = PlaybackMode::Audio;
            self.emit(EngineEvent::PlaybackModeChanged(PlaybackMode::Audio));
        }
        self.arbiter.settle(Transport::Audio);
        self.set_state(PlayerState::Playing);
        self.launch(Transport::Audio);
        self.emit_progress();
    }

    // ---- internals ------------------------------------------------------

    fn start_track(&mut self, index: usize, now: Instant) -> Result<()> {
        let track = self.playlist.select(index)?.clone();
        let target = self.effective_transport(&track);
        info!(index, title = %track.title, ?target, "starting track");

        self.session.position = Duration::ZERO;
        self.session.duration = track.duration;
        self.session.seek_in_flight = false;
        // A seek held for the previous track must not leak into this one.
        self.arbiter.cancel_seek();

        self.emit(EngineEvent::SongChanged(index, track));
        debug!(from = self.state.label(), to = "playing", "state transition");
        self.state = PlayerState::Playing;
        self.emit(EngineEvent::StateChanged(PlayerState::Playing));
        self.emit_progress();

        self.engage(target, now);
        Ok(())
    }

    /// Route the current track to `target`, handing ownership over first
    /// when another transport holds it.
    fn engage(&mut self, target: Transport, now: Instant) {
        if self.arbiter.is_transitioning() {
            self.arbiter.request(target, now);
            return;
        }
        match self.session.transport {
            Some(active) if active != target => {
                self.arbiter.request(target, now);
                self.stop_for_handoff(active);
            }
            _ => {
                self.arbiter.settle(target);
                self.launch(target);
            }
        }
    }

    fn stop_for_handoff(&mut self, outgoing: Transport) {
        match outgoing {
            Transport::Audio => {
                let generation = self.session.generation;
                self.session.awaiting_audio_stop = Some(generation);
                self.session.audio_open = false;
                self.session.seek_in_flight = false;
                self.pipeline.send(PipelineCmd::Stop { generation });
            }
            Transport::Video => {
                self.session.awaiting_video_stop = true;
                self.session.video_loaded = false;
                self.emit(EngineEvent::VideoRequest(VideoRequest::Stop));
            }
        }
        self.session.transport = None;
    }

    fn complete_handoff(&mut self, handoff: Handoff) {
        self.session.awaiting_audio_stop = None;
        self.session.awaiting_video_stop = false;
        if let Some(seek) = handoff.seek {
            self.session.position = clamp_progress(seek, self.session.duration);
        }
        if self.state == PlayerState::Stopped || self.playlist.current().is_none() {
            return;
        }
        self.launch(handoff.target);
        self.emit_progress();
    }

    /// Open the current track on `target` at the session position.
    fn launch(&mut self, target: Transport) {
        let Some(track) = self.playlist.current() else {
            return;
        };
        let audio_path = track.path.clone();
        let video_path: Option<PathBuf> = track.video_path().map(Path::to_path_buf);

        self.session.generation += 1;
        let generation = self.session.generation;
        let autoplay = self.state == PlayerState::Playing;
        let start_at = self.session.position;

        match target {
            Transport::Audio => {
                self.session.audio_open = false;
                self.pipeline.send(PipelineCmd::Open {
                    generation,
                    path: audio_path,
                    start_at,
                    autoplay,
                });
            }
            Transport::Video => {
                let Some(path) = video_path else {
                    warn!(path = %audio_path.display(), "track has no video to show");
                    return;
                };
                self.session.video_loaded = false;
                self.emit(EngineEvent::VideoRequest(VideoRequest::Load {
                    path,
                    start_at: secs(start_at),
                    autoplay,
                }));
            }
        }
        self.session.transport = Some(target);
    }

    /// Stop whatever is playing without waiting for acknowledgments.
    fn release_transports(&mut self) {
        match self.session.transport.take() {
            Some(Transport::Audio) => self.pipeline.send(PipelineCmd::Stop {
                generation: self.session.generation,
            }),
            Some(Transport::Video) => self.emit(EngineEvent::VideoRequest(VideoRequest::Stop)),
            None => {}
        }
        self.session.generation += 1;
        self.session.audio_open = false;
        self.session.video_loaded = false;
        self.session.seek_in_flight = false;
        self.session.awaiting_audio_stop = None;
        self.session.awaiting_video_stop = false;
    }

    fn effective_transport(&self, track: &Track) -> Transport {
        if track.is_video() || (track.has_video() && self.playback_mode == PlaybackMode::Video) {
            Transport::Video
        } else {
            Transport::Audio
        }
    }

    fn target_transport(&self) -> Option<Transport> {
        self.playlist
            .current()
            .map(|t| self.effective_transport(t))
    }

    fn is_live_audio(&self, generation: u64) -> bool {
        generation == self.session.generation && self.session.transport == Some(Transport::Audio)
    }

    /// Adopt a longer (or first) duration for the current track.
    fn backfill_duration(&mut self, duration: Duration) {
        if duration.is_zero() || self.session.duration.is_some_and(|known| known >= duration) {
            return;
        }
        self.session.duration = Some(duration);
        let Some(index) = self.playlist.current_index() else {
            return;
        };
        if let Ok(true) = self.playlist.set_duration(index, duration) {
            debug!(index, ?duration, "duration back-filled");
            self.emit_playlist();
        }
    }

    fn sync_gate(&self) {
        let open = self.arbiter.owner() == Some(Transport::Audio)
            && self.state == PlayerState::Playing
            && self.session.transport == Some(Transport::Audio)
            && self.session.audio_open
            && !self.session.seek_in_flight;
        if open {
            self.gate.open(self.session.generation);
        } else {
            self.gate.close();
        }
    }

    fn set_state(&mut self, state: PlayerState) {
        if self.state == state {
            return;
        }
        debug!(from = self.state.label(), to = state.label(), "state transition");
        self.state = state;
        self.emit(EngineEvent::StateChanged(state));
    }

    fn duration_secs(&self) -> f64 {
        self.session.duration.map(secs).unwrap_or(0.0)
    }

    fn emit_progress(&self) {
        self.emit(EngineEvent::ProgressUpdate(
            secs(self.session.position),
            self.duration_secs(),
        ));
    }

    fn emit_playlist(&self) {
        self.emit(EngineEvent::PlaylistUpdated(self.playlist.tracks().to_vec()));
    }

    fn emit(&self, event: EngineEvent) {
        if self.events.send(event).is_err() {
            trace!("no event listener");
        }
    }
}
