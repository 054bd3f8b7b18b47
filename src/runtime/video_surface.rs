//! External-process video surface.
//!
//! Plays the engine's video requests in a separate player (mpv by default).
//! The process is killed on pause and relaunched at the paused position on
//! play, so its position is estimated from wall-clock time since launch.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use duet::Result;
use duet::config::VideoSettings;
use duet::engine::{EngineHandle, VideoRequest};

/// Reports closer than this to the known end count as a natural end.
const END_SLACK_SECS: f64 = 1.5;
const REPORT_EVERY: Duration = Duration::from_millis(250);

pub struct VideoSurface {
    settings: VideoSettings,
    child: Option<Child>,
    path: Option<PathBuf>,
    /// Seconds into the file when the process was launched or last paused.
    offset: f64,
    started: Option<Instant>,
    volume: f32,
    last_report: Option<Instant>,
}

impl VideoSurface {
    pub fn new(settings: VideoSettings) -> Self {
        Self {
            settings,
            child: None,
            path: None,
            offset: 0.0,
            started: None,
            volume: 1.0,
            last_report: None,
        }
    }

    pub fn handle(&mut self, req: VideoRequest, engine: &EngineHandle) -> Result<()> {
        debug!(?req, "video request");
        match req {
            VideoRequest::Load {
                path,
                start_at,
                autoplay,
            } => {
                self.kill();
                self.path = Some(path);
                self.offset = start_at.max(0.0);
                if autoplay && !self.launch() {
                    return self.give_up(engine);
                }
                engine.video_loaded(None)
            }
            VideoRequest::Play => {
                if self.child.is_none() && self.path.is_some() && !self.launch() {
                    return self.give_up(engine);
                }
                Ok(())
            }
            VideoRequest::Pause => {
                if self.child.is_some() {
                    self.offset = self.position_at(Instant::now());
                    self.kill();
                }
                Ok(())
            }
            VideoRequest::Seek(position) => {
                self.offset = position.max(0.0);
                if self.child.is_some() {
                    self.kill();
                    if !self.launch() {
                        return self.give_up(engine);
                    }
                }
                Ok(())
            }
            VideoRequest::Stop => {
                self.kill();
                self.path = None;
                engine.video_stopped()
            }
            VideoRequest::SetVolume(v) => {
                // Applied on the next launch.
                self.volume = v;
                Ok(())
            }
        }
    }

    /// Push progress while the player runs and report when it exits by itself.
    pub fn tick(&mut self, engine: &EngineHandle, duration: Option<f64>) -> Result<()> {
        let now = Instant::now();
        let position = self.position_at(now);
        let Some(child) = self.child.as_mut() else {
            return Ok(());
        };

        match child.try_wait() {
            Ok(Some(status)) => {
                self.child = None;
                self.started = None;
                self.path = None;
                self.offset = position;
                if finished_naturally(position, duration) {
                    info!(%status, "video player reached the end");
                    engine.video_ended()
                } else {
                    info!(%status, position, "video player closed");
                    engine.video_closed(Some(position))
                }
            }
            Ok(None) => {
                let due = self
                    .last_report
                    .is_none_or(|at| now.duration_since(at) >= REPORT_EVERY);
                if !due {
                    return Ok(());
                }
                self.last_report = Some(now);
                let total = duration.unwrap_or(0.0);
                let shown = if total > 0.0 { position.min(total) } else { position };
                engine.update_video_progress(shown, total)
            }
            Err(e) => {
                warn!(error = %e, "could not poll the video player");
                Ok(())
            }
        }
    }

    pub fn shutdown(&mut self) {
        self.kill();
        self.path = None;
    }

    fn position_at(&self, now: Instant) -> f64 {
        match self.started {
            Some(at) => self.offset + now.duration_since(at).as_secs_f64(),
            None => self.offset,
        }
    }

    /// Start the player at `offset`. Returns `false` when it could not run.
    fn launch(&mut self) -> bool {
        let Some(path) = self.path.as_deref() else {
            return false;
        };
        let args = launch_args(&self.settings, path, self.offset, self.volume);
        let spawned = Command::new(&self.settings.command)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();
        match spawned {
            Ok(child) => {
                info!(command = %self.settings.command, path = %path.display(), offset = self.offset, "video player started");
                self.child = Some(child);
                self.started = Some(Instant::now());
                self.last_report = None;
                true
            }
            Err(e) => {
                warn!(command = %self.settings.command, error = %e, "failed to start video player");
                false
            }
        }
    }

    /// The player cannot run: hand the track back to audio.
    fn give_up(&mut self, engine: &EngineHandle) -> Result<()> {
        self.path = None;
        engine.video_closed(Some(self.offset))
    }

    fn kill(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
            debug!("video player stopped");
        }
        self.started = None;
    }
}

impl Drop for VideoSurface {
    fn drop(&mut self) {
        self.kill();
    }
}

/// Arguments for one player launch: configured args, start offset, volume, file.
fn launch_args(settings: &VideoSettings, path: &Path, offset: f64, volume: f32) -> Vec<OsString> {
    let mut args: Vec<OsString> = settings.args.iter().map(OsString::from).collect();
    if offset > 0.0 && !settings.start_arg.is_empty() {
        let secs = format!("{offset:.3}");
        args.push(settings.start_arg.replace("{secs}", &secs).into());
    }
    if !settings.volume_arg.is_empty() {
        let percent = (volume.clamp(0.0, 2.0) * 100.0).round() as u32;
        args.push(
            settings
                .volume_arg
                .replace("{percent}", &percent.to_string())
                .into(),
        );
    }
    args.push(path.as_os_str().to_owned());
    args
}

fn finished_naturally(position: f64, duration: Option<f64>) -> bool {
    duration.is_some_and(|d| d > 0.0 && position >= d - END_SLACK_SECS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn launch_args_fill_in_offset_and_volume() {
        let settings = VideoSettings::default();
        let args = launch_args(&settings, Path::new("/mv/song.mp4"), 42.5, 0.8);
        assert_eq!(
            args,
            vec![
                OsString::from("--force-window=yes"),
                OsString::from("--really-quiet"),
                OsString::from("--start=42.500"),
                OsString::from("--volume=80"),
                OsString::from("/mv/song.mp4"),
            ]
        );
    }

    #[test]
    fn launch_args_skip_zero_offset_and_empty_templates() {
        let settings = VideoSettings {
            command: "vlc".to_string(),
            args: Vec::new(),
            start_arg: "--start-time={secs}".to_string(),
            volume_arg: String::new(),
        };
        let args = launch_args(&settings, Path::new("clip.mkv"), 0.0, 1.0);
        assert_eq!(args, vec![OsString::from("clip.mkv")]);
    }

    #[test]
    fn natural_end_needs_a_known_duration() {
        assert!(finished_naturally(179.0, Some(180.0)));
        assert!(!finished_naturally(60.0, Some(180.0)));
        assert!(!finished_naturally(500.0, None));
        assert!(!finished_naturally(0.0, Some(0.0)));
    }

    #[test]
    fn position_is_estimated_from_launch_time() {
        let mut surface = VideoSurface::new(VideoSettings::default());
        surface.offset = 30.0;
        assert_eq!(surface.position_at(Instant::now()), 30.0);

        let launched = Instant::now();
        surface.started = Some(launched);
        let later = launched + Duration::from_millis(2_500);
        assert_eq!(surface.position_at(later), 32.5);
    }
}
