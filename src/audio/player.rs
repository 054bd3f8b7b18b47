use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::warn;

use crate::config::AudioSettings;
use crate::error::Result;

use super::thread::spawn_pipeline_thread;
use super::types::{PipelineCmd, PipelineControl, PipelineEvent, PipelineStatus, StatusHandle};

/// Handle to the audio pipeline thread.
///
/// Commands are queued on a channel; replies come back through the `notify`
/// callback given to [`AudioPipeline::new`], and the latest position is
/// mirrored into a shared [`StatusHandle`].
pub struct AudioPipeline {
    tx: Sender<PipelineCmd>,
    status: StatusHandle,
    join: Mutex<Option<JoinHandle<()>>>,
}

impl AudioPipeline {
    pub fn new<F>(audio_settings: AudioSettings, notify: F) -> Result<Self>
    where
        F: Fn(PipelineEvent) + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<PipelineCmd>();
        let status: StatusHandle = Arc::new(Mutex::new(PipelineStatus::default()));
        let join = spawn_pipeline_thread(rx, status.clone(), audio_settings, notify)?;

        Ok(Self {
            tx,
            status,
            join: Mutex::new(Some(join)),
        })
    }

    pub fn status_handle(&self) -> StatusHandle {
        self.status.clone()
    }

    /// Fade out, stop and wait for the pipeline thread to exit.
    pub fn quit_softly(&self, fade_out: Duration) {
        self.send(PipelineCmd::Quit {
            fade_out_ms: fade_out.as_millis() as u64,
        });

        if let Ok(mut j) = self.join.lock() {
            if let Some(h) = j.take() {
                let _ = h.join();
            }
        }
    }
}

impl PipelineControl for AudioPipeline {
    fn send(&self, cmd: PipelineCmd) {
        if self.tx.send(cmd).is_err() {
            warn!("audio pipeline thread is gone; command dropped");
        }
    }

    fn quit(&self, fade_out: Duration) {
        self.quit_softly(fade_out);
    }
}

impl Drop for AudioPipeline {
    fn drop(&mut self) {
        let running = self.join.get_mut().map(|j| j.is_some()).unwrap_or(false);
        if running {
            self.quit_softly(Duration::ZERO);
        }
    }
}
