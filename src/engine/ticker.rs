//! Progress ticker.
//!
//! Samples the audio pipeline's published status on a fixed cadence and
//! hands `(position, duration)` to the engine. The engine opens the gate only
//! while audio owns the clock, playback is running and no seek is in flight.

use std::io;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, trace};

use crate::audio::StatusHandle;

#[derive(Debug, Clone, Copy, Default)]
struct GateState {
    enabled: bool,
    generation: u64,
    shutdown: bool,
}

/// Shared switch between the engine and the ticker thread.
#[derive(Debug, Clone, Default)]
pub struct TickGate(Arc<Mutex<GateState>>);

impl TickGate {
    /// Start sampling the session tagged `generation`.
    pub fn open(&self, generation: u64) {
        if let Ok(mut g) = self.0.lock() {
            g.enabled = true;
            g.generation = generation;
        }
    }

    pub fn close(&self) {
        if let Ok(mut g) = self.0.lock() {
            g.enabled = false;
        }
    }

    pub fn shutdown(&self) {
        if let Ok(mut g) = self.0.lock() {
            g.enabled = false;
            g.shutdown = true;
        }
    }

    #[cfg(test)]
    pub fn is_open(&self) -> bool {
        self.0.lock().map(|g| g.enabled).unwrap_or(false)
    }

    fn snapshot(&self) -> GateState {
        self.0.lock().map(|g| *g).unwrap_or(GateState {
            shutdown: true,
            ..GateState::default()
        })
    }
}

/// Clamp `position` into `[0, duration]`; unknown durations leave it as is.
pub fn clamp_progress(position: Duration, duration: Option<Duration>) -> Duration {
    match duration {
        Some(d) => position.min(d),
        None => position,
    }
}

/// Spawn the ticker thread.
///
/// `emit` receives `(generation, position, duration)` and returns `false`
/// once nobody is listening, which ends the thread.
pub fn spawn_ticker<F>(
    gate: TickGate,
    status: StatusHandle,
    interval: Duration,
    emit: F,
) -> io::Result<JoinHandle<()>>
where
    F: Fn(u64, Duration, Option<Duration>) -> bool + Send + 'static,
{
    thread::Builder::new()
        .name("duet-ticker".to_string())
        .spawn(move || {
            loop {
                thread::sleep(interval);
                let g = gate.snapshot();
                if g.shutdown {
                    break;
                }
                if !g.enabled {
                    continue;
                }

                let Some(s) = status.lock().ok().map(|s| s.clone()) else {
                    continue;
                };
                if s.generation != g.generation || !s.playing {
                    trace!(
                        want = g.generation,
                        got = s.generation,
                        "skipping tick for another session"
                    );
                    continue;
                }

                let position = clamp_progress(s.position, s.duration);
                if !emit(g.generation, position, s.duration) {
                    break;
                }
            }
            debug!("progress ticker exiting");
        })
}
