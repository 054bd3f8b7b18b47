//! Playback coordination engine.
//!
//! The engine owns the playlist and decides, at every moment, which transport
//! (the internal audio pipeline or the external video surface) holds the
//! transport clock. It runs on its own thread; callers talk to it through an
//! [`EngineHandle`] and listen on the [`EngineEvent`] receiver returned by
//! [`Engine::spawn`].

mod arbiter;
mod handle;
mod machine;
mod mode;
mod ticker;
mod types;

pub use arbiter::{ArbiterState, Transport};
pub use handle::{Engine, EngineHandle};
pub use mode::{PlayMode, PlaybackMode};
pub use types::{Command, EngineEvent, PlayerState, Snapshot, VideoRequest};
