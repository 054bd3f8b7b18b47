//! duet: a playback engine for playlists of audio tracks that may carry a
//! companion music video.
//!
//! The engine owns the playlist, the play/pause state and the single
//! authoritative playback position. Audio is decoded and played on an
//! internal rodio pipeline; video is delegated to an external surface that
//! the embedding application drives through [`engine::VideoRequest`] events
//! and the `video_*` callbacks on [`engine::EngineHandle`].
//!
//! ```no_run
//! let settings = duet::config::Settings::default();
//! let (engine, events) = duet::engine::Engine::spawn(&settings)?;
//! let player = engine.handle();
//! player.add_folder("Music")?;
//! player.play()?;
//! for ev in events.try_iter() {
//!     println!("{ev:?}");
//! }
//! # Ok::<(), duet::PlaybackError>(())
//! ```

pub mod audio;
pub mod config;
pub mod engine;
pub mod error;
pub mod library;
pub mod playlist;

pub use error::{PlaybackError, Result};
