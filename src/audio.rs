//! Audio decode/output pipeline.
//!
//! A dedicated thread owns the `rodio` output stream and at most one decoding
//! session. The engine drives it with [`PipelineCmd`]s and hears back through
//! [`PipelineEvent`]s; neither side blocks on the other.

mod player;
mod sink;
mod thread;
mod types;

pub use player::AudioPipeline;
pub use types::{PipelineCmd, PipelineControl, PipelineEvent, PipelineStatus, StatusHandle};

#[cfg(test)]
mod tests;
