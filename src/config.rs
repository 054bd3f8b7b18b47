//! Configuration loader and schema types.
//!
//! This module exposes the settings schema that drives the engine, the
//! library scanner and the terminal front-end, plus helpers to load it.

mod load;
mod schema;

pub use load::{default_config_path, default_log_path, resolve_config_path};
pub use schema::*;
