//! Application module: the view model the TUI draws from.
//!
//! `App` lives in `app::model` and is fed exclusively by engine events.

mod model;

pub use model::*;
