//! Track model and everything that turns files on disk into tracks.
//!
//! `probe` reads one path (tags via lofty, companion video, `.lrc` lyrics,
//! cover art); `scan` walks a directory and probes every playable file.

mod display;
mod lyrics;
mod model;
mod probe;
mod scan;

pub use display::display_from_fields;
pub use lyrics::parse_lrc;
pub use model::*;
pub use probe::{find_companion_video, media_type_of, probe};
pub use scan::scan;

#[cfg(test)]
mod tests;
