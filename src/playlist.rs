//! Ordered track list with a current-index cursor.
//!
//! Invariant: `current` is `None` or a valid index into `tracks`. It only
//! becomes `None` when the list is emptied or the current entry is removed.

use std::time::Duration;

use crate::error::{PlaybackError, Result};
use crate::library::Track;

#[derive(Debug, Default, Clone)]
pub struct Playlist {
    tracks: Vec<Track>,
    current: Option<usize>,
}

/// What `Playlist::remove` did to the cursor.
#[derive(Debug, Clone, PartialEq)]
pub struct Removal {
    pub track: Track,
    /// The removed entry was the current one; the cursor is now `None`.
    pub was_current: bool,
}

impl Playlist {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn from_tracks(tracks: Vec<Track>) -> Self {
        Self {
            tracks,
            current: None,
        }
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn current(&self) -> Option<&Track> {
        self.current.and_then(|i| self.tracks.get(i))
    }

    fn check(&self, index: usize) -> Result<()> {
        if index < self.tracks.len() {
            Ok(())
        } else {
            Err(PlaybackError::IndexOutOfRange {
                index,
                len: self.tracks.len(),
            })
        }
    }

    pub fn get(&self, index: usize) -> Result<&Track> {
        self.check(index)?;
        Ok(&self.tracks[index])
    }

    /// Append a track. Duplicated paths are allowed.
    pub fn add(&mut self, track: Track) {
        self.tracks.push(track);
    }

    pub fn extend(&mut self, tracks: impl IntoIterator<Item = Track>) {
        self.tracks.extend(tracks);
    }

    /// Delete the entry at `index`.
    ///
    /// Entries after the cursor shift it down so it keeps pointing at the same
    /// track; removing the current entry clears the cursor.
    pub fn remove(&mut self, index: usize) -> Result<Removal> {
        self.check(index)?;
        let track = self.tracks.remove(index);

        let was_current = self.current == Some(index);
        self.current = match self.current {
            Some(c) if c == index => None,
            Some(c) if index < c => Some(c - 1),
            other => other,
        };

        Ok(Removal { track, was_current })
    }

    pub fn clear(&mut self) {
        self.tracks.clear();
        self.current = None;
    }

    /// Move the cursor to `index`.
    pub fn select(&mut self, index: usize) -> Result<&Track> {
        self.check(index)?;
        self.current = Some(index);
        Ok(&self.tracks[index])
    }

    /// Back-fill a duration learned during playback.
    ///
    /// Returns `true` when the stored value changed.
    pub fn set_duration(&mut self, index: usize, duration: Duration) -> Result<bool> {
        self.check(index)?;
        let track = &mut self.tracks[index];
        if track.duration == Some(duration) {
            return Ok(false);
        }
        track.duration = Some(duration);
        Ok(true)
    }
}
