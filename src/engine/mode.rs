//! Play-mode track selection.

use rand::Rng;

use crate::config::{PlayModeSetting, PlaybackModeSetting};

/// Global track-selection policy.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum PlayMode {
    #[default]
    Sequential,
    /// Replay the current track, for manual and natural advancement alike.
    Repeat,
    /// Uniform random pick that never repeats the current index immediately.
    Shuffle,
}

impl PlayMode {
    pub fn label(self) -> &'static str {
        match self {
            PlayMode::Sequential => "sequential",
            PlayMode::Repeat => "repeat",
            PlayMode::Shuffle => "shuffle",
        }
    }

    /// Next mode in the UI's cycling order.
    pub fn cycle(self) -> Self {
        match self {
            PlayMode::Sequential => PlayMode::Repeat,
            PlayMode::Repeat => PlayMode::Shuffle,
            PlayMode::Shuffle => PlayMode::Sequential,
        }
    }
}

impl From<PlayModeSetting> for PlayMode {
    fn from(s: PlayModeSetting) -> Self {
        match s {
            PlayModeSetting::Sequential => PlayMode::Sequential,
            PlayModeSetting::Repeat => PlayMode::Repeat,
            PlayModeSetting::Shuffle => PlayMode::Shuffle,
        }
    }
}

/// Which transport should play tracks that carry a video.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum PlaybackMode {
    #[default]
    Audio,
    Video,
}

impl PlaybackMode {
    pub fn label(self) -> &'static str {
        match self {
            PlaybackMode::Audio => "audio",
            PlaybackMode::Video => "video",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            PlaybackMode::Audio => PlaybackMode::Video,
            PlaybackMode::Video => PlaybackMode::Audio,
        }
    }
}

impl From<PlaybackModeSetting> for PlaybackMode {
    fn from(s: PlaybackModeSetting) -> Self {
        match s {
            PlaybackModeSetting::Audio => PlaybackMode::Audio,
            PlaybackModeSetting::Video => PlaybackMode::Video,
        }
    }
}

/// Why a new index is being selected.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Direction {
    Next,
    Previous,
    /// The current track played to its end.
    EndOfTrack,
}

/// Pick the index to play after `current` in a playlist of `len` entries.
///
/// `None` means "nothing to play": the playlist is empty, or sequential
/// playback ran off the end.
pub fn select<R: Rng>(
    current: Option<usize>,
    len: usize,
    mode: PlayMode,
    direction: Direction,
    rng: &mut R,
) -> Option<usize> {
    if len == 0 {
        return None;
    }

    let Some(cur) = current.filter(|&c| c < len) else {
        return match (mode, direction) {
            (PlayMode::Shuffle, _) => Some(rng.random_range(0..len)),
            (_, Direction::Previous) => Some(len - 1),
            _ => Some(0),
        };
    };

    match mode {
        PlayMode::Repeat => Some(cur),
        PlayMode::Shuffle => {
            if len == 1 {
                return Some(cur);
            }
            // Draw from the other len - 1 slots, then step over `cur`.
            let pick = rng.random_range(0..len - 1);
            Some(if pick >= cur { pick + 1 } else { pick })
        }
        PlayMode::Sequential => match direction {
            Direction::Next | Direction::EndOfTrack => (cur + 1 < len).then_some(cur + 1),
            Direction::Previous => Some(cur.saturating_sub(1)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(0x5eed)
    }

    #[test]
    fn sequential_walks_forward_and_stops_at_end() {
        let mut r = rng();
        let m = PlayMode::Sequential;
        assert_eq!(select(Some(0), 3, m, Direction::Next, &mut r), Some(1));
        assert_eq!(select(Some(1), 3, m, Direction::EndOfTrack, &mut r), Some(2));
        assert_eq!(select(Some(2), 3, m, Direction::Next, &mut r), None);
        assert_eq!(select(Some(2), 3, m, Direction::EndOfTrack, &mut r), None);
    }

    #[test]
    fn sequential_previous_stays_at_zero() {
        let mut r = rng();
        let m = PlayMode::Sequential;
        assert_eq!(select(Some(2), 3, m, Direction::Previous, &mut r), Some(1));
        assert_eq!(select(Some(0), 3, m, Direction::Previous, &mut r), Some(0));
    }

    #[test]
    fn no_current_starts_at_either_end() {
        let mut r = rng();
        let m = PlayMode::Sequential;
        assert_eq!(select(None, 4, m, Direction::Next, &mut r), Some(0));
        assert_eq!(select(None, 4, m, Direction::Previous, &mut r), Some(3));
        assert_eq!(select(None, 4, PlayMode::Repeat, Direction::Next, &mut r), Some(0));
    }

    #[test]
    fn empty_playlist_selects_nothing() {
        let mut r = rng();
        for mode in [PlayMode::Sequential, PlayMode::Repeat, PlayMode::Shuffle] {
            assert_eq!(select(None, 0, mode, Direction::Next, &mut r), None);
            assert_eq!(select(Some(0), 0, mode, Direction::EndOfTrack, &mut r), None);
        }
    }

    #[test]
    fn repeat_replays_current_in_every_direction() {
        let mut r = rng();
        for dir in [Direction::Next, Direction::Previous, Direction::EndOfTrack] {
            assert_eq!(select(Some(1), 3, PlayMode::Repeat, dir, &mut r), Some(1));
        }
    }

    #[test]
    fn shuffle_never_repeats_current_and_covers_the_rest() {
        let mut r = rng();
        let mut seen = [false; 5];
        let mut cur = 2;
        for _ in 0..500 {
            let next = select(Some(cur), 5, PlayMode::Shuffle, Direction::Next, &mut r).unwrap();
            assert_ne!(next, cur);
            assert!(next < 5);
            seen[next] = true;
            cur = next;
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn shuffle_single_track_returns_it() {
        let mut r = rng();
        for _ in 0..20 {
            assert_eq!(
                select(Some(0), 1, PlayMode::Shuffle, Direction::Next, &mut r),
                Some(0)
            );
        }
    }

    #[test]
    fn settings_convert_to_modes() {
        assert_eq!(PlayMode::from(PlayModeSetting::Shuffle), PlayMode::Shuffle);
        assert_eq!(
            PlaybackMode::from(PlaybackModeSetting::Video),
            PlaybackMode::Video
        );
        assert_eq!(PlaybackMode::Video.toggled(), PlaybackMode::Audio);
        assert_eq!(PlayMode::Shuffle.cycle(), PlayMode::Sequential);
    }
}
