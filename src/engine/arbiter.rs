//! Audio/video exclusivity.
//!
//! The arbiter decides which transport may advance the authoritative
//! position. Handing ownership over is a two-step protocol: the outgoing
//! transport is told to stop, and the incoming one is started only once that
//! stop is acknowledged, or once the grace period runs out.

use std::time::{Duration, Instant};

use tracing::{debug, warn};

/// Something that can advance playback position.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Transport {
    /// The internal decode/output pipeline.
    Audio,
    /// The external video surface.
    Video,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ArbiterState {
    AudioOwned,
    VideoOwned,
    Transitioning { target: Transport, deadline: Instant },
}

impl ArbiterState {
    fn owned_by(t: Transport) -> Self {
        match t {
            Transport::Audio => ArbiterState::AudioOwned,
            Transport::Video => ArbiterState::VideoOwned,
        }
    }
}

/// A finished handoff: `target` now owns the clock.
#[derive(Debug, Clone, PartialEq)]
pub struct Handoff {
    pub target: Transport,
    /// Seek requested while the handoff was in flight; newest wins.
    pub seek: Option<Duration>,
    /// The outgoing transport never acknowledged its stop.
    pub forced: bool,
}

#[derive(Debug)]
pub struct Arbiter {
    state: ArbiterState,
    grace: Duration,
    /// Transport whose stop acknowledgment completes the current handoff.
    outgoing: Option<Transport>,
    pending_seek: Option<Duration>,
}

impl Arbiter {
    pub fn new(owner: Transport, grace: Duration) -> Self {
        Self {
            state: ArbiterState::owned_by(owner),
            grace,
            outgoing: None,
            pending_seek: None,
        }
    }

    pub fn state(&self) -> ArbiterState {
        self.state
    }

    /// The owning transport; `None` while a handoff is in flight.
    pub fn owner(&self) -> Option<Transport> {
        match self.state {
            ArbiterState::AudioOwned => Some(Transport::Audio),
            ArbiterState::VideoOwned => Some(Transport::Video),
            ArbiterState::Transitioning { .. } => None,
        }
    }

    pub fn is_transitioning(&self) -> bool {
        matches!(self.state, ArbiterState::Transitioning { .. })
    }

    /// Ask for `target` to own the clock.
    ///
    /// Returns the transport that must be stopped now, if any. A request made
    /// while another handoff is in flight supersedes it: the target changes
    /// and the grace period restarts, but the stop already issued still
    /// completes the handoff.
    pub fn request(&mut self, target: Transport, now: Instant) -> Option<Transport> {
        let deadline = now + self.grace;
        match self.state {
            ArbiterState::Transitioning { target: old, .. } => {
                debug!(?old, new = ?target, "handoff superseded");
                self.state = ArbiterState::Transitioning { target, deadline };
                None
            }
            _ => {
                let owner = self.owner()?;
                if owner == target {
                    return None;
                }
                debug!(from = ?owner, to = ?target, "handoff started");
                self.state = ArbiterState::Transitioning { target, deadline };
                self.outgoing = Some(owner);
                self.pending_seek = None;
                Some(owner)
            }
        }
    }

    /// Record that `from` has stopped. Completes the handoff when `from` is
    /// the transport being waited on.
    pub fn acknowledge_stop(&mut self, from: Transport) -> Option<Handoff> {
        if !self.is_transitioning() || self.outgoing != Some(from) {
            return None;
        }
        Some(self.complete(false))
    }

    /// Force the handoff once its deadline has passed.
    pub fn poll(&mut self, now: Instant) -> Option<Handoff> {
        match self.state {
            ArbiterState::Transitioning { target, deadline } if now >= deadline => {
                warn!(
                    outgoing = ?self.outgoing,
                    ?target,
                    "grace period elapsed without stop acknowledgment; forcing ownership (reconciliation)"
                );
                Some(self.complete(true))
            }
            _ => None,
        }
    }

    /// Whether a position report from `from` may be trusted right now.
    pub fn accepts(&self, from: Transport) -> bool {
        match self.state {
            ArbiterState::AudioOwned => from == Transport::Audio,
            ArbiterState::VideoOwned => from == Transport::Video,
            ArbiterState::Transitioning { target, .. } => from == target,
        }
    }

    /// Hold a seek until the handoff completes. Returns `false` when no
    /// handoff is in flight and the caller should seek directly.
    pub fn queue_seek(&mut self, position: Duration) -> bool {
        if !self.is_transitioning() {
            return false;
        }
        self.pending_seek = Some(position);
        true
    }

    pub fn cancel_seek(&mut self) {
        self.pending_seek = None;
    }

    /// Give `owner` the clock immediately, abandoning any handoff in flight.
    pub fn settle(&mut self, owner: Transport) {
        if self.owner() != Some(owner) {
            debug!(?owner, "ownership settled");
        }
        self.state = ArbiterState::owned_by(owner);
        self.outgoing = None;
        self.pending_seek = None;
    }

    fn complete(&mut self, forced: bool) -> Handoff {
        let target = match self.state {
            ArbiterState::Transitioning { target, .. } => target,
            ArbiterState::AudioOwned => Transport::Audio,
            ArbiterState::VideoOwned => Transport::Video,
        };
        self.state = ArbiterState::owned_by(target);
        self.outgoing = None;
        debug!(?target, forced, "handoff completed");
        Handoff {
            target,
            seek: self.pending_seek.take(),
            forced,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GRACE: Duration = Duration::from_millis(250);

    #[test]
    fn request_for_current_owner_is_a_no_op() {
        let mut a = Arbiter::new(Transport::Audio, GRACE);
        assert_eq!(a.request(Transport::Audio, Instant::now()), None);
        assert_eq!(a.state(), ArbiterState::AudioOwned);
    }

    #[test]
    fn handoff_waits_for_the_outgoing_stop() {
        let t0 = Instant::now();
        let mut a = Arbiter::new(Transport::Video, GRACE);

        assert_eq!(a.request(Transport::Audio, t0), Some(Transport::Video));
        assert!(a.is_transitioning());
        assert!(a.accepts(Transport::Audio));
        assert!(!a.accepts(Transport::Video));

        // A stray acknowledgment from the wrong transport changes nothing.
        assert_eq!(a.acknowledge_stop(Transport::Audio), None);

        let done = a.acknowledge_stop(Transport::Video).unwrap();
        assert_eq!(done.target, Transport::Audio);
        assert!(!done.forced);
        assert_eq!(a.state(), ArbiterState::AudioOwned);
    }

    #[test]
    fn grace_overrun_forces_ownership() {
        let t0 = Instant::now();
        let mut a = Arbiter::new(Transport::Audio, GRACE);
        a.request(Transport::Video, t0);

        assert_eq!(a.poll(t0 + Duration::from_millis(100)), None);
        let done = a.poll(t0 + GRACE).unwrap();
        assert!(done.forced);
        assert_eq!(a.owner(), Some(Transport::Video));

        // A late acknowledgment after the forced handoff is ignored.
        assert_eq!(a.acknowledge_stop(Transport::Audio), None);
    }

    #[test]
    fn newer_request_supersedes_and_restarts_the_deadline() {
        let t0 = Instant::now();
        let mut a = Arbiter::new(Transport::Audio, GRACE);
        a.request(Transport::Video, t0);

        let t1 = t0 + Duration::from_millis(200);
        assert_eq!(a.request(Transport::Audio, t1), None);
        assert_eq!(
            a.state(),
            ArbiterState::Transitioning {
                target: Transport::Audio,
                deadline: t1 + GRACE
            }
        );
        // The original deadline no longer applies.
        assert_eq!(a.poll(t0 + GRACE), None);

        let done = a.acknowledge_stop(Transport::Audio).unwrap();
        assert_eq!(done.target, Transport::Audio);
    }

    #[test]
    fn queued_seek_is_handed_over_once() {
        let t0 = Instant::now();
        let mut a = Arbiter::new(Transport::Video, GRACE);
        assert!(!a.queue_seek(Duration::from_secs(5)));

        a.request(Transport::Audio, t0);
        assert!(a.queue_seek(Duration::from_secs(10)));
        assert!(a.queue_seek(Duration::from_secs(30)));

        let done = a.acknowledge_stop(Transport::Video).unwrap();
        assert_eq!(done.seek, Some(Duration::from_secs(30)));

        a.request(Transport::Video, t0);
        let done = a.acknowledge_stop(Transport::Audio).unwrap();
        assert_eq!(done.seek, None);
    }

    #[test]
    fn settle_abandons_a_handoff() {
        let t0 = Instant::now();
        let mut a = Arbiter::new(Transport::Audio, GRACE);
        a.request(Transport::Video, t0);
        a.queue_seek(Duration::from_secs(3));
        a.settle(Transport::Audio);

        assert_eq!(a.state(), ArbiterState::AudioOwned);
        assert_eq!(a.poll(t0 + GRACE * 4), None);
        assert_eq!(a.acknowledge_stop(Transport::Audio), None);
    }
}
