use std::time::Duration;
use tokio::time::Instant;

use crate::types::PlaybackSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerState {
    Idle,
    Advancing,
}

/// Playback position extrapolated between polled snapshots.
///
/// While advancing, every tick adds the wall-clock time since the previous
/// reference point and then moves the reference point to "now". Snapshots
/// only overwrite the estimate when it has drifted by more than the
/// tolerance, so ordinary polling jitter never makes the position jump.
#[derive(Debug, Clone)]
pub struct PositionTracker {
    estimated: Duration,
    state: TrackerState,
    last_observed: Option<Instant>,
    drift_tolerance: Duration,
}

impl PositionTracker {
    pub fn new(drift_tolerance: Duration) -> Self {
        Self {
            estimated: Duration::ZERO,
            state: TrackerState::Idle,
            last_observed: None,
            drift_tolerance,
        }
    }

    pub fn estimated_ms(&self) -> u64 {
        self.estimated.as_millis() as u64
    }

    pub fn state(&self) -> TrackerState {
        self.state
    }

    pub fn is_advancing(&self) -> bool {
        self.state == TrackerState::Advancing
    }

    /// Applies a fresh snapshot. Returns `true` when the estimate was
    /// re-anchored to the snapshot position.
    pub fn observe(&mut self, snapshot: &PlaybackSnapshot, now: Instant) -> bool {
        let observed = Duration::from_millis(snapshot.position_ms);
        let drift = if observed > self.estimated {
            observed - self.estimated
        } else {
            self.estimated - observed
        };

        let reanchored = drift > self.drift_tolerance;
        if reanchored {
            self.estimated = observed;
        }

        self.state = if snapshot.is_playing {
            TrackerState::Advancing
        } else {
            TrackerState::Idle
        };
        self.last_observed = Some(now);

        reanchored
    }

    /// Advances the estimate to `now` and returns it in milliseconds.
    pub fn tick(&mut self, now: Instant) -> u64 {
        if self.state == TrackerState::Advancing {
            if let Some(last) = self.last_observed {
                self.estimated += now.saturating_duration_since(last);
            }
            self.last_observed = Some(now);
        }
        self.estimated_ms()
    }

    /// No active track: back to zero and idle.
    pub fn clear(&mut self) {
        self.estimated = Duration::ZERO;
        self.state = TrackerState::Idle;
        self.last_observed = None;
    }
}
