//! Client-side sync loop: polled playback snapshots, a continuously
//! extrapolated position, and line activation events.
//!
//! Two periodic tasks run side by side. The poll task asks the playback
//! source for a snapshot every few seconds and publishes it through a
//! `watch` channel; it also kicks off a lyric lookup whenever the track
//! changes. The frame task ticks many times per second, reads whatever was
//! published last, advances the position and decides which line is active.
//! The frame task never awaits the poll task or the network.

use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::lyrics::{LookupOutcome, LyricsLookup};
use crate::playback::PlaybackSource;
use crate::types::{CurrentTrack, PlaybackSnapshot, TimedTranscript, TrackLyrics};

mod selector;
mod tracker;

pub use selector::{active_index, ActiveLineSelector, LineActivated};
pub use tracker::{PositionTracker, TrackerState};

#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub poll_interval: Duration,
    pub frame_interval: Duration,
    pub drift_tolerance: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            frame_interval: Duration::from_millis(33),
            drift_tolerance: Duration::from_millis(1000),
        }
    }
}

#[derive(Debug, Clone)]
pub enum SyncEvent {
    TrackChanged(CurrentTrack),
    LyricsLoaded(TrackLyrics),
    LyricsMissing { track_id: String },
    LineActivated { track_id: String, line: LineActivated },
}

pub struct SyncEngine {
    source: Arc<dyn PlaybackSource>,
    lookup: Arc<dyn LyricsLookup>,
    config: SyncConfig,
}

impl SyncEngine {
    pub fn new(
        source: Arc<dyn PlaybackSource>,
        lookup: Arc<dyn LyricsLookup>,
        config: SyncConfig,
    ) -> Self {
        Self {
            source,
            lookup,
            config,
        }
    }

    /// Starts the poll and frame tasks. Both stop when `cancel` fires.
    pub fn spawn(
        self,
        events: mpsc::UnboundedSender<SyncEvent>,
        cancel: CancellationToken,
    ) -> (JoinHandle<()>, JoinHandle<()>) {
        let (snapshot_tx, snapshot_rx) = watch::channel(None);
        let (lyrics_tx, lyrics_rx) = mpsc::unbounded_channel();

        let poller = PollTask {
            source: self.source,
            lookup: self.lookup,
            interval: self.config.poll_interval,
            snapshots: snapshot_tx,
            lyrics: lyrics_tx,
            events: events.clone(),
        };
        let poll_handle = tokio::spawn(poller.run(cancel.clone()));

        let frame_handle = tokio::spawn(run_frames(
            self.config,
            snapshot_rx,
            lyrics_rx,
            events,
            cancel,
        ));

        (poll_handle, frame_handle)
    }
}

struct PollTask {
    source: Arc<dyn PlaybackSource>,
    lookup: Arc<dyn LyricsLookup>,
    interval: Duration,
    snapshots: watch::Sender<Option<PlaybackSnapshot>>,
    lyrics: mpsc::UnboundedSender<TrackLyrics>,
    events: mpsc::UnboundedSender<SyncEvent>,
}

impl PollTask {
    async fn run(self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut current_track_id: Option<String> = None;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            if self.events.is_closed() {
                warn!("Sync event receiver dropped; stopping poll task");
                break;
            }

            let polled = tokio::select! {
                _ = cancel.cancelled() => break,
                polled = self.source.current() => polled,
            };

            let Some(track) = polled else {
                self.snapshots.send_replace(None);
                continue;
            };

            let changed = current_track_id.as_deref() != Some(track.id.as_str());

            // Publish before fetching so the frame task already knows the
            // new track id by the time its lyrics show up.
            self.snapshots
                .send_replace(Some(track.snapshot(Instant::now())));

            if changed {
                info!("Track changed: '{}' by '{}'", track.name, track.artist);
                current_track_id = Some(track.id.clone());
                if self.events.send(SyncEvent::TrackChanged(track.clone())).is_err() {
                    warn!("Sync event receiver dropped; stopping poll task");
                    break;
                }
                self.spawn_lyrics_fetch(track);
            }
        }

        debug!("Poll task stopped");
    }

    fn spawn_lyrics_fetch(&self, track: CurrentTrack) {
        let lookup = Arc::clone(&self.lookup);
        let lyrics = self.lyrics.clone();
        let events = self.events.clone();

        tokio::spawn(async move {
            if events.is_closed() {
                return;
            }

            match lookup.lookup(&track.name, &track.artist).await {
                Ok(LookupOutcome::Found(transcript)) => {
                    let loaded = TrackLyrics {
                        track_id: track.id,
                        transcript: Arc::new(transcript),
                    };
                    let _ = events.send(SyncEvent::LyricsLoaded(loaded.clone()));
                    let _ = lyrics.send(loaded);
                }
                Ok(LookupOutcome::NotFound) => {
                    let _ = events.send(SyncEvent::LyricsMissing { track_id: track.id });
                }
                Err(e) => {
                    error!("Lyric lookup for '{}' failed: {}", track.name, e);
                    let _ = events.send(SyncEvent::LyricsMissing { track_id: track.id });
                }
            }
        });
    }
}

async fn run_frames(
    config: SyncConfig,
    mut snapshots: watch::Receiver<Option<PlaybackSnapshot>>,
    mut lyrics: mpsc::UnboundedReceiver<TrackLyrics>,
    events: mpsc::UnboundedSender<SyncEvent>,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(config.frame_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut frame = FrameState::new(config.drift_tolerance);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        if events.is_closed() {
            warn!("Sync event receiver dropped; stopping frame task");
            break;
        }

        let now = Instant::now();

        if snapshots.has_changed().unwrap_or(false) {
            let snapshot = snapshots.borrow_and_update().clone();
            frame.apply_snapshot(snapshot.as_ref(), now);
        }

        while let Ok(loaded) = lyrics.try_recv() {
            frame.apply_lyrics(loaded);
        }

        if let Some(event) = frame.tick(now) {
            if events.send(event).is_err() {
                warn!("Sync event receiver dropped; stopping frame task");
                break;
            }
        }
    }

    debug!("Frame task stopped");
}

/// Everything the frame task owns: position, transcript and highlight.
struct FrameState {
    tracker: PositionTracker,
    selector: ActiveLineSelector,
    track_id: Option<String>,
    transcript: Arc<TimedTranscript>,
}

impl FrameState {
    fn new(drift_tolerance: Duration) -> Self {
        Self {
            tracker: PositionTracker::new(drift_tolerance),
            selector: ActiveLineSelector::new(),
            track_id: None,
            transcript: Arc::new(TimedTranscript::default()),
        }
    }

    fn apply_snapshot(&mut self, snapshot: Option<&PlaybackSnapshot>, now: Instant) {
        let Some(snapshot) = snapshot else {
            self.tracker.clear();
            return;
        };

        if self.track_id.as_deref() != Some(snapshot.track_id.as_str()) {
            // The old transcript is dropped right away, not kept until the
            // new one arrives.
            self.track_id = Some(snapshot.track_id.clone());
            self.transcript = Arc::new(TimedTranscript::default());
            self.selector.reset();
        }

        if self.tracker.observe(snapshot, now) {
            debug!("Re-anchored position to {}ms", snapshot.position_ms);
        }
    }

    fn apply_lyrics(&mut self, loaded: TrackLyrics) {
        if self.track_id.as_deref() != Some(loaded.track_id.as_str()) {
            debug!("Discarding lyrics for stale track '{}'", loaded.track_id);
            return;
        }

        self.transcript = loaded.transcript;
        self.selector.reset();
    }

    fn tick(&mut self, now: Instant) -> Option<SyncEvent> {
        let position_ms = self.tracker.tick(now);
        if !self.tracker.is_advancing() {
            return None;
        }

        let line = self.selector.update(&self.transcript, position_ms)?;
        Some(SyncEvent::LineActivated {
            track_id: self.track_id.clone().unwrap_or_default(),
            line,
        })
    }
}
