use futures_util::future::BoxFuture;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::time::Instant;

use super::PlaybackSource;
use crate::types::CurrentTrack;

/// Playback report pushed by the browser extension over the websocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackUpdate {
    pub title: String,
    pub artist: String,
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub timestamp: u64,
    pub is_playing: bool,
    #[serde(rename = "currentTime")]
    pub current_time: Option<f64>, // seconds
    pub duration: Option<f64>,
}

impl TrackUpdate {
    /// Title and artist identify a track; extension page URLs are not stable.
    fn track_id(&self) -> String {
        format!("{} - {}", self.artist.trim(), self.title.trim())
    }
}

struct Reported {
    track: CurrentTrack,
    received_at: Instant,
}

/// Keeps the latest extension report and extrapolates its position while
/// playing.
#[derive(Default)]
pub struct ExtensionPlayback {
    latest: Mutex<Option<Reported>>,
}

impl ExtensionPlayback {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn apply(&self, message_type: &str, update: TrackUpdate) {
        let mut latest = self.latest.lock().await;

        if message_type == "TRACK_STOPPED" {
            info!("Extension reported playback stopped");
            *latest = None;
            return;
        }

        // Updates without a position keep the last known one for the same track.
        let track_id = update.track_id();
        let progress_ms = match update.current_time {
            Some(seconds) => (seconds.max(0.0) * 1000.0).round() as u64,
            None => latest
                .as_ref()
                .filter(|reported| reported.track.id == track_id)
                .map(|reported| reported.track.progress_ms)
                .unwrap_or(0),
        };

        debug!(
            "{} from extension: '{}' at {}ms (playing: {})",
            message_type, track_id, progress_ms, update.is_playing
        );

        *latest = Some(Reported {
            track: CurrentTrack {
                id: track_id,
                name: update.title,
                artist: update.artist,
                album_art_url: update.thumbnail,
                progress_ms,
                is_playing: update.is_playing && message_type != "TRACK_PAUSED",
            },
            received_at: Instant::now(),
        });
    }
}

impl PlaybackSource for ExtensionPlayback {
    fn current(&self) -> BoxFuture<'_, Option<CurrentTrack>> {
        Box::pin(async move {
            let latest = self.latest.lock().await;
            let reported = latest.as_ref()?;

            let mut track = reported.track.clone();
            if track.is_playing {
                let elapsed = Instant::now().saturating_duration_since(reported.received_at);
                track.progress_ms += elapsed.as_millis() as u64;
            }
            Some(track)
        })
    }
}
