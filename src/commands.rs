//! Handlers for inbound requests arriving over the websocket.

use log::error;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::lyrics::{LookupOutcome, LyricsLookup};
use crate::playback::PlaybackSource;
use crate::types::TimedTranscript;

pub const STATUS_OK: u16 = 200;
pub const STATUS_NOT_FOUND: u16 = 404;
pub const STATUS_INTERNAL_ERROR: u16 = 500;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LyricsRequest {
    #[serde(default)]
    pub request_id: Option<String>,
    pub track_name: String,
    pub artist_name: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LyricsResponse {
    pub request_id: Option<String>,
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parsed: Option<TimedTranscript>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub async fn lookup_lyrics(lookup: &dyn LyricsLookup, request: LyricsRequest) -> LyricsResponse {
    let request_id = request.request_id;

    match lookup
        .lookup(&request.track_name, &request.artist_name)
        .await
    {
        Ok(LookupOutcome::Found(transcript)) => LyricsResponse {
            request_id,
            status: STATUS_OK,
            parsed: Some(transcript),
            error: None,
        },
        Ok(LookupOutcome::NotFound) => LyricsResponse {
            request_id,
            status: STATUS_NOT_FOUND,
            parsed: None,
            error: Some("Lyrics not found".to_string()),
        },
        Err(e) => {
            error!("Lyrics request failed: {}", e);
            LyricsResponse {
                request_id,
                status: STATUS_INTERNAL_ERROR,
                parsed: None,
                error: Some("Internal Server Error".to_string()),
            }
        }
    }
}

/// `{}` when nothing is playing or the source is unavailable, the track
/// otherwise.
pub async fn current_track(source: &dyn PlaybackSource) -> Value {
    match source.current().await {
        Some(track) => serde_json::to_value(&track).unwrap_or_else(|e| {
            error!("Failed to serialize current track: {}", e);
            Value::Object(Default::default())
        }),
        None => Value::Object(Default::default()),
    }
}
