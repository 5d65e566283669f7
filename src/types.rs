use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::time::Instant;

/// One lyric line, already romanized, positioned on the track timeline.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TimedLine {
    pub offset_ms: u64,
    pub text: String,
}

/// Lines of a single track, sorted by `offset_ms` (ties keep transcript order).
///
/// Built once per track and swapped out wholesale on the next track change;
/// there is no way to mutate the lines after construction.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct TimedTranscript {
    lines: Vec<TimedLine>,
}

impl TimedTranscript {
    /// Sorts `lines` by offset. The sort is stable, so equal offsets keep
    /// the order they were given in.
    pub fn from_unsorted(mut lines: Vec<TimedLine>) -> Self {
        lines.sort_by_key(|line| line.offset_ms);
        Self { lines }
    }

    pub fn lines(&self) -> &[TimedLine] {
        &self.lines
    }

    pub fn get(&self, index: usize) -> Option<&TimedLine> {
        self.lines.get(index)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Track as reported by a playback source. Doubles as the inbound
/// current-track response body.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CurrentTrack {
    pub id: String,
    pub name: String,
    pub artist: String,
    pub album_art_url: Option<String>,
    pub progress_ms: u64,
    pub is_playing: bool,
}

impl CurrentTrack {
    pub fn snapshot(&self, captured_at: Instant) -> PlaybackSnapshot {
        PlaybackSnapshot {
            track_id: self.id.clone(),
            position_ms: self.progress_ms,
            is_playing: self.is_playing,
            captured_at,
        }
    }
}

/// Ground-truth playback position observed at `captured_at`.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSnapshot {
    pub track_id: String,
    pub position_ms: u64,
    pub is_playing: bool,
    pub captured_at: Instant,
}

/// Transcript tagged with the track it was fetched for.
#[derive(Debug, Clone)]
pub struct TrackLyrics {
    pub track_id: String,
    pub transcript: Arc<TimedTranscript>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(offset_ms: u64, text: &str) -> TimedLine {
        TimedLine {
            offset_ms,
            text: text.to_string(),
        }
    }

    #[test]
    fn from_unsorted_is_stable_on_ties() {
        let transcript = TimedTranscript::from_unsorted(vec![
            line(2000, "c"),
            line(1000, "a"),
            line(2000, "d"),
            line(1000, "b"),
        ]);

        let texts: Vec<&str> = transcript.lines().iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn serializes_as_camel_case_array() {
        let transcript = TimedTranscript::from_unsorted(vec![line(62500, "hello")]);
        let json = serde_json::to_value(&transcript).unwrap();
        assert_eq!(json, serde_json::json!([{ "offsetMs": 62500, "text": "hello" }]));
    }
}
