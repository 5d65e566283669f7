use serde::Serialize;

use crate::types::TimedTranscript;

/// Emitted when a different line becomes the active one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineActivated {
    pub index: usize,
    pub offset_ms: u64,
    pub text: String,
}

/// Largest index whose offset is at or before `position_ms`, or `None` when
/// the position is still ahead of the first line.
pub fn active_index(transcript: &TimedTranscript, position_ms: u64) -> Option<usize> {
    transcript
        .lines()
        .partition_point(|line| line.offset_ms <= position_ms)
        .checked_sub(1)
}

/// Tracks the highlighted line across ticks.
///
/// Once a line is active the selector never goes back to "none", even if the
/// position later falls before the first line; it only ever moves to another
/// line.
#[derive(Debug, Default, Clone)]
pub struct ActiveLineSelector {
    current: Option<usize>,
}

impl ActiveLineSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<usize> {
        self.current
    }

    /// Recomputes the active line from scratch.
    pub fn update(&mut self, transcript: &TimedTranscript, position_ms: u64) -> Option<LineActivated> {
        let index = active_index(transcript, position_ms)?;
        if self.current == Some(index) {
            return None;
        }

        let line = transcript.get(index)?;
        self.current = Some(index);
        Some(LineActivated {
            index,
            offset_ms: line.offset_ms,
            text: line.text.clone(),
        })
    }

    /// Forget the highlighted line; used when a new transcript arrives.
    pub fn reset(&mut self) {
        self.current = None;
    }
}
