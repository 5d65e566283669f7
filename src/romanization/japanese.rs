use log::{info, warn};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use super::{guarded, Transliterator};
use crate::error::RomanizeError;

const WARMUP_TEXT: &str = "日本語のテスト";

/// Lifecycle of the dictionary-backed analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalyzerState {
    Uninitialized,
    Ready,
    Failed,
}

impl AnalyzerState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => AnalyzerState::Ready,
            2 => AnalyzerState::Failed,
            _ => AnalyzerState::Uninitialized,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            AnalyzerState::Uninitialized => 0,
            AnalyzerState::Ready => 1,
            AnalyzerState::Failed => 2,
        }
    }
}

/// Japanese romanizer gated on a one-time background warm-up.
///
/// Conversions requested before [`JapaneseAnalyzer::initialize`] settles are
/// refused with [`RomanizeError::NotReady`] instead of waiting, and a failed
/// warm-up leaves the analyzer permanently in [`AnalyzerState::Failed`].
pub struct JapaneseAnalyzer {
    engine: Arc<dyn Transliterator>,
    state: AtomicU8,
}

impl JapaneseAnalyzer {
    pub fn new(engine: Arc<dyn Transliterator>) -> Self {
        Self {
            engine,
            state: AtomicU8::new(AnalyzerState::Uninitialized.as_u8()),
        }
    }

    pub fn kakasi() -> Self {
        Self::new(Arc::new(KakasiTransliterator))
    }

    pub fn state(&self) -> AnalyzerState {
        AnalyzerState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_ready(&self) -> bool {
        self.state() == AnalyzerState::Ready
    }

    /// Loads the dictionary by running one conversion on the blocking pool.
    /// Calling it again after it settled just returns the settled state.
    pub async fn initialize(&self) -> AnalyzerState {
        let current = self.state();
        if current != AnalyzerState::Uninitialized {
            return current;
        }

        let engine = Arc::clone(&self.engine);
        let warmed = tokio::task::spawn_blocking(move || guarded(engine.as_ref(), WARMUP_TEXT)).await;

        let next = match warmed {
            Ok(Ok(output)) if !output.trim().is_empty() => AnalyzerState::Ready,
            Ok(Ok(_)) => {
                warn!("Japanese analyzer warm-up produced no output");
                AnalyzerState::Failed
            }
            Ok(Err(e)) => {
                warn!("Japanese analyzer warm-up failed: {}", e);
                AnalyzerState::Failed
            }
            Err(e) => {
                warn!("Japanese analyzer warm-up task died: {}", e);
                AnalyzerState::Failed
            }
        };

        self.state.store(next.as_u8(), Ordering::Release);
        info!("Japanese analyzer settled: {:?}", next);
        next
    }

    pub(crate) fn convert(&self, text: &str) -> Result<String, RomanizeError> {
        match self.state() {
            AnalyzerState::Uninitialized => Err(RomanizeError::NotReady),
            AnalyzerState::Failed => Err(RomanizeError::AnalyzerFailed),
            AnalyzerState::Ready => guarded(self.engine.as_ref(), text),
        }
    }
}

/// Hepburn romaji through kakasi's bundled kanji dictionary.
#[derive(Debug, Default, Clone, Copy)]
pub struct KakasiTransliterator;

impl Transliterator for KakasiTransliterator {
    fn transliterate(&self, text: &str) -> Result<String, RomanizeError> {
        let romaji = kakasi::convert(text).romaji;
        Ok(romaji.split_whitespace().collect::<Vec<_>>().join(" "))
    }
}
