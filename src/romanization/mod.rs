//! Script detection and best-effort Latin transliteration of lyric lines.

use log::debug;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::error::RomanizeError;

mod chinese;
mod japanese;
mod korean;

pub use chinese::PinyinTransliterator;
pub use japanese::{AnalyzerState, JapaneseAnalyzer, KakasiTransliterator};
pub use korean::HangulTransliterator;

/// A single transliteration strategy. Implementations may fail or even
/// panic; [`Romanizer`] contains both.
pub trait Transliterator: Send + Sync {
    fn transliterate(&self, text: &str) -> Result<String, RomanizeError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptKind {
    Kana,
    Hangul,
    Han,
    Other,
}

impl ScriptKind {
    /// Kana wins over Han, so mixed kanji/kana text is Japanese and only
    /// kana-free Han text is treated as Chinese.
    pub fn classify(text: &str) -> Self {
        if text.chars().any(is_kana) {
            ScriptKind::Kana
        } else if text.chars().any(is_hangul) {
            ScriptKind::Hangul
        } else if text.chars().any(is_han) {
            ScriptKind::Han
        } else {
            ScriptKind::Other
        }
    }
}

// Hiragana U+3040..U+309F and Katakana U+30A0..U+30FF are adjacent.
fn is_kana(ch: char) -> bool {
    matches!(ch, '\u{3040}'..='\u{30FF}')
}

fn is_hangul(ch: char) -> bool {
    matches!(ch, '\u{AC00}'..='\u{D7AF}')
}

fn is_han(ch: char) -> bool {
    matches!(ch, '\u{4E00}'..='\u{9FFF}')
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RomanizeOutcome {
    Transliterated,
    /// Latin or unclassified text, returned as-is without trying.
    Passthrough,
    /// A strategy was picked but could not run; the original text is kept.
    Degraded(RomanizeError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Romanized {
    pub text: String,
    pub script: ScriptKind,
    pub outcome: RomanizeOutcome,
}

pub struct Romanizer {
    japanese: Arc<JapaneseAnalyzer>,
    korean: Box<dyn Transliterator>,
    chinese: Box<dyn Transliterator>,
}

impl Romanizer {
    /// kakasi / Revised Romanization / pinyin. The Japanese analyzer starts
    /// uninitialized; spawn [`JapaneseAnalyzer::initialize`] on
    /// [`Romanizer::japanese`] to bring it up.
    pub fn new() -> Self {
        Self::with_engines(
            Arc::new(JapaneseAnalyzer::kakasi()),
            Box::new(HangulTransliterator),
            Box::new(PinyinTransliterator::new()),
        )
    }

    pub fn with_engines(
        japanese: Arc<JapaneseAnalyzer>,
        korean: Box<dyn Transliterator>,
        chinese: Box<dyn Transliterator>,
    ) -> Self {
        Self {
            japanese,
            korean,
            chinese,
        }
    }

    pub fn japanese(&self) -> &Arc<JapaneseAnalyzer> {
        &self.japanese
    }

    /// Never fails: any problem yields `text` unchanged.
    pub fn romanize(&self, text: &str) -> String {
        self.romanize_detailed(text).text
    }

    pub fn romanize_detailed(&self, text: &str) -> Romanized {
        if text.is_empty() {
            return Romanized {
                text: String::new(),
                script: ScriptKind::Other,
                outcome: RomanizeOutcome::Passthrough,
            };
        }

        let script = ScriptKind::classify(text);
        let converted = match script {
            ScriptKind::Kana => self.japanese.convert(text),
            ScriptKind::Hangul => guarded(self.korean.as_ref(), text),
            ScriptKind::Han => guarded(self.chinese.as_ref(), text),
            ScriptKind::Other => {
                return Romanized {
                    text: text.to_string(),
                    script,
                    outcome: RomanizeOutcome::Passthrough,
                };
            }
        };

        match converted {
            Ok(romanized) => Romanized {
                text: romanized,
                script,
                outcome: RomanizeOutcome::Transliterated,
            },
            Err(e) => {
                debug!("Keeping original {:?} text '{}': {}", script, text, e);
                Romanized {
                    text: text.to_string(),
                    script,
                    outcome: RomanizeOutcome::Degraded(e),
                }
            }
        }
    }
}

impl Default for Romanizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs a strategy, turning a panic inside it into [`RomanizeError::Panicked`].
pub(crate) fn guarded(engine: &dyn Transliterator, text: &str) -> Result<String, RomanizeError> {
    panic::catch_unwind(AssertUnwindSafe(|| engine.transliterate(text)))
        .unwrap_or(Err(RomanizeError::Panicked))
}
