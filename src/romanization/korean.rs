//! Revised Romanization of Korean, one syllable block at a time.

use super::Transliterator;
use crate::error::RomanizeError;

const SYLLABLE_BASE: u32 = 0xAC00;
const SYLLABLE_LAST: u32 = 0xD7A3;
const MEDIAL_COUNT: u32 = 21;
const FINAL_COUNT: u32 = 28;

const INITIALS: [&str; 19] = [
    "g", "kk", "n", "d", "tt", "r", "m", "b", "pp", "s", "ss", "", "j", "jj", "ch", "k", "t",
    "p", "h",
];

const MEDIALS: [&str; 21] = [
    "a", "ae", "ya", "yae", "eo", "e", "yeo", "ye", "o", "wa", "wae", "oe", "yo", "u", "wo",
    "we", "wi", "yu", "eu", "ui", "i",
];

// Final consonants use their representative (unreleased) sound.
const FINALS: [&str; 28] = [
    "", "k", "k", "k", "n", "n", "n", "t", "l", "k", "m", "l", "l", "l", "p", "l", "m", "p",
    "p", "t", "t", "ng", "t", "t", "k", "t", "p", "t",
];

/// Syllables inside a word are concatenated (`안녕` -> `annyeong`); anything
/// that is not a precomposed syllable passes through untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct HangulTransliterator;

impl Transliterator for HangulTransliterator {
    fn transliterate(&self, text: &str) -> Result<String, RomanizeError> {
        let mut out = String::with_capacity(text.len());

        for ch in text.chars() {
            match decompose(ch) {
                Some((initial, medial, final_)) => {
                    out.push_str(INITIALS[initial]);
                    out.push_str(MEDIALS[medial]);
                    out.push_str(FINALS[final_]);
                }
                None => out.push(ch),
            }
        }

        Ok(out)
    }
}

fn decompose(ch: char) -> Option<(usize, usize, usize)> {
    let code = ch as u32;
    if !(SYLLABLE_BASE..=SYLLABLE_LAST).contains(&code) {
        return None;
    }

    let index = code - SYLLABLE_BASE;
    let initial = index / (MEDIAL_COUNT * FINAL_COUNT);
    let medial = (index % (MEDIAL_COUNT * FINAL_COUNT)) / FINAL_COUNT;
    let final_ = index % FINAL_COUNT;

    Some((initial as usize, medial as usize, final_ as usize))
}
