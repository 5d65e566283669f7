use jieba_rs::Jieba;
use once_cell::sync::Lazy;
use pinyin::ToPinyin;
use std::collections::HashMap;

use super::Transliterator;
use crate::error::RomanizeError;

/// Word readings for polyphonic characters whose per-character default is
/// wrong in that word.
static PHRASE_READINGS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    [
        ("银行", "yín háng"),
        ("行长", "háng zhǎng"),
        ("行业", "háng yè"),
        ("重庆", "chóng qìng"),
        ("重新", "chóng xīn"),
        ("重复", "chóng fù"),
        ("重来", "chóng lái"),
        ("重逢", "chóng féng"),
        ("重叠", "chóng dié"),
        ("重生", "chóng shēng"),
        ("重温", "chóng wēn"),
        ("长大", "zhǎng dà"),
        ("成长", "chéng zhǎng"),
        ("长发", "cháng fà"),
        ("长久", "cháng jiǔ"),
        ("漫长", "màn cháng"),
        ("长城", "cháng chéng"),
        ("长江", "cháng jiāng"),
        ("音乐", "yīn yuè"),
        ("乐队", "yuè duì"),
        ("快乐", "kuài lè"),
        ("欢乐", "huān lè"),
        ("觉得", "jué de"),
        ("感觉", "gǎn jué"),
        ("睡觉", "shuì jiào"),
        ("还是", "hái shì"),
        ("还有", "hái yǒu"),
        ("归还", "guī huán"),
        ("爱好", "ài hào"),
        ("记得", "jì de"),
        ("懂得", "dǒng de"),
        ("值得", "zhí de"),
        ("了解", "liǎo jiě"),
        ("为了", "wèi le"),
        ("因为", "yīn wèi"),
        ("以为", "yǐ wéi"),
        ("成为", "chéng wéi"),
        ("认为", "rèn wéi"),
        ("地方", "dì fang"),
        ("相信", "xiāng xìn"),
        ("照相", "zhào xiàng"),
        ("真相", "zhēn xiàng"),
        ("背包", "bēi bāo"),
        ("当然", "dāng rán"),
        ("上当", "shàng dàng"),
        ("答应", "dā ying"),
        ("差不多", "chà bu duō"),
        ("出差", "chū chāi"),
        ("空白", "kòng bái"),
        ("难过", "nán guò"),
        ("灾难", "zāi nàn"),
        ("模样", "mú yàng"),
        ("模糊", "mó hu"),
        ("单调", "dān diào"),
        ("歌曲", "gē qǔ"),
        ("暖和", "nuǎn huo"),
        ("假装", "jiǎ zhuāng"),
        ("角色", "jué sè"),
        ("流血", "liú xuè"),
        ("到处", "dào chù"),
        ("种子", "zhǒng zi"),
        ("散步", "sàn bù"),
        ("着急", "zháo jí"),
        ("着迷", "zháo mí"),
        ("睡着", "shuì zháo"),
        ("执着", "zhí zhuó"),
        ("便宜", "pián yi"),
    ]
    .into_iter()
    .collect()
});

static LONGEST_PHRASE: Lazy<usize> = Lazy::new(|| {
    PHRASE_READINGS
        .keys()
        .map(|phrase| phrase.chars().count())
        .max()
        .unwrap_or(0)
});

/// Tone-marked pinyin. Text is segmented into words with jieba first; inside
/// each word the longest known phrase reading wins, and the remaining Han
/// characters take their default reading. Syllables and any non-Han runs are
/// joined with single spaces.
pub struct PinyinTransliterator {
    jieba: Jieba,
}

impl PinyinTransliterator {
    /// Loads the bundled jieba dictionary, which takes a moment.
    pub fn new() -> Self {
        Self {
            jieba: Jieba::new(),
        }
    }
}

impl Default for PinyinTransliterator {
    fn default() -> Self {
        Self::new()
    }
}

impl Transliterator for PinyinTransliterator {
    fn transliterate(&self, text: &str) -> Result<String, RomanizeError> {
        let mut syllables: Vec<String> = Vec::new();

        for word in self.jieba.cut(text, false) {
            if word.trim().is_empty() {
                continue;
            }
            read_word(word, &mut syllables);
        }

        if syllables.is_empty() {
            return Err(RomanizeError::Conversion(format!(
                "no syllables produced for '{}'",
                text
            )));
        }

        Ok(syllables.join(" "))
    }
}

/// Phrases never span a jieba word boundary.
fn read_word(word: &str, syllables: &mut Vec<String>) {
    let chars: Vec<char> = word.chars().collect();
    let mut verbatim = String::new();
    let mut i = 0;

    while i < chars.len() {
        if let Some((len, reading)) = phrase_at(&chars[i..]) {
            flush_verbatim(&mut verbatim, syllables);
            syllables.extend(reading.split(' ').map(str::to_string));
            i += len;
            continue;
        }

        let ch = chars[i];
        match ch.to_pinyin() {
            Some(pinyin) => {
                flush_verbatim(&mut verbatim, syllables);
                syllables.push(pinyin.with_tone().to_string());
            }
            None => verbatim.push(ch),
        }
        i += 1;
    }

    flush_verbatim(&mut verbatim, syllables);
}

fn phrase_at(chars: &[char]) -> Option<(usize, &'static str)> {
    let longest = (*LONGEST_PHRASE).min(chars.len());
    (2..=longest).rev().find_map(|len| {
        let candidate: String = chars[..len].iter().collect();
        PHRASE_READINGS
            .get(candidate.as_str())
            .map(|reading| (len, *reading))
    })
}

fn flush_verbatim(verbatim: &mut String, syllables: &mut Vec<String>) {
    let trimmed = verbatim.trim();
    if !trimmed.is_empty() {
        syllables.push(trimmed.to_string());
    }
    verbatim.clear();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_to_spaced_tone_marks() {
        let engine = PinyinTransliterator::new();
        assert_eq!(engine.transliterate("你好").unwrap(), "nǐ hǎo");
    }

    #[test]
    fn keeps_latin_words_between_syllables() {
        let engine = PinyinTransliterator::new();
        assert_eq!(engine.transliterate("你好 world").unwrap(), "nǐ hǎo world");
    }

    #[test]
    fn polyphones_take_the_word_reading() {
        let engine = PinyinTransliterator::new();
        assert_eq!(engine.transliterate("银行").unwrap(), "yín háng");
        assert_eq!(
            engine.transliterate("银行行长").unwrap(),
            "yín háng háng zhǎng"
        );
        assert_eq!(
            engine.transliterate("重庆重新").unwrap(),
            "chóng qìng chóng xīn"
        );
    }

    #[test]
    fn word_reading_differs_from_the_character_default() {
        let flat: Vec<String> = "银行"
            .to_pinyin()
            .flatten()
            .map(|p| p.with_tone().to_string())
            .collect();
        let engine = PinyinTransliterator::new();
        assert_ne!(engine.transliterate("银行").unwrap(), flat.join(" "));
    }

    #[test]
    fn phrase_lookup_prefers_the_longest_match() {
        let chars: Vec<char> = "差不多了".chars().collect();
        assert_eq!(phrase_at(&chars), Some((3, "chà bu duō")));
        assert_eq!(phrase_at(&['你', '好']), None);
    }
}
