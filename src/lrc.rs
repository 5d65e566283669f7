//! Line-synced (LRC) transcript parsing.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::romanization::Romanizer;
use crate::types::{TimedLine, TimedTranscript};

static TIMESTAMPED_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[(\d{2}):(\d{2})\.(\d{2,3})\](.*)").expect("LRC line pattern is valid")
});

/// Parses `raw` into a sorted transcript, romanizing every kept line.
pub fn parse_lrc(raw: &str, romanizer: &Romanizer) -> TimedTranscript {
    parse_lrc_with(raw, |text| romanizer.romanize(text))
}

/// Lines without a `[mm:ss.xx]` / `[mm:ss.xxx]` stamp and lines whose text is
/// blank are dropped. The first stamp on a line wins; anything before it (a
/// BOM, indentation) is ignored. `romanize` runs once per kept line, in
/// transcript order, before the final stable sort by offset.
pub fn parse_lrc_with<F>(raw: &str, mut romanize: F) -> TimedTranscript
where
    F: FnMut(&str) -> String,
{
    let mut lines = Vec::new();

    for line in raw.lines() {
        let Some((offset_ms, text)) = parse_line(line) else {
            continue;
        };

        lines.push(TimedLine {
            offset_ms,
            text: romanize(text),
        });
    }

    TimedTranscript::from_unsorted(lines)
}

fn parse_line(line: &str) -> Option<(u64, &str)> {
    let caps = TIMESTAMPED_LINE.captures(line)?;

    let minutes: u64 = caps.get(1)?.as_str().parse().ok()?;
    let seconds: u64 = caps.get(2)?.as_str().parse().ok()?;
    let fraction = caps.get(3)?.as_str();
    let text = caps.get(4)?.as_str().trim();

    if text.is_empty() {
        return None;
    }

    Some((timestamp_ms(minutes, seconds, fraction)?, text))
}

/// Two fraction digits are centiseconds, three are milliseconds.
fn timestamp_ms(minutes: u64, seconds: u64, fraction: &str) -> Option<u64> {
    let value: u64 = fraction.parse().ok()?;
    let fraction_ms = if fraction.len() == 2 { value * 10 } else { value };
    Some((minutes * 60 + seconds) * 1000 + fraction_ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> TimedTranscript {
        parse_lrc_with(raw, |text| text.to_string())
    }

    fn offsets(transcript: &TimedTranscript) -> Vec<u64> {
        transcript.lines().iter().map(|l| l.offset_ms).collect()
    }

    #[test]
    fn two_digit_fraction_is_centiseconds() {
        assert_eq!(offsets(&parse("[01:02.50]line")), vec![62500]);
        assert_eq!(offsets(&parse("[00:00.00]line")), vec![0]);
        assert_eq!(offsets(&parse("[00:00.05]line")), vec![50]);
    }

    #[test]
    fn three_digit_fraction_is_milliseconds() {
        assert_eq!(offsets(&parse("[00:10.123]line")), vec![10123]);
        assert_eq!(offsets(&parse("[02:00.050]line")), vec![120050]);
    }

    #[test]
    fn output_is_sorted_regardless_of_input_order() {
        let transcript = parse("[00:05.00]B\n[00:01.00]A");
        let texts: Vec<&str> = transcript.lines().iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["A", "B"]);
    }

    #[test]
    fn blank_payloads_are_dropped() {
        let transcript = parse("[00:00.00]   \n[00:01.00]\n[00:02.00] kept ");
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript.lines()[0].text, "kept");
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let raw = "\
[ti:Some Title]
[ar:Some Artist]
no timestamp at all
[0:01.00]one-digit minutes
[00:1a.00]letters in seconds
[00:01.5]one-digit fraction
[00:01.5000]four-digit fraction
[00:03.00]survivor";

        let transcript = parse(raw);
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript.lines()[0].offset_ms, 3000);
        assert_eq!(transcript.lines()[0].text, "survivor");
    }

    #[test]
    fn tolerates_bom_and_indentation_before_the_stamp() {
        let transcript = parse("\u{FEFF}[00:01.00]first\n  [00:02.00]second\n[00:03.00]third");
        let texts: Vec<&str> = transcript.lines().iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second", "third"]);
        assert_eq!(offsets(&transcript), vec![1000, 2000, 3000]);
    }

    #[test]
    fn handles_crlf_and_empty_input() {
        assert!(parse("").is_empty());

        let transcript = parse("[00:01.00]first\r\n[00:02.00]second\r\n");
        assert_eq!(offsets(&transcript), vec![1000, 2000]);
        assert_eq!(transcript.lines()[1].text, "second");
    }

    #[test]
    fn romanizes_each_kept_line_in_transcript_order() {
        let mut seen = Vec::new();
        let transcript = parse_lrc_with("[00:05.00]b\n[00:00.00] \n[00:01.00]a", |text| {
            seen.push(text.to_string());
            text.to_uppercase()
        });

        assert_eq!(seen, vec!["b", "a"]);
        let texts: Vec<&str> = transcript.lines().iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["A", "B"]);
    }

    #[test]
    fn uses_the_romanizer_for_line_text() {
        let romanizer = Romanizer::new();
        let transcript = parse_lrc("[00:01.00]안녕\n[00:02.00]hello", &romanizer);
        assert_eq!(transcript.lines()[0].text, "annyeong");
        assert_eq!(transcript.lines()[1].text, "hello");
    }
}
