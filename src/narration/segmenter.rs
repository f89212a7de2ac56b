//! Splits text that is too long for one synthesis call.
//!
//! Two steps:
//! 1. Scan sentence spans (each ends at a `.` or at the end of the text)
//! 2. Greedily pack consecutive spans while the trimmed chunk fits `max_chars`
//!
//! A sentence longer than `max_chars` on its own is cut at the last
//! whitespace inside the limit, or at the limit when it has none. This
//! departs from sentence-only splitting on purpose: the backend rejects
//! anything over its limit, so no segment may exceed `max_chars`.

use std::ops::Range;

/// Byte ranges of the sentences in `text`, in order. Covers the whole text.
pub fn sentence_spans(text: &str) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    let mut start = 0;

    for (i, c) in text.char_indices() {
        if c == '.' {
            spans.push(start..i + 1);
            start = i + 1;
        }
    }

    // Remainder
    if start < text.len() {
        spans.push(start..text.len());
    }

    spans
}

/// Split `text` into trimmed, non-blank chunks of at most `max_chars` characters.
pub fn segment(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut segments = Vec::new();
    let mut current: Option<Range<usize>> = None;

    for span in sentence_spans(text) {
        if char_len(text[span.clone()].trim()) > max_chars {
            if let Some(cur) = current.take() {
                push_trimmed(&mut segments, &text[cur]);
            }
            segments.extend(split_oversized(&text[span], max_chars));
            continue;
        }

        current = match current {
            None => Some(span),
            Some(cur) => {
                let merged = cur.start..span.end;
                if char_len(text[merged.clone()].trim()) <= max_chars {
                    Some(merged)
                } else {
                    push_trimmed(&mut segments, &text[cur]);
                    Some(span)
                }
            }
        };
    }

    if let Some(cur) = current {
        push_trimmed(&mut segments, &text[cur]);
    }

    segments
}

fn split_oversized(sentence: &str, max_chars: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut rest = sentence.trim();

    while char_len(rest) > max_chars {
        let cut = rest
            .char_indices()
            .nth(max_chars)
            .map_or(rest.len(), |(i, _)| i);

        let split_at = if rest[cut..].starts_with(char::is_whitespace) {
            cut
        } else {
            rest[..cut]
                .rfind(char::is_whitespace)
                .filter(|&i| i > 0)
                .unwrap_or(cut)
        };

        push_trimmed(&mut pieces, &rest[..split_at]);
        rest = rest[split_at..].trim_start();
    }

    push_trimmed(&mut pieces, rest);
    pieces
}

fn push_trimmed(out: &mut Vec<String>, piece: &str) {
    let piece = piece.trim();
    if !piece.is_empty() {
        out.push(piece.to_string());
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn squash(s: &str) -> String {
        s.chars().filter(|c| !c.is_whitespace()).collect()
    }

    #[test]
    fn short_sentence_is_returned_unchanged() {
        assert_eq!(segment("Just one sentence.", 550), vec!["Just one sentence."]);
    }

    #[test]
    fn packs_sentences_under_the_cap() {
        let text = "One two. Three four. Five six. Seven.";
        let segments = segment(text, 20);
        assert_eq!(segments, vec!["One two. Three four.", "Five six. Seven."]);
    }

    #[test]
    fn every_segment_respects_the_cap() {
        let text = "Alpha beta gamma. Delta. Epsilon zeta eta theta iota kappa lambda mu. Nu xi. \
                    Omicron pi rho sigma tau upsilon phi chi psi omega. End";
        for max in [1, 5, 12, 30, 80, 500] {
            let segments = segment(text, max);
            assert!(!segments.is_empty());
            for s in &segments {
                assert!(s.chars().count() <= max, "{s:?} exceeds {max}");
                assert!(!s.trim().is_empty());
                assert_eq!(s.trim(), s);
            }
            assert_eq!(squash(&segments.concat()), squash(text));
        }
    }

    #[test]
    fn run_on_sentence_is_cut_at_whitespace() {
        let segments = segment("aaa bbb ccc ddd.", 8);
        assert_eq!(segments, vec!["aaa bbb", "ccc ddd."]);
    }

    #[test]
    fn unbroken_run_is_hard_split() {
        let text = format!("{}.", "a".repeat(600));
        let segments = segment(&text, 550);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].len(), 550);
        assert_eq!(segments[1], format!("{}.", "a".repeat(50)));
    }

    #[test]
    fn blank_spans_are_dropped() {
        let segments = segment("  First.   .  Second.   ", 9);
        assert_eq!(segments, vec!["First.", ".", "Second."]);
        assert!(segment("   ", 10).is_empty());
        assert!(segment("", 10).is_empty());
    }

    #[test]
    fn multibyte_text_counts_characters() {
        let text = "Ünïcödé wörds hére. Ánd möre.";
        let segments = segment(text, 19);
        assert_eq!(segments, vec!["Ünïcödé wörds hére.", "Ánd möre."]);
    }

    #[test]
    fn deterministic() {
        let text = "Some. Text. That repeats. Itself a bit.";
        assert_eq!(segment(text, 12), segment(text, 12));
    }
}
