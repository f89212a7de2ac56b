//! Text cleanup applied before synthesis.
//!
//! Strips links and symbols the voice service reads out literally,
//! applies configured word replacements, and normalises comment
//! punctuation so sentences don't blend together when spoken.

use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

use crate::config::TextConfig;

static URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"((http|https)://)?[a-zA-Z0-9./?:@\-_=#]+\.([a-zA-Z]){2,6}([a-zA-Z0-9.&/?:@\-_=#])*")
        .expect("url pattern is valid")
});

// Apostrophes are kept unless they hug whitespace.
static SYMBOL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\s['’|]|['’|]\s|[\^_~@!&;#:\-%—“”‘"*/{}\[\]()\\|<>=+]"#)
        .expect("symbol pattern is valid")
});

static AI_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bAI\b").expect("AI pattern is valid"));
static AGI_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bAGI\b").expect("AGI pattern is valid"));
static THREAD_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s-]").expect("thread id pattern is valid"));

/// Sanitizer configured from the `text` and `tts` config sections.
pub struct TextCleaner {
    replacements: Vec<(Regex, String)>,
    no_emojis: bool,
}

impl TextCleaner {
    pub fn new(config: &TextConfig, no_emojis: bool) -> Self {
        let replacements = config
            .replacements
            .iter()
            .filter_map(|(from, to)| {
                let pattern = format!(r"(?i)\b{}\b", regex::escape(from));
                match Regex::new(&pattern) {
                    Ok(re) => Some((re, to.clone())),
                    Err(e) => {
                        warn!("Ignoring replacement for '{from}': {e}");
                        None
                    }
                }
            })
            .collect();

        Self {
            replacements,
            no_emojis,
        }
    }

    /// Remove links, symbols and (optionally) emoji, apply replacements,
    /// and collapse whitespace.
    pub fn sanitize(&self, text: &str) -> String {
        let result = URL_RE.replace_all(text, " ");
        let mut result = SYMBOL_RE.replace_all(&result, " ").into_owned();

        if self.no_emojis {
            result = strip_emoji(&result);
        }

        for (re, to) in &self.replacements {
            result = re.replace_all(&result, to.as_str()).into_owned();
        }

        collapse_whitespace(&result)
    }
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn strip_emoji(text: &str) -> String {
    text.chars()
        .filter(|&c| {
            !matches!(c as u32,
                0x1F000..=0x1FAFF | 0x2600..=0x27BF | 0x2300..=0x23FF | 0xFE0F | 0x200D)
        })
        .collect()
}

/// Terminate paragraphs with periods so the voice pauses between them.
///
/// Links are dropped, newlines become sentence breaks, and acronyms the
/// voice would otherwise read as words are dotted.
pub fn add_periods(text: &str) -> String {
    let text = URL_RE.replace_all(text, " ");
    let text = text.replace('\n', ". ");
    let text = AI_RE.replace_all(&text, "A.I");
    let mut text = AGI_RE.replace_all(&text, "A.G.I").into_owned();

    if !text.ends_with('.') {
        text.push('.');
    }

    text.replace(". . .", ".")
        .replace(".. . ", ".")
        .replace(". . ", ".")
        .replace(".\".", "\".")
}

/// Directory-safe form of a thread id.
pub fn sanitize_thread_id(id: &str) -> String {
    THREAD_ID_RE.replace_all(id, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cleaner() -> TextCleaner {
        TextCleaner::new(&TextConfig::default(), false)
    }

    #[test]
    fn sanitize_drops_links_and_symbols() {
        let out = cleaner().sanitize("Look at https://example.com/page now! (really) #wow");
        assert_eq!(out, "Look at now really wow");
    }

    #[test]
    fn sanitize_keeps_inner_apostrophes() {
        assert_eq!(cleaner().sanitize("I don't  know 'why' today"), "I don't know why today");
    }

    #[test]
    fn replacements_match_whole_words_case_insensitively() {
        let config = TextConfig {
            replacements: vec![("aita".into(), "am I the jerk".into())],
        };
        let cleaner = TextCleaner::new(&config, false);
        assert_eq!(cleaner.sanitize("AITA for this? aitas"), "am I the jerk for this? aitas");
    }

    #[test]
    fn emoji_are_stripped_when_enabled() {
        let cleaner = TextCleaner::new(&TextConfig::default(), true);
        assert_eq!(cleaner.sanitize("great 🎉 news ☀"), "great news");
    }

    #[test]
    fn add_periods_terminates_paragraphs() {
        assert_eq!(add_periods("first line\nsecond line"), "first line. second line.");
        assert_eq!(add_periods("already done."), "already done.");
    }

    #[test]
    fn add_periods_dots_acronyms() {
        assert_eq!(add_periods("AI and AGI"), "A.I and A.G.I.");
    }

    #[test]
    fn add_periods_collapses_blank_paragraphs() {
        assert_eq!(add_periods("one.\n\ntwo"), "one.two.");
    }

    #[test]
    fn thread_id_is_directory_safe() {
        assert_eq!(sanitize_thread_id("t3_ab/c.d?e"), "t3_abcde");
    }
}
