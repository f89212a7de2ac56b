use crate::text::{collapse_whitespace, TextCleaner};

use super::grammar::GrammarSmoother;

/// Turns raw thread text into what the voice backend receives.
pub struct TextPreparer {
    cleaner: TextCleaner,
    smoother: Option<GrammarSmoother>,
}

impl TextPreparer {
    pub fn new(cleaner: TextCleaner, smoother: Option<GrammarSmoother>) -> Self {
        Self { cleaner, smoother }
    }

    /// Sanitize, optionally smooth, and collapse whitespace.
    ///
    /// An empty result means there is nothing to voice.
    pub async fn prepare(&self, text: &str) -> String {
        let cleaned = self.cleaner.sanitize(text);
        let smoothed = match &self.smoother {
            Some(smoother) if !cleaned.is_empty() => smoother.smooth(&cleaned).await,
            _ => cleaned,
        };
        collapse_whitespace(&smoothed)
    }
}
