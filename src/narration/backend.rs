//! Voice backend abstraction.
//!
//! A backend turns one piece of text into one audio file. Callers decide
//! what a failure means: a skipped segment, a missing clip, or a failed run.

use std::path::Path;

use async_trait::async_trait;
use rand::seq::SliceRandom;

/// Voice backend error types
#[derive(Debug, thiserror::Error)]
pub enum SynthesisError {
    #[error("nothing to synthesize")]
    EmptyText,

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("backend returned status {0}")]
    Status(reqwest::StatusCode),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("failed to write audio: {0}")]
    Io(#[from] std::io::Error),
}

/// Which voice a synthesis call should use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceSelector {
    Named(String),
    Random,
}

impl VoiceSelector {
    pub fn from_config(random: bool, name: &str) -> Self {
        if random {
            Self::Random
        } else {
            Self::Named(name.to_string())
        }
    }

    /// Resolve to a concrete voice from `voices`.
    pub fn resolve(&self, voices: &[&str]) -> String {
        match self {
            Self::Named(name) => name.clone(),
            Self::Random => voices
                .choose(&mut rand::thread_rng())
                .map(|v| (*v).to_string())
                .unwrap_or_default(),
        }
    }
}

#[async_trait]
pub trait VoiceBackend: Send + Sync {
    /// Longest text accepted by a single `synthesize` call, in characters.
    fn max_chars(&self) -> usize;

    /// Write the spoken form of `text` to `destination`.
    ///
    /// On error the destination is absent or partial.
    async fn synthesize(
        &self,
        text: &str,
        destination: &Path,
        voice: &VoiceSelector,
    ) -> Result<(), SynthesisError>;
}
