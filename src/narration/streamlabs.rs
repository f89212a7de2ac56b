//! Streamlabs Polly voice backend.
//!
//! POSTs the text as a form, receives a JSON body naming a follow-up
//! audio URL, then downloads that audio to the destination file.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::backend::{SynthesisError, VoiceBackend, VoiceSelector};
use super::rate_limit::{Clock, RateLimitDecision, RateLimiter};
use crate::config::TtsConfig;

pub const MAX_CHARS: usize = 550;

pub const VOICES: [&str; 15] = [
    "Brian", "Emma", "Russell", "Joey", "Matthew", "Joanna", "Kimberly", "Amy", "Geraint",
    "Nicole", "Justin", "Ivy", "Kendra", "Salli", "Raveena",
];

pub struct StreamlabsPolly {
    client: Client,
    url: String,
    limiter: RateLimiter,
}

impl StreamlabsPolly {
    pub fn new(config: &TtsConfig, clock: Arc<dyn Clock>) -> Result<Self, SynthesisError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            url: config.endpoint.clone(),
            limiter: RateLimiter::new(clock),
        })
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }
}

#[async_trait]
impl VoiceBackend for StreamlabsPolly {
    fn max_chars(&self) -> usize {
        MAX_CHARS
    }

    async fn synthesize(
        &self,
        text: &str,
        destination: &Path,
        voice: &VoiceSelector,
    ) -> Result<(), SynthesisError> {
        if text.trim().is_empty() {
            return Err(SynthesisError::EmptyText);
        }

        let voice = match voice {
            VoiceSelector::Named(name) => capitalize(name),
            VoiceSelector::Random => voice.resolve(&VOICES),
        };
        debug!("Streamlabs Polly ({voice}): {} chars", text.chars().count());

        let form = [("voice", voice.as_str()), ("text", text), ("service", "polly")];
        let response = loop {
            let response = self.client.post(&self.url).form(&form).send().await?;
            match self.limiter.check(response.status(), response.headers()).await {
                RateLimitDecision::Retry => continue,
                RateLimitDecision::Proceed => break response,
            }
        };

        if !response.status().is_success() {
            return Err(SynthesisError::Status(response.status()));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| SynthesisError::MalformedResponse(e.to_string()))?;
        let speak_url = body["speak_url"]
            .as_str()
            .ok_or_else(|| SynthesisError::MalformedResponse("missing speak_url".into()))?;

        let audio = self
            .client
            .get(speak_url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        tokio::fs::write(destination, &audio).await?;

        debug!("Wrote {} bytes to {}", audio.len(), destination.display());
        Ok(())
    }
}

/// First letter upper-case, the rest lower-case.
fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
