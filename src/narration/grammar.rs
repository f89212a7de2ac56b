//! Optional AI grammar smoothing through Ollama.
//!
//! Social media text is informal; the model tidies grammar before the
//! text is voiced. Any failure leaves the text untouched.

use std::time::Duration;

use reqwest::Client;
use serde_json::json;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::config::AiConfig;

const REFINE_PROMPT: &str = "Your task is to refine the following text for use in a \
Text-to-Speech program. This text comes from social media posts and comments and often \
contains informal language and expressions. Correct any grammatical mistakes and improve \
the natural flow of the language, making it clearer and more suitable for speech. Do not \
change the original meaning or add any new content. Output ONLY the refined text.\n\nText: ";

const MAX_TOKENS: u32 = 150;

#[derive(Debug, thiserror::Error)]
pub enum GrammarError {
    #[error("ollama request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("ollama returned status {0}")]
    Status(reqwest::StatusCode),

    #[error("ollama returned an empty response")]
    EmptyResponse,
}

pub struct GrammarSmoother {
    model: String,
    host: String,
    client: Client,
    loaded: OnceCell<bool>,
}

impl GrammarSmoother {
    pub fn new(config: &AiConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            model: config.model.clone(),
            host: config.host.trim_end_matches('/').to_string(),
            client,
            loaded: OnceCell::new(),
        })
    }

    /// Check once whether the model is available. Later calls reuse the answer.
    pub async fn ensure_loaded(&self) -> bool {
        *self
            .loaded
            .get_or_init(|| async {
                let url = format!("{}/api/show", self.host);
                match self
                    .client
                    .post(&url)
                    .json(&json!({ "model": self.model }))
                    .send()
                    .await
                {
                    Ok(resp) if resp.status().is_success() => {
                        info!("Grammar model '{}' available", self.model);
                        true
                    }
                    Ok(resp) => {
                        warn!("Grammar model '{}' unavailable: status {}", self.model, resp.status());
                        false
                    }
                    Err(e) if e.is_connect() => {
                        warn!("Cannot connect to Ollama at {}", self.host);
                        false
                    }
                    Err(e) => {
                        warn!("Ollama model check failed: {e}");
                        false
                    }
                }
            })
            .await
    }

    pub async fn generate(&self, prompt: &str) -> Result<String, GrammarError> {
        let body = json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
            "options": {
                "temperature": 0.1,
                "num_predict": MAX_TOKENS
            }
        });

        let url = format!("{}/api/generate", self.host);
        let resp = self.client.post(&url).json(&body).send().await?;
        if !resp.status().is_success() {
            return Err(GrammarError::Status(resp.status()));
        }

        let data: serde_json::Value = resp.json().await?;
        let result = data["response"].as_str().unwrap_or("").trim();
        if result.is_empty() {
            return Err(GrammarError::EmptyResponse);
        }
        Ok(result.to_string())
    }

    /// Refined text, or `text` itself when the model is unavailable or fails.
    pub async fn smooth(&self, text: &str) -> String {
        if text.trim().is_empty() || !self.ensure_loaded().await {
            return text.to_string();
        }

        debug!("Before grammar smoothing: {text}");
        let prompt = format!("{REFINE_PROMPT}\"{text}\"");
        match self.generate(&prompt).await {
            Ok(result) => {
                let result = result.trim_matches('"').to_string();
                debug!("After grammar smoothing: {result}");
                result
            }
            Err(e) => {
                warn!("Grammar smoothing failed, using original text: {e}");
                text.to_string()
            }
        }
    }
}
