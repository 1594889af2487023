//! OpenAI-compatible chat-completions client with bounded token length.

use async_trait::async_trait;
use serde_json::{Value, json};
use taskpulse_core::config::LlmConfig;
use taskpulse_core::error::{Error, Result};

use crate::Composer;

/// A composer backed by any OpenAI-compatible chat-completions endpoint.
pub struct OpenAiCompatibleComposer {
    config: LlmConfig,
    client: reqwest::Client,
}

impl OpenAiCompatibleComposer {
    pub fn new(config: LlmConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Http(format!("Client build: {e}")))?;
        Ok(Self { config, client })
    }

    fn chat_url(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.endpoint.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl Composer for OpenAiCompatibleComposer {
    async fn compose(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        if self.config.api_key.is_empty() {
            return Err(Error::Compose("No API key configured".into()));
        }

        let body = json!({
            "model": self.config.model,
            "max_tokens": self.config.max_tokens,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": user_prompt},
            ],
        });

        let response = self
            .client
            .post(self.chat_url())
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Compose(format!("{} unreachable: {e}", self.config.model)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Error::Compose(format!("API error {status}: {text}")));
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| Error::Compose(format!("Invalid response: {e}")))?;

        json["choices"]
            .get(0)
            .and_then(|c| c["message"]["content"].as_str())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::Compose("No content in response".into()))
    }
}
