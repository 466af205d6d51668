//! Mistral chat-completions client.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use chatrag_core::config::CompletionSettings;
use chatrag_core::error::{Error, Result};
use chatrag_core::traits::{ChatMessage, CompletionProvider};

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChatMessage,
}

pub struct MistralClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl MistralClient {
    pub fn new(base_url: &str, model: &str, api_key: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| Error::Completion(format!("http client: {e}")))?;
        Ok(Self {
            http,
            endpoint: format!("{}/v1/chat/completions", base_url.trim_end_matches('/')),
            model: model.to_string(),
            api_key: api_key.to_string(),
        })
    }

    /// Fails when no API key is configured.
    pub fn from_settings(settings: &CompletionSettings) -> Result<Self> {
        let key = settings
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| Error::InvalidConfig("completion.api_key is not set".to_string()))?;
        Self::new(&settings.base_url, &settings.model, key)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl CompletionProvider for MistralClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        debug!(model = %self.model, messages = messages.len(), "chat completion request");
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&ChatRequest { model: &self.model, messages })
            .send()
            .await
            .map_err(|e| Error::Completion(format!("request failed: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Completion(format!("HTTP {status}: {body}")));
        }
        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::Completion(format!("malformed response: {e}")))?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| Error::Completion("response has no choices".to_string()))
    }
}
