//! Generation client abstraction and the Gemini implementation.
//!
//! The chat core talks to the language model through the [`Generator`]
//! trait so tests can substitute deterministic fakes for the network.
//! [`GeminiClient`] calls the hosted Generative Language API's
//! `generateContent` endpoint: exactly one attempt per user action, no
//! retry, and every failure — network, authentication, quota, malformed
//! response — surfaces as [`ChatError::Generation`].

use async_trait::async_trait;
use std::time::Duration;

use crate::config::GenerationConfig;
use crate::error::ChatError;

/// Capability interface for the external language model.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Returns the model identifier (e.g. `"gemini-1.5-flash"`).
    fn model_name(&self) -> &str;

    /// Send one prompt and return the generated answer, trimmed of leading
    /// and trailing whitespace.
    async fn generate(&self, prompt: &str) -> Result<String, ChatError>;
}

/// Client for the Gemini `generateContent` API.
pub struct GeminiClient {
    model: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl GeminiClient {
    /// Create a client from configuration. The API key is read from the
    /// environment variable named by `config.api_key_env`.
    pub fn new(config: &GenerationConfig) -> Result<Self, ChatError> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            ChatError::Generation(format!(
                "{} environment variable not set",
                config.api_key_env
            ))
        })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ChatError::Generation(e.to_string()))?;

        Ok(Self {
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            client,
        })
    }
}

#[async_trait]
impl Generator for GeminiClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String, ChatError> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        let body = serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
        });

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ChatError::Generation(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(ChatError::Generation(format!(
                "Gemini API error {}: {}",
                status, body_text
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ChatError::Generation(e.to_string()))?;

        parse_generate_response(&json)
    }
}

/// Extract the answer text from a `generateContent` response.
///
/// Concatenates the text parts of the first candidate and trims the result.
fn parse_generate_response(json: &serde_json::Value) -> Result<String, ChatError> {
    let parts = json
        .get("candidates")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.as_array())
        .ok_or_else(|| {
            ChatError::Generation("malformed response: no candidates with content".to_string())
        })?;

    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
        .collect();

    if text.is_empty() {
        return Err(ChatError::Generation(
            "malformed response: candidate has no text parts".to_string(),
        ));
    }

    Ok(text.trim().to_string())
}
