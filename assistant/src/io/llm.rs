//! Completion backend abstraction.
//!
//! The [`Completer`] trait decouples the planner and verifier from the actual
//! language-model backend (currently an OpenAI-compatible chat completions
//! endpoint). Tests use scripted completers that return predetermined text
//! without network access.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument, warn};

use crate::io::config::LlmConfig;

/// Abstraction over JSON-mode completion backends.
#[async_trait]
pub trait Completer: Send + Sync {
    /// Ask the model for a single JSON object. Returns the raw response text.
    ///
    /// `system` and `user` stay separate so retries can reuse the same
    /// system framing.
    async fn complete_json(&self, system: &str, user: &str) -> Result<String>;
}

#[async_trait]
impl<C: Completer + ?Sized> Completer for Arc<C> {
    async fn complete_json(&self, system: &str, user: &str) -> Result<String> {
        (**self).complete_json(system, user).await
    }
}

/// Completer backed by an OpenAI-compatible `/chat/completions` endpoint.
#[derive(Clone)]
pub struct OpenAiCompleter {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    model: String,
    temperature: f32,
}

impl std::fmt::Debug for OpenAiCompleter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompleter")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .finish_non_exhaustive()
    }
}

impl OpenAiCompleter {
    pub fn new(config: &LlmConfig, api_key: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("build completion http client")?;
        Ok(Self {
            client,
            api_key,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }

    /// Build from config, reading the API key from `config.api_key_env`.
    ///
    /// Fails immediately when the key is missing or blank.
    pub fn from_env(config: &LlmConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                anyhow!(
                    "{} is missing; export it before running the assistant",
                    config.api_key_env
                )
            })?;
        Self::new(config, api_key)
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[async_trait]
impl Completer for OpenAiCompleter {
    #[instrument(skip_all, fields(model = %self.model, system_len = system.len(), user_len = user.len()))]
    async fn complete_json(&self, system: &str, user: &str) -> Result<String> {
        let body = json!({
            "model": &self.model,
            "response_format": {"type": "json_object"},
            "temperature": self.temperature,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user}
            ]
        });

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("send completion request")?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            warn!(%status, "completion request failed");
            return Err(anyhow!("completion API error {status}: {detail}"));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .context("decode completion response")?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("completion API returned no choices"))?
            .message
            .content
            .unwrap_or_else(|| "{}".to_string());
        debug!(content_len = content.len(), "completion received");
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_base_url_without_double_slash() {
        let config = LlmConfig {
            base_url: "https://llm.internal.test/v1/".to_string(),
            ..LlmConfig::default()
        };
        let completer = OpenAiCompleter::new(&config, "sk-test".to_string()).expect("completer");
        assert_eq!(completer.endpoint, "https://llm.internal.test/v1/chat/completions");
        assert_eq!(completer.model(), "gpt-4o-mini");
    }

    #[test]
    fn debug_output_hides_api_key() {
        let completer =
            OpenAiCompleter::new(&LlmConfig::default(), "sk-secret".to_string()).expect("completer");
        let rendered = format!("{completer:?}");
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("gpt-4o-mini"));
    }

    #[test]
    fn from_env_fails_fast_without_key() {
        let config = LlmConfig {
            api_key_env: "ASSISTANT_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
            ..LlmConfig::default()
        };
        let err = OpenAiCompleter::from_env(&config).expect_err("should fail");
        assert!(err.to_string().contains("ASSISTANT_TEST_KEY_THAT_IS_NEVER_SET"));
    }
}
