//! Lightweight OpenAI service for text generation.
//!
//! Thin client for the chat completions API:
//! - `POST {endpoint}/chat/completions` — synchronous generation
//!
//! Uses the universal configuration [`LlmModelConfig`] and ensures that the
//! selected provider is [`LlmProvider::OpenAi`]. Token usage from each
//! response is recorded into the injected [`UsageMeter`].

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::config::llm_model_config::LlmModelConfig;
use crate::config::llm_provider::LlmProvider;
use crate::error_handler::{ConfigError, LlmError, Result};
use crate::usage::UsageMeter;

/// Thin client for OpenAI chat completions.
pub struct OpenAiService {
    client: reqwest::Client,
    cfg: LlmModelConfig,
    url_chat: String,
    api_key: String,
    meter: Arc<UsageMeter>,
}

impl OpenAiService {
    /// Creates a new [`OpenAiService`] from the given config.
    ///
    /// # Errors
    /// - [`LlmError::InvalidProvider`] if `cfg.provider` is not OpenAI
    /// - [`ConfigError`] variants on invalid endpoint/model or missing key
    /// - [`LlmError::HttpTransport`] if the HTTP client cannot be built
    pub fn new(cfg: LlmModelConfig, meter: Arc<UsageMeter>) -> Result<Self> {
        if cfg.provider != LlmProvider::OpenAi {
            return Err(LlmError::InvalidProvider);
        }
        cfg.validate()?;
        let api_key = cfg
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or(ConfigError::MissingVar("OPENAI_API_KEY"))?;

        let timeout = cfg
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or_else(|| Duration::from_secs(120));
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        let url_chat = format!(
            "{}/chat/completions",
            cfg.endpoint.trim_end_matches('/')
        );

        Ok(Self {
            client,
            cfg,
            url_chat,
            api_key,
            meter,
        })
    }

    /// Performs a non-streaming chat completion and returns the message
    /// text.
    ///
    /// # Errors
    /// - [`LlmError::HttpStatus`] for non-2xx responses
    /// - [`LlmError::HttpTransport`] for client errors
    /// - [`LlmError::Decode`] if the response cannot be parsed
    #[instrument(skip_all, fields(model = %self.cfg.model))]
    pub async fn generate(&self, prompt: &str) -> Result<String> {
        let body = ChatRequest {
            model: &self.cfg.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: self.cfg.max_tokens,
            temperature: self.cfg.temperature,
        };

        debug!("POST {}", self.url_chat);
        let resp = self
            .client
            .post(&self.url_chat)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let url = self.url_chat.clone();
            let text = resp.text().await.unwrap_or_default();
            let snippet = text.chars().take(240).collect::<String>();
            return Err(LlmError::HttpStatus {
                status,
                url,
                snippet,
            });
        }

        let out: ChatResponse = resp
            .json()
            .await
            .map_err(|e| LlmError::Decode(format!("serde error: {e}")))?;

        if let Some(usage) = &out.usage {
            self.meter
                .record(&self.cfg.model, usage.prompt_tokens, usage.completion_tokens);
        }

        out.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| LlmError::Decode("response contained no choices".into()))
    }
}

/* ==========================
HTTP payloads
========================== */

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_wrong_provider() {
        let cfg = LlmModelConfig::gemini("gemini-2.5-flash", "key");
        let err = OpenAiService::new(cfg, Arc::new(UsageMeter::new()));
        assert!(matches!(err, Err(LlmError::InvalidProvider)));
    }

    #[test]
    fn rejects_missing_api_key() {
        let mut cfg = LlmModelConfig::openai("gpt-4o-mini", "key");
        cfg.api_key = None;
        let err = OpenAiService::new(cfg, Arc::new(UsageMeter::new()));
        assert!(err.is_err());
    }
}
