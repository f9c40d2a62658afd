//! Lightweight Gemini service for text generation.
//!
//! Thin client for the Generative Language API:
//! - `POST {endpoint}/models/{model}:generateContent` — synchronous
//!   generation (API key passed via query parameter)
//!
//! Uses the universal configuration [`LlmModelConfig`] and ensures that the
//! selected provider is [`LlmProvider::Gemini`]. Token usage from the
//! response's `usageMetadata` is recorded into the injected [`UsageMeter`].

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::config::llm_model_config::LlmModelConfig;
use crate::config::llm_provider::LlmProvider;
use crate::error_handler::{ConfigError, LlmError, Result};
use crate::usage::UsageMeter;

/// Thin client for Gemini `generateContent`.
pub struct GeminiService {
    client: reqwest::Client,
    cfg: LlmModelConfig,
    url_generate: String,
    api_key: String,
    meter: Arc<UsageMeter>,
}

impl GeminiService {
    /// Creates a new [`GeminiService`] from the given config.
    ///
    /// # Errors
    /// - [`LlmError::InvalidProvider`] if `cfg.provider` is not Gemini
    /// - [`ConfigError`] variants on invalid endpoint/model or missing key
    /// - [`LlmError::HttpTransport`] if the HTTP client cannot be built
    pub fn new(cfg: LlmModelConfig, meter: Arc<UsageMeter>) -> Result<Self> {
        if cfg.provider != LlmProvider::Gemini {
            return Err(LlmError::InvalidProvider);
        }
        cfg.validate()?;
        let api_key = cfg
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or(ConfigError::MissingVar("GEMINI_API_KEY"))?;

        let timeout = cfg
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or_else(|| Duration::from_secs(120));
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        let url_generate = format!(
            "{}/models/{}:generateContent",
            cfg.endpoint.trim_end_matches('/'),
            cfg.model
        );

        Ok(Self {
            client,
            cfg,
            url_generate,
            api_key,
            meter,
        })
    }

    /// Performs a generation request and returns the first candidate's
    /// text.
    ///
    /// # Errors
    /// - [`LlmError::HttpStatus`] for non-2xx responses
    /// - [`LlmError::HttpTransport`] for client errors
    /// - [`LlmError::Decode`] if the response cannot be parsed
    #[instrument(skip_all, fields(model = %self.cfg.model))]
    pub async fn generate(&self, prompt: &str) -> Result<String> {
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                max_output_tokens: self.cfg.max_tokens,
                temperature: self.cfg.temperature,
            },
        };

        debug!("POST {}", self.url_generate);
        let resp = self
            .client
            .post(&self.url_generate)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let url = self.url_generate.clone();
            let text = resp.text().await.unwrap_or_default();
            let snippet = text.chars().take(240).collect::<String>();
            return Err(LlmError::HttpStatus {
                status,
                url,
                snippet,
            });
        }

        let out: GenerateResponse = resp
            .json()
            .await
            .map_err(|e| LlmError::Decode(format!("serde error: {e}")))?;

        match &out.usage_metadata {
            Some(usage) => self.meter.record(
                &self.cfg.model,
                usage.prompt_token_count.unwrap_or(0),
                usage.candidates_token_count.unwrap_or(0),
            ),
            None => warn!("gemini response missing usageMetadata"),
        }

        let text = out
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or_else(|| LlmError::Decode("response contained no candidates".into()))?;

        Ok(text)
    }
}

/* ==========================
HTTP payloads
========================== */

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Default, Serialize)]
struct GenerationConfig {
    #[serde(rename = "maxOutputTokens", skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(rename = "usageMetadata")]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: String,
}

#[derive(Debug, Deserialize)]
struct UsageMetadata {
    #[serde(rename = "promptTokenCount")]
    prompt_token_count: Option<u64>,
    #[serde(rename = "candidatesTokenCount")]
    candidates_token_count: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_wrong_provider() {
        let cfg = LlmModelConfig::openai("gpt-4o-mini", "key");
        let err = GeminiService::new(cfg, Arc::new(UsageMeter::new()));
        assert!(matches!(err, Err(LlmError::InvalidProvider)));
    }

    #[test]
    fn usage_metadata_shape_parses() {
        let raw = r#"{
            "candidates": [
                {"content": {"parts": [{"text": "answer"}]}}
            ],
            "usageMetadata": {"promptTokenCount": 12, "candidatesTokenCount": 7}
        }"#;
        let parsed: GenerateResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.candidates[0].content.parts[0].text, "answer");
        assert_eq!(parsed.usage_metadata.unwrap().prompt_token_count, Some(12));
    }
}
