//! OpenAI embedding provider implementation.
//!
//! Thin client for `POST {endpoint}/embeddings` using `reqwest::Client`.

use std::pin::Pin;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::embed::EmbeddingsProvider;
use crate::errors::IndexError;

/// Configuration for the OpenAI embedding backend.
#[derive(Clone, Debug)]
pub struct OpenAiEmbedderConfig {
    /// API base, e.g. `https://api.openai.com/v1`.
    pub endpoint: String,
    pub api_key: String,
    /// Embedding model, e.g. `text-embedding-3-small`.
    pub model: String,
    /// Expected embedding dimension size.
    pub dim: usize,
    pub timeout_secs: u64,
}

impl OpenAiEmbedderConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            endpoint: "https://api.openai.com/v1".into(),
            api_key: api_key.into(),
            model: "text-embedding-3-small".into(),
            dim: 1536,
            timeout_secs: 60,
        }
    }
}

/// OpenAI embedding provider (async).
pub struct OpenAiEmbedder {
    client: reqwest::Client,
    url: String,
    cfg: OpenAiEmbedderConfig,
}

impl OpenAiEmbedder {
    /// Builds the provider and its HTTP client.
    ///
    /// # Errors
    /// Returns `IndexError::Embedding` on invalid endpoint or client build
    /// failure.
    pub fn new(cfg: OpenAiEmbedderConfig) -> Result<Self, IndexError> {
        let endpoint = cfg.endpoint.trim();
        if endpoint.is_empty()
            || !(endpoint.starts_with("http://") || endpoint.starts_with("https://"))
        {
            return Err(IndexError::Embedding(format!(
                "invalid embedding endpoint: {}",
                cfg.endpoint
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .map_err(|e| IndexError::Embedding(format!("http client build: {e}")))?;
        let url = format!("{}/embeddings", endpoint.trim_end_matches('/'));

        Ok(Self { client, url, cfg })
    }

    async fn request(&self, text: &str) -> Result<Vec<f32>, IndexError> {
        let body = EmbeddingsRequest {
            model: &self.cfg.model,
            input: text,
        };

        debug!("POST {}", self.url);
        let resp = self
            .client
            .post(&self.url)
            .bearer_auth(&self.cfg.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| IndexError::Embedding(format!("POST {}: {e}", self.url)))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let snippet: String = resp
                .text()
                .await
                .unwrap_or_default()
                .chars()
                .take(240)
                .collect();
            return Err(IndexError::Embedding(format!(
                "embeddings non-2xx: {status}; body: {snippet}"
            )));
        }

        let parsed: EmbeddingsResponse = resp
            .json()
            .await
            .map_err(|e| IndexError::Embedding(format!("parse embeddings json: {e}")))?;

        let vector = parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| IndexError::Embedding("empty embeddings response".into()))?;

        if vector.len() != self.cfg.dim {
            return Err(IndexError::VectorSizeMismatch {
                got: vector.len(),
                want: self.cfg.dim,
            });
        }
        Ok(vector)
    }
}

impl EmbeddingsProvider for OpenAiEmbedder {
    fn embed<'a>(
        &'a self,
        text: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<Vec<f32>, IndexError>> + Send + 'a>> {
        Box::pin(self.request(text))
    }
}

/// Request body for `/embeddings`.
#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a str,
}

/// Response body for `/embeddings` (first datum only).
#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}
