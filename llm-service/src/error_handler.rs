//! Unified error handling for `llm-service`.
//!
//! One top-level [`LlmError`] for the whole crate, with config-time errors
//! grouped in [`ConfigError`]. Small helpers for reading environment
//! variables return the unified [`Result<T>`] alias.

use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;

/// Unified result alias for the entire crate.
pub type Result<T> = std::result::Result<T, LlmError>;

/// Top-level error for the `llm-service` crate.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum LlmError {
    /// Configuration/validation errors (startup/readiness).
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The provider in the config does not match this service.
    #[error("invalid provider for this service")]
    InvalidProvider,

    /// Underlying HTTP transport error.
    #[error("transport error: {0}")]
    HttpTransport(#[from] reqwest::Error),

    /// Non-successful HTTP status from upstream.
    #[error("unexpected HTTP status {status} from {url}: {snippet}")]
    HttpStatus {
        /// Numeric HTTP status code.
        status: StatusCode,
        /// Request URL.
        url: String,
        /// Short snippet of the response body.
        snippet: String,
    },

    /// Unexpected/invalid response payload.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// Operation exceeded the configured timeout.
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),
}

/// Error enum for environment/config-driven setup.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable is missing or empty.
    #[error("missing required environment variable: {0}")]
    MissingVar(&'static str),

    /// Unsupported provider name.
    #[error("unsupported provider: {0}")]
    UnsupportedProvider(String),

    /// Value had the wrong format (e.g., invalid URL).
    #[error("invalid format in {var}: {reason}")]
    InvalidFormat {
        /// Field name (e.g., `endpoint`).
        var: &'static str,
        /// Explanation (e.g., `must start with http:// or https://`).
        reason: &'static str,
    },

    /// Model name was empty or invalid.
    #[error("model name must not be empty")]
    EmptyModel,
}

/// Fetches a required, non-empty environment variable.
///
/// # Errors
/// Returns [`ConfigError::MissingVar`] if the variable is absent or empty.
pub fn must_env(name: &'static str) -> Result<String> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfigError::MissingVar(name).into()),
    }
}
