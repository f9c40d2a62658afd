use crate::error_handler::{ConfigError, LlmError};

/// Represents the provider (backend) used for language-model inference.
///
/// Adding more providers in the future can be done by extending this enum
/// and giving it a service implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LlmProvider {
    /// OpenAI chat completions API.
    OpenAi,
    /// Google Gemini `generateContent` API.
    Gemini,
}

impl LlmProvider {
    /// Parses a provider name (case-insensitive).
    ///
    /// # Errors
    /// Returns [`ConfigError::UnsupportedProvider`] for unknown names.
    pub fn parse(s: &str) -> Result<Self, LlmError> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(LlmProvider::OpenAi),
            "gemini" => Ok(LlmProvider::Gemini),
            other => Err(ConfigError::UnsupportedProvider(other.to_string()).into()),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LlmProvider::OpenAi => "openai",
            LlmProvider::Gemini => "gemini",
        }
    }
}
