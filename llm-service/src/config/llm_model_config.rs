use crate::config::llm_provider::LlmProvider;
use crate::error_handler::{ConfigError, LlmError, must_env};

/// Configuration for an LLM model invocation.
///
/// Contains both general and provider-specific parameters. Extend as needed
/// to support new backends or features.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmModelConfig {
    /// The LLM provider/backend (OpenAI or Gemini).
    pub provider: LlmProvider,

    /// Model identifier string (e.g., `"gpt-4o-mini"`).
    pub model: String,

    /// Inference endpoint (API base URL).
    pub endpoint: String,

    /// API key for authentication.
    pub api_key: Option<String>,

    /// Maximum number of tokens to generate.
    pub max_tokens: Option<u32>,

    /// Sampling temperature.
    pub temperature: Option<f32>,

    /// Request timeout in seconds. Completion round trips bundle document
    /// content, so the default is generous (120s).
    pub timeout_secs: Option<u64>,
}

impl LlmModelConfig {
    /// Default configuration for an OpenAI chat model.
    pub fn openai(model: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            provider: LlmProvider::OpenAi,
            model: model.into(),
            endpoint: "https://api.openai.com/v1".into(),
            api_key: Some(api_key.into()),
            max_tokens: None,
            temperature: None,
            timeout_secs: Some(120),
        }
    }

    /// Default configuration for a Gemini model.
    pub fn gemini(model: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            provider: LlmProvider::Gemini,
            model: model.into(),
            endpoint: "https://generativelanguage.googleapis.com/v1beta".into(),
            api_key: Some(api_key.into()),
            max_tokens: None,
            temperature: None,
            timeout_secs: Some(120),
        }
    }

    /// Reads provider and model from `LLM_PROVIDER` / `LLM_MODEL`, plus the
    /// matching API key variable.
    ///
    /// # Errors
    /// Returns [`ConfigError`] variants for unsupported providers or a
    /// missing API key.
    pub fn from_env() -> Result<Self, LlmError> {
        let provider = LlmProvider::parse(
            &std::env::var("LLM_PROVIDER").unwrap_or_else(|_| "openai".into()),
        )?;
        match provider {
            LlmProvider::OpenAi => {
                let model =
                    std::env::var("LLM_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into());
                Ok(Self::openai(model, must_env("OPENAI_API_KEY")?))
            }
            LlmProvider::Gemini => {
                let model =
                    std::env::var("LLM_MODEL").unwrap_or_else(|_| "gemini-2.5-flash".into());
                Ok(Self::gemini(model, must_env("GEMINI_API_KEY")?))
            }
        }
    }

    /// Validates the endpoint and model name.
    pub fn validate(&self) -> Result<(), LlmError> {
        if self.model.trim().is_empty() {
            return Err(ConfigError::EmptyModel.into());
        }
        let endpoint = self.endpoint.trim();
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(ConfigError::InvalidFormat {
                var: "endpoint",
                reason: "must start with http:// or https://",
            }
            .into());
        }
        Ok(())
    }
}
