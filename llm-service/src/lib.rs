//! Shared LLM completion service.
//!
//! - Construct once from an [`LlmModelConfig`], wrap in `Arc`, and pass
//!   clones to dependents.
//! - One provider client (OpenAI or Gemini) is built at construction.
//! - Every successful call records token usage into an injectable
//!   [`UsageMeter`] for cost accounting.
//!
//! # Example
//! ```no_run
//! use llm_service::{LlmModelConfig, LlmService};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), llm_service::LlmError> {
//! let cfg = LlmModelConfig::openai("gpt-4o-mini", "sk-...");
//! let svc = LlmService::new(cfg)?;
//!
//! let text = svc.complete("Summarize the bail factors.").await?;
//! println!("{text}");
//! println!("cost so far: ${:.4}", svc.usage_report().total_cost);
//! # Ok(()) }
//! ```

pub mod config;
pub mod error_handler;
pub mod services;
pub mod usage;

pub use config::llm_model_config::LlmModelConfig;
pub use config::llm_provider::LlmProvider;
pub use error_handler::{ConfigError, LlmError};
pub use usage::{UsageMeter, UsageReport};

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use services::gemini_service::GeminiService;
use services::open_ai_service::OpenAiService;

/// Abstract completion boundary: `complete(prompt) -> text`.
///
/// Pipeline stages depend on this trait rather than a concrete client, so
/// tests can substitute in-process fakes.
pub trait CompletionProvider: Send + Sync {
    fn complete<'a>(
        &'a self,
        prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String, LlmError>> + Send + 'a>>;
}

enum ProviderClient {
    OpenAi(OpenAiService),
    Gemini(GeminiService),
}

/// Provider-selected completion service with usage metering.
pub struct LlmService {
    client: ProviderClient,
    meter: Arc<UsageMeter>,
}

impl LlmService {
    /// Builds the service with a fresh usage meter.
    ///
    /// # Errors
    /// Returns [`LlmError`] when the config is invalid for its provider.
    pub fn new(cfg: LlmModelConfig) -> Result<Self, LlmError> {
        Self::with_meter(cfg, Arc::new(UsageMeter::new()))
    }

    /// Builds the service around an existing meter (shared accounting
    /// across services, or a test-owned instance).
    pub fn with_meter(cfg: LlmModelConfig, meter: Arc<UsageMeter>) -> Result<Self, LlmError> {
        let client = match cfg.provider {
            LlmProvider::OpenAi => {
                ProviderClient::OpenAi(OpenAiService::new(cfg, Arc::clone(&meter))?)
            }
            LlmProvider::Gemini => {
                ProviderClient::Gemini(GeminiService::new(cfg, Arc::clone(&meter))?)
            }
        };
        Ok(Self { client, meter })
    }

    /// One completion round trip.
    ///
    /// # Errors
    /// Returns [`LlmError`] on transport, status, or decode failures.
    pub async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        match &self.client {
            ProviderClient::OpenAi(svc) => svc.generate(prompt).await,
            ProviderClient::Gemini(svc) => svc.generate(prompt).await,
        }
    }

    /// Priced snapshot of accumulated usage.
    pub fn usage_report(&self) -> UsageReport {
        self.meter.report()
    }

    /// Clears usage counters for a new session.
    pub fn reset_usage(&self) {
        self.meter.reset();
    }

    /// Shared meter handle.
    pub fn meter(&self) -> Arc<UsageMeter> {
        Arc::clone(&self.meter)
    }
}

impl CompletionProvider for LlmService {
    fn complete<'a>(
        &'a self,
        prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String, LlmError>> + Send + 'a>> {
        Box::pin(LlmService::complete(self, prompt))
    }
}
