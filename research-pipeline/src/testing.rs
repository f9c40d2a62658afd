//! In-process fakes shared by the stage tests.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};

use llm_service::{CompletionProvider, LlmError};

/// Scriptable completion fake. The handler sees the full prompt, so tests
/// can branch on document names embedded in it.
pub(crate) struct FakeLlm {
    handler: Box<dyn Fn(&str) -> Result<String, String> + Send + Sync>,
    calls: AtomicUsize,
}

impl FakeLlm {
    pub fn with(
        handler: impl Fn(&str) -> Result<String, String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            handler: Box::new(handler),
            calls: AtomicUsize::new(0),
        }
    }

    /// Always answers with `text`.
    pub fn returning(text: &str) -> Self {
        let text = text.to_string();
        Self::with(move |_| Ok(text.clone()))
    }

    /// Always fails with `message`.
    pub fn failing(message: &str) -> Self {
        let message = message.to_string();
        Self::with(move |_| Err(message.clone()))
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl CompletionProvider for FakeLlm {
    fn complete<'a>(
        &'a self,
        prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String, LlmError>> + Send + 'a>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let result = (self.handler)(prompt);
        Box::pin(async move { result.map_err(LlmError::Decode) })
    }
}
