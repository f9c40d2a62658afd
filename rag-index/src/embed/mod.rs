use crate::errors::IndexError;
use std::{future::Future, pin::Pin};

/// Provider interface for embedding generation.
///
/// Async because real providers perform HTTP requests. Implement this trait
/// to plug in another embedding backend.
pub trait EmbeddingsProvider: Send + Sync {
    /// Embeds one text into a dense vector.
    fn embed<'a>(
        &'a self,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<f32>, IndexError>> + Send + 'a>>;
}

pub mod noop_embedder;
pub mod openai;
