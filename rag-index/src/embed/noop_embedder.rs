use crate::embed::EmbeddingsProvider;
use crate::errors::IndexError;
use std::{future::Future, pin::Pin};

/// Provider that refuses to embed. Placeholder for wiring and tests that
/// never reach the embedding path.
#[derive(Clone)]
pub struct NoopEmbedder;

impl EmbeddingsProvider for NoopEmbedder {
    fn embed<'a>(
        &'a self,
        _text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<f32>, IndexError>> + Send + 'a>> {
        Box::pin(async { Err(IndexError::Embedding("no embedding backend configured".into())) })
    }
}
