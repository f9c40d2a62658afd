//! Unified error type for the pipeline.
//!
//! Only hard failures live here: an empty query, a missing corpus
//! directory, or an unavailable index. Per-document and per-call failures
//! degrade inside their stage and never surface as errors.

use thiserror::Error;

/// Top-level error for pipeline operations.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Online queries must be non-empty.
    #[error("query must not be empty")]
    EmptyQuery,

    /// Corpus access failed (directory missing, manifest unwritable).
    #[error(transparent)]
    Corpus(#[from] case_indexer::CorpusError),

    /// Vector index unavailable or failing.
    #[error(transparent)]
    Index(#[from] rag_index::IndexError),

    /// LLM service construction/configuration failure.
    #[error(transparent)]
    Llm(#[from] llm_service::LlmError),
}
