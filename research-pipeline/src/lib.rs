//! Retrieval-augmented research pipeline over a legal case corpus.
//!
//! Two flows share one [`ResearchPipeline`]:
//! - **Offline**: [`ResearchPipeline::ensure_index`] re-indexes the corpus
//!   only when the content-hash cache says it changed.
//! - **Online**: [`ResearchPipeline::answer`] runs classification →
//!   retrieval → pruning → extraction → aggregation for one query and
//!   returns the fully typed [`PipelineState`].
//!
//! All collaborators (vector index, completion provider, progress tracker)
//! are injected at construction; there are no process-wide singletons.

pub mod classify;
pub mod config;
mod errors;
pub mod indexing;
pub mod progress;
pub mod prompts;
pub mod stages;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

pub use classify::{QueryClassification, QueryType};
pub use config::PipelineConfig;
pub use errors::PipelineError;
pub use indexing::{IndexReport, index_corpus};
pub use progress::{DocumentStatus, ProgressSnapshot, ProgressTracker};
pub use state::PipelineState;

use std::sync::Arc;

use case_indexer::CaseProcessor;
use llm_service::CompletionProvider;
use rag_index::VectorIndex;
use tracing::info;

/// The wired pipeline: index + completion provider + configuration.
pub struct ResearchPipeline {
    index: VectorIndex,
    llm: Arc<dyn CompletionProvider>,
    processor: CaseProcessor,
    tracker: Arc<ProgressTracker>,
    cfg: PipelineConfig,
}

impl ResearchPipeline {
    pub fn new(index: VectorIndex, llm: Arc<dyn CompletionProvider>, cfg: PipelineConfig) -> Self {
        Self {
            index,
            llm,
            processor: CaseProcessor::new(),
            tracker: Arc::new(ProgressTracker::new()),
            cfg,
        }
    }

    /// Shared progress handle for transports to poll.
    pub fn tracker(&self) -> Arc<ProgressTracker> {
        Arc::clone(&self.tracker)
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.cfg
    }

    /// Runs the offline flow: re-index if the corpus changed, otherwise a
    /// no-op.
    ///
    /// # Errors
    /// See [`indexing::index_corpus`].
    pub async fn ensure_index(&self) -> Result<IndexReport, PipelineError> {
        indexing::index_corpus(&self.index, &self.cfg).await
    }

    /// Answers one query through the full online flow.
    ///
    /// # Errors
    /// Hard failures only: empty query, index unavailable. Per-document
    /// and per-call problems degrade inside their stages.
    pub async fn answer(&self, query: &str) -> Result<PipelineState, PipelineError> {
        if query.trim().is_empty() {
            return Err(PipelineError::EmptyQuery);
        }

        self.tracker.start_session(query);
        self.tracker.update_stage(
            "classification",
            "Classifying query intent",
            "Running query classification",
        );
        let classification = classify::classify_query(self.llm.as_ref(), query).await;

        let retrieval =
            stages::retrieval::retrieve(&self.index, &self.cfg, &self.tracker, query).await?;

        let pruning = stages::pruning::prune(
            self.llm.as_ref(),
            &self.cfg,
            &self.tracker,
            query,
            &retrieval.unique_documents,
            &retrieval.retrieved_chunks,
        )
        .await;

        let extraction = stages::extraction::extract(
            self.llm.as_ref(),
            &self.processor,
            &self.cfg,
            &self.tracker,
            query,
            &classification,
            &pruning.relevant_documents,
        )
        .await;

        let final_response = stages::aggregation::aggregate(
            self.llm.as_ref(),
            &self.tracker,
            query,
            &classification,
            &extraction.summaries,
            &extraction.metadata,
        )
        .await;

        self.tracker
            .complete_session(true, "Legal research completed successfully");
        info!("legal research process completed");

        Ok(PipelineState {
            query: query.to_string(),
            classification,
            retrieved_chunks: retrieval.retrieved_chunks,
            unique_documents: retrieval.unique_documents,
            pruning_results: pruning.verdicts,
            relevant_documents: pruning.relevant_documents,
            document_summaries: extraction.summaries,
            document_metadata: extraction.metadata,
            final_response,
        })
    }
}
