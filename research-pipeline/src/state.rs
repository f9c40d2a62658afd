//! Typed pipeline state.
//!
//! One field per named pipeline value, so every stage's input/output
//! contract is visible at compile time instead of living behind string
//! keys in a shared map.

use std::collections::BTreeMap;

use case_indexer::CaseMetadata;
use rag_index::SearchHit;

use crate::classify::QueryClassification;
use crate::stages::pruning::PruningVerdict;

/// Everything a completed query run produced, in stage order.
#[derive(Debug)]
pub struct PipelineState {
    pub query: String,
    pub classification: QueryClassification,
    /// Raw hits from the vector search.
    pub retrieved_chunks: Vec<SearchHit>,
    /// Distinct owning documents of the retrieved chunks.
    pub unique_documents: Vec<String>,
    /// Per-document relevance verdicts from pruning.
    pub pruning_results: BTreeMap<String, PruningVerdict>,
    /// Documents that survived pruning.
    pub relevant_documents: Vec<String>,
    /// Per-document query-scoped extracts (or error strings).
    pub document_summaries: BTreeMap<String, String>,
    /// Metadata for citation construction, parallel to the summaries.
    pub document_metadata: BTreeMap<String, CaseMetadata>,
    /// The synthesized answer.
    pub final_response: String,
}
