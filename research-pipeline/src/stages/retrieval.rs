//! Retrieval stage: one vector search, reduced to candidate documents.

use std::collections::BTreeSet;

use rag_index::{SearchHit, VectorIndex};
use tracing::info;

use crate::config::PipelineConfig;
use crate::errors::PipelineError;
use crate::progress::ProgressTracker;

/// What retrieval hands to pruning.
#[derive(Debug)]
pub struct RetrievalOutcome {
    pub retrieved_chunks: Vec<SearchHit>,
    /// Distinct owning documents; set semantics, no order guarantee.
    pub unique_documents: Vec<String>,
}

/// Runs the configured similarity search and reduces hits to the set of
/// distinct owning documents.
///
/// # Errors
/// - [`PipelineError::EmptyQuery`] for an empty query
/// - index errors propagate
pub async fn retrieve(
    index: &VectorIndex,
    cfg: &PipelineConfig,
    tracker: &ProgressTracker,
    query: &str,
) -> Result<RetrievalOutcome, PipelineError> {
    if query.trim().is_empty() {
        return Err(PipelineError::EmptyQuery);
    }

    tracker.update_stage(
        "retrieval",
        "Searching legal database",
        "Performing vector search",
    );

    let retrieved_chunks = index
        .search(query, cfg.max_results, cfg.similarity_threshold)
        .await?;
    let unique_documents = unique_documents(&retrieved_chunks);

    tracker.update_retrieval(unique_documents.len());
    info!(
        "found {} unique documents from {} chunks",
        unique_documents.len(),
        retrieved_chunks.len()
    );

    Ok(RetrievalOutcome {
        retrieved_chunks,
        unique_documents,
    })
}

/// Distinct `file_name` owners across hits. Hits without an owner in their
/// payload are dropped.
pub fn unique_documents(hits: &[SearchHit]) -> Vec<String> {
    let mut seen: BTreeSet<String> = BTreeSet::new();
    for hit in hits {
        if let Some(name) = hit.file_name() {
            seen.insert(name.to_string());
        }
    }
    seen.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn hit(file_name: &str, score: f32) -> SearchHit {
        SearchHit {
            score,
            text: "chunk text".into(),
            id: format!("{file_name}_0"),
            payload: json!({"file_name": file_name}),
        }
    }

    #[test]
    fn duplicate_owners_collapse() {
        let hits = vec![
            hit("a.txt", 0.9),
            hit("b.txt", 0.8),
            hit("a.txt", 0.7),
            hit("c.txt", 0.6),
            hit("b.txt", 0.5),
        ];
        let docs = unique_documents(&hits);
        assert_eq!(docs, vec!["a.txt", "b.txt", "c.txt"]);
    }

    #[test]
    fn hits_without_owner_are_dropped() {
        let mut orphan = hit("a.txt", 0.9);
        orphan.payload = json!({"text": "no file name"});
        assert!(unique_documents(&[orphan]).is_empty());
    }
}
