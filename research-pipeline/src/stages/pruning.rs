//! Pruning stage: drop candidate documents whose retrieved chunks do not
//! actually address the query.
//!
//! Judgments run concurrently (bounded fan-out) and degrade toward
//! under-inclusion: a document with no chunk text is marked not relevant
//! without consulting the judge, and a judge failure counts as a NO with
//! the error recorded as rationale. Pruning never crashes the pipeline.

use std::collections::BTreeMap;

use futures::stream::{self, StreamExt};
use llm_service::CompletionProvider;
use rag_index::SearchHit;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::config::PipelineConfig;
use crate::progress::ProgressTracker;
use crate::prompts;

/// Separator between chunk texts inside one judge prompt.
pub const CHUNK_SEPARATOR: &str = "\n\n--- CHUNK SEPARATOR ---\n\n";

/// Per-document relevance verdict.
#[derive(Clone, Debug, Serialize)]
pub struct PruningVerdict {
    pub relevant: bool,
    pub explanation: String,
}

/// What pruning hands to extraction.
#[derive(Debug, Default)]
pub struct PruningOutcome {
    pub verdicts: BTreeMap<String, PruningVerdict>,
    pub relevant_documents: Vec<String>,
}

/// Judges every candidate document concurrently, capped at
/// `max_parallel_pruning` in flight.
pub async fn prune(
    llm: &dyn CompletionProvider,
    cfg: &PipelineConfig,
    tracker: &ProgressTracker,
    query: &str,
    unique_documents: &[String],
    retrieved_chunks: &[SearchHit],
) -> PruningOutcome {
    if unique_documents.is_empty() {
        return PruningOutcome::default();
    }

    let mut chunks_by_document: BTreeMap<&str, Vec<&SearchHit>> = BTreeMap::new();
    for chunk in retrieved_chunks {
        if let Some(name) = chunk.file_name() {
            if unique_documents.iter().any(|d| d == name) {
                chunks_by_document.entry(name).or_default().push(chunk);
            }
        }
    }

    tracker.update_stage(
        "pruning",
        &format!(
            "Analyzing relevance of {} documents",
            unique_documents.len()
        ),
        "Running parallel pruning judgments over retrieved chunks",
    );
    tracker.update_pruning(0, unique_documents.len());

    let results: Vec<(String, bool, String)> = stream::iter(unique_documents)
        .map(|document| {
            let chunks = chunks_by_document
                .get(document.as_str())
                .cloned()
                .unwrap_or_default();
            async move { judge_document(llm, query, document, &chunks).await }
        })
        .buffer_unordered(cfg.max_parallel_pruning.max(1))
        .collect()
        .await;

    let mut outcome = PruningOutcome::default();
    for (document, relevant, explanation) in results {
        if relevant {
            outcome.relevant_documents.push(document.clone());
        }
        outcome.verdicts.insert(
            document,
            PruningVerdict {
                relevant,
                explanation,
            },
        );
    }

    tracker.update_pruning(unique_documents.len(), unique_documents.len());
    info!(
        "pruning completed: {}/{} documents relevant",
        outcome.relevant_documents.len(),
        unique_documents.len()
    );
    outcome
}

/// One document's judgment. Fail-closed on missing chunk text and on judge
/// errors.
async fn judge_document(
    llm: &dyn CompletionProvider,
    query: &str,
    document_name: &str,
    chunks: &[&SearchHit],
) -> (String, bool, String) {
    let chunk_texts: Vec<&str> = chunks
        .iter()
        .map(|c| c.text.as_str())
        .filter(|t| !t.is_empty())
        .collect();

    if chunk_texts.is_empty() {
        warn!("no retrieved chunk text for document: {document_name}");
        return (
            document_name.to_string(),
            false,
            "No retrieved chunks available for analysis".to_string(),
        );
    }

    let combined = chunk_texts.join(CHUNK_SEPARATOR);
    info!(
        "pruning {document_name} using {} retrieved chunks ({} chars)",
        chunk_texts.len(),
        combined.len()
    );

    let prompt = prompts::pruning_prompt(query, document_name, &combined);
    match llm.complete(&prompt).await {
        Ok(response) => {
            let response = response.trim().to_string();
            let relevant = response.to_uppercase().starts_with("YES");
            (document_name.to_string(), relevant, response)
        }
        Err(e) => {
            error!("error in pruning judgment for {document_name}: {e}");
            (document_name.to_string(), false, format!("Error: {e}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeLlm;
    use serde_json::json;

    fn hit(file_name: &str, text: &str) -> SearchHit {
        SearchHit {
            score: 0.8,
            text: text.into(),
            id: format!("{file_name}_0"),
            payload: json!({"file_name": file_name}),
        }
    }

    fn cfg() -> PipelineConfig {
        PipelineConfig::default()
    }

    #[tokio::test]
    async fn yes_and_no_verdicts_split_documents() {
        // The judge says NO only for b.txt.
        let llm = FakeLlm::with(|prompt| {
            if prompt.contains("DOCUMENT: b.txt") {
                Ok("NO - About an unrelated property dispute".into())
            } else {
                Ok("YES - Addresses bail conditions directly".into())
            }
        });
        let docs = vec!["a.txt".to_string(), "b.txt".to_string(), "c.txt".to_string()];
        let chunks = vec![
            hit("a.txt", "[3] bail conditions were varied"),
            hit("b.txt", "[9] easement over the lane"),
            hit("c.txt", "[2] interim release granted"),
        ];

        let tracker = ProgressTracker::new();
        let outcome = prune(&llm, &cfg(), &tracker, "bail conditions", &docs, &chunks).await;

        assert_eq!(outcome.relevant_documents.len(), 2);
        assert!(!outcome.verdicts["b.txt"].relevant);
        assert!(outcome.verdicts["a.txt"].relevant);
        assert_eq!(llm.call_count(), 3);
    }

    #[tokio::test]
    async fn document_without_chunks_is_fail_closed() {
        // d.txt is a candidate but has no retrieved chunks: the judge must
        // never be consulted for it.
        let llm = FakeLlm::returning("YES - relevant");
        let docs = vec!["a.txt".to_string(), "d.txt".to_string()];
        let chunks = vec![hit("a.txt", "[1] something relevant")];

        let tracker = ProgressTracker::new();
        let outcome = prune(&llm, &cfg(), &tracker, "query", &docs, &chunks).await;

        assert!(!outcome.verdicts["d.txt"].relevant);
        assert!(outcome.verdicts["d.txt"]
            .explanation
            .contains("No retrieved chunks"));
        assert_eq!(outcome.relevant_documents, vec!["a.txt".to_string()]);
        assert_eq!(llm.call_count(), 1);
    }

    #[tokio::test]
    async fn empty_chunk_text_is_fail_closed() {
        let llm = FakeLlm::returning("YES - relevant");
        let docs = vec!["a.txt".to_string()];
        let chunks = vec![hit("a.txt", "")];

        let tracker = ProgressTracker::new();
        let outcome = prune(&llm, &cfg(), &tracker, "query", &docs, &chunks).await;

        assert!(!outcome.verdicts["a.txt"].relevant);
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn judge_failure_degrades_to_not_relevant() {
        let llm = FakeLlm::failing("rate limited");
        let docs = vec!["a.txt".to_string()];
        let chunks = vec![hit("a.txt", "[1] text")];

        let tracker = ProgressTracker::new();
        let outcome = prune(&llm, &cfg(), &tracker, "query", &docs, &chunks).await;

        assert!(!outcome.verdicts["a.txt"].relevant);
        assert!(outcome.verdicts["a.txt"].explanation.starts_with("Error:"));
    }

    #[tokio::test]
    async fn lowercase_yes_counts() {
        let llm = FakeLlm::returning("yes - clearly on point");
        let docs = vec!["a.txt".to_string()];
        let chunks = vec![hit("a.txt", "[1] text")];

        let tracker = ProgressTracker::new();
        let outcome = prune(&llm, &cfg(), &tracker, "query", &docs, &chunks).await;
        assert!(outcome.verdicts["a.txt"].relevant);
    }

    #[tokio::test]
    async fn chunks_are_joined_with_separator() {
        let llm = FakeLlm::with(|prompt| {
            assert!(prompt.contains(CHUNK_SEPARATOR));
            Ok("YES - ok".into())
        });
        let docs = vec!["a.txt".to_string()];
        let chunks = vec![hit("a.txt", "first chunk"), hit("a.txt", "second chunk")];

        let tracker = ProgressTracker::new();
        let outcome = prune(&llm, &cfg(), &tracker, "query", &docs, &chunks).await;
        assert!(outcome.verdicts["a.txt"].relevant);
    }
}
