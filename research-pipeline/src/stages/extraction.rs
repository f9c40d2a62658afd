//! Extraction stage: query-scoped summarization of each relevant
//! document's full text.
//!
//! Pruning already established topical relevance from retrieved chunks, so
//! extraction re-reads the complete document from disk. Failures stay
//! per-document: a missing or unreadable file records an error string as
//! that document's summary and the rest of the batch continues.

use std::collections::BTreeMap;

use case_indexer::{CaseMetadata, CaseProcessor};
use futures::stream::{self, StreamExt};
use llm_service::CompletionProvider;
use tracing::{error, info, warn};

use crate::classify::QueryClassification;
use crate::config::PipelineConfig;
use crate::progress::{DocumentStatus, ProgressTracker};
use crate::prompts;

/// What extraction hands to aggregation.
#[derive(Debug, Default)]
pub struct ExtractionOutcome {
    /// Document name -> extracted text (or an error string).
    pub summaries: BTreeMap<String, String>,
    /// Document name -> metadata for citation construction.
    pub metadata: BTreeMap<String, CaseMetadata>,
}

/// Extracts all relevant documents concurrently, capped at
/// `max_parallel_reading` in flight.
pub async fn extract(
    llm: &dyn CompletionProvider,
    processor: &CaseProcessor,
    cfg: &PipelineConfig,
    tracker: &ProgressTracker,
    query: &str,
    classification: &QueryClassification,
    relevant_documents: &[String],
) -> ExtractionOutcome {
    if relevant_documents.is_empty() {
        warn!("no relevant documents to read");
        return ExtractionOutcome::default();
    }

    tracker.update_stage(
        "reading",
        &format!("Reading {} documents", relevant_documents.len()),
        "Extracting relevant information",
    );
    tracker.update_reading_start(relevant_documents);

    let results: Vec<(String, String, CaseMetadata)> = stream::iter(relevant_documents)
        .map(|document| {
            read_and_extract(llm, processor, cfg, tracker, query, classification, document)
        })
        .buffer_unordered(cfg.max_parallel_reading.max(1))
        .collect()
        .await;

    let mut outcome = ExtractionOutcome::default();
    for (document, summary, metadata) in results {
        outcome.summaries.insert(document.clone(), summary);
        outcome.metadata.insert(document, metadata);
    }

    info!("reading completed for {} documents", outcome.summaries.len());
    outcome
}

/// One document's read + extraction round trip. Status transitions:
/// pending -> reading -> completed | error.
async fn read_and_extract(
    llm: &dyn CompletionProvider,
    processor: &CaseProcessor,
    cfg: &PipelineConfig,
    tracker: &ProgressTracker,
    query: &str,
    classification: &QueryClassification,
    document_name: &str,
) -> (String, String, CaseMetadata) {
    tracker.update_document_status(document_name, DocumentStatus::Reading);

    let path = cfg.documents_dir.join(document_name);
    if !path.exists() {
        warn!("document not found: {document_name}");
        tracker.update_document_status(document_name, DocumentStatus::Error);
        tracker.increment_reading(document_name);
        return (
            document_name.to_string(),
            format!("Unable to read content for {document_name}"),
            CaseMetadata::default(),
        );
    }

    let parsed = match processor.process_file(&path) {
        Ok(doc) => doc,
        Err(e) => {
            error!("error reading {document_name}: {e}");
            tracker.update_document_status(document_name, DocumentStatus::Error);
            tracker.increment_reading(document_name);
            return (
                document_name.to_string(),
                format!("Error reading {document_name}: {e}"),
                CaseMetadata::default(),
            );
        }
    };

    info!(
        "reading {document_name} with classification '{}'",
        classification.query_type.as_str()
    );
    let prompt = prompts::extraction_prompt(query, classification, document_name, &parsed.content);

    match llm.complete(&prompt).await {
        Ok(response) => {
            tracker.update_document_status(document_name, DocumentStatus::Completed);
            tracker.increment_reading(document_name);
            (document_name.to_string(), response, parsed.metadata)
        }
        Err(e) => {
            error!("error in extraction for {document_name}: {e}");
            tracker.update_document_status(document_name, DocumentStatus::Error);
            tracker.increment_reading(document_name);
            (
                document_name.to_string(),
                format!("Error reading {document_name}: {e}"),
                parsed.metadata,
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeLlm;
    use std::fs;
    use tempfile::TempDir;

    const CASE_BODY: &str = "\
======================================================================
SUPREME COURT OF PAKISTAN JUDGMENT
======================================================================

Case No: Crl.A.100/2024
Case Title: State v. Accused
Judgment Date: 01-02-2024
PDF URL: https://example.org/100.pdf

======================================================================

[1] The appellant sought bail pending appeal.
";

    fn corpus(docs: &[&str]) -> (TempDir, PipelineConfig) {
        let dir = TempDir::new().unwrap();
        for name in docs {
            fs::write(dir.path().join(name), CASE_BODY).unwrap();
        }
        let cfg = PipelineConfig {
            documents_dir: dir.path().to_path_buf(),
            ..PipelineConfig::default()
        };
        (dir, cfg)
    }

    fn classification() -> QueryClassification {
        QueryClassification::general_fallback(0.5, "test")
    }

    #[tokio::test]
    async fn extracts_every_relevant_document() {
        let (_dir, cfg) = corpus(&["a.txt", "b.txt"]);
        let llm = FakeLlm::with(|prompt| {
            if prompt.contains("LEGAL CASE: a.txt") {
                Ok("summary of a".into())
            } else {
                Ok("summary of b".into())
            }
        });
        let processor = CaseProcessor::new();
        let tracker = ProgressTracker::new();
        let docs = vec!["a.txt".to_string(), "b.txt".to_string()];

        let outcome = extract(&llm, &processor, &cfg, &tracker, "bail", &classification(), &docs)
            .await;

        assert_eq!(outcome.summaries["a.txt"], "summary of a");
        assert_eq!(outcome.summaries["b.txt"], "summary of b");
        assert_eq!(
            outcome.metadata["a.txt"].case_no.as_deref(),
            Some("Crl.A.100/2024")
        );
        let snap = tracker.snapshot();
        assert_eq!(snap.completed_readings, 2);
        assert_eq!(snap.document_status["a.txt"], DocumentStatus::Completed);
    }

    #[tokio::test]
    async fn missing_file_records_error_summary_and_spares_others() {
        let (_dir, cfg) = corpus(&["a.txt"]);
        let llm = FakeLlm::returning("summary");
        let processor = CaseProcessor::new();
        let tracker = ProgressTracker::new();
        let docs = vec!["a.txt".to_string(), "deleted.txt".to_string()];

        let outcome = extract(&llm, &processor, &cfg, &tracker, "q", &classification(), &docs)
            .await;

        assert_eq!(outcome.summaries["a.txt"], "summary");
        assert!(outcome.summaries["deleted.txt"].contains("Unable to read content"));
        assert_eq!(outcome.metadata["deleted.txt"], CaseMetadata::default());
        let snap = tracker.snapshot();
        assert_eq!(snap.document_status["deleted.txt"], DocumentStatus::Error);
        // Only the readable document reached the model.
        assert_eq!(llm.call_count(), 1);
    }

    #[tokio::test]
    async fn llm_failure_records_error_but_keeps_metadata() {
        let (_dir, cfg) = corpus(&["a.txt"]);
        let llm = FakeLlm::failing("timeout");
        let processor = CaseProcessor::new();
        let tracker = ProgressTracker::new();
        let docs = vec!["a.txt".to_string()];

        let outcome = extract(&llm, &processor, &cfg, &tracker, "q", &classification(), &docs)
            .await;

        assert!(outcome.summaries["a.txt"].starts_with("Error reading a.txt"));
        // Metadata was parsed before the call failed and is still present.
        assert_eq!(
            outcome.metadata["a.txt"].case_no.as_deref(),
            Some("Crl.A.100/2024")
        );
    }

    #[tokio::test]
    async fn empty_document_list_short_circuits() {
        let (_dir, cfg) = corpus(&[]);
        let llm = FakeLlm::returning("unused");
        let processor = CaseProcessor::new();
        let tracker = ProgressTracker::new();

        let outcome = extract(&llm, &processor, &cfg, &tracker, "q", &classification(), &[])
            .await;
        assert!(outcome.summaries.is_empty());
        assert_eq!(llm.call_count(), 0);
    }
}
