//! The four online stages, in pipeline order.

pub mod aggregation;
pub mod extraction;
pub mod pruning;
pub mod retrieval;

#[cfg(test)]
mod flow_tests {
    //! Stage-composition scenarios: retrieval output flowing through
    //! pruning, extraction, and aggregation with a scripted judge.

    use std::fs;

    use rag_index::SearchHit;
    use serde_json::json;
    use tempfile::TempDir;

    use crate::classify::QueryClassification;
    use crate::config::PipelineConfig;
    use crate::progress::ProgressTracker;
    use crate::testing::FakeLlm;

    fn hit(file_name: &str, idx: usize, text: &str) -> SearchHit {
        SearchHit {
            score: 0.7,
            text: text.into(),
            id: format!("{file_name}_{idx}"),
            payload: json!({"file_name": file_name}),
        }
    }

    fn case_file(case_no: &str) -> String {
        format!(
            "\
======================================================================
SUPREME COURT OF PAKISTAN JUDGMENT
======================================================================

Case No: {case_no}
Citations: {case_no}
Judgment Date: 05-03-2024
PDF URL: https://example.org/{case_no}.pdf

======================================================================

[1] The petitioner applied for post-arrest bail.
[2] Conditions of release were considered at length.
"
        )
    }

    #[tokio::test]
    async fn retrieved_chunks_flow_to_final_answer() {
        // 12 chunks across 4 documents; the judge rejects one document;
        // the remaining three get extracted and synthesized.
        let dir = TempDir::new().unwrap();
        for name in ["a.txt", "b.txt", "c.txt", "d.txt"] {
            fs::write(dir.path().join(name), case_file(name.trim_end_matches(".txt"))).unwrap();
        }
        let cfg = PipelineConfig {
            documents_dir: dir.path().to_path_buf(),
            ..PipelineConfig::default()
        };

        let mut hits = Vec::new();
        for (doc, n) in [("a.txt", 4), ("b.txt", 3), ("c.txt", 3), ("d.txt", 2)] {
            for i in 0..n {
                hits.push(hit(doc, i, &format!("[{}] bail discussion in {doc}", i + 1)));
            }
        }
        assert_eq!(hits.len(), 12);

        let llm = FakeLlm::with(|prompt| {
            if prompt.contains("RETRIEVED CHUNKS") {
                // Pruning judge: only d.txt is off-topic.
                if prompt.contains("DOCUMENT: d.txt") {
                    Ok("NO - Concerns a land revenue dispute".into())
                } else {
                    Ok("YES - Discusses bail conditions".into())
                }
            } else if prompt.contains("EXTRACTION:") {
                Ok("Extracted bail findings.".into())
            } else {
                Ok("Synthesis citing a, b and c.".into())
            }
        });
        let tracker = ProgressTracker::new();
        let classification = QueryClassification::general_fallback(0.5, "test");
        let processor = case_indexer::CaseProcessor::new();

        let docs = super::retrieval::unique_documents(&hits);
        assert_eq!(docs.len(), 4);

        let pruning =
            super::pruning::prune(&llm, &cfg, &tracker, "bail conditions", &docs, &hits).await;
        assert_eq!(pruning.relevant_documents.len(), 3);
        assert!(!pruning.verdicts["d.txt"].relevant);

        let extraction = super::extraction::extract(
            &llm,
            &processor,
            &cfg,
            &tracker,
            "bail conditions",
            &classification,
            &pruning.relevant_documents,
        )
        .await;
        assert_eq!(extraction.summaries.len(), 3);
        assert!(!extraction.summaries.contains_key("d.txt"));

        let response = super::aggregation::aggregate(
            &llm,
            &tracker,
            "bail conditions",
            &classification,
            &extraction.summaries,
            &extraction.metadata,
        )
        .await;

        // 4 pruning calls + 3 extractions + 1 synthesis.
        assert_eq!(llm.call_count(), 8);
        assert!(response.contains("### Quick Case Access"));
        assert!(response.contains("- [a](https://example.org/a.pdf)"));
        assert!(!response.contains("example.org/d.pdf"));
    }

    #[tokio::test]
    async fn document_deleted_between_pruning_and_extraction() {
        // c.txt disappears after pruning: its summary becomes an error
        // string, the others are unaffected, and synthesis still runs.
        let dir = TempDir::new().unwrap();
        for name in ["a.txt", "b.txt"] {
            fs::write(dir.path().join(name), case_file(name.trim_end_matches(".txt"))).unwrap();
        }
        let cfg = PipelineConfig {
            documents_dir: dir.path().to_path_buf(),
            ..PipelineConfig::default()
        };

        let llm = FakeLlm::with(|prompt| {
            if prompt.contains("EXTRACTION:") {
                Ok("Extracted findings.".into())
            } else {
                Ok("Synthesis over all summaries.".into())
            }
        });
        let tracker = ProgressTracker::new();
        let classification = QueryClassification::general_fallback(0.5, "test");
        let processor = case_indexer::CaseProcessor::new();

        let relevant = vec!["a.txt".to_string(), "b.txt".to_string(), "c.txt".to_string()];
        let extraction = super::extraction::extract(
            &llm,
            &processor,
            &cfg,
            &tracker,
            "bail",
            &classification,
            &relevant,
        )
        .await;

        assert_eq!(extraction.summaries["a.txt"], "Extracted findings.");
        assert!(extraction.summaries["c.txt"].contains("Unable to read content"));

        let response = super::aggregation::aggregate(
            &llm,
            &tracker,
            "bail",
            &classification,
            &extraction.summaries,
            &extraction.metadata,
        )
        .await;
        assert!(response.contains("### Quick Case Access"));
        // All three documents appear in the footer, the broken one under
        // its stripped file name.
        assert!(response.contains("- c\n") || response.contains("- c "));
    }
}
