//! Aggregation stage: one synthesis call over all per-document summaries.
//!
//! The synthesis prompt carries every summary plus citation hyperlinks and
//! instructs the model to reference each case. That instruction is not
//! verifiable up front, so after synthesis every citation is checked
//! against the final text and absences are logged as warnings. The quick
//! access link footer is appended deterministically here, never generated.

use std::collections::BTreeMap;

use case_indexer::CaseMetadata;
use llm_service::CompletionProvider;
use tracing::{error, info, warn};

use crate::classify::QueryClassification;
use crate::progress::ProgressTracker;
use crate::prompts;

/// Fixed response when nothing survived pruning/extraction. No external
/// call is made in that case.
pub const NO_RESULTS_MESSAGE: &str = "I apologize, but I could not find any relevant legal cases \
for your query. Please try rephrasing your question or providing more specific details.";

struct CaseInfo {
    doc_name: String,
    citation: String,
    summary: String,
    hyperlink: String,
}

/// Produces the final answer. Infallible: synthesis errors come back as an
/// apology string embedding the error text.
pub async fn aggregate(
    llm: &dyn CompletionProvider,
    tracker: &ProgressTracker,
    query: &str,
    classification: &QueryClassification,
    summaries: &BTreeMap<String, String>,
    metadata: &BTreeMap<String, CaseMetadata>,
) -> String {
    if summaries.is_empty() {
        return NO_RESULTS_MESSAGE.to_string();
    }

    tracker.update_stage(
        "aggregation",
        "Synthesizing findings",
        "Building targeted legal response",
    );

    let cases: Vec<CaseInfo> = summaries
        .iter()
        .map(|(doc_name, summary)| {
            let meta = metadata.get(doc_name);
            let citation = meta
                .and_then(|m| m.citations.clone())
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| doc_name.replace(".txt", "").replace(" (CanLII)", ""));
            let link = meta
                .and_then(|m| m.pdf_url.clone())
                .filter(|l| !l.trim().is_empty());
            let hyperlink = match &link {
                Some(l) => format!("[{citation}]({l})"),
                None => citation.clone(),
            };
            CaseInfo {
                doc_name: doc_name.clone(),
                citation,
                summary: summary.clone(),
                hyperlink,
            }
        })
        .collect();

    let all_summaries = cases
        .iter()
        .map(|c| {
            format!(
                "CASE: {}\nDOCUMENT FILE: {}\nSUMMARY:\n{}",
                c.hyperlink, c.doc_name, c.summary
            )
        })
        .collect::<Vec<_>>()
        .join(&format!("\n\n{}\n\n", "=".repeat(50)));
    let available_citations = cases
        .iter()
        .map(|c| format!("- {}", c.citation))
        .collect::<Vec<_>>()
        .join("\n");

    info!(
        "synthesizing information from {} cases: {:?}",
        cases.len(),
        cases.iter().map(|c| c.citation.as_str()).collect::<Vec<_>>()
    );
    let prompt = prompts::aggregation_prompt(
        query,
        classification,
        &all_summaries,
        &available_citations,
        cases.len(),
    );

    tracker.update_stage(
        "aggregation",
        "Synthesizing findings",
        "Generating comprehensive legal response",
    );

    match llm.complete(&prompt).await {
        Ok(mut response) => {
            for case in &cases {
                if !response.contains(&case.citation) {
                    warn!(
                        "final response does not reference case {} despite coverage instruction",
                        case.citation
                    );
                }
            }

            response.push_str("\n\n---\n\n### Quick Case Access\n\n");
            for case in &cases {
                response.push_str(&format!("- {}\n", case.hyperlink));
            }
            response
        }
        Err(e) => {
            error!("error in aggregation: {e}");
            format!(
                "I apologize, but there was an error synthesizing the legal research results: {e}"
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeLlm;

    fn classification() -> QueryClassification {
        QueryClassification::general_fallback(0.5, "test")
    }

    fn meta(citations: Option<&str>, pdf_url: Option<&str>) -> CaseMetadata {
        CaseMetadata {
            citations: citations.map(String::from),
            pdf_url: pdf_url.map(String::from),
            ..CaseMetadata::default()
        }
    }

    #[tokio::test]
    async fn empty_summaries_short_circuit_without_llm_call() {
        let llm = FakeLlm::returning("should never run");
        let tracker = ProgressTracker::new();
        let response = aggregate(
            &llm,
            &tracker,
            "q",
            &classification(),
            &BTreeMap::new(),
            &BTreeMap::new(),
        )
        .await;

        assert_eq!(response, NO_RESULTS_MESSAGE);
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn footer_lists_every_case_with_hyperlinks() {
        let llm = FakeLlm::returning("Synthesis citing 2024 SCP 1 and 2024 SCP 2.");
        let tracker = ProgressTracker::new();

        let mut summaries = BTreeMap::new();
        summaries.insert("a.txt".to_string(), "summary a".to_string());
        summaries.insert("b.txt".to_string(), "summary b".to_string());
        let mut metadata = BTreeMap::new();
        metadata.insert(
            "a.txt".to_string(),
            meta(Some("2024 SCP 1"), Some("https://example.org/a.pdf")),
        );
        metadata.insert("b.txt".to_string(), meta(Some("2024 SCP 2"), None));

        let response =
            aggregate(&llm, &tracker, "q", &classification(), &summaries, &metadata).await;

        assert!(response.contains("### Quick Case Access"));
        assert!(response.contains("- [2024 SCP 1](https://example.org/a.pdf)"));
        assert!(response.contains("- 2024 SCP 2"));
        assert_eq!(llm.call_count(), 1);
    }

    #[tokio::test]
    async fn missing_metadata_falls_back_to_stripped_file_name() {
        let llm = FakeLlm::with(|prompt| {
            // The citation derived from the file name appears in the prompt.
            assert!(prompt.contains("- R. v. Smith"));
            Ok("Answer referencing R. v. Smith.".into())
        });
        let tracker = ProgressTracker::new();

        let mut summaries = BTreeMap::new();
        summaries.insert("R. v. Smith (CanLII).txt".to_string(), "s".to_string());

        let response = aggregate(
            &llm,
            &tracker,
            "q",
            &classification(),
            &summaries,
            &BTreeMap::new(),
        )
        .await;
        assert!(response.contains("- R. v. Smith"));
    }

    #[tokio::test]
    async fn synthesis_failure_returns_apology_with_error() {
        let llm = FakeLlm::failing("model overloaded");
        let tracker = ProgressTracker::new();

        let mut summaries = BTreeMap::new();
        summaries.insert("a.txt".to_string(), "summary".to_string());

        let response = aggregate(
            &llm,
            &tracker,
            "q",
            &classification(),
            &summaries,
            &BTreeMap::new(),
        )
        .await;

        assert!(response.starts_with("I apologize"));
        assert!(response.contains("model overloaded"));
        assert!(!response.contains("Quick Case Access"));
    }

    #[tokio::test]
    async fn error_summaries_still_flow_into_synthesis() {
        // A document whose extraction failed is still present downstream;
        // aggregation must not crash on it.
        let llm = FakeLlm::returning("Answer.");
        let tracker = ProgressTracker::new();

        let mut summaries = BTreeMap::new();
        summaries.insert("a.txt".to_string(), "real summary".to_string());
        summaries.insert(
            "b.txt".to_string(),
            "Error reading b.txt: file vanished".to_string(),
        );

        let response = aggregate(
            &llm,
            &tracker,
            "q",
            &classification(),
            &summaries,
            &BTreeMap::new(),
        )
        .await;
        assert!(response.contains("### Quick Case Access"));
        assert_eq!(llm.call_count(), 1);
    }
}
