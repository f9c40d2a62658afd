//! One-time query classification.
//!
//! The classification runs once per query and is shared by extraction and
//! aggregation so their prompts stay mutually consistent. Any failure in
//! the classifier (call error, malformed JSON, missing fields) falls back
//! to a fixed "general" classification and never blocks the pipeline.

use llm_service::CompletionProvider;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::prompts;

/// Closed set of query intents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryType {
    Sentencing,
    Bail,
    Evidence,
    Procedure,
    Definition,
    Precedent,
    Factors,
    General,
}

impl QueryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryType::Sentencing => "sentencing",
            QueryType::Bail => "bail",
            QueryType::Evidence => "evidence",
            QueryType::Procedure => "procedure",
            QueryType::Definition => "definition",
            QueryType::Precedent => "precedent",
            QueryType::Factors => "factors",
            QueryType::General => "general",
        }
    }

    /// Unknown names collapse to `General`.
    fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "sentencing" => QueryType::Sentencing,
            "bail" => QueryType::Bail,
            "evidence" => QueryType::Evidence,
            "procedure" => QueryType::Procedure,
            "definition" => QueryType::Definition,
            "precedent" => QueryType::Precedent,
            "factors" => QueryType::Factors,
            _ => QueryType::General,
        }
    }
}

/// Structured judgment about one user query.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QueryClassification {
    pub query_type: QueryType,
    /// 0..=1.
    pub confidence: f32,
    pub reasoning: String,
    /// Ordered topical focus areas for extraction prompts.
    pub focus_areas: Vec<String>,
    /// Ordered section headers for the final response.
    pub response_sections: Vec<String>,
}

impl QueryClassification {
    /// Fixed fallback used whenever classification cannot be trusted.
    pub fn general_fallback(confidence: f32, reasoning: &str) -> Self {
        Self {
            query_type: QueryType::General,
            confidence,
            reasoning: reasoning.to_string(),
            focus_areas: vec![
                "legal analysis".into(),
                "case law".into(),
                "precedents".into(),
            ],
            response_sections: vec![
                "Direct Answer".into(),
                "Legal Analysis".into(),
                "Cases Referenced".into(),
            ],
        }
    }
}

/// Wire shape of the classifier's JSON. All fields required; missing ones
/// invalidate the response and trigger the fallback.
#[derive(Debug, Deserialize)]
struct RawClassification {
    query_type: String,
    confidence: f32,
    reasoning: String,
    focus_areas: Vec<String>,
    response_sections: Vec<String>,
}

/// Classifies `query`, degrading to the general fallback on any failure.
pub async fn classify_query(llm: &dyn CompletionProvider, query: &str) -> QueryClassification {
    info!("classifying query: {:.100}...", query);
    let prompt = prompts::classification_prompt(query);

    match llm.complete(&prompt).await {
        Ok(response) => match parse_classification(&response) {
            Some(classification) => {
                info!(
                    "query classified as '{}' with confidence {:.2}",
                    classification.query_type.as_str(),
                    classification.confidence
                );
                classification
            }
            None => {
                warn!("failed to parse classification response: {response}");
                QueryClassification::general_fallback(
                    0.5,
                    "Classification parsing failed, using general approach",
                )
            }
        },
        Err(e) => {
            error!("error in query classification: {e}");
            QueryClassification::general_fallback(
                0.3,
                "Classification agent failed, using general approach",
            )
        }
    }
}

/// Extracts the first `{...}` block from the response and deserializes it.
fn parse_classification(response: &str) -> Option<QueryClassification> {
    let json_re = Regex::new(r"(?s)\{.*\}").expect("valid json extraction pattern");
    let raw: RawClassification = serde_json::from_str(json_re.find(response)?.as_str()).ok()?;
    Some(QueryClassification {
        query_type: QueryType::parse(&raw.query_type),
        confidence: raw.confidence,
        reasoning: raw.reasoning,
        focus_areas: raw.focus_areas,
        response_sections: raw.response_sections,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeLlm;

    #[tokio::test]
    async fn well_formed_response_is_parsed() {
        let llm = FakeLlm::returning(
            r#"Here is my analysis:
{
    "query_type": "bail",
    "confidence": 0.92,
    "reasoning": "Asks about release conditions",
    "focus_areas": ["release conditions", "detention grounds"],
    "response_sections": ["Direct Answer", "Conditions", "Cases Referenced"]
}"#,
        );
        let c = classify_query(&llm, "what are typical bail conditions?").await;
        assert_eq!(c.query_type, QueryType::Bail);
        assert!((c.confidence - 0.92).abs() < 1e-6);
        assert_eq!(c.focus_areas.len(), 2);
    }

    #[tokio::test]
    async fn malformed_json_falls_back() {
        let llm = FakeLlm::returning("I think this is about bail but no JSON here");
        let c = classify_query(&llm, "bail?").await;
        assert_eq!(c.query_type, QueryType::General);
        assert!((c.confidence - 0.5).abs() < 1e-6);
        assert!(c.reasoning.contains("parsing failed"));
    }

    #[tokio::test]
    async fn missing_fields_fall_back() {
        let llm = FakeLlm::returning(r#"{"query_type": "bail", "confidence": 0.9}"#);
        let c = classify_query(&llm, "bail?").await;
        assert_eq!(c.query_type, QueryType::General);
    }

    #[tokio::test]
    async fn call_failure_falls_back() {
        let llm = FakeLlm::failing("provider down");
        let c = classify_query(&llm, "bail?").await;
        assert_eq!(c.query_type, QueryType::General);
        assert!((c.confidence - 0.3).abs() < 1e-6);
        assert!(c.reasoning.contains("agent failed"));
    }

    #[tokio::test]
    async fn unknown_query_type_collapses_to_general() {
        let llm = FakeLlm::returning(
            r#"{"query_type": "astrology", "confidence": 0.8, "reasoning": "r",
                "focus_areas": ["a"], "response_sections": ["s"]}"#,
        );
        let c = classify_query(&llm, "q").await;
        assert_eq!(c.query_type, QueryType::General);
        // The rest of the payload is still honored.
        assert!((c.confidence - 0.8).abs() < 1e-6);
    }
}
