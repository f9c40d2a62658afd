//! Prompt builders for the external completion calls.
//!
//! The pipeline only depends on the mechanical contract of each prompt
//! (JSON object for classification, leading YES/NO for pruning, section
//! structure for extraction and synthesis); the wording is kept compact.

use crate::classify::QueryClassification;

/// Classification: one JSON object, closed query-type set.
pub fn classification_prompt(query: &str) -> String {
    format!(
        r#"You are a legal research classification agent. Analyze the user's legal query and determine the primary legal area, what the user is seeking, and the most focused response structure.

USER QUERY: {query}

AVAILABLE QUERY TYPES:
- sentencing: penalties, sentences, punishment factors
- bail: release, detention, custody decisions
- evidence: admissibility, Charter violations, evidence law
- procedure: legal processes, motions, applications
- definition: definitions, elements, legal concepts
- precedent: case authority, binding precedents
- factors: criteria, considerations, tests used by courts
- general: broad questions requiring comprehensive analysis

RESPONSE FORMAT (JSON):
{{
    "query_type": "most_appropriate_type",
    "confidence": 0.95,
    "reasoning": "Brief explanation of why this classification fits",
    "focus_areas": ["key area 1", "key area 2", "key area 3"],
    "response_sections": ["section 1", "section 2", "section 3"]
}}

Respond with ONLY the JSON object:"#
    )
}

/// Pruning: YES/NO verdict over the chunks retrieved for one document.
pub fn pruning_prompt(query: &str, document_name: &str, combined_chunks: &str) -> String {
    format!(
        r#"You are a legal research assistant. Determine if a legal case document is relevant to a specific query based on the chunks retrieved from the vector database.

QUERY: {query}

DOCUMENT: {document_name}
RETRIEVED CHUNKS FROM VECTOR DATABASE:
{combined_chunks}

INSTRUCTIONS:
1. Analyze whether these retrieved chunks show that this case's content is STRICTLY RELEVANT to the query
2. Consider both direct relevance and indirect relevance (precedential value)
3. Respond with ONLY "YES" or "NO" followed by a brief one-line explanation

RESPONSE FORMAT:
YES/NO - [Brief explanation]

RESPONSE:"#
    )
}

/// Extraction: query-scoped summary of one full document, structured by
/// the shared classification.
pub fn extraction_prompt(
    query: &str,
    classification: &QueryClassification,
    document_name: &str,
    doc_content: &str,
) -> String {
    let focus_text = classification
        .focus_areas
        .iter()
        .map(|area| format!("- {area}"))
        .collect::<Vec<_>>()
        .join("\n");
    let mut response_format = classification
        .response_sections
        .iter()
        .map(|section| format!("**{section}:** [Content for {}]", section.to_lowercase()))
        .collect::<Vec<_>>()
        .join("\n");
    response_format.push_str("\n**Direct Quotes:** [Specific quotes with paragraph references]");

    format!(
        r#"You are a legal research assistant. Extract ONLY the information that directly answers the user's question from this legal case.

USER QUERY: {query}
LEGAL CASE: {document_name}
FULL CONTENT: {doc_content}

QUERY CLASSIFICATION: {reasoning}

INSTRUCTIONS:
1. Focus ONLY on information that directly answers the user's query
2. Be concise and targeted; include paragraph references and direct quotes where relevant
3. If the case does not address the query, clearly state that

FOCUS ON:
{focus_text}

RESPONSE FORMAT:
{response_format}

EXTRACTION:"#,
        reasoning = classification.reasoning,
    )
}

/// Synthesis: one answer over all summaries, structured by the shared
/// classification and required to reference every case.
pub fn aggregation_prompt(
    query: &str,
    classification: &QueryClassification,
    all_summaries: &str,
    available_citations: &str,
    num_cases: usize,
) -> String {
    let mut sections_text = String::new();
    for (i, section) in classification.response_sections.iter().enumerate() {
        if i == 0 {
            sections_text.push_str(&format!(
                "\n## {section}\n\n[Direct, concise answer based on ALL {num_cases} cases]\n"
            ));
        } else {
            sections_text.push_str(&format!(
                "\n## {section}\n\n[Content for {} synthesized from all relevant cases]\n",
                section.to_lowercase()
            ));
        }
    }
    sections_text.push_str(&format!(
        "\n## Cases Referenced\n[List ALL {num_cases} cases with brief relevance to the query]\n"
    ));

    format!(
        r#"You are a senior legal research assistant providing a focused response to a specific legal query. The response is rendered as markdown.

USER QUERY: {query}

QUERY ANALYSIS: {reasoning}

RELEVANT LEGAL CASES AND SUMMARIES ({num_cases} cases found):
{all_summaries}

AVAILABLE CASE CITATIONS:
{available_citations}

SYNTHESIS REQUIREMENT:
You MUST analyze and synthesize information from ALL {num_cases} cases provided above. Do NOT focus on just one case. If cases have different outcomes, explain the distinguishing factors.

FORMATTING INSTRUCTIONS:
1. Answer ONLY what the user asked
2. When citing cases, use ONLY the case citation format; do NOT include URLs
3. Ground ALL statements in the provided case law
4. If the cases do not address the query, clearly state that

FOCUS AREAS: {focus_areas}

RESPONSE STRUCTURE:
{sections_text}

RESPONSE:"#,
        reasoning = classification.reasoning,
        focus_areas = classification.focus_areas.join(", "),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extraction_prompt_reflects_classification() {
        let classification = QueryClassification::general_fallback(0.5, "reason");
        let prompt =
            extraction_prompt("bail conditions", &classification, "case.txt", "[1] body");
        assert!(prompt.contains("USER QUERY: bail conditions"));
        assert!(prompt.contains("- legal analysis"));
        assert!(prompt.contains("**Direct Answer:**"));
        assert!(prompt.contains("[1] body"));
    }

    #[test]
    fn aggregation_prompt_lists_sections_and_count() {
        let classification = QueryClassification::general_fallback(0.5, "reason");
        let prompt = aggregation_prompt("q", &classification, "SUMMARIES", "- R. v. X", 3);
        assert!(prompt.contains("ALL 3 cases"));
        assert!(prompt.contains("## Direct Answer"));
        assert!(prompt.contains("## Cases Referenced"));
        assert!(prompt.contains("- R. v. X"));
    }
}
