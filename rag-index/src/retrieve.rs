//! Retrieval: embed a query, search the collection, normalize hits.

use crate::embed::EmbeddingsProvider;
use crate::errors::IndexError;
use crate::qdrant_facade::QdrantFacade;
use crate::record::SearchHit;

use tracing::{debug, info};

/// Embeds `query` and returns up to `n_results` hits whose similarity score
/// clears `similarity_threshold`, in descending score order.
///
/// An empty collection (or nothing above the threshold) yields an empty
/// list, not an error.
///
/// # Errors
/// Embedding and store errors propagate uncaught.
pub async fn search(
    client: &QdrantFacade,
    provider: &dyn EmbeddingsProvider,
    query: &str,
    n_results: usize,
    similarity_threshold: f32,
) -> Result<Vec<SearchHit>, IndexError> {
    let query_vector = provider.embed(query).await?;

    let raw = client
        .search(query_vector, n_results as u64, Some(similarity_threshold))
        .await?;

    let mut hits = Vec::with_capacity(raw.len());
    for (score, payload) in raw {
        let text = payload
            .get("text")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        let id = payload
            .get("eid")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        hits.push(SearchHit {
            score,
            text,
            id,
            payload,
        });
    }

    info!(
        "found {} chunks above similarity threshold {similarity_threshold}",
        hits.len()
    );
    debug!("top score: {:?}", hits.first().map(|h| h.score));
    Ok(hits)
}
