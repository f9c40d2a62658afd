//! Runtime and collection configuration.

use crate::errors::IndexError;

/// Distance function used for the vector space.
#[derive(Clone, Copy, Debug)]
pub enum DistanceKind {
    /// Cosine distance (recommended for most embeddings).
    Cosine,
    /// Dot product (useful for normalized vectors).
    Dot,
    /// Euclidean distance (L2).
    Euclid,
}

/// Configuration for index ingestion and retrieval.
#[derive(Clone, Debug)]
pub struct IndexConfig {
    /// Qdrant gRPC endpoint, e.g. `http://localhost:6334`.
    pub qdrant_url: String,
    /// Optional API key for Qdrant Cloud.
    pub qdrant_api_key: Option<String>,
    /// Target collection name.
    pub collection: String,
    /// Distance function (Cosine by default).
    pub distance: DistanceKind,
    /// Upsert batch ceiling. Ingestion subdivides inserts at this size; the
    /// backing store rejects larger calls, so the ceiling lives here rather
    /// than at call sites.
    pub upsert_batch: usize,
    /// Expected embedding dimensionality.
    pub embedding_dim: usize,
}

impl IndexConfig {
    /// Creates a sane default config for a given collection name and
    /// Qdrant endpoint.
    pub fn new_default(url: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            qdrant_url: url.into(),
            qdrant_api_key: None,
            collection: collection.into(),
            distance: DistanceKind::Cosine,
            upsert_batch: 256,
            embedding_dim: 1536,
        }
    }

    /// Reads the config from environment variables, falling back to the
    /// defaults above.
    pub fn from_env() -> Self {
        let url = std::env::var("QDRANT_URL").unwrap_or_else(|_| "http://localhost:6334".into());
        let collection =
            std::env::var("LEGAL_COLLECTION").unwrap_or_else(|_| "legal_cases".into());
        let mut cfg = Self::new_default(url, collection);
        cfg.qdrant_api_key = std::env::var("QDRANT_API_KEY").ok().filter(|s| !s.is_empty());
        if let Some(batch) = env_usize("INDEX_UPSERT_BATCH") {
            cfg.upsert_batch = batch;
        }
        if let Some(dim) = env_usize("EMBEDDING_DIM") {
            cfg.embedding_dim = dim;
        }
        cfg
    }

    /// Validates config values.
    pub fn validate(&self) -> Result<(), IndexError> {
        if self.qdrant_url.trim().is_empty() {
            return Err(IndexError::Config("qdrant_url is empty".into()));
        }
        if self.collection.trim().is_empty() {
            return Err(IndexError::Config("collection is empty".into()));
        }
        if self.upsert_batch == 0 {
            return Err(IndexError::Config("upsert_batch must be > 0".into()));
        }
        if self.embedding_dim == 0 {
            return Err(IndexError::Config("embedding_dim must be > 0".into()));
        }
        Ok(())
    }
}

fn env_usize(name: &str) -> Option<usize> {
    std::env::var(name).ok().and_then(|s| s.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let cfg = IndexConfig::new_default("http://localhost:6334", "legal_cases");
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn zero_batch_is_rejected() {
        let mut cfg = IndexConfig::new_default("http://localhost:6334", "legal_cases");
        cfg.upsert_batch = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn empty_collection_is_rejected() {
        let cfg = IndexConfig::new_default("http://localhost:6334", "  ");
        assert!(cfg.validate().is_err());
    }
}
