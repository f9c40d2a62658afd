//! Vector index for legal case chunks over Qdrant.
//!
//! This crate provides a clean API to:
//! - Ingest chunk records in bounded batches with on-the-fly embeddings
//! - Answer similarity queries filtered by a score floor
//!
//! The design is flat and splits responsibilities into focused modules.

mod config;
mod embed;
mod errors;
mod ingest;
mod qdrant_facade;
mod record;
mod retrieve;

pub use config::{DistanceKind, IndexConfig};
pub use embed::{EmbeddingsProvider, noop_embedder::NoopEmbedder, openai::OpenAiEmbedder,
    openai::OpenAiEmbedderConfig};
pub use errors::IndexError;
pub use record::{ChunkRecord, SearchHit, stable_point_uuid};

use std::sync::Arc;
use tracing::{debug, trace};

/// Collection statistics snapshot.
#[derive(Clone, Debug)]
pub struct CollectionStats {
    pub total_documents: u64,
    pub collection_name: String,
}

/// High-level facade wiring configuration, Qdrant client, and the
/// embedding provider. Single entry point for application code.
pub struct VectorIndex {
    cfg: IndexConfig,
    client: qdrant_facade::QdrantFacade,
    provider: Arc<dyn EmbeddingsProvider>,
}

impl VectorIndex {
    /// Constructs a new index from configuration and an embedding provider.
    ///
    /// # Errors
    /// Returns `IndexError::Config` if client initialization fails.
    pub fn new(cfg: IndexConfig, provider: Arc<dyn EmbeddingsProvider>) -> Result<Self, IndexError> {
        trace!("VectorIndex::new collection={}", cfg.collection);
        let client = qdrant_facade::QdrantFacade::new(&cfg)?;
        Ok(Self {
            cfg,
            client,
            provider,
        })
    }

    pub fn config(&self) -> &IndexConfig {
        &self.cfg
    }

    /// Idempotent: opens the named collection or creates an empty one.
    pub async fn ensure_collection(&self) -> Result<(), IndexError> {
        self.client.ensure_collection(self.cfg.embedding_dim).await
    }

    /// Drops and recreates the collection for a full rebuild.
    pub async fn reset_collection(&self) -> Result<(), IndexError> {
        self.client.reset_collection(self.cfg.embedding_dim).await
    }

    /// Inserts chunk records, subdividing into `upsert_batch`-sized
    /// upserts. Duplicate logical ids map to the same point id and
    /// overwrite silently.
    ///
    /// # Errors
    /// Embedding or store failures propagate; no retry at this layer.
    pub async fn add_documents(&self, records: Vec<ChunkRecord>) -> Result<usize, IndexError> {
        debug!("VectorIndex::add_documents n={}", records.len());
        ingest::add_documents(&self.cfg, &self.client, records, self.provider.as_ref()).await
    }

    /// Similarity search with a score floor; see [`retrieve::search`].
    pub async fn search(
        &self,
        query: &str,
        n_results: usize,
        similarity_threshold: f32,
    ) -> Result<Vec<SearchHit>, IndexError> {
        trace!("VectorIndex::search n_results={n_results} threshold={similarity_threshold}");
        retrieve::search(
            &self.client,
            self.provider.as_ref(),
            query,
            n_results,
            similarity_threshold,
        )
        .await
    }

    /// Current collection statistics.
    pub async fn collection_stats(&self) -> Result<CollectionStats, IndexError> {
        let total_documents = self.client.point_count().await?;
        Ok(CollectionStats {
            total_documents,
            collection_name: self.cfg.collection.clone(),
        })
    }

    /// True only if the collection exists **and** holds at least one
    /// record. An existing-but-empty index counts as absent for
    /// cache-validity purposes.
    pub async fn collection_exists(&self) -> Result<bool, IndexError> {
        Ok(self.client.point_count().await? > 0)
    }
}
