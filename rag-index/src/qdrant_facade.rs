//! Thin adapter around `qdrant-client` to isolate API usage.
//!
//! This facade concentrates all Qdrant interactions behind a minimal API,
//! hiding the verbose builder pattern and keeping the rest of the crate
//! decoupled from `qdrant-client`.

use crate::config::{DistanceKind, IndexConfig};
use crate::errors::IndexError;

use qdrant_client::Qdrant;
use qdrant_client::qdrant::{
    CreateCollectionBuilder, Distance, PointStruct, SearchPointsBuilder, UpsertPointsBuilder,
    Value as QValue, VectorParamsBuilder,
};
use tracing::{debug, info, warn};

/// A facade over the Qdrant client.
///
/// Encapsulates the underlying client, the target collection name, and the
/// distance function of the vector space.
pub struct QdrantFacade {
    client: Qdrant,
    collection: String,
    distance: DistanceKind,
}

impl QdrantFacade {
    /// Creates a new facade from the given configuration.
    ///
    /// # Errors
    /// Returns `IndexError::Config` on invalid config and
    /// `IndexError::Qdrant` if the client cannot be built.
    pub fn new(cfg: &IndexConfig) -> Result<Self, IndexError> {
        cfg.validate()?;

        let mut builder = Qdrant::from_url(&cfg.qdrant_url);
        if let Some(key) = &cfg.qdrant_api_key {
            builder = builder.api_key(key.clone());
        }
        let client = builder
            .build()
            .map_err(|e| IndexError::Qdrant(e.to_string()))?;

        Ok(Self {
            client,
            collection: cfg.collection.clone(),
            distance: cfg.distance,
        })
    }

    fn distance(&self) -> Distance {
        match self.distance {
            DistanceKind::Cosine => Distance::Cosine,
            DistanceKind::Dot => Distance::Dot,
            DistanceKind::Euclid => Distance::Euclid,
        }
    }

    /// Ensures the collection exists: no-op when present, created with the
    /// given dimensionality when missing.
    pub async fn ensure_collection(&self, dim: usize) -> Result<(), IndexError> {
        match self.client.collection_info(&self.collection).await {
            Ok(_) => {
                debug!("collection '{}' already exists", self.collection);
                return Ok(());
            }
            Err(err) => {
                warn!(
                    "collection '{}' not found, will be created (error={err})",
                    self.collection
                );
            }
        }

        self.client
            .create_collection(
                CreateCollectionBuilder::new(&self.collection)
                    .vectors_config(VectorParamsBuilder::new(dim as u64, self.distance())),
            )
            .await
            .map_err(|e| IndexError::Qdrant(e.to_string()))?;

        info!("collection '{}' created", self.collection);
        Ok(())
    }

    /// Drops the collection (if present) and creates a fresh one.
    ///
    /// Re-indexing goes through here so stale ids from removed documents
    /// cannot survive a rebuild.
    pub async fn reset_collection(&self, dim: usize) -> Result<(), IndexError> {
        // Best-effort delete: ignore "not found" to keep this idempotent.
        let _ = self.client.delete_collection(&self.collection).await;

        self.client
            .create_collection(
                CreateCollectionBuilder::new(&self.collection)
                    .vectors_config(VectorParamsBuilder::new(dim as u64, self.distance())),
            )
            .await
            .map_err(|e| IndexError::Qdrant(e.to_string()))?;

        info!("collection '{}' reset", self.collection);
        Ok(())
    }

    /// Upserts a batch of points. Returns the number submitted.
    pub async fn upsert_points(&self, points: Vec<PointStruct>) -> Result<usize, IndexError> {
        if points.is_empty() {
            debug!("no points provided for upsert");
            return Ok(0);
        }

        let count = points.len();
        info!(
            "upserting {count} points into collection '{}'",
            self.collection
        );

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, points))
            .await
            .map_err(|e| IndexError::Qdrant(e.to_string()))?;

        Ok(count)
    }

    /// Similarity search returning `(score, payload)` tuples sorted by
    /// descending score. When `score_threshold` is set, Qdrant drops hits
    /// below it server-side.
    pub async fn search(
        &self,
        vector: Vec<f32>,
        limit: u64,
        score_threshold: Option<f32>,
    ) -> Result<Vec<(f32, serde_json::Value)>, IndexError> {
        debug!(
            "searching '{}' with limit={limit} threshold={score_threshold:?}",
            self.collection
        );

        let mut builder =
            SearchPointsBuilder::new(&self.collection, vector, limit).with_payload(true);
        if let Some(t) = score_threshold {
            builder = builder.score_threshold(t);
        }

        let res = self
            .client
            .search_points(builder)
            .await
            .map_err(|e| IndexError::Qdrant(e.to_string()))?;

        let mut out = Vec::with_capacity(res.result.len());
        for point in res.result {
            let payload = qpayload_to_json(point.payload);
            out.push((point.score, payload));
        }

        debug!("search completed: {} hits returned", out.len());
        Ok(out)
    }

    /// Number of points in the collection; zero when it does not exist.
    pub async fn point_count(&self) -> Result<u64, IndexError> {
        match self.client.collection_info(&self.collection).await {
            Ok(info) => Ok(info.result.and_then(|r| r.points_count).unwrap_or(0)),
            Err(_) => Ok(0),
        }
    }
}

/// Converts a Qdrant payload into JSON. Unsupported nested kinds map to
/// `Null`.
fn qpayload_to_json(mut p: std::collections::HashMap<String, QValue>) -> serde_json::Value {
    use qdrant_client::qdrant::value::Kind as K;
    let mut m = serde_json::Map::new();
    for (k, v) in p.drain() {
        let j = match v.kind {
            Some(K::StringValue(s)) => serde_json::Value::String(s),
            Some(K::IntegerValue(i)) => serde_json::Value::Number(i.into()),
            Some(K::DoubleValue(f)) => serde_json::json!(f),
            Some(K::BoolValue(b)) => serde_json::Value::Bool(b),
            None => serde_json::Value::Null,
            _ => serde_json::Value::Null,
        };
        m.insert(k, j);
    }
    serde_json::Value::Object(m)
}
