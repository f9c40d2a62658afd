//! Ingestion pipeline: resolve vectors → upsert into Qdrant in batches.
//!
//! The batch ceiling comes from `IndexConfig::upsert_batch`; callers hand
//! over the full record list and subdivision happens here.

use crate::config::IndexConfig;
use crate::embed::EmbeddingsProvider;
use crate::errors::IndexError;
use crate::qdrant_facade::QdrantFacade;
use crate::record::{ChunkRecord, stable_point_uuid};

use indicatif::{ProgressBar, ProgressStyle};
use qdrant_client::qdrant::{
    ListValue, PointId, PointStruct, Struct, Value as QValue, Vector, Vectors, value, vectors,
};
use std::collections::HashMap;
use tracing::{debug, info};

/// Embeds and upserts `records` in `upsert_batch`-sized batches.
///
/// Returns the number of records written. Sequential across batches; the
/// backing store enforces a hard per-call ceiling, so no batch-level
/// concurrency is attempted.
///
/// # Errors
/// Embedding and store errors propagate uncaught; retries belong to the
/// orchestrating stage.
pub async fn add_documents(
    cfg: &IndexConfig,
    client: &QdrantFacade,
    records: Vec<ChunkRecord>,
    provider: &dyn EmbeddingsProvider,
) -> Result<usize, IndexError> {
    if records.is_empty() {
        debug!("no records to ingest");
        return Ok(0);
    }

    client.ensure_collection(cfg.embedding_dim).await?;

    let batch_size = cfg.upsert_batch.max(1);
    let total_batches = records.len().div_ceil(batch_size);
    info!(
        "ingesting {} records in {} batch(es) of up to {}",
        records.len(),
        total_batches,
        batch_size
    );

    let pb = ProgressBar::new(total_batches as u64);
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ({eta})",
        )
        .expect("valid progress template")
        .progress_chars("##-"),
    );

    let mut total = 0usize;
    for batch in records.chunks(batch_size) {
        let points = build_points(cfg, batch, provider).await?;
        total += client.upsert_points(points).await?;
        pb.inc(1);
    }
    pb.finish_and_clear();

    info!("ingested {total} records");
    Ok(total)
}

/// Builds Qdrant points for one batch. Embeddings come from the provider;
/// payload carries the chunk text, the logical id (`eid`), and all metadata
/// fields.
async fn build_points(
    cfg: &IndexConfig,
    batch: &[ChunkRecord],
    provider: &dyn EmbeddingsProvider,
) -> Result<Vec<PointStruct>, IndexError> {
    let mut points = Vec::with_capacity(batch.len());

    for record in batch {
        let vector = provider.embed(&record.text).await?;
        if vector.len() != cfg.embedding_dim {
            return Err(IndexError::VectorSizeMismatch {
                got: vector.len(),
                want: cfg.embedding_dim,
            });
        }

        let mut payload: HashMap<String, QValue> = HashMap::new();
        payload.insert("text".into(), qstring(&record.text));
        payload.insert("eid".into(), qstring(&record.id));
        for (key, value) in &record.payload {
            payload.insert(key.clone(), json_to_qvalue(value.clone()));
        }

        let pid: PointId = stable_point_uuid(&record.id).to_string().into();
        let vectors = Vectors {
            vectors_options: Some(vectors::VectorsOptions::Vector(Vector {
                data: vector,
                indices: None,
                vectors_count: None,
                vector: None,
            })),
        };

        points.push(PointStruct {
            id: Some(pid),
            payload,
            vectors: Some(vectors),
            ..Default::default()
        });
    }

    Ok(points)
}

/// Wraps a string into a Qdrant `Value`.
fn qstring(s: &str) -> QValue {
    QValue {
        kind: Some(value::Kind::StringValue(s.to_string())),
    }
}

/// Converts `serde_json::Value` into a Qdrant `Value` (handles
/// arrays/objects).
fn json_to_qvalue(v: serde_json::Value) -> QValue {
    use value::Kind as K;
    match v {
        serde_json::Value::String(s) => QValue {
            kind: Some(K::StringValue(s)),
        },
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                QValue {
                    kind: Some(K::IntegerValue(i)),
                }
            } else if let Some(f) = n.as_f64() {
                QValue {
                    kind: Some(K::DoubleValue(f)),
                }
            } else {
                QValue {
                    kind: Some(K::StringValue(n.to_string())),
                }
            }
        }
        serde_json::Value::Bool(b) => QValue {
            kind: Some(K::BoolValue(b)),
        },
        serde_json::Value::Array(arr) => {
            let values: Vec<QValue> = arr.into_iter().map(json_to_qvalue).collect();
            QValue {
                kind: Some(K::ListValue(ListValue { values })),
            }
        }
        serde_json::Value::Object(map) => {
            let fields = map
                .into_iter()
                .map(|(k, v)| (k, json_to_qvalue(v)))
                .collect();
            QValue {
                kind: Some(K::StructValue(Struct { fields })),
            }
        }
        serde_json::Value::Null => QValue { kind: None },
    }
}
