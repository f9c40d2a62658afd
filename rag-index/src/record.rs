//! Core data models used by the library.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Canonical record stored in the collection.
///
/// The logical id is `{file_name}_{chunk_index}`; Qdrant point ids must be
/// UUIDs, so the logical id is also kept in the payload (key `eid`) and
/// mapped deterministically via [`stable_point_uuid`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub payload: BTreeMap<String, Value>,
}

impl ChunkRecord {
    /// Builds the logical record id for a chunk of a document.
    pub fn record_id(file_name: &str, chunk_index: usize) -> String {
        format!("{file_name}_{chunk_index}")
    }
}

/// A single retrieval hit with similarity score, text, and payload.
#[derive(Clone, Debug)]
pub struct SearchHit {
    /// Normalized similarity score, guaranteed >= the caller's threshold.
    pub score: f32,
    pub text: String,
    /// Logical record id (`{file_name}_{chunk_index}`).
    pub id: String,
    pub payload: Value,
}

impl SearchHit {
    /// Convenience accessor for a string payload field.
    pub fn payload_str(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(|v| v.as_str())
    }

    /// Owning document file name, when present in the payload.
    pub fn file_name(&self) -> Option<&str> {
        self.payload_str("file_name")
    }
}

/// Deterministic UUIDv5 for a logical record id. Re-indexing the same
/// document yields the same point id, so stale entries are overwritten
/// instead of duplicated.
pub fn stable_point_uuid(id: &str) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_URL, id.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_id_format() {
        assert_eq!(ChunkRecord::record_id("case_001.txt", 4), "case_001.txt_4");
    }

    #[test]
    fn point_uuid_is_stable() {
        let a = stable_point_uuid("case_001.txt_0");
        let b = stable_point_uuid("case_001.txt_0");
        let c = stable_point_uuid("case_001.txt_1");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn hit_exposes_owning_document() {
        let hit = SearchHit {
            score: 0.8,
            text: "[1] text".into(),
            id: "case_001.txt_0".into(),
            payload: serde_json::json!({"file_name": "case_001.txt"}),
        };
        assert_eq!(hit.file_name(), Some("case_001.txt"));
    }
}
