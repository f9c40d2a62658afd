//! Offline indexing flow: cache gate -> parse -> chunk -> ingest -> cache
//! update.
//!
//! The content-hash manifest decides whether any work happens at all. A
//! rebuild always goes through a collection reset so ids from removed
//! documents cannot linger; the manifest is persisted only after the build
//! succeeds.

use std::collections::BTreeMap;

use case_indexer::{CacheManager, CaseDocument, CaseProcessor, LegalTextChunker};
use rag_index::{ChunkRecord, VectorIndex};
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::errors::PipelineError;

/// Outcome of one indexing attempt.
#[derive(Debug)]
pub struct IndexReport {
    /// True when the cache check showed nothing to do.
    pub skipped: bool,
    /// The cache check's reason string.
    pub reason: String,
    pub documents: usize,
    pub chunks_indexed: usize,
}

/// Builds the vector index if (and only if) the corpus changed since the
/// last successful build.
///
/// # Errors
/// - directory-not-found and manifest write failures surface as
///   [`PipelineError::Corpus`]
/// - index/embedding failures surface as [`PipelineError::Index`]
pub async fn index_corpus(
    index: &VectorIndex,
    cfg: &PipelineConfig,
) -> Result<IndexReport, PipelineError> {
    let cache = CacheManager::new(&cfg.cache_manifest_path);
    let (changed, reason) = cache.has_changes(&cfg.documents_dir, cfg.use_content_hash, false);

    if !changed && index.collection_exists().await? {
        info!("index is up to date: {reason}");
        return Ok(IndexReport {
            skipped: true,
            reason,
            documents: 0,
            chunks_indexed: 0,
        });
    }
    info!("re-indexing corpus: {reason}");

    let processor = CaseProcessor::new();
    let documents = processor.process_directory(&cfg.documents_dir)?;
    for doc in &documents {
        if !processor.validate_case_format(doc) {
            warn!("file may not be properly formatted: {}", doc.file_name);
        }
    }

    let chunker = LegalTextChunker::new(cfg.chunking.clone());
    let records = build_records(&documents, &chunker);
    info!(
        "prepared {} chunk records from {} documents",
        records.len(),
        documents.len()
    );

    index.reset_collection().await?;
    let chunks_indexed = index.add_documents(records).await?;
    cache.update_cache(&cfg.documents_dir, cfg.use_content_hash)?;

    info!("successfully indexed {chunks_indexed} chunks");
    Ok(IndexReport {
        skipped: false,
        reason,
        documents: documents.len(),
        chunks_indexed,
    })
}

/// Chunks every document body and assembles index records. Record ids are
/// `{file_name}_{chunk_index}`; payloads carry the document metadata plus
/// the chunk metadata.
pub fn build_records(documents: &[CaseDocument], chunker: &LegalTextChunker) -> Vec<ChunkRecord> {
    let mut records = Vec::new();
    for doc in documents {
        for chunk in chunker.create_chunks(&doc.content) {
            let mut payload: BTreeMap<String, Value> = doc
                .metadata
                .to_payload()
                .into_iter()
                .map(|(k, v)| (k, Value::String(v)))
                .collect();
            payload.insert("file_name".into(), json!(doc.file_name));
            payload.insert("file_path".into(), json!(doc.file_path.display().to_string()));
            payload.insert("chunk_index".into(), json!(chunk.metadata.chunk_index));
            payload.insert("chunk_count".into(), json!(chunk.metadata.chunk_count));
            payload.insert("chunk_strategy".into(), json!(chunk.metadata.chunk_strategy));
            payload.insert("chunk_size".into(), json!(chunk.metadata.chunk_size));
            if let Some(range) = &chunk.metadata.paragraph_range {
                payload.insert("paragraph_range".into(), json!(range));
            }

            records.push(ChunkRecord {
                id: ChunkRecord::record_id(&doc.file_name, chunk.metadata.chunk_index),
                text: chunk.text,
                payload,
            });
        }
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use case_indexer::ChunkingConfig;
    use std::path::PathBuf;

    fn doc(file_name: &str, content: &str) -> CaseDocument {
        let processor = CaseProcessor::new();
        let (metadata, _) = processor.extract_metadata("");
        CaseDocument {
            file_path: PathBuf::from(format!("/corpus/{file_name}")),
            file_name: file_name.to_string(),
            file_size: content.len(),
            content: content.to_string(),
            metadata,
        }
    }

    #[test]
    fn record_ids_follow_file_and_index() {
        let chunker = LegalTextChunker::new(ChunkingConfig {
            overlap_size: 0,
            ..ChunkingConfig::default()
        });
        let documents = vec![
            doc("a.txt", "Header\n[1] First paragraph.\n[2] Second paragraph."),
            doc("b.txt", "Header\n[1] Only paragraph."),
        ];

        let records = build_records(&documents, &chunker);
        assert!(records.len() >= 4);
        assert_eq!(records[0].id, "a.txt_0");
        assert_eq!(records[1].id, "a.txt_1");
        let b_first = records.iter().find(|r| r.id == "b.txt_0");
        assert!(b_first.is_some());

        // Ids are unique across the corpus.
        let mut ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), records.len());
    }

    #[test]
    fn payload_carries_chunk_and_document_fields() {
        let chunker = LegalTextChunker::new(ChunkingConfig {
            overlap_size: 0,
            ..ChunkingConfig::default()
        });
        let documents = vec![doc("a.txt", "Header\n[1] First.\n[2] Second.")];
        let records = build_records(&documents, &chunker);

        let record = &records[1];
        assert_eq!(record.payload["file_name"], json!("a.txt"));
        assert_eq!(record.payload["chunk_index"], json!(1));
        assert_eq!(record.payload["chunk_strategy"], json!("legal_paragraphs"));
        assert_eq!(
            record.payload["court"],
            json!("Supreme Court of Pakistan")
        );
    }

    #[test]
    fn empty_bodies_produce_no_records() {
        let chunker = LegalTextChunker::new(ChunkingConfig::default());
        let documents = vec![doc("empty.txt", "   ")];
        assert!(build_records(&documents, &chunker).is_empty());
    }
}
