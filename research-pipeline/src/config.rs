//! Pipeline configuration.

use std::path::PathBuf;

use case_indexer::ChunkingConfig;

/// Knobs for the offline indexing flow and the online query flow.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Directory of legal case `.txt` files.
    pub documents_dir: PathBuf,
    /// Where the content-hash manifest is persisted.
    pub cache_manifest_path: PathBuf,
    /// Chunker settings used during indexing.
    pub chunking: ChunkingConfig,
    /// Cap on retrieved chunks per query.
    pub max_results: usize,
    /// Minimum normalized similarity a chunk must clear.
    pub similarity_threshold: f32,
    /// Concurrent pruning judgments in flight.
    pub max_parallel_pruning: usize,
    /// Concurrent document extractions in flight.
    pub max_parallel_reading: usize,
    /// Use content hashes (not just sizes/mtimes) for change detection.
    pub use_content_hash: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            documents_dir: PathBuf::from("assets/data"),
            cache_manifest_path: PathBuf::from("index_data/.cache_manifest.json"),
            chunking: ChunkingConfig::default(),
            max_results: 100,
            similarity_threshold: 0.01,
            max_parallel_pruning: 10,
            max_parallel_reading: 10,
            use_content_hash: true,
        }
    }
}

impl PipelineConfig {
    /// Reads overridable settings from environment variables.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(dir) = std::env::var("DOCUMENTS_DIR") {
            cfg.documents_dir = PathBuf::from(dir);
        }
        if let Ok(path) = std::env::var("CACHE_MANIFEST_PATH") {
            cfg.cache_manifest_path = PathBuf::from(path);
        }
        if let Some(n) = env_usize("MAX_RESULTS") {
            cfg.max_results = n;
        }
        if let Some(t) = env_f32("SIMILARITY_THRESHOLD") {
            cfg.similarity_threshold = t;
        }
        if let Some(n) = env_usize("MAX_PARALLEL_PRUNING") {
            cfg.max_parallel_pruning = n;
        }
        if let Some(n) = env_usize("MAX_PARALLEL_READING") {
            cfg.max_parallel_reading = n;
        }
        cfg
    }
}

fn env_usize(name: &str) -> Option<usize> {
    std::env::var(name).ok().and_then(|s| s.parse().ok())
}

fn env_f32(name: &str) -> Option<f32> {
    std::env::var(name).ok().and_then(|s| s.parse().ok())
}
