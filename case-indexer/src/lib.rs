//! Corpus access for legal case documents.
//!
//! This crate covers everything that happens before vectors exist:
//! - Parsing judgment files (delimited metadata header + numbered body)
//! - Walking the documents directory
//! - The content-hash cache manifest that gates re-indexing
//! - Paragraph-aware chunking of judgment bodies

pub mod cache;
pub mod chunking;
pub mod corpus;
mod errors;

pub use cache::{CacheManager, Manifest, ManifestEntry};
pub use chunking::{Chunk, ChunkMetadata, ChunkingConfig, ChunkingStrategy, LegalTextChunker};
pub use corpus::{CaseDocument, CaseMetadata, CaseProcessor};
pub use errors::CorpusError;
