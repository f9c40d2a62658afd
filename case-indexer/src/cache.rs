//! Content-hash cache manifest for the vector index.
//!
//! Re-indexing a corpus is expensive, so the indexer fingerprints every
//! document (size + streamed SHA-256) and persists the snapshot as JSON.
//! Before the next build, `has_changes` compares a fresh manifest against
//! the persisted one and names the condition that makes the index stale.
//! Content hashes are authoritative; filesystem timestamps are recorded but
//! only consulted when hashing is disabled.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::errors::CorpusError;

/// Fingerprint of one corpus file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub size: u64,
    /// Modification time in seconds since the epoch. Informational unless
    /// hashing is turned off.
    pub modified: f64,
    /// Lowercase hex SHA-256 of the file bytes; empty when hashing failed
    /// or was skipped.
    pub hash: String,
    pub name: String,
}

/// Full corpus snapshot keyed by file path.
pub type Manifest = BTreeMap<String, ManifestEntry>;

/// Manages the persisted manifest and answers "did the corpus change?".
pub struct CacheManager {
    cache_file: PathBuf,
}

impl CacheManager {
    pub fn new(cache_file: impl Into<PathBuf>) -> Self {
        Self {
            cache_file: cache_file.into(),
        }
    }

    /// Path of the persisted manifest file.
    pub fn cache_file(&self) -> &Path {
        &self.cache_file
    }

    /// Streamed SHA-256 of a file, reading in 8 KiB blocks so large
    /// judgments do not load into memory at once.
    fn file_hash(path: &Path) -> Result<String, std::io::Error> {
        let mut file = std::fs::File::open(path)?;
        let mut hasher = Sha256::new();
        let mut buf = [0u8; 8192];
        loop {
            let n = file.read(&mut buf)?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
        Ok(format!("{:x}", hasher.finalize()))
    }

    /// Walks `documents_dir` and fingerprints every `.txt` file.
    ///
    /// A file that cannot be statted is logged and skipped; a file that
    /// cannot be hashed gets an empty hash, which forces it to compare as
    /// modified on the next check. Neither aborts the walk.
    pub fn generate_manifest(&self, documents_dir: &Path, use_hash: bool) -> Manifest {
        let mut manifest = Manifest::new();

        if !documents_dir.exists() {
            warn!("documents directory not found: {:?}", documents_dir);
            return manifest;
        }

        let mut file_count = 0usize;
        for entry in WalkDir::new(documents_dir).into_iter().filter_map(Result::ok) {
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("txt") {
                continue;
            }

            let meta = match entry.metadata() {
                Ok(m) => m,
                Err(e) => {
                    warn!("could not stat {:?}: {e}", path);
                    continue;
                }
            };
            let modified = meta
                .modified()
                .ok()
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map(|d| d.as_secs_f64())
                .unwrap_or(0.0);

            let hash = if use_hash {
                match Self::file_hash(path) {
                    Ok(h) => h,
                    Err(e) => {
                        warn!("could not hash file {:?}: {e}", path);
                        String::new()
                    }
                }
            } else {
                String::new()
            };

            manifest.insert(
                path.display().to_string(),
                ManifestEntry {
                    size: meta.len(),
                    modified,
                    hash,
                    name: entry.file_name().to_string_lossy().into_owned(),
                },
            );
            file_count += 1;
            if file_count % 100 == 0 {
                info!("generated manifest for {file_count} files...");
            }
        }

        info!("generated manifest for {file_count} files");
        manifest
    }

    /// Loads the persisted manifest; empty on first run or unreadable file.
    pub fn load_cached_manifest(&self) -> Manifest {
        if !self.cache_file.exists() {
            return Manifest::new();
        }
        match std::fs::read_to_string(&self.cache_file)
            .map_err(CorpusError::from)
            .and_then(|data| serde_json::from_str(&data).map_err(CorpusError::from))
        {
            Ok(manifest) => manifest,
            Err(e) => {
                warn!("could not load cache manifest: {e}");
                Manifest::new()
            }
        }
    }

    /// Persists the manifest atomically (temp file + rename), so a crashed
    /// build never leaves a half-written snapshot behind.
    pub fn save_manifest(&self, manifest: &Manifest) -> Result<(), CorpusError> {
        if let Some(dir) = self.cache_file.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let tmp = self.cache_file.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(manifest)?;
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.cache_file)?;

        info!("saved cache manifest with {} files", manifest.len());
        Ok(())
    }

    /// Decides whether the corpus changed since the last successful build.
    ///
    /// Returns `(changed, reason)`; the reason names the triggering
    /// condition. `quick_check` compares only file counts (fast path that
    /// accepts false negatives); otherwise paths, sizes, and hashes (or
    /// mtimes when `use_hash` is off) are compared.
    pub fn has_changes(
        &self,
        documents_dir: &Path,
        use_hash: bool,
        quick_check: bool,
    ) -> (bool, String) {
        let cached = self.load_cached_manifest();

        if cached.is_empty() {
            return (true, "No cache found - first time indexing".to_string());
        }

        if quick_check {
            let current = self.generate_manifest(documents_dir, false);
            if current.len() != cached.len() {
                return (
                    true,
                    format!("Number of files changed: {} -> {}", cached.len(), current.len()),
                );
            }
            return (false, "Quick check passed - assuming no changes".to_string());
        }

        info!("checking for document changes...");
        let current = self.generate_manifest(documents_dir, use_hash);

        if current.len() != cached.len() {
            return (
                true,
                format!("Number of files changed: {} -> {}", cached.len(), current.len()),
            );
        }

        let added: Vec<&String> = current.keys().filter(|k| !cached.contains_key(*k)).collect();
        if !added.is_empty() {
            return (true, format!("Added files: {} new file(s)", added.len()));
        }

        let removed: Vec<&String> = cached.keys().filter(|k| !current.contains_key(*k)).collect();
        if !removed.is_empty() {
            return (true, format!("Removed files: {} file(s) deleted", removed.len()));
        }

        let mut modified = 0usize;
        for (path, current_info) in &current {
            let Some(cached_info) = cached.get(path) else {
                continue;
            };
            if current_info.size != cached_info.size {
                modified += 1;
                continue;
            }
            if use_hash {
                if current_info.hash != cached_info.hash {
                    modified += 1;
                }
            } else if current_info.modified != cached_info.modified {
                modified += 1;
            }
        }
        if modified > 0 {
            return (true, format!("Modified files: {modified} file(s) changed"));
        }

        debug!("no changes detected in {} files", current.len());
        (false, "No changes detected".to_string())
    }

    /// Regenerates and persists the manifest. Call only after a successful
    /// index build.
    pub fn update_cache(&self, documents_dir: &Path, use_hash: bool) -> Result<(), CorpusError> {
        info!("updating cache manifest...");
        let manifest = self.generate_manifest(documents_dir, use_hash);
        self.save_manifest(&manifest)?;
        info!("cache updated with {} files", manifest.len());
        Ok(())
    }
}
