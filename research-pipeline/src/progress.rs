//! Progress tracking for the online query flow.
//!
//! A shared, mutex-guarded snapshot that transports (web, chat) can poll.
//! Constructed per pipeline and injected into stages; there is no
//! process-wide tracker. Every transition also emits a `tracing` event.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Instant;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use tracing::info;

/// Per-document reading status during extraction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Pending,
    Reading,
    Completed,
    Error,
}

/// Pollable snapshot of the current session.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ProgressSnapshot {
    pub query: String,
    pub stage: String,
    pub status: String,
    pub current_activity: String,
    pub documents_found: usize,
    pub pruning_completed: usize,
    pub pruning_total: usize,
    pub completed_readings: usize,
    pub total_readings: usize,
    pub document_status: BTreeMap<String, DocumentStatus>,
    pub stages_completed: Vec<String>,
    /// RFC3339 UTC session start.
    pub start_time: String,
    pub elapsed_secs: f64,
    pub finished: bool,
    pub succeeded: bool,
}

struct Inner {
    snapshot: ProgressSnapshot,
    started: Option<Instant>,
}

/// Mutex-guarded progress state shared across concurrent stage tasks.
pub struct ProgressTracker {
    inner: Mutex<Inner>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                snapshot: ProgressSnapshot::default(),
                started: None,
            }),
        }
    }

    /// Begins a new session for `query`, clearing prior state.
    pub fn start_session(&self, query: &str) {
        let mut inner = self.lock();
        inner.snapshot = ProgressSnapshot {
            query: query.to_string(),
            stage: "started".into(),
            status: "Research started".into(),
            current_activity: "Starting research process".into(),
            start_time: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            ..ProgressSnapshot::default()
        };
        inner.started = Some(Instant::now());
        info!("started progress session for query: {:.50}...", query);
    }

    /// Moves to a new stage, marking the previous one completed.
    pub fn update_stage(&self, stage: &str, status: &str, activity: &str) {
        let mut inner = self.lock();
        let previous = inner.snapshot.stage.clone();
        if !previous.is_empty()
            && previous != "started"
            && !inner.snapshot.stages_completed.contains(&previous)
        {
            inner.snapshot.stages_completed.push(previous);
        }
        inner.snapshot.stage = stage.to_string();
        inner.snapshot.status = status.to_string();
        inner.snapshot.current_activity = if activity.is_empty() {
            status.to_string()
        } else {
            activity.to_string()
        };
        Self::touch(&mut inner);
        info!("stage updated: {stage} - {status}");
    }

    pub fn update_retrieval(&self, documents_found: usize) {
        let mut inner = self.lock();
        inner.snapshot.documents_found = documents_found;
        inner.snapshot.current_activity = format!("Found {documents_found} relevant documents");
        Self::touch(&mut inner);
        info!("retrieval updated: {documents_found} documents found");
    }

    pub fn update_pruning(&self, completed: usize, total: usize) {
        let mut inner = self.lock();
        inner.snapshot.pruning_completed = completed;
        inner.snapshot.pruning_total = total;
        Self::touch(&mut inner);
    }

    /// Registers the reading set; every document starts `pending`.
    pub fn update_reading_start(&self, documents: &[String]) {
        let mut inner = self.lock();
        inner.snapshot.total_readings = documents.len();
        inner.snapshot.completed_readings = 0;
        inner.snapshot.document_status = documents
            .iter()
            .map(|d| (d.clone(), DocumentStatus::Pending))
            .collect();
        Self::touch(&mut inner);
    }

    pub fn update_document_status(&self, document: &str, status: DocumentStatus) {
        let mut inner = self.lock();
        inner
            .snapshot
            .document_status
            .insert(document.to_string(), status);
        Self::touch(&mut inner);
        info!("document {document}: {status:?}");
    }

    pub fn increment_reading(&self, document: &str) {
        let mut inner = self.lock();
        inner.snapshot.completed_readings += 1;
        let done = inner.snapshot.completed_readings;
        let total = inner.snapshot.total_readings;
        inner.snapshot.current_activity = format!("Read {done}/{total} documents");
        Self::touch(&mut inner);
        info!("reading progress: {done}/{total} ({document})");
    }

    /// Marks the session finished.
    pub fn complete_session(&self, succeeded: bool, message: &str) {
        let mut inner = self.lock();
        inner.snapshot.finished = true;
        inner.snapshot.succeeded = succeeded;
        inner.snapshot.status = message.to_string();
        Self::touch(&mut inner);
        info!("session complete (success={succeeded}): {message}");
    }

    /// Current state, cloned out of the lock.
    pub fn snapshot(&self) -> ProgressSnapshot {
        let mut inner = self.lock();
        Self::touch(&mut inner);
        inner.snapshot.clone()
    }

    fn touch(inner: &mut Inner) {
        if let Some(started) = inner.started {
            inner.snapshot.elapsed_secs = started.elapsed().as_secs_f64();
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("progress tracker poisoned")
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}
