//! Legal case file parsing and directory processing.
//!
//! Case files carry a delimited metadata header followed by the judgment
//! body:
//!
//! ```text
//! ======================================================================
//! SUPREME COURT OF PAKISTAN JUDGMENT
//! ======================================================================
//!
//! Case No: C.P.L.A.379-L/2021
//! Case Title: Ch. Bashir Ahmad v. Qamar Aftab, etc
//! ...
//! ======================================================================
//!
//! [1] The judgment body starts here...
//! ```
//!
//! Header lines are case-insensitive `Key: Value` pairs; the second
//! separator line ends the header. Everything after it is the body.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::errors::CorpusError;

/// Structured metadata extracted from a case file header.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CaseMetadata {
    pub case_no: Option<String>,
    pub case_title: Option<String>,
    pub case_subject: Option<String>,
    pub author_judge: Option<String>,
    pub judgment_date: Option<String>,
    pub upload_date: Option<String>,
    /// Reported citations; `N/A` in the header normalizes to `None`.
    pub citations: Option<String>,
    pub sc_citations: Option<String>,
    pub pdf_url: Option<String>,
    /// Derived from `judgment_date` (or `upload_date` as fallback).
    pub year: Option<String>,
    pub court: String,
}

impl CaseMetadata {
    /// Flattens set fields into a string map for index payloads.
    pub fn to_payload(&self) -> BTreeMap<String, String> {
        let mut out = BTreeMap::new();
        let pairs = [
            ("case_no", &self.case_no),
            ("case_title", &self.case_title),
            ("case_subject", &self.case_subject),
            ("author_judge", &self.author_judge),
            ("judgment_date", &self.judgment_date),
            ("upload_date", &self.upload_date),
            ("citations", &self.citations),
            ("sc_citations", &self.sc_citations),
            ("pdf_url", &self.pdf_url),
            ("year", &self.year),
        ];
        for (key, value) in pairs {
            if let Some(v) = value {
                out.insert(key.to_string(), v.clone());
            }
        }
        out.insert("court".to_string(), self.court.clone());
        out
    }
}

/// A parsed legal case document. Read-only after construction.
#[derive(Clone, Debug)]
pub struct CaseDocument {
    pub file_path: PathBuf,
    pub file_name: String,
    /// Byte length of the raw file.
    pub file_size: usize,
    /// Judgment body (text after the metadata header).
    pub content: String,
    pub metadata: CaseMetadata,
}

/// Parser for case files and corpus directories.
pub struct CaseProcessor {
    year_re: Regex,
}

impl CaseProcessor {
    pub fn new() -> Self {
        Self {
            year_re: Regex::new(r"20\d{2}").expect("valid year pattern"),
        }
    }

    /// Splits a raw file into `(metadata, body)`.
    ///
    /// The header ends at the second long `====` separator; without two
    /// separators the whole text is treated as body.
    pub fn extract_metadata(&self, text: &str) -> (CaseMetadata, String) {
        let lines: Vec<&str> = text.split('\n').collect();
        let mut metadata = CaseMetadata::default();
        let mut content_start_idx = 0usize;
        let mut in_metadata_section = false;
        let mut separator_count = 0usize;

        for (i, line) in lines.iter().enumerate() {
            let stripped = line.trim();

            if stripped.starts_with('=') && stripped.len() > 30 {
                separator_count += 1;
                if separator_count >= 2 {
                    content_start_idx = i + 1;
                    break;
                }
                in_metadata_section = true;
                continue;
            }

            let upper = stripped.to_uppercase();
            if upper.contains("SUPREME COURT") || upper.contains("PAKISTAN") {
                continue;
            }
            if stripped.is_empty() {
                continue;
            }

            if in_metadata_section {
                if let Some((key, value)) = stripped.split_once(':') {
                    apply_header_field(&mut metadata, key.trim(), value.trim());
                }
            }
        }

        let content = if content_start_idx > 0 {
            lines[content_start_idx..].join("\n").trim().to_string()
        } else {
            text.to_string()
        };

        metadata.year = [
            metadata.judgment_date.as_deref(),
            metadata.upload_date.as_deref(),
        ]
        .into_iter()
        .flatten()
        .find_map(|d| self.year_re.find(d).map(|m| m.as_str().to_string()));
        metadata.court = "Supreme Court of Pakistan".to_string();

        debug!("extracted metadata for case {:?}", metadata.case_no);
        (metadata, content)
    }

    /// Reads and parses a single case file.
    ///
    /// # Errors
    /// Returns `CorpusError::Io` if the file cannot be read.
    pub fn process_file(&self, file_path: &Path) -> Result<CaseDocument, CorpusError> {
        let full_text = std::fs::read_to_string(file_path)?;
        let (metadata, content) = self.extract_metadata(&full_text);

        Ok(CaseDocument {
            file_path: file_path.to_path_buf(),
            file_name: file_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            file_size: full_text.len(),
            content,
            metadata,
        })
    }

    /// Parses every `.txt` file under `directory` (recursively).
    ///
    /// Unreadable files are logged and skipped; they never abort the batch.
    ///
    /// # Errors
    /// Returns `CorpusError::DirectoryNotFound` if the directory is missing.
    pub fn process_directory(&self, directory: &Path) -> Result<Vec<CaseDocument>, CorpusError> {
        if !directory.exists() {
            return Err(CorpusError::DirectoryNotFound(
                directory.display().to_string(),
            ));
        }

        let mut documents = Vec::new();
        for entry in WalkDir::new(directory).into_iter().filter_map(Result::ok) {
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("txt") {
                continue;
            }
            match self.process_file(path) {
                Ok(doc) => documents.push(doc),
                Err(e) => warn!("skipping unreadable file {:?}: {e}", path),
            }
        }

        info!(
            "processed {} files from {:?}",
            documents.len(),
            directory
        );
        Ok(documents)
    }

    /// Heuristic check that a document looks like a real judgment:
    /// required header fields, a date, substantial body text, and at least
    /// one legal-vocabulary indicator.
    pub fn validate_case_format(&self, doc: &CaseDocument) -> bool {
        const LEGAL_INDICATORS: &[&str] = &[
            "court",
            "judgment",
            "justice",
            "appellant",
            "respondent",
            "section",
            "supreme court",
            "pakistan",
            "petitioner",
            "appeal",
            "constitution",
            "honourable",
        ];

        let has_required_fields = doc.metadata.case_no.is_some();
        let has_date =
            doc.metadata.judgment_date.is_some() || doc.metadata.upload_date.is_some();
        let has_content = doc.content.trim().len() > 100;

        let lower = doc.content.to_lowercase();
        let has_legal_content = LEGAL_INDICATORS.iter().any(|ind| lower.contains(ind));

        let is_valid = has_required_fields && has_date && has_content && has_legal_content;
        if !is_valid {
            warn!(
                "file {} failed case-format validation (fields={} date={} content={} legal={})",
                doc.file_name, has_required_fields, has_date, has_content, has_legal_content
            );
        }
        is_valid
    }
}

impl Default for CaseProcessor {
    fn default() -> Self {
        Self::new()
    }
}

/// Maps one header line onto the matching metadata field.
/// Key matching is case-insensitive and tolerant of `_`/space variants.
fn apply_header_field(metadata: &mut CaseMetadata, key: &str, value: &str) {
    let key_lower = key.to_lowercase().replace('_', " ");
    let value = value.to_string();

    if key_lower.contains("case no") {
        metadata.case_no = Some(value);
    } else if key_lower.contains("case title") {
        metadata.case_title = Some(value);
    } else if key_lower.contains("subject") {
        metadata.case_subject = Some(value);
    } else if key_lower.contains("judge") {
        metadata.author_judge = Some(value);
    } else if key_lower.contains("judgment date") {
        metadata.judgment_date = Some(value);
    } else if key_lower.contains("upload date") {
        metadata.upload_date = Some(value);
    } else if key_lower.contains("sc citation") {
        metadata.sc_citations = normalize_na(value);
    } else if key_lower.contains("citation") {
        metadata.citations = normalize_na(value);
    } else if key_lower.contains("pdf url") {
        metadata.pdf_url = Some(value);
    }
}

/// `N/A` (any case) counts as absent.
fn normalize_na(value: String) -> Option<String> {
    if value.eq_ignore_ascii_case("n/a") {
        None
    } else {
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
======================================================================
SUPREME COURT OF PAKISTAN JUDGMENT
======================================================================

Case No: C.P.L.A.379-L/2021
Case Title: Ch. Bashir Ahmad v. Qamar Aftab, etc
Subject: Rent/Ejectment
Judge: Mr. Justice Muhammad Shafi Siddiqui
Judgment Date: 18-09-2025
Upload Date: 04-10-2025
Citations: N/A
SC Citations: 2025 SCP 101
PDF URL: https://www.supremecourt.gov.pk/downloads_judgements/test.pdf

======================================================================

[1] This appeal arises out of ejectment proceedings before the Rent
Controller. The petitioner challenges the concurrent findings below.
";

    #[test]
    fn header_fields_parsed() {
        let processor = CaseProcessor::new();
        let (meta, content) = processor.extract_metadata(SAMPLE);

        assert_eq!(meta.case_no.as_deref(), Some("C.P.L.A.379-L/2021"));
        assert_eq!(
            meta.case_title.as_deref(),
            Some("Ch. Bashir Ahmad v. Qamar Aftab, etc")
        );
        assert_eq!(meta.case_subject.as_deref(), Some("Rent/Ejectment"));
        assert_eq!(
            meta.author_judge.as_deref(),
            Some("Mr. Justice Muhammad Shafi Siddiqui")
        );
        assert_eq!(meta.judgment_date.as_deref(), Some("18-09-2025"));
        assert_eq!(meta.year.as_deref(), Some("2025"));
        assert_eq!(meta.court, "Supreme Court of Pakistan");
        assert!(content.starts_with("[1] This appeal"));
    }

    #[test]
    fn na_citations_become_none() {
        let processor = CaseProcessor::new();
        let (meta, _) = processor.extract_metadata(SAMPLE);
        assert_eq!(meta.citations, None);
        assert_eq!(meta.sc_citations.as_deref(), Some("2025 SCP 101"));
    }

    #[test]
    fn missing_separators_fall_back_to_whole_text() {
        let processor = CaseProcessor::new();
        let raw = "[1] Plain judgment body with no header at all.";
        let (meta, content) = processor.extract_metadata(raw);
        assert_eq!(meta.case_no, None);
        assert_eq!(content, raw);
    }

    #[test]
    fn payload_contains_only_set_fields() {
        let processor = CaseProcessor::new();
        let (meta, _) = processor.extract_metadata(SAMPLE);
        let payload = meta.to_payload();
        assert_eq!(payload.get("case_no").map(String::as_str), Some("C.P.L.A.379-L/2021"));
        assert!(!payload.contains_key("citations"));
        assert_eq!(
            payload.get("court").map(String::as_str),
            Some("Supreme Court of Pakistan")
        );
    }

    #[test]
    fn validation_requires_legal_content() {
        let processor = CaseProcessor::new();
        let (metadata, content) = processor.extract_metadata(SAMPLE);
        let doc = CaseDocument {
            file_path: PathBuf::from("sample.txt"),
            file_name: "sample.txt".into(),
            file_size: SAMPLE.len(),
            content: content.repeat(3),
            metadata,
        };
        assert!(processor.validate_case_format(&doc));

        let mut invalid = doc.clone();
        invalid.content = "short".into();
        assert!(!processor.validate_case_format(&invalid));
    }
}
