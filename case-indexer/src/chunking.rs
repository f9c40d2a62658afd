//! Paragraph-aware chunking of judgment bodies.
//!
//! Legal citations and reasoning anchor to numbered paragraphs ("[12]"), so
//! splitting must not sever a paragraph mid-thought when avoidable. The
//! splitter works in priority order:
//!
//! 1. numbered legal paragraphs (`[1]`, `[2]`, ...), re-attaching each
//!    number to its text;
//! 2. section headings (Roman numerals, `Word:` and `ALL CAPS:` headers);
//! 3. raw character windows snapped to word boundaries.
//!
//! After grouping, every chunk except the first is prefixed with the tail of
//! its predecessor for context continuity; that prefix is trimmed to a
//! paragraph boundary when one falls inside the overlap window.

use regex::Regex;
use tracing::{debug, info};

/// How paragraphs that exceed the chunk size are treated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChunkingStrategy {
    /// Never split an individual numbered paragraph, even past the size
    /// target. Favors legal coherence over uniform chunks.
    PreserveParagraphs,
    /// Split only paragraphs that individually exceed the chunk size,
    /// preferring sentence boundaries.
    SplitLargeParagraphs,
}

impl ChunkingStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkingStrategy::PreserveParagraphs => "preserve_paragraphs",
            ChunkingStrategy::SplitLargeParagraphs => "split_large_paragraphs",
        }
    }
}

/// Chunker configuration.
#[derive(Clone, Debug)]
pub struct ChunkingConfig {
    /// Target maximum chunk length in characters.
    pub chunk_size: usize,
    /// Trailing characters of one chunk copied into the next.
    pub overlap_size: usize,
    pub strategy: ChunkingStrategy,
    /// Prefer sentence boundaries when splitting inside a paragraph.
    pub split_on_sentences: bool,
    /// Re-attach the originating paragraph number, suffixed "(cont.)", to
    /// continuation fragments.
    pub preserve_paragraph_numbers: bool,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 800,
            overlap_size: 150,
            strategy: ChunkingStrategy::PreserveParagraphs,
            split_on_sentences: true,
            preserve_paragraph_numbers: true,
        }
    }
}

/// Per-chunk metadata record.
#[derive(Clone, Debug, PartialEq)]
pub struct ChunkMetadata {
    pub chunk_index: usize,
    pub chunk_count: usize,
    pub chunk_strategy: &'static str,
    /// Actual stored length (overlap included).
    pub chunk_size: usize,
    /// `"[3]"` or `"[3]-[7]"` when paragraph markers occur in the text.
    pub paragraph_range: Option<String>,
}

/// One retrieval-sized slice of a document body.
#[derive(Clone, Debug)]
pub struct Chunk {
    pub text: String,
    pub metadata: ChunkMetadata,
}

/// Splits one document body into bounded, overlapping chunks.
pub struct LegalTextChunker {
    cfg: ChunkingConfig,
    para_split_re: Regex,
    para_num_re: Regex,
    leading_num_re: Regex,
    para_boundary_re: Regex,
    sentence_re: Regex,
    section_res: Vec<Regex>,
}

impl LegalTextChunker {
    pub fn new(cfg: ChunkingConfig) -> Self {
        info!(
            "initialized chunker: size={}, overlap={}, strategy={}",
            cfg.chunk_size,
            cfg.overlap_size,
            cfg.strategy.as_str()
        );
        Self {
            cfg,
            para_split_re: Regex::new(r"\n\s*\[\d+\]\s*").expect("paragraph split pattern"),
            para_num_re: Regex::new(r"\[\d+\]").expect("paragraph number pattern"),
            leading_num_re: Regex::new(r"^\[\d+\]\s*").expect("leading number pattern"),
            para_boundary_re: Regex::new(r"\n\s*\[\d+\]").expect("paragraph boundary pattern"),
            sentence_re: Regex::new(r"[.!?]\s+").expect("sentence pattern"),
            section_res: vec![
                // Roman numerals: I. Introduction, II. Facts
                Regex::new(r"\n[IVX]+\.\s+[A-Z][^\n]+").expect("roman section pattern"),
                // Single word headers: Introduction:, Facts:
                Regex::new(r"\n[A-Z][a-z]+:(?:\n|\s)").expect("word section pattern"),
                // All caps headers: FACTUAL CONTEXT:
                Regex::new(r"\n[A-Z][A-Z\s]+:(?:\n|\s)").expect("caps section pattern"),
            ],
        }
    }

    pub fn config(&self) -> &ChunkingConfig {
        &self.cfg
    }

    /// Creates chunks from a judgment body.
    ///
    /// Empty or whitespace-only input produces zero chunks.
    pub fn create_chunks(&self, text: &str) -> Vec<Chunk> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let paragraphs = self.split_by_legal_paragraphs(text);
        let (grouped, strategy_used): (Vec<String>, &'static str) = if paragraphs.len() > 1 {
            (self.group_paragraphs(paragraphs), "legal_paragraphs")
        } else {
            let sections = self.split_by_sections(text);
            if sections.len() > 1 {
                let mut grouped = Vec::new();
                for section in sections {
                    if section.len() <= self.cfg.chunk_size {
                        grouped.push(section);
                    } else {
                        grouped.extend(self.character_based_chunking(&section));
                    }
                }
                (grouped, "sections")
            } else {
                (self.character_based_chunking(text), "character")
            }
        };

        let final_chunks = self.add_overlap(grouped);
        let chunk_count = final_chunks.len();

        let chunks: Vec<Chunk> = final_chunks
            .into_iter()
            .enumerate()
            .map(|(chunk_index, text)| {
                let numbers: Vec<&str> = self
                    .para_num_re
                    .find_iter(&text)
                    .map(|m| m.as_str())
                    .collect();
                let paragraph_range = match numbers.as_slice() {
                    [] => None,
                    [only] => Some((*only).to_string()),
                    [first, .., last] => Some(format!("{first}-{last}")),
                };
                let chunk_size = text.len();
                Chunk {
                    text,
                    metadata: ChunkMetadata {
                        chunk_index,
                        chunk_count,
                        chunk_strategy: strategy_used,
                        chunk_size,
                        paragraph_range,
                    },
                }
            })
            .collect();

        debug!("created {} chunks using {} strategy", chunks.len(), strategy_used);
        chunks
    }

    /// Splits on numbered legal paragraphs, re-attaching each number to its
    /// text. Any header text before the first marker becomes its own unit.
    fn split_by_legal_paragraphs(&self, text: &str) -> Vec<String> {
        let matches: Vec<regex::Match> = self.para_split_re.find_iter(text).collect();

        let mut paragraphs = Vec::new();
        let first_start = matches.first().map(|m| m.start()).unwrap_or(text.len());
        let head = text[..first_start].trim();
        if !head.is_empty() {
            paragraphs.push(head.to_string());
        }

        for (i, m) in matches.iter().enumerate() {
            let content_end = matches.get(i + 1).map(|n| n.start()).unwrap_or(text.len());
            let number = m.as_str().trim();
            let body = text[m.end()..content_end].trim();
            let para = format!("{number} {body}").trim().to_string();
            if !para.is_empty() {
                paragraphs.push(para);
            }
        }
        paragraphs
    }

    /// Splits on heading-like patterns; the first pattern with any match
    /// wins. Without headers the whole text comes back as one section.
    fn split_by_sections(&self, text: &str) -> Vec<String> {
        for re in &self.section_res {
            let matches: Vec<regex::Match> = re.find_iter(text).collect();
            if matches.is_empty() {
                continue;
            }
            let mut sections = Vec::new();
            let mut last_end = 0usize;
            for m in &matches {
                if last_end < m.start() {
                    sections.push(text[last_end..m.start()].trim().to_string());
                }
                last_end = m.start();
            }
            sections.push(text[last_end..].trim().to_string());
            sections.retain(|s| !s.is_empty());
            return sections;
        }
        vec![text.to_string()]
    }

    /// Applies the configured strategy to the paragraph list.
    fn group_paragraphs(&self, paragraphs: Vec<String>) -> Vec<String> {
        match self.cfg.strategy {
            ChunkingStrategy::PreserveParagraphs => paragraphs,
            ChunkingStrategy::SplitLargeParagraphs => {
                let mut processed = Vec::new();
                for para in paragraphs {
                    if para.len() > self.cfg.chunk_size {
                        processed.extend(self.split_paragraph_fine_grained(&para));
                    } else {
                        processed.push(para);
                    }
                }
                processed
            }
        }
    }

    /// Splits one oversized paragraph into chunk-sized fragments at
    /// sentence boundaries, keeping the paragraph number with every
    /// fragment. A single sentence longer than the size target gets further
    /// word-boundary cuts so the size bound still holds.
    fn split_paragraph_fine_grained(&self, paragraph: &str) -> Vec<String> {
        if paragraph.len() <= self.cfg.chunk_size {
            return vec![paragraph.to_string()];
        }

        if !self.cfg.split_on_sentences {
            return self.character_based_chunking(paragraph);
        }

        let (para_num, content) = match self.leading_num_re.find(paragraph) {
            Some(m) => (paragraph[..m.end()].to_string(), &paragraph[m.end()..]),
            None => (String::new(), paragraph),
        };
        let cont_prefix = if self.cfg.preserve_paragraph_numbers {
            format!("{para_num}(cont.) ")
        } else {
            String::new()
        };
        let max_piece = self
            .cfg
            .chunk_size
            .saturating_sub(cont_prefix.len())
            .max(self.cfg.chunk_size / 2);

        let mut pieces: Vec<String> = Vec::new();
        for sentence in split_sentences(&self.sentence_re, content) {
            if sentence.len() > max_piece {
                pieces.extend(split_at_word_boundaries(sentence, max_piece));
            } else {
                pieces.push(sentence.to_string());
            }
        }

        let mut chunks = Vec::new();
        let mut current = para_num.clone();
        for piece in pieces {
            let sep = if !current.is_empty() && current != para_num {
                " "
            } else {
                ""
            };
            if current.len() + sep.len() + piece.len() <= self.cfg.chunk_size {
                current.push_str(sep);
                current.push_str(&piece);
            } else {
                if !current.is_empty() {
                    chunks.push(current);
                }
                current = format!("{cont_prefix}{piece}");
            }
        }
        if !current.is_empty() {
            chunks.push(current);
        }
        chunks
    }

    /// Sliding-window fallback. Cut points snap to the nearest whitespace
    /// within 100 characters so chunks never split mid-word; the window
    /// advances by `chunk_size - overlap_size`.
    fn character_based_chunking(&self, text: &str) -> Vec<String> {
        let chunk_size = self.cfg.chunk_size;
        let overlap = self.cfg.overlap_size;
        let bytes = text.as_bytes();

        let mut chunks = Vec::new();
        let mut start = 0usize;
        while start < text.len() {
            let end = start + chunk_size;
            if end >= text.len() {
                chunks.push(text[start..].to_string());
                break;
            }

            let mut chunk_end = floor_char_boundary(text, end);
            let lower = (start + chunk_size / 2).max(end.saturating_sub(100));
            let mut i = chunk_end;
            while i > lower {
                if bytes[i].is_ascii_whitespace() {
                    chunk_end = i;
                    break;
                }
                i -= 1;
            }

            chunks.push(text[start..chunk_end].to_string());
            let next = floor_char_boundary(text, chunk_end.saturating_sub(overlap));
            // Forward progress even under pathological overlap settings.
            start = if next > start { next } else { chunk_end };
        }
        chunks
    }

    /// Prefixes every chunk after the first with up to `overlap_size`
    /// trailing characters of its predecessor. If a paragraph marker falls
    /// inside that window, the prefix starts exactly at the marker so
    /// overlap never begins mid-paragraph.
    fn add_overlap(&self, chunks: Vec<String>) -> Vec<String> {
        if chunks.len() <= 1 || self.cfg.overlap_size == 0 {
            return chunks;
        }

        let mut overlapped = Vec::with_capacity(chunks.len());
        for (i, chunk) in chunks.iter().enumerate() {
            if i == 0 {
                overlapped.push(chunk.clone());
                continue;
            }
            let prev = &chunks[i - 1];
            let tail_start =
                floor_char_boundary(prev, prev.len().saturating_sub(self.cfg.overlap_size));
            let mut overlap_text = &prev[tail_start..];
            if let Some(m) = self.para_boundary_re.find(overlap_text) {
                overlap_text = &overlap_text[m.start()..];
            }
            overlapped.push(format!("{overlap_text}{chunk}"));
        }
        overlapped
    }
}

impl Default for LegalTextChunker {
    fn default() -> Self {
        Self::new(ChunkingConfig::default())
    }
}

/// Largest byte index `<= idx` that is a char boundary.
fn floor_char_boundary(s: &str, mut idx: usize) -> usize {
    if idx >= s.len() {
        return s.len();
    }
    while idx > 0 && !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

/// Splits `text` into sentences at `[.!?]` followed by whitespace. The
/// punctuation stays with the preceding sentence.
fn split_sentences<'a>(sentence_re: &Regex, text: &'a str) -> Vec<&'a str> {
    let mut out = Vec::new();
    let mut last = 0usize;
    for m in sentence_re.find_iter(text) {
        let punct_end = m.start() + 1;
        if punct_end > last {
            out.push(&text[last..punct_end]);
        }
        last = m.end();
    }
    if last < text.len() {
        out.push(&text[last..]);
    }
    out.retain(|s| !s.trim().is_empty());
    out
}

/// Cuts `text` into pieces of at most `limit` bytes, preferring whitespace
/// within 100 characters of the limit. No overlap between pieces.
fn split_at_word_boundaries(text: &str, limit: usize) -> Vec<String> {
    let bytes = text.as_bytes();
    let mut out = Vec::new();
    let mut start = 0usize;
    while start < text.len() {
        let end = start + limit;
        if end >= text.len() {
            out.push(text[start..].trim_start().to_string());
            break;
        }
        let mut cut = floor_char_boundary(text, end);
        let lower = (start + limit / 2).max(end.saturating_sub(100));
        let mut i = cut;
        while i > lower {
            if bytes[i].is_ascii_whitespace() {
                cut = i;
                break;
            }
            i -= 1;
        }
        if cut <= start {
            cut = floor_char_boundary(text, end).max(start + 1);
        }
        out.push(text[start..cut].trim_start().to_string());
        start = cut;
    }
    out.retain(|s| !s.is_empty());
    out
}
