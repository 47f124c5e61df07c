use chrono::Utc;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::debug;

use crate::types::{Chunk, FileType};

static WHITESPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace pattern"));
static DISALLOWED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s.,!?;:()\-]").expect("valid allow-list pattern"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum chunk length in characters.
    pub chunk_size: usize,
    /// Characters shared by consecutive chunks.
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { chunk_size: 1000, overlap: 200 }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Chunker {
    config: ChunkingConfig,
}

impl Chunker {
    pub fn new(config: ChunkingConfig) -> Self { Self { config } }

    pub fn config(&self) -> &ChunkingConfig { &self.config }

    /// Split `text` into overlapping chunks. Pure function of its input.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        chunk_text(text, &self.config)
    }

    /// Chunk one extracted document and attach per-chunk metadata.
    pub fn chunk_document(&self, text: &str, source: &str, file_type: FileType) -> Vec<Chunk> {
        let created_at = Utc::now();
        let chunks: Vec<Chunk> = self
            .chunk(text)
            .into_iter()
            .enumerate()
            .map(|(i, t)| Chunk::new(t, source, i, file_type, created_at))
            .collect();
        debug!(source, chunks = chunks.len(), "chunked document");
        chunks
    }
}

/// Collapse whitespace and drop characters outside the allow-list.
///
/// A whitespace run that contains a newline becomes one `\n`, any other run
/// one space. Kept characters are word characters, whitespace and `.,!?;:()-`.
pub fn clean_text(text: &str) -> String {
    let collapsed = WHITESPACE_RUN.replace_all(text, |caps: &Captures| {
        if caps[0].contains('\n') { "\n" } else { " " }
    });
    DISALLOWED.replace_all(&collapsed, "").trim().to_string()
}

pub fn chunk_text(text: &str, config: &ChunkingConfig) -> Vec<String> {
    let cleaned = clean_text(text);
    if cleaned.is_empty() { return Vec::new(); }

    let chars: Vec<char> = cleaned.chars().collect();
    let len = chars.len();
    let size = config.chunk_size.max(1);
    if len <= size { return vec![cleaned]; }

    let mut chunks = Vec::new();
    let mut start = 0usize;
    while start < len {
        let mut end = start + size;
        if end < len {
            end = find_boundary(&chars, start, end, start + size / 2).unwrap_or(end);
        }
        let piece: String = chars[start..end.min(len)].iter().collect();
        let piece = piece.trim();
        if !piece.is_empty() { chunks.push(piece.to_string()); }
        // `end` is not clamped here: the next window starts `overlap` before the
        // nominal cut, so a final window longer than `chunk_size - overlap`
        // leaves a short tail chunk. Always move forward, even with an overlap
        // as large as the window.
        let next = end.saturating_sub(config.overlap);
        start = if next > start { next } else { end };
    }
    chunks
}

/// Best cut position in `chars[start..end]`: after the last period, else after
/// the last newline, else at the last space. A candidate only counts when it
/// lies past `min_pos`.
fn find_boundary(chars: &[char], start: usize, end: usize, min_pos: usize) -> Option<usize> {
    let last = |needle: char| {
        chars[start..end]
            .iter()
            .rposition(|&c| c == needle)
            .map(|i| start + i)
            .filter(|&pos| pos > min_pos)
    };
    last('.')
        .map(|p| p + 1)
        .or_else(|| last('\n').map(|p| p + 1))
        .or_else(|| last(' '))
}
