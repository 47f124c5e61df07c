//! Domain types shared by the extractor, the vector store and the chat layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// Upload formats the extractor knows how to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Pdf,
    Docx,
    Txt,
}

impl FileType {
    /// Resolve the type from an extension tag such as `"PDF"` or `"txt"`.
    pub fn from_extension(ext: &str) -> Result<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Ok(FileType::Pdf),
            "docx" => Ok(FileType::Docx),
            "txt" => Ok(FileType::Txt),
            other => Err(Error::UnsupportedFileType(other.to_string())),
        }
    }

    /// Resolve the type from an uploaded file name. Only the text after the
    /// last `.` matters; there is no content sniffing.
    pub fn from_file_name(name: &str) -> Result<Self> {
        let ext = name.rsplit('.').next().unwrap_or(name);
        Self::from_extension(ext)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Pdf => "pdf",
            FileType::Docx => "docx",
            FileType::Txt => "txt",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str().to_ascii_uppercase())
    }
}

/// Metadata stored next to every indexed chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub source: String,
    pub chunk_index: usize,
    pub file_type: FileType,
    pub created_at: DateTime<Utc>,
}

/// A slice of one document's normalized text; the unit of retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub metadata: ChunkMetadata,
}

impl Chunk {
    pub fn new(text: String, source: &str, chunk_index: usize, file_type: FileType, created_at: DateTime<Utc>) -> Self {
        Self {
            text,
            metadata: ChunkMetadata { source: source.to_string(), chunk_index, file_type, created_at },
        }
    }

    pub fn source_file(&self) -> &str { &self.metadata.source }
}

/// One retrieval hit. `similarity` is `1 / (1 + distance)`, so it lies in
/// `(0, 1]` and only orders results; it is not a calibrated confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub text: String,
    pub similarity: f32,
    pub metadata: ChunkMetadata,
}

impl QueryResult {
    pub fn source(&self) -> &str { &self.metadata.source }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<String>>,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into(), sources: None }
    }

    pub fn assistant(content: impl Into<String>, sources: Option<Vec<String>>) -> Self {
        Self { role: Role::Assistant, content: content.into(), sources }
    }
}

/// Store counters. `total_chunks` and `index_size` are always equal; both are
/// reported so a reader can check that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub total_chunks: usize,
    pub index_size: usize,
    pub dimension: usize,
}
