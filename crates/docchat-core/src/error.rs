use thiserror::Error;

use crate::types::FileType;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("Error reading {file_type}: {message}")]
    Extraction { file_type: FileType, message: String },

    #[error("Error generating embeddings: {0}")]
    Embedding(String),

    #[error("Error generating response: {0}")]
    Generation(String),

    #[error("Failed to generate embeddings: no vectors produced")]
    EmptyEmbeddings,

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Got {vectors} vectors for {chunks} chunks")]
    LengthMismatch { vectors: usize, chunks: usize },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Corrupt index artifact: {0}")]
    Persist(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("No content could be extracted from the uploaded files")]
    NoContent,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
