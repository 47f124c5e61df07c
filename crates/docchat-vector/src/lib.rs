//! In-memory vector store.
//!
//! Every entry keeps its vector, chunk text and metadata together, so the
//! offset returned by a search always points at the matching text. The store
//! is rebuilt from scratch for each upload batch; entries are never removed
//! one by one.
//!
//! The store has no interior locking. A caller that serves requests in
//! parallel must wrap it (e.g. `Arc<RwLock<VectorStore>>`) so that inserts
//! are exclusive and searches see a consistent snapshot.

pub mod persist;
pub mod search;

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

use docchat_core::error::{Error, Result};
use docchat_core::types::{Chunk, ChunkMetadata, QueryResult, StoreStats};
use docchat_embed::EmbeddingGateway;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub vector: Vec<f32>,
    pub text: String,
    pub metadata: ChunkMetadata,
}

pub struct VectorStore {
    gateway: EmbeddingGateway,
    dimension: usize,
    entries: Vec<IndexEntry>,
}

impl VectorStore {
    pub fn new(gateway: EmbeddingGateway) -> Self {
        let dimension = gateway.dim();
        Self { gateway, dimension, entries: Vec::new() }
    }

    pub fn dimension(&self) -> usize { self.dimension }

    pub fn len(&self) -> usize { self.entries.len() }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    pub fn entries(&self) -> &[IndexEntry] { &self.entries }

    /// Embed chunks as documents and append them.
    pub fn add_documents(&mut self, chunks: Vec<Chunk>) -> Result<usize> {
        let vectors = self.embed_chunks(&chunks)?;
        self.insert(vectors, chunks)
    }

    /// Replace the whole store with `chunks`. Embedding happens first, so a
    /// failed batch leaves the previous contents in place.
    pub fn rebuild(&mut self, chunks: Vec<Chunk>) -> Result<usize> {
        let vectors = self.embed_chunks(&chunks)?;
        let previous = std::mem::take(&mut self.entries);
        match self.insert(vectors, chunks) {
            Ok(added) => Ok(added),
            Err(err) => {
                self.entries = previous;
                Err(err)
            }
        }
    }

    fn embed_chunks(&self, chunks: &[Chunk]) -> Result<Vec<Vec<f32>>> {
        if chunks.is_empty() {
            return Err(Error::NoContent);
        }
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        self.gateway.embed_documents(&texts).map_err(|e| {
            let err = Error::Embedding(format!("{:#}", e));
            warn!("{}", err);
            err
        })
    }

    /// Append pre-computed vectors with their chunks, in order.
    ///
    /// Rejects an empty vector set, a count mismatch, or any vector whose
    /// length differs from the store dimension. Nothing is appended on error.
    pub fn insert(&mut self, vectors: Vec<Vec<f32>>, chunks: Vec<Chunk>) -> Result<usize> {
        if vectors.is_empty() {
            return Err(Error::EmptyEmbeddings);
        }
        if vectors.len() != chunks.len() {
            return Err(Error::LengthMismatch { vectors: vectors.len(), chunks: chunks.len() });
        }
        if let Some(bad) = vectors.iter().find(|v| v.len() != self.dimension) {
            return Err(Error::DimensionMismatch { expected: self.dimension, actual: bad.len() });
        }

        let added = vectors.len();
        self.entries.extend(
            vectors
                .into_iter()
                .zip(chunks)
                .map(|(vector, chunk)| IndexEntry { vector, text: chunk.text, metadata: chunk.metadata }),
        );
        info!(added, total = self.entries.len(), "added document chunks to vector store");
        Ok(added)
    }

    /// Embed `query` and return up to `k` closest chunks, best first.
    /// An empty store answers with no results and makes no embedding call.
    /// Failures are logged here; callers only decide how to degrade.
    pub fn search(&self, query: &str, k: usize) -> Result<Vec<QueryResult>> {
        if self.entries.is_empty() {
            return Ok(Vec::new());
        }
        self.gateway
            .embed_query(query)
            .map_err(|e| Error::Embedding(format!("{:#}", e)))
            .and_then(|query_vec| self.search_vector(&query_vec, k))
            .inspect_err(|err| warn!("{}", err))
    }

    pub fn search_vector(&self, query_vec: &[f32], k: usize) -> Result<Vec<QueryResult>> {
        if query_vec.len() != self.dimension {
            return Err(Error::DimensionMismatch { expected: self.dimension, actual: query_vec.len() });
        }
        Ok(search::nearest(&self.entries, query_vec, k)
            .into_iter()
            .map(|(offset, distance)| {
                let entry = &self.entries[offset];
                QueryResult {
                    text: entry.text.clone(),
                    similarity: search::similarity(distance),
                    metadata: entry.metadata.clone(),
                }
            })
            .collect())
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Write `<prefix>.index` and `<prefix>.json`.
    pub fn persist(&self, prefix: &Path) -> Result<()> {
        persist::save(prefix, self.dimension, &self.entries)?;
        info!(path = %prefix.display(), entries = self.entries.len(), "saved vector store");
        Ok(())
    }

    /// Replace the contents with a saved artifact. On any error the current
    /// contents stay as they were.
    pub fn restore(&mut self, prefix: &Path) -> Result<()> {
        let (dimension, entries) = persist::load(prefix)?;
        if dimension != self.gateway.dim() {
            return Err(Error::DimensionMismatch { expected: self.gateway.dim(), actual: dimension });
        }
        self.dimension = dimension;
        self.entries = entries;
        info!(path = %prefix.display(), entries = self.entries.len(), "loaded vector store");
        Ok(())
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats { total_chunks: self.entries.len(), index_size: self.entries.len(), dimension: self.dimension }
    }
}
