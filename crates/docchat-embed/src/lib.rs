//! Embedding gateway: maps text to fixed-length vectors through a hosted
//! embedding service, with a deterministic offline embedder for tests and
//! development (`APP_USE_FAKE_EMBEDDINGS=1`).

pub mod fake;
pub mod gemini;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use docchat_core::config::Settings;
pub use docchat_core::traits::{Embedder, TaskType};

pub use fake::FakeEmbedder;
pub use gemini::GeminiEmbedder;

/// Front door for all embedding calls. Picks the task intent so documents and
/// queries are never embedded with the wrong one.
#[derive(Clone)]
pub struct EmbeddingGateway {
    embedder: Arc<dyn Embedder>,
    batch_size: usize,
    show_progress: bool,
}

impl EmbeddingGateway {
    pub fn new(embedder: Arc<dyn Embedder>, batch_size: usize) -> Self {
        Self { embedder, batch_size: batch_size.max(1), show_progress: false }
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn dim(&self) -> usize { self.embedder.dim() }

    pub fn model_id(&self) -> &str { self.embedder.model_id() }

    /// Embed stored chunks, `batch_size` items per group. Any failure aborts
    /// the whole run; partial results are dropped.
    pub fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let pb = if self.show_progress { ProgressBar::new(texts.len() as u64) } else { ProgressBar::hidden() };
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({percent}%) {msg}")?
                .progress_chars("#>-"),
        );
        pb.set_message("Creating embeddings");
        if self.show_progress { pb.enable_steady_tick(Duration::from_millis(120)); }

        let mut vectors = Vec::with_capacity(texts.len());
        for (i, batch) in texts.chunks(self.batch_size).enumerate() {
            debug!(batch = i + 1, size = batch.len(), "embedding batch");
            let embedded = self
                .embedder
                .embed_batch(batch, TaskType::RetrievalDocument)
                .with_context(|| format!("embedding batch {} failed", i + 1))?;
            pb.inc(batch.len() as u64);
            vectors.extend(embedded);
        }
        pb.finish_and_clear();
        info!(count = vectors.len(), model = self.model_id(), "embedded documents");
        Ok(vectors)
    }

    pub fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        self.embedder.embed(query, TaskType::RetrievalQuery)
    }
}

/// Build the embedder selected by settings. `APP_USE_FAKE_EMBEDDINGS=1` or
/// `embedding.use_fake = true` switch to the offline `FakeEmbedder`.
pub fn get_default_embedder(settings: &Settings) -> Result<Arc<dyn Embedder>> {
    let use_fake = settings.embedding.use_fake
        || std::env::var("APP_USE_FAKE_EMBEDDINGS")
            .ok()
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
    if use_fake {
        info!("Using FakeEmbedder");
        return Ok(Arc::new(FakeEmbedder::new(settings.embedding.dimension)));
    }
    let api_key = settings.api_key().context("GOOGLE_API_KEY is not set")?;
    Ok(Arc::new(GeminiEmbedder::from_settings(api_key, &settings.embedding)?))
}

pub fn get_default_gateway(settings: &Settings) -> Result<EmbeddingGateway> {
    let embedder = get_default_embedder(settings)?;
    Ok(EmbeddingGateway::new(embedder, settings.embedding.batch_size).with_progress(settings.embedding.show_progress))
}
