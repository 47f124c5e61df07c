//! docchat-chat
//!
//! Grounded question answering over the indexed documents: prompt assembly,
//! the hosted generation client and the per-user [`Session`].

pub mod answer;
pub mod gemini;
pub mod session;

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use docchat_core::chunker::Chunker;
use docchat_core::config::Settings;
pub use docchat_core::traits::Generator;
use docchat_vector::VectorStore;

pub use answer::AnswerGenerator;
pub use gemini::GeminiGenerator;
pub use session::{read_uploads, Analytics, ProcessedFile, ProcessingReport, Reply, Session, SkippedFile, SourcePreview, Upload};

pub fn get_default_generator(settings: &Settings) -> Result<Arc<dyn Generator>> {
    let api_key = settings.api_key().context("GOOGLE_API_KEY is not set")?;
    let generator = GeminiGenerator::new(api_key, &settings.generation)?;
    info!(model = generator.model_id(), "Using hosted generation model");
    Ok(Arc::new(generator))
}

/// Wire a fresh session from settings: embedder, empty store, generator and
/// chunker.
pub fn build_session(settings: &Settings) -> Result<Session> {
    let gateway = docchat_embed::get_default_gateway(settings)?;
    let generator = get_default_generator(settings)?;
    Ok(Session::new(
        VectorStore::new(gateway),
        AnswerGenerator::with_settings(generator, &settings.retrieval),
        Chunker::new(settings.chunking.clone()),
        settings.retrieval.top_k,
    ))
}
