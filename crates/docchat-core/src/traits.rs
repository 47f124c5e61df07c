use serde::{Deserialize, Serialize};

/// Intent attached to an embedding request.
///
/// Stored chunks and queries are embedded asymmetrically: documents with
/// `RetrievalDocument`, questions with `RetrievalQuery`. Mixing them up does
/// not fail, it only makes retrieval worse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskType {
    RetrievalDocument,
    RetrievalQuery,
}

impl TaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::RetrievalDocument => "retrieval_document",
            TaskType::RetrievalQuery => "retrieval_query",
        }
    }
}

pub trait Embedder: Send + Sync {
    /// Stable identifier for the model behind this embedder.
    fn model_id(&self) -> &str;
    fn dim(&self) -> usize;
    fn embed(&self, text: &str, task: TaskType) -> anyhow::Result<Vec<f32>>;

    /// Embed every text, one call per item. The first failure aborts the
    /// whole run and nothing partial is returned.
    fn embed_batch(&self, texts: &[String], task: TaskType) -> anyhow::Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t, task)).collect()
    }
}

pub trait Generator: Send + Sync {
    fn model_id(&self) -> &str;
    /// Returns `Ok(None)` when the service answered without any text.
    fn generate(&self, prompt: &str) -> anyhow::Result<Option<String>>;
}
