//! Blocking client for the hosted `embedContent` endpoint.

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use docchat_core::config::EmbeddingSettings;
use docchat_core::traits::{Embedder, TaskType};

pub struct GeminiEmbedder {
    client: Client,
    endpoint: String,
    model: String,
    dim: usize,
}

impl GeminiEmbedder {
    pub fn new(api_key: String, base_url: &str, model: &str, dim: usize, timeout: Duration) -> Result<Self> {
        anyhow::ensure!(!api_key.trim().is_empty(), "missing API key");
        anyhow::ensure!(!model.trim().is_empty(), "missing embedding model name");
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-goog-api-key",
            HeaderValue::from_str(api_key.trim()).context("invalid API key")?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .context("failed to build embedding HTTP client")?;
        let model = qualified_model(model);
        let endpoint = format!("{}/{}:embedContent", base_url.trim_end_matches('/'), model);
        Ok(Self { client, endpoint, model, dim })
    }

    pub fn from_settings(api_key: String, settings: &EmbeddingSettings) -> Result<Self> {
        Self::new(
            api_key,
            &settings.base_url,
            &settings.model,
            settings.dimension,
            Duration::from_secs(settings.timeout_secs),
        )
    }

    pub fn endpoint(&self) -> &str { &self.endpoint }
}

impl Embedder for GeminiEmbedder {
    fn model_id(&self) -> &str { &self.model }

    fn dim(&self) -> usize { self.dim }

    fn embed(&self, text: &str, task: TaskType) -> Result<Vec<f32>> {
        let request = EmbedRequest::new(&self.model, text, task);
        let resp = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .context("failed to call embedding service")?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().unwrap_or_else(|_| "<body unavailable>".to_string());
            anyhow::bail!("embedding request failed ({}): {}", status, body);
        }
        let parsed: EmbedResponse = resp.json().context("failed to parse embedding response")?;
        let values = parsed.embedding.values;
        anyhow::ensure!(
            values.len() == self.dim,
            "embedding service returned {} dimensions, expected {}",
            values.len(),
            self.dim
        );
        Ok(values)
    }
}

/// `text-embedding-004` → `models/text-embedding-004`.
pub fn qualified_model(model: &str) -> String {
    let model = model.trim();
    if model.starts_with("models/") { model.to_string() } else { format!("models/{}", model) }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbedRequest<'a> {
    pub model: &'a str,
    pub content: Content<'a>,
    pub task_type: TaskType,
}

impl<'a> EmbedRequest<'a> {
    pub fn new(model: &'a str, text: &'a str, task_type: TaskType) -> Self {
        Self { model, content: Content { parts: vec![Part { text }] }, task_type }
    }
}

#[derive(Debug, Serialize)]
pub struct Content<'a> {
    pub parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
pub struct Part<'a> {
    pub text: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct EmbedResponse {
    pub embedding: EmbeddingValues,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingValues {
    #[serde(default)]
    pub values: Vec<f32>,
}
