//! Blocking client for the hosted `generateContent` endpoint.

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use docchat_core::config::GenerationSettings;
use docchat_core::traits::Generator;

pub const HARM_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

pub struct GeminiGenerator {
    client: Client,
    endpoint: String,
    model: String,
    config: GenerationConfig,
    safety: Vec<SafetySetting>,
}

impl GeminiGenerator {
    pub fn new(api_key: String, settings: &GenerationSettings) -> Result<Self> {
        anyhow::ensure!(!api_key.trim().is_empty(), "missing API key");
        anyhow::ensure!(!settings.model.trim().is_empty(), "missing generation model name");
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-goog-api-key",
            HeaderValue::from_str(api_key.trim()).context("invalid API key")?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .default_headers(headers)
            .build()
            .context("failed to build generation HTTP client")?;

        let model = settings.model.trim().trim_start_matches("models/").to_string();
        let endpoint = format!("{}/models/{}:generateContent", settings.base_url.trim_end_matches('/'), model);
        Ok(Self {
            client,
            endpoint,
            model,
            config: GenerationConfig::from(settings),
            safety: safety_settings(&settings.safety_threshold),
        })
    }

    pub fn endpoint(&self) -> &str { &self.endpoint }
}

impl Generator for GeminiGenerator {
    fn model_id(&self) -> &str { &self.model }

    fn generate(&self, prompt: &str) -> Result<Option<String>> {
        let request = GenerateRequest::new(prompt, &self.config, &self.safety);
        let resp = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .context("failed to call generation service")?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().unwrap_or_else(|_| "<body unavailable>".to_string());
            anyhow::bail!("generation request failed ({}): {}", status, body);
        }
        let parsed: GenerateResponse = resp.json().context("failed to parse generation response")?;
        if let Some(reason) = parsed.prompt_feedback.as_ref().and_then(|f| f.block_reason.as_deref()) {
            debug!(reason, "prompt blocked by safety filter");
        }
        Ok(parsed.text())
    }
}

/// One entry per harm category, all at `threshold`.
pub fn safety_settings(threshold: &str) -> Vec<SafetySetting> {
    HARM_CATEGORIES
        .iter()
        .map(|category| SafetySetting { category: category.to_string(), threshold: threshold.to_string() })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_output_tokens: u32,
}

impl From<&GenerationSettings> for GenerationConfig {
    fn from(s: &GenerationSettings) -> Self {
        Self { temperature: s.temperature, top_p: s.top_p, top_k: s.top_k, max_output_tokens: s.max_output_tokens }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SafetySetting {
    pub category: String,
    pub threshold: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest<'a> {
    pub contents: Vec<Content<'a>>,
    pub generation_config: &'a GenerationConfig,
    pub safety_settings: &'a [SafetySetting],
}

impl<'a> GenerateRequest<'a> {
    pub fn new(prompt: &'a str, generation_config: &'a GenerationConfig, safety_settings: &'a [SafetySetting]) -> Self {
        Self {
            contents: vec![Content { role: "user", parts: vec![Part { text: prompt }] }],
            generation_config,
            safety_settings,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Content<'a> {
    pub role: &'a str,
    pub parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
pub struct Part<'a> {
    pub text: &'a str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub prompt_feedback: Option<PromptFeedback>,
}

impl GenerateResponse {
    /// Text of the first candidate, or `None` when the model returned nothing
    /// usable (no candidates, blocked output, only empty parts).
    pub fn text(&self) -> Option<String> {
        let candidate = self.candidates.first()?;
        let text: String = candidate
            .content
            .as_ref()?
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        if text.trim().is_empty() { None } else { Some(text) }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<CandidateContent>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
pub struct CandidatePart {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    #[serde(default)]
    pub block_reason: Option<String>,
}
