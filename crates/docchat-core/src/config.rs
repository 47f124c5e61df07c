//! Configuration loader and path helpers.
//!
//! Uses Figment to merge built-in defaults, `config.toml`, `config.<env>.toml`
//! and `APP_*` env vars (`__` separates nested keys, so
//! `APP_CHUNKING__CHUNK_SIZE=800` sets `chunking.chunk_size`). Provides helpers
//! to expand `~` and `${VAR}` and to resolve relative paths against a known
//! base directory.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::chunker::ChunkingConfig;
use crate::error::{Error, Result};

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

pub struct Config {
    figment: Figment,
    dir: PathBuf,
}

impl Config {
    /// Load from the current directory using `RUST_ENV` (default `dev`).
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        Self::load_for_env(Path::new("."), &env_name)
    }

    pub fn load_for_env(dir: &Path, env_name: &str) -> anyhow::Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(dir.join("config.toml")));
        match env_name {
            "dev" | "development" => figment = figment.merge(Toml::file(dir.join("config.dev.toml"))),
            "prod" | "production" => figment = figment.merge(Toml::file(dir.join("config.prod.toml"))),
            "test" | "testing" => figment = figment.merge(Toml::file(dir.join("config.test.toml"))),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment, dir: dir.to_path_buf() };
        config.settings()?.validate()?;
        Ok(config)
    }

    /// Directory the config files were read from.
    pub fn dir(&self) -> &Path { &self.dir }

    /// Merged settings. A relative `data.index_path` is resolved against the
    /// config directory.
    pub fn settings(&self) -> anyhow::Result<Settings> {
        let mut settings: Settings = self
            .figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to read settings: {}", e))?;
        settings.data.index_path = resolve_with_base(&self.dir, &settings.data.index_path)
            .to_string_lossy()
            .into_owned();
        Ok(settings)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Falls back to `GOOGLE_API_KEY` when unset.
    pub api_key: Option<String>,
    pub embedding: EmbeddingSettings,
    pub generation: GenerationSettings,
    pub chunking: ChunkingConfig,
    pub retrieval: RetrievalSettings,
    pub data: DataSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub model: String,
    pub dimension: usize,
    pub batch_size: usize,
    pub base_url: String,
    pub timeout_secs: u64,
    pub use_fake: bool,
    pub show_progress: bool,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model: "models/text-embedding-004".to_string(),
            dimension: 768,
            batch_size: 100,
            base_url: DEFAULT_API_BASE.to_string(),
            timeout_secs: 60,
            use_fake: false,
            show_progress: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    pub model: String,
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_output_tokens: u32,
    pub safety_threshold: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            model: "gemini-2.0-flash-exp".to_string(),
            temperature: 0.1,
            top_p: 0.8,
            top_k: 40,
            max_output_tokens: 2048,
            safety_threshold: "BLOCK_MEDIUM_AND_ABOVE".to_string(),
            base_url: DEFAULT_API_BASE.to_string(),
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub top_k: usize,
    /// How many retrieved chunks are quoted in the answer prompt.
    pub context_chunks: usize,
    pub suggestion_prefix_chars: usize,
    pub max_suggestions: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self { top_k: 5, context_chunks: 3, suggestion_prefix_chars: 2000, max_suggestions: 5 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    /// Path prefix of the saved store; `.index` and `.json` are appended.
    pub index_path: String,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self { index_path: "~/.docchat/index/store".to_string() }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        if self.chunking.chunk_size == 0 {
            return Err(Error::InvalidConfig("chunking.chunk_size must be > 0".into()));
        }
        if self.chunking.overlap >= self.chunking.chunk_size {
            return Err(Error::InvalidConfig(format!(
                "chunking.overlap ({}) must be smaller than chunking.chunk_size ({})",
                self.chunking.overlap, self.chunking.chunk_size
            )));
        }
        if self.embedding.dimension == 0 {
            return Err(Error::InvalidConfig("embedding.dimension must be > 0".into()));
        }
        if self.embedding.batch_size == 0 {
            return Err(Error::InvalidConfig("embedding.batch_size must be > 0".into()));
        }
        if self.retrieval.top_k == 0 {
            return Err(Error::InvalidConfig("retrieval.top_k must be > 0".into()));
        }
        Ok(())
    }

    pub fn api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| env::var("GOOGLE_API_KEY").ok())
            .filter(|k| !k.trim().is_empty())
    }

    pub fn index_path(&self) -> PathBuf { expand_path(&self.data.index_path) }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
