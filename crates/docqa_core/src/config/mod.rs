//! Runtime configuration for the index builder, the query pipeline and the CLI.
//!
//! Every field has a default so a TOML file only needs the values it changes.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub chunking: ChunkingConfig,
    pub embeddings: EmbeddingsConfig,
    pub llm: LlmConfig,
    pub index: IndexConfig,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChunkingConfig {
    pub approx_chars: usize,
    pub overlap_chars: usize,
    /// Below this many chunks the index builder warns that the budgets are too coarse.
    pub min_chunks: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            approx_chars: 800,
            overlap_chars: 200,
            min_chunks: 20,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmbeddingsConfig {
    /// Local Ollama endpoint; must be a loopback address.
    pub base_url: String,
    pub model: String,
    pub batch_size: usize,
}

impl Default for EmbeddingsConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:11434".to_string(),
            model: "nomic-embed-text".to_string(),
            batch_size: 32,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    /// Any OpenAI-compatible `/chat/completions` endpoint (OpenRouter by default).
    OpenaiCompat,
    Ollama,
}

/// USD per one million tokens.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Pricing {
    pub input_per_million: f64,
    pub output_per_million: f64,
}

impl Default for Pricing {
    fn default() -> Self {
        // gpt-4o-mini list price
        Self {
            input_per_million: 0.15,
            output_per_million: 0.60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub base_url: String,
    pub model: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub pricing: Pricing,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::OpenaiCompat,
            base_url: "https://openrouter.ai/api/v1".to_string(),
            model: "openai/gpt-4o-mini".to_string(),
            api_key_env: "OPENROUTER_API_KEY".to_string(),
            temperature: 0.0,
            max_output_tokens: 200,
            pricing: Pricing::default(),
        }
    }
}

impl LlmConfig {
    /// API key from the configured environment variable, if set and non-blank.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IndexConfig {
    pub persist_dir: PathBuf,
    pub collection: String,
    pub top_k: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            persist_dir: PathBuf::from("./chroma_store"),
            collection: "hr_faq".to_string(),
            top_k: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MetricsConfig {
    pub csv_path: PathBuf,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            csv_path: PathBuf::from("outputs/metrics.csv"),
        }
    }
}

impl AppConfig {
    /// Defaults when `path` is `None`, otherwise the TOML file at `path`.
    pub fn load(path: Option<&Path>) -> Result<Self, AppError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = fs::read_to_string(path).map_err(|e| {
            AppError::at_path("CONFIG_READ_FAILED", "Failed to read config file", path, e)
        })?;
        Self::from_toml_str(&raw).map_err(|e| {
            let details = format!("path={}; {}", path.display(), e.details.clone().unwrap_or_default());
            e.with_details(details)
        })
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, AppError> {
        let cfg: Self = toml::from_str(raw).map_err(|e| {
            AppError::new("CONFIG_INVALID", "Failed to parse config").with_details(e.to_string())
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.chunking.approx_chars == 0 {
            return Err(AppError::new(
                "CONFIG_INVALID",
                "chunking.approx_chars must be greater than zero",
            ));
        }
        if self.embeddings.batch_size == 0 {
            return Err(AppError::new(
                "CONFIG_INVALID",
                "embeddings.batch_size must be greater than zero",
            ));
        }
        if self.index.top_k == 0 {
            return Err(AppError::new(
                "CONFIG_INVALID",
                "index.top_k must be greater than zero",
            ));
        }
        if self.index.collection.trim().is_empty() {
            return Err(AppError::new(
                "CONFIG_INVALID",
                "index.collection must not be empty",
            ));
        }
        Ok(())
    }
}
