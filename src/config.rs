use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Application configuration, loaded from a TOML file.
///
/// Every field has a default, so an absent file or empty table yields a
/// working configuration. The Gemini API key itself is never stored here;
/// only the name of the environment variable that carries it.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    /// Maximum chunk width in characters.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
        }
    }
}

fn default_chunk_size() -> usize {
    300
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Number of chunks fed into the prompt.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Number of recent turns included in the prompt.
    #[serde(default = "default_history_turns")]
    pub history_turns: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            history_turns: default_history_turns(),
        }
    }
}

fn default_top_k() -> usize {
    3
}
fn default_history_turns() -> usize {
    3
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    /// Gemini model identifier.
    #[serde(default = "default_model")]
    pub model: String,
    /// Base URL of the generative-language API.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Request timeout for the generation call.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_model() -> String {
    "gemini-1.5-flash".to_string()
}
fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}
fn default_api_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:7411".to_string(),
        }
    }
}

/// Load and validate configuration from `path`. A missing file is not an
/// error; the defaults are returned instead.
pub fn load_config(path: &Path) -> Result<Config> {
    let config = if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content).with_context(|| "Failed to parse config file")?
    } else {
        Config::default()
    };

    if config.chunking.chunk_size == 0 {
        anyhow::bail!("chunking.chunk_size must be > 0");
    }
    if config.retrieval.top_k == 0 {
        anyhow::bail!("retrieval.top_k must be >= 1");
    }
    if config.generation.model.is_empty() {
        anyhow::bail!("generation.model must not be empty");
    }

    Ok(config)
}
