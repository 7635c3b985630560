use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;
use crate::indexer::chunker::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use crate::rag::knowledge_base::{DEFAULT_CHUNKS_PATH, DEFAULT_VECTORS_PATH};

const DEFAULT_CONFIG_FILE: &str = "rag-chat";
const ENV_PREFIX: &str = "RAG_CHAT";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub knowledge_base: KnowledgeBaseConfig,
    pub retrieval: RetrievalConfig,
    pub ingestion: IngestionConfig,
    pub embedding: EmbeddingConfig,
    pub openrouter: OpenRouterConfig,
    pub gemini: GeminiConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KnowledgeBaseConfig {
    pub chunks_path: PathBuf,
    pub vectors_path: PathBuf,
}

impl Default for KnowledgeBaseConfig {
    fn default() -> Self {
        Self {
            chunks_path: PathBuf::from(DEFAULT_CHUNKS_PATH),
            vectors_path: PathBuf::from(DEFAULT_VECTORS_PATH),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
    /// Embedding attempts per query; 1 disables retrying.
    pub embed_attempts: u32,
    pub embed_backoff_ms: u64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            embed_attempts: 1,
            embed_backoff_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IngestionConfig {
    pub source_path: PathBuf,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub throttle_ms: u64,
    pub embed_attempts: u32,
    pub retry_backoff_ms: u64,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            source_path: PathBuf::from("rag.pdf"),
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            throttle_ms: 100,
            embed_attempts: 2,
            retry_backoff_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    #[default]
    OpenRouter,
    Gemini,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingBackend,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OpenRouterConfig {
    pub api_key: String,
    pub base_url: String,
    pub embedding_model: String,
    pub chat_model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub referer: String,
    pub title: String,
    pub timeout_secs: u64,
}

impl Default for OpenRouterConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://openrouter.ai/api/v1".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            chat_model: "deepseek/deepseek-chat-v3.1:free".to_string(),
            temperature: 0.7,
            max_tokens: 500,
            referer: "http://localhost:3000".to_string(),
            title: "DigiTickets ChatBot".to_string(),
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: String,
    pub embedding_model: String,
    pub timeout_secs: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            embedding_model: "text-embedding-004".to_string(),
            timeout_secs: 60,
        }
    }
}

impl AppConfig {
    /// Layers built-in defaults, an optional TOML file and `RAG_CHAT_*`
    /// environment variables, then fills credentials from the conventional
    /// provider variables.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let mut cfg: AppConfig = config::Config::builder()
            .add_source(file)
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        cfg.apply_conventional_env();
        cfg.validate()?;
        Ok(cfg)
    }

    fn apply_conventional_env(&mut self) {
        if self.openrouter.api_key.is_empty() {
            if let Ok(key) = std::env::var("OPENROUTER_API_KEY") {
                self.openrouter.api_key = key;
            }
        }
        if self.gemini.api_key.is_empty() {
            if let Ok(key) = std::env::var("GEMINI_API_KEY") {
                self.gemini.api_key = key;
            }
        }
        if let Some(port) = std::env::var("PORT").ok().and_then(|p| p.parse().ok()) {
            if self.server.port == ServerConfig::default().port {
                self.server.port = port;
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ingestion.chunk_overlap >= self.ingestion.chunk_size {
            return Err(ConfigError::Invalid {
                setting: "ingestion.chunk_overlap",
                reason: format!(
                    "must be smaller than ingestion.chunk_size ({})",
                    self.ingestion.chunk_size
                ),
            });
        }
        if self.retrieval.top_k == 0 {
            return Err(ConfigError::Invalid {
                setting: "retrieval.top_k",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Credentials the serving process needs: generation plus the selected
    /// embedding backend.
    pub fn require_serving_credentials(&self) -> Result<(), ConfigError> {
        self.require_generation_credentials()?;
        self.require_embedding_credentials()
    }

    pub fn require_embedding_credentials(&self) -> Result<(), ConfigError> {
        match self.embedding.provider {
            EmbeddingBackend::OpenRouter => self.require_generation_credentials(),
            EmbeddingBackend::Gemini if self.gemini.api_key.is_empty() => {
                Err(ConfigError::Missing {
                    setting: "gemini.api_key",
                    env_hint: "GEMINI_API_KEY",
                })
            }
            EmbeddingBackend::Gemini => Ok(()),
        }
    }

    pub fn require_generation_credentials(&self) -> Result<(), ConfigError> {
        if self.openrouter.api_key.is_empty() {
            return Err(ConfigError::Missing {
                setting: "openrouter.api_key",
                env_hint: "OPENROUTER_API_KEY",
            });
        }
        Ok(())
    }
}
