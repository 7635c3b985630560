//! Network collaborators: text → vector and prompt → answer.
//!
//! Adapters validate provider payloads once and hand the core plain vectors
//! and strings or a typed error.

pub mod gemini;
pub mod openrouter;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{AppConfig, EmbeddingBackend};
use crate::error::{ConfigError, EmbeddingError, GenerationError};
use self::gemini::GeminiEmbedder;
use self::openrouter::OpenRouterClient;

#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}

#[async_trait]
pub trait GenerationProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn generate(&self, prompt: &str, system_instruction: &str) -> Result<String, GenerationError>;
}

/// Embedding backend selected by `embedding.provider`. The builder and the
/// server both go through here so queries land in the knowledge base's space.
pub fn embedding_provider(cfg: &AppConfig) -> Result<Arc<dyn EmbeddingProvider>, ConfigError> {
    cfg.require_embedding_credentials()?;
    let provider: Arc<dyn EmbeddingProvider> = match cfg.embedding.provider {
        EmbeddingBackend::OpenRouter => Arc::new(OpenRouterClient::new(&cfg.openrouter)?),
        EmbeddingBackend::Gemini => Arc::new(GeminiEmbedder::new(&cfg.gemini)?),
    };
    tracing::info!("Using {} for embeddings", provider.name());
    Ok(provider)
}

pub fn generation_provider(cfg: &AppConfig) -> Result<Arc<dyn GenerationProvider>, ConfigError> {
    cfg.require_generation_credentials()?;
    Ok(Arc::new(OpenRouterClient::new(&cfg.openrouter)?))
}
