use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::GeminiConfig;
use crate::error::{ConfigError, EmbeddingError};
use super::EmbeddingProvider;

#[derive(Debug, Serialize)]
struct EmbedContentRequest<'a> {
    model: String,
    content: Content<'a>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedContentResponse {
    embedding: Option<ContentEmbedding>,
}

#[derive(Debug, Deserialize)]
struct ContentEmbedding {
    #[serde(default)]
    values: Vec<f32>,
}

/// Google Generative Language `embedContent` client.
pub struct GeminiEmbedder {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiEmbedder {
    pub fn new(cfg: &GeminiConfig) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .map_err(|e| ConfigError::Invalid {
                setting: "gemini",
                reason: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            api_key: cfg.api_key.clone(),
            model: cfg.embedding_model.clone(),
        })
    }
}

pub fn parse_embed_content_response(body: &str) -> Result<Vec<f32>, EmbeddingError> {
    let parsed: EmbedContentResponse = serde_json::from_str(body)
        .map_err(|e| EmbeddingError::MalformedResponse(e.to_string()))?;
    match parsed.embedding {
        Some(embedding) if !embedding.values.is_empty() => Ok(embedding.values),
        _ => Err(EmbeddingError::MissingPayload),
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiEmbedder {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let url = format!("{}/models/{}:embedContent", self.base_url, self.model);
        let request = EmbedContentRequest {
            model: format!("models/{}", self.model),
            content: Content {
                parts: [Part { text }],
            },
        };

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(EmbeddingError::Status {
                status: status.as_u16(),
                body,
            });
        }

        parse_embed_content_response(&body)
    }
}
