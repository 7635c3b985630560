use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};

use crate::config::OpenRouterConfig;
use crate::error::{ConfigError, EmbeddingError, GenerationError};
use crate::models::{
    ChatCompletionRequest, ChatCompletionResponse, EmbeddingRequest, EmbeddingResponse, Message,
};
use super::{EmbeddingProvider, GenerationProvider};

/// OpenAI-compatible client serving both embeddings and chat completions.
pub struct OpenRouterClient {
    client: Client,
    base_url: String,
    api_key: String,
    embedding_model: String,
    chat_model: String,
    temperature: f32,
    max_tokens: u32,
    referer: String,
    title: String,
}

impl OpenRouterClient {
    pub fn new(cfg: &OpenRouterConfig) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .map_err(|e| ConfigError::Invalid {
                setting: "openrouter",
                reason: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            api_key: cfg.api_key.clone(),
            embedding_model: cfg.embedding_model.clone(),
            chat_model: cfg.chat_model.clone(),
            temperature: cfg.temperature,
            max_tokens: cfg.max_tokens,
            referer: cfg.referer.clone(),
            title: cfg.title.clone(),
        })
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.client
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.api_key)
            .header("HTTP-Referer", &self.referer)
            .header("X-Title", &self.title)
    }
}

/// Reads the body, keeping the status aside so error bodies can be reported.
async fn read_body(response: Response) -> Result<(u16, bool, String), reqwest::Error> {
    let status = response.status();
    let body = response.text().await?;
    Ok((status.as_u16(), status.is_success(), body))
}

pub fn parse_embedding_response(body: &str) -> Result<Vec<f32>, EmbeddingError> {
    let parsed: EmbeddingResponse = serde_json::from_str(body)
        .map_err(|e| EmbeddingError::MalformedResponse(e.to_string()))?;
    match parsed.data.into_iter().next() {
        Some(data) if !data.embedding.is_empty() => Ok(data.embedding),
        _ => Err(EmbeddingError::MissingPayload),
    }
}

pub fn parse_chat_response(body: &str) -> Result<String, GenerationError> {
    let parsed: ChatCompletionResponse = serde_json::from_str(body)
        .map_err(|e| GenerationError::MalformedResponse(e.to_string()))?;
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message)
        .and_then(|message| message.content)
        .map(|content| content.trim().to_string())
        .filter(|content| !content.is_empty())
        .ok_or(GenerationError::MissingPayload)
}

#[async_trait]
impl EmbeddingProvider for OpenRouterClient {
    fn name(&self) -> &str {
        "openrouter"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let request = EmbeddingRequest {
            model: self.embedding_model.clone(),
            input: text.to_string(),
        };

        let response = self.post("/embeddings").json(&request).send().await?;
        let (status, ok, body) = read_body(response).await?;
        if !ok {
            return Err(EmbeddingError::Status { status, body });
        }

        parse_embedding_response(&body)
    }
}

#[async_trait]
impl GenerationProvider for OpenRouterClient {
    fn name(&self) -> &str {
        "openrouter"
    }

    async fn generate(&self, prompt: &str, system_instruction: &str) -> Result<String, GenerationError> {
        let request = ChatCompletionRequest {
            model: self.chat_model.clone(),
            messages: vec![Message::system(system_instruction), Message::user(prompt)],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let response = self.post("/chat/completions").json(&request).send().await?;
        let (status, ok, body) = read_body(response).await?;
        if !ok {
            return Err(GenerationError::Status { status, body });
        }

        parse_chat_response(&body)
    }
}
