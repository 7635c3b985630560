use std::sync::Arc;

use crate::error::RetrievalError;
use crate::models::RetrievedChunk;
use crate::providers::EmbeddingProvider;
use crate::retry::RetryPolicy;
use super::vector_index::VectorIndex;

pub const DEFAULT_TOP_K: usize = 5;

pub struct RetrievalService {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<VectorIndex>,
    retry: RetryPolicy,
}

impl RetrievalService {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, index: Arc<VectorIndex>) -> Self {
        Self {
            embedder,
            index,
            retry: RetryPolicy::once(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    /// Embeds `query` and returns its `k` closest extracts with scores rounded
    /// to three decimals.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievedChunk>, RetrievalError> {
        let query_vector = self
            .retry
            .run("query embedding", || self.embedder.embed(query))
            .await?;

        let hits = self.index.search(&query_vector, k)?;
        tracing::debug!("Retrieved {} of {} chunks", hits.len(), self.index.len());

        Ok(hits
            .into_iter()
            .map(|hit| RetrievedChunk {
                index: hit.index,
                text: hit.text.to_string(),
                score: round_score(hit.score),
            })
            .collect())
    }
}

fn round_score(score: f32) -> f64 {
    // `+ 0.0` folds the negative zero that rounding small negatives produces
    (f64::from(score) * 1000.0).round() / 1000.0 + 0.0
}
