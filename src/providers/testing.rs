//! In-process providers for unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{EmbeddingError, GenerationError};
use super::{EmbeddingProvider, GenerationProvider};

/// Returns a fixed vector per known text and `fallback` for anything else.
/// The first `failures` calls fail.
pub struct StubEmbedder {
    vectors: HashMap<String, Vec<f32>>,
    fallback: Vec<f32>,
    failures: AtomicUsize,
    calls: AtomicUsize,
}

impl StubEmbedder {
    pub fn new(fallback: Vec<f32>) -> Self {
        Self {
            vectors: HashMap::new(),
            fallback,
            failures: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_vector(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.vectors.insert(text.to_string(), vector);
        self
    }

    pub fn failing_first(self, failures: usize) -> Self {
        self.failures.store(failures, Ordering::SeqCst);
        self
    }

    pub fn always_failing() -> Self {
        Self::new(Vec::new()).failing_first(usize::MAX)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for StubEmbedder {
    fn name(&self) -> &str {
        "stub"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            if remaining != usize::MAX {
                self.failures.store(remaining - 1, Ordering::SeqCst);
            }
            return Err(EmbeddingError::MissingPayload);
        }
        Ok(self
            .vectors
            .get(text)
            .cloned()
            .unwrap_or_else(|| self.fallback.clone()))
    }
}

/// Records every prompt and answers with `reply`, or fails when `reply` is `None`.
pub struct RecordingGenerator {
    reply: Option<String>,
    prompts: Mutex<Vec<(String, String)>>,
}

impl RecordingGenerator {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// `(prompt, system_instruction)` pairs in call order.
    pub fn prompts(&self) -> Vec<(String, String)> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerationProvider for RecordingGenerator {
    fn name(&self) -> &str {
        "recording"
    }

    async fn generate(&self, prompt: &str, system_instruction: &str) -> Result<String, GenerationError> {
        self.prompts
            .lock()
            .unwrap()
            .push((prompt.to_string(), system_instruction.to_string()));
        self.reply.clone().ok_or(GenerationError::MissingPayload)
    }
}
