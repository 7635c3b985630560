use std::sync::Arc;

use thiserror::Error;

use crate::error::{GenerationError, RetrievalError};
use crate::filters::intent::IntentFilter;
use crate::models::ChatAnswer;
use crate::providers::GenerationProvider;
use super::prompt::{build_prompt, render_context, SYSTEM_INSTRUCTION};
use super::retrieval::{RetrievalService, DEFAULT_TOP_K};

pub const EMPTY_MESSAGE_REPLY: &str = "Écris-moi une question 🙂";
pub const APOLOGY_REPLY: &str = "Désolé, une erreur est survenue.";

#[derive(Debug, Error)]
enum AnswerError {
    #[error(transparent)]
    Retrieval(#[from] RetrievalError),

    #[error(transparent)]
    Generation(#[from] GenerationError),
}

/// Turns a user message into an answer. Never fails: provider errors degrade
/// to a fixed apology.
pub struct RagOrchestrator {
    intents: IntentFilter,
    retrieval: RetrievalService,
    generator: Arc<dyn GenerationProvider>,
    top_k: usize,
}

impl RagOrchestrator {
    pub fn new(retrieval: RetrievalService, generator: Arc<dyn GenerationProvider>) -> Self {
        Self {
            intents: IntentFilter::new(),
            retrieval,
            generator,
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn retrieval(&self) -> &RetrievalService {
        &self.retrieval
    }

    pub async fn answer(&self, message: &str) -> ChatAnswer {
        let question = message.trim();
        if question.is_empty() {
            return ChatAnswer::text(EMPTY_MESSAGE_REPLY);
        }

        if let Some(canned) = self.intents.classify(question) {
            tracing::debug!("Answered {:?} without retrieval", canned);
            return ChatAnswer::text(canned.reply());
        }

        match self.answer_with_rag(question).await {
            Ok(answer) => ChatAnswer::text(answer),
            Err(AnswerError::Retrieval(RetrievalError::DimensionMismatch(e))) => {
                tracing::error!(
                    "Knowledge base and embedding provider disagree ({}); rebuild the knowledge base",
                    e
                );
                ChatAnswer::text(APOLOGY_REPLY)
            }
            Err(e) => {
                tracing::warn!("RAG answer failed: {}", e);
                ChatAnswer::text(APOLOGY_REPLY)
            }
        }
    }

    async fn answer_with_rag(&self, question: &str) -> Result<String, AnswerError> {
        let hits = self.retrieval.retrieve(question, self.top_k).await?;
        let context = render_context(&hits);
        let prompt = build_prompt(question, &context);

        let answer = self.generator.generate(&prompt, SYSTEM_INSTRUCTION).await?;
        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::intent::CannedResponse;
    use crate::providers::testing::{RecordingGenerator, StubEmbedder};
    use crate::rag::knowledge_base::KnowledgeBase;
    use crate::rag::vector_index::VectorIndex;

    const QUESTION: &str = "Comment créer un ticket ?";

    fn knowledge_base() -> KnowledgeBase {
        KnowledgeBase::new(
            vec![
                "Pour créer un ticket, appuyez sur « Nouveau ».".to_string(),
                "Les tickets résolus sont archivés.".to_string(),
            ],
            vec![vec![1.0, 0.0], vec![0.0, 1.0]],
        )
        .unwrap()
    }

    fn orchestrator(embedder: StubEmbedder, generator: Arc<RecordingGenerator>) -> RagOrchestrator {
        let index = Arc::new(VectorIndex::new(knowledge_base()));
        let retrieval = RetrievalService::new(Arc::new(embedder), index);
        RagOrchestrator::new(retrieval, generator)
    }

    #[tokio::test]
    async fn test_answer_uses_retrieved_context() {
        let generator = Arc::new(RecordingGenerator::replying("Appuyez sur « Nouveau »."));
        let rag = orchestrator(
            StubEmbedder::new(vec![0.0, 1.0]).with_vector(QUESTION, vec![1.0, 0.0]),
            generator.clone(),
        );

        let answer = rag.answer(&format!("  {}  ", QUESTION)).await;
        assert_eq!(answer, ChatAnswer::text("Appuyez sur « Nouveau »."));
        assert!(answer.sources.is_empty());

        let prompts = generator.prompts();
        assert_eq!(prompts.len(), 1);
        let (prompt, system) = &prompts[0];
        assert_eq!(system, SYSTEM_INSTRUCTION);
        assert!(prompt.contains(QUESTION));
        assert!(prompt.contains(
            "[Extrait 1] (score=1.000)\nPour créer un ticket, appuyez sur « Nouveau »."
        ));
        assert!(prompt.contains("[Extrait 2] (score=0.000)\nLes tickets résolus sont archivés."));
    }

    #[tokio::test]
    async fn test_greeting_bypasses_retrieval_and_generation() {
        let embedder = StubEmbedder::always_failing();
        let generator = Arc::new(RecordingGenerator::failing());
        let rag = orchestrator(embedder, generator.clone());

        let answer = rag.answer("Bonjour ça va").await;
        assert_eq!(answer.answer, CannedResponse::Greeting.reply());
        assert!(generator.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_empty_message_asks_for_a_question() {
        let generator = Arc::new(RecordingGenerator::failing());
        let rag = orchestrator(StubEmbedder::always_failing(), generator.clone());

        assert_eq!(rag.answer(" \n ").await, ChatAnswer::text(EMPTY_MESSAGE_REPLY));
        assert!(generator.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_generation_failure_returns_apology() {
        let generator = Arc::new(RecordingGenerator::failing());
        let rag = orchestrator(StubEmbedder::new(vec![1.0, 0.0]), generator.clone());

        let answer = rag.answer(QUESTION).await;
        assert_eq!(answer, ChatAnswer::text(APOLOGY_REPLY));
        assert_eq!(generator.prompts().len(), 1);
    }

    #[tokio::test]
    async fn test_embedding_failure_returns_apology() {
        let generator = Arc::new(RecordingGenerator::replying("unused"));
        let rag = orchestrator(StubEmbedder::always_failing(), generator.clone());

        assert_eq!(rag.answer(QUESTION).await, ChatAnswer::text(APOLOGY_REPLY));
        assert!(generator.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_dimension_mismatch_returns_apology() {
        let generator = Arc::new(RecordingGenerator::replying("unused"));
        let rag = orchestrator(StubEmbedder::new(vec![1.0, 0.0, 0.0]), generator.clone());

        assert_eq!(rag.answer(QUESTION).await, ChatAnswer::text(APOLOGY_REPLY));
        assert!(generator.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_top_k_limits_context() {
        let generator = Arc::new(RecordingGenerator::replying("ok"));
        let rag = orchestrator(StubEmbedder::new(vec![1.0, 0.0]), generator.clone()).with_top_k(1);

        rag.answer(QUESTION).await;
        let (prompt, _) = &generator.prompts()[0];
        assert!(prompt.contains("[Extrait 1]"));
        assert!(!prompt.contains("[Extrait 2]"));
    }
}
