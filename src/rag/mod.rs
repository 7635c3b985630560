pub mod knowledge_base;
pub mod orchestrator;
pub mod prompt;
pub mod retrieval;
pub mod vector_index;

pub use self::knowledge_base::{KnowledgeBase, KnowledgeBaseStore};
pub use self::orchestrator::RagOrchestrator;
pub use self::retrieval::RetrievalService;
pub use self::vector_index::VectorIndex;
