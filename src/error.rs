use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting `{setting}` (set {env_hint})")]
    Missing {
        setting: &'static str,
        env_hint: &'static str,
    },

    #[error("invalid setting `{setting}`: {reason}")]
    Invalid {
        setting: &'static str,
        reason: String,
    },

    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
}

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("embedding provider returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed embedding response: {0}")]
    MalformedResponse(String),

    #[error("embedding response carried no vector")]
    MissingPayload,
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generation request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("generation provider returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed generation response: {0}")]
    MalformedResponse(String),

    #[error("generation response carried no answer")]
    MissingPayload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("query vector has {actual} dimensions but the knowledge base was built with {expected}")]
pub struct DimensionMismatchError {
    pub expected: usize,
    pub actual: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KnowledgeBaseError {
    #[error("{chunks} chunks but {vectors} vectors")]
    LengthMismatch { chunks: usize, vectors: usize },

    #[error("vector {index} is empty")]
    EmptyVector { index: usize },

    #[error("vector {index} has {actual} dimensions, expected {expected}")]
    InconsistentDimension {
        index: usize,
        expected: usize,
        actual: usize,
    },

    #[error("vector {index} contains a non-finite component")]
    NonFinite { index: usize },
}

#[derive(Debug, Error)]
pub enum StartupLoadError {
    #[error("knowledge base file {0} is missing; run kb-builder first")]
    Missing(PathBuf),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("inconsistent knowledge base: {0}")]
    Invalid(#[from] KnowledgeBaseError),
}

#[derive(Debug, Error)]
#[error("chunk overlap ({overlap}) must be smaller than the chunk size ({max_chars})")]
pub struct InvalidChunking {
    pub max_chars: usize,
    pub overlap: usize,
}

#[derive(Debug, Error)]
pub enum IngestionError {
    #[error("source document {0} does not exist")]
    MissingSource(PathBuf),

    #[error("unsupported source format: {0}")]
    UnsupportedFormat(PathBuf),

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("text extraction failed: {0}")]
    Extraction(String),

    #[error("source document {0} is empty or unreadable")]
    EmptyDocument(PathBuf),

    #[error(transparent)]
    Chunking(#[from] InvalidChunking),

    #[error("failed to embed chunk {chunk}: {source}")]
    Embedding {
        chunk: usize,
        #[source]
        source: EmbeddingError,
    },

    #[error("built knowledge base is inconsistent: {0}")]
    Inconsistent(#[from] KnowledgeBaseError),

    #[error("failed to write {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize knowledge base: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    DimensionMismatch(#[from] DimensionMismatchError),
}
