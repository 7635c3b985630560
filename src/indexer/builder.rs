use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use indicatif::ProgressBar;

use crate::config::IngestionConfig;
use crate::error::IngestionError;
use crate::providers::EmbeddingProvider;
use crate::rag::knowledge_base::{KnowledgeBase, KnowledgeBaseStore};
use crate::retry::RetryPolicy;
use super::chunker::{check_chunking, normalize_whitespace, split_text, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use super::extractor::SupportedFormat;

#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    /// Pause between consecutive embedding calls.
    pub throttle: Duration,
    pub retry: RetryPolicy,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            throttle: Duration::from_millis(100),
            retry: RetryPolicy::new(2, Duration::from_millis(1000)),
        }
    }
}

impl From<&IngestionConfig> for BuildOptions {
    fn from(cfg: &IngestionConfig) -> Self {
        Self {
            chunk_size: cfg.chunk_size,
            chunk_overlap: cfg.chunk_overlap,
            throttle: Duration::from_millis(cfg.throttle_ms),
            retry: RetryPolicy::new(cfg.embed_attempts, Duration::from_millis(cfg.retry_backoff_ms)),
        }
    }
}

/// Offline pipeline: source document → chunks → embeddings → knowledge base.
pub struct IndexBuilder {
    embedder: Arc<dyn EmbeddingProvider>,
    options: BuildOptions,
    progress: ProgressBar,
}

impl IndexBuilder {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, options: BuildOptions) -> Self {
        Self {
            embedder,
            options,
            progress: ProgressBar::hidden(),
        }
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Builds the knowledge base for `source` and persists it through `store`.
    /// Nothing is written unless every chunk was embedded.
    pub async fn build(
        &self,
        source: &Path,
        store: &KnowledgeBaseStore,
    ) -> Result<KnowledgeBase, IngestionError> {
        let kb = self.build_in_memory(source).await?;

        tracing::info!(
            "Saving {} chunks to {} and {}",
            kb.len(),
            store.chunks_path().display(),
            store.vectors_path().display()
        );
        store.save(&kb)?;
        tracing::info!("Knowledge base fingerprint {}", kb.fingerprint());
        Ok(kb)
    }

    pub async fn build_in_memory(&self, source: &Path) -> Result<KnowledgeBase, IngestionError> {
        if !source.exists() {
            return Err(IngestionError::MissingSource(source.to_path_buf()));
        }
        let format = SupportedFormat::from_path(source)
            .ok_or_else(|| IngestionError::UnsupportedFormat(source.to_path_buf()))?;

        check_chunking(self.options.chunk_size, self.options.chunk_overlap)?;

        tracing::info!("Reading {:?} document {}", format, source.display());
        let bytes = tokio::fs::read(source)
            .await
            .map_err(|source_err| IngestionError::Read {
                path: source.to_path_buf(),
                source: source_err,
            })?;
        let text = normalize_whitespace(&format.extractor().extract_text(&bytes)?);
        if text.is_empty() {
            return Err(IngestionError::EmptyDocument(source.to_path_buf()));
        }

        let chunks = split_text(&text, self.options.chunk_size, self.options.chunk_overlap)?;
        tracing::info!("Embedding {} chunks with {}", chunks.len(), self.embedder.name());

        let vectors = self.embed_all(&chunks).await?;
        Ok(KnowledgeBase::new(chunks, vectors)?)
    }

    async fn embed_all(&self, chunks: &[String]) -> Result<Vec<Vec<f32>>, IngestionError> {
        self.progress.set_length(chunks.len() as u64);
        self.progress.set_position(0);

        let mut vectors = Vec::with_capacity(chunks.len());
        for (i, chunk) in chunks.iter().enumerate() {
            self.progress.set_message(format!("chunk {}/{}", i + 1, chunks.len()));
            tracing::debug!("Embedding chunk {}/{}", i + 1, chunks.len());

            let label = format!("embedding chunk {}", i + 1);
            let vector = self
                .options
                .retry
                .run(&label, || self.embedder.embed(chunk))
                .await
                .map_err(|source| IngestionError::Embedding { chunk: i, source })?;
            vectors.push(vector);
            self.progress.inc(1);

            if i + 1 < chunks.len() && !self.options.throttle.is_zero() {
                tokio::time::sleep(self.options.throttle).await;
            }
        }

        self.progress.finish_with_message("embedded");
        Ok(vectors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::testing::StubEmbedder;

    fn options(chunk_size: usize, chunk_overlap: usize) -> BuildOptions {
        BuildOptions {
            chunk_size,
            chunk_overlap,
            throttle: Duration::ZERO,
            retry: RetryPolicy::new(2, Duration::ZERO),
        }
    }

    struct Workspace {
        dir: tempfile::TempDir,
        store: KnowledgeBaseStore,
    }

    impl Workspace {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let store = KnowledgeBaseStore::new(
                dir.path().join("kb_chunks.json"),
                dir.path().join("kb_vectors.json"),
            );
            Self { dir, store }
        }

        fn source(&self, name: &str, contents: &str) -> std::path::PathBuf {
            let path = self.dir.path().join(name);
            std::fs::write(&path, contents).unwrap();
            path
        }

        fn nothing_written(&self) -> bool {
            !self.store.chunks_path().exists() && !self.store.vectors_path().exists()
        }
    }

    #[tokio::test]
    async fn test_build_writes_aligned_artifacts() {
        let ws = Workspace::new();
        let source = ws.source("guide.txt", "Créer   un\nticket.\n\n Résoudre un ticket. ");
        let builder = IndexBuilder::new(Arc::new(StubEmbedder::new(vec![0.5, 0.5])), options(12, 4));

        let kb = builder.build(&source, &ws.store).await.unwrap();
        assert_eq!(kb.chunks(), &["Créer un tic", " ticket. Rés", " Résoudre un", "e un ticket."]);
        assert_eq!(kb.vectors().len(), kb.len());
        assert_eq!(kb.dimension(), Some(2));
        assert_eq!(ws.store.load().unwrap(), kb);
    }

    #[tokio::test]
    async fn test_transient_failure_is_retried_once() {
        let ws = Workspace::new();
        let source = ws.source("guide.md", "Paris is the capital of France.");
        let embedder = Arc::new(StubEmbedder::new(vec![1.0, 0.0]).failing_first(1));
        let builder = IndexBuilder::new(embedder.clone(), BuildOptions {
            throttle: Duration::ZERO,
            retry: RetryPolicy::new(2, Duration::ZERO),
            ..BuildOptions::default()
        });

        let kb = builder.build(&source, &ws.store).await.unwrap();
        assert_eq!(kb.chunks(), &["Paris is the capital of France."]);
        assert_eq!(embedder.calls(), 2);
    }

    #[tokio::test]
    async fn test_exhausted_retry_aborts_without_writing() {
        let ws = Workspace::new();
        let source = ws.source("guide.txt", &"abcdefghij".repeat(5));
        let embedder = Arc::new(StubEmbedder::new(vec![1.0]).failing_first(2));
        let builder = IndexBuilder::new(embedder.clone(), options(20, 5));

        let err = builder.build(&source, &ws.store).await.unwrap_err();
        assert!(matches!(err, IngestionError::Embedding { chunk: 0, .. }));
        assert_eq!(embedder.calls(), 2);
        assert!(ws.nothing_written());
    }

    #[tokio::test]
    async fn test_missing_source() {
        let ws = Workspace::new();
        let embedder = Arc::new(StubEmbedder::new(vec![1.0]));
        let builder = IndexBuilder::new(embedder.clone(), options(20, 5));

        let err = builder.build(&ws.dir.path().join("rag.pdf"), &ws.store).await.unwrap_err();
        assert!(matches!(err, IngestionError::MissingSource(_)));
        assert_eq!(embedder.calls(), 0);
        assert!(ws.nothing_written());
    }

    #[tokio::test]
    async fn test_empty_document() {
        let ws = Workspace::new();
        let source = ws.source("blank.txt", " \n\t \n");
        let embedder = Arc::new(StubEmbedder::new(vec![1.0]));
        let builder = IndexBuilder::new(embedder.clone(), options(20, 5));

        let err = builder.build(&source, &ws.store).await.unwrap_err();
        assert!(matches!(err, IngestionError::EmptyDocument(_)));
        assert_eq!(embedder.calls(), 0);
        assert!(ws.nothing_written());
    }

    #[tokio::test]
    async fn test_invalid_chunking_fails_before_embedding() {
        let ws = Workspace::new();
        let source = ws.source("guide.txt", "some text");
        let embedder = Arc::new(StubEmbedder::new(vec![1.0]));
        let builder = IndexBuilder::new(embedder.clone(), options(10, 10));

        let err = builder.build(&source, &ws.store).await.unwrap_err();
        assert!(matches!(err, IngestionError::Chunking(_)));
        assert_eq!(embedder.calls(), 0);
    }

    #[tokio::test]
    async fn test_unsupported_format() {
        let ws = Workspace::new();
        let source = ws.source("deck.pptx", "binary");
        let builder = IndexBuilder::new(Arc::new(StubEmbedder::new(vec![1.0])), options(20, 5));

        let err = builder.build(&source, &ws.store).await.unwrap_err();
        assert!(matches!(err, IngestionError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_options_from_config() {
        let opts = BuildOptions::from(&IngestionConfig::default());
        assert_eq!(opts.chunk_size, 1200);
        assert_eq!(opts.chunk_overlap, 150);
        assert_eq!(opts.throttle, Duration::from_millis(100));
        assert_eq!(opts.retry, RetryPolicy::new(2, Duration::from_millis(1000)));
    }
}
