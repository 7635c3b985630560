use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::error::{IngestionError, KnowledgeBaseError, StartupLoadError};

pub const DEFAULT_CHUNKS_PATH: &str = "kb_chunks.json";
pub const DEFAULT_VECTORS_PATH: &str = "kb_vectors.json";

/// Chunks and their embeddings, aligned by index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KnowledgeBase {
    chunks: Vec<String>,
    vectors: Vec<Vec<f32>>,
}

impl KnowledgeBase {
    pub fn new(chunks: Vec<String>, vectors: Vec<Vec<f32>>) -> Result<Self, KnowledgeBaseError> {
        if chunks.len() != vectors.len() {
            return Err(KnowledgeBaseError::LengthMismatch {
                chunks: chunks.len(),
                vectors: vectors.len(),
            });
        }

        if let Some(first) = vectors.first() {
            let expected = first.len();
            for (index, vector) in vectors.iter().enumerate() {
                if vector.is_empty() {
                    return Err(KnowledgeBaseError::EmptyVector { index });
                }
                if vector.len() != expected {
                    return Err(KnowledgeBaseError::InconsistentDimension {
                        index,
                        expected,
                        actual: vector.len(),
                    });
                }
                if vector.iter().any(|v| !v.is_finite()) {
                    return Err(KnowledgeBaseError::NonFinite { index });
                }
            }
        }

        Ok(Self { chunks, vectors })
    }

    pub fn chunks(&self) -> &[String] {
        &self.chunks
    }

    pub fn vectors(&self) -> &[Vec<f32>] {
        &self.vectors
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// `None` for an empty knowledge base.
    pub fn dimension(&self) -> Option<usize> {
        self.vectors.first().map(Vec::len)
    }

    /// Short SHA-256 digest of the contents, used to tell builds apart in logs.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for (chunk, vector) in self.chunks.iter().zip(&self.vectors) {
            hasher.update((chunk.len() as u64).to_le_bytes());
            hasher.update(chunk.as_bytes());
            for value in vector {
                hasher.update(value.to_le_bytes());
            }
        }
        let digest = hasher.finalize();
        hex::encode(&digest[..8])
    }

    pub fn into_parts(self) -> (Vec<String>, Vec<Vec<f32>>) {
        (self.chunks, self.vectors)
    }
}

/// The two JSON artifacts a knowledge base is persisted as.
#[derive(Debug, Clone)]
pub struct KnowledgeBaseStore {
    chunks_path: PathBuf,
    vectors_path: PathBuf,
}

impl KnowledgeBaseStore {
    pub fn new(chunks_path: impl Into<PathBuf>, vectors_path: impl Into<PathBuf>) -> Self {
        Self {
            chunks_path: chunks_path.into(),
            vectors_path: vectors_path.into(),
        }
    }

    pub fn chunks_path(&self) -> &Path {
        &self.chunks_path
    }

    pub fn vectors_path(&self) -> &Path {
        &self.vectors_path
    }

    pub fn load(&self) -> Result<KnowledgeBase, StartupLoadError> {
        let chunks: Vec<String> = read_json(&self.chunks_path)?;
        let vectors: Vec<Vec<f32>> = read_json(&self.vectors_path)?;
        let kb = KnowledgeBase::new(chunks, vectors)?;

        tracing::info!(
            "Loaded {} chunks ({} dimensions, fingerprint {}) from {} and {}",
            kb.len(),
            kb.dimension().unwrap_or(0),
            kb.fingerprint(),
            self.chunks_path.display(),
            self.vectors_path.display(),
        );
        Ok(kb)
    }

    /// Writes both artifacts to temporary siblings first and only renames them
    /// into place once both are complete. If the second rename fails the
    /// previous chunks file is put back, so a failed save never leaves chunks
    /// and vectors from different builds side by side.
    pub fn save(&self, kb: &KnowledgeBase) -> Result<(), IngestionError> {
        let chunks_json = serde_json::to_string_pretty(kb.chunks())?;
        let vectors_json = serde_json::to_string_pretty(kb.vectors())?;

        let chunks_tmp = sibling(&self.chunks_path, "tmp");
        let vectors_tmp = sibling(&self.vectors_path, "tmp");

        let result = write_file(&chunks_tmp, &chunks_json)
            .and_then(|()| write_file(&vectors_tmp, &vectors_json))
            .and_then(|()| self.swap_in(&chunks_tmp, &vectors_tmp));

        if result.is_err() {
            let _ = std::fs::remove_file(&chunks_tmp);
            let _ = std::fs::remove_file(&vectors_tmp);
        }
        result
    }

    fn swap_in(&self, chunks_tmp: &Path, vectors_tmp: &Path) -> Result<(), IngestionError> {
        let backup = if self.chunks_path.exists() {
            let backup = sibling(&self.chunks_path, "bak");
            rename_file(&self.chunks_path, &backup)?;
            Some(backup)
        } else {
            None
        };

        let swapped = rename_file(chunks_tmp, &self.chunks_path)
            .and_then(|()| rename_file(vectors_tmp, &self.vectors_path));

        match (&swapped, backup) {
            (Ok(()), Some(backup)) => {
                let _ = std::fs::remove_file(backup);
            }
            (Ok(()), None) => {}
            (Err(_), Some(backup)) => {
                if let Err(e) = std::fs::rename(&backup, &self.chunks_path) {
                    tracing::error!(
                        "Could not restore {} from {}: {}",
                        self.chunks_path.display(),
                        backup.display(),
                        e
                    );
                }
            }
            (Err(_), None) => {
                let _ = std::fs::remove_file(&self.chunks_path);
            }
        }
        swapped
    }
}

impl Default for KnowledgeBaseStore {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNKS_PATH, DEFAULT_VECTORS_PATH)
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, StartupLoadError> {
    if !path.exists() {
        return Err(StartupLoadError::Missing(path.to_path_buf()));
    }
    let data = std::fs::read_to_string(path).map_err(|source| StartupLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&data).map_err(|source| StartupLoadError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn sibling(path: &Path, extension: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(extension);
    path.with_file_name(name)
}

fn write_file(path: &Path, contents: &str) -> Result<(), IngestionError> {
    std::fs::write(path, contents).map_err(|source| IngestionError::Persist {
        path: path.to_path_buf(),
        source,
    })
}

fn rename_file(from: &Path, to: &Path) -> Result<(), IngestionError> {
    std::fs::rename(from, to).map_err(|source| IngestionError::Persist {
        path: to.to_path_buf(),
        source,
    })
}
