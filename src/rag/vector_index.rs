//! Exact cosine-similarity search over a loaded knowledge base.
//!
//! The corpus is a single document, so a linear scan over every stored vector
//! is used instead of an approximate nearest-neighbour structure.

use std::cmp::Ordering;

use crate::error::DimensionMismatchError;
use super::knowledge_base::KnowledgeBase;

#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit<'a> {
    /// Position of the chunk in the knowledge base.
    pub index: usize,
    pub text: &'a str,
    /// Cosine similarity in `[-1, 1]`.
    pub score: f32,
}

/// Immutable, shareable search index. Stored vectors are normalized once at
/// construction; scores still equal the cosine of the original embeddings.
#[derive(Debug)]
pub struct VectorIndex {
    chunks: Vec<String>,
    unit_vectors: Vec<Vec<f32>>,
    dimension: Option<usize>,
}

impl VectorIndex {
    pub fn new(kb: KnowledgeBase) -> Self {
        let dimension = kb.dimension();
        let (chunks, vectors) = kb.into_parts();
        let unit_vectors = vectors.iter().map(|v| normalize(v)).collect();

        Self {
            chunks,
            unit_vectors,
            dimension,
        }
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    /// Returns the `k` most similar chunks, best first. Equal scores keep
    /// knowledge-base order.
    pub fn search(
        &self,
        query: &[f32],
        k: usize,
    ) -> Result<Vec<SearchHit<'_>>, DimensionMismatchError> {
        let Some(expected) = self.dimension else {
            return Ok(Vec::new());
        };
        if query.len() != expected {
            return Err(DimensionMismatchError {
                expected,
                actual: query.len(),
            });
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        let query = normalize(query);
        let mut scored: Vec<(usize, f32)> = self
            .unit_vectors
            .iter()
            .enumerate()
            .map(|(index, vector)| (index, dot(&query, vector).clamp(-1.0, 1.0) + 0.0))
            .collect();

        if k < scored.len() {
            scored.select_nth_unstable_by(k - 1, rank_order);
            scored.truncate(k);
        }
        scored.sort_unstable_by(rank_order);

        Ok(scored
            .into_iter()
            .map(|(index, score)| SearchHit {
                index,
                text: &self.chunks[index],
                score,
            })
            .collect())
    }
}

/// Descending score, then ascending index. Scores never carry a negative
/// zero, so `total_cmp` agrees with numeric equality.
fn rank_order(a: &(usize, f32), b: &(usize, f32)) -> Ordering {
    b.1.total_cmp(&a.1).then(a.0.cmp(&b.0))
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Unit-length copy of `v`; a zero magnitude yields the zero vector.
///
/// The norm is accumulated in f64, where squaring any finite f32 neither
/// overflows nor underflows.
fn normalize(v: &[f32]) -> Vec<f32> {
    let norm = v.iter().map(|&x| f64::from(x) * f64::from(x)).sum::<f64>().sqrt();
    if norm == 0.0 || !norm.is_finite() {
        return vec![0.0; v.len()];
    }
    v.iter().map(|&x| (f64::from(x) / norm) as f32).collect()
}
