use std::cmp::Ordering;

use tracing::debug;

use crate::chunk_text::Chunk;
use crate::error::IndexError;

pub const DEFAULT_TOP_K: usize = 5;

#[derive(Clone, Debug)]
pub struct Hit {
    pub chunk: Chunk,
    pub score: f32,
}

struct Entry {
    chunk: Chunk,
    vector: Vec<f32>,
    norm: f32,
}

/// Exact nearest-neighbour index over cosine similarity. Immutable once
/// built; a new document set gets a new index.
pub struct VectorIndex {
    entries: Vec<Entry>,
    dim: usize,
}

impl VectorIndex {
    pub fn build(chunks: Vec<Chunk>, vectors: Vec<Vec<f32>>) -> Result<Self, IndexError> {
        if chunks.is_empty() {
            return Err(IndexError::Empty);
        }
        if chunks.len() != vectors.len() {
            return Err(IndexError::LengthMismatch {
                chunks: chunks.len(),
                vectors: vectors.len(),
            });
        }
        let dim = vectors[0].len();
        if dim == 0 {
            return Err(IndexError::ZeroDimension);
        }
        if let Some((position, v)) = vectors.iter().enumerate().find(|(_, v)| v.len() != dim) {
            return Err(IndexError::DimensionMismatch {
                position,
                expected: dim,
                found: v.len(),
            });
        }

        let entries: Vec<Entry> = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| Entry {
                norm: norm(&vector),
                chunk,
                vector,
            })
            .collect();
        debug!(entries = entries.len(), dim, "vector index built");
        Ok(Self { entries, dim })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.entries.iter().map(|e| &e.chunk)
    }

    /// Returns at most `k` hits ordered by descending cosine similarity.
    /// Equal scores keep insertion order. A query of the wrong dimension
    /// matches nothing.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<Hit> {
        if k == 0 || query.len() != self.dim {
            return vec![];
        }
        let query_norm = norm(query);
        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, e)| (i, cosine(query, query_norm, &e.vector, e.norm)))
            .collect();
        // Stable sort, so ties stay in insertion order.
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        scored
            .into_iter()
            .take(k)
            .map(|(i, score)| Hit {
                chunk: self.entries[i].chunk.clone(),
                score,
            })
            .collect()
    }
}

fn norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

fn cosine(a: &[f32], a_norm: f32, b: &[f32], b_norm: f32) -> f32 {
    if a_norm == 0.0 || b_norm == 0.0 {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let score = dot / (a_norm * b_norm);
    if score.is_nan() { 0.0 } else { score }
}
