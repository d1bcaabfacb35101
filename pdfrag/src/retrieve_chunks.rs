use tracing::debug;

use crate::embed_chunks::Embedder;
use crate::embed_query::embed_query;
use crate::error::EmbeddingError;
use crate::vector_index::{Hit, VectorIndex};

/// Top-k lookup against one index. Every call embeds the question afresh.
pub struct Retriever<'a> {
    index: &'a VectorIndex,
    embedder: &'a dyn Embedder,
    k: usize,
    retries: usize,
}

impl<'a> Retriever<'a> {
    pub fn new(index: &'a VectorIndex, embedder: &'a dyn Embedder, k: usize) -> Self {
        Self {
            index,
            embedder,
            k,
            retries: 0,
        }
    }

    pub fn with_retries(mut self, retries: usize) -> Self {
        self.retries = retries;
        self
    }

    pub fn retrieve(&self, question: &str) -> Result<Vec<Hit>, EmbeddingError> {
        let query_vec = embed_query(self.embedder, question, self.retries)?;
        if query_vec.len() != self.index.dim() {
            return Err(EmbeddingError::Malformed(format!(
                "query vector has dimension {}, index expects {}",
                query_vec.len(),
                self.index.dim()
            )));
        }
        let hits = self.index.search(&query_vec, self.k);
        debug!(hits = hits.len(), k = self.k, "retrieved chunks");
        Ok(hits)
    }
}
