use crate::embed_chunks::{with_retry, Embedder};
use crate::error::EmbeddingError;

pub fn embed_query(
    embedder: &dyn Embedder,
    text: &str,
    retries: usize,
) -> Result<Vec<f32>, EmbeddingError> {
    with_retry(retries, || embedder.embed_one(text))
}
