use std::thread;
use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::EmbeddingError;
use crate::http::post_json;

/// Maps text to fixed-dimension vectors. Index building and query
/// embedding must go through the same instance so vectors stay comparable.
pub trait Embedder: Send + Sync {
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    fn embed_one(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut vecs = self.embed_batch(&[text.to_string()])?;
        if vecs.len() != 1 {
            return Err(EmbeddingError::CountMismatch {
                requested: 1,
                returned: vecs.len(),
            });
        }
        Ok(vecs.remove(0))
    }
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Serialize)]
struct EmbedLegacyRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

pub struct OllamaEmbedder {
    client: Client,
    base_url: String,
    model: String,
    normalize: bool,
}

impl OllamaEmbedder {
    pub fn new(client: Client, base_url: &str, model: &str, normalize: bool) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            normalize,
        }
    }

    /// Older servers only expose `/api/embeddings`, one prompt per call.
    fn embed_legacy(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let url = format!("{}/api/embeddings", self.base_url);
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            let req = EmbedLegacyRequest {
                model: &self.model,
                prompt: text,
            };
            let res = post_json::<Value, _>(&self.client, &url, &req)?;
            out.extend(parse_embeddings(res)?);
        }
        Ok(out)
    }
}

impl Embedder for OllamaEmbedder {
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(vec![]);
        }
        let url = format!("{}/api/embed", self.base_url);
        let req = EmbedRequest {
            model: &self.model,
            input: texts,
        };
        let vectors = match post_json::<Value, _>(&self.client, &url, &req) {
            Ok(res) => parse_embeddings(res)?,
            Err(err) if err.is_transient() => return Err(err.into()),
            Err(err) => {
                debug!(error = %err, "falling back to legacy embeddings endpoint");
                self.embed_legacy(texts)?
            }
        };
        finish(texts.len(), vectors, self.normalize)
    }
}

#[derive(Serialize)]
struct OpenAiEmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct OpenAiEmbeddingResponse {
    data: Vec<OpenAiEmbeddingData>,
}

#[derive(Deserialize)]
struct OpenAiEmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

/// Client for OpenAI-compatible `/embeddings` endpoints.
pub struct OpenAiEmbedder {
    client: Client,
    endpoint: String,
    model: String,
    normalize: bool,
}

impl OpenAiEmbedder {
    /// `client` must already carry the bearer token.
    pub fn new(client: Client, base_url: &str, model: &str, normalize: bool) -> Self {
        Self {
            client,
            endpoint: format!("{}/embeddings", base_url.trim_end_matches('/')),
            model: model.to_string(),
            normalize,
        }
    }
}

impl Embedder for OpenAiEmbedder {
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(vec![]);
        }
        let req = OpenAiEmbeddingRequest {
            model: &self.model,
            input: texts,
        };
        let mut res = post_json::<OpenAiEmbeddingResponse, _>(&self.client, &self.endpoint, &req)?;
        res.data.sort_by_key(|entry| entry.index);
        let vectors = res.data.into_iter().map(|entry| entry.embedding).collect();
        finish(texts.len(), vectors, self.normalize)
    }
}

/// Runs `op`, retrying up to `retries` times when the failure looks
/// transient.
pub fn with_retry<T>(
    retries: usize,
    mut op: impl FnMut() -> Result<T, EmbeddingError>,
) -> Result<T, EmbeddingError> {
    let mut attempt = 0usize;
    loop {
        match op() {
            Ok(v) => return Ok(v),
            Err(err) if err.is_transient() && attempt < retries => {
                attempt += 1;
                let backoff = retry_backoff(attempt);
                warn!(error = %err, attempt, ?backoff, "retrying embedding request");
                thread::sleep(backoff);
            }
            Err(err) => return Err(err),
        }
    }
}

fn retry_backoff(attempt: usize) -> Duration {
    let capped = attempt.min(5) as u32;
    Duration::from_millis(500 * (1 << capped))
}

fn finish(
    requested: usize,
    mut vectors: Vec<Vec<f32>>,
    normalize: bool,
) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    if vectors.len() != requested {
        return Err(EmbeddingError::CountMismatch {
            requested,
            returned: vectors.len(),
        });
    }
    if normalize {
        vectors.iter_mut().for_each(|v| l2_normalize(v));
    }
    Ok(vectors)
}

/// Scales `v` to unit length. Zero vectors are left untouched.
pub fn l2_normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter_mut().for_each(|x| *x /= norm);
    }
}

fn parse_embeddings(value: Value) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    if let Some(embeddings) = value.get("embeddings") {
        return parse_embeddings_value(embeddings);
    }
    if let Some(embedding) = value.get("embedding") {
        return parse_embeddings_value(embedding);
    }
    Err(EmbeddingError::Malformed("no embeddings in response".to_string()))
}

fn parse_embeddings_value(value: &Value) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    let arr = value
        .as_array()
        .ok_or_else(|| EmbeddingError::Malformed("invalid embeddings format".to_string()))?;
    if arr.is_empty() {
        return Ok(vec![]);
    }
    if arr[0].is_array() {
        return arr.iter().map(parse_vec).collect();
    }
    Ok(vec![parse_vec(value)?])
}

fn parse_vec(value: &Value) -> Result<Vec<f32>, EmbeddingError> {
    let arr = value
        .as_array()
        .ok_or_else(|| EmbeddingError::Malformed("embedding is not an array".to_string()))?;
    arr.iter()
        .map(|v| {
            v.as_f64()
                .map(|n| n as f32)
                .ok_or_else(|| EmbeddingError::Malformed("embedding value is not a number".to_string()))
        })
        .collect()
}
