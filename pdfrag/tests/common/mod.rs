#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use pdfrag::{
    pages_from_texts, Config, Document, DocumentLoader, EmbeddingError, Embedder,
    GenerationError, Generator, LoadError, Page, Pipeline, DEFAULT_TOP_K, FALLBACK_ANSWER,
};

pub const DIM: usize = 64;

/// Hashes lowercase words into a fixed number of buckets, so texts sharing
/// words end up close under cosine similarity.
#[derive(Default)]
pub struct BagOfWordsEmbedder {
    pub calls: AtomicUsize,
    pub fail: bool,
}

impl BagOfWordsEmbedder {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

pub fn bag_of_words(text: &str) -> Vec<f32> {
    let mut v = vec![0.0f32; DIM];
    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        let mut h: u64 = 0xcbf29ce484222325;
        for b in word.to_lowercase().bytes() {
            h ^= b as u64;
            h = h.wrapping_mul(0x100000001b3);
        }
        v[(h % DIM as u64) as usize] += 1.0;
    }
    v
}

impl Embedder for BagOfWordsEmbedder {
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(EmbeddingError::Malformed("embedding backend down".to_string()));
        }
        Ok(texts.iter().map(|t| bag_of_words(t)).collect())
    }
}

/// Answers with `answer` when the prompt's context mentions `keyword`,
/// otherwise with the fallback sentence. Records every prompt.
pub struct KeywordGenerator {
    pub keyword: String,
    pub answer: String,
    pub fail: bool,
    pub prompts: Mutex<Vec<String>>,
}

impl KeywordGenerator {
    pub fn new(keyword: &str, answer: &str) -> Self {
        Self {
            keyword: keyword.to_string(),
            answer: answer.to_string(),
            fail: false,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new("", "")
        }
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().expect("prompt log poisoned").len()
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().expect("prompt log poisoned").last().cloned()
    }
}

impl Generator for KeywordGenerator {
    fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        self.prompts
            .lock()
            .expect("prompt log poisoned")
            .push(prompt.to_string());
        if self.fail {
            return Err(GenerationError::EmptyResponse);
        }
        let context = prompt
            .split("<context>")
            .nth(1)
            .and_then(|rest| rest.split("</context>").next())
            .unwrap_or_default();
        if !self.keyword.is_empty() && context.contains(&self.keyword) {
            Ok(self.answer.clone())
        } else {
            Ok(FALLBACK_ANSWER.to_string())
        }
    }
}

/// Treats document bytes as UTF-8 with pages separated by form feeds.
/// Documents whose bytes start with `BAD` fail to load.
pub struct TextLoader;

impl DocumentLoader for TextLoader {
    fn load(&self, doc: &Document) -> Result<Vec<Page>, LoadError> {
        let text = String::from_utf8_lossy(&doc.bytes);
        if text.starts_with("BAD") {
            return Err(LoadError::Unreadable {
                filename: doc.filename.clone(),
                reason: "corrupt".to_string(),
            });
        }
        let pages = text.split('\x0C').map(|p| p.to_string()).collect();
        Ok(pages_from_texts(&doc.filename, pages))
    }
}

pub fn doc(name: &str, pages: &[&str]) -> Document {
    Document::new(name, pages.join("\x0C").into_bytes())
}

pub fn test_config() -> Config {
    Config {
        chunk_size: 200,
        chunk_overlap: 20,
        top_k: DEFAULT_TOP_K,
        embed_retries: 0,
        ..Config::default()
    }
}

pub fn pipeline(
    cfg: Config,
    embedder: Arc<BagOfWordsEmbedder>,
    generator: Arc<KeywordGenerator>,
) -> Pipeline {
    Pipeline::new(cfg, Arc::new(TextLoader), embedder, generator)
}
