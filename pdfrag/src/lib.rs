mod build_prompt;
mod chunk_text;
mod config;
mod embed_chunks;
mod embed_query;
mod error;
mod generate;
mod http;
mod load_pdf;
mod retrieve_chunks;
mod scan_files;
mod session;
mod transcript;
mod vector_index;

use std::sync::Arc;

pub use build_prompt::{build_prompt, excerpt, CHUNK_DELIMITER, FALLBACK_ANSWER, NOT_READY_MESSAGE};
pub use chunk_text::{chunk_pages, chunk_text, Chunk};
pub use config::{ChatProvider, Config, EmbedProvider};
pub use embed_chunks::{l2_normalize, with_retry, Embedder, OllamaEmbedder, OpenAiEmbedder};
pub use embed_query::embed_query;
pub use error::{
    ConfigError, EmbeddingError, GenerationError, HttpError, IndexError, LoadError,
    ProcessingError, QueryError,
};
pub use generate::{Generator, OllamaGenerator, OpenAiCompatGenerator};
pub use load_pdf::{pages_from_texts, Document, DocumentLoader, Page, PdfLoader};
pub use retrieve_chunks::Retriever;
pub use scan_files::scan_files;
pub use session::{
    Answer, BuildJob, BuildProgress, BuiltIndex, FailedDocument, Pipeline, ProcessReport,
    QueryJob, Session, SessionPhase, SourceRef,
};
pub use transcript::{Role, Transcript, TranscriptEntry};
pub use vector_index::{Hit, VectorIndex, DEFAULT_TOP_K};

use http::build_client;

/// Builds the embedding and chat clients named by `cfg`. Each gets its own
/// HTTP client, created once here and reused for every request.
pub fn providers_from_config(
    cfg: &Config,
) -> Result<(Arc<dyn Embedder>, Arc<dyn Generator>), HttpError> {
    let embedder: Arc<dyn Embedder> = match cfg.embed_provider {
        EmbedProvider::Ollama => Arc::new(OllamaEmbedder::new(
            build_client(cfg.http_timeout, None)?,
            &cfg.ollama_url,
            &cfg.embed_model,
            cfg.embed_normalize,
        )),
        EmbedProvider::OpenAi => Arc::new(OpenAiEmbedder::new(
            build_client(cfg.http_timeout, Some(&cfg.openai_api_key))?,
            &cfg.openai_base_url,
            &cfg.embed_model,
            cfg.embed_normalize,
        )),
    };
    let generator: Arc<dyn Generator> = match cfg.chat_provider {
        ChatProvider::Ollama => Arc::new(OllamaGenerator::new(
            build_client(cfg.http_timeout, None)?,
            &cfg.ollama_url,
            &cfg.chat_model,
        )),
        ChatProvider::Groq => Arc::new(OpenAiCompatGenerator::new(
            build_client(cfg.http_timeout, Some(&cfg.groq_api_key))?,
            &cfg.groq_base_url,
            &cfg.chat_model,
        )),
    };
    Ok((embedder, generator))
}

/// A pipeline wired to the configured providers and the PDF loader.
pub fn pipeline_from_config(cfg: Config) -> Result<Pipeline, HttpError> {
    let (embedder, generator) = providers_from_config(&cfg)?;
    Ok(Pipeline::new(cfg, Arc::new(PdfLoader), embedder, generator))
}
