use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::vector_index::DEFAULT_TOP_K;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EmbedProvider {
    Ollama,
    OpenAi,
}

impl FromStr for EmbedProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAi),
            other => Err(ConfigError::UnknownProvider {
                kind: "embedding",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChatProvider {
    Ollama,
    /// Any OpenAI-compatible chat completions endpoint (Groq by default).
    Groq,
}

impl FromStr for ChatProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "groq" | "openai" => Ok(Self::Groq),
            other => Err(ConfigError::UnknownProvider {
                kind: "chat",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub source_dir: String,
    pub exclude_dirs: Vec<String>,
    pub max_file_bytes: u64,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k: usize,
    pub excerpt_chars: usize,
    pub embed_provider: EmbedProvider,
    pub embed_model: String,
    pub embed_normalize: bool,
    pub embed_batch_size: usize,
    pub embed_retries: usize,
    pub chat_provider: ChatProvider,
    pub chat_model: String,
    pub ollama_url: String,
    pub openai_base_url: String,
    pub openai_api_key: String,
    pub groq_base_url: String,
    pub groq_api_key: String,
    pub http_timeout: Duration,
    pub log_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_dir: "./".to_string(),
            exclude_dirs: [".git", "target", "node_modules"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            max_file_bytes: 50_000_000,
            chunk_size: 1000,
            chunk_overlap: 100,
            top_k: DEFAULT_TOP_K,
            excerpt_chars: 300,
            embed_provider: EmbedProvider::Ollama,
            embed_model: "nomic-embed-text".to_string(),
            embed_normalize: true,
            embed_batch_size: 64,
            embed_retries: 1,
            chat_provider: ChatProvider::Ollama,
            chat_model: "llama3.1:8b".to_string(),
            ollama_url: "http://localhost:11434".to_string(),
            openai_base_url: "https://api.openai.com/v1".to_string(),
            openai_api_key: String::new(),
            groq_base_url: "https://api.groq.com/openai/v1".to_string(),
            groq_api_key: String::new(),
            http_timeout: Duration::from_secs(120),
            log_file: "pdfchat.log".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env if present so provider keys work without manual `source .env`.
        let _ = dotenvy::dotenv();
        let defaults = Self::default();

        let embed_provider = match env::var("RAG_EMBED_PROVIDER") {
            Ok(v) => v.parse()?,
            Err(_) => defaults.embed_provider,
        };
        let chat_provider = match env::var("RAG_CHAT_PROVIDER") {
            Ok(v) => v.parse()?,
            Err(_) => defaults.chat_provider,
        };
        let chat_model = env::var("RAG_CHAT_MODEL").unwrap_or_else(|_| match chat_provider {
            ChatProvider::Ollama => defaults.chat_model.clone(),
            ChatProvider::Groq => "llama3-8b-8192".to_string(),
        });
        let embed_model = env::var("RAG_EMBED_MODEL").unwrap_or_else(|_| match embed_provider {
            EmbedProvider::Ollama => defaults.embed_model.clone(),
            EmbedProvider::OpenAi => "text-embedding-3-small".to_string(),
        });

        let cfg = Self {
            source_dir: env::var("RAG_SOURCE_DIR").unwrap_or(defaults.source_dir),
            exclude_dirs: env::var("RAG_EXCLUDE_DIRS")
                .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or(defaults.exclude_dirs),
            max_file_bytes: parsed_var("RAG_MAX_FILE_BYTES").unwrap_or(defaults.max_file_bytes),
            chunk_size: parsed_var("RAG_CHUNK_SIZE").unwrap_or(defaults.chunk_size),
            chunk_overlap: parsed_var("RAG_CHUNK_OVERLAP").unwrap_or(defaults.chunk_overlap),
            top_k: parsed_var("RAG_TOP_K").unwrap_or(defaults.top_k),
            excerpt_chars: parsed_var("RAG_EXCERPT_CHARS").unwrap_or(defaults.excerpt_chars),
            embed_provider,
            embed_model,
            embed_normalize: parsed_var("RAG_EMBED_NORMALIZE").unwrap_or(defaults.embed_normalize),
            embed_batch_size: parsed_var("RAG_EMBED_BATCH_SIZE")
                .unwrap_or(defaults.embed_batch_size),
            embed_retries: parsed_var("RAG_EMBED_RETRIES").unwrap_or(defaults.embed_retries),
            chat_provider,
            chat_model,
            ollama_url: env::var("OLLAMA_URL").unwrap_or(defaults.ollama_url),
            openai_base_url: env::var("OPENAI_BASE_URL").unwrap_or(defaults.openai_base_url),
            openai_api_key: env::var("OPENAI_API_KEY").unwrap_or_default(),
            groq_base_url: env::var("GROQ_BASE_URL").unwrap_or(defaults.groq_base_url),
            groq_api_key: env::var("GROQ_API_KEY").unwrap_or_default(),
            http_timeout: parsed_var("RAG_HTTP_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.http_timeout),
            log_file: env::var("RAG_LOG_FILE").unwrap_or(defaults.log_file),
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::ZeroChunkSize);
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(ConfigError::OverlapTooLarge {
                size: self.chunk_size,
                overlap: self.chunk_overlap,
            });
        }
        if self.top_k == 0 {
            return Err(ConfigError::ZeroTopK);
        }
        if self.embed_provider == EmbedProvider::OpenAi && self.openai_api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey("OPENAI_API_KEY"));
        }
        if self.chat_provider == ChatProvider::Groq && self.groq_api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey("GROQ_API_KEY"));
        }
        Ok(())
    }
}

fn parsed_var<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}
