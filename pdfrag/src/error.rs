use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("chunk_size must be greater than zero")]
    ZeroChunkSize,

    #[error("chunk_overlap ({overlap}) must be smaller than chunk_size ({size})")]
    OverlapTooLarge { size: usize, overlap: usize },

    #[error("top_k must be greater than zero")]
    ZeroTopK,

    #[error("missing API key: set {0}")]
    MissingApiKey(&'static str),

    #[error("unknown {kind} provider `{value}`")]
    UnknownProvider { kind: &'static str, value: String },
}

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("{method} {url} failed: {source}")]
    Request {
        method: &'static str,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{method} {url} failed: {status} {body}")]
    Status {
        method: &'static str,
        url: String,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("{method} {url} decode failed: {message} | {body}")]
    Decode {
        method: &'static str,
        url: String,
        message: String,
        body: String,
    },

    #[error("API key is not a valid header value: {0}")]
    InvalidApiKey(#[source] reqwest::header::InvalidHeaderValue),
}

impl HttpError {
    /// Timeouts, connection failures, throttling and server errors.
    pub fn is_transient(&self) -> bool {
        match self {
            HttpError::Request { source, .. } => source.is_timeout() || source.is_connect(),
            HttpError::Status { status, .. } => {
                *status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            }
            HttpError::Decode { .. } | HttpError::InvalidApiKey(_) => false,
        }
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("{filename}: not a PDF file")]
    NotPdf { filename: String },

    #[error("{filename}: PDF is encrypted")]
    Encrypted { filename: String },

    #[error("{filename}: unreadable PDF: {reason}")]
    Unreadable { filename: String, reason: String },

    #[error("{path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error, PartialEq)]
pub enum IndexError {
    #[error("no text chunks were produced from the documents")]
    Empty,

    #[error("{chunks} chunks but {vectors} vectors")]
    LengthMismatch { chunks: usize, vectors: usize },

    #[error("vector {position} has dimension {found}, index dimension is {expected}")]
    DimensionMismatch {
        position: usize,
        expected: usize,
        found: usize,
    },

    #[error("vectors must have at least one dimension")]
    ZeroDimension,
}

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding service error: {0}")]
    Http(#[from] HttpError),

    #[error("embedding service returned an invalid response: {0}")]
    Malformed(String),

    #[error("embedding service returned {returned} vectors for {requested} inputs")]
    CountMismatch { requested: usize, returned: usize },
}

impl EmbeddingError {
    pub fn is_transient(&self) -> bool {
        matches!(self, EmbeddingError::Http(err) if err.is_transient())
    }
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generation service error: {0}")]
    Http(#[from] HttpError),

    #[error("generation service returned no answer")]
    EmptyResponse,
}

#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("no documents to process")]
    NoDocuments,

    #[error("processing cancelled")]
    Cancelled,

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    Index(#[from] IndexError),
}

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("no documents have been processed")]
    NotReady,

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    Generation(#[from] GenerationError),
}
