use thiserror::Error;

/// Failure reported by an external capability: embedding, chat completion, or vector index.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{backend} returned {status}: {details}")]
    BackendResponse {
        backend: String,
        status: u16,
        details: String,
    },

    #[error("malformed response from {backend}: {details}")]
    MalformedResponse { backend: String, details: String },

    #[error("provider misconfigured: {0}")]
    Configuration(String),
}

impl ProviderError {
    pub fn malformed(backend: &str, details: impl Into<String>) -> Self {
        Self::MalformedResponse {
            backend: backend.to_string(),
            details: details.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("misaligned arrays: {chunks} chunks, {embeddings} embeddings, {pages} pages")]
    Alignment {
        chunks: usize,
        embeddings: usize,
        pages: usize,
    },

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Only PDF uploads are supported (got {0}).")]
    UnsupportedMediaType(String),

    #[error("Uploaded file appears to be empty.")]
    EmptyUpload,

    #[error("File exceeds {limit_mb}MB limit.")]
    PayloadTooLarge { size_bytes: usize, limit_mb: usize },

    #[error("Unable to read text from the supplied PDF: {0}")]
    UnreadablePdf(String),

    #[error("misaligned arrays: {chunks} chunks, {embeddings} embeddings, {pages} pages")]
    Alignment {
        chunks: usize,
        embeddings: usize,
        pages: usize,
    },

    #[error("embedding provider failed: {0}")]
    EmbeddingProvider(#[source] ProviderError),

    #[error("vector store failed: {0}")]
    VectorStoreProvider(#[source] ProviderError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl IngestError {
    /// True when the caller sent something unusable, false for server-side failures.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedMediaType(_)
                | Self::EmptyUpload
                | Self::PayloadTooLarge { .. }
                | Self::UnreadablePdf(_)
        )
    }
}

impl From<StoreError> for IngestError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Alignment {
                chunks,
                embeddings,
                pages,
            } => Self::Alignment {
                chunks,
                embeddings,
                pages,
            },
            StoreError::Provider(inner) => Self::VectorStoreProvider(inner),
        }
    }
}

#[derive(Debug, Error)]
pub enum AnswerError {
    #[error("Question cannot be empty.")]
    EmptyQuestion,

    #[error("At least one document_id is required to run retrieval.")]
    NoDocumentScope,

    #[error("embedding provider failed: {0}")]
    EmbeddingProvider(#[source] ProviderError),

    #[error("vector store failed: {0}")]
    VectorStoreProvider(#[source] ProviderError),

    #[error("chat provider failed: {0}")]
    ChatProvider(#[source] ProviderError),
}

impl AnswerError {
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::EmptyQuestion | Self::NoDocumentScope)
    }
}

pub type Result<T, E = IngestError> = std::result::Result<T, E>;
