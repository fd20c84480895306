use anyhow::{anyhow, bail, Result};
use clap::{Args, ValueEnum};
use pdf_qa_core::providers::openai::DEFAULT_BASE_URL;
use pdf_qa_core::{
    embedding_dimension, AnswerCoordinator, AnswerOptions, EmbeddingGateway, IngestionOptions,
    Ingestor, LopdfExtractor, MemoryIndex, OpenAiClient, PineconeAdmin, PineconeIndex,
    VectorIndex, VectorStoreGateway,
};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum VectorBackend {
    /// Hosted Pinecone index.
    Pinecone,
    /// Process-local index; contents vanish on exit.
    Memory,
}

/// Pipeline settings shared by every command. Each flag also reads its environment variable.
#[derive(Debug, Clone, Args)]
pub struct Settings {
    /// Embedding model identifier
    #[arg(long, env = "EMBEDDING_MODEL", default_value = "text-embedding-3-large")]
    pub embedding_model: String,

    /// Chat completion model identifier
    #[arg(long = "chat-model", env = "GPT_MODEL", default_value = "gpt-4.1-mini")]
    pub chat_model: String,

    /// Chunk size in whitespace-separated tokens
    #[arg(long, env = "CHUNK_SIZE", default_value_t = 800)]
    pub chunk_size: usize,

    /// Tokens shared by consecutive chunks
    #[arg(long, env = "CHUNK_OVERLAP", default_value_t = 120)]
    pub chunk_overlap: usize,

    /// Chunks retrieved per question
    #[arg(long, env = "MAX_CONTEXT_CHUNKS", default_value_t = 6)]
    pub max_context_chunks: usize,

    /// Largest accepted upload, in megabytes
    #[arg(long, env = "MAX_UPLOAD_SIZE_MB", default_value_t = 25)]
    pub max_upload_size_mb: usize,

    /// API key for the OpenAI-compatible provider
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    /// Base URL of the OpenAI-compatible provider
    #[arg(long, env = "OPENAI_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub openai_base_url: String,

    /// Vector index implementation
    #[arg(long, env = "VECTOR_BACKEND", value_enum, default_value_t = VectorBackend::Pinecone)]
    pub vector_backend: VectorBackend,

    /// Pinecone API key
    #[arg(long, env = "PINECONE_API_KEY", hide_env_values = true)]
    pub pinecone_api_key: Option<String>,

    /// Pinecone index host, e.g. my-index-abc123.svc.us-east-1.pinecone.io
    #[arg(long, env = "PINECONE_INDEX_HOST")]
    pub pinecone_index_host: Option<String>,
}

pub struct Services {
    pub ingestor: Ingestor,
    pub coordinator: AnswerCoordinator,
}

impl Settings {
    pub fn ingestion_options(&self) -> IngestionOptions {
        IngestionOptions {
            chunk_size: self.chunk_size,
            chunk_overlap: self.chunk_overlap,
            max_upload_size_mb: self.max_upload_size_mb,
        }
    }

    pub fn answer_options(&self) -> AnswerOptions {
        AnswerOptions {
            chat_model: self.chat_model.clone(),
            max_context_chunks: self.max_context_chunks,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            bail!("CHUNK_SIZE must be at least 1");
        }
        if self.max_context_chunks == 0 {
            bail!("MAX_CONTEXT_CHUNKS must be at least 1");
        }
        if self.chunk_overlap >= self.chunk_size {
            warn!(
                chunk_size = self.chunk_size,
                chunk_overlap = self.chunk_overlap,
                "overlap is not smaller than chunk size, chunks will advance one token at a time"
            );
        }
        Ok(())
    }

    /// Index width: the explicit value, else the known width of the embedding model.
    pub fn index_dimension(&self, explicit: Option<usize>) -> Result<usize> {
        match explicit.or_else(|| embedding_dimension(&self.embedding_model)) {
            Some(0) => bail!("index dimension must be at least 1"),
            Some(dimension) => Ok(dimension),
            None => bail!(
                "unknown dimension for embedding model {}, pass --dimension",
                self.embedding_model
            ),
        }
    }

    pub fn pinecone_admin(&self, control_url: &str) -> Result<PineconeAdmin> {
        let api_key = self
            .pinecone_api_key
            .as_deref()
            .ok_or_else(|| anyhow!("PINECONE_API_KEY is required to manage indexes"))?;
        Ok(PineconeAdmin::new(control_url, api_key)?)
    }

    fn vector_index(&self) -> Result<Arc<dyn VectorIndex>> {
        match self.vector_backend {
            VectorBackend::Pinecone => {
                let host = self.pinecone_index_host.as_deref().ok_or_else(|| {
                    anyhow!("PINECONE_INDEX_HOST is required for the pinecone backend")
                })?;
                let api_key = self.pinecone_api_key.as_deref().ok_or_else(|| {
                    anyhow!("PINECONE_API_KEY is required for the pinecone backend")
                })?;
                Ok(Arc::new(PineconeIndex::new(host, api_key)?))
            }
            VectorBackend::Memory => {
                warn!("using the in-memory vector index, ingested documents are lost on exit");
                Ok(Arc::new(MemoryIndex::new()))
            }
        }
    }

    pub fn build_services(&self) -> Result<Services> {
        self.validate()?;

        let api_key = self
            .openai_api_key
            .as_deref()
            .ok_or_else(|| anyhow!("OPENAI_API_KEY is required"))?;
        let openai = Arc::new(OpenAiClient::new(&self.openai_base_url, api_key)?);

        let embeddings = EmbeddingGateway::new(openai.clone(), &self.embedding_model);
        let store = VectorStoreGateway::new(self.vector_index()?);

        let ingestor = Ingestor::new(
            Arc::new(LopdfExtractor),
            embeddings.clone(),
            store.clone(),
            self.ingestion_options(),
        );
        let coordinator = AnswerCoordinator::new(embeddings, store, openai, self.answer_options());

        info!(
            embedding_model = %self.embedding_model,
            chat_model = %self.chat_model,
            backend = ?self.vector_backend,
            "services ready"
        );

        Ok(Services {
            ingestor,
            coordinator,
        })
    }
}

/// Splits a comma-separated origin list, dropping blanks.
pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}
