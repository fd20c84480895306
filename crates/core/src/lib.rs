pub mod chunking;
pub mod context;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod ingest;
pub mod models;
pub mod orchestrator;
pub mod providers;
pub mod store;
pub mod stores;
#[doc(hidden)]
pub mod testing;
pub mod traits;

pub use chunking::{chunk_text, chunk_windows, normalize_whitespace, ChunkingConfig};
pub use context::{assemble_context, AssembledContext, DocumentRef};
pub use embeddings::EmbeddingGateway;
pub use error::{AnswerError, IngestError, ProviderError, StoreError};
pub use extractor::{LopdfExtractor, PageText, PdfExtractor};
pub use ingest::{
    digest_bytes, discover_pdf_files, paginate_chunks, validate_upload, FolderIngestion,
    Ingestor, PagedChunks, SkippedPdf,
};
pub use models::{
    AnswerOptions, ChatRequest, ChatResponse, Chunk, Citation, IngestionOptions,
    IngestionReport, TokenUsage, UploadResponse, PDF_MEDIA_TYPE, SNIPPET_MAX_CHARS,
};
pub use orchestrator::{build_prompt, AnswerCoordinator};
pub use providers::{embedding_dimension, OpenAiClient};
pub use store::{record_id, VectorMatch, VectorRecord, VectorStoreGateway};
pub use stores::{
    IndexDescription, IndexSetup, IndexSpec, IndexStats, MemoryIndex, PineconeAdmin,
    PineconeIndex,
};
pub use traits::{
    ChatMessage, ChatProvider, Completion, EmbeddingProvider, IndexMatch, IndexVector, Role,
    VectorIndex,
};
