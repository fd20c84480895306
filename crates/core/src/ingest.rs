use crate::chunking::{chunk_windows, normalize_whitespace, ChunkingConfig};
use crate::embeddings::EmbeddingGateway;
use crate::error::IngestError;
use crate::extractor::{PageText, PdfExtractor};
use crate::models::{IngestionOptions, IngestionReport, PDF_MEDIA_TYPE};
use crate::store::VectorStoreGateway;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;
use walkdir::WalkDir;

/// Chunks of a whole document with the page each chunk was attributed to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PagedChunks {
    pub chunks: Vec<String>,
    /// Parallel to `chunks`. 0 when the window holds no page start.
    pub pages: Vec<u32>,
}

/// Chunks all pages as one token stream so windows can cross page boundaries.
///
/// The first token of every non-empty page carries that page's number as a zero-width
/// marker. A window is attributed to the first marker it contains, or page 0.
pub fn paginate_chunks(pages: &[PageText], config: ChunkingConfig) -> PagedChunks {
    let normalized: Vec<(u32, String)> = pages
        .iter()
        .map(|page| (page.number, normalize_whitespace(&page.text)))
        .filter(|(_, text)| !text.is_empty())
        .collect();

    let mut tokens = Vec::new();
    let mut markers = Vec::new();
    for (number, text) in &normalized {
        for (position, token) in text.split(' ').enumerate() {
            tokens.push(token);
            markers.push((position == 0).then_some(*number));
        }
    }

    let mut paged = PagedChunks::default();
    for window in chunk_windows(tokens.len(), config) {
        let text = tokens[window.clone()].join(" ");
        if text.is_empty() {
            continue;
        }
        let page = markers[window].iter().find_map(|marker| *marker).unwrap_or(0);
        paged.chunks.push(text);
        paged.pages.push(page);
    }

    paged
}

fn media_type_essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Upload checks, in order: media type, emptiness, size.
pub fn validate_upload(
    bytes: &[u8],
    content_type: &str,
    options: &IngestionOptions,
) -> Result<(), IngestError> {
    if media_type_essence(content_type) != PDF_MEDIA_TYPE {
        return Err(IngestError::UnsupportedMediaType(content_type.to_string()));
    }

    if bytes.is_empty() {
        return Err(IngestError::EmptyUpload);
    }

    if bytes.len() > options.max_upload_bytes() {
        return Err(IngestError::PayloadTooLarge {
            size_bytes: bytes.len(),
            limit_mb: options.max_upload_size_mb,
        });
    }

    Ok(())
}

pub fn digest_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Turns uploaded PDF bytes into a stored, searchable document.
#[derive(Clone)]
pub struct Ingestor {
    extractor: Arc<dyn PdfExtractor>,
    embeddings: EmbeddingGateway,
    store: VectorStoreGateway,
    options: IngestionOptions,
}

impl Ingestor {
    pub fn new(
        extractor: Arc<dyn PdfExtractor>,
        embeddings: EmbeddingGateway,
        store: VectorStoreGateway,
        options: IngestionOptions,
    ) -> Self {
        Self {
            extractor,
            embeddings,
            store,
            options,
        }
    }

    pub fn options(&self) -> &IngestionOptions {
        &self.options
    }

    pub async fn ingest(&self, bytes: &[u8], content_type: &str) -> Result<Uuid, IngestError> {
        Ok(self.ingest_with_report(bytes, content_type).await?.document_id)
    }

    pub async fn ingest_with_report(
        &self,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<IngestionReport, IngestError> {
        let started = Instant::now();
        validate_upload(bytes, content_type, &self.options)?;

        let pages = self.extract(bytes).await?;
        let paged = paginate_chunks(&pages, ChunkingConfig::from(&self.options));
        let document_id = Uuid::new_v4();

        if paged.chunks.is_empty() {
            debug!(%document_id, "no text to embed, skipping embedding and upsert");
        }

        let embeddings = self
            .embeddings
            .embed_many(&paged.chunks)
            .await
            .map_err(IngestError::EmbeddingProvider)?;

        let written = self
            .store
            .upsert(document_id, &paged.chunks, &embeddings, &paged.pages)
            .await?;

        let report = IngestionReport {
            document_id,
            page_count: pages.len(),
            chunk_count: written,
            content_sha256: digest_bytes(bytes),
        };

        info!(
            document_id = %report.document_id,
            pages = report.page_count,
            chunk_count = report.chunk_count,
            sha256 = %report.content_sha256,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "pdf ingested"
        );

        Ok(report)
    }

    async fn extract(&self, bytes: &[u8]) -> Result<Vec<PageText>, IngestError> {
        let extractor = Arc::clone(&self.extractor);
        let owned = bytes.to_vec();
        tokio::task::spawn_blocking(move || extractor.extract_pages(&owned))
            .await
            .map_err(|error| {
                IngestError::UnreadablePdf(format!("extraction task failed: {error}"))
            })?
    }

    /// Ingests one PDF file or every PDF below a folder, skipping files that fail.
    pub async fn ingest_path(&self, path: &Path) -> Result<FolderIngestion, IngestError> {
        let files = if path.is_dir() {
            discover_pdf_files(path)
        } else {
            vec![path.to_path_buf()]
        };

        let mut result = FolderIngestion::default();
        for file in files {
            let outcome = match tokio::fs::read(&file).await {
                Ok(bytes) => self.ingest_with_report(&bytes, PDF_MEDIA_TYPE).await,
                Err(error) => Err(IngestError::Io(error)),
            };

            match outcome {
                Ok(report) => result.ingested.push((file, report)),
                Err(error) => result.skipped.push(SkippedPdf {
                    path: file,
                    reason: error.to_string(),
                }),
            }
        }

        Ok(result)
    }
}

#[derive(Debug)]
pub struct SkippedPdf {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct FolderIngestion {
    pub ingested: Vec<(PathBuf, IngestionReport)>,
    pub skipped: Vec<SkippedPdf>,
}

pub fn discover_pdf_files(folder: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(folder)
        .into_iter()
        .filter_map(|item| item.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
        })
        .map(|entry| entry.path().to_path_buf())
        .collect();

    files.sort_unstable();
    files
}
