use crate::error::{ProviderError, StoreError};
use crate::models::Chunk;
use crate::traits::{IndexMatch, IndexVector, VectorIndex};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Persisted form of one chunk and its embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorRecord {
    pub chunk: Chunk,
    pub values: Vec<f32>,
}

impl VectorRecord {
    /// `{document_id}:{chunk_index}`
    pub fn id(&self) -> String {
        record_id(self.chunk.document_id, self.chunk.chunk_index)
    }

    fn into_index_vector(self) -> IndexVector {
        let id = self.id();
        let mut metadata = Map::new();
        metadata.insert("document_id".into(), json!(self.chunk.document_id.to_string()));
        metadata.insert("chunk_index".into(), json!(self.chunk.chunk_index));
        metadata.insert("page".into(), json!(self.chunk.page));
        metadata.insert("text".into(), json!(self.chunk.text));

        IndexVector {
            id,
            values: self.values,
            metadata,
        }
    }
}

pub fn record_id(document_id: Uuid, chunk_index: usize) -> String {
    format!("{document_id}:{chunk_index}")
}

/// A retrieval hit with its raw metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorMatch {
    pub id: String,
    pub score: f64,
    pub metadata: Map<String, Value>,
}

impl From<IndexMatch> for VectorMatch {
    fn from(value: IndexMatch) -> Self {
        Self {
            id: value.id,
            score: value.score,
            metadata: value.metadata,
        }
    }
}

/// Upserts and queries scoped to one namespace per document.
#[derive(Clone)]
pub struct VectorStoreGateway {
    index: Arc<dyn VectorIndex>,
}

impl VectorStoreGateway {
    pub fn new(index: Arc<dyn VectorIndex>) -> Self {
        Self { index }
    }

    pub async fn upsert(
        &self,
        document_id: Uuid,
        chunks: &[String],
        embeddings: &[Vec<f32>],
        pages: &[u32],
    ) -> Result<usize, StoreError> {
        if chunks.len() != embeddings.len() || chunks.len() != pages.len() {
            return Err(StoreError::Alignment {
                chunks: chunks.len(),
                embeddings: embeddings.len(),
                pages: pages.len(),
            });
        }

        if chunks.is_empty() {
            return Ok(0);
        }

        let vectors: Vec<IndexVector> = chunks
            .iter()
            .zip(embeddings)
            .zip(pages)
            .enumerate()
            .map(|(chunk_index, ((text, values), page))| {
                VectorRecord {
                    chunk: Chunk {
                        document_id,
                        chunk_index,
                        page: *page,
                        text: text.clone(),
                    },
                    values: values.clone(),
                }
                .into_index_vector()
            })
            .collect();

        let count = vectors.len();
        let namespace = document_id.to_string();
        self.index.upsert(&namespace, vectors).await?;
        debug!(%namespace, count, "upserted vectors");

        Ok(count)
    }

    pub async fn query(
        &self,
        embedding: &[f32],
        top_k: usize,
        namespace: &str,
    ) -> Result<Vec<VectorMatch>, ProviderError> {
        let matches = self.index.query(namespace, embedding, top_k, true).await?;
        debug!(namespace, top_k, returned = matches.len(), "vector query");
        Ok(matches.into_iter().map(VectorMatch::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingIndex {
        upserts: Mutex<Vec<(String, Vec<IndexVector>)>>,
        queries: Mutex<Vec<(String, usize, bool)>>,
        hits: Vec<IndexMatch>,
    }

    #[async_trait]
    impl VectorIndex for RecordingIndex {
        async fn upsert(
            &self,
            namespace: &str,
            vectors: Vec<IndexVector>,
        ) -> Result<(), ProviderError> {
            self.upserts
                .lock()
                .expect("lock")
                .push((namespace.to_string(), vectors));
            Ok(())
        }

        async fn query(
            &self,
            namespace: &str,
            _vector: &[f32],
            top_k: usize,
            include_metadata: bool,
        ) -> Result<Vec<IndexMatch>, ProviderError> {
            self.queries
                .lock()
                .expect("lock")
                .push((namespace.to_string(), top_k, include_metadata));
            Ok(self.hits.clone())
        }
    }

    fn texts(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[tokio::test]
    async fn misaligned_inputs_write_nothing() {
        let index = Arc::new(RecordingIndex::default());
        let gateway = VectorStoreGateway::new(index.clone());

        let result = gateway
            .upsert(
                Uuid::new_v4(),
                &texts(&["a", "b", "c"]),
                &[vec![0.1], vec![0.2]],
                &[1, 1, 2],
            )
            .await;

        assert!(matches!(
            result,
            Err(StoreError::Alignment {
                chunks: 3,
                embeddings: 2,
                pages: 3
            })
        ));
        assert!(index.upserts.lock().expect("lock").is_empty());
    }

    #[tokio::test]
    async fn empty_chunks_write_nothing() {
        let index = Arc::new(RecordingIndex::default());
        let gateway = VectorStoreGateway::new(index.clone());

        let written = gateway
            .upsert(Uuid::new_v4(), &[], &[], &[])
            .await
            .expect("empty upsert succeeds");

        assert_eq!(written, 0);
        assert!(index.upserts.lock().expect("lock").is_empty());
    }

    #[tokio::test]
    async fn records_are_keyed_and_namespaced_by_document() {
        let index = Arc::new(RecordingIndex::default());
        let gateway = VectorStoreGateway::new(index.clone());
        let document_id = Uuid::new_v4();

        gateway
            .upsert(
                document_id,
                &texts(&["first", "second"]),
                &[vec![1.0, 0.0], vec![0.0, 1.0]],
                &[1, 2],
            )
            .await
            .expect("upsert succeeds");

        let upserts = index.upserts.lock().expect("lock");
        assert_eq!(upserts.len(), 1);
        let (namespace, vectors) = &upserts[0];
        assert_eq!(namespace, &document_id.to_string());
        assert_eq!(vectors[1].id, format!("{document_id}:1"));
        assert_eq!(vectors[1].values, vec![0.0, 1.0]);
        assert_eq!(vectors[1].metadata["document_id"], document_id.to_string());
        assert_eq!(vectors[1].metadata["chunk_index"], 1);
        assert_eq!(vectors[1].metadata["page"], 2);
        assert_eq!(vectors[1].metadata["text"], "second");
    }

    #[tokio::test]
    async fn query_requests_metadata_and_keeps_provider_order() {
        let index = Arc::new(RecordingIndex {
            hits: vec![
                IndexMatch {
                    id: "d:3".to_string(),
                    score: 0.9,
                    metadata: Map::new(),
                },
                IndexMatch {
                    id: "d:0".to_string(),
                    score: 0.4,
                    metadata: Map::new(),
                },
            ],
            ..RecordingIndex::default()
        });
        let gateway = VectorStoreGateway::new(index.clone());

        let matches = gateway.query(&[0.5], 4, "ns-1").await.expect("query succeeds");

        assert_eq!(
            matches.iter().map(|hit| hit.id.as_str()).collect::<Vec<_>>(),
            vec!["d:3", "d:0"]
        );
        assert_eq!(
            index.queries.lock().expect("lock").as_slice(),
            &[("ns-1".to_string(), 4, true)]
        );
    }
}
