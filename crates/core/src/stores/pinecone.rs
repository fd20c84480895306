use crate::error::ProviderError;
use crate::traits::{IndexMatch, IndexVector, VectorIndex};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde_json::{json, Map, Value};
use url::Url;

const BACKEND: &str = "pinecone";

/// Data-plane client for one Pinecone index, addressed by its host URL.
pub struct PineconeIndex {
    host: Url,
    api_key: String,
    client: Client,
}

impl PineconeIndex {
    pub fn new(host: &str, api_key: impl Into<String>) -> Result<Self, ProviderError> {
        let host = if host.contains("://") {
            host.to_string()
        } else {
            format!("https://{host}")
        };
        let mut host = Url::parse(&host)?;
        if !host.path().ends_with('/') {
            let path = format!("{}/", host.path());
            host.set_path(&path);
        }

        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ProviderError::Configuration(
                "pinecone api key is empty".to_string(),
            ));
        }

        Ok(Self {
            host,
            api_key,
            client: Client::new(),
        })
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value, ProviderError> {
        let request = self
            .client
            .post(self.host.join(path)?)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body);
        send_json(BACKEND, request).await
    }

    /// Reports the index dimension, total vector count and namespace count.
    pub async fn describe_stats(&self) -> Result<IndexStats, ProviderError> {
        let parsed = self.post("describe_index_stats", json!({})).await?;
        parse_index_stats(&parsed)
    }
}

pub(crate) const API_KEY_HEADER: &str = "Api-Key";

/// Sends a Pinecone request and decodes the JSON body, turning non-2xx into `BackendResponse`.
pub(crate) async fn send_json(
    backend: &str,
    request: RequestBuilder,
) -> Result<Value, ProviderError> {
    let response = request.send().await?;

    let status = response.status();
    if !status.is_success() {
        let details = response.text().await.unwrap_or_default();
        return Err(ProviderError::BackendResponse {
            backend: backend.to_string(),
            status: status.as_u16(),
            details,
        });
    }

    Ok(response.json().await?)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexStats {
    pub dimension: usize,
    pub total_vector_count: u64,
    pub namespace_count: usize,
}

fn parse_index_stats(parsed: &Value) -> Result<IndexStats, ProviderError> {
    let dimension = parsed
        .pointer("/dimension")
        .and_then(Value::as_u64)
        .ok_or_else(|| ProviderError::malformed(BACKEND, "index stats have no dimension"))?;
    let total_vector_count = parsed
        .pointer("/totalVectorCount")
        .and_then(Value::as_u64)
        .unwrap_or(0);
    let namespace_count = parsed
        .pointer("/namespaces")
        .and_then(Value::as_object)
        .map_or(0, Map::len);

    Ok(IndexStats {
        dimension: dimension as usize,
        total_vector_count,
        namespace_count,
    })
}

fn parse_matches(parsed: &Value) -> Result<Vec<IndexMatch>, ProviderError> {
    let hits = parsed
        .pointer("/matches")
        .and_then(Value::as_array)
        .ok_or_else(|| ProviderError::malformed(BACKEND, "query response has no matches array"))?;

    let mut result = Vec::with_capacity(hits.len());
    for hit in hits {
        let id = hit
            .pointer("/id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let score = hit.pointer("/score").and_then(Value::as_f64).unwrap_or(0.0);
        let metadata = hit
            .pointer("/metadata")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_else(Map::new);

        result.push(IndexMatch {
            id,
            score,
            metadata,
        });
    }

    Ok(result)
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    async fn upsert(
        &self,
        namespace: &str,
        vectors: Vec<IndexVector>,
    ) -> Result<(), ProviderError> {
        if vectors.is_empty() {
            return Ok(());
        }

        self.post(
            "vectors/upsert",
            json!({
                "vectors": vectors,
                "namespace": namespace,
            }),
        )
        .await?;

        Ok(())
    }

    async fn query(
        &self,
        namespace: &str,
        vector: &[f32],
        top_k: usize,
        include_metadata: bool,
    ) -> Result<Vec<IndexMatch>, ProviderError> {
        let parsed = self
            .post(
                "query",
                json!({
                    "namespace": namespace,
                    "vector": vector,
                    "topK": top_k,
                    "includeMetadata": include_metadata,
                }),
            )
            .await?;

        parse_matches(&parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_without_scheme_gets_https() {
        let index = PineconeIndex::new("my-index-abc.svc.pinecone.io", "key").expect("valid host");
        assert_eq!(
            index.host.join("query").expect("joins").as_str(),
            "https://my-index-abc.svc.pinecone.io/query"
        );
    }

    #[test]
    fn empty_api_key_is_rejected() {
        let result = PineconeIndex::new("https://host", "  ");
        assert!(matches!(result, Err(ProviderError::Configuration(_))));
    }

    #[test]
    fn matches_keep_provider_order_and_metadata() {
        let parsed = json!({
            "matches": [
                {"id": "d:1", "score": 0.91, "metadata": {"page": 3, "text": "x"}},
                {"id": "d:0", "score": 0.42}
            ],
            "namespace": "d"
        });

        let matches = parse_matches(&parsed).expect("matches parse");

        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].id, "d:1");
        assert_eq!(matches[0].metadata["page"], 3);
        assert!(matches[1].metadata.is_empty());
        assert!((matches[1].score - 0.42).abs() < f64::EPSILON);
    }

    #[test]
    fn index_stats_report_dimension_and_counts() {
        let parsed = json!({
            "namespaces": {
                "doc-a": {"vectorCount": 4},
                "doc-b": {"vectorCount": 2}
            },
            "dimension": 3072,
            "indexFullness": 0.0,
            "totalVectorCount": 6
        });

        let stats = parse_index_stats(&parsed).expect("stats parse");

        assert_eq!(
            stats,
            IndexStats {
                dimension: 3072,
                total_vector_count: 6,
                namespace_count: 2,
            }
        );
    }

    #[test]
    fn empty_index_stats_count_zero() {
        let stats = parse_index_stats(&json!({"dimension": 1536, "namespaces": {}}))
            .expect("stats parse");
        assert_eq!(stats.total_vector_count, 0);
        assert_eq!(stats.namespace_count, 0);
    }

    #[test]
    fn stats_without_dimension_are_malformed() {
        let result = parse_index_stats(&json!({"totalVectorCount": 3}));
        assert!(matches!(result, Err(ProviderError::MalformedResponse { .. })));
    }

    #[test]
    fn missing_matches_is_malformed() {
        let result = parse_matches(&json!({"results": []}));
        assert!(matches!(result, Err(ProviderError::MalformedResponse { .. })));
    }
}
