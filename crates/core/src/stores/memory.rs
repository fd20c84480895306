//! Namespaced in-process vector index.
//!
//! Brute-force cosine similarity over every vector in the queried namespace. Used for
//! tests and for local runs without a hosted index.

use crate::error::ProviderError;
use crate::traits::{IndexMatch, IndexVector, VectorIndex};
use async_trait::async_trait;
use serde_json::Map;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

#[derive(Default)]
pub struct MemoryIndex {
    namespaces: RwLock<HashMap<String, BTreeMap<String, IndexVector>>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn namespace_len(&self, namespace: &str) -> usize {
        self.namespaces
            .read()
            .await
            .get(namespace)
            .map_or(0, BTreeMap::len)
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let mag_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if mag_a < f32::EPSILON || mag_b < f32::EPSILON {
        0.0
    } else {
        f64::from(dot / (mag_a * mag_b))
    }
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    async fn upsert(
        &self,
        namespace: &str,
        vectors: Vec<IndexVector>,
    ) -> Result<(), ProviderError> {
        let mut namespaces = self.namespaces.write().await;
        let entries = namespaces.entry(namespace.to_string()).or_default();
        for vector in vectors {
            entries.insert(vector.id.clone(), vector);
        }
        Ok(())
    }

    async fn query(
        &self,
        namespace: &str,
        vector: &[f32],
        top_k: usize,
        include_metadata: bool,
    ) -> Result<Vec<IndexMatch>, ProviderError> {
        let namespaces = self.namespaces.read().await;
        let Some(entries) = namespaces.get(namespace) else {
            return Ok(Vec::new());
        };

        let mut matches: Vec<IndexMatch> = entries
            .values()
            .map(|stored| IndexMatch {
                id: stored.id.clone(),
                score: cosine_similarity(vector, &stored.values),
                metadata: if include_metadata {
                    stored.metadata.clone()
                } else {
                    Map::new()
                },
            })
            .collect();

        matches.sort_by(|left, right| {
            right
                .score
                .partial_cmp(&left.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| left.id.cmp(&right.id))
        });
        matches.truncate(top_k);

        Ok(matches)
    }
}
