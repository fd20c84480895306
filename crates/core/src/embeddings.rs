use crate::error::ProviderError;
use crate::traits::EmbeddingProvider;
use std::sync::Arc;

/// Binds an embedding provider to the configured model.
#[derive(Clone)]
pub struct EmbeddingGateway {
    provider: Arc<dyn EmbeddingProvider>,
    model: String,
}

impl EmbeddingGateway {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Embeds every text in one provider call. Empty input makes no call.
    pub async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let vectors = self.provider.create_embeddings(&self.model, texts).await?;
        if vectors.len() != texts.len() {
            return Err(ProviderError::malformed(
                "embeddings",
                format!("{} vectors for {} inputs", vectors.len(), texts.len()),
            ));
        }

        Ok(vectors)
    }

    pub async fn embed_one(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        self.embed_many(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::malformed("embeddings", "empty embedding response"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingProvider {
        calls: Mutex<Vec<(String, Vec<String>)>>,
        drop_last: bool,
    }

    #[async_trait]
    impl EmbeddingProvider for RecordingProvider {
        async fn create_embeddings(
            &self,
            model: &str,
            texts: &[String],
        ) -> Result<Vec<Vec<f32>>, ProviderError> {
            self.calls
                .lock()
                .expect("lock")
                .push((model.to_string(), texts.to_vec()));
            let mut vectors: Vec<Vec<f32>> =
                texts.iter().map(|text| vec![text.len() as f32]).collect();
            if self.drop_last {
                vectors.pop();
            }
            Ok(vectors)
        }
    }

    #[tokio::test]
    async fn empty_batch_skips_the_provider() {
        let provider = Arc::new(RecordingProvider::default());
        let gateway = EmbeddingGateway::new(provider.clone(), "model-a");

        let vectors = gateway.embed_many(&[]).await.expect("empty batch succeeds");

        assert!(vectors.is_empty());
        assert!(provider.calls.lock().expect("lock").is_empty());
    }

    #[tokio::test]
    async fn batch_is_sent_once_in_order() {
        let provider = Arc::new(RecordingProvider::default());
        let gateway = EmbeddingGateway::new(provider.clone(), "model-a");
        let texts = vec!["a".to_string(), "bbb".to_string()];

        let vectors = gateway.embed_many(&texts).await.expect("batch succeeds");

        assert_eq!(vectors, vec![vec![1.0], vec![3.0]]);
        let calls = provider.calls.lock().expect("lock");
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0], ("model-a".to_string(), texts));
    }

    #[tokio::test]
    async fn short_responses_are_rejected() {
        let provider = Arc::new(RecordingProvider {
            drop_last: true,
            ..RecordingProvider::default()
        });
        let gateway = EmbeddingGateway::new(provider, "model-a");

        let result = gateway.embed_many(&["x".to_string(), "y".to_string()]).await;
        assert!(matches!(result, Err(ProviderError::MalformedResponse { .. })));
    }

    #[tokio::test]
    async fn single_query_returns_its_vector() {
        let gateway = EmbeddingGateway::new(Arc::new(RecordingProvider::default()), "model-a");
        assert_eq!(gateway.embed_one("four").await.expect("embeds"), vec![4.0]);
    }
}
