use crate::error::ProviderError;
use crate::models::TokenUsage;
use crate::traits::{ChatMessage, ChatProvider, Completion, EmbeddingProvider};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1/";

const EMBEDDINGS_BACKEND: &str = "openai-embeddings";
const CHAT_BACKEND: &str = "openai-chat";

/// Output width of the hosted OpenAI embedding models, for sizing a vector index.
pub fn embedding_dimension(model: &str) -> Option<usize> {
    match model {
        "text-embedding-3-large" => Some(3072),
        "text-embedding-3-small" | "text-embedding-ada-002" => Some(1536),
        _ => None,
    }
}

/// OpenAI-compatible REST client serving both embeddings and chat completions.
pub struct OpenAiClient {
    base_url: Url,
    api_key: String,
    client: Client,
}

impl OpenAiClient {
    pub fn new(base_url: &str, api_key: impl Into<String>) -> Result<Self, ProviderError> {
        let mut base_url = Url::parse(base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ProviderError::Configuration(
                "openai api key is empty".to_string(),
            ));
        }

        Ok(Self {
            base_url,
            api_key,
            client: Client::new(),
        })
    }

    async fn post(&self, backend: &str, path: &str, body: Value) -> Result<Value, ProviderError> {
        let response = self
            .client
            .post(self.base_url.join(path)?)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

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
}

/// Restores input order from each item's `index`. The indices must cover `0..data.len()` exactly
/// and every component must be a number.
fn parse_embeddings(parsed: &Value) -> Result<Vec<Vec<f32>>, ProviderError> {
    let data = parsed
        .pointer("/data")
        .and_then(Value::as_array)
        .ok_or_else(|| ProviderError::malformed(EMBEDDINGS_BACKEND, "missing data array"))?;

    let mut slots: Vec<Option<Vec<f32>>> = vec![None; data.len()];
    for (position, item) in data.iter().enumerate() {
        let index = item
            .pointer("/index")
            .and_then(Value::as_u64)
            .map_or(position, |index| index as usize);
        if index >= slots.len() {
            return Err(ProviderError::malformed(
                EMBEDDINGS_BACKEND,
                format!("item {position} has index {index} outside 0..{}", slots.len()),
            ));
        }

        let components = item
            .pointer("/embedding")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                ProviderError::malformed(
                    EMBEDDINGS_BACKEND,
                    format!("item {position} has no embedding"),
                )
            })?;
        let mut vector = Vec::with_capacity(components.len());
        for (offset, value) in components.iter().enumerate() {
            let component = value.as_f64().ok_or_else(|| {
                ProviderError::malformed(
                    EMBEDDINGS_BACKEND,
                    format!("item {position} component {offset} is not a number"),
                )
            })?;
            vector.push(component as f32);
        }

        if slots[index].replace(vector).is_some() {
            return Err(ProviderError::malformed(
                EMBEDDINGS_BACKEND,
                format!("index {index} appears more than once"),
            ));
        }
    }

    // Every slot is filled: indices are in range, unique, and as many as the items.
    Ok(slots.into_iter().flatten().collect())
}

fn parse_completion(parsed: &Value) -> Completion {
    let text = parsed
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .map(str::to_string);

    let usage = parsed.pointer("/usage").and_then(|usage| {
        Some(TokenUsage {
            prompt_tokens: usage.pointer("/prompt_tokens")?.as_u64()?,
            completion_tokens: usage.pointer("/completion_tokens")?.as_u64()?,
        })
    });

    Completion { text, usage }
}

#[async_trait]
impl EmbeddingProvider for OpenAiClient {
    async fn create_embeddings(
        &self,
        model: &str,
        texts: &[String],
    ) -> Result<Vec<Vec<f32>>, ProviderError> {
        let parsed = self
            .post(
                EMBEDDINGS_BACKEND,
                "embeddings",
                json!({
                    "model": model,
                    "input": texts,
                }),
            )
            .await?;

        parse_embeddings(&parsed)
    }
}

#[async_trait]
impl ChatProvider for OpenAiClient {
    async fn complete(
        &self,
        model: &str,
        messages: &[ChatMessage],
    ) -> Result<Completion, ProviderError> {
        let parsed = self
            .post(
                CHAT_BACKEND,
                "chat/completions",
                json!({
                    "model": model,
                    "messages": messages,
                }),
            )
            .await?;

        Ok(parse_completion(&parsed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gains_trailing_slash() {
        let client = OpenAiClient::new("http://localhost:8080/v1", "sk-test").expect("valid url");
        assert_eq!(
            client.base_url.join("embeddings").expect("joins").as_str(),
            "http://localhost:8080/v1/embeddings"
        );
    }

    #[test]
    fn known_models_have_dimensions() {
        assert_eq!(embedding_dimension("text-embedding-3-large"), Some(3072));
        assert_eq!(embedding_dimension("text-embedding-3-small"), Some(1536));
        assert_eq!(embedding_dimension("nomic-embed-text"), None);
    }

    #[test]
    fn embeddings_follow_the_index_field() {
        let parsed = json!({
            "data": [
                {"index": 1, "embedding": [0.5, 0.25]},
                {"index": 0, "embedding": [1.0, 0.0]}
            ]
        });

        let vectors = parse_embeddings(&parsed).expect("embeddings parse");
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.5, 0.25]]);
    }

    #[test]
    fn non_numeric_components_are_malformed() {
        let parsed = json!({
            "data": [
                {"index": 0, "embedding": [1.0, "oops", null]},
                {"index": 1, "embedding": [2.0, 2.0, 2.0]}
            ]
        });

        let result = parse_embeddings(&parsed);
        assert!(matches!(result, Err(ProviderError::MalformedResponse { .. })));
    }

    #[test]
    fn duplicate_indices_are_malformed() {
        let parsed = json!({
            "data": [
                {"index": 0, "embedding": [1.0, 1.0]},
                {"index": 0, "embedding": [2.0, 2.0]}
            ]
        });

        let result = parse_embeddings(&parsed);
        assert!(matches!(result, Err(ProviderError::MalformedResponse { .. })));
    }

    #[test]
    fn out_of_range_indices_are_malformed() {
        let parsed = json!({
            "data": [
                {"index": 0, "embedding": [1.0]},
                {"index": 5, "embedding": [2.0]}
            ]
        });

        let result = parse_embeddings(&parsed);
        assert!(matches!(result, Err(ProviderError::MalformedResponse { .. })));
    }

    #[test]
    fn embeddings_without_data_are_malformed() {
        let result = parse_embeddings(&json!({"error": "nope"}));
        assert!(matches!(result, Err(ProviderError::MalformedResponse { .. })));
    }

    #[test]
    fn completion_reads_primary_choice_and_usage() {
        let parsed = json!({
            "choices": [
                {"message": {"role": "assistant", "content": "It is 42. (Page 3)"}},
                {"message": {"role": "assistant", "content": "ignored"}}
            ],
            "usage": {"prompt_tokens": 120, "completion_tokens": 9, "total_tokens": 129}
        });

        let completion = parse_completion(&parsed);
        assert_eq!(completion.text.as_deref(), Some("It is 42. (Page 3)"));
        assert_eq!(
            completion.usage,
            Some(TokenUsage {
                prompt_tokens: 120,
                completion_tokens: 9
            })
        );
    }

    #[test]
    fn completion_without_content_or_usage() {
        let completion = parse_completion(&json!({
            "choices": [{"message": {"role": "assistant", "content": null}}]
        }));
        assert_eq!(completion, Completion::default());
    }

    #[test]
    fn chat_messages_serialize_with_lowercase_roles() {
        let value = serde_json::to_value(ChatMessage::system("be brief")).expect("serializes");
        assert_eq!(value, json!({"role": "system", "content": "be brief"}));
    }
}
