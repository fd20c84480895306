use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use uuid::Uuid;

pub const PDF_MEDIA_TYPE: &str = "application/pdf";

/// Upper bound on citation snippet length, in characters.
pub const SNIPPET_MAX_CHARS: usize = 280;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub document_id: Uuid,
    pub chunk_index: usize,
    /// Originating page, 1-based. 0 when unknown.
    pub page: u32,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub document_id: Uuid,
    pub page: u32,
    pub score: f64,
    pub snippet: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    #[serde(rename = "input_tokens")]
    pub prompt_tokens: u64,
    #[serde(rename = "output_tokens")]
    pub completion_tokens: u64,
}

#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub session_id: Uuid,
    pub answer: String,
    pub citations: Vec<Citation>,
    pub created_at: DateTime<Utc>,
    pub usage: Option<TokenUsage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub question: String,
    #[serde(default)]
    pub session_id: Option<Uuid>,
    #[serde(default)]
    pub document_ids: Option<Vec<Uuid>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResponse {
    pub document_id: Uuid,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestionReport {
    pub document_id: Uuid,
    pub page_count: usize,
    pub chunk_count: usize,
    pub content_sha256: String,
}

#[derive(Debug, Clone)]
pub struct IngestionOptions {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub max_upload_size_mb: usize,
}

impl IngestionOptions {
    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_size_mb.saturating_mul(1024 * 1024)
    }
}

impl Default for IngestionOptions {
    fn default() -> Self {
        Self {
            chunk_size: 800,
            chunk_overlap: 120,
            max_upload_size_mb: 25,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AnswerOptions {
    pub chat_model: String,
    pub max_context_chunks: usize,
}

impl Default for AnswerOptions {
    fn default() -> Self {
        Self {
            chat_model: "gpt-4.1-mini".to_string(),
            max_context_chunks: 6,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_response_omits_missing_usage() {
        let response = ChatResponse {
            session_id: Uuid::nil(),
            answer: "42".to_string(),
            citations: Vec::new(),
            created_at: Utc::now(),
            usage: None,
        };

        let json = serde_json::to_value(&response).expect("response serializes");
        assert!(json.get("usage").is_none());
        assert_eq!(json["answer"], "42");
    }

    #[test]
    fn usage_uses_input_output_names() {
        let usage = TokenUsage {
            prompt_tokens: 12,
            completion_tokens: 3,
        };

        let json = serde_json::to_value(usage).expect("usage serializes");
        assert_eq!(json["input_tokens"], 12);
        assert_eq!(json["output_tokens"], 3);
    }

    #[test]
    fn chat_request_scope_is_optional() {
        let request: ChatRequest =
            serde_json::from_str(r#"{"question":"What is X?"}"#).expect("request parses");
        assert!(request.document_ids.is_none());
        assert!(request.session_id.is_none());
    }

    #[test]
    fn upload_limit_is_in_mebibytes() {
        let options = IngestionOptions {
            max_upload_size_mb: 2,
            ..IngestionOptions::default()
        };
        assert_eq!(options.max_upload_bytes(), 2 * 1024 * 1024);
    }
}
