use crate::context::assemble_context;
use crate::embeddings::EmbeddingGateway;
use crate::error::AnswerError;
use crate::models::{AnswerOptions, ChatResponse};
use crate::store::VectorStoreGateway;
use crate::traits::{ChatMessage, ChatProvider};
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

const SYSTEM_INSTRUCTION: &str = "You are a retrieval augmented assistant. \
     Only answer with information from the provided context.";

pub fn build_prompt(context: &str, question: &str) -> String {
    format!(
        "You are a helpful assistant that answers questions using the provided context.\n\
         Use only the supplied context snippets to craft your answer.\n\
         If the answer is not in the context, reply that you do not know.\n\
         Always cite the page numbers you relied on.\n\
         \n\
         Context:\n\
         {context}\n\
         \n\
         User question: {question}\n"
    )
}

/// Answers a question from one document's stored chunks.
#[derive(Clone)]
pub struct AnswerCoordinator {
    embeddings: EmbeddingGateway,
    store: VectorStoreGateway,
    chat: Arc<dyn ChatProvider>,
    options: AnswerOptions,
}

impl AnswerCoordinator {
    pub fn new(
        embeddings: EmbeddingGateway,
        store: VectorStoreGateway,
        chat: Arc<dyn ChatProvider>,
        options: AnswerOptions,
    ) -> Self {
        Self {
            embeddings,
            store,
            chat,
            options,
        }
    }

    /// Model used to embed questions; the same one chunks were embedded with.
    pub fn embedding_model(&self) -> &str {
        self.embeddings.model()
    }

    pub async fn answer(
        &self,
        question: &str,
        document_ids: Option<&[Uuid]>,
        session_id: Option<Uuid>,
    ) -> Result<ChatResponse, AnswerError> {
        if question.trim().is_empty() {
            return Err(AnswerError::EmptyQuestion);
        }

        let scope = document_ids.unwrap_or_default();
        let Some(first) = scope.first() else {
            return Err(AnswerError::NoDocumentScope);
        };
        if scope.len() > 1 {
            debug!(
                ignored = scope.len() - 1,
                "only the first document id is searched"
            );
        }

        let started = Instant::now();
        let namespace = first.to_string();

        let query_vector = self
            .embeddings
            .embed_one(question)
            .await
            .map_err(AnswerError::EmbeddingProvider)?;

        let matches = self
            .store
            .query(&query_vector, self.options.max_context_chunks, &namespace)
            .await
            .map_err(AnswerError::VectorStoreProvider)?;

        let assembled = assemble_context(&matches);

        let messages = [
            ChatMessage::system(SYSTEM_INSTRUCTION),
            ChatMessage::user(build_prompt(&assembled.context, question)),
        ];
        let completion = self
            .chat
            .complete(&self.options.chat_model, &messages)
            .await
            .map_err(AnswerError::ChatProvider)?;

        info!(
            %namespace,
            embedding_model = self.embeddings.model(),
            citations = assembled.citations.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "question answered"
        );

        Ok(ChatResponse {
            session_id: session_id.unwrap_or_else(Uuid::new_v4),
            answer: completion.text.unwrap_or_default(),
            citations: assembled.citations,
            created_at: Utc::now(),
            usage: completion.usage,
        })
    }
}
