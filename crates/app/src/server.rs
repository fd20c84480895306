use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use pdf_qa_core::{
    AnswerCoordinator, AnswerError, ChatRequest, ChatResponse, IngestError, Ingestor,
    UploadResponse,
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{error, warn};

const UPLOAD_FIELD: &str = "file";
const UPLOAD_MESSAGE: &str = "PDF ingested successfully.";
const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

// Multipart framing on top of the file itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    ingestor: Arc<Ingestor>,
    coordinator: Arc<AnswerCoordinator>,
}

impl AppState {
    pub fn new(ingestor: Ingestor, coordinator: AnswerCoordinator) -> Self {
        Self {
            ingestor: Arc::new(ingestor),
            coordinator: Arc::new(coordinator),
        }
    }
}

pub fn router(state: AppState, cors: CorsLayer) -> Router {
    let body_limit = state.ingestor.options().max_upload_bytes() + MULTIPART_OVERHEAD_BYTES;

    Router::new()
        .route(
            "/api/uploads/pdf",
            post(upload_pdf).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/api/chat/qa", post(answer_question))
        .route("/healthz", get(healthz))
        .with_state(state)
        .layer(cors)
}

/// Allows the listed origins with any method and header.
/// An empty list allows no cross-origin calls.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn healthz() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn upload_pdf(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), ApiError> {
    let mut upload = None;
    while let Some(field) = multipart.next_field().await.map_err(ApiError::multipart)? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let content_type = field
            .content_type()
            .unwrap_or(FALLBACK_CONTENT_TYPE)
            .to_string();
        let bytes = field.bytes().await.map_err(ApiError::multipart)?;
        upload = Some((content_type, bytes));
        break;
    }

    let Some((content_type, bytes)) = upload else {
        return Err(IngestError::EmptyUpload.into());
    };

    let document_id = state.ingestor.ingest(&bytes, &content_type).await?;

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            document_id,
            message: UPLOAD_MESSAGE.to_string(),
        }),
    ))
}

async fn answer_question(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let response = state
        .coordinator
        .answer(
            &request.question,
            request.document_ids.as_deref(),
            request.session_id,
        )
        .await?;
    Ok(Json(response))
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    detail: String,
}

/// Error surface of the HTTP boundary. Provider details stay in the logs.
#[derive(Debug)]
pub enum ApiError {
    Ingest(IngestError),
    Answer(AnswerError),
    Multipart { status: StatusCode, detail: String },
}

impl ApiError {
    fn multipart(rejection: axum::extract::multipart::MultipartError) -> Self {
        Self::Multipart {
            status: rejection.status(),
            detail: rejection.body_text(),
        }
    }

    fn status_and_detail(&self) -> (StatusCode, String) {
        match self {
            ApiError::Ingest(IngestError::PayloadTooLarge { .. }) => {
                (StatusCode::PAYLOAD_TOO_LARGE, self.client_detail())
            }
            ApiError::Ingest(error) if error.is_client_error() => {
                (StatusCode::BAD_REQUEST, self.client_detail())
            }
            ApiError::Answer(error) if error.is_client_error() => {
                (StatusCode::BAD_REQUEST, self.client_detail())
            }
            ApiError::Multipart { status, detail } => (*status, detail.clone()),
            ApiError::Ingest(error) => {
                error!(error = %error, "ingestion failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    server_detail_for_ingest(error).to_string(),
                )
            }
            ApiError::Answer(error) => {
                error!(error = %error, "question answering failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    server_detail_for_answer(error).to_string(),
                )
            }
        }
    }

    fn client_detail(&self) -> String {
        match self {
            ApiError::Ingest(error) => error.to_string(),
            ApiError::Answer(error) => error.to_string(),
            ApiError::Multipart { detail, .. } => detail.clone(),
        }
    }
}

fn server_detail_for_ingest(error: &IngestError) -> &'static str {
    match error {
        IngestError::EmbeddingProvider(_) => "Embedding provider unavailable.",
        IngestError::VectorStoreProvider(_) => "Vector store unavailable.",
        _ => "Failed to ingest the PDF.",
    }
}

fn server_detail_for_answer(error: &AnswerError) -> &'static str {
    match error {
        AnswerError::EmbeddingProvider(_) => "Embedding provider unavailable.",
        AnswerError::VectorStoreProvider(_) => "Vector store unavailable.",
        AnswerError::ChatProvider(_) => "Chat provider unavailable.",
        _ => "Failed to answer the question.",
    }
}

impl From<IngestError> for ApiError {
    fn from(error: IngestError) -> Self {
        ApiError::Ingest(error)
    }
}

impl From<AnswerError> for ApiError {
    fn from(error: AnswerError) -> Self {
        ApiError::Answer(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = self.status_and_detail();
        (status, Json(ErrorBody { detail })).into_response()
    }
}
