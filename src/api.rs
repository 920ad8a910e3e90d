use crate::pipeline::{PipelineError, RagPipeline};
use anyhow::Result;
use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

pub type AppState = Arc<RagPipeline>;

pub const WELCOME_MESSAGE: &str = "Welcome to the document Q&A API.";

const NO_FILENAME: &str = "Uploaded file has no filename";
const MISSING_FILE_FIELD: &str = "Missing 'file' field in upload";

#[derive(Deserialize)]
pub struct QueryRequest {
    pub question: String,
    pub document_name: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct QueryResponse {
    pub response: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ProcessResponse {
    pub status: String,
    pub message: String,
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Internal(String),
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Unreadable(_) => ApiError::BadRequest(err.to_string()),
            PipelineError::DocumentNotFound(_) => ApiError::NotFound(err.to_string()),
            PipelineError::Internal(e) => ApiError::Internal(format!("{e:#}")),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(detail) => {
                tracing::error!("request failed: {}", detail);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

/// CORS for the browser frontend; credentials are allowed, so methods and
/// headers mirror the request instead of using wildcards.
pub fn cors_layer(origins: &[String]) -> Result<CorsLayer> {
    let origins = origins
        .iter()
        .map(|o| HeaderValue::from_str(o))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request()))
}

pub fn router(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/", get(read_root))
        .route("/process-document", post(process_document))
        .route("/query", post(process_query))
        .layer(DefaultBodyLimit::disable())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn read_root() -> Json<serde_json::Value> {
    Json(json!({ "message": WELCOME_MESSAGE }))
}

async fn process_document(
    State(pipeline): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ProcessResponse>, ApiError> {
    let bad_upload = |e: axum::extract::multipart::MultipartError| {
        ApiError::BadRequest(format!("Error processing file: {}", e.body_text()))
    };

    while let Some(field) = multipart.next_field().await.map_err(bad_upload)? {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| ApiError::BadRequest(NO_FILENAME.to_string()))?;
        let bytes = field.bytes().await.map_err(bad_upload)?;

        tracing::info!("processing uploaded file: {}", filename);
        let processed = pipeline.process_document(&filename, bytes.to_vec()).await?;
        return Ok(Json(ProcessResponse {
            status: "success".to_string(),
            message: format!(
                "Document '{}' processed and stored in collection '{}'.",
                filename, processed.collection
            ),
        }));
    }

    Err(ApiError::BadRequest(MISSING_FILE_FIELD.to_string()))
}

async fn process_query(
    State(pipeline): State<AppState>,
    Json(query): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, ApiError> {
    tracing::info!("query against '{}'", query.document_name);
    let response = pipeline.query(&query.question, &query.document_name).await?;
    Ok(Json(QueryResponse { response }))
}
