//! HTTP API over [`StatementPipeline`].
//!
//! `POST /extract` returns the extraction result as JSON and
//! `POST /extract/csv` returns only the transactions table as a CSV
//! attachment. Both take a multipart form with the PDF in field `file`.

use crate::core::pipeline::StatementPipeline;
use crate::core::{CompletionProvider, DocumentReader, Storage};
use crate::domain::model::ExtractionResult;
use crate::utils::error::PipelineError;
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

const UPLOAD_FIELD: &str = "file";
const CSV_FILENAME: &str = "transactions.csv";

pub fn router<R, P, S>(pipeline: Arc<StatementPipeline<R, P, S>>, max_upload_bytes: usize) -> Router
where
    R: DocumentReader + 'static,
    P: CompletionProvider + 'static,
    S: Storage + 'static,
{
    Router::new()
        .route("/", get(root))
        .route("/extract", post(extract::<R, P, S>))
        .route("/extract/csv", post(extract_csv::<R, P, S>))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(pipeline)
}

#[derive(Debug, Serialize)]
struct StatusMessage {
    message: &'static str,
}

async fn root() -> Json<StatusMessage> {
    Json(StatusMessage {
        message: "Bank Statement Extraction API is running",
    })
}

async fn extract<R, P, S>(
    State(pipeline): State<Arc<StatementPipeline<R, P, S>>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ExtractionResult>, ApiError>
where
    R: DocumentReader,
    P: CompletionProvider,
    S: Storage,
{
    let upload = read_upload(multipart?).await?;
    let result = pipeline.extract_upload(&upload.filename, &upload.bytes).await?;

    tracing::info!(
        document = %upload.filename,
        table_found = result.is_table_found(),
        "✅ Extraction completed"
    );
    Ok(Json(result))
}

async fn extract_csv<R, P, S>(
    State(pipeline): State<Arc<StatementPipeline<R, P, S>>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError>
where
    R: DocumentReader,
    P: CompletionProvider,
    S: Storage,
{
    let upload = read_upload(multipart?).await?;
    let result = pipeline.extract_upload(&upload.filename, &upload.bytes).await?;

    match result.transactions_csv() {
        Some(csv) => Ok((
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", CSV_FILENAME),
                ),
            ],
            csv.to_string(),
        )
            .into_response()),
        None => Err(ApiError::no_table(&upload.filename)),
    }
}

struct Upload {
    filename: String,
    bytes: Vec<u8>,
}

async fn read_upload(mut multipart: Multipart) -> Result<Upload, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let filename = field
            .file_name()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or("upload.pdf")
            .to_string();
        let bytes = field.bytes().await?;

        if bytes.is_empty() {
            return Err(invalid_upload(format!("uploaded file '{}' is empty", filename)).into());
        }

        return Ok(Upload {
            filename,
            bytes: bytes.to_vec(),
        });
    }

    Err(invalid_upload(format!("missing multipart field '{}'", UPLOAD_FIELD)).into())
}

fn invalid_upload(message: impl Into<String>) -> PipelineError {
    PipelineError::InvalidUpload {
        message: message.into(),
    }
}

/// Error response body: `{"error": {"kind", "message", "suggestion"}}`.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Serialize)]
struct ErrorDetail {
    kind: &'static str,
    message: String,
    suggestion: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: ErrorDetail,
}

impl ApiError {
    fn no_table(document: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            detail: ErrorDetail {
                kind: "no_table",
                message: format!("No transactions table was found in '{}'", document),
                suggestion: "Use POST /extract to get the details the model extracted".to_string(),
            },
        }
    }
}

pub fn status_for(err: &PipelineError) -> StatusCode {
    match err {
        PipelineError::Extraction { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        PipelineError::Classification { .. } => StatusCode::BAD_GATEWAY,
        PipelineError::InvalidUpload { .. } => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        let status = status_for(&err);
        if status.is_server_error() {
            tracing::error!(
                error = %err,
                category = ?err.category(),
                severity = ?err.severity(),
                "❌ Request failed"
            );
        } else {
            tracing::warn!(error = %err, "Request rejected");
        }

        Self {
            status,
            detail: ErrorDetail {
                kind: err.kind(),
                message: err.user_friendly_message(),
                suggestion: err.recovery_suggestion(),
            },
        }
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        invalid_upload(rejection.body_text()).into()
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        let status = err.status();
        let mut api_error: ApiError = invalid_upload(err.body_text()).into();
        if status == StatusCode::PAYLOAD_TOO_LARGE {
            api_error.status = status;
        }
        api_error
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { error: self.detail })).into_response()
    }
}
