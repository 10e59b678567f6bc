//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::web::{state::AppState, USER_ID_HEADER};
use axum::{
    extract::{Multipart, Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
};
use chrono::{DateTime, Utc};
use docvault_core::domain::{ActorId, AnalysisRecord, DocumentVersion, DocumentVersionId};
use docvault_core::ports::PortError;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, warn};
use utoipa::{OpenApi, ToSchema};

/// Actor recorded for uploads that do not carry an `x-user-id` header.
pub const DEFAULT_UPLOADER: ActorId = 1;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        upload_file_handler,
        list_files_handler,
        analyze_file_handler,
        get_analysis_handler,
    ),
    components(
        schemas(FileResponse, AnalysisResponse, ErrorResponse)
    ),
    tags(
        (name = "files", description = "Versioned document storage and analysis.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// A stored document version.
#[derive(Debug, Serialize, ToSchema)]
pub struct FileResponse {
    id: DocumentVersionId,
    original_name: String,
    version: i32,
    uploaded_at: DateTime<Utc>,
    size_bytes: i64,
}

impl From<DocumentVersion> for FileResponse {
    fn from(v: DocumentVersion) -> Self {
        Self {
            id: v.id,
            original_name: v.original_name,
            version: v.version,
            uploaded_at: v.uploaded_at,
            size_bytes: v.size_bytes,
        }
    }
}

/// The outcome of analyzing a document version.
#[derive(Debug, Serialize, ToSchema)]
pub struct AnalysisResponse {
    id: i64,
    file_id: DocumentVersionId,
    status: String,
    result_text: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<AnalysisRecord> for AnalysisResponse {
    fn from(a: AnalysisRecord) -> Self {
        Self {
            id: a.id,
            file_id: a.document_version_id,
            status: a.status.to_string(),
            result_text: a.result_text,
            created_at: a.created_at,
        }
    }
}

/// The body of every error response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    detail: String,
}

type HandlerError = (StatusCode, Json<ErrorResponse>);

fn reject(status: StatusCode, detail: impl Into<String>) -> HandlerError {
    (
        status,
        Json(ErrorResponse {
            detail: detail.into(),
        }),
    )
}

/// Maps a core error onto an HTTP status, logging the server-side ones.
fn port_error(context: &str, e: PortError) -> HandlerError {
    let status = match &e {
        PortError::NotFound { .. } => StatusCode::NOT_FOUND,
        PortError::VersionConflict { .. } => StatusCode::CONFLICT,
        PortError::Analysis(_) => StatusCode::BAD_GATEWAY,
        PortError::Storage(_) | PortError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        error!("{}: {:?}", context, e);
    } else {
        warn!("{}: {}", context, e);
    }
    reject(status, e.to_string())
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Upload a file with automatic versioning.
///
/// Accepts a multipart/form-data request with a `file` part. Uploading a file
/// whose name already exists stores it as the next version of that name.
#[utoipa::path(
    post,
    path = "/files/upload",
    tag = "files",
    request_body(content_type = "multipart/form-data", description = "The document to upload, as the `file` part."),
    responses(
        (status = 201, description = "File stored as a new version", body = FileResponse),
        (status = 400, description = "Bad request (e.g., missing file or invalid header)", body = ErrorResponse),
        (status = 409, description = "A concurrent upload took the version; retry", body = ErrorResponse),
        (status = 500, description = "Storage or database failure", body = ErrorResponse)
    ),
    params(
        ("x-user-id" = Option<i64>, Header, description = "The uploading actor. Defaults to 1.")
    )
)]
pub async fn upload_file_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, HandlerError> {
    let uploaded_by = match headers.get(USER_ID_HEADER) {
        None => DEFAULT_UPLOADER,
        Some(value) => value
            .to_str()
            .ok()
            .and_then(|v| v.trim().parse::<ActorId>().ok())
            .ok_or_else(|| reject(StatusCode::BAD_REQUEST, "Invalid x-user-id format"))?,
    };

    let (file_name, data) = loop {
        let field = multipart
            .next_field()
            .await
            .map_err(|e| reject(e.status(), format!("Failed to read multipart data: {}", e)))?
            .ok_or_else(|| {
                reject(
                    StatusCode::BAD_REQUEST,
                    "Multipart form must include a 'file' part",
                )
            })?;
        if field.name() != Some("file") {
            continue;
        }

        let name = field
            .file_name()
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .ok_or_else(|| reject(StatusCode::BAD_REQUEST, "Uploaded file must have a filename"))?;
        let data = field
            .bytes()
            .await
            .map_err(|e| reject(e.status(), format!("Failed to read file bytes: {}", e)))?;
        break (name, data);
    };

    let created = app_state
        .versioning
        .upload(&file_name, &data, uploaded_by)
        .await
        .map_err(|e| port_error("Failed to upload file", e))?;

    info!(
        "Stored '{}' as version {} ({} bytes)",
        created.original_name, created.version, created.size_bytes
    );
    Ok((StatusCode::CREATED, Json(FileResponse::from(created))))
}

/// List the latest version of every stored file.
#[utoipa::path(
    get,
    path = "/files",
    tag = "files",
    responses(
        (status = 200, description = "One entry per file name", body = [FileResponse]),
        (status = 500, description = "Database failure", body = ErrorResponse)
    )
)]
pub async fn list_files_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<Vec<FileResponse>>, HandlerError> {
    let latest = app_state
        .versioning
        .list_latest()
        .await
        .map_err(|e| port_error("Failed to list files", e))?;
    Ok(Json(latest.into_iter().map(FileResponse::from).collect()))
}

/// Analyze a stored file version.
#[utoipa::path(
    post,
    path = "/files/{file_id}/analyze",
    tag = "files",
    params(
        ("file_id" = i64, Path, description = "Identifier of the file version.")
    ),
    responses(
        (status = 201, description = "Analysis completed and stored", body = AnalysisResponse),
        (status = 404, description = "File not found", body = ErrorResponse),
        (status = 502, description = "The analysis provider failed", body = ErrorResponse),
        (status = 500, description = "Storage or database failure", body = ErrorResponse)
    )
)]
pub async fn analyze_file_handler(
    State(app_state): State<Arc<AppState>>,
    Path(file_id): Path<DocumentVersionId>,
) -> Result<impl IntoResponse, HandlerError> {
    let analysis = app_state
        .analysis
        .analyze(file_id)
        .await
        .map_err(|e| port_error("Failed to analyze file", e))?;
    Ok((StatusCode::CREATED, Json(AnalysisResponse::from(analysis))))
}

/// Fetch the most recent analysis of a file version.
#[utoipa::path(
    get,
    path = "/files/{file_id}/analysis",
    tag = "files",
    params(
        ("file_id" = i64, Path, description = "Identifier of the file version.")
    ),
    responses(
        (status = 200, description = "Latest analysis", body = AnalysisResponse),
        (status = 404, description = "File or analysis not found", body = ErrorResponse),
        (status = 500, description = "Database failure", body = ErrorResponse)
    )
)]
pub async fn get_analysis_handler(
    State(app_state): State<Arc<AppState>>,
    Path(file_id): Path<DocumentVersionId>,
) -> Result<Json<AnalysisResponse>, HandlerError> {
    let analysis = app_state
        .analysis
        .get_analysis(file_id)
        .await
        .map_err(|e| port_error("Failed to fetch analysis", e))?;
    Ok(Json(AnalysisResponse::from(analysis)))
}

pub async fn root_handler() -> impl IntoResponse {
    Json(json!({
        "message": "Document Versioning Service API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "upload": "POST /files/upload",
            "list": "GET /files",
            "analyze": "POST /files/{file_id}/analyze",
            "get_analysis": "GET /files/{file_id}/analysis"
        }
    }))
}

pub async fn health_handler() -> impl IntoResponse {
    Json(json!({ "status": "healthy" }))
}
