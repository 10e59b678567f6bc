pub mod rest;
pub mod state;

use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, CONTENT_TYPE},
        HeaderName, HeaderValue, Method,
    },
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use rest::{
    analyze_file_handler, get_analysis_handler, health_handler, list_files_handler,
    root_handler, upload_file_handler, ApiDoc,
};
pub use state::AppState;

/// Header carrying the uploading actor's id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Builds the REST router over the given state.
pub fn router(app_state: Arc<AppState>, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/files", get(list_files_handler))
        .route("/files/upload", post(upload_file_handler))
        .route("/files/{file_id}/analyze", post(analyze_file_handler))
        .route("/files/{file_id}/analysis", get(get_analysis_handler))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

/// CORS policy for the local frontend.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(HeaderValue::from_static("http://localhost:3000"))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            CONTENT_TYPE,
            ACCEPT,
            HeaderName::from_static(USER_ID_HEADER),
        ])
}
