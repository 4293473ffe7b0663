//! HTTP API: gatekeeper, bounded decoder, and intake handlers

mod auth;
mod errors;
mod extractors;
pub mod handlers;

pub use auth::{authorize, ApiKey, CredentialQuery};
pub use errors::UploadError;
pub use extractors::{AuthorizedUpload, UploadForm};

use axum::extract::DefaultBodyLimit;
use axum::routing::any;
use axum::Router;
use handlers::{health_check, upload_epub, AppState};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Build the service router.
///
/// Routes:
///   ANY /health - liveness probe
///   ANY /upload - EPUB intake (non-POST answered with 405 by the handler)
pub fn router(state: Arc<AppState>) -> Router {
    let body_limit = usize::try_from(state.max_upload_size).unwrap_or(usize::MAX);

    Router::new()
        .route("/health", any(health_check))
        .route("/upload", any(upload_epub))
        .layer(TraceLayer::new_for_http())
        // Applies to the raw body stream, so oversized uploads fail mid-read
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
