//! Upload error types and plain-text responses

use crate::storage::StorageError;
use axum::extract::multipart::MultipartError;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Upload API errors
///
/// The `Display` text is exactly what the client sees. Server-side variants
/// keep the underlying cause for the log only.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Method not allowed")]
    Method,

    #[error("Invalid API key")]
    Auth,

    /// Oversized or malformed multipart body
    #[error("File too large or invalid form")]
    Decode,

    #[error("Failed to get uploaded file")]
    MissingFile,

    #[error("File must be an EPUB")]
    Extension,

    #[error("Failed to save file")]
    StorageCreate(#[source] StorageError),

    #[error("Failed to save file")]
    StorageWrite(#[source] StorageError),
}

impl UploadError {
    /// Get the HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            UploadError::Method => StatusCode::METHOD_NOT_ALLOWED,
            UploadError::Auth => StatusCode::UNAUTHORIZED,
            UploadError::Decode => StatusCode::BAD_REQUEST,
            UploadError::MissingFile => StatusCode::BAD_REQUEST,
            UploadError::Extension => StatusCode::BAD_REQUEST,
            UploadError::StorageCreate(_) => StatusCode::INTERNAL_SERVER_ERROR,
            UploadError::StorageWrite(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Cause recorded in the operational log, never sent to the client.
    pub fn internal_cause(&self) -> Option<&StorageError> {
        match self {
            UploadError::StorageCreate(e) | UploadError::StorageWrite(e) => Some(e),
            _ => None,
        }
    }
}

impl IntoResponse for UploadError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = format!("{}\n", self);

        let mut response = (
            status,
            [
                (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
                (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
            ],
            body,
        )
            .into_response();

        if status == StatusCode::METHOD_NOT_ALLOWED {
            response
                .headers_mut()
                .insert(header::ALLOW, header::HeaderValue::from_static("POST"));
        }
        response
    }
}

/// Client-side multipart failures (size ceiling hit, truncated or malformed
/// form) come back from axum with a 4xx status. A failed read is ours.
fn is_client_fault(err: &MultipartError) -> bool {
    err.status().is_client_error()
}

impl From<StorageError> for UploadError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Create { .. } => UploadError::StorageCreate(err),
            StorageError::Source(ref source)
                if source
                    .downcast_ref::<MultipartError>()
                    .is_some_and(is_client_fault) =>
            {
                UploadError::Decode
            }
            other => UploadError::StorageWrite(other),
        }
    }
}

/// Same rule as a failure seen mid-copy, so it does not matter whether the
/// decoder hits the problem while looking for a field or while streaming one.
impl From<MultipartError> for UploadError {
    fn from(err: MultipartError) -> Self {
        if is_client_fault(&err) {
            tracing::debug!("Rejecting multipart body: {}", err.body_text());
            UploadError::Decode
        } else {
            UploadError::StorageWrite(StorageError::Source(Box::new(err)))
        }
    }
}
