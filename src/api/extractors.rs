//! Custom Axum extractors for the upload pipeline
//!
//! Axum runs request-part extractors before the body extractor, so listing
//! [`AuthorizedUpload`] ahead of [`UploadForm`] in a handler guarantees the
//! gatekeeper has passed before a single body byte is read.

use super::auth::{authorize, CredentialQuery};
use super::errors::UploadError;
use super::handlers::AppState;
use axum::{
    async_trait,
    extract::{FromRef, FromRequest, FromRequestParts, Multipart, Query, Request},
    http::{header, request::Parts, HeaderMap},
};
use std::sync::Arc;
use tracing::debug;

/// Proof that the request is a POST carrying the right credential.
///
/// Returns `UploadError::Method` or `UploadError::Auth` otherwise.
#[derive(Debug, Clone, Copy)]
pub struct AuthorizedUpload;

#[async_trait]
impl<S> FromRequestParts<S> for AuthorizedUpload
where
    S: Send + Sync,
    Arc<AppState>: FromRef<S>,
{
    type Rejection = UploadError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = Arc::<AppState>::from_ref(state);

        // Pairs rather than a struct: a repeated `api_key` must not fail the
        // parse. A query string that does not parse carries no credential.
        let query = Query::<Vec<(String, String)>>::from_request_parts(parts, state)
            .await
            .map(|Query(pairs)| CredentialQuery::from_pairs(pairs))
            .unwrap_or_default();

        authorize(&parts.method, query.api_key.as_deref(), &app_state.api_key).inspect_err(
            |e| debug!("Gatekeeper rejected {} {}: {}", parts.method, parts.uri.path(), e),
        )?;

        Ok(AuthorizedUpload)
    }
}

/// Multipart body bounded by the configured ceiling.
///
/// A declared `Content-Length` above the ceiling is refused up front; bodies
/// without one are cut off by the `DefaultBodyLimit` as they stream in.
pub struct UploadForm(pub Multipart);

#[async_trait]
impl<S> FromRequest<S> for UploadForm
where
    S: Send + Sync,
    Arc<AppState>: FromRef<S>,
{
    type Rejection = UploadError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = Arc::<AppState>::from_ref(state);

        if let Some(declared) = content_length(req.headers()) {
            if declared > app_state.max_upload_size {
                debug!(
                    "Declared body of {} bytes exceeds ceiling of {} bytes",
                    declared, app_state.max_upload_size
                );
                return Err(UploadError::Decode);
            }
        }

        let multipart = Multipart::from_request(req, state).await.map_err(|e| {
            debug!("Not a multipart form: {}", e);
            UploadError::Decode
        })?;

        Ok(UploadForm(multipart))
    }
}

fn content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
}
