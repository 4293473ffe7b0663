//! EPUB upload handler.

use super::AppState;
use crate::api::errors::UploadError;
use crate::api::extractors::{AuthorizedUpload, UploadForm};
use crate::intake::{artifact_name, has_allowed_extension, UPLOAD_FIELD};
use crate::storage::StoredArtifact;
use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, State};
use axum::Json;
use chrono::Local;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, instrument};

/// Success payload
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub status: &'static str,
    pub filename: String,
    pub size: u64,
}

impl From<StoredArtifact> for UploadResponse {
    fn from(artifact: StoredArtifact) -> Self {
        Self {
            status: "success",
            filename: artifact.name,
            size: artifact.size,
        }
    }
}

/// Upload handler
/// POST /upload?api_key=KEY, multipart body with an `epub` file field
#[instrument(skip_all)]
pub async fn upload_epub(
    State(state): State<Arc<AppState>>,
    _authorized: AuthorizedUpload,
    UploadForm(mut multipart): UploadForm,
) -> Result<Json<UploadResponse>, UploadError> {
    match receive(&state, &mut multipart).await {
        Ok(stored) => {
            info!(
                "Successfully uploaded EPUB: {} ({} bytes)",
                stored.name, stored.size
            );
            Ok(Json(stored.into()))
        }
        Err(err) => {
            if let Some(cause) = err.internal_cause() {
                error!("Failed to save upload: {}", cause);
            }
            Err(err)
        }
    }
}

/// Locate the file field, validate its name, and stream it to disk.
///
/// Any failure after the destination exists discards it before the error
/// is returned.
async fn receive(
    state: &AppState,
    multipart: &mut Multipart,
) -> Result<StoredArtifact, UploadError> {
    loop {
        let Some(field) = multipart.next_field().await? else {
            return Err(UploadError::MissingFile);
        };

        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        // A plain form value under the file field name is not a file, and
        // neither is a part with an empty filename.
        let Some(filename) = field
            .file_name()
            .filter(|name| !name.is_empty())
            .map(str::to_owned)
        else {
            continue;
        };

        if !has_allowed_extension(&filename) {
            debug!("Rejecting non-EPUB upload {:?}", filename);
            return Err(UploadError::Extension);
        }

        let name = artifact_name(&filename, Local::now().naive_local());
        let mut pending = state.store.create(&name).await?;

        if let Err(err) = pending.write_stream(field).await {
            pending.discard().await;
            return Err(err.into());
        }
        // The ceiling covers the whole body, not just the file field.
        if let Err(err) = drain(multipart).await {
            pending.discard().await;
            return Err(err.into());
        }

        return Ok(pending.commit().await?);
    }
}

/// Read and discard the rest of the form so oversized or malformed trailers
/// are still rejected.
async fn drain(multipart: &mut Multipart) -> Result<(), MultipartError> {
    while let Some(mut field) = multipart.next_field().await? {
        while field.chunk().await?.is_some() {}
    }
    Ok(())
}
