//! HTTP request handlers
//!
//! Split into submodules by endpoint:
//! - `upload`: the authenticated EPUB intake pipeline
//! - `status`: liveness check

mod status;
mod upload;

use super::auth::ApiKey;
use crate::config::{Config, ConfigError};
use crate::storage::UploadStore;

pub use status::{health_check, HealthResponse};
pub use upload::{upload_epub, UploadResponse};

/// Application state shared across handlers.
///
/// Read-only after startup; requests share nothing else but the filesystem.
#[derive(Debug, Clone)]
pub struct AppState {
    pub store: UploadStore,
    pub api_key: ApiKey,
    pub max_upload_size: u64,
}

impl AppState {
    pub fn new(store: UploadStore, api_key: ApiKey, max_upload_size: u64) -> Self {
        Self {
            store,
            api_key,
            max_upload_size,
        }
    }

    /// Build state from a validated configuration.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        config.validate()?;
        let api_key = config.api_key.clone().ok_or(ConfigError::MissingApiKey)?;
        Ok(Self::new(
            UploadStore::new(config.upload_dir.clone()),
            api_key,
            config.max_upload_size,
        ))
    }
}
