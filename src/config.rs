//! Configuration for the EPUB intake server

use crate::api::ApiKey;
use crate::intake::{DEFAULT_MAX_UPLOAD_SIZE, DEFAULT_UPLOAD_DIR};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Address to listen on
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,

    /// Directory every accepted upload is written into
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,

    /// Shared secret expected in the `api_key` query parameter.
    /// Required: the server refuses to start without it.
    #[serde(default)]
    pub api_key: Option<ApiKey>,

    /// Ceiling on the total request body size in bytes
    #[serde(default = "default_max_upload_size")]
    pub max_upload_size: u64,

    /// Log level filter string. Overridden by RUST_LOG.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from(DEFAULT_UPLOAD_DIR)
}

fn default_max_upload_size() -> u64 {
    DEFAULT_MAX_UPLOAD_SIZE
}

fn default_log_level() -> String {
    "epub_intake=info,tower_http=info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            upload_dir: default_upload_dir(),
            api_key: None,
            max_upload_size: default_max_upload_size(),
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        let config: Config =
            toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        Ok(config)
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Overlay environment variables on top of the current values.
    ///
    /// `API_KEY` and `PORT` keep the names deployments already use; the rest
    /// are optional knobs.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(addr) = std::env::var("LISTEN_ADDR") {
            self.listen_addr = addr
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("LISTEN_ADDR: {}", addr)))?;
        }

        if let Ok(port) = std::env::var("PORT") {
            if !port.is_empty() {
                let port: u16 = port
                    .parse()
                    .map_err(|_| ConfigError::Invalid(format!("PORT: {}", port)))?;
                self.listen_addr.set_port(port);
            }
        }

        if let Ok(dir) = std::env::var("UPLOAD_DIR") {
            if !dir.is_empty() {
                self.upload_dir = PathBuf::from(dir);
            }
        }

        if let Ok(size) = std::env::var("MAX_UPLOAD_SIZE") {
            self.max_upload_size = size
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("MAX_UPLOAD_SIZE: {}", size)))?;
        }

        if let Ok(key) = std::env::var("API_KEY") {
            if !key.is_empty() {
                self.api_key = Some(ApiKey::new(key));
            }
        }

        if let Ok(level) = std::env::var("LOG_LEVEL") {
            self.log_level = level;
        }

        Ok(())
    }

    /// Load configuration from the file named by `EPUB_INTAKE_CONFIG` or
    /// `epub_intake.toml`, falling back to defaults, then overlay the
    /// environment. The result is validated.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = if let Ok(path) = std::env::var("EPUB_INTAKE_CONFIG") {
            Self::from_file(&path)?
        } else if std::path::Path::new("epub_intake.toml").exists() {
            Self::from_file("epub_intake.toml")?
        } else {
            Self::default()
        };

        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the server cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match &self.api_key {
            Some(key) if !key.is_empty() => {}
            _ => return Err(ConfigError::MissingApiKey),
        }
        if self.max_upload_size == 0 {
            return Err(ConfigError::Invalid(
                "max_upload_size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("API_KEY environment variable is required")]
    MissingApiKey,

    #[error("Invalid value: {0}")]
    Invalid(String),
}
