//! Shared-secret authentication
//!
//! The credential is a single static secret supplied at startup. Each upload
//! request must repeat it in the `api_key` query parameter. The gatekeeper runs
//! on the request head only, so a rejected request never has its body read.

use super::UploadError;
use axum::http::Method;
use serde::Deserialize;
use std::fmt;
use subtle::ConstantTimeEq;

/// Process-wide upload secret. Never printed in clear.
#[derive(Clone, Deserialize)]
#[serde(transparent)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Exact byte-for-byte comparison, constant time in the candidate contents.
    pub fn matches(&self, candidate: &str) -> bool {
        self.0.as_bytes().ct_eq(candidate.as_bytes()).into()
    }

    /// Log-safe rendering: `****` for short keys, otherwise the first and
    /// last four characters around a run of `*`.
    pub fn masked(&self) -> String {
        let chars: Vec<char> = self.0.chars().collect();
        if chars.len() <= 8 {
            return "****".to_string();
        }
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}{}{}", head, "*".repeat(chars.len() - 8), tail)
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ApiKey({})", self.masked())
    }
}

impl fmt::Display for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.masked())
    }
}

/// Query parameters the gatekeeper looks at
#[derive(Debug, Default)]
pub struct CredentialQuery {
    pub api_key: Option<String>,
}

impl CredentialQuery {
    /// Only the first `api_key` counts; later repeats are ignored.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        let api_key = pairs
            .into_iter()
            .find(|(name, _)| name == "api_key")
            .map(|(_, value)| value);
        Self { api_key }
    }
}

/// Method check followed by credential check, in that order.
pub fn authorize(
    method: &Method,
    provided: Option<&str>,
    key: &ApiKey,
) -> Result<(), UploadError> {
    if method != Method::POST {
        return Err(UploadError::Method);
    }
    match provided {
        Some(candidate) if key.matches(candidate) => Ok(()),
        _ => Err(UploadError::Auth),
    }
}
