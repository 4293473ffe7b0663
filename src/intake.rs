//! Intake policy: which uploads are accepted and what they are stored as.
//!
//! Everything here is a pure function of the client-declared filename and the
//! wall clock, so the rules can be checked without a server or a filesystem.

use chrono::NaiveDateTime;

/// Multipart field carrying the uploaded document.
pub const UPLOAD_FIELD: &str = "epub";

/// Only suffix accepted on the declared filename (compared case-insensitively).
pub const ALLOWED_EXTENSION: &str = ".epub";

/// Default ceiling on the whole request body: 50 MiB.
pub const DEFAULT_MAX_UPLOAD_SIZE: u64 = 50 << 20;

/// Default upload root.
pub const DEFAULT_UPLOAD_DIR: &str = "/app/uploads";

/// Lexical timestamp prefix of stored names, e.g. `20240131_235959`.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Superficial type check: inspects only the name, never the contents.
pub fn has_allowed_extension(filename: &str) -> bool {
    filename.to_lowercase().ends_with(ALLOWED_EXTENSION)
}

/// Strip every directory component from a client-supplied filename.
///
/// Both `/` and `\` count as separators, so `..\..\x.epub` and
/// `../../x.epub` both reduce to `x.epub`.
pub fn sanitize_basename(filename: &str) -> &str {
    filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename)
}

/// Stored name for an upload received at `received_at`:
/// `<YYYYMMDD_HHMMSS>_<basename>`.
///
/// Two uploads of the same basename within one second produce the same name.
pub fn artifact_name(filename: &str, received_at: NaiveDateTime) -> String {
    format!(
        "{}_{}",
        received_at.format(TIMESTAMP_FORMAT),
        sanitize_basename(filename)
    )
}
