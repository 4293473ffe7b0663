//! Shared test infrastructure for integration tests
//!
//! Provides TestServer (a real epub_intake binary on a scratch upload
//! directory), multipart request helpers and data generators.

#![allow(dead_code)]

use rand::{Rng, SeedableRng};
use reqwest::multipart::{Form, Part};
use std::path::{Path, PathBuf};
use std::process::{Child, Command};
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::sleep;

/// Port counter to avoid conflicts between tests.
static PORT_COUNTER: AtomicU16 = AtomicU16::new(19400);

/// Secret every TestServer is started with
pub const TEST_API_KEY: &str = "test-upload-key-0123456789";

/// Test server wrapper that spawns a real epub_intake binary
pub struct TestServer {
    process: Child,
    port: u16,
    upload_dir: TempDir,
}

impl TestServer {
    // ── Factory methods ──

    /// Start a test server with the default 50 MiB ceiling
    pub async fn start() -> Self {
        Self::spawn(None).await
    }

    /// Start a test server with a custom body ceiling
    pub async fn with_max_upload_size(max_size: u64) -> Self {
        Self::spawn(Some(max_size)).await
    }

    // ── Shared spawn logic ──

    /// Allocate a port, spawn the server against a fresh upload directory,
    /// and wait for readiness. All factory methods delegate here.
    async fn spawn(max_upload_size: Option<u64>) -> Self {
        let port = PORT_COUNTER.fetch_add(1, Ordering::SeqCst);
        let upload_dir = TempDir::new().expect("Failed to create temp dir");

        let mut command = Command::new(env!("CARGO_BIN_EXE_epub_intake"));
        command
            .env("API_KEY", TEST_API_KEY)
            .env("PORT", port.to_string())
            .env("LISTEN_ADDR", format!("127.0.0.1:{}", port))
            .env("UPLOAD_DIR", upload_dir.path())
            .env("RUST_LOG", "epub_intake=warn")
            .env_remove("EPUB_INTAKE_CONFIG");
        if let Some(size) = max_upload_size {
            command.env("MAX_UPLOAD_SIZE", size.to_string());
        }

        let process = command.spawn().expect("Failed to start server");

        let mut server = Self {
            process,
            port,
            upload_dir,
        };
        server.wait_ready().await;
        server
    }

    // ── Instance methods ──

    async fn wait_ready(&mut self) {
        let addr = format!("127.0.0.1:{}", self.port);
        for _ in 0..150 {
            if std::net::TcpStream::connect(&addr).is_ok() {
                sleep(Duration::from_millis(100)).await;
                return;
            }

            if let Ok(Some(status)) = self.process.try_wait() {
                panic!("Server exited before becoming ready: {}", status);
            }

            sleep(Duration::from_millis(100)).await;
        }

        let _ = self.process.kill();
        panic!("Timed out waiting for server on {}", addr);
    }

    /// Get the HTTP endpoint URL
    pub fn endpoint(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    /// Upload URL carrying the given credential
    pub fn upload_url(&self, api_key: &str) -> String {
        format!("{}/upload?api_key={}", self.endpoint(), api_key)
    }

    /// Upload URL carrying the correct credential
    pub fn authorized_upload_url(&self) -> String {
        self.upload_url(TEST_API_KEY)
    }

    pub fn upload_dir(&self) -> &Path {
        self.upload_dir.path()
    }

    /// Names of every file currently in the upload directory, sorted
    pub fn stored_files(&self) -> Vec<String> {
        list_dir(self.upload_dir.path())
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.process.kill();
        let _ = self.process.wait();
    }
}

/// Sorted file names in a directory
pub fn list_dir(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .expect("read upload dir")
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

// === Shared HTTP helpers (reqwest) ===

/// Multipart form with a single file part. The filename is sent verbatim
/// (no percent-encoding) so path components reach the server untouched.
pub fn epub_form(field: &str, filename: &str, data: Vec<u8>) -> Form {
    let part = Part::bytes(data)
        .file_name(filename.to_string())
        .mime_str("application/epub+zip")
        .expect("valid mime");
    Form::new()
        .percent_encode_noop()
        .part(field.to_string(), part)
}

/// POST a file in the `epub` field and return the response.
pub async fn upload(
    client: &reqwest::Client,
    url: &str,
    filename: &str,
    data: Vec<u8>,
) -> reqwest::Response {
    client
        .post(url)
        .multipart(epub_form("epub", filename, data))
        .send()
        .await
        .expect("POST failed")
}

/// Path of a stored artifact reported by a success response
pub fn stored_path(server: &TestServer, filename: &str) -> PathBuf {
    server.upload_dir().join(filename)
}

// === Data generators ===

/// Generate deterministic binary data
pub fn generate_binary(size: usize, seed: u64) -> Vec<u8> {
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    let mut data = vec![0u8; size];
    rng.fill(&mut data[..]);
    data
}

/// A tiny EPUB-looking payload (zip magic + mimetype entry name)
pub fn fake_epub(extra: usize) -> Vec<u8> {
    let mut data = b"PK\x03\x04mimetypeapplication/epub+zip".to_vec();
    data.extend(generate_binary(extra, extra as u64));
    data
}
