//! Filesystem upload store with streaming writes and partial-file cleanup

use super::error::StorageError;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::path::{Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument, warn};

/// ENOSPC raw error code on Linux and macOS.
const ENOSPC: i32 = 28;

/// Convert an io::Error into StorageError, detecting disk-full (ENOSPC).
fn io_to_storage_error(e: std::io::Error) -> StorageError {
    if e.raw_os_error() == Some(ENOSPC) {
        StorageError::DiskFull
    } else {
        StorageError::Write(e)
    }
}

/// Filesystem upload store
///
/// Storage layout:
/// ```text
/// {root}/
///   {YYYYMMDD_HHMMSS}_{basename}   # one file per accepted upload
/// ```
///
/// There is no index or manifest; the directory listing is the inventory.
#[derive(Debug, Clone)]
pub struct UploadStore {
    /// Root directory for all uploads
    root: PathBuf,
}

impl UploadStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the upload root (and any missing parents).
    pub async fn ensure_root(&self) -> Result<(), StorageError> {
        fs::create_dir_all(&self.root)
            .await
            .map_err(|source| StorageError::Create {
                path: self.root.display().to_string(),
                source,
            })
    }

    /// Path a stored name resolves to. Names must be a single path component
    /// so the result always stays directly inside the root.
    pub fn destination(&self, name: &str) -> Result<PathBuf, StorageError> {
        let single_component = Path::new(name).file_name().and_then(|n| n.to_str()) == Some(name);
        if !single_component {
            return Err(StorageError::Other(format!(
                "refusing non-flat artifact name {:?}",
                name
            )));
        }
        Ok(self.root.join(name))
    }

    /// Create (or truncate) the destination file for `name`.
    ///
    /// The returned [`PendingArtifact`] removes the file again unless it is
    /// committed.
    #[instrument(skip(self))]
    pub async fn create(&self, name: &str) -> Result<PendingArtifact, StorageError> {
        let path = self.destination(name)?;
        let file = File::create(&path)
            .await
            .map_err(|source| StorageError::Create {
                path: path.display().to_string(),
                source,
            })?;
        debug!("Created destination {:?}", path);
        Ok(PendingArtifact {
            name: name.to_string(),
            path,
            file: Some(file),
            written: 0,
            settled: false,
        })
    }
}

/// A successfully persisted upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredArtifact {
    pub name: String,
    pub path: PathBuf,
    pub size: u64,
}

/// Destination file that exists on disk but is not yet complete.
///
/// Every pending artifact ends in [`commit`](PendingArtifact::commit) or
/// [`discard`](PendingArtifact::discard). One dropped without either (a request
/// task cancelled mid-copy by a client disconnect) is removed in the background.
#[derive(Debug)]
pub struct PendingArtifact {
    name: String,
    path: PathBuf,
    file: Option<File>,
    written: u64,
    settled: bool,
}

impl PendingArtifact {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn bytes_written(&self) -> u64 {
        self.written
    }

    /// Copy every chunk of `body` into the destination, returning the running
    /// byte total.
    pub async fn write_stream<S, E>(&mut self, body: S) -> Result<u64, StorageError>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| StorageError::Other("artifact already finalized".to_string()))?;

        let mut body = std::pin::pin!(body);
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| StorageError::Source(e.into()))?;
            file.write_all(&chunk).await.map_err(io_to_storage_error)?;
            self.written += chunk.len() as u64;
        }
        Ok(self.written)
    }

    /// Flush and fsync the destination and keep it.
    ///
    /// A failed sync discards the file before the error is returned.
    pub async fn commit(mut self) -> Result<StoredArtifact, StorageError> {
        if let Some(mut file) = self.file.take() {
            let synced = match file.flush().await {
                Ok(()) => file.sync_all().await,
                Err(e) => Err(e),
            };
            if let Err(e) = synced {
                drop(file);
                self.discard().await;
                return Err(io_to_storage_error(e));
            }
        }
        self.settled = true;
        Ok(StoredArtifact {
            name: std::mem::take(&mut self.name),
            path: self.path.clone(),
            size: self.written,
        })
    }

    /// Close and delete the partial file.
    pub async fn discard(mut self) {
        self.settled = true;
        drop(self.file.take());
        let result = fs::remove_file(&self.path).await;
        report_removal(&self.path, self.written, result);
    }
}

impl Drop for PendingArtifact {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        drop(self.file.take());
        let path = std::mem::take(&mut self.path);
        let written = self.written;
        let remove = move || {
            let result = std::fs::remove_file(&path);
            report_removal(&path, written, result);
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(remove);
            }
            Err(_) => remove(),
        }
    }
}

fn report_removal(path: &Path, written: u64, result: std::io::Result<()>) {
    match result {
        Ok(()) => debug!("Removed partial upload {:?} after {} bytes", path, written),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove partial upload {:?}: {}", path, e),
    }
}
