//! Idempotent materialization of one media item on disk.
//!
//! A target file is created exclusively. If it already exists and is
//! non-empty, the item is considered complete and nothing is fetched or
//! written. A zero-length file is a leftover from an interrupted run and is
//! reopened and overwritten. Once a handle has been opened, the file's
//! access and modification times are reset to the item's creation time on
//! every exit path.

use crate::error::ExtractError;
use crate::path::{build_path, sanitize_name};
use crate::types::MediaItem;
use filetime::FileTime;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Result of materializing one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MaterializeOutcome {
    /// Content was written to `path`.
    Written { path: PathBuf, bytes: u64 },
    /// A non-empty file already existed at `path`; nothing was done.
    AlreadyComplete { path: PathBuf },
}

/// An open target file whose timestamps are restored when it is closed.
///
/// [`OpenTarget::close`] restores them off the async runtime; dropping an
/// unclosed target (an error path) restores them inline.
struct OpenTarget {
    file: Option<File>,
    path: PathBuf,
    created: FileTime,
    restored: bool,
}

impl OpenTarget {
    fn new(file: File, path: PathBuf, item: &MediaItem) -> Self {
        let created = item.metadata.creation_time;
        Self {
            file: Some(file),
            path,
            created: FileTime::from_unix_time(
                created.timestamp(),
                created.timestamp_subsec_nanos(),
            ),
            restored: false,
        }
    }

    async fn write_all(&mut self, content: &[u8]) -> io::Result<u64> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| io::Error::other("target file already closed"))?;
        file.write_all(content).await?;
        file.flush().await?;
        Ok(content.len() as u64)
    }

    /// Closes the file, then resets its access and modification times.
    async fn close(mut self) -> PathBuf {
        drop(self.file.take());
        let path = self.path.clone();
        let created = self.created;
        let restore = tokio::task::spawn_blocking(move || {
            filetime::set_file_times(&path, created, created)
        })
        .await;
        match restore {
            Ok(Ok(())) => self.restored = true,
            Ok(Err(e)) => {
                self.restored = true;
                warn!("Failed to restore timestamps on {}: {}", self.path.display(), e);
            }
            // Join failure: Drop retries inline.
            Err(e) => warn!("Timestamp task failed for {}: {}", self.path.display(), e),
        }
        self.path.clone()
    }
}

impl Drop for OpenTarget {
    fn drop(&mut self) {
        // Close before touching the timestamps.
        drop(self.file.take());
        if self.restored {
            return;
        }
        if let Err(e) = filetime::set_file_times(&self.path, self.created, self.created) {
            warn!("Failed to restore timestamps on {}: {}", self.path.display(), e);
        }
    }
}

enum Opened {
    New(OpenTarget),
    Complete(PathBuf),
}

/// Creates the item's directory and opens its target file.
async fn open_target(output_dir: &Path, item: &MediaItem) -> Result<Opened, ExtractError> {
    let dir = build_path(output_dir, item.metadata.creation_time);
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|source| ExtractError::CreateDirFailed {
            filename: item.filename.clone(),
            source,
        })?;

    let path = dir.join(sanitize_name(&item.filename));
    let file = match OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .await
    {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            let metadata = tokio::fs::metadata(&path).await.map_err(|source| {
                ExtractError::StatFailed {
                    filename: item.filename.clone(),
                    source,
                }
            })?;
            if metadata.len() > 0 {
                debug!("Skipping {}: already downloaded", path.display());
                return Ok(Opened::Complete(path));
            }

            info!("Reusing empty leftover {}", path.display());
            OpenOptions::new()
                .write(true)
                .truncate(true)
                .open(&path)
                .await
                .map_err(|source| ExtractError::OpenFailed {
                    filename: item.filename.clone(),
                    source,
                })?
        }
        Err(source) => {
            return Err(ExtractError::OpenFailed {
                filename: item.filename.clone(),
                source,
            })
        }
    };

    Ok(Opened::New(OpenTarget::new(file, path, item)))
}

/// Materializes `item` under `output_dir`, invoking `fetch` for its content
/// only when the target actually needs writing.
///
/// # Arguments
///
/// * `cancel` - Run-wide cancellation token, checked before opening and before writing
/// * `output_dir` - Root of the output tree
/// * `item` - The item to materialize
/// * `fetch` - Lazily produces the item's content
///
/// # Returns
///
/// [`MaterializeOutcome::AlreadyComplete`] if a non-empty file already existed,
/// otherwise [`MaterializeOutcome::Written`] with the number of bytes written.
pub async fn materialize_with<F, Fut>(
    cancel: &CancellationToken,
    output_dir: &Path,
    item: &MediaItem,
    fetch: F,
) -> Result<MaterializeOutcome, ExtractError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Vec<u8>, ExtractError>>,
{
    if cancel.is_cancelled() {
        return Err(ExtractError::Cancelled);
    }

    let mut target = match open_target(output_dir, item).await? {
        Opened::Complete(path) => return Ok(MaterializeOutcome::AlreadyComplete { path }),
        Opened::New(target) => target,
    };

    let content = fetch()
        .await
        .map_err(|source| ExtractError::DownloadFailed {
            filename: item.filename.clone(),
            source: Box::new(source),
        })?;

    if cancel.is_cancelled() {
        return Err(ExtractError::Cancelled);
    }

    let bytes = target
        .write_all(&content)
        .await
        .map_err(|source| ExtractError::WriteFailed {
            filename: item.filename.clone(),
            source,
        })?;

    Ok(MaterializeOutcome::Written {
        path: target.close().await,
        bytes,
    })
}

/// Materializes `item` from content that has already been fetched.
pub async fn materialize_and_write(
    cancel: &CancellationToken,
    output_dir: &Path,
    item: &MediaItem,
    content: Vec<u8>,
) -> Result<MaterializeOutcome, ExtractError> {
    materialize_with(cancel, output_dir, item, || async move { Ok(content) }).await
}
