//! Error types for extraction operations.

use std::io;
use thiserror::Error;

/// Errors that can occur while exporting a media library.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// I/O error during file operations.
    #[error(transparent)]
    IoError(#[from] io::Error),

    /// HTTP request error while talking to the remote library.
    #[error(transparent)]
    ReqwestError(#[from] reqwest::Error),

    /// JSON serialization/deserialization error.
    #[error(transparent)]
    SerdeJsonError(#[from] serde_json::Error),

    /// The remote library answered with a non-200 status.
    #[error("{context} returned: {status}")]
    HttpStatus {
        context: &'static str,
        status: reqwest::StatusCode,
    },

    /// A page listing failed for a reason other than cancellation.
    #[error("failed to get media items: {0}")]
    ListingFailed(#[source] Box<ExtractError>),

    /// Fetching the content of one item failed.
    #[error("failed to read {filename}: {source}")]
    DownloadFailed {
        filename: String,
        #[source]
        source: Box<ExtractError>,
    },

    /// Writing the content of one item to disk failed.
    #[error("failed to write {filename}: {source}")]
    WriteFailed {
        filename: String,
        #[source]
        source: io::Error,
    },

    /// The year/month directory for an item could not be created.
    #[error("failed to create directory structure for {filename}: {source}")]
    CreateDirFailed {
        filename: String,
        #[source]
        source: io::Error,
    },

    /// The target file could not be opened for a reason other than existing.
    #[error("failed to open file for {filename}: {source}")]
    OpenFailed {
        filename: String,
        #[source]
        source: io::Error,
    },

    /// An existing target file could not be inspected.
    #[error("failed to determine if existing file was empty ({filename}): {source}")]
    StatFailed {
        filename: String,
        #[source]
        source: io::Error,
    },

    /// The run's cancellation token was raised.
    #[error("operation cancelled")]
    Cancelled,

    /// A worker task panicked or was aborted.
    #[error("worker task failed: {0}")]
    TaskFailed(String),

    /// Configuration rejected before any work started.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ExtractError {
    /// Returns true if this error, or the cause it wraps, is a cancellation.
    pub fn is_cancelled(&self) -> bool {
        match self {
            ExtractError::Cancelled => true,
            ExtractError::ListingFailed(source) => source.is_cancelled(),
            ExtractError::DownloadFailed { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }
}
