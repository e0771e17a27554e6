//! Data structures for extraction operations.

use crate::error::ExtractError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One remote photo or video, as returned by the listing call.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    /// Remote identifier.
    pub id: String,
    /// Original filename as uploaded.
    pub filename: String,
    /// Base content URL; a variant suffix is appended when downloading.
    pub base_url: String,
    /// MIME type, e.g. `image/jpeg` or `video/mp4`.
    pub mime_type: String,
    /// Metadata carrying the creation timestamp.
    #[serde(rename = "mediaMetadata")]
    pub metadata: MediaMetadata,
}

/// Metadata attached to a [`MediaItem`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MediaMetadata {
    /// When the content was originally created.
    pub creation_time: DateTime<Utc>,
}

impl MediaItem {
    /// Returns true if the item should be fetched as a video variant.
    pub fn is_video(&self) -> bool {
        self.mime_type.contains("video")
    }
}

/// One page of the remote listing.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MediaPage {
    /// Items in remote order. An empty library omits the field entirely.
    #[serde(default)]
    pub media_items: Vec<MediaItem>,
    /// Continuation token; empty means there are no further pages.
    #[serde(default)]
    pub next_page_token: String,
}

impl MediaPage {
    /// Returns true if another page follows this one.
    pub fn has_more(&self) -> bool {
        !self.next_page_token.is_empty()
    }
}

/// Configuration for one extraction run.
///
/// # Example
///
/// ```
/// use mediasync::ExtractConfig;
///
/// let config = ExtractConfig {
///     output_dir: "photos".into(),
///     worker_count: 4,
///     dry_run: true,
///     show_progress: false,
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    /// Root of the `<year>/<month>` output tree.
    pub output_dir: PathBuf,
    /// Maximum number of items downloaded concurrently within a page (default: 8).
    ///
    /// Downloads are I/O-bound, so this is limited by bandwidth and by the
    /// remote API's rate limits rather than by CPU cores.
    pub worker_count: usize,
    /// Only compute and report target paths; no downloads, no writes.
    pub dry_run: bool,
    /// Show a terminal spinner with the number of processed items.
    pub show_progress: bool,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("photos"),
            worker_count: 8,
            dry_run: false,
            show_progress: false,
        }
    }
}

impl ExtractConfig {
    /// Rejects settings that could never make progress.
    pub fn validate(&self) -> Result<(), ExtractError> {
        if self.worker_count == 0 {
            return Err(ExtractError::InvalidConfig(
                "worker count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration for the HTTP transport.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Listing endpoint of the remote library.
    pub api_url: String,
    /// Number of items requested per page (default: 25).
    pub page_size: u32,
    /// OAuth bearer token sent with every listing call.
    pub access_token: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: "https://photoslibrary.googleapis.com/v1/mediaItems".to_string(),
            page_size: 25,
            access_token: String::new(),
        }
    }
}

/// Aggregate result of a successful run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractionSummary {
    /// Pages listed and dispatched.
    pub pages: u64,
    /// Items processed across all pages (written, skipped or previewed).
    pub processed: u64,
    /// Files written during this run.
    pub written: u64,
    /// Items skipped because a non-empty file already existed.
    pub skipped: u64,
    /// Items only previewed in dry-run mode.
    pub previewed: u64,
    /// Total bytes written during this run.
    pub bytes_written: u64,
}
