//! MediaSync - Bulk export of a remote photo library into dated folders
//!
//! This library pages through a remote media library and writes every item to
//! `<output>/<year>/<month>/<name>`, restoring the item's creation time on the
//! written file.
//!
//! # Features
//!
//! - **Re-runnable Exports**: Non-empty files already on disk are never fetched again
//! - **Bounded Concurrency**: Each page is downloaded by a fixed-size worker pool
//! - **Cancellation**: One token stops listing, downloads and writes promptly
//! - **Dry Run**: Preview target paths without any download or write
//!
//! # Example
//!
//! ```no_run
//! use mediasync::{extract, CancellationToken, ClientConfig, ExtractConfig, PhotosClient};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = PhotosClient::new(ClientConfig {
//!     access_token: "ya29.token".to_string(),
//!     ..ClientConfig::default()
//! })?;
//! let config = ExtractConfig {
//!     output_dir: "photos".into(),
//!     ..ExtractConfig::default()
//! };
//!
//! extract(&CancellationToken::new(), Arc::new(client), &config).await?;
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
mod materialize;
mod orchestrator;
mod path;
mod pool;
mod service;
mod types;

pub use client::{build_url, PhotosClient};
pub use error::ExtractError;
pub use materialize::{materialize_and_write, materialize_with, MaterializeOutcome};
pub use orchestrator::extract;
pub use path::{build_path, sanitize_name, target_path};
pub use pool::run_bounded;
pub use service::{cancellable, MediaService};
pub use tokio_util::sync::CancellationToken;
pub use types::{
    ClientConfig, ExtractConfig, ExtractionSummary, MediaItem, MediaMetadata, MediaPage,
};
