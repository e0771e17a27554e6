//! The remote library capability consumed by the extraction engine.

use crate::error::ExtractError;
use crate::types::{MediaItem, MediaPage};
use async_trait::async_trait;
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Two-operation view of a paginated remote media library.
///
/// Implementations must observe `cancel` promptly and report it as
/// [`ExtractError::Cancelled`].
#[async_trait]
pub trait MediaService: Send + Sync {
    /// Lists one page. An empty `page_token` requests the first page.
    async fn list(
        &self,
        cancel: &CancellationToken,
        page_token: &str,
    ) -> Result<MediaPage, ExtractError>;

    /// Downloads the full content of one item.
    async fn get(
        &self,
        cancel: &CancellationToken,
        item: &MediaItem,
    ) -> Result<Vec<u8>, ExtractError>;
}

/// Races `fut` against the token, returning [`ExtractError::Cancelled`] if
/// the token is (or becomes) raised first.
pub async fn cancellable<T, F>(cancel: &CancellationToken, fut: F) -> Result<T, ExtractError>
where
    F: Future<Output = Result<T, ExtractError>>,
{
    if cancel.is_cancelled() {
        return Err(ExtractError::Cancelled);
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ExtractError::Cancelled),
        result = fut => result,
    }
}
