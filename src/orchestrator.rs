//! Main orchestration logic for exporting a media library.

use crate::error::ExtractError;
use crate::materialize::{materialize_with, MaterializeOutcome};
use crate::path::target_path;
use crate::pool::run_bounded;
use crate::service::MediaService;
use crate::types::{ExtractConfig, ExtractionSummary, MediaItem, MediaPage};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// What happened to a single item of a page.
#[derive(Debug)]
enum ItemOutcome {
    Written { bytes: u64 },
    Skipped,
    Previewed,
}

/// Exports every item of the remote library into `config.output_dir`.
///
/// Pages are listed and dispatched strictly one after another; within a page
/// up to `config.worker_count` items are downloaded concurrently. The steps are:
///
/// 1. List the next page (starting from the empty token)
/// 2. Download and write each item of the page, skipping files already present
/// 3. Fold the page into the running totals and follow the continuation token
///
/// Cancellation observed while listing ends the run successfully with the
/// totals gathered so far. Any other listing error, and the first item
/// failure of a page, fail the run.
///
/// # Example
///
/// ```no_run
/// use mediasync::{extract, ClientConfig, ExtractConfig, PhotosClient};
/// use std::sync::Arc;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = PhotosClient::new(ClientConfig {
///     access_token: "ya29.token".to_string(),
///     ..ClientConfig::default()
/// })?;
/// let summary = extract(
///     &CancellationToken::new(),
///     Arc::new(client),
///     &ExtractConfig::default(),
/// )
/// .await?;
/// println!("{} media processed", summary.processed);
/// # Ok(())
/// # }
/// ```
pub async fn extract<S>(
    cancel: &CancellationToken,
    service: Arc<S>,
    config: &ExtractConfig,
) -> Result<ExtractionSummary, ExtractError>
where
    S: MediaService + ?Sized + 'static,
{
    config.validate()?;

    let pb = progress_bar(config.show_progress);
    let mut summary = ExtractionSummary::default();
    let mut page_token = String::new();

    loop {
        let page = match service.list(cancel, &page_token).await {
            Ok(page) => page,
            Err(e) if e.is_cancelled() => {
                info!("Listing cancelled, stopping after {} pages", summary.pages);
                break;
            }
            Err(e) => {
                error!("Listing failed: {}", e);
                pb.abandon_with_message("❌ Listing failed");
                return Err(ExtractError::ListingFailed(Box::new(e)));
            }
        };

        info!(
            "{} items, has more {}",
            page.media_items.len(),
            page.has_more()
        );

        let MediaPage {
            media_items,
            next_page_token,
        } = page;
        let page_len = media_items.len() as u64;

        let outcomes = match dispatch_page(cancel, &service, config, media_items).await {
            Ok(outcomes) => outcomes,
            Err(e) => {
                error!("Page failed: {}", e);
                pb.abandon_with_message("❌ Extraction failed");
                return Err(e);
            }
        };

        summary.pages += 1;
        summary.processed += page_len;
        for outcome in outcomes {
            match outcome {
                ItemOutcome::Written { bytes } => {
                    summary.written += 1;
                    summary.bytes_written += bytes;
                }
                ItemOutcome::Skipped => summary.skipped += 1,
                ItemOutcome::Previewed => summary.previewed += 1,
            }
        }
        pb.set_position(summary.processed);

        if next_page_token.is_empty() {
            break;
        }
        page_token = next_page_token;
    }

    let total = group_thousands(summary.processed);
    pb.finish_with_message(format!("✅ {} media processed", total));
    info!(
        "{} media processed ({} written, {} skipped, {} previewed)",
        total, summary.written, summary.skipped, summary.previewed
    );
    Ok(summary)
}

/// Runs one page through the worker pool.
async fn dispatch_page<S>(
    cancel: &CancellationToken,
    service: &Arc<S>,
    config: &ExtractConfig,
    items: Vec<MediaItem>,
) -> Result<Vec<ItemOutcome>, ExtractError>
where
    S: MediaService + ?Sized + 'static,
{
    let dry_run = config.dry_run;

    run_bounded(cancel, config.worker_count, items, |token, item| {
        let service = Arc::clone(service);
        let output_dir = config.output_dir.clone();
        async move {
            if dry_run {
                let path = target_path(&output_dir, &item);
                info!("{}", path.display());
                return Ok(ItemOutcome::Previewed);
            }
            save_media(&token, service.as_ref(), &output_dir, &item).await
        }
    })
    .await
}

/// Downloads one item and writes it, unless it is already on disk.
async fn save_media<S>(
    cancel: &CancellationToken,
    service: &S,
    output_dir: &Path,
    item: &MediaItem,
) -> Result<ItemOutcome, ExtractError>
where
    S: MediaService + ?Sized,
{
    let outcome =
        materialize_with(cancel, output_dir, item, move || service.get(cancel, item)).await?;

    match outcome {
        MaterializeOutcome::Written { bytes, .. } => {
            info!("wrote {} ({}) of {}", item.filename, item.mime_type, bytes);
            Ok(ItemOutcome::Written { bytes })
        }
        MaterializeOutcome::AlreadyComplete { path } => {
            debug!("{} already complete", display_name(&path));
            Ok(ItemOutcome::Skipped)
        }
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| path.display().to_string())
}

/// Formats `n` with comma thousands separators, e.g. `12,345`.
fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    grouped
}

/// Creates the spinner tracking processed items, hidden unless requested.
fn progress_bar(visible: bool) -> indicatif::ProgressBar {
    if !visible {
        return indicatif::ProgressBar::hidden();
    }
    let pb = indicatif::ProgressBar::new_spinner();
    pb.set_style(
        indicatif::ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {pos} media processed {msg} | {elapsed_precise} elapsed")
            .unwrap_or_else(|_| indicatif::ProgressStyle::default_spinner()),
    );
    pb.set_message("📦 Listing library");
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}
