use anyhow::Context;
use clap::Parser;
use mediasync::{extract, CancellationToken, ClientConfig, ExtractConfig, PhotosClient};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "mediasync")]
#[command(about = "Export a remote photo library into year/month folders", long_about = None)]
#[command(version)]
struct Args {
    /// Output directory for the exported media
    #[arg(short, long, default_value = "photos")]
    output: PathBuf,

    /// Number of concurrent downloads per page
    #[arg(short, long, default_value_t = 8)]
    workers: usize,

    /// Only print target paths, download nothing
    #[arg(long)]
    dry_run: bool,

    /// OAuth access token for the library API
    #[arg(long, env = "MEDIASYNC_TOKEN", hide_env_values = true)]
    token: String,

    /// Listing endpoint of the library API
    #[arg(long, default_value = "https://photoslibrary.googleapis.com/v1/mediaItems")]
    api_url: String,

    /// Items requested per page
    #[arg(long, default_value_t = 25)]
    page_size: u32,

    /// Stop the export after this long (e.g. "30m", "2h")
    #[arg(long, value_parser = humantime::parse_duration)]
    timeout: Option<Duration>,

    /// Show a progress spinner
    #[arg(long)]
    progress: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(format!("mediasync={}", log_level))
        .init();

    info!("🚀 MediaSync - Photo Library Exporter");
    info!("Output directory: {:?}", args.output);
    info!("Workers: {}", args.workers);
    if args.dry_run {
        info!("Dry run: no files will be downloaded or written");
    }

    let cancel = CancellationToken::new();
    spawn_cancel_triggers(&cancel, args.timeout);

    let client = PhotosClient::new(ClientConfig {
        api_url: args.api_url,
        page_size: args.page_size,
        access_token: args.token,
    })
    .context("failed to build HTTP client")?;

    let config = ExtractConfig {
        output_dir: args.output,
        worker_count: args.workers,
        dry_run: args.dry_run,
        show_progress: args.progress,
    };

    match extract(&cancel, Arc::new(client), &config).await {
        Ok(summary) => {
            info!(
                "✅ Export finished: {} media processed, {} bytes written",
                summary.processed, summary.bytes_written
            );
            Ok(())
        }
        Err(e) => {
            eprintln!("❌ Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Raises `cancel` on Ctrl-C and, if set, once `timeout` elapses.
fn spawn_cancel_triggers(cancel: &CancellationToken, timeout: Option<Duration>) {
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping");
            on_signal.cancel();
        }
    });

    if let Some(timeout) = timeout {
        let on_timeout = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            warn!("Timeout of {} reached, stopping", humantime::format_duration(timeout));
            on_timeout.cancel();
        });
    }
}
