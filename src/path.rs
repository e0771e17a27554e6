//! Output path derivation: `<output>/<year>/<month>/<sanitized name>`.

use crate::types::MediaItem;
use chrono::{DateTime, Datelike, Utc};
use std::path::{Path, PathBuf};

/// Returns the directory an item created at `created_at` belongs in.
///
/// Only the calendar fields (UTC) of the timestamp are used; the month is
/// always two digits.
pub fn build_path(output_dir: &Path, created_at: DateTime<Utc>) -> PathBuf {
    output_dir
        .join(created_at.year().to_string())
        .join(format!("{:02}", created_at.month()))
}

/// Replaces every space and every forward slash with an underscore.
///
/// The replacements are chained, so a name containing both is fully cleaned.
pub fn sanitize_name(filename: &str) -> String {
    filename.replace(' ', "_").replace('/', "_")
}

/// Full target path for an item under `output_dir`.
pub fn target_path(output_dir: &Path, item: &MediaItem) -> PathBuf {
    build_path(output_dir, item.metadata.creation_time).join(sanitize_name(&item.filename))
}
