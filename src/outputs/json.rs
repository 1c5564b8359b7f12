//! JSON output for the rotation display.
//!
//! Each run writes its [`Rotation`] twice: once into a dated archive and once
//! over `latest.json`, which is the file the display polls.
//!
//! ```text
//! json_output_dir/
//! ├── latest.json
//! └── 2026-10-17/
//!     ├── 07-30.json
//!     └── 12-00.json
//! ```
//!
//! Archive paths use the local date and time of `generated_at`, so a display
//! operator browsing the directory sees the wall-clock time of each run.

use crate::error::Result;
use crate::models::Rotation;
use chrono::Local;
use std::path::PathBuf;
use tokio::fs;
use tracing::{error, info, instrument};

pub const LATEST_FILENAME: &str = "latest.json";

/// Write a [`Rotation`] to its archive path and to `latest.json`.
///
/// Returns the archive path.
///
/// # Errors
///
/// Fails if serialization, directory creation or either write fails. The
/// archive is written first, so a failure on `latest.json` leaves the previous
/// rotation on display.
#[instrument(level = "info", skip_all, fields(json_output_dir = %json_output_dir, items = rotation.items.len()))]
pub async fn write_rotation(rotation: &Rotation, json_output_dir: &str) -> Result<PathBuf> {
    let json = serde_json::to_string_pretty(rotation)?;

    let local = rotation.generated_at.with_timezone(&Local);
    let base = PathBuf::from(json_output_dir);
    let archive_dir = base.join(local.format("%Y-%m-%d").to_string());

    info!(archive_dir = %archive_dir.display(), "Ensuring JSON directory exists");
    if let Err(e) = fs::create_dir_all(&archive_dir).await {
        error!(archive_dir = %archive_dir.display(), error = %e, "Failed to create JSON dir");
        return Err(e.into());
    }

    let archive_path = archive_dir.join(format!("{}.json", local.format("%H-%M")));
    info!(path = %archive_path.display(), "Writing JSON");
    fs::write(&archive_path, &json).await?;

    let latest_path = base.join(LATEST_FILENAME);
    fs::write(&latest_path, &json).await?;
    info!(path = %latest_path.display(), "Wrote rotation JSON");

    Ok(archive_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fallback::fallback_items;
    use chrono::Utc;

    #[tokio::test]
    async fn test_write_rotation_archive_and_latest() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("rotations");
        let out = out.to_str().unwrap();

        let now = Utc::now();
        let rotation = Rotation {
            generated_at: now,
            max_days_back: 3,
            max_count: 2,
            items: fallback_items(now).into_iter().take(2).collect(),
        };

        let archive = write_rotation(&rotation, out).await.unwrap();
        let local = now.with_timezone(&Local);
        assert!(archive.ends_with(format!(
            "{}/{}.json",
            local.format("%Y-%m-%d"),
            local.format("%H-%M")
        )));

        let latest = std::fs::read_to_string(dir.path().join("rotations").join(LATEST_FILENAME)).unwrap();
        let archived = std::fs::read_to_string(&archive).unwrap();
        assert_eq!(latest, archived);

        let value: serde_json::Value = serde_json::from_str(&latest).unwrap();
        assert_eq!(value["maxCount"], 2);
        assert_eq!(value["items"].as_array().unwrap().len(), 2);
        assert_eq!(value["items"][0]["id"], "fallback-0");
        assert!(value["items"][0]["publishedAt"].is_string());
    }

    #[tokio::test]
    async fn test_latest_is_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().to_str().unwrap();
        let now = Utc::now();

        let rotation = |items: Vec<_>| Rotation {
            generated_at: now,
            max_days_back: 3,
            max_count: 1,
            items,
        };

        write_rotation(&rotation(fallback_items(now).into_iter().take(1).collect()), out)
            .await
            .unwrap();
        write_rotation(&rotation(Vec::new()), out).await.unwrap();

        let latest = std::fs::read_to_string(dir.path().join(LATEST_FILENAME)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&latest).unwrap();
        assert!(value["items"].as_array().unwrap().is_empty());
    }
}
