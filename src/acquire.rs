//! Group photo acquisition with per-item failure isolation.
//!
//! Failures are isolated per photo so one bad transfer never aborts
//! the batch; only staging-directory creation and the listing call
//! itself are fatal.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::Path;

use crate::pocketbase::RemoteStore;

/// Summary of one acquisition run. `files` is in completion order and
/// `count` always equals its length.
#[derive(Debug, Serialize)]
pub struct DownloadResult {
    pub group_id: String,
    pub count: usize,
    pub temp_dir: String,
    pub files: Vec<String>,
}

/// Download up to `limit` photos belonging to `group_id` into
/// `temp_dir`.
///
/// An empty listing is a valid terminal state, not an error. A failed
/// transfer is logged with the photo's identity and attempt index and
/// the loop continues; the corresponding file is simply absent from
/// the result.
pub fn acquire(
    store: &dyn RemoteStore,
    group_id: &str,
    limit: usize,
    temp_dir: &Path,
) -> Result<DownloadResult> {
    fs::create_dir_all(temp_dir)
        .with_context(|| format!("create staging directory {}", temp_dir.display()))?;

    let photos = store.list_group_photos(group_id, limit)?;
    let total = photos.len();

    if total == 0 {
        println!("No photos found for group {group_id}.");
        return Ok(DownloadResult {
            group_id: group_id.to_string(),
            count: 0,
            temp_dir: temp_dir.display().to_string(),
            files: Vec::new(),
        });
    }

    println!("Found {total} photos.");

    let mut files = Vec::new();
    for (index, photo) in photos.iter().enumerate() {
        let attempt = index + 1;
        match store.fetch_photo(photo, temp_dir) {
            Ok(path) => {
                let file = path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| format!("{}.jpg", photo.id));
                println!("  [{attempt}/{total}] {file}");
                files.push(file);
            }
            Err(err) => {
                tracing::warn!(
                    photo_id = %photo.id,
                    attempt,
                    total,
                    "photo download failed: {:#}",
                    err
                );
            }
        }
    }

    println!();
    println!("Downloaded {}/{} photos.", files.len(), total);

    let count = files.len();
    Ok(DownloadResult {
        group_id: group_id.to_string(),
        count,
        temp_dir: temp_dir.display().to_string(),
        files,
    })
}
