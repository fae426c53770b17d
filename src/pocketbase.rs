//! Minimal PocketBase client for photo listings and file downloads.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// One photo record as returned by the records listing endpoint.
///
/// Only the fields needed to locate the stored file are decoded;
/// everything else in the record is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct RemotePhoto {
    pub id: String,
    #[serde(rename = "collectionId")]
    pub collection_id: String,
    /// Stored file name of the uploaded image.
    pub photo: String,
}

#[derive(Debug, Deserialize)]
struct PhotoListPage {
    items: Vec<RemotePhoto>,
}

/// Remote content store operations the acquirer depends on.
pub trait RemoteStore {
    /// List up to `limit` photos belonging to `group_id`.
    fn list_group_photos(&self, group_id: &str, limit: usize) -> Result<Vec<RemotePhoto>>;

    /// Download one photo into `dest_dir` under the deterministic
    /// name `<id>.jpg`, returning the written path.
    fn fetch_photo(&self, photo: &RemotePhoto, dest_dir: &Path) -> Result<PathBuf>;
}

/// HTTP client for a single PocketBase instance.
pub struct PocketBase {
    agent: ureq::Agent,
    base_url: String,
}

impl PocketBase {
    pub fn new(base_url: &str) -> Self {
        Self {
            agent: ureq::Agent::new_with_defaults(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

impl RemoteStore for PocketBase {
    fn list_group_photos(&self, group_id: &str, limit: usize) -> Result<Vec<RemotePhoto>> {
        let url = format!("{}/api/collections/photos/records", self.base_url);
        let mut response = self
            .agent
            .get(&url)
            .query("page", "1")
            .query("perPage", limit.to_string())
            .query("filter", format!("(group='{group_id}')"))
            .query("sort", "created")
            .call()
            .with_context(|| format!("list photos for group {group_id}"))?;
        let page: PhotoListPage = response
            .body_mut()
            .read_json()
            .context("decode photo listing")?;
        Ok(page.items)
    }

    fn fetch_photo(&self, photo: &RemotePhoto, dest_dir: &Path) -> Result<PathBuf> {
        let url = format!(
            "{}/api/files/{}/{}/{}",
            self.base_url, photo.collection_id, photo.id, photo.photo
        );
        let response = self
            .agent
            .get(&url)
            .call()
            .with_context(|| format!("fetch photo {}", photo.id))?;

        let dest = dest_dir.join(format!("{}.jpg", photo.id));
        let mut reader = response.into_body().into_reader();
        let mut file =
            fs::File::create(&dest).with_context(|| format!("create {}", dest.display()))?;
        if let Err(err) = io::copy(&mut reader, &mut file) {
            // A staged file must only exist for a completed download.
            drop(file);
            let _ = fs::remove_file(&dest);
            return Err(err).with_context(|| format!("write {}", dest.display()));
        }
        Ok(dest)
    }
}
