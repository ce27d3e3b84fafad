//! Storage for manually injected media
//!
//! Uploads live in one flat directory as `<item id>.<ext>` and are served
//! under `/media/`. A file lives exactly as long as its item stays in the
//! queue; the scheduler owner releases it when the item is pruned, removed,
//! cleared or dropped by a context reset.

use castq_common::{ItemOrigin, QueueItem};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::Result;

/// Route prefix the media directory is served under
pub const MEDIA_ROUTE: &str = "/media";

/// Extension used when the upload name has none we accept
const FALLBACK_EXTENSION: &str = "bin";

/// Short alphanumeric extension from an uploaded file name
fn media_extension(filename: Option<&str>) -> String {
    filename
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_else(|| FALLBACK_EXTENSION.to_string())
}

/// Directory of uploaded media files
#[derive(Debug, Clone)]
pub struct MediaStore {
    dir: PathBuf,
}

impl MediaStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write an upload for item `id`; returns the URL it is served from
    pub async fn store(&self, id: &str, filename: Option<&str>, bytes: &[u8]) -> Result<String> {
        let file_name = format!("{}.{}", id, media_extension(filename));
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(&file_name);
        tokio::fs::write(&path, bytes).await?;
        debug!(path = %path.display(), bytes = bytes.len(), "Stored media file");
        Ok(format!("{}/{}", MEDIA_ROUTE, file_name))
    }

    /// Local file behind a served URL, if the URL points into this store
    pub fn path_for(&self, media_url: &str) -> Option<PathBuf> {
        let name = media_url.strip_prefix(MEDIA_ROUTE)?.strip_prefix('/')?;
        if name.is_empty() || name.starts_with('.') || name.contains(['/', '\\']) {
            return None;
        }
        Some(self.dir.join(name))
    }

    /// Delete the file behind `media_url`; a missing file is not an error
    pub async fn remove(&self, media_url: &str) {
        let Some(path) = self.path_for(media_url) else {
            return;
        };
        match tokio::fs::remove_file(&path).await {
            Ok(()) => debug!(path = %path.display(), "Removed media file"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(path = %path.display(), "Failed to remove media file: {}", e),
        }
    }

    /// Delete the uploads of manual items that have left the queue
    ///
    /// Runs on a spawned task so the caller never waits on the filesystem.
    pub fn release(&self, items: Vec<QueueItem>) {
        let urls: Vec<String> = items
            .into_iter()
            .filter(|item| item.origin == ItemOrigin::Manual)
            .filter_map(|item| item.payload.media_url)
            .collect();
        if urls.is_empty() {
            return;
        }

        let store = self.clone();
        tokio::spawn(async move {
            for url in urls {
                store.remove(&url).await;
            }
        });
    }
}
