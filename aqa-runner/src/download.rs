//! Artifact download and zip extraction

use anyhow::{Context as AnyhowContext, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// Downloads remote artifacts to local files
#[async_trait]
pub trait Downloader: Send + Sync {
    /// Downloads `url` to `dest`, creating parent directories as needed
    ///
    /// # Returns
    /// The path of the downloaded file
    async fn download(&self, url: &str, dest: &Path) -> Result<PathBuf>;
}

/// HTTP downloader backed by reqwest
pub struct HttpDownloader {
    client: reqwest::Client,
}

impl HttpDownloader {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpDownloader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Downloader for HttpDownloader {
    async fn download(&self, url: &str, dest: &Path) -> Result<PathBuf> {
        info!("Downloading {} to {}", url, dest.display());

        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to request {}", url))?
            .error_for_status()
            .with_context(|| format!("Download of {} was rejected", url))?;

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let mut file = tokio::fs::File::create(dest)
            .await
            .with_context(|| format!("Failed to create {}", dest.display()))?;
        let mut written = 0usize;
        while let Some(chunk) = response
            .chunk()
            .await
            .with_context(|| format!("Failed to read body of {}", url))?
        {
            file.write_all(&chunk)
                .await
                .with_context(|| format!("Failed to write {}", dest.display()))?;
            written += chunk.len();
        }
        file.flush()
            .await
            .with_context(|| format!("Failed to write {}", dest.display()))?;

        debug!("Downloaded {} bytes from {}", written, url);
        Ok(dest.to_path_buf())
    }
}

/// Extracts a zip archive into `dest`, keeping its directory structure
///
/// Entries whose names would escape `dest` are skipped.
pub async fn extract_zip(archive: &Path, dest: &Path) -> Result<()> {
    let archive = archive.to_path_buf();
    let dest = dest.to_path_buf();

    tokio::task::spawn_blocking(move || extract_zip_blocking(&archive, &dest))
        .await
        .context("Extraction task panicked")?
}

fn extract_zip_blocking(archive: &Path, dest: &Path) -> Result<()> {
    info!("Extracting {} to {}", archive.display(), dest.display());

    let file = std::fs::File::open(archive)
        .with_context(|| format!("Failed to open {}", archive.display()))?;
    let mut zip = zip::ZipArchive::new(file)
        .with_context(|| format!("{} is not a valid zip archive", archive.display()))?;

    for index in 0..zip.len() {
        let mut entry = zip.by_index(index)?;
        let Some(relative) = entry.enclosed_name() else {
            debug!("Skipping unsafe entry {}", entry.name());
            continue;
        };
        let target = dest.join(relative);

        if entry.is_dir() {
            std::fs::create_dir_all(&target)
                .with_context(|| format!("Failed to create {}", target.display()))?;
            continue;
        }

        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let mut out = std::fs::File::create(&target)
            .with_context(|| format!("Failed to create {}", target.display()))?;
        std::io::copy(&mut entry, &mut out)
            .with_context(|| format!("Failed to write {}", target.display()))?;
    }

    debug!("Extracted {} entries", zip.len());
    Ok(())
}

/// Deletes a downloaded archive once it has been unpacked
///
/// Failures are only logged.
pub async fn remove_archive(archive: &Path) {
    if let Err(e) = tokio::fs::remove_file(archive).await {
        warn!("Failed to remove {}: {}", archive.display(), e);
    }
}
