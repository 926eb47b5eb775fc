//! Local cache for datasets served over HTTP.
//!
//! A remote dataset is downloaded lazily on first access and re-downloaded
//! when the server reports a different `ETag` (or `Last-Modified`) than the
//! one stored next to the cached file. Gzipped downloads are decompressed
//! before they land in the cache.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use flate2::read::GzDecoder;
use reqwest::blocking::Client;
use reqwest::header::{ETAG, LAST_MODIFIED};
use tempfile::NamedTempFile;

use crate::config;
use crate::error::{DashboardError, Result};

/// Downloads and caches remote dataset files.
pub struct CacheManager {
    /// Directory where cached files are stored.
    pub cache_dir: PathBuf,
    /// If true, never touch the network (use cached files only).
    pub offline: bool,
    timeout: Duration,
    client: Option<Client>,
    remote_tags: HashMap<String, Option<String>>,
}

impl CacheManager {
    /// Create a new cache manager.
    ///
    /// If `cache_dir` is `None`, uses the platform-appropriate default cache
    /// directory. Creates the directory if it does not exist.
    pub fn new(cache_dir: Option<PathBuf>, offline: bool, timeout: Duration) -> Result<Self> {
        let dir = cache_dir.unwrap_or_else(config::default_cache_dir);
        fs::create_dir_all(&dir)?;
        Ok(Self {
            cache_dir: dir,
            offline,
            timeout,
            client: None,
            remote_tags: HashMap::new(),
        })
    }

    /// Lazy HTTP client, created on first use.
    fn client(&mut self) -> Result<Client> {
        if let Some(client) = &self.client {
            return Ok(client.clone());
        }
        let client = Client::builder()
            .timeout(self.timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;
        self.client = Some(client.clone());
        Ok(client)
    }

    /// Path a URL is cached under (`.gz` suffix dropped, query ignored).
    pub fn local_path(&self, url: &str) -> PathBuf {
        let without_query = url.split(['?', '#']).next().unwrap_or(url);
        let name = without_query
            .rsplit('/')
            .next()
            .map(|n| n.trim_end_matches(".gz"))
            .filter(|n| !n.is_empty())
            .unwrap_or(config::DEFAULT_DATASET_FILE);
        self.cache_dir.join(name)
    }

    fn tag_path(local: &Path) -> PathBuf {
        let mut name = local
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".etag");
        local.with_file_name(name)
    }

    fn local_tag(local: &Path) -> Option<String> {
        fs::read_to_string(Self::tag_path(local))
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    fn save_tag(local: &Path, tag: &str) {
        if let Err(e) = fs::write(Self::tag_path(local), tag) {
            tracing::warn!(path = %local.display(), error = %e, "Failed to store cache tag");
        }
    }

    /// Fetch the server's version tag for `url` with a `HEAD` request.
    ///
    /// Returns `None` when offline, when the server is unreachable, or when
    /// it sends neither `ETag` nor `Last-Modified`. Cached per URL.
    pub fn remote_tag(&mut self, url: &str) -> Result<Option<String>> {
        if let Some(tag) = self.remote_tags.get(url) {
            return Ok(tag.clone());
        }
        if self.offline {
            return Ok(None);
        }
        let client = self.client()?;
        let tag = match client.head(url).send() {
            Ok(resp) => {
                let resp = resp.error_for_status()?;
                let headers = resp.headers();
                headers
                    .get(ETAG)
                    .or_else(|| headers.get(LAST_MODIFIED))
                    .and_then(|v| v.to_str().ok())
                    .map(|s| s.to_string())
            }
            Err(e) => {
                tracing::warn!(url, error = %e, "Failed to check dataset version");
                None
            }
        };
        self.remote_tags.insert(url.to_string(), tag.clone());
        Ok(tag)
    }

    /// Check whether the cached copy of `url` is missing or out of date.
    ///
    /// When online, always asks the server again with a fresh `HEAD`
    /// request. An unreachable server or a server without version headers
    /// counts as fresh when a cached copy exists.
    pub fn is_stale(&mut self, url: &str) -> Result<bool> {
        let local = self.local_path(url);
        if !local.exists() {
            return Ok(true);
        }
        if !self.offline {
            self.remote_tags.remove(url);
        }
        let remote = self.remote_tag(url)?;
        Ok(match (Self::local_tag(&local), remote) {
            (_, None) => false,
            (None, Some(_)) => true,
            (Some(local_tag), Some(remote_tag)) => local_tag != remote_tag,
        })
    }

    /// Download `url` into `dest`.
    ///
    /// Writes to a temp file in the cache directory and persists it on
    /// success, so an interrupted download never leaves a partial file.
    fn download_file(&mut self, url: &str, dest: &Path) -> Result<()> {
        tracing::info!(url, dest = %dest.display(), "Downloading dataset");

        let parent = dest.parent().unwrap_or(&self.cache_dir).to_path_buf();
        fs::create_dir_all(&parent)?;

        let client = self.client()?;
        let resp = client.get(url).send()?.error_for_status()?;
        let tag = resp
            .headers()
            .get(ETAG)
            .or_else(|| resp.headers().get(LAST_MODIFIED))
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let bytes = resp.bytes()?;

        let mut tmp = NamedTempFile::new_in(&parent)?;
        if url.split(['?', '#']).next().unwrap_or(url).ends_with(".gz") {
            let mut decoder = GzDecoder::new(&bytes[..]);
            io::copy(&mut decoder, &mut tmp)?;
        } else {
            io::copy(&mut &bytes[..], &mut tmp)?;
        }
        tmp.persist(dest).map_err(|e| DashboardError::Io(e.error))?;

        if let Some(tag) = tag {
            Self::save_tag(dest, &tag);
            self.remote_tags.insert(url.to_string(), Some(tag));
        }
        tracing::debug!(dest = %dest.display(), size = bytes.len(), "Dataset cached");
        Ok(())
    }

    /// Ensure the dataset at `url` is cached locally, downloading if needed.
    ///
    /// Returns the local filesystem path of the cached CSV.
    pub fn ensure_dataset(&mut self, url: &str) -> Result<PathBuf> {
        let local_path = self.local_path(url);

        if self.offline {
            if local_path.exists() {
                return Ok(local_path);
            }
            return Err(DashboardError::NotFound(format!(
                "Dataset {} not cached and offline mode is enabled",
                url
            )));
        }

        if self.is_stale(url)? {
            self.download_file(url, &local_path)?;
        }

        Ok(local_path)
    }

    /// Remove all cached files and recreate the cache directory.
    pub fn clear(&mut self) -> Result<()> {
        if self.cache_dir.exists() {
            fs::remove_dir_all(&self.cache_dir)?;
            fs::create_dir_all(&self.cache_dir)?;
        }
        self.remote_tags.clear();
        Ok(())
    }

    /// Close the HTTP client, if open.
    pub fn close(&mut self) {
        self.client = None;
    }
}
