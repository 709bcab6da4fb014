//! HTTP transfer of the manifest and bundle files.
//!
//! Bundles stream to a `.part` temp file and are renamed into place only
//! on success, so an interrupted fetch never leaves a plausible-looking
//! bundle in the cache directory. Transport details (TLS, redirects,
//! connection pooling) belong to the HTTP client; retry policy lives in
//! [`crate::retry`].

pub mod error;

use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use reqwest::Client;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

pub use error::FetchError;

use crate::retry::{self, RetryConfig};

/// Name of the remote manifest document under the base URL.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Fetches remote files from a configured base URL.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    base_url: String,
    retry: RetryConfig,
}

impl Fetcher {
    pub fn new(base_url: impl Into<String>, retry: RetryConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            retry,
        }
    }

    /// Absolute URL for a remote file name.
    fn url_for(&self, file: &str) -> String {
        if self.base_url.ends_with('/') {
            format!("{}{}", self.base_url, file)
        } else {
            format!("{}/{}", self.base_url, file)
        }
    }

    /// Fetch the manifest document into memory.
    pub async fn fetch_manifest(&self) -> Result<Vec<u8>, FetchError> {
        let url = self.url_for(MANIFEST_FILE);
        retry::retry_with_backoff(&self.retry, FetchError::is_retryable, || async {
            let response = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(|e| FetchError::Http {
                    source: e,
                    url: url.clone(),
                })?;
            if !response.status().is_success() {
                return Err(FetchError::HttpStatus {
                    status: response.status().as_u16(),
                    url: url.clone(),
                });
            }
            let body = response.bytes().await.map_err(|e| FetchError::Http {
                source: e,
                url: url.clone(),
            })?;
            Ok(body.to_vec())
        })
        .await
    }

    /// Download one bundle into the cache directory.
    pub async fn fetch_bundle(&self, name: &str, dest: &Path) -> Result<(), FetchError> {
        let url = self.url_for(name);
        let part = part_path(dest);
        retry::retry_with_backoff(&self.retry, FetchError::is_retryable, || async {
            // Start every attempt from scratch; a truncated .part from a
            // failed attempt must never be appended to.
            let _ = fs::remove_file(&part).await;
            self.attempt_fetch(&url, dest, &part).await
        })
        .await
    }

    async fn attempt_fetch(&self, url: &str, dest: &Path, part: &Path) -> Result<(), FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Http {
                source: e,
                url: url.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(FetchError::HttpStatus {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }

        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(part)
            .await?;

        // Stream chunk by chunk; bundles can be large.
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| FetchError::Http {
                source: e,
                url: url.to_string(),
            })?;
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        drop(file);

        fs::rename(part, dest).await?;
        Ok(())
    }
}

/// Temp name used while a bundle is streaming to disk. Bundle names are
/// unique within one run, so the name itself is a sufficient key.
fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    dest.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_for_with_trailing_slash() {
        let f = Fetcher::new("http://cdn.example.com/v5016/", RetryConfig::default());
        assert_eq!(
            f.url_for("manifest.json"),
            "http://cdn.example.com/v5016/manifest.json"
        );
    }

    #[test]
    fn test_url_for_without_trailing_slash() {
        let f = Fetcher::new("http://cdn.example.com/v5016", RetryConfig::default());
        assert_eq!(f.url_for("a.ab"), "http://cdn.example.com/v5016/a.ab");
    }

    #[test]
    fn test_part_path_appends_suffix() {
        assert_eq!(
            part_path(Path::new("/cache/unit1003.ab")),
            Path::new("/cache/unit1003.ab.part")
        );
    }
}
