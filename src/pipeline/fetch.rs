//! Fetch collaborator: pull the source document's bytes from a URL.

use crate::error::FerryError;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info};

/// Fetches the raw bytes of a remote document.
///
/// The pipeline only needs `fetch(url) -> bytes | error`; anything that can
/// produce bytes for a URL (an HTTP client, a test fixture, a cache) fits
/// behind this seam.
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FerryError>;
}

/// HTTP implementation of [`Fetch`] backed by a shared [`reqwest::Client`].
///
/// The client is built once with the configured timeout so connection pools
/// are reused across jobs.
pub struct HttpFetcher {
    client: reqwest::Client,
    timeout_secs: u64,
}

impl HttpFetcher {
    /// Build a fetcher whose requests time out after `timeout_secs`.
    pub fn new(timeout_secs: u64) -> Result<Self, FerryError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| FerryError::InvalidConfig(format!("HTTP client: {e}")))?;
        Ok(Self {
            client,
            timeout_secs,
        })
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FerryError> {
        info!(url, "Downloading source document");

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                FerryError::FetchTimeout {
                    url: url.to_string(),
                    secs: self.timeout_secs,
                }
            } else {
                FerryError::FetchFailed {
                    url: url.to_string(),
                    reason: e.to_string(),
                }
            }
        })?;

        if !response.status().is_success() {
            return Err(FerryError::FetchFailed {
                url: url.to_string(),
                reason: format!("HTTP {}", response.status()),
            });
        }

        let bytes = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                FerryError::FetchTimeout {
                    url: url.to_string(),
                    secs: self.timeout_secs,
                }
            } else {
                FerryError::FetchFailed {
                    url: url.to_string(),
                    reason: e.to_string(),
                }
            }
        })?;

        debug!(url, bytes = bytes.len(), "Download complete");
        Ok(bytes.to_vec())
    }
}
