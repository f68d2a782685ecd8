//! Store collaborator: push the converted artifact to remote storage.
//!
//! The reference deployment stores into a WebDAV share. A WebDAV upload is
//! a plain HTTP `PUT` with basic auth, so [`WebDavStore`] is a thin layer
//! over [`reqwest`] rather than a dedicated WebDAV client.

use crate::error::FerryError;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info};

/// Pushes bytes to a remote destination.
///
/// `remote_path` is rooted at the store's base (e.g. `/book.pdf`).
#[async_trait]
pub trait Store: Send + Sync {
    async fn store(&self, remote_path: &str, bytes: Vec<u8>) -> Result<(), FerryError>;
}

/// [`Store`] implementation targeting a WebDAV endpoint.
pub struct WebDavStore {
    client: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
}

impl WebDavStore {
    /// Create a store for the WebDAV share at `base_url`, authenticating
    /// with HTTP basic auth.
    pub fn new(
        base_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self, FerryError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| FerryError::InvalidConfig(format!("WebDAV client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            username: username.into(),
            password: password.into(),
        })
    }

    fn url_for(&self, remote_path: &str) -> String {
        format!("{}/{}", self.base_url, remote_path.trim_start_matches('/'))
    }
}

#[async_trait]
impl Store for WebDavStore {
    async fn store(&self, remote_path: &str, bytes: Vec<u8>) -> Result<(), FerryError> {
        let url = self.url_for(remote_path);
        info!(remote = remote_path, bytes = bytes.len(), "Uploading to WebDAV");

        let response = self
            .client
            .put(&url)
            .basic_auth(&self.username, Some(&self.password))
            .body(bytes)
            .send()
            .await
            .map_err(|e| FerryError::UploadFailed {
                remote_path: remote_path.to_string(),
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(FerryError::UploadFailed {
                remote_path: remote_path.to_string(),
                reason: format!("HTTP {}", response.status()),
            });
        }

        debug!(remote = remote_path, "Upload complete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_base_and_remote_path_without_doubled_slashes() {
        let store = WebDavStore::new("https://dav.example.org/books/", "u", "p", 30).unwrap();
        assert_eq!(
            store.url_for("/book.pdf"),
            "https://dav.example.org/books/book.pdf"
        );
        assert_eq!(
            store.url_for("book.pdf"),
            "https://dav.example.org/books/book.pdf"
        );
    }

    #[tokio::test]
    async fn unreachable_endpoint_reports_upload_failed() {
        let store = WebDavStore::new("http://nonexistent.invalid", "u", "p", 5).unwrap();
        let err = store.store("/book.pdf", vec![1, 2, 3]).await.unwrap_err();
        assert!(matches!(err, FerryError::UploadFailed { .. }));
    }
}
