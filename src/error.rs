//! Error types for the epubferry library.
//!
//! Every variant that aborts the pipeline maps back to the [`Stage`] it
//! originated in via [`FerryError::stage`], so callers can report
//! "failed while converting" without parsing messages. Cleanup failures are
//! deliberately *not* represented here: they are non-fatal by design and
//! are logged where they occur, never changing the outcome the earlier
//! stages already determined.

use crate::progress::Stage;
use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the epubferry library.
#[derive(Debug, Error)]
pub enum FerryError {
    // ── Request errors ────────────────────────────────────────────────────
    /// The source reference is not an HTTP/HTTPS URL with a usable path.
    #[error("Invalid source URL '{url}': not an HTTP/HTTPS URL")]
    InvalidUrl { url: String },

    /// Another job is already in flight; this design runs one at a time.
    #[error("A conversion job is already running; try again when it finishes")]
    Busy,

    // ── Download stage ────────────────────────────────────────────────────
    /// Fetching the source document failed.
    #[error("Download failed for '{url}': {reason}")]
    FetchFailed { url: String, reason: String },

    /// Fetch exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'")]
    FetchTimeout { url: String, secs: u64 },

    /// Writing the fetched bytes to the scratch directory failed.
    #[error("Failed to save downloaded file '{path}': {source}")]
    PersistFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Convert stage ─────────────────────────────────────────────────────
    /// The external converter could not be spawned, or exited non-zero.
    /// `detail` carries the combined stdout/stderr for diagnostics.
    #[error("Conversion failed ({program}): {detail}")]
    ConversionFailed { program: String, detail: String },

    /// The external converter ran past the configured timeout and was killed.
    #[error("Converter '{program}' timed out after {secs}s")]
    ConversionTimeout { program: String, secs: u64 },

    // ── Upload stage ──────────────────────────────────────────────────────
    /// Reading the converted artifact back from disk failed.
    #[error("Failed to read converted file '{path}': {source}")]
    ReadBackFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Pushing the artifact to remote storage failed.
    #[error("Upload failed for '{remote_path}': {reason}")]
    UploadFailed { remote_path: String, reason: String },

    // ── Lifecycle ─────────────────────────────────────────────────────────
    /// The job was cancelled while the named stage was in flight.
    #[error("Job cancelled during the {stage} stage")]
    Cancelled { stage: Stage },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed, or the scratch root is unusable.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl FerryError {
    /// The pipeline stage this error aborted, if any.
    ///
    /// `InvalidUrl`, `Busy`, and `InvalidConfig` occur before the pipeline
    /// starts and return `None`.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            FerryError::FetchFailed { .. }
            | FerryError::FetchTimeout { .. }
            | FerryError::PersistFailed { .. } => Some(Stage::Download),
            FerryError::ConversionFailed { .. } | FerryError::ConversionTimeout { .. } => {
                Some(Stage::Convert)
            }
            FerryError::ReadBackFailed { .. } | FerryError::UploadFailed { .. } => {
                Some(Stage::Upload)
            }
            FerryError::Cancelled { stage } => Some(*stage),
            FerryError::InvalidUrl { .. } | FerryError::Busy | FerryError::InvalidConfig(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_errors_map_to_download_stage() {
        let e = FerryError::FetchFailed {
            url: "https://example.org/book.epub".into(),
            reason: "HTTP 404".into(),
        };
        assert_eq!(e.stage(), Some(Stage::Download));
        assert!(e.to_string().contains("HTTP 404"));
    }

    #[test]
    fn conversion_failure_identifies_converting_stage() {
        let e = FerryError::ConversionFailed {
            program: "ebook-convert".into(),
            detail: "exit status 1".into(),
        };
        assert_eq!(e.stage().map(|s| s.label()), Some("converting"));
    }

    #[test]
    fn upload_errors_map_to_upload_stage() {
        let e = FerryError::UploadFailed {
            remote_path: "/book.pdf".into(),
            reason: "HTTP 507".into(),
        };
        assert_eq!(e.stage(), Some(Stage::Upload));
    }

    #[test]
    fn pre_pipeline_errors_have_no_stage() {
        assert_eq!(FerryError::Busy.stage(), None);
        assert_eq!(
            FerryError::InvalidUrl {
                url: "ftp://x".into()
            }
            .stage(),
            None
        );
    }

    #[test]
    fn cancelled_preserves_stage() {
        let e = FerryError::Cancelled {
            stage: Stage::Upload,
        };
        assert_eq!(e.stage(), Some(Stage::Upload));
        assert!(e.to_string().contains("uploading"));
    }
}
