//! Configuration for the conversion pipeline.
//!
//! All pipeline behaviour is controlled through [`FerryConfig`], built via
//! its [`FerryConfigBuilder`]. Keeping every knob in one struct makes it
//! trivial to share the config across the service and the server binary and
//! to log the effective settings at startup.

use crate::error::FerryError;
use std::path::PathBuf;

/// Configuration for a [`crate::ferry::FerryService`].
///
/// Built via [`FerryConfig::builder()`] or [`FerryConfig::default()`].
///
/// # Example
/// ```rust
/// use epubferry::FerryConfig;
///
/// let config = FerryConfig::builder()
///     .scratch_root("/var/tmp/epubferry")
///     .fetch_timeout_secs(60)
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct FerryConfig {
    /// Root directory for per-job scratch subdirectories. Default: `./temp`.
    ///
    /// Each job works inside `<scratch_root>/<job-id>/`, so two jobs can
    /// never collide on disk even when they target the same source filename.
    /// The root is created at service construction and must stay writable
    /// for the life of the process.
    pub scratch_root: PathBuf,

    /// Extension the source filename is expected to carry. Default: `epub`.
    ///
    /// A mismatch is logged but does not abort the job: the external
    /// converter is the real validator, and some servers hand out perfectly
    /// good EPUBs under odd names.
    pub source_extension: String,

    /// Extension of the converted artifact. Default: `pdf`.
    pub target_extension: String,

    /// Timeout for fetching the source document, in seconds. Default: 120.
    pub fetch_timeout_secs: u64,

    /// Timeout for the external converter, in seconds. Default: 300.
    ///
    /// `ebook-convert` re-flows the whole book; large documents with many
    /// images can legitimately take minutes. The process is killed when the
    /// timeout expires so a wedged converter cannot stall the service
    /// forever.
    pub convert_timeout_secs: u64,

    /// Per-listener event buffer capacity. Default: 32.
    ///
    /// A full job emits six events, so the default leaves ample slack. A
    /// listener that cannot drain even this much is considered stalled and
    /// silently misses events rather than blocking the pipeline.
    pub listener_buffer: usize,
}

impl Default for FerryConfig {
    fn default() -> Self {
        Self {
            scratch_root: PathBuf::from("./temp"),
            source_extension: "epub".into(),
            target_extension: "pdf".into(),
            fetch_timeout_secs: 120,
            convert_timeout_secs: 300,
            listener_buffer: 32,
        }
    }
}

impl FerryConfig {
    /// Create a new builder for `FerryConfig`.
    pub fn builder() -> FerryConfigBuilder {
        FerryConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`FerryConfig`].
#[derive(Debug)]
pub struct FerryConfigBuilder {
    config: FerryConfig,
}

impl FerryConfigBuilder {
    pub fn scratch_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.config.scratch_root = root.into();
        self
    }

    pub fn source_extension(mut self, ext: impl Into<String>) -> Self {
        self.config.source_extension = ext.into();
        self
    }

    pub fn target_extension(mut self, ext: impl Into<String>) -> Self {
        self.config.target_extension = ext.into();
        self
    }

    pub fn fetch_timeout_secs(mut self, secs: u64) -> Self {
        self.config.fetch_timeout_secs = secs.max(1);
        self
    }

    pub fn convert_timeout_secs(mut self, secs: u64) -> Self {
        self.config.convert_timeout_secs = secs.max(1);
        self
    }

    pub fn listener_buffer(mut self, n: usize) -> Self {
        self.config.listener_buffer = n.max(1);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<FerryConfig, FerryError> {
        let c = &self.config;
        for (name, ext) in [
            ("source_extension", &c.source_extension),
            ("target_extension", &c.target_extension),
        ] {
            if ext.is_empty() || ext.starts_with('.') || ext.contains('/') {
                return Err(FerryError::InvalidConfig(format!(
                    "{name} must be a bare extension like \"epub\", got {ext:?}"
                )));
            }
        }
        if c.scratch_root.as_os_str().is_empty() {
            return Err(FerryError::InvalidConfig(
                "scratch_root must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}
