//! Job identity and scratch-path derivation.
//!
//! ## Why a per-job scratch subdirectory?
//!
//! Deriving local paths purely from the source filename means two jobs for
//! `book.epub` would interleave their artifacts on disk. Every [`Job`] gets
//! a fresh UUID and works inside `<scratch_root>/<uuid>/`, so collisions are
//! impossible and cleanup is a single recursive remove.
//!
//! The output path uses proper stem/extension decomposition rather than
//! assuming a fixed-length source extension: `book.epub` → `book.pdf`, but
//! `book` → `book.pdf` and `archive.tar.gz` → `archive.tar.pdf` too.

use crate::config::FerryConfig;
use crate::error::FerryError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::warn;
use uuid::Uuid;

/// Characters not allowed in a scratch filename. Everything outside
/// `[A-Za-z0-9._-]` is collapsed to `_` so a hostile URL cannot traverse
/// out of the scratch directory or produce an unopenable name.
static UNSAFE_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9._-]+").unwrap());

/// Fallback stem when the URL yields no usable filename.
const FALLBACK_STEM: &str = "document";

/// One execution of the download→convert→upload→cleanup pipeline.
///
/// Ephemeral: constructed on request receipt, its scratch directory removed
/// on completion or terminal failure. Never persisted.
#[derive(Debug, Clone)]
pub struct Job {
    /// Unique job identifier; also names the scratch subdirectory.
    pub id: Uuid,
    /// The source URL as received.
    pub source_url: String,
    /// This job's private scratch directory: `<scratch_root>/<id>/`.
    pub scratch_dir: PathBuf,
    /// Where the fetched document is written.
    pub input_path: PathBuf,
    /// Where the converter writes its artifact.
    pub output_path: PathBuf,
}

impl Job {
    /// Derive a new job from a source URL and the service config.
    ///
    /// Validates that the URL is HTTP/HTTPS and derives all paths; does not
    /// touch the filesystem (the service creates `scratch_dir` when the job
    /// is admitted).
    pub fn new(url: &str, config: &FerryConfig) -> Result<Self, FerryError> {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(FerryError::InvalidUrl { url: url.into() });
        }

        let filename = derive_filename(url, &config.source_extension);

        let id = Uuid::new_v4();
        let scratch_dir = config.scratch_root.join(id.to_string());
        let input_path = scratch_dir.join(&filename);
        let output_path = swap_extension(&input_path, &config.target_extension);

        Ok(Self {
            id,
            source_url: url.to_string(),
            scratch_dir,
            input_path,
            output_path,
        })
    }

    /// Remote destination for the converted artifact: `/<output basename>`.
    pub fn remote_path(&self) -> String {
        let base = self
            .output_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| FALLBACK_STEM.to_string());
        format!("/{base}")
    }
}

/// Extract and sanitise a filename from the URL's final path segment.
///
/// Query string and fragment are stripped first; the original service fed
/// `path.Base(url)` straight into the filesystem, query and all.
fn derive_filename(url: &str, expected_ext: &str) -> String {
    let path_part = url.split(['?', '#']).next().unwrap_or(url);
    // Skip the scheme and authority so a path-less URL cannot hand us the
    // hostname as a "filename".
    let after_scheme = path_part
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(path_part);
    let last = match after_scheme.split_once('/') {
        Some((_authority, path)) => path.trim_end_matches('/').rsplit('/').next().unwrap_or(""),
        None => "",
    };

    let sanitised = UNSAFE_CHARS.replace_all(last, "_");
    let sanitised = sanitised.trim_matches(['_', '.']);

    let name = if sanitised.is_empty() {
        format!("{FALLBACK_STEM}.{expected_ext}")
    } else {
        sanitised.to_string()
    };

    match Path::new(&name).extension() {
        Some(ext) if ext.eq_ignore_ascii_case(expected_ext) => {}
        Some(ext) => warn!(
            filename = %name,
            extension = %ext.to_string_lossy(),
            expected = %expected_ext,
            "Source filename has an unexpected extension; proceeding anyway"
        ),
        None => warn!(
            filename = %name,
            expected = %expected_ext,
            "Source filename has no extension; proceeding anyway"
        ),
    }

    name
}

/// Replace (or append) the final extension of `path` with `ext`.
fn swap_extension(path: &Path, ext: &str) -> PathBuf {
    path.with_extension(ext)
}
