//! # epubferry
//!
//! Fetch an EPUB from a URL, convert it to PDF with an external converter
//! (Calibre's `ebook-convert` by default), push the result to a WebDAV
//! share, and broadcast progress to any number of passively connected
//! observers in real time.
//!
//! ## Pipeline Overview
//!
//! ```text
//! URL
//!  │
//!  ├─ 1. Download  fetch bytes, save to a per-job scratch dir     {"step":1}
//!  ├─ 2. Convert   external converter as a child process          {"step":3}
//!  ├─ 3. Upload    read artifact, PUT to WebDAV                   {"step":4}
//!  ├─ 4. Cleanup   remove scratch dir (never fatal)               {"step":5}
//!  └─ 5. Complete  final event, report to caller            {"status":"complete"}
//! ```
//!
//! Every stage start is broadcast to all registered listeners before the
//! stage runs; listeners connect and disconnect freely, independent of any
//! running job, and a slow listener can never stall the pipeline.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use epubferry::{
//!     CommandConverter, FerryConfig, FerryService, HttpFetcher, WebDavStore,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = FerryConfig::default();
//!     let service = FerryService::new(
//!         config.clone(),
//!         Arc::new(HttpFetcher::new(config.fetch_timeout_secs)?),
//!         Arc::new(CommandConverter::new("ebook-convert", config.convert_timeout_secs)),
//!         Arc::new(WebDavStore::new("https://dav.example.org", "user", "pass", 120)?),
//!     )?;
//!
//!     // Observe progress from anywhere:
//!     let _events = service.subscribe();
//!
//!     let report = service.run("https://example.org/book.epub").await?;
//!     println!("stored as {} in {}ms", report.remote_path, report.total_duration_ms);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `server` | on      | Enables the `epubferry` binary (axum + clap + tracing-subscriber) |
//!
//! Disable `server` when using only the library:
//! ```toml
//! epubferry = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod broadcast;
pub mod config;
pub mod error;
pub mod ferry;
pub mod job;
pub mod pipeline;
pub mod progress;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use broadcast::{Broadcaster, ListenerToken};
pub use config::{FerryConfig, FerryConfigBuilder};
pub use error::FerryError;
pub use ferry::{FerryService, JobReport};
pub use job::Job;
pub use pipeline::{CommandConverter, Convert, Fetch, HttpFetcher, Store, WebDavStore};
pub use progress::{JobStatus, ProgressEvent, Stage};
pub use stream::EventStream;
