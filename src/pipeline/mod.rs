//! Collaborator seams for the conversion pipeline.
//!
//! Each submodule owns exactly one external dependency of a job, behind a
//! trait so tests (and alternative deployments) can swap implementations
//! without touching the orchestration in [`crate::ferry`].
//!
//! ## Data Flow
//!
//! ```text
//! fetch ──▶ convert ──▶ store
//! (HTTP GET)  (child process)  (WebDAV PUT)
//! ```
//!
//! 1. [`fetch`]   — pull the source document's bytes from its URL
//! 2. [`convert`] — run the external converter over the two scratch paths
//! 3. [`store`]   — push the converted artifact to remote storage

pub mod convert;
pub mod fetch;
pub mod store;

pub use convert::{CommandConverter, Convert};
pub use fetch::{Fetch, HttpFetcher};
pub use store::{Store, WebDavStore};
