//! Job orchestration: the five-stage pipeline plus progress broadcasting.
//!
//! ## Why single-flight?
//!
//! The service runs at most one job at a time. Conversion saturates a core
//! and the scratch directory is the only working state, so admitting a
//! second job buys nothing but contention. A concurrent `run` is rejected
//! immediately with [`FerryError::Busy`] rather than queued; the caller can
//! simply retry when the stream shows `complete`.
//!
//! ## Event and failure semantics
//!
//! One event marks the start of each stage (steps 1–5) and a final
//! `complete` event marks success. The first failing stage aborts the rest,
//! except cleanup, which is always attempted — silently on the failure path
//! (no step-5 event), announced on the success path. Cleanup failures are
//! logged and never change the outcome the earlier stages determined.

use crate::broadcast::Broadcaster;
use crate::config::FerryConfig;
use crate::error::FerryError;
use crate::job::Job;
use crate::pipeline::{Convert, Fetch, Store};
use crate::progress::{JobStatus, ProgressEvent, Stage};
use crate::stream::EventStream;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Summary of one completed job, returned to the original caller.
#[derive(Debug, Clone)]
pub struct JobReport {
    /// The job's unique identifier.
    pub job_id: uuid::Uuid,
    /// Remote destination the artifact was stored under.
    pub remote_path: String,
    /// Size of the fetched source document.
    pub source_bytes: u64,
    /// Size of the uploaded artifact.
    pub artifact_bytes: u64,
    /// Wall-clock spent fetching, in milliseconds.
    pub fetch_duration_ms: u64,
    /// Wall-clock spent in the external converter, in milliseconds.
    pub convert_duration_ms: u64,
    /// Wall-clock spent uploading, in milliseconds.
    pub upload_duration_ms: u64,
    /// Total wall-clock for the job, including cleanup.
    pub total_duration_ms: u64,
}

/// The progress-broadcasting job pipeline.
///
/// Owns the collaborators, the listener [`Broadcaster`], and the
/// single-flight slot. Cheap to share behind an [`Arc`]; all methods take
/// `&self`.
pub struct FerryService {
    config: FerryConfig,
    fetcher: Arc<dyn Fetch>,
    converter: Arc<dyn Convert>,
    store: Arc<dyn Store>,
    broadcaster: Arc<Broadcaster>,
    // Single-flight slot: held for the duration of one run().
    in_flight: Mutex<()>,
}

impl FerryService {
    /// Build the service and create the scratch root.
    ///
    /// Fails if the scratch root cannot be created or is not writable —
    /// better to find out at startup than on the first request.
    pub fn new(
        config: FerryConfig,
        fetcher: Arc<dyn Fetch>,
        converter: Arc<dyn Convert>,
        store: Arc<dyn Store>,
    ) -> Result<Self, FerryError> {
        std::fs::create_dir_all(&config.scratch_root).map_err(|e| {
            FerryError::InvalidConfig(format!(
                "cannot create scratch root '{}': {e}",
                config.scratch_root.display()
            ))
        })?;

        let broadcaster = Arc::new(Broadcaster::new(config.listener_buffer));
        Ok(Self {
            config,
            fetcher,
            converter,
            store,
            broadcaster,
            in_flight: Mutex::new(()),
        })
    }

    /// The broadcaster fanning progress events out to listeners.
    ///
    /// Listener lifecycle is fully independent of any job: register and
    /// drop listeners whenever, running pipeline or not.
    pub fn broadcaster(&self) -> Arc<Broadcaster> {
        Arc::clone(&self.broadcaster)
    }

    /// Register a listener and return its event stream.
    pub fn subscribe(&self) -> EventStream {
        EventStream::subscribe(self.broadcaster())
    }

    /// Run one job to completion. See [`Self::run_with_cancel`].
    pub async fn run(&self, url: &str) -> Result<JobReport, FerryError> {
        self.run_with_cancel(url, CancellationToken::new()).await
    }

    /// Run one job to completion, aborting the in-flight stage if `cancel`
    /// fires.
    ///
    /// Cancellation still attempts cleanup and never touches listener
    /// registrations. Returns [`FerryError::Busy`] if another job is
    /// already running.
    pub async fn run_with_cancel(
        &self,
        url: &str,
        cancel: CancellationToken,
    ) -> Result<JobReport, FerryError> {
        let _slot = self.in_flight.try_lock().map_err(|_| FerryError::Busy)?;

        let job = Job::new(url, &self.config)?;
        info!(
            job_id = %job.id,
            url,
            input = %job.input_path.display(),
            output = %job.output_path.display(),
            "Job admitted"
        );

        tokio::fs::create_dir_all(&job.scratch_dir)
            .await
            .map_err(|e| FerryError::PersistFailed {
                path: job.scratch_dir.clone(),
                source: e,
            })?;

        let started = Instant::now();
        let result = self.run_stages(&job, &cancel).await;

        match result {
            Ok(mut report) => {
                // Stage 4: cleanup, announced. Non-fatal by design.
                self.broadcaster
                    .publish(ProgressEvent::step(5, JobStatus::Cleaning));
                self.cleanup(&job).await;

                // Stage 5: completion.
                self.broadcaster.publish(ProgressEvent::complete());
                report.total_duration_ms = started.elapsed().as_millis() as u64;
                info!(
                    job_id = %job.id,
                    remote = %report.remote_path,
                    total_ms = report.total_duration_ms,
                    "Job complete"
                );
                Ok(report)
            }
            Err(e) => {
                // Cleanup is attempted even after a terminal failure, but
                // quietly: the stream must show nothing past the failed step.
                self.cleanup(&job).await;
                warn!(job_id = %job.id, error = %e, "Job failed");
                Err(e)
            }
        }
    }

    /// Stages 1–3: download, convert, upload, with their progress events.
    async fn run_stages(
        &self,
        job: &Job,
        cancel: &CancellationToken,
    ) -> Result<JobReport, FerryError> {
        // ── Stage 1: download ────────────────────────────────────────────
        self.broadcaster
            .publish(ProgressEvent::step(1, JobStatus::Downloading));

        let fetch_started = Instant::now();
        let bytes = guarded(cancel, Stage::Download, self.fetcher.fetch(&job.source_url)).await?;
        let source_bytes = bytes.len() as u64;

        tokio::fs::write(&job.input_path, &bytes)
            .await
            .map_err(|e| FerryError::PersistFailed {
                path: job.input_path.clone(),
                source: e,
            })?;
        set_readable(&job.input_path).await?;
        let fetch_duration_ms = fetch_started.elapsed().as_millis() as u64;

        info!(job_id = %job.id, bytes = source_bytes, "Source document saved");
        self.broadcaster
            .publish(ProgressEvent::step(2, JobStatus::Downloaded));

        // ── Stage 2: convert ─────────────────────────────────────────────
        self.broadcaster
            .publish(ProgressEvent::step(3, JobStatus::Converting));

        let convert_started = Instant::now();
        guarded(
            cancel,
            Stage::Convert,
            self.converter.convert(&job.input_path, &job.output_path),
        )
        .await?;
        let convert_duration_ms = convert_started.elapsed().as_millis() as u64;

        // ── Stage 3: upload ──────────────────────────────────────────────
        self.broadcaster
            .publish(ProgressEvent::step(4, JobStatus::Uploading));

        let upload_started = Instant::now();
        let artifact = tokio::fs::read(&job.output_path).await.map_err(|e| {
            FerryError::ReadBackFailed {
                path: job.output_path.clone(),
                source: e,
            }
        })?;
        let artifact_bytes = artifact.len() as u64;

        let remote_path = job.remote_path();
        guarded(
            cancel,
            Stage::Upload,
            self.store.store(&remote_path, artifact),
        )
        .await?;
        let upload_duration_ms = upload_started.elapsed().as_millis() as u64;

        Ok(JobReport {
            job_id: job.id,
            remote_path,
            source_bytes,
            artifact_bytes,
            fetch_duration_ms,
            convert_duration_ms,
            upload_duration_ms,
            total_duration_ms: 0, // filled in by the caller
        })
    }

    /// Remove the job's scratch directory, best-effort.
    ///
    /// Tolerates the directory (or anything in it) already being gone; a
    /// download-stage failure may leave nothing behind at all.
    async fn cleanup(&self, job: &Job) {
        match tokio::fs::remove_dir_all(&job.scratch_dir).await {
            Ok(()) => info!(job_id = %job.id, "Scratch directory removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                job_id = %job.id,
                dir = %job.scratch_dir.display(),
                error = %e,
                "Cleanup failed; leaving scratch files behind"
            ),
        }
    }
}

/// Race a stage future against the cancellation token.
async fn guarded<T, F>(
    cancel: &CancellationToken,
    stage: Stage,
    fut: F,
) -> Result<T, FerryError>
where
    F: Future<Output = Result<T, FerryError>>,
{
    tokio::select! {
        _ = cancel.cancelled() => Err(FerryError::Cancelled { stage }),
        res = fut => res,
    }
}

/// Fixed permissions so later pipeline steps (and the converter, which may
/// run as a different user in some deployments) can read the file.
#[cfg(unix)]
async fn set_readable(path: &std::path::Path) -> Result<(), FerryError> {
    use std::os::unix::fs::PermissionsExt;
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o644))
        .await
        .map_err(|e| FerryError::PersistFailed {
            path: path.to_path_buf(),
            source: e,
        })
}

#[cfg(not(unix))]
async fn set_readable(_path: &std::path::Path) -> Result<(), FerryError> {
    Ok(())
}
