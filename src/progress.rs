//! Progress events emitted by the pipeline and fanned out to listeners.
//!
//! Each event is a small immutable value: an optional `step` ordinal (1–5)
//! and a `status` label. The JSON wire form is stable and intentionally
//! minimal so any SSE client can consume it without a schema:
//!
//! ```text
//! {"step":1,"status":"downloading"}
//! {"step":2,"status":"downloaded"}
//! {"step":3,"status":"converting"}
//! {"step":4,"status":"uploading"}
//! {"step":5,"status":"cleaning"}
//! {"status":"complete"}
//! ```
//!
//! The final completion event carries no `step`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The pipeline stage a terminal error originated in.
///
/// Used for error reporting ("failed while converting"), not for the wire
/// form — the wire form carries [`JobStatus`] labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Fetching the source document and persisting it locally.
    Download,
    /// Running the external converter.
    Convert,
    /// Reading the artifact back and pushing it to remote storage.
    Upload,
    /// Removing local artifacts.
    Cleanup,
}

impl Stage {
    /// Human-readable label matching the progress statuses.
    pub fn label(&self) -> &'static str {
        match self {
            Stage::Download => "downloading",
            Stage::Convert => "converting",
            Stage::Upload => "uploading",
            Stage::Cleanup => "cleaning",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Status label carried by a [`ProgressEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Downloading,
    Downloaded,
    Converting,
    Uploading,
    Cleaning,
    Complete,
}

/// One stage transition, broadcast to every connected listener.
///
/// Events are cheap `Copy` values; the broadcaster hands one to each
/// listener's channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// Stage ordinal 1–5. Absent on the final completion event.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<u8>,
    /// What the pipeline is doing.
    pub status: JobStatus,
}

impl ProgressEvent {
    /// Event marking the start of a numbered pipeline step.
    pub fn step(step: u8, status: JobStatus) -> Self {
        Self {
            step: Some(step),
            status,
        }
    }

    /// The final event of a successful job: `{"status":"complete"}`.
    pub fn complete() -> Self {
        Self {
            step: None,
            status: JobStatus::Complete,
        }
    }

    /// Serialise to the stable JSON wire form.
    ///
    /// Infallible in practice: the type contains no map keys or
    /// non-serialisable values.
    pub fn to_wire(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| String::from("{}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_event_wire_form() {
        let e = ProgressEvent::step(1, JobStatus::Downloading);
        assert_eq!(e.to_wire(), r#"{"step":1,"status":"downloading"}"#);
    }

    #[test]
    fn complete_event_has_no_step() {
        let e = ProgressEvent::complete();
        assert_eq!(e.to_wire(), r#"{"status":"complete"}"#);
        assert!(e.step.is_none());
    }

    #[test]
    fn wire_form_round_trips() {
        let e = ProgressEvent::step(4, JobStatus::Uploading);
        let back: ProgressEvent = serde_json::from_str(&e.to_wire()).unwrap();
        assert_eq!(back, e);
    }

    #[test]
    fn stage_labels() {
        assert_eq!(Stage::Download.label(), "downloading");
        assert_eq!(Stage::Convert.label(), "converting");
        assert_eq!(Stage::Upload.label(), "uploading");
        assert_eq!(Stage::Cleanup.to_string(), "cleaning");
    }
}
