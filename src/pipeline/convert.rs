//! Convert collaborator: run the external converter as a child process.
//!
//! The reference deployment uses Calibre's `ebook-convert`, but nothing
//! here knows about EPUB or PDF — the converter is handed the input and
//! output paths and judged solely on its exit status. stdout and stderr
//! are captured and merged so a failure surfaces the tool's own
//! diagnostics instead of a bare exit code.

use crate::error::FerryError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info};

/// Converts a local input file into a local output file.
#[async_trait]
pub trait Convert: Send + Sync {
    async fn convert(&self, input: &Path, output: &Path) -> Result<(), FerryError>;
}

/// [`Convert`] implementation that spawns an external program with the two
/// paths as its final arguments.
///
/// The child is killed if it outlives the timeout; a wedged converter must
/// not stall the service indefinitely.
pub struct CommandConverter {
    program: PathBuf,
    extra_args: Vec<String>,
    timeout: Duration,
}

impl CommandConverter {
    /// Create a converter invoking `program <input> <output>`.
    pub fn new(program: impl Into<PathBuf>, timeout_secs: u64) -> Self {
        Self {
            program: program.into(),
            extra_args: Vec::new(),
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    /// Arguments inserted before the input/output paths (e.g. quality
    /// flags for `ebook-convert`).
    pub fn extra_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.extra_args = args.into_iter().map(Into::into).collect();
        self
    }

    fn program_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.program.to_string_lossy().into_owned())
    }
}

#[async_trait]
impl Convert for CommandConverter {
    async fn convert(&self, input: &Path, output: &Path) -> Result<(), FerryError> {
        let program = self.program_name();
        info!(program = %program, input = %input.display(), output = %output.display(), "Starting conversion");

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.extra_args)
            .arg(input)
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(|e| FerryError::ConversionFailed {
            program: program.clone(),
            detail: format!("failed to spawn: {e}"),
        })?;

        let result = tokio::time::timeout(self.timeout, child.wait_with_output()).await;

        match result {
            Ok(Ok(out)) => {
                // Combined output: the converter's own diagnostics matter
                // more than which descriptor they arrived on.
                let mut combined = String::from_utf8_lossy(&out.stdout).into_owned();
                combined.push_str(&String::from_utf8_lossy(&out.stderr));
                let combined = combined.trim().to_string();

                if !out.status.success() {
                    return Err(FerryError::ConversionFailed {
                        program,
                        detail: format!("exited with {}: {combined}", out.status),
                    });
                }
                debug!(program = %program, "Conversion complete");
                Ok(())
            }
            Ok(Err(e)) => Err(FerryError::ConversionFailed {
                program,
                detail: format!("I/O error waiting for process: {e}"),
            }),
            // Timeout: the future holding the child was dropped, and
            // kill_on_drop reaps it.
            Err(_elapsed) => Err(FerryError::ConversionTimeout {
                program,
                secs: self.timeout.as_secs(),
            }),
        }
    }
}
