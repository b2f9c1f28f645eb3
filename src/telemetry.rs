//! Per-file outcome reporting.
//!
//! The orchestrator hands every [`FileReport`] to a [`Telemetry`] handle it is given, instead of
//! writing to global state, so tests can observe a batch without installing a subscriber.

use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, error, info};

/// Terminal state of one discovered file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileOutcome {
    /// Not a supported media file. Silent skip.
    FilteredOut,
    /// Artifact already exists for this file and model size.
    CacheHit,
    /// Transcript written.
    Succeeded,
    /// Processing failed and the file was moved to the quarantine directory.
    Quarantined,
    /// Processing failed and moving the file to quarantine failed too; file left in place.
    QuarantineFailed,
    /// Processing failed and no quarantine directory is configured.
    Failed,
}

impl FileOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            FileOutcome::FilteredOut => "filtered_out",
            FileOutcome::CacheHit => "cache_hit",
            FileOutcome::Succeeded => "succeeded",
            FileOutcome::Quarantined => "quarantined",
            FileOutcome::QuarantineFailed => "quarantine_failed",
            FileOutcome::Failed => "failed",
        }
    }

    /// Whether processing the file went wrong (regardless of what happened to it afterwards).
    pub fn is_failure(self) -> bool {
        matches!(
            self,
            FileOutcome::Quarantined | FileOutcome::QuarantineFailed | FileOutcome::Failed
        )
    }
}

/// What happened to one file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    pub outcome: FileOutcome,
    /// Engine start to writer finish. `None` for skipped files.
    pub duration: Option<Duration>,
    /// Failure reason, when the outcome is a failure.
    pub error: Option<String>,
    /// Artifacts written on success.
    pub artifacts: Vec<PathBuf>,
    /// New location of the file after quarantine.
    pub quarantined_to: Option<PathBuf>,
}

impl FileReport {
    pub(crate) fn skipped(path: PathBuf, outcome: FileOutcome) -> Self {
        Self {
            path,
            outcome,
            duration: None,
            error: None,
            artifacts: Vec::new(),
            quarantined_to: None,
        }
    }
}

/// Counts per outcome for a whole batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub discovered: usize,
    pub filtered_out: usize,
    pub cache_hits: usize,
    pub succeeded: usize,
    pub quarantined: usize,
    pub quarantine_failed: usize,
    pub failed: usize,
    pub elapsed: Duration,
}

impl BatchSummary {
    pub(crate) fn record(&mut self, report: &FileReport) {
        let counter = match report.outcome {
            FileOutcome::FilteredOut => &mut self.filtered_out,
            FileOutcome::CacheHit => &mut self.cache_hits,
            FileOutcome::Succeeded => &mut self.succeeded,
            FileOutcome::Quarantined => &mut self.quarantined,
            FileOutcome::QuarantineFailed => &mut self.quarantine_failed,
            FileOutcome::Failed => &mut self.failed,
        };
        *counter += 1;
    }

    /// Files whose processing failed, quarantined or not.
    pub fn failures(&self) -> usize {
        self.quarantined + self.quarantine_failed + self.failed
    }
}

/// Receives batch progress from the orchestrator.
pub trait Telemetry {
    /// Called once, after discovery, with the number of files found.
    fn on_start(&mut self, _discovered: usize) {}

    fn on_file(&mut self, report: &FileReport);

    fn on_finish(&mut self, _summary: &BatchSummary) {}
}

/// Emits one `tracing` event per file and one for the batch.
///
/// Every failed file produces exactly one `error`-level event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingTelemetry;

impl Telemetry for TracingTelemetry {
    fn on_start(&mut self, discovered: usize) {
        info!(discovered, "batch started");
    }

    fn on_file(&mut self, report: &FileReport) {
        let path = report.path.display();
        let outcome = report.outcome.as_str();
        let duration_ms = report.duration.map(|d| d.as_millis() as u64);
        let error = report.error.as_deref().unwrap_or_default();

        match report.outcome {
            FileOutcome::FilteredOut => debug!(%path, outcome, "skipping unsupported file"),
            FileOutcome::CacheHit => info!(%path, outcome, "already exists, skipping"),
            FileOutcome::Succeeded => info!(
                %path,
                outcome,
                duration_ms,
                artifacts = report.artifacts.len(),
                "transcribed"
            ),
            FileOutcome::Quarantined => error!(
                %path,
                outcome,
                duration_ms,
                error,
                quarantined_to = ?report.quarantined_to,
                "transcription failed, file quarantined"
            ),
            FileOutcome::QuarantineFailed => error!(
                %path,
                outcome,
                duration_ms,
                error,
                "transcription failed, file left in place"
            ),
            FileOutcome::Failed => error!(%path, outcome, duration_ms, error, "transcription failed"),
        }
    }

    fn on_finish(&mut self, summary: &BatchSummary) {
        info!(
            discovered = summary.discovered,
            succeeded = summary.succeeded,
            cache_hits = summary.cache_hits,
            filtered_out = summary.filtered_out,
            failures = summary.failures(),
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "batch finished"
        );
    }
}
