//! Job summary: the value a packaging run returns.
//!
//! The orchestrator owns the only [`JobSummary`] and updates it as outcomes
//! arrive; workers never see it. [`JobSummary::finalize`] stamps the end time
//! and computes the derived counts once, on every exit path.
//!
//! ```text
//! handled = max(0, standard_scanned + raw_scanned − errored − skipped)
//! ```

use chrono::{DateTime, Local};
use serde::Serialize;
use std::path::PathBuf;

/// Overall outcome of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Completed,
    CompletedWithErrors,
    /// The source held no standard or RAW images.
    NoInput,
    Cancelled,
}

/// One per-image failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageFailure {
    pub path: PathBuf,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobSummary {
    pub started_at: DateTime<Local>,
    pub finished_at: Option<DateTime<Local>>,
    pub standard_scanned: usize,
    pub raw_scanned: usize,
    /// Standard images for which the transform ran to completion.
    pub processed: usize,
    /// Output files actually written.
    pub generated: usize,
    /// Output files a dry run would have written.
    pub would_generate: usize,
    pub skipped: usize,
    pub errored: usize,
    pub originals_copied: usize,
    pub originals_moved: usize,
    pub raw_copied: usize,
    pub raw_moved: usize,
    pub renamed: usize,
    pub errors: Vec<ImageFailure>,
    pub handled: usize,
    /// Top-level package folder (planned location in a dry run).
    pub output_location: Option<PathBuf>,
    pub archives: Vec<PathBuf>,
    pub dry_run: bool,
    pub cancelled: bool,
}

impl JobSummary {
    pub fn new(dry_run: bool) -> Self {
        Self {
            started_at: Local::now(),
            finished_at: None,
            standard_scanned: 0,
            raw_scanned: 0,
            processed: 0,
            generated: 0,
            would_generate: 0,
            skipped: 0,
            errored: 0,
            originals_copied: 0,
            originals_moved: 0,
            raw_copied: 0,
            raw_moved: 0,
            renamed: 0,
            errors: Vec::new(),
            handled: 0,
            output_location: None,
            archives: Vec::new(),
            dry_run,
            cancelled: false,
        }
    }

    pub fn scanned_total(&self) -> usize {
        self.standard_scanned + self.raw_scanned
    }

    /// Record a per-image failure.
    pub fn record_failure(&mut self, path: impl Into<PathBuf>, message: impl Into<String>) {
        self.errored += 1;
        self.errors.push(ImageFailure {
            path: path.into(),
            message: message.into(),
        });
    }

    /// Stamp the end time and compute `handled`. Idempotent.
    pub fn finalize(&mut self) {
        if self.finished_at.is_none() {
            self.finished_at = Some(Local::now());
        }
        self.handled = self
            .scanned_total()
            .saturating_sub(self.errored)
            .saturating_sub(self.skipped);
    }

    pub fn status(&self) -> JobStatus {
        if self.cancelled {
            JobStatus::Cancelled
        } else if self.scanned_total() == 0 {
            JobStatus::NoInput
        } else if self.errored > 0 {
            JobStatus::CompletedWithErrors
        } else {
            JobStatus::Completed
        }
    }

    pub fn duration(&self) -> Option<chrono::TimeDelta> {
        self.finished_at.map(|end| end - self.started_at)
    }
}
