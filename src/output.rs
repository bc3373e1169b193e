//! CLI output formatting for packaging runs.
//!
//! Every `format_*` function returns `Vec<String>` and does no I/O; the
//! matching `print_*` wrapper writes the lines to stdout. The binary is the
//! only caller of the `print_*` side.
//!
//! # Output Format
//!
//! ## Events
//!
//! Log lines print as they arrive, progress only at each new 10% step:
//!
//! ```text
//! [INFO] Found 3 standard image(s) and 1 RAW file(s)
//! [INFO] [DRYRUN] Would create directory '/out/Wedding'
//! Progress: [####------] 40%
//! ```
//!
//! ## Summary
//!
//! ```text
//! Completed with errors
//!     Scanned: 3 standard, 1 RAW
//!     Processed: 2
//!     Generated: 8 file(s)
//!     Originals: 2 copied, 0 moved
//!     RAW: 1 copied, 0 moved
//!     Skipped: 0
//!     Handled: 3
//!     Errors: 1
//!         broken.jpg: cannot decode /src/broken.jpg: ...
//!     Archives
//!         Optimized Files.zip
//!     Output: /out/Wedding
//!     Duration: 1.42s
//! ```
//!
//! ## Scan
//!
//! ```text
//! Standard images (2)
//!     001 a.jpg
//!     002 day2/b.jpg
//! RAW files (1)
//!     001 a.NEF
//! ```

use crate::events::JobEvent;
use crate::scan::ScanResult;
use crate::summary::{JobStatus, JobSummary};
use std::path::Path;

// ============================================================================
// Shared helpers
// ============================================================================

fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// `path` relative to `root`, `/`-separated, falling back to the full path.
fn relative_display(path: &Path, root: &Path) -> String {
    match path.strip_prefix(root) {
        Ok(rel) => rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/"),
        Err(_) => path.display().to_string(),
    }
}

pub fn status_label(status: JobStatus) -> &'static str {
    match status {
        JobStatus::Completed => "Completed",
        JobStatus::CompletedWithErrors => "Completed with errors",
        JobStatus::NoInput => "Completed (no images found)",
        JobStatus::Cancelled => "Cancelled",
    }
}

// ============================================================================
// Events
// ============================================================================

/// Ten-slot bar plus percentage: `[####------] 40%`.
pub fn format_progress(fraction: f64) -> String {
    let fraction = if fraction.is_finite() {
        fraction.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let filled = (fraction * 10.0).floor() as usize;
    format!(
        "Progress: [{}{}] {:.0}%",
        "#".repeat(filled),
        "-".repeat(10 - filled),
        fraction * 100.0
    )
}

/// Tracks which progress step was last printed.
#[derive(Debug, Default)]
pub struct ProgressMilestones {
    last_step: Option<u32>,
}

impl ProgressMilestones {
    /// The progress line to print for `fraction`, if it reaches a new 10% step.
    pub fn next_line(&mut self, fraction: f64) -> Option<String> {
        let step = (fraction.clamp(0.0, 1.0) * 10.0).floor() as u32;
        if self.last_step.is_some_and(|last| step <= last) {
            return None;
        }
        self.last_step = Some(step);
        Some(format_progress(fraction))
    }
}

/// Lines for one job event. Progress events go through [`ProgressMilestones`].
pub fn format_event(event: &JobEvent, milestones: &mut ProgressMilestones) -> Vec<String> {
    match event {
        JobEvent::Log(line) => vec![line.to_string()],
        JobEvent::Progress(fraction) => milestones.next_line(*fraction).into_iter().collect(),
    }
}

// ============================================================================
// Summary
// ============================================================================

/// Format the end-of-run summary.
pub fn format_summary(summary: &JobSummary) -> Vec<String> {
    let i1 = indent(1);
    let i2 = indent(2);
    let mut lines = vec![status_label(summary.status()).to_string()];

    lines.push(format!(
        "{i1}Scanned: {} standard, {} RAW",
        summary.standard_scanned, summary.raw_scanned
    ));
    lines.push(format!("{i1}Processed: {}", summary.processed));
    if summary.dry_run {
        lines.push(format!("{i1}Would generate: {} file(s)", summary.would_generate));
    } else {
        lines.push(format!("{i1}Generated: {} file(s)", summary.generated));
    }
    if summary.originals_copied + summary.originals_moved > 0 {
        lines.push(format!(
            "{i1}Originals: {} copied, {} moved",
            summary.originals_copied, summary.originals_moved
        ));
    }
    if summary.raw_copied + summary.raw_moved > 0 {
        lines.push(format!(
            "{i1}RAW: {} copied, {} moved",
            summary.raw_copied, summary.raw_moved
        ));
    }
    if summary.renamed > 0 {
        lines.push(format!("{i1}Renamed: {}", summary.renamed));
    }
    lines.push(format!("{i1}Skipped: {}", summary.skipped));
    lines.push(format!("{i1}Handled: {}", summary.handled));
    lines.push(format!("{i1}Errors: {}", summary.errored));
    for failure in &summary.errors {
        lines.push(format!("{i2}{}: {}", file_name(&failure.path), failure.message));
    }
    if !summary.archives.is_empty() {
        lines.push(format!("{i1}Archives"));
        for zip in &summary.archives {
            lines.push(format!("{i2}{}", file_name(zip)));
        }
    }
    if let Some(location) = &summary.output_location {
        lines.push(format!("{i1}Output: {}", location.display()));
    }
    if let Some(duration) = summary.duration() {
        let millis = duration.num_milliseconds().max(0);
        lines.push(format!("{i1}Duration: {:.2}s", millis as f64 / 1000.0));
    }
    lines
}

pub fn print_summary(summary: &JobSummary) {
    for line in format_summary(summary) {
        println!("{}", line);
    }
}

// ============================================================================
// Scan
// ============================================================================

/// Format the files a run would package, relative to `source_root`.
pub fn format_scan_output(scan: &ScanResult, source_root: &Path) -> Vec<String> {
    let mut lines = Vec::new();
    for (title, files) in [("Standard images", &scan.standard), ("RAW files", &scan.raw)] {
        lines.push(format!("{title} ({})", files.len()));
        for (i, path) in files.iter().enumerate() {
            lines.push(format!(
                "{}{:0>3} {}",
                indent(1),
                i + 1,
                relative_display(path, source_root)
            ));
        }
    }
    if scan.is_empty() {
        lines.push("No image files found".to_string());
    }
    lines
}

pub fn print_scan_output(scan: &ScanResult, source_root: &Path) {
    for line in format_scan_output(scan, source_root) {
        println!("{}", line);
    }
}
