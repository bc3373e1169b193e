//! User-facing job events.
//!
//! A packaging run talks to its caller through one typed channel:
//!
//! ```text
//! Job::run ──► Reporter ──► Sender<JobEvent> ──► CLI printer / GUI / web layer
//!                 │
//!                 └──► tracing (developer diagnostics)
//! ```
//!
//! [`JobEvent::Log`] carries a [`LogLine`] meant for humans, [`JobEvent::Progress`]
//! a completion fraction in `[0.0, 1.0]`. Only the orchestrator thread owns a
//! [`Reporter`]; image workers collect their lines into a `Vec<LogLine>` and the
//! orchestrator forwards them when the worker's outcome arrives.
//!
//! Every line is also mirrored to `tracing` at the matching level, so a binary
//! with a subscriber installed gets the same text in its diagnostics.

use serde::Serialize;
use std::cell::Cell;
use std::fmt;
use std::sync::mpsc::Sender;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn tag(self) -> &'static str {
        match self {
            Self::Debug => "[DEBUG]",
            Self::Info => "[INFO]",
            Self::Warn => "[WARN]",
            Self::Error => "[ERROR]",
        }
    }
}

/// One human-readable line of job output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogLine {
    pub level: LogLevel,
    pub message: String,
    /// The line describes an action that was only simulated.
    pub dry_run: bool,
}

impl LogLine {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            dry_run: false,
        }
    }

    pub fn debug(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Debug, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Info, message)
    }

    pub fn warn(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Warn, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Error, message)
    }

    /// Info line for an action a dry run would have taken.
    pub fn simulated(message: impl Into<String>) -> Self {
        Self {
            dry_run: true,
            ..Self::info(message)
        }
    }

    /// Mirror this line into `tracing`.
    pub fn trace(&self) {
        match self.level {
            LogLevel::Debug => tracing::debug!(dry_run = self.dry_run, "{}", self.message),
            LogLevel::Info => tracing::info!(dry_run = self.dry_run, "{}", self.message),
            LogLevel::Warn => tracing::warn!(dry_run = self.dry_run, "{}", self.message),
            LogLevel::Error => tracing::error!(dry_run = self.dry_run, "{}", self.message),
        }
    }
}

impl fmt::Display for LogLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.dry_run {
            write!(f, "{} [DRYRUN] {}", self.level.tag(), self.message)
        } else {
            write!(f, "{} {}", self.level.tag(), self.message)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "lowercase")]
pub enum JobEvent {
    Log(LogLine),
    Progress(f64),
}

/// Orchestrator-side event sink.
///
/// Sending never fails from the job's point of view: a caller that dropped
/// its receiver simply stops getting events. Progress is clamped to
/// `[0.0, 1.0]` and never goes backwards.
#[derive(Debug, Default)]
pub struct Reporter {
    sender: Option<Sender<JobEvent>>,
    verbose: bool,
    last_progress: Cell<f64>,
}

impl Reporter {
    pub fn new(sender: Option<Sender<JobEvent>>, verbose: bool) -> Self {
        Self {
            sender,
            verbose,
            last_progress: Cell::new(0.0),
        }
    }

    /// A reporter that only mirrors to `tracing`.
    pub fn silent() -> Self {
        Self::default()
    }

    pub fn log(&self, line: LogLine) {
        line.trace();
        if line.level == LogLevel::Debug && !self.verbose {
            return;
        }
        self.send(JobEvent::Log(line));
    }

    pub fn forward(&self, lines: impl IntoIterator<Item = LogLine>) {
        for line in lines {
            self.log(line);
        }
    }

    pub fn debug(&self, message: impl Into<String>) {
        self.log(LogLine::debug(message));
    }

    pub fn info(&self, message: impl Into<String>) {
        self.log(LogLine::info(message));
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.log(LogLine::warn(message));
    }

    pub fn error(&self, message: impl Into<String>) {
        self.log(LogLine::error(message));
    }

    pub fn simulated(&self, message: impl Into<String>) {
        self.log(LogLine::simulated(message));
    }

    pub fn progress(&self, fraction: f64) {
        let fraction = if fraction.is_finite() {
            fraction.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let value = fraction.max(self.last_progress.get());
        self.last_progress.set(value);
        self.send(JobEvent::Progress(value));
    }

    /// Report a fraction of one progress band, e.g. `[0.85, 0.95]`.
    pub fn progress_in(&self, band: (f64, f64), done: usize, total: usize) {
        let ratio = if total == 0 {
            1.0
        } else {
            done as f64 / total as f64
        };
        self.progress(band.0 + (band.1 - band.0) * ratio);
    }

    /// Last progress value sent.
    pub fn current_progress(&self) -> f64 {
        self.last_progress.get()
    }

    fn send(&self, event: JobEvent) {
        if let Some(tx) = &self.sender {
            let _ = tx.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    fn drain(rx: &mpsc::Receiver<JobEvent>) -> Vec<JobEvent> {
        rx.try_iter().collect()
    }

    #[test]
    fn display_includes_level_tag() {
        assert_eq!(LogLine::info("hello").to_string(), "[INFO] hello");
        assert_eq!(LogLine::warn("careful").to_string(), "[WARN] careful");
        assert_eq!(LogLine::error("boom").to_string(), "[ERROR] boom");
    }

    #[test]
    fn simulated_line_has_dryrun_prefix() {
        let line = LogLine::simulated("Would save a.jpg");
        assert!(line.dry_run);
        assert_eq!(line.to_string(), "[INFO] [DRYRUN] Would save a.jpg");
    }

    #[test]
    fn reporter_sends_log_events() {
        let (tx, rx) = mpsc::channel();
        let reporter = Reporter::new(Some(tx), false);
        reporter.info("one");
        reporter.warn("two");
        let events = drain(&rx);
        assert_eq!(
            events,
            vec![
                JobEvent::Log(LogLine::info("one")),
                JobEvent::Log(LogLine::warn("two")),
            ]
        );
    }

    #[test]
    fn debug_lines_only_sent_when_verbose() {
        let (tx, rx) = mpsc::channel();
        Reporter::new(Some(tx), false).debug("hidden");
        assert!(drain(&rx).is_empty());

        let (tx, rx) = mpsc::channel();
        Reporter::new(Some(tx), true).debug("shown");
        assert_eq!(drain(&rx).len(), 1);
    }

    #[test]
    fn progress_is_clamped_and_monotonic() {
        let (tx, rx) = mpsc::channel();
        let reporter = Reporter::new(Some(tx), false);
        reporter.progress(0.5);
        reporter.progress(0.2);
        reporter.progress(7.0);
        reporter.progress(f64::NAN);
        let values: Vec<f64> = drain(&rx)
            .into_iter()
            .filter_map(|e| match e {
                JobEvent::Progress(p) => Some(p),
                _ => None,
            })
            .collect();
        assert_eq!(values, vec![0.5, 0.5, 1.0, 1.0]);
    }

    #[test]
    fn progress_in_band_scales() {
        let reporter = Reporter::silent();
        reporter.progress_in((0.0, 0.8), 1, 4);
        assert!((reporter.current_progress() - 0.2).abs() < 1e-9);
        reporter.progress_in((0.8, 1.0), 0, 0);
        assert!((reporter.current_progress() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn dropped_receiver_is_ignored() {
        let (tx, rx) = mpsc::channel();
        drop(rx);
        let reporter = Reporter::new(Some(tx), false);
        reporter.info("nobody listening");
        reporter.progress(1.0);
    }

    #[test]
    fn event_serializes_with_kind_tag() {
        let json = serde_json::to_string(&JobEvent::Progress(0.5)).unwrap();
        assert_eq!(json, r#"{"kind":"progress","data":0.5}"#);
    }
}
