//! Job orchestration: one shoot folder in, one delivery package out.
//!
//! A [`Job`] walks a fixed sequence of phases:
//!
//! ```text
//! Validating → Scanning → BuildingStructure → ProcessingImages
//!     → Renaming → HandlingOriginals → HandlingRaw → Archiving → Finalized
//! ```
//!
//! Only the conditions listed in [`JobError`] end a run with `Err`: a missing
//! or non-directory source, invalid settings or config, a failed scan, and a
//! failed output root. Everything else (corrupt images, failed saves, a file
//! that cannot be copied, an archive that cannot be written) is logged,
//! counted in the [`JobSummary`], and the run carries on.
//!
//! ## Events and progress
//!
//! Log lines and progress go out on one `mpsc` channel of [`JobEvent`]s, sent
//! only from the thread that called [`Job::run`]. Progress is weighted by
//! phase so it never goes backwards:
//!
//! | Phase              | Progress band  |
//! |--------------------|----------------|
//! | image processing   | `0.00 – 0.85`  |
//! | originals + RAW    | `0.85 – 0.95`  |
//! | archives           | `0.95 – 1.00`  |
//!
//! Every run that returns `Ok` sends exactly `1.0` as its final progress.
//!
//! ## Parallelism
//!
//! Image transforms run on a dedicated rayon pool sized by
//! [`effective_workers`](crate::config::effective_workers). Workers get an
//! [`ImageTask`] and return an [`ImageOutcome`]; they never touch the summary
//! or the event channel. Dry runs and single-worker runs use a plain loop in
//! scan order. All other phases are sequential.
//!
//! ## Cancellation
//!
//! [`CancelFlag`] is checked before each image, before each originals/RAW
//! transfer, and before each archive. In parallel mode images already being
//! transformed finish. Every file whose remaining work is dropped (an image
//! not yet started, an original not yet exported, a RAW file not yet handled)
//! counts as skipped once.

use crate::archive::{ArchiveStatus, zip_directory};
use crate::config::{ConfigError, PackagingConfig, effective_workers};
use crate::events::{JobEvent, LogLine, Reporter};
use crate::imaging::{TransformReport, transform_image};
use crate::naming::{
    prefixed_name, rename_sequentially, reserve_variant_stems, unique_destination,
};
use crate::scan::{ScanError, ScanResult, scan_source};
use crate::settings::{Settings, SettingsError, Transfer};
use crate::structure::{OutputStructure, StructureError, build_output_structure};
use crate::summary::JobSummary;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Sender};
use thiserror::Error;

const IMAGES_BAND: (f64, f64) = (0.0, 0.85);
const TRANSFER_BAND: (f64, f64) = (0.85, 0.95);
const ARCHIVE_BAND: (f64, f64) = (0.95, 1.0);

#[derive(Error, Debug)]
pub enum JobError {
    #[error("Source folder not found: {}", .0.display())]
    SourceNotFound(PathBuf),
    #[error("Source is not a folder: {}", .0.display())]
    NotADirectory(PathBuf),
    #[error("Invalid settings: {0}")]
    Settings(#[from] SettingsError),
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("Scan failed: {0}")]
    Scan(#[from] ScanError),
    #[error("Cannot create output structure: {0}")]
    Structure(#[from] StructureError),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobPhase {
    Validating,
    Scanning,
    BuildingStructure,
    ProcessingImages,
    Renaming,
    HandlingOriginals,
    HandlingRaw,
    Archiving,
    Finalized,
}

impl fmt::Display for JobPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Validating => "validating",
            Self::Scanning => "scanning",
            Self::BuildingStructure => "building structure",
            Self::ProcessingImages => "processing images",
            Self::Renaming => "renaming",
            Self::HandlingOriginals => "handling originals",
            Self::HandlingRaw => "handling RAW files",
            Self::Archiving => "archiving",
            Self::Finalized => "finalized",
        };
        f.write_str(name)
    }
}

/// Cooperative cancellation shared between a job and whoever may stop it.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Worker task / outcome
// ============================================================================

/// Everything a worker needs to transform one image.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ImageTask<'a> {
    pub source: &'a Path,
    /// Variant file stem, unique within the job.
    pub output_stem: &'a str,
    pub structure: &'a OutputStructure,
    pub settings: &'a Settings,
    pub config: &'a PackagingConfig,
}

/// What a worker hands back for one image.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageOutcome {
    pub source: PathBuf,
    /// `false` when cancellation was observed before the image was touched.
    pub started: bool,
    pub error: Option<String>,
    pub report: TransformReport,
    /// Lines to forward to the job's event channel, in order.
    pub log: Vec<LogLine>,
}

impl ImageOutcome {
    fn not_started(source: &Path) -> Self {
        Self {
            source: source.to_path_buf(),
            started: false,
            error: None,
            report: TransformReport::default(),
            log: Vec::new(),
        }
    }
}

/// Transform one image; never panics past this boundary.
pub fn process_image(task: &ImageTask<'_>) -> ImageOutcome {
    let mut log = Vec::new();
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        transform_image(
            task.source,
            task.output_stem,
            task.structure,
            task.settings,
            task.config,
            &mut log,
        )
    }));

    let name = file_label(task.source);
    let (report, error) = match result {
        Ok(Ok(report)) => {
            if task.settings.dry_run {
                log.push(LogLine::info(format!(
                    "Checked {name}: would generate {} file(s)",
                    report.would_generate
                )));
            } else {
                log.push(LogLine::info(format!(
                    "Processed {name}: {} file(s) generated",
                    report.generated
                )));
            }
            (report, None)
        }
        Ok(Err(e)) => (TransformReport::default(), Some(e.to_string())),
        Err(payload) => {
            let detail = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            (
                TransformReport::default(),
                Some(format!("image processing panicked: {detail}")),
            )
        }
    };

    ImageOutcome {
        source: task.source.to_path_buf(),
        started: true,
        error,
        report,
        log,
    }
}

// ============================================================================
// Job
// ============================================================================

/// One packaging run.
#[derive(Debug)]
pub struct Job {
    settings: Settings,
    config: PackagingConfig,
    cancel: CancelFlag,
}

impl Job {
    pub fn new(settings: Settings, config: PackagingConfig) -> Self {
        Self {
            settings,
            config,
            cancel: CancelFlag::new(),
        }
    }

    /// Use an existing flag, e.g. one a UI already holds.
    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Handle for cancelling this job from another thread.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Run to completion, sending events to `events` if given.
    pub fn run(&self, events: Option<Sender<JobEvent>>) -> Result<JobSummary, JobError> {
        let reporter = Reporter::new(events, self.settings.verbose);
        let mut summary = JobSummary::new(self.settings.dry_run);

        let outcome = Run::prepare(self, &reporter).and_then(|run| run.execute(&mut summary));
        if let Err(e) = outcome {
            reporter.error(format!("Job aborted: {e}"));
            return Err(e);
        }

        summary.finalize();
        enter(&reporter, JobPhase::Finalized);
        reporter.info(format!(
            "Summary: {} processed, {} generated, {} errors, {} skipped, {} handled",
            summary.processed, summary.generated, summary.errored, summary.skipped, summary.handled
        ));
        if summary.dry_run {
            reporter.simulated(format!(
                "Dry run complete, {} file(s) would be generated",
                summary.would_generate
            ));
        }
        reporter.info("PhotoPackager job complete.");
        reporter.progress(1.0);
        Ok(summary)
    }
}

/// Run `settings` with `config` and no event listener.
pub fn run_job(settings: Settings, config: PackagingConfig) -> Result<JobSummary, JobError> {
    Job::new(settings, config).run(None)
}

fn enter(reporter: &Reporter, phase: JobPhase) {
    tracing::debug!(%phase, "entering phase");
    reporter.debug(format!("Phase: {phase}"));
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// A validated job with absolute paths, bound to its reporter.
struct Run<'a> {
    settings: Settings,
    config: &'a PackagingConfig,
    cancel: &'a CancelFlag,
    reporter: &'a Reporter,
    workers: usize,
}

impl<'a> Run<'a> {
    fn prepare(job: &'a Job, reporter: &'a Reporter) -> Result<Self, JobError> {
        enter(reporter, JobPhase::Validating);
        job.settings.validate()?;
        job.config.validate()?;

        let source = &job.settings.source_folder;
        if !source.exists() {
            return Err(JobError::SourceNotFound(source.clone()));
        }
        if !source.is_dir() {
            return Err(JobError::NotADirectory(source.clone()));
        }

        let mut settings = job.settings.clone();
        settings.source_folder = fs::canonicalize(source)?;
        settings.output_folder = std::path::absolute(&settings.output_folder)?;
        if settings.shoot_name.is_none() {
            settings.shoot_name = Some(settings.shoot_name());
        }

        Ok(Self {
            workers: effective_workers(settings.workers),
            settings,
            config: &job.config,
            cancel: &job.cancel,
            reporter,
        })
    }

    fn serial(&self) -> bool {
        self.settings.dry_run || self.workers <= 1
    }

    fn log_header(&self) {
        let s = &self.settings;
        let r = self.reporter;
        r.info("Starting PhotoPackager job");
        if s.dry_run {
            r.simulated("Dry run: no files will be written, moved, or archived");
        }
        r.info(format!("Source folder: {}", s.source_folder.display()));
        r.info(format!("Output folder: {}", s.output_folder.display()));
        r.info(format!("Shoot name: {}", s.shoot_name()));

        let variants: Vec<&str> = [
            (s.generate_jpg, "optimized JPG"),
            (s.generate_webp, "optimized WebP"),
            (s.generate_compressed_jpg, "compressed JPG"),
            (s.generate_compressed_webp, "compressed WebP"),
        ]
        .into_iter()
        .filter_map(|(on, label)| on.then_some(label))
        .collect();
        if variants.is_empty() {
            r.info("Variants: none");
        } else {
            r.info(format!("Variants: {}", variants.join(", ")));
        }
        r.info(format!("EXIF policy: {}", s.exif_policy));
        r.info(format!(
            "Originals: {}{}",
            s.originals_action,
            if s.skip_export { " (export skipped)" } else { "" }
        ));
        r.info(format!(
            "RAW files: {} (action {})",
            if s.include_raw { "included" } else { "ignored" },
            s.raw_action
        ));
        r.info(format!(
            "Prefixes: {}, rename: {}, ZIP archives: {}",
            if s.add_prefix { "on" } else { "off" },
            s.rename_base.as_deref().unwrap_or("off"),
            if s.create_zip { "on" } else { "off" }
        ));
        r.info(format!(
            "Execution: {} ({} worker(s))",
            if self.serial() { "serial" } else { "parallel" },
            if self.serial() { 1 } else { self.workers }
        ));
    }

    fn execute(&self, summary: &mut JobSummary) -> Result<(), JobError> {
        self.log_header();
        let r = self.reporter;
        let s = &self.settings;

        enter(r, JobPhase::Scanning);
        let top_level = s.output_folder.join(s.shoot_name());
        let scan = scan_source(
            &s.source_folder,
            &self.config.extensions,
            s.include_raw,
            Some(&top_level),
        )?;
        summary.standard_scanned = scan.standard.len();
        summary.raw_scanned = scan.raw.len();
        r.info(format!(
            "Found {} standard image(s) and {} RAW file(s)",
            scan.standard.len(),
            scan.raw.len()
        ));
        if scan.is_empty() {
            r.warn("No image files found in source folder, nothing to package");
            return Ok(());
        }

        enter(r, JobPhase::BuildingStructure);
        let structure =
            build_output_structure(&s.output_folder, s, self.config, scan.has_raw(), r)?;
        summary.output_location = Some(structure.top_level.clone());

        enter(r, JobPhase::ProcessingImages);
        let unstarted = self.process_images(&scan.standard, &structure, summary);
        r.progress(IMAGES_BAND.1);
        if self.stop_if_cancelled(summary) {
            let originals: &[PathBuf] = match self.originals_target(&structure) {
                Some(_) => scan.standard.as_slice(),
                None => &[],
            };
            self.skip_abandoned(originals, &scan.raw, &unstarted, summary);
            return Ok(());
        }

        if let Some(base) = s.rename_base.as_deref().map(str::trim) {
            enter(r, JobPhase::Renaming);
            for folder in structure.variant_folders() {
                summary.renamed +=
                    rename_sequentially(folder, base, &self.config.extensions, s.dry_run, r);
            }
        }

        let transfer_total = scan.standard.len() + scan.raw.len();
        let mut transfers_done = 0;

        enter(r, JobPhase::HandlingOriginals);
        let originals_left =
            self.handle_originals(&scan, &structure, summary, &mut transfers_done, transfer_total);
        if self.stop_if_cancelled(summary) {
            self.skip_abandoned(originals_left, &scan.raw, &unstarted, summary);
            return Ok(());
        }

        enter(r, JobPhase::HandlingRaw);
        self.handle_raw(&scan, &structure, summary, &mut transfers_done, transfer_total);
        r.progress(TRANSFER_BAND.1);
        if self.stop_if_cancelled(summary) {
            return Ok(());
        }

        enter(r, JobPhase::Archiving);
        self.create_archives(&structure, summary);
        self.stop_if_cancelled(summary);
        Ok(())
    }

    fn stop_if_cancelled(&self, summary: &mut JobSummary) -> bool {
        if !self.cancel.is_cancelled() {
            return false;
        }
        if !summary.cancelled {
            summary.cancelled = true;
            self.reporter.warn("Job cancelled, remaining steps skipped");
        }
        true
    }

    /// Count files left untouched by cancellation as skipped.
    ///
    /// Originals of images already skipped or failed are not counted again.
    fn skip_abandoned(
        &self,
        originals: &[PathBuf],
        raw: &[PathBuf],
        unstarted: &HashSet<PathBuf>,
        summary: &mut JobSummary,
    ) {
        let failed: HashSet<&Path> = summary.errors.iter().map(|f| f.path.as_path()).collect();
        let originals = originals
            .iter()
            .filter(|p| !unstarted.contains(*p) && !failed.contains(p.as_path()))
            .count();
        if originals + raw.len() == 0 {
            return;
        }
        summary.skipped += originals + raw.len();
        self.reporter.debug(format!(
            "Skipped {originals} original(s) and {} RAW file(s) after cancellation",
            raw.len()
        ));
    }

    // ------------------------------------------------------------------------
    // Images
    // ------------------------------------------------------------------------

    /// Transform every standard image; returns the ones never started.
    fn process_images(
        &self,
        sources: &[PathBuf],
        structure: &OutputStructure,
        summary: &mut JobSummary,
    ) -> HashSet<PathBuf> {
        let mut unstarted = HashSet::new();
        if sources.is_empty() {
            self.reporter.info("No standard images to process");
            return unstarted;
        }
        if !self.settings.any_variant_enabled() {
            self.reporter
                .info("No output variants enabled, images are only scanned");
        }

        let stems = reserve_variant_stems(sources);
        let tasks: Vec<ImageTask<'_>> = sources
            .iter()
            .zip(&stems)
            .map(|(source, stem)| ImageTask {
                source,
                output_stem: stem,
                structure,
                settings: &self.settings,
                config: self.config,
            })
            .collect();

        if self.serial() {
            self.process_serial(&tasks, summary, &mut unstarted);
            return unstarted;
        }
        match rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .build()
        {
            Ok(pool) => self.process_parallel(&pool, &tasks, summary, &mut unstarted),
            Err(e) => {
                self.reporter.warn(format!(
                    "Could not start {} worker threads ({e}), processing serially",
                    self.workers
                ));
                self.process_serial(&tasks, summary, &mut unstarted);
            }
        }
        unstarted
    }

    fn process_serial(
        &self,
        tasks: &[ImageTask<'_>],
        summary: &mut JobSummary,
        unstarted: &mut HashSet<PathBuf>,
    ) {
        let total = tasks.len();
        for (i, task) in tasks.iter().enumerate() {
            let outcome = if self.cancel.is_cancelled() {
                ImageOutcome::not_started(task.source)
            } else {
                process_image(task)
            };
            self.apply_outcome(outcome, summary, unstarted);
            self.reporter.progress_in(IMAGES_BAND, i + 1, total);
        }
    }

    fn process_parallel(
        &self,
        pool: &rayon::ThreadPool,
        tasks: &[ImageTask<'_>],
        summary: &mut JobSummary,
        unstarted: &mut HashSet<PathBuf>,
    ) {
        let total = tasks.len();
        let (tx, rx) = mpsc::channel::<ImageOutcome>();
        let cancel = self.cancel;

        std::thread::scope(|scope| {
            scope.spawn(move || {
                pool.install(|| {
                    tasks.par_iter().for_each_with(tx, |tx, task| {
                        let outcome = if cancel.is_cancelled() {
                            ImageOutcome::not_started(task.source)
                        } else {
                            process_image(task)
                        };
                        // The receiver outlives every worker.
                        let _ = tx.send(outcome);
                    });
                });
            });

            for (done, outcome) in rx.iter().enumerate() {
                self.apply_outcome(outcome, summary, unstarted);
                self.reporter.progress_in(IMAGES_BAND, done + 1, total);
            }
        });
    }

    /// Fold one worker result into the summary. Orchestrator thread only.
    fn apply_outcome(
        &self,
        outcome: ImageOutcome,
        summary: &mut JobSummary,
        unstarted: &mut HashSet<PathBuf>,
    ) {
        let r = self.reporter;
        r.forward(outcome.log);
        if !outcome.started {
            summary.skipped += 1;
            r.debug(format!(
                "Skipped {} after cancellation",
                file_label(&outcome.source)
            ));
            unstarted.insert(outcome.source);
            return;
        }
        match outcome.error {
            None => {
                summary.processed += 1;
                summary.generated += outcome.report.generated;
                summary.would_generate += outcome.report.would_generate;
            }
            Some(message) => {
                r.error(format!(
                    "Failed to process {}: {message}",
                    file_label(&outcome.source)
                ));
                summary.record_failure(outcome.source, message);
            }
        }
    }

    // ------------------------------------------------------------------------
    // Originals and RAW files
    // ------------------------------------------------------------------------

    /// Where originals go, if anywhere.
    fn originals_target<'s>(
        &self,
        structure: &'s OutputStructure,
    ) -> Option<(Transfer, &'s Path)> {
        match (self.settings.originals_transfer(), &structure.originals) {
            (Some(transfer), Some(folder)) => Some((transfer, folder.as_path())),
            _ => None,
        }
    }

    /// Export originals; returns the ones left untouched by cancellation.
    fn handle_originals<'s>(
        &self,
        scan: &'s ScanResult,
        structure: &OutputStructure,
        summary: &mut JobSummary,
        done: &mut usize,
        total: usize,
    ) -> &'s [PathBuf] {
        let r = self.reporter;
        let s = &self.settings;
        let (transfer, folder) = match self.originals_target(structure) {
            Some(target) => target,
            None => {
                if s.skip_export {
                    r.info("Originals export skipped");
                } else {
                    r.info(format!(
                        "Originals action '{}': originals stay in the source folder",
                        s.originals_action
                    ));
                }
                *done += scan.standard.len();
                r.progress_in(TRANSFER_BAND, *done, total);
                return &[];
            }
        };

        for (i, source) in scan.standard.iter().enumerate() {
            if self.cancel.is_cancelled() {
                return &scan.standard[i..];
            }
            let prefix = &self.config.prefixes.original;
            match self.transfer_one(source, folder, prefix, transfer, "original") {
                Some(Transfer::Copy) => summary.originals_copied += 1,
                Some(Transfer::Move) => summary.originals_moved += 1,
                None if s.dry_run => {}
                None => summary.skipped += 1,
            }
            *done += 1;
            r.progress_in(TRANSFER_BAND, *done, total);
        }
        &[]
    }

    fn handle_raw(
        &self,
        scan: &ScanResult,
        structure: &OutputStructure,
        summary: &mut JobSummary,
        done: &mut usize,
        total: usize,
    ) {
        let r = self.reporter;
        let s = &self.settings;
        if !scan.has_raw() {
            r.debug("No RAW files to handle");
            return;
        }

        let target = match (s.raw_action.transfer(), &structure.raw) {
            (Some(transfer), Some(folder)) => Some((transfer, folder)),
            _ => None,
        };
        for source in &scan.raw {
            if self.cancel.is_cancelled() {
                summary.skipped += 1;
                continue;
            }
            match target {
                Some((transfer, folder)) => {
                    let prefix = &self.config.prefixes.raw;
                    match self.transfer_one(source, folder, prefix, transfer, "RAW file") {
                        Some(Transfer::Copy) => summary.raw_copied += 1,
                        Some(Transfer::Move) => summary.raw_moved += 1,
                        None if s.dry_run => {}
                        None => summary.skipped += 1,
                    }
                }
                None => {
                    r.info(format!(
                        "Leaving RAW file in source: {}",
                        file_label(source)
                    ));
                }
            }
            *done += 1;
            r.progress_in(TRANSFER_BAND, *done, total);
        }
    }

    /// Copy or move `source` into `folder`; `None` if simulated or failed.
    fn transfer_one(
        &self,
        source: &Path,
        folder: &Path,
        prefix: &str,
        transfer: Transfer,
        what: &str,
    ) -> Option<Transfer> {
        let r = self.reporter;
        let name = file_label(source);
        let file_name = prefixed_name(&name, prefix, self.settings.add_prefix);
        let dest = unique_destination(folder, &file_name);

        if self.settings.dry_run {
            r.simulated(format!(
                "Would {} {what}: {} -> {}",
                transfer.verb(),
                name,
                dest.display()
            ));
            return None;
        }

        match transfer_file(source, &dest, transfer) {
            Ok(()) => {
                r.info(format!(
                    "{} {what}: {} -> {}",
                    transfer.past_tense(),
                    name,
                    file_label(&dest)
                ));
                Some(transfer)
            }
            Err(e) => {
                r.error(format!(
                    "Failed to {} {what} {}: {e}",
                    transfer.verb(),
                    source.display()
                ));
                None
            }
        }
    }

    // ------------------------------------------------------------------------
    // Archives
    // ------------------------------------------------------------------------

    fn create_archives(&self, structure: &OutputStructure, summary: &mut JobSummary) {
        let r = self.reporter;
        if !self.settings.create_zip {
            r.debug("ZIP creation disabled");
            return;
        }
        let targets = structure.archive_targets(&self.config.folders);

        if self.settings.dry_run {
            for target in &targets {
                r.simulated(format!(
                    "Would create archive {} from {}",
                    file_label(&target.zip),
                    target.folder.display()
                ));
            }
            return;
        }

        let targets: Vec<_> = targets.into_iter().filter(|t| t.folder.is_dir()).collect();
        let count = targets.len();
        for (i, target) in targets.iter().enumerate() {
            if self.cancel.is_cancelled() {
                return;
            }
            let (lo, hi) = ARCHIVE_BAND;
            let step = (hi - lo) / count as f64;
            let band = (lo + step * i as f64, lo + step * (i + 1) as f64);
            let mut on_progress = |fraction: f64| r.progress(band.0 + (band.1 - band.0) * fraction);

            r.info(format!("Creating archive {}", file_label(&target.zip)));
            match zip_directory(
                &target.folder,
                &target.zip,
                false,
                Some(&mut on_progress as &mut dyn FnMut(f64)),
            ) {
                ArchiveStatus::Written { files } => {
                    r.info(format!(
                        "Created archive {} ({files} file(s))",
                        file_label(&target.zip)
                    ));
                    summary.archives.push(target.zip.clone());
                }
                ArchiveStatus::SkippedEmpty => r.info(format!(
                    "Skipped archive for empty folder {}",
                    file_label(&target.folder)
                )),
                ArchiveStatus::Simulated => {}
                ArchiveStatus::Failed(message) => r.warn(format!(
                    "Failed to create archive {}: {message}",
                    file_label(&target.zip)
                )),
            }
            r.progress(band.1);
        }
    }
}

/// Copy, or move with a copy-and-delete fallback across filesystems.
fn transfer_file(source: &Path, dest: &Path, transfer: Transfer) -> io::Result<()> {
    match transfer {
        Transfer::Copy => fs::copy(source, dest).map(|_| ()),
        Transfer::Move => match fs::rename(source, dest) {
            Ok(()) => Ok(()),
            Err(rename_err) => {
                tracing::debug!(error = %rename_err, "rename failed, copying instead");
                fs::copy(source, dest)?;
                fs::remove_file(source)
            }
        },
    }
}
