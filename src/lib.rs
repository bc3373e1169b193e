//! # Photo Packager
//!
//! Turns one folder of shoot photos into a client-ready delivery package:
//! full-resolution and downsized exports in JPG and WebP, optional copies of
//! the originals and RAW files, README files, and ZIP archives.
//!
//! # Architecture: One Job, Sequential Phases
//!
//! A [`job::Job`] takes a typed [`settings::Settings`] plus an immutable
//! [`config::PackagingConfig`] and runs:
//!
//! ```text
//! 1. Scan        source/  →  ScanResult         (standard + RAW file lists)
//! 2. Structure   settings →  OutputStructure    (folders + READMEs)
//! 3. Images      per image → ImageOutcome       (rayon pool or serial loop)
//! 4. Transfers   originals / RAW → export folders
//! 5. Archives    top-level folders → *.zip
//! ```
//!
//! The run returns a [`summary::JobSummary`]. Log lines and progress are
//! sent on an `mpsc` channel as [`events::JobEvent`]s; they are for people,
//! the summary is the only source of counts.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`job`] | Orchestrator: phases, worker pool, cancellation, progress bands |
//! | [`imaging`] | Image transform, quality adapter, EXIF policy engine, encoders |
//! | [`structure`] | Output folder map, README text |
//! | [`archive`] | ZIP archives of finished folders |
//! | [`scan`] | Recursive, case-insensitive source scan |
//! | [`naming`] | Prefixes, collision-free destinations, sequential renaming |
//! | [`settings`] | Per-run `Settings` and its action / policy enums |
//! | [`config`] | `config.toml` loading, merging, and validation |
//! | [`events`] | Log lines, job events, and the orchestrator's `Reporter` |
//! | [`summary`] | `JobSummary` and derived status |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Config Is a Value, Not a Global
//!
//! Folder names, qualities, the compressed pixel budget, and the extension
//! allow-lists live in [`config::PackagingConfig`], passed down explicitly.
//! Tests vary any of them without touching process-wide state.
//!
//! ## Workers Return Data
//!
//! An image worker is the free function [`job::process_image`]: an
//! [`job::ImageTask`] in, an [`job::ImageOutcome`] out, log lines included.
//! Only the orchestrator thread mutates the summary or sends events, so
//! nothing is shared between workers and completion order does not matter.
//!
//! ## Dry Run Is a Full Run
//!
//! With `dry_run` every phase still makes its decisions and logs them with a
//! `[DRYRUN]` marker, but no file or folder is created, moved, or archived.
//! The summary carries the same scan counts and a `would_generate` estimate.

pub mod archive;
pub mod config;
pub mod events;
pub mod imaging;
pub mod job;
pub mod naming;
pub mod output;
pub mod scan;
pub mod settings;
pub mod structure;
pub mod summary;

#[cfg(test)]
pub(crate) mod test_helpers;
