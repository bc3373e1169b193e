//! End-to-end packaging runs against real encoded images.
//!
//! Every test builds its own shoot folder in a temp dir, runs a full job, and
//! inspects what landed on disk.

use exif::experimental::Writer;
use exif::{Field, In, Reader, Tag, Value};
use image::codecs::jpeg::JpegEncoder;
use image::{Rgb, RgbImage};
use photo_packager::config::PackagingConfig;
use photo_packager::events::{JobEvent, LogLevel, Reporter};
use photo_packager::imaging::encode::embed_exif;
use photo_packager::job::{Job, JobError, run_job};
use photo_packager::settings::{ExifPolicy, OriginalsAction, Settings};
use photo_packager::structure::build_output_structure;
use photo_packager::summary::JobStatus;
use std::fs::{self, File};
use std::io::{BufReader, Cursor};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use tempfile::TempDir;
use walkdir::WalkDir;

// =========================================================================
// Fixtures
// =========================================================================

struct Shoot {
    tmp: TempDir,
}

impl Shoot {
    fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("Harbour")).unwrap();
        fs::create_dir_all(tmp.path().join("delivery")).unwrap();
        Self { tmp }
    }

    fn source(&self) -> PathBuf {
        self.tmp.path().join("Harbour")
    }

    fn output(&self) -> PathBuf {
        self.tmp.path().join("delivery")
    }

    fn package(&self) -> PathBuf {
        self.output().join("Harbour")
    }

    /// Settings with every optional output switched off.
    fn minimal_settings(&self) -> Settings {
        let mut s = Settings::new(self.source(), self.output());
        s.generate_jpg = false;
        s.generate_webp = false;
        s.generate_compressed_jpg = false;
        s.generate_compressed_webp = false;
        s.create_zip = false;
        s.workers = 1;
        s
    }
}

fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x * 7 % 256) as u8, (y * 5 % 256) as u8, ((x + y) % 256) as u8])
    });
    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, 90)
        .encode_image(&img)
        .unwrap();
    bytes
}

fn camera_exif() -> Vec<u8> {
    let fields: Vec<Field> = [
        (Tag::Make, "Nikon"),
        (Tag::Model, "Z8"),
        (Tag::DateTimeOriginal, "2024:09:14 17:03:22"),
        (Tag::Artist, "Studio North"),
    ]
    .into_iter()
    .map(|(tag, text)| Field {
        tag,
        ifd_num: In::PRIMARY,
        value: Value::Ascii(vec![text.as_bytes().to_vec()]),
    })
    .collect();
    let mut writer = Writer::new();
    for field in &fields {
        writer.push_field(field);
    }
    let mut out = Cursor::new(Vec::new());
    writer.write(&mut out, false).unwrap();
    out.into_inner()
}

fn write_jpeg_with_exif(path: &Path) {
    let bytes = embed_exif(&jpeg_bytes(48, 32), &camera_exif()).unwrap();
    fs::write(path, bytes).unwrap();
}

fn count_files(dir: &Path) -> usize {
    if !dir.exists() {
        return 0;
    }
    WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .count()
}

fn read_exif(path: &Path) -> Option<exif::Exif> {
    let mut reader = BufReader::new(File::open(path).unwrap());
    Reader::new().read_from_container(&mut reader).ok()
}

fn jpgs_in(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p.extension().is_some_and(|e| e == "jpg"))
        .collect();
    files.sort();
    files
}

// =========================================================================
// Scenarios
// =========================================================================

#[test]
fn two_jpegs_optimized_jpg_only_with_copied_originals() {
    let shoot = Shoot::new();
    fs::write(shoot.source().join("one.jpg"), jpeg_bytes(64, 48)).unwrap();
    fs::write(shoot.source().join("two.jpg"), jpeg_bytes(48, 64)).unwrap();

    let mut settings = shoot.minimal_settings();
    settings.generate_jpg = true;
    settings.originals_action = OriginalsAction::Copy;
    let summary = run_job(settings, PackagingConfig::default()).unwrap();

    let package = shoot.package();
    assert_eq!(count_files(&package.join("Optimized Files/Optimized JPGs")), 2);
    assert_eq!(count_files(&package.join("Export Originals")), 2);
    assert_eq!(count_files(&package.join("Optimized Files/Optimized WebPs")), 0);
    assert_eq!(count_files(&package.join("Compressed Files")), 0);
    assert_eq!(summary.processed, 2);
    assert_eq!(summary.generated, 2);
    assert_eq!(summary.status(), JobStatus::Completed);
}

#[test]
fn strip_all_leaves_no_exif_in_outputs() {
    let shoot = Shoot::new();
    write_jpeg_with_exif(&shoot.source().join("one.jpg"));
    write_jpeg_with_exif(&shoot.source().join("two.jpg"));
    assert!(read_exif(&shoot.source().join("one.jpg")).is_some());

    let mut settings = shoot.minimal_settings();
    settings.generate_jpg = true;
    settings.generate_compressed_jpg = true;
    settings.exif_policy = ExifPolicy::StripAll;
    run_job(settings, PackagingConfig::default()).unwrap();

    for folder in ["Optimized Files/Optimized JPGs", "Compressed Files/Compressed JPGs"] {
        let files = jpgs_in(&shoot.package().join(folder));
        assert_eq!(files.len(), 2);
        for file in files {
            assert!(read_exif(&file).is_none(), "{} still has EXIF", file.display());
        }
    }
}

#[test]
fn keep_policy_carries_exif_through() {
    let shoot = Shoot::new();
    write_jpeg_with_exif(&shoot.source().join("one.jpg"));

    let mut settings = shoot.minimal_settings();
    settings.generate_jpg = true;
    run_job(settings, PackagingConfig::default()).unwrap();

    let out = shoot.package().join("Optimized Files/Optimized JPGs/one.jpg");
    let exif = read_exif(&out).expect("EXIF kept");
    let make = exif.get_field(Tag::Make, In::PRIMARY).unwrap();
    assert_eq!(make.display_value().to_string(), "\"Nikon\"");
}

#[cfg(feature = "partial-exif")]
#[test]
fn date_policy_removes_only_timestamps() {
    let shoot = Shoot::new();
    write_jpeg_with_exif(&shoot.source().join("one.jpg"));

    let mut settings = shoot.minimal_settings();
    settings.generate_jpg = true;
    settings.exif_policy = ExifPolicy::Date;
    run_job(settings, PackagingConfig::default()).unwrap();

    let out = shoot.package().join("Optimized Files/Optimized JPGs/one.jpg");
    let exif = read_exif(&out).expect("EXIF kept");
    assert!(exif.get_field(Tag::DateTimeOriginal, In::PRIMARY).is_none());
    assert!(exif.get_field(Tag::Make, In::PRIMARY).is_some());
    assert!(exif.get_field(Tag::Artist, In::PRIMARY).is_some());
}

#[test]
fn empty_source_completes_with_zero_counts() {
    let shoot = Shoot::new();
    fs::write(shoot.source().join("notes.txt"), "not an image").unwrap();

    let (tx, rx) = mpsc::channel();
    let summary = Job::new(shoot.minimal_settings(), PackagingConfig::default())
        .run(Some(tx))
        .unwrap();

    assert_eq!(summary.scanned_total(), 0);
    assert_eq!(summary.processed, 0);
    assert_eq!(summary.errored, 0);
    assert_eq!(summary.handled, 0);
    let last_progress = rx
        .try_iter()
        .filter_map(|e| match e {
            JobEvent::Progress(p) => Some(p),
            _ => None,
        })
        .last();
    assert_eq!(last_progress, Some(1.0));
}

#[test]
fn missing_source_fails_before_touching_output() {
    let shoot = Shoot::new();
    let mut settings = shoot.minimal_settings();
    settings.source_folder = shoot.tmp.path().join("does-not-exist");
    settings.output_folder = shoot.tmp.path().join("never-created");

    let err = run_job(settings, PackagingConfig::default()).unwrap_err();
    assert!(matches!(err, JobError::SourceNotFound(_)));
    assert!(!shoot.tmp.path().join("never-created").exists());
}

// =========================================================================
// Properties
// =========================================================================

#[test]
fn dry_run_is_pure_and_matches_real_scan_counts() {
    let shoot = Shoot::new();
    fs::write(shoot.source().join("a.jpg"), jpeg_bytes(32, 32)).unwrap();
    fs::create_dir_all(shoot.source().join("extra")).unwrap();
    fs::write(shoot.source().join("extra/b.jpg"), jpeg_bytes(32, 32)).unwrap();
    fs::write(shoot.source().join("c.dng"), b"raw").unwrap();

    let mut settings = Settings::new(shoot.source(), shoot.output());
    settings.dry_run = true;
    settings.originals_action = OriginalsAction::Move;

    let before: Vec<_> = WalkDir::new(shoot.tmp.path())
        .sort_by_file_name()
        .into_iter()
        .map(|e| e.unwrap().into_path())
        .collect();

    let (tx, rx) = mpsc::channel();
    let dry = Job::new(settings.clone(), PackagingConfig::default())
        .run(Some(tx))
        .unwrap();

    let after: Vec<_> = WalkDir::new(shoot.tmp.path())
        .sort_by_file_name()
        .into_iter()
        .map(|e| e.unwrap().into_path())
        .collect();
    assert_eq!(before, after);

    let events: Vec<JobEvent> = rx.try_iter().collect();
    assert!(matches!(events.last(), Some(JobEvent::Progress(p)) if *p == 1.0));
    assert!(
        events
            .iter()
            .any(|e| matches!(e, JobEvent::Log(l) if l.to_string().contains("[DRYRUN]")))
    );

    settings.dry_run = false;
    settings.originals_action = OriginalsAction::Copy;
    settings.create_zip = false;
    let real = run_job(settings, PackagingConfig::default()).unwrap();
    assert_eq!(dry.standard_scanned, real.standard_scanned);
    assert_eq!(dry.raw_scanned, real.raw_scanned);
    assert_eq!(dry.would_generate, real.generated);
    assert_eq!(dry.generated, 0);
}

#[test]
fn one_corrupt_image_among_valid_ones() {
    let shoot = Shoot::new();
    for name in ["a.jpg", "b.jpg", "c.jpg"] {
        fs::write(shoot.source().join(name), jpeg_bytes(24, 24)).unwrap();
    }
    fs::write(shoot.source().join("broken.png"), b"\x89PNG truncated").unwrap();

    let mut settings = shoot.minimal_settings();
    settings.generate_jpg = true;
    settings.workers = 0;

    let (tx, rx) = mpsc::channel();
    let summary = Job::new(settings, PackagingConfig::default())
        .run(Some(tx))
        .unwrap();

    assert_eq!(summary.errored, 1);
    assert_eq!(summary.processed, 3);
    assert_eq!(summary.status(), JobStatus::CompletedWithErrors);
    assert!(rx.try_iter().any(|e| matches!(
        e,
        JobEvent::Log(l) if l.level == LogLevel::Error && l.message.contains("broken.png")
    )));
}

#[test]
fn structure_creation_is_idempotent() {
    let shoot = Shoot::new();
    let settings = Settings::new(shoot.source(), shoot.output());
    let config = PackagingConfig::default();
    let reporter = Reporter::silent();

    let first = build_output_structure(&shoot.output(), &settings, &config, true, &reporter).unwrap();
    let second =
        build_output_structure(&shoot.output(), &settings, &config, true, &reporter).unwrap();
    assert_eq!(first, second);
    for folder in first.folders() {
        assert!(folder.is_dir(), "{}", folder.display());
    }
}

#[test]
fn zipped_package_contains_every_variant() {
    let shoot = Shoot::new();
    fs::write(shoot.source().join("a.jpg"), jpeg_bytes(40, 40)).unwrap();

    let mut settings = Settings::new(shoot.source(), shoot.output());
    settings.workers = 2;
    let summary = run_job(settings, PackagingConfig::default()).unwrap();
    assert_eq!(summary.archives.len(), 3);

    let zip_path = shoot.package().join("Optimized Files.zip");
    let archive = zip::ZipArchive::new(File::open(zip_path).unwrap()).unwrap();
    let mut names: Vec<&str> = archive.file_names().collect();
    names.sort();
    assert_eq!(names, vec!["Optimized JPGs/a.jpg", "Optimized WebPs/a.webp"]);
}
