use clap::{Args, Parser, Subcommand};
use photo_packager::config;
use photo_packager::events::JobEvent;
use photo_packager::job::Job;
use photo_packager::output::{self, ProgressMilestones};
use photo_packager::scan;
use photo_packager::settings::{self, ExifPolicy, OriginalsAction, RawAction, Settings};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "photo-packager")]
#[command(about = "Turn a folder of shoot photos into a client-ready delivery package")]
#[command(long_about = "\
Turn a folder of shoot photos into a client-ready delivery package

Every standard image in the source folder (recursively) is exported as
full-resolution \"optimized\" files and downsized \"compressed\" files, in JPG
and/or WebP. Originals and RAW files can be copied or moved alongside, and
each top-level folder can be zipped.

Output layout:

  <output>/<shoot name>/
  ├── README.txt
  ├── Optimized Files/
  │   ├── Optimized JPGs/
  │   └── Optimized WebPs/
  ├── Compressed Files/
  │   ├── Compressed JPGs/
  │   └── Compressed WebPs/
  ├── Export Originals/            # originals action copy / move
  ├── RAW Files/                   # only when RAW files were found
  │   └── README.txt
  └── *.zip                        # one per populated folder

Folder names, qualities and extension lists come from an optional
config.toml. Run 'photo-packager gen-config' to print a documented one.")]
#[command(version)]
struct Cli {
    /// Packaging config file (folder names, qualities, extension lists)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Show debug output
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Package a shoot folder
    Run(RunArgs),
    /// List the files a run would package
    Scan {
        /// Source folder
        source: PathBuf,
        /// Ignore RAW files
        #[arg(long)]
        no_raw: bool,
    },
    /// Print a stock config.toml with all options documented
    GenConfig,
}

#[derive(Args)]
struct RunArgs {
    /// Source folder with the shoot's images
    source: Option<PathBuf>,

    /// Parent folder for the package
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Load all job settings from a TOML or JSON file (flags below override it)
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Name of the package folder (defaults to the source folder's name)
    #[arg(long)]
    shoot_name: Option<String>,

    #[arg(long, value_enum)]
    originals: Option<OriginalsAction>,

    /// Do not export originals at all
    #[arg(long)]
    skip_export: bool,

    /// Ignore RAW files
    #[arg(long)]
    no_raw: bool,

    #[arg(long, value_enum)]
    raw_action: Option<RawAction>,

    #[arg(long)]
    no_jpg: bool,

    #[arg(long)]
    no_webp: bool,

    #[arg(long)]
    no_compressed_jpg: bool,

    #[arg(long)]
    no_compressed_webp: bool,

    #[arg(long, value_enum)]
    exif_policy: Option<ExifPolicy>,

    /// Prefix file names (Original_, RAW_, Optimized_, Compressed_)
    #[arg(long)]
    add_prefix: bool,

    /// Rename generated files to NNN-<BASE>.<ext>
    #[arg(long, value_name = "BASE")]
    rename: Option<String>,

    /// Skip ZIP archives
    #[arg(long)]
    no_zip: bool,

    /// Worker threads for image processing (0 = all cores)
    #[arg(long)]
    workers: Option<usize>,

    /// Log every action without touching the filesystem
    #[arg(long)]
    dry_run: bool,

    #[arg(long)]
    company: Option<String>,

    #[arg(long)]
    website: Option<String>,

    #[arg(long)]
    support_email: Option<String>,

    /// Print the summary as JSON instead of text
    #[arg(long)]
    json: bool,
}

impl RunArgs {
    /// Settings from the optional file, then flags on top.
    fn into_settings(self, verbose: bool) -> Result<Settings, Box<dyn std::error::Error>> {
        let mut s = match &self.settings {
            Some(path) => settings::load_settings(path)?,
            None => Settings::default(),
        };
        if let Some(source) = self.source {
            s.source_folder = source;
        }
        if let Some(output) = self.output {
            s.output_folder = output;
        }
        if s.source_folder.as_os_str().is_empty() {
            return Err("no source folder given (argument or settings file)".into());
        }
        if s.output_folder.as_os_str().is_empty() {
            s.output_folder = std::env::current_dir()?;
        }
        if self.shoot_name.is_some() {
            s.shoot_name = self.shoot_name;
        }
        if let Some(action) = self.originals {
            s.originals_action = action;
        }
        s.skip_export |= self.skip_export;
        s.include_raw &= !self.no_raw;
        if let Some(action) = self.raw_action {
            s.raw_action = action;
        }
        s.generate_jpg &= !self.no_jpg;
        s.generate_webp &= !self.no_webp;
        s.generate_compressed_jpg &= !self.no_compressed_jpg;
        s.generate_compressed_webp &= !self.no_compressed_webp;
        if let Some(policy) = self.exif_policy {
            s.exif_policy = policy;
        }
        s.add_prefix |= self.add_prefix;
        if self.rename.is_some() {
            s.rename_base = self.rename;
        }
        s.create_zip &= !self.no_zip;
        if let Some(workers) = self.workers {
            s.workers = workers;
        }
        s.dry_run |= self.dry_run;
        s.verbose |= verbose;
        if let Some(company) = self.company {
            s.delivery_company_name = company;
        }
        if let Some(website) = self.website {
            s.delivery_website = website;
        }
        if let Some(email) = self.support_email {
            s.delivery_support_email = email;
        }
        Ok(s)
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "photo_packager=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode, Box<dyn std::error::Error>> {
    match cli.command {
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
        Command::Scan { source, no_raw } => {
            let config = config::load_config(cli.config.as_deref())?;
            let result = scan::scan_source(&source, &config.extensions, !no_raw, None)?;
            output::print_scan_output(&result, &source);
        }
        Command::Run(args) => {
            let json = args.json;
            let config = config::load_config(cli.config.as_deref())?;
            let settings = args.into_settings(cli.verbose)?;
            let job = Job::new(settings, config);

            let (tx, rx) = std::sync::mpsc::channel::<JobEvent>();
            let printer = std::thread::spawn(move || {
                let mut milestones = ProgressMilestones::default();
                for event in rx {
                    // With --json, stdout carries only the summary.
                    for line in output::format_event(&event, &mut milestones) {
                        if json {
                            eprintln!("{}", line);
                        } else {
                            println!("{}", line);
                        }
                    }
                }
            });
            let result = job.run(Some(tx));
            if printer.join().is_err() {
                eprintln!("Error: event printer stopped unexpectedly");
            }
            let summary = result?;

            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                output::print_summary(&summary);
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}
