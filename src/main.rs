use clap::Parser;
use clap::builder::RangedU64ValueParser;
use img_resizer::batch;
use img_resizer::config::{self, ResizerConfig};
use img_resizer::imaging::ExternalBackend;
use img_resizer::logging;
use img_resizer::output;
use img_resizer::process::PipelineOptions;
use std::ffi::OsString;
use std::panic;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::mpsc;
use std::time::Instant;
use tracing::error;

#[derive(Parser, Debug)]
#[command(name = "resize")]
#[command(about = "Resize images so their short side fits a target length")]
#[command(long_about = "\
Resize images so their short side fits a target length

Metadata (EXIF, XMP, IPTC) is exported before resizing and restored on the
result. Images whose short side is already within the target are copied.
Given a directory, the whole tree is mirrored into the output directory:

  in/                          out/
  ├── a.jpg     ──resize──▶    ├── a.jpg
  └── trip/                    └── trip/
      ├── b.png ──resize──▶        ├── b.jpg      # PNG/HEIC/WEBP become JPEG
      └── x.txt ──copy────▶        └── x.txt      # non-images copied as-is

Requires exiftool, ffmpeg and ImageMagick. Their locations can be set in a
config file; run 'resize --print-config' for a documented one.")]
#[command(version)]
struct Cli {
    /// Target length of the short side, in pixels
    #[arg(
        value_parser = clap::value_parser!(u32).range(1..),
        required_unless_present = "print_config"
    )]
    length: Option<u32>,

    /// Image file or directory to read
    #[arg(required_unless_present = "print_config")]
    input: Option<PathBuf>,

    /// Output file (single image) or directory
    #[arg(required_unless_present = "print_config")]
    output: Option<PathBuf>,

    /// Show tool command lines and output; keep temporary files
    #[arg(long)]
    verbose: bool,

    /// Keep working copies and metadata sidecars
    #[arg(long)]
    keep_temp: bool,

    /// TOML config file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Maximum parallel workers (default: CPU cores)
    #[arg(long, value_name = "N", value_parser = RangedU64ValueParser::<usize>::new().range(1..))]
    jobs: Option<usize>,

    /// Print a stock config file with all options documented
    #[arg(long, exclusive = true)]
    print_config: bool,
}

/// Accept the single-dash long flags older scripts use.
fn normalize_legacy_flags(args: impl IntoIterator<Item = OsString>) -> Vec<OsString> {
    args.into_iter()
        .map(|arg| {
            if arg == "-verbose" {
                OsString::from("--verbose")
            } else if arg == "-help" {
                OsString::from("--help")
            } else {
                arg
            }
        })
        .collect()
}

/// Fold command-line overrides into the loaded config.
fn apply_overrides(config: &mut ResizerConfig, cli: &Cli) {
    if let Some(jobs) = cli.jobs {
        config.processing.max_processes = Some(jobs);
    }
    if cli.keep_temp || cli.verbose {
        config.processing.keep_temporaries = true;
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse_from(normalize_legacy_flags(std::env::args_os())) {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            // Help and version are not errors
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    if cli.print_config {
        print!("{}", config::stock_config_toml());
        return ExitCode::SUCCESS;
    }

    logging::init(cli.verbose);

    match panic::catch_unwind(|| run(cli)) {
        Ok(Ok(true)) => ExitCode::SUCCESS,
        Ok(Ok(false)) => ExitCode::FAILURE,
        Ok(Err(e)) => {
            error!(error = %e, "resize failed");
            ExitCode::FAILURE
        }
        Err(_) => {
            error!("resize aborted unexpectedly");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<bool, Box<dyn std::error::Error>> {
    let (Some(length), Some(input), Some(output_path)) =
        (cli.length, cli.input.clone(), cli.output.clone())
    else {
        return Err("length, input and output are required".into());
    };

    let mut config = config::load_config(cli.config.as_deref())?;
    apply_overrides(&mut config, &cli);
    config.validate()?;
    init_thread_pool(&config.processing);

    let backend = ExternalBackend::new(&config.tools);
    let options = PipelineOptions {
        length,
        verbose: cli.verbose,
        keep_temporaries: config.processing.keep_temporaries,
    };

    output::print_run_header(length, &input, &output_path);
    let started = Instant::now();

    let (tx, rx) = mpsc::channel();
    let printer = std::thread::spawn(move || {
        for event in rx {
            for line in output::format_process_event(&event) {
                println!("{}", line);
            }
        }
    });
    let report = batch::run(&backend, &input, &output_path, &options, Some(&tx));
    drop(tx);
    printer
        .join()
        .map_err(|_| "progress printer thread panicked")?;

    output::print_summary(&report, started.elapsed());
    Ok(report.success())
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; the user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
