mod commands;
mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{warn, Level};
use tracing_subscriber::FmtSubscriber;

use unitext_core::config::{load_config, ExtractionConfig};
use unitext_core::error::UnitextError;
use unitext_core::ocr::{OcrEngine, TesseractOcr, UnavailableOcr};
use unitext_core::pdf::PopplerBackend;
use unitext_core::Extractor;

#[derive(Parser)]
#[command(
    name = "unitext",
    version,
    about = "Extract plain text from PDF, Word, spreadsheet, image and HTML files"
)]
struct Cli {
    /// JSON config file (thresholds, DPI, OCR and poppler locations, batch limit)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log per-file and per-page decisions to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract text units from one or more files
    Extract {
        /// Files to extract
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Output format: text (default) or json
        #[arg(short, long, default_value = "text")]
        output: String,

        /// Write the JSON report to a file
        #[arg(short = 'O', long = "out", value_name = "FILE")]
        out: Option<PathBuf>,
    },
    /// Show the detected type of each file
    Detect {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Report whether the external tools (tesseract, poppler) can be found
    Check,
    /// Print the effective configuration as JSON
    Config,
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("warning: logging unavailable: {e}");
    }
}

fn load(path: Option<&PathBuf>) -> Result<ExtractionConfig, UnitextError> {
    match path {
        Some(path) => load_config(path),
        None => Ok(ExtractionConfig::default()),
    }
}

/// Resolve the OCR engine once; formats that need no OCR still work without it.
fn ocr_engine(config: &ExtractionConfig) -> Box<dyn OcrEngine> {
    match TesseractOcr::locate(&config.ocr) {
        Ok(engine) => Box::new(engine),
        Err(e) => {
            warn!("OCR disabled: {}", e);
            Box::new(UnavailableOcr::new(e.to_string()))
        }
    }
}

fn build_extractor(config: ExtractionConfig) -> Extractor {
    let ocr = ocr_engine(&config);
    let pdf = PopplerBackend::with_bin_dir(config.pdf.poppler_dir.clone());
    Extractor::new(config, ocr, Box::new(pdf))
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = load(cli.config.as_ref()).and_then(|config| match cli.command {
        Commands::Extract { files, output, out } => {
            commands::extract::run(&build_extractor(config), &files, &output, out)
        }
        Commands::Detect { files } => commands::detect::run(&files),
        Commands::Check => commands::check::run(&config),
        Commands::Config => commands::config::run(&config),
    });

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
