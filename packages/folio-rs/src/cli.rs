//! Command line arguments backing the `folio` binary.
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
  name = "folio",
  about = "A CLI tool that OCRs scanned pages with Google Cloud Vision",
  version
)]
pub struct Args {
  /// Log at debug level (RUST_LOG overrides)
  #[arg(long, short = 'v', global = true)]
  pub verbose: bool,

  #[command(subcommand)]
  pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
  /// Print version information
  Version,
  /// List the registered OCR and picture description engines
  Engines,
  /// Recognize text in image files or directories of images
  Ocr {
    /// Image files or directories to process
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Service account key file for Google Cloud Vision
    #[arg(long, short = 'c', env = "GOOGLE_APPLICATION_CREDENTIALS")]
    credentials: Option<PathBuf>,

    /// Language hints, e.g. `--lang en --lang de`
    #[arg(long, short = 'l')]
    lang: Vec<String>,

    /// OCR the whole page and drop programmatic text
    #[arg(long)]
    force_full_page: bool,

    /// Skip OCR and only report page geometry
    #[arg(long)]
    disable_ocr: bool,

    /// Pipeline options as JSON; flags given here take precedence
    #[arg(long)]
    options: Option<PathBuf>,

    /// Write the JSON report here instead of stdout
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    /// Draw OCR regions and cells into the debug directory
    #[arg(long)]
    visualize: bool,

    /// Directory for debug images
    #[arg(long)]
    debug_dir: Option<PathBuf>,

    /// Record per-stage timings in the report
    #[arg(long)]
    profile: bool,
  },
}
