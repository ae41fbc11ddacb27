mod cli;

use anyhow::{bail, Context, Result};
use clap::Parser;
use cli::{Args, Commands};
use folio_ocr::settings::{self, Settings};
use folio_ocr::{Credentials, OcrOptions, PipelineOptions, PluginRegistry};
use folio_rs::{collect_inputs, DocumentConverter};
use std::path::Path;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
  let args = Args::parse();
  init_tracing(args.verbose);

  if let Err(e) = run(args).await {
    eprintln!("Error: {:#}", e);
    std::process::exit(1);
  }
}

fn init_tracing(verbose: bool) {
  let default = if verbose {
    "folio=debug,folio_rs=debug,folio_ocr=debug"
  } else {
    "folio=info,folio_rs=info,folio_ocr=info"
  };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .init();
}

async fn run(args: Args) -> Result<()> {
  match args.command {
    Commands::Version => {
      println!("folio {}", env!("CARGO_PKG_VERSION"));
      Ok(())
    }
    Commands::Engines => {
      let registry = PluginRegistry::defaults();
      println!("OCR engines:");
      for entry in registry.ocr_engines.entries() {
        println!("  {:<16} {}", entry.kind, entry.name);
      }
      println!("Picture description engines:");
      for entry in registry.picture_description.entries() {
        println!("  {:<16} {}", entry.kind, entry.name);
      }
      Ok(())
    }
    Commands::Ocr {
      inputs,
      credentials,
      lang,
      force_full_page,
      disable_ocr,
      options,
      output,
      visualize,
      debug_dir,
      profile,
    } => {
      let mut env_settings = Settings::from_env();
      env_settings.debug.visualize_ocr |= visualize;
      env_settings.debug.profile_pipeline_timings |= profile;
      if let Some(dir) = debug_dir {
        env_settings.debug.debug_output_path = dir;
      }
      if settings::init(env_settings).is_err() {
        warn!("Settings were already initialized; debug flags are ignored");
      }

      let mut pipeline = load_pipeline_options(options.as_deref())?;
      if disable_ocr {
        pipeline.do_ocr = false;
      }
      let OcrOptions::GoogleVision(google) = &mut pipeline.ocr_options;
      if !lang.is_empty() {
        google.lang = lang;
      }
      google.force_full_page_ocr |= force_full_page;
      if let Some(path) = credentials.filter(|_| pipeline.do_ocr) {
        google.credentials = load_credentials(&path)?;
      }

      let files = collect_inputs(&inputs)?;
      if files.is_empty() {
        bail!("No image files found in the given inputs");
      }

      let converter = DocumentConverter::new(&pipeline)?;
      let reports = converter.convert_all(&files).await;
      if reports.is_empty() {
        bail!("None of the {} inputs could be converted", files.len());
      }

      let json = serde_json::to_string_pretty(&reports)?;
      match output {
        Some(path) => {
          std::fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;
          info!("Report written to {}", path.display());
        }
        None => println!("{}", json),
      }
      Ok(())
    }
  }
}

fn load_pipeline_options(path: Option<&Path>) -> Result<PipelineOptions> {
  let Some(path) = path else {
    return Ok(PipelineOptions::default());
  };
  let raw = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
  serde_json::from_str(&raw).with_context(|| format!("Invalid pipeline options in {}", path.display()))
}

fn load_credentials(path: &Path) -> Result<Credentials> {
  let raw = std::fs::read_to_string(path)
    .with_context(|| format!("Failed to read credentials from {}", path.display()))?;
  let value = serde_json::from_str(&raw)
    .with_context(|| format!("Credentials in {} are not valid JSON", path.display()))?;
  Ok(Credentials(value))
}
