//! strip-ocr - read the text strip from photographed cards and plates
//!
//! Every image given on the command line is an independent recognition
//! request; requests run concurrently and report their own outcome.

use anyhow::{Context, Result};
use clap::Parser;
use futures_util::future::join_all;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use strip_ocr::config::{self, AppConfig};
use strip_ocr::vision::{RecognitionEngine, ScriptedEngine, IGNORE_THRESHOLD_KEY};
use strip_ocr::{RecognitionRequest, RecognitionResponse, RequestPipeline};

/// strip-ocr - fixed-region text recognition
#[derive(Parser, Debug)]
#[command(name = "strip-ocr")]
#[command(about = "Reads a short line of text from a fixed band of photographed cards")]
struct Args {
    /// Images to read (paths or file:// URLs)
    #[arg(required = true)]
    images: Vec<String>,

    /// Ignore observations with confidence below this value
    #[arg(short, long)]
    threshold: Option<f32>,

    /// Configuration file (defaults to the user config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write each cropped strip as PNG into this directory
    #[arg(long, value_name = "DIR")]
    dump_crop: Option<PathBuf>,

    /// Return observations from a JSON file instead of running tesseract
    #[arg(long, value_name = "FILE")]
    script: Option<PathBuf>,

    /// Print one JSON response per image
    #[arg(long)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    // Logs go to stderr so stdout only carries results
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let app_config = config::load_or_default(args.config.as_deref())?;
    let engine = build_engine(&args, &app_config)?;

    let mut vision_config = app_config.vision_config();
    vision_config.dump_crop_dir = args.dump_crop.clone();
    let pipeline = RequestPipeline::with_config(engine, vision_config);

    let requests: Vec<RecognitionRequest> = args
        .images
        .iter()
        .map(|image| {
            let request = RecognitionRequest::new(image.clone());
            match args.threshold {
                Some(t) => request.with_option(IGNORE_THRESHOLD_KEY, t),
                None => request,
            }
        })
        .collect();

    info!("Processing {} image(s)", requests.len());
    let outcomes = join_all(requests.iter().map(|r| pipeline.run(r))).await;

    let mut failures = 0;
    let prefix = requests.len() > 1;
    for (request, outcome) in requests.iter().zip(outcomes) {
        if let Some(ms) = outcome.processing_time_ms() {
            info!("{}: finished in {} ms", request.image_path, ms);
        }
        let response = RecognitionResponse::from(outcome);
        if args.json {
            println!("{}", serde_json::to_string(&response)?);
        }
        match response {
            RecognitionResponse::Ok { text } => {
                if !args.json {
                    for line in text {
                        if prefix {
                            println!("{}\t{}", request.image_path, line);
                        } else {
                            println!("{}", line);
                        }
                    }
                }
            }
            RecognitionResponse::Error { code, message } => {
                failures += 1;
                error!("{}: {} ({})", request.image_path, message, code);
            }
        }
    }

    if failures > 0 {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

/// Pick the recognition engine for this run
fn build_engine(args: &Args, app_config: &AppConfig) -> Result<Arc<dyn RecognitionEngine>> {
    if let Some(script) = &args.script {
        let engine = ScriptedEngine::from_json_file(script)
            .with_context(|| format!("Failed to load scripted observations from {:?}", script))?;
        info!("Using scripted observations from {:?}", script);
        return Ok(Arc::new(engine));
    }

    tesseract_engine(app_config)
}

#[cfg(feature = "engine-tesseract")]
fn tesseract_engine(app_config: &AppConfig) -> Result<Arc<dyn RecognitionEngine>> {
    use strip_ocr::vision::tesseract::TesseractEngine;

    info!(
        "Using tesseract (language: {}, psm: {})",
        app_config.engine.language, app_config.engine.psm
    );
    Ok(Arc::new(TesseractEngine::new(app_config.engine.clone())))
}

#[cfg(not(feature = "engine-tesseract"))]
fn tesseract_engine(_app_config: &AppConfig) -> Result<Arc<dyn RecognitionEngine>> {
    anyhow::bail!("built without the engine-tesseract feature; pass --script to supply observations")
}
