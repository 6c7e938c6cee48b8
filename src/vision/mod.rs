//! Vision/OCR Layer
//!
//! Runs one recognition request from image path to accepted strings:
//! load, normalize orientation, crop the text strip, recognize, filter.
//! Each request owns its buffers outright; nothing is shared between
//! concurrent requests except the engine handle.

pub mod crop;
pub mod error;
pub mod filter;
pub mod ocr;
pub mod orientation;
#[cfg(feature = "engine-tesseract")]
pub mod tesseract;

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::capture::frame::PixelBuffer;
use crate::capture::{load_image, normalize_image_path};
use crate::shared::RecognitionRequest;

pub use crop::{CropRatios, CropRegion, PixelRect};
pub use error::PipelineError;
pub use filter::{RecognitionOptions, IGNORE_THRESHOLD_KEY};
pub use ocr::{CallbackEngine, Completion, EngineError, RawObservation, RecognitionEngine, ScriptedEngine};
pub use orientation::{AffineTransform, OrientationTag};

/// States a request moves through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Idle,
    Loading,
    Normalizing,
    Cropping,
    Recognizing,
    Filtering,
    Completed,
    Failed,
}

/// Terminal state of a request
#[derive(Debug)]
pub enum RequestOutcome {
    /// Accepted strings, possibly empty
    Completed {
        text: Vec<String>,
        processing_time_ms: u64,
    },
    /// The request stopped at `stage` with `error`
    Failed {
        stage: PipelineStage,
        error: PipelineError,
    },
}

impl RequestOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, RequestOutcome::Completed { .. })
    }

    /// Wall-clock time of a completed request
    pub fn processing_time_ms(&self) -> Option<u64> {
        match self {
            RequestOutcome::Completed {
                processing_time_ms, ..
            } => Some(*processing_time_ms),
            RequestOutcome::Failed { .. } => None,
        }
    }

    /// Accepted strings, or the error that ended the request
    pub fn into_result(self) -> Result<Vec<String>, PipelineError> {
        match self {
            RequestOutcome::Completed { text, .. } => Ok(text),
            RequestOutcome::Failed { error, .. } => Err(error),
        }
    }
}

/// Configuration for the vision pipeline
#[derive(Debug, Clone, Default)]
pub struct VisionConfig {
    /// Text strip location
    pub crop: CropRatios,
    /// Threshold used when a request does not carry one
    pub default_ignore_threshold: f32,
    /// Write every cropped strip here as PNG
    pub dump_crop_dir: Option<PathBuf>,
}

/// Tracks the current state of one request
struct StageTracker<'a> {
    label: &'a str,
    stage: PipelineStage,
}

impl<'a> StageTracker<'a> {
    fn new(label: &'a str) -> Self {
        Self {
            label,
            stage: PipelineStage::Idle,
        }
    }

    fn advance(&mut self, next: PipelineStage) {
        debug!("[{}] {:?} -> {:?}", self.label, self.stage, next);
        self.stage = next;
    }

    fn finish(mut self, result: Result<Vec<String>, PipelineError>, start: Instant) -> RequestOutcome {
        let elapsed = start.elapsed();
        match result {
            Ok(text) => {
                self.advance(PipelineStage::Completed);
                info!(
                    "[{}] Recognition complete in {:?}: {} string(s) accepted",
                    self.label,
                    elapsed,
                    text.len()
                );
                RequestOutcome::Completed {
                    text,
                    processing_time_ms: elapsed.as_millis() as u64,
                }
            }
            Err(error) => {
                let stage = self.stage;
                self.advance(PipelineStage::Failed);
                warn!("[{}] Recognition failed during {:?}: {}", self.label, stage, error);
                RequestOutcome::Failed { stage, error }
            }
        }
    }
}

/// Recognition pipeline bound to one engine
#[derive(Clone)]
pub struct RequestPipeline {
    engine: Arc<dyn RecognitionEngine>,
    config: VisionConfig,
}

impl RequestPipeline {
    /// Create a pipeline with default configuration
    pub fn new(engine: Arc<dyn RecognitionEngine>) -> Self {
        Self::with_config(engine, VisionConfig::default())
    }

    pub fn with_config(engine: Arc<dyn RecognitionEngine>, config: VisionConfig) -> Self {
        Self { engine, config }
    }

    /// Run a request from image path to a terminal outcome
    pub async fn run(&self, request: &RecognitionRequest) -> RequestOutcome {
        let start = Instant::now();
        let mut tracker = StageTracker::new(&request.image_path);
        let result = self.execute(request, &mut tracker).await;
        tracker.finish(result, start)
    }

    /// Run the pipeline on an already decoded buffer
    pub async fn run_buffer(&self, buffer: PixelBuffer, options: RecognitionOptions) -> RequestOutcome {
        let start = Instant::now();
        let mut tracker = StageTracker::new("buffer");
        let result = self.process(buffer, options, None, &mut tracker).await;
        tracker.finish(result, start)
    }

    async fn execute(
        &self,
        request: &RecognitionRequest,
        tracker: &mut StageTracker<'_>,
    ) -> Result<Vec<String>, PipelineError> {
        let path = normalize_image_path(&request.image_path)?;
        let options = RecognitionOptions::with_fallback(
            &request.options,
            self.config.default_ignore_threshold,
        );

        tracker.advance(PipelineStage::Loading);
        let source = load_image(&path).await?;

        self.process(source, options, Some(&path), tracker).await
    }

    async fn process(
        &self,
        source: PixelBuffer,
        options: RecognitionOptions,
        path: Option<&Path>,
        tracker: &mut StageTracker<'_>,
    ) -> Result<Vec<String>, PipelineError> {
        tracker.advance(PipelineStage::Normalizing);
        let upright = orientation::normalize(&source)?;
        drop(source);

        tracker.advance(PipelineStage::Cropping);
        let strip = crop::crop(&upright, &self.config.crop)?;
        drop(upright);

        if let Some(dir) = &self.config.dump_crop_dir {
            dump_strip(&strip, dir, path);
        }

        tracker.advance(PipelineStage::Recognizing);
        let observations = self.engine.recognize(&strip).await?;
        debug!(
            "[{}] Engine returned {} observation(s)",
            tracker.label,
            observations.len()
        );

        tracker.advance(PipelineStage::Filtering);
        Ok(filter::filter(&observations, options.ignore_threshold))
    }
}

/// Save a cropped strip for inspection; failures are logged only
fn dump_strip(strip: &PixelBuffer, dir: &Path, source: Option<&Path>) {
    let stem = source
        .and_then(|p| p.file_stem())
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "buffer".to_string());
    let target = dir.join(format!("{}-strip.png", stem));

    if let Err(e) = std::fs::create_dir_all(dir) {
        warn!("Could not create crop dump directory {:?}: {}", dir, e);
        return;
    }
    match strip.image().save(&target) {
        Ok(()) => info!("Wrote cropped strip to {:?}", target),
        Err(e) => warn!("Could not write cropped strip to {:?}: {}", target, e),
    }
}
