//! strip-ocr - reads a short line of text from a fixed band of a photographed card
//!
//! The image is decoded, rotated/mirrored into its upright frame according to
//! its orientation tag, cropped to the configured strip and handed to a
//! recognition engine. Observations below the requested confidence are
//! dropped and the remaining strings are returned in engine order.

pub mod capture;
pub mod config;
pub mod shared;
pub mod vision;

pub use capture::frame::PixelBuffer;
pub use shared::{RecognitionRequest, RecognitionResponse};
pub use vision::{PipelineError, PipelineStage, RequestOutcome, RequestPipeline};
