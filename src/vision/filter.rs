//! Confidence filtering of engine observations

use std::collections::HashMap;

use super::ocr::RawObservation;

/// Option key carrying the confidence threshold in request options
pub const IGNORE_THRESHOLD_KEY: &str = "visionIgnoreThreshold";

/// Per-request recognition options
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RecognitionOptions {
    /// Observations below this confidence are dropped
    pub ignore_threshold: f32,
}

impl RecognitionOptions {
    /// Build options from caller-supplied key/value pairs
    ///
    /// A missing, non-positive or non-finite threshold means no filtering.
    pub fn from_map(options: &HashMap<String, f32>) -> Self {
        Self::with_fallback(options, 0.0)
    }

    /// Like [`from_map`](Self::from_map), using `fallback` when the key is absent
    pub fn with_fallback(options: &HashMap<String, f32>, fallback: f32) -> Self {
        let requested = options.get(IGNORE_THRESHOLD_KEY).copied().unwrap_or(fallback);
        Self {
            ignore_threshold: sanitize_threshold(requested),
        }
    }
}

fn sanitize_threshold(value: f32) -> f32 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

/// Keep the text of every observation whose confidence reaches `threshold`
///
/// Engine order is preserved and duplicates are kept.
pub fn filter(observations: &[RawObservation], threshold: f32) -> Vec<String> {
    observations
        .iter()
        .filter(|o| o.confidence >= threshold)
        .map(|o| o.text.clone())
        .collect()
}
