//! Message types for the recognition request/response contract

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::vision::RequestOutcome;

/// A single recognition request as received from the host
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecognitionRequest {
    /// Path of the image to read, optionally prefixed with `file://`
    pub image_path: String,
    /// Numeric options, e.g. `visionIgnoreThreshold`
    #[serde(default)]
    pub options: HashMap<String, f32>,
}

impl RecognitionRequest {
    pub fn new(image_path: impl Into<String>) -> Self {
        Self {
            image_path: image_path.into(),
            options: HashMap::new(),
        }
    }

    /// Set an option, returning the updated request
    pub fn with_option(mut self, key: impl Into<String>, value: f32) -> Self {
        self.options.insert(key.into(), value);
        self
    }
}

/// Response returned to the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RecognitionResponse {
    /// Accepted strings in engine order (possibly empty)
    Ok { text: Vec<String> },
    /// Terminal failure, no partial data
    Error { code: String, message: String },
}

impl From<RequestOutcome> for RecognitionResponse {
    fn from(outcome: RequestOutcome) -> Self {
        match outcome {
            RequestOutcome::Completed { text, .. } => RecognitionResponse::Ok { text },
            RequestOutcome::Failed { error, .. } => RecognitionResponse::Error {
                code: error.code().to_string(),
                message: error.to_string(),
            },
        }
    }
}
