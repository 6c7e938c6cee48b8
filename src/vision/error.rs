//! Error kinds surfaced by a recognition request

use thiserror::Error;

use super::ocr::EngineError;

/// Terminal failure of a recognition request
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Failed to normalize image orientation: {0}")]
    Orientation(String),

    #[error("Failed to crop image: {0}")]
    Crop(String),

    #[error("Recognition engine error: {0}")]
    Engine(#[from] EngineError),
}

impl PipelineError {
    /// Stable error code reported to callers
    pub fn code(&self) -> &'static str {
        match self {
            PipelineError::InvalidInput(_) => "E_INVALID_INPUT",
            PipelineError::Decode(_) => "E_DECODE",
            PipelineError::Orientation(_) => "E_ORIENTATION",
            PipelineError::Crop(_) => "E_CROP",
            PipelineError::Engine(_) => "E_ENGINE",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_distinct() {
        let errors = [
            PipelineError::InvalidInput("x".into()),
            PipelineError::Decode("x".into()),
            PipelineError::Orientation("x".into()),
            PipelineError::Crop("x".into()),
            PipelineError::Engine(EngineError::Failed("x".into())),
        ];
        let mut codes: Vec<_> = errors.iter().map(|e| e.code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_engine_error_conversion() {
        let err: PipelineError = EngineError::Dropped.into();
        assert_eq!(err.code(), "E_ENGINE");
        assert!(err.to_string().contains("without"));
    }

    #[test]
    fn test_message_includes_detail() {
        let err = PipelineError::Decode("unexpected end of file".into());
        assert_eq!(err.to_string(), "Failed to decode image: unexpected end of file");
    }
}
