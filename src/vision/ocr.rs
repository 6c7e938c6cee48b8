//! Recognition engine interface
//!
//! The character recognizer itself is an external collaborator. The pipeline
//! only needs something that takes an upright strip and eventually produces
//! exactly one outcome: a list of observations or an error.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::debug;

use crate::capture::frame::PixelBuffer;

/// Single candidate produced by the recognition engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawObservation {
    /// Recognized text
    pub text: String,
    /// Recognition confidence (0.0 - 1.0)
    pub confidence: f32,
}

impl RawObservation {
    pub fn new(text: impl Into<String>, confidence: f32) -> Self {
        Self {
            text: text.into(),
            confidence,
        }
    }
}

/// Failure reported by (or about) the recognition engine
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EngineError {
    #[error("{0}")]
    Failed(String),

    #[error("unexpected result: {0}")]
    UnexpectedResult(String),

    #[error("engine finished without delivering a result")]
    Dropped,
}

/// Capability interface for text recognizers
#[async_trait]
pub trait RecognitionEngine: Send + Sync {
    /// Recognize text in an upright image strip
    async fn recognize(&self, image: &PixelBuffer) -> Result<Vec<RawObservation>, EngineError>;
}

/// Handle through which a callback-style engine reports its single outcome
///
/// Delivering consumes the handle. Dropping it without delivering fails the
/// request with [`EngineError::Dropped`].
#[derive(Debug)]
pub struct Completion {
    sender: oneshot::Sender<Result<Vec<RawObservation>, EngineError>>,
}

impl Completion {
    pub fn complete(self, result: Result<Vec<RawObservation>, EngineError>) {
        // The receiver only goes away if the request future was dropped
        let _ = self.sender.send(result);
    }

    pub fn succeed(self, observations: Vec<RawObservation>) {
        self.complete(Ok(observations));
    }

    pub fn fail(self, message: impl Into<String>) {
        self.complete(Err(EngineError::Failed(message.into())));
    }

    /// Report that the engine returned something other than observations
    pub fn unexpected(self, description: impl Into<String>) {
        self.complete(Err(EngineError::UnexpectedResult(description.into())));
    }
}

/// Adapter for engines that report results through a callback
///
/// `submit` receives its own copy of the strip and a [`Completion`]; it may
/// finish synchronously or hand both off to another thread.
pub struct CallbackEngine<F> {
    submit: F,
}

impl<F> CallbackEngine<F>
where
    F: Fn(PixelBuffer, Completion) + Send + Sync,
{
    pub fn new(submit: F) -> Self {
        Self { submit }
    }
}

#[async_trait]
impl<F> RecognitionEngine for CallbackEngine<F>
where
    F: Fn(PixelBuffer, Completion) + Send + Sync,
{
    async fn recognize(&self, image: &PixelBuffer) -> Result<Vec<RawObservation>, EngineError> {
        let (sender, receiver) = oneshot::channel();
        (self.submit)(image.clone(), Completion { sender });
        receiver.await.map_err(|_| EngineError::Dropped)?
    }
}

/// Engine returning a fixed, scripted outcome
#[derive(Debug)]
pub struct ScriptedEngine {
    outcome: Result<Vec<RawObservation>, EngineError>,
    calls: AtomicUsize,
}

impl ScriptedEngine {
    pub fn new(observations: Vec<RawObservation>) -> Self {
        Self {
            outcome: Ok(observations),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(error: EngineError) -> Self {
        Self {
            outcome: Err(error),
            calls: AtomicUsize::new(0),
        }
    }

    /// Load observations from a JSON array of `{"text": .., "confidence": ..}`
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let observations: Vec<RawObservation> = serde_json::from_str(&content)?;
        Ok(Self::new(observations))
    }

    /// Number of times `recognize` has been called
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecognitionEngine for ScriptedEngine {
    async fn recognize(&self, image: &PixelBuffer) -> Result<Vec<RawObservation>, EngineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        debug!(
            "Scripted engine called with {}x{} strip",
            image.width(),
            image.height()
        );
        self.outcome.clone()
    }
}
