//! Inference capability boundary.
//!
//! Face-expression and body-pose inference are external models. The engine
//! only sees them through [`FrameClassifier`], so scoring and smoothing stay
//! independent of whichever runtime produces the per-frame results.

mod expression;
mod pose;
mod scripted;

use bytes::Bytes;
use futures::future::BoxFuture;
use std::time::SystemTime;

pub use expression::{ExpressionLabel, ExpressionVector};
pub use pose::{Landmark, LandmarkSet, PoseLandmark, POSE_LANDMARK_COUNT};
pub use scripted::{CapabilityScript, ScriptedClassifier};

/// One captured video frame as published by the host.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    pub sequence: u64,
    pub captured_at: SystemTime,
    pub width: u32,
    pub height: u32,
    pub pixels: Bytes,
}

impl Frame {
    pub fn new(sequence: u64, width: u32, height: u32, pixels: Bytes) -> Self {
        Self {
            sequence,
            captured_at: SystemTime::now(),
            width,
            height,
            pixels,
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ClassifierError {
    #[error("model load failed: {0}")]
    LoadFailed(String),

    #[error("classifier used before load")]
    NotLoaded,

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("invalid classifier output: {0}")]
    InvalidOutput(String),
}

pub trait FrameClassifier: Send + Sync {
    /// Loads the underlying models. Calling it again after success is a no-op.
    fn load(&self) -> BoxFuture<'_, Result<(), ClassifierError>>;

    fn is_loaded(&self) -> bool;

    /// `Ok(None)` means no face was found in the frame.
    fn detect_expressions(
        &self,
        frame: Frame,
    ) -> BoxFuture<'_, Result<Option<ExpressionVector>, ClassifierError>>;

    /// `Ok(None)` means no body was found in the frame.
    fn detect_pose(&self, frame: Frame)
        -> BoxFuture<'_, Result<Option<LandmarkSet>, ClassifierError>>;
}
