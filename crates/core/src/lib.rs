#![deny(warnings)]

pub mod classifier;
pub mod config;
pub mod emotion;
pub mod gesture;
pub mod manager;
pub mod source;
pub mod stress;
pub mod tone;
pub mod util;

pub use classifier::{ExpressionVector, Frame, FrameClassifier, LandmarkSet};
pub use config::AnalysisConfig;
pub use manager::{AnalysisError, AnalysisManager, AnalysisResults, AnswerRecord};
