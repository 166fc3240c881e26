//! Baseline-relative stress detection.
//!
//! A session first captures the subject's neutral expression profile
//! ([`BaselineCalibration`]), then scores each sampled frame by how far the
//! stress-linked expressions rise above that baseline. Raw per-frame results
//! are noisy, so callers read a majority-voted trailing window instead.

mod analyzer;
mod calibration;
mod scoring;
mod smoothing;
mod timeline;

use crate::classifier::{ExpressionLabel, ExpressionVector};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub use analyzer::{StressAnalyzer, StressPhase};
pub use calibration::BaselineCalibration;
pub use scoring::{feature_tags, score_frame, STRESS_WEIGHTS};
pub use smoothing::{detection_stats, smooth};
pub use timeline::StressTimeline;

/// Diagnostics attached to a raw per-frame result.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StressRawData {
    pub baseline: ExpressionVector,
    pub current: ExpressionVector,
    /// Signed deviation from baseline for every weighted label.
    pub deviations: BTreeMap<ExpressionLabel, f32>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StressDetectionResult {
    pub stress: bool,
    /// Always within `[0, 1]`.
    pub confidence: f32,
    pub features: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_data: Option<StressRawData>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionStats {
    pub total_detections: usize,
    pub stress_detections: usize,
    pub average_confidence: f32,
    pub baseline_age_ms: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StressTimelineEntry {
    pub stress: bool,
    pub confidence: f32,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
}

/// Snapshot returned to the session orchestrator.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StressAnalysis {
    pub current: StressDetectionResult,
    pub stats: DetectionStats,
    pub baseline_ready: bool,
    pub calibration_progress: f32,
    pub timeline: Vec<StressTimelineEntry>,
    pub feedback: String,
}

pub(crate) fn stress_feedback(current: &StressDetectionResult, baseline_ready: bool) -> String {
    if !baseline_ready {
        return "Stress detection starts once calibration completes.".into();
    }
    if current.stress {
        "Signs of stress detected. Take a slow breath and pause before answering.".into()
    } else if current.confidence >= 0.3 {
        "Some tension is showing. Try relaxing your face and shoulders.".into()
    } else {
        "You appear calm and composed.".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feedback_follows_smoothed_level() {
        let calm = StressDetectionResult::default();
        assert_eq!(stress_feedback(&calm, true), "You appear calm and composed.");
        assert!(stress_feedback(&calm, false).contains("calibration"));

        let tense = StressDetectionResult {
            confidence: 0.35,
            ..Default::default()
        };
        assert!(stress_feedback(&tense, true).contains("tension"));

        let stressed = StressDetectionResult {
            stress: true,
            confidence: 0.8,
            ..Default::default()
        };
        assert!(stress_feedback(&stressed, true).contains("slow breath"));
    }

    #[test]
    fn raw_data_is_omitted_from_json_when_absent() {
        let json = serde_json::to_value(StressDetectionResult::default()).expect("serializable");
        assert!(json.get("rawData").is_none());
        assert_eq!(json["features"], serde_json::json!([]));
    }
}
