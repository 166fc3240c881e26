use crate::classifier::{ExpressionLabel, ExpressionVector};
use crate::config::StressConfig;
use crate::stress::{StressDetectionResult, StressRawData};
use std::collections::{BTreeMap, BTreeSet};

/// Expressions that indicate stress, with their contribution weight.
pub const STRESS_WEIGHTS: [(ExpressionLabel, f32); 5] = [
    (ExpressionLabel::Angry, 1.0),
    (ExpressionLabel::Fearful, 1.0),
    (ExpressionLabel::Sad, 0.8),
    (ExpressionLabel::Disgusted, 0.7),
    (ExpressionLabel::Surprised, 0.3),
];

/// Physical cues reported when `label` contributes to a stress score.
pub fn feature_tags(label: ExpressionLabel) -> &'static [&'static str] {
    match label {
        ExpressionLabel::Angry => &["eyebrow tension", "jaw clenching"],
        ExpressionLabel::Fearful => &["widened eyes", "raised eyebrows"],
        ExpressionLabel::Sad => &["lip corner depression", "inner brow raise"],
        ExpressionLabel::Disgusted => &["nose wrinkling", "upper lip raise"],
        ExpressionLabel::Surprised => &["raised eyebrows", "widened eyes"],
        ExpressionLabel::Neutral | ExpressionLabel::Happy => &[],
    }
}

/// Scores one frame against the baseline.
///
/// Only labels whose deviation strictly exceeds `stress_threshold` count.
/// Confidence is their weighted mean deviation, so several weak indicators
/// dilute rather than add up.
pub fn score_frame(
    baseline: &ExpressionVector,
    current: &ExpressionVector,
    config: &StressConfig,
) -> StressDetectionResult {
    let mut score = 0.0f32;
    let mut total_weight = 0.0f32;
    let mut features = BTreeSet::new();
    let mut deviations = BTreeMap::new();

    for (label, weight) in STRESS_WEIGHTS {
        let deviation = current.get(label) - baseline.get(label);
        deviations.insert(label, deviation);

        if deviation > config.stress_threshold {
            score += deviation * weight;
            total_weight += weight;
            features.extend(feature_tags(label).iter().map(|t| (*t).to_owned()));
        }
    }

    let confidence = if total_weight > 0.0 {
        (score / total_weight).clamp(0.0, 1.0)
    } else {
        0.0
    };

    StressDetectionResult {
        stress: confidence >= config.confidence_threshold,
        confidence,
        features,
        raw_data: Some(StressRawData {
            baseline: *baseline,
            current: *current,
            deviations,
        }),
    }
}
