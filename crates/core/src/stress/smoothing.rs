use crate::stress::{DetectionStats, StressDetectionResult};
use crate::util::RingBuffer;
use std::time::Duration;

/// Majority-votes the trailing `window` results.
///
/// Stress requires a strict majority of the full window, even while fewer
/// entries are present. Confidence is the plain mean of the entries present
/// and the features are their union. An empty history yields the zero result.
pub fn smooth(
    history: &RingBuffer<StressDetectionResult>,
    window: usize,
) -> StressDetectionResult {
    let mut n = 0usize;
    let mut stressed = 0usize;
    let mut confidence_sum = 0.0f32;
    let mut smoothed = StressDetectionResult::default();

    for result in history.recent(window) {
        n += 1;
        if result.stress {
            stressed += 1;
        }
        confidence_sum += result.confidence;
        smoothed.features.extend(result.features.iter().cloned());
    }

    if n == 0 {
        return smoothed;
    }
    smoothed.stress = stressed * 2 > window;
    smoothed.confidence = (confidence_sum / n as f32).clamp(0.0, 1.0);
    smoothed
}

pub fn detection_stats(
    history: &RingBuffer<StressDetectionResult>,
    baseline_age: Option<Duration>,
) -> DetectionStats {
    let total = history.len();
    let stressed = history.iter().filter(|r| r.stress).count();
    let average_confidence = if total == 0 {
        0.0
    } else {
        history.iter().map(|r| r.confidence).sum::<f32>() / total as f32
    };

    DetectionStats {
        total_detections: total,
        stress_detections: stressed,
        average_confidence,
        baseline_age_ms: baseline_age
            .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(stress: bool, confidence: f32, features: &[&str]) -> StressDetectionResult {
        StressDetectionResult {
            stress,
            confidence,
            features: features.iter().map(|f| (*f).to_owned()).collect(),
            raw_data: None,
        }
    }

    #[test]
    fn empty_history_gives_zero_result_and_stats() {
        let history = RingBuffer::new(10);
        assert_eq!(smooth(&history, 5), StressDetectionResult::default());
        assert_eq!(detection_stats(&history, None), DetectionStats::default());
    }

    #[test]
    fn three_of_five_is_a_majority() {
        let mut history = RingBuffer::new(10);
        let raw = [
            (true, 0.7),
            (true, 0.65),
            (false, 0.2),
            (true, 0.9),
            (false, 0.1),
        ];
        for (stress, c) in raw {
            history.push(result(stress, c, &[]));
        }
        let s = smooth(&history, 5);
        assert!(s.stress);
        let mean = (0.7 + 0.65 + 0.2 + 0.9 + 0.1) / 5.0;
        assert!((s.confidence - mean).abs() < 1e-5);
    }

    #[test]
    fn two_of_five_is_not_a_majority() {
        let mut history = RingBuffer::new(10);
        for stress in [true, false, false, true, false] {
            history.push(result(stress, 0.5, &[]));
        }
        assert!(!smooth(&history, 5).stress);
    }

    #[test]
    fn short_history_needs_a_majority_of_the_full_window() {
        let mut history = RingBuffer::new(10);
        history.push(result(true, 0.9, &[]));
        let s = smooth(&history, 5);
        assert!(!s.stress);
        assert!((s.confidence - 0.9).abs() < 1e-6);

        history.push(result(true, 0.9, &[]));
        assert!(!smooth(&history, 5).stress);

        history.push(result(true, 0.9, &[]));
        assert!(smooth(&history, 5).stress);
    }

    #[test]
    fn window_only_reads_trailing_entries() {
        let mut history = RingBuffer::new(10);
        for _ in 0..5 {
            history.push(result(true, 1.0, &["jaw clenching"]));
        }
        for _ in 0..5 {
            history.push(result(false, 0.0, &[]));
        }
        let s = smooth(&history, 5);
        assert!(!s.stress);
        assert_eq!(s.confidence, 0.0);
        assert!(s.features.is_empty());
    }

    #[test]
    fn window_features_are_a_deduplicated_union() {
        let mut history = RingBuffer::new(10);
        history.push(result(true, 0.7, &["widened eyes", "raised eyebrows"]));
        history.push(result(true, 0.7, &["raised eyebrows", "jaw clenching"]));
        let s = smooth(&history, 5);
        assert_eq!(s.features.len(), 3);
    }

    #[test]
    fn stats_cover_whole_history() {
        let mut history = RingBuffer::new(10);
        history.push(result(true, 0.8, &[]));
        history.push(result(false, 0.2, &[]));
        history.push(result(false, 0.2, &[]));
        let stats = detection_stats(&history, Some(Duration::from_millis(1_500)));
        assert_eq!(stats.total_detections, 3);
        assert_eq!(stats.stress_detections, 1);
        assert!((stats.average_confidence - 0.4).abs() < 1e-6);
        assert_eq!(stats.baseline_age_ms, 1_500);
    }
}
