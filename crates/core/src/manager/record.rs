use crate::manager::AnalysisResults;
use crate::stress::StressTimelineEntry;
use crate::util::epoch_ms;
use serde::{Deserialize, Serialize};

/// What an external store keeps per recorded answer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRecord {
    pub question: String,
    pub answer_text: String,
    /// Epoch milliseconds.
    pub recorded_at: u64,
    pub analysis: AnalysisResults,
    pub stress_timeline: Vec<StressTimelineEntry>,
}

impl AnswerRecord {
    pub fn new(
        question: &str,
        answer_text: &str,
        analysis: AnalysisResults,
        stress_timeline: Vec<StressTimelineEntry>,
    ) -> Self {
        Self {
            question: question.to_string(),
            answer_text: answer_text.to_string(),
            recorded_at: epoch_ms(),
            analysis,
            stress_timeline,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emotion::EmotionAnalysis;
    use crate::gesture::GestureAnalysis;
    use crate::stress::StressAnalysis;
    use crate::tone::ToneAnalysis;

    fn results() -> AnalysisResults {
        AnalysisResults {
            tone_analysis: ToneAnalysis {
                pitch: 42.0,
                speed: 128,
                confidence: "Confident".into(),
                confidence_score: 65.0,
                feedback: "Good speaking pace and tone.".into(),
                samples: 100,
            },
            emotion_analysis: EmotionAnalysis::default(),
            gesture_analysis: GestureAnalysis {
                posture: None,
                hand_movement: None,
                facial_engagement: None,
                body_language: None,
                feedback: "Great body language! Keep it up.".into(),
                samples: 0,
            },
            stress_analysis: StressAnalysis::default(),
        }
    }

    #[test]
    fn persisted_shape_uses_camel_case_and_reads_back() {
        let timeline = vec![StressTimelineEntry {
            stress: true,
            confidence: 0.7,
            timestamp: 1_700_000_000_000,
        }];
        let record = AnswerRecord::new("Why this role?", "Because...", results(), timeline);
        let json = serde_json::to_string_pretty(&record).unwrap();
        assert!(json.contains("\"answerText\""));
        assert!(json.contains("\"recordedAt\""));
        assert!(json.contains("\"stressTimeline\""));
        assert!(json.contains("\"confidenceScore\""));

        let back: AnswerRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
