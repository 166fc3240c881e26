mod analyzer;

use crate::classifier::{ExpressionLabel, ExpressionVector};
use serde::{Deserialize, Serialize};

pub use analyzer::EmotionAnalyzer;

/// Coarse emotion vocabulary reported to the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Neutral,
    Happiness,
    Sadness,
    Anger,
    Surprise,
    Frustration,
}

/// Expressions eligible to be the dominant one, in tie-break order.
const CANDIDATES: [ExpressionLabel; 6] = [
    ExpressionLabel::Neutral,
    ExpressionLabel::Happy,
    ExpressionLabel::Sad,
    ExpressionLabel::Angry,
    ExpressionLabel::Surprised,
    ExpressionLabel::Fearful,
];

impl Emotion {
    fn from_expression(label: ExpressionLabel) -> Emotion {
        match label {
            ExpressionLabel::Happy => Emotion::Happiness,
            ExpressionLabel::Sad => Emotion::Sadness,
            ExpressionLabel::Angry => Emotion::Anger,
            ExpressionLabel::Surprised => Emotion::Surprise,
            ExpressionLabel::Fearful => Emotion::Frustration,
            ExpressionLabel::Neutral | ExpressionLabel::Disgusted => Emotion::Neutral,
        }
    }
}

/// Highest-scoring candidate expression; ties go to the earlier candidate.
pub fn dominant_emotion(expressions: &ExpressionVector) -> Emotion {
    let mut best = CANDIDATES[0];
    let mut best_score = expressions.get(best);
    for label in &CANDIDATES[1..] {
        let score = expressions.get(*label);
        if score > best_score {
            best = *label;
            best_score = score;
        }
    }
    Emotion::from_expression(best)
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EmotionTimelineEntry {
    pub emotion: Emotion,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmotionAnalysis {
    pub dominant_emotion: Emotion,
    /// Share of the timeline held by the dominant emotion, 0-100.
    pub intensity: f32,
    pub feedback: String,
    pub samples: usize,
}

impl Default for EmotionAnalysis {
    fn default() -> Self {
        summarize(std::iter::empty())
    }
}

/// Mode of the timeline with its frequency-based intensity and feedback.
pub fn summarize<'a, I>(timeline: I) -> EmotionAnalysis
where
    I: IntoIterator<Item = &'a EmotionTimelineEntry>,
{
    // Counts kept in first-appearance order so ties favour the earlier emotion.
    let mut counts: Vec<(Emotion, usize)> = Vec::new();
    let mut total = 0usize;
    for entry in timeline {
        total += 1;
        match counts.iter_mut().find(|(e, _)| *e == entry.emotion) {
            Some((_, n)) => *n += 1,
            None => counts.push((entry.emotion, 1)),
        }
    }

    let mut dominant = Emotion::Neutral;
    let mut best = 0usize;
    for (emotion, n) in counts {
        if n > best {
            dominant = emotion;
            best = n;
        }
    }

    let intensity = if total == 0 {
        0.0
    } else {
        best as f32 / total as f32 * 100.0
    };

    EmotionAnalysis {
        dominant_emotion: dominant,
        intensity,
        feedback: emotion_feedback(dominant, intensity).to_owned(),
        samples: total,
    }
}

fn emotion_feedback(dominant: Emotion, intensity: f32) -> &'static str {
    match dominant {
        Emotion::Anger | Emotion::Frustration | Emotion::Sadness if intensity > 50.0 => {
            "You seem tense. Take a breath and keep a calm, steady expression."
        }
        Emotion::Happiness if intensity > 30.0 => {
            "Great positive energy! Your enthusiasm comes through."
        }
        Emotion::Neutral if intensity > 70.0 => {
            "Try to show a bit more enthusiasm and expressiveness."
        }
        Emotion::Surprise if intensity > 50.0 => {
            "You look caught off guard. Take a moment to collect your thoughts."
        }
        _ => "Good emotional balance. Keep it up.",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(emotions: &[Emotion]) -> Vec<EmotionTimelineEntry> {
        emotions
            .iter()
            .enumerate()
            .map(|(i, e)| EmotionTimelineEntry {
                emotion: *e,
                timestamp: i as u64 * 1_000,
            })
            .collect()
    }

    #[test]
    fn dominant_maps_to_coarse_vocabulary() {
        let v = ExpressionVector::default()
            .with(ExpressionLabel::Neutral, 0.1)
            .with(ExpressionLabel::Fearful, 0.7);
        assert_eq!(dominant_emotion(&v), Emotion::Frustration);

        let v = ExpressionVector::default().with(ExpressionLabel::Happy, 0.8);
        assert_eq!(dominant_emotion(&v), Emotion::Happiness);
    }

    #[test]
    fn dominant_ties_go_to_first_candidate() {
        let v = ExpressionVector::default()
            .with(ExpressionLabel::Sad, 0.4)
            .with(ExpressionLabel::Angry, 0.4);
        assert_eq!(dominant_emotion(&v), Emotion::Sadness);
        assert_eq!(dominant_emotion(&ExpressionVector::default()), Emotion::Neutral);
    }

    #[test]
    fn disgust_is_never_dominant() {
        let v = ExpressionVector::default()
            .with(ExpressionLabel::Disgusted, 0.95)
            .with(ExpressionLabel::Angry, 0.05);
        assert_eq!(dominant_emotion(&v), Emotion::Anger);
    }

    #[test]
    fn summary_reports_mode_and_intensity() {
        use Emotion::*;
        let t = entries(&[Neutral, Happiness, Happiness, Neutral, Happiness]);
        let s = summarize(&t);
        assert_eq!(s.dominant_emotion, Happiness);
        assert!((s.intensity - 60.0).abs() < 1e-4);
        assert_eq!(s.samples, 5);
        assert_eq!(s.feedback, "Great positive energy! Your enthusiasm comes through.");
    }

    #[test]
    fn summary_ties_favour_first_seen() {
        use Emotion::*;
        let s = summarize(&entries(&[Anger, Neutral, Neutral, Anger]));
        assert_eq!(s.dominant_emotion, Anger);
        assert_eq!(s.feedback, "Good emotional balance. Keep it up.");
    }

    #[test]
    fn empty_timeline_is_neutral_zero() {
        let s = EmotionAnalysis::default();
        assert_eq!(s.dominant_emotion, Emotion::Neutral);
        assert_eq!(s.intensity, 0.0);
        assert_eq!(s.samples, 0);
    }

    #[test]
    fn feedback_thresholds() {
        assert!(emotion_feedback(Emotion::Frustration, 51.0).contains("tense"));
        assert!(!emotion_feedback(Emotion::Frustration, 50.0).contains("tense"));
        assert!(emotion_feedback(Emotion::Neutral, 80.0).contains("enthusiasm"));
        assert!(emotion_feedback(Emotion::Surprise, 60.0).contains("caught off guard"));
    }
}
