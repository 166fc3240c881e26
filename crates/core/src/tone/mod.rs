//! Vocal tone estimation from the audio spectrum and pushed transcript text.

mod analyzer;

use serde::{Deserialize, Serialize};

pub use analyzer::ToneAnalyzer;

pub const MIN_CONFIDENCE_SCORE: f32 = 0.0;
pub const MAX_CONFIDENCE_SCORE: f32 = 100.0;

const FAST_WPM: u32 = 160;
const SLOW_WPM: u32 = 110;
const QUIET_PITCH: f32 = 15.0;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToneAnalysis {
    /// Mean spectrum level on a 0-100 scale.
    pub pitch: f32,
    /// Words per minute since the analyzer started.
    pub speed: u32,
    pub confidence: String,
    pub confidence_score: f32,
    pub feedback: String,
    pub samples: usize,
}

/// Maps an averaged frequency-bin magnitude to the 0-100 pitch proxy.
pub fn pitch_from_spectrum(bins: &[u8]) -> f32 {
    if bins.is_empty() {
        return 0.0;
    }
    let sum: u64 = bins.iter().map(|&b| u64::from(b)).sum();
    let mean = sum as f32 / bins.len() as f32;
    mean / 255.0 * 100.0
}

pub fn confidence_label(score: f32) -> &'static str {
    if score > 80.0 {
        "Very Confident"
    } else if score > 60.0 {
        "Confident"
    } else if score > 40.0 {
        "Moderately Confident"
    } else if score > 20.0 {
        "Slightly Nervous"
    } else {
        "Nervous"
    }
}

pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

pub(crate) fn tone_feedback(pitch: f32, samples: usize, wpm: u32, confidence: f32) -> &'static str {
    if wpm > FAST_WPM {
        "Try to slow down your speaking pace."
    } else if wpm > 0 && wpm < SLOW_WPM {
        "Try to speak a little faster to keep your answer engaging."
    } else if confidence <= 40.0 {
        "Speak with more conviction and keep your voice steady."
    } else if samples > 0 && pitch < QUIET_PITCH {
        "Try to project your voice a little more."
    } else {
        "Good speaking pace and tone."
    }
}
