use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpressionLabel {
    Neutral,
    Happy,
    Sad,
    Angry,
    Fearful,
    Disgusted,
    Surprised,
}

impl ExpressionLabel {
    pub const ALL: [ExpressionLabel; 7] = [
        ExpressionLabel::Neutral,
        ExpressionLabel::Happy,
        ExpressionLabel::Sad,
        ExpressionLabel::Angry,
        ExpressionLabel::Fearful,
        ExpressionLabel::Disgusted,
        ExpressionLabel::Surprised,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExpressionLabel::Neutral => "neutral",
            ExpressionLabel::Happy => "happy",
            ExpressionLabel::Sad => "sad",
            ExpressionLabel::Angry => "angry",
            ExpressionLabel::Fearful => "fearful",
            ExpressionLabel::Disgusted => "disgusted",
            ExpressionLabel::Surprised => "surprised",
        }
    }
}

impl fmt::Display for ExpressionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExpressionLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|label| label.as_str() == s)
            .ok_or_else(|| format!("unknown expression label {s:?}"))
    }
}

/// Per-frame expression probabilities.
///
/// Values are clamped to `[0, 1]` on construction from raw output. They are
/// not normalised and do not have to sum to one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpressionVector {
    pub neutral: f32,
    pub happy: f32,
    pub sad: f32,
    pub angry: f32,
    pub fearful: f32,
    pub disgusted: f32,
    pub surprised: f32,
}

impl ExpressionVector {
    pub fn get(&self, label: ExpressionLabel) -> f32 {
        match label {
            ExpressionLabel::Neutral => self.neutral,
            ExpressionLabel::Happy => self.happy,
            ExpressionLabel::Sad => self.sad,
            ExpressionLabel::Angry => self.angry,
            ExpressionLabel::Fearful => self.fearful,
            ExpressionLabel::Disgusted => self.disgusted,
            ExpressionLabel::Surprised => self.surprised,
        }
    }

    pub fn set(&mut self, label: ExpressionLabel, value: f32) {
        let slot = match label {
            ExpressionLabel::Neutral => &mut self.neutral,
            ExpressionLabel::Happy => &mut self.happy,
            ExpressionLabel::Sad => &mut self.sad,
            ExpressionLabel::Angry => &mut self.angry,
            ExpressionLabel::Fearful => &mut self.fearful,
            ExpressionLabel::Disgusted => &mut self.disgusted,
            ExpressionLabel::Surprised => &mut self.surprised,
        };
        *slot = value;
    }

    pub fn with(mut self, label: ExpressionLabel, value: f32) -> Self {
        self.set(label, value);
        self
    }

    /// Builds a vector from string-keyed classifier output.
    ///
    /// Unknown keys are dropped, non-finite scores read as zero, everything
    /// else is clamped into `[0, 1]`. Labels absent from `raw` stay at zero.
    pub fn from_raw<'a, I>(raw: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, f32)>,
    {
        let mut v = Self::default();
        for (key, score) in raw {
            match key.parse::<ExpressionLabel>() {
                Ok(label) => {
                    let score = if score.is_finite() {
                        score.clamp(0.0, 1.0)
                    } else {
                        0.0
                    };
                    v.set(label, score);
                }
                Err(_) => {
                    tracing::debug!(key, "ignoring unknown expression key");
                }
            }
        }
        v
    }

    /// Per-label arithmetic mean, `None` for an empty slice.
    pub fn mean(samples: &[ExpressionVector]) -> Option<ExpressionVector> {
        if samples.is_empty() {
            return None;
        }
        let n = samples.len() as f32;
        let mut out = ExpressionVector::default();
        for label in ExpressionLabel::ALL {
            let sum: f32 = samples.iter().map(|s| s.get(label)).sum();
            out.set(label, sum / n);
        }
        Some(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_raw_ignores_unknown_keys_and_clamps() {
        let v = ExpressionVector::from_raw([
            ("angry", 1.4),
            ("happy", -0.2),
            ("contempt", 0.9),
            ("sad", f32::NAN),
            ("fearful", 0.3),
        ]);
        assert_eq!(v.angry, 1.0);
        assert_eq!(v.happy, 0.0);
        assert_eq!(v.sad, 0.0);
        assert_eq!(v.fearful, 0.3);
        assert_eq!(v.neutral, 0.0);
    }

    #[test]
    fn label_parsing_matches_display() {
        for label in ExpressionLabel::ALL {
            assert_eq!(label.to_string().parse::<ExpressionLabel>(), Ok(label));
        }
        assert!("Angry".parse::<ExpressionLabel>().is_err());
    }

    #[test]
    fn mean_is_per_label() {
        let a = ExpressionVector::default().with(ExpressionLabel::Angry, 0.2);
        let b = ExpressionVector::default()
            .with(ExpressionLabel::Angry, 0.4)
            .with(ExpressionLabel::Neutral, 1.0);
        let m = ExpressionVector::mean(&[a, b]).expect("non-empty");
        assert!((m.angry - 0.3).abs() < 1e-6);
        assert!((m.neutral - 0.5).abs() < 1e-6);
        assert_eq!(ExpressionVector::mean(&[]), None);
    }
}
