//! Generated capability scripts for sessions run without `--script`.

use behavior_analysis_core::classifier::{
    ExpressionLabel, ExpressionVector, Landmark, LandmarkSet, PoseLandmark, ScriptedClassifier,
};
use bytes::Bytes;
use rand::Rng;

const CALM_FRAMES: usize = 48;
const SESSION_FRAMES: usize = 600;
const SPECTRUM_BINS: usize = 64;

fn jitter(rng: &mut impl Rng, spread: f32) -> f32 {
    rng.random_range(-spread..=spread)
}

fn calm(rng: &mut impl Rng) -> ExpressionVector {
    ExpressionVector::default()
        .with(ExpressionLabel::Neutral, 0.85 + jitter(rng, 0.05))
        .with(ExpressionLabel::Happy, 0.05 + jitter(rng, 0.03))
        .with(ExpressionLabel::Sad, 0.02)
        .with(ExpressionLabel::Angry, 0.02)
        .with(ExpressionLabel::Fearful, 0.01)
}

fn tense(rng: &mut impl Rng) -> ExpressionVector {
    ExpressionVector::default()
        .with(ExpressionLabel::Neutral, 0.2 + jitter(rng, 0.05))
        .with(ExpressionLabel::Angry, rng.random_range(0.55..0.9))
        .with(ExpressionLabel::Fearful, rng.random_range(0.2..0.6))
}

/// Calm frames for the baseline, then a mix with stretches of visible tension.
pub fn expressions(rng: &mut impl Rng) -> Vec<Option<ExpressionVector>> {
    let mut out = Vec::with_capacity(SESSION_FRAMES);
    let mut tense_run = 0usize;
    for i in 0..SESSION_FRAMES {
        if i < CALM_FRAMES {
            out.push(Some(calm(rng)));
            continue;
        }
        if tense_run == 0 && rng.random_bool(0.04) {
            tense_run = rng.random_range(6..20);
        }
        if rng.random_bool(0.03) {
            out.push(None);
        } else if tense_run > 0 {
            tense_run -= 1;
            out.push(Some(tense(rng)));
        } else {
            out.push(Some(calm(rng)));
        }
    }
    out
}

pub fn poses(rng: &mut impl Rng) -> Vec<Option<LandmarkSet>> {
    (0..SESSION_FRAMES / 4)
        .map(|_| {
            let mut p = LandmarkSet::default();
            let face = 0.9 + jitter(rng, 0.08);
            p.set(PoseLandmark::Nose, Landmark::new(0.5, 0.2, face));
            p.set(PoseLandmark::LeftEye, Landmark::new(0.52, 0.18, face));
            p.set(PoseLandmark::RightEye, Landmark::new(0.48, 0.18, face));
            p.set(PoseLandmark::LeftShoulder, Landmark::new(0.62, 0.4, 1.0));
            p.set(
                PoseLandmark::RightShoulder,
                Landmark::new(0.38, 0.4 + jitter(rng, 0.07), 1.0),
            );
            p.set(PoseLandmark::LeftElbow, Landmark::new(0.7, 0.55, 1.0));
            p.set(PoseLandmark::RightElbow, Landmark::new(0.3, 0.55, 1.0));
            let reach = rng.random_range(0.02..0.3);
            p.set(PoseLandmark::LeftWrist, Landmark::new(0.7, 0.55 + reach, 1.0));
            p.set(PoseLandmark::RightWrist, Landmark::new(0.3, 0.55 + reach, 1.0));
            Some(p)
        })
        .collect()
}

pub fn spectra(rng: &mut impl Rng) -> Vec<Vec<u8>> {
    (0..SESSION_FRAMES)
        .map(|_| {
            let level: u8 = rng.random_range(40..160);
            (0..SPECTRUM_BINS)
                .map(|bin| {
                    level
                        .saturating_sub((bin as u8) / 2)
                        .saturating_add(rng.random_range(0..16))
                })
                .collect()
        })
        .collect()
}

pub fn classifier() -> ScriptedClassifier {
    let mut rng = rand::rng();
    ScriptedClassifier::new(expressions(&mut rng), poses(&mut rng))
}

/// Noise standing in for camera pixels; the scripted classifier ignores them.
pub fn pixels(len: usize) -> Bytes {
    let mut rng = rand::rng();
    Bytes::from((0..len).map(|_| rng.random::<u8>()).collect::<Vec<_>>())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn baseline_stretch_is_calm_and_faces_present() {
        let mut rng = rand::rng();
        let exprs = expressions(&mut rng);
        assert_eq!(exprs.len(), SESSION_FRAMES);
        for e in exprs.iter().take(CALM_FRAMES) {
            let e = e.as_ref().expect("calm frames always have a face");
            assert!(e.get(ExpressionLabel::Neutral) > 0.75);
            assert!(e.get(ExpressionLabel::Angry) < 0.1);
        }
    }

    #[test]
    fn spectra_have_fixed_bin_count() {
        let mut rng = rand::rng();
        assert!(spectra(&mut rng).iter().all(|s| s.len() == SPECTRUM_BINS));
    }
}
