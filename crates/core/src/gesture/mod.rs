//! Body-language classification from pose landmarks.
//!
//! Unlike the other analyzers this one owns no timer: it is driven by pose
//! frames arriving from the capture loop.

mod analyzer;
mod capture;
mod classify;

use serde::{Deserialize, Serialize};

pub use analyzer::GestureAnalyzer;
pub use capture::spawn_pose_capture;
pub use classify::{
    classify_body_language, classify_facial_engagement, classify_hand_movement, classify_pose,
    classify_posture,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Posture {
    Good,
    Poor,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandMovement {
    Minimal,
    Moderate,
    Excessive,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacialEngagement {
    High,
    Moderate,
    Low,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyLanguage {
    Open,
    Closed,
}

/// One frame's worth of categorical samples.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GestureSample {
    pub posture: Posture,
    pub hand_movement: HandMovement,
    pub facial_engagement: FacialEngagement,
    pub body_language: BodyLanguage,
}

/// Most frequent category per bucket; `None` until a pose has been seen.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GestureAnalysis {
    pub posture: Option<Posture>,
    pub hand_movement: Option<HandMovement>,
    pub facial_engagement: Option<FacialEngagement>,
    pub body_language: Option<BodyLanguage>,
    pub feedback: String,
    pub samples: usize,
}

/// Mode of `items`; ties go to the category seen first.
pub(crate) fn most_frequent<'a, T, I>(items: I) -> Option<T>
where
    T: Copy + Eq + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let mut counts: Vec<(T, usize)> = Vec::new();
    for item in items {
        match counts.iter_mut().find(|(c, _)| c == item) {
            Some((_, n)) => *n += 1,
            None => counts.push((*item, 1)),
        }
    }
    let mut best: Option<(T, usize)> = None;
    for (category, n) in counts {
        if best.map_or(true, |(_, b)| n > b) {
            best = Some((category, n));
        }
    }
    best.map(|(category, _)| category)
}

/// First matching rule wins: posture, hands, face, body, then the default.
pub(crate) fn gesture_feedback(
    posture: Option<Posture>,
    hand_movement: Option<HandMovement>,
    facial_engagement: Option<FacialEngagement>,
    body_language: Option<BodyLanguage>,
) -> &'static str {
    if posture == Some(Posture::Poor) {
        "Try to sit up straight and keep your shoulders level."
    } else if hand_movement == Some(HandMovement::Excessive) {
        "Try to reduce excessive hand movements."
    } else if facial_engagement == Some(FacialEngagement::Low) {
        "Try to face the camera and maintain eye contact."
    } else if body_language == Some(BodyLanguage::Closed) {
        "Try to keep an open posture and avoid crossing your arms."
    } else {
        "Great body language! Keep it up."
    }
}
