use crate::classifier::{Landmark, LandmarkSet, PoseLandmark};
use crate::gesture::{BodyLanguage, FacialEngagement, GestureSample, HandMovement, Posture};

const SHOULDER_LEVEL_TOLERANCE: f32 = 0.05;
const MINIMAL_HAND_TRAVEL: f32 = 0.2;
const MODERATE_HAND_TRAVEL: f32 = 0.5;
const HIGH_FACE_VISIBILITY: f32 = 0.8;
const MODERATE_FACE_VISIBILITY: f32 = 0.5;

pub fn classify_posture(pose: &LandmarkSet) -> Posture {
    let left = pose.get(PoseLandmark::LeftShoulder);
    let right = pose.get(PoseLandmark::RightShoulder);
    if (left.y - right.y).abs() < SHOULDER_LEVEL_TOLERANCE {
        Posture::Good
    } else {
        Posture::Poor
    }
}

/// Wrist-to-elbow extension summed over both arms.
pub fn classify_hand_movement(pose: &LandmarkSet) -> HandMovement {
    let left = pose
        .get(PoseLandmark::LeftWrist)
        .distance_2d(&pose.get(PoseLandmark::LeftElbow));
    let right = pose
        .get(PoseLandmark::RightWrist)
        .distance_2d(&pose.get(PoseLandmark::RightElbow));
    let travel = left + right;

    if travel < MINIMAL_HAND_TRAVEL {
        HandMovement::Minimal
    } else if travel < MODERATE_HAND_TRAVEL {
        HandMovement::Moderate
    } else {
        HandMovement::Excessive
    }
}

pub fn classify_facial_engagement(pose: &LandmarkSet) -> FacialEngagement {
    let visibility = [
        PoseLandmark::Nose,
        PoseLandmark::LeftEye,
        PoseLandmark::RightEye,
    ]
    .map(|lm| pose.get(lm).visibility);
    let mean = visibility.iter().sum::<f32>() / visibility.len() as f32;

    if mean > HIGH_FACE_VISIBILITY {
        FacialEngagement::High
    } else if mean > MODERATE_FACE_VISIBILITY {
        FacialEngagement::Moderate
    } else {
        FacialEngagement::Low
    }
}

fn arm_angle(shoulder: Landmark, elbow: Landmark) -> f32 {
    (elbow.y - shoulder.y).atan2(elbow.x - shoulder.x)
}

/// Arms angled to opposite sides read as open; a zero angle counts as closed.
pub fn classify_body_language(pose: &LandmarkSet) -> BodyLanguage {
    let left = arm_angle(
        pose.get(PoseLandmark::LeftShoulder),
        pose.get(PoseLandmark::LeftElbow),
    );
    let right = arm_angle(
        pose.get(PoseLandmark::RightShoulder),
        pose.get(PoseLandmark::RightElbow),
    );
    if left * right < 0.0 {
        BodyLanguage::Open
    } else {
        BodyLanguage::Closed
    }
}

pub fn classify_pose(pose: &LandmarkSet) -> GestureSample {
    GestureSample {
        posture: classify_posture(pose),
        hand_movement: classify_hand_movement(pose),
        facial_engagement: classify_facial_engagement(pose),
        body_language: classify_body_language(pose),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pose(points: &[(PoseLandmark, Landmark)]) -> LandmarkSet {
        let mut set = LandmarkSet::default();
        for (lm, point) in points {
            set.set(*lm, *point);
        }
        set
    }

    #[test]
    fn level_shoulders_are_good_posture() {
        let p = pose(&[
            (PoseLandmark::LeftShoulder, Landmark::new(0.6, 0.40, 1.0)),
            (PoseLandmark::RightShoulder, Landmark::new(0.4, 0.43, 1.0)),
        ]);
        assert_eq!(classify_posture(&p), Posture::Good);

        let p = pose(&[
            (PoseLandmark::LeftShoulder, Landmark::new(0.6, 0.40, 1.0)),
            (PoseLandmark::RightShoulder, Landmark::new(0.4, 0.46, 1.0)),
        ]);
        assert_eq!(classify_posture(&p), Posture::Poor);
    }

    #[test]
    fn hand_travel_buckets() {
        let arms = |reach: f32| {
            pose(&[
                (PoseLandmark::LeftElbow, Landmark::new(0.7, 0.6, 1.0)),
                (PoseLandmark::LeftWrist, Landmark::new(0.7, 0.6 + reach, 1.0)),
                (PoseLandmark::RightElbow, Landmark::new(0.3, 0.6, 1.0)),
                (PoseLandmark::RightWrist, Landmark::new(0.3, 0.6 + reach, 1.0)),
            ])
        };
        assert_eq!(classify_hand_movement(&arms(0.05)), HandMovement::Minimal);
        assert_eq!(classify_hand_movement(&arms(0.15)), HandMovement::Moderate);
        assert_eq!(classify_hand_movement(&arms(0.3)), HandMovement::Excessive);
    }

    #[test]
    fn face_visibility_buckets() {
        let face = |v: f32| {
            pose(&[
                (PoseLandmark::Nose, Landmark::new(0.5, 0.2, v)),
                (PoseLandmark::LeftEye, Landmark::new(0.52, 0.18, v)),
                (PoseLandmark::RightEye, Landmark::new(0.48, 0.18, v)),
            ])
        };
        assert_eq!(classify_facial_engagement(&face(0.95)), FacialEngagement::High);
        assert_eq!(classify_facial_engagement(&face(0.7)), FacialEngagement::Moderate);
        assert_eq!(classify_facial_engagement(&face(0.5)), FacialEngagement::Low);
    }

    #[test]
    fn arm_angle_signs_decide_openness() {
        // Left elbow below and outward, right elbow above and outward.
        let open = pose(&[
            (PoseLandmark::LeftShoulder, Landmark::new(0.6, 0.4, 1.0)),
            (PoseLandmark::LeftElbow, Landmark::new(0.7, 0.55, 1.0)),
            (PoseLandmark::RightShoulder, Landmark::new(0.4, 0.4, 1.0)),
            (PoseLandmark::RightElbow, Landmark::new(0.3, 0.3, 1.0)),
        ]);
        assert_eq!(classify_body_language(&open), BodyLanguage::Open);

        let closed = pose(&[
            (PoseLandmark::LeftShoulder, Landmark::new(0.6, 0.4, 1.0)),
            (PoseLandmark::LeftElbow, Landmark::new(0.65, 0.55, 1.0)),
            (PoseLandmark::RightShoulder, Landmark::new(0.4, 0.4, 1.0)),
            (PoseLandmark::RightElbow, Landmark::new(0.35, 0.55, 1.0)),
        ]);
        assert_eq!(classify_body_language(&closed), BodyLanguage::Closed);

        // Default pose has every point at the origin: atan2(0, 0) == 0.
        assert_eq!(classify_body_language(&LandmarkSet::default()), BodyLanguage::Closed);
    }
}
