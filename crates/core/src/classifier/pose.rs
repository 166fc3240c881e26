use crate::classifier::ClassifierError;
use serde::{Deserialize, Serialize};

/// Size of the body model produced by the pose capability.
pub const POSE_LANDMARK_COUNT: usize = 33;

/// The landmarks the gesture classifiers read, by index in the 33-point model.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PoseLandmark {
    Nose = 0,
    LeftEye = 2,
    RightEye = 5,
    LeftShoulder = 11,
    RightShoulder = 12,
    LeftElbow = 13,
    RightElbow = 14,
    LeftWrist = 15,
    RightWrist = 16,
}

fn full_visibility() -> f32 {
    1.0
}

/// Normalised image coordinates plus the model's visibility score.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: f32,
    #[serde(default = "full_visibility")]
    pub visibility: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32, visibility: f32) -> Self {
        Self {
            x,
            y,
            z: 0.0,
            visibility,
        }
    }

    pub fn distance_2d(&self, other: &Landmark) -> f32 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// A complete 33-point pose. Construction rejects any other point count.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Landmark>", into = "Vec<Landmark>")]
pub struct LandmarkSet {
    points: Vec<Landmark>,
}

impl LandmarkSet {
    pub fn from_points(points: Vec<Landmark>) -> Result<Self, ClassifierError> {
        if points.len() != POSE_LANDMARK_COUNT {
            return Err(ClassifierError::InvalidOutput(format!(
                "expected {POSE_LANDMARK_COUNT} pose landmarks, got {}",
                points.len()
            )));
        }
        Ok(Self { points })
    }

    pub fn get(&self, landmark: PoseLandmark) -> Landmark {
        self.points[landmark as usize]
    }

    pub fn set(&mut self, landmark: PoseLandmark, value: Landmark) {
        self.points[landmark as usize] = value;
    }

    pub fn points(&self) -> &[Landmark] {
        &self.points
    }
}

impl Default for LandmarkSet {
    fn default() -> Self {
        Self {
            points: vec![Landmark::default(); POSE_LANDMARK_COUNT],
        }
    }
}

impl TryFrom<Vec<Landmark>> for LandmarkSet {
    type Error = ClassifierError;

    fn try_from(points: Vec<Landmark>) -> Result<Self, Self::Error> {
        Self::from_points(points)
    }
}

impl From<LandmarkSet> for Vec<Landmark> {
    fn from(set: LandmarkSet) -> Self {
        set.points
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_wrong_point_count() {
        let err = LandmarkSet::from_points(vec![Landmark::default(); 21]).unwrap_err();
        assert!(matches!(err, ClassifierError::InvalidOutput(_)));
        assert!(LandmarkSet::from_points(vec![Landmark::default(); 33]).is_ok());
    }

    #[test]
    fn named_landmarks_index_the_body_model() {
        let mut set = LandmarkSet::default();
        set.set(PoseLandmark::RightWrist, Landmark::new(0.4, 0.6, 0.9));
        assert_eq!(set.points()[16], Landmark::new(0.4, 0.6, 0.9));
        assert_eq!(set.get(PoseLandmark::RightWrist).visibility, 0.9);
    }

    #[test]
    fn deserialize_defaults_visibility_and_checks_length() {
        let one = r#"{"x":0.5,"y":0.25}"#;
        let json = format!("[{}]", vec![one; 33].join(","));
        let set: LandmarkSet = serde_json::from_str(&json).expect("33 points");
        assert_eq!(set.get(PoseLandmark::Nose).visibility, 1.0);

        let short = format!("[{}]", vec![one; 3].join(","));
        assert!(serde_json::from_str::<LandmarkSet>(&short).is_err());
    }
}
