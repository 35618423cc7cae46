//! Bowling joint enumeration.
//!
//! The pose estimator reports 33 landmarks (BlazePose topology). Only the
//! 12 limb joints below matter for bowling feedback; every other landmark
//! is discarded before rendering.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Number of landmarks in the pose estimator's vocabulary.
pub const POSE_LANDMARK_COUNT: usize = 33;

/// A tracked bowling joint.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Joint {
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
}

impl Joint {
    /// All rendered joints, in landmark order.
    pub const ALL: [Joint; 12] = [
        Joint::LeftShoulder,
        Joint::RightShoulder,
        Joint::LeftElbow,
        Joint::RightElbow,
        Joint::LeftWrist,
        Joint::RightWrist,
        Joint::LeftHip,
        Joint::RightHip,
        Joint::LeftKnee,
        Joint::RightKnee,
        Joint::LeftAnkle,
        Joint::RightAnkle,
    ];

    /// Index of this joint in the 33-landmark pose vocabulary.
    pub fn landmark_index(&self) -> usize {
        match self {
            Joint::LeftShoulder => 11,
            Joint::RightShoulder => 12,
            Joint::LeftElbow => 13,
            Joint::RightElbow => 14,
            Joint::LeftWrist => 15,
            Joint::RightWrist => 16,
            Joint::LeftHip => 23,
            Joint::RightHip => 24,
            Joint::LeftKnee => 25,
            Joint::RightKnee => 26,
            Joint::LeftAnkle => 27,
            Joint::RightAnkle => 28,
        }
    }

    /// Reverse lookup from a landmark index. Returns `None` for the 21
    /// landmarks that are not rendered (face, hands, feet).
    pub fn from_landmark_index(index: usize) -> Option<Joint> {
        Joint::ALL
            .iter()
            .copied()
            .find(|j| j.landmark_index() == index)
    }

    /// Landmark name as used in feedback descriptors.
    pub fn as_str(&self) -> &'static str {
        match self {
            Joint::LeftShoulder => "LEFT_SHOULDER",
            Joint::RightShoulder => "RIGHT_SHOULDER",
            Joint::LeftElbow => "LEFT_ELBOW",
            Joint::RightElbow => "RIGHT_ELBOW",
            Joint::LeftWrist => "LEFT_WRIST",
            Joint::RightWrist => "RIGHT_WRIST",
            Joint::LeftHip => "LEFT_HIP",
            Joint::RightHip => "RIGHT_HIP",
            Joint::LeftKnee => "LEFT_KNEE",
            Joint::RightKnee => "RIGHT_KNEE",
            Joint::LeftAnkle => "LEFT_ANKLE",
            Joint::RightAnkle => "RIGHT_ANKLE",
        }
    }
}

impl fmt::Display for Joint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Joint {
    type Err = JointParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        Joint::ALL
            .iter()
            .copied()
            .find(|j| j.as_str() == upper)
            .ok_or_else(|| JointParseError(s.to_string()))
    }
}

#[derive(Debug, Error)]
#[error("Unknown joint: {0}")]
pub struct JointParseError(String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_landmark_index_roundtrip() {
        for joint in Joint::ALL {
            assert_eq!(Joint::from_landmark_index(joint.landmark_index()), Some(joint));
        }
        // Nose and the foot landmarks are not rendered
        assert_eq!(Joint::from_landmark_index(0), None);
        assert_eq!(Joint::from_landmark_index(31), None);
    }

    #[test]
    fn test_indices_within_vocabulary() {
        assert!(Joint::ALL
            .iter()
            .all(|j| j.landmark_index() < POSE_LANDMARK_COUNT));
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("right_elbow".parse::<Joint>().unwrap(), Joint::RightElbow);
        assert_eq!(" LEFT_KNEE ".parse::<Joint>().unwrap(), Joint::LeftKnee);
        assert!("NOSE".parse::<Joint>().is_err());
    }

    #[test]
    fn test_serde_uses_landmark_names() {
        let json = serde_json::to_string(&Joint::RightWrist).unwrap();
        assert_eq!(json, "\"RIGHT_WRIST\"");
        let parsed: Joint = serde_json::from_str("\"LEFT_HIP\"").unwrap();
        assert_eq!(parsed, Joint::LeftHip);
    }
}
