//! Pose landmarks and the estimator capability.
//!
//! The overlay consumes pose estimation as an opaque capability: a frame in,
//! zero or one set of 33 normalized landmarks out. Whether the capability
//! exists is decided once at startup and carried as a [`PoseCapability`]
//! value; callers skip rendering when it is unavailable.

#[cfg(feature = "opencv")]
mod ort_estimator;

#[cfg(feature = "opencv")]
pub use ort_estimator::OrtPoseEstimator;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::MediaResult;
use bowl_models::{Joint, POSE_LANDMARK_COUNT};

/// One landmark in normalized frame coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Landmark {
    /// Horizontal position in [0, 1]
    pub x: f32,
    /// Vertical position in [0, 1]
    pub y: f32,
    /// Confidence that the landmark is visible, in [0, 1]
    pub visibility: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32, visibility: f32) -> Self {
        Self { x, y, visibility }
    }

    /// Pixel position in a frame of the given size (truncating).
    pub fn to_pixel(&self, width: u32, height: u32) -> (i32, i32) {
        (
            (self.x * width as f32) as i32,
            (self.y * height as f32) as i32,
        )
    }
}

/// Full landmark set for one detected person.
#[derive(Debug, Clone, PartialEq)]
pub struct PoseLandmarks {
    points: Vec<Landmark>,
}

impl PoseLandmarks {
    /// Wrap raw landmarks. Returns `None` unless all 33 are present.
    pub fn new(points: Vec<Landmark>) -> Option<Self> {
        (points.len() >= POSE_LANDMARK_COUNT).then(|| Self {
            points: points.into_iter().take(POSE_LANDMARK_COUNT).collect(),
        })
    }

    /// Build a landmark set from the tracked joints only; all other
    /// landmarks are marked invisible.
    pub fn from_joints(joints: impl IntoIterator<Item = (Joint, Landmark)>) -> Self {
        let mut points = vec![Landmark::default(); POSE_LANDMARK_COUNT];
        for (joint, landmark) in joints {
            points[joint.landmark_index()] = landmark;
        }
        Self { points }
    }

    pub fn get(&self, joint: Joint) -> Option<&Landmark> {
        self.points.get(joint.landmark_index())
    }

    /// The joint's landmark if its visibility reaches `min_visibility`.
    pub fn visible(&self, joint: Joint, min_visibility: f32) -> Option<&Landmark> {
        self.get(joint).filter(|lm| lm.visibility >= min_visibility)
    }

    pub fn points(&self) -> &[Landmark] {
        &self.points
    }
}

/// Frame-in, landmarks-out pose estimation over frames of type `F`.
pub trait PoseEstimator<F>: Send {
    /// Estimate the pose in one frame. `Ok(None)` means no person found.
    fn estimate(&mut self, frame: &F) -> MediaResult<Option<PoseLandmarks>>;
}

/// Landmark model parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoseModelConfig {
    /// Square input edge in pixels
    pub input_size: u32,
    /// Minimum pose presence score for a frame to count as detected
    pub presence_threshold: f32,
    /// Output holding landmarks (N x 5)
    pub landmarks_output: String,
    /// Output holding the presence score
    pub presence_output: String,
}

impl Default for PoseModelConfig {
    fn default() -> Self {
        Self {
            input_size: 256,
            presence_threshold: 0.5,
            landmarks_output: "Identity".to_string(),
            presence_output: "Identity_1".to_string(),
        }
    }
}

/// Whether pose estimation can run in this process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PoseCapability {
    Available { model_path: PathBuf },
    Unavailable { reason: String },
}

impl PoseCapability {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available { .. })
    }

    pub fn model_path(&self) -> Option<&Path> {
        match self {
            Self::Available { model_path } => Some(model_path),
            Self::Unavailable { .. } => None,
        }
    }
}

/// Decide the pose capability from the configured model path and the
/// compiled feature set.
pub fn detect_capability(model_path: Option<&Path>) -> PoseCapability {
    let capability = if !cfg!(feature = "opencv") {
        PoseCapability::unavailable("built without the `opencv` feature")
    } else {
        match model_path {
            None => PoseCapability::unavailable("POSE_MODEL_PATH not set"),
            Some(path) if !path.is_file() => PoseCapability::unavailable(format!(
                "pose model not found at {}",
                path.display()
            )),
            Some(path) => PoseCapability::Available {
                model_path: path.to_path_buf(),
            },
        }
    };

    match &capability {
        PoseCapability::Available { model_path } => {
            info!(model = %model_path.display(), "Pose estimation available")
        }
        PoseCapability::Unavailable { reason } => {
            warn!(reason = %reason, "Pose estimation unavailable, overlays will be skipped")
        }
    }

    capability
}
