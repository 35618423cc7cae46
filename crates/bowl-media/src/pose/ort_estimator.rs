//! ONNX Runtime pose landmark inference.
//!
//! Runs a BlazePose-style full-body landmark model on the whole frame:
//! - OpenCV delivers frames as BGR; they are converted to RGB and resized
//!   to the square model input without letterboxing.
//! - Input is NHWC float in [0, 1].
//! - Landmark output rows are `x, y, z, visibility, presence` with x/y in
//!   input pixels and visibility as a logit.

use std::path::Path;
use std::sync::Mutex;

use opencv::core::{Mat, Size};
use opencv::imgproc;
use opencv::prelude::{MatTraitConst, MatTraitConstManual};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::{Tensor, Value};
use tracing::debug;

use super::{Landmark, PoseEstimator, PoseLandmarks, PoseModelConfig};
use crate::error::{MediaError, MediaResult};
use bowl_models::POSE_LANDMARK_COUNT;

/// Values per landmark row in the model output.
const LANDMARK_STRIDE: usize = 5;

/// Pose estimator over OpenCV frames.
pub struct OrtPoseEstimator {
    session: Mutex<Session>,
    config: PoseModelConfig,
}

impl OrtPoseEstimator {
    pub fn load(model_path: &Path, config: PoseModelConfig) -> MediaResult<Self> {
        if !model_path.exists() {
            return Err(MediaError::PoseUnavailable(format!(
                "pose model not found at {}",
                model_path.display()
            )));
        }

        let model_bytes = std::fs::read(model_path)?;

        let session = Session::builder()
            .map_err(|e| MediaError::PoseUnavailable(format!("ORT session builder: {e}")))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| MediaError::PoseUnavailable(format!("ORT opt level: {e}")))?
            .commit_from_memory(model_bytes.as_slice())
            .map_err(|e| MediaError::PoseUnavailable(format!("ORT load model: {e}")))?;

        debug!(model = %model_path.display(), "Loaded pose landmark model");

        Ok(Self {
            session: Mutex::new(session),
            config,
        })
    }

    fn infer(&self, frame_bgr: &Mat) -> MediaResult<Option<PoseLandmarks>> {
        let edge = self.config.input_size as i32;

        let mut rgb = Mat::default();
        imgproc::cvt_color(
            frame_bgr,
            &mut rgb,
            imgproc::COLOR_BGR2RGB,
            0,
            opencv::core::AlgorithmHint::ALGO_HINT_DEFAULT,
        )
        .map_err(|e| MediaError::pose_failed(format!("BGR2RGB failed: {e}")))?;

        let mut resized = Mat::default();
        imgproc::resize(
            &rgb,
            &mut resized,
            Size::new(edge, edge),
            0.0,
            0.0,
            imgproc::INTER_LINEAR,
        )
        .map_err(|e| MediaError::pose_failed(format!("Resize failed: {e}")))?;

        let tensor = mat_to_nhwc_tensor(&resized)?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| MediaError::pose_failed("ORT session poisoned"))?;

        let outputs = session
            .run(ort::inputs![tensor])
            .map_err(|e| MediaError::pose_failed(format!("ORT run failed: {e}")))?;

        let presence = match outputs.get(self.config.presence_output.as_str()) {
            Some(value) => first_scalar(value)?,
            None => 1.0,
        };
        if presence < self.config.presence_threshold {
            return Ok(None);
        }

        let landmarks = outputs
            .get(self.config.landmarks_output.as_str())
            .ok_or_else(|| MediaError::pose_failed("ORT returned no landmark output"))?;

        extract_landmarks(landmarks, self.config.input_size as f32)
    }
}

impl PoseEstimator<Mat> for OrtPoseEstimator {
    fn estimate(&mut self, frame: &Mat) -> MediaResult<Option<PoseLandmarks>> {
        self.infer(frame)
    }
}

/// Convert an RGB HxWx3 Mat to a (1, H, W, 3) tensor in [0, 1].
fn mat_to_nhwc_tensor(mat_rgb: &Mat) -> MediaResult<Value> {
    let size = mat_rgb
        .size()
        .map_err(|e| MediaError::pose_failed(format!("Mat size: {e}")))?;
    if mat_rgb.channels() != 3 {
        return Err(MediaError::pose_failed("Expected 3-channel RGB Mat"));
    }

    let data = mat_rgb
        .data_typed::<u8>()
        .map_err(|e| MediaError::pose_failed(format!("Mat data: {e}")))?;

    let nhwc: Vec<f32> = data.iter().map(|v| *v as f32 / 255.0).collect();

    let shape = vec![1usize, size.height as usize, size.width as usize, 3];
    Tensor::from_array((shape, nhwc.into_boxed_slice()))
        .map(Value::from)
        .map_err(|e| MediaError::pose_failed(format!("ORT tensor: {e}")))
}

fn first_scalar(value: &Value) -> MediaResult<f32> {
    let (_, data) = value
        .try_extract_tensor::<f32>()
        .map_err(|e| MediaError::pose_failed(format!("ORT extract: {e}")))?;
    data.first()
        .copied()
        .ok_or_else(|| MediaError::pose_failed("Empty presence output"))
}

fn extract_landmarks(output: &Value, input_size: f32) -> MediaResult<Option<PoseLandmarks>> {
    let (_, data) = output
        .try_extract_tensor::<f32>()
        .map_err(|e| MediaError::pose_failed(format!("ORT extract: {e}")))?;

    // Accept [1, 195], [1, 39, 5] or [39, 5]; only the row layout matters
    if data.len() < POSE_LANDMARK_COUNT * LANDMARK_STRIDE {
        return Err(MediaError::pose_failed(format!(
            "Landmark output too short: {} values",
            data.len()
        )));
    }

    let points = data
        .chunks_exact(LANDMARK_STRIDE)
        .take(POSE_LANDMARK_COUNT)
        .map(|row| Landmark::new(row[0] / input_size, row[1] / input_size, sigmoid(row[3])))
        .collect();

    Ok(PoseLandmarks::new(points))
}

#[inline]
fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn landmark_tensor(values: Vec<f32>, shape: Vec<usize>) -> Value {
        Tensor::from_array((shape, values.into_boxed_slice()))
            .map(Value::from)
            .unwrap()
    }

    #[test]
    fn test_extract_landmarks_rows() {
        let rows = 39;
        let mut values = Vec::with_capacity(rows * LANDMARK_STRIDE);
        for i in 0..rows {
            let visibility_logit = if i % 2 == 0 { 10.0 } else { -10.0 };
            values.extend([i as f32 * 2.0, 128.0, 0.0, visibility_logit, 1.0]);
        }

        let output = landmark_tensor(values, vec![1, rows, LANDMARK_STRIDE]);
        let pose = extract_landmarks(&output, 256.0).unwrap().unwrap();
        let points = pose.points();

        assert_eq!(points.len(), POSE_LANDMARK_COUNT);
        assert!((points[14].x - 28.0 / 256.0).abs() < 1e-6);
        assert!((points[14].y - 0.5).abs() < 1e-6);
        assert!(points[14].visibility > 0.99);
        assert!(points[13].visibility < 0.01);
    }

    #[test]
    fn test_extract_landmarks_short_output() {
        let output = landmark_tensor(vec![0.0; 10 * LANDMARK_STRIDE], vec![1, 10 * LANDMARK_STRIDE]);
        assert!(matches!(
            extract_landmarks(&output, 256.0),
            Err(MediaError::PoseFailed(_))
        ));
    }

    #[test]
    fn test_sigmoid() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-6);
        assert!(sigmoid(8.0) > 0.99);
        assert!(sigmoid(-8.0) < 0.01);
    }
}
