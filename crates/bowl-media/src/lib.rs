//! Media layer for the bowling overlay.
//!
//! This crate provides:
//! - Rotation and stream probing via FFprobe
//! - The phase-to-joint feedback map and the per-frame overlay renderer
//! - Frame source/sink traits with OpenCV implementations (`opencv` feature)
//! - Pose landmark inference via ONNX Runtime (`opencv` feature)
//! - FFmpeg transcoding and thumbnail extraction
//!
//! # Features
//!
//! `opencv` is opt-in: it needs a system OpenCV install and pulls in ONNX
//! Runtime. A default build can read stream metadata, plan phases and
//! transcode, but [`default_backend`] returns `None` and [`detect_capability`] reports
//! pose estimation as unavailable, so overlays are skipped. Build the
//! worker with `--features opencv` to render them.

pub mod command;
pub mod error;
pub mod frame;
pub mod fs_utils;
pub mod overlay;
pub mod pose;
pub mod probe;
pub mod progress;
pub mod rotation;
pub mod thumbnail;
pub mod transcode;

#[cfg(feature = "opencv")]
pub mod opencv_io;

pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use frame::{FrameSink, FrameSource, StreamInfo, VideoFrame};
pub use fs_utils::move_file;
pub use overlay::{
    default_backend, render_overlay, verify_output, FramePlan, JointMappingTable,
    OverlayRenderer, RenderBackend, RenderJob, RenderStats, RenderStyle,
};
pub use pose::{detect_capability, PoseCapability, PoseEstimator, PoseLandmarks, PoseModelConfig};
pub use probe::{probe_rotation, probe_video, VideoInfo};
pub use progress::FfmpegProgress;
pub use rotation::Rotation;
pub use thumbnail::generate_thumbnail;
pub use transcode::Transcoder;

#[cfg(feature = "opencv")]
pub use opencv_io::{OpenCvSink, OpenCvSource};
#[cfg(feature = "opencv")]
pub use pose::OrtPoseEstimator;
