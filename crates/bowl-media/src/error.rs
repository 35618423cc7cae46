//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

use bowl_models::TimelineError;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur during media processing.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFprobe not found in PATH")]
    FfprobeNotFound,

    #[error("FFmpeg command failed: {message}")]
    FfmpegFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("FFprobe command failed: {message}")]
    FfprobeFailed {
        message: String,
        stderr: Option<String>,
    },

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Invalid video file: {0}")]
    InvalidVideo(String),

    #[error("Invalid phase timeline: {0}")]
    InvalidTimeline(#[from] TimelineError),

    #[error("Pose estimator unavailable: {0}")]
    PoseUnavailable(String),

    #[error("Pose estimation failed: {0}")]
    PoseFailed(String),

    #[error("Frame read failed: {0}")]
    FrameRead(String),

    #[error("Frame write failed: {0}")]
    FrameWrite(String),

    #[error("Output not created: {0}")]
    OutputMissing(PathBuf),

    #[error("Output {path} is implausibly small ({size} bytes, minimum {min_bytes})")]
    OutputTooSmall {
        path: PathBuf,
        size: u64,
        min_bytes: u64,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MediaError {
    /// Create an FFmpeg failure error.
    pub fn ffmpeg_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    /// Create an invalid video error.
    pub fn invalid_video(message: impl Into<String>) -> Self {
        Self::InvalidVideo(message.into())
    }

    /// Create a pose estimation failure error.
    pub fn pose_failed(message: impl Into<String>) -> Self {
        Self::PoseFailed(message.into())
    }

    pub fn frame_read(message: impl Into<String>) -> Self {
        Self::FrameRead(message.into())
    }

    pub fn frame_write(message: impl Into<String>) -> Self {
        Self::FrameWrite(message.into())
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}
