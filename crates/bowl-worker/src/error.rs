//! Worker error types.
//!
//! Everything below the orchestrator reports [`MediaError`]; it is folded
//! into the caller-facing kinds here. An unavailable pose capability is not
//! an error at all: the pipeline returns `Ok(None)`.

use serde::Serialize;
use thiserror::Error;

use bowl_media::MediaError;

pub type WorkerResult<T> = Result<T, WorkerError>;

/// Caller-facing failure class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    MalformedInput,
    ExternalToolFailure,
    Timeout,
    IntegrityFailure,
    VerdictSource,
    Config,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::MalformedInput => "malformed_input",
            ErrorKind::ExternalToolFailure => "external_tool_failure",
            ErrorKind::Timeout => "timeout",
            ErrorKind::IntegrityFailure => "integrity_failure",
            ErrorKind::VerdictSource => "verdict_source",
            ErrorKind::Config => "config",
            ErrorKind::Internal => "internal",
        }
    }
}

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("External tool failed: {message}")]
    ExternalTool {
        message: String,
        stderr: Option<String>,
    },

    #[error("Timed out after {0} seconds")]
    Timeout(u64),

    #[error("Integrity check failed: {0}")]
    Integrity(String),

    #[error("Verdict source failed: {0}")]
    VerdictSource(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl WorkerError {
    pub fn malformed_input(msg: impl Into<String>) -> Self {
        Self::MalformedInput(msg.into())
    }

    pub fn verdict_source(msg: impl Into<String>) -> Self {
        Self::VerdictSource(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            WorkerError::MalformedInput(_) => ErrorKind::MalformedInput,
            WorkerError::ExternalTool { .. } => ErrorKind::ExternalToolFailure,
            WorkerError::Timeout(_) => ErrorKind::Timeout,
            WorkerError::Integrity(_) => ErrorKind::IntegrityFailure,
            WorkerError::VerdictSource(_) => ErrorKind::VerdictSource,
            WorkerError::ConfigError(_) => ErrorKind::Config,
            WorkerError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Short message safe to show to the bowler.
    pub fn user_message(&self) -> &'static str {
        match self.kind() {
            ErrorKind::MalformedInput => "The video could not be read. Try recording the delivery again.",
            ErrorKind::ExternalToolFailure => "Overlay encoding failed.",
            ErrorKind::Timeout => "Overlay generation took too long.",
            ErrorKind::IntegrityFailure => "The overlay video came out corrupted.",
            ErrorKind::VerdictSource => "Coaching analysis is unavailable right now.",
            ErrorKind::Config | ErrorKind::Internal => "Something went wrong generating the overlay.",
        }
    }

    /// FFmpeg stderr tail, when the failure came from an external tool.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            WorkerError::ExternalTool { stderr, .. } => stderr.as_deref(),
            _ => None,
        }
    }
}

impl From<MediaError> for WorkerError {
    fn from(err: MediaError) -> Self {
        match err {
            MediaError::FfmpegFailed {
                message, stderr, ..
            } => WorkerError::ExternalTool { message, stderr },
            MediaError::FfprobeFailed { message, stderr } => WorkerError::ExternalTool { message, stderr },
            e @ (MediaError::FfmpegNotFound
            | MediaError::FfprobeNotFound
            | MediaError::PoseFailed(_)
            | MediaError::FrameWrite(_)) => WorkerError::ExternalTool {
                message: e.to_string(),
                stderr: None,
            },
            MediaError::Timeout(secs) => WorkerError::Timeout(secs),
            e @ (MediaError::InvalidVideo(_)
            | MediaError::InvalidTimeline(_)
            | MediaError::FrameRead(_)
            | MediaError::FileNotFound(_)
            | MediaError::JsonParse(_)) => WorkerError::MalformedInput(e.to_string()),
            e @ (MediaError::OutputMissing(_) | MediaError::OutputTooSmall { .. }) => {
                WorkerError::Integrity(e.to_string())
            }
            e @ (MediaError::Cancelled
            | MediaError::Io(_)
            | MediaError::PoseUnavailable(_)
            | MediaError::Internal(_)) => WorkerError::Internal(e.to_string()),
        }
    }
}

impl From<std::io::Error> for WorkerError {
    fn from(err: std::io::Error) -> Self {
        WorkerError::Internal(format!("IO error: {err}"))
    }
}
