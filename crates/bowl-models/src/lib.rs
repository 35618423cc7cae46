//! Shared data models for the bowling overlay pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - The 12 bowling joints tracked by the overlay
//! - Coach phase verdicts
//! - Per-phase feedback sets and the phase timeline descriptor
//! - Transcoding and thumbnail encoding profiles

pub mod encoding;
pub mod feedback;
pub mod joint;
pub mod verdict;

pub use encoding::TranscodeProfile;
pub use feedback::{FeedbackCategory, FeedbackSet, Phase, PhaseTimeline, TimelineError};
pub use joint::{Joint, JointParseError, POSE_LANDMARK_COUNT};
pub use verdict::{PhaseVerdict, VerdictStatus};
