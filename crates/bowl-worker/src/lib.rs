//! Delivery analysis and overlay worker.
//!
//! This crate provides:
//! - Worker configuration from the environment
//! - Phase verdict sources
//! - The overlay pipeline (bounded blocking renders, transcode, handoff)
//! - Artifact sinks
//! - The delivery session that streams report and overlay events
//!
//! Overlay rendering requires the `opencv` feature (forwarded to
//! `bowl-media`) and `POSE_MODEL_PATH`; without either, sessions still
//! deliver the coaching report and report the overlay as skipped.

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod session;
pub mod sink;
pub mod verdicts;

pub use config::OverlayConfig;
pub use error::{ErrorKind, WorkerError, WorkerResult};
pub use logging::RenderLogger;
pub use pipeline::{OverlayPipeline, RenderRequest};
pub use session::{analyze_delivery, AnalysisEvent, DeliveryRequest};
pub use sink::{ArtifactHandle, ArtifactSink, LocalArtifactSink};
pub use verdicts::{CoachingRequest, JsonVerdictSource, PhaseVerdictSource};
