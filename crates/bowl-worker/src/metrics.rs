//! Overlay metrics.

use metrics::{counter, histogram};

use crate::error::ErrorKind;

/// Metric names as constants for consistency.
pub mod names {
    pub const RENDERS_STARTED_TOTAL: &str = "bowl_overlay_renders_started_total";
    pub const RENDERS_COMPLETED_TOTAL: &str = "bowl_overlay_renders_completed_total";
    pub const RENDERS_SKIPPED_TOTAL: &str = "bowl_overlay_renders_skipped_total";
    pub const RENDERS_FAILED_TOTAL: &str = "bowl_overlay_renders_failed_total";
    pub const FRAMES_WRITTEN_TOTAL: &str = "bowl_overlay_frames_written_total";
    pub const RENDER_DURATION_SECONDS: &str = "bowl_overlay_render_duration_seconds";
    pub const TRANSCODE_DURATION_SECONDS: &str = "bowl_overlay_transcode_duration_seconds";
    pub const VERDICT_DURATION_SECONDS: &str = "bowl_verdict_duration_seconds";
}

pub fn record_render_started() {
    counter!(names::RENDERS_STARTED_TOTAL).increment(1);
}

pub fn record_render_completed(duration_secs: f64) {
    counter!(names::RENDERS_COMPLETED_TOTAL).increment(1);
    histogram!(names::RENDER_DURATION_SECONDS).record(duration_secs);
}

/// Record a render that produced no artifact without failing.
pub fn record_render_skipped(reason: &'static str) {
    counter!(names::RENDERS_SKIPPED_TOTAL, "reason" => reason).increment(1);
}

pub fn record_render_failed(kind: ErrorKind) {
    counter!(names::RENDERS_FAILED_TOTAL, "kind" => kind.as_str()).increment(1);
}

pub fn record_frames_written(frames: u64) {
    counter!(names::FRAMES_WRITTEN_TOTAL).increment(frames);
}

pub fn record_transcode_duration(duration_secs: f64) {
    histogram!(names::TRANSCODE_DURATION_SECONDS).record(duration_secs);
}

pub fn record_verdict_duration(duration_secs: f64) {
    histogram!(names::VERDICT_DURATION_SECONDS).record(duration_secs);
}
