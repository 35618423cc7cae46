//! Worker configuration.

use std::path::PathBuf;
use std::time::Duration;

use bowl_media::overlay::DEFAULT_MIN_OUTPUT_BYTES;
use bowl_media::{detect_capability, PoseCapability};

/// Overlay worker configuration.
#[derive(Debug, Clone)]
pub struct OverlayConfig {
    /// Master switch for overlay generation
    pub enable_overlay: bool,
    /// Maximum renders running at once
    pub max_concurrent_renders: usize,
    /// How long a caller waits for one render
    pub render_timeout: Duration,
    /// Wall-clock bound for the web transcode
    pub transcode_timeout: Duration,
    /// How long a caller waits for phase verdicts
    pub analysis_timeout: Duration,
    /// Parent directory for per-render workspaces
    pub work_dir: PathBuf,
    /// Where the local artifact sink stores finished overlays
    pub artifact_dir: PathBuf,
    /// Public URL prefix for stored artifacts
    pub artifact_base_url: Option<String>,
    /// Optional replacement for the built-in joint mapping table
    pub joint_map_path: Option<PathBuf>,
    /// Clip length used when probing yields none
    pub default_clip_secs: f64,
    /// Smallest plausible rendered file; 0 means the built-in default
    pub min_output_bytes: u64,
    /// Pose estimation capability, decided once at startup
    pub pose: PoseCapability,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            enable_overlay: true,
            max_concurrent_renders: 2,
            render_timeout: Duration::from_secs(300),
            transcode_timeout: Duration::from_secs(120),
            analysis_timeout: Duration::from_secs(500),
            work_dir: PathBuf::from("/tmp/bowl-overlay"),
            artifact_dir: PathBuf::from("artifacts"),
            artifact_base_url: None,
            joint_map_path: None,
            default_clip_secs: 5.0,
            min_output_bytes: 1000,
            pose: PoseCapability::unavailable("not configured"),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
}

impl OverlayConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let pose_model_path = std::env::var("POSE_MODEL_PATH").ok().map(PathBuf::from);

        Self {
            enable_overlay: env_bool("ENABLE_OVERLAY").unwrap_or(defaults.enable_overlay),
            max_concurrent_renders: env_parse::<usize>("OVERLAY_MAX_RENDERS")
                .filter(|n| *n > 0)
                .unwrap_or(defaults.max_concurrent_renders),
            render_timeout: env_parse("OVERLAY_RENDER_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.render_timeout),
            transcode_timeout: env_parse("OVERLAY_TRANSCODE_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.transcode_timeout),
            analysis_timeout: env_parse("ANALYSIS_TIMEOUT")
                .map(Duration::from_secs)
                .unwrap_or(defaults.analysis_timeout),
            work_dir: std::env::var("OVERLAY_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            artifact_dir: std::env::var("OVERLAY_ARTIFACT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.artifact_dir),
            artifact_base_url: std::env::var("OVERLAY_ARTIFACT_BASE_URL").ok(),
            joint_map_path: std::env::var("OVERLAY_JOINT_MAP_PATH").ok().map(PathBuf::from),
            default_clip_secs: env_parse::<f64>("OVERLAY_DEFAULT_CLIP_SECS")
                .filter(|d| d.is_finite() && *d > 0.0)
                .unwrap_or(defaults.default_clip_secs),
            min_output_bytes: env_parse("OVERLAY_MIN_OUTPUT_BYTES")
                .unwrap_or(defaults.min_output_bytes),
            pose: detect_capability(pose_model_path.as_deref()),
        }
    }

    /// Overlay generation is enabled and pose estimation can run.
    pub fn overlay_available(&self) -> bool {
        self.enable_overlay && self.pose.is_available()
    }

    /// Size floor applied to rendered and transcoded files.
    pub fn min_output_bytes(&self) -> u64 {
        if self.min_output_bytes == 0 {
            DEFAULT_MIN_OUTPUT_BYTES
        } else {
            self.min_output_bytes
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = OverlayConfig::default();
        assert_eq!(config.transcode_timeout, Duration::from_secs(120));
        assert_eq!(config.min_output_bytes, 1000);
        assert!((config.default_clip_secs - 5.0).abs() < f64::EPSILON);
        assert!(!config.overlay_available());
    }

    #[test]
    fn test_zero_min_output_bytes_keeps_floor() {
        let config = OverlayConfig {
            min_output_bytes: 0,
            ..Default::default()
        };
        assert_eq!(config.min_output_bytes(), DEFAULT_MIN_OUTPUT_BYTES);

        let config = OverlayConfig {
            min_output_bytes: 4096,
            ..Default::default()
        };
        assert_eq!(config.min_output_bytes(), 4096);
    }

    #[test]
    fn test_available_requires_switch() {
        let config = OverlayConfig {
            enable_overlay: false,
            pose: PoseCapability::Available {
                model_path: PathBuf::from("pose_landmark_full.onnx"),
            },
            ..Default::default()
        };
        assert!(!config.overlay_available());
    }
}
