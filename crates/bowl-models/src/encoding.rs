//! Overlay encoding configuration.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Default video codec (H.264)
pub const DEFAULT_VIDEO_CODEC: &str = "libx264";
/// Default encoding preset
pub const DEFAULT_PRESET: &str = "fast";
/// CRF for the mobile overlay. Higher than a clip render; the overlay is a
/// coaching aid, not a keepsake.
pub const DEFAULT_CRF: u8 = 28;
/// Output width; height follows the aspect ratio, rounded to even.
pub const DEFAULT_SCALE_WIDTH: u32 = 480;

/// Thumbnail generation settings
pub const THUMBNAIL_SCALE_WIDTH: u32 = 320;
pub const THUMBNAIL_TIMESTAMP: &str = "00:00:01";

/// Fixed argument profile for the overlay transcode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TranscodeProfile {
    /// Video codec (e.g., "libx264")
    #[serde(default = "default_video_codec")]
    pub codec: String,

    /// Encoding preset (e.g., "fast", "medium")
    #[serde(default = "default_preset")]
    pub preset: String,

    /// Constant Rate Factor (quality, 0-51, lower is better)
    #[serde(default = "default_crf")]
    pub crf: u8,

    /// Output width in pixels
    #[serde(default = "default_scale_width")]
    pub scale_width: u32,
}

fn default_video_codec() -> String {
    DEFAULT_VIDEO_CODEC.to_string()
}
fn default_preset() -> String {
    DEFAULT_PRESET.to_string()
}
fn default_crf() -> u8 {
    DEFAULT_CRF
}
fn default_scale_width() -> u32 {
    DEFAULT_SCALE_WIDTH
}

impl Default for TranscodeProfile {
    fn default() -> Self {
        Self {
            codec: DEFAULT_VIDEO_CODEC.to_string(),
            preset: DEFAULT_PRESET.to_string(),
            crf: DEFAULT_CRF,
            scale_width: DEFAULT_SCALE_WIDTH,
        }
    }
}

impl TranscodeProfile {
    /// Scale filter keeping aspect ratio with an even height.
    pub fn scale_filter(&self) -> String {
        format!("scale={}:-2", self.scale_width)
    }

    /// Convert to FFmpeg output arguments.
    pub fn to_ffmpeg_args(&self) -> Vec<String> {
        vec![
            "-c:v".to_string(),
            self.codec.clone(),
            "-crf".to_string(),
            self.crf.to_string(),
            "-vf".to_string(),
            self.scale_filter(),
            "-preset".to_string(),
            self.preset.clone(),
            "-pix_fmt".to_string(),
            "yuv420p".to_string(),
            "-movflags".to_string(),
            "+faststart".to_string(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_profile() {
        let profile = TranscodeProfile::default();
        assert_eq!(profile.codec, "libx264");
        assert_eq!(profile.crf, 28);
        assert_eq!(profile.scale_filter(), "scale=480:-2");
    }

    #[test]
    fn test_ffmpeg_args() {
        let args = TranscodeProfile::default().to_ffmpeg_args();
        let pos = args.iter().position(|a| a == "-crf").unwrap();
        assert_eq!(args[pos + 1], "28");
        assert!(args.contains(&"fast".to_string()));
        assert!(args.contains(&"scale=480:-2".to_string()));
    }

    #[test]
    fn test_partial_profile_uses_defaults() {
        let profile: TranscodeProfile = serde_json::from_str(r#"{"crf": 23}"#).unwrap();
        assert_eq!(profile.crf, 23);
        assert_eq!(profile.preset, "fast");
    }
}
