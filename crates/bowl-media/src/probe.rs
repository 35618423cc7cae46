//! FFprobe video information and orientation metadata.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::{MediaError, MediaResult};
use crate::rotation::Rotation;

/// Video file information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoInfo {
    /// Duration in seconds
    pub duration: f64,
    /// Width in pixels (coded, before rotation)
    pub width: u32,
    /// Height in pixels (coded, before rotation)
    pub height: u32,
    /// Frame rate (fps)
    pub fps: f64,
    /// Number of frames, when the container reports it
    pub frame_count: Option<u64>,
    /// Video codec
    pub codec: String,
}

impl VideoInfo {
    /// Clip length in seconds, preferring the frame count over the
    /// container duration.
    pub fn clip_duration(&self) -> Option<f64> {
        let from_frames = self
            .frame_count
            .filter(|n| *n > 0 && self.fps > 0.0)
            .map(|n| n as f64 / self.fps);

        from_frames
            .or(Some(self.duration))
            .filter(|d| d.is_finite() && *d > 0.0)
    }
}

#[derive(Debug, Deserialize)]
struct ProbeReport {
    #[serde(default)]
    format: ProbeFormat,
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Default, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    nb_frames: Option<String>,
}

/// Run ffprobe with JSON output on `path` and return stdout.
async fn ffprobe_json(path: &Path, entries: &[&str]) -> MediaResult<Vec<u8>> {
    crate::command::check_ffprobe()?;

    let output = Command::new("ffprobe")
        .args(["-v", "error", "-of", "json"])
        .args(entries)
        .arg(path)
        .stdin(Stdio::null())
        .output()
        .await?;

    if output.status.success() {
        Ok(output.stdout)
    } else {
        Err(MediaError::FfprobeFailed {
            message: format!("ffprobe exited with {}", output.status),
            stderr: Some(String::from_utf8_lossy(&output.stderr).trim().to_string()),
        })
    }
}

/// Stream geometry, frame rate and length of the first video stream.
pub async fn probe_video(path: impl AsRef<Path>) -> MediaResult<VideoInfo> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }

    let stdout = ffprobe_json(path, &["-show_format", "-show_streams"]).await?;
    parse_probe_output(&stdout)
}

fn parse_probe_output(stdout: &[u8]) -> MediaResult<VideoInfo> {
    let report: ProbeReport = serde_json::from_slice(stdout)?;

    let stream = report
        .streams
        .into_iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| MediaError::invalid_video("no video stream"))?;

    let fps = [&stream.avg_frame_rate, &stream.r_frame_rate]
        .into_iter()
        .flatten()
        .find_map(|rate| parse_frame_rate(rate))
        .unwrap_or(0.0);

    Ok(VideoInfo {
        duration: report
            .format
            .duration
            .and_then(|d| d.parse().ok())
            .unwrap_or(0.0),
        width: stream.width.unwrap_or(0),
        height: stream.height.unwrap_or(0),
        fps,
        frame_count: stream.nb_frames.and_then(|n| n.parse().ok()),
        codec: stream.codec_name.unwrap_or_default(),
    })
}

/// Parse frame rate string (e.g., "30/1" or "29.97").
fn parse_frame_rate(s: &str) -> Option<f64> {
    if let Some((num, den)) = s.split_once('/') {
        let num: f64 = num.parse().ok()?;
        let den: f64 = den.parse().ok()?;
        if den > 0.0 && num > 0.0 {
            return Some(num / den);
        }
        return None;
    }
    s.parse().ok().filter(|v: &f64| *v > 0.0)
}

/// Read the display rotation of the first video stream.
///
/// Never fails: rotation only improves pose accuracy, so a missing tag, an
/// unusual angle, or a probe error all fall back to [`Rotation::None`].
pub async fn probe_rotation(path: impl AsRef<Path>) -> Rotation {
    let path = path.as_ref();

    let stdout = match ffprobe_json(
        path,
        &[
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream_tags=rotate:stream_side_data=rotation",
        ],
    )
    .await
    {
        Ok(stdout) => stdout,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Could not detect rotation, assuming 0°");
            return Rotation::None;
        }
    };

    let Some(raw) = parse_rotation_output(&stdout) else {
        debug!(path = %path.display(), "No rotation metadata");
        return Rotation::None;
    };

    match Rotation::from_degrees(raw) {
        Some(rotation) => {
            if rotation != Rotation::None {
                info!(raw, rotation = %rotation, "Detected rotation metadata");
            }
            rotation
        }
        None => {
            warn!(raw, "Rotation metadata is not a quarter turn, assuming 0°");
            Rotation::None
        }
    }
}

/// Extract raw rotation degrees from ffprobe JSON.
///
/// The legacy `rotate` tag wins over display-matrix side data when both are
/// present.
fn parse_rotation_output(stdout: &[u8]) -> Option<i64> {
    let json: Value = serde_json::from_slice(stdout).ok()?;
    let stream = json.get("streams")?.as_array()?.first()?;

    let from_tag = stream
        .get("tags")
        .and_then(|tags| tags.get("rotate"))
        .and_then(value_as_degrees);

    from_tag.or_else(|| {
        stream
            .get("side_data_list")?
            .as_array()?
            .iter()
            .find_map(|entry| entry.get("rotation").and_then(value_as_degrees))
    })
}

fn value_as_degrees(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64)),
        Value::String(s) => s.trim().parse::<f64>().ok().map(|f| f.round() as i64),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_frame_rate() {
        assert!((parse_frame_rate("30/1").unwrap() - 30.0).abs() < 0.01);
        assert!((parse_frame_rate("30000/1001").unwrap() - 29.97).abs() < 0.01);
        assert!((parse_frame_rate("29.97").unwrap() - 29.97).abs() < 0.01);
        assert_eq!(parse_frame_rate("0/0"), None);
    }

    #[test]
    fn test_rotation_from_side_data() {
        let json = br#"{"programs": [], "streams": [{"side_data_list": [{"rotation": -90}]}]}"#;
        assert_eq!(parse_rotation_output(json), Some(-90));
    }

    #[test]
    fn test_rotation_tag_wins() {
        let json = br#"{"streams": [{"tags": {"rotate": "90"}, "side_data_list": [{"rotation": -90}]}]}"#;
        assert_eq!(parse_rotation_output(json), Some(90));
    }

    #[test]
    fn test_rotation_missing() {
        assert_eq!(parse_rotation_output(br#"{"streams": [{}]}"#), None);
        assert_eq!(parse_rotation_output(br#"{"streams": []}"#), None);
        assert_eq!(parse_rotation_output(b"not json"), None);
    }

    #[test]
    fn test_parse_probe_output() {
        let json = br#"{
            "format": {"duration": "4.000000"},
            "streams": [
                {"codec_type": "audio", "codec_name": "aac"},
                {"codec_type": "video", "codec_name": "h264", "width": 1920, "height": 1080,
                 "avg_frame_rate": "30/1", "r_frame_rate": "30/1", "nb_frames": "120"}
            ]
        }"#;
        let info = parse_probe_output(json).unwrap();
        assert_eq!(info.width, 1920);
        assert_eq!(info.frame_count, Some(120));
        assert!((info.fps - 30.0).abs() < 1e-9);
        assert!((info.clip_duration().unwrap() - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_clip_duration_falls_back_to_container() {
        let info = VideoInfo {
            duration: 3.2,
            width: 720,
            height: 1280,
            fps: 0.0,
            frame_count: None,
            codec: "h264".to_string(),
        };
        assert_eq!(info.clip_duration(), Some(3.2));

        let empty = VideoInfo {
            duration: 0.0,
            ..info
        };
        assert_eq!(empty.clip_duration(), None);
    }

    #[test]
    fn test_no_video_stream() {
        let json = br#"{"format": {}, "streams": [{"codec_type": "audio"}]}"#;
        assert!(matches!(
            parse_probe_output(json),
            Err(MediaError::InvalidVideo(_))
        ));
    }
}
