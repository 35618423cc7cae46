//! Web transcode of the rendered overlay.

use std::path::Path;
use tracing::{debug, info};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::fs_utils::file_size;
use bowl_models::TranscodeProfile;

/// Default wall-clock bound for one transcode.
pub const DEFAULT_TRANSCODE_TIMEOUT_SECS: u64 = 120;

/// Re-encodes the intermediate `mp4v` overlay into a small H.264 file that
/// plays inline on phones.
#[derive(Debug, Clone)]
pub struct Transcoder {
    profile: TranscodeProfile,
    timeout_secs: u64,
}

impl Default for Transcoder {
    fn default() -> Self {
        Self::new(TranscodeProfile::default())
    }
}

impl Transcoder {
    pub fn new(profile: TranscodeProfile) -> Self {
        Self {
            profile,
            timeout_secs: DEFAULT_TRANSCODE_TIMEOUT_SECS,
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn profile(&self) -> &TranscodeProfile {
        &self.profile
    }

    /// Build the FFmpeg invocation for `input` -> `output`.
    pub fn command(&self, input: &Path, output: &Path) -> FfmpegCommand {
        FfmpegCommand::new(input, output)
            .output_args(self.profile.to_ffmpeg_args())
            .no_audio()
    }

    /// Transcode and return the output size in bytes.
    ///
    /// A missing output after a zero exit status is reported as an FFmpeg
    /// failure so callers never publish a path that does not exist.
    pub async fn transcode(&self, input: &Path, output: &Path) -> MediaResult<u64> {
        if !input.exists() {
            return Err(MediaError::FileNotFound(input.to_path_buf()));
        }

        let cmd = self.command(input, output);
        debug!(
            input = %input.display(),
            output = %output.display(),
            crf = self.profile.crf,
            "Transcoding overlay"
        );

        FfmpegRunner::new()
            .with_timeout(self.timeout_secs)
            .run_with_progress(&cmd, |progress| {
                if progress.is_complete {
                    debug!(frames = progress.frame, speed = progress.speed, "Transcode finished encoding");
                }
            })
            .await?;

        if !output.exists() {
            return Err(MediaError::ffmpeg_failed(
                "FFmpeg reported success but produced no output",
                None,
                Some(0),
            ));
        }

        let size = file_size(output).await;
        info!(output = %output.display(), size_bytes = size, "Transcode complete");
        Ok(size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transcode_arguments() {
        let transcoder = Transcoder::default();
        let args = transcoder
            .command(Path::new("overlay.mp4"), Path::new("overlay_web.mp4"))
            .build_args();

        let pos = |flag: &str| args.iter().position(|a| a == flag).unwrap();
        assert_eq!(args[pos("-c:v") + 1], "libx264");
        assert_eq!(args[pos("-crf") + 1], "28");
        assert_eq!(args[pos("-vf") + 1], "scale=480:-2");
        assert_eq!(args[pos("-preset") + 1], "fast");
        assert_eq!(args.last().unwrap(), "overlay_web.mp4");
    }

    #[test]
    fn test_timeout_override() {
        let transcoder = Transcoder::default();
        assert_eq!(transcoder.timeout_secs, DEFAULT_TRANSCODE_TIMEOUT_SECS);
        assert_eq!(transcoder.with_timeout(5).timeout_secs, 5);
    }

    #[tokio::test]
    async fn test_missing_input() {
        let dir = tempfile::TempDir::new().unwrap();
        let result = Transcoder::default()
            .transcode(&dir.path().join("missing.mp4"), &dir.path().join("out.mp4"))
            .await;
        assert!(matches!(result, Err(MediaError::FileNotFound(_))));
    }
}
