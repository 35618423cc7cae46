//! Poster frame for a delivered overlay.

use std::path::Path;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::MediaResult;
use bowl_models::encoding::{THUMBNAIL_SCALE_WIDTH, THUMBNAIL_TIMESTAMP};

/// Timeout for poster extraction.
const THUMBNAIL_TIMEOUT_SECS: u64 = 30;

fn thumbnail_filter() -> String {
    format!("scale={}:-2", THUMBNAIL_SCALE_WIDTH)
}

/// Grab a single scaled JPEG frame from `video_path`.
pub async fn generate_thumbnail(
    video_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
) -> MediaResult<()> {
    let cmd = FfmpegCommand::new(video_path.as_ref(), output_path.as_ref())
        .seek(THUMBNAIL_TIMESTAMP)
        .single_frame()
        .video_filter(thumbnail_filter());

    FfmpegRunner::new()
        .with_timeout(THUMBNAIL_TIMEOUT_SECS)
        .run(&cmd)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thumbnail_command() {
        let cmd = FfmpegCommand::new("web.mp4", "poster.jpg")
            .seek(THUMBNAIL_TIMESTAMP)
            .single_frame()
            .video_filter(thumbnail_filter());
        let args = cmd.build_args();

        let ss = args.iter().position(|a| a == "-ss").unwrap();
        let input = args.iter().position(|a| a == "-i").unwrap();
        assert!(ss < input, "seek must be an input option");
        assert!(args.contains(&"scale=320:-2".to_string()));
        assert!(args.contains(&"-vframes".to_string()));
    }
}
