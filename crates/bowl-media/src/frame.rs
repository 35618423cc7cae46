//! Frame decode/encode seams.
//!
//! The render loop is written against these traits so it can be driven by
//! OpenCV in production and by in-memory frames in tests.

use serde::{Deserialize, Serialize};

use crate::error::{MediaError, MediaResult};
use crate::overlay::FramePlan;
use crate::rotation::Rotation;

/// Stream properties reported by a frame source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StreamInfo {
    pub fps: f64,
    pub width: u32,
    pub height: u32,
    /// Frame count when the container reports one
    pub frame_count: Option<u64>,
}

impl StreamInfo {
    /// Reject streams that cannot be rendered.
    pub fn validate(&self) -> MediaResult<()> {
        if !self.fps.is_finite() || self.fps <= 0.0 {
            return Err(MediaError::invalid_video(format!(
                "non-positive frame rate: {}",
                self.fps
            )));
        }
        if self.width == 0 || self.height == 0 {
            return Err(MediaError::invalid_video(format!(
                "zero frame dimensions: {}x{}",
                self.width, self.height
            )));
        }
        Ok(())
    }

    /// Stream length in seconds derived from the frame count.
    pub fn duration(&self) -> Option<f64> {
        self.frame_count
            .filter(|n| *n > 0 && self.fps > 0.0)
            .map(|n| n as f64 / self.fps)
    }
}

/// A decoded frame the overlay can rotate and draw on.
pub trait VideoFrame: Sized + Send {
    /// `(width, height)` in pixels.
    fn size(&self) -> (u32, u32);

    /// A rotated copy. [`Rotation::None`] may return a plain clone.
    fn rotate(&self, rotation: Rotation) -> MediaResult<Self>;

    /// Draw the plan onto the frame in place.
    fn paint(&mut self, plan: &FramePlan) -> MediaResult<()>;
}

/// Lazy, finite, non-restartable frame sequence.
pub trait FrameSource {
    type Frame: VideoFrame;

    fn info(&self) -> &StreamInfo;

    /// Next frame, or `Ok(None)` at end of stream.
    fn next_frame(&mut self) -> MediaResult<Option<Self::Frame>>;
}

/// Destination for rendered frames.
pub trait FrameSink<F> {
    fn write(&mut self, frame: &F) -> MediaResult<()>;

    /// Flush and close. Called once after the last write.
    fn finish(&mut self) -> MediaResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(fps: f64, width: u32, height: u32) -> StreamInfo {
        StreamInfo {
            fps,
            width,
            height,
            frame_count: Some(120),
        }
    }

    #[test]
    fn test_validate() {
        assert!(info(30.0, 1920, 1080).validate().is_ok());
        assert!(matches!(
            info(0.0, 1920, 1080).validate(),
            Err(MediaError::InvalidVideo(_))
        ));
        assert!(info(f64::NAN, 1920, 1080).validate().is_err());
        assert!(info(30.0, 0, 1080).validate().is_err());
    }

    #[test]
    fn test_duration_from_frames() {
        assert_eq!(info(30.0, 1920, 1080).duration(), Some(4.0));
        let unknown = StreamInfo {
            frame_count: None,
            ..info(30.0, 1920, 1080)
        };
        assert_eq!(unknown.duration(), None);
    }
}
