//! OpenCV-backed frame decode, drawing and encode.

use std::path::{Path, PathBuf};

use opencv::core::{self, Mat, Point, Scalar, Size};
use opencv::imgproc;
use opencv::prelude::{MatTraitConst, VideoCaptureTrait, VideoCaptureTraitConst, VideoWriterTrait, VideoWriterTraitConst};
use opencv::videoio::{
    VideoCapture, VideoWriter, CAP_ANY, CAP_PROP_FPS, CAP_PROP_FRAME_COUNT, CAP_PROP_FRAME_HEIGHT,
    CAP_PROP_FRAME_WIDTH,
};
use tracing::info;

use crate::error::{MediaError, MediaResult};
use crate::frame::{FrameSink, FrameSource, StreamInfo, VideoFrame};
use crate::overlay::{FramePlan, Rgb};
use crate::rotation::Rotation;

fn scalar(color: Rgb) -> Scalar {
    let [b, g, r] = color.to_bgr();
    Scalar::new(b as f64, g as f64, r as f64, 0.0)
}

fn point((x, y): (i32, i32)) -> Point {
    Point::new(x, y)
}

impl VideoFrame for Mat {
    fn size(&self) -> (u32, u32) {
        (self.cols().max(0) as u32, self.rows().max(0) as u32)
    }

    fn rotate(&self, rotation: Rotation) -> MediaResult<Self> {
        let code = match rotation {
            Rotation::None => {
                return self
                    .try_clone()
                    .map_err(|e| MediaError::frame_read(format!("Mat clone: {e}")));
            }
            Rotation::Rotate90 => core::ROTATE_90_COUNTERCLOCKWISE,
            Rotation::Rotate180 => core::ROTATE_180,
            Rotation::Rotate270 => core::ROTATE_90_CLOCKWISE,
        };

        let mut rotated = Mat::default();
        core::rotate(self, &mut rotated, code)
            .map_err(|e| MediaError::frame_read(format!("Rotate failed: {e}")))?;
        Ok(rotated)
    }

    fn paint(&mut self, plan: &FramePlan) -> MediaResult<()> {
        let draw_err = |e: opencv::Error| MediaError::frame_write(format!("Draw failed: {e}"));

        imgproc::put_text(
            self,
            &plan.caption.text,
            point(plan.caption.origin),
            imgproc::FONT_HERSHEY_SIMPLEX,
            plan.caption.scale,
            scalar(plan.caption.color),
            plan.caption.thickness,
            imgproc::LINE_8,
            false,
        )
        .map_err(draw_err)?;

        for segment in &plan.segments {
            imgproc::line(
                self,
                point(segment.from),
                point(segment.to),
                scalar(segment.color),
                segment.thickness,
                imgproc::LINE_8,
                0,
            )
            .map_err(draw_err)?;
        }

        for marker in &plan.markers {
            imgproc::circle(
                self,
                point(marker.center),
                marker.radius,
                scalar(marker.color),
                imgproc::FILLED,
                imgproc::LINE_8,
                0,
            )
            .map_err(draw_err)?;
        }

        Ok(())
    }
}

/// Sequential decoder over a video file.
pub struct OpenCvSource {
    cap: VideoCapture,
    info: StreamInfo,
}

impl OpenCvSource {
    pub fn open(path: &Path) -> MediaResult<Self> {
        let path_str = path
            .to_str()
            .ok_or_else(|| MediaError::invalid_video(format!("non-UTF-8 path: {}", path.display())))?;

        let cap = VideoCapture::from_file(path_str, CAP_ANY)
            .map_err(|e| MediaError::invalid_video(format!("Failed to open video: {e}")))?;

        if !cap.is_opened().unwrap_or(false) {
            return Err(MediaError::invalid_video(format!(
                "VideoCapture failed to open {}",
                path.display()
            )));
        }

        let fps = cap.get(CAP_PROP_FPS).unwrap_or(0.0);
        let width = cap.get(CAP_PROP_FRAME_WIDTH).unwrap_or(0.0).max(0.0) as u32;
        let height = cap.get(CAP_PROP_FRAME_HEIGHT).unwrap_or(0.0).max(0.0) as u32;
        let frame_count = cap
            .get(CAP_PROP_FRAME_COUNT)
            .ok()
            .filter(|n| *n > 0.0)
            .map(|n| n as u64);

        let info = StreamInfo {
            fps,
            width,
            height,
            frame_count,
        };
        info.validate()?;

        info!(
            width,
            height,
            fps,
            frame_count = ?frame_count,
            "Video opened"
        );

        Ok(Self { cap, info })
    }
}

impl FrameSource for OpenCvSource {
    type Frame = Mat;

    fn info(&self) -> &StreamInfo {
        &self.info
    }

    fn next_frame(&mut self) -> MediaResult<Option<Mat>> {
        let mut frame = Mat::default();
        let ok = self
            .cap
            .read(&mut frame)
            .map_err(|e| MediaError::frame_read(format!("Frame read failed: {e}")))?;

        if !ok || frame.empty() {
            return Ok(None);
        }
        Ok(Some(frame))
    }
}

/// `mp4v` encoder for the intermediate overlay file.
pub struct OpenCvSink {
    writer: VideoWriter,
    path: PathBuf,
}

impl OpenCvSink {
    pub fn create(path: &Path, fps: f64, (width, height): (u32, u32)) -> MediaResult<Self> {
        let path_str = path
            .to_str()
            .ok_or_else(|| MediaError::frame_write(format!("non-UTF-8 path: {}", path.display())))?;

        let fourcc = VideoWriter::fourcc('m', 'p', '4', 'v')
            .map_err(|e| MediaError::frame_write(format!("fourcc: {e}")))?;

        let writer = VideoWriter::new(
            path_str,
            fourcc,
            fps,
            Size::new(width as i32, height as i32),
            true,
        )
        .map_err(|e| MediaError::frame_write(format!("VideoWriter: {e}")))?;

        if !writer.is_opened().unwrap_or(false) {
            return Err(MediaError::frame_write(format!(
                "VideoWriter failed to create {}",
                path.display()
            )));
        }

        Ok(Self {
            writer,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FrameSink<Mat> for OpenCvSink {
    fn write(&mut self, frame: &Mat) -> MediaResult<()> {
        self.writer
            .write(frame)
            .map_err(|e| MediaError::frame_write(format!("Frame write failed: {e}")))
    }

    fn finish(&mut self) -> MediaResult<()> {
        self.writer
            .release()
            .map_err(|e| MediaError::frame_write(format!("VideoWriter release: {e}")))
    }
}
