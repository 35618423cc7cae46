//! The blocking frame loop.

use serde::Serialize;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::{debug, info, warn};

use super::renderer::{OverlayRenderer, RenderState};
use crate::error::{MediaError, MediaResult};
use crate::frame::{FrameSink, FrameSource, VideoFrame};
use crate::pose::PoseEstimator;
use crate::rotation::Rotation;

/// Smallest plausible rendered file; anything below is treated as corrupt.
pub const DEFAULT_MIN_OUTPUT_BYTES: u64 = 1000;

/// Counters from one render.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RenderStats {
    pub frames_read: u64,
    pub frames_written: u64,
    pub frames_with_pose: u64,
    pub phase_transitions: u32,
    pub output_width: u32,
    pub output_height: u32,
    pub elapsed_ms: u64,
}

/// Render every frame of `source` into `sink`.
///
/// Frames are rotated upright before pose estimation, painted with the
/// renderer's plan, and written `plan.repeats` times. The `abort` flag is
/// checked between frames; when set the sink is closed and
/// [`MediaError::Cancelled`] is returned.
pub fn render_overlay<S, K, E>(
    source: &mut S,
    sink: &mut K,
    estimator: &mut E,
    renderer: &OverlayRenderer,
    rotation: Rotation,
    abort: &AtomicBool,
) -> MediaResult<RenderStats>
where
    S: FrameSource,
    K: FrameSink<S::Frame>,
    E: PoseEstimator<S::Frame> + ?Sized,
{
    let started = Instant::now();
    let info = *source.info();
    info.validate()?;

    let mut state = RenderState::new(rotation, info.width, info.height);
    let (out_w, out_h) = state.output_size();
    let mut stats = RenderStats {
        output_width: out_w,
        output_height: out_h,
        ..Default::default()
    };

    debug!(
        width = info.width,
        height = info.height,
        fps = info.fps,
        frame_count = ?info.frame_count,
        rotation = %rotation,
        "Starting frame loop"
    );

    while let Some(frame) = source.next_frame()? {
        if abort.load(Ordering::Relaxed) {
            warn!(frames_read = stats.frames_read, "Render aborted");
            let _ = sink.finish();
            return Err(MediaError::Cancelled);
        }
        stats.frames_read += 1;

        let mut frame = frame.rotate(rotation)?;
        let frame_size = frame.size();
        if state.frame_index() == 0 && frame_size != (out_w, out_h) {
            warn!(
                actual = ?frame_size,
                expected = ?(out_w, out_h),
                "First frame size differs from expected output size"
            );
        }

        let pose = estimator.estimate(&frame)?;
        if pose.is_some() {
            stats.frames_with_pose += 1;
        } else if state.frame_index() == 0 {
            debug!("No pose detected on first frame");
        }

        let plan = renderer
            .plan(&mut state, pose.as_ref(), frame_size)
            .ok_or_else(|| MediaError::internal("timeline has no phases"))?;
        frame.paint(&plan)?;

        for _ in 0..plan.repeats {
            sink.write(&frame)?;
            stats.frames_written += 1;
        }

        state.advance_frame();
    }

    sink.finish()?;

    stats.phase_transitions = state.transitions();
    stats.elapsed_ms = started.elapsed().as_millis() as u64;

    info!(
        frames_read = stats.frames_read,
        frames_written = stats.frames_written,
        frames_with_pose = stats.frames_with_pose,
        phase_transitions = stats.phase_transitions,
        elapsed_ms = stats.elapsed_ms,
        "Frame loop complete"
    );

    Ok(stats)
}

/// Check a rendered file exists and is at least `min_bytes` long.
pub fn verify_output(path: impl AsRef<Path>, min_bytes: u64) -> MediaResult<u64> {
    let path = path.as_ref();
    let size = match std::fs::metadata(path) {
        Ok(meta) => meta.len(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(MediaError::OutputMissing(path.to_path_buf()));
        }
        Err(e) => return Err(e.into()),
    };

    if size < min_bytes {
        return Err(MediaError::OutputTooSmall {
            path: path.to_path_buf(),
            size,
            min_bytes,
        });
    }

    Ok(size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::StreamInfo;
    use crate::overlay::{FramePlan, RenderStyle};
    use crate::pose::{Landmark, PoseLandmarks};
    use bowl_models::{FeedbackCategory, FeedbackSet, Joint, Phase, PhaseTimeline};

    #[derive(Debug, Clone)]
    struct FakeFrame {
        width: u32,
        height: u32,
        markers: usize,
    }

    impl VideoFrame for FakeFrame {
        fn size(&self) -> (u32, u32) {
            (self.width, self.height)
        }

        fn rotate(&self, rotation: Rotation) -> MediaResult<Self> {
            let (width, height) = rotation.output_dimensions(self.width, self.height);
            Ok(FakeFrame {
                width,
                height,
                markers: self.markers,
            })
        }

        fn paint(&mut self, plan: &FramePlan) -> MediaResult<()> {
            self.markers = plan.markers.len();
            Ok(())
        }
    }

    struct FakeSource {
        info: StreamInfo,
        remaining: u64,
        fail_at: Option<u64>,
    }

    impl FakeSource {
        fn new(frames: u64, fps: f64) -> Self {
            Self {
                info: StreamInfo {
                    fps,
                    width: 1920,
                    height: 1080,
                    frame_count: Some(frames),
                },
                remaining: frames,
                fail_at: None,
            }
        }
    }

    impl FrameSource for FakeSource {
        type Frame = FakeFrame;

        fn info(&self) -> &StreamInfo {
            &self.info
        }

        fn next_frame(&mut self) -> MediaResult<Option<FakeFrame>> {
            if self.remaining == 0 {
                return Ok(None);
            }
            if self.fail_at == Some(self.remaining) {
                return Err(MediaError::frame_read("decoder error"));
            }
            self.remaining -= 1;
            Ok(Some(FakeFrame {
                width: self.info.width,
                height: self.info.height,
                markers: 0,
            }))
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        sizes: Vec<(u32, u32)>,
        finished: bool,
    }

    impl FrameSink<FakeFrame> for RecordingSink {
        fn write(&mut self, frame: &FakeFrame) -> MediaResult<()> {
            self.sizes.push(frame.size());
            Ok(())
        }

        fn finish(&mut self) -> MediaResult<()> {
            self.finished = true;
            Ok(())
        }
    }

    struct StandingPose;

    impl PoseEstimator<FakeFrame> for StandingPose {
        fn estimate(&mut self, _frame: &FakeFrame) -> MediaResult<Option<PoseLandmarks>> {
            Ok(Some(PoseLandmarks::from_joints(
                Joint::ALL.map(|j| (j, Landmark::new(0.5, 0.5, 0.9))),
            )))
        }
    }

    fn renderer(fps: f64) -> OverlayRenderer {
        let timeline = PhaseTimeline::new(vec![
            Phase::new(0.0, 2.0, "Run-up", FeedbackSet::new()),
            Phase::new(
                2.0,
                4.0,
                "Release",
                FeedbackSet::new().with(FeedbackCategory::InjuryRisk, [Joint::RightElbow]),
            ),
        ])
        .unwrap();
        OverlayRenderer::new(timeline, RenderStyle::default(), fps)
    }

    #[test]
    fn test_frame_dilation() {
        let mut source = FakeSource::new(120, 30.0);
        let mut sink = RecordingSink::default();
        let abort = AtomicBool::new(false);

        let stats = render_overlay(
            &mut source,
            &mut sink,
            &mut StandingPose,
            &renderer(30.0),
            Rotation::None,
            &abort,
        )
        .unwrap();

        // 60 scanning frames once, 60 feedback frames four times
        assert_eq!(stats.frames_read, 120);
        assert_eq!(stats.frames_written, 300);
        assert_eq!(sink.sizes.len(), 300);
        assert_eq!(stats.frames_with_pose, 120);
        assert_eq!(stats.phase_transitions, 1);
        assert!(sink.finished);
    }

    #[test]
    fn test_rotation_swaps_output() {
        let mut source = FakeSource::new(10, 30.0);
        let mut sink = RecordingSink::default();
        let abort = AtomicBool::new(false);

        let stats = render_overlay(
            &mut source,
            &mut sink,
            &mut StandingPose,
            &renderer(30.0),
            Rotation::Rotate270,
            &abort,
        )
        .unwrap();

        assert_eq!((stats.output_width, stats.output_height), (1080, 1920));
        assert!(sink.sizes.iter().all(|s| *s == (1080, 1920)));
    }

    #[test]
    fn test_abort_between_frames() {
        let mut source = FakeSource::new(120, 30.0);
        let mut sink = RecordingSink::default();
        let abort = AtomicBool::new(true);

        let result = render_overlay(
            &mut source,
            &mut sink,
            &mut StandingPose,
            &renderer(30.0),
            Rotation::None,
            &abort,
        );

        assert!(matches!(result, Err(MediaError::Cancelled)));
        assert!(sink.sizes.is_empty());
        assert!(sink.finished);
    }

    #[test]
    fn test_read_error_aborts() {
        let mut source = FakeSource::new(10, 30.0);
        source.fail_at = Some(5);
        let mut sink = RecordingSink::default();
        let abort = AtomicBool::new(false);

        let result = render_overlay(
            &mut source,
            &mut sink,
            &mut StandingPose,
            &renderer(30.0),
            Rotation::None,
            &abort,
        );
        assert!(matches!(result, Err(MediaError::FrameRead(_))));
        assert_eq!(sink.sizes.len(), 5);
    }

    #[test]
    fn test_invalid_stream_rejected() {
        let mut source = FakeSource::new(10, 0.0);
        let mut sink = RecordingSink::default();
        let abort = AtomicBool::new(false);

        let result = render_overlay(
            &mut source,
            &mut sink,
            &mut StandingPose,
            &renderer(30.0),
            Rotation::None,
            &abort,
        );
        assert!(matches!(result, Err(MediaError::InvalidVideo(_))));
        assert!(sink.sizes.is_empty());
    }

    #[test]
    fn test_verify_output() {
        let dir = tempfile::TempDir::new().unwrap();
        let small = dir.path().join("overlay.mp4");
        std::fs::write(&small, vec![0u8; 200]).unwrap();

        assert!(matches!(
            verify_output(&small, DEFAULT_MIN_OUTPUT_BYTES),
            Err(MediaError::OutputTooSmall { size: 200, .. })
        ));
        assert!(matches!(
            verify_output(dir.path().join("missing.mp4"), DEFAULT_MIN_OUTPUT_BYTES),
            Err(MediaError::OutputMissing(_))
        ));

        std::fs::write(&small, vec![0u8; 4096]).unwrap();
        assert_eq!(verify_output(&small, DEFAULT_MIN_OUTPUT_BYTES).unwrap(), 4096);
    }
}
