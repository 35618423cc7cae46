//! File-to-file overlay rendering.

use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use super::render_loop::RenderStats;
use super::style::RenderStyle;
use crate::error::MediaResult;
use crate::pose::{PoseCapability, PoseModelConfig};
use crate::rotation::Rotation;
use bowl_models::PhaseTimeline;

/// Inputs for one render.
#[derive(Debug, Clone, Copy)]
pub struct RenderJob<'a> {
    pub input: &'a Path,
    pub output: &'a Path,
    pub timeline: &'a PhaseTimeline,
    pub rotation: Rotation,
    pub abort: &'a AtomicBool,
}

/// Renders an overlay video from a source file. Blocking.
pub trait RenderBackend: Send + Sync {
    fn render(&self, job: RenderJob<'_>) -> MediaResult<RenderStats>;
}

/// The backend for the compiled feature set, if pose estimation is
/// available.
pub fn default_backend(
    capability: &PoseCapability,
    pose_config: PoseModelConfig,
    style: RenderStyle,
) -> Option<Arc<dyn RenderBackend>> {
    let model_path = capability.model_path()?;

    #[cfg(feature = "opencv")]
    {
        Some(Arc::new(opencv_backend::OpenCvRenderBackend::new(
            model_path.to_path_buf(),
            pose_config,
            style,
        )))
    }

    #[cfg(not(feature = "opencv"))]
    {
        let _ = (model_path, pose_config, style);
        None
    }
}

#[cfg(feature = "opencv")]
mod opencv_backend {
    use std::path::PathBuf;

    use super::*;
    use crate::frame::FrameSource;
    use crate::opencv_io::{OpenCvSink, OpenCvSource};
    use crate::overlay::render_loop::render_overlay;
    use crate::overlay::renderer::OverlayRenderer;
    use crate::pose::OrtPoseEstimator;

    /// OpenCV decode/encode with ONNX Runtime pose estimation.
    pub struct OpenCvRenderBackend {
        model_path: PathBuf,
        pose_config: PoseModelConfig,
        style: RenderStyle,
    }

    impl OpenCvRenderBackend {
        pub fn new(model_path: PathBuf, pose_config: PoseModelConfig, style: RenderStyle) -> Self {
            Self {
                model_path,
                pose_config,
                style,
            }
        }
    }

    impl RenderBackend for OpenCvRenderBackend {
        fn render(&self, job: RenderJob<'_>) -> MediaResult<RenderStats> {
            let mut source = OpenCvSource::open(job.input)?;
            let info = *source.info();

            let out_size = job.rotation.output_dimensions(info.width, info.height);
            let mut sink = OpenCvSink::create(job.output, info.fps, out_size)?;
            let mut estimator = OrtPoseEstimator::load(&self.model_path, self.pose_config.clone())?;

            let renderer = OverlayRenderer::new(job.timeline.clone(), self.style.clone(), info.fps);

            render_overlay(
                &mut source,
                &mut sink,
                &mut estimator,
                &renderer,
                job.rotation,
                job.abort,
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_backend_without_capability() {
        let capability = PoseCapability::unavailable("no model");
        assert!(default_backend(&capability, PoseModelConfig::default(), RenderStyle::default()).is_none());
    }
}
