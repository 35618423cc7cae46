//! Overlay pipeline orchestration.
//!
//! One render is one unit of blocking work: read stream metadata, build the
//! phase timeline, draw the overlay frame by frame, verify, transcode, verify again, and hand
//! the result to the artifact sink. It runs on the blocking pool behind a
//! semaphore so concurrent renders stay bounded.
//!
//! The caller's wait, including time queued for a render slot, is bounded by
//! the render timeout. When it fires the worker is asked to stop at the next
//! frame boundary and never publishes; the per-render workspace is owned by
//! the worker and removed when it finishes, however it finishes.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;
use tracing::{debug, info, warn, Instrument};
use uuid::Uuid;

use crate::config::OverlayConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::RenderLogger;
use crate::metrics;
use crate::sink::{ArtifactHandle, ArtifactSink};
use bowl_media::{
    default_backend, probe_rotation, probe_video, verify_output, JointMappingTable, MediaError,
    MediaResult, PoseModelConfig, RenderBackend, RenderJob, RenderStyle, Transcoder,
};
use bowl_models::{PhaseVerdict, TranscodeProfile};

const INPUT_FILE: &str = "input.mp4";
const DESCRIPTOR_FILE: &str = "feedback.json";
const OVERLAY_FILE: &str = "overlay.mp4";
const WEB_FILE: &str = "overlay_web.mp4";

/// One overlay request.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub video_bytes: Vec<u8>,
    pub verdicts: Vec<PhaseVerdict>,
}

/// State shared with the blocking worker.
struct RenderContext {
    config: Arc<OverlayConfig>,
    joint_map: Arc<JointMappingTable>,
    backend: Arc<dyn RenderBackend>,
    sink: Arc<dyn ArtifactSink>,
    transcoder: Transcoder,
}

/// Async-facing coordinator for overlay renders.
pub struct OverlayPipeline {
    config: Arc<OverlayConfig>,
    joint_map: Arc<JointMappingTable>,
    backend: Option<Arc<dyn RenderBackend>>,
    sink: Arc<dyn ArtifactSink>,
    semaphore: Arc<Semaphore>,
    transcoder: Transcoder,
}

impl OverlayPipeline {
    /// Build a pipeline with the backend for the compiled feature set.
    pub fn new(config: OverlayConfig, sink: Arc<dyn ArtifactSink>) -> WorkerResult<Self> {
        let backend = default_backend(&config.pose, PoseModelConfig::default(), RenderStyle::default());
        Self::with_backend(config, sink, backend)
    }

    /// Build a pipeline with an explicit render backend.
    pub fn with_backend(
        config: OverlayConfig,
        sink: Arc<dyn ArtifactSink>,
        backend: Option<Arc<dyn RenderBackend>>,
    ) -> WorkerResult<Self> {
        let joint_map = match &config.joint_map_path {
            Some(path) => JointMappingTable::load(path).map_err(|e| {
                WorkerError::config_error(format!("joint map {}: {e}", path.display()))
            })?,
            None => JointMappingTable::default(),
        };

        let transcoder =
            Transcoder::new(TranscodeProfile::default()).with_timeout(config.transcode_timeout.as_secs());

        Ok(Self {
            semaphore: Arc::new(Semaphore::new(config.max_concurrent_renders.max(1))),
            config: Arc::new(config),
            joint_map: Arc::new(joint_map),
            backend,
            sink,
            transcoder,
        })
    }

    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }

    /// Whether a render would be attempted at all.
    pub fn is_available(&self) -> bool {
        self.config.overlay_available() && self.backend.is_some()
    }

    /// Render, transcode and publish an overlay.
    ///
    /// Returns `Ok(None)` when overlays are disabled or pose estimation is
    /// unavailable; that is not a failure.
    pub async fn generate(&self, request: RenderRequest) -> WorkerResult<Option<ArtifactHandle>> {
        if request.verdicts.is_empty() {
            metrics::record_render_failed(crate::error::ErrorKind::MalformedInput);
            return Err(WorkerError::malformed_input("no phase verdicts"));
        }

        if !self.config.enable_overlay {
            debug!("Overlay disabled, skipping");
            metrics::record_render_skipped("disabled");
            return Ok(None);
        }

        let backend = match (&self.backend, self.config.pose.is_available()) {
            (Some(backend), true) => backend.clone(),
            _ => {
                warn!("Pose estimation unavailable, skipping overlay");
                metrics::record_render_skipped("pose_unavailable");
                return Ok(None);
            }
        };

        let render_id = format!("overlay_{}", Uuid::new_v4());
        let logger = RenderLogger::new(&render_id, "overlay");

        let timeout = self.config.render_timeout;
        let deadline = tokio::time::Instant::now() + timeout;

        let acquire = self.semaphore.clone().acquire_owned();
        let permit = match tokio::time::timeout_at(deadline, acquire).await {
            Ok(Ok(permit)) => permit,
            Ok(Err(_)) => return Err(WorkerError::internal("render semaphore closed")),
            Err(_) => {
                logger.log_error("no render slot before the deadline");
                metrics::record_render_failed(crate::error::ErrorKind::Timeout);
                return Err(WorkerError::Timeout(timeout.as_secs()));
            }
        };

        metrics::record_render_started();
        logger.log_start(&format!(
            "{} bytes, {} phases",
            request.video_bytes.len(),
            request.verdicts.len()
        ));

        let ctx = RenderContext {
            config: self.config.clone(),
            joint_map: self.joint_map.clone(),
            backend,
            sink: self.sink.clone(),
            transcoder: self.transcoder.clone(),
        };
        let abort = Arc::new(AtomicBool::new(false));
        let worker_abort = abort.clone();
        let handle = tokio::runtime::Handle::current();
        let span = logger.create_span();
        let started = Instant::now();
        let worker_logger = logger.clone();

        let task = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            handle.block_on(run_render(ctx, worker_logger, request, worker_abort).instrument(span))
        });

        let result = match tokio::time::timeout_at(deadline, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(WorkerError::internal(format!("render task failed: {e}"))),
            Err(_) => {
                // The worker stops at the next frame and cleans up on its own
                abort.store(true, Ordering::Relaxed);
                Err(WorkerError::Timeout(timeout.as_secs()))
            }
        };

        match &result {
            Ok(artifact) => {
                metrics::record_render_completed(started.elapsed().as_secs_f64());
                logger.log_completion(&artifact.video_url);
            }
            Err(e) => {
                metrics::record_render_failed(e.kind());
                logger.log_error(&e.to_string());
            }
        }

        result.map(Some)
    }
}

/// Body of the blocking worker. Owns the render workspace.
async fn run_render(
    ctx: RenderContext,
    logger: RenderLogger,
    request: RenderRequest,
    abort: Arc<AtomicBool>,
) -> WorkerResult<ArtifactHandle> {
    tokio::fs::create_dir_all(&ctx.config.work_dir).await?;
    let workspace = tempfile::Builder::new()
        .prefix("overlay-")
        .tempdir_in(&ctx.config.work_dir)?;

    let result = render_in(&ctx, &logger, request, &abort, workspace.path()).await;

    let workspace_path = workspace.path().to_path_buf();
    if let Err(e) = workspace.close() {
        warn!(path = %workspace_path.display(), error = %e, "Failed to remove render workspace");
    }

    result
}

async fn render_in(
    ctx: &RenderContext,
    logger: &RenderLogger,
    request: RenderRequest,
    abort: &AtomicBool,
    dir: &Path,
) -> WorkerResult<ArtifactHandle> {
    let input = dir.join(INPUT_FILE);
    tokio::fs::write(&input, &request.video_bytes).await?;
    drop(request.video_bytes);

    let (rotation, info) = tokio::join!(probe_rotation(&input), probe_video(&input));

    let duration = match info {
        Ok(info) => info.clip_duration(),
        Err(e) => {
            logger.log_warning(&format!("ffprobe failed, using default clip length: {e}"));
            None
        }
    }
    .unwrap_or(ctx.config.default_clip_secs);

    let timeline = ctx.joint_map.build_timeline(&request.verdicts, duration)?;
    let descriptor = dir.join(DESCRIPTOR_FILE);
    let json = timeline
        .to_json()
        .map_err(|e| WorkerError::internal(format!("serialize feedback descriptor: {e}")))?;
    tokio::fs::write(&descriptor, json).await?;

    info!(
        duration_secs = duration,
        phases = timeline.len(),
        rotation = %rotation,
        "Phase timeline ready"
    );

    let overlay = dir.join(OVERLAY_FILE);
    let stats = ctx
        .backend
        .render(RenderJob {
            input: &input,
            output: &overlay,
            timeline: &timeline,
            rotation,
            abort,
        })?;
    metrics::record_frames_written(stats.frames_written);
    logger.log_progress(&format!(
        "rendered {} frames ({} with pose) in {} ms",
        stats.frames_written, stats.frames_with_pose, stats.elapsed_ms
    ));

    let min_bytes = ctx.config.min_output_bytes();
    verify_output(&overlay, min_bytes)?;
    ensure_not_aborted(abort)?;

    let web = dir.join(WEB_FILE);
    let transcode_started = Instant::now();
    ctx.transcoder.transcode(&overlay, &web).await?;
    metrics::record_transcode_duration(transcode_started.elapsed().as_secs_f64());
    verify_output(&web, min_bytes)?;
    ensure_not_aborted(abort)?;

    ctx.sink.publish(&web, logger.render_id()).await
}

/// The caller has given up; nothing may be published after this point.
fn ensure_not_aborted(abort: &AtomicBool) -> MediaResult<()> {
    if abort.load(Ordering::Relaxed) {
        return Err(MediaError::Cancelled);
    }
    Ok(())
}
