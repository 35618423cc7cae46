//! Render-only overlay binary.
//!
//! Usage: `bowl-overlay <input.mp4> <feedback.json> <output.mp4>`
//!
//! `feedback.json` is a phase timeline descriptor. The output is the raw
//! overlay render, not the web transcode.

use anyhow::{bail, Context};
use std::sync::atomic::AtomicBool;
use std::time::Instant;
use tracing::{info, warn};

use bowl_media::{
    default_backend, probe_rotation, verify_output, PoseModelConfig, RenderBackend, RenderJob,
    RenderStyle,
};
use bowl_models::PhaseTimeline;
use bowl_worker::logging::init_tracing;
use bowl_worker::OverlayConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let [input, descriptor, output] = args.as_slice() else {
        bail!("usage: bowl-overlay <input.mp4> <feedback.json> <output.mp4>");
    };

    let raw = tokio::fs::read_to_string(descriptor)
        .await
        .with_context(|| format!("read {descriptor}"))?;
    let timeline = PhaseTimeline::from_json(&raw).context("invalid feedback descriptor")?;

    let config = OverlayConfig::from_env();
    if !config.overlay_available() {
        warn!(enabled = config.enable_overlay, "Overlay disabled or pose estimation unavailable");
        println!("null");
        return Ok(());
    }
    let Some(backend) = default_backend(&config.pose, PoseModelConfig::default(), RenderStyle::default())
    else {
        warn!("Pose estimation unavailable, no overlay rendered");
        println!("null");
        return Ok(());
    };

    let rotation = probe_rotation(input).await;
    let started = Instant::now();
    let abort = AtomicBool::new(false);

    let input_path = std::path::PathBuf::from(input);
    let output_path = std::path::PathBuf::from(output);
    let stats = tokio::task::spawn_blocking(move || {
        backend.render(RenderJob {
            input: &input_path,
            output: &output_path,
            timeline: &timeline,
            rotation,
            abort: &abort,
        })
    })
    .await??;

    let size = verify_output(output, config.min_output_bytes())?;
    info!(
        frames_read = stats.frames_read,
        frames_written = stats.frames_written,
        size_bytes = size,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Overlay rendered"
    );
    println!("{output}");
    Ok(())
}
