//! Delivery analysis binary.
//!
//! Usage: `bowl-worker <video.mp4> <verdicts.json> [--no-overlay]`
//!
//! Runs one delivery session with recorded verdicts and prints each event as
//! a JSON line on stdout.

use std::sync::Arc;

use anyhow::{bail, Context};
use tokio::sync::mpsc;
use tracing::info;

use bowl_worker::logging::init_tracing;
use bowl_worker::{
    analyze_delivery, AnalysisEvent, CoachingRequest, DeliveryRequest, JsonVerdictSource,
    LocalArtifactSink, OverlayConfig, OverlayPipeline,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let generate_overlay = !args.iter().any(|a| a == "--no-overlay");
    let paths: Vec<&String> = args.iter().filter(|a| !a.starts_with("--")).collect();
    let [video, verdicts] = paths.as_slice() else {
        bail!("usage: bowl-worker <video.mp4> <verdicts.json> [--no-overlay]");
    };

    let config = OverlayConfig::from_env();
    info!(
        overlay_available = config.overlay_available(),
        max_renders = config.max_concurrent_renders,
        "Starting bowl-worker"
    );

    let video_bytes = tokio::fs::read(video.as_str())
        .await
        .with_context(|| format!("read {video}"))?;

    let sink = Arc::new(LocalArtifactSink::new(
        &config.artifact_dir,
        config.artifact_base_url.clone(),
    ));
    let analysis_timeout = config.analysis_timeout;
    let pipeline = OverlayPipeline::new(config, sink)?;
    let source = JsonVerdictSource::new(verdicts.as_str());

    let (tx, mut rx) = mpsc::channel::<AnalysisEvent>(16);
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            println!("{}", event.to_json_line());
        }
    });

    let request = DeliveryRequest {
        video_bytes,
        coaching: CoachingRequest::default(),
        generate_overlay,
    };
    let result = analyze_delivery(&source, Some(&pipeline), request, tx, analysis_timeout).await;
    printer.await.ok();

    let phases = result?;
    info!(phases = phases.len(), "Delivery complete");
    Ok(())
}
