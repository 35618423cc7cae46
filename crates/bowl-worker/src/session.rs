//! Delivery analysis session.
//!
//! The report event always goes out first. Overlay generation runs after it
//! and any overlay outcome, including failure, is reported as its own event.

use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::error::{ErrorKind, WorkerResult};
use crate::pipeline::{OverlayPipeline, RenderRequest};
use crate::verdicts::{fetch_with_timeout, CoachingRequest, PhaseVerdictSource};
use bowl_models::PhaseVerdict;

/// Events sent to the client during one session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AnalysisEvent {
    Report {
        phases: Vec<PhaseVerdict>,
    },
    Annotating {
        message: String,
    },
    Overlay {
        overlay_url: String,
        thumbnail_url: Option<String>,
    },
    OverlaySkipped {
        message: String,
    },
    OverlayFailed {
        message: String,
        kind: ErrorKind,
    },
    Error {
        message: String,
    },
}

impl AnalysisEvent {
    pub fn to_json_line(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| r#"{"status":"error"}"#.to_string())
    }
}

/// One uploaded delivery.
#[derive(Debug, Clone)]
pub struct DeliveryRequest {
    pub video_bytes: Vec<u8>,
    pub coaching: CoachingRequest,
    pub generate_overlay: bool,
}

/// Run one delivery: verdicts, report, then the optional overlay.
///
/// Returns the verdicts; an error means no report was produced. Overlay
/// failures are reported through `events` and never fail the session.
pub async fn analyze_delivery(
    source: &dyn PhaseVerdictSource,
    pipeline: Option<&OverlayPipeline>,
    request: DeliveryRequest,
    events: mpsc::Sender<AnalysisEvent>,
    analysis_timeout: Duration,
) -> WorkerResult<Vec<PhaseVerdict>> {
    let verdicts = match fetch_with_timeout(
        source,
        &request.video_bytes,
        &request.coaching,
        analysis_timeout,
    )
    .await
    {
        Ok(verdicts) => verdicts,
        Err(e) => {
            warn!(error = %e, "Delivery analysis failed");
            send(&events, AnalysisEvent::Error {
                message: e.user_message().to_string(),
            })
            .await;
            return Err(e);
        }
    };

    send(&events, AnalysisEvent::Report {
        phases: verdicts.clone(),
    })
    .await;

    if !request.generate_overlay {
        return Ok(verdicts);
    }

    let pipeline = match pipeline {
        Some(p) if p.is_available() => p,
        _ => {
            send(&events, AnalysisEvent::OverlaySkipped {
                message: "Overlay is not available on this server.".to_string(),
            })
            .await;
            return Ok(verdicts);
        }
    };

    send(&events, AnalysisEvent::Annotating {
        message: "Drawing skeleton overlay...".to_string(),
    })
    .await;

    let outcome = pipeline
        .generate(RenderRequest {
            video_bytes: request.video_bytes,
            verdicts: verdicts.clone(),
        })
        .await;

    let event = match outcome {
        Ok(Some(artifact)) => {
            info!(id = %artifact.id, "Overlay delivered");
            AnalysisEvent::Overlay {
                overlay_url: artifact.video_url,
                thumbnail_url: artifact.thumbnail_url,
            }
        }
        Ok(None) => AnalysisEvent::OverlaySkipped {
            message: "Overlay is not available on this server.".to_string(),
        },
        Err(e) => {
            warn!(error = %e, kind = e.kind().as_str(), "Overlay failed");
            AnalysisEvent::OverlayFailed {
                message: e.user_message().to_string(),
                kind: e.kind(),
            }
        }
    };
    send(&events, event).await;

    Ok(verdicts)
}

async fn send(events: &mpsc::Sender<AnalysisEvent>, event: AnalysisEvent) {
    if events.send(event).await.is_err() {
        warn!("Event receiver dropped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OverlayConfig;
    use crate::error::WorkerError;
    use crate::sink::LocalArtifactSink;
    use async_trait::async_trait;
    use bowl_media::{MediaResult, PoseCapability, RenderBackend, RenderJob, RenderStats};
    use bowl_models::VerdictStatus;
    use std::path::PathBuf;
    use std::sync::Arc;

    struct FixedSource(WorkerResult<Vec<PhaseVerdict>>);

    #[async_trait]
    impl PhaseVerdictSource for FixedSource {
        async fn fetch_verdicts(&self, _: &[u8], _: &CoachingRequest) -> WorkerResult<Vec<PhaseVerdict>> {
            match &self.0 {
                Ok(v) => Ok(v.clone()),
                Err(e) => Err(WorkerError::verdict_source(e.to_string())),
            }
        }
    }

    struct TinyOutputBackend;

    impl RenderBackend for TinyOutputBackend {
        fn render(&self, job: RenderJob<'_>) -> MediaResult<RenderStats> {
            std::fs::write(job.output, b"tiny")?;
            Ok(RenderStats::default())
        }
    }

    fn verdicts() -> Vec<PhaseVerdict> {
        vec![
            PhaseVerdict::new("Run-up", VerdictStatus::Good),
            PhaseVerdict::new("Release", VerdictStatus::NeedsWork),
        ]
    }

    fn request(generate_overlay: bool) -> DeliveryRequest {
        DeliveryRequest {
            video_bytes: vec![0; 32],
            coaching: CoachingRequest::default(),
            generate_overlay,
        }
    }

    async fn collect(mut rx: mpsc::Receiver<AnalysisEvent>) -> Vec<AnalysisEvent> {
        let mut out = Vec::new();
        while let Some(event) = rx.recv().await {
            out.push(event);
        }
        out
    }

    #[tokio::test]
    async fn test_report_without_overlay() {
        let (tx, rx) = mpsc::channel(8);
        let source = FixedSource(Ok(verdicts()));

        let result = analyze_delivery(&source, None, request(false), tx, Duration::from_secs(5)).await;
        assert_eq!(result.unwrap().len(), 2);

        let events = collect(rx).await;
        assert_eq!(events, vec![AnalysisEvent::Report { phases: verdicts() }]);
    }

    #[tokio::test]
    async fn test_overlay_skipped_without_pipeline() {
        let (tx, rx) = mpsc::channel(8);
        let source = FixedSource(Ok(verdicts()));

        analyze_delivery(&source, None, request(true), tx, Duration::from_secs(5))
            .await
            .unwrap();

        let events = collect(rx).await;
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], AnalysisEvent::Report { .. }));
        assert!(matches!(events[1], AnalysisEvent::OverlaySkipped { .. }));
    }

    #[tokio::test]
    async fn test_overlay_failure_keeps_report() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = OverlayConfig {
            work_dir: dir.path().join("work"),
            pose: PoseCapability::Available {
                model_path: PathBuf::from("pose.onnx"),
            },
            ..Default::default()
        };
        let sink = Arc::new(LocalArtifactSink::new(dir.path().join("store"), None));
        let pipeline =
            OverlayPipeline::with_backend(config, sink, Some(Arc::new(TinyOutputBackend))).unwrap();

        let (tx, rx) = mpsc::channel(8);
        let source = FixedSource(Ok(verdicts()));
        let result =
            analyze_delivery(&source, Some(&pipeline), request(true), tx, Duration::from_secs(5)).await;
        assert!(result.is_ok());

        let events = collect(rx).await;
        assert!(matches!(events[0], AnalysisEvent::Report { .. }));
        assert!(matches!(events[1], AnalysisEvent::Annotating { .. }));
        assert!(matches!(
            events[2],
            AnalysisEvent::OverlayFailed {
                kind: ErrorKind::IntegrityFailure,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_verdict_failure_emits_error() {
        let (tx, rx) = mpsc::channel(8);
        let source = FixedSource(Err(WorkerError::verdict_source("coach offline")));

        let err = analyze_delivery(&source, None, request(true), tx, Duration::from_secs(5))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::VerdictSource);

        let events = collect(rx).await;
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], AnalysisEvent::Error { .. }));
    }

    #[test]
    fn test_event_json_shape() {
        let event = AnalysisEvent::OverlayFailed {
            message: "x".into(),
            kind: ErrorKind::Timeout,
        };
        let json: serde_json::Value = serde_json::from_str(&event.to_json_line()).unwrap();
        assert_eq!(json["status"], "overlay_failed");
        assert_eq!(json["kind"], "timeout");
    }
}
