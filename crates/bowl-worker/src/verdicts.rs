//! Phase verdict sources.
//!
//! The coach that judges each phase lives outside this crate. The worker
//! only needs an ordered list of [`PhaseVerdict`]s per delivery.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::error::{WorkerError, WorkerResult};
use crate::metrics;
use bowl_models::PhaseVerdict;

/// Coaching context passed to the verdict source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoachingRequest {
    /// e.g. "pace", "spin"
    #[serde(default)]
    pub bowler_type: Option<String>,
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_language() -> String {
    "en".to_string()
}

impl Default for CoachingRequest {
    fn default() -> Self {
        Self {
            bowler_type: None,
            language: default_language(),
        }
    }
}

/// Produces ordered phase verdicts for one delivery.
#[async_trait]
pub trait PhaseVerdictSource: Send + Sync {
    async fn fetch_verdicts(
        &self,
        video: &[u8],
        request: &CoachingRequest,
    ) -> WorkerResult<Vec<PhaseVerdict>>;
}

/// Fetch verdicts, bounding the caller's wait.
pub async fn fetch_with_timeout(
    source: &dyn PhaseVerdictSource,
    video: &[u8],
    request: &CoachingRequest,
    timeout: Duration,
) -> WorkerResult<Vec<PhaseVerdict>> {
    let started = Instant::now();
    let result = tokio::time::timeout(timeout, source.fetch_verdicts(video, request)).await;
    metrics::record_verdict_duration(started.elapsed().as_secs_f64());

    match result {
        Ok(Ok(verdicts)) => {
            info!(phases = verdicts.len(), "Received phase verdicts");
            Ok(verdicts)
        }
        Ok(Err(e)) => Err(e),
        Err(_) => {
            warn!(timeout_secs = timeout.as_secs(), "Verdict source timed out");
            Err(WorkerError::Timeout(timeout.as_secs()))
        }
    }
}

/// Verdicts recorded to a JSON file, either a bare array or the coach's
/// `{"phases": [...]}` report.
#[derive(Debug, Clone)]
pub struct JsonVerdictSource {
    path: PathBuf,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum VerdictFile {
    Report { phases: Vec<PhaseVerdict> },
    List(Vec<PhaseVerdict>),
}

impl JsonVerdictSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn parse(json: &str) -> WorkerResult<Vec<PhaseVerdict>> {
        let file: VerdictFile = serde_json::from_str(json)
            .map_err(|e| WorkerError::verdict_source(format!("invalid verdict JSON: {e}")))?;
        Ok(match file {
            VerdictFile::Report { phases } => phases,
            VerdictFile::List(phases) => phases,
        })
    }
}

#[async_trait]
impl PhaseVerdictSource for JsonVerdictSource {
    async fn fetch_verdicts(
        &self,
        _video: &[u8],
        _request: &CoachingRequest,
    ) -> WorkerResult<Vec<PhaseVerdict>> {
        let raw = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            WorkerError::verdict_source(format!("read {}: {e}", self.path.display()))
        })?;
        Self::parse(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bowl_models::VerdictStatus;

    struct StalledSource;

    #[async_trait]
    impl PhaseVerdictSource for StalledSource {
        async fn fetch_verdicts(&self, _: &[u8], _: &CoachingRequest) -> WorkerResult<Vec<PhaseVerdict>> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_parse_report_and_list() {
        let report = r#"{"phases": [{"name": "Release", "status": "NEEDS WORK", "clip_ts": 2.1}]}"#;
        let phases = JsonVerdictSource::parse(report).unwrap();
        assert_eq!(phases[0].status, VerdictStatus::NeedsWork);
        assert_eq!(phases[0].clip_timestamp, Some(2.1));

        let list = r#"[{"name": "Run-up", "status": "GOOD"}, {"name": "Release", "status": "GOOD"}]"#;
        assert_eq!(JsonVerdictSource::parse(list).unwrap().len(), 2);

        assert!(matches!(
            JsonVerdictSource::parse("{}"),
            Err(WorkerError::VerdictSource(_))
        ));
    }

    #[tokio::test]
    async fn test_json_source_reads_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("verdicts.json");
        tokio::fs::write(&path, r#"[{"name": "Follow-through", "status": "GOOD"}]"#)
            .await
            .unwrap();

        let source = JsonVerdictSource::new(&path);
        let verdicts = source.fetch_verdicts(b"", &CoachingRequest::default()).await.unwrap();
        assert_eq!(verdicts[0].name, "Follow-through");
    }

    #[tokio::test]
    async fn test_timeout_bounds_wait() {
        let result = fetch_with_timeout(
            &StalledSource,
            b"",
            &CoachingRequest::default(),
            Duration::from_millis(50),
        )
        .await;
        assert!(matches!(result, Err(WorkerError::Timeout(_))));
    }
}
