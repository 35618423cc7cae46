//! Coach phase verdicts.
//!
//! Verdicts come from the vision-language coach as an ordered list, one per
//! biomechanical phase. The overlay only reads `name` and `status`; the
//! remaining fields travel with the report.

use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Coaching verdict for one phase.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VerdictStatus {
    /// Phase executed well.
    Good,
    /// Phase needs work (also accepts "needs improvement").
    NeedsWork,
    /// Anything else the coach produced. Rendered with empty feedback.
    Unrecognized(String),
}

impl VerdictStatus {
    /// Classify a raw status string.
    ///
    /// Matching is case-insensitive and substring based, so decorated values
    /// such as `"✅ GOOD"` still classify.
    pub fn parse(raw: &str) -> Self {
        let upper = raw.to_uppercase();
        if upper.contains("GOOD") {
            VerdictStatus::Good
        } else if upper.contains("NEEDS WORK") || upper.contains("NEEDS IMPROVEMENT") {
            VerdictStatus::NeedsWork
        } else {
            VerdictStatus::Unrecognized(raw.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            VerdictStatus::Good => "GOOD",
            VerdictStatus::NeedsWork => "NEEDS WORK",
            VerdictStatus::Unrecognized(raw) => raw,
        }
    }
}

impl fmt::Display for VerdictStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for VerdictStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for VerdictStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(VerdictStatus::parse(&raw))
    }
}

impl JsonSchema for VerdictStatus {
    fn schema_name() -> String {
        "VerdictStatus".to_string()
    }

    fn json_schema(gen: &mut schemars::gen::SchemaGenerator) -> schemars::schema::Schema {
        String::json_schema(gen)
    }
}

/// One phase record from the coach.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PhaseVerdict {
    /// Display name, e.g. "Release Action"
    pub name: String,
    /// GOOD / NEEDS WORK
    pub status: VerdictStatus,
    #[serde(default)]
    pub observation: String,
    #[serde(default)]
    pub tip: Option<String>,
    /// Timestamp the coach associated with this phase, in seconds.
    /// Not used for overlay timing.
    #[serde(default, alias = "clip_ts")]
    pub clip_timestamp: Option<f64>,
}

impl PhaseVerdict {
    /// Create a verdict with only the fields the overlay reads.
    pub fn new(name: impl Into<String>, status: VerdictStatus) -> Self {
        Self {
            name: name.into(),
            status,
            observation: String::new(),
            tip: None,
            clip_timestamp: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parsing() {
        assert_eq!(VerdictStatus::parse("GOOD"), VerdictStatus::Good);
        assert_eq!(VerdictStatus::parse("good"), VerdictStatus::Good);
        assert_eq!(VerdictStatus::parse("NEEDS WORK"), VerdictStatus::NeedsWork);
        assert_eq!(
            VerdictStatus::parse("Needs Improvement"),
            VerdictStatus::NeedsWork
        );
        assert_eq!(
            VerdictStatus::parse("N/A"),
            VerdictStatus::Unrecognized("N/A".to_string())
        );
    }

    #[test]
    fn test_verdict_deserializes_coach_payload() {
        let json = r#"{
            "name": "Release Action",
            "status": "NEEDS WORK",
            "observation": "Visible elbow flexion.",
            "tip": "Lock the elbow early.",
            "clip_ts": 2.0
        }"#;
        let verdict: PhaseVerdict = serde_json::from_str(json).unwrap();
        assert_eq!(verdict.name, "Release Action");
        assert_eq!(verdict.status, VerdictStatus::NeedsWork);
        assert_eq!(verdict.clip_timestamp, Some(2.0));
    }

    #[test]
    fn test_verdict_minimal_payload() {
        let verdict: PhaseVerdict =
            serde_json::from_str(r#"{"name": "Run-up", "status": "GOOD"}"#).unwrap();
        assert_eq!(verdict.status, VerdictStatus::Good);
        assert!(verdict.tip.is_none());
        assert!(verdict.observation.is_empty());
    }
}
