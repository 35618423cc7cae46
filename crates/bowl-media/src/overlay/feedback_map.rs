//! Phase verdicts to per-joint feedback.
//!
//! The mapping from a coached phase to the joints it concerns is plain data:
//! a canonical-name table, an alias table, and a fallback policy for phases
//! the table does not name. The built-in table can be replaced wholesale by a
//! JSON file with the same shape.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

use crate::error::{MediaError, MediaResult};
use bowl_models::{FeedbackCategory, FeedbackSet, Joint, PhaseTimeline, PhaseVerdict, VerdictStatus};

/// Joints a phase concerns, per category. `None` means the column is unset
/// and the fallback policy applies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseJoints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub injury_risk: Option<Vec<Joint>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slow: Option<Vec<Joint>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub good: Option<Vec<Joint>>,
}

/// Joints used when the table leaves a column unset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackPolicy {
    /// GOOD verdict, `good` unset
    pub good: Vec<Joint>,
    /// NEEDS WORK verdict, `injury_risk` unset
    pub injury_risk: Vec<Joint>,
    /// NEEDS WORK verdict, `slow` unset
    pub slow: Vec<Joint>,
}

impl Default for FallbackPolicy {
    fn default() -> Self {
        Self {
            good: vec![Joint::RightShoulder],
            injury_risk: Vec::new(),
            slow: vec![Joint::RightShoulder],
        }
    }
}

/// Canonical phase names, alias table and fallback policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointMappingTable {
    /// Normalized variant -> canonical name
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
    /// Canonical name -> joints
    pub phases: BTreeMap<String, PhaseJoints>,
    #[serde(default)]
    pub fallback: FallbackPolicy,
}

const BUILTIN_PHASES: &[(&str, &[Joint], &[Joint], &[Joint])] = &[
    // (name, injury_risk, slow, good); empty slice = unset
    (
        "run-up",
        &[],
        &[],
        &[Joint::RightKnee, Joint::LeftKnee, Joint::RightHip, Joint::LeftHip],
    ),
    (
        "loading/coil",
        &[],
        &[],
        &[Joint::RightShoulder, Joint::LeftShoulder, Joint::RightHip],
    ),
    ("release", &[Joint::RightElbow], &[], &[Joint::RightWrist]),
    ("wrist/snap", &[], &[Joint::RightWrist], &[]),
    ("follow-through", &[], &[Joint::RightHip], &[Joint::RightShoulder]),
    ("head/eyes", &[], &[Joint::LeftShoulder], &[]),
];

const BUILTIN_ALIASES: &[(&str, &str)] = &[
    ("run up", "run-up"),
    ("runup", "run-up"),
    ("approach", "run-up"),
    ("loading", "loading/coil"),
    ("coil", "loading/coil"),
    ("loading / coil", "loading/coil"),
    ("release action", "release"),
    ("delivery stride", "release"),
    ("wrist", "wrist/snap"),
    ("snap", "wrist/snap"),
    ("wrist snap", "wrist/snap"),
    ("wrist / snap", "wrist/snap"),
    ("follow through", "follow-through"),
    ("followthrough", "follow-through"),
    ("head", "head/eyes"),
    ("eyes", "head/eyes"),
    ("head position", "head/eyes"),
    ("head / eyes", "head/eyes"),
];

impl Default for JointMappingTable {
    fn default() -> Self {
        let column = |joints: &[Joint]| (!joints.is_empty()).then(|| joints.to_vec());

        let phases = BUILTIN_PHASES
            .iter()
            .map(|(name, injury_risk, slow, good)| {
                (
                    name.to_string(),
                    PhaseJoints {
                        injury_risk: column(injury_risk),
                        slow: column(slow),
                        good: column(good),
                    },
                )
            })
            .collect();

        let aliases = BUILTIN_ALIASES
            .iter()
            .map(|(alias, canonical)| (alias.to_string(), canonical.to_string()))
            .collect();

        Self {
            aliases,
            phases,
            fallback: FallbackPolicy::default(),
        }
    }
}

/// Lowercase, trim, and collapse runs of whitespace or underscores into a
/// single space.
pub fn normalize_phase_name(name: &str) -> String {
    name.to_lowercase()
        .split(|c: char| c.is_whitespace() || c == '_')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

impl JointMappingTable {
    /// Load a table from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> MediaResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(MediaError::FileNotFound(path.to_path_buf()));
        }
        let raw = std::fs::read_to_string(path)?;
        let table = serde_json::from_str(&raw)?;
        debug!(path = %path.display(), "Loaded joint mapping table");
        Ok(table)
    }

    /// Entry for a phase name, after normalization and alias resolution.
    pub fn resolve(&self, name: &str) -> Option<&PhaseJoints> {
        let normalized = normalize_phase_name(name);
        self.phases.get(&normalized).or_else(|| {
            self.aliases
                .get(&normalized)
                .and_then(|canonical| self.phases.get(canonical))
        })
    }

    /// Feedback for one verdict.
    ///
    /// GOOD fills `good`; NEEDS WORK fills `injury_risk` and `slow`. Any
    /// other status yields an empty set.
    pub fn feedback_for(&self, verdict: &PhaseVerdict) -> FeedbackSet {
        let entry = self.resolve(&verdict.name);
        let pick = |column: Option<&Vec<Joint>>, fallback: &Vec<Joint>| {
            column.unwrap_or(fallback).iter().copied().collect::<Vec<_>>()
        };

        match verdict.status {
            VerdictStatus::Good => FeedbackSet::new().with(
                FeedbackCategory::Good,
                pick(entry.and_then(|e| e.good.as_ref()), &self.fallback.good),
            ),
            VerdictStatus::NeedsWork => FeedbackSet::new()
                .with(
                    FeedbackCategory::InjuryRisk,
                    pick(
                        entry.and_then(|e| e.injury_risk.as_ref()),
                        &self.fallback.injury_risk,
                    ),
                )
                .with(
                    FeedbackCategory::Slow,
                    pick(entry.and_then(|e| e.slow.as_ref()), &self.fallback.slow),
                ),
            VerdictStatus::Unrecognized(_) => FeedbackSet::new(),
        }
    }

    /// Split `duration` into one equal slice per verdict, in verdict order.
    pub fn build_timeline(
        &self,
        verdicts: &[PhaseVerdict],
        duration: f64,
    ) -> MediaResult<PhaseTimeline> {
        let entries = verdicts
            .iter()
            .enumerate()
            .map(|(i, v)| {
                let name = if v.name.trim().is_empty() {
                    format!("phase_{i}")
                } else {
                    v.name.clone()
                };
                (name, self.feedback_for(v))
            })
            .collect();

        Ok(PhaseTimeline::equal_slices(entries, duration)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bowl_models::TimelineError;

    fn verdict(name: &str, status: &str) -> PhaseVerdict {
        PhaseVerdict::new(name, VerdictStatus::parse(status))
    }

    #[test]
    fn test_normalize_phase_name() {
        assert_eq!(normalize_phase_name("  Release   Action "), "release action");
        assert_eq!(normalize_phase_name("FOLLOW_THROUGH"), "follow through");
        assert_eq!(normalize_phase_name("Run-Up"), "run-up");
    }

    #[test]
    fn test_alias_resolution() {
        let table = JointMappingTable::default();
        let release = table.resolve("Release Action").unwrap();
        assert_eq!(release.injury_risk, Some(vec![Joint::RightElbow]));
        assert!(table.resolve("follow_through").is_some());
        assert!(table.resolve("Run Up").is_some());
        assert!(table.resolve("warm-down").is_none());
    }

    #[test]
    fn test_release_needs_work() {
        let table = JointMappingTable::default();
        let fb = table.feedback_for(&verdict("Release", "NEEDS WORK"));
        assert!(fb.injury_risk.contains(&Joint::RightElbow));
        // slow column unset for release, fallback applies
        assert!(fb.slow.contains(&Joint::RightShoulder));
        assert!(fb.good.is_empty());
    }

    #[test]
    fn test_good_uses_good_column_only() {
        let table = JointMappingTable::default();
        let fb = table.feedback_for(&verdict("Run-up", "GOOD"));
        assert_eq!(fb.good.len(), 4);
        assert!(fb.injury_risk.is_empty() && fb.slow.is_empty());
    }

    #[test]
    fn test_unknown_phase_fallbacks() {
        let table = JointMappingTable::default();

        let good = table.feedback_for(&verdict("Bounce", "GOOD"));
        assert_eq!(good.good.iter().copied().collect::<Vec<_>>(), vec![Joint::RightShoulder]);

        let needs_work = table.feedback_for(&verdict("Bounce", "needs work"));
        assert!(needs_work.injury_risk.is_empty());
        assert_eq!(
            needs_work.slow.iter().copied().collect::<Vec<_>>(),
            vec![Joint::RightShoulder]
        );
    }

    #[test]
    fn test_unrecognized_status_is_empty() {
        let table = JointMappingTable::default();
        assert!(table.feedback_for(&verdict("Release", "PENDING")).is_empty());
    }

    #[test]
    fn test_build_timeline_equal_slices() {
        let table = JointMappingTable::default();
        let verdicts = vec![
            verdict("Run-up", "GOOD"),
            verdict("Release", "NEEDS WORK"),
        ];
        let timeline = table.build_timeline(&verdicts, 4.0).unwrap();

        assert_eq!(timeline.len(), 2);
        let release = timeline.get(1).unwrap();
        assert_eq!(release.name, "Release");
        assert!((release.start - 2.0).abs() < 1e-9);
        assert!((release.end - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_verdicts_rejected() {
        let table = JointMappingTable::default();
        assert!(matches!(
            table.build_timeline(&[], 5.0),
            Err(MediaError::InvalidTimeline(TimelineError::Empty))
        ));
    }

    #[test]
    fn test_load_override_table() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("joints.json");
        std::fs::write(
            &path,
            r#"{"aliases": {"bowl": "release"},
                "phases": {"release": {"injury_risk": ["LEFT_ELBOW"]}},
                "fallback": {"good": [], "injury_risk": [], "slow": []}}"#,
        )
        .unwrap();

        let table = JointMappingTable::load(&path).unwrap();
        let fb = table.feedback_for(&verdict("Bowl", "NEEDS WORK"));
        assert!(fb.injury_risk.contains(&Joint::LeftElbow));
        assert!(fb.slow.is_empty());
    }
}
