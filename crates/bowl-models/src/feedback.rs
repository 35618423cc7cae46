//! Per-phase joint feedback and the phase timeline.
//!
//! The timeline doubles as the on-disk feedback descriptor consumed by the
//! render step:
//!
//! ```json
//! {"phases": [{"start": 0.0, "end": 2.0, "name": "Run-up",
//!              "feedback": {"injury_risk": [], "slow": [], "good": ["LEFT_KNEE"]}}]}
//! ```

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

use crate::joint::Joint;

/// Feedback category, declared in priority order (highest first).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackCategory {
    InjuryRisk,
    Slow,
    Good,
}

impl FeedbackCategory {
    /// Categories from highest to lowest priority.
    pub const BY_PRIORITY: [FeedbackCategory; 3] = [
        FeedbackCategory::InjuryRisk,
        FeedbackCategory::Slow,
        FeedbackCategory::Good,
    ];
}

/// Joints called out for one phase, grouped by category.
///
/// A joint may be listed in several sets; [`FeedbackSet::category_of`]
/// resolves it to the highest-priority one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FeedbackSet {
    #[serde(default)]
    pub injury_risk: BTreeSet<Joint>,
    #[serde(default)]
    pub slow: BTreeSet<Joint>,
    #[serde(default)]
    pub good: BTreeSet<Joint>,
}

impl FeedbackSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add joints to a category (builder style).
    pub fn with(mut self, category: FeedbackCategory, joints: impl IntoIterator<Item = Joint>) -> Self {
        self.set_mut(category).extend(joints);
        self
    }

    pub fn set(&self, category: FeedbackCategory) -> &BTreeSet<Joint> {
        match category {
            FeedbackCategory::InjuryRisk => &self.injury_risk,
            FeedbackCategory::Slow => &self.slow,
            FeedbackCategory::Good => &self.good,
        }
    }

    pub fn set_mut(&mut self, category: FeedbackCategory) -> &mut BTreeSet<Joint> {
        match category {
            FeedbackCategory::InjuryRisk => &mut self.injury_risk,
            FeedbackCategory::Slow => &mut self.slow,
            FeedbackCategory::Good => &mut self.good,
        }
    }

    /// Highest-priority category naming `joint`, if any.
    pub fn category_of(&self, joint: Joint) -> Option<FeedbackCategory> {
        FeedbackCategory::BY_PRIORITY
            .into_iter()
            .find(|c| self.set(*c).contains(&joint))
    }

    pub fn is_empty(&self) -> bool {
        self.injury_risk.is_empty() && self.slow.is_empty() && self.good.is_empty()
    }
}

/// A named `[start, end)` interval with its feedback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Phase {
    pub start: f64,
    pub end: f64,
    pub name: String,
    #[serde(default)]
    pub feedback: FeedbackSet,
}

impl Phase {
    pub fn new(start: f64, end: f64, name: impl Into<String>, feedback: FeedbackSet) -> Self {
        Self {
            start,
            end,
            name: name.into(),
            feedback,
        }
    }

    /// Whether `t` falls inside `[start, end)`.
    pub fn contains(&self, t: f64) -> bool {
        self.start <= t && t < self.end
    }
}

/// Errors building a timeline.
#[derive(Debug, Error, PartialEq)]
pub enum TimelineError {
    #[error("Timeline has no phases")]
    Empty,

    #[error("Phase {index} has an invalid interval [{start}, {end})")]
    InvalidInterval { index: usize, start: f64, end: f64 },

    #[error("Phase {index} starts at {start} before previous phase ends at {previous_end}")]
    Overlap {
        index: usize,
        start: f64,
        previous_end: f64,
    },

    #[error("Invalid clip duration: {0}")]
    InvalidDuration(f64),
}

/// Ordered, non-overlapping list of phases for one render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TimelineDescriptor", into = "TimelineDescriptor")]
pub struct PhaseTimeline {
    phases: Vec<Phase>,
}

impl PhaseTimeline {
    /// Build a timeline, checking ordering and interval validity.
    pub fn new(phases: Vec<Phase>) -> Result<Self, TimelineError> {
        if phases.is_empty() {
            return Err(TimelineError::Empty);
        }

        let mut previous_end = f64::NEG_INFINITY;
        for (index, phase) in phases.iter().enumerate() {
            if !phase.start.is_finite() || !phase.end.is_finite() || phase.end <= phase.start {
                return Err(TimelineError::InvalidInterval {
                    index,
                    start: phase.start,
                    end: phase.end,
                });
            }
            // Small epsilon: equal-width slices accumulate float error
            if phase.start + 1e-9 < previous_end {
                return Err(TimelineError::Overlap {
                    index,
                    start: phase.start,
                    previous_end,
                });
            }
            previous_end = phase.end;
        }

        Ok(Self { phases })
    }

    /// Split `duration` into equal-width phases, one per `(name, feedback)`.
    pub fn equal_slices(
        entries: Vec<(String, FeedbackSet)>,
        duration: f64,
    ) -> Result<Self, TimelineError> {
        if entries.is_empty() {
            return Err(TimelineError::Empty);
        }
        if !duration.is_finite() || duration <= 0.0 {
            return Err(TimelineError::InvalidDuration(duration));
        }

        let slice = duration / entries.len() as f64;
        let phases = entries
            .into_iter()
            .enumerate()
            .map(|(i, (name, feedback))| {
                Phase::new(i as f64 * slice, (i + 1) as f64 * slice, name, feedback)
            })
            .collect();

        Self::new(phases)
    }

    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    pub fn len(&self) -> usize {
        self.phases.len()
    }

    /// Always false; a timeline has at least one phase.
    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Phase> {
        self.phases.get(index)
    }

    /// End of the last phase.
    pub fn end(&self) -> f64 {
        self.phases.last().map(|p| p.end).unwrap_or(0.0)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// Wire form of the timeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TimelineDescriptor {
    phases: Vec<Phase>,
}

impl TryFrom<TimelineDescriptor> for PhaseTimeline {
    type Error = TimelineError;

    fn try_from(value: TimelineDescriptor) -> Result<Self, Self::Error> {
        PhaseTimeline::new(value.phases)
    }
}

impl From<PhaseTimeline> for TimelineDescriptor {
    fn from(value: PhaseTimeline) -> Self {
        TimelineDescriptor {
            phases: value.phases,
        }
    }
}
