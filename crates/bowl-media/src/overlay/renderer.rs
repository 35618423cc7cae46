//! Per-frame overlay decisions.
//!
//! [`OverlayRenderer`] maps a frame's timestamp to the active phase and turns
//! the detected pose into a [`FramePlan`]: what to draw and how many times to
//! write the frame. It never touches pixels itself.
//!
//! The first phase is rendered in SCANNING mode: every visible joint in a
//! neutral tone, at normal speed. Every later phase is FEEDBACK mode: only
//! joints named by the phase's feedback are drawn, colored by their highest
//! priority category, and each frame is repeated to slow playback down.

use serde::{Deserialize, Serialize};

use super::skeleton::CONNECTIONS;
use super::style::{RenderStyle, Rgb};
use crate::pose::PoseLandmarks;
use crate::rotation::Rotation;
use bowl_models::{FeedbackSet, Joint, Phase, PhaseTimeline};

/// Caption label before the first feedback phase.
pub const SCANNING_LABEL: &str = "SCANNING...";
/// Caption label after the last phase ends.
pub const DONE_LABEL: &str = "DONE";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderMode {
    Scanning,
    Feedback,
}

impl RenderMode {
    pub fn for_phase_index(index: usize) -> Self {
        if index == 0 {
            RenderMode::Scanning
        } else {
            RenderMode::Feedback
        }
    }
}

/// The phase governing one frame.
#[derive(Debug, Clone, Copy)]
pub struct ActivePhase<'a> {
    pub index: usize,
    pub phase: &'a Phase,
    pub mode: RenderMode,
    /// The timestamp is past the end of the last phase
    pub finished: bool,
    /// The timestamp falls in a gap after this phase and before the next
    pub between: bool,
}

impl ActivePhase<'_> {
    /// Caption label without the timestamp.
    pub fn label(&self) -> String {
        if self.finished {
            DONE_LABEL.to_string()
        } else if self.mode == RenderMode::Scanning {
            SCANNING_LABEL.to_string()
        } else {
            self.phase.name.to_uppercase()
        }
    }

    /// Feedback to draw; `None` inside a gap between phases.
    pub fn feedback(&self) -> Option<&FeedbackSet> {
        (!self.between).then_some(&self.phase.feedback)
    }
}

/// Mutable state of one render.
#[derive(Debug, Clone)]
pub struct RenderState {
    frame_index: u64,
    phase_index: usize,
    rotation: Rotation,
    output_size: (u32, u32),
    transitions: u32,
}

impl RenderState {
    /// Fresh state for a stream of coded size `width` x `height`.
    pub fn new(rotation: Rotation, width: u32, height: u32) -> Self {
        Self {
            frame_index: 0,
            phase_index: 0,
            rotation,
            output_size: rotation.output_dimensions(width, height),
            transitions: 0,
        }
    }

    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    pub fn phase_index(&self) -> usize {
        self.phase_index
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    /// Output frame size after rotation.
    pub fn output_size(&self) -> (u32, u32) {
        self.output_size
    }

    /// Phase changes seen so far.
    pub fn transitions(&self) -> u32 {
        self.transitions
    }

    /// Move to the next source frame.
    pub fn advance_frame(&mut self) {
        self.frame_index += 1;
    }

    /// Advance the phase cursor to cover `t`. The cursor never moves back.
    fn seek(&mut self, timeline: &PhaseTimeline, t: f64) {
        while let Some(next) = timeline.get(self.phase_index + 1) {
            if t < next.start {
                break;
            }
            self.phase_index += 1;
            self.transitions += 1;
        }
    }
}

/// Caption placement and text.
#[derive(Debug, Clone, PartialEq)]
pub struct Caption {
    pub text: String,
    pub origin: (i32, i32),
    pub color: Rgb,
    pub scale: f64,
    pub thickness: i32,
}

/// A connection line between two joints.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub from: (i32, i32),
    pub to: (i32, i32),
    pub color: Rgb,
    pub thickness: i32,
}

/// A filled joint marker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointMarker {
    pub joint: Joint,
    pub center: (i32, i32),
    pub radius: i32,
    pub color: Rgb,
}

/// Everything to draw on one frame and how often to write it.
#[derive(Debug, Clone, PartialEq)]
pub struct FramePlan {
    pub phase_index: usize,
    pub mode: RenderMode,
    pub caption: Caption,
    pub segments: Vec<Segment>,
    pub markers: Vec<JointMarker>,
    pub repeats: u32,
}

impl FramePlan {
    pub fn marker(&self, joint: Joint) -> Option<&JointMarker> {
        self.markers.iter().find(|m| m.joint == joint)
    }
}

/// Color for a joint, or `None` if it is not drawn.
pub fn joint_color(mode: RenderMode, feedback: &FeedbackSet, joint: Joint, style: &RenderStyle) -> Option<Rgb> {
    match mode {
        RenderMode::Scanning => Some(style.scanning_joint),
        RenderMode::Feedback => feedback
            .category_of(joint)
            .map(|category| style.category_color(category)),
    }
}

/// Turns a phase timeline and per-frame poses into frame plans.
#[derive(Debug, Clone)]
pub struct OverlayRenderer {
    timeline: PhaseTimeline,
    style: RenderStyle,
    fps: f64,
}

impl OverlayRenderer {
    pub fn new(timeline: PhaseTimeline, style: RenderStyle, fps: f64) -> Self {
        Self {
            timeline,
            style,
            fps,
        }
    }

    pub fn timeline(&self) -> &PhaseTimeline {
        &self.timeline
    }

    pub fn style(&self) -> &RenderStyle {
        &self.style
    }

    /// Timestamp of the state's current frame.
    pub fn timestamp(&self, state: &RenderState) -> f64 {
        state.frame_index as f64 / self.fps
    }

    /// Resolve the phase governing time `t`, advancing the state's cursor.
    pub fn active_phase<'a>(&'a self, state: &mut RenderState, t: f64) -> Option<ActivePhase<'a>> {
        state.seek(&self.timeline, t);
        let phase = self.timeline.get(state.phase_index)?;
        let is_last = state.phase_index + 1 == self.timeline.len();

        Some(ActivePhase {
            index: state.phase_index,
            phase,
            mode: RenderMode::for_phase_index(state.phase_index),
            finished: is_last && t >= phase.end,
            between: !is_last && t >= phase.end,
        })
    }

    /// Plan the current frame of `state` drawn at `frame_size`.
    pub fn plan(
        &self,
        state: &mut RenderState,
        pose: Option<&PoseLandmarks>,
        frame_size: (u32, u32),
    ) -> Option<FramePlan> {
        let t = self.timestamp(state);
        let active = self.active_phase(state, t)?;
        let style = &self.style;
        let (width, height) = frame_size;

        let caption = Caption {
            text: format!("{} ({:.1}s)", active.label(), t),
            origin: style.caption_origin,
            color: style.caption,
            scale: style.caption_scale,
            thickness: style.caption_thickness,
        };

        let (line_color, radius, repeats) = match active.mode {
            RenderMode::Scanning => (
                style.scanning_connection,
                style.scanning_joint_radius,
                style.scanning_repeats,
            ),
            RenderMode::Feedback => (
                style.feedback_connection,
                style.feedback_joint_radius,
                style.feedback_repeats,
            ),
        };

        let mut segments = Vec::new();
        let mut markers = Vec::new();

        if let Some(pose) = pose {
            let no_feedback = FeedbackSet::new();
            let feedback = active.feedback().unwrap_or(&no_feedback);
            let visible = |joint: Joint| pose.visible(joint, style.min_visibility);

            for (a, b) in CONNECTIONS {
                if let (Some(pa), Some(pb)) = (visible(a), visible(b)) {
                    segments.push(Segment {
                        from: pa.to_pixel(width, height),
                        to: pb.to_pixel(width, height),
                        color: line_color,
                        thickness: style.connection_thickness,
                    });
                }
            }

            for joint in Joint::ALL {
                let Some(landmark) = visible(joint) else {
                    continue;
                };
                if let Some(color) = joint_color(active.mode, feedback, joint, style) {
                    markers.push(JointMarker {
                        joint,
                        center: landmark.to_pixel(width, height),
                        radius,
                        color,
                    });
                }
            }
        }

        Some(FramePlan {
            phase_index: active.index,
            mode: active.mode,
            caption,
            segments,
            markers,
            repeats: repeats.max(1),
        })
    }
}
