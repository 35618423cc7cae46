//! Time-phased skeleton overlay.

pub mod backend;
pub mod feedback_map;
pub mod render_loop;
pub mod renderer;
pub mod skeleton;
pub mod style;

pub use backend::{default_backend, RenderBackend, RenderJob};
pub use feedback_map::{normalize_phase_name, FallbackPolicy, JointMappingTable, PhaseJoints};
pub use render_loop::{render_overlay, verify_output, RenderStats, DEFAULT_MIN_OUTPUT_BYTES};
pub use renderer::{
    joint_color, ActivePhase, Caption, FramePlan, JointMarker, OverlayRenderer, RenderMode,
    RenderState, Segment,
};
pub use style::{RenderStyle, Rgb};
