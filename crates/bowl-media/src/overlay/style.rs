//! Colors and geometry for the overlay.

use serde::{Deserialize, Serialize};

use bowl_models::FeedbackCategory;

/// 8-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const RED: Rgb = Rgb(255, 0, 0);
    pub const YELLOW: Rgb = Rgb(255, 255, 0);
    pub const GREEN: Rgb = Rgb(0, 255, 0);
    pub const WHITE: Rgb = Rgb(255, 255, 255);

    pub fn gray(level: u8) -> Rgb {
        Rgb(level, level, level)
    }

    /// Channels in OpenCV's BGR order.
    pub fn to_bgr(self) -> [u8; 3] {
        [self.2, self.1, self.0]
    }
}

/// Visual parameters for one render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderStyle {
    pub injury_risk: Rgb,
    pub slow: Rgb,
    pub good: Rgb,
    /// Joint color while scanning
    pub scanning_joint: Rgb,
    pub scanning_connection: Rgb,
    pub feedback_connection: Rgb,
    pub caption: Rgb,

    pub scanning_joint_radius: i32,
    pub feedback_joint_radius: i32,
    pub connection_thickness: i32,

    /// Caption baseline origin in output pixels
    pub caption_origin: (i32, i32),
    pub caption_scale: f64,
    pub caption_thickness: i32,

    /// Times each frame is written
    pub scanning_repeats: u32,
    pub feedback_repeats: u32,

    /// Landmarks below this visibility are not drawn
    pub min_visibility: f32,
}

impl Default for RenderStyle {
    fn default() -> Self {
        Self {
            injury_risk: Rgb::RED,
            slow: Rgb::YELLOW,
            good: Rgb::GREEN,
            scanning_joint: Rgb::gray(180),
            scanning_connection: Rgb::gray(80),
            feedback_connection: Rgb::gray(200),
            caption: Rgb::WHITE,
            scanning_joint_radius: 5,
            feedback_joint_radius: 8,
            connection_thickness: 2,
            caption_origin: (20, 40),
            caption_scale: 1.0,
            caption_thickness: 2,
            scanning_repeats: 1,
            feedback_repeats: 4,
            min_visibility: 0.5,
        }
    }
}

impl RenderStyle {
    pub fn category_color(&self, category: FeedbackCategory) -> Rgb {
        match category {
            FeedbackCategory::InjuryRisk => self.injury_risk,
            FeedbackCategory::Slow => self.slow,
            FeedbackCategory::Good => self.good,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bgr_order() {
        assert_eq!(Rgb::RED.to_bgr(), [0, 0, 255]);
        assert_eq!(Rgb::YELLOW.to_bgr(), [0, 255, 255]);
    }

    #[test]
    fn test_partial_style_override() {
        let style: RenderStyle = serde_json::from_str(r#"{"feedback_repeats": 2}"#).unwrap();
        assert_eq!(style.feedback_repeats, 2);
        assert_eq!(style.scanning_repeats, 1);
        assert_eq!(style.category_color(FeedbackCategory::InjuryRisk), Rgb::RED);
    }
}
