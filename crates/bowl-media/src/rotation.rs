//! Display rotation of phone-captured clips.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Clockwise display rotation in quarter turns, as stored in container
/// metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    None,
    Rotate90,
    Rotate180,
    Rotate270,
}

impl Rotation {
    /// Normalize raw metadata degrees into `[0, 360)`.
    ///
    /// Negative values wrap: `-90` becomes `270`.
    pub fn normalize_degrees(degrees: i64) -> i64 {
        degrees.rem_euclid(360)
    }

    /// Map raw metadata degrees to a rotation. Returns `None` for angles that
    /// are not a multiple of 90 after normalization.
    pub fn from_degrees(degrees: i64) -> Option<Rotation> {
        match Self::normalize_degrees(degrees) {
            0 => Some(Rotation::None),
            90 => Some(Rotation::Rotate90),
            180 => Some(Rotation::Rotate180),
            270 => Some(Rotation::Rotate270),
            _ => None,
        }
    }

    pub fn degrees(&self) -> u16 {
        match self {
            Rotation::None => 0,
            Rotation::Rotate90 => 90,
            Rotation::Rotate180 => 180,
            Rotation::Rotate270 => 270,
        }
    }

    /// Whether applying this rotation swaps width and height.
    pub fn swaps_dimensions(&self) -> bool {
        matches!(self, Rotation::Rotate90 | Rotation::Rotate270)
    }

    /// Frame dimensions after the rotation is applied.
    pub fn output_dimensions(&self, width: u32, height: u32) -> (u32, u32) {
        if self.swaps_dimensions() {
            (height, width)
        } else {
            (width, height)
        }
    }
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}°", self.degrees())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_rotation_normalization() {
        assert_eq!(Rotation::from_degrees(-90), Some(Rotation::Rotate270));
        assert_eq!(Rotation::from_degrees(-180), Some(Rotation::Rotate180));
        assert_eq!(Rotation::from_degrees(-270), Some(Rotation::Rotate90));
        assert_eq!(Rotation::from_degrees(0), Some(Rotation::None));
    }

    #[test]
    fn test_all_negative_multiples_of_90() {
        for k in 1..=8i64 {
            let raw = -90 * k;
            let rotation = Rotation::from_degrees(raw).unwrap();
            assert_eq!(rotation.degrees() as i64, (360 + raw % 360) % 360, "raw {raw}");
        }
    }

    #[test]
    fn test_non_quarter_turns_rejected() {
        assert_eq!(Rotation::from_degrees(45), None);
        assert_eq!(Rotation::from_degrees(-30), None);
        assert_eq!(Rotation::from_degrees(360), Some(Rotation::None));
    }

    #[test]
    fn test_dimension_swap() {
        assert_eq!(Rotation::Rotate90.output_dimensions(1920, 1080), (1080, 1920));
        assert_eq!(Rotation::Rotate270.output_dimensions(1920, 1080), (1080, 1920));
        assert_eq!(Rotation::Rotate180.output_dimensions(1920, 1080), (1920, 1080));
        assert_eq!(Rotation::None.output_dimensions(1920, 1080), (1920, 1080));
    }
}
