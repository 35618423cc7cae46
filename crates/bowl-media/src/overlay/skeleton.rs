//! Limb connections drawn between tracked joints.

use bowl_models::Joint;

/// Adjacent joint pairs of the body outline (torso, arms, legs).
pub const CONNECTIONS: [(Joint, Joint); 12] = [
    (Joint::LeftShoulder, Joint::RightShoulder),
    (Joint::LeftShoulder, Joint::LeftElbow),
    (Joint::LeftElbow, Joint::LeftWrist),
    (Joint::RightShoulder, Joint::RightElbow),
    (Joint::RightElbow, Joint::RightWrist),
    (Joint::LeftShoulder, Joint::LeftHip),
    (Joint::RightShoulder, Joint::RightHip),
    (Joint::LeftHip, Joint::RightHip),
    (Joint::LeftHip, Joint::LeftKnee),
    (Joint::LeftKnee, Joint::LeftAnkle),
    (Joint::RightHip, Joint::RightKnee),
    (Joint::RightKnee, Joint::RightAnkle),
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_every_joint_is_connected() {
        let touched: BTreeSet<Joint> = CONNECTIONS.iter().flat_map(|(a, b)| [*a, *b]).collect();
        assert_eq!(touched.len(), Joint::ALL.len());
    }

    #[test]
    fn test_no_self_loops() {
        assert!(CONNECTIONS.iter().all(|(a, b)| a != b));
    }
}
