//! # Hit Validation
//!
//! Server-side eligibility test for attack targets.
//!
//! ## Philosophy
//!
//! NEVER trust the client. The client says "I attacked facing X".
//! We verify, from server positions only:
//! 1. Is the target within vertical reach?
//! 2. Is the target within 3D range?
//! 3. Is the target inside the attack's horizontal arc?

use pathbound_shared::constants::MAX_VERTICAL_REACH;
use pathbound_shared::math::{Vec2, Vec3};

/// Checks whether `target` can be hit from `attacker` facing `forward`.
///
/// `forward` must be a unit vector on the ground plane. `fov_deg` is the
/// full arc width. A target with no horizontal offset is always inside the
/// arc.
#[must_use]
pub fn is_within_range_and_arc(
    attacker: Vec3,
    target: Vec3,
    forward: Vec2,
    range: f32,
    fov_deg: f32,
) -> bool {
    let offset = target - attacker;
    if offset.y.abs() > MAX_VERTICAL_REACH || offset.length_squared() > range * range {
        return false;
    }

    let to_target = offset.planar().normalize_or_zero();
    if to_target == Vec2::ZERO {
        return true;
    }

    let min_dot = (fov_deg.to_radians() / 2.0).cos();
    forward.dot(to_target) >= min_dot
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    const FORWARD_Z: Vec2 = Vec2::new(0.0, 1.0);

    #[test]
    fn test_target_ahead_in_range() {
        assert!(is_within_range_and_arc(
            Vec3::ZERO,
            Vec3::new(0.0, 0.0, 2.0),
            FORWARD_Z,
            3.0,
            90.0
        ));
    }

    #[test]
    fn test_target_to_the_side() {
        assert!(!is_within_range_and_arc(
            Vec3::ZERO,
            Vec3::new(3.0, 0.0, 0.0),
            FORWARD_Z,
            3.0,
            90.0
        ));
    }

    #[test]
    fn test_target_beyond_range() {
        assert!(!is_within_range_and_arc(
            Vec3::ZERO,
            Vec3::new(0.0, 0.0, 6.0),
            FORWARD_Z,
            3.0,
            90.0
        ));
    }

    #[test]
    fn test_target_above_vertical_reach() {
        assert!(!is_within_range_and_arc(
            Vec3::ZERO,
            Vec3::new(0.0, 2.5, 0.5),
            FORWARD_Z,
            30.0,
            90.0
        ));
    }

    #[test]
    fn test_stacked_target_always_in_arc() {
        assert!(is_within_range_and_arc(
            Vec3::ZERO,
            Vec3::new(0.0, 1.0, 0.0),
            Vec2::new(-1.0, 0.0),
            3.0,
            1.0
        ));
    }

    #[test]
    fn test_rotation_invariance() {
        let forward = Vec2::from_yaw(FRAC_PI_2);
        let attacker = Vec3::new(5.0, 0.0, -3.0);
        assert!(is_within_range_and_arc(
            attacker,
            attacker + Vec3::new(2.0, 0.0, 0.0),
            forward,
            3.0,
            90.0
        ));
        assert!(!is_within_range_and_arc(
            attacker,
            attacker + Vec3::new(0.0, 0.0, 2.0),
            forward,
            3.0,
            90.0
        ));
    }
}
