//! # Input Sanitization
//!
//! Turns coerced wire input into values the simulation can use directly.
//! Nothing here fails except an attack with no recognizable type.

use pathbound_shared::constants::{MAX_ATTACK_PITCH, MAX_DISPLAY_NAME_CHARS};
use pathbound_shared::math::wrap_radians;
use pathbound_shared::protocol::{AttackIntent, AttackRequest, MoveIntent};

use crate::anti_cheat::Rejection;

/// Clamps both axes to `[-1, 1]` and wraps the yaw.
#[must_use]
pub fn sanitize_move(raw: MoveIntent) -> MoveIntent {
    let axis = |v: f32| if v.is_finite() { v.clamp(-1.0, 1.0) } else { 0.0 };
    MoveIntent {
        move_x: axis(raw.move_x),
        move_z: axis(raw.move_z),
        yaw: if raw.yaw.is_finite() {
            wrap_radians(raw.yaw)
        } else {
            0.0
        },
        sprint: raw.sprint,
        jump: raw.jump,
    }
}

/// Validates the attack type and fills in missing aim.
///
/// A missing yaw falls back to `facing`, a missing pitch to level.
///
/// # Errors
///
/// [`Rejection::UnknownAttackType`] when the request names no known attack.
pub fn sanitize_attack(raw: &AttackRequest, facing: f32) -> Result<AttackIntent, Rejection> {
    let kind = raw.kind.ok_or(Rejection::UnknownAttackType)?;
    let yaw = raw
        .yaw
        .filter(|v| v.is_finite())
        .map_or(facing, wrap_radians);
    let pitch = raw
        .pitch
        .filter(|v| v.is_finite())
        .map_or(0.0, |p| p.clamp(-MAX_ATTACK_PITCH, MAX_ATTACK_PITCH));
    Ok(AttackIntent { kind, yaw, pitch })
}

/// Trims and truncates a requested display name.
///
/// Falls back to `Player-{fallback_index}` when the name is missing or blank.
#[must_use]
pub fn sanitize_display_name(raw: Option<&str>, fallback_index: usize) -> String {
    match raw.map(str::trim) {
        Some(trimmed) if !trimmed.is_empty() => {
            trimmed.chars().take(MAX_DISPLAY_NAME_CHARS).collect()
        }
        _ => format!("Player-{fallback_index}"),
    }
}
