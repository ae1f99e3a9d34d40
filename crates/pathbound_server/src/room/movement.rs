//! # Movement Integration
//!
//! Advances one player's kinematics by one tick from its latest move intent.
//!
//! ## Order
//!
//! 1. Horizontal: normalized axes rotated by the intent yaw, walk or sprint
//!    speed, hard clamp to the arena walls
//! 2. Jump: only when grounded
//! 3. Gravity, vertical integration, ground snap
//! 4. Facing follows the intent yaw

use thiserror::Error;

use pathbound_shared::constants::{
    ARENA_HALF_EXTENT, GRAVITY, JUMP_VELOCITY, SPRINT_SPEED, WALK_SPEED,
};
use pathbound_shared::math::{wrap_radians, Vec2};
use pathbound_shared::protocol::MoveIntent;

use super::state::Player;

/// Integration produced a non-finite value; the player was left untouched.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("non-finite kinematic state")]
pub struct NonFiniteState;

/// Integrates `player` over `dt` seconds.
///
/// # Errors
///
/// [`NonFiniteState`] if any resulting value is NaN or infinite. The player
/// is restored to its state before the call.
pub fn integrate(player: &mut Player, intent: &MoveIntent, dt: f32) -> Result<(), NonFiniteState> {
    let before = (player.position, player.vy, player.on_ground, player.yaw);
    step(player, intent, dt);

    if player.position.is_finite() && player.vy.is_finite() && player.yaw.is_finite() {
        return Ok(());
    }
    (player.position, player.vy, player.on_ground, player.yaw) = before;
    Err(NonFiniteState)
}

fn step(player: &mut Player, intent: &MoveIntent, dt: f32) {
    let axes = Vec2::new(intent.move_x.clamp(-1.0, 1.0), intent.move_z.clamp(-1.0, 1.0))
        .normalize_or_zero();
    let speed = if intent.sprint { SPRINT_SPEED } else { WALK_SPEED };
    let yaw = wrap_radians(intent.yaw);
    let forward = Vec2::from_yaw(yaw);
    let velocity = (forward.right() * axes.x + forward * axes.z) * speed;

    player.position.x =
        (player.position.x + velocity.x * dt).clamp(-ARENA_HALF_EXTENT, ARENA_HALF_EXTENT);
    player.position.z =
        (player.position.z + velocity.z * dt).clamp(-ARENA_HALF_EXTENT, ARENA_HALF_EXTENT);

    if intent.jump && player.on_ground {
        player.vy = JUMP_VELOCITY;
        player.on_ground = false;
    }

    player.vy += GRAVITY * dt;
    player.position.y += player.vy * dt;

    if player.position.y <= 0.0 {
        player.position.y = 0.0;
        player.vy = 0.0;
        player.on_ground = true;
    }

    player.yaw = yaw;
}
