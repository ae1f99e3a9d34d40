//! # Arena Constants
//!
//! Gameplay configuration for the Pathbound arena.
//!
//! **CRITICAL:** These values are part of the client/server contract.
//! They are not overridable at runtime. Changes require a client rebuild.

use std::f32::consts::PI;

// =============================================================================
// SIMULATION
// =============================================================================

/// Tick rate (updates per second).
///
/// At 20Hz each tick is 50ms. Snapshots are published once per tick.
pub const TICK_RATE: u32 = 20;

/// Tick duration in milliseconds.
pub const TICK_DURATION_MS: u64 = 1000 / TICK_RATE as u64;

/// Maximum clients per arena room.
pub const MAX_CLIENTS: usize = 24;

// =============================================================================
// PHYSICS
// =============================================================================

/// Walking speed (units per second).
pub const WALK_SPEED: f32 = 7.0;

/// Sprinting speed (units per second).
pub const SPRINT_SPEED: f32 = 11.0;

/// Vertical velocity applied by a jump.
pub const JUMP_VELOCITY: f32 = 7.5;

/// Gravity (units per second squared, negative is down).
pub const GRAVITY: f32 = -24.0;

/// Half side length of the square arena. Positions are clamped to `±ARENA_HALF_EXTENT`.
pub const ARENA_HALF_EXTENT: f32 = 42.0;

// =============================================================================
// PLAYERS
// =============================================================================

/// Player maximum health.
pub const PLAYER_MAX_HEALTH: u32 = 100;

/// Radius of the join spawn circle.
pub const SPAWN_RADIUS: f32 = 5.0;

/// Angle step between consecutive join spawn points (radians).
pub const SPAWN_ANGLE_STEP: f32 = 0.8;

/// Inner radius of the respawn band.
pub const RESPAWN_RADIUS_MIN: f32 = 4.0;

/// Width of the respawn band.
pub const RESPAWN_RADIUS_SPAN: f32 = 4.0;

/// Maximum display name length (characters).
pub const MAX_DISPLAY_NAME_CHARS: usize = 16;

// =============================================================================
// COMBAT SECURITY
// =============================================================================

/// Maximum angle between an attack's claimed yaw and the server-tracked facing.
pub const MAX_ATTACK_YAW_DRIFT_RAD: f32 = PI / 3.0;

/// Minimum time between two accepted attack intents of any type.
pub const MIN_ATTACK_INTERVAL_MS: u64 = 120;

/// Maximum vertical offset between attacker and target.
pub const MAX_VERTICAL_REACH: f32 = 2.4;

/// Attack pitch is clamped to `±MAX_ATTACK_PITCH`.
pub const MAX_ATTACK_PITCH: f32 = 1.3;

// =============================================================================
// TRAINING DUMMIES
// =============================================================================

/// Number of dummies seeded at room startup.
pub const DUMMY_COUNT: usize = 8;

/// Dummy maximum health.
pub const DUMMY_MAX_HEALTH: u32 = 140;

/// Delay between a dummy's death and its revival.
pub const DUMMY_RESPAWN_MS: u64 = 3500;

/// Ring radius for even-indexed dummies.
pub const DUMMY_OUTER_RADIUS: f32 = 16.0;

/// Ring radius for odd-indexed dummies.
pub const DUMMY_INNER_RADIUS: f32 = 12.0;

// =============================================================================
// PROGRESSION
// =============================================================================

/// Experience required per skill level.
pub const XP_PER_LEVEL: u32 = 100;

/// Flat damage bonus per skill level above 1.
pub const DAMAGE_BONUS_PER_LEVEL: f64 = 0.02;
