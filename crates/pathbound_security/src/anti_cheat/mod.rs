//! # Attack Gates
//!
//! Per-player admission control for attack intents.
//!
//! ## Gates (in order, first failure wins)
//!
//! - **Rate**: any two accepted intents are at least `MIN_ATTACK_INTERVAL_MS` apart
//! - **Cooldown**: each attack type has its own cooldown
//! - **Facing**: the claimed aim may not drift far from the tracked facing
//!
//! Timestamps are only stamped when every gate passes, so a rejected intent
//! never consumes a cooldown.

use thiserror::Error;

use pathbound_shared::attacks::AttackType;
use pathbound_shared::constants::{MAX_ATTACK_YAW_DRIFT_RAD, MIN_ATTACK_INTERVAL_MS};
use pathbound_shared::math::angle_diff;
use pathbound_shared::protocol::AttackIntent;

/// Why an attack intent was dropped.
#[derive(Error, Clone, Copy, Debug, PartialEq)]
pub enum Rejection {
    /// Attacker is unknown or dead.
    #[error("attacker is not alive")]
    AttackerUnavailable,
    /// Request did not name a known attack type.
    #[error("unknown attack type")]
    UnknownAttackType,
    /// Intents arrive faster than the global rate allows.
    #[error("rate limited ({since_last_ms}ms since last intent)")]
    RateLimited {
        /// Time since the last accepted intent.
        since_last_ms: u64,
    },
    /// The requested attack type is still cooling down.
    #[error("{kind:?} on cooldown for {remaining_ms}ms")]
    OnCooldown {
        /// Attack type.
        kind: AttackType,
        /// Time until ready.
        remaining_ms: u64,
    },
    /// Aim diverges too far from the tracked facing.
    #[error("aim drifts {drift_rad:.2} rad from facing")]
    FacingDrift {
        /// Absolute drift.
        drift_rad: f32,
    },
}

/// True once `cooldown_ms` has elapsed since `last_used_ms`.
#[inline]
#[must_use]
pub const fn is_cooldown_ready(last_used_ms: u64, now_ms: u64, cooldown_ms: u64) -> bool {
    now_ms.saturating_sub(last_used_ms) >= cooldown_ms
}

/// Per-player gate state. Everything starts ready.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AttackGates {
    last_used: [Option<u64>; 3],
    last_intent_at: Option<u64>,
}

impl AttackGates {
    /// Fresh gates: never used.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            last_used: [None; 3],
            last_intent_at: None,
        }
    }

    /// Whether `kind` is off cooldown at `now_ms`.
    #[must_use]
    pub fn is_ready(&self, kind: AttackType, now_ms: u64) -> bool {
        self.last_used[kind.index()]
            .map_or(true, |last| is_cooldown_ready(last, now_ms, kind.definition().cooldown_ms))
    }

    /// Time `kind` was last accepted, if ever.
    #[must_use]
    pub const fn last_used(&self, kind: AttackType) -> Option<u64> {
        self.last_used[kind.index()]
    }

    /// Time of the last accepted intent of any type.
    #[must_use]
    pub const fn last_intent_at(&self) -> Option<u64> {
        self.last_intent_at
    }

    /// Runs the rate, cooldown and facing gates for `intent`.
    ///
    /// On success both timestamps are stamped with `now_ms`.
    ///
    /// # Errors
    ///
    /// The first gate that fails. State is left untouched.
    pub fn admit(&mut self, intent: &AttackIntent, facing: f32, now_ms: u64) -> Result<(), Rejection> {
        if let Some(last) = self.last_intent_at() {
            let since_last_ms = now_ms.saturating_sub(last);
            if since_last_ms < MIN_ATTACK_INTERVAL_MS {
                return Err(Rejection::RateLimited { since_last_ms });
            }
        }

        if !self.is_ready(intent.kind, now_ms) {
            let ready_at = self
                .last_used(intent.kind)
                .map_or(now_ms, |last| last + intent.kind.definition().cooldown_ms);
            return Err(Rejection::OnCooldown {
                kind: intent.kind,
                remaining_ms: ready_at.saturating_sub(now_ms),
            });
        }

        let drift_rad = angle_diff(intent.yaw, facing);
        if drift_rad > MAX_ATTACK_YAW_DRIFT_RAD {
            return Err(Rejection::FacingDrift { drift_rad });
        }

        self.last_intent_at = Some(now_ms);
        self.last_used[intent.kind.index()] = Some(now_ms);
        Ok(())
    }
}
