//! # Player Sessions
//!
//! Per-player runtime state that is never replicated.
//!
//! ## Design
//!
//! - One latest-wins move slot (jump is cleared once consumed)
//! - Attack gates (rate, cooldowns)
//! - Counters for diagnostics
//!
//! Created on join, dropped on leave together with the player.

use pathbound_security::AttackGates;
use pathbound_shared::protocol::MoveIntent;

/// Runtime state of one connected player.
#[derive(Clone, Debug)]
pub struct PlayerSession {
    /// Latest sanitized move intent.
    intent: MoveIntent,
    /// Attack admission state.
    gates: AttackGates,
    /// Server time of the join.
    joined_at: u64,
    /// Move messages received.
    moves_received: u64,
    /// Attack intents that passed every gate.
    attacks_accepted: u64,
    /// Attack intents dropped by validation.
    attacks_rejected: u64,
}

impl PlayerSession {
    /// Creates a session with no input and ready gates.
    #[must_use]
    pub const fn new(joined_at: u64) -> Self {
        Self {
            intent: MoveIntent::IDLE,
            gates: AttackGates::new(),
            joined_at,
            moves_received: 0,
            attacks_accepted: 0,
            attacks_rejected: 0,
        }
    }

    /// Overwrites the move slot.
    pub fn set_intent(&mut self, intent: MoveIntent) {
        self.intent = intent;
        self.moves_received += 1;
    }

    /// Returns the intent for this tick and clears the jump request.
    pub fn take_intent(&mut self) -> MoveIntent {
        let intent = self.intent;
        self.intent.jump = false;
        intent
    }

    /// Latest move intent, without consuming it.
    #[must_use]
    pub const fn intent(&self) -> &MoveIntent {
        &self.intent
    }

    /// Mutable attack gates.
    pub fn gates_mut(&mut self) -> &mut AttackGates {
        &mut self.gates
    }

    /// Counts an attack intent outcome.
    pub fn record_attack(&mut self, accepted: bool) {
        if accepted {
            self.attacks_accepted += 1;
        } else {
            self.attacks_rejected += 1;
        }
    }

    /// Server time of the join.
    #[must_use]
    pub const fn joined_at(&self) -> u64 {
        self.joined_at
    }

    /// Move messages received.
    #[must_use]
    pub const fn moves_received(&self) -> u64 {
        self.moves_received
    }

    /// Accepted attack intents.
    #[must_use]
    pub const fn attacks_accepted(&self) -> u64 {
        self.attacks_accepted
    }

    /// Rejected attack intents.
    #[must_use]
    pub const fn attacks_rejected(&self) -> u64 {
        self.attacks_rejected
    }
}
