//! # PATHBOUND Security
//!
//! Server-side validation of client input for the arena.
//!
//! ## Features
//!
//! - **Sanitization**: Clamp move axes, wrap yaws, clamp pitch, clean names
//! - **Attack Gates**: Global intent rate, per-type cooldowns, facing drift
//! - **Hit Validation**: Range, vertical reach and field-of-view arc
//!
//! ## Architecture
//!
//! ```text
//! CLIENT INTENT                      ROOM
//!     │                                │
//!     │─── AttackRequest ─► sanitize ──│ unknown type? drop
//!     │                                │
//!     │                     gates ─────│ rate / cooldown / facing? drop
//!     │                                │
//!     │                   validation ──│ per target: in reach and arc?
//!     │                                ▼
//!     │                           apply hits
//! ```
//!
//! Rejections are values, never panics: the room logs them and moves on.

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod anti_cheat;
pub mod sanitize;
pub mod validation;

pub use anti_cheat::{is_cooldown_ready, AttackGates, Rejection};
pub use sanitize::{sanitize_attack, sanitize_display_name, sanitize_move};
pub use validation::is_within_range_and_arc;
