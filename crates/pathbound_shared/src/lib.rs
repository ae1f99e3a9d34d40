//! # PATHBOUND Shared
//!
//! Types used by both the arena server and its clients: gameplay constants,
//! planar math, the attack table, skill progression and the wire protocol.
//!
//! ## CRITICAL RULE
//!
//! Everything here is part of the client/server contract. This crate must
//! stay free of runtime concerns (no tokio, no tracing, no I/O).

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod attacks;
pub mod constants;
pub mod math;
pub mod protocol;
pub mod skills;

pub use attacks::{scaled_damage, AttackDefinition, AttackFamily, AttackType};
pub use constants::{MAX_CLIENTS, TICK_DURATION_MS, TICK_RATE};
pub use math::{angle_diff, wrap_radians, Vec2, Vec3};
pub use protocol::{
    AttackIntent, AttackRequest, Archetype, ClientMessage, CombatFeedback, DummyId, DummyView,
    JoinRequest, MoveIntent, PlayerId, PlayerView, ProtocolError, ServerMessage, SkillView,
    TargetRef, WorldPatch, WorldSnapshot, PROTOCOL_VERSION,
};
pub use skills::{add_xp, level_from_xp, SkillKey, SkillTracks, XpGain};
