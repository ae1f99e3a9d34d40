//! # PATHBOUND Server - Authoritative Arena Rooms
//!
//! Fixed-rate, server-authoritative arena combat.
//!
//! ## Architecture
//!
//! - **Room**: players, training dummies, movement, combat and progression
//! - **Runner**: one tokio task per room, fed by a command channel, 20Hz tick
//! - **Sync**: full and delta world publications over a broadcast channel
//! - **Security**: every intent is sanitized and gated before it touches state
//!
//! ## Security Model
//!
//! ```text
//! CLIENT                                 ROOM
//!   |                                      |
//!   |--- move: "I want to go north" ------>| <- clamped, applied next tick
//!   |--- attack: "sword, facing 0.3" ----->| <- rate, cooldown, facing,
//!   |                                      |    range and arc checked now
//!   |<-- combat_feedback / state ----------|
//!   |                                      |
//! ```
//!
//! The client NEVER determines outcomes. The room ALWAYS validates.
//!
//! ## Example
//!
//! ```rust,ignore
//! use pathbound_server::{spawn_room, RoomConfig};
//! use pathbound_shared::protocol::{Archetype, JoinRequest};
//!
//! let (room, task) = spawn_room(RoomConfig::default(), 0)?;
//! let mut events = room.subscribe();
//! let id = room.join(JoinRequest::new("Rin", Archetype::Mage)).await?;
//! room.send_frame(id, r#"{"type":"move","payload":{"moveZ":1}}"#).await?;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::perf)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod room;
pub mod runner;
pub mod sync;
pub mod tick;

pub use config::{RoomConfig, ServerConfig};
pub use error::{ArenaError, ArenaResult};
pub use room::{ArenaRoom, ArenaState, Dummy, Player, PlayerSession, RoomStats};
pub use runner::{spawn_room, RoomCommand, RoomHandle, RunnerStats};
pub use sync::{MirrorError, SnapshotEncoder, WorldMirror};
pub use tick::{TickStats, TickTimer};
