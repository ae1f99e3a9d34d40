//! # Server Configuration
//!
//! Operational tunables, loaded once at startup from TOML.
//!
//! Gameplay numbers (speeds, damage, cooldowns) are NOT here: they are part
//! of the client contract and live in `pathbound_shared::constants`.
//!
//! ```toml
//! rooms = 2
//!
//! [room]
//! max_clients = 24
//! command_queue = 1024
//! broadcast_capacity = 256
//! full_snapshot_interval = 100
//! rng_seed = 7
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use pathbound_shared::constants::MAX_CLIENTS;

use crate::error::{ArenaError, ArenaResult};

/// Per-room settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RoomConfig {
    /// Maximum concurrent players.
    pub max_clients: usize,
    /// Depth of the inbound command queue.
    pub command_queue: usize,
    /// Outbound broadcast buffer per subscriber. Slower subscribers lag.
    pub broadcast_capacity: usize,
    /// A full snapshot is forced every this many ticks.
    pub full_snapshot_interval: u64,
    /// Fixed RNG seed. `None` seeds from the clock.
    pub rng_seed: Option<u64>,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            max_clients: MAX_CLIENTS,
            command_queue: 1024,
            broadcast_capacity: 256,
            full_snapshot_interval: 100,
            rng_seed: None,
        }
    }
}

impl RoomConfig {
    /// Checks that every setting is usable.
    ///
    /// # Errors
    ///
    /// [`ArenaError::InvalidConfig`] naming the first bad field.
    pub fn validate(&self) -> ArenaResult<()> {
        let positive = [
            ("max_clients", self.max_clients as u64),
            ("command_queue", self.command_queue as u64),
            ("broadcast_capacity", self.broadcast_capacity as u64),
            ("full_snapshot_interval", self.full_snapshot_interval),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(ArenaError::InvalidConfig(format!("{name} must be > 0")));
            }
        }
        Ok(())
    }
}

/// Process-level settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Number of independent rooms to start.
    pub rooms: usize,
    /// Settings shared by every room.
    pub room: RoomConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            rooms: 1,
            room: RoomConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Parses and validates a TOML document. Missing keys take defaults.
    ///
    /// # Errors
    ///
    /// Parse errors, unknown keys, or values that fail validation.
    pub fn from_toml_str(text: &str) -> ArenaResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// I/O errors plus everything [`ServerConfig::from_toml_str`] reports.
    pub fn from_file(path: impl AsRef<Path>) -> ArenaResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ArenaError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Checks that every setting is usable.
    ///
    /// # Errors
    ///
    /// [`ArenaError::InvalidConfig`] naming the first bad field.
    pub fn validate(&self) -> ArenaResult<()> {
        if self.rooms == 0 {
            return Err(ArenaError::InvalidConfig("rooms must be > 0".into()));
        }
        self.room.validate()
    }
}
