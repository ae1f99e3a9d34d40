//! # Arena Error Types
//!
//! All errors that can surface from the arena server.
//!
//! Rejected attacks are not errors: they are [`pathbound_security::Rejection`]
//! values that the room logs and drops.

use std::path::PathBuf;

use thiserror::Error;

use pathbound_shared::protocol::ProtocolError;

/// Errors that can occur in the arena server.
#[derive(Error, Debug)]
pub enum ArenaError {
    /// The room already holds its maximum number of players.
    #[error("room full: capacity {capacity}")]
    RoomFull {
        /// Configured client capacity.
        capacity: usize,
    },

    /// The room task has stopped and no longer accepts commands.
    #[error("room closed")]
    RoomClosed,

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration file could not be parsed.
    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Configuration file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A wire message could not be decoded or encoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// Result type for arena operations.
pub type ArenaResult<T> = Result<T, ArenaError>;
