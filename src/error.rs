//! Error types
//!
//! Gameplay-level oddities (messages for unknown players, actions in the
//! wrong phase) are silent no-ops and never surface here; these variants
//! cover the runtime and configuration boundary only.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MatchError {
    /// The outbound broadcast channel was dropped; the room is gone.
    #[error("room channel closed")]
    RoomClosed,

    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Config(#[from] serde_json::Error),
}
