//! Session projection
//!
//! Serde-tagged message types for both directions of the room boundary,
//! plus the single entry point that maps a client intent onto the match
//! state. Payloads are camelCase with kebab-case type tags, matching what
//! the game clients already speak.

use std::time::Instant;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::physics::PhysicsWorld;
use crate::sim::hit::TrailKind;
use crate::sim::match_state::{MatchState, PowerUpKind, RematchVote};

/// Roster entry shared with both clients when a match forms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerInfo {
    pub id: String,
    pub player_name: String,
    pub player_color: String,
    pub is_host: bool,
    pub score: u32,
}

/// One client intent, already decoded from the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientMessage {
    #[serde(rename_all = "camelCase")]
    Join {
        player_name: String,
        player_color: String,
        #[serde(default)]
        private: bool,
    },
    #[serde(rename_all = "camelCase")]
    Update { position_x: f32, position_y: f32 },
    GrabPowerUp { kind: PowerUpKind },
    PowerUpReady { kind: PowerUpKind },
    RematchVote { vote: RematchVote },
}

/// One authoritative broadcast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMessage {
    #[serde(rename_all = "camelCase")]
    FoundMatch {
        host_id: String,
        players: Vec<PlayerInfo>,
    },
    MatchStarted,
    #[serde(rename_all = "camelCase")]
    UpdatePositions {
        ball: [f32; 3],
        player_racket: [f32; 3],
        opponent_racket: [f32; 3],
    },
    #[serde(rename_all = "camelCase")]
    Scored { player_id: String },
    #[serde(rename_all = "camelCase")]
    Serve { player_id: String },
    #[serde(rename_all = "camelCase")]
    Winner { player_id: String },
    BallChangedTrail { trail: TrailKind },
    SetShowTrail { show: bool },
    #[serde(rename_all = "camelCase")]
    IncreaseSize { player_id: String },
    #[serde(rename_all = "camelCase")]
    VotedRematch { player_id: String },
    Rematch,
    DeclinedRematch,
}

/// Route one client message into the match. Unknown sessions and
/// out-of-phase intents fall through silently inside the state machine.
pub fn apply(
    state: &mut MatchState,
    physics: &mut PhysicsWorld,
    session_id: &str,
    msg: ClientMessage,
    now: Instant,
    out: &mut Vec<ServerMessage>,
) {
    match msg {
        ClientMessage::Join {
            player_name,
            player_color,
            private,
        } => state.join(session_id, player_name, player_color, private, now, out),
        ClientMessage::Update {
            position_x,
            position_y,
        } => state.set_target(session_id, Vec2::new(position_x, position_y)),
        ClientMessage::GrabPowerUp { kind } => state.grab_power_up(session_id, kind),
        ClientMessage::PowerUpReady { kind } => {
            state.arm_power_up(session_id, kind, now, physics, out)
        }
        ClientMessage::RematchVote { vote } => state.rematch_vote(session_id, vote, now, out),
    }
}
