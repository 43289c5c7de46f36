//! Fixed-step simulation loop body
//!
//! One call per scheduled tick: fire due timers, move the rackets, step the
//! physics world, then feed the resulting contacts through the dispatcher.

use std::time::Instant;

use glam::Vec3;

use crate::physics::PhysicsWorld;
use crate::session::ServerMessage;
use crate::sim::dispatch::dispatch;
use crate::sim::match_state::{MatchState, Phase};
use crate::{consts, Side};

/// Where a racket sits while a serve is pending.
pub fn serve_pose(side: Side) -> Vec3 {
    Vec3::new(0.0, consts::RACKET_HEIGHT, consts::RACKET_DEPTH * side.sign())
}

/// Advance the match by one step.
///
/// Deferred actions fire first so a tick never runs against a stale phase.
/// While slow motion is active every second tick is skipped, halving the
/// effective simulation rate without touching the physics timestep.
pub fn tick(
    state: &mut MatchState,
    physics: &mut PhysicsWorld,
    now: Instant,
    out: &mut Vec<ServerMessage>,
) {
    state.fire_due(now, physics, out);
    if state.disposed() || matches!(state.phase, Phase::Waiting | Phase::Ended) {
        return;
    }

    if state.slow_motion {
        state.tick_parity = !state.tick_parity;
        if state.tick_parity {
            return;
        }
    }

    for side in Side::BOTH {
        let target = match state.phase {
            Phase::Serving => serve_pose(side),
            _ => {
                let current = physics.racket_position(side);
                let wanted = state
                    .player(side)
                    .map(|p| p.target)
                    .unwrap_or_default();
                Vec3::new(
                    current.x + (wanted.x - current.x) * state.cfg.racket_lerp,
                    current.y + (wanted.y - current.y) * state.cfg.racket_lerp,
                    current.z,
                )
            }
        };
        physics.set_racket_position(side, target);
    }

    let contacts = physics.step();
    dispatch(state, physics, &contacts, now, out);
}

/// Snapshot of the moving bodies, for the broadcast cadence.
pub fn sample_positions(physics: &PhysicsWorld) -> ServerMessage {
    ServerMessage::UpdatePositions {
        ball: physics.ball_position().to_array(),
        player_racket: physics.racket_position(Side::Host).to_array(),
        opponent_racket: physics.racket_position(Side::Opponent).to_array(),
    }
}
