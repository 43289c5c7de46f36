//! Topspin - server-authoritative table tennis simulation core
//!
//! Core modules:
//! - `physics`: rapier3d world construction and the per-tick event drain
//! - `sim`: deterministic gameplay logic (hit resolution, collision routing,
//!   match state machine, simulation tick)
//! - `session`: inbound/outbound message types and the per-client projection
//! - `runtime`: single-task tokio driver owning one match end to end
//!
//! Network transport and room lifecycle are external collaborators; this
//! crate consumes client intents from a channel and emits broadcasts to a
//! channel, nothing else.

pub mod config;
pub mod error;
pub mod physics;
pub mod runtime;
pub mod session;
pub mod sim;

pub use config::MatchConfig;
pub use error::MatchError;

use serde::{Deserialize, Serialize};

/// Fixed scene geometry and gameplay constants.
///
/// These describe the one table-tennis scene every match plays in. Tunable
/// per-match values (timings, thresholds, win score) live in [`MatchConfig`].
pub mod consts {
    /// Table half-extents (x, y, z); one table per side
    pub const TABLE_HALF_EXTENTS: [f32; 3] = [20.0, 0.5, 15.0];
    pub const TABLE_HEIGHT: f32 = -2.0;
    /// Each table's center sits at z = ±TABLE_CENTER_DEPTH
    pub const TABLE_CENTER_DEPTH: f32 = 15.0;
    pub const TABLE_RESTITUTION: f32 = 0.7;
    pub const TABLE_FRICTION: f32 = 0.9;

    pub const BALL_RADIUS: f32 = 0.2;
    pub const BALL_MASS: f32 = 0.1;
    pub const BALL_RESTITUTION: f32 = 1.0;
    /// Serve drop point: above the serving side's racket
    pub const BALL_SERVE_HEIGHT: f32 = 10.0;
    pub const BALL_SERVE_DEPTH: f32 = 30.0;

    pub const RACKET_HALF_EXTENTS: [f32; 3] = [2.4, 2.4, 0.3];
    /// Collider offset relative to the racket body origin
    pub const RACKET_LOCAL_OFFSET: [f32; 3] = [0.05, 0.0, -0.2];
    /// Serve pose height; rackets live at z = ±RACKET_DEPTH
    pub const RACKET_HEIGHT: f32 = 5.0;
    pub const RACKET_DEPTH: f32 = 30.0;

    /// Out-of-bounds sensor: a huge slab well below the play area
    pub const SENSOR_HALF_EXTENTS: [f32; 3] = [400.0, 3.0, 400.0];
    pub const SENSOR_HEIGHT: f32 = -15.0;

    /// Optional center blocker (net-height obstacle)
    pub const BLOCKER_HALF_EXTENTS: [f32; 3] = [3.0, 1.0, 0.3];
    pub const BLOCKER_HEIGHT: f32 = 1.0;
    /// Velocity multiplier applied when the ball clips the blocker
    pub const BLOCKER_DAMPING: f32 = 0.1;

    /// Hits aim at z = ±AIM_DEPTH, the middle of the far table
    pub const AIM_DEPTH: f32 = 15.0;

    /// Racket collider scale while the increase-size power-up is active
    pub const SIZE_BOOST_SCALE: f32 = 1.6;
    /// Extra downward/forward impulse for an armed super-hit
    pub const SUPER_HIT_DIP: f32 = 1.5;
    pub const SUPER_HIT_DRIVE: f32 = 3.0;
    /// Extra lateral impulse for an armed super-curve
    pub const SUPER_CURVE_BEND: f32 = 2.5;
}

/// Which end of the table a player defends.
///
/// The host racket sits at positive z, the opponent at negative z; every
/// piece of geometry is mirrored through `sign()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Host,
    Opponent,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::Host, Side::Opponent];

    #[inline]
    pub fn index(self) -> usize {
        match self {
            Side::Host => 0,
            Side::Opponent => 1,
        }
    }

    #[inline]
    pub fn other(self) -> Side {
        match self {
            Side::Host => Side::Opponent,
            Side::Opponent => Side::Host,
        }
    }

    /// Sign of this side's z coordinates
    #[inline]
    pub fn sign(self) -> f32 {
        match self {
            Side::Host => 1.0,
            Side::Opponent => -1.0,
        }
    }
}
