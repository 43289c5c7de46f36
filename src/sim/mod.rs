//! Deterministic gameplay logic
//!
//! Everything that decides what a physics event *means* lives here:
//! - `hit`: racket contact -> outgoing ball impulse
//! - `dispatch`: raw collider pairs -> gameplay events -> handlers
//! - `match_state`: phases, scoring, rematch votes, power-up timers
//! - `tick`: the fixed-tick orchestration over all of the above
//!
//! All randomness comes from the seeded match RNG; all time comes in as an
//! explicit `Instant`, so every path is drivable from tests.

pub mod dispatch;
pub mod hit;
pub mod match_state;
pub mod tick;

pub use dispatch::{classify, dispatch, GameplayEvent};
pub use hit::{resolve_hit, HitOutcome, Precision, TrailKind};
pub use match_state::{MatchState, Phase, Player, PowerUpKind, RematchVote};
pub use tick::{sample_positions, serve_pose, tick};
