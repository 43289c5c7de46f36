//! Match state machine
//!
//! The only component allowed to mutate authoritative score and phase state.
//! Everything time-delayed (score resolution, match start, rematch restart,
//! power-up expiry) is a `Deferred` entry with a wall-clock deadline, fired
//! between ticks by [`fire_due`](MatchState::fire_due); nothing mutates state
//! from a timer thread, and teardown simply drops the queue.

use std::time::{Duration, Instant};

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::config::MatchConfig;
use crate::consts;
use crate::physics::PhysicsWorld;
use crate::session::{PlayerInfo, ServerMessage};
use crate::sim::hit::{resolve_hit, TrailKind};
use crate::Side;

/// The match's single authoritative lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Fewer than two players present
    Waiting,
    /// Ball placed (or about to be placed) for a point; rackets held at the
    /// serve pose instead of following input
    Serving,
    /// Normal rally
    Playing,
    /// Win threshold reached; only rematch votes are accepted
    Ended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PowerUpKind {
    SuperHit,
    SuperCurve,
    IncreaseSize,
    SlowMotion,
    CameraShake,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RematchVote {
    Accept,
    Decline,
}

/// Per-player authoritative state.
#[derive(Debug, Clone)]
pub struct Player {
    pub id: String,
    pub name: String,
    pub color: String,
    pub side: Side,
    pub score: u32,
    /// Client-reported racket target (x, y); depth is fixed per side
    pub target: Vec2,
    /// Held power-up, if any
    pub power_up: Option<PowerUpKind>,
    /// Armed means the effect triggers on the next qualifying contact
    pub armed: bool,
    pub voted_rematch: bool,
}

impl Player {
    fn new(id: &str, name: String, color: String, side: Side) -> Self {
        Self {
            id: id.to_owned(),
            name,
            color,
            side,
            score: 0,
            target: Vec2::ZERO,
            power_up: None,
            armed: false,
            voted_rematch: false,
        }
    }
}

/// A scheduled single-shot state mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferredAction {
    /// End of the post-join countdown: first serve
    StartMatch,
    /// End of the scoring delay: commit the point and re-serve (or end)
    FinishScore { winner: Side },
    /// End of the post-rematch countdown: serve again
    RematchRestart,
    ExpireSizeBoost { side: Side },
    EndSlowMotion,
}

#[derive(Debug, Clone, Copy)]
struct Deferred {
    fire_at: Instant,
    action: DeferredAction,
}

/// Authoritative state for one match. Owns the roster, the touch/hit ledger
/// and every pending timer; the physics world is passed in wherever a
/// transition has to move bodies.
pub struct MatchState {
    pub cfg: MatchConfig,
    pub phase: Phase,
    pub players: [Option<Player>; 2],
    /// Who last struck the ball this point
    pub touched_last_by: Option<Side>,
    /// Whose table half the ball last bounced on this point
    pub last_table_hit: Option<Side>,
    /// Guards against double-counting a rally while a score delay is pending
    pub can_score: bool,
    pub rematch_votes: u8,
    pub slow_motion: bool,
    /// Toggled on executed ticks while slow motion is active
    pub tick_parity: bool,
    /// Trail currently shown on the ball, cleared at each serve
    pub active_trail: TrailKind,
    pub private: bool,
    pub rng: Pcg32,
    size_boost_deadline: [Option<Instant>; 2],
    pending: Vec<Deferred>,
    disposed: bool,
}

impl MatchState {
    pub fn new(cfg: MatchConfig) -> Self {
        let rng = Pcg32::seed_from_u64(cfg.rng_seed);
        Self {
            cfg,
            phase: Phase::Waiting,
            players: [None, None],
            touched_last_by: None,
            last_table_hit: None,
            can_score: true,
            rematch_votes: 0,
            slow_motion: false,
            tick_parity: false,
            active_trail: TrailKind::None,
            private: false,
            rng,
            size_boost_deadline: [None, None],
            pending: Vec::new(),
            disposed: false,
        }
    }

    pub fn disposed(&self) -> bool {
        self.disposed
    }

    /// Tear the match down: no deferred action fires after this.
    pub fn dispose(&mut self) {
        if !self.disposed {
            log::info!("match disposed");
        }
        self.disposed = true;
        self.pending.clear();
    }

    pub fn player(&self, side: Side) -> Option<&Player> {
        self.players[side.index()].as_ref()
    }

    pub fn player_side(&self, session_id: &str) -> Option<Side> {
        Side::BOTH.into_iter().find(|side| {
            self.player(*side)
                .is_some_and(|p| p.id == session_id)
        })
    }

    fn id_of(&self, side: Side) -> String {
        self.player(side).map(|p| p.id.clone()).unwrap_or_default()
    }

    fn schedule(&mut self, delay: Duration, now: Instant, action: DeferredAction) {
        if self.disposed {
            return;
        }
        self.pending.push(Deferred {
            fire_at: now + delay,
            action,
        });
    }

    // === joins and roster ===

    /// First joiner becomes host; the second join schedules the match start.
    /// A third join, or a rejoin of a known id, is a no-op.
    pub fn join(
        &mut self,
        session_id: &str,
        name: String,
        color: String,
        private: bool,
        now: Instant,
        out: &mut Vec<ServerMessage>,
    ) {
        if self.player_side(session_id).is_some() {
            return;
        }
        let side = if self.player(Side::Host).is_none() {
            Side::Host
        } else if self.player(Side::Opponent).is_none() {
            Side::Opponent
        } else {
            return;
        };

        log::info!("{session_id} joined as {side:?} ({name})");
        self.private |= private;
        self.players[side.index()] = Some(Player::new(session_id, name, color, side));

        if side == Side::Opponent {
            out.push(ServerMessage::FoundMatch {
                host_id: self.id_of(Side::Host),
                players: self.roster(),
            });
            self.schedule(self.cfg.serve_countdown(), now, DeferredAction::StartMatch);
        }
    }

    pub fn roster(&self) -> Vec<PlayerInfo> {
        Side::BOTH
            .into_iter()
            .filter_map(|side| self.player(side))
            .map(|p| PlayerInfo {
                id: p.id.clone(),
                player_name: p.name.clone(),
                player_color: p.color.clone(),
                is_host: p.side == Side::Host,
                score: p.score,
            })
            .collect()
    }

    /// Replace a player's racket target. Unknown session ids are ignored.
    pub fn set_target(&mut self, session_id: &str, target: Vec2) {
        if let Some(side) = self.player_side(session_id) {
            if let Some(player) = &mut self.players[side.index()] {
                player.target = target;
            }
        }
    }

    // === scoring ===

    /// Award a point to `winner`, unless a score is already resolving.
    /// The score itself is committed after the configured delay.
    pub fn handle_score(&mut self, winner: Side, now: Instant, out: &mut Vec<ServerMessage>) {
        if !self.can_score || self.disposed {
            return;
        }
        if !matches!(self.phase, Phase::Serving | Phase::Playing) {
            return;
        }
        log::info!("point for {winner:?}");
        self.can_score = false;
        out.push(ServerMessage::Scored {
            player_id: self.id_of(winner),
        });
        self.schedule(
            self.cfg.score_delay(),
            now,
            DeferredAction::FinishScore { winner },
        );
    }

    /// Ball bounced on `table`'s half. A bounce on a side's own table when
    /// that side struck last, or a second consecutive bounce on the same
    /// half, is a fault against that side.
    pub fn ball_hit_table(&mut self, table: Side, now: Instant, out: &mut Vec<ServerMessage>) {
        if self.touched_last_by == Some(table) || self.last_table_hit == Some(table) {
            self.handle_score(table.other(), now, out);
        }
        self.last_table_hit = Some(table);
    }

    /// Ball entered the out-of-bounds sensor.
    pub fn ball_out(&mut self, now: Instant, out: &mut Vec<ServerMessage>) {
        let winner = ball_out_winner(self.touched_last_by, self.last_table_hit);
        self.handle_score(winner, now, out);
    }

    /// Racket contact: resolve the hit, consume an armed strike power-up,
    /// and start the rally if the serve was still pending.
    pub fn racket_hit(
        &mut self,
        side: Side,
        physics: &mut PhysicsWorld,
        out: &mut Vec<ServerMessage>,
    ) {
        if self.phase == Phase::Ended {
            return;
        }
        if matches!(self.phase, Phase::Waiting | Phase::Serving) {
            self.phase = Phase::Playing;
            log::debug!("rally started by {side:?}");
        }

        let armed = self.players[side.index()]
            .as_ref()
            .filter(|p| p.armed)
            .and_then(|p| p.power_up);

        let outcome = resolve_hit(
            &mut self.rng,
            physics.ball_position(),
            physics.racket_position(side),
            armed,
        );
        physics.strike_ball(outcome.impulse);
        self.touched_last_by = Some(side);

        if outcome.trail != TrailKind::None {
            // The power-up triggers at most once: cleared with the same hit.
            if let Some(player) = &mut self.players[side.index()] {
                player.power_up = None;
                player.armed = false;
            }
            self.active_trail = outcome.trail;
            out.push(ServerMessage::BallChangedTrail {
                trail: outcome.trail,
            });
            out.push(ServerMessage::SetShowTrail { show: true });
        }
    }

    // === power-ups ===

    /// Record a picked-up power-up; the last grab wins.
    pub fn grab_power_up(&mut self, session_id: &str, kind: PowerUpKind) {
        if self.phase == Phase::Ended {
            return;
        }
        if let Some(side) = self.player_side(session_id) {
            if let Some(player) = &mut self.players[side.index()] {
                player.power_up = Some(kind);
                player.armed = false;
            }
        }
    }

    /// Arm the player's held power-up. Strike power-ups wait for the next
    /// racket contact; the rest take effect immediately with a timed expiry.
    pub fn arm_power_up(
        &mut self,
        session_id: &str,
        kind: PowerUpKind,
        now: Instant,
        physics: &mut PhysicsWorld,
        out: &mut Vec<ServerMessage>,
    ) {
        // Once ended, only rematch votes are accepted.
        if self.phase == Phase::Ended {
            return;
        }
        let Some(side) = self.player_side(session_id) else {
            return;
        };
        if self.player(side).and_then(|p| p.power_up) != Some(kind) {
            return;
        }

        match kind {
            PowerUpKind::SuperHit | PowerUpKind::SuperCurve => {
                if let Some(player) = &mut self.players[side.index()] {
                    player.armed = true;
                }
            }
            PowerUpKind::IncreaseSize => {
                log::debug!("{side:?} racket size boost");
                physics.set_racket_scale(side, consts::SIZE_BOOST_SCALE);
                self.size_boost_deadline[side.index()] =
                    Some(now + self.cfg.size_boost_duration());
                self.schedule(
                    self.cfg.size_boost_duration(),
                    now,
                    DeferredAction::ExpireSizeBoost { side },
                );
                self.consume_power_up(side);
                out.push(ServerMessage::IncreaseSize {
                    player_id: self.id_of(side),
                });
            }
            PowerUpKind::SlowMotion => {
                // Only one slow-motion window match-wide at a time.
                if self.slow_motion {
                    return;
                }
                log::debug!("slow motion on");
                self.slow_motion = true;
                self.schedule(
                    self.cfg.slow_motion_duration(),
                    now,
                    DeferredAction::EndSlowMotion,
                );
                self.consume_power_up(side);
            }
            PowerUpKind::CameraShake => {
                // Purely a client-side visual; the server just spends it.
                self.consume_power_up(side);
            }
        }
    }

    fn consume_power_up(&mut self, side: Side) {
        if let Some(player) = &mut self.players[side.index()] {
            player.power_up = None;
            player.armed = false;
        }
    }

    // === rematch ===

    /// A decline tears the match down; two accepts restart it.
    pub fn rematch_vote(
        &mut self,
        session_id: &str,
        vote: RematchVote,
        now: Instant,
        out: &mut Vec<ServerMessage>,
    ) {
        if self.phase != Phase::Ended || self.disposed {
            return;
        }
        let Some(side) = self.player_side(session_id) else {
            return;
        };

        match vote {
            RematchVote::Decline => {
                out.push(ServerMessage::DeclinedRematch);
                self.dispose();
            }
            RematchVote::Accept => {
                {
                    let Some(player) = &mut self.players[side.index()] else {
                        return;
                    };
                    if player.voted_rematch {
                        return;
                    }
                    player.voted_rematch = true;
                }
                self.rematch_votes += 1;
                out.push(ServerMessage::VotedRematch {
                    player_id: self.id_of(side),
                });

                if self.rematch_votes >= 2 {
                    log::info!("rematch accepted");
                    for player in self.players.iter_mut().flatten() {
                        player.score = 0;
                        player.voted_rematch = false;
                        player.power_up = None;
                        player.armed = false;
                    }
                    self.rematch_votes = 0;
                    out.push(ServerMessage::Rematch);
                    self.schedule(
                        self.cfg.serve_countdown(),
                        now,
                        DeferredAction::RematchRestart,
                    );
                }
            }
        }
    }

    // === deferred actions ===

    /// Fire every deferred action whose deadline has passed, oldest first.
    /// Runs between ticks on the match's own context; a disposed match
    /// drops the queue unfired.
    pub fn fire_due(
        &mut self,
        now: Instant,
        physics: &mut PhysicsWorld,
        out: &mut Vec<ServerMessage>,
    ) {
        if self.disposed {
            self.pending.clear();
            return;
        }
        loop {
            let due = self
                .pending
                .iter()
                .enumerate()
                .filter(|(_, d)| d.fire_at <= now)
                .min_by_key(|(_, d)| d.fire_at)
                .map(|(i, _)| i);
            let Some(idx) = due else {
                break;
            };
            let deferred = self.pending.swap_remove(idx);
            self.fire(deferred.action, now, physics, out);
            if self.disposed {
                self.pending.clear();
                break;
            }
        }
    }

    fn fire(
        &mut self,
        action: DeferredAction,
        now: Instant,
        physics: &mut PhysicsWorld,
        out: &mut Vec<ServerMessage>,
    ) {
        match action {
            DeferredAction::StartMatch => {
                if self.phase != Phase::Waiting {
                    return;
                }
                log::info!("match started");
                self.phase = Phase::Serving;
                physics.reset_ball(Side::Host);
                out.push(ServerMessage::MatchStarted);
            }
            DeferredAction::FinishScore { winner } => {
                self.finish_score(winner, physics, out);
            }
            DeferredAction::RematchRestart => {
                if self.phase != Phase::Ended {
                    return;
                }
                log::info!("rematch serving");
                self.begin_serve(Side::Host, physics, out);
            }
            DeferredAction::ExpireSizeBoost { side } => {
                // A re-arm pushes the deadline out; only the final expiry
                // restores the racket.
                let slot = &mut self.size_boost_deadline[side.index()];
                if slot.is_some_and(|deadline| deadline <= now) {
                    *slot = None;
                    physics.set_racket_scale(side, 1.0);
                    log::debug!("{side:?} racket size restored");
                }
            }
            DeferredAction::EndSlowMotion => {
                log::debug!("slow motion off");
                self.slow_motion = false;
                self.tick_parity = false;
            }
        }
    }

    /// Commit a point after the scoring delay: bump the score, clear the
    /// ledger, and either re-serve from the winner's side or end the match.
    fn finish_score(
        &mut self,
        winner: Side,
        physics: &mut PhysicsWorld,
        out: &mut Vec<ServerMessage>,
    ) {
        let score = {
            let Some(player) = &mut self.players[winner.index()] else {
                return;
            };
            player.score += 1;
            player.score
        };
        self.touched_last_by = None;
        self.last_table_hit = None;

        if self.active_trail != TrailKind::None {
            self.active_trail = TrailKind::None;
            out.push(ServerMessage::BallChangedTrail {
                trail: TrailKind::None,
            });
            out.push(ServerMessage::SetShowTrail { show: false });
        }

        if score >= self.cfg.win_score {
            log::info!("{winner:?} wins {score}");
            self.phase = Phase::Ended;
            out.push(ServerMessage::Winner {
                player_id: self.id_of(winner),
            });
            return;
        }

        self.begin_serve(winner, physics, out);
        self.can_score = true;
    }

    /// Reposition the ball on `server`'s side and enter the serving phase.
    fn begin_serve(
        &mut self,
        server: Side,
        physics: &mut PhysicsWorld,
        out: &mut Vec<ServerMessage>,
    ) {
        self.touched_last_by = None;
        self.last_table_hit = None;
        self.can_score = true;
        self.phase = Phase::Serving;
        physics.reset_ball(server);
        out.push(ServerMessage::Serve {
            player_id: self.id_of(server),
        });
    }
}

/// Who wins when the ball leaves the play area, as a total function of the
/// touch/hit ledger.
///
/// A shot that bounced on the far table and then went out is a clean winner
/// for the striker; anything else is the striker's fault. When nobody struck
/// the ball this point, the serve-side bounce recorded in `last_table_hit`
/// decides against the server.
pub fn ball_out_winner(touched_last_by: Option<Side>, last_table_hit: Option<Side>) -> Side {
    match touched_last_by {
        Some(Side::Host) => {
            if last_table_hit == Some(Side::Opponent) {
                Side::Host
            } else {
                Side::Opponent
            }
        }
        Some(Side::Opponent) => {
            if last_table_hit == Some(Side::Host) {
                Side::Opponent
            } else {
                Side::Host
            }
        }
        None => {
            if last_table_hit == Some(Side::Host) {
                Side::Opponent
            } else {
                Side::Host
            }
        }
    }
}
