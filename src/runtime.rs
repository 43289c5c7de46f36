//! Match runtime
//!
//! Owns the match on a single task: a fixed-interval simulation ticker, a
//! coarser broadcast ticker, and the inbound intent channel, multiplexed
//! with `select!`. All state lives on this task; the transport layer talks
//! to it through channels only.

use std::time::Instant;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use crate::config::MatchConfig;
use crate::error::MatchError;
use crate::physics::PhysicsWorld;
use crate::session::{apply, ClientMessage, ServerMessage};
use crate::sim::match_state::{MatchState, Phase};
use crate::sim::tick::{sample_positions, tick};

/// Handle pair the transport uses to talk to a running match.
pub struct MatchChannels {
    pub inbound: mpsc::UnboundedSender<(String, ClientMessage)>,
    pub outbound: mpsc::UnboundedReceiver<ServerMessage>,
}

/// A single match wired to its channels. Create with [`MatchRuntime::new`],
/// then drive with [`run`](MatchRuntime::run).
pub struct MatchRuntime {
    state: MatchState,
    physics: PhysicsWorld,
    inbound: mpsc::UnboundedReceiver<(String, ClientMessage)>,
    outbound: mpsc::UnboundedSender<ServerMessage>,
}

impl MatchRuntime {
    pub fn new(cfg: MatchConfig) -> (Self, MatchChannels) {
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let physics = PhysicsWorld::new(&cfg);
        let runtime = Self {
            state: MatchState::new(cfg),
            physics,
            inbound: in_rx,
            outbound: out_tx,
        };
        let channels = MatchChannels {
            inbound: in_tx,
            outbound: out_rx,
        };
        (runtime, channels)
    }

    /// Drive the match until it is disposed or the transport goes away.
    pub async fn run(mut self) -> Result<(), MatchError> {
        let mut sim = tokio::time::interval(self.state.cfg.tick_interval());
        sim.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut broadcast = tokio::time::interval(self.state.cfg.broadcast_interval());
        broadcast.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut out = Vec::new();
        loop {
            tokio::select! {
                _ = sim.tick() => {
                    tick(&mut self.state, &mut self.physics, Instant::now(), &mut out);
                }
                _ = broadcast.tick() => {
                    if matches!(self.state.phase, Phase::Serving | Phase::Playing) {
                        out.push(sample_positions(&self.physics));
                    }
                }
                msg = self.inbound.recv() => {
                    match msg {
                        Some((session_id, msg)) => apply(
                            &mut self.state,
                            &mut self.physics,
                            &session_id,
                            msg,
                            Instant::now(),
                            &mut out,
                        ),
                        None => {
                            log::info!("transport closed, disposing match");
                            self.state.dispose();
                        }
                    }
                }
            }

            self.flush(&mut out)?;
            if self.state.disposed() {
                return Ok(());
            }
        }
    }

    fn flush(&self, out: &mut Vec<ServerMessage>) -> Result<(), MatchError> {
        for msg in out.drain(..) {
            self.outbound.send(msg).map_err(|_| MatchError::RoomClosed)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{timeout, Duration};

    #[tokio::test]
    async fn test_runtime_forms_match_and_starts() {
        let cfg = MatchConfig {
            serve_countdown_ms: 50,
            ..MatchConfig::default()
        };
        let (runtime, mut channels) = MatchRuntime::new(cfg);
        let handle = tokio::spawn(runtime.run());

        let join = |name: &str, color: &str| ClientMessage::Join {
            player_name: name.into(),
            player_color: color.into(),
            private: false,
        };
        channels
            .inbound
            .send(("host".into(), join("Ana", "red")))
            .unwrap();
        channels
            .inbound
            .send(("opp".into(), join("Ben", "blue")))
            .unwrap();

        let mut saw_found = false;
        let mut saw_started = false;
        let deadline = Duration::from_secs(2);
        while !(saw_found && saw_started) {
            let msg = timeout(deadline, channels.outbound.recv())
                .await
                .expect("runtime went quiet")
                .expect("runtime dropped outbound");
            match msg {
                ServerMessage::FoundMatch { host_id, players } => {
                    assert_eq!(host_id, "host");
                    assert_eq!(players.len(), 2);
                    saw_found = true;
                }
                ServerMessage::MatchStarted => saw_started = true,
                _ => {}
            }
        }

        // Dropping the transport tears the match down
        drop(channels.inbound);
        let result = timeout(deadline, handle).await.expect("runtime hung");
        assert!(result.expect("task panicked").is_ok());
    }
}
