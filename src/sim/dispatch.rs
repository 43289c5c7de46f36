//! Collision dispatch
//!
//! Translates the raw contact events drained from the physics step into
//! gameplay events, deduplicates repeats within a batch, and applies them
//! to the match state in order.

use std::time::Instant;

use rapier3d::geometry::ColliderHandle;

use crate::physics::{PhysicsWorld, RawContact, WorldHandles};
use crate::session::ServerMessage;
use crate::sim::match_state::MatchState;
use crate::{consts, Side};

/// A contact the match state cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameplayEvent {
    RacketHit(Side),
    TableTouch(Side),
    BallOut,
    BlockerTouch,
}

fn pair_is(a: ColliderHandle, b: ColliderHandle, x: ColliderHandle, y: ColliderHandle) -> bool {
    (a == x && b == y) || (a == y && b == x)
}

/// Map one raw contact to a gameplay event, if the pair is interesting.
/// Intersection events only ever come from the out-of-bounds sensor; force
/// events carry racket and table contacts.
pub fn classify(handles: &WorldHandles, contact: &RawContact) -> Option<GameplayEvent> {
    let (a, b) = contact.pair();
    let ball = handles.ball_collider;
    match contact {
        RawContact::Started(..) => {
            if pair_is(a, b, ball, handles.out_sensor) {
                return Some(GameplayEvent::BallOut);
            }
            if let Some(blocker) = handles.blocker {
                if pair_is(a, b, ball, blocker) {
                    return Some(GameplayEvent::BlockerTouch);
                }
            }
            None
        }
        RawContact::Force(..) => {
            for side in Side::BOTH {
                if pair_is(a, b, ball, handles.racket_colliders[side.index()]) {
                    return Some(GameplayEvent::RacketHit(side));
                }
                if pair_is(a, b, ball, handles.tables[side.index()]) {
                    return Some(GameplayEvent::TableTouch(side));
                }
            }
            None
        }
    }
}

/// Apply one step's worth of contacts to the match state. A collider pair
/// that shows up more than once in the batch is handled once.
pub fn dispatch(
    state: &mut MatchState,
    physics: &mut PhysicsWorld,
    batch: &[RawContact],
    now: Instant,
    out: &mut Vec<ServerMessage>,
) {
    let mut seen: Vec<(u32, u32)> = Vec::new();

    for contact in batch {
        let (a, b) = contact.pair();
        let mut key = (a.into_raw_parts().0, b.into_raw_parts().0);
        if key.0 > key.1 {
            key = (key.1, key.0);
        }
        if seen.contains(&key) {
            continue;
        }
        seen.push(key);

        let Some(event) = classify(&physics.handles, contact) else {
            continue;
        };
        log::trace!("contact event: {event:?}");
        match event {
            GameplayEvent::RacketHit(side) => state.racket_hit(side, physics, out),
            GameplayEvent::TableTouch(side) => state.ball_hit_table(side, now, out),
            GameplayEvent::BallOut => state.ball_out(now, out),
            GameplayEvent::BlockerTouch => physics.dampen_ball(consts::BLOCKER_DAMPING),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MatchConfig;
    use crate::sim::match_state::Phase;

    fn world(with_blocker: bool) -> PhysicsWorld {
        let cfg = MatchConfig {
            with_blocker,
            ..MatchConfig::default()
        };
        PhysicsWorld::new(&cfg)
    }

    fn playing_state(cfg: &MatchConfig) -> MatchState {
        let mut state = MatchState::new(cfg.clone());
        let mut out = Vec::new();
        let now = Instant::now();
        state.join("host", "Ana".into(), "red".into(), false, now, &mut out);
        state.join("opp", "Ben".into(), "blue".into(), false, now, &mut out);
        state.phase = Phase::Playing;
        state
    }

    #[test]
    fn test_classify_routes_known_pairs() {
        let physics = world(true);
        let h = &physics.handles;

        let hit = RawContact::Force(h.ball_collider, h.racket_colliders[0], 12.0);
        assert_eq!(classify(h, &hit), Some(GameplayEvent::RacketHit(Side::Host)));

        // Order within the pair does not matter
        let table = RawContact::Force(h.tables[1], h.ball_collider, 12.0);
        assert_eq!(
            classify(h, &table),
            Some(GameplayEvent::TableTouch(Side::Opponent))
        );

        let out = RawContact::Started(h.ball_collider, h.out_sensor);
        assert_eq!(classify(h, &out), Some(GameplayEvent::BallOut));

        let blocker = RawContact::Started(h.ball_collider, h.blocker.unwrap());
        assert_eq!(classify(h, &blocker), Some(GameplayEvent::BlockerTouch));
    }

    #[test]
    fn test_classify_ignores_unrelated_pairs() {
        let physics = world(false);
        let h = &physics.handles;

        // Racket scraping the table is not a gameplay event
        let scrape = RawContact::Force(h.racket_colliders[0], h.tables[0], 50.0);
        assert_eq!(classify(h, &scrape), None);

        // A sensor start only counts for the ball
        let odd = RawContact::Started(h.racket_colliders[1], h.out_sensor);
        assert_eq!(classify(h, &odd), None);
    }

    #[test]
    fn test_dispatch_dedupes_repeated_pair() {
        let cfg = MatchConfig::default();
        let mut physics = world(false);
        let mut state = playing_state(&cfg);
        let mut out = Vec::new();
        let now = Instant::now();
        let h = physics.handles;

        state.touched_last_by = Some(Side::Host);
        let batch = [
            RawContact::Force(h.ball_collider, h.tables[0], 15.0),
            RawContact::Force(h.tables[0], h.ball_collider, 11.0),
        ];
        dispatch(&mut state, &mut physics, &batch, now, &mut out);

        // One fault, not two: a single Scored despite the duplicate contact
        let scored = out
            .iter()
            .filter(|m| matches!(m, ServerMessage::Scored { .. }))
            .count();
        assert_eq!(scored, 1);
    }

    #[test]
    fn test_dispatch_ball_out_awards_point() {
        let cfg = MatchConfig::default();
        let mut physics = world(false);
        let mut state = playing_state(&cfg);
        let mut out = Vec::new();
        let now = Instant::now();
        let h = physics.handles;

        state.touched_last_by = Some(Side::Opponent);
        state.last_table_hit = Some(Side::Host);
        let batch = [RawContact::Started(h.ball_collider, h.out_sensor)];
        dispatch(&mut state, &mut physics, &batch, now, &mut out);

        assert!(matches!(
            out.as_slice(),
            [ServerMessage::Scored { player_id }] if player_id == "opp"
        ));
    }

    #[test]
    fn test_dispatch_blocker_dampens_ball() {
        let cfg = MatchConfig {
            with_blocker: true,
            ..MatchConfig::default()
        };
        let mut physics = PhysicsWorld::new(&cfg);
        let mut state = playing_state(&cfg);
        let mut out = Vec::new();
        let now = Instant::now();
        let h = physics.handles;

        physics.strike_ball(glam::Vec3::new(0.0, 0.0, -1.0));
        let before = physics.ball_velocity().length();
        let batch = [RawContact::Started(h.ball_collider, h.blocker.unwrap())];
        dispatch(&mut state, &mut physics, &batch, now, &mut out);

        assert!(physics.ball_velocity().length() < before);
        assert!(out.is_empty());
    }
}
