//! World builder and simulation scene
//!
//! Builds the fixed table-tennis scene once per match: two table halves, two
//! rackets, one ball, an out-of-bounds sensor and (optionally) a center
//! blocker. Geometry and materials are fixed configuration, not gameplay
//! state; everything mutable about the scene goes through the handle-based
//! accessors below.

use glam::Vec3;
use rapier3d::prelude::*;

use crate::config::MatchConfig;
use crate::consts;
use crate::physics::events::{EventSink, RawContact};
use crate::Side;

/// Stable handles to every body the gameplay layer cares about.
#[derive(Debug, Clone, Copy)]
pub struct WorldHandles {
    pub ball: RigidBodyHandle,
    pub ball_collider: ColliderHandle,
    pub rackets: [RigidBodyHandle; 2],
    pub racket_colliders: [ColliderHandle; 2],
    pub tables: [ColliderHandle; 2],
    pub out_sensor: ColliderHandle,
    pub blocker: Option<ColliderHandle>,
}

/// Owns the rapier world for one match. Dropped with the match context.
pub struct PhysicsWorld {
    pub handles: WorldHandles,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    gravity: Vector<Real>,
    integration_parameters: IntegrationParameters,
    pipeline: PhysicsPipeline,
    islands: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
}

impl PhysicsWorld {
    pub fn new(cfg: &MatchConfig) -> Self {
        let mut bodies = RigidBodySet::new();
        let mut colliders = ColliderSet::new();

        let mut tables = [ColliderHandle::invalid(); 2];
        let mut rackets = [RigidBodyHandle::invalid(); 2];
        let mut racket_colliders = [ColliderHandle::invalid(); 2];

        for side in Side::BOTH {
            tables[side.index()] = build_table(&mut bodies, &mut colliders, side, cfg);
            let (body, collider) = build_racket(&mut bodies, &mut colliders, side);
            rackets[side.index()] = body;
            racket_colliders[side.index()] = collider;
        }

        let (ball, ball_collider) = build_ball(&mut bodies, &mut colliders, cfg);
        let out_sensor = build_out_sensor(&mut colliders);
        let blocker = cfg.with_blocker.then(|| build_blocker(&mut colliders));

        let mut integration_parameters = IntegrationParameters::default();
        integration_parameters.dt = cfg.dt();

        Self {
            handles: WorldHandles {
                ball,
                ball_collider,
                rackets,
                racket_colliders,
                tables,
                out_sensor,
                blocker,
            },
            bodies,
            colliders,
            gravity: vector![0.0, cfg.gravity_y, 0.0],
            integration_parameters,
            pipeline: PhysicsPipeline::new(),
            islands: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
        }
    }

    /// Advance the world one fixed tick, returning the drained event batch.
    pub fn step(&mut self) -> Vec<RawContact> {
        let sink = EventSink::new();
        self.pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            None,
            &(),
            &sink,
        );
        sink.drain()
    }

    pub fn ball_position(&self) -> Vec3 {
        let t = self.bodies[self.handles.ball].translation();
        Vec3::new(t.x, t.y, t.z)
    }

    pub fn ball_velocity(&self) -> Vec3 {
        let v = self.bodies[self.handles.ball].linvel();
        Vec3::new(v.x, v.y, v.z)
    }

    pub fn racket_position(&self, side: Side) -> Vec3 {
        let t = self.bodies[self.handles.rackets[side.index()]].translation();
        Vec3::new(t.x, t.y, t.z)
    }

    /// Teleport a racket. Rackets are fixed bodies driven purely by the
    /// simulation loop, so this never fights the solver.
    pub fn set_racket_position(&mut self, side: Side, pos: Vec3) {
        let body = &mut self.bodies[self.handles.rackets[side.index()]];
        body.set_translation(vector![pos.x, pos.y, pos.z], true);
    }

    /// Place the ball at the serve drop point on `side`, with all residual
    /// motion and accumulated forces cleared.
    pub fn reset_ball(&mut self, side: Side) {
        let body = &mut self.bodies[self.handles.ball];
        body.reset_forces(true);
        body.reset_torques(true);
        body.set_linvel(vector![0.0, 0.0, 0.0], true);
        body.set_angvel(vector![0.0, 0.0, 0.0], true);
        body.set_translation(
            vector![
                0.0,
                consts::BALL_SERVE_HEIGHT,
                consts::BALL_SERVE_DEPTH * side.sign()
            ],
            true,
        );
    }

    /// Zero the ball's motion and apply `impulse` as the full new momentum.
    /// Clearing first keeps residual momentum out of a fresh hit.
    pub fn strike_ball(&mut self, impulse: Vec3) {
        let body = &mut self.bodies[self.handles.ball];
        body.reset_forces(true);
        body.reset_torques(true);
        body.set_linvel(vector![0.0, 0.0, 0.0], true);
        body.set_angvel(vector![0.0, 0.0, 0.0], true);
        body.apply_impulse(vector![impulse.x, impulse.y, impulse.z], true);
    }

    /// Scale the ball's linear velocity (blocker clips).
    pub fn dampen_ball(&mut self, factor: f32) {
        let body = &mut self.bodies[self.handles.ball];
        let v = *body.linvel() * factor;
        body.set_linvel(v, true);
    }

    /// Scale a racket collider's half-extents in the hitting plane.
    /// `scale = 1.0` restores the nominal size.
    pub fn set_racket_scale(&mut self, side: Side, scale: f32) {
        let [hx, hy, hz] = consts::RACKET_HALF_EXTENTS;
        if let Some(collider) = self
            .colliders
            .get_mut(self.handles.racket_colliders[side.index()])
        {
            collider.set_shape(SharedShape::cuboid(hx * scale, hy * scale, hz));
        }
    }

    /// Current half-extents of a racket collider (x axis), for inspection.
    pub fn racket_half_width(&self, side: Side) -> f32 {
        self.colliders
            .get(self.handles.racket_colliders[side.index()])
            .and_then(|c| c.shape().as_cuboid().map(|c| c.half_extents.x))
            .unwrap_or(consts::RACKET_HALF_EXTENTS[0])
    }
}

fn build_table(
    bodies: &mut RigidBodySet,
    colliders: &mut ColliderSet,
    side: Side,
    cfg: &MatchConfig,
) -> ColliderHandle {
    let [hx, hy, hz] = consts::TABLE_HALF_EXTENTS;
    let body = bodies.insert(RigidBodyBuilder::fixed().translation(vector![
        0.0,
        consts::TABLE_HEIGHT,
        consts::TABLE_CENTER_DEPTH * side.sign()
    ]));
    colliders.insert_with_parent(
        ColliderBuilder::cuboid(hx, hy, hz)
            .active_events(ActiveEvents::CONTACT_FORCE_EVENTS)
            .contact_force_event_threshold(cfg.contact_force_threshold)
            .restitution(consts::TABLE_RESTITUTION)
            .friction(consts::TABLE_FRICTION)
            .build(),
        body,
        bodies,
    )
}

fn build_racket(
    bodies: &mut RigidBodySet,
    colliders: &mut ColliderSet,
    side: Side,
) -> (RigidBodyHandle, ColliderHandle) {
    let [hx, hy, hz] = consts::RACKET_HALF_EXTENTS;
    let [ox, oy, oz] = consts::RACKET_LOCAL_OFFSET;
    let body = bodies.insert(RigidBodyBuilder::fixed().translation(vector![
        0.0,
        consts::RACKET_HEIGHT,
        consts::RACKET_DEPTH * side.sign()
    ]));
    let collider = colliders.insert_with_parent(
        ColliderBuilder::cuboid(hx, hy, hz)
            .translation(vector![ox, oy, oz])
            .build(),
        body,
        bodies,
    );
    (body, collider)
}

fn build_ball(
    bodies: &mut RigidBodySet,
    colliders: &mut ColliderSet,
    cfg: &MatchConfig,
) -> (RigidBodyHandle, ColliderHandle) {
    let body = bodies.insert(
        RigidBodyBuilder::dynamic()
            .ccd_enabled(true)
            .can_sleep(false)
            .translation(vector![
                0.0,
                consts::BALL_SERVE_HEIGHT,
                consts::BALL_SERVE_DEPTH
            ]),
    );
    let collider = colliders.insert_with_parent(
        ColliderBuilder::ball(consts::BALL_RADIUS)
            .active_events(ActiveEvents::CONTACT_FORCE_EVENTS)
            .contact_force_event_threshold(cfg.contact_force_threshold)
            .restitution(consts::BALL_RESTITUTION)
            .mass(consts::BALL_MASS)
            .build(),
        body,
        bodies,
    );
    (body, collider)
}

fn build_out_sensor(colliders: &mut ColliderSet) -> ColliderHandle {
    let [hx, hy, hz] = consts::SENSOR_HALF_EXTENTS;
    colliders.insert(
        ColliderBuilder::cuboid(hx, hy, hz)
            .sensor(true)
            .active_events(ActiveEvents::COLLISION_EVENTS)
            .translation(vector![0.0, consts::SENSOR_HEIGHT, 0.0])
            .build(),
    )
}

fn build_blocker(colliders: &mut ColliderSet) -> ColliderHandle {
    let [hx, hy, hz] = consts::BLOCKER_HALF_EXTENTS;
    colliders.insert(
        ColliderBuilder::cuboid(hx, hy, hz)
            .active_events(ActiveEvents::COLLISION_EVENTS)
            .translation(vector![0.0, consts::BLOCKER_HEIGHT, 0.0])
            .build(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scene_body_kinds() {
        let mut world = PhysicsWorld::new(&MatchConfig::default());
        assert!(world.bodies[world.handles.ball].is_dynamic());
        for side in Side::BOTH {
            assert!(world.bodies[world.handles.rackets[side.index()]].is_fixed());
        }
        assert!(world.colliders[world.handles.out_sensor].is_sensor());
        assert!(world.handles.blocker.is_none());

        let cfg = MatchConfig {
            with_blocker: true,
            ..Default::default()
        };
        world = PhysicsWorld::new(&cfg);
        assert!(world.handles.blocker.is_some());
    }

    #[test]
    fn test_ball_falls_under_gravity() {
        let mut world = PhysicsWorld::new(&MatchConfig::default());
        let before = world.ball_position();
        for _ in 0..30 {
            world.step();
        }
        assert!(world.ball_position().y < before.y);
    }

    #[test]
    fn test_reset_ball_clears_motion() {
        let mut world = PhysicsWorld::new(&MatchConfig::default());
        world.strike_ball(Vec3::new(1.0, 2.0, -3.0));
        assert!(world.ball_velocity().length() > 0.0);

        world.reset_ball(Side::Opponent);
        assert_eq!(world.ball_velocity(), Vec3::ZERO);
        let pos = world.ball_position();
        assert!((pos.z - -consts::BALL_SERVE_DEPTH).abs() < 1e-5);
        assert!((pos.y - consts::BALL_SERVE_HEIGHT).abs() < 1e-5);
    }

    #[test]
    fn test_racket_scale_roundtrip() {
        let mut world = PhysicsWorld::new(&MatchConfig::default());
        let nominal = world.racket_half_width(Side::Host);

        world.set_racket_scale(Side::Host, consts::SIZE_BOOST_SCALE);
        let boosted = world.racket_half_width(Side::Host);
        assert!((boosted - nominal * consts::SIZE_BOOST_SCALE).abs() < 1e-5);
        // The other racket is untouched
        assert!((world.racket_half_width(Side::Opponent) - nominal).abs() < 1e-5);

        world.set_racket_scale(Side::Host, 1.0);
        assert!((world.racket_half_width(Side::Host) - nominal).abs() < 1e-5);
    }

    #[test]
    fn test_serve_drop_lands_on_serving_racket() {
        // The serve point sits directly above the serving racket's rest
        // pose, so the drop must generate a contact-force event against
        // that racket within a couple of simulated seconds.
        let mut world = PhysicsWorld::new(&MatchConfig::default());
        let racket = world.handles.racket_colliders[Side::Host.index()];
        let ball = world.handles.ball_collider;

        let mut hit = false;
        for _ in 0..180 {
            for contact in world.step() {
                if let RawContact::Force(a, b, force) = contact {
                    if (a == ball && b == racket) || (a == racket && b == ball) {
                        assert!(force >= MatchConfig::default().contact_force_threshold);
                        hit = true;
                    }
                }
            }
            if hit {
                break;
            }
        }
        assert!(hit, "serve drop never touched the host racket");
    }
}
