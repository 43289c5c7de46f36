//! Hit resolution
//!
//! Turns a racket/ball contact into the outgoing ball impulse. The closer
//! the racket center was to the ball, the better the precision tier: good
//! tiers aim wide and fast with no jitter, bad tiers aim at the center line
//! with less pace and a wilder spread. Jitter only perturbs the lateral and
//! vertical components; depth is always the deliberate part of a shot.

use glam::Vec3;
use rand::Rng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::consts;
use crate::sim::match_state::PowerUpKind;

/// Discrete quality of a racket contact, by racket-to-ball distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precision {
    Perfect,
    Good,
    Ok,
    Bad,
}

/// Aim and power numbers for one precision tier.
#[derive(Debug, Clone, Copy)]
pub struct TierProfile {
    /// Random jitter scale (0 = none)
    pub spread: f32,
    /// Lateral aim offset magnitude (sign is randomized)
    pub lateral: f32,
    /// Vertical aim height
    pub lift: f32,
    /// Impulse magnitude
    pub speed: f32,
}

impl Precision {
    pub fn classify(distance: f32) -> Self {
        if distance < 1.3 {
            Precision::Perfect
        } else if distance < 2.0 {
            Precision::Good
        } else if distance < 3.0 {
            Precision::Ok
        } else {
            Precision::Bad
        }
    }

    pub fn profile(self) -> TierProfile {
        match self {
            Precision::Perfect => TierProfile {
                spread: 0.0,
                lateral: 11.0,
                lift: 10.0,
                speed: 18.0 / 3.0,
            },
            Precision::Good => TierProfile {
                spread: 0.3,
                lateral: 10.0,
                lift: 12.0,
                speed: 17.0 / 3.0,
            },
            Precision::Ok => TierProfile {
                spread: 0.5,
                lateral: 5.0,
                lift: 13.0,
                speed: 16.0 / 3.0,
            },
            Precision::Bad => TierProfile {
                spread: 1.0,
                lateral: 0.0,
                lift: 13.0,
                speed: 14.0 / 3.0,
            },
        }
    }
}

/// Which ball trail visual the clients should show. Advisory only; never
/// feeds back into scoring or physics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrailKind {
    #[default]
    None,
    SuperHit,
    SuperCurve,
}

/// Result of resolving one racket contact.
#[derive(Debug, Clone, Copy)]
pub struct HitOutcome {
    /// Impulse to apply after zeroing the ball's motion
    pub impulse: Vec3,
    /// Trail to broadcast; `None` means no power-up was consumed
    pub trail: TrailKind,
}

/// Resolve a racket/ball contact into an outgoing impulse.
///
/// `armed` is the striking player's armed power-up, if any; only super-hit
/// and super-curve alter the impulse (and report a trail so the caller can
/// consume them). Everything else is handled at arm time.
pub fn resolve_hit(
    rng: &mut Pcg32,
    ball_pos: Vec3,
    racket_pos: Vec3,
    armed: Option<PowerUpKind>,
) -> HitOutcome {
    // Rackets at positive z play toward negative z and vice versa.
    let depth_sign = if racket_pos.z > 0.0 { -1.0 } else { 1.0 };

    let tier = Precision::classify(racket_pos.distance(ball_pos));
    let profile = tier.profile();

    let lateral_sign: f32 = if rng.random::<f32>() < 0.5 { -1.0 } else { 1.0 };
    let target = Vec3::new(
        -profile.lateral * lateral_sign,
        profile.lift,
        consts::AIM_DEPTH * depth_sign,
    );

    let direction = (target - ball_pos).normalize_or_zero() * profile.speed;

    // One draw feeds both jittered axes so they stay correlated, like a
    // single mishit deflecting the whole shot.
    let jitter = (rng.random::<f32>() - 0.5) * profile.spread;
    let mut impulse = Vec3::new(
        direction.x + jitter * 3.33,
        direction.y + jitter * 0.5,
        direction.z,
    );

    let trail = match armed {
        Some(PowerUpKind::SuperHit) => {
            impulse += Vec3::new(
                0.0,
                -consts::SUPER_HIT_DIP,
                consts::SUPER_HIT_DRIVE * depth_sign,
            );
            TrailKind::SuperHit
        }
        Some(PowerUpKind::SuperCurve) => {
            // Bend away from the side the shot is aimed at.
            impulse.x -= target.x.signum() * consts::SUPER_CURVE_BEND;
            TrailKind::SuperCurve
        }
        _ => TrailKind::None,
    };

    HitOutcome { impulse, trail }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;

    #[test]
    fn test_classify_tier_boundaries() {
        assert_eq!(Precision::classify(0.0), Precision::Perfect);
        assert_eq!(Precision::classify(1.29), Precision::Perfect);
        assert_eq!(Precision::classify(1.3), Precision::Good);
        assert_eq!(Precision::classify(1.99), Precision::Good);
        assert_eq!(Precision::classify(2.0), Precision::Ok);
        assert_eq!(Precision::classify(2.99), Precision::Ok);
        assert_eq!(Precision::classify(3.0), Precision::Bad);
        assert_eq!(Precision::classify(50.0), Precision::Bad);
    }

    #[test]
    fn test_hit_plays_toward_far_side() {
        let mut rng = Pcg32::seed_from_u64(7);
        // Host racket at +z: impulse must carry the ball toward -z.
        let host = resolve_hit(
            &mut rng,
            Vec3::new(0.0, 5.0, 28.0),
            Vec3::new(0.0, 5.0, 30.0),
            None,
        );
        assert!(host.impulse.z < 0.0);

        // Opponent racket at -z: toward +z.
        let opp = resolve_hit(
            &mut rng,
            Vec3::new(0.0, 5.0, -28.0),
            Vec3::new(0.0, 5.0, -30.0),
            None,
        );
        assert!(opp.impulse.z > 0.0);
    }

    #[test]
    fn test_super_hit_adds_dip_and_drive() {
        let ball = Vec3::new(0.5, 5.5, 28.0);
        let racket = Vec3::new(0.0, 5.0, 30.0);

        let plain = resolve_hit(&mut Pcg32::seed_from_u64(42), ball, racket, None);
        let boosted = resolve_hit(
            &mut Pcg32::seed_from_u64(42),
            ball,
            racket,
            Some(PowerUpKind::SuperHit),
        );

        assert_eq!(boosted.trail, TrailKind::SuperHit);
        let delta = boosted.impulse - plain.impulse;
        assert!((delta.y - -consts::SUPER_HIT_DIP).abs() < 1e-5);
        assert!((delta.z - -consts::SUPER_HIT_DRIVE).abs() < 1e-5);
        assert!(delta.x.abs() < 1e-5);
    }

    #[test]
    fn test_super_curve_bends_laterally() {
        let ball = Vec3::new(0.5, 5.5, 28.0);
        let racket = Vec3::new(0.0, 5.0, 30.0);

        let plain = resolve_hit(&mut Pcg32::seed_from_u64(42), ball, racket, None);
        let curved = resolve_hit(
            &mut Pcg32::seed_from_u64(42),
            ball,
            racket,
            Some(PowerUpKind::SuperCurve),
        );

        assert_eq!(curved.trail, TrailKind::SuperCurve);
        let delta = curved.impulse - plain.impulse;
        assert!((delta.x.abs() - consts::SUPER_CURVE_BEND).abs() < 1e-5);
        assert!(delta.y.abs() < 1e-5);
        assert!(delta.z.abs() < 1e-5);
    }

    #[test]
    fn test_size_class_power_up_leaves_impulse_alone() {
        let ball = Vec3::new(0.0, 5.0, 28.0);
        let racket = Vec3::new(0.0, 5.0, 30.0);
        let plain = resolve_hit(&mut Pcg32::seed_from_u64(9), ball, racket, None);
        let sized = resolve_hit(
            &mut Pcg32::seed_from_u64(9),
            ball,
            racket,
            Some(PowerUpKind::IncreaseSize),
        );
        assert_eq!(sized.trail, TrailKind::None);
        assert_eq!(sized.impulse, plain.impulse);
    }

    proptest! {
        /// For every tier: a contact inside the tier's distance range always
        /// produces a non-zero impulse toward the far side, with a lateral
        /// component bounded by the tier's aim offset plus its jitter span.
        #[test]
        fn prop_tier_impulse_envelope(
            seed in any::<u64>(),
            ball_x in -3.0f32..3.0,
            ball_y in 3.0f32..7.0,
            ball_z in 24.0f32..29.0,
            racket_x in -2.0f32..2.0,
            racket_y in 4.0f32..6.0,
        ) {
            let ball = Vec3::new(ball_x, ball_y, ball_z);
            let racket = Vec3::new(racket_x, racket_y, 30.0);

            let tier = Precision::classify(racket.distance(ball));
            let profile = tier.profile();

            let mut rng = Pcg32::seed_from_u64(seed);
            let outcome = resolve_hit(&mut rng, ball, racket, None);

            prop_assert!(outcome.impulse.z < 0.0);
            prop_assert!(
                outcome.impulse.x.abs() <= profile.lateral + profile.spread * 3.33
            );
        }
    }
}
