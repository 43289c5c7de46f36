//! Match configuration
//!
//! Every timing and threshold the core consumes is supplied here rather than
//! hardcoded at call sites. Defaults carry the stock game tuning.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tunable constants for one match.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Downward gravity (y component)
    pub gravity_y: f32,
    /// Physics tick interval in milliseconds
    pub tick_interval_ms: u64,
    /// Outward position report interval in milliseconds
    pub broadcast_interval_ms: u64,
    /// Per-tick racket interpolation factor toward the client target
    pub racket_lerp: f32,
    /// Score needed to win the match
    pub win_score: u32,
    /// Delay between a point being awarded and the re-serve
    pub score_delay_ms: u64,
    /// Countdown between the second join and the first serve
    pub serve_countdown_ms: u64,
    /// How long an increase-size racket boost lasts
    pub size_boost_ms: u64,
    /// How long a slow-motion window lasts
    pub slow_motion_ms: u64,
    /// Minimum contact force for a table/racket touch to register
    pub contact_force_threshold: f32,
    /// Spawn the optional center blocker
    pub with_blocker: bool,
    /// Seed for the match RNG (hit jitter)
    pub rng_seed: u64,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            gravity_y: -40.0,
            tick_interval_ms: 16,
            broadcast_interval_ms: 33,
            racket_lerp: 0.2,
            win_score: 5,
            score_delay_ms: 1000,
            serve_countdown_ms: 3000,
            size_boost_ms: 8000,
            slow_motion_ms: 6000,
            contact_force_threshold: 10.0,
            with_blocker: false,
            rng_seed: 0,
        }
    }
}

impl MatchConfig {
    /// Tick length in seconds, as consumed by the physics integrator
    pub fn dt(&self) -> f32 {
        self.tick_interval_ms as f32 / 1000.0
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn broadcast_interval(&self) -> Duration {
        Duration::from_millis(self.broadcast_interval_ms)
    }

    pub fn score_delay(&self) -> Duration {
        Duration::from_millis(self.score_delay_ms)
    }

    pub fn serve_countdown(&self) -> Duration {
        Duration::from_millis(self.serve_countdown_ms)
    }

    pub fn size_boost_duration(&self) -> Duration {
        Duration::from_millis(self.size_boost_ms)
    }

    pub fn slow_motion_duration(&self) -> Duration {
        Duration::from_millis(self.slow_motion_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_carry_stock_tuning() {
        let cfg = MatchConfig::default();
        assert_eq!(cfg.win_score, 5);
        assert_eq!(cfg.score_delay(), Duration::from_secs(1));
        assert_eq!(cfg.serve_countdown(), Duration::from_secs(3));
        assert!((cfg.gravity_y - -40.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_partial_config_falls_back_to_defaults() {
        let cfg: MatchConfig = serde_json::from_str(r#"{"win_score": 11}"#).unwrap();
        assert_eq!(cfg.win_score, 11);
        assert_eq!(cfg.tick_interval_ms, 16);
    }
}
