//! Simulation balance configuration.
//!
//! Every tunable constant of a match lives in [`SimConfig`]. The defaults
//! are the shipped balance; RON files may override any subset of fields.

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::math::Fixed;

/// Balance constants for one match. Distances are px, speeds px/s and
/// durations ticks.
///
/// # Example RON
///
/// ```ron
/// SimConfig(
///     player_move_speed: 300,
///     pvp_match_duration: 7200,
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Simulation ticks per second.
    pub tick_rate: u32,
    /// Most players a match accepts.
    pub max_players: usize,
    /// Bullet pool capacity.
    pub max_bullets: usize,
    /// Enemy pool capacity.
    pub max_enemies: usize,

    /// Player starting hit points.
    pub player_hp: i32,
    /// Player move speed.
    pub player_move_speed: i32,
    /// Move speed while downed.
    pub downed_crawl_speed: i32,
    /// Player collision radius.
    pub player_radius: i32,
    /// Bullet collision radius.
    pub bullet_radius: i32,
    /// Distance a player is pushed by a bullet hit.
    pub player_knockback: i32,
    /// Weapon every player starts with.
    pub default_weapon: String,

    /// Hit points of map breakable tiles.
    pub breakable_tile_hp: i32,

    /// PvP respawn delay.
    pub pvp_respawn_delay: i32,
    /// Invulnerability after spawning, respawning or being revived.
    pub spawn_invuln_duration: i32,
    /// Invulnerability after enemy contact damage.
    pub hit_iframes: i32,

    /// Ticks a downed player survives without a revive.
    pub downed_bleedout_timer: i32,
    /// Ticks a teammate must hold revive.
    pub revive_hold_time: i32,
    /// Reach of a revive.
    pub revive_radius: i32,
    /// Co-op shared lives before per-player bonus.
    pub shared_lives_base: i32,

    /// Enemies never spawn this close to a living player.
    pub spawn_safety_distance: i32,
    /// Telegraph window after an enemy spawns.
    pub spawn_telegraph_ticks: i32,
    /// Spawn interval at the start of a match.
    pub spawn_rate_base_interval: i32,
    /// Spawn interval once the ramp completes.
    pub spawn_rate_min_interval: i32,
    /// Ticks over which the spawn interval ramps down.
    pub spawn_ramp_duration: u64,

    /// PvP match length.
    pub pvp_match_duration: u64,

    /// Catch-up cap for the fixed-timestep driver.
    pub max_steps_per_frame: u32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tick_rate: 60,
            max_players: 7,
            max_bullets: 256,
            max_enemies: 100,
            player_hp: 3,
            player_move_speed: 250,
            downed_crawl_speed: 75,
            player_radius: 16,
            bullet_radius: 4,
            player_knockback: 8,
            default_weapon: "auto".to_string(),
            breakable_tile_hp: 2,
            pvp_respawn_delay: 30,
            spawn_invuln_duration: 90,
            hit_iframes: 6,
            downed_bleedout_timer: 480,
            revive_hold_time: 90,
            revive_radius: 56,
            shared_lives_base: 3,
            spawn_safety_distance: 150,
            spawn_telegraph_ticks: 30,
            spawn_rate_base_interval: 180,
            spawn_rate_min_interval: 60,
            spawn_ramp_duration: 3600,
            pvp_match_duration: 10_800,
            max_steps_per_frame: 5,
        }
    }
}

impl SimConfig {
    /// Parse a config from RON text. Missing fields take their defaults.
    pub fn from_ron_str(text: &str, path: &str) -> Result<Self> {
        let config: Self = ron::from_str(text).map_err(|e| GameError::DataParseError {
            path: path.to_string(),
            message: e.to_string(),
        })?;
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(GameError::DataParseError {
                path: path.to_string(),
                message: errors.join("; "),
            })
        }
    }

    /// Seconds per tick.
    #[must_use]
    pub fn dt(&self) -> Fixed {
        Fixed::ONE / Fixed::from_num(self.tick_rate.max(1))
    }

    /// Shared co-op lives for a match starting with `players` players.
    #[must_use]
    pub fn starting_lives(&self, players: usize) -> i32 {
        let extra = i32::try_from(players.saturating_sub(1)).unwrap_or(i32::MAX);
        self.shared_lives_base.saturating_add(extra)
    }

    /// Out-of-range values, empty when valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.tick_rate == 0 {
            errors.push("tick_rate must be positive".to_string());
        }
        if self.max_players == 0 {
            errors.push("max_players must be positive".to_string());
        }
        if self.max_bullets == 0 || self.max_enemies == 0 {
            errors.push("pool capacities must be positive".to_string());
        }
        if self.player_hp <= 0 {
            errors.push("player_hp must be positive".to_string());
        }
        if self.player_radius <= 0 || self.bullet_radius <= 0 {
            errors.push("collision radii must be positive".to_string());
        }
        if self.spawn_rate_base_interval <= 0 || self.spawn_rate_min_interval <= 0 {
            errors.push("spawn intervals must be positive".to_string());
        }
        if self.max_steps_per_frame == 0 {
            errors.push("max_steps_per_frame must be positive".to_string());
        }
        errors
    }
}
