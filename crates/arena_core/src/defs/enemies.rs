//! Enemy type definitions.

use serde::{Deserialize, Serialize};

use crate::math::{fixed_serde, Fixed};

/// Ranged attack block. Enemies without one are melee-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangedAttack {
    /// Ticks between shots.
    pub fire_rate: i32,

    /// Bullet speed in px/s.
    #[serde(with = "fixed_serde")]
    pub bullet_speed: Fixed,

    /// Damage per bullet.
    pub bullet_damage: i32,

    /// Bullet lifetime in ticks.
    pub bullet_ttl: i32,

    /// Distance the AI tries to keep from its target, in px.
    #[serde(default, with = "fixed_serde")]
    pub preferred_range: Fixed,

    /// Presentation key stamped on fired bullets.
    pub weapon_id: String,
}

/// Trail ability: the enemy leaves breakable cover in cells it vacates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrailAbility {
    /// Live trail tiles per enemy; the oldest decays when exceeded.
    pub max_tiles: usize,

    /// Hit points of each placed tile.
    pub tile_hp: i32,

    /// Ticks between placements.
    pub cooldown_ticks: i32,

    /// No tile is placed whose center is this close to a living player.
    #[serde(with = "fixed_serde")]
    pub player_safe_radius: Fixed,
}

/// Data-driven enemy definition.
///
/// Balance fields (`knockback`, `score`, `contact_damage`,
/// `collider_radius`, `move_speed`) are copied onto each enemy when it
/// spawns; the definition itself is read-only during a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnemyDef {
    /// Unique string identifier.
    pub id: String,

    /// Display name.
    pub name: String,

    /// Starting hit points.
    pub hp: i32,

    /// Movement speed in px/s.
    #[serde(with = "fixed_serde")]
    pub move_speed: Fixed,

    /// Damage dealt on touch.
    pub contact_damage: i32,

    /// Radius used for tile collision, separation and hits.
    #[serde(with = "fixed_serde")]
    pub collider_radius: Fixed,

    /// Distance pushed per bullet hit, in px.
    #[serde(with = "fixed_serde")]
    pub knockback: Fixed,

    /// Points awarded on kill (co-op).
    pub score: i32,

    /// Optional ranged attack.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ranged: Option<RangedAttack>,

    /// Optional trail ability.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trail: Option<TrailAbility>,

    /// Key into the behavior registry.
    pub behavior: String,

    /// Relative spawn weight (0 = never spawned by the director).
    pub spawn_weight: u32,

    /// Earliest match tick this type may spawn.
    #[serde(default)]
    pub spawn_after_tick: u64,
}

impl EnemyDef {
    /// True if this type can be picked by the spawn director at `tick`.
    #[must_use]
    pub fn eligible_at(&self, tick: u64) -> bool {
        self.spawn_weight > 0 && self.spawn_after_tick <= tick
    }
}

#[allow(clippy::too_many_arguments)]
fn enemy(
    id: &str,
    name: &str,
    hp: i32,
    move_speed: i32,
    contact_damage: i32,
    collider_radius: i32,
    knockback: i32,
    score: i32,
    behavior: &str,
    spawn_weight: u32,
    spawn_after_tick: u64,
) -> EnemyDef {
    EnemyDef {
        id: id.to_string(),
        name: name.to_string(),
        hp,
        move_speed: Fixed::from_num(move_speed),
        contact_damage,
        collider_radius: Fixed::from_num(collider_radius),
        knockback: Fixed::from_num(knockback),
        score,
        ranged: None,
        trail: None,
        behavior: behavior.to_string(),
        spawn_weight,
        spawn_after_tick,
    }
}

/// The built-in enemy catalog.
#[must_use]
pub fn builtin_enemies() -> Vec<EnemyDef> {
    let chaser = enemy("chaser", "Chaser", 2, 120, 2, 12, 24, 100, "chase", 9, 0);

    let mut shooter = enemy("shooter", "Shooter", 3, 80, 2, 12, 12, 200, "strafe_shoot", 1, 0);
    shooter.ranged = Some(RangedAttack {
        fire_rate: 90,
        bullet_speed: Fixed::from_num(350),
        bullet_damage: 1,
        bullet_ttl: 90,
        preferred_range: Fixed::from_num(200),
        weapon_id: "enemy_shooter".to_string(),
    });

    let spinner = enemy("spinner", "Spinner", 2, 150, 1, 10, 16, 150, "orbit", 2, 1800);

    let mut whirler = enemy("whirler", "Whirler", 4, 60, 2, 14, 8, 300, "spin_chase", 1, 3600);
    whirler.ranged = Some(RangedAttack {
        fire_rate: 8,
        bullet_speed: Fixed::from_num(220),
        bullet_damage: 1,
        bullet_ttl: 80,
        preferred_range: Fixed::ZERO,
        weapon_id: "enemy_spinner".to_string(),
    });

    let mut builder = enemy("builder", "Builder", 3, 100, 1, 12, 16, 250, "chase", 1, 2400);
    builder.trail = Some(TrailAbility {
        max_tiles: 8,
        tile_hp: 1,
        cooldown_ticks: 10,
        player_safe_radius: Fixed::from_num(40),
    });

    vec![chaser, shooter, spinner, whirler, builder]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn find(id: &str) -> EnemyDef {
        builtin_enemies().into_iter().find(|e| e.id == id).unwrap()
    }

    #[test]
    fn test_chaser_stats() {
        let chaser = find("chaser");
        assert_eq!(chaser.hp, 2);
        assert_eq!(chaser.move_speed, Fixed::from_num(120));
        assert_eq!(chaser.behavior, "chase");
        assert!(chaser.ranged.is_none());
    }

    #[test]
    fn test_shooter_has_ranged_block() {
        let shooter = find("shooter");
        let ranged = shooter.ranged.unwrap();
        assert_eq!(ranged.fire_rate, 90);
        assert_eq!(ranged.preferred_range, Fixed::from_num(200));
    }

    #[test]
    fn test_builder_trail() {
        let trail = find("builder").trail.unwrap();
        assert_eq!(trail.max_tiles, 8);
        assert_eq!(trail.tile_hp, 1);
    }

    #[test]
    fn test_eligibility_respects_tick_and_weight() {
        let spinner = find("spinner");
        assert!(!spinner.eligible_at(1799));
        assert!(spinner.eligible_at(1800));

        let mut chaser = find("chaser");
        assert!(chaser.eligible_at(0));
        chaser.spawn_weight = 0;
        assert!(!chaser.eligible_at(10_000));
    }
}
