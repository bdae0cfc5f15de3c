//! Player weapon definitions.

use serde::{Deserialize, Serialize};

use crate::math::{fixed_serde, ratio, Fixed, PI};

/// Data-driven weapon definition.
///
/// # Example RON
///
/// ```ron
/// WeaponDef(
///     id: "auto",
///     name: "Auto Rifle",
///     fire_rate: 15,
///     bullet_speed: 2576980377600,  // Fixed-point for 600.0
///     bullet_ttl: 60,
///     bullet_damage: 1,
///     projectile_count: 1,
///     spread_angle: 0,
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeaponDef {
    /// Unique string identifier, also the bullet presentation key.
    pub id: String,

    /// Display name.
    pub name: String,

    /// Ticks between shots.
    pub fire_rate: i32,

    /// Bullet speed in px/s.
    #[serde(with = "fixed_serde")]
    pub bullet_speed: Fixed,

    /// Bullet lifetime in ticks.
    pub bullet_ttl: i32,

    /// Damage per bullet.
    pub bullet_damage: i32,

    /// Projectiles per shot.
    pub projectile_count: u32,

    /// Total spread arc in radians (0 = single line).
    #[serde(with = "fixed_serde")]
    pub spread_angle: Fixed,

    /// Bodies a bullet passes through before it is consumed.
    #[serde(default)]
    pub pierce_count: i32,
}

impl WeaponDef {
    /// Angle offsets (radians) of each projectile relative to the aim.
    ///
    /// Projectiles are spread evenly over `[-spread/2, +spread/2]`; a single
    /// projectile or a zero arc fires straight along the aim.
    pub fn spread_offsets(&self) -> impl Iterator<Item = Fixed> + '_ {
        let count = self.projectile_count.max(1);
        let half = self.spread_angle / Fixed::from_num(2);
        (0..count).map(move |i| {
            if count <= 1 || self.spread_angle == Fixed::ZERO {
                Fixed::ZERO
            } else {
                -half + self.spread_angle * Fixed::from_num(i) / Fixed::from_num(count - 1)
            }
        })
    }
}

fn weapon(
    id: &str,
    name: &str,
    fire_rate: i32,
    bullet_speed: i32,
    bullet_ttl: i32,
    bullet_damage: i32,
    projectile_count: u32,
    spread_angle: Fixed,
    pierce_count: i32,
) -> WeaponDef {
    WeaponDef {
        id: id.to_string(),
        name: name.to_string(),
        fire_rate,
        bullet_speed: Fixed::from_num(bullet_speed),
        bullet_ttl,
        bullet_damage,
        projectile_count,
        spread_angle,
        pierce_count,
    }
}

/// The built-in weapon catalog. The first entry is the default loadout.
#[must_use]
pub fn builtin_weapons() -> Vec<WeaponDef> {
    let shotgun_arc = PI * ratio(1, 6);
    vec![
        weapon("auto", "Auto Rifle", 15, 600, 60, 1, 1, Fixed::ZERO, 0),
        weapon("machine_gun", "Machine Gun", 8, 650, 55, 1, 1, Fixed::ZERO, 0),
        weapon("shotgun", "Shotgun", 40, 500, 30, 1, 3, shotgun_arc, 0),
        weapon("auto_shotgun", "Auto Shotgun", 24, 500, 30, 1, 3, shotgun_arc, 0),
        weapon("uzi", "Uzi", 5, 550, 40, 1, 1, Fixed::ZERO, 0),
        weapon("rifle", "Rifle", 45, 900, 60, 3, 1, Fixed::ZERO, 2),
    ]
}
