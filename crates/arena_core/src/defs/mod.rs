//! Static game data: weapon, enemy and map catalogs.
//!
//! All structs are plain data designed to be deserialized from RON. Lookups
//! fail fast: an unknown id is an error, never a silent fallback.

mod enemies;
mod maps;
mod weapons;

use serde::{Deserialize, Serialize};

pub use enemies::{builtin_enemies, EnemyDef, RangedAttack, TrailAbility};
pub use maps::{builtin_maps, parse_layout, scale_layout, scale_spawn_points, MapDef};
pub use weapons::{builtin_weapons, WeaponDef};

use crate::error::{GameError, Result};

/// Most trail tiles a single enemy can keep alive.
pub const MAX_TRAIL_RING: usize = 32;

/// Everything a match reads but never writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalogs {
    /// Player weapons. The first entry is the default loadout.
    pub weapons: Vec<WeaponDef>,
    /// Enemy types.
    pub enemies: Vec<EnemyDef>,
    /// Arena maps.
    pub maps: Vec<MapDef>,
}

impl Default for Catalogs {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Catalogs {
    /// The built-in catalogs.
    #[must_use]
    pub fn builtin() -> Self {
        Self {
            weapons: builtin_weapons(),
            enemies: builtin_enemies(),
            maps: builtin_maps(),
        }
    }

    /// Parse catalogs from RON text. `path` is only used in error messages.
    pub fn from_ron_str(text: &str, path: &str) -> Result<Self> {
        let catalogs: Self = ron::from_str(text).map_err(|e| GameError::DataParseError {
            path: path.to_string(),
            message: e.to_string(),
        })?;
        catalogs.check()?;
        Ok(catalogs)
    }

    /// Index of a weapon by id.
    pub fn weapon_index(&self, id: &str) -> Result<usize> {
        self.weapons
            .iter()
            .position(|w| w.id == id)
            .ok_or_else(|| GameError::UnknownWeapon(id.to_string()))
    }

    /// Index of an enemy type by id.
    pub fn enemy_index(&self, id: &str) -> Result<usize> {
        self.enemies
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| GameError::UnknownEnemy(id.to_string()))
    }

    /// Map by id.
    pub fn map(&self, id: &str) -> Result<&MapDef> {
        self.maps
            .iter()
            .find(|m| m.id == id)
            .ok_or_else(|| GameError::UnknownMap(id.to_string()))
    }

    /// Validate cross-entry rules.
    ///
    /// Checks:
    /// - ids are unique within each catalog
    /// - weapons fire at least one projectile
    /// - trail caps fit in the trail ring
    /// - maps are structurally sound
    ///
    /// Returns a list of validation errors.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.weapons.is_empty() {
            errors.push("Weapon catalog is empty".to_string());
        }
        for (i, weapon) in self.weapons.iter().enumerate() {
            if self.weapons[..i].iter().any(|w| w.id == weapon.id) {
                errors.push(format!("Duplicate weapon id '{}'", weapon.id));
            }
            if weapon.projectile_count == 0 {
                errors.push(format!("Weapon '{}' fires no projectiles", weapon.id));
            }
        }

        for (i, enemy) in self.enemies.iter().enumerate() {
            if self.enemies[..i].iter().any(|e| e.id == enemy.id) {
                errors.push(format!("Duplicate enemy id '{}'", enemy.id));
            }
            if let Some(trail) = &enemy.trail {
                if trail.max_tiles == 0 || trail.max_tiles > MAX_TRAIL_RING {
                    errors.push(format!(
                        "Enemy '{}' trail cap {} outside 1..={}",
                        enemy.id, trail.max_tiles, MAX_TRAIL_RING
                    ));
                }
            }
        }

        for (i, map) in self.maps.iter().enumerate() {
            if self.maps[..i].iter().any(|m| m.id == map.id) {
                errors.push(format!("Duplicate map id '{}'", map.id));
            }
            errors.extend(map.validate());
        }

        errors
    }

    /// [`Self::validate`] as a `Result`.
    pub fn check(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(GameError::InvalidCatalog(errors.join("; ")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_is_valid() {
        let catalogs = Catalogs::builtin();
        assert!(catalogs.validate().is_empty(), "{:?}", catalogs.validate());
    }

    #[test]
    fn test_lookups_fail_fast() {
        let catalogs = Catalogs::builtin();
        assert_eq!(catalogs.weapon_index("auto").unwrap(), 0);
        assert!(matches!(catalogs.weapon_index("laser"), Err(GameError::UnknownWeapon(_))));
        assert!(matches!(catalogs.enemy_index("dragon"), Err(GameError::UnknownEnemy(_))));
        assert!(matches!(catalogs.map("moon"), Err(GameError::UnknownMap(_))));
        assert_eq!(catalogs.map("arena").unwrap().id, "arena");
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let mut catalogs = Catalogs::builtin();
        catalogs.weapons.push(catalogs.weapons[0].clone());
        let errors = catalogs.validate();
        assert!(errors.iter().any(|e| e.contains("Duplicate weapon id 'auto'")));
        assert!(catalogs.check().is_err());
    }

    #[test]
    fn test_trail_cap_limited_by_ring() {
        let mut catalogs = Catalogs::builtin();
        for enemy in &mut catalogs.enemies {
            if let Some(trail) = &mut enemy.trail {
                trail.max_tiles = MAX_TRAIL_RING + 1;
            }
        }
        assert!(!catalogs.validate().is_empty());
    }

    #[test]
    fn test_ron_roundtrip() {
        let catalogs = Catalogs::builtin();
        let text = ron::to_string(&catalogs).unwrap();
        let back = Catalogs::from_ron_str(&text, "inline").unwrap();
        assert_eq!(back, catalogs);
    }

    #[test]
    fn test_ron_parse_error_names_path() {
        let err = Catalogs::from_ron_str("not ron", "catalogs.ron").unwrap_err();
        match err {
            GameError::DataParseError { path, .. } => assert_eq!(path, "catalogs.ron"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
