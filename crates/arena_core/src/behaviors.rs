//! Enemy behaviors.
//!
//! A behavior is a plain function that updates one enemy for one tick. The
//! [`BehaviorRegistry`] maps the string keys used by enemy definitions to
//! those functions; the simulation resolves every definition once when it
//! is built so the hot path calls a function pointer.
//!
//! Every built-in targets the nearest alive player, integrates its
//! velocity, then resolves against the tile grid with its collider radius.
//! With no target it stands still.

use std::collections::BTreeMap;

use crate::defs::{EnemyDef, RangedAttack};
use crate::error::{GameError, Result};
use crate::events::{EventBus, GameEvent};
use crate::grid::TileGrid;
use crate::math::{fixed_sqrt, Fixed, Vec2Fixed, PI, TAU};
use crate::state::{
    nearest_alive_player, spawn_bullet, BulletSpawn, BulletState, EnemyState, EntityId,
    PlayerState,
};

/// Orbit distance for `orbit`, in px.
const ORBIT_RADIUS: i32 = 120;

/// Everything a behavior may read or write besides its own enemy.
pub struct BehaviorContext<'a> {
    /// Players (read-only).
    pub players: &'a [PlayerState],
    /// Terrain (read-only).
    pub tiles: &'a TileGrid,
    /// Bullet pool, for ranged attacks.
    pub bullets: &'a mut [BulletState],
    /// Id allocator.
    pub next_entity_id: &'a mut EntityId,
    /// Event sink.
    pub events: &'a mut EventBus,
    /// Seconds per tick.
    pub dt: Fixed,
}

/// Nearest alive player as seen from an enemy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target {
    /// Player position.
    pub pos: Vec2Fixed,
    /// Offset from the enemy to the player.
    pub delta: Vec2Fixed,
    /// Distance to the player.
    pub dist: Fixed,
}

impl Target {
    /// Unit direction toward the target (only meaningful when `dist > 0`).
    #[must_use]
    pub fn dir(&self) -> Vec2Fixed {
        Vec2Fixed::new(self.delta.x / self.dist, self.delta.y / self.dist)
    }
}

impl BehaviorContext<'_> {
    /// Nearest alive player to `pos`.
    #[must_use]
    pub fn nearest_target(&self, pos: Vec2Fixed) -> Option<Target> {
        let (index, dist_sq) = nearest_alive_player(self.players, pos)?;
        let target = self.players[index].pos;
        Some(Target {
            pos: target,
            delta: target - pos,
            dist: fixed_sqrt(dist_sq),
        })
    }

    /// Move by velocity for one tick, then push out of walls.
    pub fn integrate(&self, enemy: &mut EnemyState) {
        enemy.pos += enemy.vel.scale(self.dt);
        enemy.pos = self.tiles.resolve_circle(enemy.pos, enemy.collider_radius);
    }

    /// Fire one enemy bullet along `dir`. Returns `false` when the bullet
    /// pool is exhausted.
    pub fn fire(&mut self, enemy: &EnemyState, ranged: &RangedAttack, dir: Vec2Fixed) -> bool {
        let spawn = BulletSpawn {
            owner_id: enemy.id,
            pos: enemy.pos,
            dir,
            speed: ranged.bullet_speed,
            ttl: ranged.bullet_ttl,
            damage: ranged.bullet_damage,
            from_enemy: true,
            weapon_id: &ranged.weapon_id,
            pierce: 0,
        };
        match spawn_bullet(self.bullets, self.next_entity_id, &spawn) {
            Some(bullet_id) => {
                self.events.emit(GameEvent::BulletFired {
                    bullet_id,
                    owner_id: enemy.id,
                    pos: enemy.pos,
                });
                true
            }
            None => false,
        }
    }
}

/// Per-tick update for one enemy.
pub type BehaviorFn = fn(&mut EnemyState, &EnemyDef, &mut BehaviorContext<'_>);

/// Velocity toward the target at move speed, or zero within 1 px.
fn chase_velocity(enemy: &EnemyState, target: &Target) -> Vec2Fixed {
    if target.dist > Fixed::ONE {
        target.dir().scale(enemy.move_speed)
    } else {
        Vec2Fixed::ZERO
    }
}

/// Beeline toward the nearest player.
pub fn chase(enemy: &mut EnemyState, _def: &EnemyDef, ctx: &mut BehaviorContext<'_>) {
    let Some(target) = ctx.nearest_target(enemy.pos) else {
        enemy.vel = Vec2Fixed::ZERO;
        return;
    };
    enemy.vel = chase_velocity(enemy, &target);
    ctx.integrate(enemy);
}

/// Hold preferred range: flee inside 0.8x, approach beyond 1.2x, strafe
/// in between. Fires at the target whenever the cooldown allows.
pub fn strafe_shoot(enemy: &mut EnemyState, def: &EnemyDef, ctx: &mut BehaviorContext<'_>) {
    let Some(target) = ctx.nearest_target(enemy.pos) else {
        enemy.vel = Vec2Fixed::ZERO;
        return;
    };
    let ranged = def.ranged.as_ref();
    let preferred = ranged.map_or(Fixed::ZERO, |r| r.preferred_range);
    let too_close = preferred * Fixed::from_num(4) / Fixed::from_num(5);
    let too_far = preferred * Fixed::from_num(6) / Fixed::from_num(5);

    let aim = if target.dist > Fixed::ONE {
        let dir = target.dir();
        let movement = if target.dist < too_close {
            -dir
        } else if target.dist > too_far {
            dir
        } else {
            dir.perp()
        };
        enemy.vel = movement.scale(enemy.move_speed);
        Some(dir)
    } else {
        enemy.vel = Vec2Fixed::ZERO;
        None
    };

    ctx.integrate(enemy);

    if enemy.fire_cooldown > 0 {
        enemy.fire_cooldown -= 1;
    }

    if let (Some(ranged), Some(dir)) = (ranged, aim) {
        if enemy.fire_cooldown <= 0 && ctx.fire(enemy, ranged, dir) {
            enemy.fire_cooldown = ranged.fire_rate;
        }
    }
}

/// Circle the nearest player at a fixed radius.
pub fn orbit(enemy: &mut EnemyState, _def: &EnemyDef, ctx: &mut BehaviorContext<'_>) {
    let Some(target) = ctx.nearest_target(enemy.pos) else {
        enemy.vel = Vec2Fixed::ZERO;
        return;
    };
    let ten = Fixed::from_num(10);
    let far = Fixed::from_num(ORBIT_RADIUS * 13) / ten;
    let near = Fixed::from_num(ORBIT_RADIUS * 7) / ten;

    if target.dist > Fixed::ONE {
        let dir = target.dir();
        let movement = if target.dist > far {
            dir
        } else if target.dist < near {
            -dir
        } else {
            dir.perp().scale(Fixed::from_num(3) / Fixed::from_num(2))
        };
        let len = movement.length();
        if len > Fixed::ZERO {
            enemy.vel = Vec2Fixed::new(movement.x / len, movement.y / len).scale(enemy.move_speed);
        }
    } else {
        enemy.vel = Vec2Fixed::ZERO;
    }

    ctx.integrate(enemy);
}

/// Chase while firing along a continuously rotating emitter.
pub fn spin_chase(enemy: &mut EnemyState, def: &EnemyDef, ctx: &mut BehaviorContext<'_>) {
    enemy.vel = match ctx.nearest_target(enemy.pos) {
        Some(target) => chase_velocity(enemy, &target),
        None => Vec2Fixed::ZERO,
    };
    ctx.integrate(enemy);

    // 2.5 turns per second.
    let spin_speed = PI * Fixed::from_num(5) / Fixed::from_num(2);
    enemy.spin_angle += spin_speed * ctx.dt;
    if enemy.spin_angle > TAU {
        enemy.spin_angle -= TAU;
    }

    if enemy.fire_cooldown > 0 {
        enemy.fire_cooldown -= 1;
    }

    if let Some(ranged) = def.ranged.as_ref() {
        if enemy.fire_cooldown <= 0 {
            let dir = Vec2Fixed::from_angle(enemy.spin_angle);
            if ctx.fire(enemy, ranged, dir) {
                enemy.fire_cooldown = ranged.fire_rate;
            }
        }
    }
}

/// String-keyed table of behaviors.
#[derive(Debug, Clone, Default)]
pub struct BehaviorRegistry {
    behaviors: BTreeMap<String, BehaviorFn>,
}

impl BehaviorRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with `chase`, `strafe_shoot`, `orbit` and `spin_chase`.
    #[must_use]
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register("chase", chase);
        registry.register("strafe_shoot", strafe_shoot);
        registry.register("orbit", orbit);
        registry.register("spin_chase", spin_chase);
        registry
    }

    /// Add or replace a behavior.
    pub fn register(&mut self, key: &str, behavior: BehaviorFn) {
        self.behaviors.insert(key.to_string(), behavior);
    }

    /// True if `key` is registered.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.behaviors.contains_key(key)
    }

    /// Registered keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.behaviors.keys().map(String::as_str)
    }

    /// Look up a behavior.
    pub fn resolve(&self, key: &str) -> Result<BehaviorFn> {
        self.behaviors
            .get(key)
            .copied()
            .ok_or_else(|| GameError::UnknownBehavior(key.to_string()))
    }

    /// Resolve every definition, in catalog order.
    pub fn resolve_all(&self, enemies: &[EnemyDef]) -> Result<Vec<BehaviorFn>> {
        enemies.iter().map(|def| self.resolve(&def.behavior)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defs::builtin_enemies;
    use crate::state::PlayerState;

    fn fixed(n: i32) -> Fixed {
        Fixed::from_num(n)
    }

    fn def(id: &str) -> EnemyDef {
        builtin_enemies().into_iter().find(|e| e.id == id).unwrap()
    }

    fn enemy_at(def: &EnemyDef, x: i32, y: i32) -> EnemyState {
        EnemyState {
            id: 100,
            pos: Vec2Fixed::from_int(x, y),
            hp: def.hp,
            active: true,
            collider_radius: def.collider_radius,
            move_speed: def.move_speed,
            fire_cooldown: 0,
            ..EnemyState::default()
        }
    }

    fn player_at(x: i32, y: i32) -> PlayerState {
        PlayerState::new(1, 0, Vec2Fixed::from_int(x, y), 3, 0)
    }

    struct World {
        players: Vec<PlayerState>,
        tiles: TileGrid,
        bullets: Vec<BulletState>,
        next_id: EntityId,
        events: EventBus,
    }

    impl World {
        fn new(players: Vec<PlayerState>) -> Self {
            Self {
                players,
                tiles: TileGrid::new(80, 60, fixed(12)),
                bullets: vec![BulletState::default(); 8],
                next_id: 500,
                events: EventBus::new(),
            }
        }

        fn run(&mut self, behavior: BehaviorFn, enemy: &mut EnemyState, def: &EnemyDef) {
            let mut ctx = BehaviorContext {
                players: &self.players,
                tiles: &self.tiles,
                bullets: &mut self.bullets,
                next_entity_id: &mut self.next_id,
                events: &mut self.events,
                dt: Fixed::ONE / fixed(60),
            };
            behavior(enemy, def, &mut ctx);
        }
    }

    #[test]
    fn test_registry_resolves_builtins() {
        let registry = BehaviorRegistry::builtin();
        for key in ["chase", "strafe_shoot", "orbit", "spin_chase"] {
            assert!(registry.resolve(key).is_ok(), "{key}");
        }
        assert!(matches!(
            registry.resolve("teleport"),
            Err(GameError::UnknownBehavior(_))
        ));
        assert!(registry.resolve_all(&builtin_enemies()).is_ok());
    }

    #[test]
    fn test_register_custom_behavior() {
        fn idle(enemy: &mut EnemyState, _def: &EnemyDef, _ctx: &mut BehaviorContext<'_>) {
            enemy.vel = Vec2Fixed::ZERO;
        }
        let mut registry = BehaviorRegistry::new();
        assert!(!registry.contains("idle"));
        registry.register("idle", idle);
        assert!(registry.resolve("idle").is_ok());
        assert_eq!(registry.keys().collect::<Vec<_>>(), vec!["idle"]);
    }

    #[test]
    fn test_chase_moves_toward_player() {
        let chaser = def("chaser");
        let mut enemy = enemy_at(&chaser, 100, 100);
        let mut world = World::new(vec![player_at(400, 100)]);
        world.run(chase, &mut enemy, &chaser);
        assert_eq!(enemy.vel, Vec2Fixed::from_int(120, 0));
        assert!(enemy.pos.x > fixed(101) && enemy.pos.x <= fixed(102));
        assert_eq!(enemy.pos.y, fixed(100));
    }

    #[test]
    fn test_no_target_stands_still() {
        let chaser = def("chaser");
        let mut enemy = enemy_at(&chaser, 100, 100);
        enemy.vel = Vec2Fixed::from_int(5, 5);
        let mut dead = player_at(400, 100);
        dead.alive = false;
        let mut world = World::new(vec![dead]);
        world.run(chase, &mut enemy, &chaser);
        assert_eq!(enemy.vel, Vec2Fixed::ZERO);
        assert_eq!(enemy.pos, Vec2Fixed::from_int(100, 100));
    }

    #[test]
    fn test_strafe_shoot_fires_at_target() {
        let shooter = def("shooter");
        let mut enemy = enemy_at(&shooter, 100, 100);
        let mut world = World::new(vec![player_at(300, 100)]);
        world.run(strafe_shoot, &mut enemy, &shooter);

        // In range: strafes perpendicular.
        assert_eq!(enemy.vel, Vec2Fixed::from_int(0, 80));
        assert_eq!(enemy.fire_cooldown, 90);
        let bullet = world.bullets.iter().find(|b| b.active).unwrap();
        assert!(bullet.from_enemy);
        assert_eq!(bullet.owner_id, 100);
        assert_eq!(bullet.vel, Vec2Fixed::from_int(350, 0));
        assert_eq!(bullet.weapon_id, "enemy_shooter");
        assert!(matches!(
            world.events.pending(),
            [GameEvent::BulletFired { owner_id: 100, .. }]
        ));
    }

    #[test]
    fn test_strafe_shoot_flees_when_close() {
        let shooter = def("shooter");
        let mut enemy = enemy_at(&shooter, 100, 100);
        let mut world = World::new(vec![player_at(150, 100)]);
        world.run(strafe_shoot, &mut enemy, &shooter);
        assert_eq!(enemy.vel, Vec2Fixed::from_int(-80, 0));
    }

    #[test]
    fn test_strafe_without_ranged_never_fires() {
        let mut melee = def("shooter");
        melee.ranged = None;
        let mut enemy = enemy_at(&melee, 100, 100);
        let mut world = World::new(vec![player_at(300, 100)]);
        world.run(strafe_shoot, &mut enemy, &melee);
        assert!(world.bullets.iter().all(|b| !b.active));
    }

    #[test]
    fn test_orbit_bands() {
        let spinner = def("spinner");
        let mut world = World::new(vec![player_at(400, 300)]);

        let mut far = enemy_at(&spinner, 100, 300);
        world.run(orbit, &mut far, &spinner);
        assert_eq!(far.vel, Vec2Fixed::from_int(150, 0));

        let mut near = enemy_at(&spinner, 350, 300);
        world.run(orbit, &mut near, &spinner);
        assert_eq!(near.vel, Vec2Fixed::from_int(-150, 0));

        let mut ring = enemy_at(&spinner, 280, 300);
        world.run(orbit, &mut ring, &spinner);
        assert_eq!(ring.vel, Vec2Fixed::from_int(0, 150));
    }

    #[test]
    fn test_spin_chase_rotates_and_fires() {
        let whirler = def("whirler");
        let mut enemy = enemy_at(&whirler, 100, 100);
        let mut world = World::new(vec![player_at(400, 400)]);
        world.run(spin_chase, &mut enemy, &whirler);

        assert!(enemy.spin_angle > Fixed::ZERO);
        assert_eq!(enemy.fire_cooldown, 8);
        assert_eq!(world.bullets.iter().filter(|b| b.active).count(), 1);

        for _ in 0..200 {
            world.run(spin_chase, &mut enemy, &whirler);
            assert!(enemy.spin_angle >= Fixed::ZERO && enemy.spin_angle <= TAU);
        }
    }

    #[test]
    fn test_integrate_resolves_walls() {
        let chaser = def("chaser");
        let mut enemy = enemy_at(&chaser, 60, 100);
        let mut world = World::new(vec![player_at(400, 100)]);
        // Wall directly ahead at x = 108..120.
        for row in 0..60 {
            world.tiles.set(9, row, crate::grid::Tile::SOLID);
        }
        for _ in 0..30 {
            world.run(chase, &mut enemy, &chaser);
        }
        assert!(enemy.pos.x <= fixed(97));
        assert!(enemy.pos.x > fixed(90));
    }
}
