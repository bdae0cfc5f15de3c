//! Enemy AI dispatch and crowd separation.

use crate::behaviors::{BehaviorContext, BehaviorFn};
use crate::defs::EnemyDef;
use crate::events::EventBus;
use crate::math::{fixed_sqrt, Fixed, Vec2Fixed};
use crate::state::{EnemyState, GameState};

/// Advance telegraphs, run each engaged enemy's behavior, then push
/// overlapping enemies apart.
///
/// `behaviors[k]` is the resolved behavior of `defs[k]`.
pub fn enemy_system(
    state: &mut GameState,
    defs: &[EnemyDef],
    behaviors: &[BehaviorFn],
    dt: Fixed,
    events: &mut EventBus,
) {
    let GameState {
        players,
        bullets,
        enemies,
        tiles,
        match_state,
        ..
    } = state;
    let mut ctx = BehaviorContext {
        players,
        tiles,
        bullets,
        next_entity_id: &mut match_state.next_entity_id,
        events,
        dt,
    };

    for enemy in enemies.iter_mut().filter(|e| e.active) {
        if enemy.spawn_timer > 0 {
            enemy.spawn_timer -= 1;
            continue;
        }
        let (Some(def), Some(behavior)) = (defs.get(enemy.kind), behaviors.get(enemy.kind)) else {
            tracing::warn!(enemy = enemy.id, kind = enemy.kind, "Enemy kind missing from catalog");
            continue;
        };
        behavior(enemy, def, &mut ctx);
    }

    separate(enemies);
}

/// Push every overlapping pair of engaged enemies apart, half the overlap
/// each, along the line between their centers.
pub fn separate(enemies: &mut [EnemyState]) {
    let half = Fixed::ONE / Fixed::from_num(2);
    for i in 0..enemies.len() {
        let (head, tail) = enemies.split_at_mut(i + 1);
        let a = &mut head[i];
        if !a.is_engaged() {
            continue;
        }
        for b in tail.iter_mut().filter(|b| b.is_engaged()) {
            let min = a.collider_radius + b.collider_radius;
            let delta = b.pos - a.pos;
            let d2 = delta.length_squared();
            if d2 <= Fixed::ZERO || d2 >= min * min {
                continue;
            }
            let d = fixed_sqrt(d2);
            let push = (min - d) * half;
            let n = Vec2Fixed::new(delta.x / d, delta.y / d);
            a.pos -= n.scale(push);
            b.pos += n.scale(push);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behaviors::BehaviorRegistry;
    use crate::defs::builtin_enemies;
    use crate::state::{open_state, Mode};
    use crate::systems::init_enemy;

    fn run(state: &mut GameState) {
        let defs = builtin_enemies();
        let behaviors = BehaviorRegistry::builtin().resolve_all(&defs).unwrap();
        let mut events = EventBus::new();
        enemy_system(state, &defs, &behaviors, Fixed::ONE / Fixed::from_num(60), &mut events);
    }

    fn place(state: &mut GameState, slot: usize, x: i32, y: i32, telegraph: i32) {
        let defs = builtin_enemies();
        let id = state.next_id().unwrap();
        init_enemy(&mut state.enemies[slot], id, 0, &defs[0], Vec2Fixed::from_int(x, y), telegraph);
    }

    #[test]
    fn test_telegraphing_enemy_holds_still() {
        let mut state = open_state(Mode::Coop, &[(600, 400)]);
        place(&mut state, 0, 200, 400, 2);
        run(&mut state);
        run(&mut state);
        assert_eq!(state.enemies[0].spawn_timer, 0);
        assert_eq!(state.enemies[0].pos, Vec2Fixed::from_int(200, 400));
        run(&mut state);
        assert!(state.enemies[0].pos.x > Fixed::from_num(200));
    }

    #[test]
    fn test_separation_splits_overlap() {
        let mut enemies = vec![EnemyState::default(); 2];
        for (enemy, x) in enemies.iter_mut().zip([100, 110]) {
            enemy.active = true;
            enemy.collider_radius = Fixed::from_num(12);
            enemy.pos = Vec2Fixed::from_int(x, 50);
        }
        separate(&mut enemies);
        assert_eq!(enemies[0].pos, Vec2Fixed::from_int(93, 50));
        assert_eq!(enemies[1].pos, Vec2Fixed::from_int(117, 50));
    }

    #[test]
    fn test_separation_resolves_pairs_by_lower_index_first() {
        // (0,2) starts overlapped but clears once (0,1) pushes enemy 0 back.
        let mut enemies = vec![EnemyState::default(); 3];
        for (enemy, x) in enemies.iter_mut().zip([100, 110, 120]) {
            enemy.active = true;
            enemy.collider_radius = Fixed::from_num(12);
            enemy.pos = Vec2Fixed::from_int(x, 50);
        }
        separate(&mut enemies);
        assert_eq!(enemies[0].pos, Vec2Fixed::from_int(93, 50));
        assert_eq!(enemies[1].pos, Vec2Fixed::new(Fixed::from_num(106.5), Fixed::from_num(50)));
        assert_eq!(enemies[2].pos, Vec2Fixed::new(Fixed::from_num(130.5), Fixed::from_num(50)));
    }

    #[test]
    fn test_separation_ignores_coincident_and_telegraphing() {
        let mut enemies = vec![EnemyState::default(); 3];
        for enemy in &mut enemies {
            enemy.active = true;
            enemy.collider_radius = Fixed::from_num(12);
            enemy.pos = Vec2Fixed::from_int(100, 50);
        }
        enemies[2].pos = Vec2Fixed::from_int(105, 50);
        enemies[2].spawn_timer = 5;
        separate(&mut enemies);
        assert!(enemies.iter().take(2).all(|e| e.pos == Vec2Fixed::from_int(100, 50)));
        assert_eq!(enemies[2].pos, Vec2Fixed::from_int(105, 50));
    }
}
