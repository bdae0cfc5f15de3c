//! Whole-match scenarios driven through `Simulation::tick`.

use arena_core::prelude::*;
use arena_core::state::BulletState;
use arena_test_utils::fixtures::{
    open_match, open_match_with, place_enemy, place_player, settings, vec2, BotMatch,
};

fn neutral(players: usize) -> Vec<PlayerIntent> {
    vec![PlayerIntent::NEUTRAL; players]
}

fn shoot() -> PlayerIntent {
    PlayerIntent {
        shoot: true,
        ..PlayerIntent::NEUTRAL
    }
}

/// Put a player-owned bullet into the pool.
fn place_bullet(sim: &mut Simulation, owner_slot: usize, pos: Vec2Fixed, vel: Vec2Fixed) {
    let owner_id = sim.state().players[owner_slot].id;
    let id = sim.state_mut().next_id().unwrap();
    sim.state_mut().bullets[0] = BulletState {
        id,
        owner_id,
        pos,
        vel,
        ttl: 60,
        damage: 1,
        active: true,
        weapon_id: "auto".to_string(),
        ..BulletState::default()
    };
}

/// Fire one shot to the right at two chasers in a row and return how many
/// times each was hit.
fn shoot_through_pair(weapon: &str) -> (usize, usize) {
    let mut sim = open_match(Mode::Pvp, 1, 3).unwrap();
    sim.equip_weapon(0, weapon).unwrap();
    place_player(&mut sim, 0, 100, 360);
    let near = place_enemy(&mut sim, "chaser", 300, 360);
    let far = place_enemy(&mut sim, "chaser", 400, 360);
    sim.drain_events();

    let mut hits = (0, 0);
    for tick in 0..40 {
        let intents = if tick == 0 { vec![shoot()] } else { neutral(1) };
        sim.tick(&intents);
        for event in sim.drain_events() {
            if let GameEvent::HitEnemy { enemy_id, .. } = *event {
                if enemy_id == near {
                    hits.0 += 1;
                } else if enemy_id == far {
                    hits.1 += 1;
                }
            }
        }
    }
    hits
}

#[test]
fn piercing_bullet_damages_both_enemies_in_line() {
    assert_eq!(shoot_through_pair("rifle"), (1, 1));
}

#[test]
fn non_piercing_bullet_stops_at_first_enemy() {
    assert_eq!(shoot_through_pair("auto"), (1, 0));
}

#[test]
fn pvp_ends_exactly_at_match_duration() {
    let mut sim = open_match(Mode::Pvp, 2, 1).unwrap();
    let duration = sim.config().pvp_match_duration;

    sim.state_mut().match_state.tick = duration - 1;
    sim.tick(&neutral(2));
    assert!(!sim.is_game_over());

    sim.tick(&neutral(2));
    assert!(sim.is_game_over());

    let frozen = sim.state_hash();
    sim.tick(&[shoot(), shoot()]);
    assert_eq!(sim.state_hash(), frozen);
}

#[test]
fn pvp_hit_pushes_victim_by_knockback() {
    let mut sim = open_match(Mode::Pvp, 2, 42).unwrap();
    place_player(&mut sim, 0, 200, 200);
    place_player(&mut sim, 1, 200, 350);
    place_bullet(&mut sim, 0, vec2(200, 338), vec2(0, 600));

    sim.tick(&neutral(2));

    let knockback = sim.config().player_knockback;
    let victim = &sim.state().players[1];
    assert_eq!(victim.pos, vec2(200, 350 + knockback));
    assert_eq!(victim.hp, 2);
}

#[test]
fn pvp_kill_credits_shooter_and_respawns_victim() {
    let mut sim = open_match(Mode::Pvp, 2, 42).unwrap();
    place_player(&mut sim, 0, 200, 200);
    place_player(&mut sim, 1, 200, 350);
    sim.state_mut().players[1].hp = 1;
    place_bullet(&mut sim, 0, vec2(200, 338), vec2(0, 600));

    sim.tick(&neutral(2));
    {
        let state = sim.state();
        assert_eq!(state.players[0].kills, 1);
        assert_eq!(state.players[1].deaths, 1);
        assert!(!state.players[1].alive);
    }

    let delay = u64::try_from(sim.config().pvp_respawn_delay).unwrap();
    let mut respawned = false;
    for _ in 0..=delay {
        sim.tick(&neutral(2));
        respawned |= sim
            .drain_events()
            .iter()
            .any(|e| matches!(e, GameEvent::PlayerRespawned { player_id: 2, .. }));
    }
    assert!(respawned);
    let victim = &sim.state().players[1];
    assert!(victim.alive);
    assert_eq!(victim.hp, sim.config().player_hp);
    assert!(victim.invuln_timer > 0);
}

#[test]
fn lobby_joins_until_full() {
    let mut sim = open_match(Mode::Coop, 1, 7).unwrap();
    let mut lives = sim.state().match_state.shared_lives;

    for slot in 1..7 {
        let id = sim.add_player().unwrap();
        let player = &sim.state().players[slot];
        assert_eq!(player.id, id);
        assert_eq!(player.slot, slot);
        assert_eq!(player.invuln_timer, sim.config().spawn_invuln_duration);
        lives += 1;
        assert_eq!(sim.state().match_state.shared_lives, lives);
    }

    assert!(matches!(
        sim.add_player(),
        Err(GameError::LobbyFull { max: 7 })
    ));
    assert_eq!(sim.state().players.len(), 7);
}

#[test]
fn pvp_join_does_not_grant_lives() {
    let mut sim = open_match(Mode::Pvp, 2, 7).unwrap();
    sim.add_player().unwrap();
    assert_eq!(sim.state().match_state.shared_lives, 0);
    assert_eq!(sim.state().players.len(), 3);
}

#[test]
fn every_builtin_map_is_sound_and_deterministic() {
    let catalogs = Catalogs::builtin();
    for map in &catalogs.maps {
        let grid = map.build_grid(2).unwrap();
        assert!(grid.world_width() <= Fixed::from_num(960), "{}", map.id);
        assert!(grid.world_height() <= Fixed::from_num(720), "{}", map.id);

        for col in 0..grid.width() {
            assert!(!grid.get(col, 0).unwrap().is_empty(), "{} top border", map.id);
            let bottom = grid.height() - 1;
            assert!(!grid.get(col, bottom).unwrap().is_empty(), "{} bottom", map.id);
        }
        for row in 0..grid.height() {
            assert!(!grid.get(0, row).unwrap().is_empty(), "{} left border", map.id);
            let right = grid.width() - 1;
            assert!(!grid.get(right, row).unwrap().is_empty(), "{} right", map.id);
        }

        let spawns = map.spawn_positions();
        assert!(spawns.len() >= 5, "{} has {} spawns", map.id, spawns.len());
        for spawn in spawns {
            let (col, row) = grid.world_to_cell(spawn);
            assert!(grid.get(col, row).unwrap().is_empty(), "{} spawn in wall", map.id);
        }

        let run = || {
            let mut game = BotMatch::start(settings(Mode::Coop, &map.id, 3, 99)).unwrap();
            game.run(600);
            game.state_hash()
        };
        assert_eq!(run(), run(), "{} diverged", map.id);
    }
}

#[test]
fn teammate_revives_downed_player() {
    let mut sim = open_match(Mode::Coop, 2, 11).unwrap();
    place_player(&mut sim, 0, 300, 300);
    place_player(&mut sim, 1, 330, 300);
    {
        let bleedout = sim.config().downed_bleedout_timer;
        let downed = &mut sim.state_mut().players[1];
        downed.alive = false;
        downed.downed = true;
        downed.hp = 0;
        downed.downed_timer = bleedout;
    }
    let hold = sim.config().revive_hold_time;
    let reviving = vec![
        PlayerIntent {
            revive: true,
            ..PlayerIntent::NEUTRAL
        },
        PlayerIntent::NEUTRAL,
    ];

    let mut started = false;
    for _ in 0..hold - 1 {
        sim.tick(&reviving);
        started |= sim
            .drain_events()
            .iter()
            .any(|e| matches!(e, GameEvent::ReviveStart { target_id: 2, reviver_id: 1 }));
    }
    assert!(started);
    assert!(sim.state().players[1].downed);

    sim.tick(&reviving);
    assert!(sim
        .drain_events()
        .iter()
        .any(|e| matches!(e, GameEvent::ReviveComplete { target_id: 2, .. })));
    let revived = &sim.state().players[1];
    assert!(revived.alive && !revived.downed);
    assert_eq!(revived.hp, sim.config().player_hp);
}

#[test]
fn bleed_out_spends_a_shared_life() {
    let mut sim = open_match(Mode::Coop, 2, 11).unwrap();
    let lives = sim.state().match_state.shared_lives;
    {
        let downed = &mut sim.state_mut().players[1];
        downed.alive = false;
        downed.downed = true;
        downed.hp = 0;
        downed.downed_timer = 1;
    }
    sim.tick(&neutral(2));

    let events = sim.drain_events();
    assert!(events
        .iter()
        .any(|e| matches!(e, GameEvent::PlayerBledOut { player_id: 2 })));
    assert!(events
        .iter()
        .any(|e| matches!(e, GameEvent::PlayerRespawned { player_id: 2, .. })));
    assert_eq!(sim.state().match_state.shared_lives, lives - 1);
    assert!(sim.state().players[1].alive);
}

#[test]
fn coop_ends_when_last_player_bleeds_out_without_lives() {
    let mut sim = open_match(Mode::Coop, 1, 11).unwrap();
    sim.state_mut().match_state.shared_lives = 0;
    {
        let downed = &mut sim.state_mut().players[0];
        downed.alive = false;
        downed.downed = true;
        downed.hp = 0;
        downed.downed_timer = 1;
    }
    sim.tick(&neutral(1));
    assert!(sim.is_game_over());

    let tick = sim.current_tick();
    sim.tick(&neutral(1));
    assert_eq!(sim.current_tick(), tick);
}

#[test]
fn builder_trail_respects_cap_and_safe_radius() {
    let config = SimConfig {
        player_hp: 1000,
        ..SimConfig::default()
    };
    let mut sim = open_match_with(Mode::Pvp, 1, 5, config).unwrap();
    place_player(&mut sim, 0, 100, 360);
    place_enemy(&mut sim, "builder", 500, 200);
    sim.drain_events();

    let safe = Fixed::from_num(40);
    let mut created = 0;
    for _ in 0..400 {
        sim.tick(&neutral(1));
        let player_pos = sim.state().players[0].pos;
        for event in sim.drain_events().to_vec() {
            if let GameEvent::TileCreated { col, row, .. } = event {
                created += 1;
                let center = sim.state().tiles.cell_center(col, row);
                assert!(center.distance_squared(player_pos) >= safe * safe);
            }
        }
        let standing = sim
            .state()
            .tiles
            .cells()
            .iter()
            .filter(|t| t.kind == TileKind::Breakable)
            .count();
        assert!(standing <= 8);
    }
    assert!(created > 0);
}

#[test]
fn telegraphed_enemy_holds_still_then_moves() {
    let mut sim = open_match(Mode::Pvp, 1, 5).unwrap();
    place_player(&mut sim, 0, 100, 360);
    let start = vec2(600, 360);
    sim.spawn_enemy("chaser", start, false).unwrap().unwrap();
    let telegraph = sim.config().spawn_telegraph_ticks;

    for _ in 0..telegraph - 1 {
        sim.tick(&neutral(1));
        assert_eq!(sim.state().enemies[0].pos, start);
    }
    for _ in 0..10 {
        sim.tick(&neutral(1));
    }
    assert!(sim.state().enemies[0].pos.x < start.x);
}

#[test]
fn bots_score_in_coop() {
    let mut game = BotMatch::start(settings(Mode::Coop, "arena", 2, 31)).unwrap();
    game.run(1800);
    assert!(game.sim.state().match_state.score > 0);
}

#[test]
fn bots_trade_kills_in_pvp() {
    let mut game = BotMatch::start(settings(Mode::Pvp, "arena", 2, 8)).unwrap();
    game.run(3600);
    let kills: u32 = game.sim.state().players.iter().map(|p| p.kills).sum();
    assert!(kills > 0);
}
