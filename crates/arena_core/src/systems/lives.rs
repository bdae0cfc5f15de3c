//! Lives, revives and respawns.
//!
//! Co-op runs a per-player state machine: alive, downed (bleeding out),
//! then either revived by a teammate or dead. A dead co-op player respawns
//! by spending a shared life. PvP players simply respawn after a delay.

use crate::config::SimConfig;
use crate::events::{EventBus, GameEvent};
use crate::math::{Fixed, Vec2Fixed};
use crate::state::{EntityId, GameState, Mode, PlayerIntent};

/// Run the lives rules for the match mode, then tick down invulnerability.
pub fn lives_system(
    state: &mut GameState,
    intents: &[PlayerIntent],
    config: &SimConfig,
    events: &mut EventBus,
) {
    match state.match_state.mode {
        Mode::Coop => coop_lives(state, intents, config, events),
        Mode::Pvp => pvp_respawns(state, config, events),
    }

    for player in &mut state.players {
        if player.invuln_timer > 0 {
            player.invuln_timer -= 1;
        }
    }
}

fn coop_lives(
    state: &mut GameState,
    intents: &[PlayerIntent],
    config: &SimConfig,
    events: &mut EventBus,
) {
    for i in 0..state.players.len() {
        if state.players[i].downed {
            update_downed(state, i, intents, config, events);
            continue;
        }
        if !state.players[i].alive && state.match_state.shared_lives > 0 {
            state.match_state.shared_lives -= 1;
            respawn_player(state, i, config, events);
        }
    }
}

/// Bleed-out countdown and revive progress for one downed player.
fn update_downed(
    state: &mut GameState,
    slot: usize,
    intents: &[PlayerIntent],
    config: &SimConfig,
    events: &mut EventBus,
) {
    let player = &mut state.players[slot];
    player.downed_timer -= 1;
    if player.downed_timer <= 0 {
        player.downed = false;
        player.alive = false;
        events.emit(GameEvent::PlayerBledOut {
            player_id: player.id,
        });
        tracing::debug!(player = player.id, "Player bled out");
        if state.match_state.shared_lives > 0 {
            state.match_state.shared_lives -= 1;
            respawn_player(state, slot, config, events);
        }
        return;
    }

    let target_id = player.id;
    let target_pos = player.pos;
    let held_by = player.reviver_id;
    let radius = Fixed::from_num(config.revive_radius);
    let radius_sq = radius * radius;

    // The first teammate to start a revive keeps it until they let go.
    let reviver: Option<EntityId> = state
        .players
        .iter()
        .enumerate()
        .filter(|&(r, p)| r != slot && p.alive && !p.downed)
        .filter(|&(r, _)| intents.get(r).is_some_and(|intent| intent.revive))
        .filter(|(_, p)| p.pos.distance_squared(target_pos) <= radius_sq)
        .map(|(_, p)| p.id)
        .find(|&id| held_by.map_or(true, |held| held == id));

    let player = &mut state.players[slot];
    let Some(reviver_id) = reviver else {
        if player.reviver_id.take().is_some() {
            player.revive_progress = 0;
            events.emit(GameEvent::ReviveCancelled { target_id });
        }
        return;
    };

    if player.reviver_id.is_none() {
        player.reviver_id = Some(reviver_id);
        events.emit(GameEvent::ReviveStart {
            target_id,
            reviver_id,
        });
    }
    player.revive_progress += 1;

    if player.revive_progress >= config.revive_hold_time {
        player.downed = false;
        player.alive = true;
        player.hp = config.player_hp;
        player.downed_timer = 0;
        player.revive_progress = 0;
        player.reviver_id = None;
        player.invuln_timer = config.spawn_invuln_duration;
        events.emit(GameEvent::ReviveComplete {
            target_id,
            reviver_id,
        });
        tracing::debug!(player = target_id, reviver = reviver_id, "Revive complete");
    }
}

fn pvp_respawns(state: &mut GameState, config: &SimConfig, events: &mut EventBus) {
    for i in 0..state.players.len() {
        let player = &mut state.players[i];
        if player.alive {
            continue;
        }
        if player.respawn_timer > 0 {
            player.respawn_timer -= 1;
        } else {
            respawn_player(state, i, config, events);
        }
    }
}

/// Bring a player back at the spawn point farthest from every living
/// threat (other living players and active enemies). Ties keep the first
/// spawn point.
pub fn respawn_player(state: &mut GameState, slot: usize, config: &SimConfig, events: &mut EventBus) {
    let Some(self_id) = state.players.get(slot).map(|p| p.id) else {
        return;
    };

    let mut best: Option<(usize, Fixed)> = None;
    for (s, &point) in state.spawn_points.iter().enumerate() {
        let nearest_player = state
            .players
            .iter()
            .filter(|p| p.id != self_id && p.alive)
            .map(|p| p.pos.distance_squared(point));
        let nearest_enemy = state
            .enemies
            .iter()
            .filter(|e| e.active)
            .map(|e| e.pos.distance_squared(point));
        let threat = nearest_player.chain(nearest_enemy).min().unwrap_or(Fixed::MAX);
        if best.map_or(true, |(_, b)| threat > b) {
            best = Some((s, threat));
        }
    }
    let Some((spawn, _)) = best else {
        return;
    };
    let pos = state.spawn_points[spawn];

    let player = &mut state.players[slot];
    player.pos = pos;
    player.vel = Vec2Fixed::ZERO;
    player.hp = config.player_hp;
    player.alive = true;
    player.downed = false;
    player.downed_timer = 0;
    player.revive_progress = 0;
    player.reviver_id = None;
    player.respawn_timer = 0;
    player.invuln_timer = config.spawn_invuln_duration;
    player.fire_cooldown = 0;

    events.emit(GameEvent::PlayerRespawned {
        player_id: player.id,
        pos,
    });
    tracing::debug!(player = player.id, spawn, "Player respawned");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::open_state;

    fn down(state: &mut GameState, slot: usize) {
        let player = &mut state.players[slot];
        player.alive = false;
        player.downed = true;
        player.hp = 0;
        player.downed_timer = 480;
    }

    fn revive_intents(holding: bool) -> Vec<PlayerIntent> {
        vec![
            PlayerIntent::NEUTRAL,
            PlayerIntent {
                revive: holding,
                ..PlayerIntent::NEUTRAL
            },
        ]
    }

    fn run(state: &mut GameState, intents: &[PlayerIntent]) -> Vec<GameEvent> {
        let mut events = EventBus::new();
        lives_system(state, intents, &SimConfig::default(), &mut events);
        events.drain().to_vec()
    }

    #[test]
    fn test_revive_completes_after_hold_time() {
        let mut state = open_state(Mode::Coop, &[(400, 400), (430, 400)]);
        down(&mut state, 0);
        let intents = revive_intents(true);

        let first = run(&mut state, &intents);
        assert_eq!(first, vec![GameEvent::ReviveStart { target_id: 1, reviver_id: 2 }]);
        for _ in 1..89 {
            run(&mut state, &intents);
        }
        assert!(state.players[0].downed);
        assert_eq!(state.players[0].revive_progress, 89);

        let last = run(&mut state, &intents);
        assert_eq!(last, vec![GameEvent::ReviveComplete { target_id: 1, reviver_id: 2 }]);
        let player = &state.players[0];
        assert!(player.alive);
        assert!(!player.downed);
        assert_eq!(player.hp, 3);
        assert_eq!(player.invuln_timer, 89);
    }

    #[test]
    fn test_letting_go_cancels_revive() {
        let mut state = open_state(Mode::Coop, &[(400, 400), (430, 400)]);
        down(&mut state, 0);
        for _ in 0..40 {
            run(&mut state, &revive_intents(true));
        }
        let events = run(&mut state, &revive_intents(false));
        assert_eq!(events, vec![GameEvent::ReviveCancelled { target_id: 1 }]);
        assert_eq!(state.players[0].revive_progress, 0);
        assert!(state.players[0].reviver_id.is_none());
        assert!(state.players[0].downed);
    }

    #[test]
    fn test_reviver_out_of_range_does_nothing() {
        let mut state = open_state(Mode::Coop, &[(400, 400), (500, 400)]);
        down(&mut state, 0);
        let events = run(&mut state, &revive_intents(true));
        assert!(events.is_empty());
        assert_eq!(state.players[0].downed_timer, 479);
    }

    #[test]
    fn test_bleed_out_spends_a_life_and_respawns() {
        let mut state = open_state(Mode::Coop, &[(400, 400)]);
        down(&mut state, 0);
        state.players[0].downed_timer = 1;
        let lives = state.match_state.shared_lives;

        let events = run(&mut state, &[]);
        assert!(matches!(events[0], GameEvent::PlayerBledOut { player_id: 1 }));
        assert!(matches!(events[1], GameEvent::PlayerRespawned { player_id: 1, .. }));
        assert_eq!(state.match_state.shared_lives, lives - 1);
        let player = &state.players[0];
        assert!(player.alive);
        assert_eq!(player.hp, 3);
        assert_eq!(player.invuln_timer, 89);
    }

    #[test]
    fn test_bleed_out_without_lives_stays_dead() {
        let mut state = open_state(Mode::Coop, &[(400, 400)]);
        state.match_state.shared_lives = 0;
        down(&mut state, 0);
        state.players[0].downed_timer = 1;
        run(&mut state, &[]);
        assert!(!state.players[0].alive);
        assert!(!state.players[0].downed);
    }

    #[test]
    fn test_pvp_respawn_after_delay() {
        let mut state = open_state(Mode::Pvp, &[(400, 400), (120, 110)]);
        state.players[0].alive = false;
        state.players[0].respawn_timer = 30;
        for _ in 0..30 {
            run(&mut state, &[]);
            assert!(!state.players[0].alive);
        }
        let events = run(&mut state, &[]);
        assert!(state.players[0].alive);
        // Farthest spawn from the survivor near the top-left corner.
        assert_eq!(state.players[0].pos, Vec2Fixed::from_int(860, 620));
        assert!(matches!(events[..], [GameEvent::PlayerRespawned { player_id: 1, .. }]));
    }

    #[test]
    fn test_invulnerability_counts_down() {
        let mut state = open_state(Mode::Pvp, &[(400, 400)]);
        state.players[0].invuln_timer = 2;
        run(&mut state, &[]);
        run(&mut state, &[]);
        run(&mut state, &[]);
        assert_eq!(state.players[0].invuln_timer, 0);
    }
}
