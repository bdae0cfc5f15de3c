//! The metrics collector against hand-placed fixture matches.

use arena_core::prelude::*;
use arena_headless::metrics::{MatchOutcome, MetricsCollector};
use arena_test_utils::fixtures::{open_match, place_player};

fn shoot() -> PlayerIntent {
    PlayerIntent {
        shoot: true,
        ..PlayerIntent::NEUTRAL
    }
}

#[test]
fn pvp_hit_is_credited_to_shooter_and_victim() {
    let mut sim = open_match(Mode::Pvp, 2, 8).unwrap();
    place_player(&mut sim, 0, 200, 360);
    place_player(&mut sim, 1, 400, 360);
    sim.drain_events();
    let mut collector = MetricsCollector::new("fixture", "open_duel", sim.state());

    for tick in 0..40 {
        let intents = if tick == 0 {
            vec![shoot(), PlayerIntent::NEUTRAL]
        } else {
            vec![PlayerIntent::NEUTRAL; 2]
        };
        sim.tick(&intents);
        let events = sim.drain_events().to_vec();
        collector.record(&events, sim.state());
    }

    let metrics = collector.finish(sim.state(), sim.state_hash());
    assert_eq!(metrics.players[0].shots_fired, 1);
    assert_eq!(metrics.players[0].shots_hit, 1);
    assert_eq!(metrics.players[1].damage_taken, 1);
    assert_eq!(metrics.players[1].shots_fired, 0);
    assert_eq!(metrics.duration_ticks, 40);
    assert_eq!(metrics.outcome, MatchOutcome::TickBudget);
    assert_eq!(metrics.final_state_hash, sim.state_hash());
}

#[test]
fn joined_players_get_their_own_record() {
    let mut sim = open_match(Mode::Coop, 1, 8).unwrap();
    let mut collector = MetricsCollector::new("fixture", "open_coop", sim.state());

    for tick in 0..20u64 {
        if tick == 12 {
            sim.add_player().unwrap();
        }
        let players = sim.state().players.len();
        sim.tick(&vec![PlayerIntent::NEUTRAL; players]);
        let events = sim.drain_events().to_vec();
        collector.record(&events, sim.state());
    }

    let metrics = collector.metrics();
    assert_eq!(metrics.players.len(), 2);
    assert_eq!(metrics.players[0].joined_tick, 0);
    assert_eq!(metrics.players[1].slot, 1);
    assert_eq!(metrics.players[1].joined_tick, 12);
}
