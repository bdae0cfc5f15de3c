//! Runs one bot match to completion.
//!
//! Every slot is driven by [`BotBrain`]. Scripted joins are applied before
//! the tick they name, the drained events feed a [`MetricsCollector`], and
//! the whole input stream can be recorded as a [`Replay`].

use arena_core::behaviors::BehaviorRegistry;
use arena_core::bot::BotBrain;
use arena_core::defs::Catalogs;
use arena_core::math::ratio;
use arena_core::replay::{Replay, ReplayPlayer};
use arena_core::simulation::Simulation;
use tracing::{debug, info};

use crate::metrics::{MatchMetrics, MetricsCollector};
use crate::scenario::{Scenario, ScenarioError};

/// Configuration for one match.
#[derive(Debug, Clone)]
pub struct GameConfig {
    /// Match setup.
    pub scenario: Scenario,
    /// Match seed.
    pub seed: u32,
    /// Tick budget override.
    pub max_ticks: Option<u64>,
    /// Record every frame into a replay.
    pub record_replay: bool,
    /// Identifier used in metrics.
    pub game_id: String,
}

impl GameConfig {
    /// Config for `scenario` at `seed`.
    #[must_use]
    pub fn new(scenario: Scenario, seed: u32) -> Self {
        Self {
            game_id: format!("{}_{seed}", scenario.name),
            scenario,
            seed,
            max_ticks: None,
            record_replay: false,
        }
    }

    /// Also record a replay.
    #[must_use]
    pub fn with_replay(mut self) -> Self {
        self.record_replay = true;
        self
    }

    /// Override the tick budget.
    #[must_use]
    pub fn with_max_ticks(mut self, max_ticks: u64) -> Self {
        self.max_ticks = Some(max_ticks);
        self
    }
}

/// Result of one match.
#[derive(Debug, Clone)]
pub struct GameResult {
    /// Collected metrics.
    pub metrics: MatchMetrics,
    /// Recorded input stream, if requested.
    pub replay: Option<Replay>,
}

/// Build the simulation and bots for a scenario.
///
/// # Errors
///
/// Fails when the simulation rejects the scenario.
pub fn setup_match(scenario: &Scenario, seed: u32) -> Result<(Simulation, BotBrain), ScenarioError> {
    let sim = Simulation::new(
        scenario.settings(seed),
        Catalogs::builtin(),
        &BehaviorRegistry::builtin(),
        scenario.config.clone(),
    )?;
    let mut bots = BotBrain::new(seed);
    for slot in 0..scenario.players {
        if let Some(boldness) = scenario.boldness(slot) {
            bots.set_boldness(slot, boldness);
        }
    }
    Ok((sim, bots))
}

/// Play one match until game over or the tick budget runs out.
///
/// # Errors
///
/// Fails when the scenario cannot be set up or a scripted join does not fit.
pub fn run_game(config: GameConfig) -> Result<GameResult, ScenarioError> {
    let scenario = &config.scenario;
    scenario.validate()?;
    let max_ticks = config.max_ticks.unwrap_or(scenario.max_ticks);
    let (mut sim, mut bots) = setup_match(scenario, config.seed)?;

    let settings = scenario.settings(config.seed);
    let mut replay = config
        .record_replay
        .then(|| Replay::new(&settings, sim.config()));
    let mut collector = MetricsCollector::new(&config.game_id, &scenario.name, sim.state());
    let mut joins = scenario.joins.iter().peekable();

    debug!(game = %config.game_id, max_ticks, "Match starting");

    while !sim.is_game_over() && sim.current_tick() < max_ticks {
        let tick = sim.current_tick();
        let mut joined = 0;
        while let Some(join) = joins.next_if(|j| j.tick <= tick) {
            sim.add_player()?;
            if let Some(percent) = join.boldness_percent {
                bots.set_boldness(sim.state().players.len() - 1, ratio(percent, 100));
            }
            joined += 1;
        }

        let intents = bots.intents(sim.state());
        if let Some(replay) = replay.as_mut() {
            replay.record_frame(tick, joined, &intents);
        }
        sim.tick(&intents);
        let events = sim.drain_events().to_vec();
        collector.record(&events, sim.state());
    }

    let hash = sim.state_hash();
    if let Some(replay) = replay.as_mut() {
        replay.finalize(sim.current_tick(), hash);
    }
    let metrics = collector.finish(sim.state(), hash);

    info!(
        game = %metrics.game_id,
        ticks = metrics.duration_ticks,
        outcome = ?metrics.outcome,
        score = metrics.score,
        "Match finished"
    );

    Ok(GameResult { metrics, replay })
}

/// Replay a recording against the built-in catalogs and compare hashes.
///
/// # Errors
///
/// Fails when the recorded match cannot be recreated.
pub fn verify_replay(replay: Replay) -> Result<bool, ScenarioError> {
    let mut player = ReplayPlayer::new(replay)?;
    Ok(player.verify()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::MatchOutcome;
    use crate::scenario::ScriptedJoin;
    use arena_core::state::Mode;

    fn short(mut scenario: Scenario, ticks: u64) -> Scenario {
        scenario.max_ticks = ticks;
        scenario
    }

    #[test]
    fn test_runs_to_tick_budget() {
        let result = run_game(GameConfig::new(short(Scenario::coop_arena(), 300), 1)).unwrap();
        assert_eq!(result.metrics.duration_ticks, 300);
        assert_eq!(result.metrics.outcome, MatchOutcome::TickBudget);
        assert!(result.replay.is_none());
        assert!(result.metrics.enemies_spawned > 0);
    }

    #[test]
    fn test_pvp_ends_at_match_duration() {
        let mut scenario = Scenario::pvp_duel();
        scenario.config.pvp_match_duration = 600;
        scenario.max_ticks = 5000;
        let result = run_game(GameConfig::new(scenario, 2)).unwrap();
        assert_eq!(result.metrics.outcome, MatchOutcome::TimeUp);
        assert_eq!(result.metrics.duration_ticks, 601);
        assert_eq!(result.metrics.mode, Mode::Pvp);
    }

    #[test]
    fn test_scripted_join_adds_slot() {
        let mut scenario = short(Scenario::coop_arena(), 200);
        scenario.joins = vec![ScriptedJoin {
            tick: 100,
            boldness_percent: Some(80),
        }];
        let result = run_game(GameConfig::new(scenario, 3)).unwrap();
        assert_eq!(result.metrics.players.len(), 3);
        assert_eq!(result.metrics.players[2].joined_tick, 100);
    }

    #[test]
    fn test_same_seed_same_hash() {
        let run = || {
            run_game(GameConfig::new(short(Scenario::pvp_brawl(), 600), 11))
                .unwrap()
                .metrics
                .final_state_hash
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_recorded_replay_verifies() {
        let mut scenario = short(Scenario::coop_arena(), 400);
        scenario.joins[0].tick = 150;
        let result = run_game(GameConfig::new(scenario, 21).with_replay()).unwrap();
        let replay = result.replay.unwrap();
        assert_eq!(replay.final_tick, 400);
        assert_eq!(replay.final_hash, result.metrics.final_state_hash);
        assert!(verify_replay(replay).unwrap());
    }

    #[test]
    fn test_max_ticks_override() {
        let config = GameConfig::new(Scenario::pvp_duel(), 4).with_max_ticks(90);
        let result = run_game(config).unwrap();
        assert_eq!(result.metrics.duration_ticks, 90);
    }
}
