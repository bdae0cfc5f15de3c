//! Match metrics collection for balance analysis.
//!
//! [`MetricsCollector`] watches the drained event stream of one match and
//! folds it into a [`MatchMetrics`] record; [`BatchSummary`] aggregates
//! many records.

use std::collections::HashMap;

use arena_core::events::GameEvent;
use arena_core::state::{EntityId, GameState, Mode};
use serde::{Deserialize, Serialize};

/// How a match stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchOutcome {
    /// Co-op team ran out of lives.
    TeamWiped,
    /// PvP clock ran out.
    TimeUp,
    /// The runner's tick budget ran out first.
    #[default]
    TickBudget,
}

/// Complete metrics for a single match.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchMetrics {
    /// Unique match identifier.
    pub game_id: String,
    /// Scenario name.
    pub scenario: String,
    /// Match rules.
    pub mode: Mode,
    /// Map id.
    pub map: String,
    /// Seed used.
    pub seed: u32,
    /// Ticks simulated.
    pub duration_ticks: u64,
    /// How the match stopped.
    pub outcome: MatchOutcome,
    /// PvP slot with the most kills (None for co-op and ties).
    pub winner_slot: Option<usize>,
    /// Co-op score.
    pub score: i64,
    /// Co-op lives left at the end.
    pub shared_lives_left: i32,
    /// Enemies that entered the arena.
    pub enemies_spawned: u32,
    /// Enemies killed by players.
    pub enemies_killed: u32,
    /// Runtime tiles placed by enemies.
    pub tiles_created: u32,
    /// Tiles shot down.
    pub tiles_destroyed: u32,
    /// Tick of the first kill of any kind.
    pub first_kill_tick: Option<u64>,
    /// Per-slot metrics.
    pub players: Vec<PlayerMetrics>,
    /// Final simulation state hash (for determinism validation).
    pub final_state_hash: u64,
}

impl MatchMetrics {
    /// Total PvP kills across all players.
    #[must_use]
    pub fn total_kills(&self) -> u32 {
        self.players.iter().map(|p| p.kills).sum()
    }
}

/// Metrics for one player slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerMetrics {
    /// Lobby slot.
    pub slot: usize,
    /// Tick the player entered (0 for starting players).
    pub joined_tick: u64,
    /// Bullets fired.
    pub shots_fired: u32,
    /// Bullets that hit an enemy or another player.
    pub shots_hit: u32,
    /// Enemies this player killed.
    pub enemy_kills: u32,
    /// PvP kills.
    pub kills: u32,
    /// PvP deaths.
    pub deaths: u32,
    /// Damage taken from bullets.
    pub damage_taken: i64,
    /// Times downed in co-op.
    pub times_downed: u32,
    /// Teammates revived.
    pub revives: u32,
    /// Times bled out.
    pub bleed_outs: u32,
}

/// Folds events into [`MatchMetrics`].
#[derive(Debug, Clone)]
pub struct MetricsCollector {
    metrics: MatchMetrics,
    bullet_owners: HashMap<EntityId, EntityId>,
}

impl MetricsCollector {
    /// Start collecting for a match whose initial state is `state`.
    #[must_use]
    pub fn new(game_id: impl Into<String>, scenario: impl Into<String>, state: &GameState) -> Self {
        let players = state
            .players
            .iter()
            .map(|p| PlayerMetrics {
                slot: p.slot,
                ..PlayerMetrics::default()
            })
            .collect();
        Self {
            metrics: MatchMetrics {
                game_id: game_id.into(),
                scenario: scenario.into(),
                mode: state.match_state.mode,
                map: state.match_state.map_id.clone(),
                seed: state.match_state.rng_seed,
                players,
                ..MatchMetrics::default()
            },
            bullet_owners: HashMap::new(),
        }
    }

    /// Metrics gathered so far.
    #[must_use]
    pub const fn metrics(&self) -> &MatchMetrics {
        &self.metrics
    }

    fn player_mut(&mut self, state: &GameState, id: EntityId) -> Option<&mut PlayerMetrics> {
        let slot = state.players.iter().position(|p| p.id == id)?;
        self.metrics.players.get_mut(slot)
    }

    fn credit_hit(&mut self, state: &GameState, bullet_id: EntityId) {
        let Some(&owner) = self.bullet_owners.get(&bullet_id) else {
            return;
        };
        if let Some(player) = self.player_mut(state, owner) {
            player.shots_hit += 1;
        }
    }

    /// Fold the events of the tick that just ran. `state` is the state
    /// after that tick.
    pub fn record(&mut self, events: &[GameEvent], state: &GameState) {
        let tick = state.match_state.tick.saturating_sub(1);
        for event in events {
            match *event {
                GameEvent::BulletFired {
                    bullet_id,
                    owner_id,
                    ..
                } => {
                    if let Some(player) = self.player_mut(state, owner_id) {
                        player.shots_fired += 1;
                        self.bullet_owners.insert(bullet_id, owner_id);
                    }
                }
                GameEvent::HitPlayer {
                    bullet_id,
                    player_id,
                    damage,
                } => {
                    self.credit_hit(state, bullet_id);
                    if let Some(player) = self.player_mut(state, player_id) {
                        player.damage_taken += i64::from(damage);
                    }
                }
                GameEvent::HitEnemy { bullet_id, .. } => self.credit_hit(state, bullet_id),
                GameEvent::EnemyKilled {
                    killer_owner_id, ..
                } => {
                    self.metrics.enemies_killed += 1;
                    self.metrics.first_kill_tick.get_or_insert(tick);
                    if let Some(player) = self.player_mut(state, killer_owner_id) {
                        player.enemy_kills += 1;
                    }
                }
                GameEvent::EnemySpawned { .. } => self.metrics.enemies_spawned += 1,
                GameEvent::TileCreated { .. } => self.metrics.tiles_created += 1,
                GameEvent::TileDestroyed { .. } => self.metrics.tiles_destroyed += 1,
                GameEvent::PlayerDowned { player_id, .. } => {
                    if let Some(player) = self.player_mut(state, player_id) {
                        player.times_downed += 1;
                    }
                }
                GameEvent::ReviveComplete { reviver_id, .. } => {
                    if let Some(player) = self.player_mut(state, reviver_id) {
                        player.revives += 1;
                    }
                }
                GameEvent::PlayerBledOut { player_id } => {
                    if let Some(player) = self.player_mut(state, player_id) {
                        player.bleed_outs += 1;
                    }
                }
                GameEvent::PlayerJoined { slot, .. } => {
                    while self.metrics.players.len() <= slot {
                        let next = self.metrics.players.len();
                        self.metrics.players.push(PlayerMetrics {
                            slot: next,
                            joined_tick: tick,
                            ..PlayerMetrics::default()
                        });
                    }
                }
                _ => {}
            }
        }

        if self.metrics.first_kill_tick.is_none()
            && state.players.iter().any(|p| p.kills > 0)
        {
            self.metrics.first_kill_tick = Some(tick);
        }
        self.bullet_owners
            .retain(|id, _| state.bullets.iter().any(|b| b.active && b.id == *id));
    }

    /// Close the record with the final state.
    #[must_use]
    pub fn finish(mut self, state: &GameState, state_hash: u64) -> MatchMetrics {
        let match_state = &state.match_state;
        self.metrics.duration_ticks = match_state.tick;
        self.metrics.score = match_state.score;
        self.metrics.shared_lives_left = match_state.shared_lives;
        self.metrics.final_state_hash = state_hash;
        self.metrics.outcome = match (match_state.game_over, match_state.mode) {
            (true, Mode::Coop) => MatchOutcome::TeamWiped,
            (true, Mode::Pvp) => MatchOutcome::TimeUp,
            (false, _) => MatchOutcome::TickBudget,
        };

        for (metrics, player) in self.metrics.players.iter_mut().zip(&state.players) {
            metrics.kills = player.kills;
            metrics.deaths = player.deaths;
        }

        if match_state.mode == Mode::Pvp {
            let best = self.metrics.players.iter().map(|p| p.kills).max().unwrap_or(0);
            let mut leaders = self.metrics.players.iter().filter(|p| p.kills == best);
            self.metrics.winner_slot = match (leaders.next(), leaders.next()) {
                (Some(leader), None) if best > 0 => Some(leader.slot),
                _ => None,
            };
        }
        self.metrics
    }
}

/// Summary statistics across many matches.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Matches played.
    pub total_games: u32,
    /// Matches by outcome.
    pub outcomes: HashMap<MatchOutcome, u32>,
    /// PvP wins by slot.
    pub wins_by_slot: HashMap<usize, u32>,
    /// PvP matches without a single leader.
    pub draws: u32,
    /// Average match length in ticks.
    pub avg_duration_ticks: f64,
    /// Shortest match.
    pub min_duration_ticks: u64,
    /// Longest match.
    pub max_duration_ticks: u64,
    /// Average co-op score.
    pub avg_score: f64,
    /// Average enemies killed per match.
    pub avg_enemies_killed: f64,
    /// Average PvP kills per match.
    pub avg_kills: f64,
    /// Bullet accuracy over all players and matches.
    pub accuracy: f64,
    /// Average revives per co-op match.
    pub avg_revives: f64,
}

impl BatchSummary {
    /// Calculate summary from a list of match metrics.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_games(games: &[MatchMetrics]) -> Self {
        if games.is_empty() {
            return Self::default();
        }
        let count = games.len() as f64;
        let mut summary = Self {
            total_games: u32::try_from(games.len()).unwrap_or(u32::MAX),
            min_duration_ticks: u64::MAX,
            ..Self::default()
        };

        let mut duration_sum = 0u64;
        let mut score_sum = 0i64;
        let mut enemy_kill_sum = 0u64;
        let mut kill_sum = 0u64;
        let mut revive_sum = 0u64;
        let mut coop_games = 0u32;
        let (mut fired, mut hit) = (0u64, 0u64);

        for game in games {
            *summary.outcomes.entry(game.outcome).or_default() += 1;
            duration_sum += game.duration_ticks;
            summary.min_duration_ticks = summary.min_duration_ticks.min(game.duration_ticks);
            summary.max_duration_ticks = summary.max_duration_ticks.max(game.duration_ticks);
            enemy_kill_sum += u64::from(game.enemies_killed);

            match game.mode {
                Mode::Coop => {
                    coop_games += 1;
                    score_sum += game.score;
                    revive_sum += game.players.iter().map(|p| u64::from(p.revives)).sum::<u64>();
                }
                Mode::Pvp => {
                    kill_sum += u64::from(game.total_kills());
                    match game.winner_slot {
                        Some(slot) => *summary.wins_by_slot.entry(slot).or_default() += 1,
                        None => summary.draws += 1,
                    }
                }
            }
            for player in &game.players {
                fired += u64::from(player.shots_fired);
                hit += u64::from(player.shots_hit);
            }
        }

        summary.avg_duration_ticks = duration_sum as f64 / count;
        summary.avg_enemies_killed = enemy_kill_sum as f64 / count;
        summary.avg_kills = kill_sum as f64 / count;
        if coop_games > 0 {
            summary.avg_score = score_sum as f64 / f64::from(coop_games);
            summary.avg_revives = revive_sum as f64 / f64::from(coop_games);
        }
        if fired > 0 {
            summary.accuracy = hit as f64 / fired as f64;
        }
        summary
    }
}
