//! Batch match runner for balance testing.
//!
//! Runs many bot matches in parallel using rayon, one match per task, to
//! collect balance metrics across seeds efficiently.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::game_runner::{run_game, GameConfig};
use crate::metrics::{BatchSummary, MatchMetrics};
use crate::scenario::{Scenario, ScenarioError};

/// Configuration for a batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Built-in scenario name or RON path
    pub scenario: String,
    /// Number of matches to run
    pub game_count: u32,
    /// Maximum parallel matches (0 = use rayon default)
    pub parallel_games: u32,
    /// Output directory for results
    pub output_dir: PathBuf,
    /// Starting seed; match `i` uses `seed_start + i`
    pub seed_start: u32,
    /// Tick budget override
    pub max_ticks: Option<u64>,
    /// Write one replay per match under `output_dir/replays`
    pub save_replays: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            scenario: "coop_arena".to_string(),
            game_count: 100,
            parallel_games: 0,
            output_dir: PathBuf::from("results"),
            seed_start: 0,
            max_ticks: None,
            save_replays: false,
        }
    }
}

impl BatchConfig {
    /// Create config for a specific scenario
    #[must_use]
    pub fn new(scenario: &str, game_count: u32) -> Self {
        Self {
            scenario: scenario.to_string(),
            game_count,
            ..Default::default()
        }
    }

    /// Set output directory
    #[must_use]
    pub fn with_output(mut self, dir: PathBuf) -> Self {
        self.output_dir = dir;
        self
    }

    /// Set seed start
    #[must_use]
    pub fn with_seed(mut self, seed: u32) -> Self {
        self.seed_start = seed;
        self
    }

    /// Set the tick budget
    #[must_use]
    pub fn with_max_ticks(mut self, max_ticks: u64) -> Self {
        self.max_ticks = Some(max_ticks);
        self
    }
}

/// Results from a batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResults {
    /// Configuration used
    pub config: BatchConfig,
    /// Individual match metrics, in seed order
    pub games: Vec<MatchMetrics>,
    /// Aggregate summary
    pub summary: BatchSummary,
    /// Total runtime
    pub duration_seconds: f64,
    /// Errors encountered
    pub errors: Vec<BatchError>,
}

impl BatchResults {
    /// Save results to JSON file
    pub fn save(&self, path: &Path) -> Result<(), ScenarioError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load results from JSON file
    pub fn load(path: &Path) -> Result<Self, ScenarioError> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

/// Error during batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchError {
    /// Match index
    pub game_index: u32,
    /// Seed used
    pub seed: u32,
    /// Error message
    pub message: String,
}

/// Progress tracking for batch runs
#[derive(Debug)]
pub struct BatchProgress {
    /// Total matches
    pub total: u32,
    completed: AtomicU32,
    start_time: Instant,
}

impl BatchProgress {
    /// Create new progress tracker
    #[must_use]
    pub fn new(total: u32) -> Self {
        Self {
            total,
            completed: AtomicU32::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record a completed match and return the new count
    pub fn record_completion(&self) -> u32 {
        self.completed.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Get current completion count
    pub fn current(&self) -> u32 {
        self.completed.load(Ordering::Relaxed)
    }

    /// Get completion percentage
    #[must_use]
    pub fn percentage(&self) -> f64 {
        f64::from(self.current()) / f64::from(self.total.max(1)) * 100.0
    }

    /// Get estimated time remaining
    #[must_use]
    pub fn eta(&self) -> Duration {
        let completed = self.current();
        if completed == 0 {
            return Duration::from_secs(0);
        }
        let per_game = self.start_time.elapsed().as_secs_f64() / f64::from(completed);
        let remaining = self.total.saturating_sub(completed);
        Duration::from_secs_f64(per_game * f64::from(remaining))
    }
}

fn run_single_game(
    scenario: &Scenario,
    index: u32,
    seed: u32,
    config: &BatchConfig,
) -> Result<MatchMetrics, ScenarioError> {
    let mut game = GameConfig::new(scenario.clone(), seed);
    game.game_id = format!("game_{index}_{seed}");
    game.max_ticks = config.max_ticks;
    game.record_replay = config.save_replays;

    let result = run_game(game)?;
    if let Some(replay) = &result.replay {
        let path = config
            .output_dir
            .join("replays")
            .join(format!("{}.replay", result.metrics.game_id));
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        replay.save(&path)?;
    }
    Ok(result.metrics)
}

/// Run a batch of matches
///
/// # Errors
///
/// Fails only if the scenario cannot be resolved; per-match failures are
/// collected in [`BatchResults::errors`].
#[allow(clippy::cast_precision_loss)]
pub fn run_batch(config: BatchConfig) -> Result<BatchResults, ScenarioError> {
    let scenario = Scenario::resolve(&config.scenario)?;
    let start = Instant::now();
    let progress = BatchProgress::new(config.game_count);

    info!(
        scenario = %scenario.name,
        games = config.game_count,
        "Starting batch run"
    );

    if config.parallel_games > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(config.parallel_games as usize)
            .build_global()
            .ok(); // Ignore if already set
    }

    let results: Vec<Result<MatchMetrics, BatchError>> = (0..config.game_count)
        .into_par_iter()
        .map(|i| {
            let seed = config.seed_start.wrapping_add(i);
            match run_single_game(&scenario, i, seed, &config) {
                Ok(metrics) => {
                    let completed = progress.record_completion();
                    if completed % 10 == 0 {
                        debug!(
                            completed,
                            total = config.game_count,
                            percent = progress.percentage(),
                            eta_secs = progress.eta().as_secs(),
                            "Batch progress"
                        );
                    }
                    Ok(metrics)
                }
                Err(e) => {
                    warn!(game = i, seed, error = %e, "Match failed");
                    Err(BatchError {
                        game_index: i,
                        seed,
                        message: e.to_string(),
                    })
                }
            }
        })
        .collect();

    let (games, errors): (Vec<_>, Vec<_>) = results.into_iter().partition(Result::is_ok);
    let games: Vec<MatchMetrics> = games.into_iter().filter_map(Result::ok).collect();
    let errors: Vec<BatchError> = errors.into_iter().filter_map(Result::err).collect();

    let summary = BatchSummary::from_games(&games);
    let duration_seconds = start.elapsed().as_secs_f64();

    info!(
        "Batch complete: {} games in {:.1}s ({:.1} games/sec)",
        games.len(),
        duration_seconds,
        games.len() as f64 / duration_seconds.max(0.001)
    );

    Ok(BatchResults {
        config,
        games,
        summary,
        duration_seconds,
        errors,
    })
}

/// Run the same seed several times and check every run ends identically.
///
/// # Errors
///
/// Fails if the scenario cannot be played.
pub fn verify_determinism(
    scenario: &Scenario,
    seed: u32,
    runs: u32,
    max_ticks: Option<u64>,
) -> Result<bool, ScenarioError> {
    let mut first: Option<(u64, u64)> = None;
    for run in 0..runs {
        let mut config = GameConfig::new(scenario.clone(), seed);
        config.max_ticks = max_ticks;
        let metrics = run_game(config)?.metrics;
        let outcome = (metrics.duration_ticks, metrics.final_state_hash);
        match first {
            None => first = Some(outcome),
            Some(expected) if expected != outcome => {
                warn!(
                    run,
                    expected_hash = expected.1,
                    actual_hash = outcome.1,
                    "Run diverged"
                );
                return Ok(false);
            }
            Some(_) => {}
        }
    }
    Ok(true)
}
