//! Headless arena match runner.
//!
//! This binary runs matches without graphics: bot matches, balance batches,
//! replay verification, benchmarks, or an interactive JSON session.
//!
//! # Usage
//!
//! ```bash
//! # Interactive mode - read commands from stdin
//! cargo run -p arena_headless -- run --scenario coop_arena
//!
//! # Play one bot match
//! cargo run -p arena_headless -- play --scenario pvp_duel --seed 7
//!
//! # Run batch balance test
//! cargo run -p arena_headless -- batch --scenario coop_arena --count 200 --output results/
//!
//! # Verify determinism
//! cargo run -p arena_headless -- verify --scenario pvp_brawl --runs 5
//! ```
//!
//! Logs go to stderr and honor `RUST_LOG`.

use std::path::PathBuf;
use std::process;
use std::time::Instant;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use arena_core::replay::{Replay, ReplayPlayer};
use arena_headless::{
    batch::{run_batch, verify_determinism, BatchConfig},
    game_runner::{run_game, setup_match, GameConfig},
    runner::{HeadlessConfig, HeadlessRunner},
    scenario::{Scenario, ScenarioError},
};

#[derive(Parser)]
#[command(name = "arena_headless")]
#[command(about = "Headless arena match runner for AI testing and CI")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve an interactive JSON session on stdin/stdout
    Run {
        /// Scenario name or RON file
        #[arg(short, long)]
        scenario: Option<String>,

        /// Match seed
        #[arg(long, default_value = "0")]
        seed: u32,

        /// Output state after every tick command
        #[arg(long)]
        auto_state: bool,
    },

    /// Play one bot match and print its metrics as JSON
    Play {
        /// Scenario name or RON file
        #[arg(short, long, default_value = "coop_arena")]
        scenario: String,

        /// Match seed
        #[arg(long, default_value = "0")]
        seed: u32,

        /// Tick budget override
        #[arg(long)]
        max_ticks: Option<u64>,

        /// Save the match replay here
        #[arg(long)]
        replay: Option<PathBuf>,
    },

    /// Run a batch of bot matches for balance testing
    Batch {
        /// Scenario name or RON file
        #[arg(short, long, default_value = "coop_arena")]
        scenario: String,

        /// Number of matches to run
        #[arg(short, long, default_value = "100")]
        count: u32,

        /// Maximum parallel matches (0 = auto)
        #[arg(short, long, default_value = "0")]
        parallel: u32,

        /// Output directory for results
        #[arg(short, long, default_value = "results")]
        output: PathBuf,

        /// Starting seed
        #[arg(long, default_value = "0")]
        seed: u32,

        /// Tick budget override
        #[arg(long)]
        max_ticks: Option<u64>,

        /// Save one replay per match
        #[arg(long)]
        replays: bool,
    },

    /// Verify determinism by running the same seed multiple times
    Verify {
        /// Scenario name or RON file
        #[arg(short, long, default_value = "pvp_brawl")]
        scenario: String,

        /// Seed to verify
        #[arg(long, default_value = "12345")]
        seed: u32,

        /// Number of verification runs
        #[arg(short, long, default_value = "5")]
        runs: u32,

        /// Tick budget override
        #[arg(long)]
        max_ticks: Option<u64>,
    },

    /// Play back or verify a recorded match
    Replay {
        /// Replay file path
        #[arg(short, long)]
        file: PathBuf,

        /// Verify replay produces identical hash
        #[arg(long)]
        verify: bool,
    },

    /// Run N bot-driven ticks for benchmarking
    Benchmark {
        /// Number of ticks to run
        #[arg(short, long, default_value = "36000")]
        ticks: u64,

        /// Scenario name or RON file
        #[arg(short, long, default_value = "coop_labyrinth")]
        scenario: String,
    },
}

fn main() {
    let cli = Cli::parse();

    // Logs go to stderr; stdout is for the protocol and JSON output
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(filter)
        .init();

    let result = match cli.command {
        Some(Commands::Run {
            scenario,
            seed,
            auto_state,
        }) => cmd_run(scenario, seed, auto_state),
        Some(Commands::Play {
            scenario,
            seed,
            max_ticks,
            replay,
        }) => cmd_play(&scenario, seed, max_ticks, replay),
        Some(Commands::Batch {
            scenario,
            count,
            parallel,
            output,
            seed,
            max_ticks,
            replays,
        }) => cmd_batch(BatchConfig {
            scenario,
            game_count: count,
            parallel_games: parallel,
            output_dir: output,
            seed_start: seed,
            max_ticks,
            save_replays: replays,
        }),
        Some(Commands::Verify {
            scenario,
            seed,
            runs,
            max_ticks,
        }) => cmd_verify(&scenario, seed, runs, max_ticks),
        Some(Commands::Replay { file, verify }) => cmd_replay(file, verify),
        Some(Commands::Benchmark { ticks, scenario }) => cmd_benchmark(ticks, &scenario),
        None => cmd_run(None, 0, false),
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "Command failed");
        process::exit(1);
    }
}

/// Serve an interactive session
fn cmd_run(scenario: Option<String>, seed: u32, auto_state: bool) -> Result<(), ScenarioError> {
    tracing::info!("Starting interactive session");
    let runner = HeadlessRunner::with_config(HeadlessConfig {
        auto_state_output: auto_state,
        scenario,
        seed,
    })?;
    runner.run()?;
    Ok(())
}

/// Play one match
fn cmd_play(
    scenario: &str,
    seed: u32,
    max_ticks: Option<u64>,
    replay_path: Option<PathBuf>,
) -> Result<(), ScenarioError> {
    let scenario = Scenario::resolve(scenario)?;
    let mut config = GameConfig::new(scenario, seed);
    config.max_ticks = max_ticks;
    config.record_replay = replay_path.is_some();

    let result = run_game(config)?;
    println!("{}", serde_json::to_string_pretty(&result.metrics)?);

    if let (Some(path), Some(replay)) = (replay_path, &result.replay) {
        replay.save(&path)?;
        eprintln!("Replay saved to: {}", path.display());
    }
    Ok(())
}

/// Run batch of matches for balance testing
fn cmd_batch(config: BatchConfig) -> Result<(), ScenarioError> {
    std::fs::create_dir_all(&config.output_dir)?;
    let output = config.output_dir.clone();

    let results = run_batch(config)?;
    let results_path = output.join("batch_results.json");
    results.save(&results_path)?;

    let summary = &results.summary;
    eprintln!("\n{}", "=".repeat(50));
    eprintln!("BATCH COMPLETE");
    eprintln!("{}", "=".repeat(50));
    eprintln!("Matches played: {}", results.games.len());
    if !results.errors.is_empty() {
        eprintln!("Matches FAILED: {}", results.errors.len());
    }
    eprintln!("Duration: {:.1}s", results.duration_seconds);
    eprintln!("Average length: {:.0} ticks", summary.avg_duration_ticks);
    eprintln!("Average score: {:.1}", summary.avg_score);
    eprintln!("Average enemies killed: {:.1}", summary.avg_enemies_killed);
    eprintln!("Accuracy: {:.1}%", summary.accuracy * 100.0);
    if !summary.wins_by_slot.is_empty() {
        eprintln!("\nWins by slot:");
        let mut wins: Vec<_> = summary.wins_by_slot.iter().collect();
        wins.sort();
        for (slot, count) in wins {
            eprintln!("  slot {slot}: {count}");
        }
        eprintln!("  draws: {}", summary.draws);
    }

    for error in results.errors.iter().take(10) {
        eprintln!(
            "  Match {} (seed {}): {}",
            error.game_index, error.seed, error.message
        );
    }
    eprintln!("\nResults saved to: {}", results_path.display());
    Ok(())
}

/// Verify determinism
fn cmd_verify(
    scenario: &str,
    seed: u32,
    runs: u32,
    max_ticks: Option<u64>,
) -> Result<(), ScenarioError> {
    let scenario = Scenario::resolve(scenario)?;
    tracing::info!(scenario = %scenario.name, seed, runs, "Verifying determinism");

    if verify_determinism(&scenario, seed, runs, max_ticks)? {
        eprintln!("PASS: All {runs} runs produced identical results");
        Ok(())
    } else {
        eprintln!("FAIL: Non-determinism detected!");
        process::exit(1);
    }
}

/// Play back or verify a recorded match
fn cmd_replay(file: PathBuf, verify: bool) -> Result<(), ScenarioError> {
    let replay = Replay::load(&file)?;

    eprintln!("Loaded replay:");
    eprintln!("  Map: {} ({:?})", replay.map_id, replay.mode);
    eprintln!("  Seed: {}", replay.seed);
    eprintln!("  Players: {}", replay.initial_players);
    eprintln!("  Duration: {} ticks", replay.duration());

    let mut player = ReplayPlayer::new(replay)?;

    if verify {
        let expected = player.replay().final_hash;
        let ok = player.verify()?;
        let actual = player.simulation().state_hash();
        eprintln!("  Expected hash: {expected:016x}");
        eprintln!("  Actual hash:   {actual:016x}");
        if ok {
            eprintln!("PASS: Replay verification successful");
            return Ok(());
        }
        eprintln!("FAIL: Replay produced different hash!");
        process::exit(1);
    }

    let mut last_decile = 0;
    while player.advance()? {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let decile = (player.progress_percent() / 10.0) as u32;
        if decile > last_decile {
            eprintln!("Progress: {}%", decile * 10);
            last_decile = decile;
        }
    }

    let state = player.simulation().state();
    eprintln!("Replay complete at tick {}", player.current_tick());
    eprintln!("Final state hash: {:016x}", player.simulation().state_hash());
    eprintln!("Score: {}", state.match_state.score);
    for p in &state.players {
        eprintln!("  slot {}: kills {} deaths {}", p.slot, p.kills, p.deaths);
    }
    Ok(())
}

/// Run benchmark
#[allow(clippy::cast_precision_loss)]
fn cmd_benchmark(ticks: u64, scenario: &str) -> Result<(), ScenarioError> {
    let scenario = Scenario::resolve(scenario)?;
    tracing::info!(ticks, scenario = %scenario.name, "Running benchmark");
    let (mut sim, mut bots) = setup_match(&scenario, 1)?;

    // Warmup
    for _ in 0..100 {
        let intents = bots.intents(sim.state());
        sim.tick(&intents);
        sim.drain_events();
    }

    let start = Instant::now();
    let mut ran = 0u64;
    for _ in 0..ticks {
        if sim.is_game_over() {
            break;
        }
        let intents = bots.intents(sim.state());
        sim.tick(&intents);
        sim.drain_events();
        ran += 1;
    }
    let elapsed = start.elapsed();

    let active_enemies = sim.state().enemies.iter().filter(|e| e.active).count();
    eprintln!("\n{}", "=".repeat(50));
    eprintln!("BENCHMARK RESULTS");
    eprintln!("{}", "=".repeat(50));
    eprintln!("Ticks: {ran}");
    eprintln!("Duration: {:.3}s", elapsed.as_secs_f64());
    eprintln!("Ticks/second: {:.1}", ran as f64 / elapsed.as_secs_f64().max(1e-9));
    eprintln!(
        "ms/tick: {:.4}",
        elapsed.as_secs_f64() * 1000.0 / ran.max(1) as f64
    );
    eprintln!("Active enemies: {active_enemies}");
    eprintln!("State hash: {:016x}", sim.state_hash());
    Ok(())
}
