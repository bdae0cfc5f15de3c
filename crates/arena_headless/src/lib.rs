//! Headless match runner for AI testing and CI verification.
//!
//! This crate runs arena matches without graphics. It can:
//!
//! - **Play bot matches**: every slot driven by the bot AI, with metrics
//! - **Run batches**: many seeds in parallel for balance testing
//! - **Verify replays**: check that a recording reproduces its final hash
//! - **Serve a controller**: JSON commands on stdin, state on stdout
//!
//! # Protocol
//!
//! Communication uses JSON lines (one JSON object per line):
//!
//! - **stdin**: Commands from controller (tick, intent, join, ...)
//! - **stdout**: State updates and responses (JSON)
//! - **stderr**: Logs (human-readable)
//!
//! See the [`protocol`] module for every command and response.
//!
//! # Example
//!
//! ```bash
//! # Run interactively
//! echo '{"cmd":"tick","count":60}' | cargo run -p arena_headless -- run
//!
//! # Play one bot match and keep the replay
//! cargo run -p arena_headless -- play --scenario pvp_duel --replay duel.replay
//!
//! # Verify the replay
//! cargo run -p arena_headless -- replay --file duel.replay --verify
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod batch;
pub mod game_runner;
pub mod metrics;
pub mod protocol;
pub mod runner;
pub mod scenario;

pub use batch::{run_batch, BatchConfig, BatchResults};
pub use game_runner::{run_game, verify_replay, GameConfig, GameResult};
pub use metrics::{BatchSummary, MatchMetrics, MatchOutcome, MetricsCollector};
pub use protocol::{Command, Response};
pub use runner::{HeadlessConfig, HeadlessRunner};
pub use scenario::{Scenario, ScenarioError};
