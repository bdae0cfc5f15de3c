//! JSON protocol for headless match control.
//!
//! The interactive runner communicates via JSON lines (one JSON object per
//! line):
//!
//! **Input (stdin):** Commands from the controller
//! **Output (stdout):** State updates and responses
//!
//! # Protocol Flow
//!
//! 1. Runner starts, outputs `{"type":"ready",...}`
//! 2. Controller sends commands as JSON lines
//! 3. Every slot is bot-driven until the controller takes it over with
//!    `intent`; `release` hands it back
//! 4. When the match ends, the runner outputs `{"type":"game_over",...}`
//!
//! # Example Session
//!
//! ```text
//! <- {"type":"ready","version":"1.0","tick":0,"mode":"Coop","map":"arena","players":2}
//! -> {"cmd":"intent","slot":0,"move_x":1.0,"move_y":0.0,"shoot":true}
//! <- {"type":"ack","cmd":"intent"}
//! -> {"cmd":"tick","count":60}
//! <- {"type":"ticked","tick":60,"events":[...]}
//! -> {"cmd":"query"}
//! <- {"type":"state","tick":60,...}
//! ```

use arena_core::events::GameEvent;
use arena_core::math::Fixed;
use arena_core::state::GameState;
use serde::{Deserialize, Serialize};

use crate::metrics::MatchOutcome;

/// Protocol version reported in `ready`.
pub const PROTOCOL_VERSION: &str = "1.0";

// ============================================================================
// Input Commands (Controller -> Runner)
// ============================================================================

/// Commands that can be sent to the headless runner.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Command {
    /// Advance the match by N ticks (default: 1).
    Tick {
        /// Ticks to run.
        #[serde(default = "default_tick_count")]
        count: u32,
    },

    /// Query current match state without advancing time.
    Query,

    /// Drive a slot manually from now on.
    Intent {
        /// Player slot.
        slot: usize,
        /// Movement stick X.
        #[serde(default)]
        move_x: f64,
        /// Movement stick Y.
        #[serde(default)]
        move_y: f64,
        /// Aim X.
        #[serde(default = "default_aim_x")]
        aim_x: f64,
        /// Aim Y.
        #[serde(default)]
        aim_y: f64,
        /// Fire held.
        #[serde(default)]
        shoot: bool,
        /// Revive held.
        #[serde(default)]
        revive: bool,
    },

    /// Hand a slot back to its bot.
    Release {
        /// Player slot.
        slot: usize,
    },

    /// Add a bot-driven player to the match.
    Join,

    /// Place an enemy directly.
    Spawn {
        /// Enemy type id.
        kind: String,
        /// World X.
        x: f64,
        /// World Y.
        y: f64,
    },

    /// Report the current state hash (for determinism verification).
    Hash,

    /// Start over with a different scenario and seed.
    LoadScenario {
        /// Built-in scenario name or RON path.
        scenario: String,
        /// Match seed.
        #[serde(default)]
        seed: u32,
    },

    /// Quit the runner.
    Quit,
}

fn default_tick_count() -> u32 {
    1
}

fn default_aim_x() -> f64 {
    1.0
}

// ============================================================================
// Output Responses (Runner -> Controller)
// ============================================================================

/// Responses sent from the headless runner.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Runner is ready to accept commands.
    Ready {
        /// Protocol version.
        version: String,
        /// Current tick.
        tick: u64,
        /// Match rules.
        mode: String,
        /// Map id.
        map: String,
        /// Players in the lobby.
        players: usize,
    },

    /// Acknowledgment of a command.
    Ack {
        /// Command name.
        cmd: String,
    },

    /// Error processing a command.
    Error {
        /// What went wrong.
        message: String,
        /// Command name, when the line parsed.
        cmd: Option<String>,
    },

    /// Ticks ran; carries every event they produced.
    Ticked {
        /// Tick after the last one that ran.
        tick: u64,
        /// Drained events in emission order.
        events: Vec<GameEvent>,
    },

    /// Current match state.
    State(MatchView),

    /// A player joined.
    Joined {
        /// New slot.
        slot: usize,
        /// New player id.
        player_id: u32,
    },

    /// An enemy was placed.
    Spawned {
        /// Enemy id, or none when the pool was full.
        enemy_id: Option<u32>,
    },

    /// State hash for determinism verification.
    StateHash {
        /// Current tick.
        tick: u64,
        /// State hash.
        hash: u64,
    },

    /// The match has ended.
    GameOver {
        /// How it ended.
        outcome: MatchOutcome,
        /// Final tick.
        ticks: u64,
        /// Co-op score.
        score: i64,
        /// PvP kills by slot.
        kills: Vec<u32>,
    },

    /// Goodbye message before shutdown.
    Bye,
}

// ============================================================================
// State Types
// ============================================================================

/// JSON view of the match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchView {
    /// Current tick.
    pub tick: u64,
    /// Co-op score.
    pub score: i64,
    /// Co-op lives left.
    pub shared_lives: i32,
    /// Terminal flag.
    pub game_over: bool,
    /// Players by slot.
    pub players: Vec<PlayerView>,
    /// Active enemies.
    pub enemies: Vec<EnemyView>,
    /// Active bullets.
    pub bullets: usize,
    /// State hash.
    pub hash: u64,
}

/// JSON view of one player.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerView {
    /// Lobby slot.
    pub slot: usize,
    /// Entity id.
    pub id: u32,
    /// World X.
    pub x: f64,
    /// World Y.
    pub y: f64,
    /// Hit points.
    pub hp: i32,
    /// Alive and fighting.
    pub alive: bool,
    /// Co-op downed.
    pub downed: bool,
    /// Slot is driven by the controller.
    pub manual: bool,
    /// PvP kills.
    pub kills: u32,
    /// PvP deaths.
    pub deaths: u32,
}

/// JSON view of one enemy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnemyView {
    /// Entity id.
    pub id: u32,
    /// Enemy type id.
    pub kind: String,
    /// World X.
    pub x: f64,
    /// World Y.
    pub y: f64,
    /// Hit points.
    pub hp: i32,
    /// Still telegraphing.
    pub telegraphing: bool,
}

impl MatchView {
    /// Build a view of `state`. `kinds` maps enemy kind indices to ids and
    /// `manual[slot]` marks controller-driven slots.
    #[must_use]
    pub fn from_state(state: &GameState, kinds: &[String], manual: &[bool], hash: u64) -> Self {
        let to_f64 = |v: Fixed| v.to_num::<f64>();
        Self {
            tick: state.match_state.tick,
            score: state.match_state.score,
            shared_lives: state.match_state.shared_lives,
            game_over: state.match_state.game_over,
            players: state
                .players
                .iter()
                .map(|p| PlayerView {
                    slot: p.slot,
                    id: p.id,
                    x: to_f64(p.pos.x),
                    y: to_f64(p.pos.y),
                    hp: p.hp,
                    alive: p.alive,
                    downed: p.downed,
                    manual: manual.get(p.slot).copied().unwrap_or(false),
                    kills: p.kills,
                    deaths: p.deaths,
                })
                .collect(),
            enemies: state
                .enemies
                .iter()
                .filter(|e| e.active)
                .map(|e| EnemyView {
                    id: e.id,
                    kind: kinds.get(e.kind).cloned().unwrap_or_default(),
                    x: to_f64(e.pos.x),
                    y: to_f64(e.pos.y),
                    hp: e.hp,
                    telegraphing: e.spawn_timer > 0,
                })
                .collect(),
            bullets: state.bullets.iter().filter(|b| b.active).count(),
            hash,
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

impl Response {
    /// Create an acknowledgment.
    #[must_use]
    pub fn ack(cmd: &str) -> Self {
        Self::Ack {
            cmd: cmd.to_string(),
        }
    }

    /// Create an error response.
    pub fn error(message: impl Into<String>, cmd: Option<&str>) -> Self {
        Self::Error {
            message: message.into(),
            cmd: cmd.map(String::from),
        }
    }

    /// Serialize to JSON line (with newline).
    #[must_use]
    pub fn to_json_line(&self) -> String {
        let mut json = serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"type":"error","message":"Serialization failed: {e}"}}"#)
        });
        json.push('\n');
        json
    }
}

impl Command {
    /// Parse from a JSON line.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Get command name for acknowledgment.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Tick { .. } => "tick",
            Self::Query => "query",
            Self::Intent { .. } => "intent",
            Self::Release { .. } => "release",
            Self::Join => "join",
            Self::Spawn { .. } => "spawn",
            Self::Hash => "hash",
            Self::LoadScenario { .. } => "load_scenario",
            Self::Quit => "quit",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tick_command() {
        let cmd = Command::from_json(r#"{"cmd":"tick","count":60}"#).unwrap();
        assert!(matches!(cmd, Command::Tick { count: 60 }));
    }

    #[test]
    fn test_default_tick_count() {
        let cmd = Command::from_json(r#"{"cmd":"tick"}"#).unwrap();
        assert!(matches!(cmd, Command::Tick { count: 1 }));
    }

    #[test]
    fn test_parse_intent_defaults() {
        let cmd = Command::from_json(r#"{"cmd":"intent","slot":1,"shoot":true}"#).unwrap();
        let Command::Intent {
            slot,
            move_x,
            aim_x,
            aim_y,
            shoot,
            revive,
            ..
        } = cmd
        else {
            panic!("expected intent");
        };
        assert_eq!(slot, 1);
        assert!(move_x.abs() < f64::EPSILON);
        assert!((aim_x - 1.0).abs() < f64::EPSILON);
        assert!(aim_y.abs() < f64::EPSILON);
        assert!(shoot);
        assert!(!revive);
    }

    #[test]
    fn test_parse_spawn_command() {
        let cmd = Command::from_json(r#"{"cmd":"spawn","kind":"chaser","x":100.0,"y":200.0}"#)
            .unwrap();
        assert!(matches!(
            cmd,
            Command::Spawn { kind, x, y } if kind == "chaser" && x > 99.0 && y > 199.0
        ));
        assert_eq!(Command::from_json(r#"{"cmd":"join"}"#).unwrap().name(), "join");
    }

    #[test]
    fn test_unknown_command_fails() {
        assert!(Command::from_json(r#"{"cmd":"teleport"}"#).is_err());
    }

    #[test]
    fn test_serialize_responses() {
        let json = Response::StateHash { tick: 100, hash: 7 }.to_json_line();
        assert!(json.contains(r#""type":"state_hash""#));
        assert!(json.contains(r#""tick":100"#));
        assert!(json.ends_with('\n'));

        let json = Response::GameOver {
            outcome: MatchOutcome::TeamWiped,
            ticks: 5,
            score: 10,
            kills: vec![],
        }
        .to_json_line();
        assert!(json.contains(r#""outcome":"team_wiped""#));
    }
}
