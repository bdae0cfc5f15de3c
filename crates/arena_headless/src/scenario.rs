//! Scenario loading and configuration.
//!
//! A scenario names a match setup for headless runs: mode, map, lobby,
//! bot personalities, scripted joins and the tick budget. Scenarios live in
//! RON files; a few are also built in so the CLI works without any files.

use std::path::Path;

use arena_core::config::SimConfig;
use arena_core::error::GameError;
use arena_core::math::{ratio, Fixed};
use arena_core::simulation::MatchSettings;
use arena_core::state::Mode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for scenario operations.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// File not found.
    #[error("Scenario file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read scenario file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse scenario: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// The scenario parsed but cannot be played.
    #[error("Invalid scenario '{name}': {message}")]
    Invalid {
        /// Scenario name.
        name: String,
        /// What is wrong with it.
        message: String,
    },
    /// The simulation rejected the setup.
    #[error("Simulation error: {0}")]
    Game(#[from] GameError),
    /// Writing results failed.
    #[error("Failed to encode results: {0}")]
    Encode(#[from] serde_json::Error),
}

/// A bot joining a running match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptedJoin {
    /// Tick before which the player is added.
    pub tick: u64,
    /// Boldness of the new bot in percent, if not random.
    #[serde(default)]
    pub boldness_percent: Option<i32>,
}

/// A complete scenario configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Match rules.
    pub mode: Mode,
    /// Built-in map id.
    pub map: String,
    /// Players at tick 0.
    pub players: usize,
    /// Boldness per starting slot in percent; missing slots roll randomly.
    #[serde(default)]
    pub boldness_percent: Vec<i32>,
    /// Players added mid-match.
    #[serde(default)]
    pub joins: Vec<ScriptedJoin>,
    /// Tick budget; the match stops here if it has not ended on its own.
    pub max_ticks: u64,
    /// Balance overrides.
    #[serde(default)]
    pub config: SimConfig,
}

impl Default for Scenario {
    fn default() -> Self {
        Self::coop_arena()
    }
}

impl Scenario {
    /// Load a scenario from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron_str(&contents)
    }

    /// Load from a RON string (useful for embedded scenarios).
    pub fn from_ron_str(ron: &str) -> Result<Self, ScenarioError> {
        let scenario: Self = ron::from_str(ron)?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Resolve a built-in scenario name or a path to a RON file.
    pub fn resolve(name_or_path: &str) -> Result<Self, ScenarioError> {
        if let Some(scenario) = Self::builtin(name_or_path) {
            return Ok(scenario);
        }
        Self::load(name_or_path)
    }

    /// Look up a built-in scenario by name.
    #[must_use]
    pub fn builtin(name: &str) -> Option<Self> {
        match name {
            "coop_arena" => Some(Self::coop_arena()),
            "coop_labyrinth" => Some(Self::coop_labyrinth()),
            "pvp_duel" => Some(Self::pvp_duel()),
            "pvp_brawl" => Some(Self::pvp_brawl()),
            _ => None,
        }
    }

    /// Names accepted by [`Self::builtin`].
    pub const BUILTIN_NAMES: [&'static str; 4] =
        ["coop_arena", "coop_labyrinth", "pvp_duel", "pvp_brawl"];

    /// Two bots holding out on the open arena, a third joining later.
    #[must_use]
    pub fn coop_arena() -> Self {
        Self {
            name: "coop_arena".to_string(),
            description: "Two co-op bots on the arena map; a third joins after 30 s".to_string(),
            mode: Mode::Coop,
            map: "arena".to_string(),
            players: 2,
            boldness_percent: vec![70, 30],
            joins: vec![ScriptedJoin {
                tick: 1800,
                boldness_percent: Some(50),
            }],
            max_ticks: 18_000,
            config: SimConfig::default(),
        }
    }

    /// Four co-op bots navigating the labyrinth.
    #[must_use]
    pub fn coop_labyrinth() -> Self {
        Self {
            name: "coop_labyrinth".to_string(),
            description: "Four co-op bots in tight corridors".to_string(),
            mode: Mode::Coop,
            map: "labyrinth".to_string(),
            players: 4,
            boldness_percent: Vec::new(),
            joins: Vec::new(),
            max_ticks: 18_000,
            config: SimConfig::default(),
        }
    }

    /// A full-length 1v1 on the crucible.
    #[must_use]
    pub fn pvp_duel() -> Self {
        Self {
            name: "pvp_duel".to_string(),
            description: "Bold bot against a cautious bot for one full match".to_string(),
            mode: Mode::Pvp,
            map: "crucible".to_string(),
            players: 2,
            boldness_percent: vec![90, 20],
            joins: Vec::new(),
            max_ticks: 10_800,
            config: SimConfig::default(),
        }
    }

    /// Six-player free-for-all on gridlock.
    #[must_use]
    pub fn pvp_brawl() -> Self {
        Self {
            name: "pvp_brawl".to_string(),
            description: "Six bots, random personalities, one full match".to_string(),
            mode: Mode::Pvp,
            map: "gridlock".to_string(),
            players: 6,
            boldness_percent: Vec::new(),
            joins: Vec::new(),
            max_ticks: 10_800,
            config: SimConfig::default(),
        }
    }

    /// Check everything the simulation cannot check for us.
    pub fn validate(&self) -> Result<(), ScenarioError> {
        let invalid = |message: String| ScenarioError::Invalid {
            name: self.name.clone(),
            message,
        };
        if self.players == 0 {
            return Err(invalid("needs at least one player".to_string()));
        }
        if self.max_ticks == 0 {
            return Err(invalid("max_ticks must be positive".to_string()));
        }
        if self.players + self.joins.len() > self.config.max_players {
            return Err(invalid(format!(
                "{} players plus {} joins exceed the lobby of {}",
                self.players,
                self.joins.len(),
                self.config.max_players
            )));
        }
        let percents = self
            .boldness_percent
            .iter()
            .copied()
            .chain(self.joins.iter().filter_map(|j| j.boldness_percent));
        for percent in percents {
            if !(0..=100).contains(&percent) {
                return Err(invalid(format!("boldness {percent}% is outside 0..=100")));
            }
        }
        if self.joins.windows(2).any(|w| w[0].tick > w[1].tick) {
            return Err(invalid("joins must be sorted by tick".to_string()));
        }
        Ok(())
    }

    /// Match settings for one seed.
    #[must_use]
    pub fn settings(&self, seed: u32) -> MatchSettings {
        MatchSettings {
            mode: self.mode,
            map_id: self.map.clone(),
            player_count: self.players,
            seed,
        }
    }

    /// Boldness for a starting slot, if the scenario fixes one.
    #[must_use]
    pub fn boldness(&self, slot: usize) -> Option<Fixed> {
        self.boldness_percent
            .get(slot)
            .map(|&percent| ratio(percent, 100))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_scenario() {
        let scenario = Scenario::default();
        assert_eq!(scenario.mode, Mode::Coop);
        assert_eq!(scenario.map, "arena");
        assert!(scenario.validate().is_ok());
    }

    #[test]
    fn test_builtins_are_valid() {
        for name in Scenario::BUILTIN_NAMES {
            let scenario = Scenario::builtin(name).unwrap();
            assert_eq!(scenario.name, name);
            scenario.validate().unwrap();
        }
        assert!(Scenario::builtin("nope").is_none());
    }

    #[test]
    fn test_parse_from_ron() {
        let ron = r#"
            Scenario(
                name: "Test",
                mode: Pvp,
                map: "bunker",
                players: 3,
                max_ticks: 600,
                config: (pvp_match_duration: 600),
            )
        "#;
        let scenario = Scenario::from_ron_str(ron).unwrap();
        assert_eq!(scenario.name, "Test");
        assert_eq!(scenario.players, 3);
        assert_eq!(scenario.config.pvp_match_duration, 600);
        assert_eq!(scenario.config.player_hp, 3);
        assert!(scenario.joins.is_empty());
        assert_eq!(scenario.settings(9).seed, 9);
    }

    #[test]
    fn test_rejects_overfull_lobby() {
        let mut scenario = Scenario::pvp_brawl();
        scenario.joins = vec![
            ScriptedJoin {
                tick: 10,
                boldness_percent: None,
            },
            ScriptedJoin {
                tick: 20,
                boldness_percent: None,
            },
        ];
        assert!(matches!(
            scenario.validate(),
            Err(ScenarioError::Invalid { .. })
        ));
    }

    #[test]
    fn test_rejects_bad_boldness() {
        let mut scenario = Scenario::pvp_duel();
        scenario.boldness_percent = vec![150];
        assert!(scenario.validate().is_err());
    }

    #[test]
    fn test_boldness_lookup() {
        let scenario = Scenario::pvp_duel();
        assert_eq!(scenario.boldness(1), Some(ratio(20, 100)));
        assert_eq!(scenario.boldness(5), None);
    }

    #[test]
    fn test_load_missing_file() {
        let err = Scenario::load("/definitely/not/here.ron").unwrap_err();
        assert!(matches!(err, ScenarioError::FileNotFound(_)));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("duel.ron");
        std::fs::write(&path, ron::to_string(&Scenario::pvp_duel()).unwrap()).unwrap();
        let loaded = Scenario::resolve(path.to_str().unwrap()).unwrap();
        assert_eq!(loaded.map, "crucible");
    }
}
