//! Replay system for recording and playing back matches.
//!
//! A replay stores the match settings and config plus one frame per tick:
//! the players that joined before the tick and the intents fed to it.
//! Since the simulation is deterministic, that is enough to recreate the
//! whole match and check it against the recorded final hash.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::behaviors::BehaviorRegistry;
use crate::config::SimConfig;
use crate::defs::Catalogs;
use crate::error::{GameError, Result};
use crate::simulation::{MatchSettings, Simulation};
use crate::state::{Mode, PlayerIntent};

/// Replay file format version for compatibility.
pub const REPLAY_VERSION: u32 = 1;

/// Input of one tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayFrame {
    /// Tick the frame feeds.
    pub tick: u64,
    /// Players added right before the tick ran.
    pub joins: u32,
    /// Intents by slot.
    pub intents: Vec<PlayerIntent>,
}

/// Complete replay data structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Replay {
    /// Replay format version.
    pub version: u32,
    /// Map the match was played on.
    pub map_id: String,
    /// Match rules.
    pub mode: Mode,
    /// Random seed used for the match.
    pub seed: u32,
    /// Players present at tick 0.
    pub initial_players: usize,
    /// Balance the match ran with.
    pub config: SimConfig,
    /// Frames in tick order.
    pub frames: Vec<ReplayFrame>,
    /// Tick count when recording stopped.
    pub final_tick: u64,
    /// State hash when recording stopped.
    pub final_hash: u64,
}

impl Replay {
    /// Start an empty recording of a match.
    #[must_use]
    pub fn new(settings: &MatchSettings, config: &SimConfig) -> Self {
        Self {
            version: REPLAY_VERSION,
            map_id: settings.map_id.clone(),
            mode: settings.mode,
            seed: settings.seed,
            initial_players: settings.player_count,
            config: config.clone(),
            frames: Vec::new(),
            final_tick: 0,
            final_hash: 0,
        }
    }

    /// Settings that recreate the match start.
    #[must_use]
    pub fn settings(&self) -> MatchSettings {
        MatchSettings {
            mode: self.mode,
            map_id: self.map_id.clone(),
            player_count: self.initial_players,
            seed: self.seed,
        }
    }

    /// Record the input of `tick`.
    pub fn record_frame(&mut self, tick: u64, joins: u32, intents: &[PlayerIntent]) {
        self.frames.push(ReplayFrame {
            tick,
            joins,
            intents: intents.to_vec(),
        });
    }

    /// Finalize the replay with end-of-match state.
    pub fn finalize(&mut self, final_tick: u64, final_hash: u64) {
        self.final_tick = final_tick;
        self.final_hash = final_hash;
    }

    /// Frame recorded for `tick`, if any.
    #[must_use]
    pub fn frame_at(&self, tick: u64) -> Option<&ReplayFrame> {
        self.frames
            .binary_search_by_key(&tick, |f| f.tick)
            .ok()
            .map(|i| &self.frames[i])
    }

    /// Length of the replay in ticks.
    #[must_use]
    pub const fn duration(&self) -> u64 {
        self.final_tick
    }

    /// Encode with bincode.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| GameError::InvalidState(format!("Failed to serialize replay: {e}")))
    }

    /// Decode bytes from [`Self::to_bytes`].
    ///
    /// # Errors
    /// Returns an error on malformed bytes or a version mismatch.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let replay: Self = bincode::deserialize(bytes)
            .map_err(|e| GameError::InvalidState(format!("Failed to deserialize replay: {e}")))?;

        if replay.version != REPLAY_VERSION {
            return Err(GameError::InvalidState(format!(
                "Replay version mismatch: expected {}, got {}",
                REPLAY_VERSION, replay.version
            )));
        }

        Ok(replay)
    }

    /// Save the replay to a file.
    ///
    /// # Errors
    /// Returns an error if serialization or file writing fails.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let bytes = self.to_bytes()?;
        std::fs::write(path.as_ref(), bytes)
            .map_err(|e| GameError::InvalidState(format!("Failed to write replay file: {e}")))?;
        Ok(())
    }

    /// Load a replay from a file.
    ///
    /// # Errors
    /// Returns an error if file reading or deserialization fails.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())
            .map_err(|e| GameError::InvalidState(format!("Failed to read replay file: {e}")))?;
        Self::from_bytes(&bytes)
    }
}

/// Replay playback controller.
#[derive(Debug)]
pub struct ReplayPlayer {
    replay: Replay,
    initial: Simulation,
    simulation: Simulation,
    current_tick: u64,
    /// Whether playback is paused.
    pub paused: bool,
}

impl ReplayPlayer {
    /// Play a replay against the built-in catalogs and behaviors.
    ///
    /// # Errors
    /// Returns an error if the match cannot be recreated.
    pub fn new(replay: Replay) -> Result<Self> {
        Self::with_catalogs(replay, Catalogs::builtin(), &BehaviorRegistry::builtin())
    }

    /// Play a replay against custom catalogs and behaviors.
    ///
    /// # Errors
    /// Returns an error if the match cannot be recreated.
    pub fn with_catalogs(
        replay: Replay,
        catalogs: Catalogs,
        registry: &BehaviorRegistry,
    ) -> Result<Self> {
        let initial = Simulation::new(replay.settings(), catalogs, registry, replay.config.clone())?;
        Ok(Self {
            replay,
            simulation: initial.clone(),
            initial,
            current_tick: 0,
            paused: false,
        })
    }

    fn step(&mut self) -> Result<()> {
        match self.replay.frame_at(self.current_tick) {
            Some(frame) => {
                for _ in 0..frame.joins {
                    self.simulation.add_player()?;
                }
                self.simulation.tick(&frame.intents);
            }
            None => self.simulation.tick(&[]),
        }
        self.simulation.drain_events();
        self.current_tick += 1;
        Ok(())
    }

    /// Advance the replay by one tick.
    ///
    /// Returns true if there are more ticks to play.
    ///
    /// # Errors
    /// Returns an error if a recorded join no longer fits the lobby.
    pub fn advance(&mut self) -> Result<bool> {
        if !self.paused && self.current_tick < self.replay.final_tick {
            self.step()?;
        }
        Ok(self.current_tick < self.replay.final_tick)
    }

    /// Seek to a specific tick, replaying from the start.
    ///
    /// # Errors
    /// Returns an error if a recorded join no longer fits the lobby.
    pub fn seek(&mut self, target_tick: u64) -> Result<()> {
        self.simulation = self.initial.clone();
        self.current_tick = 0;
        while self.current_tick < target_tick && self.current_tick < self.replay.final_tick {
            self.step()?;
        }
        Ok(())
    }

    /// Get the current tick.
    #[must_use]
    pub const fn current_tick(&self) -> u64 {
        self.current_tick
    }

    /// Get a reference to the current simulation.
    #[must_use]
    pub const fn simulation(&self) -> &Simulation {
        &self.simulation
    }

    /// Get the replay being played.
    #[must_use]
    pub const fn replay(&self) -> &Replay {
        &self.replay
    }

    /// Check if the replay has finished.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.current_tick >= self.replay.final_tick
    }

    /// Replay to the end and compare against the recorded hash.
    ///
    /// # Errors
    /// Returns an error if playback fails.
    pub fn verify(&mut self) -> Result<bool> {
        self.seek(self.replay.final_tick)?;
        let actual_hash = self.simulation.state_hash();
        if actual_hash != self.replay.final_hash {
            tracing::warn!(
                expected = self.replay.final_hash,
                actual = actual_hash,
                tick = self.current_tick,
                "Replay diverged"
            );
        }
        Ok(actual_hash == self.replay.final_hash)
    }

    /// Toggle pause state.
    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }

    /// Get progress as a percentage (0-100).
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn progress_percent(&self) -> f64 {
        if self.replay.final_tick == 0 {
            100.0
        } else {
            (self.current_tick as f64 / self.replay.final_tick as f64) * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> MatchSettings {
        MatchSettings {
            mode: Mode::Coop,
            map_id: "bunker".to_string(),
            player_count: 1,
            seed: 777,
        }
    }

    fn intent_for(tick: u64, slot: usize) -> PlayerIntent {
        let phase = usize::try_from(tick / 40).unwrap() + slot;
        let (x, y) = [(1, 0), (0, 1), (-1, 0), (0, -1)][phase % 4];
        PlayerIntent {
            move_dir: crate::math::Vec2Fixed::from_int(x, y),
            aim: crate::math::Vec2Fixed::from_int(y, -x),
            shoot: tick % 3 == 0,
            revive: false,
        }
    }

    /// Record `ticks` ticks with a join at tick 100.
    fn record(ticks: u64) -> Replay {
        let config = SimConfig::default();
        let mut sim = Simulation::with_defaults(settings()).unwrap();
        let mut replay = Replay::new(&settings(), &config);
        for tick in 0..ticks {
            let joins = u32::from(tick == 100);
            if joins > 0 {
                sim.add_player().unwrap();
            }
            let intents: Vec<_> = (0..sim.state().players.len())
                .map(|slot| intent_for(tick, slot))
                .collect();
            replay.record_frame(tick, joins, &intents);
            sim.tick(&intents);
            sim.drain_events();
        }
        replay.finalize(sim.current_tick(), sim.state_hash());
        replay
    }

    #[test]
    fn test_replay_create() {
        let replay = Replay::new(&settings(), &SimConfig::default());
        assert_eq!(replay.version, REPLAY_VERSION);
        assert_eq!(replay.map_id, "bunker");
        assert_eq!(replay.settings(), settings());
        assert!(replay.frames.is_empty());
    }

    #[test]
    fn test_replay_frames_lookup() {
        let replay = record(150);
        assert_eq!(replay.frames.len(), 150);
        assert_eq!(replay.frame_at(100).unwrap().joins, 1);
        assert_eq!(replay.frame_at(100).unwrap().intents.len(), 2);
        assert!(replay.frame_at(150).is_none());
        assert_eq!(replay.duration(), 150);
    }

    #[test]
    fn test_replay_save_load() {
        let replay = record(50);
        let temp_path = std::env::temp_dir().join("arena_core_test_replay.bin");
        replay.save(&temp_path).unwrap();

        let loaded = Replay::load(&temp_path).unwrap();
        assert_eq!(loaded.frames, replay.frames);
        assert_eq!(loaded.final_hash, replay.final_hash);
        assert_eq!(loaded.config, replay.config);

        let _ = std::fs::remove_file(temp_path);
    }

    #[test]
    fn test_version_mismatch_rejected() {
        let mut replay = record(5);
        replay.version = REPLAY_VERSION + 1;
        let bytes = replay.to_bytes().unwrap();
        assert!(matches!(
            Replay::from_bytes(&bytes),
            Err(GameError::InvalidState(_))
        ));
    }

    #[test]
    fn test_verify_reproduces_hash() {
        let mut player = ReplayPlayer::new(record(300)).unwrap();
        assert!(player.verify().unwrap());
        assert!(player.is_finished());
        assert_eq!(player.simulation().state().players.len(), 2);
    }

    #[test]
    fn test_tampered_replay_fails_verification() {
        let mut replay = record(200);
        replay.frames[10].intents[0].move_dir = crate::math::Vec2Fixed::from_int(0, 1);
        replay.frames[10].intents[0].shoot = !replay.frames[10].intents[0].shoot;
        let mut player = ReplayPlayer::new(replay).unwrap();
        assert!(!player.verify().unwrap());
    }

    #[test]
    fn test_advance_and_seek() {
        let mut player = ReplayPlayer::new(record(120)).unwrap();
        for _ in 0..5 {
            assert!(player.advance().unwrap());
        }
        assert_eq!(player.current_tick(), 5);

        player.seek(110).unwrap();
        assert_eq!(player.current_tick(), 110);
        assert_eq!(player.simulation().state().players.len(), 2);

        player.seek(10).unwrap();
        assert_eq!(player.current_tick(), 10);
        assert_eq!(player.simulation().state().players.len(), 1);

        while player.advance().unwrap() {}
        assert!(player.is_finished());
        assert!((player.progress_percent() - 100.0).abs() < 0.01);
    }

    #[test]
    fn test_paused_player_holds() {
        let mut player = ReplayPlayer::new(record(20)).unwrap();
        player.paused = true;
        player.advance().unwrap();
        assert_eq!(player.current_tick(), 0);
        player.toggle_pause();
        player.advance().unwrap();
        assert_eq!(player.current_tick(), 1);
    }
}
