//! Determinism testing utilities.
//!
//! Provides a harness for verifying that the simulation
//! produces identical results given identical inputs.
//!
//! # Testing Strategy
//!
//! Replays, bot regression runs and authoritative servers all depend on the
//! simulation being 100% deterministic. Sources of non-determinism include:
//!
//! - **Floating-point math**: Different CPUs can produce different results.
//!   We use fixed-point arithmetic via [`arena_core::math::Fixed`] throughout.
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   Pools are always scanned in index order.
//!
//! - **System randomness**: All "random" behavior uses seeded PRNGs, and
//!   bots draw from their own stream.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: Individual system determinism (movement, collisions, etc.)
//! 2. **Property tests**: Random intents must still produce deterministic outputs
//! 3. **Integration tests**: Full bot matches are reproducible
//! 4. **Parallel tests**: Running N simulations in parallel all match

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;

use arena_core::behaviors::BehaviorRegistry;
use arena_core::simulation::Simulation;

use crate::fixtures::BotMatch;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks simulated.
    pub ticks: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for deterministic simulation).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the simulation was deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the simulation produced different hashes across runs.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Simulation is non-deterministic!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Result of parallel simulation runs.
#[derive(Debug, Clone)]
pub struct ParallelSimResult {
    /// Final state and event hash from each simulation.
    pub hashes: Vec<u64>,
    /// Number of ticks each simulation ran.
    pub ticks: u64,
    /// Number of simulations run.
    pub num_sims: usize,
}

impl ParallelSimResult {
    /// Check if all simulations produced identical results.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        self.hashes.windows(2).all(|w| w[0] == w[1])
    }

    /// Assert all simulations matched.
    ///
    /// # Panics
    ///
    /// Panics if simulations produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic() {
            let mut unique: Vec<u64> = self.hashes.clone();
            unique.sort_unstable();
            unique.dedup();
            panic!(
                "Parallel simulations diverged!\n\
                 Simulations: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {}\n\
                 All hashes: {:?}",
                self.num_sims,
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a simulation multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run the simulation
/// * `ticks` - Number of ticks to simulate per run
/// * `setup` - Function to create initial simulation state
/// * `step` - Function to advance simulation by one tick
/// * `hash` - Function to compute state hash
///
/// # Example
///
/// ```
/// use arena_test_utils::determinism::verify_determinism;
///
/// let result = verify_determinism(3, 10, || 0u64, |n| *n += 1, |n| *n);
/// result.assert_deterministic();
/// ```
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();
        for _ in 0..ticks {
            step(&mut state);
        }
        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    }
}

/// Run a bot-driven match twice and compare the final state hashes and the
/// full event sequences.
///
/// Bots are seeded from the match seed, so both runs see the same intents
/// only if the simulation itself is deterministic.
pub fn verify_simulation_determinism<F>(setup_fn: F, num_ticks: u64) -> bool
where
    F: Fn() -> Simulation,
{
    let result = verify_determinism(
        2,
        num_ticks,
        || BotMatch::new(setup_fn()),
        |game| {
            game.step();
        },
        |game| compute_hash(&game.fingerprint()),
    );
    result.is_deterministic
}

/// Run N bot-driven simulations on scoped threads and collect a final hash
/// of each one's state and event sequence.
///
/// This is useful for catching non-determinism that only manifests
/// under thread scheduling variations, memory layout differences, etc.
///
/// # Panics
///
/// Panics if a simulation thread panics.
pub fn run_parallel_simulations<F>(
    setup_fn: F,
    num_sims: usize,
    num_ticks: u64,
) -> ParallelSimResult
where
    F: Fn() -> Simulation + Sync,
{
    let hashes = thread::scope(|s| {
        let handles: Vec<_> = (0..num_sims)
            .map(|_| {
                s.spawn(|| {
                    let mut game = BotMatch::new(setup_fn());
                    for _ in 0..num_ticks {
                        game.step();
                    }
                    compute_hash(&game.fingerprint())
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("simulation thread panicked"))
            .collect()
    });

    ParallelSimResult {
        hashes,
        ticks: num_ticks,
        num_sims,
    }
}

/// Compare two bot-driven runs tick-by-tick, finding first divergence.
///
/// Useful for debugging non-determinism by finding exactly when
/// simulations start to differ.
///
/// # Returns
///
/// `None` if simulations are deterministic, `Some(tick)` if their states or
/// the events they emitted differ after that tick.
pub fn find_first_divergence<F>(setup_fn: F, num_ticks: u64) -> Option<u64>
where
    F: Fn() -> Simulation,
{
    let mut a = BotMatch::new(setup_fn());
    let mut b = BotMatch::new(setup_fn());

    if a.fingerprint() != b.fingerprint() {
        return Some(0);
    }

    for tick in 1..=num_ticks {
        a.step();
        b.step();
        if a.fingerprint() != b.fingerprint() {
            return Some(tick);
        }
    }

    None
}

/// Verify that snapshot/restore preserves simulation state exactly.
///
/// Runs `num_ticks`, snapshots, restores, then runs both copies another
/// `num_ticks` with the same intents and compares state hashes and emitted
/// events at every tick.
pub fn verify_snapshot_determinism<F>(setup_fn: F, num_ticks: u64) -> bool
where
    F: Fn() -> Simulation,
{
    let mut game = BotMatch::new(setup_fn());
    for _ in 0..num_ticks {
        game.step();
    }

    let Ok(bytes) = game.sim.snapshot() else {
        return false;
    };
    let Ok(restored) = Simulation::restore(
        &bytes,
        game.sim.catalogs().clone(),
        &BehaviorRegistry::builtin(),
    ) else {
        return false;
    };
    if restored.state_hash() != game.state_hash() {
        return false;
    }

    let mut copy = BotMatch {
        sim: restored,
        bots: game.bots.clone(),
        event_digest: game.event_digest,
    };
    for _ in 0..num_ticks {
        game.step();
        copy.step();
        if copy.fingerprint() != game.fingerprint() {
            return false;
        }
    }
    true
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Proptest strategies for determinism testing.
///
/// These strategies generate random but reproducible inputs for
/// property-based testing of simulation determinism.
pub mod strategies {
    use proptest::prelude::*;

    use arena_core::math::{Fixed, Vec2Fixed};
    use arena_core::simulation::MatchSettings;
    use arena_core::state::{Mode, PlayerIntent};

    /// Ids of the built-in maps.
    pub const BUILTIN_MAP_IDS: [&str; 6] =
        ["fortress", "arena", "bunker", "crucible", "gridlock", "labyrinth"];

    /// Generate a fixed-point number in a reasonable range for positions.
    ///
    /// Range: 0 to 960 (arena width)
    pub fn arb_fixed_position() -> impl Strategy<Value = Fixed> {
        (0i32..960i32).prop_map(Fixed::from_num)
    }

    /// Generate a position inside the 960×720 arena.
    pub fn arb_vec2_position() -> impl Strategy<Value = Vec2Fixed> {
        (0i32..960i32, 0i32..720i32).prop_map(|(x, y)| Vec2Fixed::from_int(x, y))
    }

    /// Generate a stick direction with components in `[-1, 1]`, in 1/8 steps.
    pub fn arb_stick() -> impl Strategy<Value = Vec2Fixed> {
        (-8i32..=8i32, -8i32..=8i32).prop_map(|(x, y)| {
            Vec2Fixed::new(Fixed::from_num(x) / 8, Fixed::from_num(y) / 8)
        })
    }

    /// Generate one player's intent.
    pub fn arb_intent() -> impl Strategy<Value = PlayerIntent> {
        (arb_stick(), arb_stick(), any::<bool>(), any::<bool>()).prop_map(
            |(move_dir, aim, shoot, revive)| PlayerIntent {
                move_dir,
                aim,
                shoot,
                revive,
            },
        )
    }

    /// Generate `len` ticks of intents for `players` players.
    pub fn arb_intent_sequence(
        players: usize,
        len: usize,
    ) -> impl Strategy<Value = Vec<Vec<PlayerIntent>>> {
        proptest::collection::vec(proptest::collection::vec(arb_intent(), players), len)
    }

    /// Generate a match mode.
    pub fn arb_mode() -> impl Strategy<Value = Mode> {
        prop_oneof![Just(Mode::Coop), Just(Mode::Pvp)]
    }

    /// Generate settings for a built-in map.
    pub fn arb_settings() -> impl Strategy<Value = MatchSettings> {
        (
            arb_mode(),
            proptest::sample::select(BUILTIN_MAP_IDS.to_vec()),
            1usize..=4,
            any::<u32>(),
        )
            .prop_map(|(mode, map, player_count, seed)| MatchSettings {
                mode,
                map_id: map.to_string(),
                player_count,
                seed,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arena_core::simulation::MatchSettings;
    use arena_core::state::Mode;
    use proptest::prelude::*;

    fn coop_match() -> Simulation {
        Simulation::with_defaults(MatchSettings {
            mode: Mode::Coop,
            map_id: "crucible".to_string(),
            player_count: 3,
            seed: 2024,
        })
        .unwrap()
    }

    #[test]
    fn test_verify_determinism_simple() {
        let result = verify_determinism(3, 100, || 0u64, |n| *n += 1, |n| *n);
        assert!(result.is_deterministic);
        assert_eq!(result.hashes, vec![100, 100, 100]);
    }

    #[test]
    fn test_detects_non_determinism() {
        let counter = std::cell::Cell::new(0u64);
        let result = verify_determinism(
            2,
            1,
            || {
                counter.set(counter.get() + 1);
                counter.get()
            },
            |_| {},
            |n| *n,
        );
        assert!(!result.is_deterministic);
        assert_eq!(result.unique_hashes().len(), 2);
    }

    #[test]
    fn test_bot_match_determinism() {
        assert!(verify_simulation_determinism(coop_match, 600));
    }

    #[test]
    fn test_find_divergence_on_deterministic_sim() {
        assert_eq!(find_first_divergence(coop_match, 300), None);
    }

    #[test]
    fn test_parallel_simulations_match() {
        run_parallel_simulations(coop_match, 4, 300).assert_deterministic();
    }

    #[test]
    fn test_snapshot_determinism() {
        assert!(verify_snapshot_determinism(coop_match, 200));
    }

    #[test]
    fn test_compute_hash_stable() {
        assert_eq!(compute_hash(&(1u32, "a")), compute_hash(&(1u32, "a")));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn prop_same_intents_same_hash(
            settings in strategies::arb_settings(),
            frames in strategies::arb_intent_sequence(4, 120),
        ) {
            let run = || {
                let mut sim = Simulation::with_defaults(settings.clone()).unwrap();
                let mut log = Vec::new();
                for intents in &frames {
                    sim.tick(intents);
                    log.push(sim.drain_events().to_vec());
                }
                (sim.state_hash(), log)
            };
            prop_assert_eq!(run(), run());
        }

        #[test]
        fn prop_positions_stay_in_arena(frames in strategies::arb_intent_sequence(2, 200)) {
            let mut sim = Simulation::with_defaults(MatchSettings {
                mode: Mode::Pvp,
                map_id: "arena".to_string(),
                player_count: 2,
                seed: 5,
            })
            .unwrap();
            for intents in &frames {
                sim.tick(intents);
                sim.drain_events();
                for player in &sim.state().players {
                    prop_assert!(player.pos.x >= arena_core::math::Fixed::ZERO);
                    prop_assert!(player.pos.y >= arena_core::math::Fixed::ZERO);
                    prop_assert!(player.pos.x <= sim.state().tiles.world_width());
                    prop_assert!(player.pos.y <= sim.state().tiles.world_height());
                }
            }
        }
    }
}
