//! Determinism testing utilities.
//!
//! Provides a harness for verifying that a battle produces identical results
//! given identical inputs.
//!
//! # Testing Strategy
//!
//! Bot turns and combat must replay exactly. Sources of non-determinism
//! include:
//!
//! - **Floating-point math**: Different CPUs can produce different results.
//!   Combat and line-of-sight use [`hexwar_core::math::Fixed`] throughout.
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   The roster, missions and zone planning iterate in ordered collections.
//!
//! - **Randomness**: There is none; combat applies rounded expected damage.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: Individual rules (distance, accuracy, zone planning)
//! 2. **Property tests**: Random inputs must still produce deterministic outputs
//! 3. **Integration tests**: Full battles are reproducible
//! 4. **Parallel tests**: Running N battles on separate threads all match

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;

use hexwar_core::engine::BattleEngine;

use crate::fixtures::play_turn;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of steps played.
    pub steps: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic battle).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the runs were deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Battle is non-deterministic!\n\
                 Runs: {}\n\
                 Steps: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.steps,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Result of parallel battle runs.
#[derive(Debug, Clone)]
pub struct ParallelBattleResult {
    /// Final state hash from each battle.
    pub hashes: Vec<u64>,
    /// Number of turns each battle played.
    pub turns: u64,
    /// Number of battles run.
    pub num_battles: usize,
}

impl ParallelBattleResult {
    /// Check if all battles produced identical results.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        self.hashes.windows(2).all(|w| w[0] == w[1])
    }

    /// Assert all battles matched.
    ///
    /// # Panics
    ///
    /// Panics if battles produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic() {
            let mut unique: Vec<u64> = self.hashes.clone();
            unique.sort_unstable();
            unique.dedup();
            panic!(
                "Parallel battles diverged!\n\
                 Battles: {}\n\
                 Turns: {}\n\
                 Unique hashes: {}\n\
                 All hashes: {:?}",
                self.num_battles,
                self.turns,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a stepped process multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run
/// * `steps` - Number of steps per run
/// * `setup` - Function to create the initial state
/// * `step` - Function to advance the state by one step
/// * `hash` - Function to compute the state hash
///
/// # Example
///
/// ```ignore
/// use hexwar_test_utils::determinism::verify_determinism;
/// use hexwar_test_utils::fixtures::{play_turn, ready_engine};
///
/// let result = verify_determinism(3, 4, ready_engine, play_turn, |e| e.state_hash());
/// result.assert_deterministic();
/// ```
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    steps: u64,
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

        for _ in 0..steps {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        steps,
    }
}

/// Play a battle twice with identical setup and compare final hashes.
pub fn verify_battle_determinism<F>(setup_fn: F, turns: u64) -> bool
where
    F: Fn() -> BattleEngine,
{
    verify_determinism(2, turns, setup_fn, play_turn, BattleEngine::state_hash).is_deterministic
}

/// Play N battles on scoped threads; each engine lives and dies on its own
/// thread.
pub fn run_parallel_battles<F>(setup_fn: F, num_battles: usize, turns: u64) -> ParallelBattleResult
where
    F: Fn() -> BattleEngine + Sync,
{
    let hashes = thread::scope(|s| {
        let handles: Vec<_> = (0..num_battles)
            .map(|_| {
                s.spawn(|| {
                    let mut engine = setup_fn();
                    for _ in 0..turns {
                        play_turn(&mut engine);
                    }
                    engine.state_hash()
                })
            })
            .collect();

        handles.into_iter().map(|h| h.join().expect("battle thread panicked")).collect()
    });

    ParallelBattleResult {
        hashes,
        turns,
        num_battles,
    }
}

/// Compare two battles turn by turn, finding the first divergence.
///
/// # Returns
///
/// `None` if the battles stay identical, `Some(turn)` for the first turn
/// after which they differ.
pub fn find_first_divergence<F>(setup_fn: F, turns: u64) -> Option<u64>
where
    F: Fn() -> BattleEngine,
{
    let mut first = setup_fn();
    let mut second = setup_fn();

    if first.state_hash() != second.state_hash() {
        return Some(0);
    }

    for turn in 1..=turns {
        play_turn(&mut first);
        play_turn(&mut second);

        if first.state_hash() != second.state_hash() {
            return Some(turn);
        }
    }

    None
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Proptest strategies for hex-grid rules.
pub mod strategies {
    use hexwar_core::hex::{offset_to_axial, Axial, HexDirection, Offset};
    use hexwar_core::units::{ScenarioUnit, MAX_EXPERIENCE};
    use proptest::prelude::*;

    /// Axial coordinate with both components in `-range..=range`.
    pub fn arb_axial(range: i32) -> impl Strategy<Value = Axial> {
        (-range..=range, -range..=range).prop_map(|(q, r)| Axial::new(q, r))
    }

    /// Offset coordinate inside a `width` x `height` map.
    pub fn arb_offset(width: i32, height: i32) -> impl Strategy<Value = Offset> {
        (0..width, 0..height).prop_map(|(col, row)| Offset::new(col, row))
    }

    /// Any heading.
    pub fn arb_direction() -> impl Strategy<Value = HexDirection> {
        proptest::sample::select(HexDirection::ALL.to_vec())
    }

    /// Strength of a living unit.
    pub fn arb_strength() -> impl Strategy<Value = i32> {
        1i32..=100
    }

    /// Experience level.
    pub fn arb_experience() -> impl Strategy<Value = u8> {
        0u8..=MAX_EXPERIENCE
    }

    /// Built-in ground unit type key.
    pub fn arb_ground_type() -> impl Strategy<Value = &'static str> {
        proptest::sample::select(vec!["infantry", "recon", "halftrack", "tank", "artillery"])
    }

    /// Unit state for a built-in ground type at a hex inside a map.
    pub fn arb_scenario_unit(width: i32, height: i32) -> impl Strategy<Value = ScenarioUnit> {
        (
            arb_ground_type(),
            arb_offset(width, height),
            arb_strength(),
            arb_experience(),
            0u32..=8,
            0u8..=3,
            arb_direction(),
        )
            .prop_map(
                |(type_key, offset, strength, experience, ammo, entrench, facing)| ScenarioUnit {
                    type_key: type_key.to_string(),
                    hex: offset_to_axial(offset.col, offset.row),
                    strength,
                    experience,
                    ammo,
                    fuel: 20,
                    entrench,
                    facing,
                },
            )
    }
}

#[cfg(test)]
mod tests {
    use super::strategies::*;
    use super::*;
    use crate::fixtures::{deployed_engine, open_battle, play_turn, ready_engine, skirmish_scenario};
    use std::sync::atomic::{AtomicU64, Ordering};
    use hexwar_core::combat::preview_attack;
    use hexwar_core::turn::Faction;
    use proptest::prelude::*;

    #[test]
    fn test_verify_determinism_simple() {
        let result = verify_determinism(3, 100, || 0u64, |n| *n += 1, |n| *n);

        assert!(result.is_deterministic);
        assert_eq!(result.hashes, vec![100, 100, 100]);
    }

    #[test]
    fn test_skirmish_is_deterministic() {
        assert!(verify_battle_determinism(ready_engine, 6));
    }

    #[test]
    fn test_no_divergence() {
        assert!(find_first_divergence(ready_engine, 4).is_none());
    }

    #[test]
    fn test_parallel_battles_match() {
        let result = run_parallel_battles(ready_engine, 4, 5);
        result.assert_deterministic();
    }

    #[test]
    fn test_harness_detects_divergence() {
        let seed = AtomicU64::new(0);
        let result = verify_determinism(
            3,
            2,
            || seed.fetch_add(1, Ordering::SeqCst),
            |n| *n += 1,
            |n| *n,
        );
        assert!(!result.is_deterministic);
        assert_eq!(result.unique_hashes().len(), 3);
    }

    #[test]
    fn test_config_override_changes_outcome() {
        let mut short = skirmish_scenario();
        short.config.max_turns = 1;
        let mut engine = deployed_engine(&short);
        play_turn(&mut engine);
        assert!(engine.outcome().is_some());
    }

    proptest! {
        /// Distance is symmetric and zero only on identity.
        #[test]
        fn prop_distance_symmetric(a in arb_axial(50), b in arb_axial(50)) {
            prop_assert_eq!(a.distance(b), b.distance(a));
            prop_assert_eq!(a.distance(b) == 0, a == b);
        }

        /// Previews of the same engagement are bit-identical.
        #[test]
        fn prop_preview_is_repeatable(
            attacker in arb_scenario_unit(10, 10),
            defender in arb_scenario_unit(10, 10),
        ) {
            prop_assume!(attacker.hex != defender.hex);
            let battle = open_battle(10, 10);
            let catalog = battle.catalog();
            let engagement = hexwar_core::combat::Engagement {
                attacker: hexwar_core::combat::Combatant {
                    unit: &attacker,
                    unit_type: catalog.get(&attacker.type_key).unwrap(),
                    commander: hexwar_core::combat::Commander::default(),
                    terrain: None,
                },
                defender: hexwar_core::combat::Combatant {
                    unit: &defender,
                    unit_type: catalog.get(&defender.type_key).unwrap(),
                    commander: hexwar_core::combat::Commander::default(),
                    terrain: None,
                },
                forward: hexwar_core::combat::Sighting {
                    line_of_sight: true,
                    visibility: hexwar_core::visibility::Visibility::Direct,
                },
                reverse: hexwar_core::combat::Sighting {
                    line_of_sight: true,
                    visibility: hexwar_core::visibility::Visibility::SpottedOnly,
                },
                intercepted: false,
            };
            prop_assert_eq!(preview_attack(&engagement), preview_attack(&engagement));
        }

        /// Spawning the same unit twice yields the same roster hash.
        #[test]
        fn prop_spawn_hash_stable(unit in arb_scenario_unit(8, 8)) {
            let spawn = || {
                let mut battle = open_battle(8, 8);
                battle.spawn(Faction::Bot, unit.clone(), "probe", None).unwrap();
                compute_hash(&battle.units().map(|u| u.unit.clone()).collect::<Vec<_>>())
            };
            prop_assert_eq!(spawn(), spawn());
        }
    }
}
