//! Headless battle runner for scenario validation and CI verification.
//!
//! Loads scenario RON files, deploys the player's allocations, and plays the
//! player side with a greedy autopilot against the built-in bot:
//!
//! - **Scenario checks**: catch unplayable zones or bad data before shipping
//! - **CI verification**: the report carries a state hash for determinism checks
//!
//! # Output
//!
//! - **stdout**: the JSON report
//! - **stderr**: logs (human-readable)
//!
//! # Example
//!
//! ```bash
//! # Play a scenario to completion
//! cargo run -p hexwar_headless -- run --scenario scenarios/skirmish.ron
//!
//! # Cap the run at three turns
//! cargo run -p hexwar_headless -- run --scenario scenarios/skirmish.ron --turns 3
//!
//! # Check a scenario without playing it
//! cargo run -p hexwar_headless -- validate scenarios/skirmish.ron
//! ```

pub mod runner;
pub mod scenario;

pub use runner::{auto_deploy, run, Autopilot, BattleReport, RunConfig, UnitReport};
pub use scenario::{ScenarioError, ValidationSummary};
