//! Scenario file loading and validation.
//!
//! Scenarios are RON documents describing the map, deployment zones, the bot
//! order of battle, air squadrons, objectives and the player's allocations.
//! See [`hexwar_core::scenario::Scenario`] for the schema.

use std::path::Path;

use hexwar_core::engine::BattleEngine;
use hexwar_core::error::EngineError;
use hexwar_core::scenario::Scenario;
use hexwar_core::turn::Faction;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

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
    /// The engine rejected the scenario or a command issued against it.
    #[error("Engine rejected scenario: {0}")]
    Engine(#[from] EngineError),
    /// Failed to write a JSON report.
    #[error("Failed to serialize report: {0}")]
    Report(#[from] serde_json::Error),
    /// The scenario parsed but cannot be played.
    #[error("Scenario is not playable: {0}")]
    Unplayable(String),
}

/// Load a scenario from a RON file.
pub fn load<P: AsRef<Path>>(path: P) -> Result<Scenario, ScenarioError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(ScenarioError::FileNotFound(path.display().to_string()));
    }
    let contents = std::fs::read_to_string(path)?;
    let scenario = from_ron_str(&contents)?;
    debug!(path = %path.display(), name = %scenario.name, "Loaded scenario");
    Ok(scenario)
}

/// Parse a scenario from RON text.
pub fn from_ron_str(ron: &str) -> Result<Scenario, ScenarioError> {
    Ok(ron::from_str(ron)?)
}

/// What `validate` found in a playable scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationSummary {
    /// Scenario name.
    pub name: String,
    /// Map width in columns.
    pub width: i32,
    /// Map height in rows.
    pub height: i32,
    /// Planned player zone hexes.
    pub player_zone_hexes: usize,
    /// Planned bot zone hexes.
    pub bot_zone_hexes: usize,
    /// Units committed by the player allocations.
    pub allocated_units: u32,
    /// Allocated units that will not fit and start in reserve.
    pub overflow_to_reserve: u32,
    /// Bot units actually placed on the map.
    pub bot_units: usize,
    /// Squadrons across both factions.
    pub squadrons: usize,
    /// Objectives on the map.
    pub objectives: usize,
    /// Turn limit.
    pub max_turns: u32,
}

/// Check that a scenario can be turned into a battle and deployed.
pub fn validate(scenario: &Scenario) -> Result<ValidationSummary, ScenarioError> {
    let engine = BattleEngine::new(scenario)?;

    let zone_hexes = |faction: Faction| {
        engine
            .zones()
            .iter()
            .filter(|z| z.faction == faction)
            .map(|z| z.hexes.len())
            .sum::<usize>()
    };
    let player_zone_hexes = zone_hexes(Faction::Player);
    if player_zone_hexes == 0 {
        return Err(ScenarioError::Unplayable(
            "no player deployment zone".to_string(),
        ));
    }

    let allocated_units: u32 = scenario.allocations.iter().map(|a| a.count).sum();
    if allocated_units == 0 {
        return Err(ScenarioError::Unplayable("no player allocations".to_string()));
    }
    let overflow_to_reserve =
        allocated_units.saturating_sub(u32::try_from(player_zone_hexes).unwrap_or(u32::MAX));

    let summary = ValidationSummary {
        name: scenario.name.clone(),
        width: scenario.map.width,
        height: scenario.map.height,
        player_zone_hexes,
        bot_zone_hexes: zone_hexes(Faction::Bot),
        allocated_units,
        overflow_to_reserve,
        bot_units: engine.bot_units().len(),
        squadrons: scenario.squadrons.len(),
        objectives: engine.objectives().len(),
        max_turns: engine.config().max_turns,
    };
    info!(
        name = %summary.name,
        player_zone_hexes,
        bot_units = summary.bot_units,
        "Scenario validated"
    );
    Ok(summary)
}
