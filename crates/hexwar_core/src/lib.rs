//! # Hexwar Core
//!
//! Deterministic battle engine for a turn-based hex-grid wargame.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No IO
//! - No randomness (combat applies rounded expected damage)
//! - No floating-point math in the rules (uses fixed-point)
//!
//! This separation enables:
//! - Headless batch runs
//! - Reproducible bot turns
//! - Determinism testing via [`engine::BattleEngine::state_hash`]
//!
//! ## Crate Structure
//!
//! - [`hex`] - Axial/offset coordinates, distance, lines, rings
//! - [`terrain`] / [`units`] - Immutable catalogs
//! - [`map`] - Terrain grid
//! - [`visibility`] - Line of sight and spotting
//! - [`deployment`] - Deployment zone planning
//! - [`combat`] - Attack preview and resolution
//! - [`battle`] - Roster and shared unit primitives
//! - [`turn`] - Phases, idle units, supply
//! - [`reserves`] - Reserve pool
//! - [`bot`] - Heuristic opponent
//! - [`air`] - Squadrons and air missions
//! - [`engine`] - The session object tying it together

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod air;
pub mod battle;
pub mod bot;
pub mod combat;
pub mod deployment;
pub mod engine;
pub mod error;
pub mod hex;
pub mod map;
pub mod math;
pub mod movement;
pub mod reserves;
pub mod scenario;
pub mod terrain;
pub mod turn;
pub mod units;
pub mod visibility;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::air::{
        AirMission, AirMissionReport, AirMissionRequest, AirReportFeed, AirSupportSummary,
        MissionId, MissionKind, MissionOutcome, MissionStatus, SquadronStatus,
    };
    pub use crate::battle::{BattleUnit, UnitId};
    pub use crate::bot::{BotMove, BotTurnSummary};
    pub use crate::combat::{AttackResolution, CombatPreview, Commander};
    pub use crate::deployment::{DeploymentZone, PlannedZone};
    pub use crate::engine::{BattleEngine, BattleOutcome, EngineEvent, ObjectiveState, Placement};
    pub use crate::error::{EngineError, Result};
    pub use crate::hex::{hex_key, parse_hex_key, Axial, HexDirection, Offset};
    pub use crate::math::Fixed;
    pub use crate::reserves::{ReserveEntry, ReserveStatus};
    pub use crate::scenario::{EngineConfig, Scenario, UnitAllocation};
    pub use crate::terrain::{TerrainCatalog, TerrainDefinition, TerrainLookup};
    pub use crate::turn::{Faction, Phase, SupplyTickReport, TurnSummary};
    pub use crate::units::{ScenarioUnit, UnitCatalog, UnitClass, UnitTypeDefinition};
    pub use crate::visibility::Visibility;
}
