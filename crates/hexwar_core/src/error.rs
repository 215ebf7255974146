//! Error types for the battle engine.
//!
//! Only programmer and state-integrity failures are errors. Expected game
//! outcomes (target out of range, hex occupied, reserve exhausted) are
//! returned as `false`, `None` or empty collections by the engine API.

use thiserror::Error;

use crate::hex::Axial;
use crate::turn::{Faction, Phase};

/// Result type alias using [`EngineError`].
pub type Result<T> = std::result::Result<T, EngineError>;

/// Top-level error type for all battle engine errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// No active unit occupies the referenced hex.
    #[error("No active unit at {hex}")]
    UnitNotFound {
        /// The stale hex reference.
        hex: Axial,
    },

    /// A unit or allocation key that the engine never received.
    #[error("Unknown unit key: {0}")]
    UnknownUnitKey(String),

    /// A unit type key missing from the unit catalog.
    #[error("Unknown unit type: {0}")]
    UnknownUnitType(String),

    /// A terrain key missing from the terrain catalog.
    #[error("Unknown terrain: {key} at {hex}")]
    UnknownTerrain {
        /// Terrain key referenced by the map.
        key: String,
        /// Tile that referenced it.
        hex: Axial,
    },

    /// A squadron key that no faction owns.
    #[error("Unknown squadron: {0}")]
    UnknownSquadron(String),

    /// A squadron was tasked by the faction that does not own it.
    #[error("Squadron {squadron} does not belong to {faction:?}")]
    SquadronNotOwned {
        /// Squadron key.
        squadron: String,
        /// Faction that issued the request.
        faction: Faction,
    },

    /// Deployment was started without any committed allocations.
    #[error("Deployment started without committed allocations")]
    NoAllocations,

    /// A deployment command arrived before `begin_deployment`.
    #[error("Deployment has not been started")]
    DeploymentNotStarted,

    /// Deployment was finalized without a base camp.
    #[error("Base camp missing when finalizing deployment")]
    BaseCampMissing,

    /// Deployment was finalized with nothing placed and nothing in reserve.
    #[error("No units placed or reserved when finalizing deployment")]
    NothingDeployed,

    /// Zone planning could not find enough qualifying hexes.
    #[error("Deployment zone '{zone}' needs {required} hexes, found {found}")]
    ZoneCapacityUnmet {
        /// Zone key.
        zone: String,
        /// Declared capacity.
        required: usize,
        /// Qualifying hexes after full-map expansion.
        found: usize,
    },

    /// A hex key string that is not `"col,row"`.
    #[error("Malformed hex key: {0:?}")]
    MalformedHexKey(String),

    /// A coordinate outside the map.
    #[error("Hex {0} is outside the map")]
    OutOfBounds(Axial),

    /// An operation was issued in the wrong phase.
    #[error("{operation} is not allowed during {phase:?}")]
    PhaseViolation {
        /// Name of the rejected operation.
        operation: &'static str,
        /// Phase the engine was in.
        phase: Phase,
    },

    /// `attack_unit` was called for a pair with no valid preview.
    #[error("No valid attack from {attacker} to {defender}")]
    InvalidAttack {
        /// Attacker hex.
        attacker: Axial,
        /// Defender hex.
        defender: Axial,
    },

    /// A command referenced a unit of the other faction.
    #[error("Unit at {0} does not belong to the acting faction")]
    NotOwned(Axial),

    /// Catalog or scenario text failed to parse.
    #[error("Failed to parse {what}: {message}")]
    DataParse {
        /// What was being parsed.
        what: &'static str,
        /// Parser message.
        message: String,
    },

    /// Scenario data is structurally inconsistent.
    #[error("Invalid scenario: {0}")]
    Scenario(String),
}
