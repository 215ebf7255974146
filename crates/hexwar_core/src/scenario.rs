//! Scenario description and engine tuning.
//!
//! A scenario is plain data (usually RON): the map, deployment zones, the
//! player's allocations, the bot's forces, squadrons, objectives and an
//! optional [`EngineConfig`] override. The engine copies what it needs out of
//! it; the scenario itself is never mutated.

use serde::{Deserialize, Serialize};

use crate::combat::Commander;
use crate::deployment::DeploymentZone;
use crate::error::{EngineError, Result};
use crate::hex::HexDirection;
use crate::map::MapSpec;
use crate::turn::Faction;
use crate::units::FULL_STRENGTH;

/// Tunable rules. Every field has a default, so a scenario may override any
/// subset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// The battle completes once the turn counter passes this.
    pub max_turns: u32,
    /// Reserve call-ups stay locked while the turn number is at most this.
    pub reserve_cooldown_turns: u32,
    /// Longest supply path from the base camp, in hexes.
    pub supply_radius: u32,
    /// Share of max ammo and fuel restored to supplied units, in percent.
    pub resupply_percent: u32,
    /// Strength lost by units out of supply.
    pub attrition: i32,
    /// Enemies within this many hexes of a friendly unit are spotted.
    pub spotting_radius: u32,
    /// Radius revealed by a recon flight.
    pub recon_radius: u32,
    /// Radius protected by an air-cover mission.
    pub air_cover_radius: u32,
    /// Highest entrenchment level.
    pub max_entrench: u8,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_turns: 12,
            reserve_cooldown_turns: 1,
            supply_radius: 8,
            resupply_percent: 25,
            attrition: 10,
            spotting_radius: 2,
            recon_radius: 2,
            air_cover_radius: 3,
            max_entrench: 3,
        }
    }
}

/// A commander-approved block of identical units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitAllocation {
    /// Allocation key used by deploy and call-up commands.
    pub key: String,
    /// Unit type key.
    pub type_key: String,
    /// Display label.
    pub label: String,
    /// Sprite identifier.
    #[serde(default)]
    pub sprite: String,
    /// Number of units.
    pub count: u32,
    /// Starting experience.
    #[serde(default)]
    pub experience: u8,
}

/// A bot unit placed by the scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotUnitSpec {
    /// Unit type key.
    pub type_key: String,
    /// Position as a `"col,row"` key.
    pub hex: String,
    /// Display label; defaults to the type label.
    #[serde(default)]
    pub label: Option<String>,
    /// Starting strength.
    #[serde(default = "full_strength")]
    pub strength: i32,
    /// Starting experience.
    #[serde(default)]
    pub experience: u8,
    /// Starting heading.
    #[serde(default = "facing_west")]
    pub facing: HexDirection,
}

fn full_strength() -> i32 {
    FULL_STRENGTH
}

fn facing_west() -> HexDirection {
    HexDirection::West
}

/// An air squadron available to a faction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SquadronSpec {
    /// Squadron key.
    pub key: String,
    /// Display label.
    pub label: String,
    /// Aircraft type key.
    pub type_key: String,
    /// Owning faction.
    pub faction: Faction,
}

/// A hex worth holding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Objective {
    /// Objective key.
    pub key: String,
    /// Display label.
    pub label: String,
    /// Position as a `"col,row"` key.
    pub hex: String,
    /// Faction holding it at the start.
    #[serde(default)]
    pub held_by: Option<Faction>,
}

/// A complete battle setup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Briefing text.
    #[serde(default)]
    pub description: String,
    /// Terrain layout.
    pub map: MapSpec,
    /// Rule overrides.
    #[serde(default)]
    pub config: EngineConfig,
    /// Deployment zones for both factions.
    #[serde(default)]
    pub zones: Vec<DeploymentZone>,
    /// Player commander modifiers.
    #[serde(default)]
    pub player_commander: Commander,
    /// Bot commander modifiers.
    #[serde(default)]
    pub bot_commander: Commander,
    /// Bot forces on the map from the start.
    #[serde(default)]
    pub bot_units: Vec<BotUnitSpec>,
    /// Bot supply source as a `"col,row"` key; `None` means off-map supply.
    #[serde(default)]
    pub bot_base_camp: Option<String>,
    /// Squadrons for both factions.
    #[serde(default)]
    pub squadrons: Vec<SquadronSpec>,
    /// Objectives.
    #[serde(default)]
    pub objectives: Vec<Objective>,
    /// Player allocations, for runners that deploy automatically.
    #[serde(default)]
    pub allocations: Vec<UnitAllocation>,
    /// Allocations that arrive straight into the reserve.
    #[serde(default)]
    pub queued_allocations: Vec<UnitAllocation>,
}

impl Scenario {
    /// Parse a scenario from RON text.
    pub fn from_ron_str(ron: &str) -> Result<Self> {
        ron::from_str(ron).map_err(|e| EngineError::DataParse {
            what: "scenario",
            message: e.to_string(),
        })
    }

    /// Serialize to pretty RON.
    pub fn to_ron_string(&self) -> Result<String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default()).map_err(|e| {
            EngineError::DataParse {
                what: "scenario",
                message: e.to_string(),
            }
        })
    }

    /// Zones owned by `faction`.
    pub fn zones_for(&self, faction: Faction) -> impl Iterator<Item = &DeploymentZone> {
        self.zones.iter().filter(move |z| z.faction == faction)
    }
}
