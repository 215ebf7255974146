//! Terrain catalog: movement costs, defense, accuracy and line-of-sight
//! properties per terrain key.
//!
//! The catalog is built once per session (from the built-in table or from
//! RON text) and only read afterwards.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::hex::Axial;

/// Movement cost at or above which a tile cannot be entered.
pub const IMPASSABLE: u32 = 999;

/// Mobility class of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum MoveType {
    /// Foot infantry.
    #[default]
    Leg,
    /// Wheeled vehicles.
    Wheel,
    /// Tracked vehicles.
    Track,
    /// Aircraft.
    Air,
}

/// Broad terrain category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TerrainType {
    /// Fields and grassland.
    #[default]
    Open,
    /// Paved or dirt road.
    Road,
    /// Woods.
    Forest,
    /// Rolling high ground.
    Hills,
    /// Peaks; closed to vehicles.
    Mountain,
    /// Towns and villages.
    Urban,
    /// Wet ground.
    Marsh,
    /// Shoreline sand.
    Beach,
    /// Sea, lakes and wide rivers.
    Water,
}

/// Vegetation or building density.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Density {
    /// Light cover.
    #[default]
    Sparse,
    /// Moderate cover.
    Medium,
    /// Heavy cover.
    Dense,
}

/// Movement cost per mobility class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MoveCosts {
    /// Cost for foot units.
    pub leg: u32,
    /// Cost for wheeled units.
    pub wheel: u32,
    /// Cost for tracked units.
    pub track: u32,
    /// Cost for aircraft.
    pub air: u32,
}

impl MoveCosts {
    /// Uniform cost for every class.
    #[must_use]
    pub const fn uniform(cost: u32) -> Self {
        Self {
            leg: cost,
            wheel: cost,
            track: cost,
            air: cost,
        }
    }

    /// Cost for a mobility class.
    #[must_use]
    pub const fn cost(&self, move_type: MoveType) -> u32 {
        match move_type {
            MoveType::Leg => self.leg,
            MoveType::Wheel => self.wheel,
            MoveType::Track => self.track,
            MoveType::Air => self.air,
        }
    }
}

/// Immutable definition of one terrain key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerrainDefinition {
    /// Catalog key referenced by map tiles.
    pub key: String,
    /// Broad category.
    pub terrain_type: TerrainType,
    /// Cover density.
    #[serde(default)]
    pub density: Density,
    /// Free-form feature tags (`"beach"`, `"road"`, `"bridge"`).
    #[serde(default)]
    pub features: Vec<String>,
    /// Movement cost per mobility class.
    pub move_cost: MoveCosts,
    /// Defensive value of the tile, in percent.
    #[serde(default)]
    pub defense: i32,
    /// Additive accuracy modifier in percent applied to attacks against units here.
    #[serde(default)]
    pub acc_mod: i32,
    /// Whether the tile blocks ground line of sight.
    #[serde(default)]
    pub blocks_los: bool,
}

impl TerrainDefinition {
    /// Check if this terrain has the given feature tag.
    #[must_use]
    pub fn has_feature(&self, feature: &str) -> bool {
        self.features.iter().any(|f| f.eq_ignore_ascii_case(feature))
    }

    /// Pure water tile.
    #[must_use]
    pub fn is_water(&self) -> bool {
        self.terrain_type == TerrainType::Water
    }

    /// Beach tile, by type or by feature tag.
    #[must_use]
    pub fn is_beach(&self) -> bool {
        self.terrain_type == TerrainType::Beach || self.has_feature("beach")
    }

    /// Whether units of `move_type` may enter the tile.
    #[must_use]
    pub fn is_passable(&self, move_type: MoveType) -> bool {
        self.move_cost.cost(move_type) < IMPASSABLE
    }
}

/// Read access to the terrain under a hex.
///
/// Line of sight, movement and deployment planning only need this view,
/// so tests can hand them a plain map instead of a full battlefield.
pub trait TerrainLookup {
    /// Terrain at `hex`, or `None` outside the map.
    fn terrain_at(&self, hex: Axial) -> Option<&TerrainDefinition>;
}

impl TerrainLookup for HashMap<Axial, TerrainDefinition> {
    fn terrain_at(&self, hex: Axial) -> Option<&TerrainDefinition> {
        self.get(&hex)
    }
}

/// Catalog of terrain definitions keyed by terrain key.
#[derive(Debug, Clone, Default)]
pub struct TerrainCatalog {
    terrains: HashMap<String, TerrainDefinition>,
}

impl TerrainCatalog {
    /// Build a catalog from definitions. Duplicate keys are rejected.
    pub fn new(definitions: Vec<TerrainDefinition>) -> Result<Self> {
        let mut terrains = HashMap::with_capacity(definitions.len());
        for definition in definitions {
            let key = definition.key.clone();
            if terrains.insert(key.clone(), definition).is_some() {
                return Err(EngineError::DataParse {
                    what: "terrain catalog",
                    message: format!("duplicate terrain key '{key}'"),
                });
            }
        }
        Ok(Self { terrains })
    }

    /// Parse a catalog from a RON list of [`TerrainDefinition`]s.
    pub fn from_ron_str(ron: &str) -> Result<Self> {
        let definitions: Vec<TerrainDefinition> =
            ron::from_str(ron).map_err(|e| EngineError::DataParse {
                what: "terrain catalog",
                message: e.to_string(),
            })?;
        Self::new(definitions)
    }

    /// The standard terrain table.
    #[must_use]
    pub fn builtin() -> Self {
        let terrain = |key: &str,
                       terrain_type: TerrainType,
                       density: Density,
                       move_cost: MoveCosts,
                       defense: i32,
                       acc_mod: i32,
                       blocks_los: bool| TerrainDefinition {
            key: key.to_string(),
            terrain_type,
            density,
            features: Vec::new(),
            move_cost,
            defense,
            acc_mod,
            blocks_los,
        };
        let costs = |leg, wheel, track| MoveCosts {
            leg,
            wheel,
            track,
            air: 1,
        };

        let mut road = terrain("road", TerrainType::Road, Density::Sparse, MoveCosts::uniform(1), 0, 0, false);
        road.features.push("road".to_string());
        let mut beach = terrain("beach", TerrainType::Beach, Density::Sparse, costs(2, 3, 2), 0, 0, false);
        beach.features.push("beach".to_string());

        let definitions = vec![
            terrain("plains", TerrainType::Open, Density::Sparse, MoveCosts::uniform(1), 0, 0, false),
            road,
            terrain("forest", TerrainType::Forest, Density::Dense, costs(2, 4, 3), 25, -15, true),
            terrain("hills", TerrainType::Hills, Density::Medium, costs(2, 3, 2), 15, -10, true),
            terrain("mountain", TerrainType::Mountain, Density::Dense, costs(3, IMPASSABLE, IMPASSABLE), 35, -20, true),
            terrain("urban", TerrainType::Urban, Density::Dense, costs(1, 2, 2), 30, -20, true),
            terrain("marsh", TerrainType::Marsh, Density::Medium, costs(3, IMPASSABLE, 4), 0, -5, false),
            beach,
            terrain("water", TerrainType::Water, Density::Sparse, costs(IMPASSABLE, IMPASSABLE, IMPASSABLE), 0, 0, false),
        ];

        Self {
            terrains: definitions
                .into_iter()
                .map(|definition| (definition.key.clone(), definition))
                .collect(),
        }
    }

    /// Look up a terrain definition.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&TerrainDefinition> {
        self.terrains.get(key)
    }

    /// Check if a key is defined.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.terrains.contains_key(key)
    }

    /// All keys in sorted order.
    #[must_use]
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.terrains.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    /// Number of terrain definitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.terrains.len()
    }

    /// Check if the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.terrains.is_empty()
    }
}
