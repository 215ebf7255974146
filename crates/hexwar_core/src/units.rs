//! Unit type catalog and per-unit battlefield state.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::hex::{Axial, HexDirection};
use crate::terrain::MoveType;

/// Highest experience level a unit can reach.
pub const MAX_EXPERIENCE: u8 = 5;

/// Full strength of a unit, in percent.
pub const FULL_STRENGTH: i32 = 100;

/// Combat class of a unit type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum UnitClass {
    /// Foot soldiers.
    #[default]
    Infantry,
    /// Scouts with long vision.
    Recon,
    /// Light armored vehicles.
    Vehicle,
    /// Main battle tanks.
    Tank,
    /// Indirect-fire guns.
    Artillery,
    /// Air superiority aircraft.
    Fighter,
    /// Ground attack aircraft.
    Bomber,
}

impl UnitClass {
    /// Every class, in declaration order.
    pub const ALL: [UnitClass; 7] = [
        UnitClass::Infantry,
        UnitClass::Recon,
        UnitClass::Vehicle,
        UnitClass::Tank,
        UnitClass::Artillery,
        UnitClass::Fighter,
        UnitClass::Bomber,
    ];

    /// Check if this class flies.
    #[must_use]
    pub const fn is_air(self) -> bool {
        matches!(self, UnitClass::Fighter | UnitClass::Bomber)
    }

    /// Check if this class carries armor plating.
    #[must_use]
    pub const fn is_armored(self) -> bool {
        matches!(self, UnitClass::Vehicle | UnitClass::Tank)
    }
}

/// Armor values by facing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Armor {
    /// Armor facing the unit's heading (and the two adjacent hex sides).
    pub front: i32,
    /// Armor on the flanks and rear.
    pub side: i32,
    /// Armor against attacks from above.
    pub top: i32,
}

/// Immutable catalog entry for one unit type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitTypeDefinition {
    /// Catalog key.
    pub key: String,
    /// Display label.
    pub label: String,
    /// Sprite identifier for the presentation layer.
    #[serde(default)]
    pub sprite: String,
    /// Combat class.
    pub class: UnitClass,
    /// Mobility class.
    pub move_type: MoveType,
    /// Minimum firing range in hexes.
    pub range_min: u32,
    /// Maximum firing range in hexes.
    pub range_max: u32,
    /// Armor by facing.
    pub armor: Armor,
    /// Movement points per turn.
    pub move_budget: u32,
    /// Sight range in hexes.
    pub vision: u32,
    /// Shots fired at full strength.
    pub shots: u32,
    /// Base accuracy in percent, indexed by `distance - range_min`.
    pub accuracy_by_range: Vec<u32>,
    /// Armor-piercing value compared against the target's facing armor.
    pub armor_piercing: i32,
    /// Ammunition capacity.
    pub max_ammo: u32,
    /// Fuel capacity. Zero means the unit does not use fuel.
    #[serde(default)]
    pub max_fuel: u32,
    /// Fuel consumed by each supply tick.
    #[serde(default)]
    pub fuel_upkeep: u32,
    /// Can engage ground units.
    #[serde(default = "default_true")]
    pub targets_ground: bool,
    /// Can engage aircraft.
    #[serde(default)]
    pub targets_air: bool,
    /// May fire at spotted targets without its own line of sight.
    #[serde(default)]
    pub indirect_fire: bool,
    /// Turns a squadron of this type spends refitting after a mission.
    #[serde(default)]
    pub refit_turns: u32,
}

fn default_true() -> bool {
    true
}

impl UnitTypeDefinition {
    /// Check if this type may engage a target of `class`.
    #[must_use]
    pub fn can_target(&self, class: UnitClass) -> bool {
        if class.is_air() {
            self.targets_air
        } else {
            self.targets_ground
        }
    }

    /// Check if `distance` lies inside the firing band.
    #[must_use]
    pub fn in_range(&self, distance: u32) -> bool {
        (self.range_min..=self.range_max).contains(&distance)
    }

    /// Base accuracy at `distance`, using the last entry beyond the table.
    #[must_use]
    pub fn base_accuracy(&self, distance: u32) -> u32 {
        let index = distance.saturating_sub(self.range_min) as usize;
        self.accuracy_by_range
            .get(index)
            .or_else(|| self.accuracy_by_range.last())
            .copied()
            .unwrap_or(0)
    }

    /// Check if units of this type burn fuel.
    #[must_use]
    pub const fn uses_fuel(&self) -> bool {
        self.max_fuel > 0
    }
}

/// Mutable battlefield state of one unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScenarioUnit {
    /// Unit type key.
    pub type_key: String,
    /// Current position.
    pub hex: Axial,
    /// Remaining strength, 0..=100.
    pub strength: i32,
    /// Experience level, 0..=5.
    #[serde(default)]
    pub experience: u8,
    /// Remaining ammunition.
    pub ammo: u32,
    /// Remaining fuel.
    #[serde(default)]
    pub fuel: u32,
    /// Dig-in level.
    #[serde(default)]
    pub entrench: u8,
    /// Heading.
    #[serde(default)]
    pub facing: HexDirection,
}

impl ScenarioUnit {
    /// Fresh full-strength unit with full ammo and fuel.
    #[must_use]
    pub fn fresh(unit_type: &UnitTypeDefinition, hex: Axial, facing: HexDirection) -> Self {
        Self {
            type_key: unit_type.key.clone(),
            hex,
            strength: FULL_STRENGTH,
            experience: 0,
            ammo: unit_type.max_ammo,
            fuel: unit_type.max_fuel,
            entrench: 0,
            facing,
        }
    }

    /// Check if the unit is still on the battlefield.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        self.strength > 0
    }
}

/// Catalog of unit types keyed by type key.
#[derive(Debug, Clone, Default)]
pub struct UnitCatalog {
    types: HashMap<String, UnitTypeDefinition>,
}

impl UnitCatalog {
    /// Build a catalog from definitions. Duplicate keys are rejected.
    pub fn new(definitions: Vec<UnitTypeDefinition>) -> Result<Self> {
        let mut types = HashMap::with_capacity(definitions.len());
        for definition in definitions {
            if definition.range_min > definition.range_max {
                return Err(EngineError::DataParse {
                    what: "unit catalog",
                    message: format!("'{}' has range_min above range_max", definition.key),
                });
            }
            let key = definition.key.clone();
            if types.insert(key.clone(), definition).is_some() {
                return Err(EngineError::DataParse {
                    what: "unit catalog",
                    message: format!("duplicate unit type '{key}'"),
                });
            }
        }
        Ok(Self { types })
    }

    /// Parse a catalog from a RON list of [`UnitTypeDefinition`]s.
    pub fn from_ron_str(ron: &str) -> Result<Self> {
        let definitions: Vec<UnitTypeDefinition> =
            ron::from_str(ron).map_err(|e| EngineError::DataParse {
                what: "unit catalog",
                message: e.to_string(),
            })?;
        Self::new(definitions)
    }

    /// The standard unit roster.
    #[must_use]
    pub fn builtin() -> Self {
        let definitions = vec![
            UnitTypeDefinition {
                key: "infantry".to_string(),
                label: "Rifle Infantry".to_string(),
                sprite: "infantry".to_string(),
                class: UnitClass::Infantry,
                move_type: MoveType::Leg,
                range_min: 1,
                range_max: 1,
                armor: Armor { front: 0, side: 0, top: 0 },
                move_budget: 3,
                vision: 2,
                shots: 6,
                accuracy_by_range: vec![75],
                armor_piercing: 2,
                max_ammo: 8,
                max_fuel: 0,
                fuel_upkeep: 0,
                targets_ground: true,
                targets_air: false,
                indirect_fire: false,
                refit_turns: 0,
            },
            UnitTypeDefinition {
                key: "recon".to_string(),
                label: "Armored Car".to_string(),
                sprite: "recon".to_string(),
                class: UnitClass::Recon,
                move_type: MoveType::Wheel,
                range_min: 1,
                range_max: 2,
                armor: Armor { front: 2, side: 1, top: 0 },
                move_budget: 6,
                vision: 4,
                shots: 4,
                accuracy_by_range: vec![70, 50],
                armor_piercing: 3,
                max_ammo: 6,
                max_fuel: 40,
                fuel_upkeep: 1,
                targets_ground: true,
                targets_air: false,
                indirect_fire: false,
                refit_turns: 0,
            },
            UnitTypeDefinition {
                key: "halftrack".to_string(),
                label: "Flak Halftrack".to_string(),
                sprite: "halftrack".to_string(),
                class: UnitClass::Vehicle,
                move_type: MoveType::Track,
                range_min: 1,
                range_max: 2,
                armor: Armor { front: 3, side: 2, top: 1 },
                move_budget: 5,
                vision: 3,
                shots: 5,
                accuracy_by_range: vec![70, 55],
                armor_piercing: 4,
                max_ammo: 6,
                max_fuel: 40,
                fuel_upkeep: 1,
                targets_ground: true,
                targets_air: true,
                indirect_fire: false,
                refit_turns: 0,
            },
            UnitTypeDefinition {
                key: "tank".to_string(),
                label: "Medium Tank".to_string(),
                sprite: "tank".to_string(),
                class: UnitClass::Tank,
                move_type: MoveType::Track,
                range_min: 1,
                range_max: 2,
                armor: Armor { front: 9, side: 5, top: 2 },
                move_budget: 4,
                vision: 3,
                shots: 3,
                accuracy_by_range: vec![80, 60],
                armor_piercing: 9,
                max_ammo: 5,
                max_fuel: 30,
                fuel_upkeep: 1,
                targets_ground: true,
                targets_air: false,
                indirect_fire: false,
                refit_turns: 0,
            },
            UnitTypeDefinition {
                key: "artillery".to_string(),
                label: "Field Gun".to_string(),
                sprite: "artillery".to_string(),
                class: UnitClass::Artillery,
                move_type: MoveType::Wheel,
                range_min: 2,
                range_max: 4,
                armor: Armor { front: 1, side: 1, top: 0 },
                move_budget: 2,
                vision: 2,
                shots: 2,
                accuracy_by_range: vec![60, 55, 50],
                armor_piercing: 6,
                max_ammo: 4,
                max_fuel: 20,
                fuel_upkeep: 1,
                targets_ground: true,
                targets_air: false,
                indirect_fire: true,
                refit_turns: 0,
            },
            UnitTypeDefinition {
                key: "fighter".to_string(),
                label: "Fighter Squadron".to_string(),
                sprite: "fighter".to_string(),
                class: UnitClass::Fighter,
                move_type: MoveType::Air,
                range_min: 0,
                range_max: 1,
                armor: Armor { front: 1, side: 1, top: 1 },
                move_budget: 10,
                vision: 5,
                shots: 4,
                accuracy_by_range: vec![70, 70],
                armor_piercing: 4,
                max_ammo: 4,
                max_fuel: 20,
                fuel_upkeep: 2,
                targets_ground: true,
                targets_air: true,
                indirect_fire: false,
                refit_turns: 1,
            },
            UnitTypeDefinition {
                key: "bomber".to_string(),
                label: "Bomber Wing".to_string(),
                sprite: "bomber".to_string(),
                class: UnitClass::Bomber,
                move_type: MoveType::Air,
                range_min: 0,
                range_max: 1,
                armor: Armor { front: 2, side: 2, top: 2 },
                move_budget: 8,
                vision: 3,
                shots: 2,
                accuracy_by_range: vec![65, 65],
                armor_piercing: 8,
                max_ammo: 2,
                max_fuel: 20,
                fuel_upkeep: 2,
                targets_ground: true,
                targets_air: false,
                indirect_fire: false,
                refit_turns: 2,
            },
        ];

        Self {
            types: definitions
                .into_iter()
                .map(|definition| (definition.key.clone(), definition))
                .collect(),
        }
    }

    /// Look up a unit type.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&UnitTypeDefinition> {
        self.types.get(key)
    }

    /// Look up a unit type, failing with [`EngineError::UnknownUnitType`].
    pub fn require(&self, key: &str) -> Result<&UnitTypeDefinition> {
        self.get(key)
            .ok_or_else(|| EngineError::UnknownUnitType(key.to_string()))
    }

    /// All keys in sorted order.
    #[must_use]
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.types.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    /// Number of unit types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Check if the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_roster() {
        let catalog = UnitCatalog::builtin();
        assert_eq!(catalog.len(), 7);
        assert!(catalog.get("tank").is_some());
        assert!(matches!(
            catalog.require("battleship"),
            Err(EngineError::UnknownUnitType(_))
        ));
    }

    #[test]
    fn test_base_accuracy_uses_last_entry_beyond_table() {
        let catalog = UnitCatalog::builtin();
        let artillery = catalog.get("artillery").unwrap();
        assert_eq!(artillery.base_accuracy(2), 60);
        assert_eq!(artillery.base_accuracy(3), 55);
        assert_eq!(artillery.base_accuracy(4), 50);
        assert_eq!(artillery.base_accuracy(9), 50);
    }

    #[test]
    fn test_can_target() {
        let catalog = UnitCatalog::builtin();
        let tank = catalog.get("tank").unwrap();
        let flak = catalog.get("halftrack").unwrap();
        assert!(tank.can_target(UnitClass::Infantry));
        assert!(!tank.can_target(UnitClass::Bomber));
        assert!(flak.can_target(UnitClass::Fighter));
    }

    #[test]
    fn test_fresh_unit_is_fully_supplied() {
        let catalog = UnitCatalog::builtin();
        let recon = catalog.get("recon").unwrap();
        let unit = ScenarioUnit::fresh(recon, Axial::new(2, 3), HexDirection::West);
        assert_eq!(unit.strength, FULL_STRENGTH);
        assert_eq!(unit.ammo, recon.max_ammo);
        assert_eq!(unit.fuel, recon.max_fuel);
        assert!(unit.is_alive());
    }

    #[test]
    fn test_from_ron_str_defaults() {
        let ron = r#"[
            (
                key: "militia",
                label: "Militia",
                class: Infantry,
                move_type: Leg,
                range_min: 1,
                range_max: 1,
                armor: (front: 0, side: 0, top: 0),
                move_budget: 2,
                vision: 2,
                shots: 4,
                accuracy_by_range: [50],
                armor_piercing: 1,
                max_ammo: 4,
            ),
        ]"#;
        let catalog = UnitCatalog::from_ron_str(ron).unwrap();
        let militia = catalog.get("militia").unwrap();
        assert!(militia.targets_ground);
        assert!(!militia.targets_air);
        assert!(!militia.uses_fuel());
    }

    #[test]
    fn test_inverted_range_rejected() {
        let mut tank = UnitCatalog::builtin().get("tank").unwrap().clone();
        tank.range_min = 3;
        assert!(UnitCatalog::new(vec![tank]).is_err());
    }
}
