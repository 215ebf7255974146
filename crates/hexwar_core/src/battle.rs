//! The battlefield: map, catalogs, roster and the shared unit primitives.
//!
//! Player commands and the bot planner both act through [`Battle`], so
//! movement and combat rules exist in exactly one place.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::combat::{
    preview_attack, resolve_attack, AttackResolution, CombatPreview, Combatant, Commander,
    Engagement, Sighting,
};
use crate::error::{EngineError, Result};
use crate::hex::{Axial, HexDirection};
use crate::map::HexMap;
use crate::movement::{reachable_hexes, Occupancy};
use crate::terrain::TerrainLookup;
use crate::turn::Faction;
use crate::units::{ScenarioUnit, UnitCatalog, UnitTypeDefinition};
use crate::visibility::{classify_target, is_visible, Observer, Spotting, Visibility};

/// Roster identifier, issued in ascending order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitId(pub u32);

/// Per-turn action flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ActionFlags {
    /// The unit moved this turn.
    pub moved: bool,
    /// The unit fired this turn.
    pub attacked: bool,
}

impl ActionFlags {
    /// Neither moved nor attacked.
    #[must_use]
    pub const fn is_idle(&self) -> bool {
        !self.moved && !self.attacked
    }
}

/// A unit on the battlefield.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleUnit {
    /// Roster id.
    pub id: UnitId,
    /// Owning faction.
    pub faction: Faction,
    /// Display label.
    pub label: String,
    /// Allocation key the unit was deployed from, for player units.
    pub allocation_key: Option<String>,
    /// Mutable state.
    pub unit: ScenarioUnit,
    /// Actions taken this turn.
    pub flags: ActionFlags,
}

/// Map, catalogs, roster and commanders.
#[derive(Debug, Clone)]
pub struct Battle {
    map: HexMap,
    catalog: UnitCatalog,
    roster: BTreeMap<UnitId, BattleUnit>,
    next_id: u32,
    player_commander: Commander,
    bot_commander: Commander,
    spotting_radius: u32,
    player_revealed: BTreeSet<Axial>,
    bot_revealed: BTreeSet<Axial>,
}

impl Battle {
    /// Empty battlefield.
    #[must_use]
    pub fn new(map: HexMap, catalog: UnitCatalog, spotting_radius: u32) -> Self {
        Self {
            map,
            catalog,
            roster: BTreeMap::new(),
            next_id: 0,
            player_commander: Commander::default(),
            bot_commander: Commander::default(),
            spotting_radius,
            player_revealed: BTreeSet::new(),
            bot_revealed: BTreeSet::new(),
        }
    }

    /// Set a faction's commander modifiers.
    pub fn set_commander(&mut self, faction: Faction, commander: Commander) {
        match faction {
            Faction::Player => self.player_commander = commander,
            Faction::Bot => self.bot_commander = commander,
        }
    }

    /// A faction's commander modifiers.
    #[must_use]
    pub const fn commander(&self, faction: Faction) -> Commander {
        match faction {
            Faction::Player => self.player_commander,
            Faction::Bot => self.bot_commander,
        }
    }

    /// The map.
    #[must_use]
    pub const fn map(&self) -> &HexMap {
        &self.map
    }

    /// The unit catalog.
    #[must_use]
    pub const fn catalog(&self) -> &UnitCatalog {
        &self.catalog
    }

    /// Replace the hexes a faction's recon flights currently reveal.
    pub fn set_revealed(&mut self, faction: Faction, hexes: BTreeSet<Axial>) {
        match faction {
            Faction::Player => self.player_revealed = hexes,
            Faction::Bot => self.bot_revealed = hexes,
        }
    }

    /// Hexes revealed to a faction by recon.
    #[must_use]
    pub const fn revealed(&self, faction: Faction) -> &BTreeSet<Axial> {
        match faction {
            Faction::Player => &self.player_revealed,
            Faction::Bot => &self.bot_revealed,
        }
    }

    /// Put a unit on the map.
    ///
    /// Fails for unknown types, hexes off the map and occupied hexes; callers
    /// that treat those as expected outcomes check first.
    pub fn spawn(
        &mut self,
        faction: Faction,
        unit: ScenarioUnit,
        label: impl Into<String>,
        allocation_key: Option<String>,
    ) -> Result<UnitId> {
        self.catalog.require(&unit.type_key)?;
        if !self.map.in_bounds(unit.hex) {
            return Err(EngineError::OutOfBounds(unit.hex));
        }
        if self.unit_at(unit.hex).is_some() {
            return Err(EngineError::Scenario(format!(
                "hex {} is already occupied",
                unit.hex
            )));
        }

        let id = UnitId(self.next_id);
        self.next_id += 1;
        debug!(?id, ?faction, type_key = %unit.type_key, hex = %unit.hex, "Unit spawned");
        self.roster.insert(
            id,
            BattleUnit {
                id,
                faction,
                label: label.into(),
                allocation_key,
                unit,
                flags: ActionFlags::default(),
            },
        );
        Ok(id)
    }

    /// Take a unit off the map.
    pub fn remove(&mut self, id: UnitId) -> Option<BattleUnit> {
        self.roster.remove(&id)
    }

    /// Look up a unit by id.
    #[must_use]
    pub fn unit(&self, id: UnitId) -> Option<&BattleUnit> {
        self.roster.get(&id)
    }

    /// Mutable access to a unit.
    pub fn unit_mut(&mut self, id: UnitId) -> Option<&mut BattleUnit> {
        self.roster.get_mut(&id)
    }

    /// The unit standing on `hex`.
    #[must_use]
    pub fn unit_at(&self, hex: Axial) -> Option<&BattleUnit> {
        self.roster.values().find(|u| u.unit.hex == hex)
    }

    /// Id of the unit on `hex`, or [`EngineError::UnitNotFound`].
    pub fn require_at(&self, hex: Axial) -> Result<UnitId> {
        self.unit_at(hex)
            .map(|u| u.id)
            .ok_or(EngineError::UnitNotFound { hex })
    }

    /// Type definition of a unit.
    pub fn unit_type(&self, id: UnitId) -> Result<&UnitTypeDefinition> {
        let unit = self.roster.get(&id).ok_or_else(|| {
            EngineError::UnknownUnitKey(format!("unit id {}", id.0))
        })?;
        self.catalog.require(&unit.unit.type_key)
    }

    /// All units in id order.
    pub fn units(&self) -> impl Iterator<Item = &BattleUnit> {
        self.roster.values()
    }

    /// A faction's units in id order.
    pub fn faction_units(&self, faction: Faction) -> impl Iterator<Item = &BattleUnit> {
        self.roster.values().filter(move |u| u.faction == faction)
    }

    /// Ids of a faction's units, in order.
    #[must_use]
    pub fn faction_ids(&self, faction: Faction) -> Vec<UnitId> {
        self.faction_units(faction).map(|u| u.id).collect()
    }

    /// Check if a faction has no units left.
    #[must_use]
    pub fn is_eliminated(&self, faction: Faction) -> bool {
        self.faction_units(faction).next().is_none()
    }

    /// Clear every unit's action flags.
    pub fn reset_flags(&mut self, faction: Faction) {
        for unit in self.roster.values_mut().filter(|u| u.faction == faction) {
            unit.flags = ActionFlags::default();
        }
    }

    /// Occupancy of `hex` as seen by a unit of `faction`.
    #[must_use]
    pub fn occupancy(&self, hex: Axial, faction: Faction) -> Occupancy {
        match self.unit_at(hex) {
            None => Occupancy::Empty,
            Some(u) if u.faction == faction => Occupancy::Friendly,
            Some(_) => Occupancy::Enemy,
        }
    }

    /// Observers contributing to a faction's picture.
    #[must_use]
    pub fn observers(&self, faction: Faction) -> Vec<Observer> {
        self.faction_units(faction)
            .filter_map(|u| {
                let unit_type = self.catalog.get(&u.unit.type_key)?;
                Some(Observer {
                    hex: u.unit.hex,
                    class: unit_type.class,
                    vision: unit_type.vision,
                })
            })
            .collect()
    }

    /// How `faction` perceives `target`.
    #[must_use]
    pub fn visibility_for(&self, faction: Faction, target: Axial) -> Visibility {
        let observers = self.observers(faction);
        let spotting = Spotting {
            radius: self.spotting_radius,
            revealed: self.revealed(faction),
        };
        classify_target(target, &observers, spotting, &self.map)
    }

    /// Movement points a unit has this turn: zero once it has moved,
    /// otherwise its budget capped by fuel.
    #[must_use]
    pub fn movement_budget(&self, id: UnitId) -> u32 {
        let Some(unit) = self.roster.get(&id) else {
            return 0;
        };
        let Some(unit_type) = self.catalog.get(&unit.unit.type_key) else {
            return 0;
        };
        if unit.flags.moved {
            return 0;
        }
        if unit_type.uses_fuel() {
            unit_type.move_budget.min(unit.unit.fuel)
        } else {
            unit_type.move_budget
        }
    }

    /// Destinations and their costs for a unit this turn.
    #[must_use]
    pub fn reachable(&self, id: UnitId) -> BTreeMap<Axial, u32> {
        let Some(unit) = self.roster.get(&id) else {
            return BTreeMap::new();
        };
        let Some(unit_type) = self.catalog.get(&unit.unit.type_key) else {
            return BTreeMap::new();
        };
        let budget = self.movement_budget(id);
        if budget == 0 {
            return BTreeMap::new();
        }
        reachable_hexes(&self.map, unit.unit.hex, unit_type.move_type, budget, |hex| {
            self.occupancy(hex, unit.faction)
        })
    }

    /// Move a unit. Returns `false` without mutation when `to` is not reachable.
    pub fn move_unit(&mut self, id: UnitId, to: Axial) -> bool {
        let Some(&cost) = self.reachable(id).get(&to) else {
            return false;
        };
        let uses_fuel = self.unit_type(id).map_or(false, UnitTypeDefinition::uses_fuel);
        let Some(unit) = self.roster.get_mut(&id) else {
            return false;
        };
        let from = unit.unit.hex;
        unit.unit.hex = to;
        unit.unit.facing = HexDirection::toward(from, to);
        unit.unit.entrench = 0;
        if uses_fuel {
            unit.unit.fuel = unit.unit.fuel.saturating_sub(cost);
        }
        unit.flags.moved = true;
        debug!(?id, %from, %to, cost, "Unit moved");
        true
    }

    fn combatant(&self, id: UnitId) -> Option<(Combatant<'_>, Faction)> {
        let unit = self.roster.get(&id)?;
        let unit_type = self.catalog.get(&unit.unit.type_key)?;
        Some((
            Combatant {
                unit: &unit.unit,
                unit_type,
                commander: self.commander(unit.faction),
                terrain: self.map.terrain_at(unit.unit.hex),
            },
            unit.faction,
        ))
    }

    fn sighting(&self, shooter: &Combatant<'_>, faction: Faction, target: Axial) -> Sighting {
        Sighting {
            line_of_sight: is_visible(
                shooter.unit.hex,
                target,
                shooter.unit_type.class,
                false,
                &self.map,
            ),
            visibility: self.visibility_for(faction, target),
        }
    }

    /// Build the engagement between two units of opposing factions.
    fn engagement(&self, attacker: UnitId, defender: UnitId) -> Option<Engagement<'_>> {
        let (attacker, attacker_faction) = self.combatant(attacker)?;
        let (defender, defender_faction) = self.combatant(defender)?;
        if attacker_faction == defender_faction {
            return None;
        }
        Some(Engagement {
            forward: self.sighting(&attacker, attacker_faction, defender.unit.hex),
            reverse: self.sighting(&defender, defender_faction, attacker.unit.hex),
            attacker,
            defender,
            intercepted: false,
        })
    }

    /// Preview an attack. `None` when the attacker already fired this turn or
    /// the attack is not possible.
    #[must_use]
    pub fn preview(&self, attacker: UnitId, defender: UnitId) -> Option<CombatPreview> {
        if self.roster.get(&attacker)?.flags.attacked {
            return None;
        }
        preview_attack(&self.engagement(attacker, defender)?)
    }

    /// Enemy hexes a unit can fire on now, in coordinate order.
    #[must_use]
    pub fn attackable_targets(&self, attacker: UnitId) -> Vec<Axial> {
        let Some(unit) = self.roster.get(&attacker) else {
            return Vec::new();
        };
        let mut targets: Vec<Axial> = self
            .faction_units(unit.faction.opponent())
            .filter(|target| self.preview(attacker, target.id).is_some())
            .map(|target| target.unit.hex)
            .collect();
        targets.sort_unstable();
        targets
    }

    /// Execute an attack and apply its outcome to the roster.
    ///
    /// Returns `None` without mutation when no preview exists. Destroyed
    /// units leave the roster.
    pub fn attack(&mut self, attacker: UnitId, defender: UnitId) -> Option<AttackResolution> {
        if self.roster.get(&attacker)?.flags.attacked {
            return None;
        }
        let resolution = resolve_attack(&self.engagement(attacker, defender)?)?;
        self.apply_fire(attacker, defender, &resolution);
        if let Some(reply) = &resolution.retaliation {
            self.apply_fire(defender, attacker, reply);
        }
        if let Some(unit) = self.roster.get_mut(&attacker) {
            unit.flags.attacked = true;
        }
        debug!(
            ?attacker,
            ?defender,
            damage = resolution.damage,
            destroyed = resolution.defender_destroyed,
            retaliated = resolution.retaliation.is_some(),
            "Attack resolved"
        );
        Some(resolution)
    }

    /// Strike the enemy unit at `target` with an aircraft of `type_key` flown
    /// by `faction`, attacking from directly above.
    ///
    /// `Ok(None)` when no enemy stands on the hex or the aircraft cannot
    /// engage it.
    pub fn air_strike(
        &mut self,
        faction: Faction,
        type_key: &str,
        target: Axial,
        intercepted: bool,
    ) -> Result<Option<AttackResolution>> {
        let aircraft_type = self.catalog.require(type_key)?;
        let Some(defender) = self.unit_at(target).filter(|u| u.faction != faction) else {
            return Ok(None);
        };
        let defender_id = defender.id;
        let defender_type = self.catalog.require(&defender.unit.type_key)?;
        let aircraft = ScenarioUnit::fresh(aircraft_type, target, HexDirection::default());
        let overhead = Sighting {
            line_of_sight: true,
            visibility: Visibility::Direct,
        };
        let engagement = Engagement {
            attacker: Combatant {
                unit: &aircraft,
                unit_type: aircraft_type,
                commander: self.commander(faction),
                terrain: self.map.terrain_at(target),
            },
            defender: Combatant {
                unit: &defender.unit,
                unit_type: defender_type,
                commander: self.commander(defender.faction),
                terrain: self.map.terrain_at(target),
            },
            forward: overhead,
            reverse: overhead,
            intercepted,
        };
        let Some(resolution) = resolve_attack(&engagement) else {
            return Ok(None);
        };

        if resolution.retaliation.is_some() {
            if let Some(unit) = self.roster.get_mut(&defender_id) {
                unit.unit.ammo = unit.unit.ammo.saturating_sub(1);
            }
        }
        self.apply_damage(defender_id, resolution.damage);
        debug!(?faction, type_key, %target, damage = resolution.damage, intercepted, "Air strike");
        Ok(Some(resolution))
    }

    /// Spend one round of ammo on the shooter and apply damage to the target.
    fn apply_fire(&mut self, shooter: UnitId, target: UnitId, fire: &AttackResolution) {
        if let Some(unit) = self.roster.get_mut(&shooter) {
            unit.unit.ammo = unit.unit.ammo.saturating_sub(1);
        }
        self.apply_damage(target, fire.damage);
    }

    /// Reduce a unit's strength, removing it at zero. Returns `true` if destroyed.
    pub fn apply_damage(&mut self, id: UnitId, damage: i32) -> bool {
        let Some(unit) = self.roster.get_mut(&id) else {
            return false;
        };
        unit.unit.strength = (unit.unit.strength - damage).max(0);
        if unit.unit.is_alive() {
            return false;
        }
        debug!(?id, hex = %unit.unit.hex, "Unit destroyed");
        self.roster.remove(&id);
        true
    }
}
