//! Turn phases, idle tracking, entrenchment and the supply tick.

use std::collections::{BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::battle::{Battle, UnitId};
use crate::error::{EngineError, Result};
use crate::hex::Axial;
use crate::movement::Occupancy;
use crate::scenario::EngineConfig;
use crate::terrain::{MoveType, TerrainLookup};

/// Side of the battle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Faction {
    /// The human side.
    Player,
    /// The computer side.
    Bot,
}

impl Faction {
    /// The other side.
    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Faction::Player => Faction::Bot,
            Faction::Bot => Faction::Player,
        }
    }
}

/// Battle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Units are being placed.
    Deployment,
    /// The player issues orders.
    PlayerTurn,
    /// The bot acts.
    BotTurn,
    /// The battle is over.
    Completed,
}

impl Phase {
    /// Check if a transition to `next` moves forward.
    #[must_use]
    pub const fn can_advance_to(self, next: Phase) -> bool {
        matches!(
            (self, next),
            (Phase::Deployment, Phase::PlayerTurn)
                | (Phase::PlayerTurn, Phase::BotTurn)
                | (Phase::PlayerTurn, Phase::Completed)
                | (Phase::BotTurn, Phase::PlayerTurn)
                | (Phase::BotTurn, Phase::Completed)
        )
    }
}

/// Snapshot of the turn clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TurnSummary {
    /// Current turn, starting at 1.
    pub turn_number: u32,
    /// Side whose turn it is.
    pub active_faction: Faction,
    /// Current phase.
    pub phase: Phase,
}

/// Phase and turn counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnState {
    turn_number: u32,
    phase: Phase,
}

impl Default for TurnState {
    fn default() -> Self {
        Self::new()
    }
}

impl TurnState {
    /// Turn 1, deployment.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            turn_number: 1,
            phase: Phase::Deployment,
        }
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Current turn number.
    #[must_use]
    pub const fn turn_number(&self) -> u32 {
        self.turn_number
    }

    /// Snapshot for the presentation layer.
    #[must_use]
    pub const fn summary(&self) -> TurnSummary {
        TurnSummary {
            turn_number: self.turn_number,
            active_faction: match self.phase {
                Phase::BotTurn => Faction::Bot,
                _ => Faction::Player,
            },
            phase: self.phase,
        }
    }

    /// Reject `operation` unless the engine is in `expected`.
    pub fn require(&self, operation: &'static str, expected: Phase) -> Result<()> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(EngineError::PhaseViolation {
                operation,
                phase: self.phase,
            })
        }
    }

    /// Move to `next`; only forward transitions are accepted.
    pub fn advance(&mut self, operation: &'static str, next: Phase) -> Result<()> {
        if !self.phase.can_advance_to(next) {
            return Err(EngineError::PhaseViolation {
                operation,
                phase: self.phase,
            });
        }
        info!(turn = self.turn_number, from = ?self.phase, to = ?next, "Phase transition");
        self.phase = next;
        Ok(())
    }

    /// Increment the turn counter.
    pub fn next_turn(&mut self) {
        self.turn_number += 1;
    }
}

/// A unit cut off from its base camp during a supply tick.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutOfSupplyUnit {
    /// Roster id.
    pub id: UnitId,
    /// Position.
    pub hex: Axial,
    /// Display label.
    pub label: String,
    /// Strength after attrition.
    pub strength: i32,
}

/// Outcome of one faction's supply tick.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SupplyTickReport {
    /// Faction supplied.
    pub faction: Faction,
    /// Turn the tick ran in.
    pub turn: u32,
    /// Units resupplied from the base camp.
    pub resupplied: usize,
    /// Units that could not trace supply.
    pub out_of_supply: Vec<OutOfSupplyUnit>,
}

/// Player units that have neither moved nor attacked, in coordinate order.
#[must_use]
pub fn idle_units(battle: &Battle, faction: Faction) -> BTreeSet<Axial> {
    battle
        .faction_units(faction)
        .filter(|u| u.flags.is_idle())
        .map(|u| u.unit.hex)
        .collect()
}

/// Dig in every idle unit of `faction` by one level.
pub fn entrench_idle(battle: &mut Battle, faction: Faction, max_entrench: u8) -> usize {
    let mut dug_in = 0;
    for id in battle.faction_ids(faction) {
        if let Some(unit) = battle.unit_mut(id) {
            if unit.flags.is_idle() && unit.unit.entrench < max_entrench {
                unit.unit.entrench += 1;
                dug_in += 1;
            }
        }
    }
    debug!(?faction, dug_in, "Idle units entrenched");
    dug_in
}

/// Hexes linked to `base_camp` by at most `radius` steps over ground-passable,
/// enemy-free hexes.
#[must_use]
pub fn supply_network(battle: &Battle, faction: Faction, base_camp: Axial, radius: u32) -> BTreeSet<Axial> {
    let open = |hex: Axial| {
        battle
            .map()
            .terrain_at(hex)
            .is_some_and(|t| t.is_passable(MoveType::Leg))
            && battle.occupancy(hex, faction) != Occupancy::Enemy
    };

    let mut reached = BTreeSet::new();
    if !open(base_camp) {
        return reached;
    }
    reached.insert(base_camp);
    let mut queue = VecDeque::from([(base_camp, 0u32)]);
    while let Some((hex, steps)) = queue.pop_front() {
        if steps == radius {
            continue;
        }
        for next in hex.neighbors() {
            if !reached.contains(&next) && open(next) {
                reached.insert(next);
                queue.push_back((next, steps + 1));
            }
        }
    }
    reached
}

/// Run one faction's supply tick.
///
/// Every unit pays its fuel upkeep. Units inside the supply network regain a
/// share of ammo and fuel; the rest lose strength, never below 1. A faction
/// without a base camp draws supply from off the map.
pub fn supply_tick(
    battle: &mut Battle,
    faction: Faction,
    base_camp: Option<Axial>,
    turn: u32,
    config: &EngineConfig,
) -> SupplyTickReport {
    let network = base_camp.map(|camp| supply_network(battle, faction, camp, config.supply_radius));
    let mut report = SupplyTickReport {
        faction,
        turn,
        resupplied: 0,
        out_of_supply: Vec::new(),
    };

    for id in battle.faction_ids(faction) {
        let Ok(unit_type) = battle.unit_type(id).cloned() else {
            continue;
        };
        let Some(unit) = battle.unit_mut(id) else {
            continue;
        };
        let state = &mut unit.unit;
        state.fuel = state.fuel.saturating_sub(unit_type.fuel_upkeep);

        let in_supply = network.as_ref().map_or(true, |n| n.contains(&state.hex));
        if in_supply {
            let ammo_gain = (unit_type.max_ammo * config.resupply_percent).div_ceil(100);
            let fuel_gain = (unit_type.max_fuel * config.resupply_percent).div_ceil(100);
            state.ammo = (state.ammo + ammo_gain).min(unit_type.max_ammo);
            state.fuel = (state.fuel + fuel_gain).min(unit_type.max_fuel);
            report.resupplied += 1;
        } else {
            state.strength = (state.strength - config.attrition).max(1);
            report.out_of_supply.push(OutOfSupplyUnit {
                id,
                hex: state.hex,
                label: unit.label.clone(),
                strength: state.strength,
            });
        }
    }

    info!(
        ?faction,
        turn,
        resupplied = report.resupplied,
        out_of_supply = report.out_of_supply.len(),
        "Supply tick"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hex::{offset_to_axial, HexDirection};
    use crate::map::{HexMap, MapSpec, TilePatch};
    use crate::terrain::TerrainCatalog;
    use crate::units::{ScenarioUnit, UnitCatalog};

    fn battle(tiles: Vec<TilePatch>) -> Battle {
        let spec = MapSpec {
            width: 10,
            height: 6,
            fill: "plains".to_string(),
            tiles,
        };
        let map = HexMap::from_spec(&spec, &TerrainCatalog::builtin()).unwrap();
        Battle::new(map, UnitCatalog::builtin(), 2)
    }

    fn spawn(battle: &mut Battle, faction: Faction, key: &str, hex: Axial) -> UnitId {
        let unit_type = battle.catalog().get(key).unwrap().clone();
        battle
            .spawn(faction, ScenarioUnit::fresh(&unit_type, hex, HexDirection::East), key, None)
            .unwrap()
    }

    #[test]
    fn test_phase_forward_only() {
        let mut state = TurnState::new();
        assert_eq!(state.phase(), Phase::Deployment);
        assert!(state.advance("test", Phase::BotTurn).is_err());
        state.advance("test", Phase::PlayerTurn).unwrap();
        assert!(state.advance("test", Phase::Deployment).is_err());
        state.advance("test", Phase::BotTurn).unwrap();
        assert_eq!(state.summary().active_faction, Faction::Bot);
        state.advance("test", Phase::Completed).unwrap();
        assert!(state.advance("test", Phase::PlayerTurn).is_err());
    }

    #[test]
    fn test_require_names_operation() {
        let state = TurnState::new();
        assert_eq!(
            state.require("end_player_turn", Phase::PlayerTurn),
            Err(EngineError::PhaseViolation {
                operation: "end_player_turn",
                phase: Phase::Deployment,
            })
        );
    }

    #[test]
    fn test_idle_and_entrench() {
        let mut battle = battle(Vec::new());
        let idle = spawn(&mut battle, Faction::Player, "infantry", offset_to_axial(1, 1));
        let busy = spawn(&mut battle, Faction::Player, "infantry", offset_to_axial(2, 2));
        battle.unit_mut(busy).unwrap().flags.moved = true;

        let idle_set = idle_units(&battle, Faction::Player);
        assert_eq!(idle_set.len(), 1);
        assert!(idle_set.contains(&offset_to_axial(1, 1)));

        for _ in 0..5 {
            entrench_idle(&mut battle, Faction::Player, 3);
        }
        assert_eq!(battle.unit(idle).unwrap().unit.entrench, 3);
        assert_eq!(battle.unit(busy).unwrap().unit.entrench, 0);
    }

    #[test]
    fn test_in_supply_resupplies() {
        let mut battle = battle(Vec::new());
        let camp = offset_to_axial(0, 2);
        let tank = spawn(&mut battle, Faction::Player, "tank", offset_to_axial(2, 2));
        {
            let unit = &mut battle.unit_mut(tank).unwrap().unit;
            unit.ammo = 1;
            unit.fuel = 10;
        }
        let report = supply_tick(&mut battle, Faction::Player, Some(camp), 1, &EngineConfig::default());
        assert!(report.out_of_supply.is_empty());
        assert_eq!(report.resupplied, 1);
        let unit = &battle.unit(tank).unwrap().unit;
        // 5 × 25% rounds up to 2; fuel pays 1 upkeep then gains 8.
        assert_eq!(unit.ammo, 3);
        assert_eq!(unit.fuel, 17);
    }

    #[test]
    fn test_cut_off_unit_suffers_attrition() {
        // A river of water cuts the map in two.
        let tiles = (0..6)
            .map(|row| TilePatch {
                col: 4,
                row,
                terrain: "water".to_string(),
            })
            .collect();
        let mut battle = battle(tiles);
        let camp = offset_to_axial(0, 2);
        let stranded = spawn(&mut battle, Faction::Player, "infantry", offset_to_axial(6, 2));
        battle.unit_mut(stranded).unwrap().unit.strength = 3;

        let config = EngineConfig::default();
        let report = supply_tick(&mut battle, Faction::Player, Some(camp), 2, &config);
        assert_eq!(report.out_of_supply.len(), 1);
        assert_eq!(report.out_of_supply[0].hex, offset_to_axial(6, 2));
        assert_eq!(report.out_of_supply[0].strength, 1);

        supply_tick(&mut battle, Faction::Player, Some(camp), 3, &config);
        assert_eq!(battle.unit(stranded).unwrap().unit.strength, 1);
    }

    #[test]
    fn test_enemy_blocks_supply_line() {
        let mut battle = battle(Vec::new());
        let camp = offset_to_axial(0, 0);
        spawn(&mut battle, Faction::Bot, "infantry", camp);
        let network = supply_network(&battle, Faction::Player, camp, 5);
        assert!(network.is_empty());
        let bot_network = supply_network(&battle, Faction::Bot, camp, 1);
        assert_eq!(bot_network.len(), 3);
    }

    #[test]
    fn test_no_base_camp_means_off_map_supply() {
        let mut battle = battle(Vec::new());
        spawn(&mut battle, Faction::Bot, "infantry", offset_to_axial(9, 5));
        let report = supply_tick(&mut battle, Faction::Bot, None, 1, &EngineConfig::default());
        assert!(report.out_of_supply.is_empty());
        assert_eq!(report.resupplied, 1);
    }
}
