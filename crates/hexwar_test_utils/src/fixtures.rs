//! Test fixtures and helpers.
//!
//! Pre-built maps, battles, scenarios and engines for consistent testing.

use fixed::types::I32F32;
use hexwar_core::battle::{Battle, UnitId};
use hexwar_core::engine::BattleEngine;
use hexwar_core::hex::{Axial, HexDirection};
use hexwar_core::map::{HexMap, MapSpec, TilePatch};
use hexwar_core::scenario::{Scenario, UnitAllocation};
use hexwar_core::terrain::TerrainCatalog;
use hexwar_core::turn::{Faction, Phase};
use hexwar_core::units::{ScenarioUnit, UnitCatalog};
use serde::de::DeserializeOwned;
use tracing::debug;

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a fixed-point number from a float (for tests only).
///
/// Note: In real rules code, never use floats.
/// This is only for convenient test setup.
#[must_use]
pub fn fixed_f(n: f64) -> I32F32 {
    I32F32::from_num(n)
}

/// Parse any RON fixture.
///
/// # Panics
///
/// Panics if the text does not parse.
#[must_use]
pub fn from_ron<T: DeserializeOwned>(text: &str) -> T {
    match ron::from_str(text) {
        Ok(value) => value,
        Err(e) => panic!("fixture RON failed to parse: {e}"),
    }
}

/// Built-in terrain catalog.
#[must_use]
pub fn standard_terrain() -> TerrainCatalog {
    TerrainCatalog::builtin()
}

/// Built-in unit catalog.
#[must_use]
pub fn standard_units() -> UnitCatalog {
    UnitCatalog::builtin()
}

/// Plains map of the given size, with optional patches.
///
/// # Panics
///
/// Panics if a patch names unknown terrain or lies off the map.
#[must_use]
pub fn patched_map(width: i32, height: i32, tiles: Vec<TilePatch>) -> HexMap {
    let spec = MapSpec {
        width,
        height,
        fill: "plains".to_string(),
        tiles,
    };
    HexMap::from_spec(&spec, &standard_terrain()).expect("fixture map must be valid")
}

/// All-plains map of the given size.
#[must_use]
pub fn open_map(width: i32, height: i32) -> HexMap {
    patched_map(width, height, Vec::new())
}

/// Empty battle on an open map with the built-in units.
#[must_use]
pub fn open_battle(width: i32, height: i32) -> Battle {
    Battle::new(open_map(width, height), standard_units(), 2)
}

/// Spawn a fresh unit of `type_key`.
///
/// # Panics
///
/// Panics on unknown types or unavailable hexes.
pub fn spawn_unit(battle: &mut Battle, faction: Faction, type_key: &str, hex: Axial) -> UnitId {
    let unit_type = battle
        .catalog()
        .get(type_key)
        .expect("fixture unit type must exist")
        .clone();
    let facing = match faction {
        Faction::Player => HexDirection::East,
        Faction::Bot => HexDirection::West,
    };
    battle
        .spawn(faction, ScenarioUnit::fresh(&unit_type, hex, facing), type_key, None)
        .expect("fixture spawn must succeed")
}

/// A small land battle: a west player zone, three bot units, a village
/// objective, one squadron a side.
pub const SKIRMISH_RON: &str = r#"(
    name: "Skirmish at the crossroads",
    description: "Hold the village.",
    map: (
        width: 14,
        height: 8,
        fill: "plains",
        tiles: [
            (col: 6, row: 2, terrain: "forest"),
            (col: 6, row: 3, terrain: "forest"),
            (col: 7, row: 4, terrain: "hills"),
            (col: 7, row: 3, terrain: "urban"),
            (col: 4, row: 6, terrain: "marsh"),
        ],
    ),
    config: (max_turns: 6),
    zones: [
        (key: "west", label: "Western fields", capacity: 8, faction: Player, anchors: ["0,3", "1,4"]),
        (key: "east", label: "Eastern ridge", capacity: 6, faction: Bot, anchors: ["13,3"]),
    ],
    bot_units: [
        (type_key: "infantry", hex: "11,2"),
        (type_key: "tank", hex: "12,4"),
        (type_key: "artillery", hex: "13,3", label: Some("Heavy battery")),
    ],
    bot_base_camp: Some("13,4"),
    squadrons: [
        (key: "kg1", label: "Bomber wing", type_key: "bomber", faction: Player),
        (key: "jg1", label: "Fighter wing", type_key: "fighter", faction: Player),
        (key: "jg9", label: "Enemy fighters", type_key: "fighter", faction: Bot),
    ],
    objectives: [
        (key: "village", label: "Village", hex: "7,3"),
    ],
    allocations: [
        (key: "rifles", type_key: "infantry", label: "Rifle company", count: 3),
        (key: "scouts", type_key: "recon", label: "Scout troop", count: 1),
        (key: "armor", type_key: "tank", label: "Tank platoon", count: 2, experience: 1),
    ],
    queued_allocations: [
        (key: "guns", type_key: "artillery", label: "Field guns", count: 1),
    ],
)"#;

/// The skirmish scenario.
#[must_use]
pub fn skirmish_scenario() -> Scenario {
    from_ron(SKIRMISH_RON)
}

/// The skirmish scenario's player allocations.
#[must_use]
pub fn skirmish_allocations() -> Vec<UnitAllocation> {
    skirmish_scenario().allocations
}

/// Deploy every allocation of `scenario` into its player zones and finish
/// deployment, with the base camp on the first zone hex.
///
/// # Panics
///
/// Panics if any deployment step fails.
#[must_use]
pub fn deployed_engine(scenario: &Scenario) -> BattleEngine {
    let mut engine = BattleEngine::new(scenario).expect("fixture scenario must load");
    engine
        .initialize_from_allocations(scenario.allocations.clone())
        .expect("allocations");
    engine
        .set_queued_allocations(scenario.queued_allocations.clone())
        .expect("queued allocations");
    engine.begin_deployment().expect("deployment start");

    let hexes: Vec<Axial> = engine
        .zones()
        .iter()
        .filter(|z| z.faction == Faction::Player)
        .flat_map(|z| z.hexes.iter().copied())
        .collect();
    assert!(
        engine.set_base_camp(hexes[0]).expect("base camp"),
        "base camp must land in a zone"
    );

    let mut free = hexes.into_iter();
    for allocation in &scenario.allocations {
        for _ in 0..allocation.count {
            let Some(hex) = free.next() else { break };
            engine
                .deploy_unit_by_key(hex, &allocation.key)
                .expect("deploy");
        }
    }
    engine.finalize_deployment().expect("finalize");
    debug!(units = engine.player_units().len(), "Fixture engine deployed");
    assert_eq!(engine.get_turn_summary().phase, Phase::PlayerTurn);
    engine
}

/// The skirmish, fully deployed, at the start of turn 1.
#[must_use]
pub fn ready_engine() -> BattleEngine {
    deployed_engine(&skirmish_scenario())
}

/// Play one player turn: every player unit fires on its first target, then
/// the turn ends. A no-op once the battle is over.
pub fn play_turn(engine: &mut BattleEngine) {
    if engine.get_turn_summary().phase != Phase::PlayerTurn {
        return;
    }
    for unit in engine.player_units() {
        let hex = unit.unit.hex;
        let Ok(targets) = engine.get_attackable_targets(hex) else {
            continue;
        };
        if let Some(&target) = targets.first() {
            let _ = engine.attack_unit(hex, target);
        }
    }
    if engine.get_turn_summary().phase == Phase::PlayerTurn {
        let _ = engine.end_player_turn();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skirmish_parses() {
        let scenario = skirmish_scenario();
        assert_eq!(scenario.bot_units.len(), 3);
        assert_eq!(scenario.config.max_turns, 6);
        assert_eq!(scenario.allocations.len(), 3);
    }

    #[test]
    fn test_ready_engine() {
        let engine = ready_engine();
        assert_eq!(engine.player_units().len(), 6);
        assert_eq!(engine.bot_units().len(), 3);
        assert_eq!(engine.get_reserve_snapshot().len(), 1);
        assert_eq!(engine.get_turn_summary().turn_number, 1);
    }

    #[test]
    fn test_play_turn_advances() {
        let mut engine = ready_engine();
        play_turn(&mut engine);
        assert_eq!(engine.get_turn_summary().turn_number, 2);
    }

    #[test]
    fn test_open_battle_spawn() {
        let mut battle = open_battle(6, 6);
        let id = spawn_unit(&mut battle, Faction::Bot, "tank", Axial::new(2, 2));
        assert_eq!(battle.unit(id).unwrap().unit.facing, HexDirection::West);
    }
}
