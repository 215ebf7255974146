//! Reachable-hex search over terrain movement costs.
//!
//! Dijkstra over the hex grid with a deterministic frontier: equal costs pop
//! in coordinate order, so the same board always yields the same answer.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap};

use crate::hex::Axial;
use crate::terrain::{MoveType, TerrainLookup, IMPASSABLE};

/// Who stands on a hex, relative to the moving unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occupancy {
    /// Nobody.
    Empty,
    /// A unit of the mover's faction: may be crossed, not entered as a destination.
    Friendly,
    /// An enemy unit: blocks movement.
    Enemy,
}

/// Cost of entering `hex`, or `None` when it is off the map or impassable.
#[must_use]
pub fn step_cost<T: TerrainLookup + ?Sized>(terrain: &T, hex: Axial, move_type: MoveType) -> Option<u32> {
    let cost = terrain.terrain_at(hex)?.move_cost.cost(move_type);
    (cost < IMPASSABLE).then_some(cost)
}

/// Destinations reachable from `start` within `budget` movement points,
/// with the cheapest cost of each. The start hex is not included.
pub fn reachable_hexes<T, F>(
    terrain: &T,
    start: Axial,
    move_type: MoveType,
    budget: u32,
    occupancy: F,
) -> BTreeMap<Axial, u32>
where
    T: TerrainLookup + ?Sized,
    F: Fn(Axial) -> Occupancy,
{
    let mut best: BTreeMap<Axial, u32> = BTreeMap::new();
    let mut frontier = BinaryHeap::new();
    best.insert(start, 0);
    frontier.push(Reverse((0u32, start)));

    while let Some(Reverse((cost, hex))) = frontier.pop() {
        if best.get(&hex).is_some_and(|&known| known < cost) {
            continue;
        }
        for next in hex.neighbors() {
            let Some(step) = step_cost(terrain, next, move_type) else {
                continue;
            };
            if occupancy(next) == Occupancy::Enemy {
                continue;
            }
            let total = cost + step;
            if total > budget {
                continue;
            }
            if best.get(&next).map_or(true, |&known| total < known) {
                best.insert(next, total);
                frontier.push(Reverse((total, next)));
            }
        }
    }

    best.remove(&start);
    best.retain(|&hex, _| occupancy(hex) == Occupancy::Empty);
    best
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::terrain::{TerrainCatalog, TerrainDefinition};

    fn field(width: i32, height: i32, overrides: &[(Axial, &str)]) -> HashMap<Axial, TerrainDefinition> {
        let catalog = TerrainCatalog::builtin();
        let mut terrain = HashMap::new();
        for q in 0..width {
            for r in 0..height {
                terrain.insert(Axial::new(q, r), catalog.get("plains").unwrap().clone());
            }
        }
        for (hex, key) in overrides {
            terrain.insert(*hex, catalog.get(key).unwrap().clone());
        }
        terrain
    }

    #[test]
    fn test_budget_limits_reach() {
        let terrain = field(8, 8, &[]);
        let reach = reachable_hexes(&terrain, Axial::new(3, 3), MoveType::Leg, 1, |_| Occupancy::Empty);
        assert_eq!(reach.len(), 6);
        assert!(reach.values().all(|&cost| cost == 1));
        assert!(!reach.contains_key(&Axial::new(3, 3)));
    }

    #[test]
    fn test_costly_terrain() {
        let terrain = field(8, 1, &[(Axial::new(1, 0), "forest")]);
        let reach = reachable_hexes(&terrain, Axial::new(0, 0), MoveType::Wheel, 4, |_| Occupancy::Empty);
        assert_eq!(reach.get(&Axial::new(1, 0)), Some(&4));
        assert!(!reach.contains_key(&Axial::new(2, 0)));
    }

    #[test]
    fn test_impassable_blocks() {
        let terrain = field(5, 1, &[(Axial::new(1, 0), "water")]);
        let reach = reachable_hexes(&terrain, Axial::new(0, 0), MoveType::Track, 10, |_| Occupancy::Empty);
        assert!(reach.is_empty());
    }

    #[test]
    fn test_friendly_crossed_enemy_blocks() {
        let terrain = field(5, 1, &[]);
        let friendly = Axial::new(1, 0);
        let reach = reachable_hexes(&terrain, Axial::new(0, 0), MoveType::Leg, 3, |hex| {
            if hex == friendly {
                Occupancy::Friendly
            } else {
                Occupancy::Empty
            }
        });
        assert!(!reach.contains_key(&friendly));
        assert_eq!(reach.get(&Axial::new(2, 0)), Some(&2));

        let reach = reachable_hexes(&terrain, Axial::new(0, 0), MoveType::Leg, 3, |hex| {
            if hex == friendly {
                Occupancy::Enemy
            } else {
                Occupancy::Empty
            }
        });
        assert!(reach.is_empty());
    }
}
