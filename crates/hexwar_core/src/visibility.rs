//! Line of sight and faction-wide target classification.
//!
//! Direct sight walks the hex line between two points and fails on any
//! intermediate LOS-blocking tile. Classification combines every friendly
//! observer: a target nobody sees directly may still be spotted through
//! proximity or air reconnaissance.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::hex::Axial;
use crate::terrain::TerrainLookup;
use crate::units::UnitClass;

/// How a faction perceives a target hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Visibility {
    /// At least one friendly unit has unobstructed sight within its vision range.
    Direct,
    /// Detected indirectly (adjacent spotters or recon), nobody sees it directly.
    SpottedOnly,
    /// Not detected at all.
    Hidden,
}

impl Visibility {
    /// Check if the target is known to the faction at all.
    #[must_use]
    pub const fn is_detected(self) -> bool {
        !matches!(self, Visibility::Hidden)
    }
}

/// A friendly unit contributing to a faction's picture of the battlefield.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observer {
    /// Observer position.
    pub hex: Axial,
    /// Observer class.
    pub class: UnitClass,
    /// Sight range in hexes.
    pub vision: u32,
}

/// Indirect detection sources for a faction.
#[derive(Debug, Clone, Copy)]
pub struct Spotting<'a> {
    /// Targets within this many hexes of any friendly unit are spotted.
    pub radius: u32,
    /// Hexes currently revealed by friendly recon flights.
    pub revealed: &'a BTreeSet<Axial>,
}

/// Check for unobstructed sight from `attacker_hex` to `target_hex`.
///
/// Endpoints never block; tiles off the map never block. Airborne attackers
/// ignore ground blockers.
#[must_use]
pub fn is_visible<T: TerrainLookup + ?Sized>(
    attacker_hex: Axial,
    target_hex: Axial,
    attacker_class: UnitClass,
    is_attacker_air: bool,
    terrain: &T,
) -> bool {
    if is_attacker_air || attacker_class.is_air() {
        return true;
    }
    let line = attacker_hex.line_to(target_hex);
    if line.len() <= 2 {
        return true;
    }
    !line[1..line.len() - 1]
        .iter()
        .any(|&hex| terrain.terrain_at(hex).is_some_and(|t| t.blocks_los))
}

/// Classify how a faction sees `target` given all its observers.
#[must_use]
pub fn classify_target<T: TerrainLookup + ?Sized>(
    target: Axial,
    observers: &[Observer],
    spotting: Spotting<'_>,
    terrain: &T,
) -> Visibility {
    let direct = observers.iter().any(|observer| {
        observer.hex.distance(target) <= observer.vision
            && is_visible(observer.hex, target, observer.class, false, terrain)
    });
    if direct {
        return Visibility::Direct;
    }

    let near_spotter = observers
        .iter()
        .any(|observer| observer.hex.distance(target) <= spotting.radius);
    if near_spotter || spotting.revealed.contains(&target) {
        Visibility::SpottedOnly
    } else {
        Visibility::Hidden
    }
}

/// Hexes one observer sees directly, in coordinate order.
#[must_use]
pub fn visible_hexes<T: TerrainLookup + ?Sized>(observer: &Observer, terrain: &T) -> Vec<Axial> {
    let mut hexes: Vec<Axial> = observer
        .hex
        .hexes_in_range(observer.vision)
        .into_iter()
        .filter(|&hex| terrain.terrain_at(hex).is_some())
        .filter(|&hex| is_visible(observer.hex, hex, observer.class, false, terrain))
        .collect();
    hexes.sort_unstable();
    hexes
}
