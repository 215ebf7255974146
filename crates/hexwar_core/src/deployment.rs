//! Deployment zone planning.
//!
//! A zone declares a capacity, an optional set of anchor hexes and a label.
//! Planning turns that declaration into exactly `capacity` placeable hexes,
//! edge-biased and deterministic for a given map.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{EngineError, Result};
use crate::hex::{parse_hex_key, Axial};
use crate::map::HexMap;
use crate::terrain::{MoveType, TerrainLookup};
use crate::turn::Faction;

/// Label keywords that mark a zone as an amphibious landing.
const AMPHIBIOUS_KEYWORDS: [&str; 4] = ["beach", "landing", "amphib", "naval"];

/// Columns scanned before expanding to the whole map.
const AMPHIBIOUS_EDGE_COLUMNS: i32 = 4;
const LAND_EDGE_COLUMNS: i32 = 2;

/// A declared deployment zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentZone {
    /// Zone key.
    pub key: String,
    /// Display label.
    pub label: String,
    /// Longer description.
    #[serde(default)]
    pub description: String,
    /// Exact number of hexes the zone provides.
    pub capacity: usize,
    /// Owning faction.
    pub faction: Faction,
    /// Anchor hexes as `"col,row"` keys.
    #[serde(default)]
    pub anchors: Vec<String>,
}

impl DeploymentZone {
    /// Check if the label or description names a landing.
    #[must_use]
    pub fn is_amphibious(&self) -> bool {
        let text = format!("{} {}", self.label, self.description).to_ascii_lowercase();
        AMPHIBIOUS_KEYWORDS.iter().any(|keyword| text.contains(keyword))
    }
}

/// A zone resolved to concrete hexes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedZone {
    /// Zone key.
    pub key: String,
    /// Owning faction.
    pub faction: Faction,
    /// Placeable hexes in offset order.
    pub hexes: Vec<Axial>,
}

impl PlannedZone {
    /// Check if a hex belongs to the zone.
    #[must_use]
    pub fn contains(&self, hex: Axial) -> bool {
        self.hexes.contains(&hex)
    }

    /// Number of hexes; always equal to the declared capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.hexes.len()
    }
}

fn qualifies(map: &HexMap, hex: Axial, amphibious: bool) -> bool {
    let Some(terrain) = map.terrain_at(hex) else {
        return false;
    };
    if !terrain.is_passable(MoveType::Leg) || terrain.is_water() {
        return false;
    }
    if !amphibious {
        return true;
    }
    terrain.is_beach()
        || hex
            .neighbors()
            .into_iter()
            .any(|n| map.terrain_at(n).is_some_and(|t| t.is_water()))
}

/// Resolve a zone to exactly `zone.capacity` hexes.
///
/// The hexes come back in numeric offset `(col, row)` order, so `"10,0"`
/// sorts after `"9,5"` rather than in lexical hex-key order.
///
/// Returns [`EngineError::ZoneCapacityUnmet`] when the whole map holds fewer
/// qualifying hexes than the capacity, and [`EngineError::MalformedHexKey`]
/// for a bad anchor.
pub fn plan_zone_hexes(zone: &DeploymentZone, map: &HexMap) -> Result<PlannedZone> {
    let amphibious = zone.is_amphibious();

    let anchors = zone
        .anchors
        .iter()
        .map(|key| parse_hex_key(key))
        .collect::<Result<Vec<_>>>()?;
    let left_to_right = if anchors.is_empty() {
        true
    } else {
        let sum: i64 = anchors.iter().map(|a| i64::from(a.to_offset().col)).sum();
        sum * 2 <= i64::from(map.width() - 1) * anchors.len() as i64
    };

    let columns: Vec<i32> = if left_to_right {
        (0..map.width()).collect()
    } else {
        (0..map.width()).rev().collect()
    };
    let edge_columns = if amphibious {
        AMPHIBIOUS_EDGE_COLUMNS
    } else {
        LAND_EDGE_COLUMNS
    };

    let mut seen = BTreeSet::new();
    let mut picked = Vec::with_capacity(zone.capacity);
    let passes = [&columns[..columns.len().min(edge_columns as usize)], &columns[..]];
    for (pass, cols) in passes.into_iter().enumerate() {
        for &col in cols {
            for hex in map.column(col) {
                if picked.len() == zone.capacity {
                    break;
                }
                if qualifies(map, hex, amphibious) && seen.insert(hex) {
                    picked.push(hex);
                }
            }
        }
        if picked.len() == zone.capacity {
            break;
        }
        debug!(zone = %zone.key, pass, found = picked.len(), "Zone short after edge pass");
    }

    if picked.len() < zone.capacity {
        return Err(EngineError::ZoneCapacityUnmet {
            zone: zone.key.clone(),
            required: zone.capacity,
            found: picked.len(),
        });
    }

    picked.sort_by_key(|hex| hex.to_offset());
    debug!(zone = %zone.key, amphibious, left_to_right, hexes = picked.len(), "Zone planned");
    Ok(PlannedZone {
        key: zone.key.clone(),
        faction: zone.faction,
        hexes: picked,
    })
}
