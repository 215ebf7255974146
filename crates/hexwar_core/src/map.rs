//! Bounded hex map of terrain.
//!
//! Tiles are stored in offset (col, row) order and resolved against the
//! terrain catalog once at construction; lookups afterwards never touch the
//! catalog again.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{EngineError, Result};
use crate::hex::{axial_to_offset, offset_to_axial, Axial};
use crate::terrain::{TerrainCatalog, TerrainDefinition, TerrainLookup};

/// A single tile override in a map description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TilePatch {
    /// Offset column.
    pub col: i32,
    /// Offset row.
    pub row: i32,
    /// Terrain key.
    pub terrain: String,
}

/// Serializable map description: a fill terrain plus per-tile overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapSpec {
    /// Columns.
    pub width: i32,
    /// Rows.
    pub height: i32,
    /// Terrain key used for every tile not patched.
    pub fill: String,
    /// Tile overrides, applied in order.
    #[serde(default)]
    pub tiles: Vec<TilePatch>,
}

/// Bounded map with resolved terrain.
#[derive(Debug, Clone)]
pub struct HexMap {
    width: i32,
    height: i32,
    /// Distinct terrain definitions referenced by tiles.
    palette: Vec<TerrainDefinition>,
    /// Palette index per tile, stored row-major by offset coordinate.
    tiles: Vec<usize>,
}

impl HexMap {
    /// Map of `width × height` tiles all set to `fill`.
    pub fn filled(width: i32, height: i32, fill: &TerrainDefinition) -> Result<Self> {
        if width <= 0 || height <= 0 {
            return Err(EngineError::Scenario(format!(
                "map dimensions must be positive, got {width}x{height}"
            )));
        }
        Ok(Self {
            width,
            height,
            palette: vec![fill.clone()],
            tiles: vec![0; (width as usize) * (height as usize)],
        })
    }

    /// Build a map from its description, resolving every key in `catalog`.
    pub fn from_spec(spec: &MapSpec, catalog: &TerrainCatalog) -> Result<Self> {
        let fill = catalog.get(&spec.fill).ok_or_else(|| EngineError::UnknownTerrain {
            key: spec.fill.clone(),
            hex: Axial::default(),
        })?;
        let mut map = Self::filled(spec.width, spec.height, fill)?;
        for patch in &spec.tiles {
            let hex = offset_to_axial(patch.col, patch.row);
            let terrain = catalog
                .get(&patch.terrain)
                .ok_or_else(|| EngineError::UnknownTerrain {
                    key: patch.terrain.clone(),
                    hex,
                })?;
            map.set_terrain(hex, terrain)?;
        }
        debug!(
            width = map.width,
            height = map.height,
            terrains = map.palette.len(),
            "Map built"
        );
        Ok(map)
    }

    /// Number of columns.
    #[must_use]
    pub const fn width(&self) -> i32 {
        self.width
    }

    /// Number of rows.
    #[must_use]
    pub const fn height(&self) -> i32 {
        self.height
    }

    fn index(&self, hex: Axial) -> Option<usize> {
        let offset = axial_to_offset(hex.q, hex.r);
        if (0..self.width).contains(&offset.col) && (0..self.height).contains(&offset.row) {
            Some((offset.row as usize) * (self.width as usize) + offset.col as usize)
        } else {
            None
        }
    }

    /// Check if a hex lies on the map.
    #[must_use]
    pub fn in_bounds(&self, hex: Axial) -> bool {
        self.index(hex).is_some()
    }

    /// Replace the terrain of one tile.
    pub fn set_terrain(&mut self, hex: Axial, terrain: &TerrainDefinition) -> Result<()> {
        let index = self.index(hex).ok_or(EngineError::OutOfBounds(hex))?;
        let slot = match self.palette.iter().position(|t| t.key == terrain.key) {
            Some(slot) => slot,
            None => {
                self.palette.push(terrain.clone());
                self.palette.len() - 1
            }
        };
        self.tiles[index] = slot;
        Ok(())
    }

    /// Terrain key of a tile.
    #[must_use]
    pub fn terrain_key(&self, hex: Axial) -> Option<&str> {
        self.terrain_at(hex).map(|t| t.key.as_str())
    }

    /// Every hex of the map, column by column, rows ascending.
    pub fn hexes(&self) -> impl Iterator<Item = Axial> + '_ {
        (0..self.width).flat_map(move |col| (0..self.height).map(move |row| offset_to_axial(col, row)))
    }

    /// Hexes of one column, rows ascending.
    pub fn column(&self, col: i32) -> impl Iterator<Item = Axial> + '_ {
        (0..self.height).map(move |row| offset_to_axial(col, row))
    }
}

impl TerrainLookup for HexMap {
    fn terrain_at(&self, hex: Axial) -> Option<&TerrainDefinition> {
        self.index(hex).map(|index| &self.palette[self.tiles[index]])
    }
}
