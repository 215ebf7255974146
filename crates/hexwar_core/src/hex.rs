//! Hex coordinate system (axial coordinates with an offset alias).
//!
//! Axial `(q, r)` is the engine's canonical coordinate. Offset `(col, row)`
//! uses the "odd-q" layout (odd columns shifted down half a hex) and exists
//! for map storage and UI hex keys; conversion is lossless in both
//! directions for every integer pair.
//!
//! Line drawing interpolates in fixed point so every client walks exactly
//! the same hexes between two points.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::math::{lerp, ratio, Fixed};

/// Axial hex coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Axial {
    /// Column axis.
    pub q: i32,
    /// Diagonal row axis.
    pub r: i32,
}

/// Offset hex coordinate ("odd-q" layout).
///
/// Ordering is column-major, which is the stable order deployment zones are
/// reported in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Offset {
    /// Map column.
    pub col: i32,
    /// Map row.
    pub row: i32,
}

impl Offset {
    /// Create an offset coordinate.
    #[must_use]
    pub const fn new(col: i32, row: i32) -> Self {
        Self { col, row }
    }
}

/// Convert an offset coordinate to axial.
#[must_use]
pub const fn offset_to_axial(col: i32, row: i32) -> Axial {
    Axial {
        q: col,
        r: row - (col - (col & 1)) / 2,
    }
}

/// Convert an axial coordinate to offset.
#[must_use]
pub const fn axial_to_offset(q: i32, r: i32) -> Offset {
    Offset {
        col: q,
        row: r + (q - (q & 1)) / 2,
    }
}

/// Cube distance between two axial coordinates.
#[must_use]
pub fn hex_distance(a: Axial, b: Axial) -> u32 {
    a.distance(b)
}

/// The six neighbours of a hex, in [`HexDirection::ALL`] order.
#[must_use]
pub fn neighbors(hex: Axial) -> [Axial; 6] {
    hex.neighbors()
}

/// Encode a hex as the UI key `"col,row"`.
#[must_use]
pub fn hex_key(hex: Axial) -> String {
    let offset = hex.to_offset();
    format!("{},{}", offset.col, offset.row)
}

/// Decode a `"col,row"` hex key.
pub fn parse_hex_key(key: &str) -> Result<Axial> {
    let malformed = || EngineError::MalformedHexKey(key.to_string());
    let (col, row) = key.split_once(',').ok_or_else(malformed)?;
    let col: i32 = col.trim().parse().map_err(|_| malformed())?;
    let row: i32 = row.trim().parse().map_err(|_| malformed())?;
    Ok(offset_to_axial(col, row))
}

impl Axial {
    /// Create a new axial coordinate.
    #[must_use]
    pub const fn new(q: i32, r: i32) -> Self {
        Self { q, r }
    }

    /// Cube coordinate S (derived from q and r).
    #[must_use]
    pub const fn s(&self) -> i32 {
        -self.q - self.r
    }

    /// Offset form of this coordinate.
    #[must_use]
    pub const fn to_offset(self) -> Offset {
        axial_to_offset(self.q, self.r)
    }

    /// Hex distance in steps.
    #[must_use]
    pub fn distance(self, other: Self) -> u32 {
        let dq = (self.q - other.q).unsigned_abs();
        let dr = (self.r - other.r).unsigned_abs();
        let ds = (self.s() - other.s()).unsigned_abs();
        (dq + dr + ds) / 2
    }

    /// Neighbour in a given direction.
    #[must_use]
    pub fn step(self, direction: HexDirection) -> Self {
        let (dq, dr) = direction.delta();
        Self::new(self.q + dq, self.r + dr)
    }

    /// All 6 neighbouring hexes.
    #[must_use]
    pub fn neighbors(self) -> [Axial; 6] {
        HexDirection::ALL.map(|direction| self.step(direction))
    }

    /// Hexes on the line from `self` to `other`, both ends included.
    #[must_use]
    pub fn line_to(self, other: Self) -> Vec<Axial> {
        let n = self.distance(other);
        if n == 0 {
            return vec![self];
        }

        // Nudge both endpoints off hex edges so ties round consistently.
        let nudge = Fixed::ONE / Fixed::from_num(1_000_000);
        let (aq, ar) = (Fixed::from_num(self.q) + nudge, Fixed::from_num(self.r) + nudge);
        let (bq, br) = (
            Fixed::from_num(other.q) + nudge,
            Fixed::from_num(other.r) + nudge,
        );

        let steps = n as i32;
        (0..=steps)
            .map(|i| {
                let t = ratio(i, steps);
                cube_round(lerp(aq, bq, t), lerp(ar, br, t))
            })
            .collect()
    }

    /// All hexes within `range` steps, including `self`.
    #[must_use]
    pub fn hexes_in_range(self, range: u32) -> Vec<Axial> {
        let range = range as i32;
        let mut results = Vec::new();
        for dq in -range..=range {
            for dr in (-range).max(-dq - range)..=range.min(-dq + range) {
                results.push(Axial::new(self.q + dq, self.r + dr));
            }
        }
        results
    }
}

impl fmt::Display for Axial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.q, self.r)
    }
}

/// Round a fractional axial position to the nearest hex.
fn cube_round(q: Fixed, r: Fixed) -> Axial {
    let s = -q - r;
    let mut rq = q.round();
    let mut rr = r.round();
    let rs = s.round();

    let q_diff = (rq - q).abs();
    let r_diff = (rr - r).abs();
    let s_diff = (rs - s).abs();

    if q_diff > r_diff && q_diff > s_diff {
        rq = -rr - rs;
    } else if r_diff > s_diff {
        rr = -rq - rs;
    }

    Axial::new(rq.to_num::<i32>(), rr.to_num::<i32>())
}

/// Direction a unit faces, and the six neighbour directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum HexDirection {
    /// +q
    #[default]
    East,
    /// +q -r
    NorthEast,
    /// -r
    NorthWest,
    /// -q
    West,
    /// -q +r
    SouthWest,
    /// +r
    SouthEast,
}

impl HexDirection {
    /// All directions, counter-clockwise from east.
    pub const ALL: [HexDirection; 6] = [
        HexDirection::East,
        HexDirection::NorthEast,
        HexDirection::NorthWest,
        HexDirection::West,
        HexDirection::SouthWest,
        HexDirection::SouthEast,
    ];

    /// Axial delta for one step in this direction.
    #[must_use]
    pub const fn delta(self) -> (i32, i32) {
        match self {
            HexDirection::East => (1, 0),
            HexDirection::NorthEast => (1, -1),
            HexDirection::NorthWest => (0, -1),
            HexDirection::West => (-1, 0),
            HexDirection::SouthWest => (-1, 1),
            HexDirection::SouthEast => (0, 1),
        }
    }

    /// Position in [`HexDirection::ALL`].
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            HexDirection::East => 0,
            HexDirection::NorthEast => 1,
            HexDirection::NorthWest => 2,
            HexDirection::West => 3,
            HexDirection::SouthWest => 4,
            HexDirection::SouthEast => 5,
        }
    }

    /// Get opposite direction.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            HexDirection::East => HexDirection::West,
            HexDirection::NorthEast => HexDirection::SouthWest,
            HexDirection::NorthWest => HexDirection::SouthEast,
            HexDirection::West => HexDirection::East,
            HexDirection::SouthWest => HexDirection::NorthEast,
            HexDirection::SouthEast => HexDirection::NorthWest,
        }
    }

    /// Direction of the first step from `from` that gets closest to `to`.
    ///
    /// Ties resolve in [`HexDirection::ALL`] order. Returns `East` when the
    /// two hexes coincide.
    #[must_use]
    pub fn toward(from: Axial, to: Axial) -> Self {
        let mut best = HexDirection::East;
        let mut best_distance = u32::MAX;
        for direction in Self::ALL {
            let distance = from.step(direction).distance(to);
            if distance < best_distance {
                best = direction;
                best_distance = distance;
            }
        }
        best
    }

    /// Number of 60° steps between two directions (0..=3).
    #[must_use]
    pub fn turns_between(self, other: Self) -> usize {
        let diff = (self.index() + 6 - other.index()) % 6;
        diff.min(6 - diff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_distance_same() {
        let a = Axial::new(3, -2);
        assert_eq!(hex_distance(a, a), 0);
    }

    #[test]
    fn test_hex_distance_adjacent() {
        let a = Axial::new(0, 0);
        for n in neighbors(a) {
            assert_eq!(hex_distance(a, n), 1);
        }
    }

    #[test]
    fn test_hex_distance_diagonal() {
        assert_eq!(hex_distance(Axial::new(0, 0), Axial::new(3, -3)), 3);
        assert_eq!(hex_distance(Axial::new(0, 0), Axial::new(2, 2)), 4);
    }

    #[test]
    fn test_offset_round_trip_negative_columns() {
        for col in -5..5 {
            for row in -5..5 {
                let axial = offset_to_axial(col, row);
                assert_eq!(axial_to_offset(axial.q, axial.r), Offset::new(col, row));
            }
        }
    }

    #[test]
    fn test_odd_column_shift() {
        // Column 1 is shifted down: offset (1, 0) sits between rows 0 and 1 of column 0.
        assert_eq!(offset_to_axial(1, 0), Axial::new(1, 0));
        assert_eq!(offset_to_axial(2, 0), Axial::new(2, -1));
        assert_eq!(offset_to_axial(3, 1), Axial::new(3, 0));
    }

    #[test]
    fn test_hex_key_round_trip() {
        let hex = offset_to_axial(7, 12);
        assert_eq!(hex_key(hex), "7,12");
        assert_eq!(parse_hex_key("7,12").unwrap(), hex);
        assert_eq!(parse_hex_key(" 7 , 12 ").unwrap(), hex);
    }

    #[test]
    fn test_malformed_hex_key() {
        assert!(matches!(
            parse_hex_key("7;12"),
            Err(EngineError::MalformedHexKey(_))
        ));
        assert!(parse_hex_key("a,b").is_err());
        assert!(parse_hex_key("").is_err());
    }

    #[test]
    fn test_hex_line_straight() {
        let line = Axial::new(0, 0).line_to(Axial::new(3, 0));
        assert_eq!(
            line,
            vec![
                Axial::new(0, 0),
                Axial::new(1, 0),
                Axial::new(2, 0),
                Axial::new(3, 0)
            ]
        );
    }

    #[test]
    fn test_hex_line_is_contiguous() {
        let a = Axial::new(-2, 5);
        let b = Axial::new(6, -3);
        let line = a.line_to(b);
        assert_eq!(line.len() as u32, hex_distance(a, b) + 1);
        assert_eq!(line.first(), Some(&a));
        assert_eq!(line.last(), Some(&b));
        for pair in line.windows(2) {
            assert_eq!(pair[0].distance(pair[1]), 1);
        }
    }

    #[test]
    fn test_hexes_in_range() {
        let center = Axial::new(4, 4);
        assert_eq!(center.hexes_in_range(0), vec![center]);
        assert_eq!(center.hexes_in_range(1).len(), 7);
        assert_eq!(center.hexes_in_range(2).len(), 19);
    }

    #[test]
    fn test_direction_opposite_and_toward() {
        assert_eq!(HexDirection::East.opposite(), HexDirection::West);
        let origin = Axial::new(0, 0);
        for direction in HexDirection::ALL {
            let far = origin.step(direction).step(direction).step(direction);
            assert_eq!(HexDirection::toward(origin, far), direction);
        }
    }

    #[test]
    fn test_turns_between() {
        assert_eq!(HexDirection::East.turns_between(HexDirection::East), 0);
        assert_eq!(HexDirection::East.turns_between(HexDirection::NorthEast), 1);
        assert_eq!(HexDirection::East.turns_between(HexDirection::SouthEast), 1);
        assert_eq!(HexDirection::East.turns_between(HexDirection::West), 3);
    }
}
