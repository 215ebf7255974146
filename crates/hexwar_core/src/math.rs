//! Fixed-point math utilities for deterministic combat and geometry.
//!
//! Combat figures and hex line interpolation use fixed-point arithmetic so a
//! preview computed on one machine matches the resolution computed on any
//! other, bit for bit. Floating-point results can differ between CPUs and
//! compiler settings.

use fixed::types::I32F32;

/// Fixed-point number type for all engine math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
/// Range: approximately -2,147,483,648 to 2,147,483,647
/// Precision: approximately 0.00000000023
pub type Fixed = I32F32;

/// Serde support for fixed-point numbers.
///
/// Serializes fixed-point numbers as their raw bit representation (i64)
/// to preserve exact precision across serialization boundaries.
pub mod fixed_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as its raw bit representation.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_bits().serialize(serializer)
    }

    /// Deserialize a fixed-point number from its raw bit representation.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = i64::deserialize(deserializer)?;
        Ok(Fixed::from_bits(bits))
    }
}

/// Fixed-point value of `value` percent (`percent(85)` is 0.85).
#[must_use]
pub fn percent(value: i32) -> Fixed {
    Fixed::from_num(value) / Fixed::from_num(100)
}

/// Exact ratio `numerator / denominator`, or zero for a zero denominator.
#[must_use]
pub fn ratio(numerator: i32, denominator: i32) -> Fixed {
    if denominator == 0 {
        return Fixed::ZERO;
    }
    Fixed::from_num(numerator) / Fixed::from_num(denominator)
}

/// Linearly interpolate between two fixed-point values.
#[must_use]
pub fn lerp(a: Fixed, b: Fixed, t: Fixed) -> Fixed {
    a + (b - a) * t
}

/// Round half away from zero to the nearest integer.
#[must_use]
pub fn round_to_i32(value: Fixed) -> i32 {
    value.round().to_num::<i32>()
}
