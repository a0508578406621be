//! 64-bit identifiers and fixed-point values
//!
//! Decoded tiles carry tile ids, entity ids and coordinates as 64-bit integers. Depending on the
//! decoder they show up in JSON as numbers or as decimal strings, so every type here accepts
//! both and compares with exact integer equality.

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier of a map tile (partition)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TileId(pub u64);

/// Identifier of an entity inside a tile. The value 0 means "unset".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct EntityId(pub u64);

/// Fixed-point 2D coordinate (Morton code), absolute or as an XOR delta
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Coordinate2d(pub u64);

/// Elevation in centimeters from the WGS84 ellipsoid, absolute or as an XOR delta
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Elevation(pub i64);

impl EntityId {
    /// Whether the id carries a value (non-zero)
    #[inline]
    pub fn is_set(&self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_set() {
            write!(f, "{}", self.0)
        } else {
            write!(f, "Undefined")
        }
    }
}

impl FromStr for TileId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(TileId)
    }
}

/// Accepts unsigned, signed, integral float and decimal string representations
struct LongVisitor;

impl<'de> Visitor<'de> for LongVisitor {
    type Value = u64;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a 64-bit integer as a number or a decimal string")
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<u64, E> {
        Ok(value)
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<u64, E> {
        // Keep the two's complement bit pattern, XOR decoding works on bits
        Ok(value as u64)
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> Result<u64, E> {
        if value.fract() == 0.0 && value.abs() < 2f64.powi(63) {
            Ok((value as i64) as u64)
        } else {
            Err(E::invalid_value(de::Unexpected::Float(value), &self))
        }
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<u64, E> {
        let value = value.trim();
        value
            .parse::<u64>()
            .or_else(|_| value.parse::<i64>().map(|v| v as u64))
            .map_err(|_| E::invalid_value(de::Unexpected::Str(value), &self))
    }
}

macro_rules! deserialize_long {
    ($name:ident, $map:expr) => {
        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                deserializer.deserialize_any(LongVisitor).map($map)
            }
        }
    };
}

deserialize_long!(TileId, TileId);
deserialize_long!(EntityId, EntityId);
deserialize_long!(Coordinate2d, Coordinate2d);
deserialize_long!(Elevation, |v: u64| Elevation(v as i64));
