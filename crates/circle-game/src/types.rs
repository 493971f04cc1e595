//! core game types
//!
//! addresses are 20-byte identifiers shown as 0x-prefixed hex. positions and
//! circles use u32 axes so squared distances always fit in a u128.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::error::{Error, Result};

pub use whitelist_merkle::Hash;

/// default upper bound for each position axis and circle centre
pub const MAX_AXIS: u32 = 100_000;

/// default upper bound for the winning circle radius
pub const MAX_RADIUS: u32 = 100_000;

/// 20-byte participant / authority / token / instance identifier
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address(pub [u8; 20]);

impl Address {
    pub const ZERO: Address = Address([0u8; 20]);

    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

/// `hex::FromHexError` is not `Eq`, so neither is this
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseAddressError {
    #[error("address must be 40 hex characters, got {0}")]
    Length(usize),

    #[error("address is not valid hex: {0}")]
    Hex(#[from] hex::FromHexError),
}

impl FromStr for Address {
    type Err = ParseAddressError;

    fn from_str(s: &str) -> core::result::Result<Self, Self::Err> {
        let digits = s.trim();
        let digits = digits
            .strip_prefix("0x")
            .or_else(|| digits.strip_prefix("0X"))
            .unwrap_or(digits);
        if digits.len() != 40 {
            return Err(ParseAddressError::Length(digits.len()));
        }
        let mut bytes = [0u8; 20];
        hex::decode_to_slice(digits, &mut bytes)?;
        Ok(Self(bytes))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> core::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// parse a 32-byte hash from hex, 0x prefix optional
pub fn parse_hash(s: &str) -> Option<Hash> {
    let digits = s.trim();
    let digits = digits.strip_prefix("0x").unwrap_or(digits);
    let mut out = [0u8; 32];
    hex::decode_to_slice(digits, &mut out).ok()?;
    Some(out)
}

pub fn format_hash(hash: &Hash) -> String {
    format!("0x{}", hex::encode(hash))
}

/// a participant's claimed coordinate
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: u32,
    pub y: u32,
}

impl Position {
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// target region committed by the authority
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WinningCircle {
    pub x: u32,
    pub y: u32,
    pub radius: u32,
}

impl WinningCircle {
    pub const fn new(x: u32, y: u32, radius: u32) -> Self {
        Self { x, y, radius }
    }

    pub fn center(&self) -> Position {
        Position::new(self.x, self.y)
    }
}

impl fmt::Display for WinningCircle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}) r={}", self.x, self.y, self.radius)
    }
}

/// which bound a coordinate violated
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Radius,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::X => write!(f, "x"),
            Axis::Y => write!(f, "y"),
            Axis::Radius => write!(f, "radius"),
        }
    }
}

/// game phase, derived from whether the winning circle is set
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    Entry,
    Resolved,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Entry => write!(f, "entry"),
            Phase::Resolved => write!(f, "resolved"),
        }
    }
}

/// inclusive coordinate bounds, `[1, max]` on every axis
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    pub max_axis: u32,
    pub max_radius: u32,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_axis: MAX_AXIS,
            max_radius: MAX_RADIUS,
        }
    }
}

impl Limits {
    pub fn validate(&self) -> Result<()> {
        if self.max_axis == 0 || self.max_radius == 0 {
            return Err(Error::InvalidLimits);
        }
        Ok(())
    }

    fn check(axis: Axis, value: u32, max: u32) -> Result<()> {
        if value == 0 || value > max {
            return Err(Error::CoordinateOutOfBounds { axis, value, max });
        }
        Ok(())
    }

    /// `(0, 0)` is the unset sentinel and reported as such
    pub fn check_position(&self, position: &Position) -> Result<()> {
        if position.x == 0 && position.y == 0 {
            return Err(Error::ZeroCoordinate);
        }
        Self::check(Axis::X, position.x, self.max_axis)?;
        Self::check(Axis::Y, position.y, self.max_axis)
    }

    pub fn check_circle(&self, circle: &WinningCircle) -> Result<()> {
        self.check_position(&circle.center())?;
        Self::check(Axis::Radius, circle.radius, self.max_radius)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_roundtrip_display() {
        let addr = Address([0xab; 20]);
        let shown = addr.to_string();
        assert_eq!(shown, format!("0x{}", "ab".repeat(20)));
        assert_eq!(shown.parse::<Address>().unwrap(), addr);
        assert_eq!(shown.trim_start_matches("0x").parse::<Address>().unwrap(), addr);
    }

    #[test]
    fn test_address_parse_errors() {
        assert_eq!("0x1234".parse::<Address>(), Err(ParseAddressError::Length(4)));
        assert!(matches!(
            format!("0x{}", "zz".repeat(20)).parse::<Address>(),
            Err(ParseAddressError::Hex(_))
        ));
    }

    #[test]
    fn test_zero_address() {
        assert!(Address::ZERO.is_zero());
        assert!(!Address([1; 20]).is_zero());
    }

    #[test]
    fn test_parse_hash() {
        let h = [7u8; 32];
        assert_eq!(parse_hash(&format_hash(&h)), Some(h));
        assert_eq!(parse_hash("0x07"), None);
    }

    #[test]
    fn test_position_bounds() {
        let limits = Limits::default();

        assert_eq!(limits.check_position(&Position::new(0, 0)), Err(Error::ZeroCoordinate));
        assert!(limits.check_position(&Position::new(1, 1)).is_ok());
        assert!(limits.check_position(&Position::new(MAX_AXIS, MAX_AXIS)).is_ok());

        assert_eq!(
            limits.check_position(&Position::new(0, 5)),
            Err(Error::CoordinateOutOfBounds { axis: Axis::X, value: 0, max: MAX_AXIS })
        );
        assert_eq!(
            limits.check_position(&Position::new(5, MAX_AXIS + 1)),
            Err(Error::CoordinateOutOfBounds { axis: Axis::Y, value: MAX_AXIS + 1, max: MAX_AXIS })
        );
    }

    #[test]
    fn test_circle_bounds() {
        let limits = Limits::default();

        assert!(limits.check_circle(&WinningCircle::new(50, 50, MAX_RADIUS)).is_ok());
        assert_eq!(limits.check_circle(&WinningCircle::new(0, 0, 5)), Err(Error::ZeroCoordinate));
        assert_eq!(
            limits.check_circle(&WinningCircle::new(50, 50, 0)),
            Err(Error::CoordinateOutOfBounds { axis: Axis::Radius, value: 0, max: MAX_RADIUS })
        );
        assert_eq!(
            limits.check_circle(&WinningCircle::new(50, 50, MAX_RADIUS + 1)),
            Err(Error::CoordinateOutOfBounds {
                axis: Axis::Radius,
                value: MAX_RADIUS + 1,
                max: MAX_RADIUS
            })
        );
    }

    #[test]
    fn test_limits_validate() {
        assert!(Limits::default().validate().is_ok());
        assert_eq!(Limits { max_axis: 0, max_radius: 5 }.validate(), Err(Error::InvalidLimits));
    }
}
