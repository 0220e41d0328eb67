//! # Unit System
//!
//! The five AMF unit systems and conversions between them. Every factor is
//! anchored at millimeters.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AmfError;

/// A physical unit system for Document coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum UnitSystem {
    #[default]
    Millimeters,
    Meters,
    Inches,
    Feet,
    Micrometers,
}

impl UnitSystem {
    /// All unit systems, in AMF declaration order.
    pub const ALL: [UnitSystem; 5] = [
        UnitSystem::Millimeters,
        UnitSystem::Meters,
        UnitSystem::Inches,
        UnitSystem::Feet,
        UnitSystem::Micrometers,
    ];

    /// Length of one unit expressed in millimeters.
    pub fn millimeters(self) -> f64 {
        match self {
            UnitSystem::Millimeters => 1.0,
            UnitSystem::Meters => 1000.0,
            UnitSystem::Inches => 25.4,
            UnitSystem::Feet => 304.8,
            UnitSystem::Micrometers => 0.001,
        }
    }

    /// The AMF unit label (`"mm"`, `"m"`, `"in"`, `"ft"`, `"um"`).
    pub fn as_str(self) -> &'static str {
        match self {
            UnitSystem::Millimeters => "mm",
            UnitSystem::Meters => "m",
            UnitSystem::Inches => "in",
            UnitSystem::Feet => "ft",
            UnitSystem::Micrometers => "um",
        }
    }
}

impl fmt::Display for UnitSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UnitSystem {
    type Err = AmfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mm" | "millimeter" | "millimeters" => Ok(UnitSystem::Millimeters),
            "m" | "meter" | "meters" => Ok(UnitSystem::Meters),
            "in" | "inch" | "inches" => Ok(UnitSystem::Inches),
            "ft" | "foot" | "feet" => Ok(UnitSystem::Feet),
            "um" | "µm" | "micron" | "microns" | "micrometer" | "micrometers" => {
                Ok(UnitSystem::Micrometers)
            }
            other => Err(AmfError::malformed(format!("unknown unit system '{other}'"))),
        }
    }
}

/// Converts `value` from one unit system to another.
///
/// ```
/// use amf_doc::{convert_units, UnitSystem};
/// assert_eq!(convert_units(1.0, UnitSystem::Inches, UnitSystem::Millimeters), 25.4);
/// ```
pub fn convert_units(value: f64, from: UnitSystem, to: UnitSystem) -> f64 {
    if from == to {
        return value;
    }
    value * from.millimeters() / to.millimeters()
}
