//! Display units for measured distances.
//!
//! Tracking reports positions in meters; everything shown to the user goes
//! through [`format_distance`] so the precision and suffix stay consistent.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Conversion factor: meters to centimeters
pub const METERS_TO_CM: f32 = 100.0;

/// Conversion factor: meters to inches
pub const METERS_TO_INCHES: f32 = 39.3701;

/// Unit a session renders its distance labels in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DistanceUnit {
    #[default]
    Centimeter,
    Inch,
}

impl DistanceUnit {
    /// Parse the unit code handed over by the host.
    ///
    /// Only `"cm"` selects centimeters; any other code means inches.
    pub fn from_host_code(code: &str) -> Self {
        if code.trim() == "cm" {
            Self::Centimeter
        } else {
            Self::Inch
        }
    }

    /// Code used in config files and by [`from_host_code`](Self::from_host_code).
    pub fn host_code(self) -> &'static str {
        match self {
            Self::Centimeter => "cm",
            Self::Inch => "inch",
        }
    }

    /// Multiplier from meters into this unit.
    pub fn factor(self) -> f32 {
        match self {
            Self::Centimeter => METERS_TO_CM,
            Self::Inch => METERS_TO_INCHES,
        }
    }

    /// Convert a distance in meters to this unit.
    pub fn from_meters(self, meters: f32) -> f32 {
        meters * self.factor()
    }
}

impl std::fmt::Display for DistanceUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.host_code())
    }
}

impl Serialize for DistanceUnit {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.host_code())
    }
}

impl<'de> Deserialize<'de> for DistanceUnit {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = String::deserialize(deserializer)?;
        Ok(Self::from_host_code(&code))
    }
}

/// Render a metric distance in `unit` with two decimals, suffixed by `label`.
///
/// Callers must pass a finite, non-negative distance.
pub fn format_distance(meters: f32, unit: DistanceUnit, label: &str) -> String {
    format!("{:.2}{}", unit.from_meters(meters), label)
}
