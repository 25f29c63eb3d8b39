//! HVAC temperature values, zones and vehicle property identifiers.
//!
//! Temperatures are plain `f32` degrees. The valid range for the target
//! temperature is `[MIN_TEMPERATURE, MAX_TEMPERATURE]`; [`SENTINEL`] stands in
//! for a reading that could not be taken and is never a valid value.

use crate::error::HvacError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use strum::{Display, EnumString, FromRepr};

/// Vehicle property id of the HVAC target temperature (float, per area).
pub const HVAC_TEMPERATURE_SET: i32 = 0x1560_0503;

/// Lowest settable target temperature.
pub const MIN_TEMPERATURE: f32 = 16.0;

/// Highest settable target temperature.
pub const MAX_TEMPERATURE: f32 = 32.0;

/// Reported in place of a temperature when the store could not be read.
pub const SENTINEL: f32 = -1.0;

/// Whether `value` may be applied as a target temperature.
///
/// NaN and the sentinel are never valid.
pub fn is_valid(value: f32) -> bool {
    (MIN_TEMPERATURE..=MAX_TEMPERATURE).contains(&value)
}

/// Convert a temperature to the integer shown by the picker.
///
/// Fractions are truncated toward zero, NaN maps to 0.
pub fn to_picker_value(value: f32) -> i32 {
    value as i32
}

/// Physical HVAC control point. The discriminant is the vehicle area id.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    FromRepr,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[repr(i32)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum Zone {
    /// Driver side, the primary zone
    Right = 0x44,
    /// Passenger side
    Left = 0x31,
}

impl Zone {
    /// Zone read for GET requests and the startup reading.
    pub const PRIMARY: Zone = Zone::Right;

    pub fn area_id(self) -> i32 {
        self as i32
    }

    pub fn from_area_id(area_id: i32) -> Option<Self> {
        Self::from_repr(area_id)
    }
}

/// Ordered, duplicate-free set of zones that a user edit writes to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Zone>", into = "Vec<Zone>")]
pub struct ZoneSet(Vec<Zone>);

impl ZoneSet {
    /// Only the primary zone.
    pub fn primary() -> Self {
        Self(vec![Zone::PRIMARY])
    }

    /// Primary and secondary zone, written identically.
    pub fn both() -> Self {
        Self(vec![Zone::Right, Zone::Left])
    }

    pub fn new(zones: impl IntoIterator<Item = Zone>) -> Result<Self, HvacError> {
        let mut set = Vec::new();
        for zone in zones {
            if !set.contains(&zone) {
                set.push(zone);
            }
        }
        if set.is_empty() {
            return Err(HvacError::Config("zone set must not be empty".into()));
        }
        Ok(Self(set))
    }

    pub fn iter(&self) -> impl Iterator<Item = Zone> + '_ {
        self.0.iter().copied()
    }

    pub fn contains(&self, zone: Zone) -> bool {
        self.0.contains(&zone)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl TryFrom<Vec<Zone>> for ZoneSet {
    type Error = HvacError;

    fn try_from(zones: Vec<Zone>) -> Result<Self, Self::Error> {
        Self::new(zones)
    }
}

impl From<ZoneSet> for Vec<Zone> {
    fn from(set: ZoneSet) -> Self {
        set.0
    }
}

impl FromStr for ZoneSet {
    type Err = HvacError;

    /// Parses a comma separated list such as `right,left`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let zones = s
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| {
                Zone::from_str(part)
                    .map_err(|_| HvacError::Config(format!("unknown zone '{}'", part)))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(zones)
    }
}

impl fmt::Display for ZoneSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.0.iter().map(Zone::to_string).collect();
        write!(f, "{}", names.join(","))
    }
}

/// The two shipped screen layouts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
#[serde(rename_all = "kebab-case")]
pub enum Variant {
    /// Reads the store on startup and writes the primary zone only.
    SingleZone,
    /// Starts from a fixed default, writes both zones and echoes the value in a label.
    DualZone,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_range_is_inclusive() {
        assert!(is_valid(16.0));
        assert!(is_valid(32.0));
        assert!(is_valid(21.5));
        assert!(!is_valid(15.99));
        assert!(!is_valid(32.01));
        assert!(!is_valid(SENTINEL));
        assert!(!is_valid(f32::NAN));
    }

    #[test]
    fn test_picker_value_truncates() {
        assert_eq!(to_picker_value(20.0), 20);
        assert_eq!(to_picker_value(20.9), 20);
        assert_eq!(to_picker_value(SENTINEL), -1);
        assert_eq!(to_picker_value(f32::NAN), 0);
    }

    #[test]
    fn test_zone_area_ids() {
        assert_eq!(Zone::Right.area_id(), 0x44);
        assert_eq!(Zone::Left.area_id(), 0x31);
        assert_eq!(Zone::PRIMARY, Zone::Right);
        assert_eq!(Zone::from_area_id(0x31), Some(Zone::Left));
        assert_eq!(Zone::from_area_id(0x01), None);
    }

    #[test]
    fn test_zone_set_parse() {
        let set: ZoneSet = "right, LEFT,right".parse().unwrap();
        assert_eq!(set, ZoneSet::both());
        assert_eq!(set.len(), 2);
        assert!(set.contains(Zone::Left));
        assert!(!set.is_empty());
        assert_eq!(set.to_string(), "right,left");

        assert!("".parse::<ZoneSet>().is_err());
        assert!("front".parse::<ZoneSet>().is_err());
    }

    #[test]
    fn test_zone_set_serde() {
        let json = serde_json::to_string(&ZoneSet::primary()).unwrap();
        assert_eq!(json, r#"["right"]"#);

        let parsed: ZoneSet = serde_json::from_str(r#"["left","right"]"#).unwrap();
        assert_eq!(parsed.iter().collect::<Vec<_>>(), vec![Zone::Left, Zone::Right]);

        assert!(serde_json::from_str::<ZoneSet>("[]").is_err());
    }

    #[test]
    fn test_variant_parse() {
        assert_eq!("single-zone".parse::<Variant>().unwrap(), Variant::SingleZone);
        assert_eq!("Dual-Zone".parse::<Variant>().unwrap(), Variant::DualZone);
        assert_eq!(Variant::DualZone.to_string(), "dual-zone");
    }
}
