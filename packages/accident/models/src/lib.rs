#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Domain vocabulary for the accident map.
//!
//! Defines the shared enumerations used across the system: accident
//! severity, road-feature flags, daylight periods, time-bucket dimensions,
//! geographic levels, and bounding boxes. The aggregation engine and the
//! API layer both speak in these types.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Severity level of an accident, from 1 (minor) to 4 (severe).
///
/// Matches the 1-4 scale of the source dataset, where 1 indicates the
/// least impact on traffic and 4 the most significant impact.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    /// Level 1: Short delay, minimal traffic impact
    Minor = 1,
    /// Level 2: Noticeable delay
    Moderate = 2,
    /// Level 3: Long delay
    Serious = 3,
    /// Level 4: Significant impact, road closure likely
    Severe = 4,
}

impl Severity {
    /// Returns the numeric value of this severity level.
    #[must_use]
    pub const fn value(self) -> u8 {
        self as u8
    }

    /// Creates a severity level from a numeric value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not in the range 1-4.
    pub const fn from_value(value: u8) -> Result<Self, InvalidSeverityError> {
        match value {
            1 => Ok(Self::Minor),
            2 => Ok(Self::Moderate),
            3 => Ok(Self::Serious),
            4 => Ok(Self::Severe),
            _ => Err(InvalidSeverityError { value }),
        }
    }
}

/// Error returned when attempting to create a [`Severity`] from an invalid
/// numeric value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidSeverityError {
    /// The invalid severity value that was provided.
    pub value: u8,
}

impl std::fmt::Display for InvalidSeverityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid severity value {}: expected 1-4", self.value)
    }
}

impl std::error::Error for InvalidSeverityError {}

/// Boolean road-feature flags recorded per accident.
///
/// Each variant corresponds to a boolean column of the same
/// `snake_case` name on the event table.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RoadFeature {
    /// Nearby amenity (rest area, gas station).
    Amenity,
    /// Speed bump or hump.
    Bump,
    /// Pedestrian or railway crossing.
    Crossing,
    /// Give-way (yield) sign.
    GiveWay,
    /// Road junction.
    Junction,
    /// Dead end.
    NoExit,
    /// Railway present.
    Railway,
    /// Roundabout.
    Roundabout,
    /// Transit station.
    Station,
    /// Stop sign.
    Stop,
    /// Traffic-calming measure.
    TrafficCalming,
    /// Traffic signal.
    TrafficSignal,
    /// Turning loop.
    TurningLoop,
}

/// Daylight period at the time of the accident, as recorded in the
/// `sunrise_sunset` column.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum DaylightPeriod {
    /// Between sunrise and sunset.
    Day,
    /// Between sunset and sunrise.
    Night,
}

/// A single categorical feature filter: either one boolean road-feature
/// flag, or a daylight period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureFilter {
    /// Filter to accidents where the given road feature is present.
    Road(RoadFeature),
    /// Filter to accidents during the given daylight period.
    Daylight(DaylightPeriod),
}

impl std::str::FromStr for FeatureFilter {
    type Err = UnknownFeatureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(period) = s.parse::<DaylightPeriod>() {
            return Ok(Self::Daylight(period));
        }
        s.parse::<RoadFeature>()
            .map(Self::Road)
            .map_err(|_| UnknownFeatureError {
                value: s.to_string(),
            })
    }
}

/// Error returned when a feature-filter string is neither a road-feature
/// flag name nor `Day`/`Night`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownFeatureError {
    /// The unrecognized feature value.
    pub value: String,
}

impl std::fmt::Display for UnknownFeatureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown feature filter: '{}'", self.value)
    }
}

impl std::error::Error for UnknownFeatureError {}

/// A time dimension that aggregate queries can bucket on.
///
/// Each dimension has a fixed, fully-enumerable domain of bucket values;
/// dense series over a dimension cover the whole domain.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum TimeDimension {
    /// Hour of day, 0-23.
    #[serde(rename = "hour")]
    #[strum(serialize = "hour")]
    Hour,
    /// Day of week, 0 (Sunday) - 6 (Saturday).
    #[serde(rename = "day")]
    #[strum(serialize = "day")]
    DayOfWeek,
    /// Month of year, 1-12.
    #[serde(rename = "month")]
    #[strum(serialize = "month")]
    Month,
}

impl TimeDimension {
    /// The inclusive bucket domain for this dimension.
    #[must_use]
    pub const fn domain(self) -> std::ops::RangeInclusive<i32> {
        match self {
            Self::Hour => 0..=23,
            Self::DayOfWeek => 0..=6,
            Self::Month => 1..=12,
        }
    }

    /// Number of buckets in the domain (24, 7, or 12).
    #[must_use]
    pub const fn domain_len(self) -> usize {
        match self {
            Self::Hour => 24,
            Self::DayOfWeek => 7,
            Self::Month => 12,
        }
    }

    /// Returns `true` if `value` is a valid bucket for this dimension.
    #[must_use]
    pub const fn contains(self, value: i32) -> bool {
        *self.domain().start() <= value && value <= *self.domain().end()
    }
}

/// Geographic grouping levels, coarsest to finest.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum GeoLevel {
    /// Two-letter state abbreviation.
    State,
    /// County within a state.
    County,
    /// City within a county.
    City,
    /// Street within a city.
    Street,
}

/// A geographic bounding box in WGS84 coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Western longitude boundary.
    pub west: f64,
    /// Southern latitude boundary.
    pub south: f64,
    /// Eastern longitude boundary.
    pub east: f64,
    /// Northern latitude boundary.
    pub north: f64,
}

impl BoundingBox {
    /// Default bounding box for map views: the continental United States.
    pub const CONTINENTAL_US: Self = Self::new(-125.0, 24.5, -66.9, 49.5);

    /// Creates a new bounding box from the given coordinates.
    #[must_use]
    pub const fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr as _;

    use super::*;

    #[test]
    fn severity_round_trips_through_value() {
        for value in 1..=4u8 {
            let severity = Severity::from_value(value).unwrap();
            assert_eq!(severity.value(), value);
        }
    }

    #[test]
    fn rejects_out_of_range_severity() {
        assert!(Severity::from_value(0).is_err());
        assert!(Severity::from_value(5).is_err());
    }

    #[test]
    fn road_feature_parses_snake_case_column_names() {
        assert_eq!(
            "traffic_signal".parse::<RoadFeature>().unwrap(),
            RoadFeature::TrafficSignal
        );
        assert_eq!(RoadFeature::GiveWay.as_ref(), "give_way");
    }

    #[test]
    fn feature_filter_accepts_daylight_and_flags() {
        assert_eq!(
            FeatureFilter::from_str("Night").unwrap(),
            FeatureFilter::Daylight(DaylightPeriod::Night)
        );
        assert_eq!(
            FeatureFilter::from_str("crossing").unwrap(),
            FeatureFilter::Road(RoadFeature::Crossing)
        );
    }

    #[test]
    fn feature_filter_rejects_unknown_values() {
        let err = FeatureFilter::from_str("sideways").unwrap_err();
        assert_eq!(err.value, "sideways");
    }

    #[test]
    fn time_dimension_domains_are_fixed() {
        assert_eq!(TimeDimension::Hour.domain_len(), 24);
        assert_eq!(TimeDimension::DayOfWeek.domain_len(), 7);
        assert_eq!(TimeDimension::Month.domain_len(), 12);
        assert!(TimeDimension::Month.contains(1));
        assert!(!TimeDimension::Month.contains(0));
        assert!(TimeDimension::Hour.contains(23));
        assert!(!TimeDimension::Hour.contains(24));
    }

    #[test]
    fn time_dimension_parses_request_tokens() {
        assert_eq!(
            "day".parse::<TimeDimension>().unwrap(),
            TimeDimension::DayOfWeek
        );
        assert!("minute".parse::<TimeDimension>().is_err());
    }

    #[test]
    fn continental_us_bounds_are_sane() {
        let bounds = BoundingBox::CONTINENTAL_US;
        assert!(bounds.west < bounds.east);
        assert!(bounds.south < bounds.north);
    }
}
