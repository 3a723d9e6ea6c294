#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Aggregation result types for the analytics engine.
//!
//! These are the shapes the query planner produces from sparse store rows:
//! dense time series, geographic breakdowns, map point samples, and summary
//! statistics. They are serialized to JSON by the server layer.

use accident_map_accident_models::TimeDimension;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One sparse row of a time-bucket aggregation, as returned by the store.
///
/// Buckets absent from the store result are simply missing; the
/// normalizer fills them in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SparseBucket {
    /// Bucket value along the grouped dimension.
    pub bucket: i32,
    /// Accident count in this bucket.
    pub count: u64,
    /// Distinct cities touched by this bucket, when requested.
    pub cities: Option<Vec<String>>,
}

/// One bucket of a dense series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesBucket {
    /// Bucket value along the grouped dimension.
    pub value: i32,
    /// Accident count (0 for buckets absent from the store result).
    pub count: u64,
    /// Distinct cities touched by this bucket; empty unless city
    /// collections were requested, and empty for zero-filled buckets.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub cities: Vec<String>,
}

/// A complete, zero-filled series over a time dimension's fixed domain.
///
/// Always exactly `dimension.domain_len()` buckets, ascending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DenseSeries {
    /// The grouped dimension.
    pub dimension: TimeDimension,
    /// One entry per domain value, ascending, no gaps.
    pub buckets: Vec<SeriesBucket>,
}

impl DenseSeries {
    /// Sum of counts across all buckets.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.buckets.iter().map(|b| b.count).sum()
    }
}

/// One row of a geographic breakdown (top states, counties, cities, or
/// streets), ordered by count descending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaCount {
    /// Geographic unit name.
    pub name: String,
    /// Accident count over the full filtered set.
    pub accidents: u64,
    /// Average severity over the full filtered set, rounded to 2 decimals.
    pub avg_severity: f64,
}

/// An accident row as returned by the paginated listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccidentRow {
    /// Primary key.
    pub id: i64,
    /// Severity 1-4.
    pub severity: u8,
    /// When the accident started.
    pub start_time: NaiveDateTime,
    /// State abbreviation.
    pub state: Option<String>,
    /// County name.
    pub county: Option<String>,
    /// City name.
    pub city: Option<String>,
    /// Street name.
    pub street: Option<String>,
    /// Start latitude.
    pub start_lat: Option<f64>,
    /// Start longitude.
    pub start_lng: Option<f64>,
    /// Weather condition at the time.
    pub weather_condition: Option<String>,
    /// `Day` or `Night`.
    pub sunrise_sunset: Option<String>,
}

/// A page of accident rows plus the total match count from the
/// independent count query over the same predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct PagedAccidents {
    /// The requested page of rows.
    pub rows: Vec<AccidentRow>,
    /// Total rows matching the filter, ignoring pagination.
    pub total: u64,
}

/// A single raw event point for the national map view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccidentPoint {
    /// Latitude.
    pub lat: f64,
    /// Longitude.
    pub lng: f64,
    /// Severity 1-4.
    pub severity: u8,
    /// State abbreviation.
    pub state: Option<String>,
    /// Weather condition at the time.
    pub weather_condition: Option<String>,
}

/// A per-county aggregate for the state map view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountyAggregate {
    /// County name.
    pub county: String,
    /// Accident count in the county.
    pub total_accidents: u64,
    /// Average severity, rounded to 2 decimals.
    pub avg_severity: f64,
    /// Centroid latitude (mean of member coordinates).
    pub lat: Option<f64>,
    /// Centroid longitude (mean of member coordinates).
    pub lng: Option<f64>,
    /// Distinct weather conditions observed in the county.
    pub weather_conditions: Vec<String>,
}

/// Map points in one of the two sampler modes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MapPoints {
    /// Per-county aggregates (a state or finer scope is selected).
    Counties(Vec<CountyAggregate>),
    /// Individual points, severity-descending, truncated (national view).
    ///
    /// The truncation deliberately biases the sample toward
    /// higher-severity events.
    Raw(Vec<AccidentPoint>),
}

impl MapPoints {
    /// Number of point entries.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Counties(counties) => counties.len(),
            Self::Raw(points) => points.len(),
        }
    }

    /// Whether there are no point entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Summary statistics over the full filtered population, independent of
/// any truncation applied to the point sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapSummary {
    /// Total matching accidents.
    pub total_accidents: u64,
    /// Average severity, rounded to 2 decimals.
    pub avg_severity: f64,
    /// Distinct states represented.
    pub states_affected: u64,
    /// Distinct counties represented.
    pub counties_affected: u64,
    /// Modal weather condition.
    pub common_weather: Option<String>,
    /// Distinct years represented.
    pub years_count: u64,
    /// Distinct months represented.
    pub months_count: u64,
    /// Distinct days represented.
    pub days_count: u64,
}

/// One year/month cell of the map view's time distribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyCount {
    /// Calendar year.
    pub year: i32,
    /// Month 1-12.
    pub month: i32,
    /// Accident count.
    pub count: u64,
    /// Average severity, rounded to 2 decimals.
    pub avg_severity: f64,
}

/// Full result of a map-data request.
#[derive(Debug, Clone, PartialEq)]
pub struct MapData {
    /// Point data in the selected sampler mode.
    pub points: MapPoints,
    /// Whole-population summary.
    pub summary: MapSummary,
    /// Year/month distribution, ascending (sparse; year/month is not a
    /// fixed domain).
    pub time_distribution: Vec<MonthlyCount>,
}

/// Min/max coordinate bounds of a group of accidents.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoBounds {
    /// Minimum latitude.
    pub min_lat: f64,
    /// Maximum latitude.
    pub max_lat: f64,
    /// Minimum longitude.
    pub min_lng: f64,
    /// Maximum longitude.
    pub max_lng: f64,
}

/// Per-county statistics for the state-detail view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountyDetail {
    /// County name.
    pub name: String,
    /// Accident count.
    pub accident_count: u64,
    /// Average severity, rounded to 2 decimals.
    pub avg_severity: f64,
    /// Distinct cities in the county, ascending.
    pub cities: Vec<String>,
    /// Modal weather condition.
    pub common_weather: Option<String>,
    /// Coordinate bounds, when any member has coordinates.
    pub bounds: Option<GeoBounds>,
    /// Share of the state total, `100 * count / total`, rounded to 2
    /// decimals; 0 when the total is 0.
    pub percentage_of_total: f64,
}

/// Whole-state summary for the state-detail view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSummary {
    /// Total matching accidents.
    pub total_accidents: u64,
    /// Average severity, rounded to 2 decimals.
    pub avg_severity: f64,
    /// Distinct counties represented.
    pub counties_affected: u64,
    /// Modal weather condition.
    pub common_weather: Option<String>,
    /// Distinct weather conditions observed.
    pub weather_conditions: Vec<String>,
    /// Coordinate bounds of the filtered set.
    pub bounds: Option<GeoBounds>,
}

/// Full result of a state-detail request.
#[derive(Debug, Clone, PartialEq)]
pub struct StateDetails {
    /// Per-county rows, ordered by count descending.
    pub counties: Vec<CountyDetail>,
    /// Whole-state summary.
    pub summary: StateSummary,
}

/// Per-year totals for the temporal summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearSummary {
    /// Calendar year.
    pub year: i32,
    /// Accident count.
    pub total_accidents: u64,
    /// Average severity, rounded to 2 decimals.
    pub avg_severity: f64,
}

/// Per-month totals for the temporal summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthSummary {
    /// Month 1-12.
    pub month: i32,
    /// Accident count.
    pub total_accidents: u64,
    /// Average severity, rounded to 2 decimals.
    pub avg_severity: f64,
}

/// Unfiltered yearly and monthly totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemporalSummary {
    /// Per-year rows, ascending.
    pub yearly: Vec<YearSummary>,
    /// Per-month rows, ascending.
    pub monthly: Vec<MonthSummary>,
}

/// Per-weather-condition statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherSummary {
    /// Weather condition name.
    pub weather_condition: String,
    /// Accident count.
    pub total_accidents: u64,
    /// Average severity, rounded to 2 decimals.
    pub avg_severity: f64,
    /// Average temperature in Fahrenheit.
    pub avg_temperature: Option<f64>,
    /// Average visibility in miles.
    pub avg_visibility: Option<f64>,
}
