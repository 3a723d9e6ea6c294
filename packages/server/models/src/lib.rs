#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the accident map server.
//!
//! These types are serialized to JSON for the REST API. They are separate
//! from the aggregation result types to allow independent evolution of the
//! API contract.

use accident_map_analytics_models::{
    AccidentRow, CountyDetail, DenseSeries, MapPoints, MapSummary, MonthlyCount, StateDetails,
    StateSummary,
};
use accident_map_filter::{EffectiveFilters, Pagination, RawFilter};
use geojson::{Feature, FeatureCollection, Geometry, Value};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Query parameters shared by every filtered endpoint.
///
/// One struct serves all endpoints; each endpoint reads the subset it
/// needs and validates required fields at the boundary. List-valued
/// fields are comma-separated.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterQueryParams {
    /// Two-letter state abbreviation.
    pub state: Option<String>,
    /// County name.
    pub county: Option<String>,
    /// City name.
    pub city: Option<String>,
    /// Street name.
    pub street: Option<String>,
    /// Comma-separated years.
    pub years: Option<String>,
    /// Comma-separated months (1-12).
    pub months: Option<String>,
    /// Comma-separated days of week (0-6).
    pub days: Option<String>,
    /// Comma-separated hours (0-23).
    pub hours: Option<String>,
    /// Road-feature flag name, or `Day`/`Night`.
    pub feature: Option<String>,
    /// Exact severity (1-4).
    pub severity: Option<u8>,
    /// Exact weather-condition string.
    pub weather: Option<String>,
    /// Bounding box as `west,south,east,north`.
    pub bbox: Option<String>,
    /// 1-based page number.
    pub page: Option<u32>,
    /// Rows per page.
    pub per_page: Option<u32>,
    /// Time dimension: `hour`, `day`, or `month`.
    pub time_type: Option<String>,
    /// First bucket of a chart selection, inclusive.
    pub start_time: Option<i32>,
    /// Last bucket of a chart selection, inclusive.
    pub end_time: Option<i32>,
    /// Geographic level for breakdowns: `state`, `county`, `city`,
    /// or `street`.
    pub view_type: Option<String>,
    /// Whether time-series buckets should carry distinct city lists.
    pub include_cities: Option<bool>,
}

impl FilterQueryParams {
    /// Borrows the filter-relevant fields for [`FilterSpec`] parsing.
    ///
    /// [`FilterSpec`]: accident_map_filter::FilterSpec
    #[must_use]
    pub fn raw(&self) -> RawFilter<'_> {
        RawFilter {
            state: self.state.as_deref(),
            county: self.county.as_deref(),
            city: self.city.as_deref(),
            street: self.street.as_deref(),
            years: self.years.as_deref(),
            months: self.months.as_deref(),
            days: self.days.as_deref(),
            hours: self.hours.as_deref(),
            feature: self.feature.as_deref(),
            severity: self.severity,
            weather: self.weather.as_deref(),
            bbox: self.bbox.as_deref(),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealth {
    /// Whether the service is healthy.
    pub healthy: bool,
    /// Service version.
    pub version: String,
}

/// Envelope for paginated flat queries.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedResponse {
    /// The requested page of rows.
    pub data: Vec<AccidentRow>,
    /// Total rows matching the filter, from the independent count query.
    pub total: u64,
    /// 1-based page number.
    pub page: u32,
    /// Rows per page.
    pub per_page: u32,
    /// `ceil(total / perPage)`.
    pub total_pages: u64,
}

impl PagedResponse {
    /// Assembles the envelope from a page of rows and its pagination.
    #[must_use]
    pub fn new(data: Vec<AccidentRow>, total: u64, pagination: Pagination) -> Self {
        Self {
            data,
            total,
            page: pagination.page(),
            per_page: pagination.per_page(),
            total_pages: pagination.total_pages(total),
        }
    }
}

/// Dense series reshaped into the parallel arrays the charts consume.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesBody {
    /// Bucket values, ascending, covering the whole domain.
    pub time_values: Vec<i32>,
    /// Count per bucket, parallel to `timeValues`.
    pub accident_counts: Vec<u64>,
    /// Distinct cities per bucket, parallel to `timeValues`; omitted
    /// unless city collections were requested.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub city_lists: Vec<Vec<String>>,
}

impl SeriesBody {
    /// Flattens a dense series into parallel arrays.
    #[must_use]
    pub fn from_series(series: &DenseSeries, include_cities: bool) -> Self {
        Self {
            time_values: series.buckets.iter().map(|b| b.value).collect(),
            accident_counts: series.buckets.iter().map(|b| b.count).collect(),
            city_lists: if include_cities {
                series.buckets.iter().map(|b| b.cities.clone()).collect()
            } else {
                Vec::new()
            },
        }
    }
}

/// Response body for the county time-analysis endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeAnalysisResponse {
    /// Always `true`; error responses use the error body instead.
    pub success: bool,
    /// The dense series.
    pub data: SeriesBody,
    /// Echo of the request scope and the filters actually applied.
    pub metadata: TimeAnalysisMetadata,
}

/// Metadata echoed with a time-analysis response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeAnalysisMetadata {
    /// County the series was computed for.
    pub county: String,
    /// State the series was computed for.
    pub state: String,
    /// The grouped dimension (`hour`, `day`, or `month`).
    pub time_type: String,
    /// Filters actually applied, after same-dimension suppression.
    pub filters: EffectiveFilters,
}

/// Response body for the map-data endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapDataResponse {
    /// County aggregates or raw points, depending on scope.
    pub points: MapPoints,
    /// Whole-population summary, independent of point truncation.
    pub summary: MapSummary,
    /// Year/month distribution.
    pub time_distribution: Vec<MonthlyCount>,
    /// Echo of the request scope.
    pub metadata: MapMetadata,
}

/// Metadata echoed with a map-data response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapMetadata {
    /// Number of point entries returned (after any truncation).
    pub total_points: usize,
    /// State scope, if one was selected.
    pub state: Option<String>,
    /// Filters actually applied.
    pub filters: EffectiveFilters,
}

/// Response body for the state-details endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateDetailsResponse {
    /// Counties as a GeoJSON feature collection of bounding-box polygons.
    pub geojson: FeatureCollection,
    /// Whole-state summary.
    pub summary: StateSummary,
}

impl StateDetailsResponse {
    /// Shapes state details into the GeoJSON form the map layer consumes.
    #[must_use]
    pub fn from_details(details: StateDetails) -> Self {
        let features = details.counties.iter().map(county_feature).collect();
        Self {
            geojson: FeatureCollection {
                bbox: None,
                features,
                foreign_members: None,
            },
            summary: details.summary,
        }
    }
}

/// Builds one GeoJSON feature for a county: its statistics as properties
/// and its coordinate bounds as a rectangular polygon. Counties with no
/// located accidents get a null geometry.
fn county_feature(county: &CountyDetail) -> Feature {
    let mut properties = serde_json::Map::new();
    properties.insert("name".to_string(), json!(county.name));
    properties.insert("accidentCount".to_string(), json!(county.accident_count));
    properties.insert("avgSeverity".to_string(), json!(county.avg_severity));
    properties.insert("cities".to_string(), json!(county.cities));
    properties.insert("commonWeather".to_string(), json!(county.common_weather));
    properties.insert(
        "percentageOfTotal".to_string(),
        json!(county.percentage_of_total),
    );

    let geometry = county.bounds.map(|bounds| {
        Geometry::new(Value::Polygon(vec![vec![
            vec![bounds.min_lng, bounds.min_lat],
            vec![bounds.min_lng, bounds.max_lat],
            vec![bounds.max_lng, bounds.max_lat],
            vec![bounds.max_lng, bounds.min_lat],
            vec![bounds.min_lng, bounds.min_lat],
        ]]))
    });

    Feature {
        bbox: None,
        geometry,
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

#[cfg(test)]
mod tests {
    use accident_map_accident_models::TimeDimension;
    use accident_map_analytics_models::{GeoBounds, SeriesBucket};

    use super::*;

    #[test]
    fn paged_response_computes_total_pages() {
        let pagination = Pagination::new(Some(2), Some(100)).unwrap();
        let response = PagedResponse::new(Vec::new(), 250, pagination);
        assert_eq!(response.page, 2);
        assert_eq!(response.per_page, 100);
        assert_eq!(response.total_pages, 3);

        let empty = PagedResponse::new(Vec::new(), 0, pagination);
        assert_eq!(empty.total_pages, 0);
    }

    #[test]
    fn series_body_flattens_buckets_in_order() {
        let series = DenseSeries {
            dimension: TimeDimension::DayOfWeek,
            buckets: (0..7)
                .map(|value| SeriesBucket {
                    value,
                    count: u64::try_from(value).unwrap() * 2,
                    cities: Vec::new(),
                })
                .collect(),
        };
        let body = SeriesBody::from_series(&series, false);
        assert_eq!(body.time_values, vec![0, 1, 2, 3, 4, 5, 6]);
        assert_eq!(body.accident_counts, vec![0, 2, 4, 6, 8, 10, 12]);
        assert!(body.city_lists.is_empty());
    }

    #[test]
    fn county_features_carry_bounds_polygons() {
        let county = CountyDetail {
            name: "Travis".to_string(),
            accident_count: 12,
            avg_severity: 2.5,
            cities: vec!["Austin".to_string()],
            common_weather: Some("Clear".to_string()),
            bounds: Some(GeoBounds {
                min_lat: 30.0,
                max_lat: 30.5,
                min_lng: -98.0,
                max_lng: -97.5,
            }),
            percentage_of_total: 100.0,
        };
        let feature = county_feature(&county);
        let geometry = feature.geometry.unwrap();
        match geometry.value {
            Value::Polygon(rings) => {
                assert_eq!(rings.len(), 1);
                // Closed ring: five positions, first == last.
                assert_eq!(rings[0].len(), 5);
                assert_eq!(rings[0][0], rings[0][4]);
            }
            other => panic!("expected polygon, got {other:?}"),
        }
        let properties = feature.properties.unwrap();
        assert_eq!(properties["accidentCount"], json!(12));
    }

    #[test]
    fn counties_without_coordinates_get_null_geometry() {
        let county = CountyDetail {
            name: "Unknown".to_string(),
            accident_count: 1,
            avg_severity: 1.0,
            cities: Vec::new(),
            common_weather: None,
            bounds: None,
            percentage_of_total: 0.0,
        };
        assert!(county_feature(&county).geometry.is_none());
    }
}
