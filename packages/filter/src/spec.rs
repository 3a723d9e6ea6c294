//! Validated filter construction from raw request parameters.

use std::collections::BTreeSet;
use std::str::FromStr as _;

use accident_map_accident_models::{
    BoundingBox, FeatureFilter, GeoLevel, Severity, TimeDimension,
};
use serde::Serialize;

use crate::{DEFAULT_PER_PAGE, FilterError, MAX_PER_PAGE};

/// Raw, untyped filter parameters as they arrive from a request.
///
/// List-valued fields (`years`, `months`, `days`, `hours`) are
/// comma-separated strings; every token must parse as an integer within the
/// dimension's domain.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawFilter<'a> {
    /// Two-letter state abbreviation.
    pub state: Option<&'a str>,
    /// County name (requires `state`).
    pub county: Option<&'a str>,
    /// City name (requires `county`).
    pub city: Option<&'a str>,
    /// Street name (requires `city`).
    pub street: Option<&'a str>,
    /// Comma-separated years.
    pub years: Option<&'a str>,
    /// Comma-separated months (1-12).
    pub months: Option<&'a str>,
    /// Comma-separated days of week (0-6).
    pub days: Option<&'a str>,
    /// Comma-separated hours (0-23).
    pub hours: Option<&'a str>,
    /// Road-feature flag name, or `Day`/`Night`.
    pub feature: Option<&'a str>,
    /// Exact severity (1-4).
    pub severity: Option<u8>,
    /// Exact weather-condition string.
    pub weather: Option<&'a str>,
    /// Bounding box as `west,south,east,north`.
    pub bbox: Option<&'a str>,
}

/// Validated, immutable representation of a client's requested filters.
///
/// Constructed once per request via [`FilterSpec::parse`]; all fields are
/// private and the value owns no resources.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilterSpec {
    state: Option<String>,
    county: Option<String>,
    city: Option<String>,
    street: Option<String>,
    years: BTreeSet<i32>,
    months: BTreeSet<u8>,
    days: BTreeSet<u8>,
    hours: BTreeSet<u8>,
    feature: Option<FeatureFilter>,
    severity: Option<Severity>,
    weather: Option<String>,
    region: Option<BoundingBox>,
}

impl FilterSpec {
    /// Validates raw request parameters into a `FilterSpec`.
    ///
    /// Empty strings are treated as absent. Geographic levels must be
    /// supplied coarsest-first: a county filter without a state (or a city
    /// without a county, a street without a city) is rejected.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError`] if any token fails to parse, any value falls
    /// outside its domain, or the geographic hierarchy is incomplete.
    pub fn parse(raw: RawFilter<'_>) -> Result<Self, FilterError> {
        let state = non_empty(raw.state);
        let county = non_empty(raw.county);
        let city = non_empty(raw.city);
        let street = non_empty(raw.street);

        for (finer, value, coarser, parent) in [
            ("county", &county, "state", &state),
            ("city", &city, "county", &county),
            ("street", &street, "city", &city),
        ] {
            if value.is_some() && parent.is_none() {
                return Err(FilterError::IncompleteGeoHierarchy { finer, coarser });
            }
        }

        let years = parse_int_set(raw.years, "year", 1900, 2100)?;
        let months = parse_int_set(raw.months, "month", 1, 12)?;
        let days = parse_int_set(raw.days, "day", 0, 6)?;
        let hours = parse_int_set(raw.hours, "hour", 0, 23)?;

        let feature = match non_empty(raw.feature) {
            Some(value) => Some(
                FeatureFilter::from_str(&value)
                    .map_err(|e| FilterError::UnknownFeature(e.value))?,
            ),
            None => None,
        };

        let severity = match raw.severity {
            Some(value) => {
                Some(
                    Severity::from_value(value).map_err(|e| FilterError::OutOfRange {
                        field: "severity",
                        value: i64::from(e.value),
                        min: 1,
                        max: 4,
                    })?,
                )
            }
            None => None,
        };

        let region = match non_empty(raw.bbox) {
            Some(value) => Some(parse_bbox(&value)?),
            None => None,
        };

        Ok(Self {
            state,
            county,
            city,
            street,
            years,
            months: to_u8_set(&months),
            days: to_u8_set(&days),
            hours: to_u8_set(&hours),
            feature,
            severity,
            weather: non_empty(raw.weather),
            region,
        })
    }

    /// State filter, if any.
    #[must_use]
    pub fn state(&self) -> Option<&str> {
        self.state.as_deref()
    }

    /// County filter, if any.
    #[must_use]
    pub fn county(&self) -> Option<&str> {
        self.county.as_deref()
    }

    /// City filter, if any.
    #[must_use]
    pub fn city(&self) -> Option<&str> {
        self.city.as_deref()
    }

    /// Street filter, if any.
    #[must_use]
    pub fn street(&self) -> Option<&str> {
        self.street.as_deref()
    }

    /// Selected years, ascending. Empty means all years.
    #[must_use]
    pub const fn years(&self) -> &BTreeSet<i32> {
        &self.years
    }

    /// Selected months, ascending. Empty means all months.
    #[must_use]
    pub const fn months(&self) -> &BTreeSet<u8> {
        &self.months
    }

    /// Selected days of week, ascending. Empty means all days.
    #[must_use]
    pub const fn days(&self) -> &BTreeSet<u8> {
        &self.days
    }

    /// Selected hours, ascending. Empty means all hours.
    #[must_use]
    pub const fn hours(&self) -> &BTreeSet<u8> {
        &self.hours
    }

    /// Feature filter, if any.
    #[must_use]
    pub const fn feature(&self) -> Option<FeatureFilter> {
        self.feature
    }

    /// Severity filter, if any.
    #[must_use]
    pub const fn severity(&self) -> Option<Severity> {
        self.severity
    }

    /// Weather-condition filter, if any.
    #[must_use]
    pub fn weather(&self) -> Option<&str> {
        self.weather.as_deref()
    }

    /// Bounding region, if any.
    #[must_use]
    pub const fn region(&self) -> Option<BoundingBox> {
        self.region
    }

    /// Returns a copy of this filter with `default` as the bounding region
    /// if none was supplied. Used by map views, which always constrain to a
    /// region.
    #[must_use]
    pub fn with_default_region(&self, default: BoundingBox) -> Self {
        let mut spec = self.clone();
        spec.region = Some(spec.region.unwrap_or(default));
        spec
    }

    /// Returns the value of the given geographic level, failing if the
    /// endpoint requires it and it is absent.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::MissingParameter`] if the level is not set.
    pub fn require(&self, level: GeoLevel) -> Result<&str, FilterError> {
        let (value, name) = match level {
            GeoLevel::State => (&self.state, "state"),
            GeoLevel::County => (&self.county, "county"),
            GeoLevel::City => (&self.city, "city"),
            GeoLevel::Street => (&self.street, "street"),
        };
        value
            .as_deref()
            .ok_or(FilterError::MissingParameter(name))
    }

    /// The filters that actually narrowed the query, after suppressing the
    /// set belonging to the grouped dimension.
    ///
    /// Grouping and filtering on the same dimension is contradictory, so
    /// the compiler ignores the same-dimension set; the echo returned to
    /// the caller must match what was applied, not what was requested.
    #[must_use]
    pub fn effective_filters(&self, grouping: Option<TimeDimension>) -> EffectiveFilters {
        let keep = |dimension: TimeDimension| grouping != Some(dimension);
        EffectiveFilters {
            years: self.years.iter().copied().collect(),
            months: if keep(TimeDimension::Month) {
                self.months.iter().copied().collect()
            } else {
                Vec::new()
            },
            days: if keep(TimeDimension::DayOfWeek) {
                self.days.iter().copied().collect()
            } else {
                Vec::new()
            },
            hours: if keep(TimeDimension::Hour) {
                self.hours.iter().copied().collect()
            } else {
                Vec::new()
            },
        }
    }
}

/// The filter sets that were actually applied to a query, echoed back in
/// aggregation responses so the caller can reconcile displayed filters with
/// displayed data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectiveFilters {
    /// Applied years.
    pub years: Vec<i32>,
    /// Applied months (empty when grouping by month).
    pub months: Vec<u8>,
    /// Applied days of week (empty when grouping by day).
    pub days: Vec<u8>,
    /// Applied hours (empty when grouping by hour).
    pub hours: Vec<u8>,
}

/// Validated pagination window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    page: u32,
    per_page: u32,
}

impl Pagination {
    /// Validates `page` (default 1) and `perPage` (default
    /// [`DEFAULT_PER_PAGE`], ceiling [`MAX_PER_PAGE`]).
    ///
    /// # Errors
    ///
    /// Returns [`FilterError`] if `page` is zero or `perPage` is zero or
    /// above the ceiling.
    pub const fn new(page: Option<u32>, per_page: Option<u32>) -> Result<Self, FilterError> {
        let page = match page {
            Some(0) => return Err(FilterError::PageOutOfRange),
            Some(page) => page,
            None => 1,
        };
        let per_page = match per_page {
            Some(per_page) => {
                if per_page == 0 || per_page > MAX_PER_PAGE {
                    return Err(FilterError::PerPageOutOfRange {
                        ceiling: MAX_PER_PAGE,
                    });
                }
                per_page
            }
            None => DEFAULT_PER_PAGE,
        };
        Ok(Self { page, per_page })
    }

    /// 1-based page number.
    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    /// Rows per page.
    #[must_use]
    pub const fn per_page(&self) -> u32 {
        self.per_page
    }

    /// Number of rows to skip.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.per_page as u64
    }

    /// Total number of pages needed for `total` rows.
    #[must_use]
    pub const fn total_pages(&self, total: u64) -> u64 {
        total.div_ceil(self.per_page as u64)
    }
}

/// An inclusive bucket range on a time dimension, used to scope a
/// breakdown to a slice the user selected in a chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketRange {
    /// Dimension the range applies to.
    pub dimension: TimeDimension,
    /// First bucket, inclusive.
    pub start: i32,
    /// Last bucket, inclusive.
    pub end: i32,
}

impl BucketRange {
    /// Validates that both bounds lie in the dimension's domain and are
    /// correctly ordered.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError`] if a bound is out of domain or the range is
    /// inverted.
    pub fn new(dimension: TimeDimension, start: i32, end: i32) -> Result<Self, FilterError> {
        let domain = dimension.domain();
        for value in [start, end] {
            if !dimension.contains(value) {
                return Err(FilterError::OutOfRange {
                    field: dimension_field(dimension),
                    value: i64::from(value),
                    min: i64::from(*domain.start()),
                    max: i64::from(*domain.end()),
                });
            }
        }
        if start > end {
            return Err(FilterError::InvertedRange {
                field: dimension_field(dimension),
                start,
                end,
            });
        }
        Ok(Self {
            dimension,
            start,
            end,
        })
    }
}

const fn dimension_field(dimension: TimeDimension) -> &'static str {
    match dimension {
        TimeDimension::Hour => "hour",
        TimeDimension::DayOfWeek => "day",
        TimeDimension::Month => "month",
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}

fn parse_int_set(
    raw: Option<&str>,
    field: &'static str,
    min: i64,
    max: i64,
) -> Result<BTreeSet<i32>, FilterError> {
    let mut set = BTreeSet::new();
    let Some(raw) = raw else {
        return Ok(set);
    };

    for token in raw.split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        let value: i64 = token.parse().map_err(|_| FilterError::InvalidInteger {
            field,
            value: token.to_string(),
        })?;
        if value < min || value > max {
            return Err(FilterError::OutOfRange {
                field,
                value,
                min,
                max,
            });
        }
        #[allow(clippy::cast_possible_truncation)]
        set.insert(value as i32);
    }

    Ok(set)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_u8_set(values: &BTreeSet<i32>) -> BTreeSet<u8> {
    values.iter().map(|&v| v as u8).collect()
}

fn parse_bbox(raw: &str) -> Result<BoundingBox, FilterError> {
    let parts: Vec<f64> = raw
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|_| FilterError::InvalidBoundingBox(raw.to_string()))?;
    if parts.len() != 4 {
        return Err(FilterError::InvalidBoundingBox(raw.to_string()));
    }
    Ok(BoundingBox::new(parts[0], parts[1], parts[2], parts[3]))
}

#[cfg(test)]
mod tests {
    use accident_map_accident_models::DaylightPeriod;

    use super::*;

    #[test]
    fn parses_full_filter() {
        let spec = FilterSpec::parse(RawFilter {
            state: Some("CA"),
            county: Some("Los Angeles"),
            years: Some("2019,2020"),
            months: Some("1, 2, 12"),
            feature: Some("Night"),
            severity: Some(3),
            ..RawFilter::default()
        })
        .unwrap();

        assert_eq!(spec.state(), Some("CA"));
        assert_eq!(spec.county(), Some("Los Angeles"));
        assert_eq!(
            spec.years().iter().copied().collect::<Vec<_>>(),
            vec![2019, 2020]
        );
        assert_eq!(
            spec.months().iter().copied().collect::<Vec<_>>(),
            vec![1, 2, 12]
        );
        assert_eq!(
            spec.feature(),
            Some(FeatureFilter::Daylight(DaylightPeriod::Night))
        );
        assert_eq!(spec.severity(), Some(Severity::Serious));
    }

    #[test]
    fn empty_strings_are_absent() {
        let spec = FilterSpec::parse(RawFilter {
            state: Some(""),
            years: Some(""),
            ..RawFilter::default()
        })
        .unwrap();
        assert_eq!(spec.state(), None);
        assert!(spec.years().is_empty());
    }

    #[test]
    fn rejects_county_without_state() {
        let err = FilterSpec::parse(RawFilter {
            county: Some("Cook"),
            ..RawFilter::default()
        })
        .unwrap_err();
        assert_eq!(
            err,
            FilterError::IncompleteGeoHierarchy {
                finer: "county",
                coarser: "state",
            }
        );
    }

    #[test]
    fn rejects_street_without_city() {
        let err = FilterSpec::parse(RawFilter {
            state: Some("IL"),
            county: Some("Cook"),
            street: Some("Lake Shore Dr"),
            ..RawFilter::default()
        })
        .unwrap_err();
        assert!(matches!(err, FilterError::IncompleteGeoHierarchy { .. }));
    }

    #[test]
    fn rejects_unparseable_tokens() {
        let err = FilterSpec::parse(RawFilter {
            years: Some("2019,twenty"),
            ..RawFilter::default()
        })
        .unwrap_err();
        assert_eq!(
            err,
            FilterError::InvalidInteger {
                field: "year",
                value: "twenty".to_string(),
            }
        );
    }

    #[test]
    fn rejects_out_of_domain_values() {
        assert!(matches!(
            FilterSpec::parse(RawFilter {
                months: Some("13"),
                ..RawFilter::default()
            }),
            Err(FilterError::OutOfRange { field: "month", .. })
        ));
        assert!(matches!(
            FilterSpec::parse(RawFilter {
                days: Some("7"),
                ..RawFilter::default()
            }),
            Err(FilterError::OutOfRange { field: "day", .. })
        ));
        assert!(matches!(
            FilterSpec::parse(RawFilter {
                hours: Some("24"),
                ..RawFilter::default()
            }),
            Err(FilterError::OutOfRange { field: "hour", .. })
        ));
    }

    #[test]
    fn rejects_unknown_feature() {
        let err = FilterSpec::parse(RawFilter {
            feature: Some("tunnel"),
            ..RawFilter::default()
        })
        .unwrap_err();
        assert_eq!(err, FilterError::UnknownFeature("tunnel".to_string()));
    }

    #[test]
    fn parses_bounding_box() {
        let spec = FilterSpec::parse(RawFilter {
            bbox: Some("-122.5,37.2,-121.9,37.9"),
            ..RawFilter::default()
        })
        .unwrap();
        let region = spec.region().unwrap();
        assert!((region.west - -122.5).abs() < f64::EPSILON);
        assert!((region.north - 37.9).abs() < f64::EPSILON);
    }

    #[test]
    fn rejects_malformed_bounding_box() {
        assert!(matches!(
            FilterSpec::parse(RawFilter {
                bbox: Some("-122.5,37.2"),
                ..RawFilter::default()
            }),
            Err(FilterError::InvalidBoundingBox(_))
        ));
    }

    #[test]
    fn default_region_fills_only_when_absent() {
        let spec = FilterSpec::parse(RawFilter::default()).unwrap();
        let with_default = spec.with_default_region(BoundingBox::CONTINENTAL_US);
        assert_eq!(with_default.region(), Some(BoundingBox::CONTINENTAL_US));

        let explicit = FilterSpec::parse(RawFilter {
            bbox: Some("-90,30,-80,40"),
            ..RawFilter::default()
        })
        .unwrap()
        .with_default_region(BoundingBox::CONTINENTAL_US);
        assert_eq!(explicit.region(), Some(BoundingBox::new(-90.0, 30.0, -80.0, 40.0)));
    }

    #[test]
    fn require_reports_missing_level() {
        let spec = FilterSpec::parse(RawFilter {
            state: Some("TX"),
            ..RawFilter::default()
        })
        .unwrap();
        assert_eq!(spec.require(GeoLevel::State).unwrap(), "TX");
        assert_eq!(
            spec.require(GeoLevel::County).unwrap_err(),
            FilterError::MissingParameter("county")
        );
    }

    #[test]
    fn effective_filters_suppress_grouped_dimension() {
        let spec = FilterSpec::parse(RawFilter {
            years: Some("2020"),
            months: Some("6,7"),
            days: Some("0,6"),
            hours: Some("8,17"),
            ..RawFilter::default()
        })
        .unwrap();

        let echoed = spec.effective_filters(Some(TimeDimension::Month));
        assert_eq!(echoed.years, vec![2020]);
        assert!(echoed.months.is_empty());
        assert_eq!(echoed.days, vec![0, 6]);
        assert_eq!(echoed.hours, vec![8, 17]);

        let unsuppressed = spec.effective_filters(None);
        assert_eq!(unsuppressed.months, vec![6, 7]);
    }

    #[test]
    fn pagination_defaults_and_bounds() {
        let pagination = Pagination::new(None, None).unwrap();
        assert_eq!(pagination.page(), 1);
        assert_eq!(pagination.per_page(), DEFAULT_PER_PAGE);
        assert_eq!(pagination.offset(), 0);

        let page3 = Pagination::new(Some(3), Some(50)).unwrap();
        assert_eq!(page3.offset(), 100);

        assert_eq!(
            Pagination::new(Some(0), None).unwrap_err(),
            FilterError::PageOutOfRange
        );
        assert!(matches!(
            Pagination::new(None, Some(0)),
            Err(FilterError::PerPageOutOfRange { .. })
        ));
        assert!(matches!(
            Pagination::new(None, Some(MAX_PER_PAGE + 1)),
            Err(FilterError::PerPageOutOfRange { .. })
        ));
    }

    #[test]
    fn total_pages_is_ceiling_division() {
        let pagination = Pagination::new(Some(1), Some(100)).unwrap();
        assert_eq!(pagination.total_pages(0), 0);
        assert_eq!(pagination.total_pages(1), 1);
        assert_eq!(pagination.total_pages(100), 1);
        assert_eq!(pagination.total_pages(101), 2);
    }

    #[test]
    fn bucket_range_validates_domain_and_order() {
        assert!(BucketRange::new(TimeDimension::Hour, 8, 17).is_ok());
        assert!(matches!(
            BucketRange::new(TimeDimension::Hour, 8, 24),
            Err(FilterError::OutOfRange { field: "hour", .. })
        ));
        assert!(matches!(
            BucketRange::new(TimeDimension::Month, 9, 3),
            Err(FilterError::InvertedRange { .. })
        ));
    }
}
