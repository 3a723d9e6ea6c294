//! Aggregate query planning and execution.
//!
//! Each function compiles its filter once, executes one or more
//! parameterized queries against the store, and shapes the sparse rows
//! into typed results. Count queries always reuse the row query's
//! predicate verbatim so the two can never disagree.

use accident_map_accident_models::{GeoLevel, TimeDimension};
use accident_map_analytics_models::{
    AccidentRow, AreaCount, CountyDetail, DenseSeries, GeoBounds, MonthSummary, PagedAccidents,
    SparseBucket, StateDetails, StateSummary, TemporalSummary, WeatherSummary, YearSummary,
};
use accident_map_filter::{BucketRange, Column, FilterSpec, Pagination, compile};
use moosicbox_json_utils::database::ToValue as _;
use switchy_database::{Database, DatabaseValue};

use crate::{AnalyticsError, percentage, query_error, round2, series, split_list};

/// Columns returned by the paginated accident listing.
const ACCIDENT_COLUMNS: &str = "id, severity, start_time, state, county, city, street, \
     start_lat, start_lng, weather_condition, sunrise_sunset";

/// Maximum rows returned by a geographic breakdown at the given level.
///
/// A bound on payload size, not a sample: counts and averages are computed
/// over the full filtered set before truncation.
#[must_use]
pub const fn breakdown_limit(level: GeoLevel) -> u32 {
    match level {
        GeoLevel::Street => 15,
        GeoLevel::State | GeoLevel::County | GeoLevel::City => 10,
    }
}

/// Fetches one page of accident rows plus the total match count.
///
/// The count query binds the identical predicate, so `total` always equals
/// the number of rows an unpaginated fetch would return.
///
/// # Errors
///
/// Returns [`AnalyticsError`] if the store rejects a query.
pub async fn accidents_page(
    db: &dyn Database,
    spec: &FilterSpec,
    pagination: Pagination,
) -> Result<PagedAccidents, AnalyticsError> {
    let predicate = compile(spec, None);
    let where_clause = predicate.where_clause();

    let count_sql = format!("SELECT COUNT(*) AS total FROM accidents WHERE {where_clause}");
    let count_rows = db
        .query_raw_params(&count_sql, predicate.params())
        .await
        .map_err(|e| query_error(&count_sql, predicate.params().len(), e))?;
    let total: i64 = count_rows
        .first()
        .map_or(0, |row| row.to_value("total").unwrap_or(0));

    let limit_idx = predicate.next_index();
    let offset_idx = limit_idx + 1;
    let sql = format!(
        "SELECT {ACCIDENT_COLUMNS} FROM accidents WHERE {where_clause} \
         ORDER BY start_time DESC LIMIT ${limit_idx} OFFSET ${offset_idx}"
    );
    let mut params = predicate.into_params();
    params.push(DatabaseValue::Int64(i64::from(pagination.per_page())));
    params.push(DatabaseValue::Int64(
        i64::try_from(pagination.offset()).unwrap_or(i64::MAX),
    ));

    let rows = db
        .query_raw_params(&sql, &params)
        .await
        .map_err(|e| query_error(&sql, params.len(), e))?;

    let accidents = rows
        .iter()
        .map(|row| {
            let severity: i32 = row.to_value("severity").unwrap_or(1);
            AccidentRow {
                id: row.to_value("id").unwrap_or(0),
                severity: u8::try_from(severity).unwrap_or(1),
                start_time: row.to_value("start_time").unwrap_or_default(),
                state: row.to_value("state").unwrap_or(None),
                county: row.to_value("county").unwrap_or(None),
                city: row.to_value("city").unwrap_or(None),
                street: row.to_value("street").unwrap_or(None),
                start_lat: row.to_value("start_lat").unwrap_or(None),
                start_lng: row.to_value("start_lng").unwrap_or(None),
                weather_condition: row.to_value("weather_condition").unwrap_or(None),
                sunrise_sunset: row.to_value("sunrise_sunset").unwrap_or(None),
            }
        })
        .collect();

    Ok(PagedAccidents {
        rows: accidents,
        total: as_count(total),
    })
}

/// Buckets the filtered set on a time dimension and returns the dense,
/// zero-filled series.
///
/// Any filter on `dimension` itself is suppressed during compilation;
/// filtering and grouping on the same dimension would contradict the
/// displayed buckets. With `include_cities`, each bucket also carries its
/// distinct city list.
///
/// # Errors
///
/// Returns [`AnalyticsError`] if the store rejects the query.
pub async fn time_series(
    db: &dyn Database,
    spec: &FilterSpec,
    dimension: TimeDimension,
    include_cities: bool,
) -> Result<DenseSeries, AnalyticsError> {
    let predicate = compile(spec, Some(dimension));
    let column = Column::from(dimension).as_sql();
    let cities_select = if include_cities {
        ", string_agg(DISTINCT city, ', ' ORDER BY city) AS cities"
    } else {
        ""
    };
    let sql = format!(
        "SELECT {column} AS bucket, COUNT(*) AS total{cities_select} \
         FROM accidents WHERE {} GROUP BY {column} ORDER BY {column}",
        predicate.where_clause()
    );

    let rows = db
        .query_raw_params(&sql, predicate.params())
        .await
        .map_err(|e| query_error(&sql, predicate.params().len(), e))?;

    let sparse = rows
        .iter()
        .map(|row| {
            let count: i64 = row.to_value("total").unwrap_or(0);
            SparseBucket {
                bucket: row.to_value("bucket").unwrap_or(0),
                count: as_count(count),
                cities: include_cities
                    .then(|| split_list(row.to_value("cities").unwrap_or(None))),
            }
        })
        .collect();

    Ok(series::normalize(dimension, sparse))
}

/// Groups the filtered set by a geographic level and returns the top
/// entries by count descending.
///
/// `range` optionally scopes the breakdown to a slice of a time dimension
/// (a chart selection). Rows with a null value at the grouping level are
/// excluded.
///
/// # Errors
///
/// Returns [`AnalyticsError`] if the store rejects the query.
pub async fn top_areas(
    db: &dyn Database,
    spec: &FilterSpec,
    level: GeoLevel,
    range: Option<&BucketRange>,
) -> Result<Vec<AreaCount>, AnalyticsError> {
    let mut predicate = compile(spec, None);
    if let Some(range) = range {
        predicate.constrain_range(range);
    }
    predicate.require_not_null(Column::from(level));

    let column = Column::from(level).as_sql();
    let limit = breakdown_limit(level);
    let sql = format!(
        "SELECT {column} AS name, COUNT(*) AS accidents, \
         AVG(severity::float8) AS avg_severity \
         FROM accidents WHERE {} \
         GROUP BY {column} ORDER BY accidents DESC LIMIT {limit}",
        predicate.where_clause()
    );

    let rows = db
        .query_raw_params(&sql, predicate.params())
        .await
        .map_err(|e| query_error(&sql, predicate.params().len(), e))?;

    Ok(rows
        .iter()
        .map(|row| {
            let accidents: i64 = row.to_value("accidents").unwrap_or(0);
            AreaCount {
                name: row.to_value("name").unwrap_or_default(),
                accidents: as_count(accidents),
                avg_severity: round2(row.to_value("avg_severity").unwrap_or(0.0)),
            }
        })
        .collect())
}

/// Per-county statistics and a whole-state summary for one state.
///
/// Each county's percentage of total is computed over the sum of the
/// returned group counts; a zero total reports 0% everywhere.
///
/// # Errors
///
/// Returns [`AnalyticsError`] if the store rejects a query.
pub async fn state_details(
    db: &dyn Database,
    spec: &FilterSpec,
) -> Result<StateDetails, AnalyticsError> {
    let mut county_predicate = compile(spec, None);
    county_predicate.require_not_null(Column::County);
    let county_sql = format!(
        "SELECT county AS name, COUNT(*) AS accident_count, \
         AVG(severity::float8) AS avg_severity, \
         string_agg(DISTINCT city, ', ' ORDER BY city) AS cities, \
         MODE() WITHIN GROUP (ORDER BY weather_condition) AS common_weather, \
         MIN(start_lat) AS min_lat, MAX(start_lat) AS max_lat, \
         MIN(start_lng) AS min_lng, MAX(start_lng) AS max_lng \
         FROM accidents WHERE {} \
         GROUP BY county ORDER BY accident_count DESC",
        county_predicate.where_clause()
    );

    let county_rows = db
        .query_raw_params(&county_sql, county_predicate.params())
        .await
        .map_err(|e| query_error(&county_sql, county_predicate.params().len(), e))?;

    let mut counties: Vec<CountyDetail> = county_rows
        .iter()
        .map(|row| {
            let count: i64 = row.to_value("accident_count").unwrap_or(0);
            CountyDetail {
                name: row.to_value("name").unwrap_or_default(),
                accident_count: as_count(count),
                avg_severity: round2(row.to_value("avg_severity").unwrap_or(0.0)),
                cities: split_list(row.to_value("cities").unwrap_or(None)),
                common_weather: row.to_value("common_weather").unwrap_or(None),
                bounds: bounds_from(row),
                percentage_of_total: 0.0,
            }
        })
        .collect();

    let total: u64 = counties.iter().map(|county| county.accident_count).sum();
    for county in &mut counties {
        county.percentage_of_total = percentage(county.accident_count, total);
    }

    let summary_predicate = compile(spec, None);
    let summary_sql = format!(
        "SELECT COUNT(*) AS total_accidents, \
         AVG(severity::float8) AS avg_severity, \
         COUNT(DISTINCT county) AS counties_affected, \
         MODE() WITHIN GROUP (ORDER BY weather_condition) AS common_weather, \
         string_agg(DISTINCT weather_condition, ', ' ORDER BY weather_condition) \
             AS weather_conditions, \
         MIN(start_lat) AS min_lat, MAX(start_lat) AS max_lat, \
         MIN(start_lng) AS min_lng, MAX(start_lng) AS max_lng \
         FROM accidents WHERE {}",
        summary_predicate.where_clause()
    );

    let summary_rows = db
        .query_raw_params(&summary_sql, summary_predicate.params())
        .await
        .map_err(|e| query_error(&summary_sql, summary_predicate.params().len(), e))?;

    let summary = summary_rows.first().map_or_else(
        || StateSummary {
            total_accidents: 0,
            avg_severity: 0.0,
            counties_affected: 0,
            common_weather: None,
            weather_conditions: Vec::new(),
            bounds: None,
        },
        |row| {
            let total_accidents: i64 = row.to_value("total_accidents").unwrap_or(0);
            let counties_affected: i64 = row.to_value("counties_affected").unwrap_or(0);
            StateSummary {
                total_accidents: as_count(total_accidents),
                avg_severity: round2(row.to_value("avg_severity").unwrap_or(0.0)),
                counties_affected: as_count(counties_affected),
                common_weather: row.to_value("common_weather").unwrap_or(None),
                weather_conditions: split_list(
                    row.to_value("weather_conditions").unwrap_or(None),
                ),
                bounds: bounds_from(row),
            }
        },
    );

    Ok(StateDetails { counties, summary })
}

/// Unfiltered per-year and per-month totals across the whole table.
///
/// # Errors
///
/// Returns [`AnalyticsError`] if the store rejects a query.
pub async fn temporal_summary(db: &dyn Database) -> Result<TemporalSummary, AnalyticsError> {
    let yearly_sql = "SELECT year, COUNT(*) AS total_accidents, \
         AVG(severity::float8) AS avg_severity \
         FROM accidents GROUP BY year ORDER BY year";
    let yearly_rows = db
        .query_raw_params(yearly_sql, &[])
        .await
        .map_err(|e| query_error(yearly_sql, 0, e))?;
    let yearly = yearly_rows
        .iter()
        .map(|row| {
            let count: i64 = row.to_value("total_accidents").unwrap_or(0);
            YearSummary {
                year: row.to_value("year").unwrap_or(0),
                total_accidents: as_count(count),
                avg_severity: round2(row.to_value("avg_severity").unwrap_or(0.0)),
            }
        })
        .collect();

    let monthly_sql = "SELECT month, COUNT(*) AS total_accidents, \
         AVG(severity::float8) AS avg_severity \
         FROM accidents GROUP BY month ORDER BY month";
    let monthly_rows = db
        .query_raw_params(monthly_sql, &[])
        .await
        .map_err(|e| query_error(monthly_sql, 0, e))?;
    let monthly = monthly_rows
        .iter()
        .map(|row| {
            let count: i64 = row.to_value("total_accidents").unwrap_or(0);
            MonthSummary {
                month: row.to_value("month").unwrap_or(0),
                total_accidents: as_count(count),
                avg_severity: round2(row.to_value("avg_severity").unwrap_or(0.0)),
            }
        })
        .collect();

    Ok(TemporalSummary { yearly, monthly })
}

/// Per-weather-condition totals with average severity, temperature, and
/// visibility, ordered by count descending.
///
/// # Errors
///
/// Returns [`AnalyticsError`] if the store rejects the query.
pub async fn weather_summary(db: &dyn Database) -> Result<Vec<WeatherSummary>, AnalyticsError> {
    let sql = "SELECT weather_condition, COUNT(*) AS total_accidents, \
         AVG(severity::float8) AS avg_severity, \
         AVG(temperature::float8) AS avg_temperature, \
         AVG(visibility::float8) AS avg_visibility \
         FROM accidents WHERE weather_condition IS NOT NULL \
         GROUP BY weather_condition ORDER BY total_accidents DESC";
    let rows = db
        .query_raw_params(sql, &[])
        .await
        .map_err(|e| query_error(sql, 0, e))?;

    Ok(rows
        .iter()
        .map(|row| {
            let count: i64 = row.to_value("total_accidents").unwrap_or(0);
            let avg_temperature: Option<f64> = row.to_value("avg_temperature").unwrap_or(None);
            let avg_visibility: Option<f64> = row.to_value("avg_visibility").unwrap_or(None);
            WeatherSummary {
                weather_condition: row.to_value("weather_condition").unwrap_or_default(),
                total_accidents: as_count(count),
                avg_severity: round2(row.to_value("avg_severity").unwrap_or(0.0)),
                avg_temperature: avg_temperature.map(round2),
                avg_visibility: avg_visibility.map(round2),
            }
        })
        .collect())
}

/// Clamps a store count to an unsigned value.
pub(crate) fn as_count(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

/// Builds coordinate bounds from a row's `min_lat`/`max_lat`/`min_lng`/
/// `max_lng` aggregates, if all four are present.
fn bounds_from(row: &switchy_database::Row) -> Option<GeoBounds> {
    let min_lat: Option<f64> = row.to_value("min_lat").unwrap_or(None);
    let max_lat: Option<f64> = row.to_value("max_lat").unwrap_or(None);
    let min_lng: Option<f64> = row.to_value("min_lng").unwrap_or(None);
    let max_lng: Option<f64> = row.to_value("max_lng").unwrap_or(None);
    match (min_lat, max_lat, min_lng, max_lng) {
        (Some(min_lat), Some(max_lat), Some(min_lng), Some(max_lng)) => Some(GeoBounds {
            min_lat,
            max_lat,
            min_lng,
            max_lng,
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn breakdown_limits_are_fixed() {
        assert_eq!(breakdown_limit(GeoLevel::State), 10);
        assert_eq!(breakdown_limit(GeoLevel::County), 10);
        assert_eq!(breakdown_limit(GeoLevel::City), 10);
        assert_eq!(breakdown_limit(GeoLevel::Street), 15);
    }

    #[test]
    fn counts_clamp_negative_values() {
        assert_eq!(as_count(-1), 0);
        assert_eq!(as_count(42), 42);
    }
}
