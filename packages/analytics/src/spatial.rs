//! Point sampling and summary statistics for map views.
//!
//! Two modes: with a state selected, points are rolled up per county;
//! nationally, individual points are returned ordered by severity
//! descending and truncated to a configurable bound. The summary always
//! comes from its own query over the full filtered population, so
//! truncating the point sample never skews the reported totals.

use accident_map_accident_models::BoundingBox;
use accident_map_analytics_models::{
    AccidentPoint, CountyAggregate, MapData, MapPoints, MapSummary, MonthlyCount,
};
use accident_map_filter::{Column, FilterSpec, compile};
use moosicbox_json_utils::database::ToValue as _;
use switchy_database::{Database, DatabaseValue};

use crate::planner::as_count;
use crate::{AnalyticsError, query_error, round2, split_list};

/// How the sampler returns point data for a filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleMode {
    /// Roll points up into per-county aggregates.
    CountyAggregate,
    /// Return raw points, severity-descending, truncated.
    RawPoints,
}

impl SampleMode {
    /// Selects the mode for a filter: county aggregates once a state is
    /// selected, raw points for the national view.
    #[must_use]
    pub fn for_spec(spec: &FilterSpec) -> Self {
        if spec.state().is_some() {
            Self::CountyAggregate
        } else {
            Self::RawPoints
        }
    }
}

/// Fetches map point data, the whole-population summary, and the
/// year/month time distribution for a filter.
///
/// When the filter carries no bounding region, the continental US bounds
/// are applied; points outside the region are excluded from every query.
/// `point_limit` caps the raw-point sample only; the summary and time
/// distribution always reflect the full filtered set.
///
/// # Errors
///
/// Returns [`AnalyticsError`] if the store rejects a query.
pub async fn map_data(
    db: &dyn Database,
    spec: &FilterSpec,
    point_limit: u32,
) -> Result<MapData, AnalyticsError> {
    let spec = spec.with_default_region(BoundingBox::CONTINENTAL_US);

    let points = match SampleMode::for_spec(&spec) {
        SampleMode::CountyAggregate => MapPoints::Counties(county_points(db, &spec).await?),
        SampleMode::RawPoints => MapPoints::Raw(raw_points(db, &spec, point_limit).await?),
    };

    let summary = summary(db, &spec).await?;
    let time_distribution = time_distribution(db, &spec).await?;

    Ok(MapData {
        points,
        summary,
        time_distribution,
    })
}

async fn county_points(
    db: &dyn Database,
    spec: &FilterSpec,
) -> Result<Vec<CountyAggregate>, AnalyticsError> {
    let mut predicate = compile(spec, None);
    predicate.require_coordinates();
    predicate.require_not_null(Column::County);

    let sql = format!(
        "SELECT county, COUNT(*) AS total_accidents, \
         AVG(severity::float8) AS avg_severity, \
         AVG(start_lat) AS lat, AVG(start_lng) AS lng, \
         string_agg(DISTINCT weather_condition, ', ' ORDER BY weather_condition) \
             AS weather_conditions \
         FROM accidents WHERE {} \
         GROUP BY county ORDER BY total_accidents DESC",
        predicate.where_clause()
    );

    let rows = db
        .query_raw_params(&sql, predicate.params())
        .await
        .map_err(|e| query_error(&sql, predicate.params().len(), e))?;

    Ok(rows
        .iter()
        .map(|row| {
            let count: i64 = row.to_value("total_accidents").unwrap_or(0);
            CountyAggregate {
                county: row.to_value("county").unwrap_or_default(),
                total_accidents: as_count(count),
                avg_severity: round2(row.to_value("avg_severity").unwrap_or(0.0)),
                lat: row.to_value("lat").unwrap_or(None),
                lng: row.to_value("lng").unwrap_or(None),
                weather_conditions: split_list(
                    row.to_value("weather_conditions").unwrap_or(None),
                ),
            }
        })
        .collect())
}

async fn raw_points(
    db: &dyn Database,
    spec: &FilterSpec,
    point_limit: u32,
) -> Result<Vec<AccidentPoint>, AnalyticsError> {
    let mut predicate = compile(spec, None);
    predicate.require_coordinates();

    let limit_idx = predicate.next_index();
    let sql = format!(
        "SELECT start_lat AS lat, start_lng AS lng, severity, state, weather_condition \
         FROM accidents WHERE {} \
         ORDER BY severity DESC LIMIT ${limit_idx}",
        predicate.where_clause()
    );
    let mut params = predicate.into_params();
    params.push(DatabaseValue::Int64(i64::from(point_limit)));

    let rows = db
        .query_raw_params(&sql, &params)
        .await
        .map_err(|e| query_error(&sql, params.len(), e))?;

    Ok(rows
        .iter()
        .map(|row| {
            let severity: i32 = row.to_value("severity").unwrap_or(1);
            AccidentPoint {
                lat: row.to_value("lat").unwrap_or(0.0),
                lng: row.to_value("lng").unwrap_or(0.0),
                severity: u8::try_from(severity).unwrap_or(1),
                state: row.to_value("state").unwrap_or(None),
                weather_condition: row.to_value("weather_condition").unwrap_or(None),
            }
        })
        .collect())
}

async fn summary(db: &dyn Database, spec: &FilterSpec) -> Result<MapSummary, AnalyticsError> {
    let mut predicate = compile(spec, None);
    predicate.require_coordinates();

    let sql = format!(
        "SELECT COUNT(*) AS total_accidents, \
         AVG(severity::float8) AS avg_severity, \
         COUNT(DISTINCT state) AS states_affected, \
         COUNT(DISTINCT county) AS counties_affected, \
         MODE() WITHIN GROUP (ORDER BY weather_condition) AS common_weather, \
         COUNT(DISTINCT year) AS years_count, \
         COUNT(DISTINCT month) AS months_count, \
         COUNT(DISTINCT day) AS days_count \
         FROM accidents WHERE {}",
        predicate.where_clause()
    );

    let rows = db
        .query_raw_params(&sql, predicate.params())
        .await
        .map_err(|e| query_error(&sql, predicate.params().len(), e))?;

    Ok(rows.first().map_or_else(
        || MapSummary {
            total_accidents: 0,
            avg_severity: 0.0,
            states_affected: 0,
            counties_affected: 0,
            common_weather: None,
            years_count: 0,
            months_count: 0,
            days_count: 0,
        },
        |row| {
            let total: i64 = row.to_value("total_accidents").unwrap_or(0);
            let states: i64 = row.to_value("states_affected").unwrap_or(0);
            let counties: i64 = row.to_value("counties_affected").unwrap_or(0);
            let years: i64 = row.to_value("years_count").unwrap_or(0);
            let months: i64 = row.to_value("months_count").unwrap_or(0);
            let days: i64 = row.to_value("days_count").unwrap_or(0);
            MapSummary {
                total_accidents: as_count(total),
                avg_severity: round2(row.to_value("avg_severity").unwrap_or(0.0)),
                states_affected: as_count(states),
                counties_affected: as_count(counties),
                common_weather: row.to_value("common_weather").unwrap_or(None),
                years_count: as_count(years),
                months_count: as_count(months),
                days_count: as_count(days),
            }
        },
    ))
}

async fn time_distribution(
    db: &dyn Database,
    spec: &FilterSpec,
) -> Result<Vec<MonthlyCount>, AnalyticsError> {
    let mut predicate = compile(spec, None);
    predicate.require_coordinates();

    let sql = format!(
        "SELECT year, month, COUNT(*) AS total, \
         AVG(severity::float8) AS avg_severity \
         FROM accidents WHERE {} \
         GROUP BY year, month ORDER BY year, month",
        predicate.where_clause()
    );

    let rows = db
        .query_raw_params(&sql, predicate.params())
        .await
        .map_err(|e| query_error(&sql, predicate.params().len(), e))?;

    Ok(rows
        .iter()
        .map(|row| {
            let count: i64 = row.to_value("total").unwrap_or(0);
            MonthlyCount {
                year: row.to_value("year").unwrap_or(0),
                month: row.to_value("month").unwrap_or(0),
                count: as_count(count),
                avg_severity: round2(row.to_value("avg_severity").unwrap_or(0.0)),
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use accident_map_filter::RawFilter;

    use super::*;

    #[test]
    fn state_scope_selects_county_aggregation() {
        let spec = FilterSpec::parse(RawFilter {
            state: Some("CA"),
            ..RawFilter::default()
        })
        .unwrap();
        assert_eq!(SampleMode::for_spec(&spec), SampleMode::CountyAggregate);
    }

    #[test]
    fn national_scope_selects_raw_points() {
        let spec = FilterSpec::parse(RawFilter::default()).unwrap();
        assert_eq!(SampleMode::for_spec(&spec), SampleMode::RawPoints);
    }
}
