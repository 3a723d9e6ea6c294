//! HTTP handler functions for the accident map API.
//!
//! Each handler validates its parameters into a `FilterSpec` at the
//! boundary, runs the relevant analytics function, and shapes the result
//! into the response envelope. Validation failures return 400 before any
//! query is issued; store failures return 5xx with a structured body and
//! never leak parameter values.

use accident_map_accident_models::{GeoLevel, TimeDimension};
use accident_map_analytics::{AnalyticsError, planner, spatial};
use accident_map_database::{DbError, queries};
use accident_map_filter::{BucketRange, FilterError, FilterSpec, Pagination};
use accident_map_server_models::{
    ApiHealth, FilterQueryParams, MapDataResponse, MapMetadata, PagedResponse, SeriesBody,
    StateDetailsResponse, TimeAnalysisMetadata, TimeAnalysisResponse,
};
use actix_web::{HttpResponse, web};

use crate::AppState;

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /api/accidents`
///
/// Paginated flat listing with the full filter set; `total` comes from an
/// independent count query over the same predicate.
pub async fn accidents(
    state: web::Data<AppState>,
    params: web::Query<FilterQueryParams>,
) -> HttpResponse {
    let spec = match FilterSpec::parse(params.raw()) {
        Ok(spec) => spec,
        Err(e) => return bad_request(&e),
    };
    let pagination = match Pagination::new(params.page, params.per_page) {
        Ok(pagination) => pagination,
        Err(e) => return bad_request(&e),
    };

    match planner::accidents_page(state.db.as_ref(), &spec, pagination).await {
        Ok(page) => {
            HttpResponse::Ok().json(PagedResponse::new(page.rows, page.total, pagination))
        }
        Err(e) => analytics_error("Failed to query accidents", &e),
    }
}

/// `GET /api/spatial/states`
///
/// Distinct states that have accident data.
pub async fn states(state: web::Data<AppState>) -> HttpResponse {
    match queries::distinct_states(state.db.as_ref()).await {
        Ok(states) => HttpResponse::Ok().json(states),
        Err(e) => db_error("Failed to list states", &e),
    }
}

/// `GET /api/spatial/map-data`
///
/// Map point data: per-county aggregates when a state is selected, raw
/// points (severity-descending, truncated) for the national view, plus a
/// whole-population summary and time distribution.
pub async fn map_data(
    state: web::Data<AppState>,
    params: web::Query<FilterQueryParams>,
) -> HttpResponse {
    let spec = match FilterSpec::parse(params.raw()) {
        Ok(spec) => spec,
        Err(e) => return bad_request(&e),
    };

    match spatial::map_data(state.db.as_ref(), &spec, state.point_limit).await {
        Ok(data) => HttpResponse::Ok().json(MapDataResponse {
            metadata: MapMetadata {
                total_points: data.points.len(),
                state: spec.state().map(str::to_string),
                filters: spec.effective_filters(None),
            },
            points: data.points,
            summary: data.summary,
            time_distribution: data.time_distribution,
        }),
        Err(e) => analytics_error("Failed to query map data", &e),
    }
}

/// `GET /api/spatial/top-accidents`
///
/// Top geographic units by accident count at the requested level
/// (`viewType`, default `state`).
pub async fn top_accidents(
    state: web::Data<AppState>,
    params: web::Query<FilterQueryParams>,
) -> HttpResponse {
    let spec = match FilterSpec::parse(params.raw()) {
        Ok(spec) => spec,
        Err(e) => return bad_request(&e),
    };
    let level = match params.view_type.as_deref() {
        None => GeoLevel::State,
        Some(value) => match value.parse::<GeoLevel>() {
            Ok(level) => level,
            Err(_) => {
                return HttpResponse::BadRequest().json(serde_json::json!({
                    "error": format!("invalid view type: '{value}'")
                }));
            }
        },
    };

    match planner::top_areas(state.db.as_ref(), &spec, level, None).await {
        Ok(areas) => HttpResponse::Ok().json(areas),
        Err(e) => analytics_error("Failed to query top accidents", &e),
    }
}

/// `GET /api/state/details`
///
/// Per-county statistics within a required state, shaped as GeoJSON, plus
/// a whole-state summary.
pub async fn state_details(
    state: web::Data<AppState>,
    params: web::Query<FilterQueryParams>,
) -> HttpResponse {
    let spec = match FilterSpec::parse(params.raw()) {
        Ok(spec) => spec,
        Err(e) => return bad_request(&e),
    };
    if let Err(e) = spec.require(GeoLevel::State) {
        return bad_request(&e);
    }

    match planner::state_details(state.db.as_ref(), &spec).await {
        Ok(details) => HttpResponse::Ok().json(StateDetailsResponse::from_details(details)),
        Err(e) => analytics_error("Failed to query state details", &e),
    }
}

/// `GET /api/county/time-analysis`
///
/// Dense time-bucket series for a required county and state. A filter on
/// the grouped dimension is ignored; the echoed metadata reflects the
/// filters actually applied.
pub async fn county_time_analysis(
    state: web::Data<AppState>,
    params: web::Query<FilterQueryParams>,
) -> HttpResponse {
    let spec = match FilterSpec::parse(params.raw()) {
        Ok(spec) => spec,
        Err(e) => return bad_request(&e),
    };
    let (county, us_state) = match required_county_scope(&spec) {
        Ok(scope) => scope,
        Err(e) => return bad_request(&e),
    };
    let dimension = match required_dimension(&params) {
        Ok(dimension) => dimension,
        Err(e) => return bad_request(&e),
    };
    let include_cities = params.include_cities.unwrap_or(false);

    match planner::time_series(state.db.as_ref(), &spec, dimension, include_cities).await {
        Ok(series) => HttpResponse::Ok().json(TimeAnalysisResponse {
            success: true,
            data: SeriesBody::from_series(&series, include_cities),
            metadata: TimeAnalysisMetadata {
                county,
                state: us_state,
                time_type: dimension.to_string(),
                filters: spec.effective_filters(Some(dimension)),
            },
        }),
        Err(e) => analytics_error("Failed to query time analysis", &e),
    }
}

/// `GET /api/analysis/cities`
///
/// Top cities within a required county and state, scoped to a required
/// bucket range of a time dimension (a chart selection).
pub async fn city_analysis(
    state: web::Data<AppState>,
    params: web::Query<FilterQueryParams>,
) -> HttpResponse {
    let spec = match FilterSpec::parse(params.raw()) {
        Ok(spec) => spec,
        Err(e) => return bad_request(&e),
    };
    if let Err(e) = required_county_scope(&spec) {
        return bad_request(&e);
    }
    let range = match required_range(&params) {
        Ok(range) => range,
        Err(e) => return bad_request(&e),
    };

    match planner::top_areas(state.db.as_ref(), &spec, GeoLevel::City, Some(&range)).await {
        Ok(areas) => HttpResponse::Ok().json(areas),
        Err(e) => analytics_error("Failed to query city analysis", &e),
    }
}

/// `GET /api/analysis/streets`
///
/// Top streets within a required city, county, and state, scoped to a
/// required bucket range of a time dimension.
pub async fn street_analysis(
    state: web::Data<AppState>,
    params: web::Query<FilterQueryParams>,
) -> HttpResponse {
    let spec = match FilterSpec::parse(params.raw()) {
        Ok(spec) => spec,
        Err(e) => return bad_request(&e),
    };
    if let Err(e) = spec.require(GeoLevel::City) {
        return bad_request(&e);
    }
    let range = match required_range(&params) {
        Ok(range) => range,
        Err(e) => return bad_request(&e),
    };

    match planner::top_areas(state.db.as_ref(), &spec, GeoLevel::Street, Some(&range)).await {
        Ok(areas) => HttpResponse::Ok().json(areas),
        Err(e) => analytics_error("Failed to query street analysis", &e),
    }
}

/// `GET /api/temporal/summary`
pub async fn temporal_summary(state: web::Data<AppState>) -> HttpResponse {
    match planner::temporal_summary(state.db.as_ref()).await {
        Ok(summary) => HttpResponse::Ok().json(summary),
        Err(e) => analytics_error("Failed to query temporal summary", &e),
    }
}

/// `GET /api/weather/summary`
pub async fn weather_summary(state: web::Data<AppState>) -> HttpResponse {
    match planner::weather_summary(state.db.as_ref()).await {
        Ok(summary) => HttpResponse::Ok().json(summary),
        Err(e) => analytics_error("Failed to query weather summary", &e),
    }
}

/// `GET /api/metadata`
pub async fn metadata(state: web::Data<AppState>) -> HttpResponse {
    match queries::table_metadata(state.db.as_ref()).await {
        Ok(metadata) => HttpResponse::Ok().json(metadata),
        Err(e) => db_error("Failed to query metadata", &e),
    }
}

/// Resolves the required county+state scope shared by the county-level
/// analysis endpoints.
fn required_county_scope(spec: &FilterSpec) -> Result<(String, String), FilterError> {
    let county = spec.require(GeoLevel::County)?.to_string();
    let us_state = spec.require(GeoLevel::State)?.to_string();
    Ok((county, us_state))
}

/// Resolves the required `timeType` parameter.
fn required_dimension(params: &FilterQueryParams) -> Result<TimeDimension, FilterError> {
    let value = params
        .time_type
        .as_deref()
        .ok_or(FilterError::MissingParameter("timeType"))?;
    value
        .parse()
        .map_err(|_| FilterError::InvalidTimeType(value.to_string()))
}

/// Resolves the required `timeType` + `startTime` + `endTime` triple into
/// a validated bucket range.
fn required_range(params: &FilterQueryParams) -> Result<BucketRange, FilterError> {
    let dimension = required_dimension(params)?;
    let start = params
        .start_time
        .ok_or(FilterError::MissingParameter("startTime"))?;
    let end = params
        .end_time
        .ok_or(FilterError::MissingParameter("endTime"))?;
    BucketRange::new(dimension, start, end)
}

fn bad_request(e: &FilterError) -> HttpResponse {
    HttpResponse::BadRequest().json(serde_json::json!({
        "error": e.to_string()
    }))
}

fn analytics_error(context: &str, e: &AnalyticsError) -> HttpResponse {
    log::error!("{context}: {e}");
    HttpResponse::InternalServerError().json(serde_json::json!({
        "error": "Internal server error",
        "message": context,
    }))
}

fn db_error(context: &str, e: &DbError) -> HttpResponse {
    log::error!("{context}: {e}");
    match e {
        DbError::Unavailable { .. } => {
            HttpResponse::ServiceUnavailable().json(serde_json::json!({
                "error": "Store unavailable",
                "message": context,
            }))
        }
        DbError::Database(_) => HttpResponse::InternalServerError().json(serde_json::json!({
            "error": "Internal server error",
            "message": context,
        })),
    }
}
