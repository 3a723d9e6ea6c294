#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Filter-driven aggregation engine for the accident map.
//!
//! Takes a compiled filter predicate and runs the aggregate queries behind
//! each analytical view: paginated listings, time-bucket series,
//! geographic breakdowns, state details, and the map point sampler. Every
//! function accepts a `&dyn Database` store handle; no state is held
//! between requests.

pub mod planner;
pub mod series;
pub mod spatial;

use thiserror::Error;

/// Errors that can occur during analytics operations.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// The store rejected or failed to execute a query.
    #[error("Database error: {0}")]
    Database(#[from] switchy_database::DatabaseError),
}

/// Logs a failed query with its SQL text and parameter count.
///
/// Parameter values are user data and are never logged.
pub(crate) fn query_error(
    sql: &str,
    param_count: usize,
    e: switchy_database::DatabaseError,
) -> AnalyticsError {
    log::error!("Store rejected query: {e}; sql={sql}; params={param_count}");
    AnalyticsError::Database(e)
}

/// Rounds to 2 decimal places.
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Share of `total` represented by `count`, as a percentage rounded to 2
/// decimals. A zero total yields 0 rather than a division failure.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn percentage(count: u64, total: u64) -> f64 {
    let denominator = if total == 0 { 1 } else { total };
    round2(100.0 * count as f64 / denominator as f64)
}

/// Splits a `string_agg(DISTINCT …, ', ')` result into its members.
pub(crate) fn split_list(value: Option<String>) -> Vec<String> {
    value
        .filter(|s| !s.is_empty())
        .map(|s| s.split(", ").map(str::to_string).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_to_two_decimals() {
        assert!((round2(2.675_4) - 2.68).abs() < f64::EPSILON);
        assert!((round2(2.0) - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn percentage_handles_zero_total() {
        assert!((percentage(0, 0) - 0.0).abs() < f64::EPSILON);
        assert!((percentage(1, 4) - 25.0).abs() < f64::EPSILON);
        assert!((percentage(1, 3) - 33.33).abs() < f64::EPSILON);
    }

    #[test]
    fn percentages_sum_to_one_hundred() {
        let counts = [7u64, 2, 1];
        let total: u64 = counts.iter().sum();
        let sum: f64 = counts.iter().map(|&c| percentage(c, total)).sum();
        assert!((sum - 100.0).abs() < 0.01);
    }

    #[test]
    fn splits_aggregated_lists() {
        assert_eq!(
            split_list(Some("Fog, Light Rain, Snow".to_string())),
            vec!["Fog", "Light Rain", "Snow"]
        );
        assert!(split_list(None).is_empty());
        assert!(split_list(Some(String::new())).is_empty());
    }
}
