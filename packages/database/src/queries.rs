//! Pass-through reads with no filter compilation.

use moosicbox_json_utils::database::ToValue as _;
use serde::{Deserialize, Serialize};
use switchy_database::Database;

use crate::DbError;

/// One column of the event table, from the information schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnInfo {
    /// Column name.
    pub column_name: String,
    /// Declared data type.
    pub data_type: String,
    /// `YES`/`NO` nullability marker.
    pub is_nullable: String,
}

/// Basic statistics over the whole event table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableStatistics {
    /// Total event rows.
    pub total_records: u64,
    /// Distinct states present.
    pub total_states: u64,
    /// Distinct weather conditions present.
    pub weather_conditions: u64,
    /// Earliest `start_time`, as text.
    pub date_range_start: Option<String>,
    /// Latest `start_time`, as text.
    pub date_range_end: Option<String>,
}

/// Column introspection plus table statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableMetadata {
    /// Event-table columns in ordinal order.
    pub columns: Vec<ColumnInfo>,
    /// Whole-table statistics.
    pub statistics: TableStatistics,
}

/// Returns all distinct states that have accident data, ascending.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn distinct_states(db: &dyn Database) -> Result<Vec<String>, DbError> {
    let rows = db
        .query_raw_params(
            "SELECT DISTINCT state FROM accidents \
             WHERE state IS NOT NULL ORDER BY state",
            &[],
        )
        .await?;

    Ok(rows
        .iter()
        .map(|row| row.to_value("state").unwrap_or_default())
        .collect())
}

/// Returns column introspection and basic statistics for the event table.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn table_metadata(db: &dyn Database) -> Result<TableMetadata, DbError> {
    let column_rows = db
        .query_raw_params(
            "SELECT column_name, data_type, is_nullable \
             FROM information_schema.columns \
             WHERE table_name = 'accidents' \
             ORDER BY ordinal_position",
            &[],
        )
        .await?;

    let columns = column_rows
        .iter()
        .map(|row| ColumnInfo {
            column_name: row.to_value("column_name").unwrap_or_default(),
            data_type: row.to_value("data_type").unwrap_or_default(),
            is_nullable: row.to_value("is_nullable").unwrap_or_default(),
        })
        .collect();

    let stats_rows = db
        .query_raw_params(
            "SELECT COUNT(*) AS total_records, \
             COUNT(DISTINCT state) AS total_states, \
             COUNT(DISTINCT weather_condition) AS weather_conditions, \
             MIN(start_time)::text AS date_range_start, \
             MAX(start_time)::text AS date_range_end \
             FROM accidents",
            &[],
        )
        .await?;

    let statistics = stats_rows.first().map_or(
        TableStatistics {
            total_records: 0,
            total_states: 0,
            weather_conditions: 0,
            date_range_start: None,
            date_range_end: None,
        },
        |row| {
            let total_records: i64 = row.to_value("total_records").unwrap_or(0);
            let total_states: i64 = row.to_value("total_states").unwrap_or(0);
            let weather_conditions: i64 = row.to_value("weather_conditions").unwrap_or(0);
            TableStatistics {
                total_records: u64::try_from(total_records).unwrap_or(0),
                total_states: u64::try_from(total_states).unwrap_or(0),
                weather_conditions: u64::try_from(weather_conditions).unwrap_or(0),
                date_range_start: row.to_value("date_range_start").unwrap_or(None),
                date_range_end: row.to_value("date_range_end").unwrap_or(None),
            }
        },
    );

    Ok(TableMetadata {
        columns,
        statistics,
    })
}
