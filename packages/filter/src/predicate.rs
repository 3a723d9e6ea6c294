//! Compilation of a [`FilterSpec`] into a parameterized WHERE clause.
//!
//! Clauses are emitted in a fixed order so that the same filter always
//! produces the same SQL text, and the same compiled predicate can drive
//! both a row query and its matching count query. User data is carried
//! exclusively in positional [`DatabaseValue`] parameters; the only
//! identifiers interpolated into SQL text come from the [`Column`]
//! allow-list and the road-feature flag names.

use accident_map_accident_models::{FeatureFilter, GeoLevel, TimeDimension};
use switchy_database::DatabaseValue;

use crate::spec::{BucketRange, FilterSpec};

/// Allow-list of event-table columns the compiler may reference by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    /// `state`
    State,
    /// `county`
    County,
    /// `city`
    City,
    /// `street`
    Street,
    /// `year`
    Year,
    /// `month`
    Month,
    /// `dayofweek`
    DayOfWeek,
    /// `hour`
    Hour,
    /// `severity`
    Severity,
    /// `weather_condition`
    WeatherCondition,
    /// `sunrise_sunset`
    SunriseSunset,
    /// `start_lat`
    StartLat,
    /// `start_lng`
    StartLng,
}

impl Column {
    /// The column identifier as it appears in SQL.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::State => "state",
            Self::County => "county",
            Self::City => "city",
            Self::Street => "street",
            Self::Year => "year",
            Self::Month => "month",
            Self::DayOfWeek => "dayofweek",
            Self::Hour => "hour",
            Self::Severity => "severity",
            Self::WeatherCondition => "weather_condition",
            Self::SunriseSunset => "sunrise_sunset",
            Self::StartLat => "start_lat",
            Self::StartLng => "start_lng",
        }
    }
}

impl From<TimeDimension> for Column {
    fn from(dimension: TimeDimension) -> Self {
        match dimension {
            TimeDimension::Hour => Self::Hour,
            TimeDimension::DayOfWeek => Self::DayOfWeek,
            TimeDimension::Month => Self::Month,
        }
    }
}

impl From<GeoLevel> for Column {
    fn from(level: GeoLevel) -> Self {
        match level {
            GeoLevel::State => Self::State,
            GeoLevel::County => Self::County,
            GeoLevel::City => Self::City,
            GeoLevel::Street => Self::Street,
        }
    }
}

/// An ordered predicate list with its parallel positional parameters.
///
/// Reusing one compiled predicate for both the row query and the count
/// query guarantees `count(predicate) == rows(predicate).len()`.
#[derive(Debug, Default)]
pub struct CompiledPredicate {
    clauses: Vec<String>,
    params: Vec<DatabaseValue>,
}

impl CompiledPredicate {
    /// Renders the WHERE clause body. An empty predicate renders as the
    /// always-true `1=1`, never an empty clause.
    #[must_use]
    pub fn where_clause(&self) -> String {
        if self.clauses.is_empty() {
            "1=1".to_string()
        } else {
            self.clauses.join(" AND ")
        }
    }

    /// Positional parameters, in clause order.
    #[must_use]
    pub fn params(&self) -> &[DatabaseValue] {
        &self.params
    }

    /// Consumes the predicate, yielding its parameters for queries that
    /// need to append trailing values (LIMIT/OFFSET).
    #[must_use]
    pub fn into_params(self) -> Vec<DatabaseValue> {
        self.params
    }

    /// Index the next appended parameter will take (`$1`-based).
    #[must_use]
    pub fn next_index(&self) -> usize {
        self.params.len() + 1
    }

    /// Appends a not-null requirement for a column the query shape depends
    /// on (group-by columns, coordinates for map views).
    pub fn require_not_null(&mut self, column: Column) {
        self.clauses.push(format!("{} IS NOT NULL", column.as_sql()));
    }

    /// Appends not-null requirements for both coordinate columns.
    pub fn require_coordinates(&mut self) {
        self.require_not_null(Column::StartLat);
        self.require_not_null(Column::StartLng);
    }

    /// Appends an inclusive bucket-range constraint on a time dimension.
    pub fn constrain_range(&mut self, range: &BucketRange) {
        let column = Column::from(range.dimension).as_sql();
        let low = self.push_param(DatabaseValue::Int32(range.start));
        let high = self.push_param(DatabaseValue::Int32(range.end));
        self.clauses
            .push(format!("{column} BETWEEN ${low} AND ${high}"));
    }

    fn push_param(&mut self, value: DatabaseValue) -> usize {
        self.params.push(value);
        self.params.len()
    }

    fn push_eq_str(&mut self, column: Column, value: &str) {
        let idx = self.push_param(DatabaseValue::String(value.to_string()));
        self.clauses.push(format!("{} = ${idx}", column.as_sql()));
    }

    fn push_eq_i32(&mut self, column: Column, value: i32) {
        let idx = self.push_param(DatabaseValue::Int32(value));
        self.clauses.push(format!("{} = ${idx}", column.as_sql()));
    }

    /// Set membership expands to one positional parameter per element in
    /// ascending order; the store binding layer carries no array values.
    fn push_in<I>(&mut self, column: Column, values: I)
    where
        I: IntoIterator<Item = i32>,
    {
        let placeholders: Vec<String> = values
            .into_iter()
            .map(|value| format!("${}", self.push_param(DatabaseValue::Int32(value))))
            .collect();
        self.clauses.push(format!(
            "{} IN ({})",
            column.as_sql(),
            placeholders.join(", ")
        ));
    }
}

/// Compiles a filter into an ordered predicate list.
///
/// `grouping` names the time dimension the surrounding query buckets on,
/// if any; the filter set for that dimension is suppressed, since
/// filtering and grouping on the same dimension would contradict the
/// displayed buckets. Clause order is fixed: geographic equality
/// (coarsest first), years, months, days, hours, feature flag, severity,
/// weather, bounding region. Endpoint-specific clauses (not-null
/// requirements, bucket ranges) are appended by the caller afterwards.
#[must_use]
pub fn compile(spec: &FilterSpec, grouping: Option<TimeDimension>) -> CompiledPredicate {
    let mut predicate = CompiledPredicate::default();

    for (column, value) in [
        (Column::State, spec.state()),
        (Column::County, spec.county()),
        (Column::City, spec.city()),
        (Column::Street, spec.street()),
    ] {
        if let Some(value) = value {
            predicate.push_eq_str(column, value);
        }
    }

    if !spec.years().is_empty() {
        predicate.push_in(Column::Year, spec.years().iter().copied());
    }

    if !spec.months().is_empty() && grouping != Some(TimeDimension::Month) {
        predicate.push_in(Column::Month, spec.months().iter().map(|&m| i32::from(m)));
    }

    if !spec.days().is_empty() && grouping != Some(TimeDimension::DayOfWeek) {
        predicate.push_in(
            Column::DayOfWeek,
            spec.days().iter().map(|&d| i32::from(d)),
        );
    }

    if !spec.hours().is_empty() && grouping != Some(TimeDimension::Hour) {
        predicate.push_in(Column::Hour, spec.hours().iter().map(|&h| i32::from(h)));
    }

    if let Some(feature) = spec.feature() {
        match feature {
            FeatureFilter::Road(flag) => {
                let idx = predicate.push_param(DatabaseValue::Bool(true));
                predicate.clauses.push(format!("{} = ${idx}", flag.as_ref()));
            }
            FeatureFilter::Daylight(period) => {
                let idx = predicate.push_param(DatabaseValue::String(period.to_string()));
                predicate
                    .clauses
                    .push(format!("{} = ${idx}", Column::SunriseSunset.as_sql()));
            }
        }
    }

    if let Some(severity) = spec.severity() {
        predicate.push_eq_i32(Column::Severity, i32::from(severity.value()));
    }

    if let Some(weather) = spec.weather() {
        predicate.push_eq_str(Column::WeatherCondition, weather);
    }

    if let Some(region) = spec.region() {
        let south = predicate.push_param(DatabaseValue::Real64(region.south));
        let north = predicate.push_param(DatabaseValue::Real64(region.north));
        predicate.clauses.push(format!(
            "{} BETWEEN ${south} AND ${north}",
            Column::StartLat.as_sql()
        ));
        let west = predicate.push_param(DatabaseValue::Real64(region.west));
        let east = predicate.push_param(DatabaseValue::Real64(region.east));
        predicate.clauses.push(format!(
            "{} BETWEEN ${west} AND ${east}",
            Column::StartLng.as_sql()
        ));
    }

    predicate
}

#[cfg(test)]
mod tests {
    use accident_map_accident_models::BoundingBox;

    use super::*;
    use crate::spec::RawFilter;

    fn spec(raw: RawFilter<'_>) -> FilterSpec {
        FilterSpec::parse(raw).unwrap()
    }

    #[test]
    fn empty_filter_compiles_to_always_true() {
        let predicate = compile(&spec(RawFilter::default()), None);
        assert_eq!(predicate.where_clause(), "1=1");
        assert!(predicate.params().is_empty());
    }

    #[test]
    fn geographic_levels_compile_coarsest_first() {
        let predicate = compile(
            &spec(RawFilter {
                state: Some("CA"),
                county: Some("Los Angeles"),
                city: Some("Long Beach"),
                ..RawFilter::default()
            }),
            None,
        );
        assert_eq!(
            predicate.where_clause(),
            "state = $1 AND county = $2 AND city = $3"
        );
        assert!(matches!(
            &predicate.params()[0],
            DatabaseValue::String(s) if s == "CA"
        ));
        assert!(matches!(
            &predicate.params()[2],
            DatabaseValue::String(s) if s == "Long Beach"
        ));
    }

    #[test]
    fn set_membership_expands_in_ascending_order() {
        let predicate = compile(
            &spec(RawFilter {
                years: Some("2020,2018,2019"),
                ..RawFilter::default()
            }),
            None,
        );
        assert_eq!(predicate.where_clause(), "year IN ($1, $2, $3)");
        let years: Vec<i32> = predicate
            .params()
            .iter()
            .map(|p| match p {
                DatabaseValue::Int32(v) => *v,
                other => panic!("unexpected param {other:?}"),
            })
            .collect();
        assert_eq!(years, vec![2018, 2019, 2020]);
    }

    #[test]
    fn parameter_indices_continue_across_clauses() {
        let predicate = compile(
            &spec(RawFilter {
                state: Some("TX"),
                years: Some("2019,2020"),
                months: Some("6"),
                ..RawFilter::default()
            }),
            None,
        );
        assert_eq!(
            predicate.where_clause(),
            "state = $1 AND year IN ($2, $3) AND month IN ($4)"
        );
        assert_eq!(predicate.params().len(), 4);
    }

    #[test]
    fn grouped_dimension_filter_is_suppressed() {
        let months = spec(RawFilter {
            state: Some("WA"),
            months: Some("1,2"),
            ..RawFilter::default()
        });
        let grouped = compile(&months, Some(TimeDimension::Month));
        let ungrouped = compile(
            &spec(RawFilter {
                state: Some("WA"),
                ..RawFilter::default()
            }),
            Some(TimeDimension::Month),
        );
        // A same-dimension filter must not narrow the displayed buckets.
        assert_eq!(grouped.where_clause(), ungrouped.where_clause());
        assert_eq!(grouped.params().len(), ungrouped.params().len());
    }

    #[test]
    fn other_dimension_filters_survive_grouping() {
        let predicate = compile(
            &spec(RawFilter {
                days: Some("0,6"),
                hours: Some("8"),
                ..RawFilter::default()
            }),
            Some(TimeDimension::Hour),
        );
        assert_eq!(predicate.where_clause(), "dayofweek IN ($1, $2)");
    }

    #[test]
    fn road_feature_compiles_to_boolean_flag() {
        let predicate = compile(
            &spec(RawFilter {
                feature: Some("traffic_signal"),
                ..RawFilter::default()
            }),
            None,
        );
        assert_eq!(predicate.where_clause(), "traffic_signal = $1");
        assert!(matches!(predicate.params()[0], DatabaseValue::Bool(true)));
    }

    #[test]
    fn daylight_feature_compiles_to_sunrise_sunset() {
        let predicate = compile(
            &spec(RawFilter {
                feature: Some("Night"),
                ..RawFilter::default()
            }),
            None,
        );
        assert_eq!(predicate.where_clause(), "sunrise_sunset = $1");
        assert!(matches!(
            &predicate.params()[0],
            DatabaseValue::String(s) if s == "Night"
        ));
    }

    #[test]
    fn severity_and_weather_follow_feature() {
        let predicate = compile(
            &spec(RawFilter {
                feature: Some("Day"),
                severity: Some(4),
                weather: Some("Heavy Rain"),
                ..RawFilter::default()
            }),
            None,
        );
        assert_eq!(
            predicate.where_clause(),
            "sunrise_sunset = $1 AND severity = $2 AND weather_condition = $3"
        );
    }

    #[test]
    fn bounding_region_constrains_both_axes() {
        let predicate = compile(
            &spec(RawFilter::default()).with_default_region(BoundingBox::CONTINENTAL_US),
            None,
        );
        assert_eq!(
            predicate.where_clause(),
            "start_lat BETWEEN $1 AND $2 AND start_lng BETWEEN $3 AND $4"
        );
        assert_eq!(predicate.params().len(), 4);
    }

    #[test]
    fn not_null_and_range_append_after_compiled_clauses() {
        let mut predicate = compile(
            &spec(RawFilter {
                state: Some("FL"),
                ..RawFilter::default()
            }),
            None,
        );
        predicate.require_not_null(Column::County);
        predicate
            .constrain_range(&BucketRange::new(TimeDimension::Hour, 7, 9).unwrap());
        assert_eq!(
            predicate.where_clause(),
            "state = $1 AND county IS NOT NULL AND hour BETWEEN $2 AND $3"
        );
    }

    #[test]
    fn count_and_rows_share_the_same_predicate() {
        let predicate = compile(
            &spec(RawFilter {
                state: Some("NY"),
                years: Some("2021"),
                ..RawFilter::default()
            }),
            None,
        );
        // The row query and count query must bind identical text and
        // parameters for their results to agree.
        let rows_sql = format!(
            "SELECT * FROM accidents WHERE {}",
            predicate.where_clause()
        );
        let count_sql = format!(
            "SELECT COUNT(*) FROM accidents WHERE {}",
            predicate.where_clause()
        );
        assert!(rows_sql.ends_with("state = $1 AND year IN ($2)"));
        assert!(count_sql.ends_with("state = $1 AND year IN ($2)"));
        assert_eq!(predicate.next_index(), 3);
    }
}
