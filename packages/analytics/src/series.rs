//! Expansion of sparse time-bucket rows into dense, zero-filled series.

use accident_map_accident_models::TimeDimension;
use accident_map_analytics_models::{DenseSeries, SeriesBucket, SparseBucket};

/// Expands sparse aggregation rows into a dense series covering the
/// dimension's entire domain.
///
/// Every domain value appears exactly once, ascending. Buckets absent from
/// the input get count 0 and an empty city list; no count is created or
/// lost. Input buckets are assumed to lie in the domain (the store groups
/// on a domain-constrained column).
#[must_use]
pub fn normalize(dimension: TimeDimension, sparse: Vec<SparseBucket>) -> DenseSeries {
    let mut by_bucket: std::collections::BTreeMap<i32, SparseBucket> = sparse
        .into_iter()
        .map(|bucket| (bucket.bucket, bucket))
        .collect();

    let buckets = dimension
        .domain()
        .map(|value| {
            by_bucket.remove(&value).map_or(
                SeriesBucket {
                    value,
                    count: 0,
                    cities: Vec::new(),
                },
                |found| SeriesBucket {
                    value,
                    count: found.count,
                    cities: found.cities.unwrap_or_default(),
                },
            )
        })
        .collect();

    DenseSeries { dimension, buckets }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bucket(value: i32, count: u64) -> SparseBucket {
        SparseBucket {
            bucket: value,
            count,
            cities: None,
        }
    }

    #[test]
    fn fills_every_hour() {
        let series = normalize(TimeDimension::Hour, vec![bucket(7, 12), bucket(17, 30)]);
        assert_eq!(series.buckets.len(), 24);
        assert_eq!(series.buckets[7].count, 12);
        assert_eq!(series.buckets[17].count, 30);
        assert_eq!(series.buckets[0].count, 0);
        assert_eq!(series.total(), 42);
    }

    #[test]
    fn empty_input_yields_all_zero_series() {
        for dimension in [
            TimeDimension::Hour,
            TimeDimension::DayOfWeek,
            TimeDimension::Month,
        ] {
            let series = normalize(dimension, Vec::new());
            assert_eq!(series.buckets.len(), dimension.domain_len());
            assert_eq!(series.total(), 0);
        }
    }

    #[test]
    fn month_domain_starts_at_one() {
        let series = normalize(TimeDimension::Month, vec![bucket(1, 5), bucket(12, 9)]);
        assert_eq!(series.buckets.len(), 12);
        assert_eq!(series.buckets.first().unwrap().value, 1);
        assert_eq!(series.buckets.last().unwrap().value, 12);
        assert_eq!(series.buckets[0].count, 5);
        assert_eq!(series.buckets[11].count, 9);
    }

    #[test]
    fn buckets_are_ascending_with_no_gaps() {
        let series = normalize(TimeDimension::DayOfWeek, vec![bucket(6, 1), bucket(0, 2)]);
        let values: Vec<i32> = series.buckets.iter().map(|b| b.value).collect();
        assert_eq!(values, vec![0, 1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn preserves_count_sum_for_any_subset() {
        let sparse = vec![bucket(2, 10), bucket(4, 0), bucket(5, 7)];
        let input_sum: u64 = sparse.iter().map(|b| b.count).sum();
        let series = normalize(TimeDimension::DayOfWeek, sparse);
        assert_eq!(series.total(), input_sum);
    }

    #[test]
    fn absent_buckets_get_empty_city_lists() {
        let series = normalize(
            TimeDimension::Hour,
            vec![SparseBucket {
                bucket: 8,
                count: 3,
                cities: Some(vec!["Austin".to_string(), "Dallas".to_string()]),
            }],
        );
        assert_eq!(series.buckets[8].cities, vec!["Austin", "Dallas"]);
        assert!(series.buckets[9].cities.is_empty());
    }
}
