//! Aggregator Module
//! Frequency counts per categorical column.
//!
//! Counts are grouped with a stable group-by and sorted with an
//! order-maintaining sort, so keys with equal counts keep the order in which
//! they first appear in the cleaned data. That tie order is an implementation
//! detail; callers must not depend on it.

use polars::prelude::*;
use serde::Serialize;
use thiserror::Error;

const COUNT_COL: &str = "count";

#[derive(Error, Debug)]
pub enum AggregationError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
}

/// How aggregated keys are ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CountOrder {
    /// Largest count first (top-N reporting)
    CountDescending,
    /// Natural order of the key (e.g. model year ascending)
    KeyAscending,
}

/// Count of records per distinct key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregationResult {
    pub column: String,
    pub order: CountOrder,
    pub entries: Vec<(String, u64)>,
}

impl AggregationResult {
    /// First `n` entries in the result's order.
    pub fn top(&self, n: usize) -> AggregationResult {
        AggregationResult {
            column: self.column.clone(),
            order: self.order,
            entries: self.entries.iter().take(n).cloned().collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<u64> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, count)| *count)
    }

    pub fn total(&self) -> u64 {
        self.entries.iter().map(|(_, count)| count).sum()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn labels(&self) -> Vec<String> {
        self.entries.iter().map(|(k, _)| k.clone()).collect()
    }

    pub fn max_count(&self) -> u64 {
        self.entries.iter().map(|(_, c)| *c).max().unwrap_or(0)
    }
}

/// Groups and counts registration records.
pub struct Aggregator;

impl Aggregator {
    /// Count per distinct value, largest first.
    pub fn value_counts(df: &DataFrame, column: &str) -> Result<AggregationResult, AggregationError> {
        Self::count_by(df, column, CountOrder::CountDescending)
    }

    /// Count per distinct value, ordered by the value itself.
    pub fn counts_in_natural_order(
        df: &DataFrame,
        column: &str,
    ) -> Result<AggregationResult, AggregationError> {
        Self::count_by(df, column, CountOrder::KeyAscending)
    }

    /// Group `column` and count rows; null keys are not counted.
    pub fn count_by(
        df: &DataFrame,
        column: &str,
        order: CountOrder,
    ) -> Result<AggregationResult, AggregationError> {
        let counted = df
            .clone()
            .lazy()
            .filter(col(column).is_not_null())
            .group_by_stable([col(column)])
            .agg([len().alias(COUNT_COL)]);

        let sorted = match order {
            CountOrder::CountDescending => counted.sort(
                [COUNT_COL],
                SortMultipleOptions::default()
                    .with_order_descending(true)
                    .with_maintain_order(true),
            ),
            CountOrder::KeyAscending => counted.sort(
                [column],
                SortMultipleOptions::default().with_maintain_order(true),
            ),
        };
        let out = sorted.collect()?;

        let keys = out.column(column)?.cast(&DataType::String)?;
        let counts = out.column(COUNT_COL)?.cast(&DataType::UInt64)?;

        let entries = keys
            .str()?
            .into_iter()
            .zip(counts.u64()?.into_iter())
            .filter_map(|(key, count)| Some((key?.to_string(), count?)))
            .collect();

        Ok(AggregationResult {
            column: column.to_string(),
            order,
            entries,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DataFrame {
        df!(
            "County" => ["King", "Pierce", "King", "Snohomish", "King", "Pierce"],
            "Model Year" => [2020i64, 2018, 2023, 2018, 2020, 2020],
        )
        .unwrap()
    }

    #[test]
    fn test_value_counts_descending() {
        let result = Aggregator::value_counts(&sample(), "County").unwrap();

        assert_eq!(result.entries[0], ("King".to_string(), 3));
        assert_eq!(result.entries[1], ("Pierce".to_string(), 2));
        assert_eq!(result.get("Snohomish"), Some(1));
        assert_eq!(result.total(), 6);
    }

    #[test]
    fn test_natural_order_for_model_year() {
        let result = Aggregator::counts_in_natural_order(&sample(), "Model Year").unwrap();

        assert_eq!(
            result.entries,
            vec![
                ("2018".to_string(), 2),
                ("2020".to_string(), 3),
                ("2023".to_string(), 1),
            ]
        );
    }

    #[test]
    fn test_aggregation_is_idempotent() {
        let df = sample();
        let first = Aggregator::value_counts(&df, "County").unwrap();
        let second = Aggregator::value_counts(&df, "County").unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_top_truncates() {
        let result = Aggregator::value_counts(&sample(), "County").unwrap();
        let top = result.top(1);

        assert_eq!(top.len(), 1);
        assert_eq!(top.labels(), vec!["King".to_string()]);
    }

    #[test]
    fn test_null_keys_are_not_counted() {
        let df = df!("Make" => [Some("TESLA"), None, Some("TESLA")]).unwrap();
        let result = Aggregator::value_counts(&df, "Make").unwrap();

        assert_eq!(result.entries, vec![("TESLA".to_string(), 2)]);
    }

    #[test]
    fn test_tied_counts_are_all_present() {
        // Order among tied keys is unspecified; only membership is checked.
        let df = df!("Make" => ["KIA", "BMW", "KIA", "BMW", "AUDI"]).unwrap();
        let result = Aggregator::value_counts(&df, "Make").unwrap();

        let top_two: Vec<&str> = result.entries[..2].iter().map(|(k, _)| k.as_str()).collect();
        assert!(top_two.contains(&"KIA"));
        assert!(top_two.contains(&"BMW"));
        assert_eq!(result.entries[2], ("AUDI".to_string(), 1));
    }
}
