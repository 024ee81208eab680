//! Stats module - frequency counts and numeric distributions

pub mod aggregator;
pub mod distribution;

pub use aggregator::{AggregationError, AggregationResult, Aggregator, CountOrder};
pub use distribution::{Histogram, HistogramBin, Kde};
