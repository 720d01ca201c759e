//! Statistical reduction of index rasters
//!
//! - **summary**: NaN-aware mean / std / max / min per index, and the
//!   24-entry `MetricsSummary` built from them

pub mod summary;

pub use summary::{
    compute_metrics, metric_key, summarize, IndexStats, MetricsAggregation, MetricsSummary, Stat,
};
