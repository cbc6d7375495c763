//! Transformation module.
//!
//! Turns song records into complexity rows and grouped statistics:
//! - Syllables: pluggable syllable heuristics
//! - Metrics: per-lyric complexity metrics
//! - Rows: per-song output rows with categories
//! - Aggregate: yearly and decade statistics
//! - Insights: headline findings over the rows
//! - Pipeline: the transform stage tying these together

pub mod aggregate;
pub mod insights;
pub mod metrics;
pub mod pipeline;
pub mod rows;
pub mod syllables;

pub use aggregate::{aggregate_by_decade, aggregate_by_year, Aggregator};
pub use insights::{generate_insights, Insights};
pub use metrics::{compute_metrics, normalize_lyrics, MetricCalculator};
pub use pipeline::{TransformOutput, Transformer};
pub use rows::RowBuilder;
pub use syllables::{SyllableFn, SyllableHeuristic};
