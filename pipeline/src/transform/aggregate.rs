//! Yearly and decade statistics over per-song rows.
//!
//! # Statistics
//!
//! For every enabled metric in every group:
//!
//! - `mean`
//! - `std_dev`: **sample** standard deviation (N−1 denominator); `None` below two samples
//! - `median`: middle value, or the mean of the two middle values
//!
//! Rows without lyrics are null for every metric. They are left out of the
//! metric statistics but still counted in `song_count`. A group with no
//! samples for a metric gets `None` statistics for it.
//!
//! Output is sorted ascending by year (resp. decade).

use std::collections::BTreeMap;

use crate::config::PipelineConfig;
use crate::models::{ComplexityRow, DecadeStats, Metric, MetricSummary, YearlyStats};

/// Groups rows and computes summary statistics for a fixed metric set.
#[derive(Debug, Clone)]
pub struct Aggregator {
    metrics: Vec<Metric>,
}

impl Aggregator {
    pub fn new(metrics: Vec<Metric>) -> Self {
        Self { metrics }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.enabled_metrics())
    }

    /// One entry per distinct year, ascending.
    pub fn aggregate_by_year(&self, rows: &[ComplexityRow]) -> Vec<YearlyStats> {
        let mut previous_mean: Option<f64> = None;

        group_by(rows, |row| row.year)
            .into_iter()
            .map(|(year, group)| {
                let metrics = self.summarize(&group);
                let mean = metrics
                    .get(&Metric::FleschKincaidScore)
                    .and_then(|s| s.mean);
                let complexity_trend = match (mean, previous_mean) {
                    (Some(current), Some(previous)) => Some(current - previous),
                    _ => None,
                };
                previous_mean = mean;

                YearlyStats {
                    year,
                    song_count: group.len(),
                    lyrics_found_count: group.iter().filter(|r| r.lyrics_found).count(),
                    metrics,
                    complexity_trend,
                }
            })
            .collect()
    }

    /// One entry per distinct decade, ascending.
    pub fn aggregate_by_decade(&self, rows: &[ComplexityRow]) -> Vec<DecadeStats> {
        group_by(rows, ComplexityRow::decade)
            .into_iter()
            .map(|(decade, group)| DecadeStats {
                decade,
                song_count: group.len(),
                lyrics_found_count: group.iter().filter(|r| r.lyrics_found).count(),
                metrics: self.summarize(&group),
            })
            .collect()
    }

    fn summarize(&self, group: &[&ComplexityRow]) -> BTreeMap<Metric, MetricSummary> {
        self.metrics
            .iter()
            .map(|&metric| {
                let values: Vec<f64> = group.iter().filter_map(|row| metric.value(row)).collect();
                (metric, summarize(&values))
            })
            .collect()
    }
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new(Metric::ALL.to_vec())
    }
}

/// Yearly statistics for every metric.
pub fn aggregate_by_year(rows: &[ComplexityRow]) -> Vec<YearlyStats> {
    Aggregator::default().aggregate_by_year(rows)
}

/// Decade statistics for every metric.
pub fn aggregate_by_decade(rows: &[ComplexityRow]) -> Vec<DecadeStats> {
    Aggregator::default().aggregate_by_decade(rows)
}

fn group_by<K, F>(rows: &[ComplexityRow], key: F) -> BTreeMap<K, Vec<&ComplexityRow>>
where
    K: Ord,
    F: Fn(&ComplexityRow) -> K,
{
    let mut groups: BTreeMap<K, Vec<&ComplexityRow>> = BTreeMap::new();
    for row in rows {
        groups.entry(key(row)).or_default().push(row);
    }
    groups
}

// =============================================================================
// Statistics
// =============================================================================

/// Summary of a sample. Empty input gives all-`None` statistics.
pub fn summarize(values: &[f64]) -> MetricSummary {
    MetricSummary {
        samples: values.len(),
        mean: mean(values),
        std_dev: sample_std_dev(values),
        median: median(values),
    }
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

pub fn sample_std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let squares: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    Some((squares / (values.len() - 1) as f64).sqrt())
}

pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}
