//! Domain models for the lyrical complexity pipeline.
//!
//! - [`ChartEntry`] - one chart position, before lyrics are looked up
//! - [`SongRecord`] - chart position plus (possibly missing) lyrics
//! - [`ComplexityMetrics`] - scalar metrics computed from lyrics
//! - [`ComplexityRow`] - the per-song output record
//! - [`YearlyStats`] / [`DecadeStats`] - grouped summary statistics
//! - [`Metric`] - names one numeric metric column

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// Input Records
// =============================================================================

/// A song listed on a yearly chart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChartEntry {
    pub rank: u32,
    pub year: i32,
    pub artist: String,
    pub title: String,
}

/// A chart entry after lyrics extraction.
///
/// `lyrics` is `None` when the lookup found nothing or failed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SongRecord {
    pub rank: u32,
    pub year: i32,
    pub artist: String,
    pub title: String,
    pub lyrics: Option<String>,
}

impl SongRecord {
    pub fn new(entry: ChartEntry, lyrics: Option<String>) -> Self {
        Self {
            rank: entry.rank,
            year: entry.year,
            artist: entry.artist,
            title: entry.title,
            lyrics,
        }
    }
}

// =============================================================================
// Metrics
// =============================================================================

/// Complexity metrics for one lyric text.
///
/// Diversity and readability are `None` when there are no words to measure.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct ComplexityMetrics {
    pub word_count: usize,
    pub unique_word_count: usize,
    pub lexical_diversity: Option<f64>,
    pub flesch_kincaid_score: Option<f64>,
    pub avg_sentence_length: f64,
}

impl ComplexityMetrics {
    /// Metrics for absent or empty lyrics.
    pub fn empty() -> Self {
        Self::default()
    }

    /// True when at least one word was counted.
    pub fn has_words(&self) -> bool {
        self.word_count > 0
    }
}

/// One numeric metric column.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    WordCount,
    UniqueWordCount,
    LexicalDiversity,
    FleschKincaidScore,
    AvgSentenceLength,
}

impl Metric {
    /// Every metric, in column order.
    pub const ALL: [Metric; 5] = [
        Metric::WordCount,
        Metric::UniqueWordCount,
        Metric::LexicalDiversity,
        Metric::FleschKincaidScore,
        Metric::AvgSentenceLength,
    ];

    /// Column name used in files and tables.
    pub fn column(&self) -> &'static str {
        match self {
            Self::WordCount => "word_count",
            Self::UniqueWordCount => "unique_word_count",
            Self::LexicalDiversity => "lexical_diversity",
            Self::FleschKincaidScore => "flesch_kincaid_score",
            Self::AvgSentenceLength => "avg_sentence_length",
        }
    }

    /// Parse a column name.
    pub fn from_column(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.column() == name.trim())
    }

    /// Sample value of this metric for a row.
    ///
    /// Rows without lyrics yield `None` for every metric, so they never pull
    /// statistics towards zero.
    pub fn value(&self, row: &ComplexityRow) -> Option<f64> {
        if !row.lyrics_found {
            return None;
        }
        match self {
            Self::WordCount => Some(row.word_count as f64),
            Self::UniqueWordCount => Some(row.unique_word_count as f64),
            Self::LexicalDiversity => row.lexical_diversity,
            Self::FleschKincaidScore => row.flesch_kincaid_score,
            Self::AvgSentenceLength => Some(row.avg_sentence_length),
        }
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.column())
    }
}

// =============================================================================
// Per-song Output
// =============================================================================

/// Normalized per-song output record.
///
/// Fields are flat so the row serializes directly to CSV.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComplexityRow {
    pub rank: u32,
    pub year: i32,
    pub artist: String,
    pub title: String,
    pub lyrics_found: bool,
    pub word_count: usize,
    pub unique_word_count: usize,
    pub lexical_diversity: Option<f64>,
    pub flesch_kincaid_score: Option<f64>,
    pub avg_sentence_length: f64,
    pub complexity_category: Option<String>,
    pub rank_category: String,
    pub created_at: DateTime<Utc>,
}

impl ComplexityRow {
    /// Enclosing decade, e.g. 2015 -> 2010.
    pub fn decade(&self) -> i32 {
        decade_of(self.year)
    }
}

/// Truncate a year to its decade.
pub fn decade_of(year: i32) -> i32 {
    year - year.rem_euclid(10)
}

// =============================================================================
// Aggregates
// =============================================================================

/// Summary statistics for one metric within one group.
///
/// `samples` counts the non-null values the statistics were computed from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct MetricSummary {
    pub samples: usize,
    pub mean: Option<f64>,
    pub std_dev: Option<f64>,
    pub median: Option<f64>,
}

/// Statistics for one chart year.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct YearlyStats {
    pub year: i32,
    /// Every row of the year, with or without lyrics.
    pub song_count: usize,
    pub lyrics_found_count: usize,
    pub metrics: BTreeMap<Metric, MetricSummary>,
    /// Readability mean minus the previous listed year's mean.
    /// Positive means lyrics got simpler.
    pub complexity_trend: Option<f64>,
}

impl YearlyStats {
    pub fn summary(&self, metric: Metric) -> Option<&MetricSummary> {
        self.metrics.get(&metric)
    }
}

/// Statistics for one decade.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DecadeStats {
    pub decade: i32,
    pub song_count: usize,
    pub lyrics_found_count: usize,
    pub metrics: BTreeMap<Metric, MetricSummary>,
}

impl DecadeStats {
    pub fn summary(&self, metric: Metric) -> Option<&MetricSummary> {
        self.metrics.get(&metric)
    }
}

// =============================================================================
// Tests
// =============================================================================
