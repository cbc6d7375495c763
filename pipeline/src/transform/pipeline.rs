//! Transform stage: song records in, rows and statistics out.
//!
//! ```text
//! SongRecord ──validate──▶ MetricCalculator ──▶ RowBuilder ──▶ ComplexityRow
//!     │                                                           │
//!     └─ MalformedRecord (skipped, logged)          Aggregator ◀──┘
//!                                                      │
//!                                     YearlyStats + DecadeStats
//! ```
//!
//! The transform is deterministic apart from `created_at`, which is passed in.
//! Rows keep input order; statistics are sorted by year and decade.
//!
//! # Example
//!
//! ```rust,ignore
//! use lyrical_complexity::{PipelineConfig, Transformer};
//!
//! let transformer = Transformer::from_config(&PipelineConfig::default());
//! let output = transformer.transform(songs, chrono::Utc::now());
//! println!("{} rows, {} years", output.rows.len(), output.yearly.len());
//! ```

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::aggregate::Aggregator;
use super::metrics::MetricCalculator;
use super::rows::RowBuilder;
use crate::config::{PipelineConfig, YearRange};
use crate::error::{MalformedReason, MalformedRecord};
use crate::models::{ComplexityRow, DecadeStats, SongRecord, YearlyStats};

/// Everything the transform produces.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransformOutput {
    pub rows: Vec<ComplexityRow>,
    pub yearly: Vec<YearlyStats>,
    pub decade: Vec<DecadeStats>,
    /// Records rejected during validation. Not persisted.
    #[serde(skip)]
    pub skipped: Vec<MalformedRecord>,
}

/// Runs validation, scoring and aggregation with one configuration.
#[derive(Debug, Clone)]
pub struct Transformer {
    calculator: MetricCalculator,
    rows: RowBuilder,
    aggregator: Aggregator,
    years: YearRange,
    chart_size: u32,
}

impl Transformer {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            calculator: MetricCalculator::from_heuristic(config.syllable_heuristic),
            rows: RowBuilder::from_config(config),
            aggregator: Aggregator::from_config(config),
            years: config.years,
            chart_size: config.chart_size,
        }
    }

    /// Swap the metric calculator, e.g. for another syllable heuristic.
    pub fn with_calculator(mut self, calculator: MetricCalculator) -> Self {
        self.calculator = calculator;
        self
    }

    /// Check that a record can be scored.
    pub fn validate(&self, song: &SongRecord) -> Result<(), MalformedRecord> {
        let malformed = |reason| MalformedRecord::new(&song.artist, &song.title, reason);

        if song.artist.trim().is_empty() {
            return Err(malformed(MalformedReason::MissingField("artist")));
        }
        if song.title.trim().is_empty() {
            return Err(malformed(MalformedReason::MissingField("title")));
        }
        if song.rank == 0 || song.rank > self.chart_size {
            return Err(malformed(MalformedReason::RankOutOfRange {
                rank: song.rank as i64,
                chart_size: self.chart_size,
            }));
        }
        if !self.years.contains(song.year as i64) {
            return Err(malformed(MalformedReason::YearOutOfRange {
                year: song.year as i64,
                start: self.years.start,
                end: self.years.end,
            }));
        }
        Ok(())
    }

    /// Score every valid record and aggregate the result.
    ///
    /// Malformed records are skipped with a warning and returned in
    /// [`TransformOutput::skipped`], as are repeats of an (artist, title, year)
    /// already seen, so statistics count each stored row once. Empty input
    /// gives empty output.
    pub fn transform(&self, songs: Vec<SongRecord>, now: DateTime<Utc>) -> TransformOutput {
        info!(records = songs.len(), "Transforming song records");

        let mut rows = Vec::with_capacity(songs.len());
        let mut skipped = Vec::new();
        let mut seen = HashSet::new();

        for song in songs {
            let checked = self.validate(&song).and_then(|()| {
                if seen.insert((song.artist.clone(), song.title.clone(), song.year)) {
                    Ok(())
                } else {
                    Err(MalformedRecord::new(
                        &song.artist,
                        &song.title,
                        MalformedReason::Duplicate { year: song.year },
                    ))
                }
            });
            if let Err(record) = checked {
                warn!("Skipping {}", record);
                skipped.push(record);
                continue;
            }
            let metrics = self.calculator.compute(song.lyrics.as_deref());
            debug!(
                year = song.year,
                rank = song.rank,
                words = metrics.word_count,
                "Scored {} - {}",
                song.artist,
                song.title
            );
            rows.push(self.rows.build_row(song, metrics, now));
        }

        let yearly = self.aggregator.aggregate_by_year(&rows);
        let decade = self.aggregator.aggregate_by_decade(&rows);
        let with_lyrics = rows.iter().filter(|r| r.lyrics_found).count();

        info!(
            rows = rows.len(),
            with_lyrics,
            skipped = skipped.len(),
            years = yearly.len(),
            decades = decade.len(),
            "Transform complete"
        );

        TransformOutput {
            rows,
            yearly,
            decade,
            skipped,
        }
    }
}

impl Default for Transformer {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}
