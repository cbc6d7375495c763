//! Per-song row assembly.
//!
//! Turns a [`SongRecord`] and its [`ComplexityMetrics`] into the flat
//! [`ComplexityRow`] written to files and tables. Total: every song yields
//! exactly one row.

use chrono::{DateTime, Utc};

use crate::config::{CategoryScale, PipelineConfig};
use crate::models::{ComplexityMetrics, ComplexityRow, SongRecord};

/// Builds rows with the configured rank and complexity scales.
#[derive(Debug, Clone)]
pub struct RowBuilder {
    rank_scale: CategoryScale,
    complexity_scale: CategoryScale,
}

impl RowBuilder {
    pub fn new(rank_scale: CategoryScale, complexity_scale: CategoryScale) -> Self {
        Self {
            rank_scale,
            complexity_scale,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.rank_scale.clone(), config.complexity_scale.clone())
    }

    pub fn rank_category(&self, rank: u32) -> &str {
        self.rank_scale.classify(rank as f64)
    }

    pub fn complexity_category(&self, score: Option<f64>) -> Option<&str> {
        score.map(|s| self.complexity_scale.classify(s))
    }

    /// Assemble the output row. Lyrics are dropped; only their metrics remain.
    pub fn build_row(
        &self,
        song: SongRecord,
        metrics: ComplexityMetrics,
        now: DateTime<Utc>,
    ) -> ComplexityRow {
        let rank_category = self.rank_category(song.rank).to_string();
        let complexity_category = self
            .complexity_category(metrics.flesch_kincaid_score)
            .map(str::to_string);

        ComplexityRow {
            rank: song.rank,
            year: song.year,
            artist: song.artist,
            title: song.title,
            lyrics_found: metrics.has_words(),
            word_count: metrics.word_count,
            unique_word_count: metrics.unique_word_count,
            lexical_diversity: metrics.lexical_diversity,
            flesch_kincaid_score: metrics.flesch_kincaid_score,
            avg_sentence_length: metrics.avg_sentence_length,
            complexity_category,
            rank_category,
            created_at: now,
        }
    }
}

impl Default for RowBuilder {
    fn default() -> Self {
        Self::new(CategoryScale::default_rank(), CategoryScale::default_complexity())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CategoryBand;
    use crate::transform::metrics::compute_metrics;

    fn song(rank: u32, lyrics: Option<&str>) -> SongRecord {
        SongRecord {
            rank,
            year: 2020,
            artist: "The Weeknd".into(),
            title: "Blinding Lights".into(),
            lyrics: lyrics.map(String::from),
        }
    }

    #[test]
    fn test_row_with_lyrics() {
        let builder = RowBuilder::default();
        let record = song(1, Some("I love love love you"));
        let metrics = compute_metrics(record.lyrics.as_deref());
        let now = Utc::now();

        let row = builder.build_row(record, metrics, now);

        assert!(row.lyrics_found);
        assert_eq!(row.word_count, 5);
        assert_eq!(row.unique_word_count, 3);
        assert_eq!(row.lexical_diversity, Some(0.6));
        assert_eq!(row.rank_category, "Top 10");
        assert_eq!(row.complexity_category.as_deref(), Some("Simple"));
        assert_eq!(row.created_at, now);
        assert_eq!(row.artist, "The Weeknd");
    }

    #[test]
    fn test_row_without_lyrics() {
        let builder = RowBuilder::default();
        let row = builder.build_row(song(50, None), compute_metrics(None), Utc::now());

        assert!(!row.lyrics_found);
        assert_eq!(row.word_count, 0);
        assert!(row.lexical_diversity.is_none());
        assert!(row.flesch_kincaid_score.is_none());
        assert!(row.complexity_category.is_none());
        assert_eq!(row.rank_category, "41-100");
    }

    #[test]
    fn test_rank_category_boundaries() {
        let builder = RowBuilder::default();
        assert_eq!(builder.rank_category(10), "Top 10");
        assert_eq!(builder.rank_category(11), "11-40");
        assert_eq!(builder.rank_category(40), "11-40");
        assert_eq!(builder.rank_category(41), "41-100");
    }

    #[test]
    fn test_rank_category_always_a_known_label() {
        let builder = RowBuilder::default();
        let labels = CategoryScale::default_rank();
        let labels = labels.labels();
        for rank in 1..=100 {
            assert!(labels.contains(&builder.rank_category(rank)));
        }
    }

    #[test]
    fn test_custom_scale() {
        let rank_scale = CategoryScale {
            bands: vec![
                CategoryBand::new(10.0, "Top 10"),
                CategoryBand::new(25.0, "Top 25"),
                CategoryBand::new(50.0, "Top 50"),
            ],
            above: "Top 100".into(),
        };
        let builder = RowBuilder::new(rank_scale, CategoryScale::default_complexity());
        assert_eq!(builder.rank_category(25), "Top 25");
        assert_eq!(builder.rank_category(26), "Top 50");
        assert_eq!(builder.rank_category(99), "Top 100");
    }
}
