//! Headline findings over a transformed row set.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::aggregate::mean;
use crate::models::{ComplexityRow, Metric};

/// Readability of recent years against older ones.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrendComparison {
    pub cutoff_year: i32,
    pub recent_average: f64,
    pub older_average: f64,
    pub change: f64,
    /// "Simpler" when readability went up, otherwise "More Complex".
    pub direction: String,
}

/// A song singled out by one metric.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SongHighlight {
    pub title: String,
    pub artist: String,
    pub year: i32,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct TopMetrics {
    pub most_complex_song: Option<SongHighlight>,
    pub least_complex_song: Option<SongHighlight>,
    pub highest_lexical_diversity: Option<SongHighlight>,
    pub most_unique_words: Option<SongHighlight>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Insights {
    pub total_songs: usize,
    pub songs_with_lyrics: usize,
    pub first_year: Option<i32>,
    pub last_year: Option<i32>,
    pub complexity_trend: Option<TrendComparison>,
    pub top_metrics: TopMetrics,
    /// Mean readability per rank category.
    pub rank_complexity: BTreeMap<String, f64>,
    /// Mean readability per year.
    pub yearly_complexity: BTreeMap<i32, f64>,
}

/// Summarize rows. `recent_since` is the first year counted as recent.
pub fn generate_insights(rows: &[ComplexityRow], recent_since: i32) -> Insights {
    let score = |row: &ComplexityRow| Metric::FleschKincaidScore.value(row);

    let recent: Vec<f64> = rows
        .iter()
        .filter(|r| r.year >= recent_since)
        .filter_map(score)
        .collect();
    let older: Vec<f64> = rows
        .iter()
        .filter(|r| r.year < recent_since)
        .filter_map(score)
        .collect();

    let complexity_trend = match (mean(&recent), mean(&older)) {
        (Some(recent_average), Some(older_average)) => {
            let change = recent_average - older_average;
            Some(TrendComparison {
                cutoff_year: recent_since,
                recent_average,
                older_average,
                change,
                direction: if change > 0.0 { "Simpler" } else { "More Complex" }.to_string(),
            })
        }
        _ => None,
    };

    let top_metrics = TopMetrics {
        most_complex_song: pick(rows, Metric::FleschKincaidScore, Pick::Lowest),
        least_complex_song: pick(rows, Metric::FleschKincaidScore, Pick::Highest),
        highest_lexical_diversity: pick(rows, Metric::LexicalDiversity, Pick::Highest),
        most_unique_words: pick(rows, Metric::UniqueWordCount, Pick::Highest),
    };

    Insights {
        total_songs: rows.len(),
        songs_with_lyrics: rows.iter().filter(|r| r.lyrics_found).count(),
        first_year: rows.iter().map(|r| r.year).min(),
        last_year: rows.iter().map(|r| r.year).max(),
        complexity_trend,
        top_metrics,
        rank_complexity: mean_score_by(rows, |r| r.rank_category.clone()),
        yearly_complexity: mean_score_by(rows, |r| r.year),
    }
}

#[derive(Clone, Copy)]
enum Pick {
    Lowest,
    Highest,
}

/// First row wins ties, so results follow input order.
fn pick(rows: &[ComplexityRow], metric: Metric, which: Pick) -> Option<SongHighlight> {
    let mut best: Option<(&ComplexityRow, f64)> = None;
    for row in rows {
        let Some(value) = metric.value(row) else {
            continue;
        };
        let better = match (best, which) {
            (None, _) => true,
            (Some((_, current)), Pick::Lowest) => value < current,
            (Some((_, current)), Pick::Highest) => value > current,
        };
        if better {
            best = Some((row, value));
        }
    }

    best.map(|(row, value)| SongHighlight {
        title: row.title.clone(),
        artist: row.artist.clone(),
        year: row.year,
        value,
    })
}

fn mean_score_by<K, F>(rows: &[ComplexityRow], key: F) -> BTreeMap<K, f64>
where
    K: Ord,
    F: Fn(&ComplexityRow) -> K,
{
    let mut groups: BTreeMap<K, Vec<f64>> = BTreeMap::new();
    for row in rows {
        if let Some(score) = Metric::FleschKincaidScore.value(row) {
            groups.entry(key(row)).or_default().push(score);
        }
    }
    groups
        .into_iter()
        .filter_map(|(k, scores)| mean(&scores).map(|m| (k, m)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SongRecord;
    use crate::transform::metrics::compute_metrics;
    use crate::transform::rows::RowBuilder;
    use chrono::Utc;

    fn row(rank: u32, year: i32, title: &str, lyrics: Option<&str>) -> ComplexityRow {
        let song = SongRecord {
            rank,
            year,
            artist: "Artist".into(),
            title: title.into(),
            lyrics: lyrics.map(String::from),
        };
        let metrics = compute_metrics(song.lyrics.as_deref());
        RowBuilder::default().build_row(song, metrics, Utc::now())
    }

    fn sample() -> Vec<ComplexityRow> {
        vec![
            row(1, 2018, "Dense", Some("Unprecedented philosophical considerations overwhelm")),
            row(20, 2019, "Plain", Some("we go we go we go")),
            row(5, 2021, "Simple", Some("la la la la")),
            row(60, 2021, "Missing", None),
        ]
    }

    #[test]
    fn test_counts_and_years() {
        let insights = generate_insights(&sample(), 2020);
        assert_eq!(insights.total_songs, 4);
        assert_eq!(insights.songs_with_lyrics, 3);
        assert_eq!(insights.first_year, Some(2018));
        assert_eq!(insights.last_year, Some(2021));
    }

    #[test]
    fn test_top_metrics() {
        let insights = generate_insights(&sample(), 2020);
        let top = insights.top_metrics;
        assert_eq!(top.most_complex_song.unwrap().title, "Dense");
        assert_eq!(top.least_complex_song.unwrap().title, "Simple");
        assert_eq!(top.highest_lexical_diversity.unwrap().title, "Dense");
        assert_eq!(top.most_unique_words.unwrap().title, "Dense");
    }

    #[test]
    fn test_trend_direction() {
        let insights = generate_insights(&sample(), 2020);
        let trend = insights.complexity_trend.unwrap();
        assert_eq!(trend.cutoff_year, 2020);
        assert!(trend.change > 0.0);
        assert_eq!(trend.direction, "Simpler");
    }

    #[test]
    fn test_trend_needs_both_sides() {
        let rows = vec![row(1, 2021, "Only", Some("hello there"))];
        assert!(generate_insights(&rows, 2020).complexity_trend.is_none());
    }

    #[test]
    fn test_grouped_means_skip_missing() {
        let insights = generate_insights(&sample(), 2020);
        assert_eq!(insights.yearly_complexity.len(), 3);
        assert!(insights.yearly_complexity.contains_key(&2021));
        assert!(insights.rank_complexity.contains_key("Top 10"));
        assert!(insights.rank_complexity.contains_key("11-40"));
        // the only 41-100 song has no lyrics
        assert!(!insights.rank_complexity.contains_key("41-100"));
    }

    #[test]
    fn test_empty_rows() {
        let insights = generate_insights(&[], 2020);
        assert_eq!(insights.total_songs, 0);
        assert!(insights.first_year.is_none());
        assert_eq!(insights.top_metrics, TopMetrics::default());
    }
}
