//! Post-load quality gate and the run summary report.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::QualityConfig;
use crate::error::QualityError;
use crate::models::{ComplexityRow, Metric, YearlyStats};
use crate::transform::aggregate::mean;
use crate::transform::insights::{generate_insights, SongHighlight};

// =============================================================================
// Quality Gate
// =============================================================================

/// Figures checked by [`quality_check`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityReport {
    pub total_records: usize,
    pub missing_lyrics: usize,
    pub avg_complexity: Option<f64>,
    pub year_range: Option<(i32, i32)>,
    pub rank_range: Option<(u32, u32)>,
}

/// Check loaded rows against the configured thresholds.
pub fn quality_check(
    rows: &[ComplexityRow],
    config: &QualityConfig,
) -> Result<QualityReport, QualityError> {
    let scores: Vec<f64> = rows
        .iter()
        .filter_map(|r| Metric::FleschKincaidScore.value(r))
        .collect();

    let report = QualityReport {
        total_records: rows.len(),
        missing_lyrics: rows.iter().filter(|r| !r.lyrics_found).count(),
        avg_complexity: mean(&scores),
        year_range: min_max(rows.iter().map(|r| r.year)),
        rank_range: min_max(rows.iter().map(|r| r.rank)),
    };

    info!(
        total_records = report.total_records,
        missing_lyrics = report.missing_lyrics,
        avg_complexity = ?report.avg_complexity,
        year_range = ?report.year_range,
        rank_range = ?report.rank_range,
        "Data quality check"
    );

    if report.total_records < config.min_records {
        return Err(QualityError::InsufficientData {
            found: report.total_records,
            minimum: config.min_records,
        });
    }
    if report.missing_lyrics as f64 > report.total_records as f64 * config.max_missing_ratio {
        return Err(QualityError::TooManyMissing {
            missing: report.missing_lyrics,
            total: report.total_records,
        });
    }

    info!("Data quality check passed");
    Ok(report)
}

fn min_max<T: Ord + Copy>(values: impl Iterator<Item = T>) -> Option<(T, T)> {
    values.fold(None, |acc, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}

// =============================================================================
// Summary Report
// =============================================================================

/// Human-readable summary of one run.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryReport {
    pub generated_at: DateTime<Utc>,
    pub total_songs: usize,
    pub songs_with_lyrics: usize,
    pub years_covered: Option<(i32, i32)>,
    pub average_complexity: Option<f64>,
    /// Mean of the year-over-year readability changes.
    pub mean_trend: Option<f64>,
    pub most_complex: Option<SongHighlight>,
    pub least_complex: Option<SongHighlight>,
}

impl SummaryReport {
    pub fn new(rows: &[ComplexityRow], yearly: &[YearlyStats], generated_at: DateTime<Utc>) -> Self {
        // The cutoff only affects the recent/older split, which is unused here.
        let insights = generate_insights(rows, i32::MAX);
        let scores: Vec<f64> = rows
            .iter()
            .filter_map(|r| Metric::FleschKincaidScore.value(r))
            .collect();
        let trends: Vec<f64> = yearly.iter().filter_map(|y| y.complexity_trend).collect();

        Self {
            generated_at,
            total_songs: insights.total_songs,
            songs_with_lyrics: insights.songs_with_lyrics,
            years_covered: insights.first_year.zip(insights.last_year),
            average_complexity: mean(&scores),
            mean_trend: mean(&trends),
            most_complex: insights.top_metrics.most_complex_song,
            least_complex: insights.top_metrics.least_complex_song,
        }
    }

    /// "Simpler" when readability rose on average, otherwise "More Complex".
    pub fn trend_label(&self) -> &'static str {
        match self.mean_trend {
            Some(t) if t > 0.0 => "Simpler",
            Some(_) => "More Complex",
            None => "Unknown",
        }
    }

    pub fn file_name(&self) -> String {
        format!("pipeline_summary_{}.txt", self.generated_at.format("%Y%m%d_%H%M%S"))
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "LYRICAL COMPLEXITY PIPELINE SUMMARY REPORT");
        let _ = writeln!(out, "{}\n", "=".repeat(50));

        let _ = writeln!(
            out,
            "Pipeline Execution Date: {}",
            self.generated_at.format("%Y-%m-%d %H:%M:%S")
        );
        let _ = writeln!(out, "Total Songs Analyzed: {}", self.total_songs);
        let _ = writeln!(out, "Songs With Lyrics: {}", self.songs_with_lyrics);
        let _ = writeln!(
            out,
            "Years Covered: {}",
            self.years_covered
                .map(|(a, b)| format!("{}-{}", a, b))
                .unwrap_or_else(|| "n/a".into())
        );
        let _ = writeln!(
            out,
            "Average Complexity Score: {}",
            self.average_complexity
                .map(|s| format!("{:.2}", s))
                .unwrap_or_else(|| "n/a".into())
        );
        let _ = writeln!(out, "Complexity Trend: {}", self.trend_label());

        for (label, song) in [
            ("Top Complexity", &self.most_complex),
            ("Least Complexity", &self.least_complex),
        ] {
            match song {
                Some(s) => {
                    let _ = writeln!(out, "{} Song: {}", label, s.title);
                    let _ = writeln!(out, "{} Artist: {}", label, s.artist);
                }
                None => {
                    let _ = writeln!(out, "{} Song: n/a", label);
                }
            }
        }
        out
    }

    /// Write the rendered report into `dir`. Returns the file path.
    pub fn write_to(&self, dir: &Path) -> std::io::Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(self.file_name());
        std::fs::write(&path, self.render())?;
        info!(path = %path.display(), "Summary report generated");
        Ok(path)
    }
}
