//! Pipeline configuration.
//!
//! Every component receives its settings through [`PipelineConfig`]; nothing in
//! the transform reads process state. Loading is layered:
//!
//! ```text
//! defaults  →  JSON file (--config)  →  environment (.env honoured)  →  validate()
//! ```
//!
//! Recognised environment variables:
//!
//! | Variable               | Field                          |
//! |------------------------|--------------------------------|
//! | `GENIUS_ACCESS_TOKEN`  | `extraction.genius_token`      |
//! | `LYRICS_DATA_DIR`      | `data_dir`                     |
//! | `LYRICS_CHART_PATH`    | `chart_path`                   |
//! | `LYRICS_DATABASE_PATH` | `database_path`                |
//! | `LYRICS_START_YEAR`    | `years.start`                  |
//! | `LYRICS_END_YEAR`      | `years.end`                    |

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, ConfigResult};
use crate::models::Metric;
use crate::transform::syllables::SyllableHeuristic;

// =============================================================================
// Category Scales
// =============================================================================

/// One band of a [`CategoryScale`]; `upper` is inclusive.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryBand {
    pub upper: f64,
    pub label: String,
}

impl CategoryBand {
    pub fn new(upper: f64, label: impl Into<String>) -> Self {
        Self {
            upper,
            label: label.into(),
        }
    }
}

/// Maps a number to a label through ascending, inclusive upper bounds.
///
/// Values above the last band get `above`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryScale {
    pub bands: Vec<CategoryBand>,
    pub above: String,
}

impl CategoryScale {
    /// Chart-position tiers: `≤10` "Top 10", `≤40` "11-40", otherwise "41-100".
    pub fn default_rank() -> Self {
        Self {
            bands: vec![CategoryBand::new(10.0, "Top 10"), CategoryBand::new(40.0, "11-40")],
            above: "41-100".to_string(),
        }
    }

    /// Readability bands, lowest score first.
    pub fn default_complexity() -> Self {
        Self {
            bands: vec![
                CategoryBand::new(30.0, "Very Complex"),
                CategoryBand::new(60.0, "Complex"),
                CategoryBand::new(80.0, "Moderate"),
            ],
            above: "Simple".to_string(),
        }
    }

    pub fn classify(&self, value: f64) -> &str {
        self.bands
            .iter()
            .find(|band| value <= band.upper)
            .map(|band| band.label.as_str())
            .unwrap_or(&self.above)
    }

    /// All labels, in band order, `above` last.
    pub fn labels(&self) -> Vec<&str> {
        self.bands
            .iter()
            .map(|b| b.label.as_str())
            .chain(std::iter::once(self.above.as_str()))
            .collect()
    }

    fn validate(&self, field: &'static str) -> ConfigResult<()> {
        let invalid = |message: String| ConfigError::InvalidValue { field, message };

        if self.labels().iter().any(|l| l.trim().is_empty()) {
            return Err(invalid("labels must not be empty".into()));
        }
        if let Some(band) = self.bands.iter().find(|b| !b.upper.is_finite()) {
            return Err(invalid(format!("bound for '{}' is not finite", band.label)));
        }
        if self.bands.windows(2).any(|w| w[0].upper >= w[1].upper) {
            return Err(invalid("bounds must be strictly ascending".into()));
        }
        Ok(())
    }
}

// =============================================================================
// Year Range
// =============================================================================

/// Inclusive range of chart years under analysis.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct YearRange {
    pub start: i32,
    pub end: i32,
}

impl YearRange {
    pub fn new(start: i32, end: i32) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, year: i64) -> bool {
        (self.start as i64..=self.end as i64).contains(&year)
    }
}

impl Default for YearRange {
    fn default() -> Self {
        Self::new(2015, 2024)
    }
}

// =============================================================================
// Stage Settings
// =============================================================================

/// Lyrics lookup settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Never written back out.
    #[serde(skip_serializing)]
    pub genius_token: Option<String>,
    pub genius_base_url: String,
    /// Pause between two lookups.
    pub request_delay_ms: u64,
    /// Extra pause between two chart years.
    pub year_delay_ms: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub timeout_secs: u64,
}

impl ExtractionConfig {
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn year_delay(&self) -> Duration {
        Duration::from_millis(self.year_delay_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            genius_token: None,
            genius_base_url: "https://api.genius.com".to_string(),
            request_delay_ms: 1_000,
            year_delay_ms: 5_000,
            max_retries: 3,
            retry_delay_ms: 1_000,
            timeout_secs: 15,
        }
    }
}

/// Thresholds for the post-load quality gate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct QualityConfig {
    pub min_records: usize,
    pub max_missing_ratio: f64,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            min_records: 100,
            max_missing_ratio: 0.5,
        }
    }
}

/// How often a failed stage is retried, and how long to wait in between.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StageRetryPolicy {
    pub retries: u32,
    pub delay_secs: u64,
}

impl StageRetryPolicy {
    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_secs)
    }
}

impl Default for StageRetryPolicy {
    fn default() -> Self {
        Self {
            retries: 1,
            delay_secs: 300,
        }
    }
}

// =============================================================================
// Pipeline Configuration
// =============================================================================

/// Complete configuration for one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub data_dir: PathBuf,
    pub chart_path: PathBuf,
    pub database_path: PathBuf,
    pub years: YearRange,
    pub chart_size: u32,
    pub rank_scale: CategoryScale,
    pub complexity_scale: CategoryScale,
    /// Metrics summarized in yearly and decade statistics.
    pub metrics: Vec<Metric>,
    pub syllable_heuristic: SyllableHeuristic,
    /// First year counted as "recent" in insights.
    pub recent_since: i32,
    pub extraction: ExtractionConfig,
    pub quality: QualityConfig,
    pub stage_retry: StageRetryPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            chart_path: PathBuf::from("data/chart.csv"),
            database_path: PathBuf::from("data/lyrics_complexity.db"),
            years: YearRange::default(),
            chart_size: 100,
            rank_scale: CategoryScale::default_rank(),
            complexity_scale: CategoryScale::default_complexity(),
            metrics: Metric::ALL.to_vec(),
            syllable_heuristic: SyllableHeuristic::default(),
            recent_since: 2020,
            extraction: ExtractionConfig::default(),
            quality: QualityConfig::default(),
            stage_retry: StageRetryPolicy::default(),
        }
    }
}

impl PipelineConfig {
    /// Load defaults, an optional JSON file and the environment, then validate.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        // Try loading .env file
        let _ = dotenvy::dotenv();

        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        config.apply_env_from(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a JSON file; missing fields keep their defaults.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Apply overrides from a variable lookup.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup("GENIUS_ACCESS_TOKEN").filter(|t| !t.trim().is_empty()) {
            self.extraction.genius_token = Some(token);
        }
        if let Some(dir) = lookup("LYRICS_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(path) = lookup("LYRICS_CHART_PATH") {
            self.chart_path = PathBuf::from(path);
        }
        if let Some(path) = lookup("LYRICS_DATABASE_PATH") {
            self.database_path = PathBuf::from(path);
        }
        if let Some(year) = lookup("LYRICS_START_YEAR") {
            self.years.start = parse_year("LYRICS_START_YEAR", &year)?;
        }
        if let Some(year) = lookup("LYRICS_END_YEAR") {
            self.years.end = parse_year("LYRICS_END_YEAR", &year)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.years.start > self.years.end {
            return Err(ConfigError::InvalidValue {
                field: "years",
                message: format!("start {} is after end {}", self.years.start, self.years.end),
            });
        }
        if self.chart_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "chart_size",
                message: "must be at least 1".into(),
            });
        }
        if self.metrics.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "metrics",
                message: "at least one metric must be enabled".into(),
            });
        }
        if !(0.0..=1.0).contains(&self.quality.max_missing_ratio) {
            return Err(ConfigError::InvalidValue {
                field: "quality.max_missing_ratio",
                message: format!("{} is not within 0..=1", self.quality.max_missing_ratio),
            });
        }
        self.rank_scale.validate("rank_scale")?;
        self.complexity_scale.validate("complexity_scale")?;
        Ok(())
    }

    /// Enabled metrics, deduplicated, in column order.
    pub fn enabled_metrics(&self) -> Vec<Metric> {
        Metric::ALL
            .into_iter()
            .filter(|m| self.metrics.contains(m))
            .collect()
    }

    // Stage files inside `data_dir`.

    pub fn songs_path(&self) -> PathBuf {
        self.data_dir.join("songs.csv")
    }

    pub fn transform_output_path(&self) -> PathBuf {
        self.data_dir.join("complexity.json")
    }

    pub fn rows_csv_path(&self) -> PathBuf {
        self.data_dir.join("complexity_rows.csv")
    }

    pub fn yearly_csv_path(&self) -> PathBuf {
        self.data_dir.join("yearly_stats.csv")
    }

    pub fn decade_csv_path(&self) -> PathBuf {
        self.data_dir.join("decade_stats.csv")
    }
}

fn parse_year(name: &'static str, value: &str) -> ConfigResult<i32> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        name,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config_is_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.years, YearRange::new(2015, 2024));
        assert_eq!(config.chart_size, 100);
        assert_eq!(config.enabled_metrics(), Metric::ALL.to_vec());
    }

    #[test]
    fn test_rank_scale_thresholds() {
        let scale = CategoryScale::default_rank();
        assert_eq!(scale.classify(1.0), "Top 10");
        assert_eq!(scale.classify(10.0), "Top 10");
        assert_eq!(scale.classify(11.0), "11-40");
        assert_eq!(scale.classify(40.0), "11-40");
        assert_eq!(scale.classify(41.0), "41-100");
        assert_eq!(scale.classify(100.0), "41-100");
    }

    #[test]
    fn test_complexity_scale_thresholds() {
        let scale = CategoryScale::default_complexity();
        assert_eq!(scale.classify(-12.0), "Very Complex");
        assert_eq!(scale.classify(30.0), "Very Complex");
        assert_eq!(scale.classify(30.5), "Complex");
        assert_eq!(scale.classify(80.0), "Moderate");
        assert_eq!(scale.classify(117.16), "Simple");
    }

    #[test]
    fn test_scale_validation() {
        let mut config = PipelineConfig::default();
        config.rank_scale.bands = vec![CategoryBand::new(40.0, "a"), CategoryBand::new(10.0, "b")];
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field: "rank_scale", .. })
        ));

        let mut config = PipelineConfig::default();
        config.complexity_scale.above = " ".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_year_range() {
        let mut config = PipelineConfig::default();
        config.years = YearRange::new(2024, 2015);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_metric_set_rejected() {
        let mut config = PipelineConfig::default();
        config.metrics.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("GENIUS_ACCESS_TOKEN", "secret"),
            ("LYRICS_START_YEAR", "1990"),
            ("LYRICS_END_YEAR", "1999"),
            ("LYRICS_DATA_DIR", "/tmp/lyrics"),
        ]
        .into_iter()
        .collect();

        let mut config = PipelineConfig::default();
        config
            .apply_env_from(|name| env.get(name).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.extraction.genius_token.as_deref(), Some("secret"));
        assert_eq!(config.years, YearRange::new(1990, 1999));
        assert_eq!(config.songs_path(), PathBuf::from("/tmp/lyrics/songs.csv"));
    }

    #[test]
    fn test_invalid_env_year() {
        let mut config = PipelineConfig::default();
        let result = config.apply_env_from(|name| {
            (name == "LYRICS_END_YEAR").then(|| "next year".to_string())
        });
        assert!(matches!(
            result,
            Err(ConfigError::InvalidEnv { name: "LYRICS_END_YEAR", .. })
        ));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: PipelineConfig = serde_json::from_str(
            r#"{ "chart_size": 50, "metrics": ["lexical_diversity"], "years": { "start": 2000, "end": 2009 } }"#,
        )
        .unwrap();

        assert_eq!(config.chart_size, 50);
        assert_eq!(config.enabled_metrics(), vec![Metric::LexicalDiversity]);
        assert_eq!(config.years.start, 2000);
        assert_eq!(config.rank_scale, CategoryScale::default_rank());
        assert_eq!(config.extraction.max_retries, 3);
    }

    #[test]
    fn test_token_not_serialized() {
        let mut config = PipelineConfig::default();
        config.extraction.genius_token = Some("secret".into());
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("secret"));
    }
}
