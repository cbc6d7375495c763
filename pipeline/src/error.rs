//! Error types for the lyrical complexity pipeline.
//!
//! Each stage owns its error type:
//!
//! - [`CsvError`] - chart and song file parsing
//! - [`MalformedRecord`] - a single input record that cannot be scored
//! - [`ExtractError`] - lyrics lookups
//! - [`StoreError`] - SQLite persistence
//! - [`ConfigError`] - configuration loading and validation
//! - [`QualityError`] - post-load quality gate
//! - [`PipelineError`] - top-level orchestration
//!
//! Conversions into [`PipelineError`] are automatic via `From`, so `?` works
//! across stage boundaries.

use thiserror::Error;

// =============================================================================
// CSV Parsing Errors
// =============================================================================

/// Errors while reading chart or song files.
#[derive(Debug, Error)]
pub enum CsvError {
    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to decode the file content.
    #[error("Failed to decode content as {0}")]
    Encoding(String),

    /// Invalid CSV structure.
    #[error("Invalid CSV format: {0}")]
    Parse(#[from] csv::Error),

    /// Empty file.
    #[error("CSV file is empty")]
    EmptyFile,

    /// A required column is absent from the header row.
    #[error("Missing required column: {0}")]
    MissingColumn(String),
}

// =============================================================================
// Malformed Input Records
// =============================================================================

/// Why a record was rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MalformedReason {
    #[error("missing {0}")]
    MissingField(&'static str),

    #[error("{field} is not an integer: '{value}'")]
    NotAnInteger { field: &'static str, value: String },

    #[error("rank {rank} outside 1..={chart_size}")]
    RankOutOfRange { rank: i64, chart_size: u32 },

    #[error("year {year} outside {start}..={end}")]
    YearOutOfRange { year: i64, start: i32, end: i32 },

    #[error("already listed for {year}")]
    Duplicate { year: i32 },
}

/// An input record that cannot enter the transform.
///
/// Carries enough identity for the caller to decide whether to skip or abort.
/// The transform itself always skips and keeps going.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{} ({} - {}): {reason}", location(.line), display_or_unknown(.artist), display_or_unknown(.title))]
pub struct MalformedRecord {
    /// 1-based line in the source file, header included.
    pub line: Option<usize>,
    pub artist: String,
    pub title: String,
    pub reason: MalformedReason,
}

impl MalformedRecord {
    pub fn new(artist: impl Into<String>, title: impl Into<String>, reason: MalformedReason) -> Self {
        Self {
            line: None,
            artist: artist.into(),
            title: title.into(),
            reason,
        }
    }

    pub fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }
}

fn location(line: &Option<usize>) -> String {
    match line {
        Some(l) => format!("Line {}", l),
        None => "Record".to_string(),
    }
}

fn display_or_unknown(value: &str) -> &str {
    if value.trim().is_empty() {
        "?"
    } else {
        value
    }
}

// =============================================================================
// Extraction Errors
// =============================================================================

/// Errors from the lyrics source.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// Missing API token.
    #[error("Missing GENIUS_ACCESS_TOKEN")]
    MissingToken,

    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status from the API.
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Invalid response payload.
    #[error("Invalid JSON response: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// Rate limited.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),
}

// =============================================================================
// Store Errors
// =============================================================================

/// Errors from the SQLite store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// SQLite failure.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// JSON (de)serialization of the transform output.
    #[error("Store JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error while reading the transform output.
    #[error("Store IO error: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid environment variable {name}: '{value}'")]
    InvalidEnv { name: &'static str, value: String },

    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: &'static str, message: String },
}

// =============================================================================
// Quality Gate Errors
// =============================================================================

/// Post-load data quality failures.
#[derive(Debug, Error)]
pub enum QualityError {
    #[error("Insufficient data: only {found} records found (minimum {minimum})")]
    InsufficientData { found: usize, minimum: usize },

    #[error("Too many missing lyrics: {missing} out of {total}")]
    TooManyMissing { missing: usize, total: usize },
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level pipeline orchestration errors.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// CSV parsing error.
    #[error("CSV error: {0}")]
    Csv(#[from] CsvError),

    /// Extraction error.
    #[error("Extraction error: {0}")]
    Extract(#[from] ExtractError),

    /// Store error.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Quality gate error.
    #[error("Quality check failed: {0}")]
    Quality(#[from] QualityError),

    /// IO error writing stage outputs.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error writing stage outputs.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// No records to process.
    #[error("No records to process")]
    EmptyInput,

    /// A stage kept failing after all its retries.
    #[error("Stage '{stage}' failed after {attempts} attempt(s): {message}")]
    StageFailed {
        stage: &'static str,
        attempts: u32,
        message: String,
    },
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for CSV operations.
pub type CsvResult<T> = Result<T, CsvError>;

/// Result type for extraction operations.
pub type ExtractResult<T> = Result<T, ExtractError>;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        let csv_err = CsvError::EmptyFile;
        let pipeline_err: PipelineError = csv_err.into();
        assert!(pipeline_err.to_string().contains("empty"));

        let quality_err = QualityError::InsufficientData { found: 3, minimum: 100 };
        let pipeline_err: PipelineError = quality_err.into();
        assert!(pipeline_err.to_string().contains("only 3 records"));
    }

    #[test]
    fn test_malformed_record_format() {
        let err = MalformedRecord::new(
            "Dua Lipa",
            "Don't Start Now",
            MalformedReason::RankOutOfRange { rank: 0, chart_size: 100 },
        )
        .at_line(7);

        let msg = err.to_string();
        assert!(msg.contains("Line 7"));
        assert!(msg.contains("Dua Lipa"));
        assert!(msg.contains("Don't Start Now"));
        assert!(msg.contains("rank 0 outside 1..=100"));
    }

    #[test]
    fn test_malformed_record_without_identity() {
        let err = MalformedRecord::new("", "", MalformedReason::MissingField("year"));
        let msg = err.to_string();
        assert!(msg.starts_with("Record (? - ?)"));
        assert!(msg.contains("missing year"));
    }
}
