//! # Lyrical Complexity - chart lyrics readability over time
//!
//! Weekly batch job that looks up lyrics for year-end chart songs, scores
//! each text, and stores per-song rows plus yearly and decade statistics.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Chart CSV  │────▶│   Extract   │────▶│  Transform  │────▶│    Load     │
//! │ (rank/year) │     │  (lyrics)   │     │ (metrics +  │     │  (SQLite)   │
//! └─────────────┘     └─────────────┘     │  aggregate) │     └──────┬──────┘
//!                                         └─────────────┘            ▼
//!                                                        quality check ─▶ report
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use lyrical_complexity::{run_pipeline, PipelineConfig, RunOptions};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = PipelineConfig::load(None).unwrap();
//!     let summary = run_pipeline(&config, RunOptions::default()).await.unwrap();
//!     println!("Loaded {} rows", summary.load.rows);
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Error types per stage
//! - [`models`] - Domain models (SongRecord, ComplexityRow, YearlyStats)
//! - [`config`] - Layered configuration (defaults, JSON file, environment)
//! - [`parser`] - Chart and songs CSV parsing with auto-detection
//! - [`extract`] - Lyrics lookup against the Genius API
//! - [`transform`] - Metrics, categorization and aggregation
//! - [`store`] - SQLite persistence and analytics queries
//! - [`output`] - Stage files exchanged between runs
//! - [`report`] - Quality gate and summary report
//! - [`pipeline`] - Stage runner with retries

// Core modules
pub mod config;
pub mod error;
pub mod logs;
pub mod models;

// Parsing
pub mod parser;

// Extraction
pub mod extract;

// Transformation
pub mod transform;

// Persistence
pub mod output;
pub mod store;

// Orchestration
pub mod pipeline;
pub mod report;

// =============================================================================
// Re-exports: Errors
// =============================================================================

pub use error::{
    ConfigError, CsvError, ExtractError, MalformedReason, MalformedRecord, PipelineError,
    PipelineResult, QualityError, StoreError,
};

// =============================================================================
// Re-exports: Models & Config
// =============================================================================

pub use config::{CategoryScale, PipelineConfig, YearRange};
pub use models::{
    ChartEntry, ComplexityMetrics, ComplexityRow, DecadeStats, Metric, MetricSummary, SongRecord,
    YearlyStats,
};

// =============================================================================
// Re-exports: Parser & Extract
// =============================================================================

pub use extract::{ExtractionReport, GeniusClient, LyricsExtractor, LyricsSource};
pub use parser::{ParsedFile, RecordParser};

// =============================================================================
// Re-exports: Transform
// =============================================================================

pub use transform::{
    aggregate_by_decade, aggregate_by_year, compute_metrics, generate_insights, Insights,
    MetricCalculator, TransformOutput, Transformer,
};

// =============================================================================
// Re-exports: Store, Report & Pipeline
// =============================================================================

pub use pipeline::{run_pipeline, RunOptions, RunSummary, Stage};
pub use report::{quality_check, QualityReport, SummaryReport};
pub use store::{Analytics, LoadSummary, LyricsStore};
