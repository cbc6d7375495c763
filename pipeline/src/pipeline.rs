//! Stage runner.
//!
//! ```text
//! chart.csv ─▶ [extract] ─▶ songs.csv ─▶ [transform] ─▶ complexity.json ─▶ [load] ─▶ SQLite
//!                                                                            │
//!                                     pipeline_summary_*.txt ◀─ [report] ◀─ [quality check]
//! ```
//!
//! Stages run in order and exchange data through files in the data directory,
//! so each one can also be run on its own. A failing stage is retried per
//! [`StageRetryPolicy`]; once retries are exhausted the run stops with
//! [`PipelineError::StageFailed`]. Every run is recorded in `pipeline_runs`
//! when the database can be opened.

use chrono::{DateTime, Utc};
use std::future::Future;
use std::path::PathBuf;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::{PipelineConfig, StageRetryPolicy};
use crate::error::{PipelineError, PipelineResult};
use crate::extract::{ExtractionReport, GeniusClient, LyricsExtractor};
use crate::output::{read_transform_output, write_songs_csv, write_transform_files};
use crate::parser::RecordParser;
use crate::report::{quality_check, QualityReport, SummaryReport};
use crate::store::{LoadSummary, LyricsStore, RunRecord, RunStatus};
use crate::transform::{TransformOutput, Transformer};

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Extract,
    Transform,
    Load,
    QualityCheck,
    Report,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Extract => "extract",
            Self::Transform => "transform",
            Self::Load => "load",
            Self::QualityCheck => "quality_check",
            Self::Report => "report",
        }
    }
}

/// Options for [`run_pipeline`].
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Reuse an existing songs file instead of calling the lyrics API.
    pub skip_extract: bool,
}

/// What a successful run produced.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub extraction: Option<ExtractionReport>,
    pub rows: usize,
    pub skipped: usize,
    pub load: LoadSummary,
    pub quality: QualityReport,
    pub report_path: PathBuf,
}

// =============================================================================
// Stages
// =============================================================================

/// Look up lyrics for the chart file and write the songs file.
pub async fn extract_stage(config: &PipelineConfig) -> PipelineResult<ExtractionReport> {
    let chart = RecordParser::from_config(config).parse_chart_file(&config.chart_path)?;
    if chart.records.is_empty() {
        return Err(PipelineError::EmptyInput);
    }

    let client = GeniusClient::from_config(&config.extraction)?;
    let report = LyricsExtractor::new(client, config)
        .extract(chart.records)
        .await;

    write_songs_csv(&config.songs_path(), &report.records)?;
    Ok(report)
}

/// Score the songs file and write the transform files.
///
/// Fails with [`PipelineError::EmptyInput`] when no row survives, so an
/// empty batch never reaches the load stage.
pub fn transform_stage(config: &PipelineConfig, now: DateTime<Utc>) -> PipelineResult<TransformOutput> {
    let songs = RecordParser::from_config(config).parse_songs_file(&config.songs_path())?;
    let output = Transformer::from_config(config).transform(songs.records, now);
    if output.rows.is_empty() {
        return Err(PipelineError::EmptyInput);
    }
    write_transform_files(config, &output)?;
    Ok(output)
}

/// Upsert the transform output into the database.
pub fn load_stage(config: &PipelineConfig) -> PipelineResult<LoadSummary> {
    let output = read_transform_output(&config.transform_output_path())?;
    let mut store = LyricsStore::open(&config.database_path)?;
    let summary = store.load(&output)?;
    info!("{}", store.analytics()?);
    Ok(summary)
}

/// Check the loaded rows against the quality thresholds.
pub fn quality_stage(config: &PipelineConfig) -> PipelineResult<QualityReport> {
    let rows = LyricsStore::open(&config.database_path)?.fetch_rows()?;
    Ok(quality_check(&rows, &config.quality)?)
}

/// Write the summary report for the current transform output.
pub fn report_stage(config: &PipelineConfig, now: DateTime<Utc>) -> PipelineResult<PathBuf> {
    let output = read_transform_output(&config.transform_output_path())?;
    let report = SummaryReport::new(&output.rows, &output.yearly, now);
    Ok(report.write_to(&config.data_dir)?)
}

// =============================================================================
// Runner
// =============================================================================

/// Run every stage in order.
pub async fn run_pipeline(config: &PipelineConfig, options: RunOptions) -> PipelineResult<RunSummary> {
    let started_at = Utc::now();
    info!(
        years = %format!("{}-{}", config.years.start, config.years.end),
        data_dir = %config.data_dir.display(),
        "Starting lyrical complexity pipeline"
    );

    let result = run_stages(config, &options, started_at).await;

    let record = match &result {
        Ok(summary) => RunRecord::new(started_at, RunStatus::Succeeded, summary.load.rows),
        Err(e) => RunRecord::new(started_at, RunStatus::Failed, 0).with_message(e.to_string()),
    };
    let run_id = record.run_id;
    if let Err(e) = LyricsStore::open(&config.database_path).and_then(|s| s.record_run(&record)) {
        warn!("Could not record pipeline run: {}", e);
    }

    match result {
        Ok(summary) => {
            info!(%run_id, rows = summary.rows, "Pipeline finished");
            Ok(RunSummary { run_id, ..summary })
        }
        Err(e) => {
            error!(%run_id, "Pipeline failed: {}", e);
            Err(e)
        }
    }
}

async fn run_stages(
    config: &PipelineConfig,
    options: &RunOptions,
    started_at: DateTime<Utc>,
) -> PipelineResult<RunSummary> {
    let policy = config.stage_retry;

    let extraction = if options.skip_extract {
        info!(path = %config.songs_path().display(), "Skipping extract, reusing songs file");
        None
    } else {
        Some(with_retry(Stage::Extract, policy, || extract_stage(config)).await?)
    };

    let output = with_retry(Stage::Transform, policy, || async {
        transform_stage(config, started_at)
    })
    .await?;
    let load = with_retry(Stage::Load, policy, || async { load_stage(config) }).await?;
    let quality = with_retry(Stage::QualityCheck, policy, || async { quality_stage(config) }).await?;
    let report_path =
        with_retry(Stage::Report, policy, || async { report_stage(config, started_at) }).await?;

    Ok(RunSummary {
        run_id: Uuid::nil(),
        extraction,
        rows: output.rows.len(),
        skipped: output.skipped.len(),
        load,
        quality,
        report_path,
    })
}

/// Run a stage, retrying on failure.
pub async fn with_retry<T, F, Fut>(stage: Stage, policy: StageRetryPolicy, mut op: F) -> PipelineResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = PipelineResult<T>>,
{
    let attempts = policy.retries + 1;
    let mut last_error = None;

    for attempt in 1..=attempts {
        info!(stage = stage.name(), attempt, "Running stage");
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                warn!(stage = stage.name(), attempt, attempts, "Stage failed: {}", e);
                last_error = Some(e);

                if attempt < attempts {
                    info!("Retrying in {:?}", policy.delay());
                    tokio::time::sleep(policy.delay()).await;
                }
            }
        }
    }

    Err(PipelineError::StageFailed {
        stage: stage.name(),
        attempts,
        message: last_error.map(|e| e.to_string()).unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QualityError;
    use crate::models::SongRecord;
    use std::cell::Cell;

    fn no_wait(retries: u32) -> StageRetryPolicy {
        StageRetryPolicy {
            retries,
            delay_secs: 0,
        }
    }

    fn songs(count: usize) -> Vec<SongRecord> {
        (0..count)
            .map(|i| SongRecord {
                rank: (i % 100) as u32 + 1,
                year: 2015 + (i / 100) as i32,
                artist: format!("Artist {}", i),
                title: format!("Song {}", i),
                lyrics: Some(format!("Line number {} goes here\nAnd then it ends", i)),
            })
            .collect()
    }

    fn config(dir: &std::path::Path) -> PipelineConfig {
        let mut config = PipelineConfig {
            data_dir: dir.to_path_buf(),
            database_path: dir.join("lyrics.db"),
            chart_path: dir.join("chart.csv"),
            ..PipelineConfig::default()
        };
        config.stage_retry = no_wait(0);
        config
    }

    #[tokio::test]
    async fn test_retry_then_success() {
        let calls = Cell::new(0);
        let result = with_retry(Stage::Load, no_wait(2), || {
            calls.set(calls.get() + 1);
            let attempt = calls.get();
            async move {
                if attempt < 3 {
                    Err(PipelineError::EmptyInput)
                } else {
                    Ok(attempt)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn test_retries_exhausted() {
        let calls = Cell::new(0);
        let result: PipelineResult<()> = with_retry(Stage::QualityCheck, no_wait(1), || {
            calls.set(calls.get() + 1);
            async { Err(PipelineError::EmptyInput) }
        })
        .await;

        assert_eq!(calls.get(), 2);
        match result {
            Err(PipelineError::StageFailed { stage, attempts, message }) => {
                assert_eq!(stage, "quality_check");
                assert_eq!(attempts, 2);
                assert!(message.contains("No records"));
            }
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_run_from_songs_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        write_songs_csv(&config.songs_path(), &songs(120)).unwrap();

        let summary = run_pipeline(&config, RunOptions { skip_extract: true })
            .await
            .unwrap();

        assert!(summary.extraction.is_none());
        assert_eq!(summary.rows, 120);
        assert_eq!(summary.load.rows, 120);
        assert_eq!(summary.load.years, 2);
        assert_eq!(summary.quality.total_records, 120);
        assert!(summary.report_path.exists());
        assert!(config.transform_output_path().exists());

        let store = LyricsStore::open(&config.database_path).unwrap();
        let runs = store.runs().unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].run_id, summary.run_id);
        assert_eq!(runs[0].status, RunStatus::Succeeded);
    }

    #[tokio::test]
    async fn test_quality_failure_stops_run() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        write_songs_csv(&config.songs_path(), &songs(10)).unwrap();

        let err = run_pipeline(&config, RunOptions { skip_extract: true })
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::StageFailed { stage: "quality_check", .. }));
        assert!(err.to_string().contains(&QualityError::InsufficientData { found: 10, minimum: 100 }.to_string()));

        let runs = LyricsStore::open(&config.database_path).unwrap().runs().unwrap();
        assert_eq!(runs[0].status, RunStatus::Failed);
    }

    #[test]
    fn test_transform_stage_rejects_empty_batch() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let mut bad = songs(1);
        bad[0].year = 1990;
        write_songs_csv(&config.songs_path(), &bad).unwrap();

        let err = transform_stage(&config, Utc::now()).unwrap_err();
        assert!(matches!(err, PipelineError::EmptyInput));
        assert!(!config.transform_output_path().exists());
    }

    #[tokio::test]
    async fn test_extract_without_token_fails() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        std::fs::write(&config.chart_path, "rank,year,artist,title\n1,2020,A,B\n").unwrap();

        let err = run_pipeline(&config, RunOptions::default()).await.unwrap_err();
        assert!(matches!(err, PipelineError::StageFailed { stage: "extract", .. }));
        assert!(err.to_string().contains("GENIUS_ACCESS_TOKEN"));
    }
}
