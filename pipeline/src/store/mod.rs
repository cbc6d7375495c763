//! Load stage: SQLite persistence for rows, statistics and run history.
//!
//! Writes are upserts keyed on the natural keys (`artist, title, year` for
//! rows, `year` and `decade` for statistics), so loading the same transform
//! output twice leaves the tables unchanged.

pub mod schema;

use chrono::{DateTime, Utc};
use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, Connection, Row};
use serde::Serialize;
use std::fmt;
use std::path::Path;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::StoreResult;
use crate::models::{ComplexityRow, DecadeStats, Metric, MetricSummary, YearlyStats};
use crate::transform::TransformOutput;
use schema::VERSIONED_SCHEMAS;

const STAT_SUFFIXES: [&str; 3] = ["mean", "std", "median"];

/// Songs listed by [`LyricsStore::analytics`].
const MOST_COMPLEX_LIMIT: usize = 5;

// =============================================================================
// Store Types
// =============================================================================

/// Rows written by one load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    pub rows: usize,
    pub years: usize,
    pub decades: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Succeeded,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "succeeded" => Some(Self::Succeeded),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// One pipeline execution, as recorded in `pipeline_runs`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunRecord {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub status: RunStatus,
    pub rows_loaded: usize,
    pub message: Option<String>,
}

impl RunRecord {
    /// A run with a fresh id.
    pub fn new(started_at: DateTime<Utc>, status: RunStatus, rows_loaded: usize) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at,
            finished_at: Utc::now(),
            status,
            rows_loaded,
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// A song with its readability score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredSong {
    pub title: String,
    pub artist: String,
    pub year: i32,
    pub score: f64,
}

/// Verification queries over the loaded tables.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analytics {
    pub total_songs: usize,
    pub songs_with_lyrics: usize,
    pub first_year: Option<i32>,
    pub last_year: Option<i32>,
    /// Mean readability per rank category, most complex first.
    pub rank_complexity: Vec<(String, Option<f64>)>,
    /// Mean readability per year, ascending.
    pub yearly_complexity: Vec<(i32, Option<f64>)>,
    pub most_complex: Vec<ScoredSong>,
}

// =============================================================================
// Store
// =============================================================================

/// SQLite-backed store for the complexity tables.
pub struct LyricsStore {
    conn: Connection,
}

impl LyricsStore {
    /// Open or create a database file, applying pending schema versions.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        info!(path = %path.display(), "Opening database");
        Self::with_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> StoreResult<Self> {
        migrate(&conn)?;
        Ok(Self { conn })
    }

    pub fn schema_version(&self) -> StoreResult<usize> {
        let version: i64 = self.conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
        Ok(version as usize)
    }

    /// Upsert rows and statistics in a single transaction.
    pub fn load(&mut self, output: &TransformOutput) -> StoreResult<LoadSummary> {
        let tx = self.conn.transaction()?;
        let summary = LoadSummary {
            rows: upsert_rows(&tx, &output.rows)?,
            years: upsert_yearly(&tx, &output.yearly)?,
            decades: upsert_decade(&tx, &output.decade)?,
        };
        tx.commit()?;

        info!(
            rows = summary.rows,
            years = summary.years,
            decades = summary.decades,
            "Loaded transform output"
        );
        Ok(summary)
    }

    pub fn upsert_rows(&mut self, rows: &[ComplexityRow]) -> StoreResult<usize> {
        let tx = self.conn.transaction()?;
        let count = upsert_rows(&tx, rows)?;
        tx.commit()?;
        Ok(count)
    }

    pub fn upsert_yearly(&mut self, yearly: &[YearlyStats]) -> StoreResult<usize> {
        let tx = self.conn.transaction()?;
        let count = upsert_yearly(&tx, yearly)?;
        tx.commit()?;
        Ok(count)
    }

    pub fn upsert_decade(&mut self, decade: &[DecadeStats]) -> StoreResult<usize> {
        let tx = self.conn.transaction()?;
        let count = upsert_decade(&tx, decade)?;
        tx.commit()?;
        Ok(count)
    }

    pub fn record_run(&self, run: &RunRecord) -> StoreResult<()> {
        self.conn.execute(
            "INSERT INTO pipeline_runs (run_id, started_at, finished_at, status, rows_loaded, message)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                run.run_id.to_string(),
                run.started_at.to_rfc3339(),
                run.finished_at.to_rfc3339(),
                run.status.as_str(),
                run.rows_loaded as i64,
                run.message,
            ],
        )?;
        debug!(run_id = %run.run_id, status = run.status.as_str(), "Recorded pipeline run");
        Ok(())
    }

    /// Recorded runs, oldest first.
    pub fn runs(&self) -> StoreResult<Vec<RunRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT run_id, started_at, finished_at, status, rows_loaded, message
             FROM pipeline_runs
             ORDER BY started_at ASC",
        )?;

        let runs = stmt
            .query_map([], |row| {
                let run_id: String = row.get(0)?;
                let status: String = row.get(3)?;
                Ok(RunRecord {
                    run_id: Uuid::parse_str(&run_id)
                        .map_err(|e| conversion_error(0, Box::new(e)))?,
                    started_at: timestamp(row, 1)?,
                    finished_at: timestamp(row, 2)?,
                    status: RunStatus::parse(&status).unwrap_or(RunStatus::Failed),
                    rows_loaded: row.get::<_, i64>(4)? as usize,
                    message: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(runs)
    }

    pub fn row_count(&self) -> StoreResult<usize> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM lyrics_complexity", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// All stored rows ordered by year, then rank.
    pub fn fetch_rows(&self) -> StoreResult<Vec<ComplexityRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT rank, year, artist, title, lyrics_found, word_count, unique_word_count,
                    lexical_diversity, flesch_kincaid_score, avg_sentence_length,
                    complexity_category, rank_category, created_at
             FROM lyrics_complexity
             ORDER BY year ASC, rank ASC",
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok(ComplexityRow {
                    rank: row.get(0)?,
                    year: row.get(1)?,
                    artist: row.get(2)?,
                    title: row.get(3)?,
                    lyrics_found: row.get(4)?,
                    word_count: row.get::<_, i64>(5)? as usize,
                    unique_word_count: row.get::<_, i64>(6)? as usize,
                    lexical_diversity: row.get(7)?,
                    flesch_kincaid_score: row.get(8)?,
                    avg_sentence_length: row.get(9)?,
                    complexity_category: row.get(10)?,
                    rank_category: row.get(11)?,
                    created_at: timestamp(row, 12)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    /// Mean of one metric's yearly statistic, per year.
    pub fn yearly_means(&self, metric: Metric) -> StoreResult<Vec<(i32, Option<f64>)>> {
        let sql = format!(
            "SELECT year, {}_mean FROM yearly_complexity_stats ORDER BY year ASC",
            metric.column()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let means = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(means)
    }

    pub fn analytics(&self) -> StoreResult<Analytics> {
        let (total, with_lyrics, first_year, last_year): (i64, Option<i64>, Option<i32>, Option<i32>) =
            self.conn.query_row(
                "SELECT COUNT(*), SUM(lyrics_found), MIN(year), MAX(year) FROM lyrics_complexity",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )?;

        let rank_complexity = {
            let mut stmt = self.conn.prepare(
                "SELECT rank_category, AVG(flesch_kincaid_score) AS avg_complexity
                 FROM lyrics_complexity
                 GROUP BY rank_category
                 ORDER BY avg_complexity ASC",
            )?;
            let rows = stmt
                .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };

        let yearly_complexity = {
            let mut stmt = self.conn.prepare(
                "SELECT year, AVG(flesch_kincaid_score)
                 FROM lyrics_complexity
                 GROUP BY year
                 ORDER BY year ASC",
            )?;
            let rows = stmt
                .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };

        let most_complex = {
            let mut stmt = self.conn.prepare(
                "SELECT title, artist, year, flesch_kincaid_score
                 FROM lyrics_complexity
                 WHERE flesch_kincaid_score IS NOT NULL
                 ORDER BY flesch_kincaid_score ASC
                 LIMIT ?1",
            )?;
            let rows = stmt
                .query_map(params![MOST_COMPLEX_LIMIT as i64], |row| {
                    Ok(ScoredSong {
                        title: row.get(0)?,
                        artist: row.get(1)?,
                        year: row.get(2)?,
                        score: row.get(3)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };

        Ok(Analytics {
            total_songs: total as usize,
            songs_with_lyrics: with_lyrics.unwrap_or(0) as usize,
            first_year,
            last_year,
            rank_complexity,
            yearly_complexity,
            most_complex,
        })
    }
}

// =============================================================================
// Schema and Upserts
// =============================================================================

fn migrate(conn: &Connection) -> StoreResult<()> {
    let current: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

    for schema in VERSIONED_SCHEMAS.iter().filter(|s| s.version as i64 > current) {
        debug!(version = schema.version, "Applying schema");
        conn.execute_batch(schema.up)?;
        conn.pragma_update(None, "user_version", schema.version as i64)?;
    }
    Ok(())
}

fn upsert_rows(conn: &Connection, rows: &[ComplexityRow]) -> StoreResult<usize> {
    let mut stmt = conn.prepare(
        "INSERT INTO lyrics_complexity (
            year, rank, title, artist, lyrics_found, word_count, unique_word_count,
            lexical_diversity, flesch_kincaid_score, avg_sentence_length,
            complexity_category, rank_category, created_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
         ON CONFLICT (artist, title, year) DO UPDATE SET
            rank = excluded.rank,
            lyrics_found = excluded.lyrics_found,
            word_count = excluded.word_count,
            unique_word_count = excluded.unique_word_count,
            lexical_diversity = excluded.lexical_diversity,
            flesch_kincaid_score = excluded.flesch_kincaid_score,
            avg_sentence_length = excluded.avg_sentence_length,
            complexity_category = excluded.complexity_category,
            rank_category = excluded.rank_category,
            created_at = excluded.created_at",
    )?;

    for row in rows {
        stmt.execute(params![
            row.year,
            row.rank,
            row.title,
            row.artist,
            row.lyrics_found,
            row.word_count as i64,
            row.unique_word_count as i64,
            row.lexical_diversity,
            row.flesch_kincaid_score,
            row.avg_sentence_length,
            row.complexity_category,
            row.rank_category,
            row.created_at.to_rfc3339(),
        ])?;
    }
    Ok(rows.len())
}

fn upsert_yearly(conn: &Connection, yearly: &[YearlyStats]) -> StoreResult<usize> {
    let mut columns = vec!["year".to_string(), "song_count".into(), "lyrics_found_count".into()];
    columns.extend(metric_columns());
    columns.push("complexity_trend".into());

    let mut stmt = conn.prepare(&upsert_sql("yearly_complexity_stats", "year", &columns))?;
    for stats in yearly {
        let mut values = vec![
            Value::Integer(stats.year as i64),
            Value::Integer(stats.song_count as i64),
            Value::Integer(stats.lyrics_found_count as i64),
        ];
        values.extend(metric_values(|m| stats.summary(m)));
        values.push(real(stats.complexity_trend));
        stmt.execute(params_from_iter(values))?;
    }
    Ok(yearly.len())
}

fn upsert_decade(conn: &Connection, decade: &[DecadeStats]) -> StoreResult<usize> {
    let mut columns = vec!["decade".to_string(), "song_count".into(), "lyrics_found_count".into()];
    columns.extend(metric_columns());

    let mut stmt = conn.prepare(&upsert_sql("decade_complexity_stats", "decade", &columns))?;
    for stats in decade {
        let mut values = vec![
            Value::Integer(stats.decade as i64),
            Value::Integer(stats.song_count as i64),
            Value::Integer(stats.lyrics_found_count as i64),
        ];
        values.extend(metric_values(|m| stats.summary(m)));
        stmt.execute(params_from_iter(values))?;
    }
    Ok(decade.len())
}

/// `<metric>_mean|_std|_median` for every metric, in column order.
fn metric_columns() -> Vec<String> {
    Metric::ALL
        .iter()
        .flat_map(|m| STAT_SUFFIXES.iter().map(move |s| format!("{}_{}", m.column(), s)))
        .collect()
}

/// Disabled metrics are stored as NULL.
fn metric_values<'a, F>(summary: F) -> Vec<Value>
where
    F: Fn(Metric) -> Option<&'a MetricSummary>,
{
    Metric::ALL
        .iter()
        .flat_map(|&m| {
            let s = summary(m).copied().unwrap_or_default();
            [real(s.mean), real(s.std_dev), real(s.median)]
        })
        .collect()
}

fn upsert_sql(table: &str, key: &str, columns: &[String]) -> String {
    let placeholders = (1..=columns.len())
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ");
    let updates = columns
        .iter()
        .filter(|c| c.as_str() != key)
        .map(|c| format!("{c} = excluded.{c}"))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "INSERT INTO {table} ({}) VALUES ({placeholders}) ON CONFLICT ({key}) DO UPDATE SET {updates}",
        columns.join(", ")
    )
}

fn real(value: Option<f64>) -> Value {
    value.map(Value::Real).unwrap_or(Value::Null)
}

fn timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, Box::new(e)))
}

fn conversion_error(
    idx: usize,
    err: Box<dyn std::error::Error + Send + Sync + 'static>,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, err)
}

// =============================================================================
// Display
// =============================================================================

impl fmt::Display for Analytics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let score = |v: &Option<f64>| v.map(|s| format!("{:.2}", s)).unwrap_or_else(|| "n/a".into());

        writeln!(f, "{}", "=".repeat(60))?;
        writeln!(f, "DATABASE ANALYTICS VERIFICATION")?;
        writeln!(f, "{}", "=".repeat(60))?;
        writeln!(f, "Total songs analyzed: {} ({} with lyrics)", self.total_songs, self.songs_with_lyrics)?;
        match (self.first_year, self.last_year) {
            (Some(first), Some(last)) => writeln!(f, "Years covered: {} - {}", first, last)?,
            _ => writeln!(f, "Years covered: none")?,
        }

        writeln!(f, "\nAverage complexity by rank category:")?;
        for (category, avg) in &self.rank_complexity {
            writeln!(f, "  {:<12} {}", category, score(avg))?;
        }

        writeln!(f, "\nComplexity trend over years:")?;
        for (year, avg) in &self.yearly_complexity {
            writeln!(f, "  {}  {}", year, score(avg))?;
        }

        writeln!(f, "\nMost complex songs:")?;
        for song in &self.most_complex {
            writeln!(f, "  {:.2}  {} - {} ({})", song.score, song.artist, song.title, song.year)?;
        }
        Ok(())
    }
}
