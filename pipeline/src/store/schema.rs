//! Versioned schema for the complexity database.
//!
//! The applied version is kept in `PRAGMA user_version`; only newer entries
//! are run on open.

/// One schema step.
pub struct StoreSchema {
    pub version: usize,
    pub up: &'static str,
}

pub const VERSIONED_SCHEMAS: &[StoreSchema] = &[StoreSchema {
    version: 1,
    up: r#"
            CREATE TABLE IF NOT EXISTS lyrics_complexity (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                year INTEGER NOT NULL,
                rank INTEGER NOT NULL,
                title TEXT NOT NULL,
                artist TEXT NOT NULL,
                lyrics_found INTEGER NOT NULL DEFAULT 0,
                word_count INTEGER NOT NULL,
                unique_word_count INTEGER NOT NULL,
                lexical_diversity REAL,
                flesch_kincaid_score REAL,
                avg_sentence_length REAL NOT NULL,
                complexity_category TEXT,
                rank_category TEXT NOT NULL,
                created_at TEXT NOT NULL,
                UNIQUE (artist, title, year)
            );

            CREATE TABLE IF NOT EXISTS yearly_complexity_stats (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                year INTEGER UNIQUE NOT NULL,
                song_count INTEGER NOT NULL,
                lyrics_found_count INTEGER NOT NULL,
                word_count_mean REAL,
                word_count_std REAL,
                word_count_median REAL,
                unique_word_count_mean REAL,
                unique_word_count_std REAL,
                unique_word_count_median REAL,
                lexical_diversity_mean REAL,
                lexical_diversity_std REAL,
                lexical_diversity_median REAL,
                flesch_kincaid_score_mean REAL,
                flesch_kincaid_score_std REAL,
                flesch_kincaid_score_median REAL,
                avg_sentence_length_mean REAL,
                avg_sentence_length_std REAL,
                avg_sentence_length_median REAL,
                complexity_trend REAL
            );

            CREATE TABLE IF NOT EXISTS decade_complexity_stats (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                decade INTEGER UNIQUE NOT NULL,
                song_count INTEGER NOT NULL,
                lyrics_found_count INTEGER NOT NULL,
                word_count_mean REAL,
                word_count_std REAL,
                word_count_median REAL,
                unique_word_count_mean REAL,
                unique_word_count_std REAL,
                unique_word_count_median REAL,
                lexical_diversity_mean REAL,
                lexical_diversity_std REAL,
                lexical_diversity_median REAL,
                flesch_kincaid_score_mean REAL,
                flesch_kincaid_score_std REAL,
                flesch_kincaid_score_median REAL,
                avg_sentence_length_mean REAL,
                avg_sentence_length_std REAL,
                avg_sentence_length_median REAL
            );

            CREATE TABLE IF NOT EXISTS pipeline_runs (
                run_id TEXT PRIMARY KEY,
                started_at TEXT NOT NULL,
                finished_at TEXT NOT NULL,
                status TEXT NOT NULL,
                rows_loaded INTEGER NOT NULL,
                message TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_lyrics_complexity_year ON lyrics_complexity(year);
            CREATE INDEX IF NOT EXISTS idx_lyrics_complexity_rank ON lyrics_complexity(rank);
            CREATE INDEX IF NOT EXISTS idx_lyrics_complexity_artist ON lyrics_complexity(artist);
            CREATE INDEX IF NOT EXISTS idx_lyrics_complexity_category ON lyrics_complexity(complexity_category);
        "#,
}];

/// Latest schema version.
pub fn latest_version() -> usize {
    VERSIONED_SCHEMAS.last().map(|s| s.version).unwrap_or(0)
}
