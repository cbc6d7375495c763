//! Stage files exchanged between extract, transform and load.
//!
//! ```text
//! extract   ──▶ songs.csv
//! transform ──▶ complexity.json   (read back by load and insights)
//!           ──▶ complexity_rows.csv, yearly_stats.csv, decade_stats.csv
//! ```
//!
//! Statistics CSVs carry `<metric>_mean`, `<metric>_std` and `<metric>_median`
//! columns for each enabled metric. Missing values are empty cells.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::PipelineConfig;
use crate::error::{CsvResult, PipelineResult};
use crate::models::{DecadeStats, Metric, MetricSummary, SongRecord};
use crate::transform::TransformOutput;

// =============================================================================
// Songs
// =============================================================================

/// Write extracted songs; missing lyrics become empty cells.
pub fn write_songs_csv(path: &Path, songs: &[SongRecord]) -> CsvResult<()> {
    ensure_parent(path)?;
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["rank", "year", "artist", "title", "lyrics"])?;
    for song in songs {
        writer.write_record([
            song.rank.to_string(),
            song.year.to_string(),
            song.artist.clone(),
            song.title.clone(),
            song.lyrics.clone().unwrap_or_default(),
        ])?;
    }
    writer.flush()?;
    info!(path = %path.display(), songs = songs.len(), "Wrote songs file");
    Ok(())
}

// =============================================================================
// Transform Output
// =============================================================================

pub fn write_transform_output(path: &Path, output: &TransformOutput) -> PipelineResult<()> {
    ensure_parent(path)?;
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, output)?;
    info!(path = %path.display(), rows = output.rows.len(), "Wrote transform output");
    Ok(())
}

pub fn read_transform_output(path: &Path) -> PipelineResult<TransformOutput> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

/// Per-song rows, one CSV line each.
pub fn write_rows_csv(path: &Path, output: &TransformOutput) -> CsvResult<()> {
    ensure_parent(path)?;
    let mut writer = csv::Writer::from_path(path)?;
    for row in &output.rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_yearly_csv(path: &Path, output: &TransformOutput, metrics: &[Metric]) -> CsvResult<()> {
    ensure_parent(path)?;
    let mut writer = csv::Writer::from_path(path)?;

    let mut header = vec!["year".to_string(), "song_count".into(), "lyrics_found_count".into()];
    header.extend(stat_headers(metrics));
    header.push("complexity_trend".into());
    writer.write_record(&header)?;

    for stats in &output.yearly {
        let mut record = vec![
            stats.year.to_string(),
            stats.song_count.to_string(),
            stats.lyrics_found_count.to_string(),
        ];
        record.extend(stat_cells(metrics, |m| stats.summary(m)));
        record.push(cell(stats.complexity_trend));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_decade_csv(path: &Path, decades: &[DecadeStats], metrics: &[Metric]) -> CsvResult<()> {
    ensure_parent(path)?;
    let mut writer = csv::Writer::from_path(path)?;

    let mut header = vec!["decade".to_string(), "song_count".into(), "lyrics_found_count".into()];
    header.extend(stat_headers(metrics));
    writer.write_record(&header)?;

    for stats in decades {
        let mut record = vec![
            stats.decade.to_string(),
            stats.song_count.to_string(),
            stats.lyrics_found_count.to_string(),
        ];
        record.extend(stat_cells(metrics, |m| stats.summary(m)));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write every transform file under the data directory. Returns the paths.
pub fn write_transform_files(
    config: &PipelineConfig,
    output: &TransformOutput,
) -> PipelineResult<Vec<PathBuf>> {
    let metrics = config.enabled_metrics();
    let json = config.transform_output_path();
    let rows = config.rows_csv_path();
    let yearly = config.yearly_csv_path();
    let decade = config.decade_csv_path();

    write_transform_output(&json, output)?;
    write_rows_csv(&rows, output)?;
    write_yearly_csv(&yearly, output, &metrics)?;
    write_decade_csv(&decade, &output.decade, &metrics)?;

    info!(dir = %config.data_dir.display(), "Wrote transform files");
    Ok(vec![json, rows, yearly, decade])
}

// =============================================================================
// Helpers
// =============================================================================

fn ensure_parent(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

fn stat_headers(metrics: &[Metric]) -> Vec<String> {
    metrics
        .iter()
        .flat_map(|m| ["mean", "std", "median"].map(|s| format!("{}_{}", m.column(), s)))
        .collect()
}

fn stat_cells<'a, F>(metrics: &[Metric], summary: F) -> Vec<String>
where
    F: Fn(Metric) -> Option<&'a MetricSummary>,
{
    metrics
        .iter()
        .flat_map(|&m| {
            let s = summary(m).copied().unwrap_or_default();
            [cell(s.mean), cell(s.std_dev), cell(s.median)]
        })
        .collect()
}

fn cell(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::RecordParser;
    use crate::transform::Transformer;
    use chrono::Utc;

    fn songs() -> Vec<SongRecord> {
        vec![
            SongRecord {
                rank: 1,
                year: 2020,
                artist: "The Weeknd".into(),
                title: "Blinding Lights".into(),
                lyrics: Some("I said, ooh, I'm blinded by the lights\nNo, I can't sleep until I feel your touch".into()),
            },
            SongRecord {
                rank: 50,
                year: 2020,
                artist: "Someone, Else".into(),
                title: "Missing".into(),
                lyrics: None,
            },
            SongRecord {
                rank: 2,
                year: 2016,
                artist: "Drake".into(),
                title: "One Dance".into(),
                lyrics: Some("Baby, I like your style".into()),
            },
        ]
    }

    fn config(dir: &Path) -> PipelineConfig {
        PipelineConfig {
            data_dir: dir.to_path_buf(),
            ..PipelineConfig::default()
        }
    }

    #[test]
    fn test_songs_csv_roundtrip_through_parser() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let path = config.songs_path();

        write_songs_csv(&path, &songs()).unwrap();
        let parsed = RecordParser::from_config(&config).parse_songs_file(&path).unwrap();

        assert!(parsed.skipped.is_empty());
        assert_eq!(parsed.records, songs());
    }

    #[test]
    fn test_transform_files() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let output = Transformer::from_config(&config)
            .transform(songs(), Utc::now());

        let written = write_transform_files(&config, &output).unwrap();
        assert_eq!(written.len(), 4);
        assert!(written.iter().all(|p| p.exists()));

        let back = read_transform_output(&config.transform_output_path()).unwrap();
        assert_eq!(back.rows, output.rows);
        assert_eq!(back.yearly, output.yearly);
        assert_eq!(back.decade, output.decade);

        let yearly = std::fs::read_to_string(config.yearly_csv_path()).unwrap();
        let header = yearly.lines().next().unwrap();
        assert!(header.starts_with("year,song_count,lyrics_found_count,word_count_mean,word_count_std"));
        assert!(header.ends_with("avg_sentence_length_median,complexity_trend"));
        assert_eq!(yearly.lines().count(), 3);
    }

    #[test]
    fn test_transform_output_keeps_exact_floats() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let words = ["night", "beautiful", "we", "dance", "forever", "la", "yeah", "tomorrow"];
        let songs: Vec<SongRecord> = (0..300)
            .map(|i| {
                let lyrics: Vec<&str> = (0..(i % 23 + 1)).map(|j| words[(i * 7 + j * 3) % words.len()]).collect();
                SongRecord {
                    rank: (i % 100) as u32 + 1,
                    year: 2015 + (i % 10) as i32,
                    artist: format!("Artist {}", i),
                    title: format!("Song {}", i),
                    lyrics: Some(lyrics.join(if i % 3 == 0 { "\n" } else { " " })),
                }
            })
            .collect();
        let output = Transformer::from_config(&config)
            .transform(songs, Utc::now());

        write_transform_output(&config.transform_output_path(), &output).unwrap();
        let back = read_transform_output(&config.transform_output_path()).unwrap();

        for (a, b) in output.rows.iter().zip(&back.rows) {
            assert_eq!(a.flesch_kincaid_score.map(f64::to_bits), b.flesch_kincaid_score.map(f64::to_bits));
            assert_eq!(a.lexical_diversity.map(f64::to_bits), b.lexical_diversity.map(f64::to_bits));
            assert_eq!(a.avg_sentence_length.to_bits(), b.avg_sentence_length.to_bits());
        }
        assert_eq!(back.yearly, output.yearly);
        assert_eq!(back.decade, output.decade);
    }

    #[test]
    fn test_stat_columns_follow_enabled_metrics() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(dir.path());
        config.metrics = vec![Metric::LexicalDiversity];
        let output = Transformer::from_config(&config)
            .transform(songs(), Utc::now());

        write_transform_files(&config, &output).unwrap();

        let decade = std::fs::read_to_string(config.decade_csv_path()).unwrap();
        let mut lines = decade.lines();
        assert_eq!(
            lines.next().unwrap(),
            "decade,song_count,lyrics_found_count,lexical_diversity_mean,lexical_diversity_std,lexical_diversity_median"
        );
        // 2010s: one song with lyrics, so no std
        assert_eq!(lines.next().unwrap(), "2010,1,1,1,,1");
    }

    #[test]
    fn test_rows_csv_has_one_line_per_row() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let output = Transformer::from_config(&config)
            .transform(songs(), Utc::now());

        write_rows_csv(&config.rows_csv_path(), &output).unwrap();

        let mut reader = csv::Reader::from_path(config.rows_csv_path()).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(&headers[0], "rank");
        assert!(headers.iter().any(|h| h == "rank_category"));
        assert_eq!(reader.records().count(), 3);
    }
}
