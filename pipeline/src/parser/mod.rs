//! Chart and song file parser with encoding and delimiter auto-detection.
//!
//! ```text
//! bytes ─▶ detect_encoding ─▶ decode_content ─▶ detect_delimiter ─▶ csv::Reader
//!                                                                      │
//!                             header aliases ─▶ column indexes ◀───────┘
//!                                                      │
//!                      ChartEntry / SongRecord  +  MalformedRecord (skipped)
//! ```
//!
//! Header names are matched case-insensitively, and common aliases are
//! accepted (`position` for `rank`, `song` for `title`, `performer` for
//! `artist`). Rows that cannot be used are returned as [`MalformedRecord`]s
//! with their line number; they never abort the parse.

use csv::{ReaderBuilder, StringRecord, Trim};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::config::{PipelineConfig, YearRange};
use crate::error::{CsvError, CsvResult, MalformedReason, MalformedRecord};
use crate::models::{ChartEntry, SongRecord};

// =============================================================================
// Detection
// =============================================================================

/// Detect the encoding of raw bytes using chardet.
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    match charset.to_lowercase().as_str() {
        "" | "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        other => other.to_string(),
    }
}

/// Decode bytes with the given encoding label. A leading BOM is dropped.
pub fn decode_content(bytes: &[u8], encoding: &str) -> CsvResult<String> {
    let text = match encoding.to_lowercase().as_str() {
        "utf-8" | "utf8" | "ascii" => match String::from_utf8(bytes.to_vec()) {
            Ok(text) => text,
            Err(_) => String::from_utf8_lossy(bytes).into_owned(),
        },
        // Latin-1 labels decode as windows-1252, its superset (WHATWG).
        "iso-8859-1" | "latin-1" | "latin1" | "windows-1252" | "cp1252" => {
            encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned()
        }
        label => match encoding_rs::Encoding::for_label(label.as_bytes()) {
            Some(codec) => {
                let (text, _, had_errors) = codec.decode(bytes);
                if had_errors {
                    return Err(CsvError::Encoding(label.to_string()));
                }
                text.into_owned()
            }
            // Unknown label: best effort UTF-8
            None => String::from_utf8_lossy(bytes).into_owned(),
        },
    };

    Ok(text.trim_start_matches('\u{feff}').to_string())
}

/// Detect the delimiter by counting occurrences in the header line.
///
/// Falls back to `,` when no candidate appears.
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let separators = [',', ';', '\t', '|'];
    let mut best_sep = ',';
    let mut best_count = 0;

    for &sep in &separators {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

// =============================================================================
// Columns
// =============================================================================

/// Canonical column name for a header, if it is one we read.
fn canonical_column(header: &str) -> Option<&'static str> {
    let name = header.trim().to_lowercase().replace([' ', '-'], "_");
    match name.as_str() {
        "rank" | "position" | "pos" | "chart_position" | "peak" => Some("rank"),
        "year" | "chart_year" => Some("year"),
        "artist" | "artists" | "performer" | "artist_name" => Some("artist"),
        "title" | "song" | "song_title" | "track" | "track_name" | "name" => Some("title"),
        "lyrics" | "lyric" | "text" => Some("lyrics"),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy)]
struct Columns {
    rank: usize,
    year: usize,
    artist: usize,
    title: usize,
    lyrics: Option<usize>,
}

impl Columns {
    fn resolve(headers: &[String], need_lyrics: bool) -> CsvResult<Self> {
        let find = |column: &str| {
            headers
                .iter()
                .position(|h| canonical_column(h) == Some(column))
        };
        let require = |column: &str| find(column).ok_or_else(|| CsvError::MissingColumn(column.to_string()));

        let lyrics = find("lyrics");
        if need_lyrics && lyrics.is_none() {
            return Err(CsvError::MissingColumn("lyrics".to_string()));
        }

        Ok(Self {
            rank: require("rank")?,
            year: require("year")?,
            artist: require("artist")?,
            title: require("title")?,
            lyrics,
        })
    }
}

// =============================================================================
// Parse Results
// =============================================================================

/// Parsed records with detection metadata.
#[derive(Debug, Clone)]
pub struct ParsedFile<T> {
    pub records: Vec<T>,
    pub skipped: Vec<MalformedRecord>,
    pub encoding: String,
    pub delimiter: char,
    pub headers: Vec<String>,
}

impl<T> ParsedFile<T> {
    fn map<U>(self, f: impl FnMut(T) -> U) -> ParsedFile<U> {
        ParsedFile {
            records: self.records.into_iter().map(f).collect(),
            skipped: self.skipped,
            encoding: self.encoding,
            delimiter: self.delimiter,
            headers: self.headers,
        }
    }
}

// =============================================================================
// Record Parser
// =============================================================================

/// Reads chart and song files, rejecting rows outside the configured chart.
#[derive(Debug, Clone, Copy)]
pub struct RecordParser {
    years: YearRange,
    chart_size: u32,
}

impl RecordParser {
    pub fn new(years: YearRange, chart_size: u32) -> Self {
        Self { years, chart_size }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.years, config.chart_size)
    }

    /// Parse a chart listing: rank, year, artist, title.
    pub fn parse_chart_file(&self, path: &Path) -> CsvResult<ParsedFile<ChartEntry>> {
        info!(path = %path.display(), "Reading chart file");
        let bytes = std::fs::read(path)?;
        self.parse_chart_bytes(&bytes)
    }

    pub fn parse_chart_bytes(&self, bytes: &[u8]) -> CsvResult<ParsedFile<ChartEntry>> {
        Ok(self.parse_bytes(bytes, false)?.map(|(entry, _)| entry))
    }

    /// Parse a songs file: the chart columns plus `lyrics`. Empty lyrics
    /// cells read as missing lyrics.
    pub fn parse_songs_file(&self, path: &Path) -> CsvResult<ParsedFile<SongRecord>> {
        info!(path = %path.display(), "Reading songs file");
        let bytes = std::fs::read(path)?;
        self.parse_songs_bytes(&bytes)
    }

    pub fn parse_songs_bytes(&self, bytes: &[u8]) -> CsvResult<ParsedFile<SongRecord>> {
        Ok(self
            .parse_bytes(bytes, true)?
            .map(|(entry, lyrics)| SongRecord::new(entry, lyrics)))
    }

    fn parse_bytes(
        &self,
        bytes: &[u8],
        need_lyrics: bool,
    ) -> CsvResult<ParsedFile<(ChartEntry, Option<String>)>> {
        let encoding = detect_encoding(bytes);
        let content = decode_content(bytes, &encoding)?;
        if content.trim().is_empty() {
            return Err(CsvError::EmptyFile);
        }
        let delimiter = detect_delimiter(&content);
        debug!(%encoding, ?delimiter, "Detected file format");

        let mut reader = ReaderBuilder::new()
            .delimiter(delimiter as u8)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(content.as_bytes());

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let columns = Columns::resolve(&headers, need_lyrics)?;

        let mut records = Vec::new();
        let mut skipped = Vec::new();

        for result in reader.records() {
            let record = result?;
            if record.iter().all(|field| field.is_empty()) {
                continue;
            }
            let line = record
                .position()
                .map(|p| p.line() as usize)
                .unwrap_or_default();

            match self.read_row(&record, columns) {
                Ok(row) => records.push(row),
                Err(malformed) => {
                    let malformed = malformed.at_line(line);
                    warn!("Skipping {}", malformed);
                    skipped.push(malformed);
                }
            }
        }

        info!(
            records = records.len(),
            skipped = skipped.len(),
            %encoding,
            "Parsed {} rows",
            records.len() + skipped.len()
        );

        Ok(ParsedFile {
            records,
            skipped,
            encoding,
            delimiter,
            headers,
        })
    }

    fn read_row(
        &self,
        record: &StringRecord,
        columns: Columns,
    ) -> Result<(ChartEntry, Option<String>), MalformedRecord> {
        let field = |idx: usize| record.get(idx).unwrap_or("");
        let artist = field(columns.artist);
        let title = field(columns.title);
        let malformed = |reason| MalformedRecord::new(artist, title, reason);

        if artist.is_empty() {
            return Err(malformed(MalformedReason::MissingField("artist")));
        }
        if title.is_empty() {
            return Err(malformed(MalformedReason::MissingField("title")));
        }

        let rank = parse_integer("rank", field(columns.rank)).map_err(malformed)?;
        if rank < 1 || rank > self.chart_size as i64 {
            return Err(malformed(MalformedReason::RankOutOfRange {
                rank,
                chart_size: self.chart_size,
            }));
        }

        let year = parse_integer("year", field(columns.year)).map_err(malformed)?;
        if !self.years.contains(year) {
            return Err(malformed(MalformedReason::YearOutOfRange {
                year,
                start: self.years.start,
                end: self.years.end,
            }));
        }

        let lyrics = columns
            .lyrics
            .map(field)
            .filter(|text| !text.is_empty())
            .map(str::to_string);

        Ok((
            ChartEntry {
                // Both are range-checked above.
                rank: rank as u32,
                year: year as i32,
                artist: artist.to_string(),
                title: title.to_string(),
            },
            lyrics,
        ))
    }
}

/// Integers may be written as `7` or `7.0`.
fn parse_integer(field: &'static str, value: &str) -> Result<i64, MalformedReason> {
    if value.is_empty() {
        return Err(MalformedReason::MissingField(field));
    }
    let not_an_integer = || MalformedReason::NotAnInteger {
        field,
        value: value.to_string(),
    };

    if let Ok(n) = value.parse::<i64>() {
        return Ok(n);
    }
    match value.parse::<f64>() {
        Ok(f) if f.is_finite() && f.fract() == 0.0 => Ok(f as i64),
        _ => Err(not_an_integer()),
    }
}
