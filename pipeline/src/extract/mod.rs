//! Extract stage: look up lyrics for chart entries.
//!
//! ```text
//! ChartEntry[] ──group by year──▶ for each year (ascending)
//!                                    for each entry (by rank)
//!                                       LyricsSource::fetch_lyrics (retried)
//!                                       sleep(request_delay)
//!                                    sleep(year_delay)
//!                                 ──▶ SongRecord[] + ExtractionReport
//! ```
//!
//! A lookup that keeps failing, or finds nothing, yields a record with no
//! lyrics. Extraction as a whole only fails when the source cannot be built.

pub mod genius;

use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::{PipelineConfig, YearRange};
use crate::error::{ExtractError, ExtractResult};
use crate::models::{ChartEntry, SongRecord};

pub use genius::{extract_lyrics_from_html, GeniusClient};

/// Anything that can look up lyrics for a song.
pub trait LyricsSource {
    /// `Ok(None)` means the song was not found.
    fn fetch_lyrics(
        &self,
        title: &str,
        artist: &str,
    ) -> impl Future<Output = ExtractResult<Option<String>>> + Send;
}

/// Outcome of an extraction run.
#[derive(Debug, Clone, Default)]
pub struct ExtractionReport {
    pub records: Vec<SongRecord>,
    pub found: usize,
    pub missing: usize,
    /// Lookups that errored on every attempt. Included in `missing`.
    pub failed: usize,
    /// Entries dropped because their year is outside the configured range.
    pub out_of_range: usize,
}

impl ExtractionReport {
    pub fn total(&self) -> usize {
        self.records.len()
    }

    pub fn found_ratio(&self) -> f64 {
        if self.records.is_empty() {
            0.0
        } else {
            self.found as f64 / self.records.len() as f64
        }
    }
}

/// Drives a [`LyricsSource`] over chart entries, one year at a time.
pub struct LyricsExtractor<S> {
    source: S,
    years: YearRange,
    request_delay: Duration,
    year_delay: Duration,
    max_retries: u32,
    retry_delay: Duration,
}

impl<S: LyricsSource> LyricsExtractor<S> {
    pub fn new(source: S, config: &PipelineConfig) -> Self {
        let extraction = &config.extraction;
        Self {
            source,
            years: config.years,
            request_delay: extraction.request_delay(),
            year_delay: extraction.year_delay(),
            max_retries: extraction.max_retries,
            retry_delay: extraction.retry_delay(),
        }
    }

    /// Override all pauses. Zero disables them.
    pub fn with_delays(mut self, request: Duration, year: Duration, retry: Duration) -> Self {
        self.request_delay = request;
        self.year_delay = year;
        self.retry_delay = retry;
        self
    }

    /// Look up every entry. Output is ordered by year, then rank.
    pub async fn extract(&self, entries: Vec<ChartEntry>) -> ExtractionReport {
        let mut report = ExtractionReport::default();
        let mut by_year: BTreeMap<i32, Vec<ChartEntry>> = BTreeMap::new();

        for entry in entries {
            if self.years.contains(entry.year as i64) {
                by_year.entry(entry.year).or_default().push(entry);
            } else {
                warn!(year = entry.year, "Skipping {} - {}: year outside range", entry.artist, entry.title);
                report.out_of_range += 1;
            }
        }

        let year_count = by_year.len();
        for (idx, (year, mut chart)) in by_year.into_iter().enumerate() {
            chart.sort_by_key(|e| e.rank);
            info!(year, songs = chart.len(), "Extracting lyrics");
            let found_before = report.found;

            for entry in chart {
                let lyrics = match self.fetch_with_retry(&entry).await {
                    Ok(lyrics) => lyrics,
                    Err(e) => {
                        warn!("Lookup failed for {} - {}: {}", entry.artist, entry.title, e);
                        report.failed += 1;
                        None
                    }
                };

                match lyrics {
                    Some(_) => report.found += 1,
                    None => {
                        debug!("No lyrics for {} - {}", entry.artist, entry.title);
                        report.missing += 1;
                    }
                }
                report.records.push(SongRecord::new(entry, lyrics));
                pause(self.request_delay).await;
            }

            info!(year, found = report.found - found_before, "Year complete");
            if idx + 1 < year_count {
                pause(self.year_delay).await;
            }
        }

        info!(
            total = report.total(),
            found = report.found,
            missing = report.missing,
            failed = report.failed,
            "Extraction complete"
        );
        report
    }

    async fn fetch_with_retry(&self, entry: &ChartEntry) -> ExtractResult<Option<String>> {
        let attempts = self.max_retries.max(1);
        let mut last_error = None;

        for attempt in 1..=attempts {
            match self.source.fetch_lyrics(&entry.title, &entry.artist).await {
                Ok(lyrics) => return Ok(lyrics.filter(|l| !l.trim().is_empty())),
                Err(e) => {
                    warn!(attempt, attempts, "Lookup attempt failed: {}", e);
                    let wait = match &e {
                        ExtractError::RateLimited(secs) => {
                            self.retry_delay.max(Duration::from_secs(*secs))
                        }
                        _ => self.retry_delay,
                    };
                    last_error = Some(e);

                    if attempt < attempts {
                        pause(wait).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or(ExtractError::Api {
            status: 0,
            message: "no attempts made".to_string(),
        }))
    }
}

async fn pause(duration: Duration) {
    if !duration.is_zero() {
        tokio::time::sleep(duration).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Serves canned lyrics; titles in `flaky` fail that many times first.
    #[derive(Default)]
    struct FakeSource {
        lyrics: HashMap<String, String>,
        flaky: Mutex<HashMap<String, u32>>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeSource {
        fn with(mut self, title: &str, lyrics: &str) -> Self {
            self.lyrics.insert(title.into(), lyrics.into());
            self
        }

        fn failing(self, title: &str, times: u32) -> Self {
            self.flaky.lock().unwrap().insert(title.into(), times);
            self
        }
    }

    impl LyricsSource for FakeSource {
        fn fetch_lyrics(
            &self,
            title: &str,
            _artist: &str,
        ) -> impl Future<Output = ExtractResult<Option<String>>> + Send {
            self.calls.lock().unwrap().push(title.to_string());

            let mut flaky = self.flaky.lock().unwrap();
            let result = match flaky.get_mut(title) {
                Some(remaining) if *remaining > 0 => {
                    *remaining -= 1;
                    Err(ExtractError::Api {
                        status: 503,
                        message: "unavailable".into(),
                    })
                }
                _ => Ok(self.lyrics.get(title).cloned()),
            };
            async move { result }
        }
    }

    fn entry(rank: u32, year: i32, title: &str) -> ChartEntry {
        ChartEntry {
            rank,
            year,
            artist: "Artist".into(),
            title: title.into(),
        }
    }

    fn extractor(source: FakeSource) -> LyricsExtractor<FakeSource> {
        LyricsExtractor::new(source, &PipelineConfig::default())
            .with_delays(Duration::ZERO, Duration::ZERO, Duration::ZERO)
    }

    #[tokio::test]
    async fn test_extract_groups_by_year_and_rank() {
        let source = FakeSource::default()
            .with("A", "la la")
            .with("B", "hey")
            .with("C", "oh");
        let ex = extractor(source);

        let report = ex
            .extract(vec![entry(2, 2021, "B"), entry(1, 2020, "C"), entry(1, 2021, "A")])
            .await;

        let order: Vec<(i32, u32)> = report.records.iter().map(|r| (r.year, r.rank)).collect();
        assert_eq!(order, vec![(2020, 1), (2021, 1), (2021, 2)]);
        assert_eq!(report.found, 3);
        assert_eq!(report.missing, 0);
        assert_eq!(report.found_ratio(), 1.0);
    }

    #[tokio::test]
    async fn test_missing_lyrics_recorded_as_none() {
        let ex = extractor(FakeSource::default().with("Known", "words here").with("Blank", "  "));

        let report = ex
            .extract(vec![entry(1, 2020, "Known"), entry(2, 2020, "Unknown"), entry(3, 2020, "Blank")])
            .await;

        assert_eq!(report.total(), 3);
        assert_eq!(report.found, 1);
        assert_eq!(report.missing, 2);
        assert!(report.records[1].lyrics.is_none());
        assert!(report.records[2].lyrics.is_none());
    }

    #[tokio::test]
    async fn test_retries_then_succeeds() {
        let source = FakeSource::default().with("Flaky", "finally").failing("Flaky", 2);
        let ex = extractor(source);

        let report = ex.extract(vec![entry(1, 2020, "Flaky")]).await;

        assert_eq!(report.found, 1);
        assert_eq!(report.failed, 0);
        assert_eq!(ex.source.calls.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_persistent_failure_yields_missing() {
        let source = FakeSource::default().with("Down", "never").failing("Down", 10);
        let ex = extractor(source);

        let report = ex.extract(vec![entry(1, 2020, "Down")]).await;

        assert_eq!(report.failed, 1);
        assert_eq!(report.missing, 1);
        assert!(report.records[0].lyrics.is_none());
        // max_retries defaults to 3
        assert_eq!(ex.source.calls.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_years_outside_range_dropped() {
        let ex = extractor(FakeSource::default().with("Old", "x").with("New", "y"));

        let report = ex.extract(vec![entry(1, 1999, "Old"), entry(1, 2020, "New")]).await;

        assert_eq!(report.total(), 1);
        assert_eq!(report.out_of_range, 1);
        assert_eq!(report.records[0].title, "New");
    }
}
