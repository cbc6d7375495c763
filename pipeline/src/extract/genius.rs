//! Genius lyrics client.
//!
//! Lookup is two requests: an authenticated API search for the song page, then
//! a plain fetch of that page. Lyrics live in one or more
//! `data-lyrics-container="true"` blocks; line breaks are `<br>` tags and
//! everything else is inline markup.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::LyricsSource;
use crate::config::ExtractionConfig;
use crate::error::{ExtractError, ExtractResult};

const USER_AGENT: &str = concat!("lyrical-complexity/", env!("CARGO_PKG_VERSION"));

/// Seconds to wait when a 429 carries no usable Retry-After.
const DEFAULT_RETRY_AFTER_SECS: u64 = 5;

static DIV_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<div\b[^>]*>|</div\s*>").expect("div pattern is valid"));

static LYRICS_CONTAINER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<div\b[^>]*data-lyrics-container\s*=\s*"true"[^>]*>"#)
        .expect("container pattern is valid")
});

static LINE_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<br\s*/?>").expect("br pattern is valid"));

static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("tag pattern is valid"));

static ENTITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"&(#[0-9]+|#[xX][0-9a-fA-F]+|[a-zA-Z]+);").expect("entity pattern is valid")
});

// =============================================================================
// API Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct SearchEnvelope {
    response: SearchResponse,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    hits: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    #[serde(rename = "type")]
    hit_type: String,
    result: SongHit,
}

/// A song returned by the search endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct SongHit {
    pub title: String,
    pub url: String,
    pub primary_artist: HitArtist,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HitArtist {
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    meta: ApiErrorMeta,
}

#[derive(Debug, Deserialize)]
struct ApiErrorMeta {
    message: String,
}

// =============================================================================
// Client
// =============================================================================

/// Genius API client.
#[derive(Clone)]
pub struct GeniusClient {
    http: reqwest::Client,
    token: String,
    base_url: String,
}

impl GeniusClient {
    pub fn new(token: String, base_url: &str, timeout: Duration) -> ExtractResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            http,
            token,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Build from configuration; the token is required.
    pub fn from_config(config: &ExtractionConfig) -> ExtractResult<Self> {
        let token = config
            .genius_token
            .clone()
            .filter(|t| !t.trim().is_empty())
            .ok_or(ExtractError::MissingToken)?;
        Self::new(token, &config.genius_base_url, config.timeout())
    }

    /// Best search hit for a song, if any.
    pub async fn search(&self, title: &str, artist: &str) -> ExtractResult<Option<SongHit>> {
        let query = format!("{} {}", title, artist);
        debug!(%query, "Searching Genius");

        let response = self
            .http
            .get(format!("{}/search", self.base_url))
            .bearer_auth(&self.token)
            .query(&[("q", query.as_str())])
            .send()
            .await?;

        let body = checked_body(response).await?;
        let envelope: SearchEnvelope = serde_json::from_str(&body)?;
        Ok(best_hit(envelope.response.hits, artist))
    }

    /// Download a song page.
    pub async fn fetch_page(&self, url: &str) -> ExtractResult<String> {
        let response = self.http.get(url).send().await?;
        checked_body(response).await
    }

    async fn lookup(&self, title: &str, artist: &str) -> ExtractResult<Option<String>> {
        let Some(hit) = self.search(title, artist).await? else {
            return Ok(None);
        };
        debug!(url = %hit.url, "Fetching lyrics page");
        let html = self.fetch_page(&hit.url).await?;
        Ok(extract_lyrics_from_html(&html))
    }
}

impl LyricsSource for GeniusClient {
    fn fetch_lyrics(
        &self,
        title: &str,
        artist: &str,
    ) -> impl std::future::Future<Output = ExtractResult<Option<String>>> + Send {
        self.lookup(title, artist)
    }
}

/// Body of a successful response, or the matching error.
async fn checked_body(response: reqwest::Response) -> ExtractResult<String> {
    let status = response.status();

    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
        return Err(ExtractError::RateLimited(retry_after));
    }

    let body = response.text().await?;
    if !status.is_success() {
        let message = serde_json::from_str::<ApiErrorBody>(&body)
            .map(|e| e.meta.message)
            .unwrap_or_else(|_| body.chars().take(200).collect());
        return Err(ExtractError::Api {
            status: status.as_u16(),
            message,
        });
    }
    Ok(body)
}

/// Prefer the first song hit whose artist matches, else the first song hit.
fn best_hit(hits: Vec<SearchHit>, artist: &str) -> Option<SongHit> {
    let wanted = artist.to_lowercase();
    let songs: Vec<SongHit> = hits
        .into_iter()
        .filter(|h| h.hit_type == "song")
        .map(|h| h.result)
        .collect();

    let matching = songs.iter().position(|s| {
        let name = s.primary_artist.name.to_lowercase();
        wanted.contains(&name) || name.contains(&wanted)
    });

    match matching {
        Some(idx) => songs.into_iter().nth(idx),
        None => songs.into_iter().next(),
    }
}

// =============================================================================
// Page Scraping
// =============================================================================

/// Pull plain-text lyrics out of a song page.
///
/// Returns `None` when the page has no lyrics containers or they are empty.
pub fn extract_lyrics_from_html(html: &str) -> Option<String> {
    let mut blocks = Vec::new();
    let mut search_from = 0;

    while let Some(open) = LYRICS_CONTAINER.find_at(html, search_from) {
        let inner_start = open.end();
        let inner_end = matching_div_end(html, inner_start).unwrap_or(html.len());
        blocks.push(container_text(&html[inner_start..inner_end]));
        search_from = inner_end;
    }

    let text = blocks
        .iter()
        .map(|b| b.trim())
        .filter(|b| !b.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Byte offset of the `</div>` closing a div whose content starts at `from`.
fn matching_div_end(html: &str, from: usize) -> Option<usize> {
    let mut depth = 1usize;
    for tag in DIV_TAG.find_iter(&html[from..]) {
        if tag.as_str().starts_with("</") {
            depth -= 1;
            if depth == 0 {
                return Some(from + tag.start());
            }
        } else {
            depth += 1;
        }
    }
    None
}

fn container_text(fragment: &str) -> String {
    let with_breaks = LINE_BREAK.replace_all(fragment, "\n");
    let stripped = TAG.replace_all(&with_breaks, "");
    decode_entities(&stripped)
}

/// Decode the HTML entities Genius pages use.
pub fn decode_entities(text: &str) -> String {
    ENTITY
        .replace_all(text, |caps: &Captures| {
            let name = &caps[1];
            let decoded = if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = name.strip_prefix('#') {
                dec.parse().ok().and_then(char::from_u32)
            } else {
                match name {
                    "amp" => Some('&'),
                    "lt" => Some('<'),
                    "gt" => Some('>'),
                    "quot" => Some('"'),
                    "apos" => Some('\''),
                    "nbsp" => Some(' '),
                    _ => None,
                }
            };
            match decoded {
                Some(c) => c.to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}
