use chrono::{Days, FixedOffset, NaiveDate};
use draw_core::{complete_rows, Row};
use futures_util::StreamExt;
use relay_logging::relay_debug;

use crate::feed::parse_day_feed;
use crate::{FeedError, FeedFailure, HttpSettings};

/// Upstream location of the per-day result documents.
pub const DEFAULT_FEED_URL: &str =
    "https://ltx-s3-prod.s3.ap-southeast-1.amazonaws.com/lotto-result-list/{date}.json";

#[derive(Debug, Clone)]
pub struct FeedSettings {
    /// URL template; `{date}` is replaced with `YYYY-MM-DD`.
    pub url_template: String,
    pub utc_offset: FixedOffset,
    pub max_bytes: u64,
    pub http: HttpSettings,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            url_template: DEFAULT_FEED_URL.to_string(),
            utc_offset: FixedOffset::east_opt(7 * 3600).expect("static offset"),
            max_bytes: 8 * 1024 * 1024,
            http: HttpSettings::default(),
        }
    }
}

impl FeedSettings {
    pub fn url_for(&self, day: NaiveDate) -> String {
        self.url_template
            .replace("{date}", &day.format("%Y-%m-%d").to_string())
    }
}

/// Source of result rows for one calendar day.
#[async_trait::async_trait]
pub trait ResultSource: Send + Sync {
    /// All rows known so far for `day`, complete or not, in any order.
    /// A day without data yet fails with [`FeedFailure::Unavailable`].
    async fn fetch(&self, day: NaiveDate) -> Result<Vec<Row>, FeedError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestResultSource {
    settings: FeedSettings,
    client: reqwest::Client,
}

impl ReqwestResultSource {
    pub fn new(settings: FeedSettings) -> Result<Self, FeedError> {
        let client = settings
            .http
            .build_client()
            .map_err(|err| FeedError::new(FeedFailure::Network, err.to_string()))?;
        Ok(Self { settings, client })
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, FeedError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        // S3 answers 403 for a missing key when listing is not public.
        if status == reqwest::StatusCode::NOT_FOUND || status == reqwest::StatusCode::FORBIDDEN {
            return Err(FeedError::new(FeedFailure::Unavailable, status.to_string()));
        }
        if !status.is_success() {
            return Err(FeedError::new(
                FeedFailure::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        let max_bytes = self.settings.max_bytes;
        if let Some(content_len) = response.content_length() {
            if content_len > max_bytes {
                return Err(FeedError::new(
                    FeedFailure::TooLarge {
                        max_bytes,
                        actual: Some(content_len),
                    },
                    "response too large",
                ));
            }
        }

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let next_len = bytes.len() as u64 + chunk.len() as u64;
            if next_len > max_bytes {
                return Err(FeedError::new(
                    FeedFailure::TooLarge {
                        max_bytes,
                        actual: Some(next_len),
                    },
                    "response too large",
                ));
            }
            bytes.extend_from_slice(&chunk);
        }
        Ok(bytes)
    }
}

#[async_trait::async_trait]
impl ResultSource for ReqwestResultSource {
    async fn fetch(&self, day: NaiveDate) -> Result<Vec<Row>, FeedError> {
        let url = self.settings.url_for(day);
        let bytes = self.download(&url).await?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Err(FeedError::new(FeedFailure::Unavailable, "empty document"));
        }
        let rows = parse_day_feed(&bytes, self.settings.utc_offset)?;
        relay_debug!("Fetched {} rows for {} ({} bytes)", rows.len(), day, bytes.len());
        Ok(rows)
    }
}

/// Complete rows of `today`, or of the day before while today's document is
/// not populated yet. `Ok(None)` means neither day has results.
///
/// Only an unavailable or empty day falls back; any other failure ends the
/// attempt so a transient error never switches the tracked day.
pub async fn fetch_with_fallback(
    source: &dyn ResultSource,
    today: NaiveDate,
) -> Result<Option<(NaiveDate, Vec<Row>)>, FeedError> {
    let candidates = [Some(today), today.checked_sub_days(Days::new(1))];
    for day in candidates.into_iter().flatten() {
        match source.fetch(day).await {
            Ok(rows) => {
                let rows = complete_rows(rows);
                if !rows.is_empty() {
                    return Ok(Some((day, rows)));
                }
                relay_debug!("No complete rows for {} yet", day);
            }
            Err(err) if err.is_unavailable() => {
                relay_debug!("Feed for {} unavailable: {}", day, err.message);
            }
            Err(err) => return Err(err),
        }
    }
    Ok(None)
}

fn map_reqwest_error(err: reqwest::Error) -> FeedError {
    if err.is_timeout() {
        return FeedError::new(FeedFailure::Timeout, err.to_string());
    }
    FeedError::new(FeedFailure::Network, err.to_string())
}
