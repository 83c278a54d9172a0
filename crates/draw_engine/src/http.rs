use std::time::Duration;

use reqwest::header::RETRY_AFTER;

use crate::{ChannelError, ChannelFailure};

/// Shared HTTP client settings for the feed and every channel.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(20),
            user_agent: concat!("world264-relay/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl HttpSettings {
    /// Builds a client; proxies are taken from the environment by reqwest.
    pub fn build_client(&self) -> Result<reqwest::Client, reqwest::Error> {
        reqwest::Client::builder()
            .connect_timeout(self.connect_timeout)
            .timeout(self.request_timeout)
            .user_agent(self.user_agent.clone())
            .build()
    }
}

/// Fallback wait when a 429 carries no usable retry hint.
pub(crate) const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(1);

pub(crate) fn map_channel_error(err: reqwest::Error) -> ChannelError {
    if err.is_timeout() {
        return ChannelError::new(ChannelFailure::Timeout, err.to_string());
    }
    ChannelError::new(ChannelFailure::Network, err.to_string())
}

/// Reads a `Retry-After` header given in seconds.
pub(crate) fn retry_after_header(response: &reqwest::Response) -> Option<Duration> {
    response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<f64>().ok())
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
}

/// Posts a JSON body and returns status, `Retry-After` and the raw body.
pub(crate) async fn send_json(
    request: reqwest::RequestBuilder,
    body: &serde_json::Value,
) -> Result<(reqwest::StatusCode, Option<Duration>, Vec<u8>), ChannelError> {
    let payload = serde_json::to_vec(body)
        .map_err(|err| ChannelError::new(ChannelFailure::InvalidResponse, err.to_string()))?;
    let response = request
        .header(reqwest::header::CONTENT_TYPE, "application/json")
        .body(payload)
        .send()
        .await
        .map_err(map_channel_error)?;
    let status = response.status();
    let retry_after = retry_after_header(&response);
    let bytes = response.bytes().await.map_err(map_channel_error)?;
    Ok((status, retry_after, bytes.to_vec()))
}

/// First 160 characters of a response body, for log and error messages.
pub(crate) fn body_excerpt(body: &[u8]) -> String {
    String::from_utf8_lossy(body).chars().take(160).collect()
}
