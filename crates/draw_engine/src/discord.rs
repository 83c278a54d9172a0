use std::time::Duration;

use serde_json::json;

use crate::http::{body_excerpt, send_json, DEFAULT_RETRY_AFTER};
use crate::{ChannelClient, ChannelError, ChannelFailure, HttpSettings, MessageHandle};

pub const DISCORD_MAX_CHARS: usize = 2000;

/// Posts through a Discord webhook and edits the webhook's own messages.
#[derive(Debug, Clone)]
pub struct DiscordClient {
    name: String,
    client: reqwest::Client,
    webhook_url: String,
}

impl DiscordClient {
    pub fn new(http: &HttpSettings, webhook_url: impl Into<String>) -> Result<Self, ChannelError> {
        let webhook_url: String = webhook_url.into();
        let client = http
            .build_client()
            .map_err(|err| ChannelError::new(ChannelFailure::Network, err.to_string()))?;
        // The token half of the URL must not end up in logs.
        let webhook_id = webhook_url
            .trim_end_matches('/')
            .rsplit('/')
            .nth(1)
            .unwrap_or("webhook")
            .to_string();
        Ok(Self {
            name: format!("discord:{webhook_id}"),
            client,
            webhook_url: webhook_url.trim_end_matches('/').to_string(),
        })
    }

    fn check(
        status: reqwest::StatusCode,
        retry_after: Option<Duration>,
        bytes: &[u8],
    ) -> Result<serde_json::Value, ChannelError> {
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let hinted = serde_json::from_slice::<serde_json::Value>(bytes)
                .ok()
                .and_then(|value| value.get("retry_after").and_then(serde_json::Value::as_f64))
                .and_then(|secs| Duration::try_from_secs_f64(secs).ok());
            return Err(ChannelError::rate_limited(
                hinted.or(retry_after).unwrap_or(DEFAULT_RETRY_AFTER),
            ));
        }
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ChannelError::new(
                ChannelFailure::NotFound,
                body_excerpt(bytes),
            ));
        }
        if !status.is_success() {
            return Err(ChannelError::new(
                ChannelFailure::HttpStatus(status.as_u16()),
                body_excerpt(bytes),
            ));
        }
        serde_json::from_slice(bytes)
            .map_err(|err| ChannelError::new(ChannelFailure::InvalidResponse, err.to_string()))
    }
}

#[async_trait::async_trait]
impl ChannelClient for DiscordClient {
    fn name(&self) -> &str {
        &self.name
    }

    fn max_chars(&self) -> usize {
        DISCORD_MAX_CHARS
    }

    async fn send(&self, text: &str) -> Result<Option<MessageHandle>, ChannelError> {
        // `wait=true` makes Discord return the created message.
        let url = format!("{}?wait=true", self.webhook_url);
        let (status, retry_after, bytes) =
            send_json(self.client.post(url), &json!({ "content": text })).await?;
        let message = Self::check(status, retry_after, &bytes)?;
        let id = message
            .get("id")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| ChannelError::new(ChannelFailure::InvalidResponse, "missing id"))?;
        Ok(Some(MessageHandle(id.to_string())))
    }

    async fn edit(&self, handle: &MessageHandle, text: &str) -> Result<(), ChannelError> {
        let url = format!("{}/messages/{}", self.webhook_url, handle);
        let (status, retry_after, bytes) =
            send_json(self.client.patch(url), &json!({ "content": text })).await?;
        Self::check(status, retry_after, &bytes).map(|_| ())
    }
}
