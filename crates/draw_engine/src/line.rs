use serde_json::json;

use crate::http::{body_excerpt, send_json, DEFAULT_RETRY_AFTER};
use crate::{ChannelClient, ChannelError, ChannelFailure, HttpSettings, MessageHandle};

/// LINE push messages are capped at 5000 characters; keep some headroom.
pub const LINE_MAX_CHARS: usize = 4900;

const LINE_API_BASE: &str = "https://api.line.me";

/// Push messages to one LINE user, group or room. Append-only.
#[derive(Debug, Clone)]
pub struct LineClient {
    name: String,
    client: reqwest::Client,
    api_base: String,
    access_token: String,
    to: String,
}

impl LineClient {
    pub fn new(
        http: &HttpSettings,
        access_token: impl Into<String>,
        to: impl Into<String>,
    ) -> Result<Self, ChannelError> {
        let to = to.into();
        let client = http
            .build_client()
            .map_err(|err| ChannelError::new(ChannelFailure::Network, err.to_string()))?;
        Ok(Self {
            name: format!("line:{to}"),
            client,
            api_base: LINE_API_BASE.to_string(),
            access_token: access_token.into(),
            to,
        })
    }

    /// Points the client at another API host, e.g. a test server.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }
}

#[async_trait::async_trait]
impl ChannelClient for LineClient {
    fn name(&self) -> &str {
        &self.name
    }

    fn max_chars(&self) -> usize {
        LINE_MAX_CHARS
    }

    async fn send(&self, text: &str) -> Result<Option<MessageHandle>, ChannelError> {
        let url = format!("{}/v2/bot/message/push", self.api_base);
        let body = json!({
            "to": self.to,
            "messages": [{ "type": "text", "text": text }],
        });
        let request = self.client.post(url).bearer_auth(&self.access_token);
        let (status, retry_after, bytes) = send_json(request, &body).await?;

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ChannelError::rate_limited(
                retry_after.unwrap_or(DEFAULT_RETRY_AFTER),
            ));
        }
        if !status.is_success() {
            return Err(ChannelError::new(
                ChannelFailure::HttpStatus(status.as_u16()),
                body_excerpt(&bytes),
            ));
        }

        // Newer API versions echo the ids of the pushed messages.
        let handle = serde_json::from_slice::<serde_json::Value>(&bytes)
            .ok()
            .and_then(|value| {
                value
                    .pointer("/sentMessages/0/id")
                    .and_then(serde_json::Value::as_str)
                    .map(|id| MessageHandle(id.to_string()))
            });
        Ok(handle)
    }
}
