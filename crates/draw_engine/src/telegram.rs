use std::time::Duration;

use serde::Deserialize;
use serde_json::json;

use crate::http::{body_excerpt, send_json, DEFAULT_RETRY_AFTER};
use crate::{ChannelClient, ChannelError, ChannelFailure, HttpSettings, MessageHandle};

pub const TELEGRAM_MAX_CHARS: usize = 4096;

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Bot API client for one chat. Supports editing sent messages.
#[derive(Debug, Clone)]
pub struct TelegramClient {
    name: String,
    client: reqwest::Client,
    api_base: String,
    bot_token: String,
    chat_id: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    result: Option<serde_json::Value>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    parameters: Option<ResponseParameters>,
}

#[derive(Debug, Deserialize)]
struct ResponseParameters {
    #[serde(default)]
    retry_after: Option<u64>,
}

impl TelegramClient {
    pub fn new(
        http: &HttpSettings,
        bot_token: impl Into<String>,
        chat_id: impl Into<String>,
    ) -> Result<Self, ChannelError> {
        let chat_id = chat_id.into();
        let client = http
            .build_client()
            .map_err(|err| ChannelError::new(ChannelFailure::Network, err.to_string()))?;
        Ok(Self {
            name: format!("telegram:{chat_id}"),
            client,
            api_base: TELEGRAM_API_BASE.to_string(),
            bot_token: bot_token.into(),
            chat_id,
        })
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    async fn call(
        &self,
        method: &str,
        body: serde_json::Value,
    ) -> Result<ApiResponse, ChannelError> {
        let url = format!("{}/bot{}/{}", self.api_base, self.bot_token, method);
        let (status, retry_after, bytes) = send_json(self.client.post(url), &body).await?;

        let parsed: Option<ApiResponse> = serde_json::from_slice(&bytes).ok();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let hinted = parsed
                .as_ref()
                .and_then(|resp| resp.parameters.as_ref())
                .and_then(|params| params.retry_after)
                .map(Duration::from_secs);
            return Err(ChannelError::rate_limited(
                hinted.or(retry_after).unwrap_or(DEFAULT_RETRY_AFTER),
            ));
        }

        match parsed {
            Some(response) if response.ok && status.is_success() => Ok(response),
            Some(response) => {
                let description = response.description.unwrap_or_default();
                let kind = if is_gone(&description) {
                    ChannelFailure::NotFound
                } else {
                    ChannelFailure::HttpStatus(status.as_u16())
                };
                Err(ChannelError::new(kind, description))
            }
            None if !status.is_success() => Err(ChannelError::new(
                ChannelFailure::HttpStatus(status.as_u16()),
                body_excerpt(&bytes),
            )),
            None => Err(ChannelError::new(
                ChannelFailure::InvalidResponse,
                body_excerpt(&bytes),
            )),
        }
    }
}

/// Descriptions meaning the edited message cannot be reached anymore.
fn is_gone(description: &str) -> bool {
    let description = description.to_ascii_lowercase();
    description.contains("message to edit not found")
        || description.contains("message can't be edited")
}

fn is_unchanged(err: &ChannelError) -> bool {
    err.message.to_ascii_lowercase().contains("message is not modified")
}

#[async_trait::async_trait]
impl ChannelClient for TelegramClient {
    fn name(&self) -> &str {
        &self.name
    }

    fn max_chars(&self) -> usize {
        TELEGRAM_MAX_CHARS
    }

    async fn send(&self, text: &str) -> Result<Option<MessageHandle>, ChannelError> {
        let response = self
            .call(
                "sendMessage",
                json!({ "chat_id": self.chat_id, "text": text }),
            )
            .await?;
        let message_id = response
            .result
            .as_ref()
            .and_then(|result| result.get("message_id"))
            .and_then(serde_json::Value::as_i64)
            .ok_or_else(|| {
                ChannelError::new(ChannelFailure::InvalidResponse, "missing message_id")
            })?;
        Ok(Some(MessageHandle(message_id.to_string())))
    }

    async fn edit(&self, handle: &MessageHandle, text: &str) -> Result<(), ChannelError> {
        let message_id: i64 = handle.0.parse().map_err(|_| {
            ChannelError::new(ChannelFailure::NotFound, format!("bad message id {handle}"))
        })?;
        let result = self
            .call(
                "editMessageText",
                json!({ "chat_id": self.chat_id, "message_id": message_id, "text": text }),
            )
            .await;
        match result {
            Ok(_) => Ok(()),
            // Same text as before; the message already shows it.
            Err(err) if is_unchanged(&err) => Ok(()),
            Err(err) => Err(err),
        }
    }
}
