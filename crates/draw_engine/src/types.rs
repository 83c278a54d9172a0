use std::fmt;
use std::time::Duration;

/// Opaque id of a message a channel accepted, used to edit it later.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageHandle(pub String);

impl fmt::Display for MessageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct FeedError {
    pub kind: FeedFailure,
    pub message: String,
}

impl FeedError {
    pub fn new(kind: FeedFailure, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// The day simply has no data yet; not an error worth reporting.
    pub fn is_unavailable(&self) -> bool {
        self.kind == FeedFailure::Unavailable
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedFailure {
    Unavailable,
    HttpStatus(u16),
    Timeout,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    ParseInvalid,
    Network,
}

impl fmt::Display for FeedFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedFailure::Unavailable => write!(f, "feed unavailable"),
            FeedFailure::HttpStatus(code) => write!(f, "http status {code}"),
            FeedFailure::Timeout => write!(f, "timeout"),
            FeedFailure::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            FeedFailure::ParseInvalid => write!(f, "invalid feed document"),
            FeedFailure::Network => write!(f, "network error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ChannelError {
    pub kind: ChannelFailure,
    pub message: String,
}

impl ChannelError {
    pub fn new(kind: ChannelFailure, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn rate_limited(retry_after: Duration) -> Self {
        Self::new(ChannelFailure::RateLimited { retry_after }, "too many requests")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelFailure {
    /// The server asked to wait before trying again.
    RateLimited { retry_after: Duration },
    /// The message to edit no longer exists or can no longer be edited.
    NotFound,
    HttpStatus(u16),
    Timeout,
    InvalidResponse,
    /// The channel cannot perform the requested operation.
    Unsupported,
    Network,
}

impl fmt::Display for ChannelFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelFailure::RateLimited { retry_after } => {
                write!(f, "rate limited (retry after {}s)", retry_after.as_secs_f64())
            }
            ChannelFailure::NotFound => write!(f, "message not found"),
            ChannelFailure::HttpStatus(code) => write!(f, "http status {code}"),
            ChannelFailure::Timeout => write!(f, "timeout"),
            ChannelFailure::InvalidResponse => write!(f, "invalid response"),
            ChannelFailure::Unsupported => write!(f, "unsupported operation"),
            ChannelFailure::Network => write!(f, "network error"),
        }
    }
}
