use crate::{ChannelError, ChannelFailure, MessageHandle};

/// How a channel receives successive digests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeliveryMode {
    /// Every digest is a new message.
    #[default]
    Append,
    /// The first digest is sent, later ones edit it in place.
    EditPreferred,
}

/// One outbound destination. Implementations make exactly one request per
/// call; retries and edit fallback are the dispatcher's job.
#[async_trait::async_trait]
pub trait ChannelClient: Send + Sync {
    /// Stable name used in logs and reports.
    fn name(&self) -> &str;

    /// Longest text, in characters, the channel accepts.
    fn max_chars(&self) -> usize;

    /// Sends a new message. Returns its handle when the channel reports one.
    async fn send(&self, text: &str) -> Result<Option<MessageHandle>, ChannelError>;

    /// Replaces the text of a message sent earlier.
    async fn edit(&self, _handle: &MessageHandle, _text: &str) -> Result<(), ChannelError> {
        Err(ChannelError::new(
            ChannelFailure::Unsupported,
            format!("{} cannot edit messages", self.name()),
        ))
    }
}
