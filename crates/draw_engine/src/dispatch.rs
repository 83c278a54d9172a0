use std::future::Future;
use std::time::Duration;

use draw_core::{format_digest_within, tail, DigestStyle, Row};
use futures_util::future::join_all;
use relay_logging::{relay_info, relay_warn};

use crate::{ChannelClient, ChannelError, ChannelFailure, DeliveryMode, MessageHandle};

/// Per-channel rendering and delivery choices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSpec {
    /// Most recent rounds shown in this channel's digest.
    pub retention: usize,
    pub mode: DeliveryMode,
    pub style: DigestStyle,
}

impl ChannelSpec {
    pub fn new(retention: usize, mode: DeliveryMode) -> Self {
        Self {
            retention: retention.max(1),
            mode,
            style: DigestStyle::live(),
        }
    }
}

/// Bounded handling of "too many requests" answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrySettings {
    /// Retries after the first rate-limited attempt.
    pub max_retries: u32,
    /// Upper bound for a single server-requested wait.
    pub max_backoff: Duration,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 1,
            max_backoff: Duration::from_secs(60),
        }
    }
}

/// When a publish counts as done and the tracker may commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommitPolicy {
    /// Commit once delivery was attempted on every channel, whatever the outcome.
    #[default]
    Attempted,
    /// Commit once at least one channel accepted the digest.
    AnyAccepted,
    /// Commit only when every channel accepted the digest.
    AllAccepted,
}

impl CommitPolicy {
    /// A broadcast to no channels at all always commits.
    pub fn allows_commit(self, report: &BroadcastReport) -> bool {
        if report.outcomes.is_empty() {
            return true;
        }
        match self {
            CommitPolicy::Attempted => true,
            CommitPolicy::AnyAccepted => report.any_accepted(),
            CommitPolicy::AllAccepted => report.all_accepted(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryAction {
    Sent,
    Edited,
    /// The remembered message was gone, a new one was sent instead.
    Resent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelOutcome {
    pub channel: String,
    pub result: Result<DeliveryAction, ChannelError>,
    /// Requests made, including rate-limit retries and edit fallback.
    pub attempts: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BroadcastReport {
    pub outcomes: Vec<ChannelOutcome>,
}

impl BroadcastReport {
    pub fn accepted_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn any_accepted(&self) -> bool {
        self.accepted_count() > 0
    }

    pub fn all_accepted(&self) -> bool {
        self.accepted_count() == self.outcomes.len()
    }

    pub fn outcome(&self, channel: &str) -> Option<&ChannelOutcome> {
        self.outcomes.iter().find(|o| o.channel == channel)
    }
}

struct ChannelSlot {
    client: Box<dyn ChannelClient>,
    spec: ChannelSpec,
    /// Message edited by edit-preferred delivery. Survives day rollover.
    last_handle: Option<MessageHandle>,
}

impl ChannelSlot {
    fn render(&self, window: &[Row]) -> String {
        let rows = tail(window, self.spec.retention);
        format_digest_within(rows, &self.spec.style, self.client.max_chars())
    }

    async fn deliver(&mut self, window: &[Row], retry: RetrySettings) -> ChannelOutcome {
        let text = self.render(window);
        let client: &dyn ChannelClient = self.client.as_ref();
        let mut attempts = 0;

        let remembered = match self.spec.mode {
            DeliveryMode::EditPreferred => self.last_handle.clone(),
            DeliveryMode::Append => None,
        };
        let result = match remembered {
            Some(handle) => {
                let edited =
                    with_rate_limit_retry(retry, client.name(), &mut attempts, || {
                        client.edit(&handle, &text)
                    })
                    .await;
                match edited {
                    Ok(()) => Ok(DeliveryAction::Edited),
                    Err(err) if err.kind == ChannelFailure::NotFound => {
                        relay_info!(
                            "{}: message {} is gone ({}), sending a new one",
                            client.name(),
                            handle,
                            err.message
                        );
                        self.last_handle = None;
                        with_rate_limit_retry(retry, client.name(), &mut attempts, || {
                            client.send(&text)
                        })
                        .await
                        .map(|handle| {
                            self.last_handle = handle;
                            DeliveryAction::Resent
                        })
                    }
                    Err(err) => Err(err),
                }
            }
            None => with_rate_limit_retry(retry, client.name(), &mut attempts, || {
                client.send(&text)
            })
            .await
            .map(|handle| {
                if self.spec.mode == DeliveryMode::EditPreferred {
                    self.last_handle = handle;
                }
                DeliveryAction::Sent
            }),
        };

        match &result {
            Ok(action) => relay_info!(
                "{}: {:?} {} chars after {} attempt(s)",
                client.name(),
                action,
                text.chars().count(),
                attempts
            ),
            Err(err) => relay_warn!(
                "{}: delivery failed after {} attempt(s): {}",
                client.name(),
                attempts,
                err
            ),
        }

        ChannelOutcome {
            channel: client.name().to_string(),
            result,
            attempts,
        }
    }
}

/// Runs `op`, waiting out rate limits up to `retry.max_retries` times.
async fn with_rate_limit_retry<T, F, Fut>(
    retry: RetrySettings,
    channel: &str,
    attempts: &mut u32,
    mut op: F,
) -> Result<T, ChannelError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ChannelError>>,
{
    let mut retries = 0;
    loop {
        *attempts += 1;
        match op().await {
            Err(ChannelError {
                kind: ChannelFailure::RateLimited { retry_after },
                ..
            }) if retries < retry.max_retries => {
                let wait = retry_after.min(retry.max_backoff);
                relay_warn!(
                    "{}: rate limited, retrying in {:.1}s",
                    channel,
                    wait.as_secs_f64()
                );
                tokio::time::sleep(wait).await;
                retries += 1;
            }
            other => return other,
        }
    }
}

/// Fans digests out to every configured channel.
///
/// Channels are delivered concurrently and independently: a failing or
/// rate-limited channel neither stops nor delays the others beyond the
/// broadcast as a whole.
pub struct Dispatcher {
    slots: Vec<ChannelSlot>,
    retry: RetrySettings,
}

impl Dispatcher {
    pub fn new(retry: RetrySettings) -> Self {
        Self {
            slots: Vec::new(),
            retry,
        }
    }

    pub fn add_channel(&mut self, client: Box<dyn ChannelClient>, spec: ChannelSpec) {
        relay_info!(
            "Channel {} enabled ({:?}, {} rounds, {} chars)",
            client.name(),
            spec.mode,
            spec.retention,
            client.max_chars()
        );
        self.slots.push(ChannelSlot {
            client,
            spec,
            last_handle: None,
        });
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Largest retention of any channel, so the tracker keeps enough rounds.
    pub fn max_retention(&self) -> Option<usize> {
        self.slots.iter().map(|slot| slot.spec.retention).max()
    }

    /// Message currently edited in place for `channel`, if any.
    pub fn remembered_handle(&self, channel: &str) -> Option<&MessageHandle> {
        self.slots
            .iter()
            .find(|slot| slot.client.name() == channel)
            .and_then(|slot| slot.last_handle.as_ref())
    }

    /// Renders `window` for each channel and delivers it. Returns once every
    /// channel has finished, successfully or not.
    pub async fn broadcast(&mut self, window: &[Row]) -> BroadcastReport {
        let retry = self.retry;
        let deliveries = self
            .slots
            .iter_mut()
            .map(|slot| slot.deliver(window, retry));
        BroadcastReport {
            outcomes: join_all(deliveries).await,
        }
    }
}
