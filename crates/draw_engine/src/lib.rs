//! Draw engine: feed fetching, channel delivery and the poll loop.
mod archive;
mod backfill;
mod channel;
mod clock;
mod discord;
mod dispatch;
mod feed;
mod http;
mod line;
mod poller;
mod source;
mod telegram;
mod types;

pub use archive::{day_filename, ensure_output_dir, AtomicFileWriter, DigestArchive, PersistError};
pub use backfill::{backfill, BackfillReport};
pub use channel::{ChannelClient, DeliveryMode};
pub use clock::{Clock, FixedOffsetClock};
pub use discord::{DiscordClient, DISCORD_MAX_CHARS};
pub use dispatch::{
    BroadcastReport, ChannelOutcome, ChannelSpec, CommitPolicy, DeliveryAction, Dispatcher,
    RetrySettings,
};
pub use feed::{parse_day_feed, WATCHED_GROUP_KEY};
pub use http::HttpSettings;
pub use line::{LineClient, LINE_MAX_CHARS};
pub use poller::{IterationOutcome, PollError, PollSettings, Poller, MIN_POLL_INTERVAL};
pub use source::{
    fetch_with_fallback, FeedSettings, ReqwestResultSource, ResultSource, DEFAULT_FEED_URL,
};
pub use telegram::{TelegramClient, TELEGRAM_MAX_CHARS};
pub use types::{ChannelError, ChannelFailure, FeedError, FeedFailure, MessageHandle};
