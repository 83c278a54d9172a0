//! Command line and environment configuration.
//!
//! Every option can be given as a flag or through the environment (a `.env`
//! file in the working directory is loaded first). Channels are optional:
//! a channel without credentials is simply not wired up.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context};
use chrono::FixedOffset;
use clap::{Args, Parser, Subcommand, ValueEnum};
use draw_core::InitialPolicy;
use draw_engine::{
    ChannelClient, ChannelSpec, CommitPolicy, DeliveryMode, DiscordClient, Dispatcher,
    FeedSettings, HttpSettings, LineClient, PollSettings, RetrySettings, TelegramClient,
    DEFAULT_FEED_URL,
};
use log::LevelFilter;
use relay_logging::relay_warn;

#[derive(Parser, Debug)]
#[command(name = "world264-relay")]
#[command(about = "Relays World Lotto 5-minute results to chat channels", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub run: RunArgs,

    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write whole-day digest files for the last days and exit.
    Backfill(BackfillArgs),
}

#[derive(Args, Debug)]
pub struct CommonArgs {
    /// Day document URL; `{date}` becomes YYYY-MM-DD.
    #[arg(long, env = "FEED_BASE_URL", default_value = DEFAULT_FEED_URL, global = true)]
    pub feed_url: String,

    /// Hours east of UTC of the feed's calendar day and time labels.
    #[arg(
        long,
        env = "UTC_OFFSET_HOURS",
        default_value_t = 7,
        allow_negative_numbers = true,
        global = true
    )]
    pub utc_offset: i32,

    /// Timeout of every HTTP request, in seconds.
    #[arg(long, env = "HTTP_TIMEOUT_SECONDS", default_value_t = 20, global = true)]
    pub http_timeout: u64,

    #[arg(long, env = "LOG_LEVEL", default_value = "info", global = true)]
    pub log_level: LevelFilter,

    /// Also append log lines to this file.
    #[arg(long, env = "LOG_FILE", global = true)]
    pub log_file: Option<PathBuf>,
}

impl CommonArgs {
    pub fn offset(&self) -> anyhow::Result<FixedOffset> {
        self.utc_offset
            .checked_mul(3600)
            .and_then(FixedOffset::east_opt)
            .with_context(|| format!("UTC offset {}h is out of range", self.utc_offset))
    }

    pub fn http_settings(&self) -> HttpSettings {
        HttpSettings {
            request_timeout: Duration::from_secs(self.http_timeout.max(1)),
            ..HttpSettings::default()
        }
    }

    pub fn feed_settings(&self) -> anyhow::Result<FeedSettings> {
        if !self.feed_url.contains("{date}") {
            bail!("feed URL must contain a {{date}} placeholder: {}", self.feed_url);
        }
        Ok(FeedSettings {
            url_template: self.feed_url.clone(),
            utc_offset: self.offset()?,
            http: self.http_settings(),
            ..FeedSettings::default()
        })
    }
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Seconds between polls (at least 5).
    #[arg(long, env = "POLL_SECONDS", default_value_t = 20)]
    pub poll: u64,

    /// Rounds shown per digest unless a channel overrides it.
    #[arg(long, env = "RETENTION", default_value_t = 40)]
    pub limit: usize,

    /// Publish the rounds already out when a day is first seen.
    #[arg(long, env = "FORCE_INITIAL")]
    pub force: bool,

    #[arg(long, env = "COMMIT_POLICY", value_enum, default_value_t = CommitArg::Attempted)]
    pub commit_policy: CommitArg,

    /// Retries after a channel answers "too many requests".
    #[arg(long, env = "RATE_LIMIT_RETRIES", default_value_t = 1)]
    pub max_retries: u32,

    /// Longest wait honoured for a single rate limit, in seconds.
    #[arg(long, env = "RATE_LIMIT_MAX_BACKOFF_SECONDS", default_value_t = 60)]
    pub max_backoff: u64,

    /// Keep a digest file per day in this directory.
    #[arg(long, env = "ARCHIVE_DIR")]
    pub archive_dir: Option<PathBuf>,

    #[command(flatten)]
    pub channels: ChannelArgs,
}

impl RunArgs {
    pub fn retention(&self) -> usize {
        self.limit.max(1)
    }

    pub fn poll_settings(&self) -> PollSettings {
        PollSettings::new(
            Duration::from_secs(self.poll),
            self.retention(),
            InitialPolicy::from_force_flag(self.force),
            self.commit_policy.into(),
        )
    }

    pub fn retry_settings(&self) -> RetrySettings {
        RetrySettings {
            max_retries: self.max_retries,
            max_backoff: Duration::from_secs(self.max_backoff),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CommitArg {
    /// Commit once every channel was tried.
    Attempted,
    /// Commit once any channel accepted the digest.
    Any,
    /// Commit only when all channels accepted the digest.
    All,
}

impl From<CommitArg> for CommitPolicy {
    fn from(arg: CommitArg) -> Self {
        match arg {
            CommitArg::Attempted => CommitPolicy::Attempted,
            CommitArg::Any => CommitPolicy::AnyAccepted,
            CommitArg::All => CommitPolicy::AllAccepted,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Edit,
    Append,
}

impl From<ModeArg> for DeliveryMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Edit => DeliveryMode::EditPreferred,
            ModeArg::Append => DeliveryMode::Append,
        }
    }
}

#[derive(Args, Debug)]
pub struct ChannelArgs {
    #[arg(long, env = "LINE_CHANNEL_ACCESS_TOKEN", hide_env_values = true)]
    pub line_token: Option<String>,

    /// LINE users, groups or rooms to push to, comma separated.
    #[arg(long, env = "LINE_GROUP_IDS", value_delimiter = ',')]
    pub line_group_ids: Vec<String>,

    #[arg(long, env = "LINE_RETENTION")]
    pub line_retention: Option<usize>,

    #[arg(long, env = "TELEGRAM_BOT_TOKEN", hide_env_values = true)]
    pub telegram_token: Option<String>,

    /// Telegram chats to post to, comma separated.
    /// Group and supergroup ids are negative.
    #[arg(
        long,
        env = "TELEGRAM_CHAT_IDS",
        value_delimiter = ',',
        allow_hyphen_values = true
    )]
    pub telegram_chat_ids: Vec<String>,

    #[arg(long, env = "TELEGRAM_RETENTION")]
    pub telegram_retention: Option<usize>,

    #[arg(long, env = "TELEGRAM_MODE", value_enum, default_value_t = ModeArg::Edit)]
    pub telegram_mode: ModeArg,

    #[arg(long, env = "DISCORD_WEBHOOK_URL", hide_env_values = true)]
    pub discord_webhook_url: Option<String>,

    #[arg(long, env = "DISCORD_RETENTION")]
    pub discord_retention: Option<usize>,

    #[arg(long, env = "DISCORD_MODE", value_enum, default_value_t = ModeArg::Edit)]
    pub discord_mode: ModeArg,
}

/// `None` for a missing or blank value.
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn destinations(ids: &[String]) -> Vec<&str> {
    ids.iter()
        .map(|id| id.trim())
        .filter(|id| !id.is_empty())
        .collect()
}

/// Wires up every channel whose credentials are present.
pub fn build_dispatcher(run: &RunArgs, http: &HttpSettings) -> anyhow::Result<Dispatcher> {
    let channels = &run.channels;
    let mut dispatcher = Dispatcher::new(run.retry_settings());
    let mut add = |client: Box<dyn ChannelClient>, retention: Option<usize>, mode: DeliveryMode| {
        dispatcher.add_channel(
            client,
            ChannelSpec::new(retention.unwrap_or(run.retention()), mode),
        );
    };

    let line_ids = destinations(&channels.line_group_ids);
    match (present(&channels.line_token), line_ids.is_empty()) {
        (Some(token), false) => {
            for id in line_ids {
                add(
                    Box::new(LineClient::new(http, token, id)?),
                    channels.line_retention,
                    DeliveryMode::Append,
                );
            }
        }
        (Some(_), true) => relay_warn!("LINE token set but LINE_GROUP_IDS is empty, LINE disabled"),
        (None, false) => relay_warn!("LINE_GROUP_IDS set without an access token, LINE disabled"),
        (None, true) => {}
    }

    let chat_ids = destinations(&channels.telegram_chat_ids);
    match (present(&channels.telegram_token), chat_ids.is_empty()) {
        (Some(token), false) => {
            for chat_id in chat_ids {
                add(
                    Box::new(TelegramClient::new(http, token, chat_id)?),
                    channels.telegram_retention,
                    channels.telegram_mode.into(),
                );
            }
        }
        (Some(_), true) => {
            relay_warn!("Telegram token set but TELEGRAM_CHAT_IDS is empty, Telegram disabled")
        }
        (None, false) => {
            relay_warn!("TELEGRAM_CHAT_IDS set without a bot token, Telegram disabled")
        }
        (None, true) => {}
    }

    if let Some(url) = present(&channels.discord_webhook_url) {
        add(
            Box::new(DiscordClient::new(http, url)?),
            channels.discord_retention,
            channels.discord_mode.into(),
        );
    }

    Ok(dispatcher)
}

#[derive(Args, Debug)]
pub struct BackfillArgs {
    /// Number of days, today included.
    #[arg(long, default_value_t = 7)]
    pub days: u32,

    #[arg(long, default_value = "./world264_texts")]
    pub out_dir: PathBuf,
}
