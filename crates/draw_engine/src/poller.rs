use std::time::Duration;

use chrono::NaiveDate;
use draw_core::{update, Effect, InitialPolicy, Msg, PollState, RoundNumber};
use relay_logging::{relay_debug, relay_error, relay_info};

use crate::source::fetch_with_fallback;
use crate::{
    BroadcastReport, Clock, CommitPolicy, DigestArchive, Dispatcher, FeedError, PersistError,
    ResultSource,
};

/// Polling faster than this only burdens the feed.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    /// Rows kept by the tracker when no channel asks for more.
    pub retention: usize,
    pub initial_policy: InitialPolicy,
    pub commit_policy: CommitPolicy,
}

impl PollSettings {
    /// Clamps the interval to [`MIN_POLL_INTERVAL`] and retention to one row.
    pub fn new(
        interval: Duration,
        retention: usize,
        initial_policy: InitialPolicy,
        commit_policy: CommitPolicy,
    ) -> Self {
        Self {
            interval: interval.max(MIN_POLL_INTERVAL),
            retention: retention.max(1),
            initial_policy,
            commit_policy,
        }
    }
}

impl Default for PollSettings {
    fn default() -> Self {
        Self::new(
            Duration::from_secs(20),
            40,
            InitialPolicy::default(),
            CommitPolicy::default(),
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PollError {
    #[error("feed: {0}")]
    Feed(#[from] FeedError),
    #[error("archive: {0}")]
    Archive(#[from] PersistError),
}

/// What one iteration did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IterationOutcome {
    /// Neither today nor yesterday has results yet.
    NoData,
    /// Results were tracked but nothing new was published.
    Idle {
        day: NaiveDate,
        latest_round: Option<RoundNumber>,
    },
    Published {
        day: NaiveDate,
        through_round: RoundNumber,
        new_rounds: usize,
        report: BroadcastReport,
        committed: bool,
    },
}

/// The long-running fetch, track, publish and sleep cycle.
pub struct Poller {
    source: Box<dyn ResultSource>,
    clock: Box<dyn Clock>,
    dispatcher: Dispatcher,
    archive: Option<DigestArchive>,
    settings: PollSettings,
    state: PollState,
    iteration: u64,
}

impl Poller {
    pub fn new(
        source: Box<dyn ResultSource>,
        clock: Box<dyn Clock>,
        dispatcher: Dispatcher,
        settings: PollSettings,
    ) -> Self {
        let retention = dispatcher
            .max_retention()
            .map_or(settings.retention, |widest| widest.max(settings.retention));
        Self {
            source,
            clock,
            dispatcher,
            archive: None,
            settings,
            state: PollState::new(retention, settings.initial_policy),
            iteration: 0,
        }
    }

    pub fn with_archive(mut self, archive: DigestArchive) -> Self {
        self.archive = Some(archive);
        self
    }

    pub fn state(&self) -> &PollState {
        &self.state
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Polls forever. Errors end the iteration, never the loop.
    pub async fn run(mut self) {
        relay_info!(
            "Polling every {}s, retention={}, {} channel(s), initial={:?}, commit={:?}",
            self.settings.interval.as_secs(),
            self.state.tracker().retention(),
            self.dispatcher.len(),
            self.settings.initial_policy,
            self.settings.commit_policy
        );
        loop {
            self.iteration += 1;
            relay_logging::set_poll_iteration(self.iteration);
            match self.poll_once().await {
                Ok(outcome) => relay_debug!("Iteration done: {:?}", outcome),
                Err(err) => relay_error!("Iteration failed: {}", err),
            }
            tokio::time::sleep(self.settings.interval).await;
        }
    }

    /// One fetch, track and publish step. State is only touched through
    /// [`update`], so an error part way leaves it consistent.
    pub async fn poll_once(&mut self) -> Result<IterationOutcome, PollError> {
        let today = self.clock.today();
        let Some((day, rows)) = fetch_with_fallback(self.source.as_ref(), today).await? else {
            relay_debug!("No results for {} or the day before", today);
            return Ok(IterationOutcome::NoData);
        };
        let day_rows = self.archive.as_ref().map(|_| rows.clone());

        let effects = self.apply(Msg::RowsFetched { day, rows });
        let mut outcome = IterationOutcome::Idle {
            day,
            latest_round: self.state.tracker().latest_round(),
        };

        for effect in effects {
            match effect {
                Effect::Publish {
                    day,
                    window,
                    new_rows,
                    through_round,
                } => {
                    relay_info!(
                        "Publishing day={} new={} up to round={}",
                        day,
                        new_rows.len(),
                        through_round
                    );
                    let report = self.dispatcher.broadcast(&window).await;
                    let committed = self.settings.commit_policy.allows_commit(&report);
                    let settle = if committed {
                        Msg::Delivered { through_round }
                    } else {
                        Msg::DeliveryFailed { through_round }
                    };
                    self.apply(settle);

                    if let (Some(archive), Some(day_rows)) = (&self.archive, &day_rows) {
                        let path = archive.write_day(day, day_rows)?;
                        relay_debug!("Archived digest to {:?}", path);
                    }

                    outcome = IterationOutcome::Published {
                        day,
                        through_round,
                        new_rounds: new_rows.len(),
                        report,
                        committed,
                    };
                }
            }
        }
        Ok(outcome)
    }

    fn apply(&mut self, msg: Msg) -> Vec<Effect> {
        let placeholder = PollState::new(1, self.settings.initial_policy);
        let state = std::mem::replace(&mut self.state, placeholder);
        let (state, effects) = update(state, msg);
        self.state = state;
        effects
    }
}
