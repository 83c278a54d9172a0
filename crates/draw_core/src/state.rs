use crate::{RoundNumber, TrackerState};

/// What to do with the window found on the first observation of a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InitialPolicy {
    /// Commit the initial window without publishing, so a restart does not
    /// repeat a digest the channels already received.
    #[default]
    Baseline,
    /// Publish the initial window right away.
    Publish,
}

impl InitialPolicy {
    pub fn from_force_flag(force: bool) -> Self {
        if force {
            Self::Publish
        } else {
            Self::Baseline
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollState {
    tracker: TrackerState,
    initial_policy: InitialPolicy,
    /// Round of the digest handed out as an effect and not yet settled.
    pending_round: Option<RoundNumber>,
}

impl PollState {
    pub fn new(retention: usize, initial_policy: InitialPolicy) -> Self {
        Self {
            tracker: TrackerState::new(retention),
            initial_policy,
            pending_round: None,
        }
    }

    pub fn tracker(&self) -> &TrackerState {
        &self.tracker
    }

    pub fn initial_policy(&self) -> InitialPolicy {
        self.initial_policy
    }

    pub fn pending_round(&self) -> Option<RoundNumber> {
        self.pending_round
    }

    pub(crate) fn replace_tracker(&mut self, tracker: TrackerState) {
        self.tracker = tracker;
    }

    pub(crate) fn take_tracker(&mut self) -> TrackerState {
        let retention = self.tracker.retention();
        std::mem::replace(&mut self.tracker, TrackerState::new(retention))
    }

    pub(crate) fn set_pending(&mut self, round: Option<RoundNumber>) {
        self.pending_round = round;
    }
}
