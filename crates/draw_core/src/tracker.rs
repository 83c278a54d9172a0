use std::collections::BTreeMap;

use chrono::NaiveDate;
use relay_logging::relay_debug;

use crate::{RoundNumber, Row};

/// Rounds retained for the current day. Owned by the poll loop and threaded
/// through [`observe`] and [`commit`] by value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerState {
    retention: usize,
    tracked_day: Option<NaiveDate>,
    /// Ascending by round number, unique, at most `retention` long.
    window: Vec<Row>,
    last_published_round: RoundNumber,
}

impl TrackerState {
    /// `retention` is clamped to at least one row.
    pub fn new(retention: usize) -> Self {
        Self {
            retention: retention.max(1),
            tracked_day: None,
            window: Vec::new(),
            last_published_round: 0,
        }
    }

    pub fn retention(&self) -> usize {
        self.retention
    }

    pub fn tracked_day(&self) -> Option<NaiveDate> {
        self.tracked_day
    }

    pub fn window(&self) -> &[Row] {
        &self.window
    }

    pub fn last_published_round(&self) -> RoundNumber {
        self.last_published_round
    }

    /// Highest round currently in the window.
    pub fn latest_round(&self) -> Option<RoundNumber> {
        self.window.last().map(|row| row.round_number)
    }

    fn reset_for(&mut self, day: NaiveDate) {
        self.tracked_day = Some(day);
        self.window.clear();
        self.last_published_round = 0;
    }
}

/// Outcome of folding one fetch into the tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeltaResult {
    pub window_snapshot: Vec<Row>,
    /// Window rows above the last published round, ascending.
    pub new_rows: Vec<Row>,
    pub has_delta: bool,
    /// Nothing has been published for the tracked day yet.
    pub initial: bool,
    /// The observation switched to a different day and cleared the window.
    pub rolled_over: bool,
}

impl DeltaResult {
    /// Highest round in the window, the value to commit after publishing.
    pub fn through_round(&self) -> Option<RoundNumber> {
        self.window_snapshot.last().map(|row| row.round_number)
    }
}

/// Folds the rows fetched for `day` into the tracked window.
///
/// A day different from the tracked one clears all state first; this is the
/// only way state is ever cleared. Incomplete rows and rounds already in the
/// window are dropped, the rest are merged and the window is cut back to the
/// most recent `retention` rounds.
pub fn observe(
    mut state: TrackerState,
    day: NaiveDate,
    candidate_rows: impl IntoIterator<Item = Row>,
) -> (TrackerState, DeltaResult) {
    let rolled_over = state.tracked_day != Some(day);
    if rolled_over {
        if let Some(previous) = state.tracked_day {
            relay_debug!("Day changed {} -> {}, tracker reset", previous, day);
        }
        state.reset_for(day);
    }

    let mut merged: BTreeMap<RoundNumber, Row> = state
        .window
        .drain(..)
        .map(|row| (row.round_number, row))
        .collect();
    let mut added = 0usize;
    for row in candidate_rows.into_iter().filter(Row::is_complete) {
        if let std::collections::btree_map::Entry::Vacant(slot) = merged.entry(row.round_number) {
            slot.insert(row);
            added += 1;
        }
    }

    let skip = merged.len().saturating_sub(state.retention);
    state.window = merged.into_values().skip(skip).collect();

    let new_rows: Vec<Row> = state
        .window
        .iter()
        .filter(|row| row.round_number > state.last_published_round)
        .cloned()
        .collect();
    relay_debug!(
        "Observed day={} added={} window={} new={}",
        day,
        added,
        state.window.len(),
        new_rows.len()
    );

    let delta = DeltaResult {
        window_snapshot: state.window.clone(),
        has_delta: !new_rows.is_empty(),
        new_rows,
        initial: state.last_published_round == 0,
        rolled_over,
    };
    (state, delta)
}

/// Records that everything up to `round_number` has been handed to delivery.
/// Never moves backwards.
pub fn commit(mut state: TrackerState, round_number: RoundNumber) -> TrackerState {
    state.last_published_round = state.last_published_round.max(round_number);
    state
}
