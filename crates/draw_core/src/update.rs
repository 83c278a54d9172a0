use relay_logging::{relay_info, relay_warn};

use crate::{commit, observe, Effect, InitialPolicy, Msg, PollState};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: PollState, msg: Msg) -> (PollState, Vec<Effect>) {
    let effects = match msg {
        Msg::RowsFetched { day, rows } => {
            let (tracker, delta) = observe(state.take_tracker(), day, rows);
            state.replace_tracker(tracker);
            if delta.rolled_over {
                state.set_pending(None);
            }

            let Some(through_round) = delta.through_round() else {
                return (state, Vec::new());
            };

            if delta.initial && state.initial_policy() == InitialPolicy::Baseline {
                // The first window of a day only sets the starting point.
                let tracker = commit(state.take_tracker(), through_round);
                state.replace_tracker(tracker);
                relay_info!(
                    "Baseline day={} up to round={} ({} rows, not published)",
                    day,
                    through_round,
                    delta.window_snapshot.len()
                );
                return (state, Vec::new());
            }

            if !delta.has_delta {
                Vec::new()
            } else {
                state.set_pending(Some(through_round));
                vec![Effect::Publish {
                    day,
                    window: delta.window_snapshot,
                    new_rows: delta.new_rows,
                    through_round,
                }]
            }
        }
        Msg::Delivered { through_round } => {
            if state.pending_round() == Some(through_round) {
                let tracker = commit(state.take_tracker(), through_round);
                state.replace_tracker(tracker);
                state.set_pending(None);
                relay_info!("Committed up to round={}", through_round);
            } else {
                relay_warn!(
                    "Ignoring delivery of round={} (pending={:?})",
                    through_round,
                    state.pending_round()
                );
            }
            Vec::new()
        }
        Msg::DeliveryFailed { through_round } => {
            if state.pending_round() == Some(through_round) {
                state.set_pending(None);
            }
            relay_warn!(
                "Delivery up to round={} not committed, will retry on next poll",
                through_round
            );
            Vec::new()
        }
        Msg::NoOp => Vec::new(),
    };

    (state, effects)
}
