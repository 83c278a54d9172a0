use chrono::NaiveDate;

use crate::{RoundNumber, Row};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Rows fetched for `day`, the first day of today/yesterday that had data.
    RowsFetched { day: NaiveDate, rows: Vec<Row> },
    /// The digest up to `through_round` was handed to delivery and satisfied
    /// the commit policy.
    Delivered { through_round: RoundNumber },
    /// Delivery of the digest up to `through_round` did not satisfy the
    /// commit policy; the rounds stay pending for the next poll.
    DeliveryFailed { through_round: RoundNumber },
    /// Fallback for iterations that produced nothing.
    NoOp,
}
