use chrono::NaiveDate;

use crate::{RoundNumber, Row};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Render `window` for every channel and deliver it.
    Publish {
        day: NaiveDate,
        window: Vec<Row>,
        new_rows: Vec<Row>,
        through_round: RoundNumber,
    },
}
