//! Draw core: pure round tracking state machine and digest rendering.
mod effect;
mod format;
mod msg;
mod row;
mod state;
mod tracker;
mod update;

pub use effect::Effect;
pub use format::{
    block_of, format_digest, format_digest_within, tail, truncate_chars, DigestStyle, BLOCK_SIZE,
};
pub use msg::Msg;
pub use row::{complete_rows, normalize_digits, RoundNumber, Row, PRIMARY_WIDTH, SECONDARY_WIDTH};
pub use state::{InitialPolicy, PollState};
pub use tracker::{commit, observe, DeltaResult, TrackerState};
pub use update::update;
