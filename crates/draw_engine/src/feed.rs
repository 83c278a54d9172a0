use chrono::{DateTime, FixedOffset, NaiveDateTime};
use draw_core::{RoundNumber, Row};
use serde_json::{Map, Value};

use crate::{FeedError, FeedFailure};

/// Group key of the watched game when no group matches by shape.
pub const WATCHED_GROUP_KEY: &str = "0122";

const WATCHED_TYPE: &str = "01";
const WATCHED_SUBTYPE: &str = "22";
/// The five-minute game has 288 rounds a day; smaller groups are other games.
const MIN_WATCHED_ROUNDS: usize = 200;

/// Parses one day document into rows of the watched game, ascending by round.
///
/// Rows with missing results are kept (incomplete); rows without a positive
/// round number are dropped. A document without the watched game counts as
/// unavailable, a document that is not a JSON object as invalid.
pub fn parse_day_feed(bytes: &[u8], offset: FixedOffset) -> Result<Vec<Row>, FeedError> {
    let document: Value = serde_json::from_slice(bytes)
        .map_err(|err| FeedError::new(FeedFailure::ParseInvalid, err.to_string()))?;
    let groups = document
        .as_object()
        .ok_or_else(|| FeedError::new(FeedFailure::ParseInvalid, "document is not an object"))?;

    let key = pick_watched_group(groups)
        .ok_or_else(|| FeedError::new(FeedFailure::Unavailable, "watched game not in document"))?;
    let rounds = match groups.get(key) {
        Some(Value::Object(rounds)) => rounds,
        Some(Value::Null) | None => return Ok(Vec::new()),
        Some(_) => {
            return Err(FeedError::new(
                FeedFailure::ParseInvalid,
                format!("group {key} is not an object"),
            ))
        }
    };

    let mut rows: Vec<Row> = rounds
        .values()
        .filter_map(|record| parse_record(record, offset))
        .collect();
    rows.sort_by_key(|row| row.round_number);
    rows.dedup_by_key(|row| row.round_number);
    Ok(rows)
}

fn pick_watched_group(groups: &Map<String, Value>) -> Option<&str> {
    let by_shape = groups.iter().find_map(|(key, rounds)| {
        let rounds = rounds.as_object().filter(|rounds| !rounds.is_empty())?;
        let sample = rounds.values().next()?;
        let matches = sample.get("lotto_type").and_then(Value::as_str) == Some(WATCHED_TYPE)
            && sample.get("lotto_subtype").and_then(Value::as_str) == Some(WATCHED_SUBTYPE)
            && rounds.len() >= MIN_WATCHED_ROUNDS;
        matches.then_some(key.as_str())
    });
    by_shape.or_else(|| {
        groups
            .contains_key(WATCHED_GROUP_KEY)
            .then_some(WATCHED_GROUP_KEY)
    })
}

fn parse_record(record: &Value, offset: FixedOffset) -> Option<Row> {
    let round_number = record.get("round_number").and_then(round_number_of)?;
    let label = record
        .get("end_at")
        .and_then(Value::as_str)
        .and_then(|end_at| time_label(end_at, offset))
        .unwrap_or_default();
    let result = record.get("result");
    let primary = result.and_then(|r| r.get("top_three")).and_then(text_of);
    let secondary = result.and_then(|r| r.get("bottom_two")).and_then(text_of);
    Some(Row::normalized(
        round_number,
        label,
        primary.as_deref(),
        secondary.as_deref(),
    ))
}

fn round_number_of(value: &Value) -> Option<RoundNumber> {
    let parsed = match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }?;
    RoundNumber::try_from(parsed).ok().filter(|rn| *rn > 0)
}

fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// `HH:MM` of `end_at` in the feed's time zone. Timestamps without an offset
/// are taken as already local.
fn time_label(end_at: &str, offset: FixedOffset) -> Option<String> {
    let end_at = end_at.trim();
    let aware = DateTime::parse_from_rfc3339(end_at)
        .or_else(|_| DateTime::parse_from_str(end_at, "%Y-%m-%d %H:%M:%S%.f%:z"));
    if let Ok(at) = aware {
        return Some(at.with_timezone(&offset).format("%H:%M").to_string());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(end_at, fmt).ok())
        .map(|at| at.format("%H:%M").to_string())
}
