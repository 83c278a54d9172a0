use crate::{RoundNumber, Row};

/// Rounds per visual block.
pub const BLOCK_SIZE: RoundNumber = 4;

/// Block a round belongs to. Anchored to the absolute round number, so a
/// round lands in the same block whichever slice of the day is rendered.
pub fn block_of(round_number: RoundNumber) -> RoundNumber {
    round_number.saturating_sub(1) / BLOCK_SIZE
}

/// Text decoration of a digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestStyle {
    /// Extra lines printed before the title, e.g. the day-file heading.
    pub preamble: Vec<String>,
    pub title: String,
    pub separator: String,
    /// Label in front of the latest round number in the footer. `None` omits
    /// the footer entirely.
    pub footer_label: Option<String>,
}

impl DigestStyle {
    /// The live digest pushed to chat channels.
    pub fn live() -> Self {
        Self {
            preamble: Vec::new(),
            title: "🟢World Lotto 5นาที🟢".to_string(),
            separator: "➖➖➖➖➖➖➖".to_string(),
            footer_label: Some("264world รอบที่".to_string()),
        }
    }

    /// The whole-day digest written by the archive and the backfill.
    pub fn day_file() -> Self {
        let live = Self::live();
        Self {
            preamble: vec!["เวิลลอตโต้5นาที".to_string(), live.separator.clone()],
            ..live
        }
    }

    pub fn without_footer(self) -> Self {
        Self {
            footer_label: None,
            ..self
        }
    }
}

impl Default for DigestStyle {
    fn default() -> Self {
        Self::live()
    }
}

/// Renders rows as a digest. Rows are re-sorted by round number; a separator
/// opens every block and closes the last one.
pub fn format_digest(rows: &[Row], style: &DigestStyle) -> String {
    let mut sorted: Vec<&Row> = rows.iter().collect();
    sorted.sort_by_key(|row| row.round_number);
    sorted.dedup_by_key(|row| row.round_number);

    let mut lines: Vec<String> = style.preamble.clone();
    lines.push(style.title.clone());

    let mut current_block = None;
    for row in &sorted {
        let block = block_of(row.round_number);
        if current_block != Some(block) {
            lines.push(style.separator.clone());
            current_block = Some(block);
        }
        lines.push(format!(
            "{:>3}: {} ➡️ {}",
            row.round_number,
            row.timestamp_label,
            row.combined_value()
        ));
    }
    lines.push(style.separator.clone());

    if let (Some(label), Some(latest)) = (style.footer_label.as_deref(), sorted.last()) {
        lines.push(style.title.clone());
        lines.push(format!("      {label} {}      ", latest.round_number));
        lines.push(format!("            {} ", latest.combined_value()));
        lines.push(style.separator.clone());
    }

    lines.join("\n")
}

/// Renders the newest rows that fit in `max_chars`, dropping the oldest ones
/// first. Only a digest of a single row that is still too long gets cut.
pub fn format_digest_within(rows: &[Row], style: &DigestStyle, max_chars: usize) -> String {
    let mut sorted: Vec<Row> = rows.to_vec();
    sorted.sort_by_key(|row| row.round_number);
    sorted.dedup_by_key(|row| row.round_number);

    let mut count = sorted.len();
    loop {
        let text = format_digest(tail(&sorted, count), style);
        if count <= 1 || text.chars().count() <= max_chars {
            return truncate_chars(&text, max_chars).to_string();
        }
        count -= 1;
    }
}

/// The most recent `count` rows of an ascending slice.
pub fn tail(rows: &[Row], count: usize) -> &[Row] {
    &rows[rows.len().saturating_sub(count)..]
}

/// Cuts `text` to at most `max_chars` characters, never inside a character.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}
