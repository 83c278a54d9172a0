pub type RoundNumber = u32;

/// Width of the three-digit primary result.
pub const PRIMARY_WIDTH: usize = 3;
/// Width of the two-digit secondary result.
pub const SECONDARY_WIDTH: usize = 2;

/// One result round as reported by the feed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Row {
    pub round_number: RoundNumber,
    /// Draw close time, `HH:MM` in the feed's time zone. May be empty.
    pub timestamp_label: String,
    pub primary_value: String,
    pub secondary_value: String,
}

impl Row {
    /// Builds a row from raw feed values, trimming and zero-padding both
    /// results to their fixed width. Missing or blank values stay empty.
    pub fn normalized(
        round_number: RoundNumber,
        timestamp_label: impl Into<String>,
        primary: Option<&str>,
        secondary: Option<&str>,
    ) -> Self {
        Self {
            round_number,
            timestamp_label: timestamp_label.into(),
            primary_value: primary
                .and_then(|raw| normalize_digits(raw, PRIMARY_WIDTH))
                .unwrap_or_default(),
            secondary_value: secondary
                .and_then(|raw| normalize_digits(raw, SECONDARY_WIDTH))
                .unwrap_or_default(),
        }
    }

    /// A row may only be published once both results are known.
    pub fn is_complete(&self) -> bool {
        self.round_number > 0 && !self.primary_value.is_empty() && !self.secondary_value.is_empty()
    }

    /// `"ppp - ss"`, the combined value shown in digest footers.
    pub fn combined_value(&self) -> String {
        format!("{} - {}", self.primary_value, self.secondary_value)
    }
}

/// Trims `raw` and left-pads it with zeros to `width`. Blank input yields `None`.
pub fn normalize_digits(raw: &str, width: usize) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(format!("{trimmed:0>width$}"))
}

/// Keeps only complete rows, preserving input order.
pub fn complete_rows(rows: impl IntoIterator<Item = Row>) -> Vec<Row> {
    rows.into_iter().filter(Row::is_complete).collect()
}
