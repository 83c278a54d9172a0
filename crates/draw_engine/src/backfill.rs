use std::path::PathBuf;

use chrono::{Days, NaiveDate};
use draw_core::complete_rows;
use relay_logging::{relay_debug, relay_info, relay_warn};

use crate::{DigestArchive, PersistError, ResultSource};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BackfillReport {
    pub written: Vec<PathBuf>,
    /// Days without results or whose fetch failed.
    pub skipped: Vec<NaiveDate>,
}

/// Writes the whole-day digest of `today` and the `days - 1` days before it.
///
/// Days that cannot be fetched are skipped; only a failing write aborts.
pub async fn backfill(
    source: &dyn ResultSource,
    archive: &DigestArchive,
    today: NaiveDate,
    days: u32,
) -> Result<BackfillReport, PersistError> {
    let mut report = BackfillReport::default();
    for back in 0..days.max(1) {
        let Some(day) = today.checked_sub_days(Days::new(u64::from(back))) else {
            break;
        };
        let rows = match source.fetch(day).await {
            Ok(rows) => complete_rows(rows),
            Err(err) if err.is_unavailable() => {
                relay_debug!("No document for {}", day);
                Vec::new()
            }
            Err(err) => {
                relay_warn!("Skipping {}: {}", day, err);
                Vec::new()
            }
        };
        if rows.is_empty() {
            report.skipped.push(day);
            continue;
        }
        let path = archive.write_day(day, &rows)?;
        relay_info!("Wrote {} rounds for {} to {:?}", rows.len(), day, path);
        report.written.push(path);
    }
    Ok(report)
}
