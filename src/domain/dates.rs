use chrono::NaiveDate;

/// Formats a calendar date as `YYYY-MM-DD` with zero-padded month and day.
pub fn local_date_string(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Once-per-day gate for marking a goal done.
///
/// A completion is allowed when nothing has been completed yet, or when the
/// last completion is strictly before today. A last completion equal to today
/// blocks (already marked), and a future-dated one blocks as well until the
/// calendar catches up. Both arguments are `YYYY-MM-DD` strings, so plain
/// string ordering is calendar ordering.
pub fn can_mark_done(today: &str, last_completed_date: Option<&str>) -> bool {
    match last_completed_date {
        None => true,
        Some(last) => last < today,
    }
}

/// Gate for undoing a completion: only the mark made today can be reverted,
/// so the last completion must equal today exactly.
pub fn can_undo_today(today: &str, last_completed_date: Option<&str>) -> bool {
    last_completed_date == Some(today)
}
