use std::fmt;

use chrono::{Days, NaiveDate};

use crate::error::{HarvestError, Result};

pub const DAYS_PER_YEAR: u64 = 365;

/// Release-date interval for one discovery query. Both ends are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn len_days(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    /// Splits at `start + days`. `None` when that point is not strictly
    /// inside the window, since the halves would not shrink.
    pub fn split_after(&self, days: u64) -> Option<(DateWindow, DateWindow)> {
        let mid = self.start.checked_add_days(Days::new(days))?;
        if mid >= self.end {
            return None;
        }
        Some((
            DateWindow::new(self.start, mid),
            DateWindow::new(mid, self.end),
        ))
    }
}

impl fmt::Display for DateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.start, self.end)
    }
}

/// Walks backward from `today` in `chunk_years * 365` day steps until the
/// cutoff `years * 365` days ago is passed. Newest window first.
///
/// The oldest window is not clamped to the cutoff, so it can reach up to one
/// chunk further back than `years`.
pub fn generate_date_windows(
    today: NaiveDate,
    years: u32,
    chunk_years: u32,
) -> Result<Vec<DateWindow>> {
    if chunk_years == 0 {
        return Err(HarvestError::ZeroChunk);
    }

    let span = Days::new(u64::from(years) * DAYS_PER_YEAR);
    let chunk = Days::new(u64::from(chunk_years) * DAYS_PER_YEAR);
    let cutoff = today.checked_sub_days(span).unwrap_or(NaiveDate::MIN);

    let mut windows = Vec::new();
    let mut end = today;
    while end > cutoff {
        let start = end.checked_sub_days(chunk).unwrap_or(NaiveDate::MIN);
        windows.push(DateWindow::new(start, end));
        end = start;
    }
    Ok(windows)
}
