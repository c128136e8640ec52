//! Submission period filtering

use crate::reader::Register;
use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;
use std::fmt;
use tracing::info;

/// Inclusive range of calendar days, from the start of `start` through the
/// last instant of `end`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Period {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Period {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Whether a timestamp falls inside the period.
    ///
    /// The end bound is exclusive midnight of the following day, so every
    /// instant of `end` (including fractional seconds) is covered.
    pub fn contains(&self, timestamp: NaiveDateTime) -> bool {
        if timestamp < self.start.and_time(NaiveTime::MIN) {
            return false;
        }
        match self.end.checked_add_days(Days::new(1)) {
            Some(next_day) => timestamp < next_day.and_time(NaiveTime::MIN),
            None => true,
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} to {}",
            self.start.format("%d/%m/%Y"),
            self.end.format("%d/%m/%Y")
        )
    }
}

/// Rows submitted within `period`, in file order. An empty result is a
/// valid outcome, not an error.
pub fn filter_period(register: &Register, period: Period) -> Register {
    let narrowed = register.narrow(|row| period.contains(row.submission_date));
    info!(
        period = %period,
        total = register.len(),
        matched = narrowed.len(),
        "filtered register by period"
    );
    narrowed
}

/// Suggested default range `[latest - lookback_days, latest]`, by date.
///
/// `None` when the register is empty.
pub fn suggested_period(register: &Register, lookback_days: u32) -> Option<Period> {
    let latest = register.latest_submission()?.date();
    let start = latest
        .checked_sub_days(Days::new(u64::from(lookback_days)))
        .unwrap_or(NaiveDate::MIN);
    Some(Period::new(start, latest))
}
