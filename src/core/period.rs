//! Calendar helpers shared by the analytics aggregators.
//!
//! Analytics buckets purchases by calendar month and filters them by
//! inclusive datetime windows. Windows derived from a month count always
//! span whole calendar months ending at "now" rather than approximating a
//! month as thirty days.

use crate::errors::{Error, Result};
use chrono::{DateTime, Datelike, Month, Months, NaiveDate, TimeDelta, TimeZone, Utc};
use serde::Serialize;

/// Inclusive datetime window. A missing bound is open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateWindow {
    /// Earliest instant included
    pub start: Option<DateTime<Utc>>,
    /// Latest instant included
    pub end: Option<DateTime<Utc>>,
}

impl DateWindow {
    /// Window with no bounds.
    #[must_use]
    pub const fn unbounded() -> Self {
        Self {
            start: None,
            end: None,
        }
    }

    /// Window between two instants, both included.
    #[must_use]
    pub const fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    /// Window covering exactly `months` calendar months ending at `end`.
    ///
    /// # Errors
    /// Returns an error if the start would fall outside chrono's date range.
    pub fn trailing_months(end: DateTime<Utc>, months: u32) -> Result<Self> {
        let start = end
            .checked_sub_months(Months::new(months))
            .ok_or_else(|| Error::InvalidInput {
                message: format!("cannot go back {months} months from {end}"),
            })?;
        Ok(Self::between(start, end))
    }

    /// Whether `instant` lies within the window.
    #[must_use]
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start.is_none_or(|start| instant >= start) && self.end.is_none_or(|end| instant <= end)
    }
}

/// A calendar month. Orders by year, then month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct MonthKey {
    /// Calendar year
    pub year: i32,
    /// Month number, 1-12
    pub month: u32,
}

impl MonthKey {
    /// Month containing `instant`.
    #[must_use]
    pub fn of(instant: DateTime<Utc>) -> Self {
        Self {
            year: instant.year(),
            month: instant.month(),
        }
    }

    /// English month name, e.g. `"January"`.
    #[must_use]
    pub fn name(self) -> &'static str {
        month_name(self.month)
    }

    /// Long label, e.g. `"January 2024"`.
    #[must_use]
    pub fn label(self) -> String {
        format!("{} {}", self.name(), self.year)
    }

    /// Short label, e.g. `"Jan 2024"`.
    #[must_use]
    pub fn short_label(self) -> String {
        let name = self.name();
        format!("{} {}", name.get(..3).unwrap_or(name), self.year)
    }
}

/// English name of a month number; empty for numbers outside 1-12.
#[must_use]
pub fn month_name(month: u32) -> &'static str {
    u8::try_from(month)
        .ok()
        .and_then(|m| Month::try_from(m).ok())
        .map_or("", |m| m.name())
}

/// First instant of the calendar month containing `instant`.
#[must_use]
pub fn month_start(instant: DateTime<Utc>) -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(instant.year(), instant.month(), 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map_or(instant, |naive| Utc.from_utc_datetime(&naive))
}

/// Window from the start of the current month up to `now`.
#[must_use]
pub fn current_month_window(now: DateTime<Utc>) -> DateWindow {
    DateWindow::between(month_start(now), now)
}

/// Window covering the whole calendar month before the one containing `now`.
#[must_use]
pub fn previous_month_window(now: DateTime<Utc>) -> DateWindow {
    let this_month = month_start(now);
    let last_month = this_month
        .checked_sub_months(Months::new(1))
        .unwrap_or(this_month);
    DateWindow::between(last_month, this_month - TimeDelta::nanoseconds(1))
}

/// Rounds a monetary value or percentage to two decimal places.
#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
