//! Query parameters of the analytics endpoints and their validation.

use crate::{
    api::error::ApiError,
    core::{
        analytics::{DEFAULT_PERIOD_MONTHS, MonthFilter},
        period::DateWindow,
        summary::ExportFormat,
    },
};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Earliest year accepted by `/analytics/spending`.
pub const MIN_YEAR: i32 = 2000;

/// Longest window, in months, of the general analytics endpoints.
pub const MAX_PERIOD_MONTHS: u32 = 60;

/// Longest window, in months, of `/analytics/insights`.
pub const MAX_INSIGHT_MONTHS: u32 = 24;

/// `/analytics/spending` parameters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SpendingParams {
    /// Only include this year
    pub year: Option<i32>,
    /// Only include this month
    pub month: Option<u32>,
}

impl SpendingParams {
    /// Validates the calendar filter against `now`.
    ///
    /// # Errors
    /// Rejects years outside `2000..=now.year() + 1` and months outside `1..=12`.
    pub fn month_filter(&self, now: DateTime<Utc>) -> Result<MonthFilter, ApiError> {
        let years = MIN_YEAR..=now.year() + 1;
        if self.year.is_some_and(|year| !years.contains(&year)) {
            return Err(ApiError::BadRequest("Invalid year provided".to_string()));
        }

        if self.month.is_some_and(|month| !(1..=12).contains(&month)) {
            return Err(ApiError::BadRequest(
                "Invalid month provided (must be 1-12)".to_string(),
            ));
        }

        Ok(MonthFilter {
            year: self.year,
            month: self.month,
        })
    }
}

/// `/analytics/categories` and `/analytics/stores` parameters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BreakdownParams {
    /// Window length used when no dates are given
    pub period_months: Option<u32>,
    /// Inclusive lower bound
    pub start_date: Option<String>,
    /// Inclusive upper bound
    pub end_date: Option<String>,
}

/// Effective window echoed back to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WindowFilters {
    /// Lower bound, if any
    pub start_date: Option<DateTime<Utc>>,
    /// Upper bound, if any
    pub end_date: Option<DateTime<Utc>>,
    /// Requested window length
    pub period_months: u32,
}

impl BreakdownParams {
    /// Resolves the analysis window.
    ///
    /// Explicit dates win over `period_months`. When only one date is given
    /// the other side stays open; when neither is, the window is the
    /// `period_months` calendar months ending at `now`.
    ///
    /// # Errors
    /// Rejects an out-of-range period, unparseable dates, and a start after the end.
    pub fn window(&self, now: DateTime<Utc>) -> Result<(DateWindow, WindowFilters), ApiError> {
        let period_months =
            validate_period(self.period_months, DEFAULT_PERIOD_MONTHS, MAX_PERIOD_MONTHS)?;
        let start = self
            .start_date
            .as_deref()
            .map(|raw| parse_date_param("start_date", raw, false))
            .transpose()?;
        let end = self
            .end_date
            .as_deref()
            .map(|raw| parse_date_param("end_date", raw, true))
            .transpose()?;

        let window = match (start, end) {
            (None, None) => DateWindow::trailing_months(now, period_months)
                .map_err(|e| ApiError::from_core("resolve analysis window", e))?,
            (Some(start), Some(end)) if start > end => {
                return Err(ApiError::BadRequest(
                    "Start date must be before end date".to_string(),
                ));
            }
            (start, end) => DateWindow { start, end },
        };

        let filters = WindowFilters {
            start_date: window.start,
            end_date: window.end,
            period_months,
        };
        Ok((window, filters))
    }
}

/// Parameters of endpoints that only take a window length.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PeriodParams {
    /// Window length in months
    pub period_months: Option<u32>,
}

/// Window length echoed back to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PeriodFilters {
    /// Validated window length
    pub period_months: u32,
}

/// `/analytics/export` parameters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExportParams {
    /// `json` (default) or `csv`, case-insensitive
    pub format: Option<String>,
    /// Window length in months
    pub period_months: Option<u32>,
}

impl ExportParams {
    /// Validated format and window length.
    ///
    /// # Errors
    /// Rejects unknown formats and out-of-range periods.
    pub fn resolve(&self) -> Result<(ExportFormat, u32), ApiError> {
        let format = match self.format.as_deref() {
            None => ExportFormat::default(),
            Some(raw) => raw
                .parse::<ExportFormat>()
                .map_err(|e| ApiError::from_core("parse export format", e))?,
        };
        let period_months =
            validate_period(self.period_months, DEFAULT_PERIOD_MONTHS, MAX_PERIOD_MONTHS)?;
        Ok((format, period_months))
    }
}

/// Applies `default` and checks the result lies in `1..=max`.
///
/// # Errors
/// Returns a bad request naming the accepted range.
pub fn validate_period(requested: Option<u32>, default: u32, max: u32) -> Result<u32, ApiError> {
    let months = requested.unwrap_or(default);
    if (1..=max).contains(&months) {
        Ok(months)
    } else {
        Err(ApiError::BadRequest(format!(
            "Period months must be between 1 and {max}"
        )))
    }
}

/// Parses an ISO 8601 date parameter.
///
/// Accepts RFC 3339 timestamps, naive `YYYY-MM-DDTHH:MM:SS[.fff]` taken as
/// UTC, and plain `YYYY-MM-DD`. A plain date means the start of the day, or
/// its last instant when `end_of_day` is set.
///
/// # Errors
/// Returns a bad request naming `name` when no format matches.
pub fn parse_date_param(
    name: &str,
    raw: &str,
    end_of_day: bool,
) -> Result<DateTime<Utc>, ApiError> {
    let raw = raw.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(Utc.from_utc_datetime(&naive));
    }

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        let time = if end_of_day {
            NaiveTime::from_hms_nano_opt(23, 59, 59, 999_999_999)
        } else {
            Some(NaiveTime::MIN)
        };
        if let Some(time) = time {
            return Ok(Utc.from_utc_datetime(&date.and_time(time)));
        }
    }

    Err(ApiError::BadRequest(format!(
        "Invalid {name} format. Use ISO format (YYYY-MM-DD)"
    )))
}
