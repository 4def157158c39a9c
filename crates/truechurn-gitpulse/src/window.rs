//! The `[after, before)` analysis window.

use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;
use truechurn_core::{ChurnError, Result};

/// A validated date window: `after` is always strictly before `before`.
///
/// Dates are interpreted as midnight UTC.
///
/// # Examples
///
/// ```
/// use truechurn_gitpulse::window::DateWindow;
///
/// let window = DateWindow::parse("2024", "2024-02").unwrap();
/// assert!(window.contains(1_704_067_200)); // 2024-01-01T00:00:00Z
/// assert!(!window.contains(1_706_745_600)); // 2024-02-01T00:00:00Z
///
/// assert!(DateWindow::parse("2024-02", "2024-01").is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateWindow {
    after: NaiveDate,
    before: NaiveDate,
}

impl DateWindow {
    /// Build a window from two dates.
    ///
    /// # Errors
    ///
    /// Returns [`ChurnError::InvalidDateRange`] unless `after < before`.
    pub fn new(after: NaiveDate, before: NaiveDate) -> Result<Self> {
        if after >= before {
            return Err(ChurnError::InvalidDateRange(format!(
                "after ({after}) must be before before ({before})"
            )));
        }
        Ok(Self { after, before })
    }

    /// Parse both bounds with [`parse_date`] and validate them.
    ///
    /// # Errors
    ///
    /// Returns [`ChurnError::InvalidDateRange`] for unparsable dates or an
    /// empty/inverted range.
    pub fn parse(after: &str, before: &str) -> Result<Self> {
        Self::new(parse_date(after)?, parse_date(before)?)
    }

    /// Inclusive lower bound.
    pub fn after(&self) -> NaiveDate {
        self.after
    }

    /// Exclusive upper bound.
    pub fn before(&self) -> NaiveDate {
        self.before
    }

    /// Whether a unix timestamp (seconds) falls inside the window.
    pub fn contains(&self, timestamp: i64) -> bool {
        timestamp >= midnight(self.after) && timestamp < midnight(self.before)
    }
}

impl fmt::Display for DateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} .. {}", self.after, self.before)
    }
}

fn midnight(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
        .unwrap_or_default()
}

/// Parse a `YYYY[-MM[-DD]]` date. Missing month or day default to 1.
///
/// # Errors
///
/// Returns [`ChurnError::InvalidDateRange`] if the text is not a valid date.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use truechurn_gitpulse::window::parse_date;
///
/// assert_eq!(parse_date("2019").unwrap(), NaiveDate::from_ymd_opt(2019, 1, 1).unwrap());
/// assert_eq!(parse_date("2019-06").unwrap(), NaiveDate::from_ymd_opt(2019, 6, 1).unwrap());
/// assert!(parse_date("2019-02-30").is_err());
/// ```
pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    let invalid = || ChurnError::InvalidDateRange(format!("invalid date '{raw}', expected YYYY[-MM[-DD]]"));

    let trimmed = raw.trim();
    let parts: Vec<&str> = trimmed.split('-').collect();
    if trimmed.is_empty() || parts.len() > 3 {
        return Err(invalid());
    }
    if parts
        .iter()
        .any(|p| p.is_empty() || !p.chars().all(|c| c.is_ascii_digit()))
    {
        return Err(invalid());
    }
    if parts[0].len() != 4 {
        return Err(invalid());
    }

    let year: i32 = parts[0].parse().map_err(|_| invalid())?;
    let month: u32 = match parts.get(1) {
        Some(m) => m.parse().map_err(|_| invalid())?,
        None => 1,
    };
    let day: u32 = match parts.get(2) {
        Some(d) => d.parse().map_err(|_| invalid())?,
        None => 1,
    };

    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid)
}
