use chrono::{DateTime, Datelike, NaiveDate, Utc};

use crate::error::{Result, StatsError};

// Time window: inclusive start date, "now" as the open upper bound.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
  pub since: NaiveDate,
  pub now: DateTime<Utc>,
}

impl Window {
  pub fn new(since: NaiveDate, now: DateTime<Utc>) -> Self {
    Self { since, now }
  }

  /// Midnight UTC of the start date.
  pub fn since_instant(&self) -> DateTime<Utc> {
    start_of_day(self.since)
  }

  /// Whole days covered by the window, at least 1 (for "edited:N" style queries).
  pub fn days(&self) -> i64 {
    let secs = (self.now - self.since_instant()).num_seconds().max(0);
    ((secs + 86_399) / 86_400).max(1)
  }
}

pub fn start_of_day(d: NaiveDate) -> DateTime<Utc> {
  d.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc()
}

/// March 1st of this year, or of last year while today precedes March 1st.
pub fn default_start_date(today: NaiveDate) -> NaiveDate {
  let year = if today.month() < 3 { today.year() - 1 } else { today.year() };
  NaiveDate::from_ymd_opt(year, 3, 1).unwrap_or(today)
}

/// Parse `--start-date` (`YYYY-MM-DD`; a full RFC 3339 timestamp is cut to its date).
pub fn parse_start_date(raw: &str) -> Result<NaiveDate> {
  let trimmed = raw.trim();

  if let Ok(d) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
    return Ok(d);
  }

  DateTime::parse_from_rfc3339(trimmed)
    .map(|dt| dt.with_timezone(&Utc).date_naive())
    .map_err(|_| StatsError::config(format!("invalid --start-date '{raw}', expected YYYY-MM-DD")))
}

/// Parse a `--now-override` string into a UTC DateTime.
/// Accepts RFC3339 (e.g. 2025-08-15T12:00:00Z) or a naive UTC timestamp
/// formatted as `%Y-%m-%dT%H:%M:%S`.
pub fn parse_now_override(s: Option<&str>) -> Option<DateTime<Utc>> {
  s.and_then(|raw| {
    DateTime::parse_from_rfc3339(raw)
      .ok()
      .map(|dt| dt.with_timezone(&Utc))
      .or_else(|| {
        chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
          .ok()
          .map(|ndt| ndt.and_utc())
      })
  })
}
