//! Calendar-month keys ("YYYY-MM") and their UTC instant ranges.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

static PERIOD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})-(\d{2})$").expect("period pattern compiles"));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PeriodError {
    #[error("periodo inválido '{0}': se espera el formato YYYY-MM")]
    Malformed(String),
    #[error("periodo inválido '{0}': el mes debe estar entre 01 y 12")]
    MonthOutOfRange(String),
}

/// A validated month. `start` is inclusive and `end` exclusive, both at
/// midnight UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    year: i32,
    month: u32,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl Period {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        let start = month_start(year, month)?;
        let end = if month == 12 {
            month_start(year + 1, 1)?
        } else {
            month_start(year, month + 1)?
        };
        Some(Self {
            year,
            month,
            start,
            end,
        })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Whether `instant` falls in `[start, end)`.
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant < self.end
    }
}

fn month_start(year: i32, month: u32) -> Option<DateTime<Utc>> {
    NaiveDate::from_ymd_opt(year, month, 1)?
        .and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc())
}

impl FromStr for Period {
    type Err = PeriodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = PERIOD_RE
            .captures(s)
            .ok_or_else(|| PeriodError::Malformed(s.to_string()))?;
        let year: i32 = caps[1]
            .parse()
            .map_err(|_| PeriodError::Malformed(s.to_string()))?;
        let month: u32 = caps[2]
            .parse()
            .map_err(|_| PeriodError::Malformed(s.to_string()))?;
        if !(1..=12).contains(&month) {
            return Err(PeriodError::MonthOutOfRange(s.to_string()));
        }
        Period::new(year, month).ok_or_else(|| PeriodError::Malformed(s.to_string()))
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_month_into_utc_half_open_range() {
        let p: Period = "2025-09".parse().unwrap();
        assert_eq!(p, Period::new(2025, 9).unwrap());
        assert_eq!(p.start(), Utc.with_ymd_and_hms(2025, 9, 1, 0, 0, 0).unwrap());
        assert_eq!(p.end(), Utc.with_ymd_and_hms(2025, 10, 1, 0, 0, 0).unwrap());
        assert_eq!(p.to_string(), "2025-09");
    }

    #[test]
    fn december_rolls_into_next_year() {
        let p: Period = "2024-12".parse().unwrap();
        assert_eq!(p.end(), Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn range_excludes_next_month_midnight() {
        let p: Period = "2025-02".parse().unwrap();
        assert!(p.contains(Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap()));
        assert!(p.contains(Utc.with_ymd_and_hms(2025, 2, 28, 23, 59, 59).unwrap()));
        assert!(!p.contains(Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap()));
        assert!(!p.contains(Utc.with_ymd_and_hms(2025, 1, 31, 23, 59, 59).unwrap()));
    }

    #[test]
    fn rejects_bad_shapes_and_months() {
        for raw in ["2025-9", "202509", "2025/09", "25-09", "2025-09-01", "", "abcd-ef"] {
            assert_eq!(
                raw.parse::<Period>(),
                Err(PeriodError::Malformed(raw.to_string())),
                "{raw}"
            );
        }
        for raw in ["2025-13", "2025-00"] {
            assert_eq!(
                raw.parse::<Period>(),
                Err(PeriodError::MonthOutOfRange(raw.to_string()))
            );
        }
    }
}
