use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::Deserialize;

/// A calendar month, stored as its first day.
///
/// All month-keyed datasets normalize their MONTH column to this type, so
/// ordering, grouping and "latest month" resolution are plain `Ord` on the
/// underlying date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Month(NaiveDate);

impl Month {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(Month)
    }

    pub fn from_date(d: NaiveDate) -> Self {
        // from_ymd_opt with day=1 cannot fail for a date that already exists.
        Month(NaiveDate::from_ymd_opt(d.year(), d.month(), 1).unwrap_or(d))
    }

    pub fn as_date(self) -> NaiveDate {
        self.0
    }

    pub fn year(self) -> i32 {
        self.0.year()
    }

    pub fn month(self) -> u32 {
        self.0.month()
    }

    /// Parse the date formats observed across CSV vintages:
    /// `YYYY-MM-DD`, `YYYY/MM/DD`, `YYYY-MM`, ISO datetimes with an optional
    /// trailing `Z`, and US-style `MM/DD/YYYY`.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.is_empty() {
            return None;
        }

        for fmt in ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"] {
            if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
                return Some(Month::from_date(d));
            }
        }

        // Bare YYYY-MM.
        if let Some((y, m)) = s.split_once('-') {
            if y.len() == 4 && !m.contains('-') {
                if let (Ok(y), Ok(m)) = (y.parse::<i32>(), m.parse::<u32>()) {
                    return Month::new(y, m);
                }
            }
        }

        // ISO datetimes; a trailing Z is dropped rather than treated as a zone
        // shift since exports are month-grained anyway.
        let s = s.strip_suffix('Z').unwrap_or(s);
        for fmt in [
            "%Y-%m-%dT%H:%M:%S%.f",
            "%Y-%m-%dT%H:%M:%S",
            "%Y-%m-%d %H:%M:%S%.f",
            "%Y-%m-%d %H:%M:%S",
        ] {
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
                return Some(Month::from_date(dt.date()));
            }
        }

        None
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.0.year(), self.0.month())
    }
}

impl FromStr for Month {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Month::parse(s).ok_or_else(|| format!("unrecognized month: {s:?}"))
    }
}

/// Declared scale of a probability/share-like column.
///
/// `Auto` exists for exports whose vintage is unknown; every shipped dataset
/// declares `Fraction` or `Percent` in `config/default.toml`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    #[default]
    Fraction,
    Percent,
    Auto,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_month_parse_plain_date() {
        let m = Month::parse("2025-06-15").unwrap();
        assert_eq!(m, Month::new(2025, 6).unwrap());
        assert_eq!(m.as_date().day(), 1);
    }

    #[test]
    fn test_month_parse_variants() {
        let want = Month::new(2025, 6).unwrap();
        for s in [
            "2025-06-01",
            "2025/06/30",
            "2025-06",
            "06/15/2025",
            "2025-06-01T00:00:00",
            "2025-06-01T12:30:00.000Z",
            "2025-06-01 00:00:00",
            "  2025-06-01  ",
        ] {
            assert_eq!(Month::parse(s), Some(want), "input: {s:?}");
        }
    }

    #[test]
    fn test_month_parse_rejects_garbage() {
        for s in ["", "June 2025", "2025", "n/a", "13/40/2025"] {
            assert_eq!(Month::parse(s), None, "input: {s:?}");
        }
    }

    #[test]
    fn test_month_ordering_and_display() {
        let a = Month::new(2025, 6).unwrap();
        let b = Month::new(2025, 7).unwrap();
        assert!(a < b);
        assert_eq!(a.to_string(), "2025-06");
    }
}
