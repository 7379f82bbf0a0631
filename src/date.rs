//! Calendar-day values used to anchor revisions

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

const FORMAT: &str = "%Y-%m-%d";

/// A calendar date with no time component. Displays as `YYYY-MM-DD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DateOnly(NaiveDate);

impl DateOnly {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Build from year/month/day, `None` if the day does not exist
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    /// Today's date in UTC
    pub fn today() -> Self {
        Self(Utc::now().date_naive())
    }

    /// Parse the canonical `YYYY-MM-DD` form only.
    ///
    /// chrono accepts unpadded fields (`2024-1-5`), which would not
    /// round-trip, so the shape is checked first.
    pub fn parse(s: &str) -> Option<Self> {
        let bytes = s.as_bytes();
        let shaped = bytes.len() == 10
            && bytes[4] == b'-'
            && bytes[7] == b'-'
            && bytes
                .iter()
                .enumerate()
                .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit());
        if !shaped {
            return None;
        }
        NaiveDate::parse_from_str(s, FORMAT).ok().map(Self)
    }

    pub fn as_naive(&self) -> NaiveDate {
        self.0
    }
}

impl fmt::Display for DateOnly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(FORMAT))
    }
}

impl FromStr for DateOnly {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("expected a YYYY-MM-DD date, got '{}'", s))
    }
}

impl From<NaiveDate> for DateOnly {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

impl Serialize for DateOnly {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DateOnly {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_form() {
        let date = DateOnly::from_ymd(2024, 2, 1).unwrap();
        assert_eq!(date.to_string(), "2024-02-01");
        assert_eq!(DateOnly::parse("2024-02-01"), Some(date));
    }

    #[test]
    fn test_rejects_non_canonical() {
        assert_eq!(DateOnly::parse("2024-2-1"), None);
        assert_eq!(DateOnly::parse("2024-02-30"), None);
        assert_eq!(DateOnly::parse("20240201"), None);
        assert_eq!(DateOnly::parse("2024-02-01T00:00"), None);
    }

    #[test]
    fn test_serde_as_string() {
        let date = DateOnly::from_ymd(2024, 1, 1).unwrap();
        let json = serde_json::to_string(&date).unwrap();
        assert_eq!(json, "\"2024-01-01\"");
        let back: DateOnly = serde_json::from_str(&json).unwrap();
        assert_eq!(back, date);
    }
}
