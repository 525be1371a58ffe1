use std::fmt;

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ScheduleError;

pub const MINUTES_PER_DAY: u16 = 24 * 60;

/// Default appointment slot length used by day availability.
pub const DEFAULT_SLOT_MINUTES: u16 = 30;

/// A time of day as minutes since midnight. The wire format is a
/// zero-padded 24-hour "HH:MM" string; all comparisons and interval
/// arithmetic happen on the integer value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay(u16);

impl TimeOfDay {
    pub fn from_hm(hours: u16, minutes: u16) -> Result<Self, ScheduleError> {
        if hours > 23 || minutes > 59 {
            return Err(ScheduleError::Validation(format!(
                "Invalid time of day: {:02}:{:02}",
                hours, minutes
            )));
        }
        Ok(Self(hours * 60 + minutes))
    }

    /// Parse a "HH:MM" 24-hour string.
    pub fn parse(value: &str) -> Result<Self, ScheduleError> {
        let invalid =
            || ScheduleError::Validation(format!("Invalid time format (expected HH:MM): {value}"));

        let (h, m) = value.split_once(':').ok_or_else(invalid)?;
        if h.len() != 2 || m.len() != 2 {
            return Err(invalid());
        }

        let hours: u16 = h.parse().map_err(|_| invalid())?;
        let minutes: u16 = m.parse().map_err(|_| invalid())?;

        Self::from_hm(hours, minutes)
    }

    pub fn minutes(&self) -> u16 {
        self.0
    }

    /// Add a number of minutes, or `None` if the result would cross
    /// midnight.
    pub fn add_minutes(&self, minutes: u16) -> Option<Self> {
        let total = self.0.checked_add(minutes)?;
        if total >= MINUTES_PER_DAY {
            return None;
        }
        Some(Self(total))
    }

    pub fn to_naive_time(&self) -> chrono::NaiveTime {
        chrono::NaiveTime::from_num_seconds_from_midnight_opt(self.0 as u32 * 60, 0)
            .unwrap_or(chrono::NaiveTime::MIN)
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0 / 60, self.0 % 60)
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        TimeOfDay::parse(&value).map_err(de::Error::custom)
    }
}

/// Half-open interval overlap: `[a, b)` and `[c, d)` overlap iff
/// `a < d && c < b`. Back-to-back intervals do not overlap.
pub fn intervals_overlap(a: TimeOfDay, b: TimeOfDay, c: TimeOfDay, d: TimeOfDay) -> bool {
    a < d && c < b
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl DayOfWeek {
    pub fn from_date(date: NaiveDate) -> Self {
        match date.weekday() {
            Weekday::Mon => DayOfWeek::Monday,
            Weekday::Tue => DayOfWeek::Tuesday,
            Weekday::Wed => DayOfWeek::Wednesday,
            Weekday::Thu => DayOfWeek::Thursday,
            Weekday::Fri => DayOfWeek::Friday,
            Weekday::Sat => DayOfWeek::Saturday,
            Weekday::Sun => DayOfWeek::Sunday,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DayOfWeek::Monday => "monday",
            DayOfWeek::Tuesday => "tuesday",
            DayOfWeek::Wednesday => "wednesday",
            DayOfWeek::Thursday => "thursday",
            DayOfWeek::Friday => "friday",
            DayOfWeek::Saturday => "saturday",
            DayOfWeek::Sunday => "sunday",
        }
    }
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_formats_hh_mm() {
        let t = TimeOfDay::parse("08:30").unwrap();
        assert_eq!(t.minutes(), 8 * 60 + 30);
        assert_eq!(t.to_string(), "08:30");
    }

    #[test]
    fn rejects_malformed_times() {
        assert!(TimeOfDay::parse("8:30").is_err());
        assert!(TimeOfDay::parse("24:00").is_err());
        assert!(TimeOfDay::parse("12:60").is_err());
        assert!(TimeOfDay::parse("noon").is_err());
        assert!(TimeOfDay::parse("12-30").is_err());
    }

    #[test]
    fn add_minutes_stops_at_midnight() {
        let t = TimeOfDay::parse("23:45").unwrap();
        assert_eq!(t.add_minutes(14), Some(TimeOfDay::parse("23:59").unwrap()));
        assert_eq!(t.add_minutes(15), None);
    }

    #[test]
    fn half_open_overlap() {
        let t = |s: &str| TimeOfDay::parse(s).unwrap();

        assert!(intervals_overlap(t("09:00"), t("10:00"), t("09:30"), t("10:30")));
        assert!(intervals_overlap(t("09:00"), t("10:00"), t("08:00"), t("09:01")));
        // Touching endpoints do not overlap.
        assert!(!intervals_overlap(t("09:00"), t("10:00"), t("10:00"), t("11:00")));
        assert!(!intervals_overlap(t("10:00"), t("11:00"), t("09:00"), t("10:00")));
    }

    #[test]
    fn weekday_mapping() {
        // 2024-06-10 is a Monday.
        let date = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();
        assert_eq!(DayOfWeek::from_date(date), DayOfWeek::Monday);
        assert_eq!(DayOfWeek::from_date(date).to_string(), "monday");
    }
}
