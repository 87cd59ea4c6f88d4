use chrono::{Datelike, NaiveDate, NaiveTime, Timelike, Weekday};

const MINUTES_PER_DAY: u32 = 24 * 60;

/// Parses a time string (HH:MM) to minutes since midnight
pub fn parse_time_to_minutes(time_str: &str) -> Option<u32> {
    let (hours, minutes) = time_str.trim().split_once(':')?;
    let hours: u32 = hours.trim().parse().ok()?;
    let minutes: u32 = minutes.trim().parse().ok()?;
    if hours >= 24 || minutes >= 60 {
        return None;
    }
    Some(hours * 60 + minutes)
}

/// Formats minutes since midnight to time string (HH:MM)
pub fn minutes_to_time_string(minutes: u32) -> String {
    let hours = minutes / 60;
    let mins = minutes % 60;
    format!("{:02}:{:02}", hours % 24, mins)
}

/// Parses `HH:MM` into a wall-clock time. Spreadsheet exports sometimes carry
/// seconds (`09:30:00`), those are accepted as long as they are zero.
pub fn parse_time(time_str: &str) -> Option<NaiveTime> {
    let trimmed = time_str.trim();
    let hhmm = match trimmed.matches(':').count() {
        1 => trimmed,
        2 => trimmed.strip_suffix(":00")?,
        _ => return None,
    };
    minutes_to_time(parse_time_to_minutes(hhmm)?)
}

/// Parses an ISO `YYYY-MM-DD` date
pub fn parse_date(date_str: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d").ok()
}

pub fn time_to_minutes(time: NaiveTime) -> u32 {
    time.num_seconds_from_midnight() / 60
}

pub fn minutes_to_time(minutes: u32) -> Option<NaiveTime> {
    if minutes >= MINUTES_PER_DAY {
        return None;
    }
    NaiveTime::from_hms_opt(minutes / 60, minutes % 60, 0)
}

/// `start + minutes`, or `None` when that would run past midnight
pub fn time_after(start: NaiveTime, minutes: u32) -> Option<NaiveTime> {
    minutes_to_time(time_to_minutes(start).checked_add(minutes)?)
}

pub fn format_time(time: NaiveTime) -> String {
    minutes_to_time_string(time_to_minutes(time))
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Zero-based calendar day index of `date` relative to the hire date.
/// Dates before the hire date are treated as day 0.
pub fn day_index(hire_date: NaiveDate, date: NaiveDate) -> u32 {
    u32::try_from((date - hire_date).num_days()).unwrap_or(0)
}

/// Serde adapter for `NaiveTime` as `HH:MM`
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_time(*time))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_time(&raw)
            .ok_or_else(|| de::Error::custom(format!("invalid time '{}', expected HH:MM", raw)))
    }
}
