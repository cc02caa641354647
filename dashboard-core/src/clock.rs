/// Wall-clock formatting for the clock and date rows
use core::fmt::Write as _;

use heapless::String;

/// Local time offset applied to UTC (UTC+3)
pub const UTC_OFFSET_SECS: i64 = 3 * 3600;

const DAY_LABELS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// Label for a day-of-week number, 0 being Sunday
pub fn day_of_week_label(day: i32) -> &'static str {
    usize::try_from(day)
        .ok()
        .and_then(|index| DAY_LABELS.get(index))
        .copied()
        .unwrap_or("UNK")
}

/// Date part of an ISO `YYYY-MM-DDTHH:MM:SSZ` string
pub fn date_part(formatted: &str) -> &str {
    formatted.split_once('T').map_or(formatted, |(date, _)| date)
}

/// Broken-down local time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WallClock {
    pub year: i32,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    day_of_week: u8,
}

impl WallClock {
    pub fn from_unix(unix_secs: i64, offset_secs: i64) -> Self {
        let local = unix_secs + offset_secs;
        let days = local.div_euclid(86_400);
        let secs_of_day = local.rem_euclid(86_400);

        // 1970-01-01 was a Thursday
        let day_of_week = (days + 4).rem_euclid(7) as u8;

        let (year, month, day) = civil_from_days(days);

        Self {
            year,
            month,
            day,
            hour: (secs_of_day / 3600) as u8,
            minute: (secs_of_day % 3600 / 60) as u8,
            second: (secs_of_day % 60) as u8,
            day_of_week,
        }
    }

    /// `HH:MM:SS`
    pub fn formatted_time(&self) -> String<8> {
        let mut out = String::new();
        let _ = write!(out, "{:02}:{:02}:{:02}", self.hour, self.minute, self.second);
        out
    }

    /// `YYYY-MM-DDTHH:MM:SSZ`
    pub fn formatted_date(&self) -> String<20> {
        let mut out = String::new();
        let _ = write!(
            out,
            "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        );
        out
    }

    /// 0 = Sunday
    pub fn day_of_week(&self) -> i32 {
        self.day_of_week as i32
    }
}

// Days since the epoch to a proleptic Gregorian date
fn civil_from_days(days: i64) -> (i32, u8, u8) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u8;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u8;
    let year = yoe + era * 400 + i64::from(month <= 2);
    (year as i32, month, day)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_epoch() {
        let clock = WallClock::from_unix(0, 0);
        assert_eq!(clock.formatted_date().as_str(), "1970-01-01T00:00:00Z");
        assert_eq!(clock.day_of_week(), 4);
    }

    #[test]
    fn test_offset_rolls_the_date() {
        // 2024-02-29 22:30:05 UTC
        let clock = WallClock::from_unix(1_709_245_805, UTC_OFFSET_SECS);
        assert_eq!(clock.formatted_time().as_str(), "01:30:05");
        assert_eq!(clock.formatted_date().as_str(), "2024-03-01T01:30:05Z");
        assert_eq!(day_of_week_label(clock.day_of_week()), "Fri");
    }

    #[test]
    fn test_date_part() {
        assert_eq!(date_part("2024-03-01T01:30:05Z"), "2024-03-01");
        assert_eq!(date_part("no-separator"), "no-separator");
    }

    #[test]
    fn test_day_labels() {
        let labels: Vec<&str> = (0..7).map(day_of_week_label).collect();
        assert_eq!(labels, ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"]);
        assert_eq!(day_of_week_label(7), "UNK");
        assert_eq!(day_of_week_label(-1), "UNK");
    }

    proptest! {
        #[test]
        fn out_of_range_days_are_unknown(day in prop_oneof![i32::MIN..0, 7..i32::MAX]) {
            prop_assert_eq!(day_of_week_label(day), "UNK");
        }

        #[test]
        fn consecutive_days_advance_the_weekday(secs in 0i64..4_000_000_000) {
            let today = WallClock::from_unix(secs, UTC_OFFSET_SECS);
            let tomorrow = WallClock::from_unix(secs + 86_400, UTC_OFFSET_SECS);
            prop_assert_eq!((today.day_of_week() + 1) % 7, tomorrow.day_of_week());
            prop_assert_eq!(today.formatted_time(), tomorrow.formatted_time());
            prop_assert!(tomorrow.formatted_date().as_str() > today.formatted_date().as_str());
        }
    }
}
