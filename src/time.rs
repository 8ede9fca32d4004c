//! Time-of-day helpers shared by the trip filter and the slider read-out.

use chrono::{NaiveTime, Timelike};

/// Number of minutes in a day; minute-of-day values live in `0..MINUTES_PER_DAY`.
pub const MINUTES_PER_DAY: u16 = 24 * 60;

/// Returns `hour * 60 + minute` for any time-bearing value, ignoring the date
/// and anything below minute resolution.
pub fn minute_of_day<T: Timelike>(t: &T) -> u16 {
    (t.hour() * 60 + t.minute()) as u16
}

/// Formats a minute-of-day as a short en-US clock label, e.g. `"2:30 PM"`.
///
/// Values past the end of the day wrap around.
pub fn format_minutes(minute: u16) -> String {
    let minute = u32::from(minute % MINUTES_PER_DAY);
    NaiveTime::from_hms_opt(minute / 60, minute % 60, 0)
        .map(|t| t.format("%-I:%M %p").to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_minute_of_day_afternoon() {
        let t = at(14, 30, 59);
        assert_eq!(minute_of_day(&t), 870);
    }

    #[test]
    fn test_minute_of_day_bounds() {
        assert_eq!(minute_of_day(&at(0, 0, 0)), 0);
        assert_eq!(minute_of_day(&at(23, 59, 59)), 1439);
    }

    #[test]
    fn test_minute_of_day_ignores_date() {
        let a = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(8, 15, 0)
            .unwrap();
        let b = NaiveDate::from_ymd_opt(2024, 3, 31)
            .unwrap()
            .and_hms_opt(8, 15, 0)
            .unwrap();
        assert_eq!(minute_of_day(&a), minute_of_day(&b));
    }

    #[test]
    fn test_format_minutes() {
        assert_eq!(format_minutes(0), "12:00 AM");
        assert_eq!(format_minutes(870), "2:30 PM");
        assert_eq!(format_minutes(725), "12:05 PM");
        assert_eq!(format_minutes(1439), "11:59 PM");
    }

    fn at(h: u32, m: u32, s: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, s).unwrap()
    }
}
