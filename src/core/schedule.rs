//! Next-run computation for the recurring jobs.

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveTime, Utc, Weekday};

/// Returns the first instant strictly after `now` that falls on `time` (local to
/// `offset`) and, when given, on `weekday`.
///
/// `None` for the weekday means every day.
#[must_use]
pub fn next_occurrence(
    now: DateTime<Utc>,
    weekday: Option<Weekday>,
    time: NaiveTime,
    offset: FixedOffset,
) -> DateTime<Utc> {
    let shift = Duration::seconds(i64::from(offset.local_minus_utc()));
    let local = now.naive_utc() + shift;

    let mut candidate = local.date().and_time(time);
    if let Some(weekday) = weekday {
        let days_ahead = (i64::from(weekday.num_days_from_monday()) + 7
            - i64::from(candidate.weekday().num_days_from_monday()))
            % 7;
        candidate += Duration::days(days_ahead);
    }
    if candidate <= local {
        candidate += Duration::days(if weekday.is_some() { 7 } else { 1 });
    }

    DateTime::<Utc>::from_naive_utc_and_offset(candidate - shift, Utc)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use chrono::{Offset, TimeZone};

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_daily_later_today() {
        let next = next_occurrence(utc(2024, 5, 15, 8, 0), None, at(9, 0), Utc.fix());
        assert_eq!(next, utc(2024, 5, 15, 9, 0));
    }

    #[test]
    fn test_daily_already_passed_rolls_to_tomorrow() {
        let next = next_occurrence(utc(2024, 5, 15, 9, 0), None, at(9, 0), Utc.fix());
        assert_eq!(next, utc(2024, 5, 16, 9, 0));
    }

    #[test]
    fn test_weekly_same_day_before_and_after() {
        // 2024-05-15 is a Wednesday
        let before = next_occurrence(
            utc(2024, 5, 15, 9, 0),
            Some(Weekday::Wed),
            at(9, 30),
            Utc.fix(),
        );
        assert_eq!(before, utc(2024, 5, 15, 9, 30));

        let after = next_occurrence(
            utc(2024, 5, 15, 9, 31),
            Some(Weekday::Wed),
            at(9, 30),
            Utc.fix(),
        );
        assert_eq!(after, utc(2024, 5, 22, 9, 30));
    }

    #[test]
    fn test_weekly_other_weekday() {
        let next = next_occurrence(
            utc(2024, 5, 17, 12, 0),
            Some(Weekday::Mon),
            at(7, 0),
            Utc.fix(),
        );
        assert_eq!(next, utc(2024, 5, 20, 7, 0));
    }

    #[test]
    fn test_offset_is_applied() {
        // 09:00 at UTC+01:00 is 08:00 UTC
        let offset = FixedOffset::east_opt(3600).unwrap();
        let next = next_occurrence(utc(2024, 5, 15, 7, 0), None, at(9, 0), offset);
        assert_eq!(next, utc(2024, 5, 15, 8, 0));

        let next = next_occurrence(utc(2024, 5, 15, 8, 0), None, at(9, 0), offset);
        assert_eq!(next, utc(2024, 5, 16, 8, 0));
    }
}
