//! Order period calculation.
//!
//! Orders are collected in weekly windows that roll over at a fixed weekday and time of
//! day (Wednesday 10:00 by default) rather than at calendar week boundaries. This module
//! is the only place where window boundaries are derived; everything else receives an
//! [`OrderPeriod`] as a parameter.

use chrono::{
    DateTime, Datelike, Duration, FixedOffset, NaiveDateTime, NaiveTime, Offset, Utc, Weekday,
};

/// The weekly rollover rule: a weekday and a local time of day in a fixed UTC offset.
///
/// The offset never follows daylight saving time. With `+01:00` a 10:00 cutover stays
/// at 09:00 UTC all year, which reads as 11:00 on a clock showing summer time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cutover {
    /// Day of the week the window rolls over
    pub weekday: Weekday,
    /// Local time of day the window rolls over
    pub time: NaiveTime,
    /// Offset the weekday and time are expressed in
    pub offset: FixedOffset,
}

impl Default for Cutover {
    fn default() -> Self {
        Self {
            weekday: Weekday::Wed,
            time: NaiveTime::from_hms_opt(10, 0, 0).unwrap_or(NaiveTime::MIN),
            offset: Utc.fix(),
        }
    }
}

/// One ordering window.
///
/// `end` is `start + 7 days - 1 minute`. Membership is inclusive of `end` at minute
/// precision, so the window covers `[start, start + 7 days)` and consecutive windows
/// neither overlap nor leave a gap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OrderPeriod {
    /// First instant of the window
    pub start: DateTime<Utc>,
    /// Last minute of the window
    pub end: DateTime<Utc>,
}

impl OrderPeriod {
    /// First instant that no longer belongs to the window (the next window's start).
    #[must_use]
    pub fn exclusive_end(&self) -> DateTime<Utc> {
        self.end + Duration::minutes(1)
    }

    /// Whether `instant` falls into this window.
    #[must_use]
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant < self.exclusive_end()
    }

    /// The window immediately following this one.
    #[must_use]
    pub fn next(&self) -> Self {
        Self {
            start: self.start + Duration::days(7),
            end: self.end + Duration::days(7),
        }
    }
}

/// Computes the ordering window that contains `now`.
///
/// The window starts at the most recent cutover at or before `now`. On the cutover
/// weekday before the cutover time, that is the previous week's cutover.
#[must_use]
pub fn compute_period(now: DateTime<Utc>, cutover: &Cutover) -> OrderPeriod {
    let local = now.naive_utc() + offset_duration(cutover.offset);

    let days_back = (i64::from(local.weekday().num_days_from_monday()) + 7
        - i64::from(cutover.weekday.num_days_from_monday()))
        % 7;
    let mut start_local = (local.date() - Duration::days(days_back)).and_time(cutover.time);
    if start_local > local {
        start_local -= Duration::days(7);
    }

    let start = to_utc(start_local, cutover.offset);
    OrderPeriod {
        start,
        end: start + Duration::days(7) - Duration::minutes(1),
    }
}

fn offset_duration(offset: FixedOffset) -> Duration {
    Duration::seconds(i64::from(offset.local_minus_utc()))
}

fn to_utc(local: NaiveDateTime, offset: FixedOffset) -> DateTime<Utc> {
    DateTime::<Utc>::from_naive_utc_and_offset(local - offset_duration(offset), Utc)
}
