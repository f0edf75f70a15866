//! Five-field cron expressions: `minute hour day-of-month month day-of-week`.
//!
//! Each field accepts `*`, a value `a`, a range `a-b`, a step `*/n` or
//! `a-b/n`, and comma-separated lists of those. Day-of-week runs 0-7 with
//! both 0 and 7 meaning Sunday. When both day fields are restricted a date
//! matches if either one matches, as in classic cron.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, DurationRound, Timelike, Utc};

use crate::errors::AppError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleError(String);

impl fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ScheduleError {}

impl From<ScheduleError> for AppError {
    fn from(e: ScheduleError) -> Self {
        AppError::validation(format!("Invalid schedule: {}", e))
    }
}

/// Allowed values of one field as a bit set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Field {
    bits: u64,
    restricted: bool,
}

impl Field {
    fn contains(&self, value: u32) -> bool {
        self.bits & (1u64 << value) != 0
    }

    fn parse(spec: &str, name: &str, min: u32, max: u32) -> Result<Self, ScheduleError> {
        let mut bits = 0u64;

        for part in spec.split(',') {
            if part.is_empty() {
                return Err(ScheduleError(format!("empty list item in {}", name)));
            }

            let (range, step) = match part.split_once('/') {
                Some((range, step)) => {
                    let step: u32 = step
                        .parse()
                        .map_err(|_| ScheduleError(format!("bad step '{}' in {}", step, name)))?;
                    if step == 0 {
                        return Err(ScheduleError(format!("step must be positive in {}", name)));
                    }
                    (range, step)
                }
                None => (part, 1),
            };

            let (lo, hi) = if range == "*" {
                (min, max)
            } else if let Some((a, b)) = range.split_once('-') {
                (parse_value(a, name, min, max)?, parse_value(b, name, min, max)?)
            } else {
                let v = parse_value(range, name, min, max)?;
                // `5/15` means "from 5 to the end, every 15"
                if part.contains('/') {
                    (v, max)
                } else {
                    (v, v)
                }
            };

            if lo > hi {
                return Err(ScheduleError(format!(
                    "range {}-{} is reversed in {}",
                    lo, hi, name
                )));
            }

            let mut v = lo;
            while v <= hi {
                bits |= 1u64 << v;
                v += step;
            }
        }

        Ok(Self {
            bits,
            restricted: spec != "*",
        })
    }
}

fn parse_value(raw: &str, name: &str, min: u32, max: u32) -> Result<u32, ScheduleError> {
    let v: u32 = raw
        .parse()
        .map_err(|_| ScheduleError(format!("'{}' is not a number in {}", raw, name)))?;
    if v < min || v > max {
        return Err(ScheduleError(format!(
            "{} out of range {}-{} in {}",
            v, min, max, name
        )));
    }
    Ok(v)
}

/// A parsed cron expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronSchedule {
    source: String,
    minute: Field,
    hour: Field,
    day_of_month: Field,
    month: Field,
    day_of_week: Field,
}

impl CronSchedule {
    pub fn parse(expr: &str) -> Result<Self, ScheduleError> {
        let fields: Vec<&str> = expr.split_whitespace().collect();
        if fields.len() != 5 {
            return Err(ScheduleError(format!(
                "expected 5 fields, found {}",
                fields.len()
            )));
        }

        let mut day_of_week = Field::parse(fields[4], "day-of-week", 0, 7)?;
        if day_of_week.contains(7) {
            day_of_week.bits |= 1;
        }

        Ok(Self {
            source: fields.join(" "),
            minute: Field::parse(fields[0], "minute", 0, 59)?,
            hour: Field::parse(fields[1], "hour", 0, 23)?,
            day_of_month: Field::parse(fields[2], "day-of-month", 1, 31)?,
            month: Field::parse(fields[3], "month", 1, 12)?,
            day_of_week,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether the schedule fires in the minute containing `at`
    pub fn matches(&self, at: &DateTime<Utc>) -> bool {
        self.minute.contains(at.minute())
            && self.hour.contains(at.hour())
            && self.month.contains(at.month())
            && self.matches_day(at)
    }

    fn matches_day(&self, at: &DateTime<Utc>) -> bool {
        let dom = self.day_of_month.contains(at.day());
        let dow = self.day_of_week.contains(at.weekday().num_days_from_sunday());

        if self.day_of_month.restricted && self.day_of_week.restricted {
            dom || dow
        } else {
            dom && dow
        }
    }

    /// First matching minute strictly after `after`, searching one year
    /// ahead. `None` for schedules that never fire (e.g. `0 0 31 2 *`).
    pub fn next_after(&self, after: &DateTime<Utc>) -> Option<DateTime<Utc>> {
        let start = after.duration_trunc(Duration::minutes(1)).ok()? + Duration::minutes(1);
        let limit = start + Duration::days(366);
        let mut t = start;

        while t < limit {
            if !self.month.contains(t.month()) || !self.matches_day(&t) {
                t = t.duration_trunc(Duration::days(1)).ok()? + Duration::days(1);
                continue;
            }
            if !self.hour.contains(t.hour()) {
                t = t.duration_trunc(Duration::hours(1)).ok()? + Duration::hours(1);
                continue;
            }
            if self.minute.contains(t.minute()) {
                return Some(t);
            }
            t += Duration::minutes(1);
        }

        None
    }
}

impl FromStr for CronSchedule {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for CronSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn accepts_common_expressions() {
        for expr in [
            "*/30 * * * *",
            "0 0 * * *",
            "0 9 * * 1-5",
            "15,45 8-18/2 1 */3 0",
            "0 12 * * 7",
        ] {
            assert!(CronSchedule::parse(expr).is_ok(), "{}", expr);
        }
    }

    #[test]
    fn rejects_malformed_expressions() {
        for expr in [
            "invalid cron",
            "* * * *",
            "* * * * * *",
            "60 * * * *",
            "* 24 * * *",
            "* * 0 * *",
            "* * * 13 *",
            "* * * * 8",
            "*/0 * * * *",
            "10-5 * * * *",
            "1,,2 * * * *",
        ] {
            assert!(CronSchedule::parse(expr).is_err(), "{}", expr);
        }
    }

    #[test]
    fn steps_lists_and_ranges_match() {
        let every_30 = CronSchedule::parse("*/30 * * * *").unwrap();
        assert!(every_30.matches(&at(2024, 1, 1, 10, 0)));
        assert!(every_30.matches(&at(2024, 1, 1, 10, 30)));
        assert!(!every_30.matches(&at(2024, 1, 1, 10, 15)));

        let list = CronSchedule::parse("5,10 * * * *").unwrap();
        assert!(list.matches(&at(2024, 1, 1, 0, 10)));
        assert!(!list.matches(&at(2024, 1, 1, 0, 11)));

        // 2024-01-06 is a Saturday
        let weekdays = CronSchedule::parse("0 9 * * 1-5").unwrap();
        assert!(weekdays.matches(&at(2024, 1, 5, 9, 0)));
        assert!(!weekdays.matches(&at(2024, 1, 6, 9, 0)));
    }

    #[test]
    fn seven_means_sunday() {
        // 2024-01-07 is a Sunday
        let sunday = CronSchedule::parse("0 0 * * 7").unwrap();
        assert!(sunday.matches(&at(2024, 1, 7, 0, 0)));
    }

    #[test]
    fn restricted_day_fields_are_ored() {
        // The 1st of the month or any Monday
        let schedule = CronSchedule::parse("0 0 1 * 1").unwrap();
        assert!(schedule.matches(&at(2024, 2, 1, 0, 0)));
        assert!(schedule.matches(&at(2024, 2, 5, 0, 0)));
        assert!(!schedule.matches(&at(2024, 2, 6, 0, 0)));
    }

    #[test]
    fn next_after_finds_following_minute() {
        let schedule = CronSchedule::parse("30 2 * * *").unwrap();
        assert_eq!(
            schedule.next_after(&at(2024, 3, 1, 2, 30)),
            Some(at(2024, 3, 2, 2, 30))
        );
        assert_eq!(
            schedule.next_after(&at(2024, 3, 1, 1, 59)),
            Some(at(2024, 3, 1, 2, 30))
        );
    }

    #[test]
    fn impossible_dates_never_fire() {
        let schedule = CronSchedule::parse("0 0 31 2 *").unwrap();
        assert_eq!(schedule.next_after(&at(2024, 1, 1, 0, 0)), None);
    }
}
