//! A 5-field cron expression parser and next-match computation.
//!
//! Supported syntax per field: `*`, single values, ranges (`a-b`), steps
//! (`*/n`, `a-b/n`), and comma lists. Fields are minute (0-59), hour (0-23),
//! day of month (1-31), month (1-12), and day of week (0-7, where both 0 and
//! 7 mean Sunday). Names (`JAN`, `MON`) are not accepted. When both the
//! day-of-month and day-of-week fields are restricted, a date matches if
//! either does (the classic vixie-cron rule).

use std::collections::BTreeSet;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, DurationRound, Timelike, Utc};
use chrono_tz::Tz;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CronParseError {
    #[error("expected 5 fields, found {0}")]
    FieldCount(usize),
    #[error("invalid {field} field: {detail}")]
    Field { field: &'static str, detail: String },
}

/// How far ahead `next_after` searches before giving up.
const SEARCH_HORIZON_DAYS: i64 = 366;

/// A parsed 5-field cron expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronSchedule {
    minutes: BTreeSet<u8>,
    hours: BTreeSet<u8>,
    days_of_month: BTreeSet<u8>,
    months: BTreeSet<u8>,
    days_of_week: BTreeSet<u8>,
    /// Whether the day-of-month field was anything other than `*`.
    dom_restricted: bool,
    /// Whether the day-of-week field was anything other than `*`.
    dow_restricted: bool,
}

impl FromStr for CronSchedule {
    type Err = CronParseError;

    fn from_str(expression: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = expression.split_whitespace().collect();
        if fields.len() != 5 {
            return Err(CronParseError::FieldCount(fields.len()));
        }

        let minutes = parse_field(fields[0], "minute", 0, 59, false)?;
        let hours = parse_field(fields[1], "hour", 0, 23, false)?;
        let days_of_month = parse_field(fields[2], "day of month", 1, 31, false)?;
        let months = parse_field(fields[3], "month", 1, 12, false)?;
        let days_of_week = parse_field(fields[4], "day of week", 0, 7, true)?;

        Ok(Self {
            minutes,
            hours,
            days_of_month,
            months,
            days_of_week,
            dom_restricted: fields[2] != "*",
            dow_restricted: fields[4] != "*",
        })
    }
}

impl CronSchedule {
    /// Whether the schedule fires at the given local wall-clock time.
    fn matches_local(&self, minute: u8, hour: u8, day: u8, month: u8, weekday: u8) -> bool {
        self.minutes.contains(&minute)
            && self.hours.contains(&hour)
            && self.months.contains(&month)
            && self.day_matches(day, weekday)
    }

    fn day_matches(&self, day: u8, weekday: u8) -> bool {
        let dom_ok = self.days_of_month.contains(&day);
        let dow_ok = self.days_of_week.contains(&weekday);
        match (self.dom_restricted, self.dow_restricted) {
            // Both restricted: vixie OR rule.
            (true, true) => dom_ok || dow_ok,
            (true, false) => dom_ok,
            (false, true) => dow_ok,
            (false, false) => true,
        }
    }

    /// First instant strictly after `now` at which the schedule fires,
    /// evaluated against wall-clock time in `tz`.
    ///
    /// Iterating UTC instants gives the DST policy for free: local times
    /// inside a spring-forward gap never occur and are skipped, and an
    /// ambiguous fall-back time fires once, on its earlier instant.
    /// Returns `None` if no match exists within the search horizon.
    pub fn next_after(&self, now: DateTime<Utc>, tz: Tz) -> Option<DateTime<Utc>> {
        let mut candidate = (now + Duration::minutes(1))
            .duration_trunc(Duration::minutes(1))
            .ok()?;
        let horizon = now + Duration::days(SEARCH_HORIZON_DAYS);

        while candidate <= horizon {
            let local = candidate.with_timezone(&tz);
            let minute = local.minute() as u8;
            let hour = local.hour() as u8;
            let day = local.day() as u8;
            let month = local.month() as u8;
            let weekday = local.weekday().num_days_from_sunday() as u8;

            if !self.months.contains(&month) || !self.day_matches(day, weekday) {
                // Skip most of the day; stay conservative around midnight
                // so offset changes cannot jump over a matching minute.
                let into_day = i64::from(hour) * 60 + i64::from(minute);
                let skip = (1440 - into_day - 120).max(1);
                candidate += Duration::minutes(skip);
                continue;
            }
            if !self.hours.contains(&hour) {
                candidate += Duration::minutes(i64::from(60 - minute).max(1));
                continue;
            }
            if self.minutes.contains(&minute) {
                return Some(candidate);
            }
            candidate += Duration::minutes(1);
        }

        None
    }
}

fn parse_field(
    field: &str,
    name: &'static str,
    min: u8,
    max: u8,
    sunday_wraps: bool,
) -> Result<BTreeSet<u8>, CronParseError> {
    let err = |detail: String| CronParseError::Field { field: name, detail };

    let mut values = BTreeSet::new();
    for term in field.split(',') {
        if term.is_empty() {
            return Err(err("empty term".to_string()));
        }

        let (body, step) = match term.split_once('/') {
            Some((body, step_str)) => {
                let step: u8 = step_str
                    .parse()
                    .map_err(|_| err(format!("bad step '{step_str}'")))?;
                if step == 0 {
                    return Err(err("step must be positive".to_string()));
                }
                (body, step)
            }
            None => (term, 1),
        };

        let (lo, hi) = if body == "*" {
            (min, max)
        } else if let Some((a, b)) = body.split_once('-') {
            let lo: u8 = a.parse().map_err(|_| err(format!("bad value '{a}'")))?;
            let hi: u8 = b.parse().map_err(|_| err(format!("bad value '{b}'")))?;
            if lo > hi {
                return Err(err(format!("inverted range '{body}'")));
            }
            (lo, hi)
        } else {
            let v: u8 = body.parse().map_err(|_| err(format!("bad value '{body}'")))?;
            (v, v)
        };

        if lo < min || hi > max {
            return Err(err(format!("'{body}' out of range {min}-{max}")));
        }

        let mut v = lo;
        while v <= hi {
            // Day-of-week 7 is an alias for Sunday.
            values.insert(if sunday_wraps && v == 7 { 0 } else { v });
            if v > hi.saturating_sub(step) {
                break;
            }
            v += step;
        }
    }

    Ok(values)
}
