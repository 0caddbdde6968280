//! Schedule validation, human description, and next-run computation.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;

use rowline_model::{Frequency, ScheduleConfiguration};

use crate::cron::CronSchedule;

const DAY_NAMES: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

/// Validate a schedule configuration, returning human-readable errors.
///
/// An empty result means the schedule is allowed to drive syncs.
pub fn validate(config: &ScheduleConfiguration) -> Vec<String> {
    let mut errors = Vec::new();

    match config.frequency {
        Frequency::Manual => {}
        Frequency::Daily | Frequency::Weekly | Frequency::Monthly => {
            check_time(config, &mut errors);
            check_timezone(config, &mut errors);
            if config.frequency == Frequency::Weekly {
                match config.day_of_week {
                    None => errors.push(
                        "weekly schedule requires day_of_week (0=Sunday..6=Saturday)".to_string(),
                    ),
                    Some(d) if d > 6 => {
                        errors.push(format!("day_of_week must be 0-6, got {d}"));
                    }
                    Some(_) => {}
                }
            }
            if config.frequency == Frequency::Monthly {
                match config.day_of_month {
                    None => errors.push("monthly schedule requires day_of_month".to_string()),
                    Some(d) if !(1..=28).contains(&d) => {
                        errors.push(format!("day_of_month must be between 1 and 28, got {d}"));
                    }
                    Some(_) => {}
                }
            }
        }
        Frequency::Cron => {
            match &config.cron_expression {
                None => errors.push("cron schedule requires cron_expression".to_string()),
                Some(expr) => {
                    if let Err(e) = expr.parse::<CronSchedule>() {
                        errors.push(format!("invalid cron expression '{expr}': {e}"));
                    }
                }
            }
            check_timezone(config, &mut errors);
        }
    }

    if config.retry_on_failure {
        if config.max_retries < 0 {
            errors.push(format!(
                "max_retries must not be negative, got {}",
                config.max_retries
            ));
        }
        if config.retry_delay_minutes < 1 {
            errors.push(format!(
                "retry_delay_minutes must be at least 1, got {}",
                config.retry_delay_minutes
            ));
        }
    }

    errors
}

/// Render a stable human description of the schedule.
pub fn describe(config: &ScheduleConfiguration) -> String {
    let time = config.time.as_deref().unwrap_or("00:00");
    let timezone = config.timezone.as_deref().unwrap_or("UTC");

    match config.frequency {
        Frequency::Manual => "Manual only".to_string(),
        Frequency::Daily => format!("Daily at {time} {timezone}"),
        Frequency::Weekly => {
            let day = config
                .day_of_week
                .and_then(|d| DAY_NAMES.get(d as usize).copied())
                .unwrap_or("?");
            format!("Weekly on {day} at {time} {timezone}")
        }
        Frequency::Monthly => {
            let day = config.day_of_month.unwrap_or(1);
            format!("Monthly on day {day} at {time} {timezone}")
        }
        Frequency::Cron => {
            let expr = config.cron_expression.as_deref().unwrap_or("?");
            format!("Cron: {expr} ({timezone})")
        }
    }
}

/// Compute the next trigger instant strictly after `now`.
///
/// Wall-clock fields (`time`, `day_of_week`, `day_of_month`) are resolved in
/// the configured timezone. Manual schedules, and schedules that fail
/// validation, have no next run. DST policy: local times inside a
/// spring-forward gap are skipped; ambiguous fall-back times fire on the
/// earlier instant.
pub fn next_run(config: &ScheduleConfiguration, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let next = match config.frequency {
        Frequency::Manual => None,
        Frequency::Daily => {
            let tz = parse_timezone(config)?;
            let time = parse_time(config.time.as_deref()?)?;
            next_wall_clock(now, tz, time, |_| true)
        }
        Frequency::Weekly => {
            let tz = parse_timezone(config)?;
            let time = parse_time(config.time.as_deref()?)?;
            let target = config.day_of_week.filter(|d| *d <= 6)?;
            next_wall_clock(now, tz, time, move |date| {
                date.weekday().num_days_from_sunday() as u8 == target
            })
        }
        Frequency::Monthly => {
            let tz = parse_timezone(config)?;
            let time = parse_time(config.time.as_deref()?)?;
            let target = config.day_of_month.filter(|d| (1..=28).contains(d))?;
            next_wall_clock(now, tz, time, move |date| date.day() as u8 == target)
        }
        Frequency::Cron => {
            let tz = parse_timezone(config)?;
            let schedule: CronSchedule = config.cron_expression.as_deref()?.parse().ok()?;
            schedule.next_after(now, tz)
        }
    };
    tracing::debug!(frequency = %config.frequency, next = ?next, "next run computed");
    next
}

fn check_time(config: &ScheduleConfiguration, errors: &mut Vec<String>) {
    match config.time.as_deref() {
        None => errors.push(format!(
            "{} schedule requires a time (HH:MM)",
            config.frequency
        )),
        Some(t) if parse_time(t).is_none() => {
            errors.push(format!("time must be HH:MM, got '{t}'"));
        }
        Some(_) => {}
    }
}

fn check_timezone(config: &ScheduleConfiguration, errors: &mut Vec<String>) {
    match config.timezone.as_deref() {
        None => errors.push(format!("{} schedule requires a timezone", config.frequency)),
        Some(tz) if tz.parse::<Tz>().is_err() => {
            errors.push(format!("unknown timezone '{tz}'"));
        }
        Some(_) => {}
    }
}

fn parse_timezone(config: &ScheduleConfiguration) -> Option<Tz> {
    config.timezone.as_deref()?.parse().ok()
}

fn parse_time(value: &str) -> Option<NaiveTime> {
    let (h, m) = value.trim().split_once(':')?;
    let hour: u32 = h.parse().ok()?;
    let minute: u32 = m.parse().ok()?;
    NaiveTime::from_hms_opt(hour, minute, 0)
}

/// Walk forward day by day in local time until `accepts` matches a date
/// whose wall-clock instant resolves and lies strictly after `now`.
fn next_wall_clock(
    now: DateTime<Utc>,
    tz: Tz,
    time: NaiveTime,
    accepts: impl Fn(NaiveDate) -> bool,
) -> Option<DateTime<Utc>> {
    let local_today = now.with_timezone(&tz).date_naive();
    // 366 days covers a year of monthly/weekly targets plus DST skips.
    for offset in 0..=366 {
        let date = local_today + Duration::days(offset);
        if !accepts(date) {
            continue;
        }
        let local = date.and_time(time);
        // Gap times do not resolve and are skipped; ambiguous times take
        // the earlier instant.
        let resolved = match tz.from_local_datetime(&local) {
            chrono::LocalResult::Single(dt) => Some(dt),
            chrono::LocalResult::Ambiguous(earlier, _) => Some(earlier),
            chrono::LocalResult::None => None,
        };
        if let Some(instant) = resolved {
            let utc = instant.with_timezone(&Utc);
            if utc > now {
                return Some(utc);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    fn weekly(day: u8) -> ScheduleConfiguration {
        ScheduleConfiguration {
            frequency: Frequency::Weekly,
            time: Some("09:00".to_string()),
            timezone: Some("America/New_York".to_string()),
            day_of_week: Some(day),
            ..ScheduleConfiguration::default()
        }
    }

    #[test]
    fn manual_validates_and_has_no_next_run() {
        let config = ScheduleConfiguration::manual();
        assert!(validate(&config).is_empty());
        assert_eq!(next_run(&config, Utc::now()), None);
    }

    #[test]
    fn weekly_without_day_of_week_is_invalid() {
        let mut config = weekly(1);
        config.day_of_week = None;
        let errors = validate(&config);
        assert!(errors.iter().any(|e| e.contains("day_of_week")));
    }

    #[test]
    fn monthly_day_30_is_invalid() {
        let config = ScheduleConfiguration {
            frequency: Frequency::Monthly,
            time: Some("02:00".to_string()),
            timezone: Some("UTC".to_string()),
            day_of_month: Some(30),
            ..ScheduleConfiguration::default()
        };
        let errors = validate(&config);
        assert!(errors.iter().any(|e| e.contains("between 1 and 28")));
    }

    #[test]
    fn daily_without_time_is_invalid() {
        let config = ScheduleConfiguration {
            frequency: Frequency::Daily,
            timezone: Some("UTC".to_string()),
            ..ScheduleConfiguration::default()
        };
        let errors = validate(&config);
        assert!(errors.iter().any(|e| e.contains("requires a time")));
    }

    #[test]
    fn bad_timezone_and_bad_cron_are_invalid() {
        let config = ScheduleConfiguration {
            frequency: Frequency::Cron,
            cron_expression: Some("0 2 * *".to_string()),
            timezone: Some("Mars/Olympus".to_string()),
            ..ScheduleConfiguration::default()
        };
        let errors = validate(&config);
        assert!(errors.iter().any(|e| e.contains("invalid cron expression")));
        assert!(errors.iter().any(|e| e.contains("unknown timezone")));
    }

    #[test]
    fn retry_bounds_are_validated() {
        let config = ScheduleConfiguration {
            retry_on_failure: true,
            max_retries: -1,
            retry_delay_minutes: 0,
            ..ScheduleConfiguration::manual()
        };
        let errors = validate(&config);
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn descriptions() {
        insta::assert_snapshot!(
            describe(&ScheduleConfiguration::daily("02:00", "UTC")),
            @"Daily at 02:00 UTC"
        );
        insta::assert_snapshot!(
            describe(&weekly(1)),
            @"Weekly on Monday at 09:00 America/New_York"
        );
        insta::assert_snapshot!(
            describe(&ScheduleConfiguration {
                frequency: Frequency::Monthly,
                time: Some("02:00".to_string()),
                timezone: Some("UTC".to_string()),
                day_of_month: Some(15),
                ..ScheduleConfiguration::default()
            }),
            @"Monthly on day 15 at 02:00 UTC"
        );
        insta::assert_snapshot!(
            describe(&ScheduleConfiguration {
                frequency: Frequency::Cron,
                cron_expression: Some("0 2 * * *".to_string()),
                timezone: Some("UTC".to_string()),
                ..ScheduleConfiguration::default()
            }),
            @"Cron: 0 2 * * * (UTC)"
        );
        insta::assert_snapshot!(
            describe(&ScheduleConfiguration::manual()),
            @"Manual only"
        );
    }

    #[test]
    fn daily_next_run_rolls_to_tomorrow() {
        let config = ScheduleConfiguration::daily("02:00", "UTC");
        assert_eq!(
            next_run(&config, utc(2026, 5, 1, 1, 0)),
            Some(utc(2026, 5, 1, 2, 0))
        );
        assert_eq!(
            next_run(&config, utc(2026, 5, 1, 2, 0)),
            Some(utc(2026, 5, 2, 2, 0))
        );
    }

    #[test]
    fn weekly_next_run_lands_on_target_weekday() {
        // 2026-06-03 is a Wednesday; next Monday is June 8. 09:00 EDT is
        // 13:00 UTC.
        let next = next_run(&weekly(1), utc(2026, 6, 3, 0, 0)).unwrap();
        assert_eq!(next, utc(2026, 6, 8, 13, 0));
    }

    #[test]
    fn monthly_next_run_wraps_to_next_month() {
        let config = ScheduleConfiguration {
            frequency: Frequency::Monthly,
            time: Some("02:00".to_string()),
            timezone: Some("UTC".to_string()),
            day_of_month: Some(15),
            ..ScheduleConfiguration::default()
        };
        assert_eq!(
            next_run(&config, utc(2026, 5, 20, 0, 0)),
            Some(utc(2026, 6, 15, 2, 0))
        );
    }

    #[test]
    fn daily_in_dst_gap_skips_to_next_day() {
        // 02:30 New York does not exist on 2026-03-08.
        let config = ScheduleConfiguration {
            frequency: Frequency::Daily,
            time: Some("02:30".to_string()),
            timezone: Some("America/New_York".to_string()),
            ..ScheduleConfiguration::default()
        };
        let next = next_run(&config, utc(2026, 3, 8, 0, 0)).unwrap();
        let local = next.with_timezone(&chrono_tz::America::New_York);
        assert_eq!(local.date_naive(), NaiveDate::from_ymd_opt(2026, 3, 9).unwrap());
        assert_eq!((local.hour(), local.minute()), (2, 30));
    }

    #[test]
    fn cron_next_run_uses_expression() {
        let config = ScheduleConfiguration {
            frequency: Frequency::Cron,
            cron_expression: Some("0 */6 * * *".to_string()),
            timezone: Some("UTC".to_string()),
            ..ScheduleConfiguration::default()
        };
        assert_eq!(
            next_run(&config, utc(2026, 5, 1, 7, 0)),
            Some(utc(2026, 5, 1, 12, 0))
        );
    }
}
