//! Schedule configuration for recurring syncs.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// How often a data source syncs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    #[default]
    Manual,
    Daily,
    Weekly,
    Monthly,
    Cron,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Manual => "manual",
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
            Frequency::Cron => "cron",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "manual" => Ok(Frequency::Manual),
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            "monthly" => Ok(Frequency::Monthly),
            "cron" => Ok(Frequency::Cron),
            other => Err(ModelError::UnknownFrequency(other.to_string())),
        }
    }
}

/// Full schedule and retry policy for one data source.
///
/// Which optional fields are required depends on `frequency`; the schedule
/// computer validates that before a sync is allowed to run. `day_of_month`
/// is bounded to 1-28 to avoid month-length ambiguity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleConfiguration {
    pub frequency: Frequency,
    /// Wall-clock "HH:MM" for daily/weekly/monthly schedules.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    /// IANA timezone name, e.g. "UTC" or "America/New_York".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    /// 0 = Sunday .. 6 = Saturday, for weekly schedules.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day_of_week: Option<u8>,
    /// 1-28, for monthly schedules.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day_of_month: Option<u8>,
    /// 5-field cron expression, for cron schedules.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cron_expression: Option<String>,
    #[serde(default)]
    pub retry_on_failure: bool,
    #[serde(default)]
    pub max_retries: i32,
    #[serde(default = "default_retry_delay")]
    pub retry_delay_minutes: i32,
}

fn default_retry_delay() -> i32 {
    5
}

impl Default for ScheduleConfiguration {
    fn default() -> Self {
        Self {
            frequency: Frequency::Manual,
            time: None,
            timezone: None,
            day_of_week: None,
            day_of_month: None,
            cron_expression: None,
            retry_on_failure: false,
            max_retries: 0,
            retry_delay_minutes: default_retry_delay(),
        }
    }
}

impl ScheduleConfiguration {
    /// A manual-only schedule with no retries.
    pub fn manual() -> Self {
        Self::default()
    }

    /// Convenience constructor for a daily schedule.
    pub fn daily(time: &str, timezone: &str) -> Self {
        Self {
            frequency: Frequency::Daily,
            time: Some(time.to_string()),
            timezone: Some(timezone.to_string()),
            ..Self::default()
        }
    }
}
