pub mod compute;
pub mod cron;

pub use compute::{describe, next_run, validate};
pub use cron::{CronParseError, CronSchedule};
