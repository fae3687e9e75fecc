//! Calendar trigger rule evaluated in a fixed timezone.

use std::str::FromStr;

use chrono::{DateTime, Datelike, Days, NaiveDate, Utc};
use chrono_tz::Tz;
use cron::Schedule;

/// First instant of the first day of every month
/// (sec min hour day-of-month month day-of-week).
pub const USAGE_RESET_CRON: &str = "0 0 0 1 * *";

/// Zone the usage reset is anchored to, independent of the host's local zone.
pub const MAINTENANCE_TIMEZONE: Tz = chrono_tz::Asia::Ho_Chi_Minh;

/// A cron expression bound to a timezone.
#[derive(Debug, Clone)]
pub struct TriggerRule {
    schedule: Schedule,
    timezone: Tz,
}

impl TriggerRule {
    pub fn new(expression: &str, timezone: Tz) -> Result<Self, cron::error::Error> {
        Ok(Self {
            schedule: Schedule::from_str(expression)?,
            timezone,
        })
    }

    /// The monthly usage-reset rule.
    pub fn monthly_usage_reset() -> Result<Self, cron::error::Error> {
        Self::new(USAGE_RESET_CRON, MAINTENANCE_TIMEZONE)
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// The first trigger instant strictly after `now`.
    pub fn next_after(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let local = now.with_timezone(&self.timezone);
        self.schedule
            .after(&local)
            .next()
            .map(|at| at.with_timezone(&Utc))
    }
}

/// First calendar day of the month containing `now`, as seen in `timezone`.
pub fn period_anchor(now: DateTime<Utc>, timezone: Tz) -> NaiveDate {
    let local = now.with_timezone(&timezone).date_naive();
    local - Days::new(u64::from(local.day0()))
}
