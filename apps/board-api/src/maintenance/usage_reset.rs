//! The usage-reset maintenance task.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;

use crate::db::usage::UsageCounterStore;
use crate::error::StoreError;

use super::schedule::period_anchor;

/// Result of a successful reset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetSummary {
    pub period_start: NaiveDate,
    pub records_reset: usize,
}

/// Reset every recruiter's counter to zero and anchor it to the first day of
/// the current month in `timezone`. Safe to repeat within a period.
pub async fn reset_usage_counters(
    store: &dyn UsageCounterStore,
    now: DateTime<Utc>,
    timezone: Tz,
) -> Result<ResetSummary, StoreError> {
    let period_start = period_anchor(now, timezone);
    let records_reset = store.reset_all(period_start).await?;
    Ok(ResetSummary {
        period_start,
        records_reset,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::usage::{MemoryUsageStore, UsageCounter};
    use chrono::TimeZone;

    #[tokio::test]
    async fn anchors_to_first_day_of_current_month() {
        let store = MemoryUsageStore::new();
        store.upsert(UsageCounter {
            recruiter_id: "rec_a".to_string(),
            posts_used: 9,
            period_start: NaiveDate::from_ymd_opt(2026, 9, 1).unwrap(),
        });

        let now = Utc.with_ymd_and_hms(2026, 10, 18, 3, 0, 0).unwrap();
        let summary = reset_usage_counters(&store, now, chrono_tz::UTC).await.unwrap();

        assert_eq!(summary.period_start, NaiveDate::from_ymd_opt(2026, 10, 1).unwrap());
        assert_eq!(summary.records_reset, 1);
        assert_eq!(store.get("rec_a").unwrap().posts_used, 0);
    }
}
