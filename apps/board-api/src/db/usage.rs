//! Recruiter usage counters ("recruiter post limit").
//!
//! The job-posting routes increment these counters; the only mutation owned
//! here is the monthly bulk reset.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use diesel::prelude::*;
use parking_lot::Mutex;

use crate::db::pool::DbPool;
use crate::db::schema::recruiter_post_limits;
use crate::error::StoreError;

/// Abstraction over the store holding usage counters.
///
/// Backed by PostgreSQL in production and an in-memory map in tests.
#[async_trait]
pub trait UsageCounterStore: Send + Sync {
    /// Set every counter to zero and every period anchor to `period_start`,
    /// unconditionally. Returns the number of records written.
    async fn reset_all(&self, period_start: NaiveDate) -> Result<usize, StoreError>;
}

/// One recruiter's usage for the current period.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageCounter {
    pub recruiter_id: String,
    pub posts_used: i32,
    pub period_start: NaiveDate,
}

// ---------------------------------------------------------------------------
// PostgreSQL implementation
// ---------------------------------------------------------------------------

pub struct PgUsageStore {
    db: DbPool,
}

impl PgUsageStore {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UsageCounterStore for PgUsageStore {
    async fn reset_all(&self, period_start: NaiveDate) -> Result<usize, StoreError> {
        let mut conn = self.db.get().await?;

        // Single statement: either every row is reset or none is.
        let updated = diesel_async::RunQueryDsl::execute(
            diesel::update(recruiter_post_limits::table).set((
                recruiter_post_limits::posts_used.eq(0),
                recruiter_post_limits::period_start.eq(period_start),
                recruiter_post_limits::updated_at.eq(Utc::now()),
            )),
            &mut conn,
        )
        .await?;

        Ok(updated)
    }
}

// ---------------------------------------------------------------------------
// In-memory implementation (for tests)
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryUsageStore {
    data: Mutex<HashMap<String, UsageCounter>>,
}

impl MemoryUsageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&self, counter: UsageCounter) {
        self.data
            .lock()
            .insert(counter.recruiter_id.clone(), counter);
    }

    /// Count one job post against a recruiter's current period.
    pub fn record_post(&self, recruiter_id: &str) -> Option<i32> {
        let mut data = self.data.lock();
        let counter = data.get_mut(recruiter_id)?;
        counter.posts_used += 1;
        Some(counter.posts_used)
    }

    pub fn get(&self, recruiter_id: &str) -> Option<UsageCounter> {
        self.data.lock().get(recruiter_id).cloned()
    }

    /// All counters, ordered by recruiter id.
    pub fn snapshot(&self) -> Vec<UsageCounter> {
        let mut all: Vec<UsageCounter> = self.data.lock().values().cloned().collect();
        all.sort_by(|a, b| a.recruiter_id.cmp(&b.recruiter_id));
        all
    }
}

#[async_trait]
impl UsageCounterStore for MemoryUsageStore {
    async fn reset_all(&self, period_start: NaiveDate) -> Result<usize, StoreError> {
        let mut data = self.data.lock();
        for counter in data.values_mut() {
            counter.posts_used = 0;
            counter.period_start = period_start;
        }
        Ok(data.len())
    }
}
