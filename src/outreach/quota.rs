// src/outreach/quota.rs
use chrono::{DateTime, Utc};

use crate::database::{self, DbPool};

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Date-keyed counter id segment; a new day implicitly starts a fresh row.
pub fn day_key(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%d").to_string()
}

/// Raised when a batch is attempted with no remaining daily budget.
#[derive(Debug)]
pub struct QuotaExceeded {
    pub user_id: String,
    pub day: String,
    pub quota: i64,
}

impl std::fmt::Display for QuotaExceeded {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "daily quota of {} reached for {} on {}",
            self.quota, self.user_id, self.day
        )
    }
}

impl std::error::Error for QuotaExceeded {}

/// Per-user, per-day send budget backed by the atomic counter row.
#[derive(Clone)]
pub struct DailyQuota {
    pool: DbPool,
    quota: i64,
}

#[derive(Debug)]
pub struct QuotaStatus {
    pub day: String,
    pub quota: i64,
    pub sent_today: i64,
    pub remaining_today: i64,
}

impl DailyQuota {
    pub fn new(pool: DbPool, quota: i64) -> Self {
        Self { pool, quota }
    }

    pub fn limit(&self) -> i64 {
        self.quota
    }

    /// Reserve one send slot, or report the budget exhausted. The
    /// reservation is a single conditional update, so two concurrent
    /// batches cannot both take the last slot.
    pub async fn try_reserve(&self, user_id: &str, now: DateTime<Utc>) -> Result<bool> {
        database::try_reserve_send_slot(&self.pool, user_id, &day_key(now), self.quota).await
    }

    pub async fn status(&self, user_id: &str, now: DateTime<Utc>) -> Result<QuotaStatus> {
        let day = day_key(now);
        let sent_today = database::get_daily_sent(&self.pool, user_id, &day).await?;
        Ok(QuotaStatus {
            day,
            quota: self.quota,
            sent_today,
            remaining_today: (self.quota - sent_today).max(0),
        })
    }
}
