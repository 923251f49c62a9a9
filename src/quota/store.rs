use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{FromRow, PgPool};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::app::util::time;

use super::models::usage_record::UsageRecord;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("usage store query failed: {0}")]
    Database(#[from] sqlx::Error),
    #[error("usage store unavailable: {0}")]
    Unavailable(String),
}

/// Per-user usage counters. `set` replaces the stored record.
///
/// Reads and writes are independent calls; a read-then-write sequence is not
/// atomic across concurrent requests for the same user.
#[async_trait]
pub trait UsageStore: Send + Sync {
    async fn get(&self, user_id: &str) -> Result<Option<UsageRecord>, StoreError>;
    async fn set(&self, user_id: &str, record: &UsageRecord) -> Result<(), StoreError>;
}

pub struct PgUsageStore {
    pool: PgPool,
}

#[derive(Debug, FromRow)]
struct UsageRow {
    count: i32,
    day: String,
}

const DAY_FORMAT: &str = "%Y-%m-%d";

impl PgUsageStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn ensure_table(&self) -> Result<(), StoreError> {
        sqlx::query(
            "
            CREATE TABLE IF NOT EXISTS usage_records (
                user_id TEXT PRIMARY KEY,
                count INTEGER NOT NULL DEFAULT 0,
                day TEXT NOT NULL,
                updated_at BIGINT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl UsageStore for PgUsageStore {
    async fn get(&self, user_id: &str) -> Result<Option<UsageRecord>, StoreError> {
        let row = sqlx::query_as::<_, UsageRow>(
            "
            SELECT count, day FROM usage_records WHERE user_id = $1
            ",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(%e);
            e
        })?;

        Ok(row.map(|row| UsageRecord {
            count: u32::try_from(row.count).unwrap_or(0),
            // an unreadable day is treated as stale and gets reset
            day: NaiveDate::parse_from_str(&row.day, DAY_FORMAT).unwrap_or(NaiveDate::MIN),
        }))
    }

    async fn set(&self, user_id: &str, record: &UsageRecord) -> Result<(), StoreError> {
        let count = i32::try_from(record.count).unwrap_or(i32::MAX);

        sqlx::query(
            "
            INSERT INTO usage_records (user_id, count, day, updated_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id) DO UPDATE
            SET count = EXCLUDED.count, day = EXCLUDED.day, updated_at = EXCLUDED.updated_at
            ",
        )
        .bind(user_id)
        .bind(count)
        .bind(record.day.format(DAY_FORMAT).to_string())
        .bind(time::current_time_in_secs())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(%e);
            e
        })?;

        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryUsageStore {
    records: RwLock<HashMap<String, UsageRecord>>,
}

impl MemoryUsageStore {
    pub async fn insert(&self, user_id: &str, record: UsageRecord) {
        self.records
            .write()
            .await
            .insert(user_id.to_string(), record);
    }
}

#[async_trait]
impl UsageStore for MemoryUsageStore {
    async fn get(&self, user_id: &str) -> Result<Option<UsageRecord>, StoreError> {
        Ok(self.records.read().await.get(user_id).copied())
    }

    async fn set(&self, user_id: &str, record: &UsageRecord) -> Result<(), StoreError> {
        self.insert(user_id, *record).await;
        Ok(())
    }
}
