//! Postgres Message Store
//!
//! Tracked message ids in the `kafka_message (id uuid primary key, created
//! timestamp)` table of the notifications database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};

use super::store::{MessageStore, TrackedMessage};
use crate::error::StoreError;

/// Message store backed by Postgres
#[derive(Debug, Clone)]
pub struct PgMessageStore {
    pool: PgPool,
}

impl PgMessageStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a small pool; the cleaner issues one statement per run
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(2)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }
}

#[async_trait]
impl MessageStore for PgMessageStore {
    async fn record(&self, message: TrackedMessage) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO kafka_message (id, created) VALUES ($1, $2) ON CONFLICT (id) DO NOTHING")
            .bind(message.id)
            .bind(message.created.naive_utc())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn count(&self) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM kafka_message")
            .fetch_one(&self.pool)
            .await?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM kafka_message WHERE created < $1")
            .bind(cutoff.naive_utc())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
