//! Message Tracking Store
//!
//! Ids of consumed Kafka messages, kept to detect redeliveries.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::StoreError;

/// A consumed message id and when it was recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackedMessage {
    pub id: Uuid,
    pub created: DateTime<Utc>,
}

impl TrackedMessage {
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            created: Utc::now(),
        }
    }

    pub fn created_at(id: Uuid, created: DateTime<Utc>) -> Self {
        Self { id, created }
    }
}

/// Persistence of tracked message ids
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Record a message id; recording the same id twice keeps the first
    async fn record(&self, message: TrackedMessage) -> Result<(), StoreError>;

    async fn count(&self) -> Result<u64, StoreError>;

    /// Delete every record created strictly before `cutoff`, returns count
    /// deleted. Running it again with the same cutoff deletes nothing.
    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError>;
}

/// Message store held in a DashMap
#[derive(Debug, Clone, Default)]
pub struct InMemoryMessageStore {
    inner: Arc<DashMap<Uuid, DateTime<Utc>>>,
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.inner.contains_key(id)
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn record(&self, message: TrackedMessage) -> Result<(), StoreError> {
        self.inner.entry(message.id).or_insert(message.created);
        Ok(())
    }

    async fn count(&self) -> Result<u64, StoreError> {
        Ok(self.inner.len() as u64)
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut removed = 0;
        self.inner.retain(|_, created| {
            if *created < cutoff {
                removed += 1;
                false
            } else {
                true
            }
        });
        Ok(removed)
    }
}
