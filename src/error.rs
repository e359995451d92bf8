//! Error Types

use thiserror::Error;
use uuid::Uuid;

/// Failures surfaced by recipient resolution.
///
/// Neither variant is retried inside the crate. Any error during a
/// multi-page assembly discards everything fetched so far for that call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecipientError {
    #[error("Directory unavailable: {0}")]
    DirectoryUnavailable(String),
    #[error("Group {group_id} not found for tenant {tenant}")]
    GroupNotFound { tenant: String, group_id: Uuid },
}

/// Failures of the message tracking store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Configuration loading failures.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Figment(#[from] Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        ConfigError::Figment(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, RecipientError>;
