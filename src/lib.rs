//! NOTIFIX - Recipient resolution for a notifications backend
//!
//! Paginated, cached lookups of tenant and group users against the RBAC
//! directory, plus the scheduled cleanup of message tracking records.

pub mod config;
pub mod directory;
pub mod error;
pub mod maintenance;
pub mod metrics;
pub mod provider;
pub mod storage;

pub use config::Config;
pub use directory::{DirectoryClient, Group, GroupResolver, InMemoryDirectory, Page, RbacClient, User};
pub use error::{ConfigError, RecipientError, StoreError};
pub use maintenance::{InMemoryMessageStore, MessageStore, MessagesCleaner, PgMessageStore};
pub use metrics::Metrics;
pub use provider::RecipientProvider;
pub use storage::{CacheSweeper, RecipientCache, Recipients};
