//! Maintenance Tasks
//!
//! Scheduled cleanup of message tracking records.

mod cleaner;
mod postgres;
mod store;

pub use cleaner::MessagesCleaner;
pub use postgres::PgMessageStore;
pub use store::{InMemoryMessageStore, MessageStore, TrackedMessage};
