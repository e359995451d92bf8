//! Storage Engine
//!
//! In-memory recipient cache with TTL support.

mod cache;
mod sweeper;

pub use cache::{CacheRegion, GroupUsersKey, RecipientCache, Recipients, UsersKey};
pub use sweeper::CacheSweeper;
