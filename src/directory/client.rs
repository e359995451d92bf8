//! Directory Traits
//!
//! Seams between the recipient provider and whatever serves users and groups.

use async_trait::async_trait;
use uuid::Uuid;

use super::model::{Group, Page, User};
use crate::error::Result;

/// Paginated user lookups against the external directory.
///
/// `limit` is the page size negotiated with the directory and is the same
/// for every call of one pagination sequence. A page holds fewer than
/// `limit` users only when it is the last one.
#[async_trait]
pub trait DirectoryClient: Send + Sync {
    /// Fetch one page of a tenant's users, optionally restricted to org admins
    async fn fetch_users_page(
        &self,
        tenant: &str,
        admins_only: bool,
        offset: usize,
        limit: usize,
    ) -> Result<Page<User>>;

    /// Fetch one page of the members of a group
    async fn fetch_group_users_page(
        &self,
        tenant: &str,
        group_id: Uuid,
        offset: usize,
        limit: usize,
    ) -> Result<Page<User>>;
}

/// Group metadata lookups.
#[async_trait]
pub trait GroupResolver: Send + Sync {
    /// Fails with `GroupNotFound` when the tenant has no such group
    async fn fetch_group(&self, tenant: &str, group_id: Uuid) -> Result<Group>;
}
