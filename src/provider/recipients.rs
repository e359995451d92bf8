//! Recipient Provider
//!
//! Resolves the users of a tenant, or of one of its groups, through the
//! directory and keeps the assembled lists in the recipient cache.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

use super::pagination::assemble_pages;
use crate::config::RecipientsConfig;
use crate::directory::{DirectoryClient, GroupResolver, User};
use crate::error::Result;
use crate::metrics::Metrics;
use crate::storage::{GroupUsersKey, RecipientCache, Recipients, UsersKey};

/// Cached recipient lookups over a directory
pub struct RecipientProvider {
    directory: Arc<dyn DirectoryClient>,
    groups: Arc<dyn GroupResolver>,
    cache: RecipientCache,
    page_size: NonZeroUsize,
    metrics: Arc<Metrics>,
}

impl RecipientProvider {
    pub fn new(
        directory: Arc<dyn DirectoryClient>,
        groups: Arc<dyn GroupResolver>,
        config: &RecipientsConfig,
    ) -> Self {
        let metrics = Arc::new(Metrics::new());
        Self {
            directory,
            groups,
            cache: RecipientCache::new(config.users_ttl(), config.group_users_ttl(), metrics.clone()),
            page_size: config.elements_per_page,
            metrics,
        }
    }

    pub fn cache(&self) -> &RecipientCache {
        &self.cache
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Drop every cached lookup of both kinds
    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }

    /// All users of `tenant`, or only its org admins, in directory order
    pub async fn get_users(&self, tenant: &str, admins_only: bool) -> Result<Recipients> {
        let start = Instant::now();
        let key = UsersKey {
            tenant: tenant.to_string(),
            admins_only,
        };

        let result = self
            .cache
            .users()
            .get_or_compute(key, || async {
                self.assemble_users(tenant, admins_only)
                    .await
                    .map(Recipients::from)
            })
            .await;

        self.finish("users", tenant, start, result)
    }

    /// Members of group `group_id` of `tenant`, in directory order.
    ///
    /// The platform-default group stands for every user of the tenant.
    pub async fn get_group_users(
        &self,
        tenant: &str,
        admins_only: bool,
        group_id: Uuid,
    ) -> Result<Recipients> {
        let start = Instant::now();
        let key = GroupUsersKey {
            tenant: tenant.to_string(),
            admins_only,
            group_id,
        };

        let result = self
            .cache
            .group_users()
            .get_or_compute(key, || async {
                self.resolve_group_users(tenant, admins_only, group_id)
                    .await
                    .map(Recipients::from)
            })
            .await;

        self.finish("group-users", tenant, start, result)
    }

    async fn resolve_group_users(
        &self,
        tenant: &str,
        admins_only: bool,
        group_id: Uuid,
    ) -> Result<Vec<User>> {
        let group = self.groups.fetch_group(tenant, group_id).await?;
        if group.platform_default {
            debug!(tenant = tenant, group_id = %group_id, "Platform default group, resolving all users");
            return self.assemble_users(tenant, admins_only).await;
        }

        let directory = self.directory.as_ref();
        let metrics = self.metrics.as_ref();
        let members = assemble_pages(self.page_size, move |offset, limit| {
            metrics.record_page_request();
            directory.fetch_group_users_page(tenant, group_id, offset, limit)
        })
        .await?;

        // group listings carry no admin filter of their own
        if admins_only {
            Ok(members.into_iter().filter(|u| u.org_admin).collect())
        } else {
            Ok(members)
        }
    }

    async fn assemble_users(&self, tenant: &str, admins_only: bool) -> Result<Vec<User>> {
        let directory = self.directory.as_ref();
        let metrics = self.metrics.as_ref();
        assemble_pages(self.page_size, move |offset, limit| {
            metrics.record_page_request();
            directory.fetch_users_page(tenant, admins_only, offset, limit)
        })
        .await
    }

    fn finish(
        &self,
        kind: &str,
        tenant: &str,
        start: Instant,
        result: Result<Recipients>,
    ) -> Result<Recipients> {
        self.metrics
            .record_lookup(kind, start.elapsed(), result.is_ok());
        match &result {
            Ok(users) => debug!(kind = kind, tenant = tenant, users = users.len(), "Recipients resolved"),
            Err(e) => warn!(kind = kind, tenant = tenant, error = %e, "Recipient lookup failed"),
        }
        result
    }
}
