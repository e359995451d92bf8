//! In-Memory Directory
//!
//! A directory held entirely in process memory. Implements both directory
//! traits with the same paging contract as the RBAC service, records every
//! page request it serves and can be told to fail, which makes it the
//! stand-in for the real service in tests and local runs.

use async_trait::async_trait;
use hashbrown::HashMap;
use parking_lot::{Mutex, RwLock};
use std::time::Duration;
use uuid::Uuid;

use super::client::{DirectoryClient, GroupResolver};
use super::model::{Group, Page, User};
use crate::error::{RecipientError, Result};

/// A page request as observed by the directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub tenant: String,
    pub group_id: Option<Uuid>,
    pub admins_only: bool,
    pub offset: usize,
    pub limit: usize,
}

#[derive(Debug, Default)]
struct TenantDirectory {
    users: Vec<User>,
    groups: HashMap<Uuid, (Group, Vec<User>)>,
}

/// Directory backed by in-process maps
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    tenants: RwLock<HashMap<String, TenantDirectory>>,
    requests: Mutex<Vec<PageRequest>>,
    unavailable_from: Mutex<Option<usize>>,
    page_delay: Mutex<Option<Duration>>,
}

/// Build `count` active users named `username-0 .. username-{count-1}`
pub fn numbered_users(count: usize) -> Vec<User> {
    (0..count)
        .map(|i| User {
            username: format!("username-{}", i),
            email: format!("username-{}@example.com", i),
            first_name: "foo".to_string(),
            last_name: "bar".to_string(),
            active: true,
            org_admin: false,
        })
        .collect()
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the full user list of a tenant
    pub fn set_users(&self, tenant: &str, users: Vec<User>) {
        let mut tenants = self.tenants.write();
        tenants.entry(tenant.to_string()).or_default().users = users;
    }

    /// Create or replace a group and its members
    pub fn set_group(&self, tenant: &str, group: Group, members: Vec<User>) {
        let mut tenants = self.tenants.write();
        tenants
            .entry(tenant.to_string())
            .or_default()
            .groups
            .insert(group.uuid, (group, members));
    }

    /// Fail every page request whose offset is at or past `offset`.
    /// `None` makes the directory healthy again.
    pub fn set_unavailable_from(&self, offset: Option<usize>) {
        *self.unavailable_from.lock() = offset;
    }

    /// Delay every page response, simulating a slow directory
    pub fn set_page_delay(&self, delay: Option<Duration>) {
        *self.page_delay.lock() = delay;
    }

    /// Page requests served so far, in arrival order
    pub fn requests(&self) -> Vec<PageRequest> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn clear_requests(&self) {
        self.requests.lock().clear();
    }

    async fn serve_page(&self, request: PageRequest) -> Result<Page<User>> {
        let delay = *self.page_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let offset = request.offset;
        let limit = request.limit;
        self.requests.lock().push(request.clone());

        if let Some(from) = *self.unavailable_from.lock() {
            if offset >= from {
                return Err(RecipientError::DirectoryUnavailable(format!(
                    "simulated outage at offset {}",
                    offset
                )));
            }
        }

        let tenants = self.tenants.read();
        let users: Vec<&User> = match (tenants.get(&request.tenant), request.group_id) {
            (None, _) => Vec::new(),
            (Some(dir), None) => dir
                .users
                .iter()
                .filter(|u| !request.admins_only || u.org_admin)
                .collect(),
            (Some(dir), Some(group_id)) => dir
                .groups
                .get(&group_id)
                .map(|(_, members)| members.iter().collect())
                .unwrap_or_default(),
        };

        let total = users.len();
        let bound = offset.saturating_add(limit).min(total);
        let data = if offset < bound {
            users[offset..bound].iter().copied().cloned().collect()
        } else {
            Vec::new()
        };

        let mut page = Page::new(data);
        page.meta.count = Some(total as u64);
        page.meta.limit = Some(limit as u64);
        page.meta.offset = Some(offset as u64);
        Ok(page)
    }
}

#[async_trait]
impl DirectoryClient for InMemoryDirectory {
    async fn fetch_users_page(
        &self,
        tenant: &str,
        admins_only: bool,
        offset: usize,
        limit: usize,
    ) -> Result<Page<User>> {
        self.serve_page(PageRequest {
            tenant: tenant.to_string(),
            group_id: None,
            admins_only,
            offset,
            limit,
        })
        .await
    }

    async fn fetch_group_users_page(
        &self,
        tenant: &str,
        group_id: Uuid,
        offset: usize,
        limit: usize,
    ) -> Result<Page<User>> {
        self.serve_page(PageRequest {
            tenant: tenant.to_string(),
            group_id: Some(group_id),
            admins_only: false,
            offset,
            limit,
        })
        .await
    }
}

#[async_trait]
impl GroupResolver for InMemoryDirectory {
    async fn fetch_group(&self, tenant: &str, group_id: Uuid) -> Result<Group> {
        let tenants = self.tenants.read();
        tenants
            .get(tenant)
            .and_then(|dir| dir.groups.get(&group_id))
            .map(|(group, _)| group.clone())
            .ok_or_else(|| RecipientError::GroupNotFound {
                tenant: tenant.to_string(),
                group_id,
            })
    }
}
