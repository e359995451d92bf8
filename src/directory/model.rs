//! Directory Records
//!
//! Wire shapes returned by the RBAC service.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// A principal of a tenant as reported by the directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(rename = "is_active", default)]
    pub active: bool,
    #[serde(rename = "is_org_admin", default)]
    pub org_admin: bool,
}

/// Group metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub uuid: Uuid,
    #[serde(default)]
    pub name: Option<String>,
    /// Marks the tenant's implicit "everyone" group
    #[serde(default)]
    pub platform_default: bool,
}

/// Pagination metadata attached to every page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meta {
    #[serde(default)]
    pub count: Option<u64>,
    #[serde(default)]
    pub limit: Option<u64>,
    #[serde(default)]
    pub offset: Option<u64>,
}

/// One window over an offset-ordered result set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    #[serde(default)]
    pub meta: Meta,
    #[serde(default)]
    pub links: HashMap<String, String>,
    pub data: Vec<T>,
}

impl<T> Page<T> {
    pub fn new(data: Vec<T>) -> Self {
        Self {
            meta: Meta::default(),
            links: HashMap::new(),
            data,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
