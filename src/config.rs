//! Configuration
//!
//! Defaults, overlaid by an optional YAML file, overlaid by `NOTIFIX_`
//! environment variables (nested keys split on `__`, e.g.
//! `NOTIFIX_RECIPIENTS__ELEMENTS_PER_PAGE=500`).

use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "NOTIFIX_";

const MAX_RETENTION_HOURS: u64 = 100 * 365 * 24;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub rbac: RbacConfig,
    pub recipients: RecipientsConfig,
    pub cleaner: CleanerConfig,
}

/// RBAC service connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RbacConfig {
    /// Base URL of the RBAC service
    pub url: String,

    /// Pre-shared key sent on service-to-service calls
    pub psk: Option<String>,

    /// Client id announced to RBAC
    pub client_id: String,

    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for RbacConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8080".to_string(),
            psk: None,
            client_id: "notifications".to_string(),
            timeout_ms: 30_000,
        }
    }
}

/// Recipient resolution and caching
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecipientsConfig {
    /// Users requested per directory call
    pub elements_per_page: NonZeroUsize,

    /// Lifetime of tenant-wide lookups in seconds
    pub users_cache_ttl_secs: u64,

    /// Lifetime of group-scoped lookups in seconds
    pub group_users_cache_ttl_secs: u64,

    /// Expired cache entry sweep interval in seconds
    pub cache_sweep_interval_secs: u64,
}

impl Default for RecipientsConfig {
    fn default() -> Self {
        Self {
            elements_per_page: NonZeroUsize::new(1000).unwrap_or(NonZeroUsize::MIN),
            users_cache_ttl_secs: 600,
            group_users_cache_ttl_secs: 600,
            cache_sweep_interval_secs: 60,
        }
    }
}

impl RecipientsConfig {
    pub fn users_ttl(&self) -> Duration {
        Duration::from_secs(self.users_cache_ttl_secs)
    }

    pub fn group_users_ttl(&self) -> Duration {
        Duration::from_secs(self.group_users_cache_ttl_secs)
    }
}

/// Message tracking cleanup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanerConfig {
    /// Postgres connection string
    pub database_url: Option<String>,

    /// Seconds between two cleanup runs
    pub interval_secs: u64,

    /// Tracking records older than this many hours are deleted
    pub retention_hours: u64,
}

impl Default for CleanerConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            interval_secs: 3600,
            retention_hours: 24,
        }
    }
}

impl CleanerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Retention window, capped at one hundred years
    pub fn retention(&self) -> chrono::Duration {
        let hours = self.retention_hours.min(MAX_RETENTION_HOURS);
        chrono::Duration::hours(i64::try_from(hours).unwrap_or(0))
    }
}

impl Config {
    /// Load defaults, then `path` when given, then the environment
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));
        if let Some(path) = path {
            figment = figment.merge(Yaml::file(path));
        }
        let config = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;
        Ok(config)
    }

    /// Set the RBAC base URL
    pub fn with_rbac_url(mut self, url: impl Into<String>) -> Self {
        self.rbac.url = url.into();
        self
    }

    /// Set the directory page size
    pub fn with_elements_per_page(mut self, elements: NonZeroUsize) -> Self {
        self.recipients.elements_per_page = elements;
        self
    }

    /// Set both cache lifetimes
    pub fn with_cache_ttl(mut self, users_secs: u64, group_users_secs: u64) -> Self {
        self.recipients.users_cache_ttl_secs = users_secs;
        self.recipients.group_users_cache_ttl_secs = group_users_secs;
        self
    }

    /// Set the database used by the cleaner
    pub fn with_database_url(mut self, url: impl Into<String>) -> Self {
        self.cleaner.database_url = Some(url.into());
        self
    }
}
