//! RBAC Service Client
//!
//! Service-to-service HTTP client for the RBAC principals and groups API.

use async_trait::async_trait;
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

use super::client::{DirectoryClient, GroupResolver};
use super::model::{Group, Page, User};
use crate::config::RbacConfig;
use crate::error::{RecipientError, Result};

pub const ACCOUNT_HEADER: &str = "x-rh-rbac-account";
pub const CLIENT_ID_HEADER: &str = "x-rh-rbac-client-id";
pub const PSK_HEADER: &str = "x-rh-rbac-psk";

const PRINCIPALS_PATH: &str = "/api/rbac/v1/principals/";

/// HTTP client for the RBAC service
#[derive(Debug, Clone)]
pub struct RbacClient {
    http: reqwest::Client,
    base_url: String,
    client_id: String,
    psk: Option<String>,
}

impl RbacClient {
    pub fn new(config: &RbacConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .pool_max_idle_per_host(10)
            .build()
            .map_err(|e| RecipientError::DirectoryUnavailable(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.url.trim_end_matches('/').to_string(),
            client_id: config.client_id.clone(),
            psk: config.psk.clone(),
        })
    }

    fn get(&self, tenant: &str, path: &str) -> RequestBuilder {
        let mut builder = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .header(ACCOUNT_HEADER, tenant)
            .header(CLIENT_ID_HEADER, &self.client_id);
        if let Some(psk) = &self.psk {
            builder = builder.header(PSK_HEADER, psk);
        }
        builder
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let response = builder.send().await.map_err(unavailable)?;
        let status = response.status();
        if !status.is_success() {
            warn!(status = %status, url = %response.url(), "RBAC request failed");
            return Err(RecipientError::DirectoryUnavailable(format!(
                "RBAC responded with {}",
                status
            )));
        }
        response.json::<T>().await.map_err(unavailable)
    }

    async fn fetch_page(
        &self,
        tenant: &str,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Page<User>> {
        let page: Page<User> = self.send(self.get(tenant, path).query(query)).await?;
        debug!(
            tenant = tenant,
            path = path,
            received = page.len(),
            total = ?page.meta.count,
            "Fetched RBAC page"
        );
        Ok(page)
    }
}

fn unavailable(err: reqwest::Error) -> RecipientError {
    RecipientError::DirectoryUnavailable(err.to_string())
}

#[async_trait]
impl DirectoryClient for RbacClient {
    async fn fetch_users_page(
        &self,
        tenant: &str,
        admins_only: bool,
        offset: usize,
        limit: usize,
    ) -> Result<Page<User>> {
        let query = [
            ("admin_only", admins_only.to_string()),
            ("offset", offset.to_string()),
            ("limit", limit.to_string()),
        ];
        self.fetch_page(tenant, PRINCIPALS_PATH, &query).await
    }

    async fn fetch_group_users_page(
        &self,
        tenant: &str,
        group_id: Uuid,
        offset: usize,
        limit: usize,
    ) -> Result<Page<User>> {
        let path = format!("/api/rbac/v1/groups/{}/principals/", group_id);
        let query = [("offset", offset.to_string()), ("limit", limit.to_string())];
        self.fetch_page(tenant, &path, &query).await
    }
}

#[async_trait]
impl GroupResolver for RbacClient {
    async fn fetch_group(&self, tenant: &str, group_id: Uuid) -> Result<Group> {
        let path = format!("/api/rbac/v1/groups/{}/", group_id);
        let response = self
            .get(tenant, &path)
            .send()
            .await
            .map_err(unavailable)?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(RecipientError::GroupNotFound {
                tenant: tenant.to_string(),
                group_id,
            }),
            status if status.is_success() => response.json::<Group>().await.map_err(unavailable),
            status => {
                warn!(status = %status, group_id = %group_id, "RBAC group lookup failed");
                Err(RecipientError::DirectoryUnavailable(format!(
                    "RBAC responded with {}",
                    status
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn client_for(server: &MockServer, psk: Option<&str>) -> RbacClient {
        let config = RbacConfig {
            url: server.base_url(),
            psk: psk.map(str::to_string),
            ..RbacConfig::default()
        };
        RbacClient::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_users_page() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/rbac/v1/principals/")
                    .query_param("admin_only", "true")
                    .query_param("offset", "40")
                    .query_param("limit", "20")
                    .header("x-rh-rbac-account", "acct")
                    .header("x-rh-rbac-client-id", "notifications")
                    .header("x-rh-rbac-psk", "secret");
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(json!({
                        "meta": {"count": 41, "limit": 20, "offset": 40},
                        "links": {},
                        "data": [{
                            "username": "admin-user",
                            "email": "admin@example.com",
                            "first_name": "Ada",
                            "last_name": "Min",
                            "is_active": true,
                            "is_org_admin": true
                        }]
                    }));
            })
            .await;

        let client = client_for(&server, Some("secret"));
        let page = client.fetch_users_page("acct", true, 40, 20).await.unwrap();

        mock.assert_async().await;
        assert_eq!(page.len(), 1);
        assert_eq!(page.data[0].username, "admin-user");
        assert!(page.data[0].org_admin);
        assert_eq!(page.meta.count, Some(41));
    }

    #[tokio::test]
    async fn test_fetch_group_users_page() {
        let server = MockServer::start_async().await;
        let group_id = Uuid::new_v4();
        let path = format!("/api/rbac/v1/groups/{}/principals/", group_id);
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path(path.as_str())
                    .query_param("offset", "0")
                    .query_param("limit", "20");
                then.status(200)
                    .json_body(json!({"data": [{"username": "member"}]}));
            })
            .await;

        let client = client_for(&server, None);
        let page = client
            .fetch_group_users_page("acct", group_id, 0, 20)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(page.data[0].username, "member");
    }

    #[tokio::test]
    async fn test_server_error_is_unavailable() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/rbac/v1/principals/");
                then.status(503);
            })
            .await;

        let client = client_for(&server, None);
        let err = client
            .fetch_users_page("acct", false, 0, 20)
            .await
            .unwrap_err();
        assert!(matches!(err, RecipientError::DirectoryUnavailable(_)));
    }

    #[tokio::test]
    async fn test_malformed_body_is_unavailable() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/rbac/v1/principals/");
                then.status(200).body("not json");
            })
            .await;

        let client = client_for(&server, None);
        let err = client
            .fetch_users_page("acct", false, 0, 20)
            .await
            .unwrap_err();
        assert!(matches!(err, RecipientError::DirectoryUnavailable(_)));
    }

    #[tokio::test]
    async fn test_fetch_group() {
        let server = MockServer::start_async().await;
        let group_id = Uuid::new_v4();
        let path = format!("/api/rbac/v1/groups/{}/", group_id);
        server
            .mock_async(|when, then| {
                when.method(GET).path(path.as_str());
                then.status(200).json_body(json!({
                    "uuid": group_id.to_string(),
                    "name": "Default access",
                    "platform_default": true
                }));
            })
            .await;

        let client = client_for(&server, None);
        let group = client.fetch_group("acct", group_id).await.unwrap();
        assert_eq!(group.uuid, group_id);
        assert!(group.platform_default);
    }

    #[tokio::test]
    async fn test_missing_group() {
        let server = MockServer::start_async().await;
        let group_id = Uuid::new_v4();
        server
            .mock_async(|when, then| {
                when.method(GET);
                then.status(404);
            })
            .await;

        let client = client_for(&server, None);
        let err = client.fetch_group("acct", group_id).await.unwrap_err();
        assert_eq!(
            err,
            RecipientError::GroupNotFound {
                tenant: "acct".to_string(),
                group_id
            }
        );
    }
}
