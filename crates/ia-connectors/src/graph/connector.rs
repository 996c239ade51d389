//! Microsoft Graph connector.
//!
//! Enumerates device-management collections with their assignments expanded
//! and resolves directory groups by id.

use crate::http::{HttpClient, RateLimitConfig};
use crate::traits::{
    Connector, ConnectorConfig, ConnectorError, ConnectorHealth, ConnectorResult,
    DirectoryGroup, GroupSource, ObjectSource,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Default Graph API root.
pub const GRAPH_BASE_URL: &str = "https://graph.microsoft.com";

/// Scope requested for application permissions.
pub const GRAPH_DEFAULT_SCOPE: &str = "https://graph.microsoft.com/.default";

/// Upper bound on followed `@odata.nextLink` pages for one collection.
const MAX_PAGES: usize = 1000;

/// Graph-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Base connector configuration.
    #[serde(flatten)]
    pub connector: ConnectorConfig,
    /// Azure AD tenant ID.
    pub tenant_id: String,
    /// API version used for device-management collections.
    #[serde(default = "default_management_version")]
    pub management_api_version: String,
    /// Requests per minute allowed against Graph.
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,
}

fn default_management_version() -> String {
    "beta".to_string()
}

fn default_requests_per_minute() -> u32 {
    600
}

/// Microsoft Graph connector.
pub struct GraphConnector {
    config: GraphConfig,
    client: HttpClient,
}

impl GraphConnector {
    /// Creates a new Graph connector.
    pub fn new(config: GraphConfig) -> ConnectorResult<Self> {
        let mut connector_config = config.connector.clone();
        if connector_config.base_url.is_empty() {
            connector_config.base_url = GRAPH_BASE_URL.to_string();
        }

        let rate_limit = RateLimitConfig {
            max_requests: config.requests_per_minute.max(1),
            period: Duration::from_secs(60),
            burst_size: 20,
        };
        let client = HttpClient::with_rate_limit(connector_config, Some(rate_limit))?;

        info!(
            "Graph connector initialized for tenant '{}' at {}",
            config.tenant_id,
            client.base_url()
        );

        Ok(Self { config, client })
    }

    /// Path of a management collection with assignments expanded.
    fn collection_path(&self, endpoint: &str) -> String {
        format!(
            "/{}/{}?$expand=assignments",
            self.config.management_api_version,
            endpoint.trim_matches('/')
        )
    }

    fn group_path(group_id: &str) -> String {
        format!(
            "/v1.0/groups/{}?$select=id,displayName",
            urlencoding::encode(group_id)
        )
    }
}

#[async_trait]
impl Connector for GraphConnector {
    fn name(&self) -> &str {
        &self.config.connector.name
    }

    fn connector_type(&self) -> &str {
        "graph"
    }

    async fn health_check(&self) -> ConnectorResult<ConnectorHealth> {
        match self.client.get("/v1.0/organization?$select=id").await {
            Ok(response) if response.status().is_success() => Ok(ConnectorHealth::Healthy),
            Ok(_) => Ok(ConnectorHealth::Degraded("Unexpected response".to_string())),
            // The token was accepted; only the probe read is not permitted.
            Err(ConnectorError::AuthorizationDenied(_)) => Ok(ConnectorHealth::Degraded(
                "Authenticated, but Organization.Read.All is not granted".to_string(),
            )),
            Err(ConnectorError::AuthenticationFailed(e)) => Ok(ConnectorHealth::Unhealthy(
                format!("Authentication failed: {}", e),
            )),
            Err(ConnectorError::ConnectionFailed(e)) => Ok(ConnectorHealth::Unhealthy(format!(
                "Connection failed: {}",
                e
            ))),
            Err(e) => Ok(ConnectorHealth::Unhealthy(e.to_string())),
        }
    }
}

#[async_trait]
impl ObjectSource for GraphConnector {
    #[instrument(skip(self))]
    async fn fetch_objects(&self, endpoint: &str) -> ConnectorResult<Vec<serde_json::Value>> {
        let client = &self.client;
        let (objects, pages) = follow_pages(
            self.collection_path(endpoint),
            MAX_PAGES,
            |link| client.is_same_origin(link),
            move |path| async move { client.get_json::<GraphPage>(&path).await },
        )
        .await?;

        debug!(endpoint, pages, count = objects.len(), "Fetched collection");
        Ok(objects)
    }
}

/// Reads `first` and every page reachable through `@odata.nextLink`,
/// concatenating values in page order. Returns the values and the number of
/// pages read.
///
/// A link rejected by `same_origin` fails the whole enumeration, as does a
/// collection with more than `max_pages` pages.
async fn follow_pages<O, F, Fut>(
    first: String,
    max_pages: usize,
    same_origin: O,
    mut fetch_page: F,
) -> ConnectorResult<(Vec<serde_json::Value>, usize)>
where
    O: Fn(&str) -> bool,
    F: FnMut(String) -> Fut,
    Fut: Future<Output = ConnectorResult<GraphPage>>,
{
    let mut objects = Vec::new();
    let mut next = Some(first);
    let mut pages = 0usize;

    while let Some(path) = next.take() {
        let page = fetch_page(path).await?;
        objects.extend(page.value);
        pages += 1;

        next = match page.next_link {
            Some(_) if pages >= max_pages => {
                return Err(ConnectorError::PageLimitExceeded(max_pages));
            }
            Some(link) if same_origin(&link) => Some(link),
            Some(link) => {
                return Err(ConnectorError::InvalidResponse(format!(
                    "Refusing to follow nextLink to another origin: {}",
                    link
                )));
            }
            None => None,
        };
    }

    Ok((objects, pages))
}

#[async_trait]
impl GroupSource for GraphConnector {
    #[instrument(skip(self))]
    async fn fetch_group(&self, group_id: &str) -> ConnectorResult<DirectoryGroup> {
        self.client
            .get_json(&Self::group_path(group_id))
            .await
            .map_err(|e| match e {
                ConnectorError::NotFound(_) => {
                    ConnectorError::NotFound(format!("Group {} not found", group_id))
                }
                other => other,
            })
    }
}

/// One page of a Graph collection.
#[derive(Debug, Clone, Deserialize)]
struct GraphPage {
    #[serde(default)]
    value: Vec<serde_json::Value>,
    #[serde(rename = "@odata.nextLink", default)]
    next_link: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::test_connector_config;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn create_test_config() -> GraphConfig {
        GraphConfig {
            connector: test_connector_config("graph-test", "https://graph.example.com"),
            tenant_id: "tenant-12345".to_string(),
            management_api_version: default_management_version(),
            requests_per_minute: default_requests_per_minute(),
        }
    }

    #[test]
    fn test_connector_creation() {
        let connector = GraphConnector::new(create_test_config()).unwrap();
        assert_eq!(connector.name(), "graph-test");
        assert_eq!(connector.connector_type(), "graph");
    }

    #[test]
    fn test_collection_path_expands_assignments() {
        let connector = GraphConnector::new(create_test_config()).unwrap();
        assert_eq!(
            connector.collection_path("deviceManagement/deviceConfigurations"),
            "/beta/deviceManagement/deviceConfigurations?$expand=assignments"
        );
        assert_eq!(
            connector.collection_path("/deviceAppManagement/mobileApps/"),
            "/beta/deviceAppManagement/mobileApps?$expand=assignments"
        );
    }

    #[test]
    fn test_group_path_encodes_id() {
        assert_eq!(
            GraphConnector::group_path("a b"),
            "/v1.0/groups/a%20b?$select=id,displayName"
        );
    }

    #[test]
    fn test_page_deserialize() {
        let page: GraphPage = serde_json::from_str(
            r#"{"value":[{"id":"1"}],"@odata.nextLink":"https://graph.example.com/beta/x?$skiptoken=2"}"#,
        )
        .unwrap();
        assert_eq!(page.value.len(), 1);
        assert!(page.next_link.is_some());

        let last: GraphPage = serde_json::from_str(r#"{"value":[]}"#).unwrap();
        assert!(last.next_link.is_none());
    }

    #[test]
    fn test_config_defaults_from_yaml_like_json() {
        let config: GraphConfig = serde_json::from_value(serde_json::json!({
            "name": "graph",
            "base_url": "",
            "auth": {"type": "none"},
            "timeout_secs": 30,
            "max_retries": 2,
            "verify_tls": true,
            "headers": {},
            "tenant_id": "t"
        }))
        .unwrap();
        assert_eq!(config.management_api_version, "beta");
        assert_eq!(config.requests_per_minute, 600);

        let connector = GraphConnector::new(config).unwrap();
        assert_eq!(connector.client.base_url(), GRAPH_BASE_URL);
    }

    const ORIGIN: &str = "https://graph.example.com/";

    fn page(ids: &[&str], next_link: Option<&str>) -> GraphPage {
        GraphPage {
            value: ids.iter().map(|id| json!({ "id": id })).collect(),
            next_link: next_link.map(str::to_string),
        }
    }

    fn ids(objects: &[serde_json::Value]) -> Vec<&str> {
        objects.iter().filter_map(|o| o["id"].as_str()).collect()
    }

    async fn read_pages(
        pages: &HashMap<String, GraphPage>,
        max_pages: usize,
        fetches: &AtomicUsize,
    ) -> ConnectorResult<(Vec<serde_json::Value>, usize)> {
        follow_pages(
            "/beta/items".to_string(),
            max_pages,
            |link| link.starts_with(ORIGIN),
            |path| {
                fetches.fetch_add(1, Ordering::SeqCst);
                let page = pages
                    .get(&path)
                    .cloned()
                    .ok_or_else(|| ConnectorError::NotFound(path.clone()));
                async move { page }
            },
        )
        .await
    }

    #[tokio::test]
    async fn test_follow_pages_concatenates_in_order() {
        let mut pages = HashMap::new();
        pages.insert(
            "/beta/items".to_string(),
            page(&["1", "2"], Some("https://graph.example.com/beta/items?$skiptoken=a")),
        );
        pages.insert(
            "https://graph.example.com/beta/items?$skiptoken=a".to_string(),
            page(&["3"], None),
        );
        let fetches = AtomicUsize::new(0);

        let (objects, count) = read_pages(&pages, MAX_PAGES, &fetches).await.unwrap();

        assert_eq!(ids(&objects), vec!["1", "2", "3"]);
        assert_eq!(count, 2);
        assert_eq!(fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_follow_pages_rejects_other_origin() {
        let mut pages = HashMap::new();
        pages.insert(
            "/beta/items".to_string(),
            page(&["1"], Some("https://attacker.example.net/beta/items?$skiptoken=a")),
        );
        let fetches = AtomicUsize::new(0);

        let result = read_pages(&pages, MAX_PAGES, &fetches).await;

        assert!(matches!(result, Err(ConnectorError::InvalidResponse(_))));
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_follow_pages_stops_at_page_limit() {
        let looping = "https://graph.example.com/beta/items?$skiptoken=loop";
        let mut pages = HashMap::new();
        pages.insert("/beta/items".to_string(), page(&["1"], Some(looping)));
        pages.insert(looping.to_string(), page(&["2"], Some(looping)));
        let fetches = AtomicUsize::new(0);

        let result = read_pages(&pages, 3, &fetches).await;

        assert_eq!(result, Err(ConnectorError::PageLimitExceeded(3)));
        assert_eq!(fetches.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_follow_pages_propagates_fetch_error() {
        let pages = HashMap::new();
        let fetches = AtomicUsize::new(0);

        let result = read_pages(&pages, MAX_PAGES, &fetches).await;

        assert!(matches!(result, Err(ConnectorError::NotFound(_))));
    }
}
