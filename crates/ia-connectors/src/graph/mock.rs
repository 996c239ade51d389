//! In-memory directory for testing.
//!
//! Serves raw managed objects per collection and directory groups by id,
//! counts every fetch, and can be told to fail or to respond slowly.

use crate::traits::{
    Connector, ConnectorError, ConnectorHealth, ConnectorResult, DirectoryGroup, GroupSource,
    ObjectSource,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub struct MockDirectory {
    name: String,
    collections: HashMap<String, Vec<serde_json::Value>>,
    groups: HashMap<String, DirectoryGroup>,
    failing_collections: HashMap<String, ConnectorError>,
    failing_groups: HashMap<String, ConnectorError>,
    group_latency: Option<Duration>,
    object_fetches: AtomicUsize,
    group_fetches: AtomicUsize,
    group_fetches_by_id: std::sync::Mutex<HashMap<String, usize>>,
}

impl MockDirectory {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            collections: HashMap::new(),
            groups: HashMap::new(),
            failing_collections: HashMap::new(),
            failing_groups: HashMap::new(),
            group_latency: None,
            object_fetches: AtomicUsize::new(0),
            group_fetches: AtomicUsize::new(0),
            group_fetches_by_id: std::sync::Mutex::new(HashMap::new()),
        }
    }

    /// Adds raw objects to a collection (appended after existing ones).
    pub fn with_objects(mut self, endpoint: &str, objects: Vec<serde_json::Value>) -> Self {
        self.collections
            .entry(endpoint.to_string())
            .or_default()
            .extend(objects);
        self
    }

    pub fn with_group(mut self, id: &str, display_name: &str) -> Self {
        self.groups.insert(
            id.to_string(),
            DirectoryGroup {
                id: id.to_string(),
                display_name: Some(display_name.to_string()),
            },
        );
        self
    }

    /// Makes every fetch of `endpoint` fail with `error`.
    pub fn with_failing_collection(mut self, endpoint: &str, error: ConnectorError) -> Self {
        self.failing_collections.insert(endpoint.to_string(), error);
        self
    }

    /// Makes every lookup of `group_id` fail with `error`.
    pub fn with_failing_group(mut self, group_id: &str, error: ConnectorError) -> Self {
        self.failing_groups.insert(group_id.to_string(), error);
        self
    }

    /// Delays every group lookup.
    pub fn with_group_latency(mut self, latency: Duration) -> Self {
        self.group_latency = Some(latency);
        self
    }

    pub fn object_fetch_count(&self) -> usize {
        self.object_fetches.load(Ordering::SeqCst)
    }

    pub fn group_fetch_count(&self) -> usize {
        self.group_fetches.load(Ordering::SeqCst)
    }

    /// Number of lookups issued for one group id.
    pub fn group_fetch_count_for(&self, group_id: &str) -> usize {
        self.group_fetches_by_id
            .lock()
            .map(|counts| counts.get(group_id).copied().unwrap_or(0))
            .unwrap_or(0)
    }
}

#[async_trait]
impl Connector for MockDirectory {
    fn name(&self) -> &str {
        &self.name
    }

    fn connector_type(&self) -> &str {
        "mock"
    }

    async fn health_check(&self) -> ConnectorResult<ConnectorHealth> {
        Ok(ConnectorHealth::Healthy)
    }

}

#[async_trait]
impl ObjectSource for MockDirectory {
    async fn fetch_objects(&self, endpoint: &str) -> ConnectorResult<Vec<serde_json::Value>> {
        self.object_fetches.fetch_add(1, Ordering::SeqCst);

        if let Some(error) = self.failing_collections.get(endpoint) {
            return Err(error.clone());
        }

        Ok(self.collections.get(endpoint).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl GroupSource for MockDirectory {
    async fn fetch_group(&self, group_id: &str) -> ConnectorResult<DirectoryGroup> {
        self.group_fetches.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut counts) = self.group_fetches_by_id.lock() {
            *counts.entry(group_id.to_string()).or_insert(0) += 1;
        }

        if let Some(latency) = self.group_latency {
            tokio::time::sleep(latency).await;
        }

        if let Some(error) = self.failing_groups.get(group_id) {
            return Err(error.clone());
        }

        self.groups
            .get(group_id)
            .cloned()
            .ok_or_else(|| ConnectorError::NotFound(format!("Group {} not found", group_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::raw_object;

    #[tokio::test]
    async fn test_serves_collections_and_counts() {
        let mock = MockDirectory::new("mock").with_objects(
            "deviceManagement/deviceConfigurations",
            vec![raw_object("p1", Some("Baseline"), None, &[])],
        );

        let objects = mock
            .fetch_objects("deviceManagement/deviceConfigurations")
            .await
            .unwrap();
        assert_eq!(objects.len(), 1);
        assert!(mock.fetch_objects("unknown").await.unwrap().is_empty());
        assert_eq!(mock.object_fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_group_lookup_and_missing_group() {
        let mock = MockDirectory::new("mock").with_group("g1", "Finance");

        let group = mock.fetch_group("g1").await.unwrap();
        assert_eq!(group.display_name.as_deref(), Some("Finance"));

        let missing = mock.fetch_group("g2").await;
        assert!(matches!(missing, Err(ConnectorError::NotFound(_))));

        assert_eq!(mock.group_fetch_count(), 2);
        assert_eq!(mock.group_fetch_count_for("g1"), 1);
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let mock = MockDirectory::new("mock")
            .with_group("g1", "Finance")
            .with_failing_group("g1", ConnectorError::AuthorizationDenied("Forbidden".into()))
            .with_failing_collection(
                "deviceAppManagement/mobileApps",
                ConnectorError::ConnectionFailed("down".into()),
            );

        assert!(matches!(
            mock.fetch_group("g1").await,
            Err(ConnectorError::AuthorizationDenied(_))
        ));
        assert!(matches!(
            mock.fetch_objects("deviceAppManagement/mobileApps").await,
            Err(ConnectorError::ConnectionFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_reports_healthy() {
        let mock = MockDirectory::new("mock");
        assert_eq!(mock.health_check().await, Ok(ConnectorHealth::Healthy));
        assert_eq!(mock.connector_type(), "mock");
    }
}
