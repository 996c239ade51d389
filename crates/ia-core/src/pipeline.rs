//! Aggregation pipeline.
//!
//! Runs the requested collectors against one fresh resolver and concatenates
//! their edges in kind order. Collectors may run concurrently; their results
//! are slotted by kind, never by completion order.

use crate::collector::ResourceCollector;
use crate::diagnostics::{RunDiagnostics, RunSummary};
use crate::error::CoreError;
use crate::model::{AssignmentEdge, ResourceKind};
use crate::normalizer::AssignmentNormalizer;
use crate::resolver::{CachingGroupResolver, ResolverConfig};
use chrono::{DateTime, Utc};
use ia_connectors::{GroupSource, ObjectSource};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Pipeline settings, passed in at construction.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Bound on each group lookup.
    pub resolve_timeout: Duration,
    /// Maximum number of cached groups per run.
    pub cache_capacity: u64,
    /// Run collectors for different kinds concurrently.
    pub parallel_kinds: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let resolver = ResolverConfig::default();
        Self {
            resolve_timeout: resolver.lookup_timeout,
            cache_capacity: resolver.cache_capacity,
            parallel_kinds: true,
        }
    }
}

impl PipelineConfig {
    fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig {
            lookup_timeout: self.resolve_timeout,
            cache_capacity: self.cache_capacity,
        }
    }
}

/// Result of one aggregation pass.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Kinds collected, in export order.
    pub kinds: Vec<ResourceKind>,
    /// Ordered aggregate.
    pub edges: Vec<AssignmentEdge>,
    /// Group lookups issued against the directory.
    pub group_lookups: usize,
    pub summary: RunSummary,
}

impl RunReport {
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}

/// Assignment inventory pipeline over an object source and a group source.
pub struct InventoryPipeline {
    objects: Arc<dyn ObjectSource>,
    groups: Arc<dyn GroupSource>,
    collectors: BTreeMap<ResourceKind, ResourceCollector>,
    config: PipelineConfig,
}

impl InventoryPipeline {
    pub fn new(
        objects: Arc<dyn ObjectSource>,
        groups: Arc<dyn GroupSource>,
        config: PipelineConfig,
    ) -> Self {
        let collectors = ResourceKind::ALL
            .into_iter()
            .map(|kind| (kind, ResourceCollector::for_kind(kind)))
            .collect();

        Self {
            objects,
            groups,
            collectors,
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Collects a single kind.
    pub async fn collect(&self, kind: ResourceKind) -> RunReport {
        self.aggregate_all(&[kind]).await
    }

    /// Collects every kind.
    pub async fn collect_everything(&self) -> RunReport {
        self.aggregate_all(&ResourceKind::ALL).await
    }

    /// Collects the requested kinds and concatenates their edges in kind
    /// order, whatever order they were requested in. Duplicates are
    /// collected once.
    pub async fn aggregate_all(&self, kinds: &[ResourceKind]) -> RunReport {
        let started_at = Utc::now();

        let mut kinds = kinds.to_vec();
        kinds.sort();
        kinds.dedup();

        let diagnostics = Arc::new(RunDiagnostics::new());
        let resolver = Arc::new(CachingGroupResolver::new(
            self.groups.clone(),
            &self.config.resolver_config(),
        ));
        let normalizer = AssignmentNormalizer::new(resolver.clone(), diagnostics.clone());

        let collectors: Vec<ResourceCollector> = kinds
            .iter()
            .filter_map(|kind| self.collectors.get(kind).cloned())
            .collect();

        info!(
            kinds = collectors.len(),
            parallel = self.config.parallel_kinds,
            "Starting assignment collection"
        );

        let per_kind = if self.config.parallel_kinds {
            self.run_parallel(collectors, &normalizer).await
        } else {
            self.run_sequential(collectors, &normalizer).await
        };

        let edges: Vec<AssignmentEdge> = per_kind.into_iter().flatten().collect();
        let summary = diagnostics.summary();

        if !summary.is_complete() {
            warn!(
                problems = summary.diagnostics.len(),
                "Collection finished with skipped items"
            );
        }
        info!(
            edges = edges.len(),
            objects = summary.totals.objects,
            group_lookups = resolver.lookup_count(),
            "Collection finished"
        );

        RunReport {
            started_at,
            finished_at: Utc::now(),
            kinds,
            edges,
            group_lookups: resolver.lookup_count(),
            summary,
        }
    }

    async fn run_sequential(
        &self,
        collectors: Vec<ResourceCollector>,
        normalizer: &AssignmentNormalizer,
    ) -> Vec<Vec<AssignmentEdge>> {
        let mut per_kind = Vec::with_capacity(collectors.len());
        for collector in collectors {
            per_kind.push(collector.collect(self.objects.as_ref(), normalizer).await);
        }
        per_kind
    }

    async fn run_parallel(
        &self,
        collectors: Vec<ResourceCollector>,
        normalizer: &AssignmentNormalizer,
    ) -> Vec<Vec<AssignmentEdge>> {
        let mut handles = Vec::with_capacity(collectors.len());

        for collector in collectors {
            let kind = collector.kind();
            let objects = self.objects.clone();
            let normalizer = normalizer.clone();
            let handle = tokio::spawn(async move {
                collector.collect(objects.as_ref(), &normalizer).await
            });
            handles.push((kind, handle));
        }

        // Awaited in kind order so the output never depends on which
        // collector finished first.
        let mut per_kind = Vec::with_capacity(handles.len());
        for (kind, handle) in handles {
            match handle.await {
                Ok(edges) => per_kind.push(edges),
                Err(e) => {
                    normalizer
                        .diagnostics()
                        .record_core_error(kind, &CoreError::Task(e.to_string()));
                    per_kind.push(Vec::new());
                }
            }
        }
        per_kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ALL_DEVICES_TARGET, ALL_USERS_TARGET};
    use ia_connectors::testing::raw_object;
    use ia_connectors::MockDirectory;

    fn pipeline(mock: MockDirectory, parallel_kinds: bool) -> InventoryPipeline {
        let mock = Arc::new(mock);
        InventoryPipeline::new(
            mock.clone(),
            mock,
            PipelineConfig {
                parallel_kinds,
                ..Default::default()
            },
        )
    }

    fn two_kind_directory() -> MockDirectory {
        MockDirectory::new("mock")
            .with_objects(
                "deviceManagement/deviceCompliancePolicies",
                vec![raw_object("c1", Some("Encryption"), None, &[(ALL_USERS_TARGET, None)])],
            )
            .with_objects(
                "deviceManagement/deviceShellScripts",
                vec![raw_object("s1", Some("Dock"), None, &[(ALL_DEVICES_TARGET, None)])],
            )
    }

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.resolve_timeout, Duration::from_secs(30));
        assert!(config.parallel_kinds);
    }

    #[tokio::test]
    async fn test_kind_order_ignores_request_order() {
        for parallel in [false, true] {
            let pipeline = pipeline(two_kind_directory(), parallel);

            let forward = pipeline
                .aggregate_all(&[ResourceKind::CompliancePolicy, ResourceKind::ShellScript])
                .await;
            let reversed = pipeline
                .aggregate_all(&[ResourceKind::ShellScript, ResourceKind::CompliancePolicy])
                .await;

            assert_eq!(forward.edge_count(), 2);
            assert_eq!(forward.edges, reversed.edges);
            assert_eq!(forward.edges[0].object_kind, ResourceKind::CompliancePolicy);
            assert_eq!(forward.edges[1].object_kind, ResourceKind::ShellScript);
        }
    }

    #[tokio::test]
    async fn test_duplicate_kinds_collected_once() {
        let pipeline = pipeline(two_kind_directory(), false);
        let report = pipeline
            .aggregate_all(&[ResourceKind::ShellScript, ResourceKind::ShellScript])
            .await;
        assert_eq!(report.kinds, vec![ResourceKind::ShellScript]);
        assert_eq!(report.edge_count(), 1);
    }

    #[tokio::test]
    async fn test_empty_request() {
        let pipeline = pipeline(MockDirectory::new("mock"), true);
        let report = pipeline.aggregate_all(&[]).await;
        assert!(report.edges.is_empty());
        assert!(report.kinds.is_empty());
        assert!(report.summary.is_complete());
    }
}
