//! Reduces an object's raw assignment targets to assignment edges.

use crate::diagnostics::RunDiagnostics;
use crate::model::{AssignmentEdge, AssignmentTarget, ManagedObject};
use crate::resolver::GroupResolver;
use std::sync::Arc;

/// Turns (object, targets) into edges, one per resolvable target.
#[derive(Clone)]
pub struct AssignmentNormalizer {
    resolver: Arc<dyn GroupResolver>,
    diagnostics: Arc<RunDiagnostics>,
}

impl AssignmentNormalizer {
    pub fn new(resolver: Arc<dyn GroupResolver>, diagnostics: Arc<RunDiagnostics>) -> Self {
        Self {
            resolver,
            diagnostics,
        }
    }

    pub fn diagnostics(&self) -> &Arc<RunDiagnostics> {
        &self.diagnostics
    }

    /// Emits edges in target order. Targets whose group cannot be resolved
    /// are dropped and recorded; they never fail the object.
    pub async fn normalize(
        &self,
        object: &ManagedObject,
        targets: &[AssignmentTarget],
    ) -> Vec<AssignmentEdge> {
        let mut edges = Vec::with_capacity(targets.len());

        for target in targets {
            match self.resolver.resolve(target).await {
                Ok(group) => edges.push(AssignmentEdge::new(object, group, target.mode())),
                Err(error) => self.diagnostics.record_dropped_target(
                    object.kind,
                    object.object_name(),
                    target,
                    &error,
                ),
            }
        }

        self.diagnostics
            .record_object(object.kind, targets.len(), edges.len());
        edges
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AssignmentMode, ResourceKind, TargetKind};
    use crate::resolver::{CachingGroupResolver, ResolverConfig};
    use ia_connectors::{ConnectorError, MockDirectory};

    fn normalizer_over(mock: MockDirectory) -> AssignmentNormalizer {
        let resolver = CachingGroupResolver::new(Arc::new(mock), &ResolverConfig::default());
        AssignmentNormalizer::new(Arc::new(resolver), Arc::new(RunDiagnostics::new()))
    }

    fn profile(display_name: Option<&str>, name: Option<&str>) -> ManagedObject {
        ManagedObject {
            id: "p1".into(),
            display_name: display_name.map(String::from),
            name: name.map(String::from),
            kind: ResourceKind::ConfigurationProfile,
        }
    }

    #[tokio::test]
    async fn test_baseline_profile() {
        let normalizer = normalizer_over(MockDirectory::new("mock").with_group("g1", "Finance"));
        let edges = normalizer
            .normalize(
                &profile(Some("Baseline"), None),
                &[AssignmentTarget::all_devices(), AssignmentTarget::exclude("g1")],
            )
            .await;

        assert_eq!(
            edges,
            vec![
                AssignmentEdge {
                    object_name: "Baseline".into(),
                    object_kind: ResourceKind::ConfigurationProfile,
                    group_id: None,
                    group_name: "All Devices".into(),
                    mode: AssignmentMode::Included,
                },
                AssignmentEdge {
                    object_name: "Baseline".into(),
                    object_kind: ResourceKind::ConfigurationProfile,
                    group_id: Some("g1".into()),
                    group_name: "Finance".into(),
                    mode: AssignmentMode::Excluded,
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_modes_follow_discriminator() {
        let normalizer = normalizer_over(
            MockDirectory::new("mock")
                .with_group("g1", "Finance")
                .with_group("g2", "Sales"),
        );
        let targets = vec![
            AssignmentTarget::all_users(),
            AssignmentTarget::include("g1"),
            AssignmentTarget::exclude("g2"),
            AssignmentTarget {
                kind: TargetKind::Other("#microsoft.graph.futureAssignmentTarget".into()),
                group_id: Some("g1".into()),
            },
        ];

        let edges = normalizer.normalize(&profile(Some("Wifi"), None), &targets).await;
        let modes: Vec<AssignmentMode> = edges.iter().map(|e| e.mode).collect();
        assert_eq!(
            modes,
            vec![
                AssignmentMode::Included,
                AssignmentMode::Included,
                AssignmentMode::Excluded,
                AssignmentMode::Included,
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_target_is_dropped_and_recorded() {
        let normalizer = normalizer_over(
            MockDirectory::new("mock")
                .with_group("g1", "Finance")
                .with_failing_group("bad", ConnectorError::Timeout("slow".into())),
        );
        let targets = vec![
            AssignmentTarget::include("bad"),
            AssignmentTarget::include("g1"),
            AssignmentTarget::all_devices(),
        ];

        let edges = normalizer.normalize(&profile(Some("VPN"), None), &targets).await;
        assert_eq!(edges.len(), 2);
        assert_eq!(edges[0].group_name, "Finance");
        assert_eq!(edges[1].group_name, "All Devices");

        let summary = normalizer.diagnostics().summary();
        let stats = summary.stats(ResourceKind::ConfigurationProfile);
        assert_eq!(stats.targets, 3);
        assert_eq!(stats.edges, 2);
        assert_eq!(stats.dropped_targets, 1);
    }

    #[tokio::test]
    async fn test_name_fallback() {
        let normalizer = normalizer_over(MockDirectory::new("mock"));
        let edges = normalizer
            .normalize(
                &profile(Some(""), Some("Fallback1")),
                &[AssignmentTarget::all_users()],
            )
            .await;
        assert_eq!(edges[0].object_name, "Fallback1");
    }

    #[tokio::test]
    async fn test_nameless_object_still_produces_edges() {
        let normalizer = normalizer_over(MockDirectory::new("mock"));
        let edges = normalizer
            .normalize(&profile(None, None), &[AssignmentTarget::all_devices()])
            .await;
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].object_name, "");
    }

    #[tokio::test]
    async fn test_no_targets_no_edges() {
        let normalizer = normalizer_over(MockDirectory::new("mock"));
        let edges = normalizer.normalize(&profile(Some("Empty"), None), &[]).await;
        assert!(edges.is_empty());
        assert!(normalizer.diagnostics().summary().is_complete());
    }
}
