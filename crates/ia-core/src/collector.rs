//! Resource collectors.
//!
//! One collector type serves every kind; what differs between kinds is the
//! list of collections to enumerate. Multi-collection kinds are unioned in
//! catalog order as if they were one collection.

use crate::error::CoreError;
use crate::model::{AssignmentEdge, ManagedObject, ResourceKind};
use crate::normalizer::AssignmentNormalizer;
use ia_connectors::ObjectSource;
use tracing::{debug, info, instrument};

/// Collections enumerated for each kind, relative to the management API root.
pub fn catalog_endpoints(kind: ResourceKind) -> &'static [&'static str] {
    match kind {
        ResourceKind::ConfigurationProfile => &[
            "deviceManagement/deviceConfigurations",
            "deviceManagement/configurationPolicies",
            "deviceManagement/groupPolicyConfigurations",
        ],
        ResourceKind::CompliancePolicy => &["deviceManagement/deviceCompliancePolicies"],
        ResourceKind::Application => &["deviceAppManagement/mobileApps"],
        ResourceKind::RemediationScript => &["deviceManagement/deviceHealthScripts"],
        ResourceKind::PlatformScript => &["deviceManagement/deviceManagementScripts"],
        ResourceKind::ShellScript => &["deviceManagement/deviceShellScripts"],
        ResourceKind::ProtectionPolicy => &[
            "deviceAppManagement/iosManagedAppProtections",
            "deviceAppManagement/androidManagedAppProtections",
            "deviceAppManagement/windowsManagedAppProtections",
            "deviceAppManagement/mdmWindowsInformationProtectionPolicies",
        ],
    }
}

/// Collects the assignment edges of one resource kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceCollector {
    kind: ResourceKind,
    endpoints: Vec<String>,
}

impl ResourceCollector {
    /// Collector over the catalog collections of `kind`.
    pub fn for_kind(kind: ResourceKind) -> Self {
        Self {
            kind,
            endpoints: catalog_endpoints(kind).iter().map(|e| e.to_string()).collect(),
        }
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Enumerates every collection and normalizes each object in order.
    ///
    /// A collection that cannot be enumerated contributes nothing; the
    /// failure is recorded and the remaining collections are still read.
    #[instrument(skip(self, source, normalizer), fields(kind = %self.kind))]
    pub async fn collect(
        &self,
        source: &dyn ObjectSource,
        normalizer: &AssignmentNormalizer,
    ) -> Vec<AssignmentEdge> {
        let diagnostics = normalizer.diagnostics();
        diagnostics.register_kind(self.kind);

        let mut edges = Vec::new();
        let mut objects = 0usize;

        for endpoint in &self.endpoints {
            let raw_objects = match source.fetch_objects(endpoint).await {
                Ok(raw_objects) => raw_objects,
                Err(error) => {
                    diagnostics.record_core_error(
                        self.kind,
                        &CoreError::Enumeration {
                            endpoint: endpoint.clone(),
                            source: error,
                        },
                    );
                    continue;
                }
            };

            debug!(endpoint = %endpoint, count = raw_objects.len(), "Enumerated collection");

            for raw in raw_objects {
                let (object, targets) = match ManagedObject::from_raw(self.kind, raw) {
                    Ok(parsed) => parsed,
                    Err(e) => {
                        diagnostics.record_core_error(
                            self.kind,
                            &CoreError::MalformedObject {
                                endpoint: endpoint.clone(),
                                message: e.to_string(),
                            },
                        );
                        continue;
                    }
                };

                objects += 1;
                edges.extend(normalizer.normalize(&object, &targets).await);
            }
        }

        info!(
            kind = %self.kind,
            objects,
            edges = edges.len(),
            "Collected assignments"
        );
        edges
    }
}
