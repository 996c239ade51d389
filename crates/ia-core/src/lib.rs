//! # ia-core
//!
//! Assignment normalization and aggregation engine.
//!
//! For every managed object in a device-management tenant (configuration
//! profiles, compliance policies, applications, scripts, protection policies)
//! this crate determines which groups the object targets and whether each
//! target is an inclusion or an exclusion, producing one uniform edge list.
//!
//! ## Pipeline
//!
//! ```text
//! ResourceCollector ──▶ AssignmentNormalizer ──▶ InventoryPipeline ──▶ exporters
//!   (per kind)            │ (per object)          (kind-ordered union)
//!                         ▼
//!                 CachingGroupResolver (shared per run)
//! ```
//!
//! Failures never escape a collector. Whatever made a run incomplete is
//! recorded in [`RunDiagnostics`] and logged through `tracing`.

pub mod collector;
pub mod diagnostics;
pub mod error;
pub mod model;
pub mod normalizer;
pub mod pipeline;
pub mod resolver;

pub use collector::{catalog_endpoints, ResourceCollector};
pub use diagnostics::{Diagnostic, DiagnosticScope, KindStats, RunDiagnostics, RunSummary};
pub use error::{CoreError, ResolveError};
pub use model::{
    AssignmentEdge, AssignmentMode, AssignmentTarget, GroupIdentity, ManagedObject, ResourceKind,
    TargetKind, ALL_DEVICES_NAME, ALL_USERS_NAME,
};
pub use normalizer::AssignmentNormalizer;
pub use pipeline::{InventoryPipeline, PipelineConfig, RunReport};
pub use resolver::{CachingGroupResolver, GroupResolver, ResolverConfig};
