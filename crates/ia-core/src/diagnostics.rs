//! Out-of-band run diagnostics.
//!
//! Collectors never return errors; everything that made a run incomplete is
//! recorded here and logged. The summary is what the CLI prints after a run.

use crate::error::{CoreError, ResolveError};
use crate::model::{AssignmentTarget, ResourceKind};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};
use tracing::warn;

/// Where a recorded problem happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum DiagnosticScope {
    /// A whole collection could not be enumerated.
    Source { endpoint: String },
    /// One raw object could not be parsed.
    Object { endpoint: String },
    /// One assignment target was dropped.
    Target {
        object_name: String,
        group_id: Option<String>,
    },
    /// A collector task died.
    Collector,
}

/// A single recorded problem.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub kind: ResourceKind,
    #[serde(flatten)]
    pub scope: DiagnosticScope,
    pub message: String,
}

/// Counters for one resource kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct KindStats {
    pub objects: usize,
    pub targets: usize,
    pub edges: usize,
    pub dropped_targets: usize,
    pub failed_sources: usize,
    pub malformed_objects: usize,
}

impl KindStats {
    fn add(&mut self, other: &KindStats) {
        self.objects += other.objects;
        self.targets += other.targets;
        self.edges += other.edges;
        self.dropped_targets += other.dropped_targets;
        self.failed_sources += other.failed_sources;
        self.malformed_objects += other.malformed_objects;
    }
}

/// Snapshot of a run's diagnostics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub per_kind: BTreeMap<ResourceKind, KindStats>,
    pub totals: KindStats,
    pub diagnostics: Vec<Diagnostic>,
}

impl RunSummary {
    /// True if nothing was skipped or failed.
    pub fn is_complete(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn stats(&self, kind: ResourceKind) -> KindStats {
        self.per_kind.get(&kind).cloned().unwrap_or_default()
    }
}

#[derive(Debug, Default)]
struct Inner {
    per_kind: BTreeMap<ResourceKind, KindStats>,
    diagnostics: Vec<Diagnostic>,
}

/// Shared, append-only diagnostics sink for one run.
#[derive(Debug, Default)]
pub struct RunDiagnostics {
    inner: Mutex<Inner>,
}

impl RunDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Makes sure the kind shows up in the summary even with zero objects.
    pub fn register_kind(&self, kind: ResourceKind) {
        self.lock().per_kind.entry(kind).or_default();
    }

    pub fn record_object(&self, kind: ResourceKind, targets: usize, edges: usize) {
        let mut inner = self.lock();
        let stats = inner.per_kind.entry(kind).or_default();
        stats.objects += 1;
        stats.targets += targets;
        stats.edges += edges;
    }

    pub fn record_dropped_target(
        &self,
        kind: ResourceKind,
        object_name: &str,
        target: &AssignmentTarget,
        error: &ResolveError,
    ) {
        warn!(
            kind = %kind,
            object = object_name,
            group_id = target.group_id.as_deref().unwrap_or(""),
            "Skipping assignment target: {}",
            error
        );
        let mut inner = self.lock();
        inner.per_kind.entry(kind).or_default().dropped_targets += 1;
        inner.diagnostics.push(Diagnostic {
            kind,
            scope: DiagnosticScope::Target {
                object_name: object_name.to_string(),
                group_id: target.group_id.clone(),
            },
            message: error.to_string(),
        });
    }

    pub fn record_core_error(&self, kind: ResourceKind, error: &CoreError) {
        warn!(kind = %kind, "{}", error);
        let mut inner = self.lock();
        let stats = inner.per_kind.entry(kind).or_default();
        let scope = match error {
            CoreError::Enumeration { endpoint, .. } => {
                stats.failed_sources += 1;
                DiagnosticScope::Source {
                    endpoint: endpoint.clone(),
                }
            }
            CoreError::MalformedObject { endpoint, .. } => {
                stats.malformed_objects += 1;
                DiagnosticScope::Object {
                    endpoint: endpoint.clone(),
                }
            }
            CoreError::Task(_) => {
                stats.failed_sources += 1;
                DiagnosticScope::Collector
            }
        };
        inner.diagnostics.push(Diagnostic {
            kind,
            scope,
            message: error.to_string(),
        });
    }

    pub fn summary(&self) -> RunSummary {
        let inner = self.lock();
        let mut totals = KindStats::default();
        for stats in inner.per_kind.values() {
            totals.add(stats);
        }
        RunSummary {
            per_kind: inner.per_kind.clone(),
            totals,
            diagnostics: inner.diagnostics.clone(),
        }
    }
}
