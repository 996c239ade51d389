//! Error types for the inventory engine.

use ia_connectors::ConnectorError;
use std::time::Duration;
use thiserror::Error;

/// Why a single assignment target could not be resolved to a group.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("Assignment target '{discriminator}' carries no group id")]
    MissingGroupId { discriminator: String },

    #[error("Lookup of group {group_id} failed: {source}")]
    Lookup {
        group_id: String,
        #[source]
        source: ConnectorError,
    },

    #[error("Lookup of group {group_id} timed out after {timeout:?}")]
    Timeout { group_id: String, timeout: Duration },
}

/// Failures inside a collection pass. None of these escape the collector;
/// they are recorded as diagnostics.
#[derive(Error, Debug, Clone)]
pub enum CoreError {
    #[error("Failed to enumerate {endpoint}: {source}")]
    Enumeration {
        endpoint: String,
        #[source]
        source: ConnectorError,
    },

    #[error("Malformed object in {endpoint}: {message}")]
    MalformedObject { endpoint: String, message: String },

    #[error("Collector task failed: {0}")]
    Task(String),
}
