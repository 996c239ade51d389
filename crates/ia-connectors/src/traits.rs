//! Connector trait definitions for the assignment inventory.
//!
//! The inventory engine only ever talks to two collaborators: something that
//! enumerates managed objects with their assignments expanded, and something
//! that looks up directory groups by id. Both are expressed here as traits so
//! that the Graph connector and the in-memory mock are interchangeable.

use crate::secure_string::SecureString;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Errors that can occur in connectors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectorError {
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Authorization denied: {0}")]
    AuthorizationDenied(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Rate limited: retry after {0} seconds")]
    RateLimited(u64),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Collection exceeds {0} pages")]
    PageLimitExceeded(usize),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for connector operations.
pub type ConnectorResult<T> = Result<T, ConnectorError>;

/// Health status of a connector.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConnectorHealth {
    /// Connector is healthy and operational.
    Healthy,
    /// Connector is degraded but still functional.
    Degraded(String),
    /// Connector is unhealthy and not operational.
    Unhealthy(String),
}

/// Configuration for a connector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectorConfig {
    /// Connector name/identifier.
    pub name: String,
    /// Base URL for the API.
    pub base_url: String,
    /// Authentication configuration.
    pub auth: AuthConfig,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Maximum retries.
    pub max_retries: u32,
    /// Whether to verify TLS certificates.
    pub verify_tls: bool,
    /// Additional headers to include.
    pub headers: HashMap<String, String>,
}

/// Authentication configuration.
///
/// Credential fields use `SecureString` so they are zeroized on drop.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthConfig {
    /// No authentication.
    None,
    /// Pre-acquired bearer token.
    BearerToken {
        /// The bearer token (zeroized on drop).
        token: SecureString,
    },
    /// OAuth2 client credentials.
    OAuth2 {
        /// The client ID.
        client_id: String,
        /// The client secret (zeroized on drop).
        client_secret: SecureString,
        /// The token URL.
        token_url: String,
        /// The scopes to request.
        scopes: Vec<String>,
    },
}

/// A directory group as returned by the group source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryGroup {
    /// Directory object id.
    pub id: String,
    /// Display name, absent for some synced or soft-deleted groups.
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Base trait for all connectors.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Returns the connector name.
    fn name(&self) -> &str;

    /// Returns the connector type (e.g., "graph", "mock").
    fn connector_type(&self) -> &str;

    /// Checks that the external system is reachable with the configured
    /// credentials.
    async fn health_check(&self) -> ConnectorResult<ConnectorHealth>;
}

/// Enumerates managed objects of one collection.
///
/// Implementations must return every object of `endpoint` with its
/// `assignments` array already expanded; callers never fetch assignments
/// separately.
#[async_trait]
pub trait ObjectSource: Send + Sync {
    /// Fetches every raw object of the given collection, following paging.
    async fn fetch_objects(&self, endpoint: &str) -> ConnectorResult<Vec<serde_json::Value>>;
}

/// Looks up directory groups by id.
#[async_trait]
pub trait GroupSource: Send + Sync {
    /// Fetches a single group. Deleted groups yield `ConnectorError::NotFound`.
    async fn fetch_group(&self, group_id: &str) -> ConnectorResult<DirectoryGroup>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_group_deserialize() {
        let group: DirectoryGroup =
            serde_json::from_str(r#"{"id":"g1","displayName":"Finance"}"#).unwrap();
        assert_eq!(group.id, "g1");
        assert_eq!(group.display_name.as_deref(), Some("Finance"));

        let unnamed: DirectoryGroup = serde_json::from_str(r#"{"id":"g2"}"#).unwrap();
        assert!(unnamed.display_name.is_none());
    }

    #[test]
    fn test_auth_config_tagged() {
        let auth: AuthConfig = serde_json::from_str(r#"{"type":"none"}"#).unwrap();
        assert!(matches!(auth, AuthConfig::None));
    }
}
