//! # ia-connectors
//!
//! Transport and directory collaborators for the assignment inventory.
//!
//! This crate provides the `ObjectSource` and `GroupSource` traits consumed by
//! the inventory engine, the Microsoft Graph connector implementing them, and
//! an in-memory mock directory for tests.

pub mod graph;
pub mod http;
pub mod secure_string;
pub mod testing;
pub mod traits;

pub use secure_string::SecureString;

pub use traits::{
    AuthConfig, Connector, ConnectorConfig, ConnectorError, ConnectorHealth, ConnectorResult,
    DirectoryGroup, GroupSource, ObjectSource,
};

pub use graph::{GraphConfig, GraphConnector, MockDirectory, GRAPH_BASE_URL, GRAPH_DEFAULT_SCOPE};
