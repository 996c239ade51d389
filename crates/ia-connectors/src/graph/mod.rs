//! Microsoft Graph connectors.

pub mod connector;
pub mod mock;

pub use connector::{GraphConfig, GraphConnector, GRAPH_BASE_URL, GRAPH_DEFAULT_SCOPE};
pub use mock::MockDirectory;
