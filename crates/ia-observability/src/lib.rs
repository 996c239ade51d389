//! # ia-observability
//!
//! Logging setup shared by the assignment inventory binary and its tests.

pub mod logging;

pub use logging::{init_logging, init_logging_with_config, LoggingConfig};
