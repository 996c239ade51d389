//! Configuration validation.
//!
//! Checks that credentials, timeouts and the output destination are usable
//! before any request is sent to the tenant.

use crate::config::AppConfig;
use colored::Colorize;
use ia_connectors::http::MAX_RETRY_AFTER;
use std::path::Path;

/// Result of configuration validation.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Problems that prevent a run.
    pub errors: Vec<String>,
    /// Problems worth reviewing that do not prevent a run.
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn add_warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Prints the validation result to the console.
    pub fn print(&self) {
        if !self.warnings.is_empty() {
            println!();
            println!("{}", "Configuration Warnings:".yellow().bold());
            for warning in &self.warnings {
                println!("  {} {}", "⚠".yellow(), warning);
            }
        }

        if !self.errors.is_empty() {
            println!();
            println!("{}", "Configuration Errors:".red().bold());
            for error in &self.errors {
                println!("  {} {}", "✗".red(), error);
            }
        }

        if self.errors.is_empty() && self.warnings.is_empty() {
            println!("  {} Configuration OK", "✓".green());
        }
    }
}

/// Validates application configuration before a run.
pub struct ConfigValidator;

impl ConfigValidator {
    pub fn validate(config: &AppConfig) -> ValidationResult {
        let mut result = ValidationResult::new();

        Self::validate_credentials(config, &mut result);
        Self::validate_endpoints(config, &mut result);
        Self::validate_limits(config, &mut result);
        Self::validate_output(config, &mut result);
        Self::validate_logging(config, &mut result);

        result
    }

    fn validate_credentials(config: &AppConfig, result: &mut ValidationResult) {
        let graph = &config.graph;

        if graph.tenant_id.trim().is_empty() {
            result.add_error("graph.tenant_id is required");
        }
        if graph.client_id.trim().is_empty() {
            result.add_error("graph.client_id is required");
        }
        if graph.client_secret.is_empty() {
            result.add_error(
                "graph.client_secret is required. Use ${VAR} to read it from the environment.",
            );
        }
    }

    fn validate_endpoints(config: &AppConfig, result: &mut ValidationResult) {
        let graph = &config.graph;

        if !graph.authority_url.starts_with("https://") {
            result.add_error(format!(
                "graph.authority_url must use https: {}",
                graph.authority_url
            ));
        }

        if !graph.base_url.is_empty() && !graph.base_url.starts_with("https://") {
            result.add_error(format!("graph.base_url must use https: {}", graph.base_url));
        }

        if graph.management_api_version != "beta" && graph.management_api_version != "v1.0" {
            result.add_warning(format!(
                "Unexpected graph.management_api_version '{}'. Expected 'beta' or 'v1.0'.",
                graph.management_api_version
            ));
        }
    }

    fn validate_limits(config: &AppConfig, result: &mut ValidationResult) {
        if config.graph.timeout_secs == 0 {
            result.add_error("graph.timeout_secs must be greater than zero");
        }
        let resolve_timeout = config.inventory.resolve_timeout_secs;
        if resolve_timeout == 0 {
            result.add_error("inventory.resolve_timeout_secs must be greater than zero");
        } else if resolve_timeout <= MAX_RETRY_AFTER.as_secs() {
            result.add_warning(format!(
                "inventory.resolve_timeout_secs is {}s. Throttled group lookups wait up to {}s \
                 before retrying and will time out.",
                resolve_timeout,
                MAX_RETRY_AFTER.as_secs()
            ));
        }
        if config.graph.requests_per_minute == 0 {
            result.add_error("graph.requests_per_minute must be greater than zero");
        }
        if config.inventory.cache_capacity == 0 {
            result.add_warning(
                "inventory.cache_capacity is 0. Every group reference will be fetched again.",
            );
        }
    }

    fn validate_output(config: &AppConfig, result: &mut ValidationResult) {
        let output = &config.output;

        if !output.write_csv && !output.write_json {
            result.add_warning(
                "Both output.write_csv and output.write_json are disabled. \
                 Only the graph export will produce files.",
            );
        }

        if output.graph_file_name.trim().is_empty() {
            result.add_error("output.graph_file_name must not be empty");
        }

        let directory = output.directory.as_path();
        if directory.exists() {
            if !directory.is_dir() {
                result.add_error(format!(
                    "output.directory is not a directory: {}",
                    directory.display()
                ));
            } else if is_read_only(directory) {
                result.add_warning(format!(
                    "output.directory is read-only: {}",
                    directory.display()
                ));
            }
        }
    }

    fn validate_logging(config: &AppConfig, result: &mut ValidationResult) {
        let valid = ["trace", "debug", "info", "warn", "error"];
        if !valid.contains(&config.logging.level.to_lowercase().as_str()) {
            result.add_warning(format!(
                "Unknown logging.level '{}'. Falling back to 'info'.",
                config.logging.level
            ));
        }
    }
}

fn is_read_only(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|metadata| metadata.permissions().readonly())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.graph.tenant_id = "tenant-1".to_string();
        config.graph.client_id = "client-1".to_string();
        config.graph.client_secret = "secret".to_string();
        config
    }

    #[test]
    fn test_validation_result_operations() {
        let mut result = ValidationResult::new();
        assert!(!result.has_errors());
        assert!(!result.has_warnings());

        result.add_error("Test error");
        result.add_warning("Test warning");

        assert!(result.has_errors());
        assert!(result.has_warnings());
        assert_eq!(result.errors.len(), 1);
    }

    #[test]
    fn test_valid_config() {
        let result = ConfigValidator::validate(&valid_config());
        assert!(!result.has_errors(), "errors: {:?}", result.errors);
    }

    #[test]
    fn test_missing_credentials() {
        let result = ConfigValidator::validate(&AppConfig::default());
        assert_eq!(result.errors.len(), 3);
        assert!(result.errors.iter().any(|e| e.contains("tenant_id")));
        assert!(result.errors.iter().any(|e| e.contains("client_secret")));
    }

    #[test]
    fn test_zero_timeouts_rejected() {
        let mut config = valid_config();
        config.graph.timeout_secs = 0;
        config.inventory.resolve_timeout_secs = 0;

        let result = ConfigValidator::validate(&config);
        assert_eq!(result.errors.len(), 2);
    }

    #[test]
    fn test_resolve_timeout_below_throttle_wait_warns() {
        let mut config = valid_config();
        config.inventory.resolve_timeout_secs = 10;

        let result = ConfigValidator::validate(&config);
        assert!(!result.has_errors());
        assert!(result
            .warnings
            .iter()
            .any(|w| w.contains("resolve_timeout_secs")));

        config.inventory.resolve_timeout_secs = 30;
        let result = ConfigValidator::validate(&config);
        assert!(!result
            .warnings
            .iter()
            .any(|w| w.contains("resolve_timeout_secs")));
    }

    #[test]
    fn test_plain_http_base_url_rejected() {
        let mut config = valid_config();
        config.graph.base_url = "http://graph.local".to_string();

        let result = ConfigValidator::validate(&config);
        assert!(result.errors.iter().any(|e| e.contains("base_url")));
    }

    #[test]
    fn test_disabled_outputs_warn() {
        let mut config = valid_config();
        config.output.write_csv = false;
        config.output.write_json = false;

        let result = ConfigValidator::validate(&config);
        assert!(!result.has_errors());
        assert!(result.warnings.iter().any(|w| w.contains("write_csv")));
    }

    #[test]
    fn test_output_directory_must_be_directory() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut config = valid_config();
        config.output.directory = file.path().to_path_buf();

        let result = ConfigValidator::validate(&config);
        assert!(result.errors.iter().any(|e| e.contains("not a directory")));
    }

    #[test]
    fn test_unknown_log_level_warns() {
        let mut config = valid_config();
        config.logging.level = "chatty".to_string();

        let result = ConfigValidator::validate(&config);
        assert!(result.warnings.iter().any(|w| w.contains("chatty")));
    }
}
