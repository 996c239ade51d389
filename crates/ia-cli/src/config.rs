//! Configuration loading for the assignment inventory CLI.

use anyhow::{anyhow, Context, Result};
use ia_connectors::{AuthConfig, ConnectorConfig, GraphConfig, SecureString, GRAPH_DEFAULT_SCOPE};
use ia_core::PipelineConfig;
use ia_export::OutputConfig;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::path::Path;
use std::time::Duration;

const REDACTED: &str = "***REDACTED***";

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Graph tenant and credentials.
    #[serde(default)]
    pub graph: GraphSection,

    /// Collection behaviour.
    #[serde(default)]
    pub inventory: InventorySection,

    /// Export destination and formats.
    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub logging: LoggingSection,
}

impl AppConfig {
    /// Loads configuration from a YAML file, expanding `${VAR}` references
    /// from the environment first.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_yaml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_yaml(contents: &str) -> Result<Self> {
        let contents = substitute_env_vars(contents)?;
        Ok(serde_yaml::from_str(&contents)?)
    }

    /// Saves configuration to a file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = serde_yaml::to_string(self)?;
        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Creates a copy with secrets redacted.
    pub fn redact_secrets(&self) -> Self {
        let mut config = self.clone();
        if !config.graph.client_secret.is_empty() {
            config.graph.client_secret = REDACTED.to_string();
        }
        config
    }

    /// Graph connector configuration using client-credential auth.
    pub fn graph_config(&self) -> GraphConfig {
        let graph = &self.graph;
        let token_url = format!(
            "{}/{}/oauth2/v2.0/token",
            graph.authority_url.trim_end_matches('/'),
            graph.tenant_id
        );

        GraphConfig {
            connector: ConnectorConfig {
                name: "graph".to_string(),
                base_url: graph.base_url.clone(),
                auth: AuthConfig::OAuth2 {
                    client_id: graph.client_id.clone(),
                    client_secret: SecureString::from(graph.client_secret.as_str()),
                    token_url,
                    scopes: vec![GRAPH_DEFAULT_SCOPE.to_string()],
                },
                timeout_secs: graph.timeout_secs,
                max_retries: graph.max_retries,
                verify_tls: true,
                headers: HashMap::new(),
            },
            tenant_id: graph.tenant_id.clone(),
            management_api_version: graph.management_api_version.clone(),
            requests_per_minute: graph.requests_per_minute,
        }
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            resolve_timeout: Duration::from_secs(self.inventory.resolve_timeout_secs),
            cache_capacity: self.inventory.cache_capacity,
            parallel_kinds: self.inventory.parallel_kinds,
        }
    }
}

/// Graph tenant and application credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphSection {
    #[serde(default)]
    pub tenant_id: String,

    #[serde(default)]
    pub client_id: String,

    #[serde(default)]
    pub client_secret: String,

    /// Graph API root. Empty means the public cloud endpoint.
    #[serde(default)]
    pub base_url: String,

    /// Identity platform root used for token requests.
    #[serde(default = "default_authority_url")]
    pub authority_url: String,

    #[serde(default = "default_management_api_version")]
    pub management_api_version: String,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,
}

fn default_authority_url() -> String {
    "https://login.microsoftonline.com".to_string()
}

fn default_management_api_version() -> String {
    "beta".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_requests_per_minute() -> u32 {
    600
}

impl Default for GraphSection {
    fn default() -> Self {
        Self {
            tenant_id: String::new(),
            client_id: String::new(),
            client_secret: String::new(),
            base_url: String::new(),
            authority_url: default_authority_url(),
            management_api_version: default_management_api_version(),
            timeout_secs: default_timeout(),
            max_retries: default_max_retries(),
            requests_per_minute: default_requests_per_minute(),
        }
    }
}

/// Collection behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventorySection {
    /// Bound on each group lookup, in seconds.
    #[serde(default = "default_timeout")]
    pub resolve_timeout_secs: u64,

    /// Collect different kinds concurrently.
    #[serde(default = "default_true")]
    pub parallel_kinds: bool,

    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: u64,
}

fn default_true() -> bool {
    true
}

fn default_cache_capacity() -> u64 {
    50_000
}

impl Default for InventorySection {
    fn default() -> Self {
        Self {
            resolve_timeout_secs: default_timeout(),
            parallel_kinds: true,
            cache_capacity: default_cache_capacity(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSection {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub json_format: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
        }
    }
}

/// Replaces every `${VAR_NAME}` with the value of the environment variable.
/// Fails listing every variable that is not set.
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}")?;
    let mut missing = Vec::new();

    let result = re.replace_all(input, |caps: &regex::Captures<'_>| {
        let var_name = &caps[1];
        match env::var(var_name) {
            Ok(value) => value,
            Err(_) => {
                missing.push(var_name.to_string());
                String::new()
            }
        }
    });

    if !missing.is_empty() {
        return Err(anyhow!(
            "Environment variable(s) not set: {}",
            missing.join(", ")
        ));
    }

    Ok(result.into_owned())
}
