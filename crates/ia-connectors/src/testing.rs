//! Testing harness for connector implementations and their consumers.

use crate::traits::{AuthConfig, ConnectorConfig};
use serde_json::json;
use std::collections::HashMap;

/// Creates a test connector config with sensible defaults.
pub fn test_connector_config(name: &str, base_url: &str) -> ConnectorConfig {
    ConnectorConfig {
        name: name.to_string(),
        base_url: base_url.to_string(),
        auth: AuthConfig::None,
        timeout_secs: 30,
        max_retries: 0,
        verify_tls: true,
        headers: HashMap::new(),
    }
}

/// Builds one expanded assignment entry as Graph returns it.
pub fn assignment_json(odata_type: &str, group_id: Option<&str>) -> serde_json::Value {
    let mut target = json!({ "@odata.type": odata_type });
    if let Some(group_id) = group_id {
        target["groupId"] = json!(group_id);
    }
    json!({ "id": format!("assignment-{}", group_id.unwrap_or("builtin")), "target": target })
}

/// Builds a raw managed object with expanded assignments.
///
/// `targets` pairs a target `@odata.type` with an optional group id.
pub fn raw_object(
    id: &str,
    display_name: Option<&str>,
    name: Option<&str>,
    targets: &[(&str, Option<&str>)],
) -> serde_json::Value {
    let assignments: Vec<serde_json::Value> = targets
        .iter()
        .map(|(odata_type, group_id)| assignment_json(odata_type, *group_id))
        .collect();

    let mut object = json!({ "id": id, "assignments": assignments });
    if let Some(display_name) = display_name {
        object["displayName"] = json!(display_name);
    }
    if let Some(name) = name {
        object["name"] = json!(name);
    }
    object
}
