//! Assignment data model.
//!
//! Managed objects arrive as loosely typed Graph JSON. This module turns them
//! into closed Rust types: the kind of object, each assignment target with its
//! discriminator, the resolved group identity and the normalized edge handed
//! to exporters.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// `@odata.type` of an all-devices assignment target.
pub const ALL_DEVICES_TARGET: &str = "#microsoft.graph.allDevicesAssignmentTarget";
/// `@odata.type` of an all-licensed-users assignment target.
pub const ALL_USERS_TARGET: &str = "#microsoft.graph.allLicensedUsersAssignmentTarget";
/// `@odata.type` of an exclusion group assignment target.
pub const EXCLUSION_GROUP_TARGET: &str = "#microsoft.graph.exclusionGroupAssignmentTarget";
/// `@odata.type` of a plain group assignment target.
pub const INCLUSION_GROUP_TARGET: &str = "#microsoft.graph.groupAssignmentTarget";

/// Display name of the built-in all-devices identity.
pub const ALL_DEVICES_NAME: &str = "All Devices";
/// Display name of the built-in all-users identity.
pub const ALL_USERS_NAME: &str = "All Users";

/// Kind of managed object. Declaration order is the export order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    ConfigurationProfile,
    CompliancePolicy,
    Application,
    RemediationScript,
    PlatformScript,
    ShellScript,
    ProtectionPolicy,
}

impl ResourceKind {
    /// Every kind, in export order.
    pub const ALL: [ResourceKind; 7] = [
        ResourceKind::ConfigurationProfile,
        ResourceKind::CompliancePolicy,
        ResourceKind::Application,
        ResourceKind::RemediationScript,
        ResourceKind::PlatformScript,
        ResourceKind::ShellScript,
        ResourceKind::ProtectionPolicy,
    ];

    /// Label written to the `AssignmentType` export column.
    pub fn label(&self) -> &'static str {
        match self {
            ResourceKind::ConfigurationProfile => "ConfigurationProfile",
            ResourceKind::CompliancePolicy => "CompliancePolicy",
            ResourceKind::Application => "Application",
            ResourceKind::RemediationScript => "RemediationScript",
            ResourceKind::PlatformScript => "PlatformScript",
            ResourceKind::ShellScript => "ShellScript",
            ResourceKind::ProtectionPolicy => "ProtectionPolicy",
        }
    }

    /// Kebab-case name used on the command line.
    pub fn cli_name(&self) -> &'static str {
        match self {
            ResourceKind::ConfigurationProfile => "configuration-profile",
            ResourceKind::CompliancePolicy => "compliance-policy",
            ResourceKind::Application => "application",
            ResourceKind::RemediationScript => "remediation-script",
            ResourceKind::PlatformScript => "platform-script",
            ResourceKind::ShellScript => "shell-script",
            ResourceKind::ProtectionPolicy => "protection-policy",
        }
    }

    /// Human readable plural used in menus and summaries.
    pub fn description(&self) -> &'static str {
        match self {
            ResourceKind::ConfigurationProfile => "Configuration profiles",
            ResourceKind::CompliancePolicy => "Compliance policies",
            ResourceKind::Application => "Applications",
            ResourceKind::RemediationScript => "Remediation scripts",
            ResourceKind::PlatformScript => "Platform scripts",
            ResourceKind::ShellScript => "macOS shell scripts",
            ResourceKind::ProtectionPolicy => "App protection policies",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        ResourceKind::ALL
            .into_iter()
            .find(|kind| kind.cli_name() == wanted || kind.label().to_lowercase() == wanted)
            .ok_or_else(|| format!("Unknown resource kind: {}", s))
    }
}

/// Discriminator of an assignment target.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TargetKind {
    AllDevices,
    AllUsers,
    ExclusionGroup,
    InclusionGroup,
    /// A type tag this version does not know. Treated as an inclusion group.
    Other(String),
}

impl TargetKind {
    /// Classifies a raw `@odata.type` tag. Matching is exact.
    pub fn from_odata_type(tag: &str) -> Self {
        match tag {
            ALL_DEVICES_TARGET => TargetKind::AllDevices,
            ALL_USERS_TARGET => TargetKind::AllUsers,
            EXCLUSION_GROUP_TARGET => TargetKind::ExclusionGroup,
            INCLUSION_GROUP_TARGET => TargetKind::InclusionGroup,
            other => TargetKind::Other(other.to_string()),
        }
    }

    /// The raw tag this discriminator was read from.
    pub fn odata_type(&self) -> &str {
        match self {
            TargetKind::AllDevices => ALL_DEVICES_TARGET,
            TargetKind::AllUsers => ALL_USERS_TARGET,
            TargetKind::ExclusionGroup => EXCLUSION_GROUP_TARGET,
            TargetKind::InclusionGroup => INCLUSION_GROUP_TARGET,
            TargetKind::Other(tag) => tag,
        }
    }

    /// Excluded for exclusion groups, Included for everything else.
    pub fn mode(&self) -> AssignmentMode {
        match self {
            TargetKind::ExclusionGroup => AssignmentMode::Excluded,
            _ => AssignmentMode::Included,
        }
    }
}

/// One targeting rule attached to a managed object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignmentTarget {
    pub kind: TargetKind,
    pub group_id: Option<String>,
}

impl AssignmentTarget {
    pub fn all_devices() -> Self {
        Self {
            kind: TargetKind::AllDevices,
            group_id: None,
        }
    }

    pub fn all_users() -> Self {
        Self {
            kind: TargetKind::AllUsers,
            group_id: None,
        }
    }

    pub fn include(group_id: &str) -> Self {
        Self {
            kind: TargetKind::InclusionGroup,
            group_id: Some(group_id.to_string()),
        }
    }

    pub fn exclude(group_id: &str) -> Self {
        Self {
            kind: TargetKind::ExclusionGroup,
            group_id: Some(group_id.to_string()),
        }
    }

    pub fn mode(&self) -> AssignmentMode {
        self.kind.mode()
    }
}

/// Inclusion or exclusion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssignmentMode {
    Included,
    Excluded,
}

impl fmt::Display for AssignmentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssignmentMode::Included => f.write_str("Included"),
            AssignmentMode::Excluded => f.write_str("Excluded"),
        }
    }
}

/// A resolved group: a directory group, or a built-in pseudo-group with no id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupIdentity {
    pub id: Option<String>,
    pub display_name: String,
}

impl GroupIdentity {
    pub fn all_devices() -> Self {
        Self {
            id: None,
            display_name: ALL_DEVICES_NAME.to_string(),
        }
    }

    pub fn all_users() -> Self {
        Self {
            id: None,
            display_name: ALL_USERS_NAME.to_string(),
        }
    }

    pub fn directory(id: &str, display_name: &str) -> Self {
        Self {
            id: Some(id.to_string()),
            display_name: display_name.to_string(),
        }
    }
}

/// An inventoried object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedObject {
    pub id: String,
    pub display_name: Option<String>,
    pub name: Option<String>,
    pub kind: ResourceKind,
}

impl ManagedObject {
    /// Display name if present and non-empty, otherwise the internal name,
    /// otherwise the empty string.
    pub fn object_name(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .or(self.name.as_deref())
            .unwrap_or("")
    }

    /// Parses a raw Graph object with its expanded `assignments`.
    ///
    /// Every field is optional on the wire, and an explicit `null` reads the
    /// same as an absent field. Only a value that is not a JSON object (or has
    /// fields of the wrong type) fails.
    pub fn from_raw(
        kind: ResourceKind,
        raw: serde_json::Value,
    ) -> Result<(ManagedObject, Vec<AssignmentTarget>), serde_json::Error> {
        let raw: RawManagedObject = serde_json::from_value(raw)?;

        let targets = raw
            .assignments
            .unwrap_or_default()
            .into_iter()
            .flatten()
            .map(|assignment| {
                let target = assignment.target.unwrap_or_default();
                AssignmentTarget {
                    kind: TargetKind::from_odata_type(target.odata_type.as_deref().unwrap_or("")),
                    group_id: target.group_id,
                }
            })
            .collect();

        let object = ManagedObject {
            id: raw.id.unwrap_or_default(),
            display_name: raw.display_name,
            name: raw.name,
            kind,
        };

        Ok((object, targets))
    }
}

/// The normalized (object, group, mode) relationship.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentEdge {
    pub object_name: String,
    pub object_kind: ResourceKind,
    /// Directory group id; `None` for built-in pseudo-groups.
    pub group_id: Option<String>,
    pub group_name: String,
    pub mode: AssignmentMode,
}

impl AssignmentEdge {
    pub fn new(object: &ManagedObject, group: GroupIdentity, mode: AssignmentMode) -> Self {
        Self {
            object_name: object.object_name().to_string(),
            object_kind: object.kind,
            group_id: group.id,
            group_name: group.display_name,
            mode,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawManagedObject {
    id: Option<String>,
    display_name: Option<String>,
    name: Option<String>,
    assignments: Option<Vec<Option<RawAssignment>>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawAssignment {
    target: Option<RawTarget>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawTarget {
    #[serde(rename = "@odata.type")]
    odata_type: Option<String>,
    group_id: Option<String>,
}
