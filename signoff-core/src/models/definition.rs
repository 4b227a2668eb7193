//! Process definition data models

use crate::tree::{ApprovalMode, AssigneeSpec, NodeType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Definition lifecycle status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DefinitionStatus {
    /// Being authored, cannot be started
    #[default]
    Draft,
    /// Instances may be started
    Active,
    /// Retired, cannot be started
    Inactive,
}

impl fmt::Display for DefinitionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DefinitionStatus::Draft => "draft",
            DefinitionStatus::Active => "active",
            DefinitionStatus::Inactive => "inactive",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for DefinitionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(DefinitionStatus::Draft),
            "active" => Ok(DefinitionStatus::Active),
            "inactive" => Ok(DefinitionStatus::Inactive),
            other => Err(format!("unknown definition status '{}'", other)),
        }
    }
}

/// Process definition - an immutable node tree plus metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessDefinition {
    /// Unique definition identifier
    pub id: Uuid,
    /// Human-readable name
    pub name: String,
    /// Optional description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Grouping category
    #[serde(default)]
    pub category: String,
    /// Version number, starting at 1
    pub version: u32,
    /// Lifecycle status
    pub status: DefinitionStatus,
    /// Linked form definition, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_id: Option<Uuid>,
    /// Serialized node tree
    pub tree: String,
    /// Creator identity
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Flat, queryable mirror of one tree node
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeRecord {
    pub workflow_id: Uuid,
    /// Join key back into the tree
    pub node_key: String,
    pub name: String,
    pub node_type: NodeType,
    pub approval_mode: ApprovalMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignees: Option<AssigneeSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub child_key: Option<String>,
    /// Depth-first position within the definition
    pub sort_order: u32,
}

/// Flat mirror of one conditional branch
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BranchRecord {
    pub workflow_id: Uuid,
    /// Key of the CONDITION node owning this branch
    pub node_key: String,
    pub branch_key: String,
    pub name: String,
    pub branch_type: NodeType,
    #[serde(default)]
    pub condition: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub child_key: Option<String>,
    /// Declaration order within the owning node
    pub sort_order: u32,
}

/// Request to create a definition from a node tree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDefinitionRequest {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_id: Option<Uuid>,
    /// Nested node tree
    pub node_tree: crate::tree::NodeData,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_definition_status_serialization() {
        let json = serde_json::to_string(&DefinitionStatus::Inactive).unwrap();
        assert_eq!(json, "\"inactive\"");
        assert_eq!("active".parse::<DefinitionStatus>(), Ok(DefinitionStatus::Active));
        assert!("paused".parse::<DefinitionStatus>().is_err());
    }

    #[test]
    fn test_create_request_from_json() {
        let raw = r#"{
            "name": "Expense",
            "category": "finance",
            "node_tree": {"key": "s", "type": "START", "child": {"key": "e", "type": "END"}}
        }"#;
        let request: CreateDefinitionRequest = serde_json::from_str(raw).unwrap();
        assert_eq!(request.name, "Expense");
        assert_eq!(request.node_tree.key, "s");
        assert!(request.form_id.is_none());
    }
}
